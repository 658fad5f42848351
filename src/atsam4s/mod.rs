//! HAL for the Atmel ATSAM4S
//!
//! This family module carries the USB device port driver plus the clock
//! and power collaborators it needs. The pin and GPIO surface of the
//! SAM4S is not covered here.

pub mod usb;

use crate::pac::atsam4s as pac;

/// Entry point to the ATSAM4S HAL
#[allow(missing_docs)]
pub struct Peripherals {
    /// The USB device port, consumed by [`usb::Usb::init`]
    pub udp: pac::UDP,
    /// The power management controller, consumed by [`usb::Usb::init`]
    pub pmc: pac::PMC,
    /// The bus matrix, consumed by [`usb::Usb::init`]
    pub matrix: pac::MATRIX,
}

impl Peripherals {
    /// Returns the peripherals, once
    pub fn take() -> Option<Self> {
        let p = pac::Peripherals::take()?;

        Some(Peripherals {
            udp: p.UDP,
            pmc: p.PMC,
            matrix: p.MATRIX,
        })
    }
}
