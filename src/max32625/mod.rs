//! HAL for the Maxim MAX32625
//!
//! This family module carries the USB device controller driver plus the
//! clock and power collaborators it needs.

pub mod usb;

use crate::pac::max32625 as pac;

/// Entry point to the MAX32625 HAL
#[allow(missing_docs)]
pub struct Peripherals {
    /// The USB controller, consumed by [`usb::Usb::init`]
    pub usb: pac::USB,
    /// The clock manager, consumed by [`usb::Usb::init`]
    pub clkman: pac::CLKMAN,
    /// The power manager, consumed by [`usb::Usb::init`]
    pub pwrman: pac::PWRMAN,
}

impl Peripherals {
    /// Returns the peripherals, once
    pub fn take() -> Option<Self> {
        let p = pac::Peripherals::take()?;

        Some(Peripherals {
            usb: p.USB,
            clkman: p.CLKMAN,
            pwrman: p.PWRMAN,
        })
    }
}
