//! HAL for the Cypress (Spansion) MB9BF560L
//!
//! This family module carries the USB function driver plus the USB clock
//! collaborator it needs.

pub mod usb;

use crate::pac::mb9bf560l as pac;

/// Entry point to the MB9BF560L HAL
#[allow(missing_docs)]
pub struct Peripherals {
    /// USB function 0, consumed by [`usb::Usb::init`]
    pub usb0: pac::USB0,
    /// The USB clock block, consumed by [`usb::Usb::init`]
    pub usbclk: pac::USBCLK,
}

impl Peripherals {
    /// Returns the peripherals, once
    pub fn take() -> Option<Self> {
        let p = pac::Peripherals::take()?;

        Some(Peripherals {
            usb0: p.USB0,
            usbclk: p.USBCLK,
        })
    }
}
