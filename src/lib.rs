//! # CMX HAL
//!
//! Hardware Abstraction Layer (HAL) for several families of ARM Cortex-M
//! microcontrollers: NXP LPC17xx (LPC1756/LPC1788), NXP LPC802, Atmel
//! ATSAM4S, Maxim MAX32625 and Cypress MB9BF560L.
//!
//! The crate is split into two halves:
//!
//! - Chip-independent layers that build for any target (and for the host):
//!   the USB device stack ([`usb`]), the USB class devices ([`usb::keyboard`],
//!   [`usb::msc`]) and the virtual FAT filesystem ([`fat`]).
//! - Per-family peripheral APIs, selected through Cargo features. Each family
//!   module provides an entry point in the style of `Peripherals::take()`,
//!   pin and package definitions, and drivers that bind peripherals to pins
//!   at compile time.
//!
//! ## Target selection
//!
//! Select your part through a package feature:
//!
//! ``` toml
//! [dependencies.cmx-hal]
//! version          = "0.3"
//! default-features = false
//! features         = ["lpc1788"]
//! ```
//!
//! Available packages: `lpc1756` (LQFP80), `lpc1788` (LQFP208),
//! `lpc802m001jdh16` (TSSOP16), `lpc802m001jdh20` (TSSOP20), plus `atsam4s`,
//! `max32625` and `mb9bf560l` for the USB-centric ports of those families.
//!
//! ## Example
//!
//! Configure a GPIO output on an LPC1756:
//!
//! ``` no_run
//! use cmx_hal::lpc17xx::gpio::{Level, PinExt};
//! use cmx_hal::lpc17xx::Peripherals;
//!
//! let mut p = Peripherals::take().unwrap();
//!
//! let gpio = p.gpio.enable(&mut p.syscon);
//! let mut led = p
//!     .pins
//!     .p25
//!     .into_output_pin(&mut p.pinconnect, &gpio, Level::Low);
//!
//! led.set_high();
//! ```
//!
//! Bring up a USB HID keyboard on the same chip:
//!
//! ``` no_run
//! use cmx_hal::lpc17xx::{usb::Usb, Peripherals};
//! use cmx_hal::usb::keyboard::Keyboard;
//!
//! type Kbd = Keyboard<1>;
//!
//! let mut p = Peripherals::take().unwrap();
//!
//! // Installs the endpoint table, resets the bus state and connects the
//! // pull-up. From here on the stack runs from the USB interrupt.
//! Usb::<Kbd>::init(p.usb, p.usbclk, &mut p.pinconnect, &mut p.syscon);
//!
//! while !Kbd::is_configured() {}
//! Kbd::write_str::<Usb<Kbd>>("hello");
//! ```

#![no_std]

#[cfg(test)]
extern crate std;

pub extern crate cortex_m;
#[cfg(feature = "rt")]
pub extern crate cortex_m_rt;
pub extern crate embedded_hal;
pub extern crate embedded_time;
pub extern crate nb;
pub extern crate void;

pub(crate) mod cell;

#[macro_use]
pub mod pins;

pub mod clock;
pub mod fat;
pub mod init_state;
pub mod pac;
pub mod usb;

#[cfg(feature = "17xx")]
pub mod lpc17xx;

#[cfg(feature = "802")]
pub mod lpc802;

#[cfg(feature = "atsam4s")]
pub mod atsam4s;

#[cfg(feature = "max32625")]
pub mod max32625;

#[cfg(feature = "mb9bf560l")]
pub mod mb9bf560l;

/// Re-exports various traits that are required to use cmx-hal
///
/// The purpose of this module is to improve convenience, by not requiring the
/// user to import traits separately. Just add the following glob import to
/// your code, and you should be good:
///
/// ``` rust
/// use cmx_hal::prelude::*;
/// ```
pub mod prelude {
    pub use crate::clock::{
        Enabled as _cmx_hal_clock_Enabled, Frequency as _cmx_hal_clock_Frequency,
    };
    pub use crate::usb::device::Device as _cmx_hal_usb_Device;
    pub use crate::usb::Driver as _cmx_hal_usb_Driver;
    pub use embedded_hal::prelude::*;
}
