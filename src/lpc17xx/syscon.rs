//! System control: peripheral power and clock gating
//!
//! The LPC17xx gates peripheral clocks through single bits in the PCONP
//! register. Drivers enable their clock through [`Syscon`] when they are
//! enabled; HAL users usually won't have to call these methods directly.
//!
//! See the user manual, chapter 4.

use crate::pac::lpc17xx as pac;

/// Interface to the system control block
pub struct Syscon {
    syscon: pac::SYSCON,
}

impl Syscon {
    pub(crate) fn new(syscon: pac::SYSCON) -> Self {
        Syscon { syscon }
    }

    /// Enable the clock of a peripheral
    pub fn enable_clock<P: ClockControl>(&mut self, _peripheral: &P) {
        unsafe {
            self.syscon.pconp.modify(|pconp| pconp | (0x1 << P::PCONP_BIT));
        }
    }

    /// Disable the clock of a peripheral
    pub fn disable_clock<P: ClockControl>(&mut self, _peripheral: &P) {
        unsafe {
            self.syscon
                .pconp
                .modify(|pconp| pconp & !(0x1 << P::PCONP_BIT));
        }
    }

    /// Set the USB clock divider so the 48 MHz USB clock can be derived
    /// from the PLL output
    pub fn set_usb_clock_divider(&mut self, divider: u8) {
        unsafe {
            self.syscon.usbclkcfg.write(u32::from(divider) & 0xf);
        }
    }
}

/// Implemented by peripherals whose clock is gated through PCONP
///
/// This trait is an internal implementation detail and should neither be
/// implemented nor used outside of cmx-hal. Any changes to this trait won't
/// be considered breaking changes.
pub trait ClockControl {
    /// The peripheral's bit in the PCONP register
    const PCONP_BIT: u8;
}

macro_rules! impl_clock_control {
    ($($peripheral:ty, $bit:expr;)*) => {
        $(
            impl ClockControl for $peripheral {
                const PCONP_BIT: u8 = $bit;
            }
        )*
    };
}

impl_clock_control!(
    pac::TIMER0, 1;
    pac::TIMER1, 2;
    pac::UART0, 3;
    pac::SPI, 8;
    pac::GPIO, 15;
    pac::TIMER2, 22;
    pac::TIMER3, 23;
    pac::UART2, 24;
    pac::UART3, 25;
    pac::GPDMA, 29;
    pac::USB, 31;
);
