//! System configuration (SYSCON) for the LPC802
//!
//! Peripheral clocks are gated through single bits in SYSAHBCLKCTRL0,
//! resets through PRESETCTRL0. Other parts of the HAL use [`Syscon`] to
//! synchronize access to these shared registers.
//!
//! See the user manual, chapter 6.

use crate::pac::lpc802 as pac;

/// Interface to the SYSCON block
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
            self.syscon
                .sysahbclkctrl0
                .modify(|ctrl| ctrl | (0x1 << P::CLOCK_BIT));
        }
    }

    /// Disable the clock of a peripheral
    pub fn disable_clock<P: ClockControl>(&mut self, _peripheral: &P) {
        unsafe {
            self.syscon
                .sysahbclkctrl0
                .modify(|ctrl| ctrl & !(0x1 << P::CLOCK_BIT));
        }
    }

    /// Reset a peripheral
    ///
    /// Asserts and releases the peripheral's reset line.
    pub fn reset<P: ResetControl>(&mut self, _peripheral: &P) {
        unsafe {
            self.syscon
                .presetctrl0
                .modify(|ctrl| ctrl & !(0x1 << P::RESET_BIT));
            self.syscon
                .presetctrl0
                .modify(|ctrl| ctrl | (0x1 << P::RESET_BIT));
        }
    }

    /// Select the main clock as the functional clock of a peripheral
    pub(crate) fn select_main_clock(&mut self, index: usize) {
        unsafe {
            self.syscon.fclksel[index].write(0x1);
        }
    }
}

/// Implemented by peripherals whose clock is gated through SYSAHBCLKCTRL0
///
/// This trait is an internal implementation detail and should neither be
/// implemented nor used outside of cmx-hal.
pub trait ClockControl {
    /// The peripheral's bit in SYSAHBCLKCTRL0
    const CLOCK_BIT: u8;
}

/// Implemented by peripherals with a PRESETCTRL0 reset line
pub trait ResetControl {
    /// The peripheral's bit in PRESETCTRL0
    const RESET_BIT: u8;
}

macro_rules! impl_clock_control {
    ($($peripheral:ty, $bit:expr;)*) => {
        $(
            impl ClockControl for $peripheral {
                const CLOCK_BIT: u8 = $bit;
            }
        )*
    };
}

macro_rules! impl_reset_control {
    ($($peripheral:ty, $bit:expr;)*) => {
        $(
            impl ResetControl for $peripheral {
                const RESET_BIT: u8 = $bit;
            }
        )*
    };
}

impl_clock_control!(
    pac::GPIO, 6;
    pac::SWM, 7;
    pac::USART0, 14;
    pac::USART1, 15;
    pac::IOCON, 18;
);

impl_reset_control!(
    pac::USART0, 14;
    pac::USART1, 15;
);
