//! Pin function routing through the pin connect block
//!
//! On the LPC17xx every pin has a two bit function selector in one of the
//! PINSEL registers: function 0 is GPIO, functions 1 to 3 route the pin to
//! on-chip peripherals. Which function means what is fixed per pin, so the
//! legal (pin, function) pairs are encoded as per-driver marker traits
//! (for example [`usart::TxdPin`]); a driver sets the selector itself when
//! it is enabled with a pin, and an illegal pin does not compile.
//!
//! See the user manual, chapter 8.
//!
//! [`usart::TxdPin`]: ../usart/trait.TxdPin.html

use crate::pac::lpc17xx as pac;
use crate::pins::PinTrait;

/// The alternate function selector of a pin
///
/// `None` leaves the pin to the GPIO controller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Function {
    None = 0b00,
    Func1 = 0b01,
    Func2 = 0b10,
    Func3 = 0b11,
}

/// Pull resistor configuration of a pin
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    PullUp = 0b00,
    Repeater = 0b01,
    Floating = 0b10,
    PullDown = 0b11,
}

/// Interface to the pin connect block
///
/// Owned access serializes the read-modify-write of the shared selector
/// words.
pub struct PinConnect {
    pinconnect: pac::PINCONNECT,
}

impl PinConnect {
    pub(crate) fn new(pinconnect: pac::PINCONNECT) -> Self {
        PinConnect { pinconnect }
    }

    /// Route a pin to a peripheral function
    ///
    /// After this call, reads and writes on the pin are observed by the
    /// selected peripheral and no longer by the GPIO controller.
    pub fn set_function<P: PinTrait>(&mut self, function: Function) {
        self.set_function_raw(P::PORT, P::BIT, function);
    }

    pub(crate) fn set_function_raw(&mut self, port: usize, bit: u8, function: Function) {
        // two bits per pin, sixteen pins per register
        let index = port * 2 + usize::from(bit >= 16);
        let shift = (u32::from(bit) * 2) % 32;

        unsafe {
            self.pinconnect.pinsel[index]
                .modify(|pinsel| (pinsel & !(0b11 << shift)) | ((function as u32) << shift));
        }
    }

    /// Configure the pull resistors of a pin
    pub fn set_mode<P: PinTrait>(&mut self, mode: Mode) {
        let index = P::PORT * 2 + usize::from(P::BIT >= 16);
        let shift = (u32::from(P::BIT) * 2) % 32;

        unsafe {
            self.pinconnect.pinmode[index]
                .modify(|pinmode| (pinmode & !(0b11 << shift)) | ((mode as u32) << shift));
        }
    }

    /// Enable or disable the open-drain mode of a pin
    pub fn set_open_drain<P: PinTrait>(&mut self, enabled: bool) {
        unsafe {
            self.pinconnect.pinmode_od[P::PORT].modify(|od| {
                if enabled {
                    od | P::MASK
                } else {
                    od & !P::MASK
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_field_positions() {
        // PINSEL register index and bit shift for a few pins
        let cases = [
            // (port, bit) -> (index, shift)
            ((0usize, 0u8), (0usize, 0u32)),
            ((0, 15), (0, 30)),
            ((0, 16), (1, 0)),
            ((0, 29), (1, 26)),
            ((1, 30), (3, 28)),
            ((2, 9), (4, 18)),
            ((4, 28), (9, 24)),
        ];

        for ((port, bit), (index, shift)) in cases {
            assert_eq!(port * 2 + usize::from(bit >= 16), index);
            assert_eq!((u32::from(bit) * 2) % 32, shift);
        }
    }
}
