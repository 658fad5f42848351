//! General purpose I/O for the LPC17xx
//!
//! Pins come out of [`Peripherals`] in an inert state. Converting one into
//! a GPIO pin releases any alternate function, configures the direction
//! and returns a type-state [`GpioPin`]:
//!
//! - [`direction::Input`] reads levels and configures pulls
//! - [`direction::Output`] drives levels through the dedicated SET/CLR
//!   registers, so updates are atomic and free of read-modify-write
//! - [`direction::OpenDrain`] drives low or releases the pin by toggling
//!   the direction register, and can read the resulting level back
//!
//! Several pins of the same port can be grouped into a [`PortOut`] or
//! [`PortIn`], which maps a contiguous logical value onto the scattered
//! pins with at most two register writes.
//!
//! See the user manual, chapter 9.
//!
//! [`Peripherals`]: ../struct.Peripherals.html

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};

use crate::init_state::{Disabled, Enabled};
use crate::pac::lpc17xx as pac;
use crate::pins::PinTrait;

use super::pinsel::{Function, Mode, PinConnect};
use super::syscon::Syscon;

/// The level of a digital I/O line
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Level {
    Low,
    High,
}

/// Interface to the GPIO block
///
/// Enabling it gates the GPIO clock on; the enabled handle is what pins
/// need to enter their GPIO states.
pub struct Gpio<State = Enabled> {
    gpio: pac::GPIO,
    _state: PhantomData<State>,
}

impl Gpio<Disabled> {
    pub(crate) fn new(gpio: pac::GPIO) -> Self {
        Gpio {
            gpio,
            _state: PhantomData,
        }
    }

    /// Enable the GPIO block
    pub fn enable(self, syscon: &mut Syscon) -> Gpio<Enabled> {
        syscon.enable_clock(&self.gpio);

        Gpio {
            gpio: self.gpio,
            _state: PhantomData,
        }
    }
}

impl Gpio<Enabled> {
    /// Disable the GPIO block
    ///
    /// Pins handed out while the block was enabled must have been released
    /// before; this consumes the handle they borrow.
    pub fn disable(self, syscon: &mut Syscon) -> Gpio<Disabled> {
        syscon.disable_clock(&self.gpio);

        Gpio {
            gpio: self.gpio,
            _state: PhantomData,
        }
    }

    fn port(&self, port: usize) -> &pac::gpio::Port {
        &self.gpio.port[port]
    }
}

/// Extension methods converting package pins into GPIO pins
pub trait PinExt: PinTrait + Sized {
    /// Configure the pin for digital input
    fn into_input_pin(
        self,
        pinconnect: &mut PinConnect,
        gpio: &Gpio<Enabled>,
    ) -> GpioPin<Self, direction::Input> {
        pinconnect.set_function::<Self>(Function::None);

        unsafe {
            gpio.port(Self::PORT).dir.modify(|dir| dir & !Self::MASK);
        }

        GpioPin::new()
    }

    /// Configure the pin for digital output, at the given initial level
    ///
    /// The initial level is set before the direction flips to output, so
    /// the pin never glitches through the wrong level.
    fn into_output_pin(
        self,
        pinconnect: &mut PinConnect,
        gpio: &Gpio<Enabled>,
        initial: Level,
    ) -> GpioPin<Self, direction::Output> {
        pinconnect.set_function::<Self>(Function::None);

        unsafe {
            match initial {
                Level::High => gpio.port(Self::PORT).set.write(Self::MASK),
                Level::Low => gpio.port(Self::PORT).clr.write(Self::MASK),
            }
            gpio.port(Self::PORT).dir.modify(|dir| dir | Self::MASK);
        }

        GpioPin::new()
    }

    /// Configure the pin as an open-drain output, initially released
    fn into_open_drain_pin(
        self,
        pinconnect: &mut PinConnect,
        gpio: &Gpio<Enabled>,
    ) -> GpioPin<Self, direction::OpenDrain> {
        pinconnect.set_function::<Self>(Function::None);
        pinconnect.set_open_drain::<Self>(true);

        unsafe {
            // released: direction input, output latch low for driving
            gpio.port(Self::PORT).dir.modify(|dir| dir & !Self::MASK);
            gpio.port(Self::PORT).clr.write(Self::MASK);
        }

        GpioPin::new()
    }
}

impl<P: PinTrait> PinExt for P {}

/// A pin in one of its GPIO states
///
/// The `D` parameter tracks the configured direction; only the matching
/// methods are available.
pub struct GpioPin<P, D> {
    _pin: PhantomData<P>,
    _direction: PhantomData<D>,
}

impl<P: PinTrait, D> GpioPin<P, D> {
    fn new() -> Self {
        GpioPin {
            _pin: PhantomData,
            _direction: PhantomData,
        }
    }

    fn port() -> &'static pac::gpio::Port {
        unsafe { &(*pac::GPIO::ptr()).port[P::PORT] }
    }
}

impl<P: PinTrait> GpioPin<P, direction::Input> {
    /// The current level of the pin
    pub fn get(&self) -> Level {
        if Self::port().pin.read() & P::MASK != 0 {
            Level::High
        } else {
            Level::Low
        }
    }

    /// Enable or disable the pull-up
    ///
    /// Disabling leaves the pin floating.
    pub fn enable_pullup(&mut self, pinconnect: &mut PinConnect, enabled: bool) {
        pinconnect.set_mode::<P>(if enabled { Mode::PullUp } else { Mode::Floating });
    }

    /// Enable or disable the pull-down
    pub fn enable_pulldown(&mut self, pinconnect: &mut PinConnect, enabled: bool) {
        pinconnect.set_mode::<P>(if enabled { Mode::PullDown } else { Mode::Floating });
    }
}

impl<P: PinTrait> InputPin for GpioPin<P, direction::Input> {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(Self::port().pin.read() & P::MASK != 0)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(Self::port().pin.read() & P::MASK == 0)
    }
}

impl<P: PinTrait> GpioPin<P, direction::Output> {
    /// Drive the pin high
    pub fn set_high(&mut self) {
        unsafe { Self::port().set.write(P::MASK) }
    }

    /// Drive the pin low
    pub fn set_low(&mut self) {
        unsafe { Self::port().clr.write(P::MASK) }
    }

    /// Drive the pin to the given level
    pub fn set(&mut self, level: Level) {
        match level {
            Level::High => self.set_high(),
            Level::Low => self.set_low(),
        }
    }
}

impl<P: PinTrait> OutputPin for GpioPin<P, direction::Output> {
    type Error = Infallible;

    fn set_high(&mut self) -> Result<(), Self::Error> {
        GpioPin::set_high(self);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        GpioPin::set_low(self);
        Ok(())
    }
}

impl<P: PinTrait> StatefulOutputPin for GpioPin<P, direction::Output> {
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(Self::port().pin.read() & P::MASK != 0)
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(Self::port().pin.read() & P::MASK == 0)
    }
}

impl<P: PinTrait> ToggleableOutputPin for GpioPin<P, direction::Output> {
    type Error = Infallible;

    fn toggle(&mut self) -> Result<(), Self::Error> {
        if self.is_set_high()? {
            GpioPin::set_low(self);
        } else {
            GpioPin::set_high(self);
        }
        Ok(())
    }
}

impl<P: PinTrait> GpioPin<P, direction::OpenDrain> {
    /// Release the pin (true) or drive it low (false)
    ///
    /// Releasing flips the direction to input so the line floats high
    /// through its external pull-up; driving flips it to output with the
    /// latch held low.
    pub fn set(&mut self, released: bool) {
        unsafe {
            if released {
                Self::port().dir.modify(|dir| dir & !P::MASK);
            } else {
                Self::port().clr.write(P::MASK);
                Self::port().dir.modify(|dir| dir | P::MASK);
            }
        }
    }

    /// The level currently seen on the line
    pub fn get(&self) -> Level {
        if Self::port().pin.read() & P::MASK != 0 {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Types that mark the configured direction of a [`GpioPin`]
pub mod direction {
    /// The pin reads digital levels
    pub struct Input;

    /// The pin drives digital levels
    pub struct Output;

    /// The pin drives low or releases the line
    pub struct OpenDrain;
}

macro_rules! ports {
    ($(
        $arity:literal => ($($pin:ident/$value:ident),+);
    )*) => {$(
        impl<$($pin: PinTrait,)*> PortOut<($($pin,)*)> {
            const PIN_COUNT: u32 = $arity;

            // all pins of a port type have to share one hardware port;
            // evaluated when the type is used, so a mismatch fails to
            // compile
            #[allow(dead_code)]
            const SAME_PORT: () = {
                let ports = [$($pin::PORT,)*];
                let mut i = 1;
                while i < ports.len() {
                    assert!(
                        ports[i] == ports[0],
                        "all pins of a port must be in the same hardware port",
                    );
                    i += 1;
                }
            };

            const MASK: u32 = $($pin::MASK)|*;

            /// Aggregate the pins into one logical output port
            ///
            /// The first listed pin becomes the most significant bit of the
            /// logical value.
            #[allow(non_snake_case, unused_variables)]
            pub fn new(
                pins: ($($pin,)*),
                pinconnect: &mut PinConnect,
                gpio: &Gpio<Enabled>,
            ) -> Self {
                let _: () = Self::SAME_PORT;

                let ($($value,)*) = pins;
                $(
                    $value.into_output_pin(pinconnect, gpio, Level::Low);
                )*

                PortOut {
                    _pins: PhantomData,
                }
            }

            /// Write a logical value to the pins
            ///
            /// Derives one set mask and one clear mask from the value and
            /// issues at most two register writes.
            pub fn set(&mut self, value: u32) {
                let mut set_mask = 0;
                let mut clr_mask = 0;
                let mut bit = Self::PIN_COUNT;

                $(
                    bit -= 1;
                    if value & (0x1 << bit) != 0 {
                        set_mask |= $pin::MASK;
                    } else {
                        clr_mask |= $pin::MASK;
                    }
                )*

                let port = Self::port();
                unsafe {
                    if set_mask != 0 {
                        port.set.write(set_mask);
                    }
                    if clr_mask != 0 {
                        port.clr.write(clr_mask);
                    }
                }
            }

            /// Read the logical value back from the pin register
            pub fn get(&self) -> u32 {
                let raw = Self::port().pin.read() & Self::MASK;

                let mut value = 0;
                let mut bit = Self::PIN_COUNT;

                $(
                    bit -= 1;
                    if raw & $pin::MASK != 0 {
                        value |= 0x1 << bit;
                    }
                )*

                value
            }

            fn port() -> &'static pac::gpio::Port {
                // SAME_PORT guarantees a single hardware port
                unsafe { &(*pac::GPIO::ptr()).port[first_port(&[$($pin::PORT,)*])] }
            }
        }

        impl<$($pin: PinTrait,)*> PortIn<($($pin,)*)> {
            const PIN_COUNT: u32 = $arity;

            #[allow(dead_code)]
            const SAME_PORT: () = {
                let ports = [$($pin::PORT,)*];
                let mut i = 1;
                while i < ports.len() {
                    assert!(
                        ports[i] == ports[0],
                        "all pins of a port must be in the same hardware port",
                    );
                    i += 1;
                }
            };

            const MASK: u32 = $($pin::MASK)|*;

            /// Aggregate the pins into one logical input port
            #[allow(non_snake_case, unused_variables)]
            pub fn new(
                pins: ($($pin,)*),
                pinconnect: &mut PinConnect,
                gpio: &Gpio<Enabled>,
            ) -> Self {
                let _: () = Self::SAME_PORT;

                let ($($value,)*) = pins;
                $(
                    $value.into_input_pin(pinconnect, gpio);
                )*

                PortIn {
                    _pins: PhantomData,
                }
            }

            /// Read the logical value of the pins
            ///
            /// The first listed pin is the most significant bit.
            pub fn get(&self) -> u32 {
                let raw = unsafe { &(*pac::GPIO::ptr()).port[first_port(&[$($pin::PORT,)*])] }
                    .pin
                    .read()
                    & Self::MASK;

                let mut value = 0;
                let mut bit = Self::PIN_COUNT;

                $(
                    bit -= 1;
                    if raw & $pin::MASK != 0 {
                        value |= 0x1 << bit;
                    }
                )*

                value
            }
        }
    )*};
}

const fn first_port(ports: &[usize]) -> usize {
    ports[0]
}

/// A group of output pins in one hardware port, written as one value
///
/// Created from a tuple of 2 to 8 package pins; the declaration order maps
/// msb-first onto the logical value.
pub struct PortOut<Pins> {
    _pins: PhantomData<Pins>,
}

/// A group of input pins in one hardware port, read as one value
pub struct PortIn<Pins> {
    _pins: PhantomData<Pins>,
}

ports!(
    2 => (P0/v0, P1/v1);
    3 => (P0/v0, P1/v1, P2/v2);
    4 => (P0/v0, P1/v1, P2/v2, P3/v3);
    5 => (P0/v0, P1/v1, P2/v2, P3/v3, P4/v4);
    6 => (P0/v0, P1/v1, P2/v2, P3/v3, P4/v4, P5/v5);
    7 => (P0/v0, P1/v1, P2/v2, P3/v3, P4/v4, P5/v5, P6/v6);
    8 => (P0/v0, P1/v1, P2/v2, P3/v3, P4/v4, P5/v5, P6/v6, P7/v7);
);
