//! General purpose I/O for the LPC802
//!
//! The single PIO0 port has dedicated SET/CLR/NOT and DIRSET/DIRCLR
//! registers, so level and direction changes never read-modify-write.
//! Pull resistors and open-drain mode live in the IOCON block, whose
//! per-pin registers the enabled [`Gpio`] handle owns.
//!
//! See the user manual, chapter 11.

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};

use crate::init_state::{Disabled, Enabled};
use crate::pac::lpc802::{self as pac, iocon};
use crate::pins::PinTrait;

use super::syscon::Syscon;

/// The level of a digital I/O line
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Level {
    Low,
    High,
}

/// Pull resistor configuration, in the IOCON MODE field
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    Floating = 0b00,
    PullDown = 0b01,
    PullUp = 0b10,
    Repeater = 0b11,
}

/// Interface to the GPIO and IOCON blocks
pub struct Gpio<State = Enabled> {
    gpio: pac::GPIO,
    iocon: pac::IOCON,
    _state: PhantomData<State>,
}

impl Gpio<Disabled> {
    pub(crate) fn new(gpio: pac::GPIO, iocon: pac::IOCON) -> Self {
        Gpio {
            gpio,
            iocon,
            _state: PhantomData,
        }
    }

    /// Enable the GPIO and IOCON clocks
    pub fn enable(self, syscon: &mut Syscon) -> Gpio<Enabled> {
        syscon.enable_clock(&self.gpio);
        syscon.enable_clock(&self.iocon);

        Gpio {
            gpio: self.gpio,
            iocon: self.iocon,
            _state: PhantomData,
        }
    }
}

impl Gpio<Enabled> {
    /// Disable the GPIO and IOCON clocks
    pub fn disable(self, syscon: &mut Syscon) -> Gpio<Disabled> {
        syscon.disable_clock(&self.gpio);
        syscon.disable_clock(&self.iocon);

        Gpio {
            gpio: self.gpio,
            iocon: self.iocon,
            _state: PhantomData,
        }
    }
}

fn set_iocon_mode(bit: u8, mode: Mode) {
    let iocon = unsafe { &*pac::IOCON::ptr() };

    unsafe {
        iocon.pio[iocon::index(bit)]
            .modify(|value| (value & !(0b11 << 3)) | ((mode as u32) << 3));
    }
}

fn set_iocon_open_drain(bit: u8, enabled: bool) {
    let iocon = unsafe { &*pac::IOCON::ptr() };

    unsafe {
        iocon.pio[iocon::index(bit)].modify(|value| {
            if enabled {
                value | (0x1 << 10)
            } else {
                value & !(0x1 << 10)
            }
        });
    }
}

/// Extension methods converting package pins into GPIO pins
pub trait PinExt: PinTrait + Sized {
    /// Configure the pin for digital input
    fn into_input_pin(self, _gpio: &Gpio<Enabled>) -> GpioPin<Self, direction::Input> {
        unsafe {
            (*pac::GPIO::ptr()).dirclr0.write(Self::MASK);
        }

        GpioPin::new()
    }

    /// Configure the pin for digital output, at the given initial level
    fn into_output_pin(
        self,
        _gpio: &Gpio<Enabled>,
        initial: Level,
    ) -> GpioPin<Self, direction::Output> {
        unsafe {
            let gpio = &*pac::GPIO::ptr();

            match initial {
                Level::High => gpio.set0.write(Self::MASK),
                Level::Low => gpio.clr0.write(Self::MASK),
            }
            gpio.dirset0.write(Self::MASK);
        }

        GpioPin::new()
    }

    /// Configure the pin as an open-drain output, initially released
    fn into_open_drain_pin(self, _gpio: &Gpio<Enabled>) -> GpioPin<Self, direction::OpenDrain> {
        set_iocon_open_drain(Self::BIT, true);

        unsafe {
            let gpio = &*pac::GPIO::ptr();
            gpio.dirclr0.write(Self::MASK);
            gpio.clr0.write(Self::MASK);
        }

        GpioPin::new()
    }
}

impl<P: PinTrait> PinExt for P {}

/// A pin in one of its GPIO states
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

    fn gpio() -> &'static pac::gpio::RegisterBlock {
        unsafe { &*pac::GPIO::ptr() }
    }
}

impl<P: PinTrait> GpioPin<P, direction::Input> {
    /// The current level of the pin
    pub fn get(&self) -> Level {
        if Self::gpio().pin0.read() & P::MASK != 0 {
            Level::High
        } else {
            Level::Low
        }
    }

    /// Enable or disable the pull-up
    pub fn enable_pullup(&mut self, enabled: bool) {
        set_iocon_mode(P::BIT, if enabled { Mode::PullUp } else { Mode::Floating });
    }

    /// Enable or disable the pull-down
    pub fn enable_pulldown(&mut self, enabled: bool) {
        set_iocon_mode(P::BIT, if enabled { Mode::PullDown } else { Mode::Floating });
    }
}

impl<P: PinTrait> InputPin for GpioPin<P, direction::Input> {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(Self::gpio().pin0.read() & P::MASK != 0)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(Self::gpio().pin0.read() & P::MASK == 0)
    }
}

impl<P: PinTrait> GpioPin<P, direction::Output> {
    /// Drive the pin high
    pub fn set_high(&mut self) {
        unsafe { Self::gpio().set0.write(P::MASK) }
    }

    /// Drive the pin low
    pub fn set_low(&mut self) {
        unsafe { Self::gpio().clr0.write(P::MASK) }
    }

    /// Toggle the pin through the dedicated NOT register
    pub fn toggle(&mut self) {
        unsafe { Self::gpio().not0.write(P::MASK) }
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
        Ok(Self::gpio().pin0.read() & P::MASK != 0)
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(Self::gpio().pin0.read() & P::MASK == 0)
    }
}

impl<P: PinTrait> ToggleableOutputPin for GpioPin<P, direction::Output> {
    type Error = Infallible;

    fn toggle(&mut self) -> Result<(), Self::Error> {
        GpioPin::toggle(self);
        Ok(())
    }
}

impl<P: PinTrait> GpioPin<P, direction::OpenDrain> {
    /// Release the pin (true) or drive it low (false)
    pub fn set(&mut self, released: bool) {
        unsafe {
            let gpio = Self::gpio();

            if released {
                gpio.dirclr0.write(P::MASK);
            } else {
                gpio.clr0.write(P::MASK);
                gpio.dirset0.write(P::MASK);
            }
        }
    }

    /// The level currently seen on the line
    pub fn get(&self) -> Level {
        if Self::gpio().pin0.read() & P::MASK != 0 {
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
