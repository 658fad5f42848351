//! SPI master driver for the LPC17xx legacy SPI controller
//!
//! A single-buffered full-duplex master. [`enable`] routes the SCK, MOSI
//! and MISO pins (all on alternate function 3), sets the clock rate and
//! mode, and returns an enabled instance implementing
//! `embedded_hal::spi::FullDuplex`. Slave select is left to a GPIO pin, as
//! usual for masters driving more than one device.
//!
//! See the user manual, chapter 17.
//!
//! [`enable`]: struct.Spi.html#method.enable

use core::marker::PhantomData;

use embedded_hal::spi::{FullDuplex, Mode, Phase, Polarity};
use embedded_time::rate::Hertz;

use crate::init_state::{Disabled, Enabled};
use crate::pac::lpc17xx as pac;
use crate::pins::PinTrait;

use super::pinsel::{Function, PinConnect};
use super::syscon::Syscon;

/// Implemented by pins that can carry the SPI clock
pub trait SckPin: PinTrait {
    /// The alternate function that routes SCK to the pin
    const FUNCTION: Function;
}

/// Implemented by pins that can carry MOSI
pub trait MosiPin: PinTrait {
    /// The alternate function that routes MOSI to the pin
    const FUNCTION: Function;
}

/// Implemented by pins that can carry MISO
pub trait MisoPin: PinTrait {
    /// The alternate function that routes MISO to the pin
    const FUNCTION: Function;
}

/// A transfer error
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// Write collision: data register written during a transfer
    WriteCollision,

    /// The transfer was aborted (mode fault or slave abort)
    Aborted,
}

/// Interface to the SPI controller
pub struct Spi<State> {
    spi: pac::SPI,
    _state: PhantomData<State>,
}

impl Spi<Disabled> {
    pub(crate) fn new(spi: pac::SPI) -> Self {
        Spi {
            spi,
            _state: PhantomData,
        }
    }

    /// Enable the controller as a master
    ///
    /// The clock rate is derived from the peripheral clock; the divider
    /// must be an even value of at least 8, so the nearest achievable rate
    /// at or below `rate` is used.
    pub fn enable<Sck, Mosi, Miso>(
        self,
        pclk: Hertz,
        rate: Hertz,
        mode: Mode,
        syscon: &mut Syscon,
        pinconnect: &mut PinConnect,
        _sck: Sck,
        _mosi: Mosi,
        _miso: Miso,
    ) -> Spi<Enabled>
    where
        Sck: SckPin,
        Mosi: MosiPin,
        Miso: MisoPin,
    {
        syscon.enable_clock(&self.spi);

        pinconnect.set_function::<Sck>(Sck::FUNCTION);
        pinconnect.set_function::<Mosi>(Mosi::FUNCTION);
        pinconnect.set_function::<Miso>(Miso::FUNCTION);

        // even divider, 8 minimum
        let divider = ((pclk.0 + rate.0 - 1) / rate.0).max(8) & !0x1;

        let mut spcr = 0x1 << 5; // master mode
        if mode.polarity == Polarity::IdleHigh {
            spcr |= 0x1 << 4;
        }
        if mode.phase == Phase::CaptureOnSecondTransition {
            spcr |= 0x1 << 3;
        }

        unsafe {
            self.spi.spccr.write(divider);
            self.spi.spcr.write(spcr);
        }

        Spi {
            spi: self.spi,
            _state: PhantomData,
        }
    }
}

impl Spi<Enabled> {
    /// Disable the controller
    pub fn disable(self, syscon: &mut Syscon) -> Spi<Disabled> {
        syscon.disable_clock(&self.spi);

        Spi {
            spi: self.spi,
            _state: PhantomData,
        }
    }
}

impl FullDuplex<u8> for Spi<Enabled> {
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let spsr = self.spi.spsr.read();

        if spsr & (0x1 << 6) != 0 {
            return Err(nb::Error::Other(Error::WriteCollision));
        }
        if spsr & ((0x1 << 4) | (0x1 << 3)) != 0 {
            return Err(nb::Error::Other(Error::Aborted));
        }

        // transfer complete flag, cleared by the status read above
        if spsr & (0x1 << 7) == 0 {
            return Err(nb::Error::WouldBlock);
        }

        Ok(self.spi.spdr.read() as u8)
    }

    fn send(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        unsafe {
            self.spi.spdr.write(u32::from(word));
        }

        Ok(())
    }
}

/// The legal (pin, function) routes per package
mod routes {
    use super::*;

    macro_rules! routes {
        ($($role:ident for $pin:ty => $function:ident;)*) => {
            $(
                impl $role for $pin {
                    const FUNCTION: Function = Function::$function;
                }
            )*
        };
    }

    #[cfg(all(feature = "lqfp80", not(feature = "lqfp208")))]
    use super::super::pins::lqfp80 as pins;
    #[cfg(feature = "lqfp208")]
    use super::super::pins::lqfp208 as pins;

    #[cfg(all(feature = "lqfp80", not(feature = "lqfp208")))]
    routes!(
        // SPI on P0.15/P0.17/P0.18
        SckPin for pins::P58 => Func3;
        MisoPin for pins::P56 => Func3;
        MosiPin for pins::P55 => Func3;
    );

    #[cfg(feature = "lqfp208")]
    routes!(
        // SPI on P0.15/P0.17/P0.18
        SckPin for pins::P128 => Func3;
        MisoPin for pins::P126 => Func3;
        MosiPin for pins::P124 => Func3;
    );
}
