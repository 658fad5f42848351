//! USART driver for the LPC802
//!
//! Enabling a USART takes the assigned switch matrix functions for its TXD
//! and RXD signals as evidence that the pins are routed; the types make
//! sure the functions belong to the right instance. See the [family
//! module] documentation for a complete example.
//!
//! See the user manual, chapter 13.
//!
//! [family module]: ../index.html

use core::convert::Infallible;
use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;

use embedded_hal::blocking::serial::write::Default as BlockingWriteDefault;
use embedded_hal::serial::{Read, Write};
use embedded_time::rate::{Baud, Hertz};

use crate::init_state::{Disabled, Enabled};
use crate::pac::lpc802::{self as pac, usart::RegisterBlock, Interrupt};
use crate::pins::PinTrait;

use super::swm::{Assigned, Function, FunctionTrait};
use super::syscon::{ClockControl, ResetControl, Syscon};

/// Implemented for all USART instances
pub trait Instance:
    private::Sealed + Deref<Target = RegisterBlock> + ClockControl + ResetControl
{
    /// The interrupt that is triggered for this USART
    const INTERRUPT: Interrupt;

    /// The peripheral's index in the clock select register file
    const CLOCK_INDEX: usize;

    /// The movable function carrying this USART's TXD
    type Tx: FunctionTrait;

    /// The movable function carrying this USART's RXD
    type Rx: FunctionTrait;
}

/// Baud rate configuration
///
/// The baud rate generator runs from the main clock with 16x oversampling.
pub struct Clock {
    brgval: u16,
}

impl Clock {
    /// Compute the divider for a main clock and baud rate
    pub fn new(main_clock: Hertz, baud: Baud) -> Self {
        let brgval = ((main_clock.0 >> 4) / baud.0).saturating_sub(1) as u16;

        Clock { brgval }
    }
}

/// Word length, parity and stop bit settings; the default is 8N1
pub struct Settings {
    /// Word length in bits, 7 to 9
    pub word_length: u8,

    /// Two stop bits instead of one
    pub two_stop_bits: bool,

    /// Parity: `None`, or `Some(even)`
    pub parity: Option<bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            word_length: 8,
            two_stop_bits: false,
            parity: None,
        }
    }
}

impl Settings {
    fn cfg(&self) -> u32 {
        // enable, with the frame format in the upper fields
        let mut cfg = 0x1;

        cfg |= match self.word_length {
            7 => 0b00 << 2,
            9 => 0b10 << 2,
            _ => 0b01 << 2,
        };

        match self.parity {
            Some(true) => cfg |= 0b10 << 4,
            Some(false) => cfg |= 0b11 << 4,
            None => {}
        }

        if self.two_stop_bits {
            cfg |= 0x1 << 6;
        }

        cfg
    }
}

/// A receive error
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// Character was received while the receiver was full
    Overrun,

    /// The received stop bit was low
    Framing,

    /// The received parity did not match
    Parity,

    /// The line was noisy around a sample point
    Noise,
}

/// Interface to a USART
pub struct Usart<I, State> {
    usart: I,
    _state: PhantomData<State>,
}

impl<I: Instance> Usart<I, Disabled> {
    pub(crate) fn new(usart: I) -> Self {
        Usart {
            usart,
            _state: PhantomData,
        }
    }

    /// Enable the USART
    ///
    /// Takes the assigned TXD and RXD functions as proof that the signals
    /// are routed to pins; functions of another instance are rejected at
    /// compile time.
    pub fn enable<TxPin, RxPin>(
        self,
        clock: &Clock,
        syscon: &mut Syscon,
        _tx: Function<I::Tx, Assigned<TxPin>>,
        _rx: Function<I::Rx, Assigned<RxPin>>,
        settings: Settings,
    ) -> Usart<I, Enabled>
    where
        TxPin: PinTrait,
        RxPin: PinTrait,
    {
        syscon.enable_clock(&self.usart);
        syscon.reset(&self.usart);
        syscon.select_main_clock(I::CLOCK_INDEX);

        unsafe {
            self.usart.osr.write(16 - 1);
            self.usart.brg.write(u32::from(clock.brgval));
            self.usart.cfg.write(settings.cfg());
        }

        Usart {
            usart: self.usart,
            _state: PhantomData,
        }
    }
}

impl<I: Instance> Usart<I, Enabled> {
    /// Disable the USART
    pub fn disable(self, syscon: &mut Syscon) -> Usart<I, Disabled> {
        unsafe {
            self.usart.cfg.modify(|cfg| cfg & !0x1);
        }
        syscon.disable_clock(&self.usart);

        Usart {
            usart: self.usart,
            _state: PhantomData,
        }
    }

    /// Enable this instance's interrupt in the NVIC
    pub fn enable_in_nvic(&mut self) {
        // Safe, because there's no critical section here that this could
        // interfere with.
        unsafe { cortex_m::peripheral::NVIC::unmask(I::INTERRUPT) };
    }

    /// Enable the receive-ready interrupt
    pub fn enable_rx_interrupt(&mut self) {
        unsafe {
            self.usart.intenset.modify(|set| set | 0x1);
        }
    }

    /// Disable the receive-ready interrupt
    pub fn disable_rx_interrupt(&mut self) {
        unsafe {
            self.usart.intenclr.write(0x1);
        }
    }

    /// Return the raw peripheral
    pub fn free(self) -> I {
        self.usart
    }
}

impl<I: Instance> Read<u8> for Usart<I, Enabled> {
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let stat = self.usart.stat.read();

        if stat & (0x1 << 8) != 0 {
            unsafe { self.usart.stat.write(0x1 << 8) };
            return Err(nb::Error::Other(Error::Overrun));
        }
        if stat & (0x1 << 13) != 0 {
            unsafe { self.usart.stat.write(0x1 << 13) };
            return Err(nb::Error::Other(Error::Framing));
        }
        if stat & (0x1 << 14) != 0 {
            unsafe { self.usart.stat.write(0x1 << 14) };
            return Err(nb::Error::Other(Error::Parity));
        }
        if stat & (0x1 << 15) != 0 {
            unsafe { self.usart.stat.write(0x1 << 15) };
            return Err(nb::Error::Other(Error::Noise));
        }

        // receive ready
        if stat & 0x1 == 0 {
            return Err(nb::Error::WouldBlock);
        }

        Ok(self.usart.rxdat.read() as u8)
    }
}

impl<I: Instance> Write<u8> for Usart<I, Enabled> {
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        // transmit ready
        if self.usart.stat.read() & (0x1 << 2) == 0 {
            return Err(nb::Error::WouldBlock);
        }

        unsafe {
            self.usart.txdat.write(u32::from(word));
        }

        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        // transmitter idle
        if self.usart.stat.read() & (0x1 << 3) == 0 {
            return Err(nb::Error::WouldBlock);
        }

        Ok(())
    }
}

impl<I: Instance> BlockingWriteDefault<u8> for Usart<I, Enabled> {}

impl<I: Instance> fmt::Write for Usart<I, Enabled> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        use embedded_hal::blocking::serial::Write;

        self.bwrite_all(s.as_bytes()).map_err(|_| fmt::Error)?;
        self.bflush().map_err(|_| fmt::Error)
    }
}

macro_rules! instances {
    (
        $(
            $instance:ident, $interrupt:ident, $clock_index:expr, $tx:ident, $rx:ident;
        )*
    ) => {
        $(
            impl private::Sealed for pac::$instance {}

            impl Instance for pac::$instance {
                const INTERRUPT: Interrupt = Interrupt::$interrupt;
                const CLOCK_INDEX: usize = $clock_index;

                type Tx = super::swm::$tx;
                type Rx = super::swm::$rx;
            }
        )*
    };
}

instances!(
    USART0, UART0, 0, U0_TXD, U0_RXD;
    USART1, UART1, 1, U1_TXD, U1_RXD;
);

mod private {
    pub trait Sealed {}
}
