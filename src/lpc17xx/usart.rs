//! UART driver for the LPC17xx
//!
//! The LPC17xx UARTs are 16550-style peripherals with 16 byte FIFOs. The
//! driver follows the usual type-state pattern: a disabled [`Usart`] comes
//! out of [`Peripherals`], [`enable`] routes the TXD/RXD pins, sets up the
//! baud rate and returns an enabled instance implementing the
//! `embedded-hal` serial traits.
//!
//! ``` ignore
//! use cmx_hal::embedded_time::rate::{Baud, Hertz};
//! use cmx_hal::lpc17xx::{usart, Peripherals};
//! use cmx_hal::prelude::*;
//! use core::fmt::Write;
//!
//! let mut p = Peripherals::take().unwrap();
//!
//! let clock = usart::Clock::new(Hertz(25_000_000), Baud(115_200));
//! let mut serial = p.uart0.enable(
//!     &clock,
//!     &mut p.syscon,
//!     &mut p.pinconnect,
//!     p.pins.p75,
//!     p.pins.p74,
//!     usart::Settings::default(),
//! );
//!
//! writeln!(serial, "hello").unwrap();
//! ```
//!
//! See the user manual, chapter 14.
//!
//! [`Peripherals`]: ../struct.Peripherals.html
//! [`enable`]: struct.Usart.html#method.enable

use core::convert::Infallible;
use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;

use embedded_hal::blocking::serial::write::Default as BlockingWriteDefault;
use embedded_hal::serial::{Read, Write};
use embedded_time::rate::{Baud, Hertz};

use crate::init_state::{Disabled, Enabled};
use crate::pac::lpc17xx::{self as pac, uart::RegisterBlock, Interrupt};
use crate::pins::PinTrait;

use super::pinsel::{Function, PinConnect};
use super::syscon::{ClockControl, Syscon};

/// Implemented for all UART instances
pub trait Instance:
    private::Sealed + Deref<Target = RegisterBlock> + ClockControl
{
    /// The interrupt that is triggered for this UART
    const INTERRUPT: Interrupt;
}

/// Implemented by pins that can carry this instance's TXD signal
pub trait TxdPin<I: Instance>: PinTrait {
    /// The alternate function that routes TXD to the pin
    const FUNCTION: Function;
}

/// Implemented by pins that can carry this instance's RXD signal
pub trait RxdPin<I: Instance>: PinTrait {
    /// The alternate function that routes RXD to the pin
    const FUNCTION: Function;
}

/// Baud rate configuration
///
/// The divisor is derived from the peripheral clock; the fractional
/// divider is left at its neutral setting, which gives exact rates for
/// the usual crystal frequencies.
pub struct Clock {
    divisor: u16,
}

impl Clock {
    /// Compute the divisor for a peripheral clock and baud rate
    pub fn new(pclk: Hertz, baud: Baud) -> Self {
        let divisor = (pclk.0 / (16 * baud.0)) as u16;

        Clock { divisor }
    }
}

/// Word length, parity and stop bit settings
///
/// The default is 8N1.
pub struct Settings {
    /// Word length in bits, 5 to 8
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
    fn lcr(&self) -> u32 {
        let mut lcr = u32::from(self.word_length.clamp(5, 8) - 5);

        if self.two_stop_bits {
            lcr |= 0x1 << 2;
        }

        if let Some(even) = self.parity {
            lcr |= 0x1 << 3;
            if even {
                lcr |= 0x1 << 4;
            }
        }

        lcr
    }
}

/// A receive error
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// Character was received while the receive buffer was full
    Overrun,

    /// The received parity did not match
    Parity,

    /// The received stop bit was low
    Framing,

    /// A break condition occupied the line
    Break,
}

/// Interface to a UART
///
/// The type parameters identify the hardware instance and track whether it
/// is enabled.
pub struct Usart<I, State> {
    uart: I,
    _state: PhantomData<State>,
}

impl<I: Instance> Usart<I, Disabled> {
    pub(crate) fn new(uart: I) -> Self {
        Usart {
            uart,
            _state: PhantomData,
        }
    }

    /// Enable the UART
    ///
    /// Routes TXD and RXD to the given pins, enables the peripheral clock
    /// and configures baud rate and frame format. Passing a pin that
    /// cannot carry the signal for this instance fails to compile.
    pub fn enable<Txd, Rxd>(
        self,
        clock: &Clock,
        syscon: &mut Syscon,
        pinconnect: &mut PinConnect,
        _txd: Txd,
        _rxd: Rxd,
        settings: Settings,
    ) -> Usart<I, Enabled>
    where
        Txd: TxdPin<I>,
        Rxd: RxdPin<I>,
    {
        syscon.enable_clock(&self.uart);

        pinconnect.set_function::<Txd>(Txd::FUNCTION);
        pinconnect.set_function::<Rxd>(Rxd::FUNCTION);

        unsafe {
            // divisor latch access to program the baud rate
            self.uart.lcr.write(settings.lcr() | (0x1 << 7));
            self.uart
                .rbr_thr_dll
                .write(u32::from(clock.divisor & 0xff));
            self.uart.ier_dlm.write(u32::from(clock.divisor >> 8));
            self.uart.lcr.write(settings.lcr());

            // enable and reset the FIFOs
            self.uart.iir_fcr.write(0b111);

            // transmitter enabled
            self.uart.ter.write(0x1 << 7);
        }

        Usart {
            uart: self.uart,
            _state: PhantomData,
        }
    }
}

impl<I: Instance> Usart<I, Enabled> {
    /// Disable the UART
    pub fn disable(self, syscon: &mut Syscon) -> Usart<I, Disabled> {
        syscon.disable_clock(&self.uart);

        Usart {
            uart: self.uart,
            _state: PhantomData,
        }
    }

    /// Enable this instance's interrupt in the NVIC
    ///
    /// This only unmasks the NVIC line; the receive data available
    /// interrupt still has to be enabled in the peripheral.
    pub fn enable_in_nvic(&mut self) {
        // Safe, because there's no critical section here that this could
        // interfere with.
        unsafe { cortex_m::peripheral::NVIC::unmask(I::INTERRUPT) };
    }

    /// Disable this instance's interrupt in the NVIC
    pub fn disable_in_nvic(&mut self) {
        cortex_m::peripheral::NVIC::mask(I::INTERRUPT);
    }

    /// Enable the receive data available interrupt
    pub fn enable_rx_interrupt(&mut self) {
        unsafe {
            self.uart.ier_dlm.modify(|ier| ier | 0x1);
        }
    }

    /// Disable the receive data available interrupt
    pub fn disable_rx_interrupt(&mut self) {
        unsafe {
            self.uart.ier_dlm.modify(|ier| ier & !0x1);
        }
    }

    /// Return the raw peripheral
    ///
    /// This is an escape hatch from the HAL API: it hands back the raw
    /// register block, without the limitations the API imposes.
    pub fn free(self) -> I {
        self.uart
    }
}

impl<I: Instance> Read<u8> for Usart<I, Enabled> {
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let lsr = self.uart.lsr.read();

        // receive errors come with the character that caused them
        if lsr & (0x1 << 1) != 0 {
            return Err(nb::Error::Other(Error::Overrun));
        }
        if lsr & (0x1 << 7) != 0 {
            if lsr & (0x1 << 4) != 0 {
                return Err(nb::Error::Other(Error::Break));
            }
            if lsr & (0x1 << 2) != 0 {
                return Err(nb::Error::Other(Error::Parity));
            }
            return Err(nb::Error::Other(Error::Framing));
        }

        if lsr & 0x1 == 0 {
            return Err(nb::Error::WouldBlock);
        }

        Ok(self.uart.rbr_thr_dll.read() as u8)
    }
}

impl<I: Instance> Write<u8> for Usart<I, Enabled> {
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        // transmit holding register empty
        if self.uart.lsr.read() & (0x1 << 5) == 0 {
            return Err(nb::Error::WouldBlock);
        }

        unsafe {
            self.uart.rbr_thr_dll.write(u32::from(word));
        }

        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        // transmitter empty: FIFO and shift register drained
        if self.uart.lsr.read() & (0x1 << 6) == 0 {
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
            $instance:ident, $interrupt:ident;
        )*
    ) => {
        $(
            impl private::Sealed for pac::$instance {}

            impl Instance for pac::$instance {
                const INTERRUPT: Interrupt = Interrupt::$interrupt;
            }
        )*
    };
}

instances!(
    UART0, UART0;
    UART2, UART2;
    UART3, UART3;
);

mod private {
    pub trait Sealed {}
}

/// The legal (pin, function) routes per package
///
/// Only pins listed here can be passed to [`Usart::enable`]; anything else
/// is rejected at compile time.
mod routes {
    use super::*;

    macro_rules! routes {
        ($($role:ident<$instance:ident> for $pin:ty => $function:ident;)*) => {
            $(
                impl $role<pac::$instance> for $pin {
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
        // UART0 on P0.2/P0.3
        TxdPin<UART0> for pins::P75 => Func1;
        RxdPin<UART0> for pins::P74 => Func1;
        // UART2 on P0.10/P0.11
        TxdPin<UART2> for pins::P64 => Func1;
        RxdPin<UART2> for pins::P63 => Func1;
        // UART3 on P0.0/P0.1
        TxdPin<UART3> for pins::P77 => Func2;
        RxdPin<UART3> for pins::P76 => Func2;
    );

    #[cfg(feature = "lqfp208")]
    routes!(
        // UART0 on P0.2/P0.3
        TxdPin<UART0> for pins::P202 => Func1;
        RxdPin<UART0> for pins::P204 => Func1;
        // UART2 on P0.10/P0.11
        TxdPin<UART2> for pins::P98 => Func1;
        RxdPin<UART2> for pins::P100 => Func1;
        // UART3 on P0.0/P0.1
        TxdPin<UART3> for pins::P94 => Func2;
        RxdPin<UART3> for pins::P96 => Func2;
    );
}
