//! HAL for the NXP LPC17xx family (LPC1756, LPC1788)
//!
//! The entry point is [`Peripherals`]:
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

pub mod dma;
pub mod gpio;
pub mod pins;
pub mod pinsel;
pub mod spi;
pub mod syscon;
pub mod timer;
pub mod usart;
pub mod usb;

use crate::init_state::Disabled;
use crate::pac::lpc17xx as pac;

#[cfg(feature = "lqfp208")]
use self::pins::lqfp208 as package;
#[cfg(all(feature = "lqfp80", not(feature = "lqfp208")))]
use self::pins::lqfp80 as package;

/// Entry point to the LPC17xx HAL
///
/// Provides access to all peripherals the HAL covers, with the package's
/// pins split out into [`pins`]. Only one instance can exist in a program.
#[allow(missing_docs)]
pub struct Peripherals {
    /// System control: clock gates and peripheral clock dividers
    pub syscon: syscon::Syscon,

    /// The pin connect block: pin functions, modes and open drain
    pub pinconnect: pinsel::PinConnect,

    /// The pins of the selected package
    pub pins: package::Pins,

    /// General purpose I/O, all ports
    pub gpio: gpio::Gpio<Disabled>,

    pub uart0: usart::Usart<pac::UART0, Disabled>,
    pub uart2: usart::Usart<pac::UART2, Disabled>,
    pub uart3: usart::Usart<pac::UART3, Disabled>,

    pub spi: spi::Spi<Disabled>,

    pub timer0: timer::Timer<pac::TIMER0, Disabled>,
    pub timer1: timer::Timer<pac::TIMER1, Disabled>,
    pub timer2: timer::Timer<pac::TIMER2, Disabled>,
    pub timer3: timer::Timer<pac::TIMER3, Disabled>,

    /// The DMA controller
    pub dma: dma::Dma<Disabled>,

    /// The raw USB register blocks, consumed by [`usb::Usb::init`]
    pub usb: pac::USB,
    /// USB clock control, consumed by [`usb::Usb::init`]
    pub usbclk: pac::USBCLK,
}

impl Peripherals {
    /// Returns the peripherals, once
    ///
    /// The first call returns `Some`; every later call returns `None`.
    pub fn take() -> Option<Self> {
        let p = pac::Peripherals::take()?;
        Some(Self::from_pac(p))
    }

    /// Unchecked version of [`Peripherals::take`]
    ///
    /// # Safety
    ///
    /// Creates duplicate peripheral singletons; the caller must make sure
    /// no register block ends up with two owners.
    pub unsafe fn steal() -> Self {
        Self::from_pac(pac::Peripherals::steal())
    }

    fn from_pac(p: pac::Peripherals) -> Self {
        Peripherals {
            syscon: syscon::Syscon::new(p.SYSCON),
            pinconnect: pinsel::PinConnect::new(p.PINCONNECT),
            pins: package::Pins::new(),
            gpio: gpio::Gpio::new(p.GPIO),
            uart0: usart::Usart::new(p.UART0),
            uart2: usart::Usart::new(p.UART2),
            uart3: usart::Usart::new(p.UART3),
            spi: spi::Spi::new(p.SPI),
            timer0: timer::Timer::new(p.TIMER0),
            timer1: timer::Timer::new(p.TIMER1),
            timer2: timer::Timer::new(p.TIMER2),
            timer3: timer::Timer::new(p.TIMER3),
            dma: dma::Dma::new(p.GPDMA),
            usb: p.USB,
            usbclk: p.USBCLK,
        }
    }
}
