//! HAL for the NXP LPC802
//!
//! The LPC802 routes almost every peripheral signal through its switch
//! matrix: a movable function can be assigned to any suitable pin at run
//! time, with the legality of the combination checked at compile time. See
//! [`swm`] for the routing API.
//!
//! ``` no_run
//! use cmx_hal::embedded_time::rate::{Baud, Hertz};
//! use cmx_hal::lpc802::{usart, Peripherals};
//!
//! let mut p = Peripherals::take().unwrap();
//!
//! let mut handle = p.swm.handle.enable(&mut p.syscon);
//!
//! let u0_txd = p.swm.movable_functions.u0_txd.assign(p.pins.p8, &mut handle);
//! let u0_rxd = p.swm.movable_functions.u0_rxd.assign(p.pins.p9, &mut handle);
//!
//! let clock = usart::Clock::new(Hertz(12_000_000), Baud(115_200));
//! let serial = p.usart0.enable(
//!     &clock,
//!     &mut p.syscon,
//!     u0_txd,
//!     u0_rxd,
//!     usart::Settings::default(),
//! );
//! ```

pub mod gpio;
pub mod pins;
pub mod swm;
pub mod syscon;
pub mod usart;

use crate::init_state::Disabled;
use crate::pac::lpc802 as pac;

#[cfg(feature = "tssop20")]
use self::pins::tssop20 as package;
#[cfg(all(feature = "tssop16", not(feature = "tssop20")))]
use self::pins::tssop16 as package;

/// Entry point to the LPC802 HAL
#[allow(missing_docs)]
pub struct Peripherals {
    /// System configuration: clock gates, resets and clock selection
    pub syscon: syscon::Syscon,

    /// The switch matrix, split into its parts
    pub swm: swm::Parts,

    /// The pins of the selected package
    pub pins: package::Pins,

    /// General purpose I/O
    pub gpio: gpio::Gpio<Disabled>,

    pub usart0: usart::Usart<pac::USART0, Disabled>,
    pub usart1: usart::Usart<pac::USART1, Disabled>,
}

impl Peripherals {
    /// Returns the peripherals, once
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
            swm: swm::Parts::new(p.SWM),
            pins: package::Pins::new(),
            gpio: gpio::Gpio::new(p.GPIO, p.IOCON),
            usart0: usart::Usart::new(p.USART0),
            usart1: usart::Usart::new(p.USART1),
        }
    }
}
