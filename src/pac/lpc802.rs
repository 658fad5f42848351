//! Register bindings for the NXP LPC802
//!
//! Register layouts follow the LPC802 user manual (UM11045).

use volatile_register::{RO, RW, WO};

/// The interrupt lines of the LPC802 NVIC
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs, non_camel_case_types, clippy::upper_case_acronyms)]
pub enum Interrupt {
    SPI0 = 0,
    UART0 = 3,
    UART1 = 4,
    I2C0 = 8,
    MRT = 10,
    CMP = 11,
    WDT = 12,
    BOD = 13,
    FLASH = 14,
    WKT = 15,
    ADC_SEQA = 16,
    ADC_SEQB = 17,
    ADC_THCMP = 18,
    ADC_OVR = 19,
    CTIMER0 = 23,
    PININT0 = 24,
    PININT1 = 25,
    PININT2 = 26,
    PININT3 = 27,
    PININT4 = 28,
    PININT5 = 29,
    PININT6 = 30,
    PININT7 = 31,
}

unsafe impl cortex_m::interrupt::InterruptNumber for Interrupt {
    #[inline]
    fn number(self) -> u16 {
        self as u16
    }
}

/// System configuration (SYSCON)
pub mod syscon {
    use super::*;

    /// Registers of the SYSCON block, partial
    #[repr(C)]
    pub struct RegisterBlock {
        _reserved0: [u32; 32],
        /// System clock control: peripheral clock gates (0x080)
        pub sysahbclkctrl0: RW<u32>,
        _reserved1: u32,
        /// Peripheral reset control (0x088)
        pub presetctrl0: RW<u32>,
        _reserved2: [u32; 129],
        /// Peripheral clock source select (0x290)
        pub fclksel: [RW<u32>; 11],
    }
}

/// Switch matrix (SWM)
pub mod swm {
    use super::*;

    /// Registers of the switch matrix
    ///
    /// Movable functions are assigned by writing a pin number into one of
    /// the byte-wide fields of the `pinassign` words; 0xFF disconnects the
    /// function. Fixed functions are enabled through `pinenable0` (a zero
    /// bit enables the function on its fixed pin).
    #[repr(C)]
    pub struct RegisterBlock {
        /// Pin assignment, four movable functions per word (0x000)
        pub pinassign: [RW<u32>; 8],
        _reserved0: [u32; 102],
        /// Fixed function enables (0x1B8)
        pub pinenable0: RW<u32>,
    }
}

/// I/O configuration (IOCON)
pub mod iocon {
    use super::*;

    /// Registers of the IOCON block
    ///
    /// One configuration word per pin, in the vendor's scrambled order; use
    /// [`index`] to map a pin number to its register.
    ///
    /// [`index`]: fn.index.html
    #[repr(C)]
    pub struct RegisterBlock {
        /// The per-pin configuration words (0x000)
        pub pio: [RW<u32>; 19],
    }

    /// The IOCON register index for a PIO0 pin number
    ///
    /// The order is fixed by the hardware; see the register map in the user
    /// manual.
    pub const fn index(bit: u8) -> usize {
        match bit {
            17 => 0,
            13 => 1,
            12 => 2,
            5 => 3,
            4 => 4,
            3 => 5,
            2 => 6,
            11 => 7,
            10 => 8,
            16 => 9,
            15 => 10,
            1 => 11,
            9 => 13,
            8 => 14,
            7 => 15,
            6 => 16,
            0 => 17,
            14 => 18,
            // reserved slot; writes end up in the hole at offset 0x30
            _ => 12,
        }
    }
}

/// General purpose I/O
pub mod gpio {
    use super::*;

    /// Registers of the GPIO block, word-access part
    #[repr(C)]
    pub struct RegisterBlock {
        _reserved0: [u32; 2048],
        /// Direction, 1 = output (0x2000)
        pub dir0: RW<u32>,
        _reserved1: [u32; 31],
        /// Access mask (0x2080)
        pub mask0: RW<u32>,
        _reserved2: [u32; 31],
        /// Pin value (0x2100)
        pub pin0: RW<u32>,
        _reserved3: [u32; 31],
        /// Masked pin value (0x2180)
        pub mpin0: RW<u32>,
        _reserved4: [u32; 31],
        /// Output set (0x2200)
        pub set0: RW<u32>,
        _reserved5: [u32; 31],
        /// Output clear (0x2280)
        pub clr0: WO<u32>,
        _reserved6: [u32; 31],
        /// Output toggle (0x2300)
        pub not0: WO<u32>,
        _reserved7: [u32; 31],
        /// Direction set (0x2380)
        pub dirset0: WO<u32>,
        _reserved8: [u32; 31],
        /// Direction clear (0x2400)
        pub dirclr0: WO<u32>,
        _reserved9: [u32; 31],
        /// Direction toggle (0x2480)
        pub dirnot0: WO<u32>,
    }
}

/// USART
pub mod usart {
    use super::*;

    /// Registers of a USART
    #[repr(C)]
    pub struct RegisterBlock {
        /// Configuration (0x00)
        pub cfg: RW<u32>,
        /// Control (0x04)
        pub ctl: RW<u32>,
        /// Status; write 1 to clear (0x08)
        pub stat: RW<u32>,
        /// Interrupt enable set (0x0C)
        pub intenset: RW<u32>,
        /// Interrupt enable clear (0x10)
        pub intenclr: WO<u32>,
        /// Receive data (0x14)
        pub rxdat: RO<u32>,
        /// Receive data with status (0x18)
        pub rxdatstat: RO<u32>,
        /// Transmit data (0x1C)
        pub txdat: RW<u32>,
        /// Baud rate generator (0x20)
        pub brg: RW<u32>,
        /// Interrupt status (0x24)
        pub intstat: RO<u32>,
        /// Oversample selection (0x28)
        pub osr: RW<u32>,
        /// Address for RS-485 mode (0x2C)
        pub addr: RW<u32>,
    }
}

peripheral! {
    /// System configuration
    SYSCON, syscon::RegisterBlock, 0x4004_8000;
}

peripheral! {
    /// Switch matrix
    SWM, swm::RegisterBlock, 0x4000_C000;
}

peripheral! {
    /// I/O configuration
    IOCON, iocon::RegisterBlock, 0x4004_4000;
}

peripheral! {
    /// General purpose I/O
    GPIO, gpio::RegisterBlock, 0xA000_0000;
}

peripheral! {
    /// USART0
    USART0, usart::RegisterBlock, 0x4006_4000;
}

peripheral! {
    /// USART1
    USART1, usart::RegisterBlock, 0x4006_8000;
}

/// All peripherals of the chip
#[allow(non_snake_case, missing_docs)]
pub struct Peripherals {
    pub SYSCON: SYSCON,
    pub SWM: SWM,
    pub IOCON: IOCON,
    pub GPIO: GPIO,
    pub USART0: USART0,
    pub USART1: USART1,
}

impl Peripherals {
    /// Unchecked version of [`Peripherals::take`]
    ///
    /// # Safety
    ///
    /// Creates duplicate peripheral singletons; the caller must make sure
    /// no register block ends up with two owners.
    pub unsafe fn steal() -> Self {
        Peripherals {
            SYSCON: SYSCON::new(),
            SWM: SWM::new(),
            IOCON: IOCON::new(),
            GPIO: GPIO::new(),
            USART0: USART0::new(),
            USART1: USART1::new(),
        }
    }
}

take_api!();
