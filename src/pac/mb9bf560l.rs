//! Register bindings for the Cypress (Spansion) MB9BF560L
//!
//! Only the blocks the USB device driver needs are bound. The USB function
//! registers are 16 bits wide on 32 bit boundaries; layouts follow the FM4
//! peripheral manual.

use volatile_register::{RO, RW};

/// The interrupt lines of the MB9BF560L NVIC, partial
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs, clippy::upper_case_acronyms)]
pub enum Interrupt {
    USB0F = 65,
}

unsafe impl cortex_m::interrupt::InterruptNumber for Interrupt {
    #[inline]
    fn number(self) -> u16 {
        self as u16
    }
}

/// A 16 bit register padded to its 32 bit slot
#[repr(C)]
pub struct Reg16 {
    /// The register
    pub reg: RW<u16>,
    _reserved: u16,
}

/// USB function registers
pub mod usb {
    use super::*;

    /// Registers of the USB function block, device part (0x40042100)
    ///
    /// Endpoint 0 has separate IN and OUT status registers (`ep0is`,
    /// `ep0os`); the higher endpoints share one status register each.
    #[repr(C)]
    pub struct RegisterBlock {
        /// Host control (0x00)
        pub hcnt: RW<u16>,
        _reserved0: u16,
        _reserved1: [u32; 7],
        /// UDC control: reset, power mode, clock (0x20)
        pub udcc: RW<u16>,
        _reserved2: u16,
        /// Endpoint control EP0C..EP5C (0x24)
        pub epc: [Reg16; 6],
        /// Timestamp (0x3C)
        pub tmsp: RO<u16>,
        _reserved3: u16,
        /// UDC status: the bus event flags (0x40)
        pub udcs: RW<u16>,
        _reserved4: u16,
        /// UDC interrupt enable (0x44)
        pub udcie: RW<u16>,
        _reserved5: u16,
        /// Endpoint 0 IN status (0x48)
        pub ep0is: RW<u16>,
        _reserved6: u16,
        /// Endpoint 0 OUT status (0x4C)
        pub ep0os: RW<u16>,
        _reserved7: u16,
        /// Endpoint status EP1S..EP5S (0x50)
        pub eps: [Reg16; 5],
        /// Endpoint data EP0DT..EP5DT (0x64)
        pub epdt: [Reg16; 6],
    }
}

/// USB clock control
pub mod usbclk {
    use super::*;

    /// Registers of the USB clock block
    #[repr(C)]
    pub struct RegisterBlock {
        /// USB clock enable (0x00)
        pub uccr: RW<u8>,
        _reserved0: [u8; 3],
        /// USB PLL control 1 (0x04)
        pub upcr1: RW<u8>,
        _reserved1: [u8; 3],
        /// USB PLL control 2 (0x08)
        pub upcr2: RW<u8>,
        _reserved2: [u8; 3],
        /// USB PLL status: lock (0x0C)
        pub upcr3: RO<u8>,
        _reserved3: [u8; 3],
    }
}

peripheral! {
    /// USB function 0, device registers
    USB0, usb::RegisterBlock, 0x4004_2100;
}

peripheral! {
    /// USB clock control
    USBCLK, usbclk::RegisterBlock, 0x4003_6000;
}

/// All peripherals of the chip that are bound here
#[allow(non_snake_case, missing_docs)]
pub struct Peripherals {
    pub USB0: USB0,
    pub USBCLK: USBCLK,
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
            USB0: USB0::new(),
            USBCLK: USBCLK::new(),
        }
    }
}

take_api!();
