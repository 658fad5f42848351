//! Register bindings for the Maxim MAX32625
//!
//! Only the blocks the USB device driver needs are bound: the USB
//! controller with its DMA buffer descriptor engine, plus the clock and
//! power managers it depends on. Layouts follow the MAX32625 user guide.

use volatile_register::{RO, RW};

/// The interrupt lines of the MAX32625 NVIC, partial
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs, clippy::upper_case_acronyms)]
pub enum Interrupt {
    USB = 8,
}

unsafe impl cortex_m::interrupt::InterruptNumber for Interrupt {
    #[inline]
    fn number(self) -> u16 {
        self as u16
    }
}

/// USB device controller
pub mod usb {
    use super::*;

    /// Registers of the USB controller
    ///
    /// Transfers run through a 512-byte-aligned buffer descriptor table
    /// (pointed to by `ep_base`); ownership of a descriptor moves to the
    /// engine through a mask write to `in_owner`/`out_owner` and returns to
    /// the CPU when the endpoint interrupt fires.
    #[repr(C)]
    pub struct RegisterBlock {
        /// Controller enable (0x000)
        pub cn: RW<u32>,
        _reserved0: [u32; 63],
        /// Device interrupt flags, write 1 to clear (0x100)
        pub dev_intfl: RW<u32>,
        /// Device interrupt enable (0x104)
        pub dev_inten: RW<u32>,
        _reserved1: [u32; 2],
        /// Device control: connect, ulpm, remote wakeup, reset (0x110)
        pub dev_cn: RW<u32>,
        _reserved2: [u32; 59],
        /// Buffer descriptor table base, 512 byte aligned (0x200)
        pub ep_base: RW<u32>,
        /// Current frame number (0x204)
        pub cur_frame: RO<u32>,
        /// IN endpoint interrupt flags, write 1 to clear (0x208)
        pub in_int: RW<u32>,
        /// OUT endpoint interrupt flags, write 1 to clear (0x20C)
        pub out_int: RW<u32>,
        /// NAK interrupt flags (0x210)
        pub nak_int: RW<u32>,
        _reserved3: [u32; 3],
        /// IN descriptor ownership handoff, mask write (0x220)
        pub in_owner: RW<u32>,
        /// OUT descriptor ownership handoff, mask write (0x224)
        pub out_owner: RW<u32>,
        _reserved4: [u32; 6],
        /// Setup packet, first word (0x240)
        pub setup0: RO<u32>,
        /// Setup packet, second word (0x244)
        pub setup1: RO<u32>,
        _reserved5: [u32; 46],
        /// Per-endpoint control (0x300)
        pub ep: [RW<u32>; 8],
    }
}

/// Clock manager, partial
pub mod clkman {
    use super::*;

    /// Registers of the clock manager
    #[repr(C)]
    pub struct RegisterBlock {
        /// Clock control (0x000)
        pub clk_ctrl: RW<u32>,
    }
}

/// Power manager, partial
pub mod pwrman {
    use super::*;

    /// Registers of the power manager
    #[repr(C)]
    pub struct RegisterBlock {
        _reserved0: [u32; 4],
        /// Power reset control: USB transceiver power (0x010)
        pub pwr_rst_ctrl: RW<u32>,
    }
}

peripheral! {
    /// USB device controller
    USB, usb::RegisterBlock, 0x400B_1000;
}

peripheral! {
    /// Clock manager
    CLKMAN, clkman::RegisterBlock, 0x4000_4000;
}

peripheral! {
    /// Power manager
    PWRMAN, pwrman::RegisterBlock, 0x4000_0000;
}

/// All peripherals of the chip that are bound here
#[allow(non_snake_case, missing_docs)]
pub struct Peripherals {
    pub USB: USB,
    pub CLKMAN: CLKMAN,
    pub PWRMAN: PWRMAN,
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
            USB: USB::new(),
            CLKMAN: CLKMAN::new(),
            PWRMAN: PWRMAN::new(),
        }
    }
}

take_api!();
