//! Register bindings for the Atmel ATSAM4S
//!
//! Only the blocks the USB device driver needs are bound: the UDP device
//! port, the power management controller and the bus matrix system I/O
//! configuration. Layouts follow the SAM4S datasheet.

use volatile_register::{RO, RW, WO};

/// The interrupt lines of the ATSAM4S NVIC, partial
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs, clippy::upper_case_acronyms)]
pub enum Interrupt {
    UDP = 34,
}

unsafe impl cortex_m::interrupt::InterruptNumber for Interrupt {
    #[inline]
    fn number(self) -> u16 {
        self as u16
    }
}

/// USB device port (UDP)
pub mod udp {
    use super::*;

    /// Registers of the USB device port
    ///
    /// Each endpoint has one control and status register (`csr`) and one
    /// FIFO data register (`fdr`). The iso-capable endpoints have two
    /// hardware banks behind their single CSR.
    #[repr(C)]
    pub struct RegisterBlock {
        /// Frame number (0x000)
        pub frm_num: RO<u32>,
        /// Global state: configured, addressed, remote wakeup (0x004)
        pub glb_stat: RW<u32>,
        /// Function address (0x008)
        pub faddr: RW<u32>,
        _reserved0: u32,
        /// Interrupt enable (0x010)
        pub ier: WO<u32>,
        /// Interrupt disable (0x014)
        pub idr: WO<u32>,
        /// Interrupt mask (0x018)
        pub imr: RO<u32>,
        /// Interrupt status (0x01C)
        pub isr: RO<u32>,
        /// Interrupt clear (0x020)
        pub icr: WO<u32>,
        /// Endpoint reset (0x024)
        pub rst_ep: RW<u32>,
        _reserved1: u32,
        /// Endpoint control and status (0x030)
        pub csr: [RW<u32>; 8],
        /// Endpoint FIFO data (0x050)
        pub fdr: [RW<u32>; 8],
        _reserved2: u32,
        /// Transceiver control: pull-up, transceiver disable (0x074)
        pub txvc: RW<u32>,
    }
}

/// Power management controller (PMC), partial
pub mod pmc {
    use super::*;

    /// Registers of the power management controller
    #[repr(C)]
    pub struct RegisterBlock {
        /// System clock enable (0x000)
        pub scer: WO<u32>,
        /// System clock disable (0x004)
        pub scdr: WO<u32>,
        /// System clock status (0x008)
        pub scsr: RO<u32>,
        _reserved0: u32,
        /// Peripheral clock enable 0 (0x010)
        pub pcer0: WO<u32>,
        /// Peripheral clock disable 0 (0x014)
        pub pcdr0: WO<u32>,
        /// Peripheral clock status 0 (0x018)
        pub pcsr0: RO<u32>,
        _reserved1: [u32; 7],
        /// USB clock register: source and divider (0x038)
        pub usb: RW<u32>,
        _reserved2: [u32; 49],
        /// Peripheral clock enable 1 (0x100)
        pub pcer1: WO<u32>,
        /// Peripheral clock disable 1 (0x104)
        pub pcdr1: WO<u32>,
        /// Peripheral clock status 1 (0x108)
        pub pcsr1: RO<u32>,
    }
}

/// Bus matrix, partial
pub mod matrix {
    use super::*;

    /// Registers of the bus matrix
    #[repr(C)]
    pub struct RegisterBlock {
        _reserved0: [u32; 69],
        /// System I/O configuration: PB10/PB11 as DDM/DDP (0x114)
        pub ccfg_sysio: RW<u32>,
    }
}

peripheral! {
    /// USB device port
    UDP, udp::RegisterBlock, 0x4003_4000;
}

peripheral! {
    /// Power management controller
    PMC, pmc::RegisterBlock, 0x400E_0400;
}

peripheral! {
    /// Bus matrix
    MATRIX, matrix::RegisterBlock, 0x400E_0200;
}

/// All peripherals of the chip that are bound here
#[allow(non_snake_case, missing_docs)]
pub struct Peripherals {
    pub UDP: UDP,
    pub PMC: PMC,
    pub MATRIX: MATRIX,
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
            UDP: UDP::new(),
            PMC: PMC::new(),
            MATRIX: MATRIX::new(),
        }
    }
}

take_api!();
