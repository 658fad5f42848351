//! Register bindings for the NXP LPC17xx family
//!
//! Register layouts follow the LPC17xx user manual (UM10360).

use volatile_register::{RO, RW, WO};

/// The interrupt lines of the LPC17xx NVIC
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs, non_camel_case_types, clippy::upper_case_acronyms)]
pub enum Interrupt {
    WDT = 0,
    TIMER0 = 1,
    TIMER1 = 2,
    TIMER2 = 3,
    TIMER3 = 4,
    UART0 = 5,
    UART1 = 6,
    UART2 = 7,
    UART3 = 8,
    PWM1 = 9,
    I2C0 = 10,
    I2C1 = 11,
    I2C2 = 12,
    SPI = 13,
    SSP0 = 14,
    SSP1 = 15,
    PLL0 = 16,
    RTC = 17,
    EINT0 = 18,
    EINT1 = 19,
    EINT2 = 20,
    EINT3 = 21,
    ADC = 22,
    BOD = 23,
    USB = 24,
    CAN = 25,
    GPDMA = 26,
    I2S = 27,
    ENET = 28,
    RIT = 29,
    MCPWM = 30,
    QEI = 31,
    PLL1 = 32,
    USB_ACTIVITY = 33,
    CAN_ACTIVITY = 34,
}

unsafe impl cortex_m::interrupt::InterruptNumber for Interrupt {
    #[inline]
    fn number(self) -> u16 {
        self as u16
    }
}

/// System control block (SC)
pub mod syscon {
    use super::*;

    /// Registers of the system control block, partial
    #[repr(C)]
    pub struct RegisterBlock {
        _reserved0: [u32; 49],
        /// Power control for peripherals (0x0C4)
        pub pconp: RW<u32>,
        _reserved1: [u32; 16],
        /// USB clock configuration (0x108)
        pub usbclkcfg: RW<u32>,
        _reserved2: [u32; 39],
        /// Peripheral clock selection 0 (0x1A8)
        pub pclksel0: RW<u32>,
        /// Peripheral clock selection 1 (0x1AC)
        pub pclksel1: RW<u32>,
    }
}

/// Pin connect block (PINSEL/PINMODE)
pub mod pinconnect {
    use super::*;

    /// Registers of the pin connect block
    #[repr(C)]
    pub struct RegisterBlock {
        /// Pin function select, two bits per pin (0x000)
        pub pinsel: [RW<u32>; 11],
        _reserved0: [u32; 5],
        /// Pin mode (pull-up/pull-down), two bits per pin (0x040)
        pub pinmode: [RW<u32>; 10],
        /// Open-drain mode, one bit per pin (0x068)
        pub pinmode_od: [RW<u32>; 5],
    }
}

/// General purpose I/O, all five ports
pub mod gpio {
    use super::*;

    /// The registers of one GPIO port
    #[repr(C)]
    pub struct Port {
        /// Direction, 1 = output (0x00)
        pub dir: RW<u32>,
        _reserved0: [u32; 3],
        /// Access mask for pin/set/clr (0x10)
        pub mask: RW<u32>,
        /// Pin value (0x14)
        pub pin: RW<u32>,
        /// Output set, writes of 1 drive high (0x18)
        pub set: RW<u32>,
        /// Output clear, writes of 1 drive low (0x1C)
        pub clr: WO<u32>,
    }

    /// Registers of the GPIO block: six ports, 0x20 apart
    ///
    /// Port 5 only exists on the larger family members; the array covers
    /// it either way.
    #[repr(C)]
    pub struct RegisterBlock {
        /// The ports
        pub port: [Port; 6],
    }
}

/// UART0/2/3 (UART1 adds modem registers which are not bound here)
pub mod uart {
    use super::*;

    /// Registers of a UART
    ///
    /// The first three words each hold multiple registers, selected by the
    /// DLAB bit in `lcr` and the access direction, as in every 16550.
    #[repr(C)]
    pub struct RegisterBlock {
        /// RBR (read) / THR (write) / DLL with DLAB set (0x00)
        pub rbr_thr_dll: RW<u32>,
        /// IER / DLM with DLAB set (0x04)
        pub ier_dlm: RW<u32>,
        /// IIR (read) / FCR (write) (0x08)
        pub iir_fcr: RW<u32>,
        /// Line control (0x0C)
        pub lcr: RW<u32>,
        _reserved0: u32,
        /// Line status (0x14)
        pub lsr: RO<u32>,
        _reserved1: u32,
        /// Scratch pad (0x1C)
        pub scr: RW<u32>,
        /// Auto-baud control (0x20)
        pub acr: RW<u32>,
        _reserved2: u32,
        /// Fractional divider (0x28)
        pub fdr: RW<u32>,
        _reserved3: u32,
        /// Transmit enable (0x30)
        pub ter: RW<u32>,
    }
}

/// Legacy SPI controller (S0SPI)
pub mod spi {
    use super::*;

    /// Registers of the SPI controller
    #[repr(C)]
    pub struct RegisterBlock {
        /// Control (0x00)
        pub spcr: RW<u32>,
        /// Status; reading clears the flags (0x04)
        pub spsr: RO<u32>,
        /// Data (0x08)
        pub spdr: RW<u32>,
        /// Clock counter (0x0C)
        pub spccr: RW<u32>,
        _reserved0: [u32; 3],
        /// Interrupt flag (0x1C)
        pub spint: RW<u32>,
    }
}

/// 32-bit timer/counter
pub mod timer {
    use super::*;

    /// Registers of a timer
    #[repr(C)]
    pub struct RegisterBlock {
        /// Interrupt flags (0x00)
        pub ir: RW<u32>,
        /// Timer control: enable, reset (0x04)
        pub tcr: RW<u32>,
        /// Timer counter (0x08)
        pub tc: RW<u32>,
        /// Prescale (0x0C)
        pub pr: RW<u32>,
        /// Prescale counter (0x10)
        pub pc: RW<u32>,
        /// Match control (0x14)
        pub mcr: RW<u32>,
        /// Match registers (0x18)
        pub mr: [RW<u32>; 4],
        /// Capture control (0x28)
        pub ccr: RW<u32>,
        /// Capture registers (0x2C)
        pub cr: [RO<u32>; 2],
        _reserved0: [u32; 2],
        /// External match (0x3C)
        pub emr: RW<u32>,
        _reserved1: [u32; 12],
        /// Count control (0x70)
        pub ctcr: RW<u32>,
    }
}

/// General purpose DMA controller
pub mod dma {
    use super::*;

    /// The registers of one DMA channel
    #[repr(C)]
    pub struct Channel {
        /// Source address (0x00)
        pub srcaddr: RW<u32>,
        /// Destination address (0x04)
        pub destaddr: RW<u32>,
        /// Linked list item (0x08)
        pub lli: RW<u32>,
        /// Transfer control: size, widths, increments (0x0C)
        pub control: RW<u32>,
        /// Channel configuration: enable, peripherals, flow (0x10)
        pub config: RW<u32>,
        _reserved0: [u32; 3],
    }

    /// Registers of the GPDMA controller
    #[repr(C)]
    pub struct RegisterBlock {
        /// Combined interrupt status (0x000)
        pub intstat: RO<u32>,
        /// Terminal count interrupt status (0x004)
        pub inttcstat: RO<u32>,
        /// Terminal count interrupt clear (0x008)
        pub inttcclear: WO<u32>,
        /// Error interrupt status (0x00C)
        pub interrstat: RO<u32>,
        /// Error interrupt clear (0x010)
        pub interrclr: WO<u32>,
        /// Raw terminal count status (0x014)
        pub rawinttcstat: RO<u32>,
        /// Raw error status (0x018)
        pub rawinterrstat: RO<u32>,
        /// Enabled channels (0x01C)
        pub enbldchns: RO<u32>,
        /// Software burst request (0x020)
        pub softbreq: RW<u32>,
        /// Software single request (0x024)
        pub softsreq: RW<u32>,
        /// Software last burst request (0x028)
        pub softlbreq: RW<u32>,
        /// Software last single request (0x02C)
        pub softlsreq: RW<u32>,
        /// Controller configuration (0x030)
        pub config: RW<u32>,
        /// Request synchronization (0x034)
        pub sync: RW<u32>,
        _reserved0: [u32; 50],
        /// The eight DMA channels (0x100)
        pub channel: [Channel; 8],
    }
}

/// USB device controller
pub mod usb {
    use super::*;

    /// Device registers of the USB controller (0x5000C200 onwards)
    ///
    /// Endpoint commands go through the serial interface engine: an opcode
    /// and phase are written to `cmdcode` and completion is polled in
    /// `devintst` (CCEMPTY/CDFULL).
    #[repr(C)]
    pub struct RegisterBlock {
        /// Device interrupt status (0x200)
        pub devintst: RO<u32>,
        /// Device interrupt enable (0x204)
        pub devinten: RW<u32>,
        /// Device interrupt clear (0x208)
        pub devintclr: WO<u32>,
        /// Device interrupt set (0x20C)
        pub devintset: WO<u32>,
        /// SIE command code (0x210)
        pub cmdcode: WO<u32>,
        /// SIE command data (0x214)
        pub cmddata: RO<u32>,
        /// Receive data (0x218)
        pub rxdata: RO<u32>,
        /// Transmit data (0x21C)
        pub txdata: WO<u32>,
        /// Receive packet length (0x220)
        pub rxplen: RO<u32>,
        /// Transmit packet length (0x224)
        pub txplen: WO<u32>,
        /// Control: read/write enable and endpoint select (0x228)
        pub ctrl: RW<u32>,
        /// Device interrupt priority (0x22C)
        pub devintpri: WO<u32>,
        /// Endpoint interrupt status (0x230)
        pub epintst: RO<u32>,
        /// Endpoint interrupt enable (0x234)
        pub epinten: RW<u32>,
        /// Endpoint interrupt clear (0x238)
        pub epintclr: WO<u32>,
        /// Endpoint interrupt set (0x23C)
        pub epintset: WO<u32>,
        /// Endpoint interrupt priority (0x240)
        pub epintpri: WO<u32>,
        /// Realize endpoint (0x244)
        pub reep: RW<u32>,
        /// Endpoint index (0x248)
        pub epind: WO<u32>,
        /// Endpoint max packet size (0x24C)
        pub maxpsize: RW<u32>,
    }
}

/// USB OTG clock control (0x5000CFF4)
pub mod usbclk {
    use super::*;

    /// Clock control registers of the USB block
    #[repr(C)]
    pub struct RegisterBlock {
        /// OTG clock control (0xFF4)
        pub ctrl: RW<u32>,
        /// OTG clock status (0xFF8)
        pub st: RO<u32>,
    }
}

peripheral! {
    /// System control block
    SYSCON, syscon::RegisterBlock, 0x400F_C000;
}

peripheral! {
    /// Pin connect block
    PINCONNECT, pinconnect::RegisterBlock, 0x4002_C000;
}

peripheral! {
    /// General purpose I/O
    GPIO, gpio::RegisterBlock, 0x2009_C000;
}

peripheral! {
    /// UART0
    UART0, uart::RegisterBlock, 0x4000_C000;
}

peripheral! {
    /// UART2
    UART2, uart::RegisterBlock, 0x4009_8000;
}

peripheral! {
    /// UART3
    UART3, uart::RegisterBlock, 0x4009_C000;
}

peripheral! {
    /// Legacy SPI controller
    SPI, spi::RegisterBlock, 0x4002_0000;
}

peripheral! {
    /// Timer 0
    TIMER0, timer::RegisterBlock, 0x4000_4000;
}

peripheral! {
    /// Timer 1
    TIMER1, timer::RegisterBlock, 0x4000_8000;
}

peripheral! {
    /// Timer 2
    TIMER2, timer::RegisterBlock, 0x4009_0000;
}

peripheral! {
    /// Timer 3
    TIMER3, timer::RegisterBlock, 0x4009_4000;
}

peripheral! {
    /// General purpose DMA controller
    GPDMA, dma::RegisterBlock, 0x5000_4000;
}

peripheral! {
    /// USB device controller
    USB, usb::RegisterBlock, 0x5000_C200;
}

peripheral! {
    /// USB clock control
    USBCLK, usbclk::RegisterBlock, 0x5000_CFF4;
}

/// All peripherals of the chip
#[allow(non_snake_case, missing_docs)]
pub struct Peripherals {
    pub SYSCON: SYSCON,
    pub PINCONNECT: PINCONNECT,
    pub GPIO: GPIO,
    pub UART0: UART0,
    pub UART2: UART2,
    pub UART3: UART3,
    pub SPI: SPI,
    pub TIMER0: TIMER0,
    pub TIMER1: TIMER1,
    pub TIMER2: TIMER2,
    pub TIMER3: TIMER3,
    pub GPDMA: GPDMA,
    pub USB: USB,
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
            SYSCON: SYSCON::new(),
            PINCONNECT: PINCONNECT::new(),
            GPIO: GPIO::new(),
            UART0: UART0::new(),
            UART2: UART2::new(),
            UART3: UART3::new(),
            SPI: SPI::new(),
            TIMER0: TIMER0::new(),
            TIMER1: TIMER1::new(),
            TIMER2: TIMER2::new(),
            TIMER3: TIMER3::new(),
            GPDMA: GPDMA::new(),
            USB: USB::new(),
            USBCLK: USBCLK::new(),
        }
    }
}

take_api!();
