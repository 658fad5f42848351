//! GPDMA driver for the LPC17xx
//!
//! The controller has eight channels with fixed priority (channel 0
//! highest). A [`Transfer`] owns a channel and its buffers while the
//! hardware works through them; `wait` gives them back when the transfer
//! completed.
//!
//! ``` no_run
//! use cmx_hal::lpc17xx::Peripherals;
//!
//! static SOURCE: [u8; 4] = *b"data";
//! static mut DEST: [u8; 4] = [0; 4];
//!
//! let mut p = Peripherals::take().unwrap();
//!
//! let mut channels = p.dma.enable(&mut p.syscon);
//! let transfer = channels
//!     .channel0
//!     .transfer_mem_to_mem(&SOURCE, unsafe { &mut DEST })
//!     .start();
//!
//! let payload = transfer.wait().unwrap();
//! let _channel = payload.channel;
//! ```
//!
//! See the user manual, chapter 31.

use core::marker::PhantomData;
use core::sync::atomic::{compiler_fence, Ordering};

use crate::init_state::Disabled;
use crate::pac::lpc17xx as pac;

use super::syscon::Syscon;

/// Peripheral DMA request lines
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum Request {
    Ssp0Tx = 0,
    Ssp0Rx = 1,
    Ssp1Tx = 2,
    Ssp1Rx = 3,
    Adc = 4,
    I2s0 = 5,
    I2s1 = 6,
    Dac = 7,
    Uart0Tx = 8,
    Uart0Rx = 9,
    Uart1Tx = 10,
    Uart1Rx = 11,
    Uart2Tx = 12,
    Uart2Rx = 13,
    Uart3Tx = 14,
    Uart3Rx = 15,
}

/// Interface to the DMA controller
pub struct Dma<State> {
    dma: pac::GPDMA,
    _state: PhantomData<State>,
}

impl Dma<Disabled> {
    pub(crate) fn new(dma: pac::GPDMA) -> Self {
        Dma {
            dma,
            _state: PhantomData,
        }
    }

    /// Enable the controller and split it into its channels
    pub fn enable(self, syscon: &mut Syscon) -> Channels {
        syscon.enable_clock(&self.dma);

        unsafe {
            // controller enable, little-endian on both masters
            self.dma.config.write(0x1);

            // start from a clean slate
            self.dma.inttcclear.write(0xff);
            self.dma.interrclr.write(0xff);
        }

        Channels::new()
    }
}

/// Implemented for types that identify DMA channels
pub trait Instance: private::Sealed {
    /// The index of the channel
    const INDEX: usize;
}

macro_rules! channels {
    ($($channel:ident, $field:ident, $index:expr;)*) => {
        /// Provides access to the DMA channels
        #[allow(missing_docs)]
        pub struct Channels {
            $(pub $field: Channel<$channel>,)*
        }

        impl Channels {
            fn new() -> Self {
                Channels {
                    $($field: Channel::new(),)*
                }
            }
        }

        $(
            /// Identifies one of the DMA channels
            pub struct $channel;

            impl private::Sealed for $channel {}
            impl Instance for $channel {
                const INDEX: usize = $index;
            }
        )*
    };
}

channels!(
    Channel0, channel0, 0;
    Channel1, channel1, 1;
    Channel2, channel2, 2;
    Channel3, channel3, 3;
    Channel4, channel4, 4;
    Channel5, channel5, 5;
    Channel6, channel6, 6;
    Channel7, channel7, 7;
);

mod private {
    pub trait Sealed {}
}

/// One DMA channel
pub struct Channel<C: Instance> {
    _channel: PhantomData<C>,
}

impl<C: Instance> Channel<C> {
    fn new() -> Self {
        Channel {
            _channel: PhantomData,
        }
    }

    fn registers() -> &'static pac::dma::Channel {
        unsafe { &(*pac::GPDMA::ptr()).channel[C::INDEX] }
    }

    /// Prepare a memory-to-memory transfer
    ///
    /// # Panics
    ///
    /// Panics if the buffer lengths differ, are zero or exceed the 4095
    /// byte transfer limit of one channel.
    pub fn transfer_mem_to_mem(
        self,
        source: &'static [u8],
        dest: &'static mut [u8],
    ) -> Transfer<state::Ready, C> {
        assert!(!source.is_empty());
        assert!(source.len() == dest.len());
        assert!(source.len() < 0x1000);

        compiler_fence(Ordering::SeqCst);

        let registers = Self::registers();

        unsafe {
            registers.srcaddr.write(source.as_ptr() as u32);
            registers.destaddr.write(dest.as_mut_ptr() as u32);
            registers.lli.write(0);

            // byte transfers, incrementing on both sides, terminal count
            // interrupt flag on completion
            registers.control.write(
                (source.len() as u32) | (0x1 << 26) | (0x1 << 27) | (0x1 << 31),
            );

            // memory-to-memory flow
            registers.config.write(0);
        }

        Transfer {
            _state: PhantomData,
            payload: Payload {
                channel: self,
                source,
                dest,
            },
        }
    }

    /// Prepare a memory-to-peripheral transfer
    ///
    /// `dest` is the peripheral's data register; `request` selects its DMA
    /// request line.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty or exceeds the 4095 byte transfer
    /// limit of one channel.
    pub fn transfer_mem_to_peripheral(
        self,
        source: &'static [u8],
        dest: *mut u32,
        request: Request,
    ) -> Transfer<state::Ready, C> {
        assert!(!source.is_empty());
        assert!(source.len() < 0x1000);

        compiler_fence(Ordering::SeqCst);

        let registers = Self::registers();

        unsafe {
            registers.srcaddr.write(source.as_ptr() as u32);
            registers.destaddr.write(dest as u32);
            registers.lli.write(0);

            // byte transfers, source incrementing, terminal count flag
            registers
                .control
                .write((source.len() as u32) | (0x1 << 26) | (0x1 << 31));

            // memory-to-peripheral flow, destination request line
            registers
                .config
                .write(((request as u32) << 6) | (0b001 << 11));
        }

        Transfer {
            _state: PhantomData,
            payload: Payload {
                channel: self,
                source,
                dest: &mut [],
            },
        }
    }
}

/// A DMA transfer, parameterized over its state
///
/// Holds the channel and the buffers for the duration of the transfer.
pub struct Transfer<State, C: Instance> {
    _state: PhantomData<State>,
    payload: Payload<C>,
}

/// The resources held by a transfer
pub struct Payload<C: Instance> {
    /// The channel used for this transfer
    pub channel: Channel<C>,

    /// The source buffer
    pub source: &'static [u8],

    /// The destination buffer (empty for peripheral destinations)
    pub dest: &'static mut [u8],
}

impl<C: Instance> core::fmt::Debug for Payload<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        // the channel marker has nothing to print
        write!(f, "Payload")
    }
}

impl<C: Instance> Transfer<state::Ready, C> {
    /// Start the transfer
    pub fn start(self) -> Transfer<state::Started, C> {
        let registers = Channel::<C>::registers();

        unsafe {
            // clear a stale terminal count, then enable the channel
            (*pac::GPDMA::ptr()).inttcclear.write(0x1 << C::INDEX);
            registers.config.modify(|config| config | 0x1);
        }

        Transfer {
            _state: PhantomData,
            payload: self.payload,
        }
    }
}

impl<C: Instance> Transfer<state::Started, C> {
    /// Whether the channel is still working on the transfer
    pub fn is_active(&self) -> bool {
        let dma = unsafe { &*pac::GPDMA::ptr() };
        dma.enbldchns.read() & (0x1 << C::INDEX) != 0
    }

    /// Block until the transfer finished
    ///
    /// Returns the transfer's resources, or the error state of the
    /// channel.
    pub fn wait(self) -> Result<Payload<C>, Payload<C>> {
        let dma = unsafe { &*pac::GPDMA::ptr() };

        while self.is_active() {}

        compiler_fence(Ordering::SeqCst);

        if dma.rawinterrstat.read() & (0x1 << C::INDEX) != 0 {
            unsafe {
                dma.interrclr.write(0x1 << C::INDEX);
            }
            return Err(self.payload);
        }

        unsafe {
            dma.inttcclear.write(0x1 << C::INDEX);
        }

        Ok(self.payload)
    }
}

/// Types representing the states of a DMA transfer
pub mod state {
    /// The transfer is set up and can be started
    pub struct Ready;

    /// The transfer is running
    pub struct Started;
}
