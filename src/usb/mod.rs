//! USB 2.0 full-speed device stack
//!
//! The stack is split the same way the hardware is:
//!
//! - A chip-specific *controller driver* owns the register block and the
//!   interrupt vector. Each family module provides one (for example
//!   [`lpc17xx::usb::Usb`], when that family is selected). Controller
//!   drivers implement the [`Driver`] contract defined here.
//! - The chip-independent *dispatch layer* ([`stack`]) parses setup packets
//!   and routes standard requests, delegating everything device-specific to
//!   a [`device::Device`] implementation.
//! - *Class devices* implement [`device::Device`]: a HID keyboard
//!   ([`keyboard`]) and a mass-storage bulk-only transport ([`msc`]).
//!
//! Transfers are zero-copy and non-blocking: `read`/`write` arm the hardware
//! and return immediately, completion is delivered in interrupt context
//! through a [`TransferCallback`]. Per `(endpoint, direction)` at most one
//! transfer can be armed; arming a busy endpoint is rejected without side
//! effect.
//!
//! [`lpc17xx::usb::Usb`]: ../lpc17xx/usb/struct.Usb.html

pub mod descriptor;
pub mod device;
pub mod endpoint;
pub mod keyboard;
pub mod msc;
pub mod setup;
pub mod stack;

#[cfg(test)]
pub(crate) mod mock;

use self::descriptor::TransferType;

/// The control endpoint used for all setup traffic
///
/// Exported so class devices can arm transfers on it.
pub const CONTROL_ENDPOINT: u8 = 0;

/// Transfer result codes delivered through transfer callbacks
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The transfer completed successfully
    NoError,

    /// The host NAK'd a data phase (informational, chip dependent)
    Nak,

    /// A bus reset aborted the transfer
    Reset,

    /// The endpoint was stalled
    Stall,

    /// A stall on the endpoint was cleared
    UnStall,

    /// The transfer was cancelled
    Cancel,
}

/// The mode of a logical endpoint
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EndpointMode {
    Disabled,
    Out,
    In,
    Control,
}

/// Handshake responses to a control request
///
/// Returned by request handlers to tell the dispatch layer how to finish the
/// control transfer. `Wait` means a data stage has been armed and the status
/// handshake will be generated from its completion callback.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Handshake {
    Ack,
    Nak,
    Stall,
    Wait,
}

/// Callback invoked from interrupt context when a transfer finishes
///
/// `transferred` is the number of bytes moved before the transfer ended,
/// which for errors other than [`Error::NoError`] may be less than
/// requested.
pub type TransferCallback = fn(endpoint: u8, mode: EndpointMode, error: Error, transferred: u32);

/// Extract the endpoint number from an endpoint address byte
pub fn endpoint_number(address: u8) -> u8 {
    address & 0xf
}

/// Extract the endpoint mode from an endpoint address byte
///
/// Control endpoints ignore the direction bit, so this only ever returns
/// `In` or `Out`.
pub fn endpoint_mode(address: u8) -> EndpointMode {
    if (address >> 7) & 0x1 == 1 {
        EndpointMode::In
    } else {
        EndpointMode::Out
    }
}

/// Contract implemented by every chip-specific USB controller driver
///
/// All functions are associated functions: driver state lives in statics
/// because completions are delivered from the interrupt handler through
/// plain function pointers. A driver type is a singleton for its hardware
/// block.
///
/// Buffers handed to [`write`]/[`read`] must stay valid until the callback
/// runs, which is what the `'static` bounds enforce.
///
/// [`write`]: #tymethod.write
/// [`read`]: #tymethod.read
pub trait Driver {
    /// The device (class) implementation served by this driver
    type Device: device::Device;

    /// The number of logical endpoints the hardware provides
    const ENDPOINT_COUNT: u8;

    /// The maximum packet size of an endpoint, by number and transfer type
    fn endpoint_size(endpoint: u8, ty: TransferType) -> u16;

    /// Whether the hardware supports the given transfer type on the endpoint
    ///
    /// Class devices check their endpoint choices against this at init.
    fn is_valid_endpoint(endpoint: u8, ty: TransferType) -> bool;

    /// Write data to an endpoint
    ///
    /// Arms the IN side of the endpoint and returns immediately. Returns
    /// `false` without side effect if the endpoint is busy.
    fn write(
        callback: Option<TransferCallback>,
        endpoint: u8,
        mode: EndpointMode,
        data: &'static [u8],
    ) -> bool;

    /// Read data from an endpoint
    ///
    /// Arms the OUT side of the endpoint and returns immediately; the data
    /// is valid once the callback ran. Completes when `data.len()` bytes
    /// arrived or a short packet ends the transfer. Returns `false` without
    /// side effect if the endpoint is busy.
    fn read(
        callback: Option<TransferCallback>,
        endpoint: u8,
        mode: EndpointMode,
        data: &'static mut [u8],
    ) -> bool;

    /// Read a variable amount of data from an endpoint
    ///
    /// Like [`read`], but completes as soon as at least `min_size` bytes
    /// arrived; up to `data.len()` bytes are accepted.
    ///
    /// [`read`]: #tymethod.read
    fn read_min(
        callback: Option<TransferCallback>,
        endpoint: u8,
        mode: EndpointMode,
        data: &'static mut [u8],
        min_size: u32,
    ) -> bool;

    /// Whether a transfer is currently armed on the endpoint
    fn is_pending(endpoint: u8, mode: EndpointMode) -> bool;

    /// Stall the endpoint; an armed transfer is aborted with
    /// [`Error::Stall`]
    fn stall(endpoint: u8, mode: EndpointMode);

    /// Clear a stall condition
    ///
    /// When the endpoint was actually stalled, resets the data toggle and
    /// reports [`Error::UnStall`] to an armed callback. Does nothing when
    /// the endpoint was not stalled.
    fn un_stall(endpoint: u8, mode: EndpointMode);

    /// Whether the endpoint is currently stalled
    fn is_stalled(endpoint: u8, mode: EndpointMode) -> bool;

    /// Generate the handshake for a status stage
    ///
    /// For IN directions this queues a zero length packet, for OUT it
    /// drains the endpoint buffer.
    fn ack(endpoint: u8, mode: EndpointMode);

    /// Cancel an armed transfer
    ///
    /// Drains the hardware buffer bank and reports [`Error::Cancel`] with
    /// the bytes transferred so far.
    fn cancel(endpoint: u8, mode: EndpointMode);

    /// Reset the endpoint to its idle state
    ///
    /// An armed transfer is aborted with [`Error::Reset`].
    fn reset(endpoint: u8, mode: EndpointMode);

    /// Configure an endpoint for use
    ///
    /// Called by the device when the host selects a configuration.
    fn configure(endpoint: u8, mode: EndpointMode, ty: TransferType, size: u32);

    /// Tell the hardware whether the device is configured
    fn configured(configured: bool);

    /// Set the device address
    ///
    /// The new address must only go live after the status stage of the
    /// SET_ADDRESS transfer; drivers buffer it and apply it from the next
    /// IN completion, except where the hardware applies it by itself.
    fn set_device_address(address: u8) -> Handshake;

    /// Connect to the host by enabling the D+ pull-up
    fn connect();

    /// Disconnect from the host
    fn disconnect();
}

/// Maximum endpoint sizes looked up by transfer type
///
/// For controllers whose endpoint capacity depends on the transfer type
/// rather than the endpoint number.
pub struct EndpointSizeByType {
    sizes: [u16; 4],
}

impl EndpointSizeByType {
    pub const fn new(control: u16, isochronous: u16, bulk: u16, interrupt: u16) -> Self {
        Self {
            sizes: [control, isochronous, bulk, interrupt],
        }
    }

    /// The size of an endpoint in bytes
    pub const fn size(&self, _endpoint: u8, ty: TransferType) -> u16 {
        self.sizes[ty as usize]
    }
}

/// Maximum endpoint sizes looked up by endpoint number
///
/// For controllers with per-endpoint FIFO capacities.
pub struct EndpointSizeByEndpoint<const N: usize> {
    sizes: [u16; N],
}

impl<const N: usize> EndpointSizeByEndpoint<N> {
    pub const fn new(sizes: [u16; N]) -> Self {
        Self { sizes }
    }

    /// The size of an endpoint in bytes
    pub const fn size(&self, endpoint: u8, _ty: TransferType) -> u16 {
        self.sizes[endpoint as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_address_decoding() {
        assert_eq!(endpoint_number(0x81), 1);
        assert_eq!(endpoint_mode(0x81), EndpointMode::In);
        assert_eq!(endpoint_number(0x02), 2);
        assert_eq!(endpoint_mode(0x02), EndpointMode::Out);
    }

    #[test]
    fn endpoint_size_tables() {
        let by_type = EndpointSizeByType::new(64, 512, 64, 64);
        assert_eq!(by_type.size(3, TransferType::Isochronous), 512);
        assert_eq!(by_type.size(0, TransferType::Control), 64);

        let by_endpoint = EndpointSizeByEndpoint::new([64, 64, 64, 64, 512, 512, 64, 64]);
        assert_eq!(by_endpoint.size(4, TransferType::Bulk), 512);
        assert_eq!(by_endpoint.size(1, TransferType::Bulk), 64);
    }
}
