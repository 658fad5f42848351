//! A scripted USB controller driver for the host test suite
//!
//! `MockUsb` implements the full [`Driver`] contract against vectors, so the
//! dispatch layer and the class devices can be driven on the host exactly
//! like on hardware: tests feed setup packets and completions in, then
//! assert on the armed transfers and the event log.
//!
//! Driver state is global (as it is for the real drivers), so every test
//! takes the [`lock`] before touching the mock; the lock also resets the
//! state.

use std::sync::{Mutex, MutexGuard};
use std::vec::Vec;

use super::descriptor::{self, le16, DescriptorBytes, DescriptorType, TransferType};
use super::device::Device;
use super::setup::SetupPacket;
use super::{Driver, EndpointMode, Error, Handshake, TransferCallback};

const ENDPOINTS: usize = 16;

/// Observable driver actions, in call order
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    Ack(u8, EndpointMode),
    Stall(u8, EndpointMode),
    UnStall(u8, EndpointMode),
    Cancel(u8, EndpointMode),
    Reset(u8, EndpointMode),
    Configure(u8, EndpointMode, TransferType, u32),
    Configured(bool),
    Connect,
    Disconnect,
}

struct PendingWrite {
    data: Vec<u8>,
    callback: Option<TransferCallback>,
}

struct PendingRead {
    ptr: usize,
    len: usize,
    min_size: u32,
    callback: Option<TransferCallback>,
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    writes: [Option<PendingWrite>; ENDPOINTS],
    reads: [Option<PendingRead>; ENDPOINTS],
    stalled_in: [bool; ENDPOINTS],
    stalled_out: [bool; ENDPOINTS],
    device_address: u8,
    pending_address: Option<u8>,
}

impl State {
    fn stalled(&mut self, endpoint: u8, mode: EndpointMode) -> &mut bool {
        match mode {
            EndpointMode::Out => &mut self.stalled_out[endpoint as usize],
            _ => &mut self.stalled_in[endpoint as usize],
        }
    }
}

static STATE: Mutex<Option<State>> = Mutex::new(None);
static TEST_LOCK: Mutex<()> = Mutex::new(());

fn with_state<R>(f: impl FnOnce(&mut State) -> R) -> R {
    let mut guard = STATE.lock().unwrap_or_else(|e| e.into_inner());
    f(guard.get_or_insert_with(State::default))
}

/// Serialize tests using the mock and reset its state
pub fn lock() -> MutexGuard<'static, ()> {
    let guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    *STATE.lock().unwrap_or_else(|e| e.into_inner()) = Some(State::default());
    guard
}

/// The events recorded since the last reset
pub fn events() -> Vec<Event> {
    with_state(|s| s.events.clone())
}

/// Drop all recorded events
pub fn clear_events() {
    with_state(|s| s.events.clear());
}

/// The address the driver has applied to the hardware
pub fn device_address() -> u8 {
    with_state(|s| s.device_address)
}

/// The address buffered for the end of the SET_ADDRESS status stage
pub fn pending_address() -> Option<u8> {
    with_state(|s| s.pending_address)
}

/// Take the armed IN transfer of an endpoint without completing it
pub fn take_write(endpoint: u8) -> Vec<u8> {
    with_state(|s| s.writes[endpoint as usize].take())
        .expect("no armed write on the endpoint")
        .data
}

/// Complete a status stage that carries no data
///
/// Applies a buffered device address, like the hardware drivers do on the
/// IN completion that ends the SET_ADDRESS status stage.
pub fn complete_status_in() {
    with_state(|s| {
        if let Some(address) = s.pending_address.take() {
            s.device_address = address;
        }
    });
}

/// Complete the armed IN transfer of an endpoint
///
/// Applies a buffered device address first, like the hardware drivers do on
/// the IN completion that ends the SET_ADDRESS status stage. Returns the
/// bytes that went to the host.
pub fn complete_in(endpoint: u8) -> Vec<u8> {
    let write = with_state(|s| {
        if let Some(address) = s.pending_address.take() {
            s.device_address = address;
        }
        s.writes[endpoint as usize].take()
    })
    .expect("no armed write on the endpoint");
    if let Some(callback) = write.callback {
        callback(
            endpoint,
            EndpointMode::In,
            Error::NoError,
            write.data.len() as u32,
        );
    }

    write.data
}

/// Feed received data into the armed OUT transfer of an endpoint
pub fn complete_out(endpoint: u8, data: &[u8]) {
    let read = with_state(|s| s.reads[endpoint as usize].take())
        .expect("no armed read on the endpoint");

    let count = read.len.min(data.len());
    unsafe {
        core::ptr::copy_nonoverlapping(data.as_ptr(), read.ptr as *mut u8, count);
    }

    if let Some(callback) = read.callback {
        callback(endpoint, EndpointMode::Out, Error::NoError, count as u32);
    }
}

/// Whether an OUT read is armed on the endpoint
pub fn has_read(endpoint: u8) -> bool {
    with_state(|s| s.reads[endpoint as usize].is_some())
}

/// The minimum byte count of the armed OUT read
pub fn read_min_size(endpoint: u8) -> u32 {
    with_state(|s| {
        s.reads[endpoint as usize]
            .as_ref()
            .expect("no armed read on the endpoint")
            .min_size
    })
}

fn finish(endpoint: u8, mode: EndpointMode, error: Error) {
    let callback = with_state(|s| {
        let slot = match mode {
            EndpointMode::Out => &mut s.reads[endpoint as usize],
            _ => {
                return s.writes[endpoint as usize].take().and_then(|w| w.callback);
            }
        };
        slot.take().and_then(|r| r.callback)
    });

    if let Some(callback) = callback {
        callback(endpoint, mode, error, 0);
    }
}

/// The device the mock serves: a bare test device with one configuration
pub struct TestDevice;

static TEST_DEVICE_DESCRIPTOR: descriptor::Device = descriptor::Device {
    b_length: 18,
    b_descriptor_type: DescriptorType::Device as u8,
    bcd_usb: le16(0x0200),
    b_device_class: 0,
    b_device_sub_class: 0,
    b_device_protocol: 0,
    b_max_packet_size: 64,
    id_vendor: le16(0x1fc9),
    id_product: le16(0x2064),
    bcd_device: le16(0x0100),
    i_manufacturer: 0,
    i_product: 0,
    i_serial_number: 0,
    b_num_configurations: 1,
};

static TEST_CONFIG_DESCRIPTOR: descriptor::Configuration = descriptor::Configuration {
    b_length: 9,
    b_descriptor_type: DescriptorType::Configuration as u8,
    w_total_length: le16(9),
    b_num_interfaces: 0,
    b_configuration_value: 1,
    i_configuration: 0,
    bm_attributes: 0x80,
    b_max_power: 50,
};

impl Device for TestDevice {
    fn init<U: Driver>() {}

    fn get_descriptor<U: Driver>(
        _packet: &SetupPacket,
        ty: DescriptorType,
        _index: u8,
    ) -> Option<&'static [u8]> {
        match ty {
            DescriptorType::Device => Some(TEST_DEVICE_DESCRIPTOR.descriptor_bytes()),
            DescriptorType::Configuration => Some(TEST_CONFIG_DESCRIPTOR.descriptor_bytes()),
            _ => None,
        }
    }

    fn get_config<U: Driver>(_packet: &SetupPacket) -> Handshake {
        Handshake::Ack
    }

    fn set_config<U: Driver>(_packet: &SetupPacket) -> Handshake {
        U::configured(true);
        Handshake::Ack
    }

    fn get_configuration<U: Driver>() -> u8 {
        TEST_CONFIG_DESCRIPTOR.b_configuration_value
    }
}

/// The scripted controller driver, generic over the device it serves
///
/// All instantiations share one global state; the [`lock`] serializes that.
pub struct MockCtl<D>(core::marker::PhantomData<D>);

/// The controller driver used by the dispatch layer tests
pub type MockUsb = MockCtl<TestDevice>;

impl<D: Device> Driver for MockCtl<D> {
    type Device = D;

    const ENDPOINT_COUNT: u8 = ENDPOINTS as u8;

    fn endpoint_size(_endpoint: u8, _ty: TransferType) -> u16 {
        64
    }

    fn is_valid_endpoint(_endpoint: u8, _ty: TransferType) -> bool {
        true
    }

    fn write(
        callback: Option<TransferCallback>,
        endpoint: u8,
        _mode: EndpointMode,
        data: &'static [u8],
    ) -> bool {
        with_state(|s| {
            let slot = &mut s.writes[endpoint as usize];
            if slot.is_some() {
                // at most one armed transfer per endpoint and direction
                return false;
            }

            *slot = Some(PendingWrite {
                data: data.to_vec(),
                callback,
            });
            true
        })
    }

    fn read(
        callback: Option<TransferCallback>,
        endpoint: u8,
        mode: EndpointMode,
        data: &'static mut [u8],
    ) -> bool {
        let min_size = data.len() as u32;
        Self::read_min(callback, endpoint, mode, data, min_size)
    }

    fn read_min(
        callback: Option<TransferCallback>,
        endpoint: u8,
        _mode: EndpointMode,
        data: &'static mut [u8],
        min_size: u32,
    ) -> bool {
        with_state(|s| {
            let slot = &mut s.reads[endpoint as usize];
            if slot.is_some() {
                return false;
            }

            *slot = Some(PendingRead {
                ptr: data.as_mut_ptr() as usize,
                len: data.len(),
                min_size,
                callback,
            });
            true
        })
    }

    fn is_pending(endpoint: u8, mode: EndpointMode) -> bool {
        with_state(|s| match mode {
            EndpointMode::Out => s.reads[endpoint as usize].is_some(),
            _ => s.writes[endpoint as usize].is_some(),
        })
    }

    fn stall(endpoint: u8, mode: EndpointMode) {
        with_state(|s| {
            *s.stalled(endpoint, mode) = true;
            s.events.push(Event::Stall(endpoint, mode));
        });
        finish(endpoint, mode, Error::Stall);
    }

    fn un_stall(endpoint: u8, mode: EndpointMode) {
        let was_stalled = with_state(|s| {
            let stalled = s.stalled(endpoint, mode);
            let was = *stalled;
            *stalled = false;
            was
        });

        if !was_stalled {
            return;
        }

        with_state(|s| s.events.push(Event::UnStall(endpoint, mode)));
        finish(endpoint, mode, Error::UnStall);
    }

    fn is_stalled(endpoint: u8, mode: EndpointMode) -> bool {
        with_state(|s| *s.stalled(endpoint, mode))
    }

    fn ack(endpoint: u8, mode: EndpointMode) {
        with_state(|s| s.events.push(Event::Ack(endpoint, mode)));
    }

    fn cancel(endpoint: u8, mode: EndpointMode) {
        with_state(|s| s.events.push(Event::Cancel(endpoint, mode)));
        finish(endpoint, mode, Error::Cancel);
    }

    fn reset(endpoint: u8, mode: EndpointMode) {
        with_state(|s| s.events.push(Event::Reset(endpoint, mode)));
        finish(endpoint, mode, Error::Reset);
    }

    fn configure(endpoint: u8, mode: EndpointMode, ty: TransferType, size: u32) {
        with_state(|s| s.events.push(Event::Configure(endpoint, mode, ty, size)));
    }

    fn configured(configured: bool) {
        with_state(|s| s.events.push(Event::Configured(configured)));
    }

    fn set_device_address(address: u8) -> Handshake {
        with_state(|s| s.pending_address = Some(address));
        Handshake::Ack
    }

    fn connect() {
        with_state(|s| s.events.push(Event::Connect));
    }

    fn disconnect() {
        with_state(|s| s.events.push(Event::Disconnect));
    }
}
