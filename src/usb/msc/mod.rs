//! USB mass storage class, bulk-only transport
//!
//! [`MassStorage`] is a complete mass storage device: descriptors, the
//! class-specific control requests (GET_MAX_LUN, bulk-only reset) and the
//! bulk-only transport engine. The transport cycles through CBW reception,
//! an optional data stage and CSW transmission; every stage is a transfer
//! callback, so the whole engine runs from the USB interrupt.
//!
//! The storage itself is provided through the [`Memory`] backend trait. The
//! [virtual FAT] filesystem implements a compatible surface and is the
//! canonical backend for testing.
//!
//! [virtual FAT]: ../../fat/index.html

pub mod bot;

use core::marker::PhantomData;
use core::slice;

use crate::cell::IsrState;

use self::bot::{
    CommandBlockWrapper, CommandStatus, CommandStatusWrapper, ScsiCommand, CBW_SIZE, CSW_SIZE,
};
use super::descriptor::{
    le16, Configuration, DescriptorBytes, DescriptorType, Device as DeviceDescriptor, Endpoint,
    Interface, StringDescriptor, TransferType,
};
use super::device::Device;
use super::setup::{SetupPacket, UsbVersion};
use super::stack;
use super::{
    endpoint_mode, endpoint_number, Driver, EndpointMode, Error, Handshake, CONTROL_ENDPOINT,
};

/// The block size of the transport; CBW addresses count in these
pub const BLOCK_SIZE: u32 = 512;

/// Marker reported in READ_FORMAT_CAPACITIES for formatted media
const FORMATTED_MEDIA: u32 = 0x0200_0000;

/// Memory backend of the mass storage device
///
/// Addresses are byte offsets; the transport only ever accesses whole
/// [`BLOCK_SIZE`] blocks within the reported [`size`].
///
/// [`size`]: #tymethod.size
pub trait Memory {
    /// Initialize the memory; called when the USB stack initializes
    fn init();

    /// Spin the memory up
    fn start();

    /// Flush pending writes and spin the memory down
    fn stop() -> bool;

    /// Whether the memory can accept commands
    fn ready() -> bool;

    /// Whether the host may remove the medium
    fn can_remove() -> bool;

    /// Total size in bytes
    fn size() -> u32;

    /// Whether the medium accepts writes
    fn is_writable() -> bool;

    /// Read `data.len()` bytes starting at byte offset `address`
    fn read(data: &mut [u8], address: u32) -> bool;

    /// Write `data` starting at byte offset `address`
    fn write(data: &[u8], address: u32) -> bool;
}

/// Mass storage class requests (`b_request`)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ClassRequest {
    GetMaxLun,
    BulkOnlyReset,
}

impl ClassRequest {
    fn from_request(raw: u8) -> Option<Self> {
        Some(match raw {
            0xfe => ClassRequest::GetMaxLun,
            0xff => ClassRequest::BulkOnlyReset,
            _ => return None,
        })
    }
}

/// Progress of a READ(10)/WRITE(10) data stage
struct Block {
    address: u32,
    count: u32,
}

struct State {
    /// Configuration selected by the host; zero means unconfigured
    configuration: u8,

    /// Alternate setting selected through SET_INTERFACE
    interface: u8,

    /// Highest supported logical unit number (0: one LUN)
    max_lun: u8,

    /// Receive buffer for the command block wrapper
    cbw_raw: [u8; CBW_SIZE],

    /// The status wrapper under construction
    csw: CommandStatusWrapper,

    /// Wire image of the CSW while it is in flight
    csw_raw: [u8; CSW_SIZE],

    /// The block range of the active READ(10)/WRITE(10)
    transfer: Block,

    /// Bytes the host asked for in the CBW
    expected: u32,

    /// Bytes moved during the data stage, for the CSW residue
    data_moved: u32,

    /// One block of data, also used for the short command responses
    block_buffer: [u8; BLOCK_SIZE as usize],
}

static STATE: IsrState<State> = IsrState::new(State {
    configuration: 0,
    interface: 0,
    max_lun: 0,
    cbw_raw: [0; CBW_SIZE],
    csw: CommandStatusWrapper::new(),
    csw_raw: [0; CSW_SIZE],
    transfer: Block {
        address: 0,
        count: 0,
    },
    expected: 0,
    data_moved: 0,
    block_buffer: [0; BLOCK_SIZE as usize],
});

// Test use only! From http://pid.codes/1209/0001/
const VENDOR_ID: u16 = 0x1209;
const PRODUCT_ID: u16 = 0x0001;

static DEVICE_DESCRIPTOR: DeviceDescriptor = DeviceDescriptor {
    b_length: 18,
    b_descriptor_type: DescriptorType::Device as u8,
    bcd_usb: le16(UsbVersion::V2_0 as u16),
    // class comes from the interface descriptor
    b_device_class: 0,
    b_device_sub_class: 0,
    b_device_protocol: 0,
    b_max_packet_size: 64,
    id_vendor: le16(VENDOR_ID),
    id_product: le16(PRODUCT_ID),
    bcd_device: le16(0x0100),
    i_manufacturer: 1,
    i_product: 2,
    i_serial_number: 3,
    b_num_configurations: 1,
};

static LANGUAGE: StringDescriptor<2> = StringDescriptor::LANG_US_ENGLISH;
static MANUFACTURER: StringDescriptor<14> = StringDescriptor::from_ascii("cmx-hal");
static PRODUCT: StringDescriptor<32> = StringDescriptor::from_ascii("CMX Mass Storage");
static SERIAL: StringDescriptor<8> = StringDescriptor::from_ascii("0001");

/// The configuration descriptor with its subordinates, sent as one block
#[repr(C)]
struct ConfigDescriptor {
    configuration: Configuration,
    interface: Interface,
    endpoint_in: Endpoint,
    endpoint_out: Endpoint,
}

const _: () = assert!(core::mem::size_of::<ConfigDescriptor>() == 32);
unsafe impl DescriptorBytes for ConfigDescriptor {}

/// USB mass storage device over two bulk endpoints
///
/// `IN_EP` and `OUT_EP` are endpoint *addresses* (direction bit included),
/// matching how they appear in the endpoint descriptors.
pub struct MassStorage<M, const IN_EP: u8 = 0x82, const OUT_EP: u8 = 0x02> {
    _memory: PhantomData<M>,
}

impl<M: Memory, const IN_EP: u8, const OUT_EP: u8> MassStorage<M, IN_EP, OUT_EP> {
    const CONFIG: ConfigDescriptor = ConfigDescriptor {
        configuration: Configuration {
            b_length: 9,
            b_descriptor_type: DescriptorType::Configuration as u8,
            w_total_length: le16(32),
            b_num_interfaces: 1,
            b_configuration_value: 1,
            i_configuration: 0,
            // bus powered
            bm_attributes: 0x80,
            b_max_power: 50,
        },
        interface: Interface {
            b_length: 9,
            b_descriptor_type: DescriptorType::Interface as u8,
            b_interface_number: 0,
            b_alternate_setting: 0,
            b_num_endpoints: 2,
            // mass storage, SCSI transparent command set, bulk-only
            b_interface_class: 0x08,
            b_interface_sub_class: 0x06,
            b_interface_protocol: 0x50,
            i_interface: 0,
        },
        endpoint_in: Endpoint {
            b_length: 7,
            b_descriptor_type: DescriptorType::Endpoint as u8,
            b_endpoint_address: IN_EP,
            bm_attributes: TransferType::Bulk as u8,
            w_max_packet_size: le16(64),
            b_interval: 0,
        },
        endpoint_out: Endpoint {
            b_length: 7,
            b_descriptor_type: DescriptorType::Endpoint as u8,
            b_endpoint_address: OUT_EP,
            bm_attributes: TransferType::Bulk as u8,
            w_max_packet_size: le16(64),
            b_interval: 0,
        },
    };

    fn config_bytes() -> &'static [u8] {
        let config: &'static ConfigDescriptor = &Self::CONFIG;
        config.descriptor_bytes()
    }

    /// Common entry of every transport callback
    ///
    /// Returns whether the stage should proceed. `continue_on_nak` is set
    /// for the memory write stage, which has to keep consuming data.
    fn stage_entry<U: Driver>(
        endpoint: u8,
        mode: EndpointMode,
        error: Error,
        continue_on_nak: bool,
    ) -> bool {
        match error {
            Error::Stall | Error::Reset => {
                U::stall(endpoint, mode);
                return false;
            }
            Error::UnStall | Error::Cancel => return false,
            Error::Nak if !continue_on_nak => return false,
            _ => {}
        }

        // control transfers still need their status stage
        if endpoint == CONTROL_ENDPOINT {
            U::ack(endpoint, mode);
        }

        true
    }

    /// Arm the bulk-out endpoint for the next command block
    fn wait_for_cbw<U: Driver>() {
        let state = unsafe { STATE.get() };

        U::read(
            Some(Self::cb_receive_cbw::<U>),
            endpoint_number(OUT_EP),
            endpoint_mode(OUT_EP),
            &mut state.cbw_raw,
        );
    }

    fn cb_wait_for_cbw<U: Driver>(endpoint: u8, mode: EndpointMode, error: Error, _n: u32) {
        if Self::stage_entry::<U>(endpoint, mode, error, false) {
            Self::wait_for_cbw::<U>();
        }
    }

    fn cb_receive_cbw<U: Driver>(endpoint: u8, mode: EndpointMode, error: Error, transferred: u32) {
        if !Self::stage_entry::<U>(endpoint, mode, error, false) {
            return;
        }

        if !Self::receive_cbw::<U>(transferred) {
            // an invalid wrapper stalls the bulk-out endpoint until the
            // host runs reset recovery
            U::stall(endpoint, mode);
        }
    }

    fn cb_send_csw<U: Driver>(endpoint: u8, mode: EndpointMode, error: Error, _n: u32) {
        if Self::stage_entry::<U>(endpoint, mode, error, false) {
            Self::send_csw::<U>();
        }
    }

    fn cb_memory_read<U: Driver>(endpoint: u8, mode: EndpointMode, error: Error, _n: u32) {
        if Self::stage_entry::<U>(endpoint, mode, error, false) {
            Self::read_memory::<U>();
        }
    }

    fn cb_memory_write<U: Driver>(endpoint: u8, mode: EndpointMode, error: Error, _n: u32) {
        if Self::stage_entry::<U>(endpoint, mode, error, true) {
            Self::write_memory::<U>();
        }
    }

    /// Validate the received wrapper and dispatch its SCSI command
    ///
    /// Returns `false` when the wrapper is invalid and the endpoint must be
    /// stalled; no memory access happens in that case.
    fn receive_cbw<U: Driver>(transferred: u32) -> bool {
        let state = unsafe { STATE.get() };

        let cbw = CommandBlockWrapper::from_le_bytes(&state.cbw_raw);

        if transferred != CBW_SIZE as u32 || !cbw.is_valid() {
            return false;
        }

        // the CSW echoes the tag of the command it answers
        state.csw.tag = cbw.tag;
        state.csw.status = CommandStatus::Passed as u8;
        state.expected = cbw.data_transfer_length;
        state.data_moved = 0;

        let command = match ScsiCommand::from_opcode(cbw.cb[0]) {
            Some(command) => command,
            None => {
                // unknown operation code; report a failure
                state.csw.status = CommandStatus::Failed as u8;
                Self::send_csw::<U>();
                return true;
            }
        };

        match command {
            ScsiCommand::TestUnitReady => {
                state.csw.status = if M::ready() {
                    CommandStatus::Passed as u8
                } else {
                    CommandStatus::Failed as u8
                };

                Self::send_csw::<U>();
            }
            ScsiCommand::RequestSense => Self::send_sense_data::<U>(),
            ScsiCommand::Inquiry => Self::send_inquiry::<U>(),
            ScsiCommand::StartStopUnit => {
                if cbw.cb[3] & 0x2 != 0 {
                    // flush pending writes and report the result
                    state.csw.status = if M::stop() {
                        CommandStatus::Passed as u8
                    } else {
                        CommandStatus::Failed as u8
                    };
                } else {
                    M::start();

                    state.csw.status = if M::ready() {
                        CommandStatus::Passed as u8
                    } else {
                        CommandStatus::Failed as u8
                    };
                }

                Self::send_csw::<U>();
            }
            ScsiCommand::ModeSense6 | ScsiCommand::ModeSense10 => Self::send_mode_sense::<U>(),
            ScsiCommand::AllowMediumRemoval => {
                state.csw.status = if M::can_remove() {
                    CommandStatus::Passed as u8
                } else {
                    CommandStatus::Failed as u8
                };

                Self::send_csw::<U>();
            }
            ScsiCommand::ReceiveDiagnosticResult => Self::send_response::<U>(32),
            ScsiCommand::ReadFormatCapacities => Self::send_format_capacity::<U>(),
            ScsiCommand::ReadCapacity10 => Self::send_capacity10::<U>(),
            ScsiCommand::ReadCapacity16 => Self::send_capacity16::<U>(),
            ScsiCommand::Read10 | ScsiCommand::Write10 => {
                state.transfer.address = cbw.block_address();
                state.transfer.count = cbw.block_count();

                if command == ScsiCommand::Read10 {
                    Self::read_memory::<U>();
                } else {
                    Self::request_data_write::<U>();
                }
            }
        }

        true
    }

    /// Send the first `size` bytes of the response buffer, CSW afterwards
    fn send_response<U: Driver>(size: usize) {
        let state = unsafe { STATE.get() };
        state.data_moved += size as u32;

        U::write(
            Some(Self::cb_send_csw::<U>),
            endpoint_number(IN_EP),
            endpoint_mode(IN_EP),
            &unsafe { STATE.get() }.block_buffer[..size],
        );
    }

    fn send_sense_data<U: Driver>() {
        let state = unsafe { STATE.get() };

        let buffer = &mut state.block_buffer[..18];
        buffer.fill(0);

        // fixed format sense data
        buffer[0] = 0x70;
        // not ready when the backend says so
        buffer[2] = if M::ready() { 0x00 } else { 0x02 };
        // ten bytes of additional sense follow
        buffer[7] = 10;
        // additional sense: medium not present
        buffer[12] = 0x3a;
        buffer[13] = 0x00;

        Self::send_response::<U>(18);
    }

    fn send_inquiry<U: Driver>() {
        let state = unsafe { STATE.get() };

        let buffer = &mut state.block_buffer[..36];
        buffer.fill(0);

        buffer[0] = 0x00; // direct-access block device
        buffer[1] = 0x80; // removable medium
        buffer[2] = 0x02; // version
        buffer[3] = 0x02; // response data format
        buffer[4] = 0x1f; // additional length (36 bytes total)
        buffer[5] = 0x73; // SCCS, ACC, 3PC, PROTECT
        buffer[6] = 0x6d; // BQUE, ENCSERV, MULTIP, MCHNGR, ADDR16
        buffer[7] = 0x69; // WBUS16, SYNC, CMDQUE, VS

        buffer[8..16].copy_from_slice(b"CMX     ");
        buffer[16..32].copy_from_slice(b"Mass Storage    ");
        buffer[32..36].copy_from_slice(b"1.0 ");

        Self::send_response::<U>(36);
    }

    fn send_mode_sense<U: Driver>() {
        let state = unsafe { STATE.get() };

        let buffer = &mut state.block_buffer[..4];

        buffer[0] = 0x04;
        buffer[1] = 0x00;
        // the write protect bit mirrors the backend
        buffer[2] = if M::is_writable() { 0x10 } else { 0x90 };
        buffer[3] = 0x00;

        Self::send_response::<U>(4);
    }

    fn send_format_capacity<U: Driver>() {
        let state = unsafe { STATE.get() };

        // the number of the last block on the "disk"
        let blocks = (M::size() / BLOCK_SIZE) - 1;

        let buffer = &mut state.block_buffer[..12];

        // capacity list header, one descriptor
        buffer[0..4].copy_from_slice(&[0x00, 0x00, 0x00, 0x08]);
        buffer[4..8].copy_from_slice(&blocks.to_be_bytes());
        buffer[8..12].copy_from_slice(&(BLOCK_SIZE | FORMATTED_MEDIA).to_be_bytes());

        Self::send_response::<U>(12);
    }

    fn send_capacity10<U: Driver>() {
        let state = unsafe { STATE.get() };

        let blocks = (M::size() / BLOCK_SIZE) - 1;

        let buffer = &mut state.block_buffer[..8];

        buffer[0..4].copy_from_slice(&blocks.to_be_bytes());
        buffer[4..8].copy_from_slice(&BLOCK_SIZE.to_be_bytes());

        Self::send_response::<U>(8);
    }

    fn send_capacity16<U: Driver>() {
        let state = unsafe { STATE.get() };

        let blocks = u64::from((M::size() / BLOCK_SIZE) - 1);

        let buffer = &mut state.block_buffer[..32];
        buffer.fill(0);

        buffer[0..8].copy_from_slice(&blocks.to_be_bytes());
        buffer[8..12].copy_from_slice(&BLOCK_SIZE.to_be_bytes());

        Self::send_response::<U>(32);
    }

    /// Data-in stage of READ(10): one block per round trip
    fn read_memory<U: Driver>() {
        let state = unsafe { STATE.get() };

        if state.transfer.count == 0 {
            Self::send_csw::<U>();
            return;
        }

        if !M::read(
            &mut state.block_buffer,
            state.transfer.address * BLOCK_SIZE,
        ) {
            state.csw.status = CommandStatus::Failed as u8;
        }

        state.transfer.count -= 1;
        state.transfer.address += 1;
        state.data_moved += BLOCK_SIZE;

        U::write(
            Some(Self::cb_memory_read::<U>),
            endpoint_number(IN_EP),
            endpoint_mode(IN_EP),
            &unsafe { STATE.get() }.block_buffer[..],
        );
    }

    /// Data-out stage of WRITE(10): request the next block from the host
    fn request_data_write<U: Driver>() {
        let state = unsafe { STATE.get() };

        if state.transfer.count == 0 {
            Self::send_csw::<U>();
            return;
        }

        U::read(
            Some(Self::cb_memory_write::<U>),
            endpoint_number(OUT_EP),
            endpoint_mode(OUT_EP),
            &mut state.block_buffer,
        );
    }

    fn write_memory<U: Driver>() {
        let state = unsafe { STATE.get() };

        if !M::write(&state.block_buffer, state.transfer.address * BLOCK_SIZE) {
            state.csw.status = CommandStatus::Failed as u8;
        }

        state.transfer.count -= 1;
        state.transfer.address += 1;
        state.data_moved += BLOCK_SIZE;

        Self::request_data_write::<U>();
    }

    /// Send the status wrapper, then wait for the next command
    fn send_csw<U: Driver>() {
        let state = unsafe { STATE.get() };

        state.csw.data_residue = state.expected.saturating_sub(state.data_moved);
        state.csw_raw = state.csw.to_le_bytes();

        U::write(
            Some(Self::cb_wait_for_cbw::<U>),
            endpoint_number(IN_EP),
            endpoint_mode(IN_EP),
            &unsafe { STATE.get() }.csw_raw,
        );
    }
}

impl<M: Memory, const IN_EP: u8, const OUT_EP: u8> Device for MassStorage<M, IN_EP, OUT_EP> {
    fn init<U: Driver>() {
        assert!(
            U::is_valid_endpoint(endpoint_number(IN_EP), TransferType::Bulk)
                && U::is_valid_endpoint(endpoint_number(OUT_EP), TransferType::Bulk),
            "endpoints do not support bulk transfers"
        );

        let state = unsafe { STATE.get() };
        state.configuration = 0;
        state.interface = 0;
        state.transfer = Block {
            address: 0,
            count: 0,
        };
        state.expected = 0;
        state.data_moved = 0;

        M::init();
    }

    fn get_descriptor<U: Driver>(
        _packet: &SetupPacket,
        ty: DescriptorType,
        index: u8,
    ) -> Option<&'static [u8]> {
        match ty {
            DescriptorType::Device => Some(DEVICE_DESCRIPTOR.descriptor_bytes()),
            DescriptorType::Configuration => Some(Self::config_bytes()),
            DescriptorType::String => match index {
                0 => Some(LANGUAGE.descriptor_bytes()),
                1 => Some(MANUFACTURER.descriptor_bytes()),
                2 => Some(PRODUCT.descriptor_bytes()),
                3 => Some(SERIAL.descriptor_bytes()),
                _ => None,
            },
            _ => None,
        }
    }

    fn get_config<U: Driver>(_packet: &SetupPacket) -> Handshake {
        let state = unsafe { STATE.get() };

        if U::write(
            Some(stack::status_callback::<U>),
            CONTROL_ENDPOINT,
            EndpointMode::In,
            slice::from_ref(&state.configuration),
        ) {
            Handshake::Wait
        } else {
            Handshake::Stall
        }
    }

    fn set_config<U: Driver>(packet: &SetupPacket) -> Handshake {
        let state = unsafe { STATE.get() };

        if packet.w_value == Self::CONFIG.configuration.b_configuration_value as u16 {
            U::configure(
                endpoint_number(IN_EP),
                endpoint_mode(IN_EP),
                TransferType::Bulk,
                64,
            );
            U::configure(
                endpoint_number(OUT_EP),
                endpoint_mode(OUT_EP),
                TransferType::Bulk,
                64,
            );

            state.configuration = packet.w_value as u8;
            U::configured(true);

            M::start();

            // the transport starts by listening for the first command
            Self::wait_for_cbw::<U>();

            Handshake::Ack
        } else if packet.w_value == 0 {
            U::configured(false);

            if state.configuration != 0 {
                U::reset(endpoint_number(IN_EP), endpoint_mode(IN_EP));
                U::reset(endpoint_number(OUT_EP), endpoint_mode(OUT_EP));
            }

            state.configuration = 0;
            Handshake::Ack
        } else {
            Handshake::Stall
        }
    }

    fn get_configuration<U: Driver>() -> u8 {
        Self::CONFIG.configuration.b_configuration_value
    }

    fn get_interface<U: Driver>(_packet: &SetupPacket) -> Handshake {
        let state = unsafe { STATE.get() };

        if U::write(
            Some(stack::status_callback::<U>),
            CONTROL_ENDPOINT,
            EndpointMode::In,
            slice::from_ref(&state.interface),
        ) {
            Handshake::Wait
        } else {
            Handshake::Stall
        }
    }

    fn set_interface<U: Driver>(packet: &SetupPacket) -> Handshake {
        unsafe { STATE.get() }.interface = packet.w_value as u8;
        Handshake::Ack
    }

    fn handle_class_packet<U: Driver>(packet: &SetupPacket) -> Handshake {
        let request = match ClassRequest::from_request(packet.b_request) {
            Some(request) => request,
            None => return Handshake::Stall,
        };

        match request {
            ClassRequest::GetMaxLun => {
                let state = unsafe { STATE.get() };

                if U::write(
                    Some(Self::cb_wait_for_cbw::<U>),
                    CONTROL_ENDPOINT,
                    EndpointMode::In,
                    slice::from_ref(&state.max_lun),
                ) {
                    // the status stage is generated from the callback
                    Handshake::Wait
                } else {
                    Handshake::Stall
                }
            }
            ClassRequest::BulkOnlyReset => {
                // reset recovery: drop whatever transfer was in flight and
                // listen for a fresh command block
                U::cancel(endpoint_number(OUT_EP), endpoint_mode(OUT_EP));
                Self::wait_for_cbw::<U>();

                Handshake::Ack
            }
        }
    }

    fn bus_reset<U: Driver>() {
        unsafe { STATE.get() }.configuration = 0;
    }

    fn disconnected<U: Driver>() {
        // flush pending writes; the host is gone
        M::stop();
        unsafe { STATE.get() }.configuration = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::bot::CBW_SIGNATURE;
    use super::*;
    use crate::usb::mock::{self, Event, MockCtl};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::vec::Vec;

    static READS: AtomicUsize = AtomicUsize::new(0);
    static WRITES: Mutex<Vec<(u32, Vec<u8>)>> = Mutex::new(Vec::new());

    /// 64 KiB of deterministic pattern data
    struct TestMemory;

    impl Memory for TestMemory {
        fn init() {}
        fn start() {}
        fn stop() -> bool {
            true
        }
        fn ready() -> bool {
            true
        }
        fn can_remove() -> bool {
            true
        }
        fn size() -> u32 {
            64 * 1024
        }
        fn is_writable() -> bool {
            true
        }

        fn read(data: &mut [u8], address: u32) -> bool {
            READS.fetch_add(1, Ordering::SeqCst);
            for (i, byte) in data.iter_mut().enumerate() {
                *byte = ((address as usize + i) % 251) as u8;
            }
            true
        }

        fn write(data: &[u8], address: u32) -> bool {
            WRITES
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((address, data.to_vec()));
            true
        }
    }

    type Msc = MassStorage<TestMemory, 0x82, 0x02>;
    type Usb = MockCtl<Msc>;

    fn cbw(opcode_block: &[u8], transfer_length: u32, direction_in: bool) -> [u8; CBW_SIZE] {
        let mut raw = [0; CBW_SIZE];
        raw[0..4].copy_from_slice(&CBW_SIGNATURE.to_le_bytes());
        raw[4..8].copy_from_slice(&0x0042_1337u32.to_le_bytes());
        raw[8..12].copy_from_slice(&transfer_length.to_le_bytes());
        raw[12] = if direction_in { 0x80 } else { 0x00 };
        raw[13] = 0;
        raw[14] = opcode_block.len() as u8;
        raw[15..15 + opcode_block.len()].copy_from_slice(opcode_block);
        raw
    }

    fn configure() {
        READS.store(0, Ordering::SeqCst);
        WRITES.lock().unwrap_or_else(|e| e.into_inner()).clear();

        Msc::init::<Usb>();
        stack::handle_setup_packet::<Usb>(&SetupPacket::from_le_bytes(&[
            0x00, 0x09, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]));
        mock::clear_events();

        assert!(mock::has_read(2), "transport should be waiting for a CBW");
        assert_eq!(mock::read_min_size(2), CBW_SIZE as u32);
    }

    fn expect_csw(status: u8, residue: u32) {
        let csw = mock::complete_in(2);
        assert_eq!(csw.len(), CSW_SIZE);
        assert_eq!(&csw[0..4], &[0x55, 0x53, 0x42, 0x53]);
        assert_eq!(&csw[4..8], &0x0042_1337u32.to_le_bytes());
        assert_eq!(&csw[8..12], &residue.to_le_bytes());
        assert_eq!(csw[12], status);

        // the transport is back to waiting for the next command
        assert!(mock::has_read(2));
    }

    #[test]
    fn inquiry_returns_36_bytes_and_a_passing_csw() {
        let _guard = mock::lock();
        configure();

        mock::complete_out(2, &cbw(&[0x12, 0, 0, 0, 36, 0], 36, true));

        let data = mock::complete_in(2);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[0..8], &[0x00, 0x80, 0x02, 0x02, 0x1f, 0x73, 0x6d, 0x69]);
        assert_eq!(&data[8..16], b"CMX     ");

        expect_csw(CommandStatus::Passed as u8, 0);
    }

    #[test]
    fn read10_of_one_block_returns_backend_data() {
        let _guard = mock::lock();
        configure();

        // READ(10), LBA 0, 1 block
        mock::complete_out(
            2,
            &cbw(&[0x28, 0, 0, 0, 0, 0, 0, 0, 1, 0], 512, true),
        );

        let data = mock::complete_in(2);
        assert_eq!(data.len(), 512);
        for (i, byte) in data.iter().enumerate() {
            assert_eq!(*byte, (i % 251) as u8);
        }

        expect_csw(CommandStatus::Passed as u8, 0);
    }

    #[test]
    fn read10_residue_covers_short_reads() {
        let _guard = mock::lock();
        configure();

        // host expects 1024 bytes but asks for a single block
        mock::complete_out(
            2,
            &cbw(&[0x28, 0, 0, 0, 0, 0, 0, 0, 1, 0], 1024, true),
        );

        let data = mock::complete_in(2);
        assert_eq!(data.len(), 512);

        expect_csw(CommandStatus::Passed as u8, 512);
    }

    #[test]
    fn write10_passes_data_to_the_backend() {
        let _guard = mock::lock();
        configure();

        // WRITE(10), LBA 3, 1 block
        mock::complete_out(
            2,
            &cbw(&[0x2a, 0, 0, 0, 0, 3, 0, 0, 1, 0], 512, false),
        );

        // the transport asks for one block of data
        assert!(mock::has_read(2));
        let block = [0xabu8; 512];
        mock::complete_out(2, &block);

        expect_csw(CommandStatus::Passed as u8, 0);

        let writes = WRITES.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, 3 * 512);
        assert!(writes[0].1.iter().all(|b| *b == 0xab));
    }

    #[test]
    fn invalid_cbw_stalls_without_memory_access() {
        let _guard = mock::lock();
        configure();

        let mut bad = cbw(&[0x28, 0, 0, 0, 0, 0, 0, 0, 1, 0], 512, true);
        bad[0] = 0xff;
        mock::complete_out(2, &bad);

        assert_eq!(mock::events(), &[Event::Stall(2, EndpointMode::Out)]);
        assert_eq!(READS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cbw_with_oversized_command_block_stalls() {
        let _guard = mock::lock();
        configure();

        let mut bad = cbw(&[0x12, 0, 0, 0, 36, 0], 36, true);
        bad[14] = 17;
        mock::complete_out(2, &bad);

        assert_eq!(mock::events(), &[Event::Stall(2, EndpointMode::Out)]);
    }

    #[test]
    fn unknown_opcode_fails_the_command() {
        let _guard = mock::lock();
        configure();

        mock::complete_out(2, &cbw(&[0xfc, 0, 0, 0, 0, 0], 0, false));

        expect_csw(CommandStatus::Failed as u8, 0);
        assert_eq!(READS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn read_capacity10_reports_last_block_and_block_size() {
        let _guard = mock::lock();
        configure();

        mock::complete_out(2, &cbw(&[0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0], 8, true));

        let data = mock::complete_in(2);
        // 64 KiB disk: 128 blocks, last block 127, big-endian
        assert_eq!(&data[0..4], &[0, 0, 0, 127]);
        assert_eq!(&data[4..8], &[0, 0, 2, 0]);

        expect_csw(CommandStatus::Passed as u8, 0);
    }

    #[test]
    fn mode_sense_reflects_write_protection() {
        let _guard = mock::lock();
        configure();

        mock::complete_out(2, &cbw(&[0x1a, 0, 0, 0, 4, 0], 4, true));

        let data = mock::complete_in(2);
        assert_eq!(data, &[0x04, 0x00, 0x10, 0x00]);

        expect_csw(CommandStatus::Passed as u8, 0);
    }

    #[test]
    fn get_max_lun_answers_on_the_control_endpoint() {
        let _guard = mock::lock();
        configure();

        stack::handle_setup_packet::<Usb>(&SetupPacket::from_le_bytes(&[
            0xa1, 0xfe, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
        ]));

        assert_eq!(mock::complete_in(0), &[0x00]);
    }
}
