//! USB HID keyboard device
//!
//! A boot-compatible HID keyboard with a single interrupt IN endpoint.
//! Reports are 3 bytes: report id (always 1), modifier byte, keycode byte.
//!
//! Besides raw keycodes ([`Keyboard::write_key`]), the keyboard can type
//! ASCII characters and whole strings ([`Keyboard::write_str`]): each
//! character is encoded to its usage id, and an all-keys-released report is
//! inserted between two identical consecutive characters so the host counts
//! them as separate keystrokes. Writes are non-blocking; the string is
//! streamed from the transfer callback and [`Keyboard::is_busy`] reports
//! completion.
//!
//! The endpoint number is a type parameter:
//!
//! ``` no_run
//! use cmx_hal::usb::keyboard::Keyboard;
//!
//! type Kbd = Keyboard<1>;
//! ```

use core::slice;

use crate::cell::IsrState;

use super::descriptor::{
    le16, Configuration, DescriptorBytes, DescriptorType, Device as DeviceDescriptor, Endpoint,
    Hid, Interface, StringDescriptor, TransferType,
};
use super::device::Device;
use super::setup::{Feature, RecipientCode, SetupPacket, UsbVersion};
use super::stack;
use super::{Driver, EndpointMode, Error, Handshake, CONTROL_ENDPOINT};

/// Keyboard usage ids from the HID usage tables, chapter 10
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Key {
    None = 0x00,
    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0a,
    H = 0x0b,
    I = 0x0c,
    J = 0x0d,
    K = 0x0e,
    L = 0x0f,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1a,
    X = 0x1b,
    Y = 0x1c,
    Z = 0x1d,
    Num1 = 0x1e,
    Num2 = 0x1f,
    Num3 = 0x20,
    Num4 = 0x21,
    Num5 = 0x22,
    Num6 = 0x23,
    Num7 = 0x24,
    Num8 = 0x25,
    Num9 = 0x26,
    Num0 = 0x27,
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2a,
    Tab = 0x2b,
    Space = 0x2c,
    Minus = 0x2d,
    Equal = 0x2e,
    BracketLeft = 0x2f,
    BracketRight = 0x30,
    Backslash = 0x31,
    Europe1 = 0x32,
    Semicolon = 0x33,
    Apostrophe = 0x34,
    Grave = 0x35,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,
    CapsLock = 0x39,
    F1 = 0x3a,
    F2 = 0x3b,
    F3 = 0x3c,
    F4 = 0x3d,
    F5 = 0x3e,
    F6 = 0x3f,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,
    PrintScreen = 0x46,
    ScrollLock = 0x47,
    Pause = 0x48,
    Insert = 0x49,
    Home = 0x4a,
    PageUp = 0x4b,
    Delete = 0x4c,
    End = 0x4d,
    PageDown = 0x4e,
    Right = 0x4f,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,
    NumLock = 0x53,
    KeypadDivide = 0x54,
    KeypadMultiply = 0x55,
    KeypadSubtract = 0x56,
    KeypadAdd = 0x57,
    KeypadEnter = 0x58,
    Keypad1 = 0x59,
    Keypad2 = 0x5a,
    Keypad3 = 0x5b,
    Keypad4 = 0x5c,
    Keypad5 = 0x5d,
    Keypad6 = 0x5e,
    Keypad7 = 0x5f,
    Keypad8 = 0x60,
    Keypad9 = 0x61,
    Keypad0 = 0x62,
    KeypadDecimal = 0x63,
    Europe2 = 0x64,
    Application = 0x65,
    Power = 0x66,
    KeypadEqual = 0x67,
    F13 = 0x68,
    F14 = 0x69,
    F15 = 0x6a,
    F16 = 0x6b,
    F17 = 0x6c,
    F18 = 0x6d,
    F19 = 0x6e,
    F20 = 0x6f,
    F21 = 0x70,
    F22 = 0x71,
    F23 = 0x72,
    F24 = 0x73,
    Execute = 0x74,
    Help = 0x75,
    Menu = 0x76,
    Select = 0x77,
    Stop = 0x78,
    Again = 0x79,
    Undo = 0x7a,
    Cut = 0x7b,
    Copy = 0x7c,
    Paste = 0x7d,
    Find = 0x7e,
    Mute = 0x7f,
    VolumeUp = 0x80,
    VolumeDown = 0x81,
    LockingCapsLock = 0x82,
    LockingNumLock = 0x83,
    LockingScrollLock = 0x84,
    KeypadComma = 0x85,
    KeypadEqualSign = 0x86,
    Lang1 = 0x90,
    Lang2 = 0x91,
    Lang3 = 0x92,
    Lang4 = 0x93,
    Lang5 = 0x94,
    ControlLeft = 0xe0,
    ShiftLeft = 0xe1,
    AltLeft = 0xe2,
    GuiLeft = 0xe3,
    ControlRight = 0xe4,
    ShiftRight = 0xe5,
    AltRight = 0xe6,
    GuiRight = 0xe7,
}

/// The left-shift modifier bit in the report's modifier byte
const MOD_LSHIFT: u8 = 0x02;

/// HID class requests (`b_request`)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ClassRequest {
    GetReport,
    GetIdle,
    GetProtocol,
    SetReport,
    SetIdle,
    SetProtocol,
}

impl ClassRequest {
    fn from_request(raw: u8) -> Option<Self> {
        Some(match raw {
            0x01 => ClassRequest::GetReport,
            0x02 => ClassRequest::GetIdle,
            0x03 => ClassRequest::GetProtocol,
            0x09 => ClassRequest::SetReport,
            0x0a => ClassRequest::SetIdle,
            0x0b => ClassRequest::SetProtocol,
            _ => return None,
        })
    }
}

/// The 3 byte keyboard input report
#[repr(C)]
struct KeycodeReport {
    /// Fixed report id for the keyboard (1)
    id: u8,
    modifier: u8,
    key: u8,
}

const _: () = assert!(core::mem::size_of::<KeycodeReport>() == 3);

impl KeycodeReport {
    fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self as *const Self as *const u8, 3) }
    }
}

/// A string being streamed to the host, character by character
struct Stream {
    data: &'static [u8],

    /// Index of the character the in-flight report carries
    index: usize,
}

struct State {
    /// Configuration selected by the host; zero means unconfigured
    configuration: u8,

    /// Whether the host enabled the remote wakeup feature
    remote_wakeup: bool,

    /// The report that is (or was last) on the wire
    report: KeycodeReport,

    /// Idle rate set through SET_IDLE, in 4 ms units
    idle: u8,

    stream: Option<Stream>,

    /// Whether the release report between two identical characters has
    /// already been sent
    repeated_key: bool,
}

static STATE: IsrState<State> = IsrState::new(State {
    configuration: 0,
    remote_wakeup: false,
    report: KeycodeReport {
        id: 1,
        modifier: 0,
        key: 0,
    },
    idle: 0,
    stream: None,
    repeated_key: false,
});

/// Report descriptor: one application collection with an 8 bit modifier
/// field and one keycode byte, under report id 1
static REPORT_DESCRIPTOR: [u8; 39] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xa1, 0x01, // Collection (Application)
    0x85, 0x01, //     Report ID (1)
    0x05, 0x07, //     Usage Page (Keyboard/Keypad)
    0x19, 0xe0, //     Usage Minimum (224)
    0x29, 0xe7, //     Usage Maximum (231)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x08, //     Report Count (8)
    0x81, 0x02, //     Input (Data, Variable, Absolute) ; modifier byte
    0x19, 0x00, //     Usage Minimum (0)
    0x29, 0x65, //     Usage Maximum (101)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x65, //     Logical Maximum (101)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x00, //     Input (Data, Array) ; keycode byte
    0xc0, // End Collection
];

// Test use only! From http://pid.codes/1209/0001/
const VENDOR_ID: u16 = 0x1209;
const PRODUCT_ID: u16 = 0x0001;

static DEVICE_DESCRIPTOR: DeviceDescriptor = DeviceDescriptor {
    b_length: 18,
    b_descriptor_type: DescriptorType::Device as u8,
    bcd_usb: le16(UsbVersion::V1_1 as u16),
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
static PRODUCT: StringDescriptor<24> = StringDescriptor::from_ascii("CMX Keyboard");
static SERIAL: StringDescriptor<8> = StringDescriptor::from_ascii("0001");

/// The configuration descriptor with its subordinates, sent as one block
#[repr(C)]
struct ConfigDescriptor {
    configuration: Configuration,
    interface: Interface,
    hid: Hid,
    endpoint: Endpoint,
}

const _: () = assert!(core::mem::size_of::<ConfigDescriptor>() == 34);
unsafe impl DescriptorBytes for ConfigDescriptor {}

/// USB HID keyboard, reporting on interrupt IN endpoint `EP`
pub struct Keyboard<const EP: u8 = 1>;

impl<const EP: u8> Keyboard<EP> {
    const CONFIG: ConfigDescriptor = ConfigDescriptor {
        configuration: Configuration {
            b_length: 9,
            b_descriptor_type: DescriptorType::Configuration as u8,
            w_total_length: le16(34),
            b_num_interfaces: 1,
            b_configuration_value: 1,
            i_configuration: 0,
            // bus powered, remote wakeup
            bm_attributes: 0xa0,
            b_max_power: 50,
        },
        interface: Interface {
            b_length: 9,
            b_descriptor_type: DescriptorType::Interface as u8,
            b_interface_number: 0,
            b_alternate_setting: 0,
            b_num_endpoints: 1,
            b_interface_class: 0x03,
            b_interface_sub_class: 0x00,
            b_interface_protocol: 0x00,
            i_interface: 0,
        },
        hid: Hid {
            b_length: 9,
            b_descriptor_type: DescriptorType::Hid as u8,
            bcd_hid: le16(0x0110),
            b_country_code: 0,
            b_num_descriptors: 1,
            b_class_descriptor_type: DescriptorType::HidReport as u8,
            w_descriptor_length: le16(REPORT_DESCRIPTOR.len() as u16),
        },
        endpoint: Endpoint {
            b_length: 7,
            b_descriptor_type: DescriptorType::Endpoint as u8,
            b_endpoint_address: 0x80 | EP,
            bm_attributes: TransferType::Interrupt as u8,
            w_max_packet_size: le16(64),
            b_interval: 1,
        },
    };

    fn config_bytes() -> &'static [u8] {
        let config: &'static ConfigDescriptor = &Self::CONFIG;
        config.descriptor_bytes()
    }

    /// Send the current report and re-arm the streaming callback
    fn send_report<U: Driver>() -> bool {
        let report = unsafe { STATE.get() }.report.as_bytes();

        U::write(Some(Self::hid_callback::<U>), EP, EndpointMode::In, report)
    }

    /// Streaming continuation, runs in interrupt context
    fn hid_callback<U: Driver>(_endpoint: u8, _mode: EndpointMode, error: Error, _transferred: u32) {
        if error != Error::NoError {
            return;
        }

        let state = unsafe { STATE.get() };

        if state.configuration == 0 {
            return;
        }

        let stream = match &mut state.stream {
            Some(stream) => stream,
            None => return,
        };

        if stream.index + 1 >= stream.data.len() {
            // everything sent; close the stream with an all-keys-released
            // report
            state.report.modifier = 0;
            state.report.key = Key::None as u8;
            state.stream = None;

            Self::send_report::<U>();
            return;
        }

        let current = stream.data[stream.index];
        let next = stream.data[stream.index + 1];

        if next == current && !state.repeated_key {
            // two identical characters in a row; release all keys in
            // between so the host sees two keystrokes
            state.report.modifier = 0;
            state.report.key = Key::None as u8;
            state.repeated_key = true;

            Self::send_report::<U>();
            return;
        }

        stream.index += 1;
        let ch = stream.data[stream.index];

        let (modifier, key) = encode_report(ch);
        state.report.modifier = modifier;
        state.report.key = key;
        state.repeated_key = false;

        Self::send_report::<U>();
    }

    fn is_invalid_or_busy<U: Driver>() -> bool {
        !Self::is_configured() || Self::is_busy::<U>()
    }

    /// Type a whole ASCII string
    ///
    /// Returns `false` without side effect when the keyboard is busy or not
    /// configured. The string is streamed from interrupt context; poll
    /// [`is_busy`] for completion.
    ///
    /// [`is_busy`]: #method.is_busy
    pub fn write_str<U: Driver>(data: &'static str) -> bool {
        let bytes = data.as_bytes();

        if bytes.is_empty() {
            // nothing to do here
            return true;
        }

        if Self::is_invalid_or_busy::<U>() {
            return false;
        }

        let state = unsafe { STATE.get() };

        let (modifier, key) = encode_report(bytes[0]);
        state.report.modifier = modifier;
        state.report.key = key;
        state.stream = Some(Stream {
            data: bytes,
            index: 0,
        });
        state.repeated_key = false;

        Self::send_report::<U>()
    }

    /// Type a single ASCII character, with its modifier
    pub fn write_char<U: Driver>(ch: u8) -> bool {
        if Self::is_invalid_or_busy::<U>() {
            return false;
        }

        let state = unsafe { STATE.get() };

        let (modifier, key) = encode_report(ch);
        state.report.modifier = modifier;
        state.report.key = key;
        // single-entry stream, so the callback appends the release report
        state.stream = Some(Stream {
            data: &[0],
            index: 0,
        });
        state.repeated_key = false;

        Self::send_report::<U>()
    }

    /// Press a single key by usage id, without modifiers
    pub fn write_key<U: Driver>(key: Key) -> bool {
        if Self::is_invalid_or_busy::<U>() {
            return false;
        }

        let state = unsafe { STATE.get() };

        state.report.modifier = 0;
        state.report.key = key as u8;
        state.stream = Some(Stream {
            data: &[0],
            index: 0,
        });
        state.repeated_key = false;

        Self::send_report::<U>()
    }

    /// Whether a previous write is still in flight
    pub fn is_busy<U: Driver>() -> bool {
        let state = unsafe { STATE.get() };
        state.stream.is_some() || U::is_pending(EP, EndpointMode::In)
    }

    /// Whether the host has configured the device
    pub fn is_configured() -> bool {
        unsafe { STATE.get() }.configuration != 0
    }
}

impl<const EP: u8> Device for Keyboard<EP> {
    fn init<U: Driver>() {
        assert!(
            U::is_valid_endpoint(EP, TransferType::Interrupt),
            "endpoint does not support interrupt transfers"
        );

        let state = unsafe { STATE.get() };
        state.configuration = 0;
        state.remote_wakeup = false;
        state.idle = 0;
        state.stream = None;
        state.repeated_key = false;
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
            // the hid descriptor is embedded in the configuration block
            DescriptorType::Hid => Some(&Self::config_bytes()[18..27]),
            DescriptorType::HidReport => Some(&REPORT_DESCRIPTOR),
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
                EP,
                EndpointMode::In,
                TransferType::Interrupt,
                core::mem::size_of::<KeycodeReport>() as u32,
            );

            state.configuration = packet.w_value as u8;
            U::configured(true);

            // push an initial no-keys-pressed report
            state.report.modifier = 0;
            state.report.key = Key::None as u8;
            state.stream = None;

            if Self::send_report::<U>() {
                Handshake::Ack
            } else {
                Handshake::Stall
            }
        } else if packet.w_value == 0 {
            U::configured(false);

            if state.configuration != 0 {
                U::reset(EP, EndpointMode::In);
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

    fn get_device_status<U: Driver>() -> u8 {
        // bus powered, remote wakeup state in bit 1
        (unsafe { STATE.get() }.remote_wakeup as u8) << 1
    }

    fn clear_feature<U: Driver>(feature: Feature, _packet: &SetupPacket) -> Handshake {
        if feature != Feature::RemoteWake {
            return Handshake::Stall;
        }

        unsafe { STATE.get() }.remote_wakeup = false;
        Handshake::Ack
    }

    fn set_feature<U: Driver>(feature: Feature, _packet: &SetupPacket) -> Handshake {
        if feature != Feature::RemoteWake {
            return Handshake::Stall;
        }

        unsafe { STATE.get() }.remote_wakeup = true;
        Handshake::Ack
    }

    fn handle_class_packet<U: Driver>(packet: &SetupPacket) -> Handshake {
        if packet.recipient() != RecipientCode::Interface || packet.w_index != 0 {
            return Handshake::Stall;
        }

        let request = match ClassRequest::from_request(packet.b_request) {
            Some(request) => request,
            None => return Handshake::Stall,
        };

        let state = unsafe { STATE.get() };

        match request {
            ClassRequest::GetReport => {
                // the host should not use this as a substitute for the
                // interrupt endpoint; report no keys pressed
                state.report.modifier = 0;
                state.report.key = Key::None as u8;

                if U::write(
                    None,
                    CONTROL_ENDPOINT,
                    EndpointMode::In,
                    unsafe { STATE.get() }.report.as_bytes(),
                ) {
                    Handshake::Ack
                } else {
                    Handshake::Stall
                }
            }
            ClassRequest::GetIdle => {
                if packet.w_value & 0xff != 1 {
                    // only the keyboard report id exists
                    return Handshake::Stall;
                }

                if U::write(
                    None,
                    CONTROL_ENDPOINT,
                    EndpointMode::In,
                    slice::from_ref(&state.idle),
                ) {
                    Handshake::Ack
                } else {
                    Handshake::Stall
                }
            }
            ClassRequest::SetReport => {
                // an output (LED) report; accept and ignore it
                let max = U::endpoint_size(CONTROL_ENDPOINT, TransferType::Control);
                if packet.w_length > max {
                    Handshake::Stall
                } else {
                    Handshake::Ack
                }
            }
            ClassRequest::SetIdle => {
                // only report id 0 (all reports) is supported
                if packet.w_value & 0xff != 0 {
                    return Handshake::Stall;
                }

                state.idle = (packet.w_value >> 8) as u8;
                Handshake::Ack
            }
            _ => Handshake::Stall,
        }
    }

    fn bus_reset<U: Driver>() {
        unsafe { STATE.get() }.configuration = 0;
    }

    fn disconnected<U: Driver>() {
        unsafe { STATE.get() }.configuration = 0;
    }
}

/// Encode an ASCII character into its report fields
///
/// Unmapped characters become a question mark, so typos show up at the host
/// instead of disappearing.
fn encode_report(ch: u8) -> (u8, u8) {
    match ch {
        b'A'..=b'Z' => (MOD_LSHIFT, ch - b'A' + Key::A as u8),
        b'a'..=b'z' => (0, ch - b'a' + Key::A as u8),
        b'1'..=b'9' => (0, ch - b'1' + Key::Num1 as u8),
        b'0' => (0, Key::Num0 as u8),
        b'\r' | b'\n' => (0, Key::Enter as u8),
        0x08 => (0, Key::Backspace as u8),
        0x1b => (0, Key::Escape as u8),
        b'\t' => (0, Key::Tab as u8),
        b' ' => (0, Key::Space as u8),
        b',' => (0, Key::Comma as u8),
        b'.' => (0, Key::Period as u8),
        b'!' => (MOD_LSHIFT, Key::Num1 as u8),
        b'?' => (MOD_LSHIFT, Key::Slash as u8),
        // everything else maps to a question mark as well
        _ => (MOD_LSHIFT, Key::Slash as u8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::mock::{self, MockCtl};
    use crate::usb::setup::SetupPacket;

    type Kbd = Keyboard<1>;
    type Usb = MockCtl<Kbd>;

    fn configure() {
        Kbd::init::<Usb>();

        // SET_CONFIGURATION(1)
        stack::handle_setup_packet::<Usb>(&SetupPacket::from_le_bytes(&[
            0x00, 0x09, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]));

        // the initial no-keys report armed by set_config
        assert_eq!(mock::complete_in(1), &[0x01, 0x00, 0x00]);
        mock::clear_events();
    }

    #[test]
    fn encode_letters_digits_punctuation() {
        assert_eq!(encode_report(b'A'), (MOD_LSHIFT, 0x04));
        assert_eq!(encode_report(b'a'), (0, 0x04));
        assert_eq!(encode_report(b'z'), (0, 0x1d));
        assert_eq!(encode_report(b'1'), (0, 0x1e));
        assert_eq!(encode_report(b'0'), (0, 0x27));
        assert_eq!(encode_report(b'.'), (0, 0x37));
        assert_eq!(encode_report(b'!'), (MOD_LSHIFT, 0x1e));
        assert_eq!(encode_report(b'~'), (MOD_LSHIFT, 0x38));
    }

    #[test]
    fn single_letter_is_press_then_release() {
        let _guard = mock::lock();
        configure();

        assert!(Kbd::write_str::<Usb>("A"));

        // shift + KEY_A, then all keys released
        assert_eq!(mock::complete_in(1), &[0x01, 0x02, 0x04]);
        assert_eq!(mock::complete_in(1), &[0x01, 0x00, 0x00]);
        assert!(!Kbd::is_busy::<Usb>());
    }

    #[test]
    fn doubled_letter_gets_release_in_between() {
        let _guard = mock::lock();
        configure();

        assert!(Kbd::write_str::<Usb>("LL"));

        assert_eq!(mock::complete_in(1), &[0x01, 0x02, 0x0f]);
        assert_eq!(mock::complete_in(1), &[0x01, 0x00, 0x00]);
        assert_eq!(mock::complete_in(1), &[0x01, 0x02, 0x0f]);
        assert_eq!(mock::complete_in(1), &[0x01, 0x00, 0x00]);
        assert!(!Kbd::is_busy::<Usb>());
    }

    #[test]
    fn write_while_busy_is_rejected() {
        let _guard = mock::lock();
        configure();

        assert!(Kbd::write_str::<Usb>("hello"));
        assert!(Kbd::is_busy::<Usb>());
        assert!(!Kbd::write_str::<Usb>("world"));
        assert!(!Kbd::write_key::<Usb>(Key::A));
    }

    #[test]
    fn write_while_unconfigured_is_rejected() {
        let _guard = mock::lock();
        Kbd::init::<Usb>();

        assert!(!Kbd::is_configured());
        assert!(!Kbd::write_str::<Usb>("nope"));
    }

    #[test]
    fn configuration_descriptor_is_one_block() {
        let _guard = mock::lock();

        let bytes = Kbd::get_descriptor::<Usb>(
            &SetupPacket::default(),
            DescriptorType::Configuration,
            0,
        )
        .unwrap();

        assert_eq!(bytes.len(), 34);
        // wTotalLength covers the whole block
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 34);
        // interface class is HID
        assert_eq!(bytes[9 + 5], 0x03);
        // hid descriptor reports the report descriptor length
        assert_eq!(
            u16::from_le_bytes([bytes[25], bytes[26]]),
            REPORT_DESCRIPTOR.len() as u16
        );
        // interrupt IN endpoint
        assert_eq!(bytes[27 + 2], 0x81);
        assert_eq!(bytes[27 + 3], TransferType::Interrupt as u8);
    }

    #[test]
    fn set_idle_only_accepts_all_reports() {
        let _guard = mock::lock();
        configure();

        // SET_IDLE, report id 0, duration 0
        let ok = Kbd::handle_class_packet::<Usb>(&SetupPacket::from_le_bytes(&[
            0x21, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]));
        assert_eq!(ok, Handshake::Ack);

        // SET_IDLE for a specific report id stalls
        let bad = Kbd::handle_class_packet::<Usb>(&SetupPacket::from_le_bytes(&[
            0x21, 0x0a, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]));
        assert_eq!(bad, Handshake::Stall);
    }
}
