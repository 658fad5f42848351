//! USB descriptor layouts
//!
//! Byte-exact descriptor structures per chapter 9 of the USB 2.0
//! specification. Every struct in this module consists solely of `u8` and
//! `[u8; N]` fields, so its in-memory representation *is* its wire format on
//! every host: multi-byte fields are stored as explicit little-endian byte
//! pairs, written through [`le16`]. Descriptors are assembled as `static`
//! constants and handed to the control endpoint as byte slices via
//! [`DescriptorBytes`].

use core::mem::size_of;
use core::slice;

/// Encode a 16-bit descriptor field as its little-endian wire bytes
pub const fn le16(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

/// Implemented by descriptor types whose memory layout is exactly their wire
/// format
///
/// # Safety
///
/// Implementations must guarantee that the type is `repr(C)`, contains only
/// `u8`-based fields (so it has no padding and alignment 1), and that the
/// field order matches the wire layout.
pub unsafe trait DescriptorBytes: Sized {
    /// View the descriptor as the bytes that go on the wire
    fn descriptor_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self as *const Self as *const u8, size_of::<Self>()) }
    }
}

/// Descriptor types from the USB 2.0 specification
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DescriptorType {
    Device = 1,
    Configuration = 2,
    String = 3,
    Interface = 4,
    Endpoint = 5,
    DeviceQualifier = 6,
    OtherSpeedConfig = 7,
    InterfacePower = 8,
    Otg = 9,
    Debug = 10,
    InterfaceAssociation = 11,
    Bos = 15,
    DeviceCapability = 16,
    Hid = 33,
    HidReport = 34,
    CsInterface = 36,
    CsEndpoint = 37,
    SuperspeedEndpointCompanion = 48,
}

impl DescriptorType {
    /// Decode the descriptor type byte of a GET_DESCRIPTOR request
    pub fn from_type(raw: u8) -> Option<Self> {
        Some(match raw {
            1 => DescriptorType::Device,
            2 => DescriptorType::Configuration,
            3 => DescriptorType::String,
            4 => DescriptorType::Interface,
            5 => DescriptorType::Endpoint,
            6 => DescriptorType::DeviceQualifier,
            7 => DescriptorType::OtherSpeedConfig,
            8 => DescriptorType::InterfacePower,
            9 => DescriptorType::Otg,
            10 => DescriptorType::Debug,
            11 => DescriptorType::InterfaceAssociation,
            15 => DescriptorType::Bos,
            16 => DescriptorType::DeviceCapability,
            33 => DescriptorType::Hid,
            34 => DescriptorType::HidReport,
            36 => DescriptorType::CsInterface,
            37 => DescriptorType::CsEndpoint,
            48 => DescriptorType::SuperspeedEndpointCompanion,
            _ => return None,
        })
    }
}

/// Class codes following the USB defined class codes list
///
/// <https://www.usb.org/defined-class-codes>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClassType {
    UseClassInfo = 0x00,
    Audio = 0x01,
    CommunicationAndCdc = 0x02,
    Hid = 0x03,
    Physical = 0x05,
    Image = 0x06,
    Printer = 0x07,
    MassStorage = 0x08,
    Hub = 0x09,
    CdcData = 0x0a,
    SmartCard = 0x0b,
    ContentSecurity = 0x0d,
    Video = 0x0e,
    PersonalHealthcare = 0x0f,
    Miscellaneous = 0xef,
    ApplicationSpecific = 0xfe,
    VendorSpecific = 0xff,
}

/// Transfer types (endpoint descriptor `bmAttributes` bits 0..1)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransferType {
    Control = 0,
    Isochronous = 1,
    Bulk = 2,
    Interrupt = 3,
}

/// The device descriptor, 18 bytes
///
/// A USB device has exactly one device descriptor. It carries the supported
/// USB version, maximum control packet size, vendor and product ids, and the
/// number of configurations.
#[repr(C)]
pub struct Device {
    /// Size of this descriptor in bytes (18)
    pub b_length: u8,

    /// Descriptor type (1)
    pub b_descriptor_type: u8,

    /// USB specification number the device complies to
    pub bcd_usb: [u8; 2],

    /// Class code
    pub b_device_class: u8,

    /// Subclass code
    pub b_device_sub_class: u8,

    /// Protocol code
    pub b_device_protocol: u8,

    /// Maximum packet size for endpoint zero (8, 16, 32 or 64)
    pub b_max_packet_size: u8,

    /// Vendor id
    pub id_vendor: [u8; 2],

    /// Product id
    pub id_product: [u8; 2],

    /// Device release number
    pub bcd_device: [u8; 2],

    /// Index of the manufacturer string descriptor
    pub i_manufacturer: u8,

    /// Index of the product string descriptor
    pub i_product: u8,

    /// Index of the serial number string descriptor
    pub i_serial_number: u8,

    /// Number of possible configurations
    pub b_num_configurations: u8,
}

const _: () = assert!(size_of::<Device>() == 18);
unsafe impl DescriptorBytes for Device {}

/// The configuration descriptor, 9 bytes
///
/// Sent to the host with all interface, class and endpoint descriptors of
/// the configuration concatenated behind it; `w_total_length` covers the
/// whole sequence.
#[repr(C)]
pub struct Configuration {
    /// Size of this descriptor in bytes (9)
    pub b_length: u8,

    /// Descriptor type (2)
    pub b_descriptor_type: u8,

    /// Total length in bytes of the configuration and its subordinates
    pub w_total_length: [u8; 2],

    /// Number of interfaces
    pub b_num_interfaces: u8,

    /// Value used to select this configuration
    pub b_configuration_value: u8,

    /// Index of a string descriptor describing this configuration
    pub i_configuration: u8,

    /// b\[5\] = remote wakeup, b\[6\] = self powered, b\[7\] = reserved (1)
    pub bm_attributes: u8,

    /// Maximum power consumption in 2 mA units
    pub b_max_power: u8,
}

const _: () = assert!(size_of::<Configuration>() == 9);
unsafe impl DescriptorBytes for Configuration {}

/// The interface descriptor, 9 bytes
#[repr(C)]
pub struct Interface {
    /// Size of this descriptor in bytes (9)
    pub b_length: u8,

    /// Descriptor type (4)
    pub b_descriptor_type: u8,

    /// Number of this interface
    pub b_interface_number: u8,

    /// Value used to select an alternative setting
    pub b_alternate_setting: u8,

    /// Number of endpoints used by this interface
    pub b_num_endpoints: u8,

    /// Class code
    pub b_interface_class: u8,

    /// Subclass code
    pub b_interface_sub_class: u8,

    /// Protocol code
    pub b_interface_protocol: u8,

    /// Index of a string descriptor describing this interface
    pub i_interface: u8,
}

const _: () = assert!(size_of::<Interface>() == 9);
unsafe impl DescriptorBytes for Interface {}

/// The endpoint descriptor, 7 bytes
#[repr(C)]
pub struct Endpoint {
    /// Size of this descriptor in bytes (7)
    pub b_length: u8,

    /// Descriptor type (5)
    pub b_descriptor_type: u8,

    /// b\[0..3\] = endpoint number, b\[7\] = direction (0 = OUT, 1 = IN)
    pub b_endpoint_address: u8,

    /// b\[0..1\] = transfer type, b\[2..3\] = synchronisation type,
    /// b\[4..5\] = usage type
    pub bm_attributes: u8,

    /// Maximum packet size this endpoint can send or receive
    pub w_max_packet_size: [u8; 2],

    /// Polling interval in frame counts (interrupt/isochronous endpoints)
    pub b_interval: u8,
}

const _: () = assert!(size_of::<Endpoint>() == 7);
unsafe impl DescriptorBytes for Endpoint {}

/// A string descriptor with a fixed-size UTF-16LE payload
///
/// `N` is the payload size in bytes, twice the number of characters. There
/// is no null terminator. String descriptor zero is the language table; use
/// [`StringDescriptor::LANG_US_ENGLISH`] for a single-language device.
#[repr(C)]
pub struct StringDescriptor<const N: usize> {
    /// Size of this descriptor in bytes (N + 2)
    pub b_length: u8,

    /// Descriptor type (3)
    pub b_descriptor_type: u8,

    /// UTF-16LE encoded string, no terminator
    pub b_string: [u8; N],
}

unsafe impl<const N: usize> DescriptorBytes for StringDescriptor<N> {}

impl StringDescriptor<2> {
    /// The language-table descriptor for a US-English-only device
    pub const LANG_US_ENGLISH: StringDescriptor<2> = StringDescriptor {
        b_length: 4,
        b_descriptor_type: DescriptorType::String as u8,
        b_string: [0x09, 0x04],
    };
}

impl<const N: usize> StringDescriptor<N> {
    /// Build a string descriptor from an ASCII string
    ///
    /// `N` must be exactly twice the string length; anything else fails to
    /// evaluate.
    pub const fn from_ascii(s: &str) -> Self {
        let bytes = s.as_bytes();
        assert!(bytes.len() * 2 == N);

        let mut b_string = [0; N];
        let mut i = 0;
        while i < bytes.len() {
            b_string[i * 2] = bytes[i];
            i += 1;
        }

        StringDescriptor {
            b_length: (N + 2) as u8,
            b_descriptor_type: DescriptorType::String as u8,
            b_string,
        }
    }
}

/// The device qualifier descriptor, 10 bytes
///
/// Describes how the device would behave at the other bus speed. Full-speed
/// only devices stall requests for it.
#[repr(C)]
pub struct Qualifier {
    /// Size of this descriptor in bytes (10)
    pub b_length: u8,

    /// Descriptor type (6)
    pub b_descriptor_type: u8,

    /// USB specification number the device complies to
    pub bcd_usb: [u8; 2],

    /// Class code
    pub b_device_class: u8,

    /// Subclass code
    pub b_device_sub_class: u8,

    /// Protocol code
    pub b_device_protocol: u8,

    /// Maximum packet size for the other speed
    pub b_max_packet_size0: u8,

    /// Number of other-speed configurations
    pub b_num_configurations: u8,

    /// Reserved, must be zero
    pub b_reserved: u8,
}

const _: () = assert!(size_of::<Qualifier>() == 10);
unsafe impl DescriptorBytes for Qualifier {}

/// The binary device object store (BOS) descriptor, 5 bytes
#[repr(C)]
pub struct Bos {
    /// Size of this descriptor in bytes (5)
    pub b_length: u8,

    /// Descriptor type (15)
    pub b_descriptor_type: u8,

    /// Length of this descriptor and all of its sub descriptors
    pub w_total_length: [u8; 2],

    /// Number of separate device capability descriptors in the BOS
    pub b_num_device_caps: u8,
}

const _: () = assert!(size_of::<Bos>() == 5);
unsafe impl DescriptorBytes for Bos {}

/// A device capability descriptor with an `N` byte capability payload
#[repr(C)]
pub struct Capability<const N: usize> {
    /// Size of this descriptor in bytes (N + 3)
    pub b_length: u8,

    /// Descriptor type (16)
    pub b_descriptor_type: u8,

    /// Capability type (table 9-11 of the specification)
    pub b_dev_capability_type: u8,

    /// Capability specific format
    pub capability_dependent: [u8; N],
}

unsafe impl<const N: usize> DescriptorBytes for Capability<N> {}

/// The interface association descriptor, 8 bytes
///
/// Groups multiple interfaces into one function for composite devices.
#[repr(C)]
pub struct InterfaceAssociation {
    /// Size of this descriptor in bytes (8)
    pub b_length: u8,

    /// Descriptor type (11)
    pub b_descriptor_type: u8,

    /// First interface number of the function
    pub b_first_interface: u8,

    /// Number of interfaces that follow this descriptor
    pub b_interface_count: u8,

    /// `bInterfaceClass` used for the function
    pub b_function_class: u8,

    /// `bInterfaceSubClass` used for the function
    pub b_function_sub_class: u8,

    /// `bInterfaceProtocol` used for the function
    pub b_function_protocol: u8,

    /// Index of a string descriptor describing this function
    pub i_function: u8,
}

const _: () = assert!(size_of::<InterfaceAssociation>() == 8);
unsafe impl DescriptorBytes for InterfaceAssociation {}

/// Header shared by all class-specific interface descriptors, 3 bytes
#[repr(C)]
pub struct CsInterface {
    /// Size of the descriptor this header starts
    pub b_function_length: u8,

    /// Descriptor type (36)
    pub b_descriptor_type: u8,

    /// Functional descriptor subtype
    pub b_descriptor_subtype: u8,
}

const _: () = assert!(size_of::<CsInterface>() == 3);
unsafe impl DescriptorBytes for CsInterface {}

/// The SuperSpeed endpoint companion descriptor, 6 bytes
#[repr(C)]
pub struct EndpointCompanion {
    /// Size of this descriptor in bytes (6)
    pub b_length: u8,

    /// Descriptor type (48)
    pub b_descriptor_type: u8,

    /// Maximum number of packets the endpoint can send or receive in a burst
    pub b_max_burst: u8,

    /// Bulk: streams supported; isochronous: multiplier
    pub bm_attributes: u8,

    /// Total bytes this endpoint transfers every service interval
    pub w_bytes_per_interval: [u8; 2],
}

const _: () = assert!(size_of::<EndpointCompanion>() == 6);
unsafe impl DescriptorBytes for EndpointCompanion {}

/// The HID class descriptor, 9 bytes, for one subordinate report descriptor
#[repr(C)]
pub struct Hid {
    /// Size of this descriptor in bytes (9)
    pub b_length: u8,

    /// Descriptor type (33)
    pub b_descriptor_type: u8,

    /// HID class specification release
    pub bcd_hid: [u8; 2],

    /// Country code of localized hardware, 0 when not localized
    pub b_country_code: u8,

    /// Number of subordinate class descriptors (1)
    pub b_num_descriptors: u8,

    /// Type of the subordinate descriptor (34 = report)
    pub b_class_descriptor_type: u8,

    /// Total size of the report descriptor
    pub w_descriptor_length: [u8; 2],
}

const _: () = assert!(size_of::<Hid>() == 9);
unsafe impl DescriptorBytes for Hid {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_descriptor_wire_format() {
        let desc = Device {
            b_length: 18,
            b_descriptor_type: DescriptorType::Device as u8,
            bcd_usb: le16(0x0200),
            b_device_class: 0,
            b_device_sub_class: 0,
            b_device_protocol: 0,
            b_max_packet_size: 64,
            id_vendor: le16(0x1fc9),
            id_product: le16(0x0042),
            bcd_device: le16(0x0100),
            i_manufacturer: 1,
            i_product: 2,
            i_serial_number: 3,
            b_num_configurations: 1,
        };

        assert_eq!(
            desc.descriptor_bytes(),
            &[
                0x12, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x40, 0xc9, 0x1f, 0x42, 0x00, 0x00,
                0x01, 0x01, 0x02, 0x03, 0x01,
            ]
        );
    }

    #[test]
    fn endpoint_descriptor_wire_format() {
        // bulk IN endpoint 2, 64 byte packets
        let desc = Endpoint {
            b_length: 7,
            b_descriptor_type: DescriptorType::Endpoint as u8,
            b_endpoint_address: 0x82,
            bm_attributes: TransferType::Bulk as u8,
            w_max_packet_size: le16(64),
            b_interval: 0,
        };

        assert_eq!(desc.descriptor_bytes(), &[7, 5, 0x82, 2, 64, 0, 0]);
    }

    #[test]
    fn string_descriptor_is_utf16le_without_terminator() {
        static PRODUCT: StringDescriptor<8> = StringDescriptor::from_ascii("usb!");

        assert_eq!(
            PRODUCT.descriptor_bytes(),
            &[10, 3, b'u', 0, b's', 0, b'b', 0, b'!', 0]
        );
    }

    #[test]
    fn language_descriptor() {
        assert_eq!(
            StringDescriptor::LANG_US_ENGLISH.descriptor_bytes(),
            &[4, 3, 0x09, 0x04]
        );
    }
}
