//! USB setup packets and standard request definitions
//!
//! The layouts follow chapter 9 of the USB 2.0 specification.

/// The 8 byte long USB setup packet
///
/// Received on the control endpoint at the start of every control transfer.
/// The multi-byte fields are little-endian on the wire; [`from_le_bytes`]
/// decodes them explicitly, so the struct itself uses native integers.
///
/// [`from_le_bytes`]: #method.from_le_bytes
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SetupPacket {
    /// b\[0..4\] = recipient, b\[5..6\] = type, b\[7\] = direction
    pub bm_request_type: u8,

    /// The request being made
    pub b_request: u8,

    /// Request-specific value
    pub w_value: u16,

    /// Request-specific index or offset
    pub w_index: u16,

    /// Number of bytes in the data stage
    pub w_length: u16,
}

impl SetupPacket {
    /// Decode a setup packet from the 8 bytes received on the wire
    pub fn from_le_bytes(raw: &[u8; 8]) -> Self {
        SetupPacket {
            bm_request_type: raw[0],
            b_request: raw[1],
            w_value: u16::from_le_bytes([raw[2], raw[3]]),
            w_index: u16::from_le_bytes([raw[4], raw[5]]),
            w_length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    /// The data stage direction of this request
    pub fn direction(&self) -> Direction {
        if (self.bm_request_type >> 7) & 0x1 == 1 {
            Direction::DeviceToHost
        } else {
            Direction::HostToDevice
        }
    }

    /// The request type (standard/class/vendor) of this request
    pub fn request_type(&self) -> RequestType {
        match (self.bm_request_type >> 5) & 0x3 {
            0 => RequestType::Standard,
            1 => RequestType::Class,
            2 => RequestType::Vendor,
            _ => RequestType::Reserved,
        }
    }

    /// The recipient of this request
    pub fn recipient(&self) -> RecipientCode {
        match self.bm_request_type & 0x1f {
            0 => RecipientCode::Device,
            1 => RecipientCode::Interface,
            2 => RecipientCode::Endpoint,
            3 => RecipientCode::Other,
            _ => RecipientCode::Reserved,
        }
    }

    /// The feature selector carried in `w_value`
    pub fn feature(&self) -> Option<Feature> {
        match self.w_value {
            0 => Some(Feature::EndpointHalt),
            1 => Some(Feature::RemoteWake),
            2 => Some(Feature::TestMode),
            _ => None,
        }
    }
}

/// USB request data transfer direction (`bm_request_type` bit 7)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

/// USB request types (`bm_request_type` bits 5..6)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestType {
    Standard,
    Class,
    Vendor,
    Reserved,
}

/// USB recipient codes (`bm_request_type` bits 0..4)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecipientCode {
    Device,
    Interface,
    Endpoint,
    Other,
    Reserved,
}

/// Standard USB device requests (`b_request`)
///
/// The comments list the field usage defined by the USB specification for
/// each request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceRequest {
    /// wValue = zero, wIndex = zero, wLength = 2, data = device status
    GetStatus = 0x00,

    /// wValue = feature selector, wIndex = zero, wLength = zero
    ClearFeature = 0x01,

    /// wValue = feature selector, wIndex = zero, wLength = zero
    SetFeature = 0x03,

    /// wValue = device address, wIndex = zero, wLength = zero
    SetAddress = 0x05,

    /// wValue = descriptor type & index, wIndex = zero or language id,
    /// wLength = descriptor length, data = descriptor
    GetDescriptor = 0x06,

    /// wValue = descriptor type & index, wIndex = zero or language id,
    /// wLength = descriptor length, data = descriptor
    SetDescriptor = 0x07,

    /// wValue = zero, wIndex = zero, wLength = 1, data = configuration value
    GetConfiguration = 0x08,

    /// wValue = configuration value, wIndex = zero, wLength = zero
    SetConfiguration = 0x09,

    /// wValue = zero, wIndex = interface, wLength = 1, data = alternate
    GetInterface = 0x0a,

    /// wValue = alternate setting, wIndex = interface, wLength = zero
    SetInterface = 0x0b,

    /// wValue = zero, wIndex = endpoint, wLength = 2, data = frame number
    SynchFrame = 0x0c,
}

impl DeviceRequest {
    /// Decode a `b_request` value, for standard requests
    pub fn from_request(raw: u8) -> Option<Self> {
        Some(match raw {
            0x00 => DeviceRequest::GetStatus,
            0x01 => DeviceRequest::ClearFeature,
            0x03 => DeviceRequest::SetFeature,
            0x05 => DeviceRequest::SetAddress,
            0x06 => DeviceRequest::GetDescriptor,
            0x07 => DeviceRequest::SetDescriptor,
            0x08 => DeviceRequest::GetConfiguration,
            0x09 => DeviceRequest::SetConfiguration,
            0x0a => DeviceRequest::GetInterface,
            0x0b => DeviceRequest::SetInterface,
            0x0c => DeviceRequest::SynchFrame,
            _ => return None,
        })
    }
}

/// USB feature selectors (`w_value`)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Feature {
    EndpointHalt = 0,
    RemoteWake = 1,
    TestMode = 2,
}

/// USB specification versions, as used in the `bcdUSB` descriptor field
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UsbVersion {
    V1_0 = 0x0100,
    V1_1 = 0x0110,
    V2_0 = 0x0200,
    V2_1 = 0x0201,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_set_address() {
        // the "set address 0x12" packet from the usb specification
        let packet = SetupPacket::from_le_bytes(&[0x00, 0x05, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00]);

        assert_eq!(packet.direction(), Direction::HostToDevice);
        assert_eq!(packet.request_type(), RequestType::Standard);
        assert_eq!(packet.recipient(), RecipientCode::Device);
        assert_eq!(
            DeviceRequest::from_request(packet.b_request),
            Some(DeviceRequest::SetAddress)
        );
        assert_eq!(packet.w_value, 0x12);
    }

    #[test]
    fn decodes_get_descriptor_fields() {
        // GET_DESCRIPTOR for the second string descriptor, english
        let packet = SetupPacket::from_le_bytes(&[0x80, 0x06, 0x02, 0x03, 0x09, 0x04, 0xff, 0x00]);

        assert_eq!(packet.direction(), Direction::DeviceToHost);
        assert_eq!(packet.w_value >> 8, 3);
        assert_eq!(packet.w_value & 0xff, 2);
        assert_eq!(packet.w_index, 0x0409);
        assert_eq!(packet.w_length, 255);
    }

    #[test]
    fn decodes_class_request() {
        // MSC GET_MAX_LUN
        let packet = SetupPacket::from_le_bytes(&[0xa1, 0xfe, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00]);

        assert_eq!(packet.request_type(), RequestType::Class);
        assert_eq!(packet.recipient(), RecipientCode::Interface);
    }
}
