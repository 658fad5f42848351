//! Standard request dispatch
//!
//! Chip-independent part of the control endpoint handling. Controller
//! drivers hand every received setup packet to [`handle_setup_packet`],
//! which classifies it, serves the standard requests of USB 2.0 §9 locally
//! and delegates class/vendor requests and device-specific decisions to the
//! [`Device`] implementation.
//!
//! The handshake for the control transfer is generated here: requests
//! without a data stage are acked or stalled immediately, requests with a
//! data stage arm the transfer and finish from [`status_callback`].
//!
//! [`Device`]: ../device/trait.Device.html

use crate::cell::IsrState;

use super::descriptor::DescriptorType;
use super::device::Device;
use super::setup::{DeviceRequest, Direction, Feature, RecipientCode, RequestType, SetupPacket};
use super::{
    endpoint_mode, endpoint_number, Driver, EndpointMode, Error, Handshake, CONTROL_ENDPOINT,
};

// Response buffer for GET_STATUS. Kept in a static because the transfer
// completes after this module returns; aligned because some controllers DMA
// directly out of it.
#[repr(C, align(4))]
struct StatusResponse([u8; 2]);

static STATUS_RESPONSE: IsrState<StatusResponse> = IsrState::new(StatusResponse([0; 2]));

/// Handle a setup packet received on the control endpoint
///
/// Called by the controller drivers from interrupt context. The pending-OUT
/// flag of the control endpoint must already be cleared by the caller, so a
/// stale OUT that preceded the setup token is not replayed into the new
/// transfer.
pub fn handle_setup_packet<U: Driver>(packet: &SetupPacket) {
    let response = match packet.request_type() {
        // the stack stalls or acks standard requests itself
        RequestType::Standard => handle_standard_packet::<U>(packet),

        // the device has to stall class/vendor requests it does not
        // support; the default trait methods do exactly that
        RequestType::Class => <U::Device as Device>::handle_class_packet::<U>(packet),
        RequestType::Vendor => <U::Device as Device>::handle_vendor_packet::<U>(packet),

        // no clue what to do with this packet
        RequestType::Reserved => Handshake::Stall,
    };

    // the request is stalled/acked before we exit. The only exception is
    // when the transfer has a data stage; then the handshake comes from the
    // data stage completion callback
    match response {
        Handshake::Ack => U::ack(CONTROL_ENDPOINT, EndpointMode::In),
        Handshake::Stall => U::stall(CONTROL_ENDPOINT, EndpointMode::In),
        _ => {}
    }
}

/// Handle a standard request
pub fn handle_standard_packet<U: Driver>(packet: &SetupPacket) -> Handshake {
    let request = match DeviceRequest::from_request(packet.b_request) {
        Some(request) => request,
        None => return Handshake::Stall,
    };

    match request {
        DeviceRequest::GetStatus => get_status::<U>(packet),
        DeviceRequest::ClearFeature => clear_feature::<U>(packet),
        DeviceRequest::SetFeature => set_feature::<U>(packet),
        DeviceRequest::SetAddress => set_device_address::<U>(packet),
        DeviceRequest::GetDescriptor => get_descriptor::<U>(packet),
        DeviceRequest::GetConfiguration => get_config::<U>(packet),
        DeviceRequest::SetConfiguration => set_config::<U>(packet),
        DeviceRequest::GetInterface => get_interface::<U>(packet),
        DeviceRequest::SetInterface => set_interface::<U>(packet),

        // descriptors live in flash, SET_DESCRIPTOR cannot be served; the
        // remaining requests are not implemented
        _ => Handshake::Stall,
    }
}

/// Completion callback for control data stages
///
/// Acks the status stage on success, stalls on error. Available to device
/// implementations that serve their own control data stages.
pub fn status_callback<U: Driver>(
    _endpoint: u8,
    _mode: EndpointMode,
    error: Error,
    _transferred: u32,
) {
    match error {
        Error::Nak => {}
        Error::NoError => U::ack(CONTROL_ENDPOINT, EndpointMode::In),
        _ => U::stall(CONTROL_ENDPOINT, EndpointMode::In),
    }
}

fn get_status<U: Driver>(packet: &SetupPacket) -> Handshake {
    let recipient = packet.recipient();

    // check if any of the values are out of the usb 2.0 spec range
    if packet.w_value != 0
        || packet.w_length != 2
        || (packet.w_index != 0 && recipient == RecipientCode::Device)
    {
        return Handshake::Stall;
    }

    let response = unsafe { STATUS_RESPONSE.get() };

    match recipient {
        RecipientCode::Endpoint => {
            let index = packet.w_index as u8;
            response.0[0] = U::is_stalled(endpoint_number(index), endpoint_mode(index)) as u8;
            response.0[1] = 0x00;
        }
        RecipientCode::Interface => {
            response.0[0] = 0x00;
            response.0[1] = 0x00;
        }
        RecipientCode::Device => {
            response.0[0] = <U::Device as Device>::get_device_status::<U>();
            response.0[1] = 0x00;
        }
        _ => return Handshake::Stall,
    }

    if U::write(
        Some(status_callback::<U>),
        CONTROL_ENDPOINT,
        EndpointMode::In,
        &unsafe { STATUS_RESPONSE.get() }.0,
    ) {
        Handshake::Wait
    } else {
        Handshake::Stall
    }
}

fn feature_checks(packet: &SetupPacket) -> Option<Feature> {
    // feature requests never have a data stage
    if packet.direction() == Direction::DeviceToHost || packet.w_length != 0 {
        return None;
    }

    let feature = packet.feature()?;
    let recipient = packet.recipient();

    // endpoint halt only targets endpoints, the other features only the
    // device
    let valid = match feature {
        Feature::EndpointHalt => recipient == RecipientCode::Endpoint,
        Feature::RemoteWake | Feature::TestMode => recipient == RecipientCode::Device,
    };

    if valid {
        Some(feature)
    } else {
        None
    }
}

fn clear_feature<U: Driver>(packet: &SetupPacket) -> Handshake {
    let feature = match feature_checks(packet) {
        Some(feature) => feature,
        None => return Handshake::Stall,
    };

    match feature {
        Feature::EndpointHalt if packet.w_index > 0 => {
            let index = packet.w_index as u8;
            U::un_stall(endpoint_number(index), endpoint_mode(index));

            Handshake::Ack
        }
        Feature::TestMode | Feature::RemoteWake => {
            <U::Device as Device>::clear_feature::<U>(feature, packet)
        }
        _ => Handshake::Stall,
    }
}

fn set_feature<U: Driver>(packet: &SetupPacket) -> Handshake {
    let feature = match feature_checks(packet) {
        Some(feature) => feature,
        None => return Handshake::Stall,
    };

    match feature {
        Feature::EndpointHalt if packet.w_index > 0 => {
            let index = packet.w_index as u8;
            U::stall(endpoint_number(index), endpoint_mode(index));

            Handshake::Ack
        }
        Feature::TestMode | Feature::RemoteWake => <U::Device as Device>::set_feature::<U>(feature, packet),
        _ => Handshake::Stall,
    }
}

fn set_device_address<U: Driver>(packet: &SetupPacket) -> Handshake {
    if packet.w_index != 0 || packet.w_length != 0 {
        return Handshake::Stall;
    }

    // the driver defers the hardware write until the status stage of this
    // transfer went out
    U::set_device_address((packet.w_value & 0x7f) as u8)
}

fn get_descriptor<U: Driver>(packet: &SetupPacket) -> Handshake {
    // descriptor type in the high byte, index in the low byte
    let ty = DescriptorType::from_type((packet.w_value >> 8) as u8);
    let index = (packet.w_value & 0xff) as u8;

    let ty = match ty {
        Some(ty) => ty,
        None => return Handshake::Stall,
    };

    let descriptor = match <U::Device as Device>::get_descriptor::<U>(packet, ty, index) {
        Some(descriptor) if !descriptor.is_empty() => descriptor,
        _ => return Handshake::Stall,
    };

    match ty {
        DescriptorType::Device
        | DescriptorType::Configuration
        | DescriptorType::DeviceQualifier
        | DescriptorType::OtherSpeedConfig => {
            // only string descriptor requests may carry a language id
            if packet.recipient() != RecipientCode::Device || packet.w_index != 0 {
                return Handshake::Stall;
            }
        }
        DescriptorType::String => {
            if packet.recipient() != RecipientCode::Device {
                return Handshake::Stall;
            }
        }
        _ => {}
    }

    // never send more than the host asked for
    let size = descriptor.len().min(packet.w_length as usize);

    if U::write(
        Some(status_callback::<U>),
        CONTROL_ENDPOINT,
        EndpointMode::In,
        &descriptor[..size],
    ) {
        Handshake::Wait
    } else {
        Handshake::Stall
    }
}

fn get_config<U: Driver>(packet: &SetupPacket) -> Handshake {
    if packet.w_value != 0 || packet.w_index != 0 || packet.w_length != 1 {
        return Handshake::Stall;
    }

    <U::Device as Device>::get_config::<U>(packet)
}

fn set_config<U: Driver>(packet: &SetupPacket) -> Handshake {
    if packet.w_index != 0 || packet.w_length != 0 {
        return Handshake::Stall;
    }

    <U::Device as Device>::set_config::<U>(packet)
}

fn get_interface<U: Driver>(packet: &SetupPacket) -> Handshake {
    if packet.w_value != 0 || packet.w_length != 1 {
        return Handshake::Stall;
    }

    <U::Device as Device>::get_interface::<U>(packet)
}

fn set_interface<U: Driver>(packet: &SetupPacket) -> Handshake {
    if packet.w_length != 0 {
        return Handshake::Stall;
    }

    <U::Device as Device>::set_interface::<U>(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::mock::{self, Event, MockUsb};

    fn setup(bytes: [u8; 8]) -> SetupPacket {
        SetupPacket::from_le_bytes(&bytes)
    }

    #[test]
    fn set_address_is_deferred_and_acked() {
        let _guard = mock::lock();

        handle_setup_packet::<MockUsb>(&setup([0x00, 0x05, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00]));

        // the driver buffered the address and the stack acked the status
        // stage; nothing was written to the bus yet
        assert_eq!(mock::pending_address(), Some(0x12));
        assert_eq!(mock::events(), &[Event::Ack(0, EndpointMode::In)]);

        // the address goes live when the status stage completes
        mock::complete_status_in();
        assert_eq!(mock::device_address(), 0x12);
    }

    #[test]
    fn get_descriptor_respects_requested_length() {
        let _guard = mock::lock();

        // device descriptor, but only the first 8 bytes
        handle_setup_packet::<MockUsb>(&setup([0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x08, 0x00]));

        let written = mock::take_write(0);
        assert_eq!(written.len(), 8);
        assert_eq!(written[0], 18);
        assert_eq!(written[1], 1);
    }

    #[test]
    fn get_descriptor_with_nonzero_index_stalls_for_device_descriptors() {
        let _guard = mock::lock();

        handle_setup_packet::<MockUsb>(&setup([0x80, 0x06, 0x00, 0x01, 0x09, 0x04, 0x12, 0x00]));

        assert_eq!(mock::events(), &[Event::Stall(0, EndpointMode::In)]);
    }

    #[test]
    fn get_status_reports_endpoint_stall_state() {
        let _guard = mock::lock();

        MockUsb::stall(2, EndpointMode::In);
        mock::clear_events();

        // GET_STATUS for endpoint 0x82
        handle_setup_packet::<MockUsb>(&setup([0x82, 0x00, 0x00, 0x00, 0x82, 0x00, 0x02, 0x00]));

        assert_eq!(mock::take_write(0), &[0x01, 0x00]);
    }

    #[test]
    fn set_feature_endpoint_halt_stalls_the_endpoint() {
        let _guard = mock::lock();

        handle_setup_packet::<MockUsb>(&setup([0x02, 0x03, 0x00, 0x00, 0x81, 0x00, 0x00, 0x00]));

        assert_eq!(
            mock::events(),
            &[
                Event::Stall(1, EndpointMode::In),
                Event::Ack(0, EndpointMode::In),
            ]
        );
    }

    #[test]
    fn clear_feature_endpoint_halt_unstalls_the_endpoint() {
        let _guard = mock::lock();

        MockUsb::stall(1, EndpointMode::In);
        mock::clear_events();

        handle_setup_packet::<MockUsb>(&setup([0x02, 0x01, 0x00, 0x00, 0x81, 0x00, 0x00, 0x00]));

        assert_eq!(
            mock::events(),
            &[
                Event::UnStall(1, EndpointMode::In),
                Event::Ack(0, EndpointMode::In),
            ]
        );
        assert!(!MockUsb::is_stalled(1, EndpointMode::In));
    }

    #[test]
    fn unknown_standard_request_stalls() {
        let _guard = mock::lock();

        handle_setup_packet::<MockUsb>(&setup([0x00, 0x0d, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]));

        assert_eq!(mock::events(), &[Event::Stall(0, EndpointMode::In)]);
    }

    #[test]
    fn vendor_request_without_handler_stalls() {
        let _guard = mock::lock();

        handle_setup_packet::<MockUsb>(&setup([0x40, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]));

        assert_eq!(mock::events(), &[Event::Stall(0, EndpointMode::In)]);
    }
}
