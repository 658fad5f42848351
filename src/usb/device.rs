//! The device side of the USB stack
//!
//! A *device* is whatever sits on top of the controller driver: a class
//! implementation like the [HID keyboard] or [mass storage], or an
//! application-defined device. The dispatch layer ([`stack`]) and the
//! controller drivers call into the device through the [`Device`] trait.
//!
//! Hooks a device does not care about are default trait methods: requests
//! default to a stall, events to a no-op. This gives the same
//! pay-for-what-you-use dispatch a hand-rolled capability check would,
//! resolved entirely at compile time.
//!
//! [HID keyboard]: ../keyboard/index.html
//! [mass storage]: ../msc/index.html
//! [`stack`]: ../stack/index.html

use super::setup::{Feature, SetupPacket};
use super::{descriptor::DescriptorType, Driver, EndpointMode, Handshake};

/// A USB device implementation
///
/// All methods take the controller driver as a type parameter, so a device
/// can arm transfers on the endpoints it owns. Like the driver contract,
/// everything is an associated function; device state lives in statics.
pub trait Device {
    /// Called once when the USB stack is initialized
    fn init<U: Driver>();

    /// Return the descriptor for a GET_DESCRIPTOR request
    ///
    /// `None` (or an empty slice) stalls the request.
    fn get_descriptor<U: Driver>(
        packet: &SetupPacket,
        ty: DescriptorType,
        index: u8,
    ) -> Option<&'static [u8]>;

    /// Handle GET_CONFIGURATION by writing the current configuration value
    /// on the control endpoint
    fn get_config<U: Driver>(packet: &SetupPacket) -> Handshake;

    /// Handle SET_CONFIGURATION
    ///
    /// The device configures its endpoints here and reports the new state
    /// to the driver through [`Driver::configured`].
    fn set_config<U: Driver>(packet: &SetupPacket) -> Handshake;

    /// The configuration value this device presents
    ///
    /// Used by controllers that track configuration in hardware and have to
    /// replay it into the device.
    fn get_configuration<U: Driver>() -> u8;

    /// The device status bits for GET_STATUS (self powered, remote wakeup)
    fn get_device_status<U: Driver>() -> u8 {
        0
    }

    /// Handle CLEAR_FEATURE for device-level features
    fn clear_feature<U: Driver>(_feature: Feature, _packet: &SetupPacket) -> Handshake {
        Handshake::Stall
    }

    /// Handle SET_FEATURE for device-level features
    fn set_feature<U: Driver>(_feature: Feature, _packet: &SetupPacket) -> Handshake {
        Handshake::Stall
    }

    /// Handle a class-specific setup packet
    fn handle_class_packet<U: Driver>(_packet: &SetupPacket) -> Handshake {
        Handshake::Stall
    }

    /// Handle a vendor-specific setup packet
    fn handle_vendor_packet<U: Driver>(_packet: &SetupPacket) -> Handshake {
        Handshake::Stall
    }

    /// Handle GET_INTERFACE
    fn get_interface<U: Driver>(_packet: &SetupPacket) -> Handshake {
        Handshake::Stall
    }

    /// Handle SET_INTERFACE
    fn set_interface<U: Driver>(_packet: &SetupPacket) -> Handshake {
        Handshake::Stall
    }

    /// Called after a bus reset was handled by the driver
    fn bus_reset<U: Driver>() {}

    /// Called when the bus is suspended
    fn sleep<U: Driver>() {}

    /// Called when the bus resumes
    fn wakeup<U: Driver>() {}

    /// Called on bus activity while the transceiver sleeps (chip dependent)
    fn activity<U: Driver>() {}

    /// Called when VBus is asserted (where detectable)
    fn connected<U: Driver>() {}

    /// Called when VBus is deasserted (where detectable)
    fn disconnected<U: Driver>() {}

    /// Called after the driver processed any endpoint interrupt
    ///
    /// Gives polling-style devices a hook into the interrupt; most devices
    /// use transfer callbacks instead.
    fn endpoint_callback<U: Driver>(_endpoint: u8, _mode: EndpointMode) {}
}
