//! USB function driver for the MB9BF560L
//!
//! The FM4 USB function exposes one control, one status and one data
//! register per endpoint, except endpoint 0 which has separate IN and OUT
//! status registers. Data moves through the 16 bit data registers in
//! half-word pairs; the DRQI flag in the status register paces both
//! directions.
//!
//! The hardware handles more of the control protocol than the other
//! controllers: the device address applies itself, status handshakes are
//! generated automatically, and configuration changes arrive as a CONF
//! interrupt which the driver replays into the device.
//!
//! [`Usb`] implements the chip-independent [`Driver`] contract. The chip
//! splits USB traffic over two vectors: bind [`irq_ep0_handler`] to the
//! endpoint-0/status vector and [`irq_handler`] to the data endpoint
//! vector.
//!
//! [`Driver`]: ../../usb/trait.Driver.html
//! [`irq_ep0_handler`]: struct.Usb.html#method.irq_ep0_handler
//! [`irq_handler`]: struct.Usb.html#method.irq_handler

use core::marker::PhantomData;

use volatile_register::RW;

use crate::cell::IsrState;
use crate::pac::mb9bf560l::{self as pac, Interrupt};
use crate::usb::descriptor::TransferType;
use crate::usb::device::Device;
use crate::usb::endpoint::{needs_zlp, State};
use crate::usb::setup::{RequestType, SetupPacket};
use crate::usb::{
    stack, Driver, EndpointMode, EndpointSizeByEndpoint, Error, Handshake, TransferCallback,
    CONTROL_ENDPOINT,
};

/// Logical endpoints provided by the controller
const ENDPOINT_COUNT: usize = 6;

/// Maximum packet sizes; endpoint 1 has the large FIFO
static MAX_ENDPOINT_SIZE: EndpointSizeByEndpoint<ENDPOINT_COUNT> =
    EndpointSizeByEndpoint::new([64, 256, 64, 64, 64, 64]);

// UDCC bits
const UDCC_PWC: u16 = 0x1;
const UDCC_RFBK: u16 = 0x1 << 1;
const UDCC_RESUME: u16 = 0x1 << 4;
const UDCC_HCONX: u16 = 0x1 << 5;
const UDCC_USTP: u16 = 0x1 << 6;
const UDCC_RST: u16 = 0x1 << 7;

// UDCS status bits
const UDCS_CONF: u16 = 0x1;
const UDCS_SETP: u16 = 0x1 << 1;
const UDCS_WKUP: u16 = 0x1 << 2;
const UDCS_BRST: u16 = 0x1 << 3;
const UDCS_SUSP: u16 = 0x1 << 5;

// Endpoint status bits
const EPS_DRQI: u16 = 0x1 << 10;
const EPS_DRQI_IE: u16 = 0x1 << 14;
const EPS_BFINI: u16 = 0x1 << 15;

// Endpoint control bits
const EPC_STAL: u16 = 0x1 << 9;
const EPC_DIR_IN: u16 = 0x1 << 12;
const EPC_EPEN: u16 = 0x1 << 15;

static ENDPOINTS: IsrState<[State; ENDPOINT_COUNT]> =
    IsrState::new([State::INIT; ENDPOINT_COUNT]);

static SETUP_BUFFER: IsrState<[u8; 8]> = IsrState::new([0; 8]);

/// USB function driver
///
/// `D` is the device (class) implementation served by this controller.
pub struct Usb<D> {
    _device: PhantomData<D>,
}

fn regs() -> &'static pac::usb::RegisterBlock {
    unsafe { &*pac::USB0::ptr() }
}

fn state() -> &'static mut [State; ENDPOINT_COUNT] {
    unsafe { ENDPOINTS.get() }
}

/// The control register of an endpoint
fn ep_control(endpoint: u8) -> &'static RW<u16> {
    &regs().epc[endpoint as usize].reg
}

/// The status register of an endpoint
///
/// Endpoint 0 splits into IN and OUT status; the higher endpoints share
/// one register.
fn ep_status(endpoint: u8, mode: EndpointMode) -> &'static RW<u16> {
    let usb = regs();

    if endpoint == 0 {
        match mode {
            EndpointMode::Out => &usb.ep0os,
            _ => &usb.ep0is,
        }
    } else {
        &usb.eps[endpoint as usize - 1].reg
    }
}

/// The data register of an endpoint
fn ep_data(endpoint: u8) -> &'static RW<u16> {
    &regs().epdt[endpoint as usize].reg
}

fn to_raw_type(ty: TransferType) -> u16 {
    match ty {
        TransferType::Isochronous => 0b01,
        TransferType::Bulk => 0b10,
        TransferType::Interrupt => 0b11,
        TransferType::Control => 0b00,
    }
}

/// The packet size the endpoint received
fn endpoint_byte_count(endpoint: u8, mode: EndpointMode) -> u32 {
    let mask = if endpoint == 1 { 0x1ff } else { 0x7f };

    u32::from(ep_status(endpoint, mode).read() & mask)
}

/// Push a packet into the endpoint FIFO, paced by DRQI
fn write_impl(endpoint: u8, mode: EndpointMode, data: *const u8, size: u32) {
    let status = ep_status(endpoint, mode);

    unsafe {
        // data request interrupt tells us when this packet went out
        status.modify(|value| value | EPS_DRQI_IE);
    }

    // wait for room in the buffer
    while status.read() & EPS_DRQI == 0 {}

    let dt = ep_data(endpoint);

    unsafe {
        let mut i = 0;
        while i + 1 < size {
            let pair = [*data.add(i as usize), *data.add(i as usize + 1)];
            dt.write(u16::from_le_bytes(pair));
            i += 2;
        }

        if size & 0x1 != 0 {
            // trailing byte through the low half of the data register
            let byte_ptr = dt as *const RW<u16> as *mut u8;
            core::ptr::write_volatile(byte_ptr, *data.add(size as usize - 1));
        }

        // hand the packet to the hardware
        status.modify(|value| value & !EPS_DRQI);
    }
}

/// Drain a received packet, returning its size
fn read_impl(endpoint: u8, mode: EndpointMode, data: *mut u8, size: u32) -> u32 {
    let count = endpoint_byte_count(endpoint, mode);
    let dt = ep_data(endpoint);

    unsafe {
        if count > 0 {
            let mut i = 0;
            while i + 1 < count {
                let pair = dt.read().to_le_bytes();
                if i < size {
                    *data.add(i as usize) = pair[0];
                }
                if i + 1 < size {
                    *data.add(i as usize + 1) = pair[1];
                }
                i += 2;
            }

            if count & 0x1 != 0 {
                let byte_ptr = dt as *const RW<u16> as *const u8;
                let byte = core::ptr::read_volatile(byte_ptr);
                if count <= size {
                    *data.add(count as usize - 1) = byte;
                }
            }
        } else {
            // a zero length packet still needs its dummy read
            let _ = dt.read();
        }

        // release the buffer
        ep_status(endpoint, mode).modify(|value| value & !EPS_DRQI);
    }

    count.min(size)
}

impl<D: Device> Usb<D> {
    /// Initialize the USB function
    ///
    /// Enables the USB clock, resets the function block, configures
    /// endpoint 0 and connects the pull-up. The USB PLL must be locked
    /// beforehand.
    ///
    /// The caller binds [`irq_ep0_handler`] and [`irq_handler`] to the two
    /// USB function vectors.
    ///
    /// [`irq_ep0_handler`]: #method.irq_ep0_handler
    /// [`irq_handler`]: #method.irq_handler
    pub fn init(usb0: pac::USB0, usbclk: pac::USBCLK) {
        unsafe {
            // USB clock on
            usbclk.uccr.write(0x1);
        }

        // keep the host away while the endpoints are set up
        Self::disconnect();

        let endpoints = state();
        for (i, endpoint) in endpoints.iter_mut().enumerate() {
            *endpoint = State::new();
            endpoint.max_size = if i == 0 {
                MAX_ENDPOINT_SIZE.size(0, TransferType::Control)
            } else {
                0
            };
        }

        Self::reset_function();

        // Safe, because there's no critical section here that this could
        // interfere with.
        unsafe { cortex_m::peripheral::NVIC::unmask(Interrupt::USB0F) };

        let _ = usb0;

        D::init::<Self>();

        Self::connect();
    }

    /// Reset the function block and endpoint 0
    fn reset_function() {
        let usb = regs();

        unsafe {
            // hold the function in reset while reconfiguring
            usb.udcc.modify(|udcc| udcc | UDCC_RST);

            // device mode, reset the host part
            usb.hcnt.write(0x1 << 1);

            // start the clock, clear resume and the per-transaction
            // NAK mode
            usb.udcc
                .modify(|udcc| udcc & !(UDCC_USTP | UDCC_RESUME | UDCC_RFBK));

            // self powered
            usb.udcc.modify(|udcc| udcc | UDCC_PWC);

            // endpoint 0 packet size
            usb.epc[0]
                .reg
                .write(MAX_ENDPOINT_SIZE.size(0, TransferType::Control));

            usb.udcc.modify(|udcc| udcc & !UDCC_RST);

            // configuration, wakeup, bus reset and suspend events
            usb.udcie
                .write(UDCS_CONF | UDCS_WKUP | UDCS_BRST | UDCS_SUSP);

            // clear every endpoint buffer (endpoint 0 has two)
            usb.ep0is.modify(|value| value & !EPS_BFINI);
            usb.ep0os.modify(|value| value & !EPS_BFINI);
            for eps in usb.eps.iter() {
                eps.reg.modify(|value| value & !EPS_BFINI);
            }

            // OUT traffic on endpoint 0 always raises an interrupt; the
            // IN side is armed per transfer
            usb.ep0os.modify(|value| value | EPS_DRQI_IE);
            usb.ep0is.modify(|value| value & !EPS_DRQI_IE);
        }
    }

    /// The endpoint 0 and bus event interrupt handler
    ///
    /// Must be called from the USB function's endpoint-0/status vector.
    pub fn irq_ep0_handler() {
        let usb = regs();

        let status = usb.udcs.read();

        // flags clear by writing zero; invert to keep the others
        unsafe {
            usb.udcs.write(!status);
        }

        // the hardware stalls endpoint 0 on protocol errors; recover by
        // clearing the stall ourselves
        if Self::is_stalled(0, EndpointMode::Control) {
            Self::un_stall(0, EndpointMode::Control);
        }

        if usb.ep0os.read() & EPS_DRQI != 0 {
            if status & UDCS_SETP != 0 {
                Self::setup_packet();
            } else {
                let count = endpoint_byte_count(0, EndpointMode::Out);

                if count == 0 {
                    // status stage ZLP; drain and release the buffer
                    let _ = usb.epdt[0].reg.read();
                    unsafe {
                        usb.ep0os.modify(|value| value & !EPS_DRQI);
                    }
                } else {
                    Self::endpoint_out_irq(0);
                }
            }
        }

        if usb.ep0is.read() & EPS_DRQI != 0 {
            Self::endpoint_in_irq(0);
        }

        if status & UDCS_CONF != 0 {
            Self::configured_irq();
        }

        if status & UDCS_BRST != 0 {
            Self::bus_reset_irq();
        }
        if status & UDCS_WKUP != 0 {
            D::wakeup::<Self>();
        }
        if status & UDCS_SUSP != 0 {
            D::sleep::<Self>();
        }
    }

    /// The data endpoint interrupt handler
    ///
    /// Must be called from the USB function's data endpoint vector.
    pub fn irq_handler() {
        for endpoint in 1..ENDPOINT_COUNT as u8 {
            let control = ep_control(endpoint).read();

            if control & EPC_EPEN == 0 {
                continue;
            }

            if ep_status(endpoint, EndpointMode::Out).read() & EPS_DRQI == 0 {
                continue;
            }

            if control & EPC_DIR_IN != 0 {
                Self::endpoint_in_irq(endpoint);
            } else {
                Self::endpoint_out_irq(endpoint);
            }
        }
    }

    fn setup_packet() {
        let buffer = unsafe { SETUP_BUFFER.get() };

        read_impl(
            CONTROL_ENDPOINT,
            EndpointMode::Out,
            buffer.as_mut_ptr(),
            buffer.len() as u32,
        );

        // a stale OUT that preceded the setup token must not be replayed
        // into the new transfer
        state()[CONTROL_ENDPOINT as usize].interrupt_pending = false;

        let packet = SetupPacket::from_le_bytes(unsafe { SETUP_BUFFER.get() });
        stack::handle_setup_packet::<Self>(&packet);

        // the hardware fails to ack a SET_IDLE by itself; release the
        // buffer manually when one arrives
        if packet.request_type() == RequestType::Class && packet.b_request == 0x0a {
            unsafe {
                regs().ep0is.modify(|value| value & !EPS_DRQI);
            }
        }
    }

    /// The hardware tracked a SET_CONFIGURATION itself; replay it into the
    /// device so its endpoint setup still runs
    fn configured_irq() {
        let packet = SetupPacket {
            bm_request_type: 0,
            b_request: 0x09,
            w_value: u16::from(D::get_configuration::<Self>()),
            w_index: 0,
            w_length: 0,
        };

        D::set_config::<Self>(&packet);
    }

    fn bus_reset_irq() {
        let usb = regs();

        for endpoint in 0..ENDPOINT_COUNT as u8 {
            if ep_control(endpoint).read() & EPC_EPEN == 0 && endpoint != 0 {
                continue;
            }

            unsafe {
                if endpoint == 0 {
                    // both halves of the control endpoint restart
                    usb.ep0os.modify(|value| value | EPS_BFINI);
                    usb.ep0os.modify(|value| value & !EPS_BFINI);
                    usb.ep0is.modify(|value| value | EPS_BFINI);
                    usb.ep0is.modify(|value| value & !EPS_BFINI);

                    usb.ep0os.modify(|value| value | EPS_DRQI_IE);
                    usb.ep0is.modify(|value| value & !EPS_DRQI_IE);
                } else {
                    let status = ep_status(endpoint, EndpointMode::Out);
                    status.modify(|value| value | EPS_BFINI);
                    status.modify(|value| value & !EPS_BFINI);
                }
            }

            let (callback, transferred) = state()[endpoint as usize].take();

            if let Some(callback) = callback {
                callback(endpoint, EndpointMode::In, Error::Reset, transferred);
            }
        }

        D::bus_reset::<Self>();
    }

    fn endpoint_in_irq(endpoint: u8) {
        let state = &mut state()[endpoint as usize];

        if !state.is_busy {
            return;
        }

        if state.transferred_size >= state.requested_size {
            if state.zlp_pending {
                state.zlp_pending = false;
                write_impl(endpoint, EndpointMode::In, core::ptr::null(), 0);
                return;
            }

            // stop pacing the IN side until the next transfer
            unsafe {
                ep_status(endpoint, EndpointMode::In).modify(|value| value & !EPS_DRQI_IE);
            }

            let (callback, transferred) = state.take();

            if let Some(callback) = callback {
                callback(endpoint, EndpointMode::In, Error::NoError, transferred);
            }
        } else {
            let chunk = (state.requested_size - state.transferred_size)
                .min(u32::from(state.max_size));

            if chunk > 0 {
                write_impl(
                    endpoint,
                    EndpointMode::In,
                    unsafe { state.data.add(state.transferred_size as usize) },
                    chunk,
                );

                state.transferred_size += chunk;
            }
        }
    }

    fn endpoint_out_irq(endpoint: u8) {
        let state = &mut state()[endpoint as usize];

        if !state.is_busy {
            // no transfer armed; latch the interrupt and silence the
            // endpoint until a read replays it
            state.interrupt_pending = true;

            unsafe {
                ep_status(endpoint, EndpointMode::Out).modify(|value| value & !EPS_DRQI_IE);
            }

            return;
        }

        let count = read_impl(
            endpoint,
            EndpointMode::Out,
            unsafe { state.data.add(state.transferred_size as usize) },
            state.max_requested_size - state.transferred_size,
        );

        state.transferred_size += count;

        if state.transferred_size >= state.requested_size || count < u32::from(state.max_size)
        {
            let (callback, transferred) = state.take();

            if let Some(callback) = callback {
                callback(endpoint, EndpointMode::Out, Error::NoError, transferred);
            }
        }
    }
}

impl<D: Device> Driver for Usb<D> {
    type Device = D;

    const ENDPOINT_COUNT: u8 = ENDPOINT_COUNT as u8;

    fn endpoint_size(endpoint: u8, ty: TransferType) -> u16 {
        MAX_ENDPOINT_SIZE.size(endpoint, ty)
    }

    fn is_valid_endpoint(endpoint: u8, ty: TransferType) -> bool {
        if endpoint as usize >= ENDPOINT_COUNT {
            return false;
        }

        match ty {
            TransferType::Control => endpoint == 0,
            TransferType::Bulk | TransferType::Interrupt => endpoint != 0,
            // isochronous mode exists on endpoints 2 and 4 only, and
            // claims the neighboring endpoint's buffer
            TransferType::Isochronous => endpoint == 2 || endpoint == 4,
        }
    }

    fn write(
        callback: Option<TransferCallback>,
        endpoint: u8,
        mode: EndpointMode,
        data: &'static [u8],
    ) -> bool {
        let state = &mut state()[endpoint as usize];

        if state.is_busy {
            // at most one armed transfer per endpoint and direction
            return false;
        }

        let size = data.len() as u32;
        let chunk = size.min(u32::from(state.max_size));

        state.is_busy = true;
        state.callback = callback;
        state.data = data.as_ptr() as *mut u8;
        state.requested_size = size;
        state.transferred_size = chunk;
        state.zlp_pending = needs_zlp(size, state.max_size);

        write_impl(endpoint, mode, data.as_ptr(), chunk);

        true
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
        mode: EndpointMode,
        data: &'static mut [u8],
        min_size: u32,
    ) -> bool {
        let state = &mut state()[endpoint as usize];

        if state.is_busy {
            return false;
        }

        state.is_busy = true;
        state.callback = callback;
        state.data = data.as_mut_ptr();
        state.requested_size = min_size;
        state.max_requested_size = data.len() as u32;
        state.transferred_size = 0;

        if state.interrupt_pending {
            // data arrived while nothing was armed; re-enable the DRQI
            // interrupt so the latched packet is processed now
            state.interrupt_pending = false;
        }

        unsafe {
            ep_status(endpoint, mode).modify(|value| value | EPS_DRQI_IE);
        }

        true
    }

    fn is_pending(endpoint: u8, _mode: EndpointMode) -> bool {
        state()[endpoint as usize].is_busy
    }

    fn stall(endpoint: u8, mode: EndpointMode) {
        unsafe {
            ep_control(endpoint).modify(|value| value | EPC_STAL);
        }

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::Stall, transferred);
        }
    }

    fn un_stall(endpoint: u8, mode: EndpointMode) {
        // the host may clear a halt that was never set; that must not
        // disturb an armed transfer
        if !Self::is_stalled(endpoint, mode) {
            return;
        }

        unsafe {
            ep_control(endpoint).modify(|value| value & !EPC_STAL);
        }

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::UnStall, transferred);
        }
    }

    fn is_stalled(endpoint: u8, _mode: EndpointMode) -> bool {
        ep_control(endpoint).read() & EPC_STAL != 0
    }

    fn ack(_endpoint: u8, _mode: EndpointMode) {
        // the hardware generates the status handshakes itself
    }

    fn cancel(endpoint: u8, mode: EndpointMode) {
        // drop whatever sits in the buffer
        unsafe {
            let status = ep_status(endpoint, mode);
            status.modify(|value| value | EPS_BFINI);
            status.modify(|value| value & !EPS_BFINI);
        }

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::Cancel, transferred);
        }
    }

    fn reset(endpoint: u8, mode: EndpointMode) {
        unsafe {
            let status = ep_status(endpoint, mode);
            status.modify(|value| value | EPS_BFINI);
            status.modify(|value| value & !EPS_BFINI);
        }

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::Reset, transferred);
        }
    }

    fn configure(endpoint: u8, mode: EndpointMode, ty: TransferType, size: u32) {
        // endpoint 1 has the only FIFO larger than 64 bytes; an oversized
        // request degrades to the largest legal packet
        let mask: u16 = if endpoint == 1 { 0x1ff } else { 0x7f };
        let size = size.min(u32::from(mask)) as u16;

        state()[endpoint as usize].max_size = size;

        let direction = if mode == EndpointMode::Out {
            0
        } else {
            EPC_DIR_IN
        };

        unsafe {
            ep_control(endpoint)
                .write(size | direction | (to_raw_type(ty) << 13) | EPC_EPEN);
        }

        if endpoint != 0 {
            let status = ep_status(endpoint, mode);

            unsafe {
                // restart the buffer
                status.modify(|value| value | EPS_BFINI);
                status.modify(|value| value & !EPS_BFINI);

                // IN endpoints are paced per transfer
                if mode != EndpointMode::Out {
                    status.modify(|value| value | EPS_DRQI_IE);
                }
            }
        }
    }

    fn configured(_configured: bool) {
        // the hardware tracks the configured state itself; the CONF
        // interrupt replays the change into the device
    }

    fn set_device_address(_address: u8) -> Handshake {
        // applied by the hardware after the status stage; writing it again
        // would break the transfer
        Handshake::Ack
    }

    fn connect() {
        unsafe {
            regs().udcc.modify(|udcc| udcc & !UDCC_HCONX);
        }
    }

    fn disconnect() {
        unsafe {
            regs().udcc.modify(|udcc| udcc | UDCC_HCONX);
        }
    }
}
