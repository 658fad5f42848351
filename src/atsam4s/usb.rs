//! USB device port (UDP) driver for the ATSAM4S
//!
//! Every endpoint has one control and status register; the iso-capable
//! endpoints are double banked, so received data can sit in bank 0 and
//! bank 1 at the same time and both are drained per interrupt.
//! Isochronous completions are polled frame-aligned from the start-of-
//! frame interrupt. The device address is applied by software after the
//! status stage of SET_ADDRESS.
//!
//! [`Usb`] implements the chip-independent [`Driver`] contract.
//!
//! See the SAM4S datasheet, chapter 40.
//!
//! [`Driver`]: ../../usb/trait.Driver.html

use core::marker::PhantomData;

use crate::cell::IsrState;
use crate::pac::atsam4s::{self as pac, Interrupt};
use crate::usb::descriptor::TransferType;
use crate::usb::device::Device;
use crate::usb::endpoint::{needs_zlp, State};
use crate::usb::setup::SetupPacket;
use crate::usb::{
    stack, Driver, EndpointMode, EndpointSizeByEndpoint, Error, Handshake, TransferCallback,
    CONTROL_ENDPOINT,
};

/// Logical endpoints provided by the controller
const ENDPOINT_COUNT: usize = 8;

/// Maximum packet sizes per endpoint
static MAX_ENDPOINT_SIZE: EndpointSizeByEndpoint<ENDPOINT_COUNT> =
    EndpointSizeByEndpoint::new([64, 64, 64, 64, 512, 512, 64, 64]);

/// The endpoints with two hardware banks (also the iso-capable ones)
const DUAL_BANK_ENDPOINTS: u32 = 0b1111_0110;

// CSR bits
const CSR_TXCOMP: u32 = 0x1;
const CSR_RX_DATA_BK0: u32 = 0x1 << 1;
const CSR_RXSETUP: u32 = 0x1 << 2;
const CSR_STALLSENT: u32 = 0x1 << 3;
const CSR_TXPKTRDY: u32 = 0x1 << 4;
const CSR_FORCESTALL: u32 = 0x1 << 5;
const CSR_RX_DATA_BK1: u32 = 0x1 << 6;
const CSR_DIR: u32 = 0x1 << 7;
const CSR_EPEDS: u32 = 0x1 << 15;

// ISR bits beyond the endpoint bits
const ISR_RXSUSP: u32 = 0x1 << 8;
const ISR_RXRSM: u32 = 0x1 << 9;
const ISR_SOFINT: u32 = 0x1 << 11;
const ISR_ENDBUSRES: u32 = 0x1 << 12;
const ISR_WAKEUP: u32 = 0x1 << 13;

// Hardware endpoint types (CSR EPTYPE field)
const EPTYPE_CONTROL: u32 = 0x0;

static ENDPOINTS: IsrState<[State; ENDPOINT_COUNT]> =
    IsrState::new([State::INIT; ENDPOINT_COUNT]);

static SETUP_BUFFER: IsrState<[u8; 8]> = IsrState::new([0; 8]);

static DEVICE_ADDRESS: IsrState<u8> = IsrState::new(0);

/// USB device port driver
///
/// `D` is the device (class) implementation served by this controller.
pub struct Usb<D> {
    _device: PhantomData<D>,
}

fn regs() -> &'static pac::udp::RegisterBlock {
    unsafe { &*pac::UDP::ptr() }
}

fn state() -> &'static mut [State; ENDPOINT_COUNT] {
    unsafe { ENDPOINTS.get() }
}

fn bank_count(endpoint: u8) -> u32 {
    if DUAL_BANK_ENDPOINTS & (0x1 << endpoint) != 0 {
        2
    } else {
        1
    }
}

/// The hardware endpoint type value for a mode and transfer type
fn eptype(mode: EndpointMode, ty: TransferType) -> u32 {
    if mode == EndpointMode::Control {
        return EPTYPE_CONTROL;
    }

    let in_side = (mode != EndpointMode::Out) as u32;
    (ty as u32) | (in_side << 2)
}

fn set_device_address_impl(address: u8) {
    let udp = regs();

    unsafe {
        if address != 0 {
            // function addressed state
            udp.glb_stat.modify(|stat| (stat & !(0x1 << 1)) | 0x1);
        } else {
            udp.glb_stat.modify(|stat| stat & !0x3);
        }

        // address with the function enable bit
        udp.faddr.write(u32::from(address & 0x7f) | (0x1 << 8));
    }
}

/// Push a packet into the endpoint FIFO and mark it ready
fn write_impl(endpoint: u8, data: *const u8, size: u32) {
    let udp = regs();
    let ep = endpoint as usize;

    unsafe {
        // control endpoints switch the FIFO direction for the data-in
        // stage
        if (udp.csr[ep].read() >> 8) & 0x7 == EPTYPE_CONTROL {
            udp.csr[ep].modify(|csr| csr | CSR_DIR);
        }

        for i in 0..size {
            udp.fdr[ep].write(u32::from(*data.add(i as usize)));
        }

        udp.csr[ep].modify(|csr| csr | CSR_TXPKTRDY);
    }
}

/// Drain the endpoint FIFO, returning the packet size
fn read_impl(endpoint: u8, data: *mut u8, size: u32) -> u32 {
    let udp = regs();
    let ep = endpoint as usize;

    let count = (udp.csr[ep].read() >> 16) & 0x7ff;

    unsafe {
        for i in 0..count.min(size) {
            *data.add(i as usize) = udp.fdr[ep].read() as u8;
        }
    }

    count
}

fn reset_endpoint_impl(endpoint: u8) {
    let udp = regs();
    let mask = 0x1u32 << endpoint;

    unsafe {
        udp.rst_ep.modify(|rst| rst | mask);
    }
    while udp.rst_ep.read() & mask == 0 {}
    unsafe {
        udp.rst_ep.modify(|rst| rst & !mask);
    }
}

impl<D: Device> Usb<D> {
    /// Initialize the USB device port
    ///
    /// Enables the UDP clocks, hands the D+/D- pads to the transceiver,
    /// resets the endpoint state, unmasks the UDP interrupt and connects
    /// the pull-up. The 48 MHz USB clock (PLL and divider) must be set up
    /// beforehand.
    ///
    /// The caller binds [`irq_handler`] to the UDP interrupt vector.
    ///
    /// [`irq_handler`]: #method.irq_handler
    pub fn init(udp: pac::UDP, pmc: pac::PMC, matrix: pac::MATRIX) {
        unsafe {
            // peripheral clock (UDP is peripheral 34, so bit 2 of PCER1)
            // and the 48 MHz system clock for the transceiver
            pmc.pcer1.write(0x1 << (Interrupt::UDP as u32 - 32));
            pmc.scer.write(0x1 << 7);

            // hand PB10/PB11 to the transceiver as DDM/DDP
            matrix.ccfg_sysio.modify(|sysio| sysio & !(0x3 << 10));
        }

        let endpoints = state();
        for (i, endpoint) in endpoints.iter_mut().enumerate() {
            *endpoint = State::new();
            endpoint.max_size = if i == 0 {
                MAX_ENDPOINT_SIZE.size(0, TransferType::Control)
            } else {
                0
            };
        }

        let usb = regs();
        unsafe {
            // mask everything; the bus reset interrupt cannot be masked
            usb.idr.write(0xffff_ffff);
            usb.icr.write(0xffff_ffff);
        }

        // Safe, because there's no critical section here that this could
        // interfere with.
        unsafe { cortex_m::peripheral::NVIC::unmask(Interrupt::UDP) };

        let _ = udp;

        D::init::<Self>();

        Self::connect();
    }

    /// The interrupt handler of the driver
    ///
    /// Must be called from the UDP interrupt.
    pub fn irq_handler() {
        let udp = regs();

        let status = udp.isr.read() & (udp.imr.read() | ISR_ENDBUSRES);

        // clear early so nothing is missed while callbacks run
        unsafe {
            udp.icr.write(status & !(0xff | ISR_RXSUSP | ISR_RXRSM | ISR_WAKEUP));
        }

        if status & ISR_ENDBUSRES != 0 {
            Self::bus_reset_irq();

            // nothing else is processed after a bus reset
            return;
        }

        if status & 0xff != 0 {
            Self::data_irq(status & 0xff);
        }

        if status & ISR_RXSUSP != 0 {
            unsafe {
                udp.icr.write(ISR_RXSUSP);
                // wait for wakeup or resume, stop listening for suspend
                udp.ier.write(ISR_WAKEUP | ISR_RXRSM);
                udp.idr.write(ISR_RXSUSP);
            }

            D::sleep::<Self>();
        }

        if status & (ISR_WAKEUP | ISR_RXRSM) != 0 {
            unsafe {
                udp.icr.write(ISR_WAKEUP | ISR_RXRSM);
                udp.ier.write(ISR_RXSUSP);
                udp.idr.write(ISR_WAKEUP | ISR_RXRSM);
            }

            D::wakeup::<Self>();
        }

        if status & ISR_SOFINT != 0 {
            Self::isochronous_irq();
        }
    }

    fn bus_reset_irq() {
        set_device_address_impl(0);

        let udp = regs();

        unsafe {
            // enable the control endpoint and all endpoint interrupts
            udp.csr[CONTROL_ENDPOINT as usize].write(CSR_EPEDS | (EPTYPE_CONTROL << 8));
            udp.ier.write(0xff | ISR_RXSUSP);
        }

        D::bus_reset::<Self>();

        // every armed transfer ends here; report the reset to each
        // callback exactly once
        for i in 0..ENDPOINT_COUNT as u8 {
            let (callback, transferred) = state()[i as usize].take();

            if let Some(callback) = callback {
                callback(i, EndpointMode::In, Error::Reset, transferred);
            }
        }

        unsafe {
            *DEVICE_ADDRESS.get() = 0;
        }
    }

    fn data_irq(mut endpoints: u32) {
        let udp = regs();

        while endpoints != 0 {
            let endpoint = endpoints.trailing_zeros() as u8;
            endpoints &= !(0x1 << endpoint);

            let csr = udp.csr[endpoint as usize].read();
            let count = (csr >> 16) & 0x7ff;
            let ep_mode = (csr >> 8) & 0x7;

            if ep_mode == EPTYPE_CONTROL && csr & CSR_RXSETUP != 0 {
                Self::setup_packet(endpoint, count);
            } else if csr & CSR_TXCOMP != 0 {
                unsafe {
                    udp.csr[endpoint as usize].modify(|csr| csr & !CSR_TXCOMP);
                }

                Self::endpoint_in_irq(endpoint);
            } else if csr & (CSR_RX_DATA_BK0 | CSR_RX_DATA_BK1) != 0 {
                if ep_mode == EPTYPE_CONTROL && csr & CSR_DIR != 0 {
                    // status stage of a control read; just clear the bank
                    unsafe {
                        udp.csr[endpoint as usize].modify(|csr| csr & !CSR_RX_DATA_BK0);
                    }
                } else {
                    Self::endpoint_out_irq(endpoint, false);
                }
            } else if csr & CSR_STALLSENT != 0 {
                // stall handshake went out (or iso CRC error); clear it
                unsafe {
                    udp.csr[endpoint as usize].modify(|csr| csr & !CSR_STALLSENT);
                }
            }

            D::endpoint_callback::<Self>(
                endpoint,
                if ep_mode & 0x4 != 0 {
                    EndpointMode::In
                } else {
                    EndpointMode::Out
                },
            );
        }
    }

    fn setup_packet(endpoint: u8, count: u32) {
        let udp = regs();

        if count != 8 {
            unsafe {
                udp.csr[endpoint as usize].modify(|csr| csr & !CSR_RXSETUP);
            }

            Self::stall(endpoint, EndpointMode::Control);
            return;
        }

        let buffer = unsafe { SETUP_BUFFER.get() };
        read_impl(endpoint, buffer.as_mut_ptr(), buffer.len() as u32);

        unsafe {
            udp.csr[endpoint as usize].modify(|csr| csr & !CSR_RXSETUP);
        }

        // a stale OUT that preceded the setup token must not be replayed
        // into the new transfer
        state()[endpoint as usize].interrupt_pending = false;

        let packet = SetupPacket::from_le_bytes(unsafe { SETUP_BUFFER.get() });
        stack::handle_setup_packet::<Self>(&packet);
    }

    fn endpoint_in_irq(endpoint: u8) {
        // a buffered address goes live after the SET_ADDRESS status stage,
        // which is this completion
        let address = unsafe { DEVICE_ADDRESS.get() };
        if *address != 0 {
            set_device_address_impl(*address);
            *address = 0;
        }

        let state = &mut state()[endpoint as usize];

        if !state.is_busy {
            return;
        }

        if state.transferred_size >= state.requested_size {
            if state.zlp_pending {
                state.zlp_pending = false;
                write_impl(endpoint, core::ptr::null(), 0);
                return;
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
                    unsafe { state.data.add(state.transferred_size as usize) },
                    chunk,
                );

                state.transferred_size += chunk;
            }
        }
    }

    fn endpoint_out_irq(endpoint: u8, isochronous: bool) {
        let udp = regs();
        let state = &mut state()[endpoint as usize];

        if !isochronous && !state.is_busy {
            // nothing armed; latch the interrupt and silence the endpoint
            // until a read replays it
            state.interrupt_pending = true;

            unsafe {
                udp.idr.write(0x1 << endpoint);
            }

            return;
        }

        // drain every bank that carries data
        for bank in 0..bank_count(endpoint) {
            let bank_flag = if bank == 0 {
                CSR_RX_DATA_BK0
            } else {
                CSR_RX_DATA_BK1
            };

            if udp.csr[endpoint as usize].read() & bank_flag == 0 {
                continue;
            }

            let count = read_impl(
                endpoint,
                unsafe { state.data.add(state.transferred_size as usize) },
                state
                    .max_requested_size
                    .saturating_sub(state.transferred_size),
            );

            state.transferred_size += count;

            unsafe {
                udp.csr[endpoint as usize].modify(|csr| csr & !bank_flag);
            }

            if state.transferred_size >= state.requested_size
                || count < u32::from(state.max_size)
            {
                let (callback, transferred) = state.take();

                if let Some(callback) = callback {
                    callback(endpoint, EndpointMode::Out, Error::NoError, transferred);
                }

                break;
            }
        }
    }

    /// Frame-aligned completion polling for the isochronous endpoints
    fn isochronous_irq() {
        let udp = regs();
        let mut endpoints = DUAL_BANK_ENDPOINTS;

        while endpoints != 0 {
            let endpoint = endpoints.trailing_zeros() as u8;
            endpoints &= !(0x1 << endpoint);

            if !state()[endpoint as usize].is_busy {
                continue;
            }

            let csr = udp.csr[endpoint as usize].read();

            if csr & CSR_EPEDS == 0 {
                continue;
            }

            // only the endpoints currently configured as isochronous
            let ep_mode = (csr >> 8) & 0x7;
            if ep_mode & 0x3 != TransferType::Isochronous as u32 {
                continue;
            }

            if ep_mode & 0x4 != 0 {
                Self::endpoint_in_irq(endpoint);
            } else {
                Self::endpoint_out_irq(endpoint, true);
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
            // endpoint 3 can serve as a second control endpoint
            TransferType::Control => endpoint == 0 || endpoint == 3,
            TransferType::Isochronous => DUAL_BANK_ENDPOINTS & (0x1 << endpoint) != 0,
            _ => true,
        }
    }

    fn write(
        callback: Option<TransferCallback>,
        endpoint: u8,
        _mode: EndpointMode,
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

        write_impl(endpoint, data.as_ptr(), chunk);

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
        _mode: EndpointMode,
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
            // data already sits in a bank; re-enable the endpoint
            // interrupt so it is processed now
            state.interrupt_pending = false;

            unsafe {
                regs().ier.write(0x1 << endpoint);
            }
        }

        true
    }

    fn is_pending(endpoint: u8, _mode: EndpointMode) -> bool {
        state()[endpoint as usize].is_busy
    }

    fn stall(endpoint: u8, mode: EndpointMode) {
        unsafe {
            regs().csr[endpoint as usize].modify(|csr| csr | CSR_FORCESTALL);
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
            regs().csr[endpoint as usize].modify(|csr| csr & !(CSR_FORCESTALL | CSR_STALLSENT));
        }

        // resets the data toggle as well
        reset_endpoint_impl(endpoint);

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::UnStall, transferred);
        }
    }

    fn is_stalled(endpoint: u8, _mode: EndpointMode) -> bool {
        regs().csr[endpoint as usize].read() & (CSR_FORCESTALL | CSR_STALLSENT) != 0
    }

    fn ack(endpoint: u8, mode: EndpointMode) {
        let udp = regs();

        unsafe {
            if mode != EndpointMode::Out {
                // an empty IN packet is the status handshake
                udp.csr[endpoint as usize].modify(|csr| csr | CSR_TXPKTRDY);
            } else {
                udp.csr[endpoint as usize].modify(|csr| csr & !CSR_RX_DATA_BK0);
            }
        }
    }

    fn cancel(endpoint: u8, mode: EndpointMode) {
        let udp = regs();

        // silence the endpoint while the banks are cleared
        let irq_enabled = udp.imr.read() & (0x1 << endpoint) != 0;
        if irq_enabled {
            unsafe {
                udp.idr.write(0x1 << endpoint);
            }
        }

        unsafe {
            if mode == EndpointMode::Out {
                udp.csr[endpoint as usize]
                    .modify(|csr| csr & !(CSR_RX_DATA_BK0 | CSR_RX_DATA_BK1));
            } else {
                udp.csr[endpoint as usize].modify(|csr| csr & !(CSR_TXPKTRDY | CSR_TXCOMP));
            }
        }

        if irq_enabled {
            unsafe {
                udp.ier.write(0x1 << endpoint);
            }
        }

        reset_endpoint_impl(endpoint);

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::Cancel, transferred);
        }
    }

    fn reset(endpoint: u8, mode: EndpointMode) {
        reset_endpoint_impl(endpoint);

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::Reset, transferred);
        }
    }

    fn configure(endpoint: u8, mode: EndpointMode, ty: TransferType, size: u32) {
        let state = &mut state()[endpoint as usize];
        state.max_size = (size as u16).min(MAX_ENDPOINT_SIZE.size(endpoint, ty));

        reset_endpoint_impl(endpoint);

        let udp = regs();

        unsafe {
            udp.csr[endpoint as usize].write(CSR_EPEDS | (eptype(mode, ty) << 8));

            if ty == TransferType::Isochronous {
                // iso completions are polled on the frame
                udp.ier.write(ISR_SOFINT);
            }
        }
    }

    fn configured(configured: bool) {
        unsafe {
            regs().glb_stat.modify(|stat| {
                if configured {
                    stat | (0x1 << 1)
                } else {
                    stat & !(0x1 << 1)
                }
            });
        }
    }

    fn set_device_address(address: u8) -> Handshake {
        // applied in software after the status stage of this transfer
        unsafe {
            *DEVICE_ADDRESS.get() = address;
        }

        Handshake::Ack
    }

    fn connect() {
        unsafe {
            // enable the 1.5k pull-up on D+
            regs().txvc.write(0x1 << 9);
        }
    }

    fn disconnect() {
        unsafe {
            regs().txvc.write(0);
        }
    }
}
