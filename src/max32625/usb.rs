//! USB device controller driver for the MAX32625
//!
//! The controller moves data with its own DMA engine: every endpoint has a
//! buffer descriptor in a 512-byte-aligned table, and ownership of a
//! descriptor passes to the engine through a mask write to the
//! `in_owner`/`out_owner` registers. The endpoint interrupt hands the
//! descriptor back to the CPU.
//!
//! The transceiver is power managed: it sleeps on suspend and when VBus
//! disappears, and D+ activity wakes it back up. The device address is
//! applied by the hardware, so SET_ADDRESS needs no software deferral.
//!
//! [`Usb`] implements the chip-independent [`Driver`] contract.
//!
//! [`Driver`]: ../../usb/trait.Driver.html

use core::marker::PhantomData;
use core::ptr;
use core::sync::atomic::{compiler_fence, Ordering};

use crate::cell::IsrState;
use crate::pac::max32625::{self as pac, Interrupt};
use crate::usb::descriptor::TransferType;
use crate::usb::device::Device;
use crate::usb::endpoint::{needs_zlp, State};
use crate::usb::setup::SetupPacket;
use crate::usb::{
    stack, Driver, EndpointMode, EndpointSizeByType, Error, Handshake, TransferCallback,
    CONTROL_ENDPOINT,
};

/// Logical endpoints provided by the controller
const ENDPOINT_COUNT: usize = 8;

/// Maximum packet sizes; the engine works in 64 byte buffers throughout
static MAX_ENDPOINT_SIZE: EndpointSizeByType = EndpointSizeByType::new(64, 64, 64, 64);

// Device interrupt flag bits
const INT_DPLUS_ACTIVITY: u32 = 0x1;
const INT_BUS_RESET: u32 = 0x1 << 3;
const INT_SUSPEND: u32 = 0x1 << 4;
const INT_NO_VBUS: u32 = 0x1 << 5;
const INT_VBUS: u32 = 0x1 << 6;
const INT_SETUP_DATA: u32 = 0x1 << 8;
const INT_EP_IN: u32 = 0x1 << 9;
const INT_EP_OUT: u32 = 0x1 << 10;
const INT_DMA_ERROR: u32 = 0x1 << 12;

// Device control bits
const DEV_CN_CONNECT: u32 = 0x1 << 3;
const DEV_CN_ULPM: u32 = 0x1 << 4;
const DEV_CN_URST: u32 = 0x1 << 5;
const DEV_CN_FIFO_MODE: u32 = 0x1 << 9;

// Per-endpoint control bits
const EP_DT_RESET: u32 = 0x1 << 6;
const EP_INT_EN: u32 = 0x1 << 4;
const EP_STALL: u32 = 0x1 << 8;
const EP_ST_STALL: u32 = 0x1 << 9;
const EP_ST_ACK: u32 = 0x1 << 10;

// Transceiver power bit in the power manager
const PWR_USB: u32 = 0x1 << 4;

/// One buffer descriptor pair, owned alternately by the CPU and the engine
#[repr(C)]
struct EndpointBuffer {
    buf0_desc: u32,
    buf0_address: u32,
    buf1_desc: u32,
    buf1_address: u32,
}

/// The descriptor table: endpoint 0 has separate OUT and IN descriptors,
/// the data endpoints one each
#[repr(C, align(512))]
struct DescriptorTable {
    ep0_out: EndpointBuffer,
    ep0_in: EndpointBuffer,
    ep: [EndpointBuffer; ENDPOINT_COUNT - 1],
}

impl DescriptorTable {
    const fn new() -> Self {
        const EMPTY: EndpointBuffer = EndpointBuffer {
            buf0_desc: 0,
            buf0_address: 0,
            buf1_desc: 0,
            buf1_address: 0,
        };

        DescriptorTable {
            ep0_out: EMPTY,
            ep0_in: EMPTY,
            ep: [EMPTY; ENDPOINT_COUNT - 1],
        }
    }

    fn buffer(&mut self, endpoint: u8, mode: EndpointMode) -> &mut EndpointBuffer {
        if endpoint == 0 {
            match mode {
                EndpointMode::Out => &mut self.ep0_out,
                _ => &mut self.ep0_in,
            }
        } else {
            &mut self.ep[endpoint as usize - 1]
        }
    }

    /// Hand a buffer to the engine
    ///
    /// The descriptor writes are ordered before the ownership handoff the
    /// caller performs.
    fn arm(&mut self, endpoint: u8, mode: EndpointMode, address: *const u8, size: u32) {
        let buffer = self.buffer(endpoint, mode);

        unsafe {
            ptr::write_volatile(&mut buffer.buf0_desc, size);
            ptr::write_volatile(&mut buffer.buf0_address, address as u32);
        }

        compiler_fence(Ordering::SeqCst);
    }

    /// The byte count the engine left in the descriptor
    fn count(&mut self, endpoint: u8, mode: EndpointMode) -> u32 {
        let buffer = self.buffer(endpoint, mode);

        compiler_fence(Ordering::SeqCst);

        unsafe { ptr::read_volatile(&buffer.buf0_desc) }
    }
}

static ENDPOINTS: IsrState<[State; ENDPOINT_COUNT]> =
    IsrState::new([State::INIT; ENDPOINT_COUNT]);

static DESCRIPTORS: IsrState<DescriptorTable> = IsrState::new(DescriptorTable::new());

/// USB device controller driver
///
/// `D` is the device (class) implementation served by this controller.
pub struct Usb<D> {
    _device: PhantomData<D>,
}

fn regs() -> &'static pac::usb::RegisterBlock {
    unsafe { &*pac::USB::ptr() }
}

fn pwrman() -> &'static pac::pwrman::RegisterBlock {
    unsafe { &*pac::PWRMAN::ptr() }
}

fn state() -> &'static mut [State; ENDPOINT_COUNT] {
    unsafe { ENDPOINTS.get() }
}

fn descriptors() -> &'static mut DescriptorTable {
    unsafe { DESCRIPTORS.get() }
}

fn ep_mode_raw(mode: EndpointMode) -> u32 {
    match mode {
        EndpointMode::Out => 1,
        EndpointMode::In => 2,
        EndpointMode::Control => 3,
        EndpointMode::Disabled => 0,
    }
}

impl<D: Device> Usb<D> {
    /// Initialize the USB controller
    ///
    /// Enables the USB clock and transceiver power, resets the engine,
    /// installs the buffer descriptor table and unmasks the interrupt. The
    /// transceiver starts out asleep; VBus detection wakes it and connects
    /// the pull-up.
    ///
    /// The caller binds [`irq_handler`] to the USB interrupt vector.
    ///
    /// [`irq_handler`]: #method.irq_handler
    pub fn init(usb: pac::USB, clkman: pac::CLKMAN, pwrman: pac::PWRMAN) {
        unsafe {
            clkman.clk_ctrl.modify(|ctrl| ctrl | (0x1 << 4));
            pwrman.pwr_rst_ctrl.modify(|ctrl| ctrl | PWR_USB);
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

        Self::reset_controller();

        unsafe {
            // the engine needs the 512 byte aligned descriptor table
            usb.ep_base
                .write(descriptors() as *mut DescriptorTable as u32);
        }

        // Safe, because there's no critical section here that this could
        // interfere with.
        unsafe { cortex_m::peripheral::NVIC::unmask(Interrupt::USB) };

        unsafe {
            usb.dev_inten
                .modify(|inten| inten | INT_SETUP_DATA | INT_NO_VBUS | INT_VBUS);
        }

        D::init::<Self>();

        // low power until the host shows up
        Self::sleep_transceiver();
    }

    /// The interrupt handler of the driver
    ///
    /// Must be called from the USB interrupt.
    pub fn irq_handler() {
        let usb = regs();

        let status = usb.dev_intfl.read() & usb.dev_inten.read();

        // write one to clear, only the enabled flags
        unsafe {
            usb.dev_intfl.write(status);
        }

        if status & INT_BUS_RESET != 0 {
            // every endpoint falls back to idle; armed callbacks get the
            // reset exactly once
            for i in 0..ENDPOINT_COUNT as u8 {
                <Self as Driver>::reset(i, EndpointMode::Disabled);
            }

            Self::wakeup_transceiver();
            D::bus_reset::<Self>();
        } else {
            // no data processing after a bus reset
            if status & INT_EP_IN != 0 {
                Self::data_in_irq();
            }
            if status & INT_EP_OUT != 0 {
                Self::data_out_irq();
            }
        }

        if status & INT_SETUP_DATA != 0 {
            Self::setup_packet();
        }

        if status & INT_VBUS != 0 {
            Self::vbus_irq();
        }
        if status & INT_NO_VBUS != 0 {
            Self::no_vbus_irq();
        }
        if status & INT_SUSPEND != 0 {
            Self::sleep_transceiver();
        }
        if status & INT_DPLUS_ACTIVITY != 0 {
            Self::wakeup_transceiver();
            D::activity::<Self>();
        }
        if status & INT_DMA_ERROR != 0 {
            // a misprogrammed descriptor; nothing sensible to recover
        }
    }

    fn reset_controller() {
        let usb = regs();

        unsafe {
            // cycle the controller and force a reset of the engine
            usb.cn.write(0);
            usb.cn.write(1);

            usb.dev_inten.write(0);
            usb.dev_cn.write(0);
            usb.dev_cn.write(DEV_CN_URST);
            usb.dev_cn.write(0);
        }
    }

    fn setup_packet() {
        let usb = regs();

        // the hardware latches the eight setup bytes in two words
        let mut raw = [0; 8];
        raw[0..4].copy_from_slice(&usb.setup0.read().to_le_bytes());
        raw[4..8].copy_from_slice(&usb.setup1.read().to_le_bytes());

        // a stale OUT that preceded the setup token must not be replayed
        state()[CONTROL_ENDPOINT as usize].interrupt_pending = false;

        let packet = SetupPacket::from_le_bytes(&raw);
        stack::handle_setup_packet::<Self>(&packet);
    }

    fn vbus_irq() {
        let usb = regs();

        unsafe {
            // a bus reset will follow; listen for it and for suspend
            usb.dev_intfl.write(INT_BUS_RESET | INT_SUSPEND);
            usb.dev_inten
                .modify(|inten| inten | INT_BUS_RESET | INT_SUSPEND);
        }

        Self::connect();

        D::connected::<Self>();

        Self::sleep_transceiver();
    }

    fn no_vbus_irq() {
        let usb = regs();

        unsafe {
            usb.dev_inten
                .modify(|inten| inten & !(INT_BUS_RESET | INT_SUSPEND | INT_DPLUS_ACTIVITY));
        }

        Self::disconnect();

        D::disconnected::<Self>();

        Self::sleep_transceiver();
    }

    /// Put the transceiver into its low power state
    fn sleep_transceiver() {
        let usb = regs();

        unsafe {
            usb.dev_cn.modify(|cn| cn | DEV_CN_ULPM);
            pwrman().pwr_rst_ctrl.modify(|ctrl| ctrl & !PWR_USB);
        }

        if usb.dev_cn.read() & DEV_CN_CONNECT != 0 {
            // wake on D+ activity while connected
            unsafe {
                usb.dev_intfl.write(INT_DPLUS_ACTIVITY);
                usb.dev_inten.modify(|inten| inten | INT_DPLUS_ACTIVITY);
            }
        } else {
            unsafe {
                usb.dev_inten.modify(|inten| inten & !INT_DPLUS_ACTIVITY);
            }
        }

        D::sleep::<Self>();
    }

    /// Power the transceiver back up
    fn wakeup_transceiver() {
        let usb = regs();

        unsafe {
            usb.dev_inten.modify(|inten| inten & !INT_DPLUS_ACTIVITY);
            pwrman().pwr_rst_ctrl.modify(|ctrl| ctrl | PWR_USB);
            usb.dev_cn.modify(|cn| cn & !DEV_CN_ULPM);
        }

        D::wakeup::<Self>();
    }

    fn data_in_irq() {
        let usb = regs();

        let in_irq = usb.in_int.read();
        unsafe {
            usb.in_int.write(in_irq);
        }

        for endpoint in 0..ENDPOINT_COUNT as u8 {
            if in_irq & (0x1 << endpoint) == 0 {
                continue;
            }

            let state = &mut state()[endpoint as usize];

            if !state.is_busy {
                continue;
            }

            let data_left = state.requested_size - state.transferred_size;

            if data_left > 0 {
                let chunk = data_left.min(u32::from(state.max_size));

                // by the time the next interrupt fires this chunk is on
                // the wire
                descriptors().arm(
                    endpoint,
                    EndpointMode::In,
                    unsafe { state.data.add(state.transferred_size as usize) },
                    chunk,
                );
                state.transferred_size += chunk;

                unsafe {
                    usb.in_owner.write(0x1 << endpoint);
                }
            } else if state.zlp_pending {
                // full sized final packet; terminate the transfer with an
                // explicit ZLP
                state.zlp_pending = false;

                descriptors().arm(endpoint, EndpointMode::In, core::ptr::null(), 0);
                unsafe {
                    usb.in_owner.write(0x1 << endpoint);
                }
            } else {
                let (callback, transferred) = state.take();

                if let Some(callback) = callback {
                    callback(endpoint, EndpointMode::In, Error::NoError, transferred);
                }
            }
        }
    }

    fn data_out_irq() {
        let usb = regs();

        let out_irq = usb.out_int.read();
        unsafe {
            usb.out_int.write(out_irq);
        }

        for endpoint in 0..ENDPOINT_COUNT as u8 {
            if out_irq & (0x1 << endpoint) == 0 {
                continue;
            }

            let state = &mut state()[endpoint as usize];

            if !state.is_busy {
                // the transfer completed from an earlier packet and a ZLP
                // trailed in; nothing to do
                continue;
            }

            // accept up to the caller's whole buffer, not just the count
            // that completes the read
            let requested = u32::from(state.max_size)
                .min(state.max_requested_size - state.transferred_size);

            // the engine leaves the received byte count in the descriptor
            let received = descriptors()
                .count(endpoint, EndpointMode::Out)
                .min(requested);

            state.transferred_size += received;

            if received < u32::from(state.max_size)
                || received == 0
                || state.transferred_size >= state.requested_size
            {
                let (callback, transferred) = state.take();

                if let Some(callback) = callback {
                    callback(endpoint, EndpointMode::Out, Error::NoError, transferred);
                }
            } else {
                // hand the descriptor back for the next packet
                let next = u32::from(state.max_size)
                    .min(state.max_requested_size - state.transferred_size);

                descriptors().arm(
                    endpoint,
                    EndpointMode::Out,
                    unsafe { state.data.add(state.transferred_size as usize) },
                    next,
                );

                unsafe {
                    usb.out_owner.write(0x1 << endpoint);
                }
            }
        }
    }

    fn is_configured(endpoint: u8) -> bool {
        regs().ep[endpoint as usize].read() & 0x3 != 0
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
            // the engine has no frame-aligned buffering
            TransferType::Isochronous => false,
            _ => endpoint != 0,
        }
    }

    fn write(
        callback: Option<TransferCallback>,
        endpoint: u8,
        mode: EndpointMode,
        data: &'static [u8],
    ) -> bool {
        let usb = regs();

        if !Self::is_configured(endpoint) && endpoint != 0 {
            return false;
        }

        let state = &mut state()[endpoint as usize];

        // at most one armed transfer, and the engine must own nothing
        if state.is_busy || usb.in_owner.read() & (0x1 << endpoint) != 0 {
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

        descriptors().arm(endpoint, mode, data.as_ptr(), chunk);

        unsafe {
            usb.in_owner.write(0x1 << endpoint);
        }

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
        let usb = regs();

        if (!Self::is_configured(endpoint) && endpoint != 0)
            || Self::is_stalled(endpoint, mode)
        {
            return false;
        }

        let state = &mut state()[endpoint as usize];

        if state.is_busy || usb.out_owner.read() & (0x1 << endpoint) != 0 {
            return false;
        }

        let chunk = (data.len() as u32).min(u32::from(state.max_size));

        state.is_busy = true;
        state.callback = callback;
        state.data = data.as_mut_ptr();
        state.requested_size = min_size;
        state.max_requested_size = data.len() as u32;
        state.transferred_size = 0;

        descriptors().arm(endpoint, EndpointMode::Out, data.as_ptr(), chunk);

        unsafe {
            usb.out_owner.write(0x1 << endpoint);
        }

        true
    }

    fn is_pending(endpoint: u8, _mode: EndpointMode) -> bool {
        state()[endpoint as usize].is_busy
    }

    fn stall(endpoint: u8, mode: EndpointMode) {
        let usb = regs();

        unsafe {
            if endpoint == 0 {
                // stall the whole control transfer
                usb.ep[0].modify(|ep| ep | EP_ST_STALL);
            }

            usb.ep[endpoint as usize].modify(|ep| ep | EP_STALL);
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
            let ep = &regs().ep[endpoint as usize];

            // reset the data toggle along with the stall
            ep.modify(|value| value | EP_DT_RESET);
            ep.modify(|value| value & !EP_STALL);
        }

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::UnStall, transferred);
        }
    }

    fn is_stalled(endpoint: u8, _mode: EndpointMode) -> bool {
        regs().ep[endpoint as usize].read() & EP_STALL != 0
    }

    fn ack(endpoint: u8, _mode: EndpointMode) {
        unsafe {
            regs().ep[endpoint as usize].modify(|ep| ep | EP_ST_ACK);
        }
    }

    fn cancel(endpoint: u8, mode: EndpointMode) {
        let usb = regs();

        // take the descriptor back from the engine
        descriptors().arm(endpoint, mode, core::ptr::null(), 0);

        unsafe {
            match mode {
                EndpointMode::Out => usb.out_owner.write(0),
                _ => usb.in_owner.write(0),
            }
        }

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::Cancel, transferred);
        }
    }

    fn reset(endpoint: u8, mode: EndpointMode) {
        unsafe {
            let ep = &regs().ep[endpoint as usize];

            // disable and reset the data toggle
            ep.modify(|value| value & !0x3);
            ep.modify(|value| value | EP_DT_RESET);
        }

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::Reset, transferred);
        }
    }

    fn configure(endpoint: u8, mode: EndpointMode, ty: TransferType, size: u32) {
        let state = &mut state()[endpoint as usize];
        state.max_size = (size as u16).min(MAX_ENDPOINT_SIZE.size(endpoint, ty));

        let control = ep_mode_raw(mode)
            | EP_DT_RESET
            | if mode == EndpointMode::Disabled {
                0
            } else {
                EP_INT_EN
            };

        unsafe {
            regs().ep[endpoint as usize].write(control);
        }
    }

    fn configured(_configured: bool) {
        // tracked by the hardware through the endpoint enables
    }

    fn set_device_address(_address: u8) -> Handshake {
        // the hardware applies the address after the status stage itself;
        // writing it again would break the transfer
        Handshake::Ack
    }

    fn connect() {
        let usb = regs();

        unsafe {
            usb.dev_inten
                .modify(|inten| inten | INT_SETUP_DATA | INT_EP_IN | INT_EP_OUT | INT_DMA_ERROR);

            // interrupts for the control endpoint
            usb.ep[0].modify(|ep| ep | EP_INT_EN);

            // pull-up, and answer INs as soon as the FIFO fills
            usb.dev_cn
                .modify(|cn| cn | DEV_CN_CONNECT | DEV_CN_FIFO_MODE);
        }
    }

    fn disconnect() {
        unsafe {
            regs().dev_cn.modify(|cn| cn & !DEV_CN_CONNECT);
        }
    }
}
