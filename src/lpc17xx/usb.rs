//! USB device controller driver for the LPC17xx
//!
//! The LPC17xx controller is driven through its serial interface engine
//! (SIE): endpoint selection, status, stalls and buffer handling are
//! commands written as opcode/phase pairs into the command register, with
//! completion polled in the device interrupt status. Data moves through a
//! shared FIFO window selected per endpoint.
//!
//! [`Usb`] implements the chip-independent [`Driver`] contract; the device
//! (class) implementation is its type parameter. The whole stack runs from
//! the USB interrupt:
//!
//! ``` no_run
//! use cmx_hal::lpc17xx::{usb::Usb, Peripherals};
//! use cmx_hal::usb::keyboard::Keyboard;
//!
//! type Kbd = Keyboard<1>;
//!
//! let mut p = Peripherals::take().unwrap();
//!
//! Usb::<Kbd>::init(p.usb, p.usbclk, &mut p.pinconnect, &mut p.syscon);
//!
//! // with the `rt` feature, bind the interrupt:
//! // #[interrupt]
//! // fn USB() { Usb::<Kbd>::irq_handler(); }
//! ```
//!
//! See the user manual, chapter 11.
//!
//! [`Driver`]: ../../usb/trait.Driver.html

use core::marker::PhantomData;

use crate::cell::IsrState;
use crate::pac::lpc17xx::{self as pac, Interrupt};
use crate::usb::descriptor::TransferType;
use crate::usb::device::Device;
use crate::usb::endpoint::{needs_zlp, State};
use crate::usb::setup::SetupPacket;
use crate::usb::{
    stack, Driver, EndpointMode, EndpointSizeByType, Error, Handshake, TransferCallback,
    CONTROL_ENDPOINT,
};

use super::pinsel::{Function, PinConnect};
use super::syscon::Syscon;

/// Logical endpoints provided by the controller
const ENDPOINT_COUNT: usize = 16;

/// Maximum packet sizes by transfer type
static MAX_ENDPOINT_SIZE: EndpointSizeByType = EndpointSizeByType::new(64, 512, 64, 64);

/// The isochronous-capable logical endpoints, as a bit mask
const ISO_ENDPOINTS: u32 = (0x1 << 3) | (0x1 << 6) | (0x1 << 9) | (0x1 << 12);

/// The interrupt-capable logical endpoints
const INTERRUPT_ENDPOINTS: u32 =
    (0x1 << 1) | (0x1 << 4) | (0x1 << 7) | (0x1 << 10) | (0x1 << 13);

// Device interrupt status bits
const DEVINT_EP_SLOW: u32 = 0x1 << 2;
const DEVINT_DEV_STAT: u32 = 0x1 << 3;
const DEVINT_CCEMPTY: u32 = 0x1 << 4;
const DEVINT_CDFULL: u32 = 0x1 << 5;
const DEVINT_EP_RLZED: u32 = 0x1 << 8;

// SIE command phases
const PHASE_WRITE: u32 = 0x01;
const PHASE_READ: u32 = 0x02;
const PHASE_COMMAND: u32 = 0x05;

// SIE device commands
const CMD_SET_ADDRESS: u8 = 0xd0;
const CMD_CONFIGURE: u8 = 0xd8;
const CMD_GET_STATUS: u8 = 0xfe;
const CMD_SET_STATUS: u8 = 0xfe;

// SIE endpoint commands; select/set-status take the physical endpoint as
// an offset
const CMD_SELECT_ENDPOINT: u8 = 0x00;
const CMD_SET_EP_STATUS: u8 = 0x40;
const CMD_CLEAR_BUFFER: u8 = 0xf2;
const CMD_VALIDATE_BUFFER: u8 = 0xfa;

// Device status bits (CMD_GET_STATUS result)
const DEV_STATUS_CONNECT: u32 = 0x1;
const DEV_STATUS_CONNECT_CHANGE: u32 = 0x1 << 1;
const DEV_STATUS_SUSPEND: u32 = 0x1 << 2;
const DEV_STATUS_SUSPEND_CHANGE: u32 = 0x1 << 3;
const DEV_STATUS_RESET: u32 = 0x1 << 4;

// Endpoint status bits (select endpoint result)
const EP_STATUS_STALLED: u32 = 0x1 << 1;
const EP_STATUS_SETUP: u32 = 0x1 << 2;
const EP_STATUS_NAK: u32 = 0x1 << 4;

// Set-endpoint-status bits
const EP_SET_STALL: u8 = 0x1;

static ENDPOINTS: IsrState<[State; ENDPOINT_COUNT]> =
    IsrState::new([State::INIT; ENDPOINT_COUNT]);

/// Buffer the setup packet is read into before it is dispatched
static SETUP_BUFFER: IsrState<[u8; 8]> = IsrState::new([0; 8]);

/// Device address buffered until the status stage of SET_ADDRESS went out
static DEVICE_ADDRESS: IsrState<u8> = IsrState::new(0);

/// USB device controller driver
///
/// `D` is the device (class) implementation served by this controller.
/// All state lives in statics; at most one `Usb` instantiation may be
/// initialized per program.
pub struct Usb<D> {
    _device: PhantomData<D>,
}

fn regs() -> &'static pac::usb::RegisterBlock {
    unsafe { &*pac::USB::ptr() }
}

fn state() -> &'static mut [State; ENDPOINT_COUNT] {
    unsafe { ENDPOINTS.get() }
}

/// The physical endpoint index for a logical endpoint and direction
fn physical(endpoint: u8, mode: EndpointMode) -> u32 {
    let in_side = match mode {
        EndpointMode::Out => 0,
        _ => 1,
    };

    (u32::from(endpoint) << 1) | in_side
}

/// Write a SIE command without data
fn write_command(command: u8) {
    let usb = regs();

    unsafe {
        usb.devintclr.write(DEVINT_CCEMPTY);
        usb.cmdcode.write((PHASE_COMMAND << 8) | (u32::from(command) << 16));
    }

    while usb.devintst.read() & DEVINT_CCEMPTY == 0 {}
}

/// Write a SIE command with one data byte
fn write_command_data(command: u8, value: u8) {
    write_command(command);

    let usb = regs();

    unsafe {
        usb.devintclr.write(DEVINT_CCEMPTY);
        usb.cmdcode.write((PHASE_WRITE << 8) | (u32::from(value) << 16));
    }

    while usb.devintst.read() & DEVINT_CCEMPTY == 0 {}
}

/// Run a SIE command and read its one byte result
fn read_result(command: u8) -> u32 {
    let usb = regs();

    unsafe {
        usb.devintclr.write(DEVINT_CCEMPTY | DEVINT_CDFULL);
        usb.cmdcode.write((PHASE_COMMAND << 8) | (u32::from(command) << 16));
    }

    while usb.devintst.read() & DEVINT_CCEMPTY == 0 {}

    unsafe {
        usb.devintclr.write(DEVINT_CDFULL);
        usb.cmdcode.write((PHASE_READ << 8) | (u32::from(command) << 16));
    }

    while usb.devintst.read() & DEVINT_CDFULL == 0 {}

    usb.cmddata.read()
}

/// Run a SIE endpoint command, selecting the endpoint first
fn write_ep_command(endpoint: u8, mode: EndpointMode, command: u8) {
    write_command(CMD_SELECT_ENDPOINT | physical(endpoint, mode) as u8);
    write_command(command);
}

/// Select an endpoint and read its status
fn read_ep_status(endpoint: u8, mode: EndpointMode) -> u32 {
    read_result(CMD_SELECT_ENDPOINT | physical(endpoint, mode) as u8)
}

fn set_device_address_impl(address: u8) {
    // the SIE wants the address written twice to latch it in the same
    // frame
    write_command_data(CMD_SET_ADDRESS, 0x80 | address);
    write_command_data(CMD_SET_ADDRESS, 0x80 | address);
}

/// Copy a packet into the endpoint FIFO and validate the buffer
fn write_impl(endpoint: u8, mode: EndpointMode, data: *const u8, size: u32) {
    let usb = regs();

    unsafe {
        // select the endpoint for writing
        usb.ctrl
            .write(u32::from(endpoint & 0xf) << 2 | (0x1 << 1));
        usb.txplen.write(size);

        let mut written = 0;
        while written < size {
            let mut word = [0; 4];
            let count = (size - written).min(4);
            for (i, byte) in word.iter_mut().enumerate().take(count as usize) {
                *byte = *data.add((written as usize) + i);
            }

            usb.txdata.write(u32::from_le_bytes(word));
            written += 4;
        }

        // zero length packets still need the length write to start
        if size == 0 {
            usb.txdata.write(0);
        }

        usb.ctrl.write(0);
    }

    write_ep_command(endpoint, mode, CMD_VALIDATE_BUFFER);
}

/// Drain the endpoint FIFO into a buffer, returning the packet size
fn read_impl(endpoint: u8, mode: EndpointMode, data: *mut u8, size: u32) -> u32 {
    let usb = regs();

    unsafe {
        // select the endpoint for reading
        usb.ctrl.write(u32::from(endpoint & 0xf) << 2 | 0x1);

        // wait for the packet to be ready
        let mut rxplen = usb.rxplen.read();
        while rxplen & (0x1 << 11) == 0 {
            rxplen = usb.rxplen.read();
        }

        let count = rxplen & 0x3ff;

        let mut offset = 0;
        while offset < count {
            let word = usb.rxdata.read().to_le_bytes();

            let take = (count - offset).min(4).min(size.saturating_sub(offset));
            for (i, byte) in word.iter().enumerate().take(take as usize) {
                *data.add((offset as usize) + i) = *byte;
            }

            offset += 4;
        }

        usb.ctrl.write(0);

        // isochronous endpoints clear their buffers on the frame
        if (0x1 << endpoint) & ISO_ENDPOINTS == 0 {
            write_ep_command(endpoint, mode, CMD_CLEAR_BUFFER);
        }

        count.min(size)
    }
}

impl<D: Device> Usb<D> {
    /// Initialize the USB device controller
    ///
    /// Enables the USB clocks, routes the D+/D-/VBus/connect/up-led pins,
    /// resets the endpoint table, unmasks the USB interrupt and connects
    /// the pull-up. Consumes the USB register block singletons, making
    /// this driver their owner.
    ///
    /// The caller binds [`irq_handler`] to the USB interrupt vector.
    ///
    /// [`irq_handler`]: #method.irq_handler
    pub fn init(
        usb: pac::USB,
        usbclk: pac::USBCLK,
        pinconnect: &mut PinConnect,
        syscon: &mut Syscon,
    ) {
        syscon.enable_clock(&usb);

        // device clock, I2C clock and AHB clock for the USB block
        let clocks = (0x1 << 4) | (0x1 << 3) | (0x1 << 1);
        unsafe {
            usbclk.ctrl.write(clocks);
        }
        while usbclk.st.read() & clocks != clocks {}

        // fixed pin routes of the USB block: D+/D- on P0.29/P0.30, VBUS
        // on P1.30, soft-connect on P2.9 and the up-led on P1.18
        pinconnect.set_function_raw(0, 29, Function::Func1);
        pinconnect.set_function_raw(0, 30, Function::Func1);
        pinconnect.set_function_raw(1, 30, Function::Func2);
        pinconnect.set_function_raw(2, 9, Function::Func1);
        pinconnect.set_function_raw(1, 18, Function::Func1);

        let endpoints = state();
        for (i, endpoint) in endpoints.iter_mut().enumerate() {
            *endpoint = State::new();
            endpoint.max_size = if i == 0 {
                MAX_ENDPOINT_SIZE.size(0, TransferType::Control)
            } else {
                0
            };
        }

        // Safe, because there's no critical section here that this could
        // interfere with.
        unsafe { cortex_m::peripheral::NVIC::unmask(Interrupt::USB) };

        // the hardware does not report the initial bus reset reliably, so
        // run one by hand and start from address zero
        Self::reset_controller();
        set_device_address_impl(0);

        D::init::<Self>();

        Self::connect();
    }

    /// The interrupt handler of the driver
    ///
    /// Must be called from the USB interrupt.
    pub fn irq_handler() {
        let usb = regs();

        let status = usb.devintst.read() & usb.devinten.read();

        if status & DEVINT_DEV_STAT != 0 {
            Self::device_status_irq();
        } else if status & DEVINT_EP_SLOW != 0 {
            Self::data_irq();
        }

        unsafe {
            usb.devintclr.write(status);
        }
    }

    /// Reset the controller's endpoint table and interrupt state
    fn reset_controller() {
        let usb = regs();

        unsafe {
            // realize the control endpoint in both directions
            usb.epind.write(0);
            usb.maxpsize
                .write(u32::from(MAX_ENDPOINT_SIZE.size(0, TransferType::Control)));
            usb.epind.write(1);
            usb.maxpsize
                .write(u32::from(MAX_ENDPOINT_SIZE.size(0, TransferType::Control)));
        }

        while usb.devintst.read() & DEVINT_EP_RLZED == 0 {}

        unsafe {
            usb.epintclr.write(0xffff_ffff);
            usb.epinten.write(0xffff_ffff);
            usb.devintclr.write(0xffff_ffff);

            // device status and slow endpoint interrupts
            usb.devinten.write(DEVINT_DEV_STAT | DEVINT_EP_SLOW);
        }

        D::bus_reset::<Self>();
    }

    fn device_status_irq() {
        let status = read_result(CMD_GET_STATUS);

        if status & DEV_STATUS_RESET != 0 {
            Self::reset_controller();

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

        if status & DEV_STATUS_CONNECT_CHANGE != 0 {
            if status & DEV_STATUS_CONNECT != 0 {
                D::connected::<Self>();
            } else {
                D::disconnected::<Self>();
            }
        }

        if status & DEV_STATUS_SUSPEND_CHANGE != 0 {
            if status & DEV_STATUS_SUSPEND != 0 {
                D::sleep::<Self>();
            } else {
                D::wakeup::<Self>();
            }
        }
    }

    fn data_irq() {
        let usb = regs();

        loop {
            let pending = usb.epintst.read() & usb.epinten.read();
            if pending == 0 {
                break;
            }

            let phys = pending.trailing_zeros();

            unsafe {
                usb.epintclr.write(0x1 << phys);
            }

            // clearing the endpoint interrupt runs a select command; its
            // status lands in CMDDATA once CDFULL is set
            while usb.devintst.read() & DEVINT_CDFULL == 0 {}
            let value = usb.cmddata.read();

            let endpoint = (phys >> 1) as u8;
            let mode = if phys & 0x1 == 0 {
                EndpointMode::Out
            } else {
                EndpointMode::In
            };

            if endpoint == 0 && mode == EndpointMode::Out && value & EP_STATUS_SETUP != 0 {
                Self::setup_packet();
            } else if value & EP_STATUS_NAK != 0 {
                // a NAK went out; let an armed callback know, the transfer
                // stays armed
                if let Some(callback) = state()[endpoint as usize].callback {
                    callback(endpoint, mode, Error::Nak, 0);
                }
            } else {
                match mode {
                    EndpointMode::In => Self::endpoint_in_irq(endpoint),
                    _ => Self::endpoint_out_irq(endpoint),
                }
            }

            D::endpoint_callback::<Self>(endpoint, mode);
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
    }

    fn endpoint_in_irq(endpoint: u8) {
        // a buffered address goes live once the status stage of the
        // SET_ADDRESS transfer completed, which is this IN interrupt
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
                // the host cannot see the end of a transfer whose final
                // packet was full sized; terminate it explicitly
                state.zlp_pending = false;
                write_impl(endpoint, EndpointMode::In, core::ptr::null(), 0);
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
            // no transfer armed; latch the interrupt so the next read can
            // replay it
            state.interrupt_pending = true;
            return;
        }

        let count = read_impl(
            endpoint,
            EndpointMode::Out,
            unsafe { state.data.add(state.transferred_size as usize) },
            state.max_requested_size - state.transferred_size,
        );

        state.transferred_size += count;

        // a short packet ends the transfer, as does reaching the
        // requested count
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

        // the endpoint types are fixed in hardware
        let mask = 0x1 << endpoint;
        match ty {
            TransferType::Control => endpoint == 0,
            TransferType::Isochronous => mask & ISO_ENDPOINTS != 0,
            TransferType::Interrupt => mask & INTERRUPT_ENDPOINTS != 0,
            TransferType::Bulk => {
                endpoint != 0 && mask & (ISO_ENDPOINTS | INTERRUPT_ENDPOINTS) == 0
            }
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
            // data arrived while nothing was armed; replay the latched
            // interrupt so it is processed now
            state.interrupt_pending = false;

            unsafe {
                regs().epintset.write(0x1 << physical(endpoint, mode));
            }
        }

        true
    }

    fn is_pending(endpoint: u8, _mode: EndpointMode) -> bool {
        state()[endpoint as usize].is_busy
    }

    fn stall(endpoint: u8, mode: EndpointMode) {
        write_command_data(
            CMD_SET_EP_STATUS | physical(endpoint, mode) as u8,
            EP_SET_STALL,
        );

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

        write_command_data(CMD_SET_EP_STATUS | physical(endpoint, mode) as u8, 0);

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::UnStall, transferred);
        }
    }

    fn is_stalled(endpoint: u8, mode: EndpointMode) -> bool {
        read_ep_status(endpoint, mode) & EP_STATUS_STALLED != 0
    }

    fn ack(endpoint: u8, mode: EndpointMode) {
        if mode != EndpointMode::Out {
            // an empty IN packet is the status handshake
            write_impl(endpoint, EndpointMode::In, core::ptr::null(), 0);
        } else {
            // drain and discard whatever is in the OUT bank
            read_impl(endpoint, EndpointMode::Out, core::ptr::null_mut(), 0);
        }
    }

    fn cancel(endpoint: u8, mode: EndpointMode) {
        // drain the hardware bank so the next transfer starts clean
        if mode == EndpointMode::Out {
            write_ep_command(endpoint, mode, CMD_CLEAR_BUFFER);
        }

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::Cancel, transferred);
        }
    }

    fn reset(endpoint: u8, mode: EndpointMode) {
        write_command_data(CMD_SET_EP_STATUS | physical(endpoint, mode) as u8, 0);

        let (callback, transferred) = state()[endpoint as usize].take();

        if let Some(callback) = callback {
            callback(endpoint, mode, Error::Reset, transferred);
        }
    }

    fn configure(endpoint: u8, mode: EndpointMode, ty: TransferType, size: u32) {
        let usb = regs();
        let phys = physical(endpoint, mode);

        let size = size.min(u32::from(MAX_ENDPOINT_SIZE.size(endpoint, ty)));

        unsafe {
            // realize the endpoint and set its packet size
            usb.reep.modify(|reep| reep | (0x1 << phys));
            usb.epind.write(phys);
            usb.maxpsize.write(size);
        }

        while usb.devintst.read() & DEVINT_EP_RLZED == 0 {}

        unsafe {
            usb.devintclr.write(DEVINT_EP_RLZED);
        }

        state()[endpoint as usize].max_size = size as u16;

        // enable the endpoint
        write_command_data(CMD_SET_EP_STATUS | phys as u8, 0);
    }

    fn configured(configured: bool) {
        write_command_data(CMD_CONFIGURE, configured as u8);

        let usb = regs();

        unsafe {
            if configured {
                // keep other realized endpoints, EP0 stays realized
                usb.reep.modify(|reep| reep | 0x3);
            } else {
                usb.reep.write(0x3);
            }
        }

        while usb.devintst.read() & DEVINT_EP_RLZED == 0 {}

        unsafe {
            usb.devintclr.write(DEVINT_EP_RLZED);
        }
    }

    fn set_device_address(address: u8) -> Handshake {
        // the new address must only answer after the status stage of this
        // transfer; buffer it until that IN completion
        unsafe {
            *DEVICE_ADDRESS.get() = address;
        }

        Handshake::Ack
    }

    fn connect() {
        write_command_data(CMD_SET_STATUS, DEV_STATUS_CONNECT as u8);
    }

    fn disconnect() {
        write_command_data(CMD_SET_STATUS, 0);
    }
}
