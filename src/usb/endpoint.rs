//! Per-endpoint transfer bookkeeping
//!
//! Every controller driver keeps one [`State`] record per logical endpoint.
//! The record is created zeroed at driver init, mutated only by driver code,
//! and torn down on reset, cancel and stall.

use super::TransferCallback;

/// The transfer state of one logical endpoint
pub struct State {
    /// Whether a transfer is armed on this endpoint
    pub is_busy: bool,

    /// Whether an OUT interrupt was latched while no transfer was armed
    ///
    /// Replayed when the next read arms the endpoint; cleared when a setup
    /// packet arrives, so a stale OUT that preceded the setup is discarded.
    pub interrupt_pending: bool,

    /// The maximum packet size of the endpoint
    pub max_size: u16,

    /// Pointer to the transfer buffer
    pub data: *mut u8,

    /// Requested byte count; for reads, the count that completes the read
    pub requested_size: u32,

    /// Maximum acceptable byte count (reads only)
    pub max_requested_size: u32,

    /// Bytes moved so far
    pub transferred_size: u32,

    /// Whether a zero length packet still has to terminate the transfer
    ///
    /// Armed together with an IN transfer whose [`needs_zlp`] conditions
    /// hold; cleared once the ZLP went out.
    ///
    /// [`needs_zlp`]: fn.needs_zlp.html
    pub zlp_pending: bool,

    /// Continuation invoked when the transfer finishes
    pub callback: Option<TransferCallback>,
}

/// Whether an IN transfer of `requested` bytes needs a zero length packet
///
/// True when the total is a non-zero multiple of the packet size: the final
/// packet is then exactly `max_size` bytes and the host cannot tell the
/// transfer ended without an explicit ZLP.
pub fn needs_zlp(requested: u32, max_size: u16) -> bool {
    max_size != 0 && requested != 0 && requested % u32::from(max_size) == 0
}

// The raw buffer pointer is only dereferenced by the driver owning the
// state, on a single core.
unsafe impl Send for State {}
unsafe impl Sync for State {}

impl State {
    pub const INIT: State = State::new();

    pub const fn new() -> Self {
        State {
            is_busy: false,
            interrupt_pending: false,
            max_size: 0,
            data: core::ptr::null_mut(),
            requested_size: 0,
            max_requested_size: 0,
            transferred_size: 0,
            zlp_pending: false,
            callback: None,
        }
    }

    /// Tear the endpoint down to idle, returning what is needed to finish
    /// the old transfer
    ///
    /// Returns the armed callback and the bytes transferred so far. The
    /// state is cleared before the caller invokes the callback, since the
    /// callback may arm the endpoint again.
    pub fn take(&mut self) -> (Option<TransferCallback>, u32) {
        let callback = self.callback;
        let transferred = self.transferred_size;

        self.is_busy = false;
        self.requested_size = 0;
        self.max_requested_size = 0;
        self.transferred_size = 0;
        self.zlp_pending = false;
        self.callback = None;
        self.data = core::ptr::null_mut();

        (callback, transferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears_state_and_returns_progress() {
        let mut state = State::new();
        state.is_busy = true;
        state.requested_size = 128;
        state.transferred_size = 64;
        state.callback = Some(|_, _, _, _| {});

        let (callback, transferred) = state.take();

        assert!(callback.is_some());
        assert_eq!(transferred, 64);
        assert!(!state.is_busy);
        assert_eq!(state.requested_size, 0);
        assert_eq!(state.transferred_size, 0);
        assert!(state.callback.is_none());
    }

    #[test]
    fn zlp_exactly_when_total_is_a_multiple_of_the_packet_size() {
        // 128 bytes in 64 byte packets: final packet full sized
        assert!(needs_zlp(128, 64));
        assert!(needs_zlp(64, 64));

        // a short final packet terminates the transfer by itself
        assert!(!needs_zlp(100, 64));
        assert!(!needs_zlp(3, 64));

        // zero length writes are a single ZLP already
        assert!(!needs_zlp(0, 64));

        // unconfigured endpoint
        assert!(!needs_zlp(128, 0));
    }
}
