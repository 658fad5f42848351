//! Cell type for driver state that is shared with interrupt handlers
//!
//! Every driver in this crate stores its mutable state in statics, since
//! transfer completion runs in interrupt context and continuations are plain
//! function pointers. `IsrState` wraps such a static.

use core::cell::UnsafeCell;

/// Driver state shared between thread mode and one interrupt handler
///
/// This is a thin wrapper around [`UnsafeCell`] that is `Sync`, so it can be
/// used in a static.
pub struct IsrState<T> {
    inner: UnsafeCell<T>,
}

impl<T> IsrState<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: UnsafeCell::new(value),
        }
    }

    /// Get a mutable reference to the stored state
    ///
    /// # Safety
    ///
    /// The execution model is single-core with one interrupt source per
    /// driver. The caller must not let two references to the same state
    /// exist at the same time; in practice this means the reference must not
    /// be held across a point where the owning interrupt can preempt the
    /// current context.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get(&self) -> &mut T {
        &mut *self.inner.get()
    }
}

// Shared only between thread mode and interrupt handlers on the same core.
unsafe impl<T> Sync for IsrState<T> {}
