//! Register bindings for the supported chip families
//!
//! None of the families covered by this crate have maintained
//! svd2rust-generated peripheral access crates, so the bindings live here:
//! hand-written `#[repr(C)]` register blocks built on
//! [`volatile_register`], the way the `cortex-m` crate defines its own
//! peripherals. Only the registers the drivers use are named; gaps are
//! explicit reserved fields.
//!
//! Each family module provides zero-sized peripheral singletons with
//! `ptr()`/`Deref`, a `Peripherals::take()` entry point and an `Interrupt`
//! enum for the NVIC. The layout of each block follows the vendor's user
//! manual for the part.

macro_rules! peripheral {
    (
        $(#[$attr:meta])*
        $name:ident, $block:ty, $addr:expr;
    ) => {
        $(#[$attr])*
        #[allow(clippy::upper_case_acronyms)]
        pub struct $name {
            _marker: core::marker::PhantomData<*const ()>,
        }

        // Owning the singleton is what makes register access safe; the
        // marker only removes auto-Send/Sync of the raw pointer.
        unsafe impl Send for $name {}

        impl $name {
            /// The address of this peripheral's register block
            pub const PTR: *const $block = $addr as *const _;

            /// Returns a pointer to this peripheral's register block
            #[inline]
            pub const fn ptr() -> *const $block {
                Self::PTR
            }

            pub(crate) const fn new() -> Self {
                $name {
                    _marker: core::marker::PhantomData,
                }
            }
        }

        impl core::ops::Deref for $name {
            type Target = $block;

            #[inline]
            fn deref(&self) -> &Self::Target {
                unsafe { &*Self::PTR }
            }
        }
    };
}

macro_rules! take_api {
    () => {
        impl Peripherals {
            /// Returns all the peripherals, once
            ///
            /// The first call returns `Some`; every later call returns
            /// `None`, so at most one instance of each peripheral singleton
            /// can exist.
            pub fn take() -> Option<Self> {
                cortex_m::interrupt::free(|_| {
                    if unsafe { TAKEN } {
                        None
                    } else {
                        unsafe {
                            TAKEN = true;
                            Some(Peripherals::steal())
                        }
                    }
                })
            }
        }

        static mut TAKEN: bool = false;
    };
}

#[cfg(feature = "17xx")]
pub mod lpc17xx;

#[cfg(feature = "802")]
pub mod lpc802;

#[cfg(feature = "atsam4s")]
pub mod atsam4s;

#[cfg(feature = "max32625")]
pub mod max32625;

#[cfg(feature = "mb9bf560l")]
pub mod mb9bf560l;
