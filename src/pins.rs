//! Common pin infrastructure
//!
//! Every chip family exposes its package's physical pins as zero-sized types
//! named `p1`, `p2`, … in a package module (for example
//! [`lpc17xx::pins::lqfp80`], when that package is selected). This module
//! defines the trait all those pin types implement, plus the macro the
//! family modules use to generate them.
//!
//! Pins are value types and are never instantiated by user code; ownership
//! is handed out once through each family's `Peripherals` struct.
//!
//! [`lpc17xx::pins::lqfp80`]: ../lpc17xx/pins/index.html

/// Implemented by types that identify pins
///
/// This trait is an internal implementation detail and should neither be
/// implemented nor used outside of cmx-hal. Any changes to this trait won't
/// be considered breaking changes.
pub trait PinTrait {
    /// The number that identifies the pin's port
    const PORT: usize;

    /// The bit index of the pin within its port
    const BIT: u8;

    /// The pin's bit mask within its port registers
    const MASK: u32;
}

macro_rules! package_pins {
    (
        $(
            $(#[$attr:meta])*
            $type:ident, $field:ident, $port:expr, $bit:expr;
        )*
    ) => {
        $(
            $(#[$attr])*
            ///
            /// Physical package pin. See the package module documentation for
            /// the pad it connects to.
            #[allow(non_camel_case_types)]
            pub struct $type(pub(crate) ());

            impl $crate::pins::PinTrait for $type {
                const PORT: usize = $port;
                const BIT: u8 = $bit;
                const MASK: u32 = 0x1 << $bit;
            }
        )*

        /// Provides access to all pins of the package
        ///
        /// One instance of this struct is available through the family's
        /// `Peripherals` struct.
        #[allow(missing_docs)]
        pub struct Pins {
            $(pub $field: $type,)*
        }

        impl Pins {
            pub(crate) fn new() -> Self {
                Pins {
                    $($field: $type(()),)*
                }
            }
        }

        #[cfg(test)]
        mod pin_map_tests {
            use $crate::pins::PinTrait;

            /// No two package pins may decode to the same (port, bit) pair.
            #[test]
            fn pin_map_is_unique() {
                let pins: &[(&str, usize, u8)] = &[
                    $((stringify!($type), super::$type::PORT, super::$type::BIT),)*
                ];

                for (i, a) in pins.iter().enumerate() {
                    for b in &pins[i + 1..] {
                        assert!(
                            (a.1, a.2) != (b.1, b.2),
                            "{} and {} both map to ({}, {})",
                            a.0, b.0, a.1, a.2,
                        );
                    }
                }
            }

            /// Every pin's mask must match its bit index.
            #[test]
            fn pin_masks_match_bits() {
                $(
                    assert_eq!(super::$type::MASK, 1u32 << super::$type::BIT);
                    assert!(super::$type::BIT < 32);
                )*
            }
        }
    };
}
