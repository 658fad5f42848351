//! APIs for the switch matrix (SWM)
//!
//! The switch matrix connects movable peripheral functions to pins: the
//! assignment is a pin number written into a byte-wide field of one of the
//! PINASSIGN registers. Fixed functions (analog inputs, SWD) sit on
//! dedicated pins and are switched through PINENABLE0.
//!
//! A movable function is a value of type [`Function`], whose type state
//! tracks whether — and to which pin — it is assigned:
//!
//! ``` no_run
//! # use cmx_hal::lpc802::Peripherals;
//! #
//! # let mut p = Peripherals::take().unwrap();
//! #
//! // the matrix clock has to run while assignments change
//! let mut handle = p.swm.handle.enable(&mut p.syscon);
//!
//! // consumes the pin; the function owns it until it is unassigned
//! let u0_txd = p.swm.movable_functions.u0_txd.assign(p.pins.p8, &mut handle);
//!
//! // gate the matrix clock again, assignments stay in place
//! let handle = handle.disable(&mut p.syscon);
//! ```
//!
//! Assigning a function to a pin the hardware cannot route it to fails to
//! compile. Since a function consumes its pin, two simultaneously active
//! functions can never share one.
//!
//! See the user manual, chapter 10.

use core::marker::PhantomData;

use crate::init_state::{Disabled, Enabled};
use crate::pac::lpc802 as pac;
use crate::pins::PinTrait;

use super::syscon::Syscon;

/// Whether a movable function can be routed to a pin
///
/// Which pins a PINASSIGN field accepts depends on the field; the ranges
/// follow the register description in the user manual.
const fn routable(index: u32, bit: u8) -> bool {
    let bit = bit as u32;

    match index / 4 {
        0 | 1 => bit <= 5 || (bit >= 7 && bit <= 17),
        2 | 3 | 4 | 5 => bit == 5 || (bit >= 7 && bit <= 17),
        6 => {
            if index % 4 == 0 {
                bit == 5 || (bit >= 7 && bit <= 17)
            } else {
                bit <= 5 || (bit >= 7 && bit <= 30)
            }
        }
        _ => bit <= 5 || (bit >= 7 && bit <= 30),
    }
}

/// Implemented by pins a function can be assigned to
///
/// Blanket-implemented for every pin; the legality of the combination is
/// checked when an assignment is monomorphized, so an illegal combination
/// fails to compile.
pub trait AssignablePin<T: FunctionTrait>: PinTrait {
    #[doc(hidden)]
    const LEGAL: () = assert!(
        routable(T::INDEX, Self::BIT),
        "the switch matrix cannot route this function to this pin",
    );
}

impl<T: FunctionTrait, P: PinTrait> AssignablePin<T> for P {}

/// Interface to the switch matrix
///
/// The type parameter tracks whether the matrix clock is running;
/// assignments require an enabled handle.
pub struct Handle<State = Enabled> {
    swm: pac::SWM,
    _state: PhantomData<State>,
}

impl Handle<Disabled> {
    /// Enable the switch matrix clock
    pub fn enable(self, syscon: &mut Syscon) -> Handle<Enabled> {
        syscon.enable_clock(&self.swm);

        Handle {
            swm: self.swm,
            _state: PhantomData,
        }
    }
}

impl Handle<Enabled> {
    /// Gate the switch matrix clock again
    ///
    /// Assignments stay in place; they just can't be changed until the
    /// clock is re-enabled.
    pub fn disable(self, syscon: &mut Syscon) -> Handle<Disabled> {
        syscon.disable_clock(&self.swm);

        Handle {
            swm: self.swm,
            _state: PhantomData,
        }
    }

    fn assign(&mut self, index: u32, bit: u8) {
        let register = (index / 4) as usize;
        let shift = (index % 4) * 8;

        unsafe {
            self.swm.pinassign[register]
                .modify(|value| (value & !(0xff << shift)) | (u32::from(bit) << shift));
        }
    }

    fn unassign(&mut self, index: u32) {
        let register = (index / 4) as usize;
        let shift = (index % 4) * 8;

        unsafe {
            self.swm.pinassign[register].modify(|value| value | (0xff << shift));
        }
    }

    fn enable_fixed(&mut self, bit: u8, enabled: bool) {
        unsafe {
            self.swm.pinenable0.modify(|value| {
                // a cleared bit enables the fixed function on its pin
                if enabled {
                    value & !(0x1 << bit)
                } else {
                    value | (0x1 << bit)
                }
            });
        }
    }
}

/// A movable function that can be assigned to a pin
///
/// The type parameter `T` identifies the function, `S` tracks whether it is
/// assigned and to which pin.
pub struct Function<T, S> {
    ty: T,
    state: S,
}

/// Indicates that a function is not assigned to any pin
pub struct Unassigned;

/// Indicates that a function is assigned to the pin it holds
pub struct Assigned<P>(P);

impl<T: FunctionTrait> Function<T, Unassigned> {
    /// Assign this function to a pin
    ///
    /// Consumes the pin; the returned `Function` holds it until
    /// [`unassign`] gives it back, so no other function can bind the same
    /// pin in the meantime. A pin the matrix cannot route this function to
    /// is rejected at compile time.
    ///
    /// [`unassign`]: #method.unassign
    pub fn assign<P>(self, pin: P, swm: &mut Handle<Enabled>) -> Function<T, Assigned<P>>
    where
        P: AssignablePin<T>,
    {
        let () = P::LEGAL;

        swm.assign(T::INDEX, P::BIT);

        Function {
            ty: self.ty,
            state: Assigned(pin),
        }
    }
}

impl<T: FunctionTrait, P: PinTrait> Function<T, Assigned<P>> {
    /// Unassign this function, releasing its pin
    pub fn unassign(self, swm: &mut Handle<Enabled>) -> (Function<T, Unassigned>, P) {
        swm.unassign(T::INDEX);

        (
            Function {
                ty: self.ty,
                state: Unassigned,
            },
            self.state.0,
        )
    }
}

/// Implemented for all movable functions
///
/// This trait is an internal implementation detail and should neither be
/// implemented nor used outside of cmx-hal.
pub trait FunctionTrait {
    /// The function's index in the PINASSIGN register file
    const INDEX: u32;
}

macro_rules! movable_functions {
    (
        $(
            $(#[$attr:meta])*
            $field:ident, $type:ident, $index:expr;
        )*
    ) => {
        /// Provides access to all movable functions
        ///
        /// This struct is part of [`swm::Parts`].
        ///
        /// [`swm::Parts`]: struct.Parts.html
        #[allow(missing_docs)]
        pub struct MovableFunctions {
            $(pub $field: Function<$type, Unassigned>,)*
        }

        impl MovableFunctions {
            fn new() -> Self {
                MovableFunctions {
                    $(
                        $field: Function {
                            ty: $type(()),
                            state: Unassigned,
                        },
                    )*
                }
            }
        }

        $(
            $(#[$attr])*
            ///
            /// Movable function; see [`MovableFunctions`].
            ///
            /// [`MovableFunctions`]: struct.MovableFunctions.html
            #[allow(non_camel_case_types)]
            pub struct $type(());

            impl FunctionTrait for $type {
                const INDEX: u32 = $index;
            }
        )*
    };
}

movable_functions!(
    /// UART0 transmit data
    u0_txd, U0_TXD, 0;
    /// UART0 receive data
    u0_rxd, U0_RXD, 1;
    /// UART0 request to send
    u0_rts, U0_RTS, 2;
    /// UART0 clear to send
    u0_cts, U0_CTS, 3;
    /// UART0 serial clock
    u0_sclk, U0_SCLK, 4;
    /// UART1 transmit data
    u1_txd, U1_TXD, 5;
    /// UART1 receive data
    u1_rxd, U1_RXD, 6;
    /// UART1 serial clock
    u1_sclk, U1_SCLK, 7;
    /// SPI0 serial clock
    spi0_sck, SPI0_SCK, 8;
    /// SPI0 master out, slave in
    spi0_mosi, SPI0_MOSI, 9;
    /// SPI0 master in, slave out
    spi0_miso, SPI0_MISO, 10;
    /// SPI0 slave select 0
    spi0_ssel0, SPI0_SSEL0, 11;
    /// SPI0 slave select 1
    spi0_ssel1, SPI0_SSEL1, 12;
    /// Timer capture input 0
    t0_cap0, T0_CAP0, 13;
    /// Timer capture input 1
    t0_cap1, T0_CAP1, 14;
    /// Timer capture input 2
    t0_cap2, T0_CAP2, 15;
    /// Timer match output 0
    t0_mat0, T0_MAT0, 16;
    /// Timer match output 1
    t0_mat1, T0_MAT1, 17;
    /// Timer match output 2
    t0_mat2, T0_MAT2, 18;
    /// Timer match output 3
    t0_mat3, T0_MAT3, 19;
    /// I2C0 data
    i2c0_sda, I2C0_SDA, 20;
    /// I2C0 clock
    i2c0_scl, I2C0_SCL, 21;
    /// Analog comparator output
    acmp_o, ACMP_O, 22;
    /// Clock output
    clkout, CLKOUT, 23;
    /// GPIO interrupt boolean pattern match
    gpio_int_bmat, GPIO_INT_BMAT, 24;
);

/// A fixed function on its dedicated pin
///
/// Enabling a fixed function disconnects the pin from the GPIO controller
/// and the movable functions.
pub struct FixedFunction<T> {
    _ty: PhantomData<T>,
}

impl<T: FixedFunctionTrait> FixedFunction<T> {
    /// Enable the fixed function on its pin
    pub fn enable(&mut self, swm: &mut Handle<Enabled>) {
        swm.enable_fixed(T::BIT, true);
    }

    /// Disable the fixed function, releasing its pin
    pub fn disable(&mut self, swm: &mut Handle<Enabled>) {
        swm.enable_fixed(T::BIT, false);
    }
}

/// Implemented for all fixed functions
pub trait FixedFunctionTrait {
    /// The function's bit in PINENABLE0
    const BIT: u8;
}

macro_rules! fixed_functions {
    ($($field:ident, $type:ident, $bit:expr;)*) => {
        /// Provides access to all fixed functions
        #[allow(missing_docs)]
        pub struct FixedFunctions {
            $(pub $field: FixedFunction<$type>,)*
        }

        impl FixedFunctions {
            fn new() -> Self {
                FixedFunctions {
                    $(
                        $field: FixedFunction {
                            _ty: PhantomData,
                        },
                    )*
                }
            }
        }

        $(
            /// Identifies a fixed function; see [`FixedFunctions`]
            ///
            /// [`FixedFunctions`]: struct.FixedFunctions.html
            #[allow(non_camel_case_types)]
            pub struct $type(());

            impl FixedFunctionTrait for $type {
                const BIT: u8 = $bit;
            }
        )*
    };
}

fixed_functions!(
    acmp_i1, ACMP_I1, 0;
    acmp_i2, ACMP_I2, 1;
    acmp_i3, ACMP_I3, 2;
    acmp_i4, ACMP_I4, 3;
    swclk, SWCLK, 4;
    swdio, SWDIO, 5;
    resetn, RESETN, 6;
    clkin, CLKIN, 7;
    wkclkin, WKCLKIN, 8;
    vddcmp, VDDCMP, 9;
    adc_0, ADC_0, 10;
    adc_1, ADC_1, 11;
    adc_2, ADC_2, 12;
    adc_3, ADC_3, 13;
    adc_4, ADC_4, 14;
    adc_5, ADC_5, 15;
    adc_6, ADC_6, 16;
    adc_7, ADC_7, 17;
    adc_8, ADC_8, 18;
    adc_9, ADC_9, 19;
    adc_10, ADC_10, 20;
    adc_11, ADC_11, 21;
);

/// The main API for the switch matrix
///
/// Available through the family's `Peripherals` struct.
pub struct Parts {
    /// The handle to the switch matrix
    pub handle: Handle<Disabled>,

    /// The movable functions
    pub movable_functions: MovableFunctions,

    /// The fixed functions
    pub fixed_functions: FixedFunctions,
}

impl Parts {
    pub(crate) fn new(swm: pac::SWM) -> Self {
        Parts {
            handle: Handle {
                swm,
                _state: PhantomData,
            },
            movable_functions: MovableFunctions::new(),
            fixed_functions: FixedFunctions::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routability_follows_the_register_ranges() {
        // PINASSIGN0/1 accept every pin except the reset and SWD pins
        assert!(routable(0, 0));
        assert!(routable(1, 17));
        assert!(!routable(0, 6));

        // the middle registers only accept P0.5 and P0.7..P0.17
        assert!(routable(8, 5));
        assert!(routable(8, 7));
        assert!(!routable(8, 0));

        // the last registers open up again
        assert!(routable(28, 0));
        assert!(!routable(28, 6));
    }

    #[test]
    fn assignment_field_positions() {
        // (flex index) -> (register, shift)
        let cases = [(0u32, (0usize, 0u32)), (1, (0, 8)), (9, (2, 8)), (23, (5, 24))];

        for (index, (register, shift)) in cases {
            assert_eq!((index / 4) as usize, register);
            assert_eq!((index % 4) * 8, shift);
        }
    }
}
