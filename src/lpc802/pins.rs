//! Pin and package definitions for the LPC802
//!
//! Each package module enumerates the physical pins of the package as
//! zero-sized types named after the package pin number, mapped onto their
//! bit in PIO0. Supply and reference pins carry no I/O function and are
//! not enumerated, so the pin numbers have gaps.

/// The TSSOP16 package of the LPC802M001JDH16
#[cfg(feature = "tssop16")]
pub mod tssop16 {
    package_pins!(
        /// P0.17
        P1, p1, 0, 17;
        /// P0.13
        P2, p2, 0, 13;
        /// P0.12
        P3, p3, 0, 12;
        /// P0.5
        P4, p4, 0, 5;
        /// P0.4
        P5, p5, 0, 4;
        /// P0.3
        P6, p6, 0, 3;
        /// P0.2
        P7, p7, 0, 2;
        /// P0.11
        P8, p8, 0, 11;
        /// P0.1
        P9, p9, 0, 1;
        /// P0.9
        P10, p10, 0, 9;
        /// P0.8
        P11, p11, 0, 8;
        /// P0.7
        P14, p14, 0, 7;
        /// P0.0
        P16, p16, 0, 0;
    );
}

/// The TSSOP20 package of the LPC802M001JDH20
#[cfg(feature = "tssop20")]
pub mod tssop20 {
    package_pins!(
        /// P0.16
        P1, p1, 0, 16;
        /// P0.17
        P2, p2, 0, 17;
        /// P0.13
        P3, p3, 0, 13;
        /// P0.12
        P4, p4, 0, 12;
        /// P0.5
        P5, p5, 0, 5;
        /// P0.4
        P6, p6, 0, 4;
        /// P0.3
        P7, p7, 0, 3;
        /// P0.2
        P8, p8, 0, 2;
        /// P0.11
        P9, p9, 0, 11;
        /// P0.10
        P10, p10, 0, 10;
        /// P0.15
        P11, p11, 0, 15;
        /// P0.1
        P12, p12, 0, 1;
        /// P0.9
        P13, p13, 0, 9;
        /// P0.8
        P14, p14, 0, 8;
        /// P0.7
        P17, p17, 0, 7;
        /// P0.0
        P19, p19, 0, 0;
        /// P0.14
        P20, p20, 0, 14;
    );
}
