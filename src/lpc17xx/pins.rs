//! Pin and package definitions for the LPC17xx family
//!
//! Each package module enumerates the physical pins of the package as
//! zero-sized types named after the package pin number (`p1`, `p2`, ...),
//! mapped onto their GPIO port and bit. Supply, crystal, reset and JTAG
//! pins carry no I/O function and are not enumerated, so the pin numbers
//! have gaps.
//!
//! The active package is selected through the target feature; the selected
//! package's `Pins` struct is handed out by [`Peripherals`].
//!
//! [`Peripherals`]: ../struct.Peripherals.html

/// The LQFP80 package of the LPC1756
#[cfg(feature = "lqfp80")]
pub mod lqfp80 {
    package_pins!(
        /// P0.26
        P6, p6, 0, 26;
        /// P0.25
        P7, p7, 0, 25;
        /// P1.31
        P15, p15, 1, 31;
        /// P1.29
        P16, p16, 1, 29;
        /// P1.28
        P17, p17, 1, 28;
        /// P1.30
        P18, p18, 1, 30;
        /// P0.28
        P21, p21, 0, 28;
        /// P0.29
        P22, p22, 0, 29;
        /// P0.30
        P23, p23, 0, 30;
        /// P1.19
        P24, p24, 1, 19;
        /// P1.18
        P25, p25, 1, 18;
        /// P1.22
        P26, p26, 1, 22;
        /// P1.20
        P27, p27, 1, 20;
        /// P1.23
        P28, p28, 1, 23;
        /// P1.24
        P29, p29, 1, 24;
        /// P1.25
        P30, p30, 1, 25;
        /// P1.26
        P31, p31, 1, 26;
        /// P0.23
        P34, p34, 0, 23;
        /// P4.28
        P35, p35, 4, 28;
        /// P4.29
        P36, p36, 4, 29;
        /// P2.13
        P37, p37, 2, 13;
        /// P2.12
        P38, p38, 2, 12;
        /// P2.11
        P39, p39, 2, 11;
        /// P2.10
        P40, p40, 2, 10;
        /// P2.8
        P41, p41, 2, 8;
        /// P2.7
        P42, p42, 2, 7;
        /// P2.6
        P43, p43, 2, 6;
        /// P2.5
        P44, p44, 2, 5;
        /// P2.4
        P45, p45, 2, 4;
        /// P2.3
        P46, p46, 2, 3;
        /// P2.2
        P47, p47, 2, 2;
        /// P2.1
        P48, p48, 2, 1;
        /// P2.9
        P49, p49, 2, 9;
        /// P2.0
        P50, p50, 2, 0;
        /// P0.22
        P51, p51, 0, 22;
        /// P0.21
        P52, p52, 0, 21;
        /// P0.20
        P53, p53, 0, 20;
        /// P0.19
        P54, p54, 0, 19;
        /// P0.18
        P55, p55, 0, 18;
        /// P0.17
        P56, p56, 0, 17;
        /// P0.16
        P57, p57, 0, 16;
        /// P0.15
        P58, p58, 0, 15;
        /// P3.26
        P61, p61, 3, 26;
        /// P3.25
        P62, p62, 3, 25;
        /// P0.11
        P63, p63, 0, 11;
        /// P0.10
        P64, p64, 0, 10;
        /// P0.9
        P65, p65, 0, 9;
        /// P0.8
        P66, p66, 0, 8;
        /// P0.7
        P67, p67, 0, 7;
        /// P0.6
        P68, p68, 0, 6;
        /// P0.5
        P69, p69, 0, 5;
        /// P0.4
        P70, p70, 0, 4;
        /// P0.27
        P73, p73, 0, 27;
        /// P0.3
        P74, p74, 0, 3;
        /// P0.2
        P75, p75, 0, 2;
        /// P0.1
        P76, p76, 0, 1;
        /// P0.0
        P77, p77, 0, 0;
        /// P1.21
        P78, p78, 1, 21;
        /// P1.27
        P79, p79, 1, 27;
    );
}

/// The LQFP208 package of the LPC1788
#[cfg(feature = "lqfp208")]
pub mod lqfp208 {
    package_pins!(
        /// P3.12
        P1, p1, 3, 12;
        /// P3.3
        P3, p3, 3, 3;
        /// P3.28
        P5, p5, 3, 28;
        /// P3.13
        P7, p7, 3, 13;
        /// P5.0
        P9, p9, 5, 0;
        /// P3.29
        P11, p11, 3, 29;
        /// P0.26
        P12, p12, 0, 26;
        /// P3.4
        P13, p13, 3, 4;
        /// P0.25
        P14, p14, 0, 25;
        /// P0.24
        P16, p16, 0, 24;
        /// P3.5
        P17, p17, 3, 5;
        /// P0.23
        P18, p18, 0, 23;
        /// P3.30
        P19, p19, 3, 30;
        /// P3.14
        P21, p21, 3, 14;
        /// P3.6
        P23, p23, 3, 6;
        /// P3.31
        P25, p25, 3, 31;
        /// P3.7
        P27, p27, 3, 7;
        /// P3.15
        P28, p28, 3, 15;
        /// P5.1
        P30, p30, 5, 1;
        /// P2.30
        P31, p31, 2, 30;
        /// P2.31
        P39, p39, 2, 31;
        /// P1.31
        P40, p40, 1, 31;
        /// P0.12
        P41, p41, 0, 12;
        /// P1.30
        P42, p42, 1, 30;
        /// P2.29
        P43, p43, 2, 29;
        /// P0.13
        P45, p45, 0, 13;
        /// P2.27
        P47, p47, 2, 27;
        /// P0.28
        P48, p48, 0, 28;
        /// P2.28
        P49, p49, 2, 28;
        /// P0.27
        P50, p50, 0, 27;
        /// P0.31
        P51, p51, 0, 31;
        /// P2.24
        P53, p53, 2, 24;
        /// P2.25
        P54, p54, 2, 25;
        /// P3.26
        P55, p55, 3, 26;
        /// P3.25
        P56, p56, 3, 25;
        /// P2.26
        P57, p57, 2, 26;
        /// P3.24
        P58, p58, 3, 24;
        /// P2.18
        P59, p59, 2, 18;
        /// P0.29
        P61, p61, 0, 29;
        /// P0.30
        P62, p62, 0, 30;
        /// P2.23
        P64, p64, 2, 23;
        /// P3.23
        P65, p65, 3, 23;
        /// P1.18
        P66, p66, 1, 18;
        /// P2.19
        P67, p67, 2, 19;
        /// P1.19
        P68, p68, 1, 19;
        /// P0.14
        P69, p69, 0, 14;
        /// P1.20
        P70, p70, 1, 20;
        /// P1.21
        P72, p72, 1, 21;
        /// P2.20
        P73, p73, 2, 20;
        /// P1.22
        P74, p74, 1, 22;
        /// P4.0
        P75, p75, 4, 0;
        /// P1.23
        P76, p76, 1, 23;
        /// P1.24
        P78, p78, 1, 24;
        /// P4.1
        P79, p79, 4, 1;
        /// P1.25
        P80, p80, 1, 25;
        /// P2.21
        P81, p81, 2, 21;
        /// P1.26
        P82, p82, 1, 26;
        /// P4.2
        P83, p83, 4, 2;
        /// P2.22
        P85, p85, 2, 22;
        /// P2.16
        P87, p87, 2, 16;
        /// P1.27
        P88, p88, 1, 27;
        /// P1.28
        P90, p90, 1, 28;
        /// P2.14
        P91, p91, 2, 14;
        /// P1.29
        P92, p92, 1, 29;
        /// P0.0
        P94, p94, 0, 0;
        /// P2.17
        P95, p95, 2, 17;
        /// P0.1
        P96, p96, 0, 1;
        /// P4.3
        P97, p97, 4, 3;
        /// P0.10
        P98, p98, 0, 10;
        /// P2.15
        P99, p99, 2, 15;
        /// P0.11
        P100, p100, 0, 11;
        /// P4.16
        P101, p101, 4, 16;
        /// P2.13
        P102, p102, 2, 13;
        /// P4.4
        P103, p103, 4, 4;
        /// P4.17
        P104, p104, 4, 17;
        /// P4.18
        P105, p105, 4, 18;
        /// P2.12
        P106, p106, 2, 12;
        /// P4.5
        P107, p107, 4, 5;
        /// P2.11
        P108, p108, 2, 11;
        /// P4.20
        P109, p109, 4, 20;
        /// P2.10
        P110, p110, 2, 10;
        /// P4.19
        P111, p111, 4, 19;
        /// P4.6
        P113, p113, 4, 6;
        /// P4.21
        P115, p115, 4, 21;
        /// P0.22
        P116, p116, 0, 22;
        /// P5.2
        P117, p117, 5, 2;
        /// P0.21
        P118, p118, 0, 21;
        /// P4.26
        P119, p119, 4, 26;
        /// P0.20
        P120, p120, 0, 20;
        /// P4.7
        P121, p121, 4, 7;
        /// P0.19
        P122, p122, 0, 19;
        /// P4.22
        P123, p123, 4, 22;
        /// P0.18
        P124, p124, 0, 18;
        /// P0.17
        P126, p126, 0, 17;
        /// P4.8
        P127, p127, 4, 8;
        /// P0.15
        P128, p128, 0, 15;
        /// P4.23
        P129, p129, 4, 23;
        /// P0.16
        P130, p130, 0, 16;
        /// P4.9
        P131, p131, 4, 9;
        /// P2.9
        P132, p132, 2, 9;
        /// P2.8
        P134, p134, 2, 8;
        /// P4.10
        P135, p135, 4, 10;
        /// P2.7
        P136, p136, 2, 7;
        /// P3.16
        P137, p137, 3, 16;
        /// P2.6
        P138, p138, 2, 6;
        /// P4.27
        P139, p139, 4, 27;
        /// P2.5
        P140, p140, 2, 5;
        /// P5.3
        P141, p141, 5, 3;
        /// P2.4
        P142, p142, 2, 4;
        /// P3.17
        P143, p143, 3, 17;
        /// P2.3
        P144, p144, 2, 3;
        /// P4.11
        P145, p145, 4, 11;
        /// P1.13
        P147, p147, 1, 13;
        /// P4.12
        P149, p149, 4, 12;
        /// P2.2
        P150, p150, 2, 2;
        /// P3.18
        P151, p151, 3, 18;
        /// P2.1
        P152, p152, 2, 1;
        /// P1.7
        P153, p153, 1, 7;
        /// P2.0
        P154, p154, 2, 0;
        /// P4.13
        P155, p155, 4, 13;
        /// P1.5
        P156, p156, 1, 5;
        /// P1.12
        P157, p157, 1, 12;
        /// P0.9
        P158, p158, 0, 9;
        /// P4.14
        P159, p159, 4, 14;
        /// P0.8
        P160, p160, 0, 8;
        /// P3.19
        P161, p161, 3, 19;
        /// P0.7
        P162, p162, 0, 7;
        /// P1.11
        P163, p163, 1, 11;
        /// P0.6
        P164, p164, 0, 6;
        /// P0.5
        P166, p166, 0, 5;
        /// P3.20
        P167, p167, 3, 20;
        /// P0.4
        P168, p168, 0, 4;
        /// P4.28
        P170, p170, 4, 28;
        /// P1.6
        P171, p171, 1, 6;
        /// P4.15
        P173, p173, 4, 15;
        /// P3.21
        P175, p175, 3, 21;
        /// P4.29
        P176, p176, 4, 29;
        /// P1.3
        P177, p177, 1, 3;
        /// P1.17
        P178, p178, 1, 17;
        /// P4.25
        P179, p179, 4, 25;
        /// P1.16
        P180, p180, 1, 16;
        /// P1.15
        P182, p182, 1, 15;
        /// P4.24
        P183, p183, 4, 24;
        /// P1.14
        P184, p184, 1, 14;
        /// P1.2
        P185, p185, 1, 2;
        /// P1.10
        P186, p186, 1, 10;
        /// P4.30
        P187, p187, 4, 30;
        /// P1.9
        P188, p188, 1, 9;
        /// P1.8
        P190, p190, 1, 8;
        /// P3.8
        P191, p191, 3, 8;
        /// P1.4
        P192, p192, 1, 4;
        /// P4.31
        P193, p193, 4, 31;
        /// P1.1
        P194, p194, 1, 1;
        /// P3.22
        P195, p195, 3, 22;
        /// P1.0
        P196, p196, 1, 0;
        /// P3.0
        P197, p197, 3, 0;
        /// P3.9
        P199, p199, 3, 9;
        /// P3.1
        P201, p201, 3, 1;
        /// P0.2
        P202, p202, 0, 2;
        /// P3.27
        P203, p203, 3, 27;
        /// P0.3
        P204, p204, 0, 3;
        /// P3.10
        P205, p205, 3, 10;
        /// P5.4
        P206, p206, 5, 4;
        /// P3.2
        P207, p207, 3, 2;
        /// P3.11
        P208, p208, 3, 11;
    );
}
