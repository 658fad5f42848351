//! 32-bit timer/counter driver for the LPC17xx
//!
//! The four timers are identical 32 bit counters with four match
//! registers. The driver programs the prescaler for a 1 MHz tick, so timer
//! values count microseconds, and implements the `embedded-hal`
//! `CountDown` timer on match register 0.
//!
//! ``` no_run
//! use cmx_hal::embedded_time::rate::Hertz;
//! use cmx_hal::lpc17xx::{timer::MicroSeconds, Peripherals};
//! use cmx_hal::nb;
//! use cmx_hal::prelude::*;
//!
//! let mut p = Peripherals::take().unwrap();
//!
//! let mut timer = p.timer0.enable(Hertz(25_000_000), &mut p.syscon);
//! timer.start(MicroSeconds(50_000));
//! nb::block!(timer.wait()).unwrap();
//! ```
//!
//! See the user manual, chapter 21.

use core::marker::PhantomData;
use core::ops::Deref;

use embedded_hal::timer::{CountDown, Periodic};
use embedded_time::rate::Hertz;
use void::Void;

use crate::init_state::{Disabled, Enabled};
use crate::pac::lpc17xx::{self as pac, timer::RegisterBlock, Interrupt};

use super::syscon::{ClockControl, Syscon};

/// Implemented for all timer instances
pub trait Instance:
    private::Sealed + Deref<Target = RegisterBlock> + ClockControl
{
    /// The interrupt that is triggered for this timer
    const INTERRUPT: Interrupt;
}

/// A duration in timer ticks of 1 µs
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MicroSeconds(pub u32);

/// Interface to a timer
pub struct Timer<I, State> {
    timer: I,
    _state: PhantomData<State>,
}

impl<I: Instance> Timer<I, Disabled> {
    pub(crate) fn new(timer: I) -> Self {
        Timer {
            timer,
            _state: PhantomData,
        }
    }

    /// Enable the timer
    ///
    /// The prescaler is set up from the peripheral clock so the counter
    /// ticks once per microsecond.
    pub fn enable(self, pclk: Hertz, syscon: &mut Syscon) -> Timer<I, Enabled> {
        syscon.enable_clock(&self.timer);

        unsafe {
            // hold the counter in reset while configuring
            self.timer.tcr.write(0x1 << 1);

            // 1 MHz tick
            self.timer.pr.write(pclk.0 / 1_000_000 - 1);

            // timer mode, counting the peripheral clock
            self.timer.ctcr.write(0);

            self.timer.tcr.write(0);
        }

        Timer {
            timer: self.timer,
            _state: PhantomData,
        }
    }
}

impl<I: Instance> Timer<I, Enabled> {
    /// Disable the timer
    pub fn disable(self, syscon: &mut Syscon) -> Timer<I, Disabled> {
        unsafe {
            self.timer.tcr.write(0);
        }
        syscon.disable_clock(&self.timer);

        Timer {
            timer: self.timer,
            _state: PhantomData,
        }
    }

    /// The current counter value, in microseconds since the last restart
    pub fn now(&self) -> u32 {
        self.timer.tc.read()
    }

    /// Enable the match 0 interrupt
    ///
    /// The interrupt fires whenever the period set through `start`
    /// elapses. It still has to be unmasked in the NVIC.
    pub fn enable_match_interrupt(&mut self) {
        unsafe {
            self.timer.mcr.modify(|mcr| mcr | 0x1);
        }
    }

    /// Disable the match 0 interrupt
    pub fn disable_match_interrupt(&mut self) {
        unsafe {
            self.timer.mcr.modify(|mcr| mcr & !0x1);
        }
    }

    /// Enable this instance's interrupt in the NVIC
    pub fn enable_in_nvic(&mut self) {
        // Safe, because there's no critical section here that this could
        // interfere with.
        unsafe { cortex_m::peripheral::NVIC::unmask(I::INTERRUPT) };
    }

    /// Clear the match 0 interrupt flag
    pub fn clear_match_flag(&mut self) {
        unsafe {
            self.timer.ir.write(0x1);
        }
    }
}

impl<I: Instance> CountDown for Timer<I, Enabled> {
    type Time = MicroSeconds;

    fn start<T: Into<MicroSeconds>>(&mut self, count: T) {
        unsafe {
            // stop and reset
            self.timer.tcr.write(0x1 << 1);

            self.timer.mr[0].write(count.into().0);
            // reset on match 0, so the timer is periodic
            self.timer.mcr.modify(|mcr| (mcr & !0b111) | 0b010);
            self.timer.ir.write(0x1);

            self.timer.tcr.write(0x1);
        }
    }

    fn wait(&mut self) -> nb::Result<(), Void> {
        if self.timer.ir.read() & 0x1 == 0 {
            return Err(nb::Error::WouldBlock);
        }

        unsafe {
            self.timer.ir.write(0x1);
        }

        Ok(())
    }
}

impl<I: Instance> Periodic for Timer<I, Enabled> {}

macro_rules! instances {
    ($($instance:ident, $interrupt:ident;)*) => {
        $(
            impl private::Sealed for pac::$instance {}

            impl Instance for pac::$instance {
                const INTERRUPT: Interrupt = Interrupt::$interrupt;
            }
        )*
    };
}

instances!(
    TIMER0, TIMER0;
    TIMER1, TIMER1;
    TIMER2, TIMER2;
    TIMER3, TIMER3;
);

mod private {
    pub trait Sealed {}
}
