//! Platform timer abstraction for bit timing.
//!
//! The transceiver needs exactly one timing capability from the platform: a
//! free-running counter it can poll while clocking bits out, and a cheap
//! conversion from counter deltas to elapsed bit periods while clocking bits
//! in. Both are captured by the [`Sdi12Timer`] trait; one implementation per
//! target selects the hardware timer and prescaler at compile time.
//!
//! The conversion uses a Q10 fixed-point multiply so that it stays a
//! single-cycle-friendly integer operation inside the interrupt handler:
//! `bits = (delta + fudge) * bits_per_tick_q10 >> 10`. The fudge term
//! absorbs interrupt latency, widening the sampling window slightly in
//! favor of the earlier bit.
//!
//! Known-good configurations, measured against the 833 us SDI-12 bit:
//!
//! | F_CPU  | Prescaler | Tick   | Ticks/bit | Q10 | Fudge |
//! |--------|-----------|--------|-----------|-----|-------|
//! | 16 MHz |      1024 |  64 us |        13 |  79 |     2 |
//! | 12 MHz |      1024 |  85 us |         9 | 105 |     2 |
//! |  8 MHz |       256 |  32 us |        26 |  39 |    10 |
//! |  8 MHz |       512 |  64 us |        13 |  79 |     5 |
//! | 48 MHz |    3x1024 |  64 us |        13 |  79 |     2 |

use embedded_hal::delay::DelayNs;
use libm::round;

use crate::consts::BITS_PER_SECOND;

/// Timing capabilities the transceiver requires from the platform.
///
/// `DelayNs` supplies the coarse busy waits of the wake sequence; the trait
/// methods supply the fine-grained tick counter used for per-bit timing.
/// Implementations are expected to be cheap: `now` and `bit_times` are
/// called from the line-change interrupt handler.
pub trait Sdi12Timer: DelayNs {
    /// Prepares the hardware timer (prescaler, mode) for SDI-12 use.
    ///
    /// Called from [`begin`](crate::driver::Sdi12Driver::begin). On parts
    /// where the timer is shared, implementations should stash the previous
    /// configuration so [`reset`](Sdi12Timer::reset) can restore it.
    fn configure(&mut self);

    /// Undoes [`configure`](Sdi12Timer::configure); called from
    /// [`end`](crate::driver::Sdi12Driver::end).
    fn reset(&mut self);

    /// Current value of the free-running tick counter.
    ///
    /// Platforms with a narrower hardware counter widen it here; wrapping is
    /// fine as long as one full character (10 bit periods) fits inside a
    /// counter period.
    fn now(&self) -> u16;

    /// Number of ticks in one 833 us bit period.
    fn ticks_per_bit(&self) -> u16;

    /// Converts a tick-counter delta into whole elapsed bit periods.
    fn bit_times(&self, delta: u16) -> u16;
}

/// Tick-to-bit scaling for one timer configuration.
///
/// Bundles the three figures the decoder needs; a platform `Sdi12Timer`
/// implementation typically embeds one of these and delegates
/// [`bit_times`](Sdi12Timer::bit_times) to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerScale {
    /// Timer ticks per 833 us bit period.
    pub ticks_per_bit: u16,
    /// Reciprocal of `ticks_per_bit` in Q10 fixed point.
    pub bits_per_tick_q10: u16,
    /// Ticks added to every receive interval before conversion, absorbing
    /// interrupt latency.
    pub rx_window_fudge: u16,
}

impl TimerScale {
    /// Derives the scaling for a CPU clock and timer prescaler at runtime.
    ///
    /// # Arguments
    /// - `f_cpu`: CPU frequency in Hz
    /// - `prescaler`: timer prescaler (e.g. 256, 1024)
    /// - `rx_window_fudge`: latency allowance in ticks (2 is typical for a
    ///   64 us tick; slower-ticking or slower-executing parts need more)
    pub fn from_clock(f_cpu: u32, prescaler: u32, rx_window_fudge: u16) -> Self {
        let ticks_per_second = f_cpu as f64 / prescaler as f64;
        let ticks_per_bit = ticks_per_second / f64::from(BITS_PER_SECOND);
        Self {
            ticks_per_bit: ticks_per_bit as u16,
            bits_per_tick_q10: round(1024.0 / ticks_per_bit) as u16,
            rx_window_fudge,
        }
    }

    /// Compile-time variant of [`from_clock`](TimerScale::from_clock).
    pub const fn from_ticks(ticks_per_bit: u16, rx_window_fudge: u16) -> Self {
        Self {
            ticks_per_bit,
            // Integer rounding; exact enough for every supported tick width.
            bits_per_tick_q10: ((1024 + ticks_per_bit / 2) / ticks_per_bit),
            rx_window_fudge,
        }
    }

    /// Whole bit periods covered by a tick delta, latency fudge included.
    pub fn bit_times(&self, delta: u16) -> u16 {
        let widened = u32::from(delta) + u32::from(self.rx_window_fudge);
        ((widened * u32::from(self.bits_per_tick_q10)) >> 10) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_clock_matches_avr_reference() {
        // 16 MHz / 1024 = 64 us ticks: 13.02 ticks per bit, Q10 79.
        let scale = TimerScale::from_clock(16_000_000, 1024, 2);
        assert_eq!(scale.ticks_per_bit, 13);
        assert_eq!(scale.bits_per_tick_q10, 79);

        // 8 MHz / 256 = 32 us ticks: 26.04 ticks per bit, Q10 39.
        let scale = TimerScale::from_clock(8_000_000, 256, 10);
        assert_eq!(scale.ticks_per_bit, 26);
        assert_eq!(scale.bits_per_tick_q10, 39);
    }

    #[test]
    fn test_const_scale_matches_runtime() {
        const SCALE: TimerScale = TimerScale::from_ticks(13, 2);
        let runtime = TimerScale::from_clock(16_000_000, 1024, 2);
        assert_eq!(SCALE.bits_per_tick_q10, runtime.bits_per_tick_q10);
    }

    #[test]
    fn test_bit_times_rounding() {
        let scale = TimerScale::from_ticks(13, 2);
        // One bit = 13 ticks, two bits = 26, with up to a couple of ticks
        // of interrupt latency eaten by the fudge.
        assert_eq!(scale.bit_times(13), 1);
        assert_eq!(scale.bit_times(11), 1);
        assert_eq!(scale.bit_times(26), 2);
        assert_eq!(scale.bit_times(52), 4);
        // Nine bit periods, the longest run inside one character.
        assert_eq!(scale.bit_times(117), 9);
    }

    #[test]
    fn test_bit_times_short_glitch_is_zero_bits() {
        let scale = TimerScale::from_ticks(13, 2);
        assert_eq!(scale.bit_times(0), 0);
        assert_eq!(scale.bit_times(3), 0);
    }
}
