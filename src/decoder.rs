//! Edge-interval decoder reconstructing 7E1 characters from line changes.
//!
//! The receive side never samples the line on a clock. The only input is the
//! sequence of level-change timestamps delivered by the pin-change interrupt,
//! and the decoder infers everything else: a run of N bit periods between two
//! edges is N consecutive bits at the level that just ended. Inverse logic
//! maps a low run to logical 1s ("marking") and a high run to logical 0s
//! ("spacing").
//!
//! Because both the stop bit and the idle line are marking, the edge closing
//! a character is often not observable; back-to-back characters arrive as one
//! unbroken stream. The decoder therefore counts frame bits: a character is
//! nine bits past its leading edge (start, seven data bits LSB first, even
//! parity), and an interval longer than what the current character can still
//! absorb means the next character's start bit has already begun.
//!
//! State lives process-wide next to the active-instance slot rather than in
//! the transceiver, since the platform's pin-change vector is itself a
//! process-wide resource; it is reset whenever an instance takes the line or
//! re-enters the listening state.

use core::cell::RefCell;
use critical_section::Mutex;

use crate::buffer::RxBuffer;
use crate::consts::{BREAK_MIN_BITS, DATA_MASK, MARK_MIN_BITS};
use crate::timer::Sdi12Timer;

/// `rx_state` value meaning "no character in flight".
const WAITING_FOR_START_BIT: u8 = 0xFF;

/// Frame bits per character past the leading edge: the start bit, seven data
/// bits and the parity bit. The stop bit is never counted; it is indistinct
/// from idle marking.
const FRAME_BITS: u8 = 9;

/// Computes the even-parity bit for a 7-bit character.
pub(crate) fn parity_even_bit(value: u8) -> u8 {
    (value.count_ones() & 1) as u8
}

/// Decoder state shared between the interrupt handler and the active
/// transceiver.
#[derive(Debug)]
pub struct EdgeDecoder {
    /// [`WAITING_FOR_START_BIT`], or the number of frame bits consumed since
    /// the current character's leading edge.
    rx_state: u8,
    /// Bit position the next received 1 is OR-ed into, LSB first.
    rx_mask: u8,
    /// Character under construction, parity still in bit 7.
    rx_value: u8,
    /// Tick-counter value at the previously observed edge.
    prev_edge_tick: u16,
    /// Set once a received character fails its even-parity check; the
    /// character is buffered regardless.
    #[cfg(feature = "parity-check")]
    parity_failure: bool,
    /// Device-side wake tracking: still waiting to observe a line break.
    waiting_for_break: bool,
    /// Device-side wake tracking: still waiting for the post-break marking.
    waiting_for_mark: bool,
}

/// The process-wide decoder fed by the active instance's interrupt handler.
pub(crate) static DECODER: Mutex<RefCell<EdgeDecoder>> =
    Mutex::new(RefCell::new(EdgeDecoder::new()));

impl EdgeDecoder {
    /// Creates a decoder at rest: no character in flight, wake tracking
    /// disarmed.
    pub const fn new() -> Self {
        Self {
            rx_state: WAITING_FOR_START_BIT,
            rx_mask: 0x01,
            rx_value: 0,
            prev_edge_tick: 0,
            #[cfg(feature = "parity-check")]
            parity_failure: false,
            waiting_for_break: false,
            waiting_for_mark: false,
        }
    }

    /// Abandons any character in flight and waits for a fresh start bit.
    ///
    /// Called on every transition into the listening state so that a
    /// mid-character edge cannot be mistaken for data.
    pub fn reset(&mut self) {
        self.rx_state = WAITING_FOR_START_BIT;
        self.rx_mask = 0x01;
        self.rx_value = 0;
        #[cfg(feature = "parity-check")]
        {
            self.parity_failure = false;
        }
    }

    /// True once a break has been observed since the last
    /// [`arm_wake_tracking`](EdgeDecoder::arm_wake_tracking).
    pub fn line_break_received(&self) -> bool {
        !self.waiting_for_break
    }

    /// True once the post-break marking has been observed.
    pub fn line_mark_received(&self) -> bool {
        !self.waiting_for_mark
    }

    /// Arms break/marking detection for device-side use.
    ///
    /// While armed, character decoding is suppressed until a break and the
    /// following marking have both been seen, so the garbage edges of the
    /// wake sequence never reach the buffer. A recorder never arms this.
    pub fn arm_wake_tracking(&mut self) {
        self.waiting_for_break = true;
        self.waiting_for_mark = true;
    }

    /// Disarms break/marking detection.
    pub fn disarm_wake_tracking(&mut self) {
        self.waiting_for_break = false;
        self.waiting_for_mark = false;
    }

    /// True once a received character has failed its parity check.
    #[cfg(feature = "parity-check")]
    pub fn parity_failure(&self) -> bool {
        self.parity_failure
    }

    /// Clears the latched parity failure.
    #[cfg(feature = "parity-check")]
    pub fn clear_parity_failure(&mut self) {
        self.parity_failure = false;
    }

    /// Feeds one line transition into the decoder.
    ///
    /// # Arguments
    /// - `level_high`: line level after the transition
    /// - `now`: tick-counter timestamp of the transition
    /// - `timer`: tick-to-bit conversion source
    /// - `buf`: ring the finished characters are pushed into
    pub fn on_edge<T: Sdi12Timer>(
        &mut self,
        level_high: bool,
        now: u16,
        timer: &T,
        buf: &mut RxBuffer,
    ) {
        if self.waiting_for_break || self.waiting_for_mark {
            if self.waiting_for_break {
                if level_high {
                    // Break possibly in progress; measure it at the falling
                    // edge without disturbing the interval reference.
                    return;
                }
                let high_bits = timer.bit_times(now.wrapping_sub(self.prev_edge_tick));
                if high_bits >= BREAK_MIN_BITS {
                    self.waiting_for_break = false;
                }
                self.prev_edge_tick = now;
                return;
            }
            let low_bits = timer.bit_times(now.wrapping_sub(self.prev_edge_tick));
            if level_high && low_bits >= MARK_MIN_BITS {
                self.waiting_for_mark = false;
                // This rising edge doubles as the first start bit; fall
                // through and decode it.
            } else {
                self.prev_edge_tick = now;
                return;
            }
        }

        if self.rx_state == WAITING_FOR_START_BIT {
            // Only a rising edge can open a character; anything else here is
            // the tail of a stop bit or line noise.
            if level_high {
                self.start_char();
            }
        } else {
            let n_bits = timer.bit_times(now.wrapping_sub(self.prev_edge_tick));
            let bits_left = u16::from(FRAME_BITS - self.rx_state);
            let next_char_started = n_bits > bits_left;
            let bits_this_frame = (if next_char_started { bits_left } else { n_bits }) as u8;

            // The interval that just closed ran at the opposite of the
            // current level; a low run is a run of 1s.
            self.accumulate(level_high, bits_this_frame);

            if self.rx_state >= FRAME_BITS {
                self.finish_char(buf);
                if next_char_started && level_high {
                    // The measured run swallowed the stop bit and part of the
                    // idle marking; this very edge is the next start bit.
                    self.start_char();
                } else {
                    self.rx_state = WAITING_FOR_START_BIT;
                }
            }
        }
        self.prev_edge_tick = now;
    }

    fn start_char(&mut self) {
        self.rx_state = 0;
        self.rx_mask = 0x01;
        self.rx_value = 0;
    }

    /// Back-fills `count` bits at the level that preceded the current edge.
    ///
    /// The first frame bit is the start bit, which carries no data: it
    /// advances the state without touching the mask.
    fn accumulate(&mut self, level_high: bool, mut count: u8) {
        if self.rx_state == 0 && count > 0 {
            self.rx_state = 1;
            count -= 1;
        }
        while count > 0 {
            if level_high {
                self.rx_value |= self.rx_mask;
            }
            self.rx_mask <<= 1;
            self.rx_state += 1;
            count -= 1;
        }
    }

    fn finish_char(&mut self, buf: &mut RxBuffer) {
        #[cfg(feature = "parity-check")]
        if (self.rx_value >> 7) != parity_even_bit(self.rx_value & DATA_MASK) {
            self.parity_failure = true;
        }
        buf.push(self.rx_value & DATA_MASK);
    }
}

impl Default for EdgeDecoder {
    fn default() -> Self {
        Self::new()
    }
}
