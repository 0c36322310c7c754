//! SDI-12 transceiver driver: line states, transmit path and read surface.
//!
//! This module provides the [`Sdi12Driver`] struct, a software 1200 baud 7E1
//! transceiver for the single bi-directional SDI-12 data line. It drives the
//! wake sequence and outgoing characters by busy-waiting on a platform tick
//! counter, and hands incoming line transitions to the process-wide
//! [`EdgeDecoder`](crate::decoder::EdgeDecoder).
//!
//! ## Data line states
//!
//! All pin and interrupt handling is funneled through four line states:
//!
//! | State        | Pin       | Line edges            |
//! |--------------|-----------|-----------------------|
//! | Holding      | drive low | ignored               |
//! | Transmitting | varying   | ignored (own traffic) |
//! | Listening    | released  | decoded               |
//! | Disabled     | released  | ignored               |
//!
//! The usual sequence on a recorder is `Holding -> Transmitting ->
//! Listening -> ...`, with [`force_hold`](Sdi12Driver::force_hold) closing
//! the exchange once all expected bytes arrived.
//!
//! ## One active instance
//!
//! The pin-change interrupt is a process-wide resource, so exactly one
//! driver instance is wired to it at a time. Instances on different pins
//! hand the line over explicitly:
//!
//! ```text
//! first.force_hold();
//! second.set_active();
//! ```
//!
//! Taking the line resets the shared receive decoder, so a character in
//! flight on the old pin can never bleed into the new one.

use core::cell::Cell;
use critical_section::Mutex;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::String;
use thiserror::Error;

use crate::buffer::RxBuffer;
use crate::consts::{
    BREAK_US, DATA_MASK, DEFAULT_TIMEOUT_MS, DEFAULT_TIMEOUT_VALUE, MARKING_US,
    RESPONSE_BUFFER_SIZE, RESPONSE_MARKING_US,
};
use crate::crc;
use crate::decoder::{parity_even_bit, DECODER};
use crate::timer::Sdi12Timer;

/// Errors surfaced by the read side of the driver.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sdi12Error {
    /// The receive ring dropped at least one character since the last read.
    #[error("receive buffer overflowed")]
    BufferOverflow,
    /// No character arrived within the configured read timeout.
    #[error("timed out waiting for data")]
    Timeout,
}

/// Observable states of the data line, see the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineState {
    /// Line actively held low so noise cannot wake the sensors.
    Holding,
    /// Driver owns the line and is clocking bits out.
    Transmitting,
    /// Line released, edge interrupts feed the decoder.
    Listening,
    /// Line released, edges ignored.
    #[default]
    Disabled,
}

/// Human-readable name of a line state, for diagnostics.
pub fn state_name(state: LineState) -> &'static str {
    match state {
        LineState::Holding => "HOLDING",
        LineState::Transmitting => "TRANSMITTING",
        LineState::Listening => "LISTENING",
        LineState::Disabled => "DISABLED",
    }
}

/// Instance id of the driver currently wired to the line-change interrupt;
/// zero when none is.
static ACTIVE_INSTANCE: Mutex<Cell<u16>> = Mutex::new(Cell::new(0));

/// Source of instance ids. Ids start at one; zero means "no instance".
static NEXT_INSTANCE_ID: Mutex<Cell<u16>> = Mutex::new(Cell::new(1));

/// A software SDI-12 transceiver on one data pin.
///
/// `P` is the bi-directional data pin; `T` supplies tick-level timing. The
/// driver is created idle ([`LineState::Disabled`]) and joins the bus with
/// [`begin`](Sdi12Driver::begin).
///
/// ## Example
///
/// ```rust,ignore
/// let mut bus = Sdi12Driver::new(data_pin, timer);
/// bus.begin();
/// bus.send_command("0M!");
/// let atttn = bus.read_string_until('\n');
/// ```
#[derive(Debug)]
pub struct Sdi12Driver<P, T>
where
    P: InputPin + OutputPin,
    T: Sdi12Timer,
{
    /// The data line pin.
    pub pin: P,
    /// Platform timing source.
    pub timer: T,
    state: LineState,
    buffer: RxBuffer,
    instance_id: u16,
    timeout_ms: u16,
    timeout_value: i32,
    extra_wake_time: u16,
}

impl<P, T> Sdi12Driver<P, T>
where
    P: InputPin + OutputPin,
    T: Sdi12Timer,
{
    /// Creates a driver for the given data pin and timer.
    ///
    /// The driver starts out [`LineState::Disabled`] and inactive; call
    /// [`begin`](Sdi12Driver::begin) before use.
    pub fn new(pin: P, timer: T) -> Self {
        let instance_id = critical_section::with(|cs| {
            let next = NEXT_INSTANCE_ID.borrow(cs);
            let id = next.get();
            next.set(if id == u16::MAX { 1 } else { id + 1 });
            id
        });
        Self {
            pin,
            timer,
            state: LineState::Disabled,
            buffer: RxBuffer::new(),
            instance_id,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            timeout_value: DEFAULT_TIMEOUT_VALUE,
            extra_wake_time: 0,
        }
    }

    /// Configures the platform timer and takes the line as the active
    /// instance, entering [`LineState::Holding`].
    pub fn begin(&mut self) {
        self.timer.configure();
        let _ = self.set_active();
    }

    /// Releases the line and the timer; the driver keeps its buffer but
    /// ignores all traffic until [`begin`](Sdi12Driver::begin) is called
    /// again.
    pub fn end(&mut self) {
        critical_section::with(|cs| {
            let slot = ACTIVE_INSTANCE.borrow(cs);
            if slot.get() == self.instance_id {
                slot.set(0);
            }
        });
        self.set_state(LineState::Disabled);
        self.timer.reset();
    }

    /// Current line state.
    pub fn state(&self) -> LineState {
        self.state
    }

    /// Registers this instance as the one the line-change interrupt feeds.
    ///
    /// Returns `true` if the instance was not already active. The previous
    /// holder is not touched; callers coordinate by calling
    /// [`force_hold`](Sdi12Driver::force_hold) on the outgoing instance
    /// first. Claiming the line resets the shared receive decoder.
    pub fn set_active(&mut self) -> bool {
        let claimed = critical_section::with(|cs| {
            let slot = ACTIVE_INSTANCE.borrow(cs);
            if slot.get() == self.instance_id {
                return false;
            }
            slot.set(self.instance_id);
            let mut decoder = DECODER.borrow(cs).borrow_mut();
            decoder.reset();
            decoder.disarm_wake_tracking();
            true
        });
        if claimed {
            self.set_state(LineState::Holding);
            sdi12_trace!("sdi12 instance {} now active", self.instance_id);
        }
        claimed
    }

    /// True when this instance is wired to the line-change interrupt.
    pub fn is_active(&self) -> bool {
        critical_section::with(|cs| ACTIVE_INSTANCE.borrow(cs).get() == self.instance_id)
    }

    /// Forces the line into [`LineState::Holding`].
    ///
    /// Useful against interference once all expected response bytes have
    /// been read, and required before handing the line to another instance.
    pub fn force_hold(&mut self) {
        self.set_state(LineState::Holding);
    }

    /// Forces the line into [`LineState::Listening`], e.g. for device-side
    /// firmware that must leave the line released whenever it is not
    /// answering.
    pub fn force_listen(&mut self) {
        self.set_state(LineState::Listening);
    }

    fn set_state(&mut self, state: LineState) {
        match state {
            LineState::Holding | LineState::Disabled => {
                let _ = self.pin.set_low();
            }
            LineState::Transmitting => {}
            LineState::Listening => {
                let _ = self.pin.set_low();
                critical_section::with(|cs| DECODER.borrow(cs).borrow_mut().reset());
            }
        }
        self.state = state;
        sdi12_trace!("sdi12 line state: {}", state_name(state));
    }

    // ----- transmit path ------------------------------------------------

    /// Wakes every sensor on the bus: >= 12 ms of spacing (the break)
    /// followed by >= 8.3 ms of marking.
    fn wake_sensors(&mut self) {
        self.set_state(LineState::Transmitting);
        let _ = self.pin.set_high();
        self.timer.delay_us(BREAK_US);
        if self.extra_wake_time > 0 {
            self.timer.delay_ms(u32::from(self.extra_wake_time));
        }
        let _ = self.pin.set_low();
        self.timer.delay_us(MARKING_US);
    }

    /// Busy-waits until one bit width past `t0`, then advances `t0` by
    /// exactly one width so timing error does not accumulate.
    fn hold_bit(&self, t0: &mut u16, width: u16) {
        while self.timer.now().wrapping_sub(*t0) < width {}
        *t0 = t0.wrapping_add(width);
    }

    #[cfg(feature = "tx-critical-section")]
    fn tx_guarded<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        critical_section::with(|_| f(self))
    }

    #[cfg(not(feature = "tx-critical-section"))]
    fn tx_guarded<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        f(self)
    }

    /// Clocks one character onto the line: start bit, seven data bits LSB
    /// first, even parity, stop bit, in inverse logic.
    ///
    /// Every bit from the last spacing bit onward is marking (line low), so
    /// the serializer collapses the tail into a single falling edge and
    /// times the remaining widths outside the interrupt-free window.
    fn write_char(&mut self, out: u8) {
        let mut sym = out & DATA_MASK;
        sym |= parity_even_bit(sym) << 7;
        let spaces = !sym;
        let precise_bits: u8 = if spaces == 0 {
            0
        } else {
            8 - spaces.leading_zeros() as u8
        };
        let width = self.timer.ticks_per_bit();

        let mut t0 = self.tx_guarded(|this| {
            let mut t0 = this.timer.now();
            let _ = this.pin.set_high(); // start bit
            this.hold_bit(&mut t0, width);
            let mut mask: u8 = 0x01;
            for _ in 0..precise_bits {
                if sym & mask != 0 {
                    let _ = this.pin.set_low();
                } else {
                    let _ = this.pin.set_high();
                }
                this.hold_bit(&mut t0, width);
                mask <<= 1;
            }
            let _ = this.pin.set_low(); // trailing marks and stop bit
            t0
        });
        // 8 - precise_bits marking bits plus the stop bit; the line is
        // already low, only the time has to pass.
        for _ in 0..(8 - precise_bits + 1) {
            self.hold_bit(&mut t0, width);
        }
    }

    /// Wakes the bus and sends a command, then listens for the reply.
    ///
    /// Prepend the target address and append `!` yourself; the driver does
    /// not interpret the payload.
    pub fn send_command(&mut self, cmd: &str) {
        self.wake_sensors();
        for byte in cmd.bytes() {
            self.write_char(byte);
        }
        self.set_state(LineState::Listening);
        sdi12_trace!("sdi12 sent command: {}", cmd);
    }

    /// Sends a response as a device on the bus: 8.33 ms of marking (no
    /// break), the payload, and optionally its three-character ASCII CRC.
    pub fn send_response(&mut self, resp: &str, add_crc: bool) {
        self.set_state(LineState::Transmitting);
        let _ = self.pin.set_low();
        self.timer.delay_us(RESPONSE_MARKING_US);
        for byte in resp.bytes() {
            self.write_char(byte);
        }
        if add_crc {
            for byte in crc::encode_ascii(crc::crc16(resp.as_bytes())) {
                self.write_char(byte);
            }
        }
        self.set_state(LineState::Listening);
    }

    // ----- receive path -------------------------------------------------

    /// Entry point for the platform's pin-change interrupt.
    ///
    /// Samples the tick counter and line level immediately (any later and
    /// interrupt latency eats into the measurement), then feeds the shared
    /// decoder. Edges are ignored unless this instance is active and
    /// listening.
    pub fn on_line_change(&mut self) {
        let now = self.timer.now();
        let level_high = self.pin.is_high().unwrap_or(false);
        if self.state != LineState::Listening || !self.is_active() {
            return;
        }
        critical_section::with(|cs| {
            DECODER
                .borrow(cs)
                .borrow_mut()
                .on_edge(level_high, now, &self.timer, &mut self.buffer);
        });
    }

    /// Number of buffered characters, or [`Sdi12Error::BufferOverflow`]
    /// once characters have been dropped.
    pub fn available(&self) -> Result<usize, Sdi12Error> {
        if self.buffer.overflowed() {
            return Err(Sdi12Error::BufferOverflow);
        }
        Ok(self.buffer.len())
    }

    /// Reveals the next buffered character without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.buffer.peek()
    }

    /// Takes the next buffered character.
    ///
    /// Returns [`nb::Error::WouldBlock`] when nothing is buffered; a
    /// successful read clears the overflow latch.
    pub fn read(&mut self) -> nb::Result<u8, Sdi12Error> {
        self.buffer.pop().ok_or(nb::Error::WouldBlock)
    }

    /// Takes the next character, waiting up to the configured read timeout.
    pub fn read_blocking(&mut self) -> Result<u8, Sdi12Error> {
        let mut waited_ms: u16 = 0;
        loop {
            if let Some(byte) = self.buffer.pop() {
                return Ok(byte);
            }
            if waited_ms >= self.timeout_ms {
                return Err(Sdi12Error::Timeout);
            }
            self.timer.delay_us(1_000);
            waited_ms += 1;
        }
    }

    /// Discards all buffered characters and the overflow latch.
    pub fn flush(&mut self) {
        self.buffer.clear();
    }

    /// Collects characters up to (and consuming, but not including) the
    /// terminator.
    ///
    /// Stops early on timeout or when the bounded string fills; partial
    /// input is returned as-is, like the rest of the stream helpers.
    pub fn read_string_until(&mut self, terminator: char) -> String<RESPONSE_BUFFER_SIZE> {
        let mut out = String::new();
        while let Ok(byte) = self.read_blocking() {
            if byte as char == terminator {
                break;
            }
            if out.push(byte as char).is_err() {
                break;
            }
        }
        out
    }

    /// Waits for the next character without consuming it, up to the read
    /// timeout.
    fn timed_peek(&mut self) -> Option<u8> {
        let mut waited_ms: u16 = 0;
        loop {
            if let Some(byte) = self.buffer.peek() {
                return Some(byte);
            }
            if waited_ms >= self.timeout_ms {
                return None;
            }
            self.timer.delay_us(1_000);
            waited_ms += 1;
        }
    }

    /// Discards buffered characters until something numeric shows up.
    fn peek_next_digit(&mut self, detect_decimal: bool) -> Option<u8> {
        loop {
            let c = self.timed_peek()?;
            if c == b'-' || c.is_ascii_digit() || (detect_decimal && c == b'.') {
                return Some(c);
            }
            let _ = self.buffer.pop();
        }
    }

    /// Parses the next integer out of the stream.
    ///
    /// Non-numeric characters before the number are discarded. Returns the
    /// configured timeout sentinel (default -9999) when no number arrives
    /// within the read timeout.
    pub fn parse_int(&mut self) -> i32 {
        let Some(mut c) = self.peek_next_digit(false) else {
            return self.timeout_value;
        };
        let mut value: i32 = 0;
        let mut negative = false;
        loop {
            if c == b'-' && value == 0 && !negative {
                negative = true;
            } else if c.is_ascii_digit() {
                value = value * 10 + i32::from(c - b'0');
            } else {
                break;
            }
            let _ = self.buffer.pop();
            match self.timed_peek() {
                Some(next) => c = next,
                None => break,
            }
        }
        if negative { -value } else { value }
    }

    /// Parses the next decimal number out of the stream.
    ///
    /// Same skipping and timeout behavior as
    /// [`parse_int`](Sdi12Driver::parse_int).
    pub fn parse_float(&mut self) -> f32 {
        let Some(mut c) = self.peek_next_digit(true) else {
            return self.timeout_value as f32;
        };
        let mut value: f32 = 0.0;
        let mut fraction: f32 = 1.0;
        let mut negative = false;
        let mut in_fraction = false;
        loop {
            if c == b'-' && value == 0.0 && !negative && !in_fraction {
                negative = true;
            } else if c == b'.' && !in_fraction {
                in_fraction = true;
            } else if c.is_ascii_digit() {
                value = value * 10.0 + f32::from(c - b'0');
                if in_fraction {
                    fraction *= 0.1;
                }
            } else {
                break;
            }
            let _ = self.buffer.pop();
            match self.timed_peek() {
                Some(next) => c = next,
                None => break,
            }
        }
        let value = value * fraction;
        if negative { -value } else { value }
    }

    // ----- device-side line status ---------------------------------------

    /// True once a wake break has been observed; see
    /// [`clear_line_markings`](Sdi12Driver::clear_line_markings).
    pub fn line_break_received(&self) -> bool {
        critical_section::with(|cs| DECODER.borrow(cs).borrow().line_break_received())
    }

    /// True once the post-break marking has been observed.
    pub fn line_mark_received(&self) -> bool {
        critical_section::with(|cs| DECODER.borrow(cs).borrow().line_mark_received())
    }

    /// Re-arms break and marking detection for device-side firmware.
    ///
    /// While armed, no characters are decoded until a full wake sequence
    /// has been seen, so a sleeping device cannot mistake bus noise for a
    /// command. Recorders never call this.
    pub fn clear_line_markings(&mut self) {
        critical_section::with(|cs| DECODER.borrow(cs).borrow_mut().arm_wake_tracking());
    }

    /// True once any received character failed its even-parity check.
    #[cfg(feature = "parity-check")]
    pub fn parity_failure(&self) -> bool {
        critical_section::with(|cs| DECODER.borrow(cs).borrow().parity_failure())
    }

    /// Clears the latched parity failure.
    #[cfg(feature = "parity-check")]
    pub fn clear_parity_failure(&mut self) {
        critical_section::with(|cs| DECODER.borrow(cs).borrow_mut().clear_parity_failure());
    }

    // ----- configuration --------------------------------------------------

    /// Sets how long the stream helpers wait for the next character,
    /// in milliseconds.
    pub fn set_read_timeout(&mut self, timeout_ms: u16) {
        self.timeout_ms = timeout_ms;
    }

    /// Sets the sentinel [`parse_int`](Sdi12Driver::parse_int) and
    /// [`parse_float`](Sdi12Driver::parse_float) return on timeout.
    pub fn set_timeout_value(&mut self, value: i32) {
        self.timeout_value = value;
    }

    /// Adds extra milliseconds of break time for buses with slow-waking
    /// sensors.
    pub fn set_extra_wake_time(&mut self, extra_ms: u16) {
        self.extra_wake_time = extra_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{bus_lock, TestTimer};
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    fn set(level: char) -> PinTransaction {
        PinTransaction::set(if level == 'H' {
            PinState::High
        } else {
            PinState::Low
        })
    }

    fn frames(levels: &str) -> Vec<PinTransaction> {
        levels.chars().filter(|c| !c.is_whitespace()).map(set).collect()
    }

    #[test]
    fn test_begin_enters_holding_and_claims_line() {
        let _lock = bus_lock();
        let pin = PinMock::new(&frames("L"));
        let mut bus = Sdi12Driver::new(pin, TestTimer::free_running(4));
        assert_eq!(bus.state(), LineState::Disabled);
        bus.begin();
        assert_eq!(bus.state(), LineState::Holding);
        assert!(bus.is_active());
        // Claiming again reports no change.
        assert!(!bus.set_active());
        bus.pin.done();
    }

    #[test]
    fn test_active_handoff_between_instances() {
        let _lock = bus_lock();
        let mut first = Sdi12Driver::new(PinMock::new(&frames("L L")), TestTimer::free_running(4));
        let mut second = Sdi12Driver::new(PinMock::new(&frames("L")), TestTimer::free_running(4));
        first.begin();
        assert!(first.is_active());

        first.force_hold();
        assert!(second.set_active());
        assert!(second.is_active());
        assert!(!first.is_active());
        assert_eq!(second.state(), LineState::Holding);

        first.pin.done();
        second.pin.done();
    }

    #[test]
    fn test_end_releases_line() {
        let _lock = bus_lock();
        let mut bus = Sdi12Driver::new(PinMock::new(&frames("L L")), TestTimer::free_running(4));
        bus.begin();
        bus.end();
        assert_eq!(bus.state(), LineState::Disabled);
        assert!(!bus.is_active());
        bus.pin.done();
    }

    #[test]
    fn test_send_command_wire_sequence() {
        let _lock = bus_lock();
        // begin, break + marking, then 'a', 'M', '!' as 7E1 inverse-logic
        // frames with the trailing marks collapsed, then listening.
        let expected = frames(
            "L \
             H L \
             H L H H H H L \
             H L H L L H H L H L \
             H L H H H H L H H L \
             L",
        );
        let mut bus = Sdi12Driver::new(PinMock::new(&expected), TestTimer::free_running(2));
        bus.begin();
        bus.send_command("aM!");
        assert_eq!(bus.state(), LineState::Listening);
        bus.pin.done();
    }

    #[test]
    fn test_send_response_appends_crc() {
        let _lock = bus_lock();
        // Marking (low, no break), '0', then the ASCII CRC of "0": "AP@".
        let expected = frames(
            "L \
             L \
             H H H H H L L H H L \
             H L H H H H H L H L \
             H H H H H L H L H L \
             H H H H H H H L \
             L",
        );
        let mut bus = Sdi12Driver::new(PinMock::new(&expected), TestTimer::free_running(2));
        bus.begin();
        bus.send_response("0", true);
        assert_eq!(bus.state(), LineState::Listening);
        bus.pin.done();
    }

    #[test]
    fn test_receive_character_through_isr() {
        let _lock = bus_lock();
        // 'a' on the wire, 64 us ticks: edges at 0, 13, 26 and 78 ticks,
        // with a much later start bit flushing the character out.
        let edges = [
            (0u16, PinState::High),
            (13, PinState::Low),
            (26, PinState::High),
            (78, PinState::Low),
            (859, PinState::High),
        ];
        let mut transactions = frames("L L");
        transactions.extend(edges.iter().map(|&(_, level)| PinTransaction::get(level)));
        let mut bus = Sdi12Driver::new(PinMock::new(&transactions), TestTimer::avr16());
        bus.begin();
        bus.force_listen();
        for (t, _) in edges {
            bus.timer.set_now(t);
            bus.on_line_change();
        }
        assert_eq!(bus.read(), Ok(0x61));
        assert_eq!(bus.read(), Err(nb::Error::WouldBlock));
        bus.pin.done();
    }

    #[test]
    fn test_edges_ignored_unless_listening() {
        let _lock = bus_lock();
        let transactions = vec![set('L'), PinTransaction::get(PinState::High)];
        let mut bus = Sdi12Driver::new(PinMock::new(&transactions), TestTimer::avr16());
        bus.begin(); // Holding
        bus.on_line_change();
        assert_eq!(bus.available(), Ok(0));
        bus.pin.done();
    }

    #[test]
    fn test_available_reports_overflow() {
        let _lock = bus_lock();
        let mut bus = Sdi12Driver::new(PinMock::new(&frames("L")), TestTimer::free_running(4));
        bus.begin();
        for byte in 0..70u8 {
            bus.buffer.push(byte);
        }
        assert_eq!(bus.available(), Err(Sdi12Error::BufferOverflow));
        // Reading clears the latch.
        assert_eq!(bus.read(), Ok(0));
        assert!(bus.available().is_ok());
        bus.flush();
        assert_eq!(bus.available(), Ok(0));
        bus.pin.done();
    }

    #[test]
    fn test_peek_does_not_consume() {
        let _lock = bus_lock();
        let mut bus = Sdi12Driver::new(PinMock::new(&frames("L")), TestTimer::free_running(4));
        bus.begin();
        bus.buffer.push(b'7');
        assert_eq!(bus.peek(), Some(b'7'));
        assert_eq!(bus.peek(), Some(b'7'));
        assert_eq!(bus.read(), Ok(b'7'));
        assert_eq!(bus.peek(), None);
        bus.pin.done();
    }

    #[test]
    fn test_read_string_until() {
        let _lock = bus_lock();
        let mut bus = Sdi12Driver::new(PinMock::new(&frames("L")), TestTimer::free_running(4));
        bus.begin();
        bus.set_read_timeout(2);
        for byte in b"013METER\r\n" {
            bus.buffer.push(*byte);
        }
        assert_eq!(bus.read_string_until('\n').as_str(), "013METER\r");
        bus.pin.done();
    }

    #[test]
    fn test_parse_int_and_float() {
        let _lock = bus_lock();
        let mut bus = Sdi12Driver::new(PinMock::new(&frames("L")), TestTimer::free_running(4));
        bus.begin();
        bus.set_read_timeout(2);
        for byte in b"0+3.14-2.7+1234" {
            bus.buffer.push(*byte);
        }
        // The leading address digit is itself a number.
        assert_eq!(bus.parse_int(), 0);
        assert!((bus.parse_float() - 3.14).abs() < 1e-5);
        assert!((bus.parse_float() + 2.7).abs() < 1e-5);
        assert_eq!(bus.parse_int(), 1234);
        bus.pin.done();
    }

    #[test]
    fn test_parse_timeout_sentinel() {
        let _lock = bus_lock();
        let mut bus = Sdi12Driver::new(PinMock::new(&frames("L")), TestTimer::free_running(4));
        bus.begin();
        bus.set_read_timeout(1);
        assert_eq!(bus.parse_int(), DEFAULT_TIMEOUT_VALUE);
        bus.set_timeout_value(-42);
        assert_eq!(bus.parse_int(), -42);
        assert!((bus.parse_float() + 42.0).abs() < 1e-5);
        // Non-numeric garbage also runs into the sentinel.
        bus.buffer.push(b'x');
        assert_eq!(bus.parse_int(), -42);
        bus.pin.done();
    }

    #[test]
    fn test_read_blocking_timeout() {
        let _lock = bus_lock();
        let mut bus = Sdi12Driver::new(PinMock::new(&frames("L")), TestTimer::free_running(4));
        bus.begin();
        bus.set_read_timeout(1);
        assert_eq!(bus.read_blocking(), Err(Sdi12Error::Timeout));
        bus.buffer.push(b'Z');
        assert_eq!(bus.read_blocking(), Ok(b'Z'));
        bus.pin.done();
    }

    #[test]
    fn test_state_names() {
        assert_eq!(state_name(LineState::Holding), "HOLDING");
        assert_eq!(state_name(LineState::Transmitting), "TRANSMITTING");
        assert_eq!(state_name(LineState::Listening), "LISTENING");
        assert_eq!(state_name(LineState::Disabled), "DISABLED");
    }
}
