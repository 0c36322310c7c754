//! Constants used across the SDI-12 protocol implementation.
//!
//! This module collects the wire-level timing figures from the SDI-12 v1.4
//! specification, the receive buffer sizing, and the defaults for the
//! stream-style read helpers.
//!
//! ## Key Concepts
//!
//! - **Break / marking**: every recorder command is preceded by a >= 12 ms
//!   spacing pulse (the break) and a >= 8.33 ms marking period.
//! - **Framing**: 1 start bit, 7 data bits LSB first, 1 even parity bit,
//!   1 stop bit, at 1200 baud. One bit nominally lasts 833 us.
//! - **Inverse logic**: the line held high is a logical 0 ("spacing"), the
//!   line held low is a logical 1 ("marking").
//! - **Buffer sizing**: the receive ring holds 64 characters, a little more
//!   than the longest ASCII response line a v1.4 sensor may send.

/// SDI-12 bit rate. The protocol admits no other speed.
pub const BITS_PER_SECOND: u16 = 1_200;

/// Nominal duration of a single bit at 1200 baud, in microseconds.
pub const BIT_WIDTH_US: u32 = 833;

/// Receive ring capacity in characters.
///
/// Must be a power of two no larger than 256 so that the `u8` head and tail
/// indices wrap cleanly.
pub const RX_BUFFER_SIZE: usize = 64;

/// Duration of the wake-up break, in microseconds.
///
/// The specification requires at least 12 ms of spacing; 100 us of margin
/// covers the call overhead around the delay.
pub const BREAK_US: u32 = 12_100;

/// Duration of the post-break marking, in microseconds (>= 8.33 ms required).
pub const MARKING_US: u32 = 8_400;

/// Marking a device asserts before its response, in microseconds.
pub const RESPONSE_MARKING_US: u32 = 8_330;

/// Default number of milliseconds the stream helpers wait for the next
/// character before giving up.
pub const DEFAULT_TIMEOUT_MS: u16 = 150;

/// Default sentinel returned by [`parse_int`](crate::driver::Sdi12Driver::parse_int)
/// and [`parse_float`](crate::driver::Sdi12Driver::parse_float) on timeout.
///
/// Chosen outside the plausible range of SDI-12 data values.
pub const DEFAULT_TIMEOUT_VALUE: i32 = -9999;

/// Mask of the seven data bits within a received or transmitted symbol.
pub const DATA_MASK: u8 = 0x7F;

/// Bit position of the even-parity bit within the 8-bit transmit symbol.
pub const PARITY_MASK: u8 = 0x80;

/// Generator polynomial of the SDI-12 CRC-16 (CRC-IBM, reflected).
pub const CRC_POLYNOMIAL: u16 = 0xA001;

/// Number of printable ASCII characters encoding a CRC-16 on the wire.
pub const CRC_ASCII_LEN: usize = 3;

/// Shortest line break a device must recognize, in bit periods.
///
/// 12 ms of spacing is 14.4 bit periods; an edge arriving after 14 or more
/// high bit periods counts as a break.
pub const BREAK_MIN_BITS: u16 = 14;

/// Shortest post-break marking a device must recognize, in bit periods.
///
/// 8.33 ms of marking is 10 bit periods.
pub const MARK_MIN_BITS: u16 = 10;

/// Longest `<value>` field of a single data response: polarity sign,
/// up to seven digits and a decimal point.
pub const VALUE_STR_SIZE: usize = 9;

/// Data string size for `aM!` measurement responses.
pub const VALUES_STR_SIZE_LOW: usize = 35;

/// Data string size for concurrent, continuous and high-volume ASCII
/// measurement responses.
pub const VALUES_STR_SIZE_HIGH: usize = 75;

/// Capacity of the bounded strings returned by
/// [`read_string_until`](crate::driver::Sdi12Driver::read_string_until).
///
/// Sized for the longest ASCII response line: address, 75 characters of
/// values, a CRC triplet and CR+LF.
pub const RESPONSE_BUFFER_SIZE: usize = 84;
