//! # sdi12-modem
//!
//! A portable, no_std Rust implementation of the SDI-12 v1.4 serial protocol
//! for microcontrollers that cannot commit a hardware UART to 1200 baud 7E1
//! on a single half-duplex, inverse-logic data line.
//!
//! The transceiver is pure software:
//! - `embedded-hal` traits for the data pin and coarse delays
//! - bit-banged transmit with tick-polled timing and an interrupt-free
//!   window around the timing-critical bits
//! - receive decoding from pin-change interrupts alone, tolerant of
//!   back-to-back characters and arbitrary idle gaps
//! - interrupt-safe singleton state via `critical-section`
//!
//! On top of the transceiver sit the SDI-12 command parser, the CRC-16
//! codec with its printable three-character encoding, and data-value
//! formatting helpers for device-side firmware.
//!
//! ## Crate features
//! | Feature                         | Description |
//! |---------------------------------|-------------|
//! | `std`                           | Disables `#![no_std]`, mainly for host-side tests |
//! | `parity-check`                  | Verify received parity bits and latch failures |
//! | `tx-critical-section` (default) | Disable interrupts around timing-critical transmit bits |
//! | `defmt-0-3`                     | `defmt` logging |
//! | `log`                           | `log` logging |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sdi12_modem::driver::Sdi12Driver;
//!
//! let mut bus = Sdi12Driver::new(data_pin, timer);
//! bus.begin();
//! bus.send_command("0M!");
//! let response = bus.read_string_until('\n');
//! ```
//!
//! Interrupt wiring goes through the singleton macros; see [`isr`].
//!
//! ## Integration Notes
//!
//! - The platform must deliver "line changed" events (pin-change interrupt,
//!   EXTI, etc.) to [`sdi12_line_change!`] and implement
//!   [`timer::Sdi12Timer`] for a free-running counter.
//! - Only one driver instance is serviced by the interrupt at a time;
//!   switching instances is an explicit hand-off
//!   ([`driver::Sdi12Driver::force_hold`] then
//!   [`driver::Sdi12Driver::set_active`]).
//! - Sensors answer within 15 ms of a command; the default read timeout of
//!   150 ms leaves generous margin before the stream helpers give up.
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded
//! environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

pub use critical_section;

pub use heapless;

/// Internal trace logging, routed to `defmt` or `log` when one of those
/// features is enabled and compiled out otherwise.
macro_rules! sdi12_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt-0-3")]
        defmt::trace!($($arg)*);
        #[cfg(all(feature = "log", not(feature = "defmt-0-3")))]
        log::trace!($($arg)*);
        #[cfg(not(any(feature = "defmt-0-3", feature = "log")))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

pub mod buffer;
pub mod consts;
pub mod crc;
pub mod decoder;
pub mod driver;
pub mod format;
pub mod isr;
pub mod parser;
pub mod timer;
