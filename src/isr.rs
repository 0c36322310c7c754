//! Singleton glue between the driver and the platform's pin-change interrupt.
//!
//! Interrupt vectors cannot capture state, so the driver instance serving
//! the line lives in a `critical_section`-guarded static the vector can
//! reach. This module provides the helpers and macros that declare, fill
//! and dispatch into that static; the platform crate only has to route its
//! pin-change interrupt to [`sdi12_line_change!`].
//!
//! ```rust,ignore
//! use sdi12_modem::{init_sdi12_driver, setup_sdi12_driver, sdi12_line_change};
//!
//! init_sdi12_driver!(DataPin, BoardTimer);
//!
//! fn main() {
//!     setup_sdi12_driver!(data_pin, BoardTimer::new());
//!     // ...
//! }
//!
//! #[interrupt]
//! fn PCINT0() {
//!     sdi12_line_change!();
//! }
//! ```

use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::driver::Sdi12Driver;
use crate::timer::Sdi12Timer;

/// Creates the empty global driver slot.
///
/// Usually invoked through [`init_sdi12_driver!`](crate::init_sdi12_driver).
pub const fn global_sdi12_driver_init<P, T>() -> Mutex<RefCell<Option<Sdi12Driver<P, T>>>>
where
    P: InputPin + OutputPin,
    T: Sdi12Timer,
{
    Mutex::new(RefCell::new(None))
}

/// Builds a driver from `pin` and `timer`, starts it with
/// [`begin`](Sdi12Driver::begin), and parks it in the global slot.
pub fn global_sdi12_driver_setup<P, T>(
    slot: &'static Mutex<RefCell<Option<Sdi12Driver<P, T>>>>,
    pin: P,
    timer: T,
) where
    P: InputPin + OutputPin,
    T: Sdi12Timer,
{
    critical_section::with(|cs| {
        let mut driver = Sdi12Driver::new(pin, timer);
        driver.begin();
        let _ = slot.borrow(cs).replace(Some(driver));
    });
}

/// Routes one pin-change interrupt into the driver in the global slot.
///
/// Does nothing when the slot has not been set up, so it is safe to wire
/// the vector before initialization.
pub fn global_sdi12_line_change<P, T>(slot: &'static Mutex<RefCell<Option<Sdi12Driver<P, T>>>>)
where
    P: InputPin + OutputPin,
    T: Sdi12Timer,
{
    critical_section::with(|cs| {
        if let Some(driver) = slot.borrow(cs).borrow_mut().as_mut() {
            driver.on_line_change();
        }
    });
}

/// Declares the static global `SDI12_DRIVER` slot for the given pin and
/// timer types.
///
/// # Example
/// ```rust,ignore
/// init_sdi12_driver!(MyDataPin, MyTimer);
/// ```
#[macro_export]
macro_rules! init_sdi12_driver {
    ( $pin:ty, $timer:ty ) => {
        /// Global slot holding the SDI-12 driver serving the pin-change
        /// interrupt.
        pub static SDI12_DRIVER: $crate::critical_section::Mutex<
            core::cell::RefCell<Option<$crate::driver::Sdi12Driver<$pin, $timer>>>,
        > = $crate::critical_section::Mutex::new(core::cell::RefCell::new(None));
    };
}

/// Fills the global `SDI12_DRIVER` slot declared with
/// [`init_sdi12_driver!`](crate::init_sdi12_driver) and starts the bus.
///
/// # Example
/// ```rust,ignore
/// setup_sdi12_driver!(data_pin, BoardTimer::new());
/// ```
#[macro_export]
macro_rules! setup_sdi12_driver {
    ( $pin:expr, $timer:expr ) => {
        $crate::isr::global_sdi12_driver_setup(&SDI12_DRIVER, $pin, $timer)
    };
}

/// Forwards a pin-change interrupt to the global `SDI12_DRIVER`.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn PCINT0() {
///     sdi12_line_change!();
/// }
/// ```
#[macro_export]
macro_rules! sdi12_line_change {
    () => {
        $crate::isr::global_sdi12_line_change(&SDI12_DRIVER)
    };
}

#[cfg(test)]
mod tests {
    use crate::testutil::{bus_lock, TestTimer};
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    init_sdi12_driver!(PinMock, TestTimer);

    #[test]
    fn test_global_slot_receives_through_isr() {
        let _lock = bus_lock();
        // begin (holding), force_listen, then the edges of '0' on the wire
        // at 64 us ticks plus a flushing start bit.
        let edges = [
            (0u16, PinState::High),
            (65, PinState::Low),
            (91, PinState::High),
            (117, PinState::Low),
            (900, PinState::High),
        ];
        let mut transactions = vec![
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::Low),
        ];
        transactions.extend(edges.iter().map(|&(_, level)| PinTransaction::get(level)));

        setup_sdi12_driver!(PinMock::new(&transactions), TestTimer::avr16());
        critical_section::with(|cs| {
            let mut slot = SDI12_DRIVER.borrow(cs).borrow_mut();
            slot.as_mut().unwrap().force_listen();
        });
        for (t, _) in edges {
            critical_section::with(|cs| {
                let mut slot = SDI12_DRIVER.borrow(cs).borrow_mut();
                slot.as_mut().unwrap().timer.set_now(t);
            });
            sdi12_line_change!();
        }
        let mut driver = critical_section::with(|cs| SDI12_DRIVER.borrow(cs).replace(None))
            .expect("driver was set up");
        assert_eq!(driver.read(), Ok(b'0'));
        driver.pin.done();
    }

    #[test]
    fn test_dispatch_without_setup_is_noop() {
        let _lock = bus_lock();
        // The previous test drained the slot; dispatching into the empty
        // slot must simply do nothing.
        critical_section::with(|cs| {
            let _ = SDI12_DRIVER.borrow(cs).replace(None);
        });
        sdi12_line_change!();
    }
}
