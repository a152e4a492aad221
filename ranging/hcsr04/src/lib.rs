//! HC-SR04 ultrasonic distance sensor driver.
//!
//! The sensor measures distance by timing an echo pulse: a ≥10 µs pulse on
//! the trigger line starts a measurement, and the length of the following
//! high period on the echo line encodes the round trip time of the
//! ultrasonic burst.
//!
//! The echo edges are captured with timestamps by [`EchoCapture`], either
//! directly from the echo line interrupt or through the async
//! [`EchoCapture::monitor`] fallback. [`HcSr04`] turns captured pulses into
//! millimeter readings, one measurement in flight at a time and no more than
//! one per 60 ms.
//!
//! ```ignore
//! static CAPTURE: EchoCapture = EchoCapture::new();
//!
//! // From the echo line interrupt handler:
//! // CAPTURE.rising(Instant::now()) on the rising edge,
//! // CAPTURE.falling(Instant::now()) on the falling edge.
//!
//! let sensor: HcSr04<NoopRawMutex, _> = HcSr04::new(trigger_pin, &CAPTURE)?;
//! let mut reader = sensor.open()?;
//! loop {
//!     match reader.read_range_mm().await {
//!         Ok(mm) => info!("range: {} mm", mm),
//!         // All three clear up on their own; retry after a short delay.
//!         Err(Error::Busy | Error::TooSoon { .. } | Error::EchoTimeout) => {}
//!         Err(e) => return Err(e),
//!     }
//!     Timer::after_millis(100).await;
//! }
//! ```

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

mod capture;
mod device;
mod error;
mod range;

pub use capture::{EchoCapture, EchoPulse};
pub use device::{HcSr04, Reader, ECHO_TIMEOUT, MIN_MEASUREMENT_INTERVAL, TRIGGER_PULSE};
pub use error::Error;
pub use range::range_mm;

#[cfg(all(test, feature = "defmt"))]
mod tests {
    //! This module is required in order to satisfy the requirements of defmt, while running tests.
    //! Note that this will cause all log `defmt::` log statements to be thrown away.

    #[defmt::global_logger]
    struct GlobalLogger;

    unsafe impl defmt::Logger for GlobalLogger {
        fn acquire() {}
        unsafe fn flush() {}
        unsafe fn release() {}
        unsafe fn write(_bytes: &[u8]) {}
    }

    defmt::timestamp!("");

    #[defmt::panic_handler]
    fn panic() -> ! {
        panic!()
    }
}
