//! Echo edge capture
//!
//! The sensor raises the echo line when the ultrasonic burst leaves and drops
//! it when the reflection arrives, so one measurement is a rising edge
//! followed by a falling edge. The interrupt side records the rising
//! timestamp and publishes the completed pair on the falling edge; the
//! measuring side waits for the published pair. Readiness and timestamps
//! travel together in a single slot, so a waiter can never observe a stale
//! pair from a previous cycle.

use core::cell::Cell;
use core::convert::Infallible;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;
use embedded_hal::digital::Error as _;
use embedded_hal_async::digital::Wait;

use crate::Error;

/// One completed rising-to-falling echo cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EchoPulse {
    pub start: Instant,
    pub end: Instant,
}

impl EchoPulse {
    /// Time the echo line was held high.
    pub fn width(&self) -> embassy_time::Duration {
        self.end - self.start
    }
}

/// Single slot connecting the echo line interrupt to the waiting measurement.
///
/// The producer side ([`rising`](Self::rising) and [`falling`](Self::falling))
/// performs only bounded, non-blocking work and may be called from interrupt
/// context. Exactly one waiter is supported, which the measurement engine
/// guarantees.
pub struct EchoCapture {
    rise: Mutex<CriticalSectionRawMutex, Cell<Option<Instant>>>,
    pulse: Signal<CriticalSectionRawMutex, EchoPulse>,
}

impl EchoCapture {
    pub const fn new() -> Self {
        Self {
            rise: Mutex::new(Cell::new(None)),
            pulse: Signal::new(),
        }
    }

    /// Record the rising edge of the echo line.
    ///
    /// A second rising edge without an intervening falling edge is treated as
    /// line noise and overwrites the recorded start.
    pub fn rising(&self, timestamp: Instant) {
        self.rise.lock(|cell| cell.set(Some(timestamp)));
    }

    /// Record the falling edge of the echo line and wake the waiter.
    ///
    /// A falling edge with no recorded rising edge cannot form a pair and is
    /// dropped.
    pub fn falling(&self, timestamp: Instant) {
        if let Some(start) = self.rise.lock(|cell| cell.take()) {
            self.pulse.signal(EchoPulse {
                start,
                end: timestamp,
            });
        }
    }

    /// Discard any partially or fully captured cycle before arming a new
    /// measurement.
    pub fn reset(&self) {
        self.rise.lock(|cell| cell.set(None));
        self.pulse.reset();
    }

    /// Wait for a completed echo cycle.
    pub async fn wait(&self) -> EchoPulse {
        self.pulse.wait().await
    }

    /// Feed the capture from an async edge-wait pin.
    ///
    /// This is the fallback for targets where the echo line interrupt cannot
    /// invoke [`rising`](Self::rising) and [`falling`](Self::falling)
    /// directly. Timestamps are taken when the edge future resolves, so a
    /// task-level scheduling delay adds to the measured pulse.
    pub async fn monitor<P: Wait>(&self, pin: &mut P) -> Result<Infallible, Error> {
        loop {
            pin.wait_for_rising_edge()
                .await
                .map_err(|e| Error::Echo(e.kind()))?;
            self.rising(Instant::now());

            pin.wait_for_falling_edge()
                .await
                .map_err(|e| Error::Echo(e.kind()))?;
            self.falling(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use embassy_time::Duration;
    use embedded_hal_async_mocks::digital::{MockWaitPin, PinError};
    use futures::{pin_mut, poll};
    use mockall::Sequence;

    use super::*;

    #[tokio::test]
    async fn completed_cycle_wakes_waiter() {
        let capture = EchoCapture::new();

        let start = Instant::now();
        capture.rising(start);
        capture.falling(start + Duration::from_micros(5883));

        let pulse = capture.wait().await;
        assert_eq!(Duration::from_micros(5883), pulse.width());
    }

    #[tokio::test]
    async fn repeated_rising_edge_overwrites_start() {
        let capture = EchoCapture::new();

        let glitch = Instant::now();
        let start = glitch + Duration::from_micros(100);
        capture.rising(glitch);
        capture.rising(start);
        capture.falling(start + Duration::from_micros(200));

        let pulse = capture.wait().await;
        assert_eq!(start, pulse.start);
        assert_eq!(Duration::from_micros(200), pulse.width());
    }

    #[tokio::test]
    async fn falling_edge_without_rising_is_dropped() {
        let capture = EchoCapture::new();

        capture.falling(Instant::now());

        let wait = capture.wait();
        pin_mut!(wait);
        assert!(poll!(&mut wait).is_pending());
    }

    #[tokio::test]
    async fn reset_discards_stale_cycle() {
        let capture = EchoCapture::new();

        let start = Instant::now();
        capture.rising(start);
        capture.falling(start + Duration::from_micros(100));
        capture.reset();

        let wait = capture.wait();
        pin_mut!(wait);
        assert!(poll!(&mut wait).is_pending());

        // A cycle after the reset is captured as usual.
        capture.rising(start);
        capture.falling(start + Duration::from_micros(300));
        let pulse = wait.await;
        assert_eq!(Duration::from_micros(300), pulse.width());
    }

    #[tokio::test]
    async fn reset_discards_pending_rising_edge() {
        let capture = EchoCapture::new();

        capture.rising(Instant::now());
        capture.reset();
        capture.falling(Instant::now());

        let wait = capture.wait();
        pin_mut!(wait);
        assert!(poll!(&mut wait).is_pending());
    }

    #[tokio::test]
    async fn monitor_feeds_capture_and_propagates_pin_fault() {
        let mut seq = Sequence::new();
        let mut pin = MockWaitPin::new();
        pin.expect_wait_for_rising_edge()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(Ok(()));
        pin.expect_wait_for_falling_edge()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(Ok(()));
        pin.expect_wait_for_rising_edge()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(Err(PinError));

        let capture = EchoCapture::new();
        let result = capture.monitor(&mut pin).await;

        assert!(matches!(result, Err(Error::Echo(_))));
        // The completed cycle was published before the fault.
        capture.wait().await;
    }
}
