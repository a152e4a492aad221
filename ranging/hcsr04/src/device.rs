//! Measurement engine
//!
//! A measurement is one pass through: try-acquire the engine, check the
//! minimum interval, arm the capture, pulse the trigger line, wait for the
//! echo pair, convert to millimeters. The engine lock is a try-lock so a
//! second caller is rejected immediately instead of queued, and the lock
//! guard releases on every exit path including timeout and cancellation.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{block_for, with_timeout, Duration, Instant};
use embedded_hal::digital::{Error as _, OutputPin};

use crate::{range, EchoCapture, Error};

/// Minimum interval between the start times of two accepted measurements.
/// The sensor needs the settling time between bursts.
pub const MIN_MEASUREMENT_INTERVAL: Duration = Duration::from_millis(60);

/// Maximum time to wait for the falling echo edge once triggered.
pub const ECHO_TIMEOUT: Duration = Duration::from_millis(100);

/// Minimum trigger pulse width accepted by the sensor.
pub const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// HC-SR04 device.
///
/// Owns the trigger line and the rate-limit baseline; the echo capture is
/// shared with the interrupt side and therefore borrowed.
pub struct HcSr04<'a, M: RawMutex, Trig: OutputPin> {
    engine: Mutex<M, Engine<Trig>>,
    capture: &'a EchoCapture,
    opened: AtomicBool,
}

struct Engine<Trig> {
    trigger: Trig,
    last_measurement: Option<Instant>,
}

impl<'a, M: RawMutex, Trig: OutputPin> HcSr04<'a, M, Trig> {
    /// Create the device and drive the trigger line to its inactive level.
    ///
    /// A trigger line that cannot be driven makes the device inoperable, so
    /// the fault is raised here and not on each pulse.
    pub fn new(mut trigger: Trig, capture: &'a EchoCapture) -> Result<Self, Error> {
        trigger.set_low().map_err(|e| Error::Trigger(e.kind()))?;

        Ok(Self {
            engine: Mutex::new(Engine {
                trigger,
                last_measurement: None,
            }),
            capture,
            opened: AtomicBool::new(false),
        })
    }

    /// Perform one measurement and return the distance in millimeters.
    ///
    /// Fails with [`Error::Busy`] while another measurement is in flight and
    /// with [`Error::TooSoon`] within [`MIN_MEASUREMENT_INTERVAL`] of the
    /// last accepted measurement; neither fires the trigger. Cancelling the
    /// returned future releases the engine for the next caller.
    pub async fn read_range_mm(&self) -> Result<u32, Error> {
        let mut engine = self.engine.try_lock().map_err(|_| Error::Busy)?;

        let now = Instant::now();
        if let Some(last) = engine.last_measurement {
            let since = now - last;
            if since < MIN_MEASUREMENT_INTERVAL {
                warn!(
                    "measurement rejected, only {} ms since the last one",
                    since.as_millis()
                );
                return Err(Error::TooSoon {
                    retry_after: MIN_MEASUREMENT_INTERVAL - since,
                });
            }
        }

        // The baseline moves for every accepted measurement, even if no echo
        // arrives below.
        engine.last_measurement = Some(now);

        // Arm the capture before the pulse so an edge can never race the wait.
        self.capture.reset();
        engine.pulse_trigger()?;

        let pulse = with_timeout(ECHO_TIMEOUT, self.capture.wait())
            .await
            .map_err(|_| {
                warn!("no echo within {} ms", ECHO_TIMEOUT.as_millis());
                Error::EchoTimeout
            })?;

        let range = range::range_mm(pulse.width());
        debug!(
            "echo high for {} us, range {} mm",
            pulse.width().as_micros(),
            range
        );
        Ok(range)
    }

    /// Take the single reader handle for the device.
    ///
    /// Only one reader exists at a time; it becomes available again when the
    /// returned handle is dropped. This exclusivity is layered above the
    /// per-measurement engine lock, which rejects concurrent measurements on
    /// its own.
    pub fn open(&self) -> Result<Reader<'_, 'a, M, Trig>, Error> {
        self.opened
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .map_err(|_| Error::AlreadyTaken)?;

        info!("reader opened");
        Ok(Reader { device: self })
    }

    /// Tear the device down, forcing the trigger line low, and return the pin.
    pub fn release(self) -> Trig {
        let mut trigger = self.engine.into_inner().trigger;
        trigger.set_low().ok();
        trigger
    }
}

impl<Trig: OutputPin> Engine<Trig> {
    fn pulse_trigger(&mut self) -> Result<(), Error> {
        self.trigger.set_high().map_err(|e| Error::Trigger(e.kind()))?;
        // Busy wait; at this timescale a timer suspension would stretch the
        // pulse by orders of magnitude.
        block_for(TRIGGER_PULSE);
        self.trigger.set_low().map_err(|e| Error::Trigger(e.kind()))
    }
}

/// Exclusive reader handle, see [`HcSr04::open`].
pub struct Reader<'d, 'a, M: RawMutex, Trig: OutputPin> {
    device: &'d HcSr04<'a, M, Trig>,
}

impl<M: RawMutex, Trig: OutputPin> Reader<'_, '_, M, Trig> {
    pub async fn read_range_mm(&mut self) -> Result<u32, Error> {
        self.device.read_range_mm().await
    }
}

impl<M: RawMutex, Trig: OutputPin> Drop for Reader<'_, '_, M, Trig> {
    fn drop(&mut self) {
        self.device.opened.store(false, Ordering::Release);
        info!("reader released");
    }
}

impl<M: RawMutex, Trig: OutputPin> embedded_io_async::ErrorType for Reader<'_, '_, M, Trig> {
    type Error = Error;
}

impl<M: RawMutex, Trig: OutputPin> embedded_io_async::Read for Reader<'_, '_, M, Trig> {
    /// Measure once and deliver the millimeter value as 4 bytes in host byte
    /// order. Every call is an independent measurement, there is no stream
    /// position. An empty buffer reads zero bytes without triggering a
    /// measurement.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if buf.len() < 4 {
            return Err(Error::BufferTooSmall);
        }

        let range = self.device.read_range_mm().await?;
        buf[..4].copy_from_slice(&range.to_ne_bytes());
        Ok(4)
    }
}
