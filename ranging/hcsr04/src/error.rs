use embassy_time::Duration;
use embedded_hal::digital;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Another measurement is already in progress.
    Busy,
    /// The minimum interval since the last accepted measurement has not yet
    /// elapsed. `retry_after` is the remaining part of that interval.
    TooSoon { retry_after: Duration },
    /// No falling echo edge was seen within the echo timeout.
    EchoTimeout,
    /// A reader has already been handed out and not yet dropped.
    AlreadyTaken,
    /// The trigger line could not be driven.
    Trigger(digital::ErrorKind),
    /// The echo line failed while waiting for an edge.
    Echo(digital::ErrorKind),
    /// The caller's buffer cannot hold a 4 byte range value.
    BufferTooSmall,
}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Error::EchoTimeout => embedded_io::ErrorKind::TimedOut,
            Error::BufferTooSmall => embedded_io::ErrorKind::InvalidInput,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}
