use embassy_time::Duration;

/// Speed of sound in air in m/s.
const SPEED_OF_SOUND: u64 = 340;

/// Convert the time the echo line was held high into a distance in mm.
///
/// The echo pulse covers the round trip, so the elapsed time is halved:
/// `range_mm = echo_high_us * 340 / 2 / 1000`, truncating.
///
/// No plausibility bounds are applied; a spuriously short or long pulse
/// passes through unmodified.
pub const fn range_mm(echo_high: Duration) -> u32 {
    (echo_high.as_micros() * SPEED_OF_SOUND / 2 / 1000) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_meter_round_trip() {
        // 2 m of round trip takes 5883 us at 340 m/s.
        assert_eq!(1000, range_mm(Duration::from_micros(5883)));
    }

    #[test]
    fn division_truncates() {
        assert_eq!(999, range_mm(Duration::from_micros(5882)));
        assert_eq!(0, range_mm(Duration::from_micros(5)));
    }

    #[test]
    fn no_pulse_is_zero_range() {
        assert_eq!(0, range_mm(Duration::from_ticks(0)));
    }

    #[test]
    fn pure_function() {
        let pulse = Duration::from_micros(1234);
        assert_eq!(range_mm(pulse), range_mm(pulse));
    }
}
