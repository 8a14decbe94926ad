//! Software wall clock and the monotonic time base every interval check in
//! the crate is built on.
//!
//! There is no RTC on the board. Time of day is derived from the monotonic
//! millisecond counter plus a user-set calibration offset, so the clock is
//! drift-free relative to the counter and survives as long as power does.

const SECONDS_PER_DAY: i64 = 86_400;

/// Monotonic millisecond counter value supplied by the host each tick.
///
/// The counter wraps at the platform word size; interval math must go
/// through [`elapsed_ms`] so the wrap stays harmless.
pub type Millis = u32;

/// Wraparound-safe milliseconds elapsed between two counter snapshots.
pub fn elapsed_ms(now: Millis, since: Millis) -> u32 {
    now.wrapping_sub(since)
}

/// Time of day maintained from the monotonic counter.
#[derive(Debug, Clone, Default)]
pub struct WallClock {
    /// Seconds added to `counter / 1000` to obtain wall time. Normalised to
    /// `[0, 86400)` so the persisted value is always non-negative.
    calibration_offset: i32,
    seconds_of_day: u32,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the displayed time from the monotonic counter. Call once
    /// per loop iteration.
    pub fn tick(&mut self, now: Millis) {
        let total = i64::from(now / 1000) + i64::from(self.calibration_offset);
        self.seconds_of_day = total.rem_euclid(SECONDS_PER_DAY) as u32;
    }

    /// Sets the wall time; an immediate [`tick`](Self::tick) with the same
    /// counter value reproduces exactly this reading.
    pub fn set_time(&mut self, hours: u8, minutes: u8, now: Millis) {
        let hours = i64::from(hours % 24);
        let minutes = i64::from(minutes % 60);
        let target = hours * 3600 + minutes * 60;

        let counter_seconds = i64::from(now / 1000);
        self.calibration_offset = (target - counter_seconds).rem_euclid(SECONDS_PER_DAY) as i32;
        self.tick(now);
    }

    /// Installs a previously persisted offset and re-derives the display.
    pub fn set_calibration_offset(&mut self, offset: i32, now: Millis) {
        self.calibration_offset = offset;
        self.tick(now);
    }

    /// Offset for the host to persist.
    pub fn calibration_offset(&self) -> i32 {
        self.calibration_offset
    }

    pub fn seconds_of_day(&self) -> u32 {
        self.seconds_of_day
    }

    pub fn hours(&self) -> u8 {
        (self.seconds_of_day / 3600) as u8
    }

    pub fn minutes(&self) -> u8 {
        (self.seconds_of_day % 3600 / 60) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_survives_counter_wrap() {
        assert_eq!(elapsed_ms(10, u32::MAX - 9), 20);
        assert_eq!(elapsed_ms(500, 200), 300);
    }

    #[test]
    fn set_time_round_trips_through_tick() {
        let mut clock = WallClock::new();
        clock.set_time(13, 45, 5_000);
        clock.tick(5_000);
        assert_eq!(clock.hours(), 13);
        assert_eq!(clock.minutes(), 45);
    }

    #[test]
    fn advances_with_the_counter() {
        let mut clock = WallClock::new();
        clock.set_time(13, 45, 5_000);
        // One hour, one minute and one second later.
        clock.tick(5_000 + 3_661_000);
        assert_eq!(clock.hours(), 14);
        assert_eq!(clock.minutes(), 46);
        assert_eq!(clock.seconds_of_day() % 60, 1);
    }

    #[test]
    fn wraps_past_midnight() {
        let mut clock = WallClock::new();
        clock.set_time(23, 59, 0);
        clock.tick(120_000);
        assert_eq!(clock.hours(), 0);
        assert_eq!(clock.minutes(), 1);
    }

    #[test]
    fn offset_is_stored_non_negative() {
        let mut clock = WallClock::new();
        // Counter well past the requested time of day.
        clock.set_time(0, 10, 90_000_000);
        assert!(clock.calibration_offset() >= 0);
        assert!(clock.calibration_offset() < SECONDS_PER_DAY as i32);
        assert_eq!(clock.hours(), 0);
        assert_eq!(clock.minutes(), 10);
    }

    #[test]
    fn rehydrated_offset_restores_the_display() {
        let mut clock = WallClock::new();
        clock.set_time(8, 30, 1_000);
        let offset = clock.calibration_offset();

        let mut restored = WallClock::new();
        restored.set_calibration_offset(offset, 1_000);
        assert_eq!(restored.hours(), 8);
        assert_eq!(restored.minutes(), 30);
    }

    #[test]
    fn negative_persisted_offset_is_corrected_by_floored_modulo() {
        let mut clock = WallClock::new();
        clock.set_calibration_offset(-60, 0);
        assert_eq!(clock.hours(), 23);
        assert_eq!(clock.minutes(), 59);
    }
}
