//! Audio level sensing and beat detection.
//!
//! The Bluetooth stack owns the audio transport; the only view this module
//! has of the signal is an analog proxy tapped from the amplifier output and
//! sampled by the host once per loop iteration. The raw reading is smoothed,
//! rescaled onto a display-friendly 0–100 range, and watched for transient
//! spikes above its own rolling average.

use crate::clock::{elapsed_ms, Millis};
use crate::config::{
    ADC_MAX, BEAT_LEVEL_FLOOR, BEAT_REFRACTORY_MS, BEAT_WINDOW, DEFAULT_AUDIO_THRESHOLD,
    SMOOTHING_FACTOR,
};
use crate::ring::Ring;

/// Per-tick audio feature extractor: smoothed level, decaying peak and a
/// relative-threshold beat flag.
#[derive(Debug, Clone)]
pub struct AudioSense {
    threshold: u16,
    raw_level: u16,
    level: u16,
    peak_level: u16,
    history: Ring<u16, BEAT_WINDOW>,
    average: u16,
    last_beat: Millis,
    beat: bool,
}

impl AudioSense {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_AUDIO_THRESHOLD)
    }

    pub fn with_threshold(threshold: u16) -> Self {
        let mut sense = Self {
            threshold: DEFAULT_AUDIO_THRESHOLD,
            raw_level: 0,
            level: 0,
            peak_level: 0,
            history: Ring::new(),
            average: 0,
            last_beat: 0,
            beat: false,
        };
        sense.set_threshold(threshold);
        sense
    }

    /// Consumes one raw sense reading. Call once per loop iteration with the
    /// current monotonic counter value.
    pub fn tick(&mut self, raw_sample: u16, now: Millis) {
        self.update_level(raw_sample);
        self.detect_beat(now);
    }

    /// Sets the silence threshold. Zero is not a usable floor and falls back
    /// to the default.
    pub fn set_threshold(&mut self, threshold: u16) {
        self.threshold = if threshold == 0 {
            DEFAULT_AUDIO_THRESHOLD
        } else {
            threshold
        };
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// Smoothed display level in `[0, 100]`.
    pub fn level(&self) -> u16 {
        self.level
    }

    /// Smoothed raw reading, before thresholding. Used by the silence
    /// calibration flow to snapshot ambient noise.
    pub fn raw_level(&self) -> u16 {
        self.raw_level
    }

    /// Decaying peak of the raw reading.
    pub fn peak_level(&self) -> u16 {
        self.peak_level
    }

    /// Rolling average the beat threshold is derived from.
    pub fn average(&self) -> u16 {
        self.average
    }

    /// Whether this tick's evaluation detected a beat. The flag is computed
    /// fresh every tick; only the refractory timestamp carries history.
    pub fn beat(&self) -> bool {
        self.beat
    }

    fn update_level(&mut self, raw_sample: u16) {
        let smoothed = SMOOTHING_FACTOR * f32::from(self.raw_level)
            + (1.0 - SMOOTHING_FACTOR) * f32::from(raw_sample);
        self.raw_level = smoothed as u16;

        let above_floor = u32::from(self.raw_level).saturating_sub(u32::from(self.threshold));
        let span = u32::from(ADC_MAX).saturating_sub(u32::from(self.threshold)).max(1);
        self.level = (above_floor * 100 / span).min(100) as u16;

        // Peak rises instantly, decays one percent per tick.
        let decayed = (f32::from(self.peak_level) * 0.99) as u16;
        self.peak_level = self.raw_level.max(decayed);
    }

    fn detect_beat(&mut self, now: Millis) {
        self.history.push(self.level);
        let sum: u32 = self.history.iter_oldest_first().map(u32::from).sum();
        self.average = (sum / self.history.len() as u32) as u16;

        // A beat is a level half again above its own rolling average, so the
        // detector tracks ambient loudness instead of needing per-track
        // calibration.
        let beat_threshold = self.average + self.average / 2;

        self.beat = if self.level > beat_threshold && self.level > BEAT_LEVEL_FLOOR {
            if elapsed_ms(now, self.last_beat) > BEAT_REFRACTORY_MS {
                self.last_beat = now;
                true
            } else {
                false
            }
        } else {
            false
        };
    }
}

impl Default for AudioSense {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Raw reading that settles the display level near `target` with the
    /// default threshold.
    fn raw_for_level(target: u16) -> u16 {
        DEFAULT_AUDIO_THRESHOLD + (u32::from(target) * 3583 / 100) as u16
    }

    #[test]
    fn smoothing_converges_on_a_steady_input() {
        let mut sense = AudioSense::new();
        let mut now = 0;
        for _ in 0..60 {
            now += 50;
            sense.tick(raw_for_level(50), now);
        }
        assert!((45..=51).contains(&sense.level()), "level {}", sense.level());
    }

    #[test]
    fn level_is_clamped_to_one_hundred() {
        let mut sense = AudioSense::new();
        let mut now = 0;
        for _ in 0..100 {
            now += 50;
            sense.tick(u16::MAX, now);
        }
        assert_eq!(sense.level(), 100);
    }

    #[test]
    fn peak_rises_instantly_and_decays_slowly() {
        let mut sense = AudioSense::new();
        sense.tick(4095, 50);
        let after_spike = sense.peak_level();
        assert_eq!(after_spike, sense.raw_level());

        for i in 0..20 {
            sense.tick(0, 100 + i * 50);
        }
        assert!(sense.peak_level() < after_spike);
        assert!(sense.peak_level() > 0);
    }

    #[test]
    fn quiet_constant_input_never_beats() {
        let mut sense = AudioSense::new();
        let mut now = 0;
        // Steady level around 10: below the floor and with no variance to
        // exceed its own average.
        for _ in 0..3 * BEAT_WINDOW {
            now += 50;
            sense.tick(raw_for_level(10), now);
            assert!(!sense.beat());
        }
    }

    #[test]
    fn spike_beats_once_then_clears_inside_refractory() {
        let mut sense = AudioSense::new();
        let mut now = 0;
        for _ in 0..2 * BEAT_WINDOW {
            now += 50;
            sense.tick(raw_for_level(10), now);
        }

        now += 50;
        sense.tick(4095, now);
        assert!(sense.beat(), "spike above 1.5x average should register");

        // The spike persists but the refractory window has not elapsed.
        now += 50;
        sense.tick(4095, now);
        assert!(!sense.beat());
    }

    #[test]
    fn refractory_window_is_the_only_memory() {
        let mut sense = AudioSense::new();
        let mut now = 0;
        for _ in 0..2 * BEAT_WINDOW {
            now += 50;
            sense.tick(raw_for_level(10), now);
        }
        now += 50;
        sense.tick(4095, now);
        assert!(sense.beat());

        // Still loud once the refractory window elapses: the flag fires
        // again. Sustained loud audio flickers at roughly the refractory
        // rate; that behaviour is intentional.
        now += 110;
        sense.tick(4095, now);
        assert!(sense.beat());
    }

    #[test]
    fn beats_stop_once_the_level_decays_below_the_floor() {
        let mut sense = AudioSense::new();
        let mut now = 0;
        for _ in 0..2 * BEAT_WINDOW {
            now += 50;
            sense.tick(4095, now);
        }
        for _ in 0..12 {
            now += 200;
            sense.tick(0, now);
        }
        assert!(sense.level() <= BEAT_LEVEL_FLOOR);
        assert!(!sense.beat());
    }

    #[test]
    fn zero_threshold_falls_back_to_default() {
        let mut sense = AudioSense::with_threshold(0);
        assert_eq!(sense.threshold(), DEFAULT_AUDIO_THRESHOLD);
        sense.set_threshold(0);
        assert_eq!(sense.threshold(), DEFAULT_AUDIO_THRESHOLD);
        sense.set_threshold(800);
        assert_eq!(sense.threshold(), 800);
    }
}
