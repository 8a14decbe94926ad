//! Compile-time tunables for the receiver core.
//!
//! There is deliberately no runtime configuration system. Every knob is a
//! constant, so the persisted settings stay the only mutable state.

// ---- Matrix geometry --------------------------------------------------------

/// Mouth display width in columns (three 8x8 panels side by side).
pub const MOUTH_WIDTH: usize = 24;
/// Width of a single eye panel in columns.
pub const EYE_WIDTH: u8 = 8;
/// Height of every panel in rows.
pub const MATRIX_HEIGHT: u8 = 8;
/// Total chained panels: three mouth panels followed by the two eyes.
pub const PANEL_COUNT: usize = 5;

// ---- Value ranges -----------------------------------------------------------

/// Maximum volume step.
pub const MAX_VOLUME: u8 = 21;
/// Maximum per-panel brightness step.
pub const MAX_BRIGHTNESS: u8 = 15;
/// Number of selectable audio modes.
pub const AUDIO_MODE_COUNT: u8 = 4;
/// Number of selectable visual effects.
pub const VISUAL_EFFECT_COUNT: u8 = 3;

// ---- Timing (milliseconds) --------------------------------------------------

/// Clock view refresh interval.
pub const CLOCK_UPDATE_INTERVAL_MS: u32 = 1000;
/// Waveform redraw interval while the face view is live.
pub const AUDIO_UPDATE_INTERVAL_MS: u32 = 50;
/// Eye animation frame interval.
pub const EYE_ANIMATION_INTERVAL_MS: u32 = 100;
/// Inactivity timeout that abandons the calibration and time-edit flows.
pub const CALIBRATION_TIMEOUT_MS: u32 = 10_000;
/// Window in which further clicks extend a pending click burst.
pub const CLICK_BURST_TIMEOUT_MS: u32 = 1000;
/// Minimum spacing between two detected beats.
pub const BEAT_REFRACTORY_MS: u32 = 100;
/// How long a transient status overlay stays on screen.
pub const OVERLAY_LINGER_MS: u32 = 2000;

// ---- Audio sensing ----------------------------------------------------------

/// Silence threshold applied to the smoothed sense reading.
pub const DEFAULT_AUDIO_THRESHOLD: u16 = 512;
/// Full-scale value of the analog sense input.
pub const ADC_MAX: u16 = 4095;
/// Number of smoothed levels kept for the rolling beat average.
pub const BEAT_WINDOW: usize = 20;
/// Weight of the previous reading in the exponential smoother.
pub const SMOOTHING_FACTOR: f32 = 0.7;
/// Levels at or below this never count as a beat.
pub const BEAT_LEVEL_FLOOR: u16 = 20;

// ---- Output gain ------------------------------------------------------------

/// Default digital attenuation applied to outgoing samples. Kept well under
/// unity because desktop sources drive the DAC noticeably hotter than phones.
pub const DEFAULT_GAIN_FACTOR: f32 = 0.3;

// ---- First-boot settings ----------------------------------------------------

pub const DEFAULT_VOLUME: u8 = 10;
pub const DEFAULT_MOUTH_BRIGHTNESS: u8 = 8;
pub const DEFAULT_EYE_BRIGHTNESS: u8 = 10;

// ---- Persisted store layout -------------------------------------------------

/// Marker proving the store has been initialised by this firmware.
pub const STORE_MAGIC: u16 = 0xBEBE;

pub const ADDR_MAGIC: usize = 0;
pub const ADDR_POWER_ON: usize = 2;
pub const ADDR_VOLUME: usize = 3;
pub const ADDR_MOUTH_BRIGHTNESS: usize = 4;
pub const ADDR_EYE_BRIGHTNESS: usize = 5;
pub const ADDR_AUDIO_THRESHOLD: usize = 6;
pub const ADDR_AUDIO_MODE: usize = 8;
pub const ADDR_VISUAL_EFFECT: usize = 9;
pub const ADDR_TIME_OFFSET: usize = 10;
