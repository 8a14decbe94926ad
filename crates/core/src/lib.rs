//! Core library for the robot-head Bluetooth audio receiver.
//!
//! This crate holds the event and timing coordination layer of the firmware:
//! the rotary-encoder gesture state machine, the software wall clock, the
//! audio-reactive analysis pipeline, and the face renderer. Hardware is kept
//! behind small traits ([`MatrixDriver`], [`EncoderDriver`],
//! [`SettingsStore`]) so the whole control loop runs identically on the
//! device and on a desktop host.
//!
//! The model is a single-threaded cooperative polling loop: the host samples
//! its peripherals once per iteration and calls [`Controller::tick`]. Every
//! call is a bounded, non-blocking computation; timing-sensitive behaviour
//! compares monotonic counter snapshots with wraparound-safe arithmetic.

pub mod analysis;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod gain;
pub mod gesture;
pub mod render;
pub mod ring;
pub mod settings;

pub use analysis::AudioSense;
pub use clock::{elapsed_ms, Millis, WallClock};
pub use controller::{Controller, View};
pub use error::{FaceRadioError, Result};
pub use gain::GainLimiter;
pub use gesture::{EncoderDriver, EncoderGesture, Gesture};
pub use render::{FaceRenderer, MatrixDriver, VisualEffect};
pub use ring::Ring;
pub use settings::{PersistentState, Settings, SettingsStore};
