//! Per-tick coordination of sensing, gestures, settings and rendering.
//!
//! The host loop does three things each iteration: sample the audio sense
//! pin, tick the encoder driver, then hand both to [`Controller::tick`].
//! Everything else (gesture handling, settings persistence, view
//! transitions, redraw scheduling) happens here. All component state lives
//! in explicit owned instances; there are no globals.

use crate::analysis::AudioSense;
use crate::clock::{elapsed_ms, Millis, WallClock};
use crate::config::{
    AUDIO_MODE_COUNT, AUDIO_UPDATE_INTERVAL_MS, CALIBRATION_TIMEOUT_MS, CLOCK_UPDATE_INTERVAL_MS,
    MAX_BRIGHTNESS, MAX_VOLUME, OVERLAY_LINGER_MS, VISUAL_EFFECT_COUNT,
};
use crate::error::Result;
use crate::gain::GainLimiter;
use crate::gesture::{EncoderDriver, EncoderGesture, Gesture};
use crate::render::{FaceRenderer, MatrixDriver, VisualEffect};
use crate::settings::{PersistentState, Settings, SettingsStore};

/// What the display is currently dedicated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Live waveform and eye animation.
    Face,
    /// Time of day across the eye panels.
    Clock,
    /// Calibration target picker (silence / time / sensitivity reset).
    CalibrationMenu { selection: u8 },
    /// Interactive time adjustment; one field is active at a time.
    TimeEdit {
        hours: u8,
        minutes: u8,
        editing_hours: bool,
    },
}

/// Transient value readouts drawn over the mouth panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlay {
    Volume,
    Mode,
    Effect,
    MouthBrightness,
    EyeBrightness,
    CalibrationDone,
}

/// Owns every core component and runs the update cycle.
pub struct Controller<S: SettingsStore> {
    clock: WallClock,
    sense: AudioSense,
    gesture: EncoderGesture,
    renderer: FaceRenderer,
    gain: GainLimiter,
    state: PersistentState<S>,

    view: View,
    view_dirty: bool,
    overlay: Option<Overlay>,
    overlay_since: Millis,
    last_waveform: Millis,
    last_clock_draw: Millis,
    last_input: Millis,
}

impl<S: SettingsStore> Controller<S> {
    pub fn new(store: S) -> Self {
        Self {
            clock: WallClock::new(),
            sense: AudioSense::new(),
            gesture: EncoderGesture::new(),
            renderer: FaceRenderer::new(),
            gain: GainLimiter::new(),
            state: PersistentState::new(store),
            view: View::Face,
            view_dirty: true,
            overlay: None,
            overlay_since: 0,
            last_waveform: 0,
            last_clock_draw: 0,
            last_input: 0,
        }
    }

    /// Loads (or self-heals) the persisted settings and applies them to the
    /// components, then shows the greeting face.
    pub fn init<M: MatrixDriver>(&mut self, matrix: &mut M, now: Millis) -> Result<()> {
        self.state.init()?;

        let settings = self.state.settings();
        let threshold = settings.audio_threshold();
        let offset = settings.time_calibration_offset();
        let mouth = settings.mouth_brightness();
        let eye = settings.eye_brightness();

        self.sense.set_threshold(threshold);
        self.clock.set_calibration_offset(offset, now);
        self.renderer.set_mouth_brightness(matrix, mouth);
        self.renderer.set_eye_brightness(matrix, eye);
        self.renderer.show_power_on(matrix);
        Ok(())
    }

    /// One loop iteration: feed the raw sense reading, poll the encoder,
    /// apply at most one gesture, then redraw whatever is due.
    pub fn tick<D: EncoderDriver, M: MatrixDriver>(
        &mut self,
        driver: &mut D,
        matrix: &mut M,
        raw_audio: u16,
        now: Millis,
    ) -> Result<()> {
        self.sense.tick(raw_audio, now);
        self.clock.tick(now);
        self.gesture.tick(driver, now);

        if let Some(gesture) = self.gesture.take_event() {
            self.last_input = now;
            self.apply_gesture(gesture, matrix, now)?;
        }

        self.expire_transients(now);
        self.render(matrix, now);
        Ok(())
    }

    /// Power state follows the audio transport: the host flips it when a
    /// source connects or goes away.
    pub fn set_power(&mut self, on: bool) -> Result<()> {
        if self.state.settings().power_on() != on {
            self.state.settings_mut().set_power_on(on);
            self.state.save()?;
            self.view_dirty = true;
        }
        Ok(())
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn settings(&self) -> &Settings {
        self.state.settings()
    }

    pub fn wall_clock(&self) -> &WallClock {
        &self.clock
    }

    pub fn audio(&self) -> &AudioSense {
        &self.sense
    }

    /// The gain stage the host's PCM callback runs buffers through.
    pub fn gain(&mut self) -> &mut GainLimiter {
        &mut self.gain
    }

    fn apply_gesture<M: MatrixDriver>(
        &mut self,
        gesture: Gesture,
        matrix: &mut M,
        now: Millis,
    ) -> Result<()> {
        match self.view {
            View::CalibrationMenu { selection } => {
                self.calibration_gesture(gesture, selection, matrix, now)
            }
            View::TimeEdit {
                hours,
                minutes,
                editing_hours,
            } => self.time_edit_gesture(gesture, hours, minutes, editing_hours, now),
            View::Face | View::Clock => self.live_gesture(gesture, matrix, now),
        }
    }

    fn live_gesture<M: MatrixDriver>(
        &mut self,
        gesture: Gesture,
        matrix: &mut M,
        now: Millis,
    ) -> Result<()> {
        match gesture {
            Gesture::Rotate(direction) => {
                let volume = step(self.state.settings().volume(), direction, MAX_VOLUME);
                self.state.settings_mut().set_volume(volume);
                self.state.save()?;
                self.renderer.show_volume(matrix, volume);
                self.set_overlay(Overlay::Volume, now);
            }
            Gesture::HoldRotate(direction) => {
                let mode = wrap(self.state.settings().audio_mode(), direction, AUDIO_MODE_COUNT);
                self.state.settings_mut().set_audio_mode(mode);
                self.state.save()?;
                self.renderer.show_mode(matrix, mode);
                self.set_overlay(Overlay::Mode, now);
            }
            Gesture::ClickHoldRotate(direction) => {
                let brightness = step(
                    self.state.settings().mouth_brightness(),
                    direction,
                    MAX_BRIGHTNESS,
                );
                self.state.settings_mut().set_mouth_brightness(brightness);
                self.state.save()?;
                self.renderer.set_mouth_brightness(matrix, brightness);
                self.renderer.show_mouth_brightness(matrix, brightness);
                self.set_overlay(Overlay::MouthBrightness, now);
            }
            Gesture::DoubleClickHoldRotate(direction) => {
                let brightness = step(
                    self.state.settings().eye_brightness(),
                    direction,
                    MAX_BRIGHTNESS,
                );
                self.state.settings_mut().set_eye_brightness(brightness);
                self.state.save()?;
                self.renderer.set_eye_brightness(matrix, brightness);
                self.renderer.show_eye_brightness(matrix, brightness);
                self.set_overlay(Overlay::EyeBrightness, now);
            }
            Gesture::SingleClick => {
                self.view = match self.view {
                    View::Clock => View::Face,
                    _ => View::Clock,
                };
                self.view_dirty = true;
            }
            Gesture::DoubleClick => {
                let effect = wrap(self.state.settings().visual_effect(), 1, VISUAL_EFFECT_COUNT);
                self.state.settings_mut().set_visual_effect(effect);
                self.state.save()?;
                self.renderer.show_effect(matrix, effect);
                self.set_overlay(Overlay::Effect, now);
            }
            Gesture::TripleClick => {
                self.view = View::CalibrationMenu { selection: 0 };
                self.view_dirty = false;
                self.overlay = None;
                self.renderer.show_calibration_menu(matrix);
            }
        }
        Ok(())
    }

    fn calibration_gesture<M: MatrixDriver>(
        &mut self,
        gesture: Gesture,
        selection: u8,
        matrix: &mut M,
        now: Millis,
    ) -> Result<()> {
        match gesture {
            Gesture::Rotate(direction) => {
                self.view = View::CalibrationMenu {
                    selection: wrap(selection, direction, 3),
                };
                self.view_dirty = true;
            }
            Gesture::DoubleClick => match selection {
                // Silence calibration: the current ambient reading becomes
                // the new threshold floor.
                0 => {
                    let snapshot = self.sense.raw_level();
                    self.state.settings_mut().set_audio_threshold(snapshot);
                    let threshold = self.state.settings().audio_threshold();
                    self.sense.set_threshold(threshold);
                    self.state.save()?;
                    self.finish_calibration(matrix, now);
                }
                1 => {
                    self.view = View::TimeEdit {
                        hours: self.clock.hours(),
                        minutes: self.clock.minutes(),
                        editing_hours: true,
                    };
                    self.view_dirty = true;
                }
                // Sensitivity reset: back to the default threshold.
                _ => {
                    self.state.settings_mut().set_audio_threshold(0);
                    let threshold = self.state.settings().audio_threshold();
                    self.sense.set_threshold(threshold);
                    self.state.save()?;
                    self.finish_calibration(matrix, now);
                }
            },
            Gesture::TripleClick => {
                self.view = View::Face;
                self.view_dirty = true;
            }
            _ => {}
        }
        Ok(())
    }

    fn time_edit_gesture(
        &mut self,
        gesture: Gesture,
        hours: u8,
        minutes: u8,
        editing_hours: bool,
        now: Millis,
    ) -> Result<()> {
        match gesture {
            Gesture::Rotate(direction) => {
                let (hours, minutes) = if editing_hours {
                    (wrap(hours, direction, 24), minutes)
                } else {
                    (hours, wrap(minutes, direction, 60))
                };
                self.view = View::TimeEdit {
                    hours,
                    minutes,
                    editing_hours,
                };
                self.view_dirty = true;
            }
            Gesture::SingleClick => {
                self.view = View::TimeEdit {
                    hours,
                    minutes,
                    editing_hours: !editing_hours,
                };
                self.view_dirty = true;
            }
            Gesture::DoubleClick => {
                self.clock.set_time(hours, minutes, now);
                self.state
                    .settings_mut()
                    .set_time_calibration_offset(self.clock.calibration_offset());
                self.state.save()?;
                self.view = View::Clock;
                self.view_dirty = true;
            }
            _ => {}
        }
        Ok(())
    }

    fn finish_calibration<M: MatrixDriver>(&mut self, matrix: &mut M, now: Millis) {
        self.renderer.show_calibration_complete(matrix);
        self.set_overlay(Overlay::CalibrationDone, now);
        self.view = View::Face;
        self.view_dirty = true;
    }

    fn set_overlay(&mut self, overlay: Overlay, now: Millis) {
        self.overlay = Some(overlay);
        self.overlay_since = now;
    }

    fn expire_transients(&mut self, now: Millis) {
        if self.overlay.is_some() && elapsed_ms(now, self.overlay_since) > OVERLAY_LINGER_MS {
            self.overlay = None;
            self.view_dirty = true;
        }

        // The calibration flows abandon themselves after enough silence.
        let in_calibration = matches!(
            self.view,
            View::CalibrationMenu { .. } | View::TimeEdit { .. }
        );
        if in_calibration && elapsed_ms(now, self.last_input) > CALIBRATION_TIMEOUT_MS {
            self.view = View::Face;
            self.view_dirty = true;
        }
    }

    fn render<M: MatrixDriver>(&mut self, matrix: &mut M, now: Millis) {
        // An active overlay holds the mouth panels; live drawing resumes
        // once it expires.
        if self.overlay.is_some() {
            return;
        }

        // Standby: the face sleeps, only the clock stays up.
        if !self.state.settings().power_on() {
            self.draw_clock_view(matrix, now);
            return;
        }

        match self.view {
            View::Face => {
                let effect = VisualEffect::from_index(self.state.settings().visual_effect());
                let level = self.sense.level();
                let beat = self.sense.beat();
                if self.view_dirty || elapsed_ms(now, self.last_waveform) >= AUDIO_UPDATE_INTERVAL_MS
                {
                    self.renderer.draw_waveform(matrix, level, effect);
                    self.last_waveform = now;
                    self.view_dirty = false;
                }
                self.renderer.animate_eyes(matrix, level, beat, effect, now);
            }
            View::Clock => self.draw_clock_view(matrix, now),
            View::CalibrationMenu { selection } => {
                if self.view_dirty {
                    self.renderer.show_calibration_selection(matrix, selection);
                    self.view_dirty = false;
                }
            }
            View::TimeEdit {
                hours,
                minutes,
                editing_hours,
            } => {
                if self.view_dirty {
                    self.renderer.show_time_edit(matrix, hours, minutes, editing_hours);
                    self.view_dirty = false;
                }
            }
        }
    }

    fn draw_clock_view<M: MatrixDriver>(&mut self, matrix: &mut M, now: Millis) {
        if self.view_dirty || elapsed_ms(now, self.last_clock_draw) >= CLOCK_UPDATE_INTERVAL_MS {
            self.renderer.show_clock(matrix, self.clock.hours(), self.clock.minutes());
            self.last_clock_draw = now;
            self.view_dirty = false;
        }
    }
}

/// Clamped single step on a bounded setting.
fn step(value: u8, delta: i8, max: u8) -> u8 {
    (i16::from(value) + i16::from(delta)).clamp(0, i16::from(max)) as u8
}

/// Wrapping single step on a cyclic setting.
fn wrap(value: u8, delta: i8, count: u8) -> u8 {
    (i16::from(value) + i16::from(delta)).rem_euclid(i16::from(count)) as u8
}
