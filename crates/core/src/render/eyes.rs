//! Eye animation strategies.
//!
//! Eyes are drawn as an outline with the pupil cut out of it: first the
//! filled eye shape, then a cleared square centred on the pupil position.

use crate::clock::{elapsed_ms, Millis};
use crate::config::{EYE_ANIMATION_INTERVAL_MS, EYE_WIDTH, MATRIX_HEIGHT, MOUTH_WIDTH};
use crate::render::{MatrixDriver, VisualEffect};

/// Pupil random walk stays inside this interior band.
const WANDER_MIN: i8 = 2;
const WANDER_MAX: i8 = 5;

#[derive(Debug, Clone)]
pub(super) struct EyeAnimator {
    last_update: Millis,
    pupils: [(i8, i8); 2],
    rng: Rng,
}

impl EyeAnimator {
    pub(super) fn new() -> Self {
        Self {
            last_update: 0,
            pupils: [(4, 4); 2],
            rng: Rng::new(0x2F6E_2B1D),
        }
    }

    /// Draws one animation frame, at most once per
    /// [`EYE_ANIMATION_INTERVAL_MS`].
    pub(super) fn animate<M: MatrixDriver>(
        &mut self,
        driver: &mut M,
        level: u16,
        beat: bool,
        effect: VisualEffect,
        now: Millis,
    ) {
        if elapsed_ms(now, self.last_update) < EYE_ANIMATION_INTERVAL_MS {
            return;
        }
        self.last_update = now;

        clear_eyes(driver);
        match effect {
            VisualEffect::Bars => self.pulse(driver, level, beat),
            VisualEffect::CenteredBars => self.wander(driver, beat),
            VisualEffect::Line => self.react_to_beat(driver, level, beat),
        }
        driver.flush();
    }

    /// Pupils sized by audio level, jumping to near-full on a beat.
    fn pulse<M: MatrixDriver>(&self, driver: &mut M, level: u16, beat: bool) {
        let size = if beat { 7 } else { 2 + scale(level, 4) };
        for offset in eye_offsets() {
            draw_eye(driver, offset);
            draw_pupil(driver, offset, 4, 4, size);
        }
    }

    /// Pupils drift in a bounded random walk; a beat toggles them wide.
    fn wander<M: MatrixDriver>(&mut self, driver: &mut M, beat: bool) {
        for pupil in &mut self.pupils {
            pupil.0 = (pupil.0 + self.rng.step()).clamp(WANDER_MIN, WANDER_MAX);
            pupil.1 = (pupil.1 + self.rng.step()).clamp(WANDER_MIN, WANDER_MAX);
        }

        let size = if beat { 4 } else { 2 };
        for (eye, offset) in eye_offsets().into_iter().enumerate() {
            draw_eye(driver, offset);
            let (px, py) = self.pupils[eye];
            draw_pupil(driver, offset, px, py, size);
        }
    }

    /// A beat forces maximum pupil size; otherwise size tracks the level.
    fn react_to_beat<M: MatrixDriver>(&self, driver: &mut M, level: u16, beat: bool) {
        let size = if beat { 6 } else { 2 + scale(level, 3) };
        for offset in eye_offsets() {
            draw_eye(driver, offset);
            draw_pupil(driver, offset, 4, 4, size);
        }
    }
}

/// Neutral face used by the power-on greeting.
pub(super) fn draw_resting_eyes<M: MatrixDriver>(driver: &mut M) {
    for offset in eye_offsets() {
        draw_eye(driver, offset);
        draw_pupil(driver, offset, 4, 4, 3);
    }
}

fn eye_offsets() -> [u8; 2] {
    [MOUTH_WIDTH as u8, MOUTH_WIDTH as u8 + EYE_WIDTH]
}

fn clear_eyes<M: MatrixDriver>(driver: &mut M) {
    driver.clear_rect(
        MOUTH_WIDTH as u8,
        0,
        MOUTH_WIDTH as u8 + 2 * EYE_WIDTH - 1,
        MATRIX_HEIGHT - 1,
    );
}

/// Rounded-rectangle eye outline filling the 8x8 panel at `x_offset`.
fn draw_eye<M: MatrixDriver>(driver: &mut M, x_offset: u8) {
    driver.fill_rect(x_offset + 1, 1, x_offset + 6, 6);
    driver.line_v(x_offset, 2, 5);
    driver.line_v(x_offset + 7, 2, 5);
    driver.line_h(0, x_offset + 2, x_offset + 5);
    driver.line_h(7, x_offset + 2, x_offset + 5);
}

/// Clears a centred square so the pupil shows as a dark cutout.
fn draw_pupil<M: MatrixDriver>(driver: &mut M, x_offset: u8, pupil_x: i8, pupil_y: i8, size: u8) {
    let half = (size / 2) as i8;
    let x0 = (pupil_x - half).clamp(1, 6) as u8;
    let y0 = (pupil_y - half).clamp(1, 6) as u8;
    let x1 = (pupil_x + half).clamp(1, 6) as u8;
    let y1 = (pupil_y + half).clamp(1, 6) as u8;
    driver.clear_rect(x_offset + x0, y0, x_offset + x1, y1);
}

fn scale(level: u16, out_max: u8) -> u8 {
    (u32::from(level.min(100)) * u32::from(out_max) / 100) as u8
}

/// Xorshift generator for the pupil walk. Deterministic, seeded once.
#[derive(Debug, Clone)]
struct Rng(u32);

impl Rng {
    const fn new(seed: u32) -> Self {
        Self(seed)
    }

    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }

    /// Uniform step in `{-1, 0, 1}`.
    fn step(&mut self) -> i8 {
        (self.next() % 3) as i8 - 1
    }
}
