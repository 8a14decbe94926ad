//! Face rendering: mouth waveform, eye animation and the status overlays.
//!
//! Everything here is expressed against the [`MatrixDriver`] primitives so
//! the drawing logic stays independent of the panel hardware. Each public
//! draw call issues a fixed sequence of primitives and ends with an explicit
//! [`flush`](MatrixDriver::flush); nothing persists between calls, and the
//! host decides when a live view needs re-showing after a transient overlay.

mod eyes;

use crate::clock::Millis;
use crate::config::{MATRIX_HEIGHT, MAX_BRIGHTNESS, MOUTH_WIDTH, PANEL_COUNT};
use crate::ring::Ring;

use eyes::EyeAnimator;

/// Column offset of the first eye panel.
const LEFT_EYE_X: u8 = MOUTH_WIDTH as u8;
/// Column offset of the second eye panel.
const RIGHT_EYE_X: u8 = MOUTH_WIDTH as u8 + crate::config::EYE_WIDTH;
/// Rightmost column of the whole chain.
const LAST_COLUMN: u8 = RIGHT_EYE_X + crate::config::EYE_WIDTH - 1;
/// Horizontal advance between printed glyphs.
const GLYPH_ADVANCE: u8 = 4;

/// Draw primitives the panel hardware exposes to the core.
///
/// Coordinates may run past the physical edge (overlay text can overhang the
/// mouth panels); implementations clip out-of-range pixels.
pub trait MatrixDriver {
    fn set_pixel(&mut self, x: u8, y: u8);
    fn fill_rect(&mut self, x0: u8, y0: u8, x1: u8, y1: u8);
    fn clear_rect(&mut self, x0: u8, y0: u8, x1: u8, y1: u8);
    fn line_h(&mut self, y: u8, x0: u8, x1: u8);
    fn line_v(&mut self, x: u8, y0: u8, y1: u8);
    /// Draws one character glyph with its top-left corner at `(x, y)`.
    fn print_glyph(&mut self, x: u8, y: u8, glyph: char);
    /// Inverts subsequent glyph drawing (lit background, dark strokes).
    fn set_invert(&mut self, on: bool);
    /// Per-panel brightness, mouth panels first.
    fn set_brightness(&mut self, levels: &[u8; PANEL_COUNT]);
    /// Pushes the staged frame to the hardware.
    fn flush(&mut self);
}

/// Closed set of rendering strategies shared by the mouth waveform and the
/// eye animation. Purely a drawing choice; the stored history is identical
/// whichever strategy is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualEffect {
    /// Bottom-anchored vertical bars.
    Bars,
    /// Bars mirrored around the vertical centre.
    CenteredBars,
    /// Connected line plot.
    Line,
}

impl VisualEffect {
    /// Maps a persisted effect index onto a strategy; unknown indices fall
    /// back to the first.
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Self::CenteredBars,
            2 => Self::Line,
            _ => Self::Bars,
        }
    }
}

/// Stateful face renderer: waveform history, pupil positions and brightness.
#[derive(Debug, Clone)]
pub struct FaceRenderer {
    mouth_brightness: u8,
    eye_brightness: u8,
    history: Ring<u8, MOUTH_WIDTH>,
    eyes: EyeAnimator,
}

impl FaceRenderer {
    pub fn new() -> Self {
        Self {
            mouth_brightness: crate::config::DEFAULT_MOUTH_BRIGHTNESS,
            eye_brightness: crate::config::DEFAULT_EYE_BRIGHTNESS,
            history: Ring::new(),
            eyes: EyeAnimator::new(),
        }
    }

    /// Sets mouth panel brightness (clamped) and pushes the new per-panel
    /// levels to the driver.
    pub fn set_mouth_brightness<M: MatrixDriver>(&mut self, driver: &mut M, brightness: u8) {
        self.mouth_brightness = brightness.min(MAX_BRIGHTNESS);
        self.apply_brightness(driver);
    }

    /// Sets eye panel brightness (clamped) and pushes the new per-panel
    /// levels to the driver.
    pub fn set_eye_brightness<M: MatrixDriver>(&mut self, driver: &mut M, brightness: u8) {
        self.eye_brightness = brightness.min(MAX_BRIGHTNESS);
        self.apply_brightness(driver);
    }

    pub fn mouth_brightness(&self) -> u8 {
        self.mouth_brightness
    }

    pub fn eye_brightness(&self) -> u8 {
        self.eye_brightness
    }

    fn apply_brightness<M: MatrixDriver>(&self, driver: &mut M) {
        let m = self.mouth_brightness;
        let e = self.eye_brightness;
        driver.set_brightness(&[m, m, m, e, e]);
    }

    /// Appends the newest audio level to the history and redraws the mouth,
    /// oldest column on the left.
    pub fn draw_waveform<M: MatrixDriver>(
        &mut self,
        driver: &mut M,
        level: u16,
        effect: VisualEffect,
    ) {
        self.history.push(level.min(100) as u8);
        self.clear_mouth(driver);

        match effect {
            VisualEffect::Bars => self.draw_bars(driver),
            VisualEffect::CenteredBars => self.draw_centered_bars(driver),
            VisualEffect::Line => self.draw_line(driver),
        }

        driver.flush();
    }

    fn draw_bars<M: MatrixDriver>(&self, driver: &mut M) {
        for (x, level) in self.history.iter_oldest_first().enumerate() {
            let height = scale(level, MATRIX_HEIGHT).min(MATRIX_HEIGHT - 1);
            for y in 0..=height {
                driver.set_pixel(x as u8, MATRIX_HEIGHT - 1 - y);
            }
        }
    }

    fn draw_centered_bars<M: MatrixDriver>(&self, driver: &mut M) {
        let center = MATRIX_HEIGHT / 2;
        for (x, level) in self.history.iter_oldest_first().enumerate() {
            let half = scale(level, center);
            for y in 0..half {
                driver.set_pixel(x as u8, center - y);
                driver.set_pixel(x as u8, center + y);
            }
            driver.set_pixel(x as u8, center);
        }
    }

    fn draw_line<M: MatrixDriver>(&self, driver: &mut M) {
        let mut prev_y = MATRIX_HEIGHT / 2;
        for (x, level) in self.history.iter_oldest_first().enumerate() {
            let y = scale(level, MATRIX_HEIGHT - 1);
            if x == 0 {
                driver.set_pixel(0, y);
            } else {
                // Connect to the previous column with a vertical run.
                let (lo, hi) = if prev_y <= y { (prev_y, y) } else { (y, prev_y) };
                for py in lo..=hi {
                    driver.set_pixel(x as u8, py);
                }
            }
            prev_y = y;
        }
    }

    /// Advances the eye animation. Rate-limited internally; calls between
    /// frames draw nothing.
    pub fn animate_eyes<M: MatrixDriver>(
        &mut self,
        driver: &mut M,
        level: u16,
        beat: bool,
        effect: VisualEffect,
        now: Millis,
    ) {
        self.eyes.animate(driver, level, beat, effect, now);
    }

    /// Clock view: hours on the left eye, minutes on the right.
    pub fn show_clock<M: MatrixDriver>(&self, driver: &mut M, hours: u8, minutes: u8) {
        self.clear_mouth(driver);
        self.clear_eyes(driver);

        driver.print_glyph(LEFT_EYE_X + 1, 2, digit(hours / 10));
        driver.print_glyph(LEFT_EYE_X + 4, 2, digit(hours % 10));
        driver.print_glyph(RIGHT_EYE_X + 1, 2, digit(minutes / 10));
        driver.print_glyph(RIGHT_EYE_X + 4, 2, digit(minutes % 10));

        driver.flush();
    }

    /// Greeting face shown right after power-on.
    pub fn show_power_on<M: MatrixDriver>(&self, driver: &mut M) {
        self.clear_mouth(driver);
        eyes::draw_resting_eyes(driver);
        driver.flush();
    }

    pub fn show_volume<M: MatrixDriver>(&self, driver: &mut M, volume: u8) {
        self.clear_mouth(driver);
        driver.print_glyph(2, 2, 'V');
        driver.print_glyph(10, 2, digit(volume / 10));
        driver.print_glyph(18, 2, digit(volume % 10));
        driver.flush();
    }

    pub fn show_mode<M: MatrixDriver>(&self, driver: &mut M, mode: u8) {
        self.clear_mouth(driver);
        driver.print_glyph(2, 2, 'M');
        driver.print_glyph(10, 2, digit(mode));
        driver.flush();
    }

    pub fn show_effect<M: MatrixDriver>(&self, driver: &mut M, effect: u8) {
        self.clear_mouth(driver);
        driver.print_glyph(2, 2, 'E');
        driver.print_glyph(10, 2, digit(effect));
        driver.flush();
    }

    pub fn show_mouth_brightness<M: MatrixDriver>(&self, driver: &mut M, brightness: u8) {
        self.show_brightness(driver, 'M', brightness);
    }

    pub fn show_eye_brightness<M: MatrixDriver>(&self, driver: &mut M, brightness: u8) {
        self.show_brightness(driver, 'E', brightness);
    }

    fn show_brightness<M: MatrixDriver>(&self, driver: &mut M, which: char, brightness: u8) {
        self.clear_mouth(driver);
        driver.print_glyph(2, 2, 'B');
        driver.print_glyph(10, 2, which);
        print_number(driver, 18, 2, brightness);
        driver.flush();
    }

    pub fn show_calibration_menu<M: MatrixDriver>(&self, driver: &mut M) {
        driver.clear_rect(0, 0, LAST_COLUMN, MATRIX_HEIGHT - 1);
        print_text(driver, 4, 2, "CAL");
        driver.flush();
    }

    pub fn show_calibration_selection<M: MatrixDriver>(&self, driver: &mut M, selection: u8) {
        const HINTS: [&str; 3] = ["SIL", "TIM", "SEN"];
        let selection = selection.min(2);

        self.clear_mouth(driver);
        driver.print_glyph(2, 2, digit(selection));
        print_text(driver, 10, 2, HINTS[selection as usize]);
        driver.flush();
    }

    pub fn show_calibration_complete<M: MatrixDriver>(&self, driver: &mut M) {
        self.clear_mouth(driver);
        print_text(driver, 4, 2, "OK");
        driver.flush();
    }

    /// Time-edit view; the field being edited is drawn inverted.
    pub fn show_time_edit<M: MatrixDriver>(
        &self,
        driver: &mut M,
        hours: u8,
        minutes: u8,
        editing_hours: bool,
    ) {
        self.clear_mouth(driver);
        self.clear_eyes(driver);

        driver.set_invert(editing_hours);
        driver.print_glyph(LEFT_EYE_X + 1, 2, digit(hours / 10));
        driver.print_glyph(LEFT_EYE_X + 4, 2, digit(hours % 10));

        driver.set_invert(!editing_hours);
        driver.print_glyph(RIGHT_EYE_X + 1, 2, digit(minutes / 10));
        driver.print_glyph(RIGHT_EYE_X + 4, 2, digit(minutes % 10));
        driver.set_invert(false);

        driver.flush();
    }

    fn clear_mouth<M: MatrixDriver>(&self, driver: &mut M) {
        driver.clear_rect(0, 0, MOUTH_WIDTH as u8 - 1, MATRIX_HEIGHT - 1);
    }

    fn clear_eyes<M: MatrixDriver>(&self, driver: &mut M) {
        driver.clear_rect(LEFT_EYE_X, 0, LAST_COLUMN, MATRIX_HEIGHT - 1);
    }
}

impl Default for FaceRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear `[0, 100]` → `[0, out_max]` mapping used by every strategy.
fn scale(level: u8, out_max: u8) -> u8 {
    (u16::from(level) * u16::from(out_max) / 100) as u8
}

fn digit(value: u8) -> char {
    char::from_digit(u32::from(value % 10), 10).unwrap_or('0')
}

fn print_number<M: MatrixDriver>(driver: &mut M, x: u8, y: u8, value: u8) {
    if value >= 10 {
        driver.print_glyph(x, y, digit(value / 10));
        driver.print_glyph(x + GLYPH_ADVANCE, y, digit(value % 10));
    } else {
        driver.print_glyph(x, y, digit(value));
    }
}

fn print_text<M: MatrixDriver>(driver: &mut M, x: u8, y: u8, text: &str) {
    for (index, glyph) in text.chars().enumerate() {
        driver.print_glyph(x + GLYPH_ADVANCE * index as u8, y, glyph);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{Op, RecordingMatrix};
    use super::*;

    #[test]
    fn effect_index_maps_onto_the_closed_set() {
        assert_eq!(VisualEffect::from_index(0), VisualEffect::Bars);
        assert_eq!(VisualEffect::from_index(1), VisualEffect::CenteredBars);
        assert_eq!(VisualEffect::from_index(2), VisualEffect::Line);
        assert_eq!(VisualEffect::from_index(250), VisualEffect::Bars);
    }

    #[test]
    fn waveform_clears_draws_and_flushes() {
        let mut renderer = FaceRenderer::new();
        let mut matrix = RecordingMatrix::new();

        renderer.draw_waveform(&mut matrix, 100, VisualEffect::Bars);

        assert_eq!(matrix.ops[0], Op::ClearRect(0, 0, 23, 7));
        assert_eq!(*matrix.ops.last().unwrap(), Op::Flush);
        // The newest level lands in the rightmost column at full height.
        assert!(matrix.ops.contains(&Op::Pixel(23, 0)));
        assert!(matrix.ops.contains(&Op::Pixel(23, 7)));
    }

    #[test]
    fn silent_history_still_draws_the_baseline_row() {
        let mut renderer = FaceRenderer::new();
        let mut matrix = RecordingMatrix::new();

        renderer.draw_waveform(&mut matrix, 0, VisualEffect::Bars);

        // Level zero lights exactly the bottom pixel of every column.
        for x in 0..MOUTH_WIDTH as u8 {
            assert!(matrix.ops.contains(&Op::Pixel(x, 7)));
            assert!(!matrix.ops.contains(&Op::Pixel(x, 6)));
        }
    }

    #[test]
    fn history_scrolls_left() {
        let mut renderer = FaceRenderer::new();
        let mut matrix = RecordingMatrix::new();
        renderer.draw_waveform(&mut matrix, 100, VisualEffect::Bars);

        let mut matrix = RecordingMatrix::new();
        renderer.draw_waveform(&mut matrix, 0, VisualEffect::Bars);

        // The full-scale column moved one slot towards the left edge.
        assert!(matrix.ops.contains(&Op::Pixel(22, 0)));
        assert!(!matrix.ops.contains(&Op::Pixel(23, 0)));
    }

    #[test]
    fn strategy_choice_does_not_touch_history() {
        let mut with_bars = FaceRenderer::new();
        let mut with_line = FaceRenderer::new();
        for level in [10, 40, 90] {
            let mut scratch = RecordingMatrix::new();
            with_bars.draw_waveform(&mut scratch, level, VisualEffect::Bars);
            let mut scratch = RecordingMatrix::new();
            with_line.draw_waveform(&mut scratch, level, VisualEffect::Line);
        }

        let bars: Vec<u8> = with_bars.history.iter_oldest_first().collect();
        let line: Vec<u8> = with_line.history.iter_oldest_first().collect();
        assert_eq!(bars, line);
    }

    #[test]
    fn brightness_fans_out_per_panel() {
        let mut renderer = FaceRenderer::new();
        let mut matrix = RecordingMatrix::new();

        renderer.set_mouth_brightness(&mut matrix, 12);
        renderer.set_eye_brightness(&mut matrix, 99);

        assert_eq!(renderer.eye_brightness(), MAX_BRIGHTNESS);
        assert_eq!(
            *matrix.ops.last().unwrap(),
            Op::Brightness([12, 12, 12, MAX_BRIGHTNESS, MAX_BRIGHTNESS])
        );
    }

    #[test]
    fn clock_prints_four_digits_over_the_eyes() {
        let renderer = FaceRenderer::new();
        let mut matrix = RecordingMatrix::new();

        renderer.show_clock(&mut matrix, 13, 45);

        assert_eq!(matrix.glyphs(), "1345");
        assert!(matrix.ops.contains(&Op::Glyph(25, 2, '1')));
        assert!(matrix.ops.contains(&Op::Glyph(33, 2, '4')));
        assert_eq!(matrix.flush_count(), 1);
    }

    #[test]
    fn volume_overlay_clears_only_the_mouth() {
        let renderer = FaceRenderer::new();
        let mut matrix = RecordingMatrix::new();

        renderer.show_volume(&mut matrix, 21);

        assert_eq!(matrix.ops[0], Op::ClearRect(0, 0, 23, 7));
        assert_eq!(matrix.glyphs(), "V21");
    }

    #[test]
    fn time_edit_inverts_the_active_field() {
        let renderer = FaceRenderer::new();
        let mut matrix = RecordingMatrix::new();

        renderer.show_time_edit(&mut matrix, 7, 30, true);

        let hour_glyph = matrix
            .ops
            .iter()
            .position(|op| matches!(op, Op::Glyph(_, _, '0')))
            .unwrap();
        let invert_on = matrix.ops.iter().position(|op| *op == Op::Invert(true)).unwrap();
        assert!(invert_on < hour_glyph);
        // Inversion is always released before the flush.
        let last_invert = matrix
            .ops
            .iter()
            .rposition(|op| matches!(op, Op::Invert(_)))
            .unwrap();
        assert_eq!(matrix.ops[last_invert], Op::Invert(false));
    }

    #[test]
    fn calibration_selection_shows_the_hint() {
        let renderer = FaceRenderer::new();
        let mut matrix = RecordingMatrix::new();
        renderer.show_calibration_selection(&mut matrix, 1);
        assert_eq!(matrix.glyphs(), "1TIM");
    }
}
