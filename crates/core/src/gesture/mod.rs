//! Rotary encoder gesture disambiguation.
//!
//! The physical driver reports three raw signals per poll: a consumed
//! rotation step, the size of a settled click burst, and the current hold
//! state. This module layers a small state machine on top that turns those
//! into one high-level gesture per poll: rotations qualified by how many
//! clicks preceded the hold, bare click bursts, and nothing else.
//!
//! Exactly one event is pending at a time. A new gesture detected before the
//! previous one is consumed overwrites it; callers must poll faster than the
//! quickest expected input cadence. This mirrors an edge-triggered interrupt
//! read and the rest of the system depends on the overwrite semantics.

use crate::clock::{elapsed_ms, Millis};
use crate::config::CLICK_BURST_TIMEOUT_MS;

/// Raw signals from the physical encoder driver.
///
/// `take_*` methods consume the condition they report: a rotation step or a
/// settled click burst is returned once and then cleared.
pub trait EncoderDriver {
    /// Rotation since the last poll: `-1`, `0` or `+1`.
    fn take_rotation(&mut self) -> i8;

    /// Size of a click burst that settled since the last poll, or 0.
    fn take_clicks(&mut self) -> u8;

    /// Whether the encoder button is currently held down.
    fn is_held(&self) -> bool;
}

/// One disambiguated input gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Plain rotation, no button involved. Direction is `-1` or `+1`.
    Rotate(i8),
    /// Rotation while the button is held, no clicks beforehand.
    HoldRotate(i8),
    /// Rotation while held, preceded by one click.
    ClickHoldRotate(i8),
    /// Rotation while held, preceded by two clicks.
    DoubleClickHoldRotate(i8),
    SingleClick,
    DoubleClick,
    TripleClick,
}

/// Click/hold/rotate disambiguation state machine.
#[derive(Debug, Clone, Default)]
pub struct EncoderGesture {
    pending_clicks: u8,
    click_window_start: Millis,
    was_holding: bool,
    event: Option<Gesture>,
}

impl EncoderGesture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Polls the driver and records at most one new gesture. Call once per
    /// loop iteration.
    pub fn tick<D: EncoderDriver>(&mut self, driver: &mut D, now: Millis) {
        let direction = driver.take_rotation();
        if direction != 0 {
            let direction = direction.signum();
            if driver.is_held() {
                // Rotation under hold: the variant depends on how many
                // clicks led into the hold. Larger burst sizes have no
                // assigned meaning and emit nothing.
                self.event = match self.pending_clicks {
                    0 => Some(Gesture::HoldRotate(direction)),
                    1 => Some(Gesture::ClickHoldRotate(direction)),
                    2 => Some(Gesture::DoubleClickHoldRotate(direction)),
                    _ => self.event,
                };
            } else {
                self.event = Some(Gesture::Rotate(direction));
            }
            return;
        }

        let clicks = driver.take_clicks();
        if clicks > 0 {
            self.pending_clicks = clicks;
            self.click_window_start = now;
            match clicks {
                1 => self.event = Some(Gesture::SingleClick),
                2 => self.event = Some(Gesture::DoubleClick),
                3 => {
                    self.event = Some(Gesture::TripleClick);
                    // Triple-click is terminal, not extensible to higher
                    // combos.
                    self.pending_clicks = 0;
                }
                _ => {}
            }
            return;
        }

        // Burst abandoned: no follow-up within the window.
        if self.pending_clicks > 0
            && elapsed_ms(now, self.click_window_start) > CLICK_BURST_TIMEOUT_MS
        {
            self.pending_clicks = 0;
        }

        // A completed hold always clears click memory.
        let holding = driver.is_held();
        if self.was_holding && !holding {
            self.pending_clicks = 0;
        }
        self.was_holding = holding;
    }

    /// Returns the pending gesture once; `None` until a new one is detected.
    pub fn take_event(&mut self) -> Option<Gesture> {
        self.event.take()
    }

    /// Clicks currently waiting for a qualifying hold or timeout.
    pub fn pending_clicks(&self) -> u8 {
        self.pending_clicks
    }
}
