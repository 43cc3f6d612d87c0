//! Doze frame gate
//!
//! In doze the overlay is not part of the content the display keeps alive on
//! its own. Unless it redraws now and then, the platform drops it from the
//! always-on frame. Redrawing every vsync is too expensive on battery, so the
//! gate lets one in every [`FORCED_DRAW_INTERVAL`] idle opportunities through.

/// Idle frame opportunities per forced doze draw
pub const FORCED_DRAW_INTERVAL: u32 = 6;

#[derive(Debug, Default)]
pub struct DozeFrameGate {
    skips: u32,
}

impl DozeFrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether this frame is drawn.
    ///
    /// `draw` is the renderer's own verdict (content changed). Outside doze the
    /// verdict passes through unchanged.
    pub fn on_frame_start(&mut self, draw: bool, doze: bool) -> bool {
        if draw {
            self.skips = 0;
            return true;
        }
        if !doze {
            return false;
        }
        self.skips += 1;
        if self.skips == FORCED_DRAW_INTERVAL {
            self.skips = 0;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.skips = 0;
    }
}
