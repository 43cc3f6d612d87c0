//! Controller state
//!
//! What was last pushed to the renderer and the window host, so that
//! re-evaluating with unchanged inputs costs nothing.

use holeylight_core::{AnimationMode, Argb, Resolution};

#[derive(Debug, Default)]
pub struct OverlayState {
    /// Set by show, cleared by hide
    pub wanted: bool,
    /// Latest colors from show
    pub colors: Vec<Argb>,
    /// Tear down without waiting for the animation to finish
    pub kill: bool,

    /// A show is currently applied
    pub applied: bool,
    pub last_colors: Option<Vec<Argb>>,
    pub last_mode: Option<AnimationMode>,
    pub last_inset_dp: Option<u32>,

    /// Window is attached to the host
    pub added: bool,
    pub aod_suppressed: bool,
    /// Display size at startup or at the last accepted change
    pub resolution: Option<Resolution>,
}

impl OverlayState {
    /// Anything differs from what is currently applied
    pub fn differs(&self, mode: AnimationMode, inset_dp: u32) -> bool {
        !self.applied
            || self.last_colors.as_deref() != Some(self.colors.as_slice())
            || self.last_mode != Some(mode)
            || self.last_inset_dp != Some(inset_dp)
    }

    pub fn record_applied(&mut self, mode: AnimationMode, inset_dp: u32) {
        self.applied = true;
        self.last_colors = Some(self.colors.clone());
        self.last_mode = Some(mode);
        self.last_inset_dp = Some(inset_dp);
    }

    /// Force the next evaluation to re-apply, keeping `applied`
    pub fn invalidate_applied(&mut self) {
        self.last_colors = None;
        self.last_mode = None;
        self.last_inset_dp = None;
    }

    pub fn clear_applied(&mut self) {
        self.applied = false;
        self.invalidate_applied();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Argb = Argb(0xFFFF_0000);

    #[test]
    fn test_unapplied_state_always_differs() {
        let state = OverlayState::default();
        assert!(state.differs(AnimationMode::Swirl, 0));
    }

    #[test]
    fn test_recorded_state_matches() {
        let mut state = OverlayState {
            colors: vec![RED],
            ..Default::default()
        };
        state.record_applied(AnimationMode::Swirl, 0);
        assert!(!state.differs(AnimationMode::Swirl, 0));
        assert!(state.differs(AnimationMode::Blink, 0));
        assert!(state.differs(AnimationMode::Swirl, 1));

        state.colors.push(RED);
        assert!(state.differs(AnimationMode::Swirl, 0));
    }

    #[test]
    fn test_invalidate_keeps_applied() {
        let mut state = OverlayState {
            colors: vec![RED],
            ..Default::default()
        };
        state.record_applied(AnimationMode::Swirl, 0);
        state.invalidate_applied();
        assert!(state.applied);
        assert!(state.differs(AnimationMode::Swirl, 0));

        state.clear_applied();
        assert!(!state.applied);
    }
}
