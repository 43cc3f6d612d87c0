//! Show/hide and mode selection rules

use holeylight_types::{AnimationMode, LightSettings};

use crate::system::PowerSnapshot;

/// Maps power/display state to an animation mode
pub trait ModePolicy: Send {
    fn select_mode(&self, charging: bool, active_display: bool) -> AnimationMode;

    /// Called when the user settings change. Default: ignore.
    fn settings_changed(&mut self, _settings: &LightSettings) {}
}

/// Mode policy backed by the per-state modes in [`LightSettings`]
#[derive(Debug, Clone)]
pub struct ConfiguredModes {
    active: AnimationMode,
    doze_charging: AnimationMode,
    doze_battery: AnimationMode,
}

impl ConfiguredModes {
    pub fn new(settings: &LightSettings) -> Self {
        Self {
            active: settings.mode_active,
            doze_charging: settings.mode_doze_charging,
            doze_battery: settings.mode_doze_battery,
        }
    }
}

impl ModePolicy for ConfiguredModes {
    fn select_mode(&self, charging: bool, active_display: bool) -> AnimationMode {
        match (active_display, charging) {
            (true, _) => self.active,
            (false, true) => self.doze_charging,
            (false, false) => self.doze_battery,
        }
    }

    fn settings_changed(&mut self, settings: &LightSettings) {
        *self = Self::new(settings);
    }
}

/// Result of combining device state, user toggles and the wanted flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityDecision {
    pub screen_on: bool,
    /// Doze, or screen off with the AOD cover enabled
    pub doze: bool,
    /// Something is on the panel that we can draw over
    pub visible: bool,
    pub lockscreen: bool,
    pub charging: bool,
    /// The matching toggle is on and the overlay is wanted
    pub wanted_effective: bool,
}

impl VisibilityDecision {
    pub fn compute(snapshot: &PowerSnapshot, settings: &LightSettings, wanted: bool) -> Self {
        let screen_on = snapshot.screen_on;
        let mut doze = snapshot.doze;
        let mut visible = screen_on || doze;
        if !visible && settings.hide_aod {
            // the AOD cover is about to go up
            visible = true;
            doze = true;
        }
        let lockscreen = screen_on && snapshot.keyguard_locked;
        let charging = snapshot.charging;
        let wanted_effective = wanted && settings.enabled_for(screen_on, lockscreen, charging);

        Self {
            screen_on,
            doze,
            visible,
            lockscreen,
            charging,
            wanted_effective,
        }
    }

    /// Should the ring be on screen given the current color list
    pub fn should_show(&self, has_colors: bool) -> bool {
        self.wanted_effective && self.visible && has_colors
    }

    /// Inset to apply, in dp
    pub fn inset_dp(&self, settings: &LightSettings) -> u32 {
        if self.doze { settings.doze_inset_dp } else { 0 }
    }
}
