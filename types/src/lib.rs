//! Shared configuration types for HoleyLight
//!
//! This crate contains serializable types that are shared between the policy
//! layer (holeylight-core), the playback engine (holeylight-overlay) and the
//! binary. It carries no behaviour beyond defaults and small lookups.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// Animation Mode
// ─────────────────────────────────────────────────────────────────────────────

/// Animation style. Each mode has its own sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationMode {
    /// Light travelling around the ring
    #[default]
    Swirl,
    /// Whole ring pulsing
    Blink,
    /// One fade in/out of the ring
    Single,
}

impl AnimationMode {
    /// All modes, in sheet load order
    pub const ALL: [AnimationMode; 3] = [
        AnimationMode::Swirl,
        AnimationMode::Blink,
        AnimationMode::Single,
    ];

    /// Stable lowercase name (used for sprite strip file names)
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationMode::Swirl => "swirl",
            AnimationMode::Blink => "blink",
            AnimationMode::Single => "single",
        }
    }

    /// Index into per-mode arrays
    pub fn index(&self) -> usize {
        match self {
            AnimationMode::Swirl => 0,
            AnimationMode::Blink => 1,
            AnimationMode::Single => 2,
        }
    }
}

impl fmt::Display for AnimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Colors
// ─────────────────────────────────────────────────────────────────────────────

/// A 32-bit ARGB color, one per notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Argb(pub u32);

impl Argb {
    pub const BLACK: Argb = Argb(0xFF00_0000);
    pub const WHITE: Argb = Argb(0xFFFF_FFFF);
    pub const TRANSPARENT: Argb = Argb(0);

    #[inline]
    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Unpack into `[r, g, b, a]`
    pub fn to_rgba(self) -> [u8; 4] {
        [self.red(), self.green(), self.blue(), self.alpha()]
    }
}

impl From<u32> for Argb {
    fn from(value: u32) -> Self {
        Argb(value)
    }
}

/// Error returned when a color string is not 6 or 8 hex digits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseArgbError(pub String);

impl fmt::Display for ParseArgbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color '{}', expected RRGGBB or AARRGGBB", self.0)
    }
}

impl std::error::Error for ParseArgbError {}

impl FromStr for Argb {
    type Err = ParseArgbError;

    /// Parses `RRGGBB` (opaque) or `AARRGGBB`, with optional `#` or `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        let value =
            u32::from_str_radix(digits, 16).map_err(|_| ParseArgbError(s.to_string()))?;
        match digits.len() {
            6 => Ok(Argb(0xFF00_0000 | value)),
            8 => Ok(Argb(value)),
            _ => Err(ParseArgbError(s.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Light Settings
// ─────────────────────────────────────────────────────────────────────────────

/// User toggles controlling when the ring is shown and how it animates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    /// Show while the screen is on and unlocked
    pub enabled_screen_on: bool,
    /// Show on the lockscreen
    pub enabled_lockscreen: bool,
    /// Show while the screen is off (doze) and charging
    pub enabled_screen_off_charging: bool,
    /// Show while the screen is off (doze) on battery
    pub enabled_screen_off_battery: bool,
    /// Cover the always-on display with a black background while playing
    pub hide_aod: bool,
    /// Mode while the display is fully on
    pub mode_active: AnimationMode,
    /// Mode in doze while charging
    pub mode_doze_charging: AnimationMode,
    /// Mode in doze on battery
    pub mode_doze_battery: AnimationMode,
    /// Playback speed multiplier
    pub speed: f32,
    /// Extra size (dp, per side) added to the overlay while in doze
    pub doze_inset_dp: u32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            enabled_screen_on: true,
            enabled_lockscreen: true,
            enabled_screen_off_charging: true,
            enabled_screen_off_battery: true,
            hide_aod: false,
            mode_active: AnimationMode::Swirl,
            mode_doze_charging: AnimationMode::Swirl,
            mode_doze_battery: AnimationMode::Blink,
            speed: 1.0,
            doze_inset_dp: 1,
        }
    }
}

impl LightSettings {
    /// Toggle matching the current (on/off × locked/charging) combination
    pub fn enabled_for(&self, screen_on: bool, locked: bool, charging: bool) -> bool {
        match (screen_on, locked, charging) {
            (true, false, _) => self.enabled_screen_on,
            (true, true, _) => self.enabled_lockscreen,
            (false, _, true) => self.enabled_screen_off_charging,
            (false, _, false) => self.enabled_screen_off_battery,
        }
    }

    /// Configured mode for the given power/display state
    pub fn mode_for(&self, charging: bool, active_display: bool) -> AnimationMode {
        if active_display {
            self.mode_active
        } else if charging {
            self.mode_doze_charging
        } else {
            self.mode_doze_battery
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cutout Geometry
// ─────────────────────────────────────────────────────────────────────────────

/// Location of the display cutout the ring is drawn around (physical pixels)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutoutConfig {
    pub center_x: i32,
    pub center_y: i32,
    pub radius: u32,
    /// Extra space around the cutout for the ring itself
    pub ring_margin: u32,
    /// Pixels per dp
    pub density: f32,
}

impl Default for CutoutConfig {
    fn default() -> Self {
        Self {
            center_x: 540,
            center_y: 64,
            radius: 40,
            ring_margin: 32,
            density: 3.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine Tuning
// ─────────────────────────────────────────────────────────────────────────────

/// What to do when the display resolution changes (rotation excluded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// Ask the host to relaunch the process
    #[default]
    Restart,
    /// Re-layout and rebuild sprite sheets in place
    Rebuild,
}

/// Timing knobs for the render and event threads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Simulated vsync rate of the render thread
    pub refresh_hz: u32,
    /// Delay of the first re-evaluation after `show`
    pub first_recheck_ms: u64,
    /// Interval of further re-evaluations while wanted
    pub recheck_interval_ms: u64,
    /// Delay between deciding to restart and asking the host to relaunch
    pub restart_delay_ms: u64,
    /// Optional directory with `<mode>.png` sprite strips
    pub sprite_dir: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            refresh_hz: 60,
            first_recheck_ms: 500,
            recheck_interval_ms: 1000,
            restart_delay_ms: 1000,
            sprite_dir: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// App Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration persisted to disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub lights: LightSettings,
    #[serde(default)]
    pub cutout: CutoutConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub resolution_policy: ResolutionPolicy,
}
