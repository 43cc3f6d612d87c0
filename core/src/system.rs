//! Device state queries and system broadcasts
//!
//! The engine never caches device state: every evaluation polls the
//! [`SystemState`] collaborator through a fresh [`PowerSnapshot`].

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Failure to read a device state value. Abandons the current evaluation.
#[derive(Debug, Error)]
#[error("failed to query {what}: {reason}")]
pub struct SystemStateError {
    pub what: &'static str,
    pub reason: String,
}

impl SystemStateError {
    pub fn new(what: &'static str, reason: impl Into<String>) -> Self {
        Self {
            what,
            reason: reason.into(),
        }
    }
}

/// Wake locks the engine may ask the system to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeLock {
    /// Keeps the CPU awake briefly after screen-off so the AOD cover lands in time
    Cpu,
    /// Lets a doze frame reach the panel
    Draw,
}

/// Power, display and lock state provided by the host.
///
/// Implementations are queried from both the event thread and the render
/// thread (the doze frame gate), hence `Send + Sync`.
pub trait SystemState: Send + Sync {
    fn is_screen_on(&self) -> Result<bool, SystemStateError>;
    fn is_doze(&self) -> Result<bool, SystemStateError>;
    fn is_keyguard_locked(&self) -> Result<bool, SystemStateError>;
    fn is_charging(&self) -> Result<bool, SystemStateError>;

    /// Real display size in pixels
    fn resolution(&self) -> Result<Resolution, SystemStateError>;

    /// Hold a wake lock for at most `timeout`. Default: unsupported, no-op.
    fn hold_wake_lock(&self, _lock: WakeLock, _timeout: Duration) {}
}

/// One consistent read of the device state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerSnapshot {
    pub screen_on: bool,
    pub doze: bool,
    pub keyguard_locked: bool,
    pub charging: bool,
}

impl PowerSnapshot {
    pub fn query(state: &dyn SystemState) -> Result<Self, SystemStateError> {
        Ok(Self {
            screen_on: state.is_screen_on()?,
            doze: state.is_doze()?,
            keyguard_locked: state.is_keyguard_locked()?,
            charging: state.is_charging()?,
        })
    }
}

/// Display size in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if `other` is a different display size.
    ///
    /// A 90° rotation (width and height swapped) is the same display.
    pub fn differs_from(&self, other: &Resolution) -> bool {
        let same = self.width == other.width && self.height == other.height;
        let rotated = self.width == other.height && self.height == other.width;
        !same && !rotated
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Broadcasts the controller reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemSignal {
    ScreenOn,
    ScreenOff,
    UserPresent,
    PowerConnected,
    PowerDisconnected,
    /// Display configuration changed (rotation, resolution, density)
    ConfigurationChanged,
}

impl SystemSignal {
    /// Parse a signal name as used by the simulator and log output
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "screen_on" => Some(Self::ScreenOn),
            "screen_off" => Some(Self::ScreenOff),
            "user_present" => Some(Self::UserPresent),
            "power_connected" => Some(Self::PowerConnected),
            "power_disconnected" => Some(Self::PowerDisconnected),
            "configuration_changed" => Some(Self::ConfigurationChanged),
            _ => None,
        }
    }
}
