//! HoleyLight policy layer
//!
//! Everything here is platform-free: the queries the engine makes against the
//! device, the rules that turn those answers into a show/hide decision, the
//! doze frame gate, and configuration persistence.

pub mod context;
pub mod gate;
pub mod policy;
pub mod system;

// Re-exports for convenience
pub use context::{AppConfigExt, ConfigChange, ConfigError, ConfigWatcher};
pub use gate::{DozeFrameGate, FORCED_DRAW_INTERVAL};
pub use holeylight_types::{
    AnimationMode, AppConfig, Argb, CutoutConfig, LightSettings, RenderConfig, ResolutionPolicy,
};
pub use policy::{ConfiguredModes, ModePolicy, VisibilityDecision};
pub use system::{PowerSnapshot, Resolution, SystemSignal, SystemState, SystemStateError, WakeLock};
