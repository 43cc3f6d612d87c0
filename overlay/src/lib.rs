//! HoleyLight Overlay Library
//!
//! Animated light ring around the display cutout, driven by notification
//! colors and device power state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    controller/                      │
//! │      OverlayController, event thread, service       │
//! │    (show/hide state machine, window lifecycle)      │
//! ├─────────────────────────────────────────────────────┤
//! │                    player                           │
//! │                 AnimationRenderer                   │
//! │       (vsync frame loop, playback state)            │
//! ├─────────────────────────────────────────────────────┤
//! │           renderer            │   loader / sheets/  │
//! │     tiny-skia compositing     │  async sheet build  │
//! ├─────────────────────────────────────────────────────┤
//! │                    platform/                        │
//! │        WindowHost, RenderSurface, headless          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod controller;
pub mod error;
pub mod loader;
pub mod platform;
pub mod player;
pub mod renderer;
pub mod sheets;
pub mod sprite;
pub mod utils;
pub mod vsync;

// Re-export commonly used types
pub use controller::{
    ControlFlow, ControllerEvent, ControllerHandle, ControllerParts, LoopExit, OverlayController,
    OverlayService, spawn_controller,
};
pub use error::EngineError;
pub use loader::SheetLoader;
pub use platform::headless::{HeadlessHost, HeadlessSurface, HostCall, HostProbe, SurfaceProbe};
pub use platform::{
    DisplayArea, HostCapabilities, PlatformError, RenderSurface, WindowHost, WindowLayout,
};
pub use player::{
    AnimationListener, AnimationRenderer, NoopListener, PlayerPhase, RendererOptions,
};
pub use renderer::Compositor;
pub use sheets::{PngStripBuilder, RingSheetBuilder};
pub use sprite::{SheetBuilder, SheetError, SheetSet, SpriteSheet};
pub use vsync::{FrameScheduler, VsyncThread};

// Re-export tiny_skia Pixmap for hosts that provide their own surfaces
pub use tiny_skia::Pixmap;
