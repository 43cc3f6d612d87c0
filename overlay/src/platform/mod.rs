//! Platform abstraction for the overlay window
//!
//! This module defines the traits a host must implement so the playback
//! engine stays platform-agnostic:
//!
//! - [`WindowHost`] attaches, moves and removes the overlay window. Only ever
//!   called from the event thread.
//! - [`RenderSurface`] hands out the pixel buffer the render thread draws into.
//!
//! A [`headless`] backend keeps everything in memory.

pub mod headless;

use std::time::Duration;

/// Window title announced to the host
pub const WINDOW_TITLE: &str = "HoleyLight";

/// Rectangle in screen (or window-local) pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayArea {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplayArea {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Same size, positioned at the origin
    pub fn local(&self) -> Self {
        Self::new(0, 0, self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Window placement and flags passed to the host
#[derive(Debug, Clone, PartialEq)]
pub struct WindowLayout {
    pub area: DisplayArea,
    pub title: &'static str,
    /// Ask the host not to animate moves/resizes (only if supported)
    pub no_move_animation: bool,
}

impl WindowLayout {
    pub fn new(area: DisplayArea, capabilities: HostCapabilities) -> Self {
        Self {
            area,
            title: WINDOW_TITLE,
            no_move_animation: capabilities.no_move_animation,
        }
    }
}

/// Optional features a host may support, discovered at bind time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostCapabilities {
    /// Window moves/resizes can be made instant
    pub no_move_animation: bool,
    /// The platform always-on display can be suppressed while we draw over it
    pub aod_control: bool,
    /// The host can relaunch the process after it exits
    pub relaunch: bool,
}

/// Errors that can occur in platform operations
#[derive(Debug)]
pub enum PlatformError {
    /// Window could not be added
    AttachFailed(String),
    /// Window could not be removed
    DetachFailed(String),
    /// Layout update rejected
    LayoutFailed(String),
    /// Drawing surface could not be posted
    SurfaceError(String),
    /// Required feature not available
    UnsupportedFeature(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::AttachFailed(s) => write!(f, "Attach failed: {}", s),
            PlatformError::DetachFailed(s) => write!(f, "Detach failed: {}", s),
            PlatformError::LayoutFailed(s) => write!(f, "Layout failed: {}", s),
            PlatformError::SurfaceError(s) => write!(f, "Surface error: {}", s),
            PlatformError::UnsupportedFeature(s) => write!(f, "Unsupported feature: {}", s),
        }
    }
}

impl std::error::Error for PlatformError {}

/// Host windowing subsystem. All calls happen on the event thread.
pub trait WindowHost {
    /// Feature probe
    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities::default()
    }

    /// Add the overlay window
    fn attach(&mut self, layout: &WindowLayout) -> Result<(), PlatformError>;

    /// Move/resize the attached window
    fn update_layout(&mut self, layout: &WindowLayout) -> Result<(), PlatformError>;

    /// Remove the overlay window
    fn detach(&mut self) -> Result<(), PlatformError>;

    /// Suppress (or restore) the platform always-on display
    fn set_aod_suppressed(&mut self, _suppressed: bool) -> Result<(), PlatformError> {
        Err(PlatformError::UnsupportedFeature("aod control".to_string()))
    }

    /// Arrange for the process to be started again `after` it exits
    fn schedule_relaunch(&mut self, _after: Duration) -> Result<(), PlatformError> {
        Err(PlatformError::UnsupportedFeature("relaunch".to_string()))
    }
}

/// Drawing surface owned by the render thread
pub trait RenderSurface: Send {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Resize the backing buffer
    fn set_size(&mut self, width: u32, height: u32);

    /// Get mutable access to the pixel buffer (premultiplied RGBA).
    /// Returns None if the surface cannot be locked right now.
    fn pixel_buffer(&mut self) -> Option<&mut [u8]>;

    /// Post the current pixel buffer to the screen
    fn commit(&mut self) -> Result<(), PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_area() {
        let area = DisplayArea::new(470, -6, 144, 144);
        assert_eq!(area.local(), DisplayArea::new(0, 0, 144, 144));
        assert!(!area.is_empty());
        assert!(DisplayArea::new(0, 0, 0, 10).is_empty());
    }

    #[test]
    fn test_layout_follows_capabilities() {
        let caps = HostCapabilities {
            no_move_animation: true,
            ..Default::default()
        };
        let layout = WindowLayout::new(DisplayArea::new(0, 0, 10, 10), caps);
        assert!(layout.no_move_animation);
        assert_eq!(layout.title, WINDOW_TITLE);
    }
}
