//! In-memory platform backend
//!
//! Used by the simulator and the test suites. The surface keeps a copy of the
//! last posted frame, and the host records every window call. Both hand out a
//! cloneable probe so the owner can inspect them after moving the backend
//! into the engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tiny_skia::{IntSize, Pixmap};

use super::{
    DisplayArea, HostCapabilities, PlatformError, RenderSurface, WindowHost, WindowLayout,
};

// ─────────────────────────────────────────────────────────────────────────────
// Surface
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct SurfaceShared {
    lockable: bool,
    posts: u64,
    last_frame: Option<Pixmap>,
}

/// Inspection handle for a [`HeadlessSurface`]
#[derive(Debug, Clone)]
pub struct SurfaceProbe {
    shared: Arc<Mutex<SurfaceShared>>,
}

impl SurfaceProbe {
    fn lock(&self) -> MutexGuard<'_, SurfaceShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of frames posted so far
    pub fn posts(&self) -> u64 {
        self.lock().posts
    }

    /// Copy of the last posted frame
    pub fn last_frame(&self) -> Option<Pixmap> {
        self.lock().last_frame.clone()
    }

    /// Simulate a surface that cannot be locked (not created yet, or busy)
    pub fn set_lockable(&self, lockable: bool) {
        self.lock().lockable = lockable;
    }
}

/// Surface backed by a plain byte buffer
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
    shared: Arc<Mutex<SurfaceShared>>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> (Self, SurfaceProbe) {
        let shared = Arc::new(Mutex::new(SurfaceShared {
            lockable: true,
            posts: 0,
            last_frame: None,
        }));
        let surface = Self {
            width,
            height,
            buffer: vec![0u8; (width * height * 4) as usize],
            shared: shared.clone(),
        };
        (surface, SurfaceProbe { shared })
    }
}

impl RenderSurface for HeadlessSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.buffer = vec![0u8; (width * height * 4) as usize];
    }

    fn pixel_buffer(&mut self) -> Option<&mut [u8]> {
        let lockable = self
            .shared
            .lock()
            .map(|s| s.lockable)
            .unwrap_or(false);
        if !lockable || self.buffer.is_empty() {
            return None;
        }
        Some(&mut self.buffer)
    }

    fn commit(&mut self) -> Result<(), PlatformError> {
        let size = IntSize::from_wh(self.width, self.height)
            .ok_or_else(|| PlatformError::SurfaceError("zero-sized surface".to_string()))?;
        let frame = Pixmap::from_vec(self.buffer.clone(), size)
            .ok_or_else(|| PlatformError::SurfaceError("buffer size mismatch".to_string()))?;
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        shared.posts += 1;
        shared.last_frame = Some(frame);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Window Host
// ─────────────────────────────────────────────────────────────────────────────

/// A window call recorded by [`HeadlessHost`]
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Attach(DisplayArea),
    UpdateLayout(DisplayArea),
    Detach,
    AodSuppressed(bool),
    ScheduleRelaunch(Duration),
}

#[derive(Debug, Default)]
struct HostShared {
    calls: Vec<HostCall>,
    attached: bool,
    fail_next_attach: bool,
    fail_next_detach: bool,
}

/// Inspection and fault-injection handle for a [`HeadlessHost`]
#[derive(Debug, Clone)]
pub struct HostProbe {
    shared: Arc<Mutex<HostShared>>,
}

impl HostProbe {
    fn lock(&self) -> MutexGuard<'_, HostShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.lock().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<HostCall> {
        std::mem::take(&mut self.lock().calls)
    }

    pub fn is_attached(&self) -> bool {
        self.lock().attached
    }

    /// Make the next attach fail once
    pub fn fail_next_attach(&self) {
        self.lock().fail_next_attach = true;
    }

    /// Make the next detach fail once
    pub fn fail_next_detach(&self) {
        self.lock().fail_next_detach = true;
    }
}

/// Window host that only records what it is asked to do
pub struct HeadlessHost {
    capabilities: HostCapabilities,
    shared: Arc<Mutex<HostShared>>,
}

impl HeadlessHost {
    pub fn new(capabilities: HostCapabilities) -> (Self, HostProbe) {
        let shared = Arc::new(Mutex::new(HostShared::default()));
        let host = Self {
            capabilities,
            shared: shared.clone(),
        };
        (host, HostProbe { shared })
    }

    fn lock(&self) -> MutexGuard<'_, HostShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WindowHost for HeadlessHost {
    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    fn attach(&mut self, layout: &WindowLayout) -> Result<(), PlatformError> {
        let mut shared = self.lock();
        if std::mem::take(&mut shared.fail_next_attach) {
            return Err(PlatformError::AttachFailed("injected failure".to_string()));
        }
        if shared.attached {
            return Err(PlatformError::AttachFailed(
                "window already attached".to_string(),
            ));
        }
        shared.attached = true;
        shared.calls.push(HostCall::Attach(layout.area));
        Ok(())
    }

    fn update_layout(&mut self, layout: &WindowLayout) -> Result<(), PlatformError> {
        let mut shared = self.lock();
        if !shared.attached {
            return Err(PlatformError::LayoutFailed("window not attached".to_string()));
        }
        shared.calls.push(HostCall::UpdateLayout(layout.area));
        Ok(())
    }

    fn detach(&mut self) -> Result<(), PlatformError> {
        let mut shared = self.lock();
        if std::mem::take(&mut shared.fail_next_detach) {
            return Err(PlatformError::DetachFailed("injected failure".to_string()));
        }
        if !shared.attached {
            return Err(PlatformError::DetachFailed("window not attached".to_string()));
        }
        shared.attached = false;
        shared.calls.push(HostCall::Detach);
        Ok(())
    }

    fn set_aod_suppressed(&mut self, suppressed: bool) -> Result<(), PlatformError> {
        if !self.capabilities.aod_control {
            return Err(PlatformError::UnsupportedFeature("aod control".to_string()));
        }
        self.lock().calls.push(HostCall::AodSuppressed(suppressed));
        Ok(())
    }

    fn schedule_relaunch(&mut self, after: Duration) -> Result<(), PlatformError> {
        if !self.capabilities.relaunch {
            return Err(PlatformError::UnsupportedFeature("relaunch".to_string()));
        }
        self.lock().calls.push(HostCall::ScheduleRelaunch(after));
        Ok(())
    }
}
