//! Renderer callbacks owned by the controller
//!
//! These run on the render thread with the renderer lock held. Anything that
//! needs the window host is forwarded to the event thread as a
//! [`ControllerEvent`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use holeylight_core::{DozeFrameGate, SystemState, WakeLock};
use tokio::sync::mpsc::UnboundedSender;

use super::ControllerEvent;
use crate::platform::DisplayArea;
use crate::player::AnimationListener;

/// Draw wake lock held after each doze frame
pub const DRAW_WAKE_LOCK: Duration = Duration::from_millis(250);

pub struct ControllerHooks {
    system: Arc<dyn SystemState>,
    events: UnboundedSender<ControllerEvent>,
    gate: Mutex<DozeFrameGate>,
    /// Finish the current pass, then report instead of looping
    stop_requested: AtomicBool,
}

impl ControllerHooks {
    pub fn new(system: Arc<dyn SystemState>, events: UnboundedSender<ControllerEvent>) -> Self {
        Self {
            system,
            events,
            gate: Mutex::new(DozeFrameGate::new()),
            stop_requested: AtomicBool::new(false),
        }
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn cancel_stop(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    pub fn stop_pending(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    fn is_doze(&self) -> bool {
        self.system.is_doze().unwrap_or_else(|e| {
            tracing::trace!(error = %e, "Doze query failed, assuming awake");
            false
        })
    }
}

impl AnimationListener for ControllerHooks {
    fn on_dimensions_applied(&self, area: DisplayArea) {
        let _ = self.events.send(ControllerEvent::DimensionsApplied(area));
    }

    fn on_frame_start(&self, draw: bool) -> bool {
        let doze = self.is_doze();
        self.gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_frame_start(draw, doze)
    }

    fn on_frame_end(&self, drew: bool) {
        if drew && self.is_doze() {
            self.system.hold_wake_lock(WakeLock::Draw, DRAW_WAKE_LOCK);
        }
    }

    fn on_complete(&self) -> bool {
        if self.stop_requested.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(ControllerEvent::AnimationComplete);
            return false;
        }
        true
    }
}
