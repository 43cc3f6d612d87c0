//! Process-wide access to the controller
//!
//! Hosts bind once at startup; anything else in the process (notification
//! listeners, broadcast receivers) reaches the controller through
//! [`OverlayService::global`]. Calls made before the bind are dropped with a
//! warning.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use holeylight_core::{Argb, SystemSignal};

use super::spawn::{ControllerHandle, spawn_controller};
use super::ControllerParts;
use crate::error::EngineError;

enum ServiceSlot {
    Uninitialized,
    Bound(Arc<ControllerHandle>),
}

pub struct OverlayService {
    slot: Mutex<ServiceSlot>,
}

static GLOBAL: OnceLock<OverlayService> = OnceLock::new();

impl Default for OverlayService {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayService {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(ServiceSlot::Uninitialized),
        }
    }

    /// The process-wide instance
    pub fn global() -> &'static OverlayService {
        GLOBAL.get_or_init(OverlayService::new)
    }

    fn lock(&self) -> MutexGuard<'_, ServiceSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the controller if it is not running yet.
    ///
    /// A second bind returns the running controller and never calls `factory`.
    pub fn bind<F>(
        &self,
        factory: F,
        watch_config: Option<PathBuf>,
    ) -> Result<Arc<ControllerHandle>, EngineError>
    where
        F: FnOnce() -> Result<ControllerParts, String> + Send + 'static,
    {
        let mut slot = self.lock();
        if let ServiceSlot::Bound(handle) = &*slot {
            tracing::debug!("Overlay service already bound");
            return Ok(handle.clone());
        }
        let handle = Arc::new(spawn_controller(factory, watch_config)?);
        *slot = ServiceSlot::Bound(handle.clone());
        tracing::info!("Overlay service bound");
        Ok(handle)
    }

    pub fn handle(&self) -> Option<Arc<ControllerHandle>> {
        match &*self.lock() {
            ServiceSlot::Bound(handle) => Some(handle.clone()),
            ServiceSlot::Uninitialized => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(&*self.lock(), ServiceSlot::Bound(_))
    }

    pub fn show(&self, colors: Vec<Argb>) -> bool {
        match self.handle() {
            Some(handle) => handle.show(colors),
            None => {
                tracing::warn!("Show before the overlay service was bound");
                false
            }
        }
    }

    pub fn hide(&self, immediate: bool) -> bool {
        match self.handle() {
            Some(handle) => handle.hide(immediate),
            None => {
                tracing::warn!("Hide before the overlay service was bound");
                false
            }
        }
    }

    pub fn signal(&self, signal: SystemSignal) -> bool {
        match self.handle() {
            Some(handle) => handle.signal(signal),
            None => {
                tracing::warn!(?signal, "Signal before the overlay service was bound");
                false
            }
        }
    }

    /// Detach the running controller. It shuts down once the last handle is dropped.
    pub fn unbind(&self) -> Option<Arc<ControllerHandle>> {
        match std::mem::replace(&mut *self.lock(), ServiceSlot::Uninitialized) {
            ServiceSlot::Bound(handle) => Some(handle),
            ServiceSlot::Uninitialized => None,
        }
    }
}
