//! Event thread
//!
//! The controller lives on its own thread with a current-thread tokio
//! runtime. Everything that touches the window host happens there: show and
//! hide requests, system broadcasts, config file changes, the periodic
//! re-evaluation while the overlay is wanted, and the delayed relaunch after
//! a display resolution change.
//!
//! The controller's collaborators are built by a factory INSIDE the thread,
//! so hosts whose window handles are tied to the creating thread work
//! unchanged. Creation is confirmed back to the caller before
//! [`spawn_controller`] returns.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use holeylight_core::{AppConfig, AppConfigExt, Argb, ConfigChange, ConfigWatcher, SystemSignal};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use super::{ControlFlow, ControllerEvent, ControllerParts, LoopExit, OverlayController};
use crate::error::EngineError;

/// Name of the controller thread
pub const EVENT_THREAD_NAME: &str = "holeylight-events";

/// Start the controller on its own thread.
///
/// `factory` runs on the new thread. `watch_config` is the config file to
/// follow for live reloads.
pub fn spawn_controller<F>(
    factory: F,
    watch_config: Option<PathBuf>,
) -> Result<ControllerHandle, EngineError>
where
    F: FnOnce() -> Result<ControllerParts, String> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<ControllerEvent>();
    let (confirm_tx, confirm_rx) = std::sync::mpsc::channel::<Result<(), EngineError>>();
    let events = tx.clone();

    let thread = thread::Builder::new()
        .name(EVENT_THREAD_NAME.to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = confirm_tx.send(Err(EngineError::Runtime(e)));
                    return LoopExit::Disconnected;
                }
            };

            let controller = factory()
                .map_err(EngineError::Setup)
                .and_then(|parts| OverlayController::new(parts, events));
            let controller = match controller {
                Ok(controller) => {
                    let _ = confirm_tx.send(Ok(()));
                    controller
                }
                Err(e) => {
                    let _ = confirm_tx.send(Err(e));
                    return LoopExit::Disconnected;
                }
            };

            let watcher = watch_config.and_then(|path| {
                ConfigWatcher::new(&path)
                    .inspect_err(|e| tracing::warn!(error = %e, "Config hot reload disabled"))
                    .ok()
            });

            runtime.block_on(run(controller, rx, watcher))
        })
        .map_err(|source| EngineError::SpawnThread {
            name: EVENT_THREAD_NAME,
            source,
        })?;

    match confirm_rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            let _ = thread.join();
            return Err(e);
        }
        Err(_) => {
            let _ = thread.join();
            return Err(EngineError::StartupAborted);
        }
    }

    Ok(ControllerHandle {
        tx,
        thread: Mutex::new(Some(thread)),
    })
}

async fn run(
    mut controller: OverlayController,
    mut rx: UnboundedReceiver<ControllerEvent>,
    mut watcher: Option<ConfigWatcher>,
) -> LoopExit {
    let mut recheck_at: Option<Instant> = None;
    let mut restart_at: Option<Instant> = None;

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    controller.shutdown();
                    return LoopExit::Disconnected;
                };
                match controller.handle_event(event) {
                    ControlFlow::Continue => {}
                    ControlFlow::StartRechecks => {
                        let delay = controller.config().render.first_recheck_ms;
                        recheck_at = Some(Instant::now() + Duration::from_millis(delay));
                    }
                    ControlFlow::StopRechecks => recheck_at = None,
                    ControlFlow::Restart => {
                        if restart_at.is_none() {
                            let delay = Duration::from_millis(controller.config().render.restart_delay_ms);
                            tracing::info!(?delay, "Restarting after display change");
                            recheck_at = None;
                            controller.relaunch(delay);
                            restart_at = Some(Instant::now() + delay);
                        }
                    }
                    ControlFlow::Exit => return LoopExit::Shutdown,
                }
            }
            _ = sleep_until_opt(recheck_at) => {
                controller.evaluate();
                recheck_at = controller.is_wanted().then(|| {
                    Instant::now() + Duration::from_millis(controller.config().render.recheck_interval_ms)
                });
            }
            _ = sleep_until_opt(restart_at) => {
                controller.shutdown();
                return LoopExit::Restart;
            }
            change = next_change(&mut watcher) => match change {
                Some(ConfigChange::Modified(path)) => match AppConfig::load_from(&path) {
                    Ok(config) => controller.settings_changed(config),
                    Err(e) => tracing::warn!(error = %e, path = %path.display(), "Ignoring unreadable config"),
                },
                Some(ConfigChange::Removed(path)) => {
                    tracing::info!(path = %path.display(), "Config file removed, keeping current settings");
                }
                Some(ConfigChange::Error(e)) => tracing::warn!(error = %e, "Config watcher error"),
                None => watcher = None,
            },
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_change(watcher: &mut Option<ConfigWatcher>) -> Option<ConfigChange> {
    match watcher {
        Some(watcher) => watcher.next_change().await,
        None => std::future::pending().await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Sending side of a running controller. Dropping it shuts the controller down.
pub struct ControllerHandle {
    tx: UnboundedSender<ControllerEvent>,
    thread: Mutex<Option<JoinHandle<LoopExit>>>,
}

impl ControllerHandle {
    /// Queue an event. False if the controller is gone.
    pub fn send(&self, event: ControllerEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn show(&self, colors: Vec<Argb>) -> bool {
        self.send(ControllerEvent::Show(colors))
    }

    pub fn hide(&self, immediate: bool) -> bool {
        self.send(ControllerEvent::Hide { immediate })
    }

    pub fn signal(&self, signal: SystemSignal) -> bool {
        self.send(ControllerEvent::Signal(signal))
    }

    pub fn settings_changed(&self, config: AppConfig) -> bool {
        self.send(ControllerEvent::SettingsChanged(Box::new(config)))
    }

    pub fn shutdown(&self) -> bool {
        self.send(ControllerEvent::Shutdown)
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Block until the event loop ends. Later calls return `Disconnected`.
    pub fn wait(&self) -> LoopExit {
        let thread = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match thread {
            Some(thread) => thread.join().unwrap_or_else(|_| {
                tracing::error!("Event thread panicked");
                LoopExit::Disconnected
            }),
            None => LoopExit::Disconnected,
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(ControllerEvent::Shutdown);
    }
}
