//! Overlay controller
//!
//! Decides whether the ring should be on screen and keeps the window and the
//! renderer in line with that decision. Everything here runs on the event
//! thread; see [`spawn`] for the loop that feeds it.
//!
//! # Evaluation
//!
//! Each [`OverlayController::evaluate`] polls the device state afresh and
//! combines it with the user toggles and the wanted flag:
//!
//! - Effectively wanted, visible, colors present: if anything changed since
//!   the last apply (colors, mode, doze inset), push mode, geometry and
//!   colors to the renderer, attach the window and play.
//! - Otherwise, if a show was applied: stop. Immediately (detach now) when
//!   the display is fully off or a kill was requested, otherwise let the
//!   current pass finish and detach when the renderer reports completion.
//!
//! Re-running with unchanged inputs does nothing. Failed window calls are
//! logged and retried on the next evaluation.

mod hooks;
mod layout;
mod service;
mod spawn;
mod state;

pub use hooks::{ControllerHooks, DRAW_WAKE_LOCK};
pub use layout::{overlay_area, scale_cutout};
pub use service::OverlayService;
pub use spawn::{ControllerHandle, spawn_controller};
pub use state::OverlayState;

use std::sync::Arc;
use std::time::Duration;

use holeylight_core::{
    AppConfig, Argb, ModePolicy, PowerSnapshot, ResolutionPolicy, SystemSignal, SystemState,
    VisibilityDecision, WakeLock,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::EngineError;
use crate::loader::SheetLoader;
use crate::platform::{DisplayArea, PlatformError, RenderSurface, WindowHost, WindowLayout};
use crate::player::{AnimationRenderer, RendererOptions};
use crate::sprite::SheetBuilder;
use crate::utils::format_colors;
use crate::vsync::FrameScheduler;

/// CPU wake lock taken on screen-off while covering the always-on display
pub const AOD_WAKE_LOCK: Duration = Duration::from_secs(10);

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Messages handled on the event thread
#[derive(Debug)]
pub enum ControllerEvent {
    /// Show these colors (empty hides)
    Show(Vec<Argb>),
    Hide { immediate: bool },
    Signal(SystemSignal),
    /// Configuration reloaded
    SettingsChanged(Box<AppConfig>),
    /// Renderer applied a new display area
    DimensionsApplied(DisplayArea),
    /// Renderer finished its last pass after a graceful stop
    AnimationComplete,
    /// Re-evaluate now
    Recheck,
    Shutdown,
}

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    /// Wanted: (re)start the periodic re-evaluation
    StartRechecks,
    /// No longer wanted: drop pending re-evaluations
    StopRechecks,
    /// Display changed size; relaunch the process
    Restart,
    Exit,
}

/// Why the event loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    /// A relaunch was requested; the process should start over
    Restart,
    /// All senders are gone or the thread died
    Disconnected,
}

/// Collaborators the controller is built from
pub struct ControllerParts {
    pub host: Box<dyn WindowHost>,
    pub system: Arc<dyn SystemState>,
    pub modes: Box<dyn ModePolicy>,
    pub config: AppConfig,
    pub surface: Box<dyn RenderSurface>,
    pub builder: Arc<dyn SheetBuilder>,
    /// Host frame clock. None starts the built-in vsync thread.
    pub scheduler: Option<Arc<dyn FrameScheduler>>,
    /// Build sheets on the calling thread instead of the loader thread
    pub inline_loader: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────────────────────────

pub struct OverlayController {
    host: Box<dyn WindowHost>,
    system: Arc<dyn SystemState>,
    modes: Box<dyn ModePolicy>,
    config: AppConfig,
    renderer: AnimationRenderer,
    hooks: Arc<ControllerHooks>,
    state: OverlayState,
    /// Window placement in screen coordinates
    window_area: DisplayArea,
}

impl OverlayController {
    pub fn new(
        parts: ControllerParts,
        events: UnboundedSender<ControllerEvent>,
    ) -> Result<Self, EngineError> {
        let ControllerParts {
            host,
            system,
            mut modes,
            config,
            surface,
            builder,
            scheduler,
            inline_loader,
        } = parts;

        let hooks = Arc::new(ControllerHooks::new(system.clone(), events));
        let loader = if inline_loader {
            SheetLoader::inline(builder)
        } else {
            SheetLoader::spawn(builder)?
        };
        let renderer = AnimationRenderer::new(
            RendererOptions {
                surface,
                loader,
                refresh_hz: config.render.refresh_hz,
                scheduler,
            },
            hooks.clone(),
        )?;
        renderer.set_speed(config.lights.speed);
        modes.settings_changed(&config.lights);

        let resolution = system
            .resolution()
            .inspect_err(|e| tracing::warn!(error = %e, "Could not read display resolution"))
            .ok();
        if let Some(resolution) = resolution {
            tracing::info!(%resolution, "Overlay controller ready");
        }

        Ok(Self {
            host,
            system,
            modes,
            window_area: layout::overlay_area(&config.cutout, 0),
            config,
            renderer,
            hooks,
            state: OverlayState {
                resolution,
                ..Default::default()
            },
        })
    }

    pub fn renderer(&self) -> &AnimationRenderer {
        &self.renderer
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn window_area(&self) -> DisplayArea {
        self.window_area
    }

    pub fn is_wanted(&self) -> bool {
        self.state.wanted
    }

    /// Dispatch one event
    pub fn handle_event(&mut self, event: ControllerEvent) -> ControlFlow {
        match event {
            ControllerEvent::Show(colors) => {
                if self.show(colors) {
                    ControlFlow::StartRechecks
                } else {
                    ControlFlow::StopRechecks
                }
            }
            ControllerEvent::Hide { immediate } => {
                self.hide(immediate);
                ControlFlow::StopRechecks
            }
            ControllerEvent::Signal(signal) => self.handle_signal(signal),
            ControllerEvent::SettingsChanged(config) => {
                self.settings_changed(*config);
                ControlFlow::Continue
            }
            ControllerEvent::DimensionsApplied(area) => {
                self.dimensions_applied(area);
                ControlFlow::Continue
            }
            ControllerEvent::AnimationComplete => {
                self.animation_complete();
                ControlFlow::Continue
            }
            ControllerEvent::Recheck => {
                self.evaluate();
                ControlFlow::Continue
            }
            ControllerEvent::Shutdown => {
                self.shutdown();
                ControlFlow::Exit
            }
        }
    }

    /// Show `colors`. An empty list hides. Returns whether the overlay is wanted.
    pub fn show(&mut self, colors: Vec<Argb>) -> bool {
        if colors.is_empty() {
            self.state.colors.clear();
            self.hide(false);
            return false;
        }
        tracing::debug!(colors = %format_colors(&colors), "Show");
        self.state.colors = colors;
        self.state.wanted = true;
        self.state.kill = false;
        self.evaluate();
        true
    }

    pub fn hide(&mut self, immediate: bool) {
        tracing::debug!(immediate, "Hide");
        self.state.wanted = false;
        self.state.kill = immediate;
        self.evaluate();
    }

    /// Bring the window and renderer in line with the current device state
    pub fn evaluate(&mut self) {
        let snapshot = match PowerSnapshot::query(self.system.as_ref()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "State query failed, skipping evaluation");
                return;
            }
        };
        let decision =
            VisibilityDecision::compute(&snapshot, &self.config.lights, self.state.wanted);
        let show = decision.should_show(!self.state.colors.is_empty());
        tracing::debug!(?snapshot, show, applied = self.state.applied, "Evaluate");

        if show {
            self.hooks.cancel_stop();
            let active_display = decision.screen_on && !decision.doze;
            let mode = self.modes.select_mode(decision.charging, active_display);
            let inset_dp = decision.inset_dp(&self.config.lights);
            if !self.state.differs(mode, inset_dp) && self.state.added {
                return;
            }

            self.renderer.set_mode(mode);
            if !self.state.added || self.state.last_inset_dp != Some(inset_dp) {
                self.apply_dimensions(inset_dp);
            }
            self.create_overlay();

            let hide_aod = self.config.lights.hide_aod && decision.doze;
            self.renderer.set_draw_background(hide_aod);
            self.set_aod_suppressed(hide_aod);

            self.renderer.set_colors(&self.state.colors);
            self.renderer.play();
            self.state.record_applied(mode, inset_dp);
            tracing::info!(%mode, inset_dp, colors = %format_colors(&self.state.colors), "Overlay applied");
        } else if self.state.applied {
            self.state.clear_applied();
            self.set_aod_suppressed(false);

            let immediate = !decision.visible || self.state.kill || !self.renderer.is_animating();
            if immediate {
                self.hooks.cancel_stop();
                self.remove_overlay();
            } else {
                tracing::debug!("Stopping after current pass");
                self.hooks.request_stop();
            }
        } else if self.state.added
            && (self.state.kill || !decision.visible || !self.hooks.stop_pending())
        {
            // kill during a graceful stop, or a detach that failed earlier
            self.hooks.cancel_stop();
            self.remove_overlay();
        }
    }

    pub fn handle_signal(&mut self, signal: SystemSignal) -> ControlFlow {
        tracing::debug!(?signal, "System signal");
        match signal {
            SystemSignal::ConfigurationChanged => return self.configuration_changed(),
            SystemSignal::ScreenOff => {
                if self.config.lights.hide_aod {
                    self.system.hold_wake_lock(WakeLock::Cpu, AOD_WAKE_LOCK);
                }
                self.evaluate();
            }
            SystemSignal::ScreenOn
            | SystemSignal::UserPresent
            | SystemSignal::PowerConnected
            | SystemSignal::PowerDisconnected => self.evaluate(),
        }
        ControlFlow::Continue
    }

    fn configuration_changed(&mut self) -> ControlFlow {
        let now = match self.system.resolution() {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read display resolution");
                return ControlFlow::Continue;
            }
        };
        let Some(previous) = self.state.resolution.filter(|prev| prev.differs_from(&now)) else {
            self.state.resolution = Some(now);
            if self.state.added {
                let inset_dp = self.state.last_inset_dp.unwrap_or(0);
                self.apply_dimensions(inset_dp);
            }
            return ControlFlow::Continue;
        };

        tracing::info!(from = %previous, to = %now, "Display resolution changed");
        self.state.resolution = Some(now);
        match self.config.resolution_policy {
            ResolutionPolicy::Restart => ControlFlow::Restart,
            ResolutionPolicy::Rebuild => {
                self.config.cutout = layout::scale_cutout(&self.config.cutout, previous, now);
                self.state.invalidate_applied();
                self.evaluate();
                ControlFlow::Continue
            }
        }
    }

    pub fn settings_changed(&mut self, config: AppConfig) {
        if config.cutout != self.config.cutout {
            self.state.invalidate_applied();
        }
        self.modes.settings_changed(&config.lights);
        self.renderer.set_speed(config.lights.speed);
        self.config = config;
        tracing::info!("Settings changed");
        self.evaluate();
    }

    /// The renderer positioned its drawable area; follow with the window
    pub fn dimensions_applied(&mut self, area: DisplayArea) {
        if !self.state.added {
            return;
        }
        tracing::trace!(?area, window = ?self.window_area, "Dimensions applied");
        let layout = WindowLayout::new(self.window_area, self.host.capabilities());
        if let Err(e) = self.host.update_layout(&layout) {
            tracing::warn!(error = %e, "Failed to update overlay layout");
        }
    }

    pub fn animation_complete(&mut self) {
        if self.state.applied {
            // shown again before the pass ended
            return;
        }
        self.remove_overlay();
    }

    /// Ask the host to start us again after `delay`
    pub fn relaunch(&mut self, delay: Duration) {
        self.renderer.stop();
        self.remove_overlay();
        match self.host.schedule_relaunch(delay) {
            Ok(()) => tracing::info!(?delay, "Relaunch scheduled"),
            Err(e) => tracing::warn!(error = %e, "Host cannot relaunch"),
        }
    }

    pub fn shutdown(&mut self) {
        self.state.wanted = false;
        self.hooks.cancel_stop();
        self.set_aod_suppressed(false);
        self.remove_overlay();
        tracing::info!("Overlay controller shut down");
    }

    fn apply_dimensions(&mut self, inset_dp: u32) {
        self.window_area = layout::overlay_area(&self.config.cutout, inset_dp);
        self.renderer.update_display_area(self.window_area.local());
    }

    fn create_overlay(&mut self) {
        if self.state.added {
            return;
        }
        let layout = WindowLayout::new(self.window_area, self.host.capabilities());
        match self.host.attach(&layout) {
            Ok(()) => {
                self.state.added = true;
                self.renderer.set_window_visible(true);
                tracing::debug!(area = ?self.window_area, "Overlay attached");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to attach overlay"),
        }
    }

    fn remove_overlay(&mut self) {
        self.renderer.set_window_visible(false);
        self.renderer.stop();
        if !self.state.added {
            return;
        }
        match self.host.detach() {
            Ok(()) => {
                self.state.added = false;
                tracing::debug!("Overlay detached");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to detach overlay"),
        }
    }

    fn set_aod_suppressed(&mut self, suppressed: bool) {
        if self.state.aod_suppressed == suppressed || !self.host.capabilities().aod_control {
            return;
        }
        match self.host.set_aod_suppressed(suppressed) {
            Ok(()) => self.state.aod_suppressed = suppressed,
            Err(PlatformError::UnsupportedFeature(_)) => {}
            Err(e) => tracing::warn!(error = %e, suppressed, "Failed to toggle always-on display"),
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
