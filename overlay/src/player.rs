//! Animation playback
//!
//! [`AnimationRenderer`] owns the render surface, the frame loop and the
//! per-mode sprite sheets. All of its mutable state sits behind one lock that
//! is taken by the render thread (each frame), the loader thread (sheet
//! installs) and the event thread (controller commands).
//!
//! # Frame loop
//!
//! The loop runs while `wanted`, the surface is visible, and the current
//! mode has a sheet (or one is loading). Each frame:
//!
//! 1. The first frame after a (re)start records the start time as frame 0.
//!    Later frames use `floor(elapsed / frame_duration)` where the frame
//!    duration is `1 / (frame_rate * speed)`.
//! 2. A draw is needed if the frame index or the colors changed, or the
//!    surface was invalidated. The listener may override that verdict.
//! 3. Once the index passes the last frame the pass is complete. The
//!    listener decides whether to loop; if not, drawing stops until the next
//!    [`AnimationRenderer::play`].

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use holeylight_core::{AnimationMode, Argb};
use tiny_skia::PixmapMut;

use crate::error::EngineError;
use crate::loader::SheetLoader;
use crate::platform::{DisplayArea, RenderSurface};
use crate::renderer::Compositor;
use crate::sprite::SheetSet;
use crate::utils::format_colors;
use crate::vsync::{FrameScheduler, VsyncThread};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Frame lifecycle hooks, given to the renderer once at construction.
///
/// The frame hooks run on the render thread with the renderer lock held and
/// must not call back into the renderer.
pub trait AnimationListener: Send + Sync {
    /// A new display area was applied
    fn on_dimensions_applied(&self, _area: DisplayArea) {}

    /// Frame gate. `draw` is whether anything changed; the return value
    /// decides whether the frame is drawn.
    fn on_frame_start(&self, draw: bool) -> bool {
        draw
    }

    fn on_frame_end(&self, _drew: bool) {}

    /// A pass reached its last frame. Return true to play it again.
    fn on_complete(&self) -> bool {
        false
    }
}

/// Listener that keeps every default
pub struct NoopListener;

impl AnimationListener for NoopListener {}

/// Coarse playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    /// No sheet for the current mode and nothing loading
    Idle,
    /// Sheets are being built
    Loading,
    /// Sheet available, frame loop not running
    Ready,
    /// Frame loop running
    Playing,
}

pub struct RendererOptions {
    pub surface: Box<dyn RenderSurface>,
    pub loader: SheetLoader,
    /// Rate of the built-in vsync thread
    pub refresh_hz: u32,
    /// Host frame clock. None starts a [`VsyncThread`].
    pub scheduler: Option<Arc<dyn FrameScheduler>>,
}

/// What the surface currently shows
#[derive(Debug, Clone, PartialEq)]
struct DrawnFrame {
    /// None for a blank frame
    index: Option<usize>,
    colors: Vec<Argb>,
}

struct PlaybackState {
    wanted: bool,
    drawing: bool,
    /// -1 until the first frame of a pass
    frame: i64,
    start_nanos: u64,
    mode: AnimationMode,
    colors: Vec<Argb>,
    speed: f32,
    surface_invalidated: bool,
    visible: bool,
    surface_ready: bool,
    area: DisplayArea,

    sheets: SheetSet,
    /// Loads in flight
    loading: u32,
    last_request: Option<(u32, u32)>,
    /// Bumped per request; loads finishing under an older value are stale
    request_seq: u64,

    drawn: Option<DrawnFrame>,
    compositor: Compositor,
    surface: Box<dyn RenderSurface>,
}

impl PlaybackState {
    fn restart_pass(&mut self) {
        self.frame = -1;
        self.surface_invalidated = true;
    }
}

struct Shared {
    state: Mutex<PlaybackState>,
    scheduler: Arc<dyn FrameScheduler>,
    listener: Arc<dyn AnimationListener>,
    loader: SheetLoader,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start or stop the frame loop to match the current state
    fn evaluate(&self, state: &mut PlaybackState) {
        let has_sheet = state.sheets.get(state.mode).is_some() || state.loading > 0;
        let run = state.wanted && has_sheet && state.visible && state.surface_ready;

        if run && !state.drawing {
            state.drawing = true;
            self.scheduler.post_frame_callback();
            tracing::debug!(mode = %state.mode, "Frame loop started");
        } else if !run && state.drawing {
            state.drawing = false;
            self.scheduler.remove_frame_callback();
            tracing::debug!(
                wanted = state.wanted,
                visible = state.visible,
                has_sheet,
                "Frame loop stopped"
            );
        }
    }

    fn install_sheets(&self, seq: u64, width: u32, height: u32, sheets: SheetSet) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.loading = state.loading.saturating_sub(1);
        if seq != state.request_seq {
            tracing::debug!(width, height, "Superseded sprite sheets dropped");
            self.evaluate(state);
            return;
        }
        if !sheets.is_complete() && state.last_request == Some((width, height)) {
            // allow the same size to be requested again
            state.last_request = None;
        }
        state.sheets = sheets;
        state.restart_pass();
        tracing::debug!(width, height, complete = state.sheets.is_complete(), "Sprite sheets installed");
        self.evaluate(state);
    }

    fn do_frame(&self, frame_time_nanos: u64) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if !state.drawing {
            return;
        }

        let sheet = state.sheets.get(state.mode).cloned();
        let mut complete = false;
        let index = match &sheet {
            Some(sheet) => {
                if state.frame < 0 {
                    state.start_nanos = frame_time_nanos;
                    state.frame = 0;
                } else {
                    let frame_nanos =
                        NANOS_PER_SECOND / f64::from(sheet.frame_rate() * state.speed);
                    let elapsed = frame_time_nanos.saturating_sub(state.start_nanos) as f64;
                    state.frame = (elapsed / frame_nanos).floor() as i64;
                }
                let last = sheet.frame_count() as i64 - 1;
                complete = state.frame > last;
                Some(state.frame.clamp(0, last) as usize)
            }
            None => None,
        };

        let changed = state.surface_invalidated
            || !matches!(&state.drawn, Some(d) if d.index == index && d.colors == state.colors);
        let draw = self.listener.on_frame_start(changed);

        let mut drew = false;
        if draw {
            let sprite = match (&sheet, index) {
                (Some(sheet), Some(index)) => sheet.frame(index),
                _ => None,
            };
            let (width, height) = (state.surface.width(), state.surface.height());
            let origin = (state.area.x, state.area.y);

            let rendered = match state.surface.pixel_buffer() {
                Some(buffer) => match PixmapMut::from_bytes(buffer, width, height) {
                    Some(mut target) => {
                        state
                            .compositor
                            .render_frame(&mut target, origin, sprite, &state.colors);
                        true
                    }
                    None => false,
                },
                None => {
                    tracing::trace!("Surface not available, skipping frame");
                    false
                }
            };
            if rendered {
                match state.surface.commit() {
                    Ok(()) => drew = true,
                    Err(e) => tracing::warn!(error = %e, "Failed to post frame"),
                }
            }

            if drew {
                state.drawn = Some(DrawnFrame {
                    index,
                    colors: state.colors.clone(),
                });
                state.surface_invalidated = false;
            }
        }
        self.listener.on_frame_end(drew);
        tracing::trace!(frame = state.frame, drew, "Frame");

        if complete {
            state.frame = -1;
            if !self.listener.on_complete() {
                state.drawing = false;
                tracing::debug!("Animation complete");
            }
        }

        if state.drawing {
            self.scheduler.post_frame_callback();
        }
    }
}

/// Sprite animation player
pub struct AnimationRenderer {
    shared: Arc<Shared>,
}

impl AnimationRenderer {
    pub fn new(
        options: RendererOptions,
        listener: Arc<dyn AnimationListener>,
    ) -> Result<Self, EngineError> {
        let RendererOptions {
            surface,
            loader,
            refresh_hz,
            scheduler,
        } = options;

        // The vsync thread is created before the state it drives
        let target: Arc<OnceLock<Weak<Shared>>> = Arc::new(OnceLock::new());
        let scheduler: Arc<dyn FrameScheduler> = match scheduler {
            Some(scheduler) => scheduler,
            None => {
                let target = target.clone();
                let vsync = VsyncThread::spawn(refresh_hz, move |frame_time| {
                    if let Some(shared) = target.get().and_then(Weak::upgrade) {
                        shared.do_frame(frame_time);
                    }
                })?;
                Arc::new(vsync) as Arc<dyn FrameScheduler>
            }
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(PlaybackState {
                wanted: false,
                drawing: false,
                frame: -1,
                start_nanos: 0,
                mode: AnimationMode::default(),
                colors: Vec::new(),
                speed: 1.0,
                surface_invalidated: true,
                visible: false,
                surface_ready: true,
                area: DisplayArea::default(),
                sheets: SheetSet::default(),
                loading: 0,
                last_request: None,
                request_seq: 0,
                drawn: None,
                compositor: Compositor::new(),
                surface,
            }),
            scheduler,
            listener,
            loader,
        });
        let _ = target.set(Arc::downgrade(&shared));

        Ok(Self { shared })
    }

    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.shared.lock()
    }

    /// Run one frame. Called by the frame scheduler; public so hosts with
    /// their own display clock (and tests) can drive the loop.
    pub fn do_frame(&self, frame_time_nanos: u64) {
        self.shared.do_frame(frame_time_nanos);
    }

    /// Make sure sheets for `width`x`height` exist or are on their way
    pub fn request_sprite_sheets(&self, width: u32, height: u32) {
        let seq = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if state.sheets.matches(width, height) || state.last_request == Some((width, height)) {
                return;
            }
            state.sheets.clear();
            state.last_request = Some((width, height));
            state.request_seq += 1;
            state.loading += 1;
            state.restart_pass();
            self.shared.evaluate(state);
            state.request_seq
        };
        tracing::debug!(width, height, "Requesting sprite sheets");

        let weak = Arc::downgrade(&self.shared);
        let submitted = self.shared.loader.submit(
            width,
            height,
            Box::new(move |sheets| {
                if let Some(shared) = weak.upgrade() {
                    shared.install_sheets(seq, width, height, sheets);
                }
            }),
        );
        if !submitted {
            tracing::warn!(width, height, "Sheet loader unavailable");
            let mut guard = self.lock();
            let state = &mut *guard;
            state.loading = state.loading.saturating_sub(1);
            if state.request_seq == seq {
                state.last_request = None;
            }
            self.shared.evaluate(state);
        }
    }

    pub fn play(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if !state.wanted {
            state.wanted = true;
            state.restart_pass();
        }
        self.shared.evaluate(state);
    }

    pub fn stop(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.wanted = false;
        self.shared.evaluate(state);
    }

    pub fn set_colors(&self, colors: &[Argb]) {
        let mut state = self.lock();
        tracing::trace!(colors = %format_colors(colors), "Colors set");
        state.colors = colors.to_vec();
        state.surface_invalidated = true;
    }

    pub fn set_mode(&self, mode: AnimationMode) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.mode == mode {
            return;
        }
        state.mode = mode;
        state.restart_pass();
        self.shared.evaluate(state);
    }

    /// Playback speed multiplier. Non-positive values are ignored.
    pub fn set_speed(&self, speed: f32) {
        if !speed.is_finite() || speed <= 0.0 {
            tracing::warn!(speed, "Ignoring invalid speed");
            return;
        }
        let mut state = self.lock();
        if state.speed != speed {
            state.speed = speed;
            state.restart_pass();
        }
    }

    pub fn set_draw_background(&self, draw_background: bool) {
        let mut state = self.lock();
        if state.compositor.draw_background() != draw_background {
            state.compositor.set_draw_background(draw_background);
            state.surface_invalidated = true;
        }
    }

    /// Position the drawable region inside the surface and load sheets for it
    pub fn update_display_area(&self, area: DisplayArea) {
        {
            let mut state = self.lock();
            // The surface spans the window, which ends where the area ends
            let need_w = area.x.max(0) as u32 + area.width;
            let need_h = area.y.max(0) as u32 + area.height;
            state.surface.set_size(need_w, need_h);
            state.area = area;
            state.surface_invalidated = true;
        }
        self.request_sprite_sheets(area.width, area.height);
        self.shared.listener.on_dimensions_applied(area);
    }

    /// The window holding the surface was shown or hidden
    pub fn set_window_visible(&self, visible: bool) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.visible = visible;
        if visible {
            state.surface_invalidated = true;
        }
        self.shared.evaluate(state);
    }

    pub fn surface_created(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.surface_ready = true;
        state.surface_invalidated = true;
        self.shared.evaluate(state);
    }

    pub fn surface_changed(&self, width: u32, height: u32) {
        let area_empty = {
            let mut state = self.lock();
            state.surface.set_size(width, height);
            state.surface_invalidated = true;
            if state.area.is_empty() {
                state.area = DisplayArea::new(0, 0, width, height);
                true
            } else {
                false
            }
        };
        if area_empty {
            self.request_sprite_sheets(width, height);
        }
    }

    pub fn surface_redraw_needed(&self) {
        let mut state = self.lock();
        state.surface_invalidated = true;
        if state.drawing {
            self.shared.scheduler.post_frame_callback();
        }
    }

    pub fn surface_destroyed(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.surface_ready = false;
        self.shared.evaluate(state);
    }

    pub fn phase(&self) -> PlayerPhase {
        let state = self.lock();
        if state.drawing {
            PlayerPhase::Playing
        } else if state.loading > 0 {
            PlayerPhase::Loading
        } else if state.sheets.get(state.mode).is_some() {
            PlayerPhase::Ready
        } else {
            PlayerPhase::Idle
        }
    }

    pub fn is_animating(&self) -> bool {
        self.lock().drawing
    }

    /// Current frame index, -1 before the first frame of a pass
    pub fn frame_index(&self) -> i64 {
        self.lock().frame
    }

    pub fn mode(&self) -> AnimationMode {
        self.lock().mode
    }

    pub fn colors(&self) -> Vec<Argb> {
        self.lock().colors.clone()
    }

    pub fn speed(&self) -> f32 {
        self.lock().speed
    }

    pub fn display_area(&self) -> DisplayArea {
        self.lock().area
    }
}

impl Drop for AnimationRenderer {
    fn drop(&mut self) {
        self.shared.scheduler.remove_frame_callback();
    }
}

#[cfg(test)]
#[path = "player_tests.rs"]
mod tests;
