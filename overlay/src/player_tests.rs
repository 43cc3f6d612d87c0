//! Tests for AnimationRenderer frame loop and sheet handling
//!
//! Frames are driven by hand through `do_frame`; the scheduler only records
//! what the renderer asked for.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use holeylight_core::{AnimationMode, Argb};
use tiny_skia::{Color, Pixmap};

use super::{AnimationListener, AnimationRenderer, PlayerPhase, RendererOptions};
use crate::loader::SheetLoader;
use crate::platform::DisplayArea;
use crate::platform::headless::{HeadlessSurface, SurfaceProbe};
use crate::sprite::{SheetBuilder, SheetError, SheetSet, SpriteSheet};
use crate::vsync::FrameScheduler;

const RED: Argb = Argb(0xFFFF_0000);
const BLUE: Argb = Argb(0xFF00_00FF);

/// 10 fps sheets: one frame lasts 100ms
const FRAME_MS: u64 = 100;
const T0: u64 = 1_000_000_000;

fn at(ms: u64) -> u64 {
    T0 + ms * 1_000_000
}

#[derive(Default)]
struct RecordingScheduler {
    posts: AtomicUsize,
    removes: AtomicUsize,
    armed: AtomicBool,
}

impl FrameScheduler for RecordingScheduler {
    fn post_frame_callback(&self) {
        self.posts.fetch_add(1, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    fn remove_frame_callback(&self) {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.armed.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingListener {
    veto: AtomicBool,
    loop_on_complete: AtomicBool,
    starts: AtomicUsize,
    draws: AtomicUsize,
    completes: AtomicUsize,
    dimensions: Mutex<Vec<DisplayArea>>,
}

impl AnimationListener for RecordingListener {
    fn on_dimensions_applied(&self, area: DisplayArea) {
        self.dimensions.lock().unwrap().push(area);
    }

    fn on_frame_start(&self, draw: bool) -> bool {
        self.starts.fetch_add(1, Ordering::SeqCst);
        draw && !self.veto.load(Ordering::SeqCst)
    }

    fn on_frame_end(&self, drew: bool) {
        if drew {
            self.draws.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_complete(&self) -> bool {
        self.completes.fetch_add(1, Ordering::SeqCst);
        self.loop_on_complete.load(Ordering::SeqCst)
    }
}

/// Solid white frames, 10 fps
struct SolidSheets {
    frames: usize,
    builds: AtomicUsize,
}

impl SolidSheets {
    fn new(frames: usize) -> Self {
        Self {
            frames,
            builds: AtomicUsize::new(0),
        }
    }
}

impl SheetBuilder for SolidSheets {
    fn build(
        &self,
        width: u32,
        height: u32,
        mode: AnimationMode,
    ) -> Result<SpriteSheet, SheetError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let frames = (0..self.frames)
            .map(|_| {
                let mut pixmap = Pixmap::new(width, height).unwrap();
                pixmap.fill(Color::WHITE);
                pixmap
            })
            .collect();
        SpriteSheet::new(mode, width, height, 10.0, frames)
    }
}

struct Fixture {
    renderer: AnimationRenderer,
    scheduler: Arc<RecordingScheduler>,
    listener: Arc<RecordingListener>,
    surface: SurfaceProbe,
    builder: Arc<SolidSheets>,
}

fn fixture_with(frames: usize, apply_area: bool) -> Fixture {
    let (surface, probe) = HeadlessSurface::new(16, 16);
    let scheduler = Arc::new(RecordingScheduler::default());
    let listener = Arc::new(RecordingListener::default());
    let builder = Arc::new(SolidSheets::new(frames));

    let renderer = AnimationRenderer::new(
        RendererOptions {
            surface: Box::new(surface),
            loader: SheetLoader::inline(builder.clone()),
            refresh_hz: 60,
            scheduler: Some(scheduler.clone() as Arc<dyn FrameScheduler>),
        },
        listener.clone(),
    )
    .unwrap();
    if apply_area {
        renderer.update_display_area(DisplayArea::new(0, 0, 16, 16));
    }
    renderer.set_window_visible(true);

    Fixture {
        renderer,
        scheduler,
        listener,
        surface: probe,
        builder,
    }
}

fn fixture(frames: usize) -> Fixture {
    fixture_with(frames, true)
}

fn center_rgba(probe: &SurfaceProbe) -> [u8; 4] {
    let frame = probe.last_frame().unwrap();
    let p = frame.pixel(8, 8).unwrap();
    [p.red(), p.green(), p.blue(), p.alpha()]
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame index
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_frame_index_follows_elapsed_time() {
    let f = fixture(4);
    f.renderer.set_colors(&[RED]);
    f.renderer.play();
    assert_eq!(f.renderer.frame_index(), -1);

    f.renderer.do_frame(at(0));
    assert_eq!(f.renderer.frame_index(), 0);

    f.renderer.do_frame(at(250));
    assert_eq!(f.renderer.frame_index(), 2);

    f.renderer.do_frame(at(399));
    assert_eq!(f.renderer.frame_index(), 3);
    assert_eq!(f.listener.completes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_completion_fires_once_and_stops() {
    let f = fixture(4);
    f.renderer.set_colors(&[RED]);
    f.renderer.play();
    f.renderer.do_frame(at(0));
    f.renderer.do_frame(at(4 * FRAME_MS));

    assert_eq!(f.listener.completes.load(Ordering::SeqCst), 1);
    assert_eq!(f.renderer.frame_index(), -1);
    assert!(!f.renderer.is_animating());
    assert_eq!(f.renderer.phase(), PlayerPhase::Ready);

    // a stray callback after completion is ignored
    f.renderer.do_frame(at(5 * FRAME_MS));
    assert_eq!(f.listener.completes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_completion_loops_when_listener_asks() {
    let f = fixture(4);
    f.listener.loop_on_complete.store(true, Ordering::SeqCst);
    f.renderer.set_colors(&[RED]);
    f.renderer.play();

    f.renderer.do_frame(at(0));
    f.renderer.do_frame(at(400));
    assert!(f.renderer.is_animating());
    assert_eq!(f.listener.completes.load(Ordering::SeqCst), 1);

    // second pass starts from its own timestamp
    f.renderer.do_frame(at(410));
    assert_eq!(f.renderer.frame_index(), 0);
    f.renderer.do_frame(at(610));
    assert_eq!(f.renderer.frame_index(), 2);
    f.renderer.do_frame(at(810));
    assert_eq!(f.listener.completes.load(Ordering::SeqCst), 2);
}

#[test]
fn test_speed_scales_frame_rate() {
    let f = fixture(8);
    f.renderer.set_speed(2.0);
    f.renderer.set_colors(&[RED]);
    f.renderer.play();

    f.renderer.do_frame(at(0));
    f.renderer.do_frame(at(100));
    assert_eq!(f.renderer.frame_index(), 2);

    f.renderer.set_speed(-1.0);
    assert_eq!(f.renderer.speed(), 2.0);
}

#[test]
fn test_mode_switch_resets_frame_index() {
    let f = fixture(8);
    f.renderer.set_colors(&[RED]);
    f.renderer.play();
    f.renderer.do_frame(at(0));
    f.renderer.do_frame(at(200));
    assert_eq!(f.renderer.frame_index(), 2);

    f.renderer.set_mode(AnimationMode::Blink);
    assert_eq!(f.renderer.frame_index(), -1);
    f.renderer.do_frame(at(250));
    assert_eq!(f.renderer.frame_index(), 0);
    assert_eq!(f.renderer.mode(), AnimationMode::Blink);
}

// ─────────────────────────────────────────────────────────────────────────────
// Drawing
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_last_write_wins_colors() {
    let f = fixture(8);
    f.renderer.set_colors(&[RED]);
    f.renderer.set_colors(&[BLUE]);
    f.renderer.play();
    f.renderer.do_frame(at(0));
    assert_eq!(center_rgba(&f.surface), [0, 0, 255, 255]);

    f.renderer.set_colors(&[RED]);
    f.renderer.do_frame(at(10));
    assert_eq!(center_rgba(&f.surface), [255, 0, 0, 255]);
}

#[test]
fn test_unchanged_frame_is_not_redrawn() {
    let f = fixture(8);
    f.renderer.set_colors(&[RED]);
    f.renderer.play();
    f.renderer.do_frame(at(0));
    assert_eq!(f.surface.posts(), 1);

    // same index, same colors
    f.renderer.do_frame(at(50));
    assert_eq!(f.surface.posts(), 1);

    f.renderer.do_frame(at(100));
    assert_eq!(f.surface.posts(), 2);

    // setting colors invalidates the surface, even with an equal list
    f.renderer.set_colors(&[RED]);
    f.renderer.do_frame(at(110));
    assert_eq!(f.surface.posts(), 3);
}

#[test]
fn test_gate_veto_still_advances_frame() {
    let f = fixture(8);
    f.renderer.set_colors(&[RED]);
    f.renderer.play();
    f.listener.veto.store(true, Ordering::SeqCst);

    f.renderer.do_frame(at(0));
    f.renderer.do_frame(at(300));
    assert_eq!(f.renderer.frame_index(), 3);
    assert_eq!(f.surface.posts(), 0);
    assert_eq!(f.listener.starts.load(Ordering::SeqCst), 2);

    f.listener.veto.store(false, Ordering::SeqCst);
    f.renderer.do_frame(at(310));
    assert_eq!(f.surface.posts(), 1);
}

#[test]
fn test_locked_surface_skips_frame() {
    let f = fixture(8);
    f.renderer.set_colors(&[RED]);
    f.renderer.play();
    f.surface.set_lockable(false);

    f.renderer.do_frame(at(0));
    assert_eq!(f.surface.posts(), 0);
    assert_eq!(f.listener.draws.load(Ordering::SeqCst), 0);
    assert!(f.renderer.is_animating());

    // the skipped frame is still owed
    f.surface.set_lockable(true);
    f.renderer.do_frame(at(10));
    assert_eq!(f.surface.posts(), 1);
}

#[test]
fn test_draw_background_fills_black() {
    let f = fixture(8);
    f.renderer.update_display_area(DisplayArea::new(4, 4, 8, 8));
    f.renderer.set_draw_background(true);
    f.renderer.set_colors(&[RED]);
    f.renderer.play();
    f.renderer.do_frame(at(0));

    let frame = f.surface.last_frame().unwrap();
    let corner = frame.pixel(0, 0).unwrap();
    assert_eq!((corner.red(), corner.alpha()), (0, 255));
    assert_eq!(center_rgba(&f.surface), [255, 0, 0, 255]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame loop registration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_play_posts_and_frames_repost() {
    let f = fixture(8);
    f.renderer.set_colors(&[RED]);
    f.renderer.play();
    assert_eq!(f.scheduler.posts.load(Ordering::SeqCst), 1);
    assert_eq!(f.renderer.phase(), PlayerPhase::Playing);

    f.renderer.do_frame(at(0));
    assert_eq!(f.scheduler.posts.load(Ordering::SeqCst), 2);

    // play while playing does not restart the pass
    f.renderer.do_frame(at(200));
    f.renderer.play();
    assert_eq!(f.renderer.frame_index(), 2);
}

#[test]
fn test_stop_releases_callback() {
    let f = fixture(8);
    f.renderer.play();
    assert!(f.scheduler.armed.load(Ordering::SeqCst));

    f.renderer.stop();
    assert!(!f.scheduler.armed.load(Ordering::SeqCst));
    assert_eq!(f.scheduler.removes.load(Ordering::SeqCst), 1);
    assert!(!f.renderer.is_animating());

    let posts = f.scheduler.posts.load(Ordering::SeqCst);
    f.renderer.do_frame(at(0));
    assert_eq!(f.scheduler.posts.load(Ordering::SeqCst), posts);
}

#[test]
fn test_hidden_window_does_not_play() {
    let f = fixture(8);
    f.renderer.set_window_visible(false);
    f.renderer.play();
    assert_eq!(f.renderer.phase(), PlayerPhase::Ready);

    f.renderer.set_window_visible(true);
    assert_eq!(f.renderer.phase(), PlayerPhase::Playing);
}

#[test]
fn test_surface_destroyed_stops_loop() {
    let f = fixture(8);
    f.renderer.play();
    f.renderer.surface_destroyed();
    assert!(!f.renderer.is_animating());

    f.renderer.surface_created();
    assert!(f.renderer.is_animating());
}

#[test]
fn test_phase_idle_without_sheets() {
    let f = fixture_with(8, false);
    f.renderer.play();
    assert_eq!(f.renderer.phase(), PlayerPhase::Idle);

    // surface size becomes the display area and sheets are built
    f.renderer.surface_changed(16, 16);
    assert_eq!(f.renderer.phase(), PlayerPhase::Playing);
    assert_eq!(f.renderer.display_area(), DisplayArea::new(0, 0, 16, 16));
}

// ─────────────────────────────────────────────────────────────────────────────
// Sprite sheets
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_request_same_size_is_noop() {
    let f = fixture(4);
    assert_eq!(f.builder.builds.load(Ordering::SeqCst), 3);

    f.renderer.request_sprite_sheets(16, 16);
    assert_eq!(f.builder.builds.load(Ordering::SeqCst), 3);

    f.renderer.request_sprite_sheets(12, 12);
    assert_eq!(f.builder.builds.load(Ordering::SeqCst), 6);
}

#[test]
fn test_superseded_sheet_load_is_discarded() {
    let f = fixture(4);
    let stale = f.renderer.lock().request_seq;
    f.renderer.request_sprite_sheets(8, 8);

    // a 16x16 load finishing after the 8x8 request was made
    let mut old = SheetSet::default();
    for mode in AnimationMode::ALL {
        old.insert(f.builder.build(16, 16, mode).unwrap());
    }
    f.renderer.shared.install_sheets(stale, 16, 16, old);

    {
        let state = f.renderer.lock();
        assert!(state.sheets.matches(8, 8));
        assert!(!state.sheets.matches(16, 16));
        assert_eq!(state.last_request, Some((8, 8)));
        assert_eq!(state.loading, 0);
    }

    // 16x16 is still reachable by asking again
    let builds = f.builder.builds.load(Ordering::SeqCst);
    f.renderer.request_sprite_sheets(16, 16);
    assert_eq!(f.builder.builds.load(Ordering::SeqCst), builds + 3);
    assert!(f.renderer.lock().sheets.matches(16, 16));
}

#[test]
fn test_dimensions_applied_reported() {
    let f = fixture(4);
    f.renderer.update_display_area(DisplayArea::new(2, 2, 12, 12));
    let dims = f.listener.dimensions.lock().unwrap().clone();
    assert_eq!(
        dims,
        vec![DisplayArea::new(0, 0, 16, 16), DisplayArea::new(2, 2, 12, 12)]
    );
}

/// Blocks its first build until released
struct GatedSheets {
    gate: Mutex<Option<mpsc::Receiver<()>>>,
    inner: SolidSheets,
}

impl SheetBuilder for GatedSheets {
    fn build(
        &self,
        width: u32,
        height: u32,
        mode: AnimationMode,
    ) -> Result<SpriteSheet, SheetError> {
        if let Some(rx) = self.gate.lock().unwrap().take() {
            let _ = rx.recv_timeout(Duration::from_secs(10));
        }
        self.inner.build(width, height, mode)
    }
}

#[test]
fn test_loading_sheet_draws_blank_then_sprite() {
    let (release, gate) = mpsc::channel();
    let builder = Arc::new(GatedSheets {
        gate: Mutex::new(Some(gate)),
        inner: SolidSheets::new(4),
    });
    let (surface, probe) = HeadlessSurface::new(16, 16);
    let scheduler = Arc::new(RecordingScheduler::default());
    let renderer = AnimationRenderer::new(
        RendererOptions {
            surface: Box::new(surface),
            loader: SheetLoader::spawn(builder).unwrap(),
            refresh_hz: 60,
            scheduler: Some(scheduler.clone() as Arc<dyn FrameScheduler>),
        },
        Arc::new(RecordingListener::default()),
    )
    .unwrap();

    renderer.set_window_visible(true);
    renderer.set_colors(&[RED]);
    renderer.update_display_area(DisplayArea::new(0, 0, 16, 16));
    renderer.play();
    assert_eq!(renderer.phase(), PlayerPhase::Playing);

    renderer.do_frame(at(0));
    assert_eq!(center_rgba(&probe), [0, 0, 0, 0]);
    assert_eq!(renderer.frame_index(), -1);

    release.send(()).unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while renderer.frame_index() == -1 && Instant::now() < deadline {
        renderer.do_frame(at(10));
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(renderer.frame_index(), 0);
    assert_eq!(center_rgba(&probe), [255, 0, 0, 255]);
}
