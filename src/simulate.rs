//! Headless simulation
//!
//! Runs the whole engine (event thread, loader, vsync thread, renderer)
//! against the in-memory host and surface while a script flips the simulated
//! device between awake, doze and off.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Args;

use holeylight_core::{
    AnimationMode, AppConfig, AppConfigExt, Argb, ConfiguredModes, Resolution, SystemSignal,
    SystemState, SystemStateError, WakeLock,
};
use holeylight_overlay::sheets::{SHEET_FRAME_RATE, frames_per_pass};
use holeylight_overlay::{
    ControllerParts, HeadlessHost, HeadlessSurface, HostCapabilities, LoopExit, OverlayService,
    PngStripBuilder, RingSheetBuilder, SheetBuilder,
};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Notification colors (RRGGBB or AARRGGBB), comma separated
    #[arg(long, value_delimiter = ',', default_value = "00ff00")]
    colors: Vec<Argb>,

    /// Seconds to keep the notification pending
    #[arg(long, default_value_t = 5.0)]
    seconds: f32,

    /// Enter doze after this many seconds
    #[arg(long)]
    doze_at: Option<f32>,

    /// Turn the display fully off after this many seconds
    #[arg(long)]
    off_at: Option<f32>,

    /// Report the device as charging
    #[arg(long)]
    charging: bool,

    /// Write the last posted frame to DIR/last_frame.png
    #[arg(long, value_name = "DIR")]
    dump: Option<PathBuf>,

    /// Display size reported by the device
    #[arg(long, default_value_t = 1080)]
    width: u32,

    #[arg(long, default_value_t = 2280)]
    height: u32,
}

/// Device whose state is flipped by the script
pub struct SimulatedDevice {
    screen_on: AtomicBool,
    doze: AtomicBool,
    locked: AtomicBool,
    charging: AtomicBool,
    width: AtomicU32,
    height: AtomicU32,
}

impl SimulatedDevice {
    pub fn new(resolution: Resolution, charging: bool) -> Self {
        Self {
            screen_on: AtomicBool::new(true),
            doze: AtomicBool::new(false),
            locked: AtomicBool::new(false),
            charging: AtomicBool::new(charging),
            width: AtomicU32::new(resolution.width),
            height: AtomicU32::new(resolution.height),
        }
    }

    /// Screen off into doze. The keyguard engages with it.
    pub fn enter_doze(&self) {
        self.screen_on.store(false, Ordering::SeqCst);
        self.doze.store(true, Ordering::SeqCst);
        self.locked.store(true, Ordering::SeqCst);
    }

    pub fn power_off_display(&self) {
        self.screen_on.store(false, Ordering::SeqCst);
        self.doze.store(false, Ordering::SeqCst);
        self.locked.store(true, Ordering::SeqCst);
    }
}

impl SystemState for SimulatedDevice {
    fn is_screen_on(&self) -> Result<bool, SystemStateError> {
        Ok(self.screen_on.load(Ordering::SeqCst))
    }

    fn is_doze(&self) -> Result<bool, SystemStateError> {
        Ok(self.doze.load(Ordering::SeqCst))
    }

    fn is_keyguard_locked(&self) -> Result<bool, SystemStateError> {
        Ok(self.locked.load(Ordering::SeqCst))
    }

    fn is_charging(&self) -> Result<bool, SystemStateError> {
        Ok(self.charging.load(Ordering::SeqCst))
    }

    fn resolution(&self) -> Result<Resolution, SystemStateError> {
        Ok(Resolution::new(
            self.width.load(Ordering::SeqCst),
            self.height.load(Ordering::SeqCst),
        ))
    }

    fn hold_wake_lock(&self, lock: WakeLock, timeout: Duration) {
        tracing::trace!(?lock, ?timeout, "Wake lock held");
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Doze,
    Off,
    Hide,
}

pub fn run(args: SimulateArgs) -> Result<LoopExit, Box<dyn std::error::Error>> {
    let config = AppConfig::load();
    let watch = AppConfig::config_path()
        .inspect_err(|e| tracing::warn!(error = %e, "No config path to watch"))
        .ok();

    let device = Arc::new(SimulatedDevice::new(
        Resolution::new(args.width, args.height),
        args.charging,
    ));
    let capabilities = HostCapabilities {
        no_move_animation: true,
        aod_control: true,
        relaunch: false,
    };
    let (host, host_probe) = HeadlessHost::new(capabilities);
    let (surface, surface_probe) = HeadlessSurface::new(0, 0);
    let builder: Arc<dyn SheetBuilder> = match &config.render.sprite_dir {
        Some(dir) => Arc::new(PngStripBuilder::new(dir)),
        None => Arc::new(RingSheetBuilder::new()),
    };
    let pass = longest_pass(config.lights.speed);

    let system = device.clone();
    let handle = OverlayService::global().bind(
        move || {
            Ok(ControllerParts {
                host: Box::new(host),
                system,
                modes: Box::new(ConfiguredModes::new(&config.lights)),
                config,
                surface: Box::new(surface),
                builder,
                scheduler: None,
                inline_loader: false,
            })
        },
        watch,
    )?;

    let mut script = vec![(secs(args.seconds)?, Step::Hide)];
    if let Some(at) = args.doze_at {
        script.push((secs(at)?, Step::Doze));
    }
    if let Some(at) = args.off_at {
        script.push((secs(at)?, Step::Off));
    }
    script.sort_by_key(|(at, _)| *at);

    tracing::info!(colors = ?args.colors, ?script, "Simulation started");
    let start = Instant::now();
    handle.show(args.colors);

    for (at, step) in script {
        thread::sleep(at.saturating_sub(start.elapsed()));
        tracing::info!(?step, elapsed = ?start.elapsed(), "Simulation step");
        match step {
            Step::Doze => {
                device.enter_doze();
                handle.signal(SystemSignal::ScreenOff);
            }
            Step::Off => {
                device.power_off_display();
                handle.signal(SystemSignal::ScreenOff);
            }
            Step::Hide => {
                handle.show(Vec::new());
            }
        }
    }

    // let the last pass finish
    thread::sleep(pass);
    if let Some(dir) = &args.dump {
        dump_frame(&surface_probe, dir)?;
    }

    handle.shutdown();
    let exit = handle.wait();
    OverlayService::global().unbind();

    for call in host_probe.calls() {
        tracing::info!(?call, "Host call");
    }
    tracing::info!(frames = surface_probe.posts(), ?exit, "Simulation finished");
    Ok(exit)
}

/// Script time; negative values clamp to zero, unrepresentable ones are rejected
fn secs(seconds: f32) -> Result<Duration, Box<dyn std::error::Error>> {
    Duration::try_from_secs_f32(seconds.max(0.0))
        .map_err(|e| format!("invalid time {seconds}: {e}").into())
}

/// Duration of the longest built-in pass at `speed`
fn longest_pass(speed: f32) -> Duration {
    let frames = AnimationMode::ALL
        .iter()
        .map(|mode| frames_per_pass(*mode))
        .max()
        .unwrap_or(0);
    Duration::from_secs_f32(frames as f32 / (SHEET_FRAME_RATE * speed))
}

fn dump_frame(
    surface: &holeylight_overlay::SurfaceProbe,
    dir: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(frame) = surface.last_frame() else {
        tracing::warn!("No frame posted, nothing to dump");
        return Ok(());
    };
    std::fs::create_dir_all(dir)?;
    let path = dir.join("last_frame.png");
    frame.save_png(&path)?;
    tracing::info!(path = %path.display(), "Last frame written");
    Ok(())
}
