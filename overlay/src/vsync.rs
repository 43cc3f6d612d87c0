//! Frame callback scheduling
//!
//! [`FrameScheduler`] mirrors a platform choreographer: a posted callback
//! fires once, on the next vsync, and must be re-posted for the frame after.
//! [`VsyncThread`] is the software implementation used when the host has no
//! display clock of its own. Its thread is the render thread.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::EngineError;

pub const RENDER_THREAD_NAME: &str = "holeylight-render";

/// One-shot frame callback registration
pub trait FrameScheduler: Send + Sync {
    /// Request a callback on the next vsync. Posting twice before it fires
    /// still yields one callback.
    fn post_frame_callback(&self);

    /// Withdraw a pending request
    fn remove_frame_callback(&self);
}

#[derive(Debug, Default)]
struct Arming {
    armed: bool,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct VsyncShared {
    arming: Mutex<Arming>,
    wake: Condvar,
}

/// Software vsync on a dedicated thread
pub struct VsyncThread {
    shared: Arc<VsyncShared>,
    handle: Option<JoinHandle<()>>,
}

impl VsyncThread {
    /// Start ticking at `refresh_hz`. `on_frame` receives the frame time in
    /// nanoseconds on a monotonic clock private to this thread.
    pub fn spawn<F>(refresh_hz: u32, on_frame: F) -> Result<Self, EngineError>
    where
        F: Fn(u64) + Send + 'static,
    {
        let shared = Arc::new(VsyncShared::default());
        let period = Duration::from_nanos(1_000_000_000 / u64::from(refresh_hz.max(1)));

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(RENDER_THREAD_NAME.to_string())
            .spawn(move || run(&thread_shared, period, on_frame))
            .map_err(|source| EngineError::SpawnThread {
                name: RENDER_THREAD_NAME,
                source,
            })?;

        tracing::debug!(refresh_hz, "Render thread started");
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }
}

fn run<F: Fn(u64)>(shared: &VsyncShared, period: Duration, on_frame: F) {
    let epoch = Instant::now();
    let period_nanos = period.as_nanos().max(1);

    loop {
        {
            let mut arming = shared.arming.lock().unwrap_or_else(PoisonError::into_inner);
            while !arming.armed && !arming.shutdown {
                arming = shared
                    .wake
                    .wait(arming)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if arming.shutdown {
                break;
            }
        }

        // Align to the next period boundary
        let elapsed = epoch.elapsed().as_nanos();
        let next = (elapsed / period_nanos + 1) * period_nanos;
        thread::sleep(Duration::from_nanos((next - elapsed) as u64));

        {
            let mut arming = shared.arming.lock().unwrap_or_else(PoisonError::into_inner);
            if arming.shutdown {
                break;
            }
            if !arming.armed {
                continue;
            }
            arming.armed = false;
        }

        on_frame(next as u64);
    }
    tracing::debug!("Render thread stopped");
}

impl FrameScheduler for VsyncThread {
    fn post_frame_callback(&self) {
        let mut arming = self
            .shared
            .arming
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        arming.armed = true;
        self.shared.wake.notify_one();
    }

    fn remove_frame_callback(&self) {
        self.shared
            .arming
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .armed = false;
    }
}

impl Drop for VsyncThread {
    fn drop(&mut self) {
        {
            let mut arming = self
                .shared
                .arming
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            arming.shutdown = true;
            self.shared.wake.notify_one();
        }
        if let Some(handle) = self.handle.take() {
            // Dropped from inside a frame callback: the loop exits on its own
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_callback_is_one_shot() {
        let (tx, rx) = mpsc::channel();
        let vsync = VsyncThread::spawn(240, move |time| {
            let _ = tx.send(time);
        })
        .unwrap();

        vsync.post_frame_callback();
        vsync.post_frame_callback();
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_frame_times_increase() {
        let (tx, rx) = mpsc::channel();
        let vsync = Arc::new(Mutex::new(None::<Arc<VsyncThread>>));
        let inner = vsync.clone();
        let thread = Arc::new(
            VsyncThread::spawn(240, move |time| {
                let _ = tx.send(time);
                if let Some(v) = inner.lock().unwrap().as_ref() {
                    v.post_frame_callback();
                }
            })
            .unwrap(),
        );
        *vsync.lock().unwrap() = Some(thread.clone());
        thread.post_frame_callback();

        let times: Vec<u64> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert!(times.windows(2).all(|w| w[1] > w[0]));

        // break the cycle so the thread can be joined
        vsync.lock().unwrap().take();
    }

    #[test]
    fn test_removed_callback_does_not_fire() {
        let (tx, rx) = mpsc::channel();
        let vsync = VsyncThread::spawn(10, move |time| {
            let _ = tx.send(time);
        })
        .unwrap();
        vsync.post_frame_callback();
        vsync.remove_frame_callback();
        assert!(rx.recv_timeout(Duration::from_millis(250)).is_err());
    }
}
