//! Background sprite sheet loading
//!
//! Sheets are built on a dedicated thread so the render loop never waits for
//! rasterisation or disk. Jobs are handled in order and never cancelled; a
//! superseded result is still delivered and the receiver decides what to do
//! with it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use holeylight_core::AnimationMode;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::error::EngineError;
use crate::sprite::{SheetBuilder, SheetSet};

pub const LOADER_THREAD_NAME: &str = "holeylight-loader";

/// Completion callback, run on the loader thread
pub type LoadDone = Box<dyn FnOnce(SheetSet) + Send>;

struct LoadJob {
    width: u32,
    height: u32,
    done: LoadDone,
}

enum Backend {
    Thread {
        tx: Option<UnboundedSender<LoadJob>>,
        handle: Option<JoinHandle<()>>,
    },
    /// Build on the caller's thread (tests, one-shot tools)
    Inline(Arc<dyn SheetBuilder>),
}

pub struct SheetLoader {
    backend: Backend,
}

impl SheetLoader {
    /// Start the loader thread
    pub fn spawn(builder: Arc<dyn SheetBuilder>) -> Result<Self, EngineError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<LoadJob>();

        let handle = thread::Builder::new()
            .name(LOADER_THREAD_NAME.to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    let sheets = build_all(builder.as_ref(), job.width, job.height);
                    (job.done)(sheets);
                }
                tracing::debug!("Sheet loader stopped");
            })
            .map_err(|source| EngineError::SpawnThread {
                name: LOADER_THREAD_NAME,
                source,
            })?;

        Ok(Self {
            backend: Backend::Thread {
                tx: Some(tx),
                handle: Some(handle),
            },
        })
    }

    pub fn inline(builder: Arc<dyn SheetBuilder>) -> Self {
        Self {
            backend: Backend::Inline(builder),
        }
    }

    /// Queue a build of all three modes at `width`x`height`.
    ///
    /// Returns false if the loader has shut down; `done` is then dropped
    /// without being called.
    pub fn submit(&self, width: u32, height: u32, done: LoadDone) -> bool {
        match &self.backend {
            Backend::Thread { tx, .. } => tx.as_ref().is_some_and(|tx| {
                tx.send(LoadJob {
                    width,
                    height,
                    done,
                })
                .is_ok()
            }),
            Backend::Inline(builder) => {
                done(build_all(builder.as_ref(), width, height));
                true
            }
        }
    }
}

impl Drop for SheetLoader {
    fn drop(&mut self) {
        if let Backend::Thread { tx, handle } = &mut self.backend {
            tx.take();
            if let Some(handle) = handle.take() {
                // The last renderer reference may be released by a completion
                // callback running on the loader thread itself
                if handle.thread().id() != thread::current().id() {
                    let _ = handle.join();
                }
            }
        }
    }
}

/// Build one sheet per mode. A failed mode leaves its slot empty.
fn build_all(builder: &dyn SheetBuilder, width: u32, height: u32) -> SheetSet {
    let mut set = SheetSet::default();
    for mode in AnimationMode::ALL {
        match builder.build(width, height, mode) {
            Ok(sheet) => set.insert(sheet),
            Err(e) => tracing::warn!(error = %e, width, height, %mode, "Failed to build sprite sheet"),
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::RingSheetBuilder;
    use crate::sprite::{SheetError, SpriteSheet};
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    struct FailingBlink;

    impl SheetBuilder for FailingBlink {
        fn build(
            &self,
            width: u32,
            height: u32,
            mode: AnimationMode,
        ) -> Result<SpriteSheet, SheetError> {
            if mode == AnimationMode::Blink {
                return Err(SheetError::NoFrames { mode });
            }
            RingSheetBuilder::new().build(width, height, mode)
        }
    }

    #[test]
    fn test_thread_loader_delivers_in_order() {
        let loader = SheetLoader::spawn(Arc::new(RingSheetBuilder::new())).unwrap();
        let (tx, rx) = std_mpsc::channel();
        for size in [16u32, 24] {
            let tx = tx.clone();
            assert!(loader.submit(
                size,
                size,
                Box::new(move |set| {
                    let _ = tx.send((size, set.matches(size, size)));
                })
            ));
        }

        let first = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(first, (16, true));
        assert_eq!(second, (24, true));
    }

    #[test]
    fn test_failed_mode_leaves_slot_empty() {
        let loader = SheetLoader::inline(Arc::new(FailingBlink));
        let (tx, rx) = std_mpsc::channel();
        loader.submit(16, 16, Box::new(move |set| tx.send(set).unwrap()));

        let set = rx.recv().unwrap();
        assert!(set.get(AnimationMode::Swirl).is_some());
        assert!(set.get(AnimationMode::Blink).is_none());
        assert!(!set.is_complete());
    }
}
