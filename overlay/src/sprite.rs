//! Sprite sheets
//!
//! A sheet is an immutable run of pre-rendered frames for one
//! [`AnimationMode`] at one size. Frames are white (or grey) on transparent;
//! color is applied at composite time.

use std::path::PathBuf;
use std::sync::Arc;

use holeylight_core::AnimationMode;
use thiserror::Error;
use tiny_skia::Pixmap;

/// Errors while building or decoding a sprite sheet
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("sheet size {width}x{height} is empty")]
    EmptySize { width: u32, height: u32 },

    #[error("{mode} sheet has no frames")]
    NoFrames { mode: AnimationMode },

    #[error("{mode} frame {index} is {actual_w}x{actual_h}, expected {width}x{height}")]
    FrameSize {
        mode: AnimationMode,
        index: usize,
        width: u32,
        height: u32,
        actual_w: u32,
        actual_h: u32,
    },

    #[error("invalid frame rate {0}")]
    InvalidFrameRate(f32),

    #[error("failed to read sprite strip {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode sprite strip {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: png::DecodingError,
    },

    #[error("unsupported color type {0:?} in sprite strip")]
    UnsupportedColor(png::ColorType),
}

/// Pre-rendered frames for one mode at a fixed size and frame rate
#[derive(Debug)]
pub struct SpriteSheet {
    mode: AnimationMode,
    width: u32,
    height: u32,
    frame_rate: f32,
    frames: Vec<Pixmap>,
}

impl SpriteSheet {
    pub fn new(
        mode: AnimationMode,
        width: u32,
        height: u32,
        frame_rate: f32,
        frames: Vec<Pixmap>,
    ) -> Result<Self, SheetError> {
        if width == 0 || height == 0 {
            return Err(SheetError::EmptySize { width, height });
        }
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(SheetError::InvalidFrameRate(frame_rate));
        }
        if frames.is_empty() {
            return Err(SheetError::NoFrames { mode });
        }
        if let Some((index, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.width() != width || f.height() != height)
        {
            return Err(SheetError::FrameSize {
                mode,
                index,
                width,
                height,
                actual_w: frame.width(),
                actual_h: frame.height(),
            });
        }

        Ok(Self {
            mode,
            width,
            height,
            frame_rate,
            frames,
        })
    }

    pub fn mode(&self) -> AnimationMode {
        self.mode
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frames per second at speed 1.0
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&Pixmap> {
        self.frames.get(index)
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}

/// Produces sprite sheets. Called on the loader thread only.
pub trait SheetBuilder: Send + Sync {
    fn build(&self, width: u32, height: u32, mode: AnimationMode)
    -> Result<SpriteSheet, SheetError>;
}

/// One sheet slot per mode
#[derive(Debug, Clone, Default)]
pub struct SheetSet {
    sheets: [Option<Arc<SpriteSheet>>; 3],
}

impl SheetSet {
    pub fn get(&self, mode: AnimationMode) -> Option<&Arc<SpriteSheet>> {
        self.sheets[mode.index()].as_ref()
    }

    pub fn insert(&mut self, sheet: SpriteSheet) {
        let index = sheet.mode().index();
        self.sheets[index] = Some(Arc::new(sheet));
    }

    /// Every mode has a sheet of this size
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.sheets
            .iter()
            .all(|s| s.as_ref().is_some_and(|s| s.matches(width, height)))
    }

    pub fn is_complete(&self) -> bool {
        self.sheets.iter().all(Option::is_some)
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.iter().all(Option::is_none)
    }

    /// Drop all sheets (the pixel buffers go with the last reference)
    pub fn clear(&mut self) {
        self.sheets = Default::default();
    }
}
