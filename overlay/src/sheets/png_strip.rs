//! Sprite strips decoded from PNG files
//!
//! A strip is `<dir>/<mode>.png`: square frames laid out left to right. Frames
//! are scaled to the requested size. Modes without a strip fall back to the
//! procedural ring.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use holeylight_core::AnimationMode;
use rayon::prelude::*;
use tiny_skia::{ColorU8, FilterQuality, IntSize, Pixmap, PixmapPaint, Transform};

use super::{RingSheetBuilder, SHEET_FRAME_RATE};
use crate::sprite::{SheetBuilder, SheetError, SpriteSheet};

pub struct PngStripBuilder {
    dir: PathBuf,
    fallback: RingSheetBuilder,
}

impl PngStripBuilder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fallback: RingSheetBuilder::new(),
        }
    }

    pub fn strip_path(&self, mode: AnimationMode) -> PathBuf {
        self.dir.join(format!("{}.png", mode.as_str()))
    }
}

impl SheetBuilder for PngStripBuilder {
    fn build(
        &self,
        width: u32,
        height: u32,
        mode: AnimationMode,
    ) -> Result<SpriteSheet, SheetError> {
        if width == 0 || height == 0 {
            return Err(SheetError::EmptySize { width, height });
        }
        let path = self.strip_path(mode);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No sprite strip, using ring");
                return self.fallback.build(width, height, mode);
            }
            Err(source) => return Err(SheetError::ReadFile { path, source }),
        };

        let strip = decode_strip(&data, &path)?;
        let side = strip.height();
        let count = (strip.width() / side) as usize;
        if count == 0 {
            return Err(SheetError::NoFrames { mode });
        }

        let frames = (0..count)
            .into_par_iter()
            .map(|index| scaled_frame(&strip, index as u32 * side, side, width, height))
            .collect::<Option<Vec<_>>>()
            .ok_or(SheetError::EmptySize { width, height })?;

        tracing::debug!(path = %path.display(), width, height, frames = count, "Loaded sprite strip");
        SpriteSheet::new(mode, width, height, SHEET_FRAME_RATE, frames)
    }
}

/// Cut one square frame out of the strip and scale it to `width`x`height`
fn scaled_frame(strip: &Pixmap, x: u32, side: u32, width: u32, height: u32) -> Option<Pixmap> {
    let frame = strip.clone_rect(tiny_skia::IntRect::from_xywh(x as i32, 0, side, side)?)?;
    let mut out = Pixmap::new(width, height)?;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    let transform = Transform::from_scale(width as f32 / side as f32, height as f32 / side as f32);
    out.draw_pixmap(0, 0, frame.as_ref(), &paint, transform, None);
    Some(out)
}

/// Decode a PNG into a premultiplied pixmap
fn decode_strip(data: &[u8], path: &Path) -> Result<Pixmap, SheetError> {
    let decode_err = |source: png::DecodingError| SheetError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let mut decoder = png::Decoder::new(data);
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info().map_err(decode_err)?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).map_err(decode_err)?;
    let bytes = &buf[..info.buffer_size()];

    // Premultiply while expanding to RGBA
    let rgba: Vec<u8> = match info.color_type {
        png::ColorType::Rgba => bytes
            .chunks_exact(4)
            .flat_map(|p| premultiply(p[0], p[1], p[2], p[3]))
            .collect(),
        png::ColorType::Rgb => bytes
            .chunks_exact(3)
            .flat_map(|p| premultiply(p[0], p[1], p[2], 255))
            .collect(),
        png::ColorType::GrayscaleAlpha => bytes
            .chunks_exact(2)
            .flat_map(|p| premultiply(p[0], p[0], p[0], p[1]))
            .collect(),
        png::ColorType::Grayscale => bytes
            .iter()
            .flat_map(|&g| premultiply(g, g, g, 255))
            .collect(),
        other => return Err(SheetError::UnsupportedColor(other)),
    };

    let size = IntSize::from_wh(info.width, info.height).ok_or(SheetError::EmptySize {
        width: info.width,
        height: info.height,
    })?;
    Pixmap::from_vec(rgba, size).ok_or(SheetError::EmptySize {
        width: info.width,
        height: info.height,
    })
}

fn premultiply(r: u8, g: u8, b: u8, a: u8) -> [u8; 4] {
    let p = ColorU8::from_rgba(r, g, b, a).premultiply();
    [p.red(), p.green(), p.blue(), p.alpha()]
}
