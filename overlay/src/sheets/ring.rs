//! Procedural ring frames
//!
//! All frames are white on transparent. Rasterisation runs on the rayon pool
//! so a full three-mode rebuild stays well under a second on small sizes.

use std::f32::consts::{PI, TAU};

use holeylight_core::AnimationMode;
use rayon::prelude::*;
use tiny_skia::{Color, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::{SHEET_FRAME_RATE, frames_per_pass};
use crate::sprite::{SheetBuilder, SheetError, SpriteSheet};

/// Length of the swirl's tail, in radians
const TAIL_SWEEP: f32 = PI / 2.0;
/// Tail is drawn as this many fading segments
const TAIL_SEGMENTS: usize = 12;
/// Alpha of the ring underneath the swirl head
const SWIRL_BASE_ALPHA: f32 = 0.2;

/// Builds ring sheets from scratch
#[derive(Debug, Clone, Default)]
pub struct RingSheetBuilder;

impl RingSheetBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl SheetBuilder for RingSheetBuilder {
    fn build(
        &self,
        width: u32,
        height: u32,
        mode: AnimationMode,
    ) -> Result<SpriteSheet, SheetError> {
        if width == 0 || height == 0 {
            return Err(SheetError::EmptySize { width, height });
        }
        let geometry = RingGeometry::new(width, height);
        let count = frames_per_pass(mode);

        let frames = (0..count)
            .into_par_iter()
            .map(|index| {
                let t = index as f32 / count as f32;
                let mut pixmap = Pixmap::new(width, height)?;
                match mode {
                    AnimationMode::Swirl => geometry.draw_swirl(&mut pixmap, t),
                    AnimationMode::Blink => geometry.draw_full(&mut pixmap, (TAU * t).sin().abs()),
                    AnimationMode::Single => geometry.draw_full(&mut pixmap, (PI * t).sin()),
                }
                Some(pixmap)
            })
            .collect::<Option<Vec<_>>>()
            .ok_or(SheetError::EmptySize { width, height })?;

        tracing::debug!(width, height, %mode, frames = frames.len(), "Built ring sheet");
        SpriteSheet::new(mode, width, height, SHEET_FRAME_RATE, frames)
    }
}

struct RingGeometry {
    cx: f32,
    cy: f32,
    radius: f32,
    stroke_width: f32,
}

impl RingGeometry {
    fn new(width: u32, height: u32) -> Self {
        let min = width.min(height) as f32;
        let stroke_width = (min / 16.0).max(2.0);
        Self {
            cx: width as f32 / 2.0,
            cy: height as f32 / 2.0,
            radius: (min / 2.0 - stroke_width).max(1.0),
            stroke_width,
        }
    }

    fn stroke(&self) -> Stroke {
        Stroke {
            width: self.stroke_width,
            line_cap: LineCap::Round,
            ..Stroke::default()
        }
    }

    /// Whole ring at one alpha
    fn draw_full(&self, pixmap: &mut Pixmap, alpha: f32) {
        let Some(path) = PathBuilder::from_circle(self.cx, self.cy, self.radius) else {
            return;
        };
        pixmap.stroke_path(&path, &white(alpha), &self.stroke(), Transform::identity(), None);
    }

    /// Faint ring with a bright head travelling clockwise from the top
    fn draw_swirl(&self, pixmap: &mut Pixmap, t: f32) {
        self.draw_full(pixmap, SWIRL_BASE_ALPHA);

        let head = -PI / 2.0 + TAU * t;
        let step = TAIL_SWEEP / TAIL_SEGMENTS as f32;
        let stroke = self.stroke();
        for segment in 0..TAIL_SEGMENTS {
            let end = head - step * segment as f32;
            let start = end - step;
            let alpha = 1.0 - segment as f32 / TAIL_SEGMENTS as f32;
            if let Some(path) = self.arc(start, end) {
                pixmap.stroke_path(&path, &white(alpha), &stroke, Transform::identity(), None);
            }
        }
    }

    fn arc(&self, start: f32, end: f32) -> Option<tiny_skia::Path> {
        const STEPS: usize = 4;
        let mut pb = PathBuilder::new();
        for i in 0..=STEPS {
            let angle = start + (end - start) * i as f32 / STEPS as f32;
            let x = self.cx + self.radius * angle.cos();
            let y = self.cy + self.radius * angle.sin();
            if i == 0 {
                pb.move_to(x, y);
            } else {
                pb.line_to(x, y);
            }
        }
        pb.finish()
    }
}

fn white(alpha: f32) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(255, 255, 255, (alpha.clamp(0.0, 1.0) * 255.0) as u8));
    paint.anti_alias = true;
    paint
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_every_mode() {
        let builder = RingSheetBuilder::new();
        for mode in AnimationMode::ALL {
            let sheet = builder.build(48, 48, mode).unwrap();
            assert_eq!(sheet.mode(), mode);
            assert_eq!(sheet.frame_count(), frames_per_pass(mode));
            assert!(sheet.matches(48, 48));
        }
    }

    #[test]
    fn test_single_starts_dark_and_peaks_midway() {
        let sheet = RingSheetBuilder::new()
            .build(48, 48, AnimationMode::Single)
            .unwrap();
        let lit = |index: usize| {
            sheet
                .frame(index)
                .unwrap()
                .pixels()
                .iter()
                .filter(|p| p.alpha() > 0)
                .count()
        };
        assert_eq!(lit(0), 0);
        assert!(lit(sheet.frame_count() / 2) > 0);
    }

    #[test]
    fn test_swirl_head_moves() {
        let sheet = RingSheetBuilder::new()
            .build(64, 64, AnimationMode::Swirl)
            .unwrap();
        let a = sheet.frame(0).unwrap().data().to_vec();
        let b = sheet.frame(15).unwrap().data().to_vec();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_size_rejected() {
        assert!(RingSheetBuilder::new().build(0, 10, AnimationMode::Blink).is_err());
    }
}
