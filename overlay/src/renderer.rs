//! Frame compositing using tiny-skia
//!
//! Sprites are white on transparent. Color is applied here, per frame:
//!
//! - one color: the sprite is tinted as a whole
//! - several colors: the sprite is drawn as-is, then each color is laid over
//!   it as an equal pie wedge around the sprite centre, starting at the top
//!   and going clockwise
//!
//! All buffers are premultiplied RGBA.

use holeylight_core::Argb;
use tiny_skia::{
    BlendMode, Color, FillRule, Paint, PathBuilder, Pixmap, PixmapMut, PixmapPaint, Rect,
    Transform,
};

use crate::utils::color_from_argb;

/// Wedge outlines are approximated with segments of at most this many degrees
const WEDGE_STEP_DEGREES: f32 = 5.0;
/// Wedges start at the top (screen coordinates, y down)
const WEDGE_START_DEGREES: f32 = 270.0;

pub struct Compositor {
    /// Reused for the single-color tint
    scratch: Option<Pixmap>,
    /// Opaque black background (used when covering the always-on display)
    draw_background: bool,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self {
            scratch: None,
            draw_background: false,
        }
    }

    pub fn draw_background(&self) -> bool {
        self.draw_background
    }

    pub fn set_draw_background(&mut self, draw_background: bool) {
        self.draw_background = draw_background;
    }

    /// Render one frame into `target`.
    ///
    /// The sprite is placed with its top-left corner at `origin`. With no
    /// sprite or no colors the frame is only cleared.
    pub fn render_frame(
        &mut self,
        target: &mut PixmapMut<'_>,
        origin: (i32, i32),
        sprite: Option<&Pixmap>,
        colors: &[Argb],
    ) {
        target.fill(if self.draw_background {
            Color::BLACK
        } else {
            Color::TRANSPARENT
        });

        let Some(sprite) = sprite else {
            return;
        };
        match colors {
            [] => {}
            [color] => self.draw_tinted(target, origin, sprite, *color),
            _ => self.draw_wedges(target, origin, sprite, colors),
        }
    }

    fn draw_tinted(
        &mut self,
        target: &mut PixmapMut<'_>,
        (x, y): (i32, i32),
        sprite: &Pixmap,
        color: Argb,
    ) {
        let scratch = match self.scratch.take() {
            Some(pixmap) if pixmap.width() == sprite.width() && pixmap.height() == sprite.height() => {
                Some(pixmap)
            }
            _ => Pixmap::new(sprite.width(), sprite.height()),
        };
        let Some(mut scratch) = scratch else {
            return;
        };

        scratch.fill(Color::TRANSPARENT);
        scratch.draw_pixmap(
            0,
            0,
            sprite.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        let mut paint = Paint::default();
        paint.set_color(color_from_argb(color));
        paint.blend_mode = BlendMode::SourceAtop;
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, sprite.width() as f32, sprite.height() as f32)
        {
            scratch.fill_rect(rect, &paint, Transform::identity(), None);
        }

        target.draw_pixmap(
            x,
            y,
            scratch.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        self.scratch = Some(scratch);
    }

    fn draw_wedges(
        &mut self,
        target: &mut PixmapMut<'_>,
        (x, y): (i32, i32),
        sprite: &Pixmap,
        colors: &[Argb],
    ) {
        target.draw_pixmap(
            x,
            y,
            sprite.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        let w = sprite.width() as f32;
        let h = sprite.height() as f32;
        let cx = x as f32 + w / 2.0;
        let cy = y as f32 + h / 2.0;
        // Far enough out to cover the sprite's corners
        let radius = w + h;
        let sweep = 360.0 / colors.len() as f32;
        let blend = if self.draw_background {
            BlendMode::Multiply
        } else {
            BlendMode::SourceAtop
        };

        for (i, color) in colors.iter().enumerate() {
            let start = WEDGE_START_DEGREES + i as f32 * sweep;
            let Some(path) = wedge(cx, cy, radius, start, sweep) else {
                continue;
            };
            let mut paint = Paint::default();
            paint.set_color(color_from_argb(*color));
            paint.blend_mode = blend;
            // Hard edges so neighbouring wedges do not leave seams
            paint.anti_alias = false;
            target.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

/// Closed pie slice from `start` spanning `sweep` degrees
fn wedge(cx: f32, cy: f32, radius: f32, start: f32, sweep: f32) -> Option<tiny_skia::Path> {
    let steps = (sweep / WEDGE_STEP_DEGREES).ceil().max(1.0) as usize;
    let mut pb = PathBuilder::new();
    pb.move_to(cx, cy);
    for step in 0..=steps {
        let angle = (start + sweep * step as f32 / steps as f32).to_radians();
        pb.line_to(cx + radius * angle.cos(), cy + radius * angle.sin());
    }
    pb.close();
    pb.finish()
}
