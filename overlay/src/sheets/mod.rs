//! Sheet builders
//!
//! - [`RingSheetBuilder`] rasterises ring frames procedurally
//! - [`PngStripBuilder`] loads artist-made horizontal strips from disk

mod png_strip;
mod ring;

pub use png_strip::PngStripBuilder;
pub use ring::RingSheetBuilder;

use holeylight_core::AnimationMode;

/// Playback rate of every built-in sheet at speed 1.0
pub const SHEET_FRAME_RATE: f32 = 30.0;

/// Frames per pass for each mode
pub fn frames_per_pass(mode: AnimationMode) -> usize {
    match mode {
        AnimationMode::Swirl => 60,
        AnimationMode::Blink => 40,
        AnimationMode::Single => 30,
    }
}
