//! Common utility functions for compositing

use holeylight_core::Argb;
use tiny_skia::Color;

/// Convert an ARGB notification color to tiny_skia Color
#[inline]
pub fn color_from_argb(argb: Argb) -> Color {
    let [r, g, b, a] = argb.to_rgba();
    Color::from_rgba8(r, g, b, a)
}

/// Format a color list for log output
pub fn format_colors(colors: &[Argb]) -> String {
    colors
        .iter()
        .map(|c| format!("{:08x}", c.0))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_argb() {
        let color = color_from_argb(Argb(0xFF00_80FF));
        assert_eq!(color.alpha(), 1.0);
        assert_eq!(color.red(), 0.0);
        assert_eq!(color.blue(), 1.0);
    }

    #[test]
    fn test_format_colors() {
        assert_eq!(format_colors(&[]), "");
        assert_eq!(
            format_colors(&[Argb(0xFFFF_0000), Argb(0x8000_00FF)]),
            "ffff0000,800000ff"
        );
    }
}
