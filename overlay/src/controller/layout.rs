//! Overlay window geometry

use holeylight_core::{CutoutConfig, Resolution};

use crate::platform::DisplayArea;

/// Square window centred on the cutout, grown by `inset_dp` on every side
pub fn overlay_area(cutout: &CutoutConfig, inset_dp: u32) -> DisplayArea {
    let inset_px = (inset_dp as f32 * cutout.density).round() as u32;
    let half = cutout.radius + cutout.ring_margin + inset_px;
    DisplayArea::new(
        cutout.center_x - half as i32,
        cutout.center_y - half as i32,
        half * 2,
        half * 2,
    )
}

/// Move the cutout to where it sits on a display of a different size
pub fn scale_cutout(cutout: &CutoutConfig, from: Resolution, to: Resolution) -> CutoutConfig {
    if from.width == 0 || from.height == 0 {
        return cutout.clone();
    }
    let sx = to.width as f32 / from.width as f32;
    let sy = to.height as f32 / from.height as f32;
    CutoutConfig {
        center_x: (cutout.center_x as f32 * sx).round() as i32,
        center_y: (cutout.center_y as f32 * sy).round() as i32,
        radius: (cutout.radius as f32 * sx).round() as u32,
        ring_margin: (cutout.ring_margin as f32 * sx).round() as u32,
        density: cutout.density * sx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_centred_on_cutout() {
        let cutout = CutoutConfig::default();
        let area = overlay_area(&cutout, 0);
        assert_eq!(area, DisplayArea::new(468, -8, 144, 144));
    }

    #[test]
    fn test_inset_grows_by_density() {
        let cutout = CutoutConfig::default();
        let area = overlay_area(&cutout, 1);
        assert_eq!(area, DisplayArea::new(465, -11, 150, 150));
    }

    #[test]
    fn test_scale_to_lower_resolution() {
        let cutout = CutoutConfig::default();
        let scaled = scale_cutout(
            &cutout,
            Resolution::new(1080, 2280),
            Resolution::new(720, 1520),
        );
        assert_eq!(scaled.center_x, 360);
        assert_eq!(scaled.radius, 27);
        assert!((scaled.density - 2.0).abs() < 1e-4);
    }
}
