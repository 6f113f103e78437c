//! "Cover" fit: fill the target box, crop the overflow, keep the crop centered.
//!
//! Pure arithmetic, no image data involved.

/// Crop rectangle inside the original plus the output canvas size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropGeometry {
    pub source_x: f64,
    pub source_y: f64,
    pub source_width: f64,
    pub source_height: f64,
    pub output_width: u32,
    pub output_height: u32,
}

/// Integer form of the crop rectangle, ready for pixel work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropGeometry {
    /// Computes the crop for an `original` image scaled to cover `target`.
    ///
    /// When the original is relatively wider than the target, its full height
    /// is kept and the width is trimmed equally on both sides; otherwise the
    /// full width is kept and the height is trimmed top and bottom.
    pub fn cover(original: (u32, u32), target: (u32, u32)) -> Self {
        let (ow, oh) = (original.0 as f64, original.1 as f64);
        let (tw, th) = target;

        let original_ratio = ow / oh;
        let target_ratio = tw as f64 / th as f64;

        let (source_x, source_y, source_width, source_height) = if original_ratio > target_ratio {
            let crop_w = oh * target_ratio;
            ((ow - crop_w) / 2.0, 0.0, crop_w, oh)
        } else {
            let crop_h = ow / target_ratio;
            (0.0, (oh - crop_h) / 2.0, ow, crop_h)
        };

        Self {
            source_x,
            source_y,
            source_width,
            source_height,
            output_width: tw,
            output_height: th,
        }
    }

    /// Truncates the crop to whole pixels, at least 1x1 and inside `original`.
    pub fn pixel_rect(&self, original: (u32, u32)) -> PixelRect {
        let (ow, oh) = (original.0.max(1), original.1.max(1));
        let x = (self.source_x.max(0.0) as u32).min(ow - 1);
        let y = (self.source_y.max(0.0) as u32).min(oh - 1);
        let width = (self.source_width as u32).clamp(1, ow - x);
        let height = (self.source_height as u32).clamp(1, oh - y);
        PixelRect { x, y, width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_contained(g: &CropGeometry, original: (u32, u32)) {
        let (ow, oh) = (original.0 as f64, original.1 as f64);
        assert!(g.source_x >= 0.0 && g.source_y >= 0.0);
        assert!(g.source_x + g.source_width <= ow + 1e-9);
        assert!(g.source_y + g.source_height <= oh + 1e-9);
    }

    #[test]
    fn same_ratio_keeps_whole_image() {
        let g = CropGeometry::cover((800, 600), (400, 300));
        assert_eq!((g.source_x, g.source_y), (0.0, 0.0));
        assert_eq!((g.source_width, g.source_height), (800.0, 600.0));
        assert_eq!((g.output_width, g.output_height), (400, 300));
    }

    #[test]
    fn wider_original_is_cropped_horizontally() {
        // 800x600 into a square: 600x600 window starting at x=100
        let g = CropGeometry::cover((800, 600), (400, 400));
        assert_eq!(g.source_width, 600.0);
        assert_eq!(g.source_height, 600.0);
        assert_eq!(g.source_x, 100.0);
        assert_eq!(g.source_y, 0.0);
        assert_eq!((g.output_width, g.output_height), (400, 400));
    }

    #[test]
    fn taller_original_is_cropped_vertically() {
        // 600x800 into 300x150: ratio 2.0, crop 600x300 centered at y=250
        let g = CropGeometry::cover((600, 800), (300, 150));
        assert_eq!(g.source_width, 600.0);
        assert_eq!(g.source_height, 300.0);
        assert_eq!(g.source_x, 0.0);
        assert_eq!(g.source_y, 250.0);
    }

    #[test]
    fn crop_is_always_inside_the_original() {
        let originals = [(800, 600), (600, 800), (1, 1), (4000, 3), (3, 4000), (1920, 1080)];
        let targets = [(1, 1), (400, 400), (16, 9), (9, 16), (1000, 1), (1, 1000), (333, 777)];
        for &o in &originals {
            for &t in &targets {
                let g = CropGeometry::cover(o, t);
                assert_contained(&g, o);
                let r = g.pixel_rect(o);
                assert!(r.width >= 1 && r.height >= 1);
                assert!(r.x + r.width <= o.0, "{:?} -> {:?}: {:?}", o, t, r);
                assert!(r.y + r.height <= o.1, "{:?} -> {:?}: {:?}", o, t, r);
            }
        }
    }

    #[test]
    fn pixel_rect_truncates_fractional_crops() {
        // 1000x700 into 16:9 -> crop 1000 x 562.5 at y = 68.75
        let g = CropGeometry::cover((1000, 700), (16, 9));
        assert_eq!(
            g.pixel_rect((1000, 700)),
            PixelRect { x: 0, y: 68, width: 1000, height: 562 }
        );
    }
}
