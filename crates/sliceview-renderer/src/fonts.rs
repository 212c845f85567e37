use sliceview_core::BitmapAnchor;

/// A rasterized piece of text: per-pixel coverage, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub alpha: Vec<u8>,
}

impl GlyphBitmap {
    pub fn new(width: u32, height: u32, alpha: Vec<u8>) -> Self {
        assert_eq!(alpha.len(), width as usize * height as usize);
        Self {
            width,
            height,
            alpha,
        }
    }
}

/// Rasterizes text for compositors. The crates ship no font stack;
/// embedders plug one in. Compositors skip text layers when no provider
/// is installed or `rasterize` returns `None`.
pub trait FontProvider {
    fn rasterize(&self, font_index: usize, font_size: u32, text: &str) -> Option<GlyphBitmap>;
}

/// Translation from an anchored position to the top-left corner of a
/// `width` x `height` bitmap, with `border` pixels pushing away from the
/// anchored edges.
pub fn anchor_translation(anchor: BitmapAnchor, width: u32, height: u32, border: u32) -> (f64, f64) {
    let w = f64::from(width);
    let h = f64::from(height);

    let (mut dx, mut dy) = match anchor {
        BitmapAnchor::TopLeft => (0.0, 0.0),
        BitmapAnchor::TopCenter => (-w / 2.0, 0.0),
        BitmapAnchor::TopRight => (-w, 0.0),
        BitmapAnchor::CenterLeft => (0.0, -h / 2.0),
        BitmapAnchor::Center => (-w / 2.0, -h / 2.0),
        BitmapAnchor::CenterRight => (-w, -h / 2.0),
        BitmapAnchor::BottomLeft => (0.0, -h),
        BitmapAnchor::BottomCenter => (-w / 2.0, -h),
        BitmapAnchor::BottomRight => (-w, -h),
    };

    if border != 0 {
        let b = f64::from(border);
        match anchor {
            BitmapAnchor::TopLeft | BitmapAnchor::TopCenter | BitmapAnchor::TopRight => dy += b,
            BitmapAnchor::BottomLeft | BitmapAnchor::BottomCenter | BitmapAnchor::BottomRight => {
                dy -= b
            }
            _ => {}
        }
        match anchor {
            BitmapAnchor::TopLeft | BitmapAnchor::CenterLeft | BitmapAnchor::BottomLeft => dx += b,
            BitmapAnchor::TopRight | BitmapAnchor::CenterRight | BitmapAnchor::BottomRight => {
                dx -= b
            }
            _ => {}
        }
    }

    (dx, dy)
}
