use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::extent::Extent2D;
use crate::geometry::ScenePoint2D;
use crate::transform::AffineTransform2D;

/// An RGBA8 image, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ColorImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// A single-channel f32 image, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatImage {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl FloatImage {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Self {
        assert_eq!(values.len(), width as usize * height as usize);
        Self {
            width,
            height,
            values,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Minimum and maximum values, `(0, 0)` for an empty image.
    pub fn range(&self) -> (f32, f32) {
        let mut it = self.values.iter();
        match it.next() {
            None => (0.0, 0.0),
            Some(&first) => {
                let mut min = first;
                let mut max = first;
                for &v in it {
                    min = min.min(v);
                    max = max.max(v);
                }
                (min, max)
            }
        }
    }
}

/// Where a texture sits in the scene: origin is the scene position of the
/// center of the top-left pixel, then pixel spacing, rotation and flips.
/// A manual transform overrides all of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TexturePlacement {
    origin: ScenePoint2D,
    spacing_x: f64,
    spacing_y: f64,
    angle: f64,
    flip_x: bool,
    flip_y: bool,
    manual_transform: Option<AffineTransform2D>,
}

impl Default for TexturePlacement {
    fn default() -> Self {
        Self {
            origin: ScenePoint2D::default(),
            spacing_x: 1.0,
            spacing_y: 1.0,
            angle: 0.0,
            flip_x: false,
            flip_y: false,
            manual_transform: None,
        }
    }
}

impl TexturePlacement {
    fn check_no_manual_transform(&self) {
        assert!(
            self.manual_transform.is_none(),
            "placement fields cannot be changed once a manual transform is set"
        );
    }

    pub fn set_origin(&mut self, x: f64, y: f64) {
        self.check_no_manual_transform();
        self.origin = ScenePoint2D::new(x, y);
    }

    pub fn set_pixel_spacing(&mut self, sx: f64, sy: f64) {
        self.check_no_manual_transform();
        if sx <= 0.0 || sy <= 0.0 {
            warn!("Ignoring a non-positive pixel spacing: {}x{}", sx, sy);
            return;
        }
        self.spacing_x = sx;
        self.spacing_y = sy;
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.check_no_manual_transform();
        self.angle = angle;
    }

    pub fn set_flip(&mut self, flip_x: bool, flip_y: bool) {
        self.check_no_manual_transform();
        self.flip_x = flip_x;
        self.flip_y = flip_y;
    }

    pub fn set_manual_transform(&mut self, transform: AffineTransform2D) {
        self.manual_transform = Some(transform);
    }

    pub fn origin(&self) -> ScenePoint2D {
        self.origin
    }

    pub fn pixel_spacing(&self) -> (f64, f64) {
        (self.spacing_x, self.spacing_y)
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Texture-to-scene transform for a `width` x `height` texture.
    pub fn transform(&self, width: u32, height: u32) -> AffineTransform2D {
        match &self.manual_transform {
            Some(t) => *t,
            None => AffineTransform2D::combine_all(&[
                AffineTransform2D::offset(self.origin.x, self.origin.y),
                AffineTransform2D::rotation(self.angle),
                AffineTransform2D::scaling(self.spacing_x, self.spacing_y),
                AffineTransform2D::offset(-0.5, -0.5),
                AffineTransform2D::flip(self.flip_x, self.flip_y, width, height),
            ]),
        }
    }

    /// Extent of the texture rectangle under the placement transform.
    pub fn extent(&self, width: u32, height: u32) -> Extent2D {
        let t = self.transform(width, height);
        let w = f64::from(width);
        let h = f64::from(height);
        let mut extent = Extent2D::new();
        for (x, y) in [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)] {
            let (sx, sy) = t.apply(x, y);
            extent.add_point(sx, sy);
        }
        extent
    }
}

/// An RGBA texture layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorTextureSceneLayer {
    image: ColorImage,
    placement: TexturePlacement,
    linear_interpolation: bool,
    revision: u64,
}

impl ColorTextureSceneLayer {
    pub fn new(image: ColorImage) -> Self {
        Self {
            image,
            placement: TexturePlacement::default(),
            linear_interpolation: false,
            revision: 0,
        }
    }

    pub fn image(&self) -> &ColorImage {
        &self.image
    }

    pub fn set_image(&mut self, image: ColorImage) {
        self.image = image;
        self.revision += 1;
    }

    pub fn placement(&self) -> &TexturePlacement {
        &self.placement
    }

    pub fn placement_mut(&mut self) -> &mut TexturePlacement {
        self.revision += 1;
        &mut self.placement
    }

    pub fn is_linear_interpolation(&self) -> bool {
        self.linear_interpolation
    }

    pub fn set_linear_interpolation(&mut self, enabled: bool) {
        if self.linear_interpolation != enabled {
            self.linear_interpolation = enabled;
            self.revision += 1;
        }
    }

    pub fn transform(&self) -> AffineTransform2D {
        self.placement
            .transform(self.image.width(), self.image.height())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn extent(&self) -> Extent2D {
        self.placement
            .extent(self.image.width(), self.image.height())
    }
}

/// Grayscale windowing presets for medical images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowingPreset {
    Bone,
    Lung,
    Custom,
}

/// A floating-point texture layer rendered through grayscale windowing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatTextureSceneLayer {
    image: FloatImage,
    placement: TexturePlacement,
    preset: WindowingPreset,
    custom_center: f32,
    custom_width: f32,
    inverted: bool,
    apply_log: bool,
    linear_interpolation: bool,
    revision: u64,
}

impl FloatTextureSceneLayer {
    pub fn new(image: FloatImage) -> Self {
        Self {
            image,
            placement: TexturePlacement::default(),
            preset: WindowingPreset::Custom,
            custom_center: 128.0,
            custom_width: 256.0,
            inverted: false,
            apply_log: false,
            linear_interpolation: false,
            revision: 0,
        }
    }

    pub fn image(&self) -> &FloatImage {
        &self.image
    }

    pub fn set_image(&mut self, image: FloatImage) {
        self.image = image;
        self.revision += 1;
    }

    pub fn placement(&self) -> &TexturePlacement {
        &self.placement
    }

    pub fn placement_mut(&mut self) -> &mut TexturePlacement {
        self.revision += 1;
        &mut self.placement
    }

    pub fn set_windowing_preset(&mut self, preset: WindowingPreset) {
        self.preset = preset;
        self.revision += 1;
    }

    pub fn set_custom_windowing(&mut self, center: f32, width: f32) -> Result<(), SceneError> {
        if width <= 0.0 {
            Err(SceneError::InvalidWindowing(width))
        } else {
            self.preset = WindowingPreset::Custom;
            self.custom_center = center;
            self.custom_width = width;
            self.revision += 1;
            Ok(())
        }
    }

    /// Effective `(center, width)` after resolving the preset.
    pub fn windowing(&self) -> (f32, f32) {
        match self.preset {
            WindowingPreset::Bone => (300.0, 2000.0),
            WindowingPreset::Lung => (-600.0, 1600.0),
            WindowingPreset::Custom => (self.custom_center, self.custom_width),
        }
    }

    pub fn windowing_preset(&self) -> WindowingPreset {
        self.preset
    }

    /// Sets a custom windowing that covers the full value range of the
    /// image. A flat image gets a width of 1.
    pub fn fit_range(&mut self) {
        let (min, max) = self.image.range();
        self.preset = WindowingPreset::Custom;
        self.custom_center = (min + max) / 2.0;
        self.custom_width = if (max - min).abs() < 1e-10 {
            1.0
        } else {
            max - min
        };
        self.revision += 1;
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn set_inverted(&mut self, inverted: bool) {
        if self.inverted != inverted {
            self.inverted = inverted;
            self.revision += 1;
        }
    }

    pub fn is_apply_log(&self) -> bool {
        self.apply_log
    }

    pub fn set_apply_log(&mut self, apply_log: bool) {
        if self.apply_log != apply_log {
            self.apply_log = apply_log;
            self.revision += 1;
        }
    }

    pub fn is_linear_interpolation(&self) -> bool {
        self.linear_interpolation
    }

    pub fn set_linear_interpolation(&mut self, enabled: bool) {
        if self.linear_interpolation != enabled {
            self.linear_interpolation = enabled;
            self.revision += 1;
        }
    }

    pub fn transform(&self) -> AffineTransform2D {
        self.placement
            .transform(self.image.width(), self.image.height())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn extent(&self) -> Extent2D {
        self.placement
            .extent(self.image.width(), self.image.height())
    }

    /// Converts the float image to RGBA8 through the current windowing.
    pub fn to_rgba(&self) -> ColorImage {
        let (center, width) = self.windowing();
        let a = center - width / 2.0;
        let slope = 256.0 / width;
        let log_normalization = 255.0 / (1.0f32 + 255.0).ln();

        let mut pixels = Vec::with_capacity(self.image.values().len() * 4);
        for &value in self.image.values() {
            let mut v = (value - a) * slope;
            v = v.clamp(0.0, 255.0);
            if self.apply_log {
                v = log_normalization * (1.0 + v).ln();
            }
            let mut gray = v as u8;
            if self.inverted {
                gray = 255 - gray;
            }
            pixels.extend_from_slice(&[gray, gray, gray, 255]);
        }
        ColorImage::new(self.image.width(), self.image.height(), pixels)
    }
}
