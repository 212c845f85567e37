//! Layer style configurators: versioned rendering style (windowing,
//! inversion, interpolation) applied on top of sliced geometry.

use sliceview_core::{SceneLayer, WindowingPreset};

/// Applies a rendering style to a freshly sliced layer. The revision is
/// versioned independently from the slice geometry, so a style change
/// alone never forces a geometric rebuild.
pub trait LayerStyleConfigurator {
    fn revision(&self) -> u64;
    fn apply(&self, layer: &mut SceneLayer);
}

/// Windowing override for [`GrayscaleStyleConfigurator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowingOverride {
    Preset(WindowingPreset),
    Custom { center: f32, width: f32 },
}

/// Grayscale style for float-texture slices: optional windowing
/// override plus inversion, interpolation and log-scaling flags. Every
/// setter bumps the revision.
#[derive(Debug, Default)]
pub struct GrayscaleStyleConfigurator {
    windowing: Option<WindowingOverride>,
    inverted: bool,
    linear_interpolation: bool,
    apply_log: bool,
    revision: u64,
}

impl GrayscaleStyleConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_windowing_preset(&mut self, preset: WindowingPreset) {
        self.windowing = Some(WindowingOverride::Preset(preset));
        self.revision += 1;
    }

    pub fn set_custom_windowing(&mut self, center: f32, width: f32) {
        self.windowing = Some(WindowingOverride::Custom { center, width });
        self.revision += 1;
    }

    pub fn clear_windowing(&mut self) {
        self.windowing = None;
        self.revision += 1;
    }

    pub fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
        self.revision += 1;
    }

    pub fn set_linear_interpolation(&mut self, enabled: bool) {
        self.linear_interpolation = enabled;
        self.revision += 1;
    }

    pub fn set_apply_log(&mut self, apply_log: bool) {
        self.apply_log = apply_log;
        self.revision += 1;
    }

    pub fn windowing(&self) -> Option<WindowingOverride> {
        self.windowing
    }
}

impl LayerStyleConfigurator for GrayscaleStyleConfigurator {
    fn revision(&self) -> u64 {
        self.revision
    }

    fn apply(&self, layer: &mut SceneLayer) {
        let SceneLayer::FloatTexture(texture) = layer else {
            return;
        };
        match self.windowing {
            Some(WindowingOverride::Preset(preset)) => texture.set_windowing_preset(preset),
            Some(WindowingOverride::Custom { center, width }) => {
                // A degenerate width is refused by the layer; keep the
                // previous windowing in that case.
                let _ = texture.set_custom_windowing(center, width);
            }
            None => {}
        }
        texture.set_inverted(self.inverted);
        texture.set_linear_interpolation(self.linear_interpolation);
        texture.set_apply_log(self.apply_log);
    }
}
