//! # SliceView Volume
//!
//! The slicing bridge between 3D volumes and 2D scenes: cutting planes,
//! the [`VolumeSlicer`] contract, layer style configurators, and the
//! [`VolumeSceneLayerSource`] that keeps one scene depth slot in sync
//! with a slicer, rebuilding only when the plane or the data changed.

pub mod plane;
pub mod slicer;
pub mod source;
pub mod style;

pub use plane::CuttingPlane;
pub use slicer::{ExtractedSlice, InvalidSlice, VolumeSlicer};
pub use source::VolumeSceneLayerSource;
pub use style::{GrayscaleStyleConfigurator, LayerStyleConfigurator, WindowingOverride};
