//! # SliceView Core
//!
//! Scene graph for 2D medical image viewports: affine transforms, depth-
//! ordered layers (polylines, text, color and float textures, macros),
//! and the `Scene2D` container with revision tracking for renderers.
//!
//! This crate is the foundation of the SliceView stack.

pub mod color;
pub mod error;
pub mod extent;
pub mod geometry;
pub mod layer;
pub mod scene;
pub mod texture;
pub mod transform;

pub use color::Color;
pub use error::SceneError;
pub use extent::Extent2D;
pub use geometry::ScenePoint2D;
pub use layer::{
    BitmapAnchor, LayerKind, MacroSceneLayer, PolylineSceneLayer, SceneLayer, TextSceneLayer,
};
pub use scene::Scene2D;
pub use texture::{
    ColorImage, ColorTextureSceneLayer, FloatImage, FloatTextureSceneLayer, TexturePlacement,
    WindowingPreset,
};
pub use transform::AffineTransform2D;
