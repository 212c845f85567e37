//! # SliceView Renderer
//!
//! Compositor backends turning a [`sliceview_core::Scene2D`] into pixels.
//! The software path rasterizes into a CPU pixmap and can export PNG
//! screenshots; the GPU path drives a [`GpuDevice`] implementation and
//! keeps uploaded textures and meshes in sync with layer revisions.

pub mod cache;
pub mod compositor;
pub mod fonts;
pub mod gpu;
pub mod software;

pub use cache::RevisionCache;
pub use compositor::{Compositor, RenderError};
pub use fonts::{anchor_translation, FontProvider, GlyphBitmap};
pub use gpu::{GpuCompositor, GpuDevice, MeshId, RecordingDevice, TextureId};
pub use software::{screenshot, SoftwareCompositor};
