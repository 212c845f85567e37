use thiserror::Error;

use sliceview_core::{Scene2D, SceneError, ScenePoint2D};

/// Errors reported by compositors.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("The GPU context was lost")]
    ContextLost,

    #[error("Invalid canvas dimensions: {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Renders a `Scene2D` onto a canvas.
///
/// A compositor keeps per-layer cached state keyed by layer identifier and
/// revision, so repeated refreshes of an unchanged scene are cheap. Feeding
/// a compositor a different scene than the previous refresh resets that
/// state; call `reset_scene` first to do this silently.
pub trait Compositor {
    fn set_canvas_size(&mut self, width: u32, height: u32);

    fn canvas_width(&self) -> u32;

    fn canvas_height(&self) -> u32;

    /// Renders the scene, reusing cached layer state where revisions allow.
    fn refresh(&mut self, scene: &Scene2D) -> Result<(), RenderError>;

    /// Forgets all cached per-layer state.
    fn reset_scene(&mut self);

    /// Canvas coordinates of the center of pixel `(x, y)`. The canvas
    /// origin sits at the center of the canvas.
    fn pixel_center_coordinates(&self, x: i32, y: i32) -> ScenePoint2D {
        ScenePoint2D::new(
            f64::from(x) + 0.5 - f64::from(self.canvas_width()) / 2.0,
            f64::from(y) + 0.5 - f64::from(self.canvas_height()) / 2.0,
        )
    }

    /// Fits the scene content to this compositor's canvas.
    fn fit_content(&self, scene: &mut Scene2D) -> Result<(), SceneError> {
        scene.fit_content(self.canvas_width(), self.canvas_height())
    }
}
