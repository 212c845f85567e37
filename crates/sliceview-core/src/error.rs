use thiserror::Error;

/// Errors reported by the scene graph.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("No layer at depth {0}")]
    LayerNotFound(i32),

    #[error("Transform is singular and cannot be inverted")]
    SingularTransform,

    #[error("Windowing width must be strictly positive, got {0}")]
    InvalidWindowing(f32),

    #[error("Bad file format: {0}")]
    BadFileFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
