//! # SliceView Viewport
//!
//! Interaction layer on top of the SliceView scene graph: the
//! `ViewportController` that owns a `Scene2D`, pointer trackers for
//! pan/zoom/rotate/grayscale windowing, measure tools with undo/redo,
//! and a persistent annotations layer.
//!
//! Embedders feed `PointerEvent`s into the controller, drain its
//! `ViewportEvent` queue, and repaint through a compositor from the
//! `sliceview-renderer` crate.

pub mod annotations;
pub mod commands;
pub mod controller;
pub mod events;
pub mod interactor;
pub mod layer_holder;
pub mod measure;
pub mod measure_trackers;
pub mod style;
pub mod toolbox;
pub mod trackers;
pub mod viewport;

pub use annotations::{
    Annotation, AnnotationShape, AnnotationTool, AnnotationZone, AnnotationsSceneLayer, Units,
};
pub use commands::{
    CreateMeasureCommand, DeleteMeasureCommand, EditMeasureCommand, MeasureCommand, UndoStack,
};
pub use controller::{ViewportController, ViewportEvent};
pub use events::{MouseButton, PointerEvent};
pub use interactor::{
    create_tracker_for_action, DefaultViewportInteractor, MouseAction, ViewportInteractor,
};
pub use layer_holder::LayerHolder;
pub use measure::{
    AngleMeasureTool, LineMeasureTool, MeasureTool, MeasureToolMemento, MeasureZone,
};
pub use measure_trackers::{
    CreateAngleTracker, CreateLineTracker, EditAngleTracker, EditLineTracker,
};
pub use style::RenderingStyle;
pub use trackers::{
    FixedPointAligner, GestureLifecycle, GrayscaleWindowingTracker, PanTracker, PointerTracker,
    RotateTracker, ZoomTracker,
};
pub use viewport::{Viewport, ViewportLock};
