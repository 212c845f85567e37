use log::{info, warn};
use sliceview_core::{AffineTransform2D, Scene2D, SceneLayer, ScenePoint2D};

use crate::commands::UndoStack;
use crate::controller::ViewportController;
use crate::events::PointerEvent;

/// A stateful handler for one bounded pointer gesture.
///
/// The controller owns at most one tracker at a time, forwards events to
/// it, and drops it once `is_alive` turns false. `cancel` must restore
/// whatever state the tracker captured at creation.
pub trait PointerTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController);

    fn pointer_up(
        &mut self,
        event: &PointerEvent,
        controller: &mut ViewportController,
        undo_stack: &mut UndoStack,
    );

    fn pointer_down(&mut self, event: &PointerEvent, controller: &mut ViewportController);

    fn is_alive(&self) -> bool;

    fn cancel(&mut self, controller: &mut ViewportController);
}

/// Touch bookkeeping shared by the one-gesture trackers.
///
/// The gesture starts with a single touch; releasing it ends the
/// gesture, and any additional press kills it. The extra press rule is a
/// guard against events lost while the pointer is outside the canvas.
#[derive(Debug)]
pub struct GestureLifecycle {
    alive: bool,
    touch_count: usize,
}

impl GestureLifecycle {
    pub fn new() -> Self {
        Self {
            alive: true,
            touch_count: 1,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn pointer_down(&mut self) {
        self.alive = false;
    }

    pub fn pointer_up(&mut self) {
        if self.touch_count > 0 {
            self.touch_count -= 1;
        }
        if self.touch_count == 0 {
            self.alive = false;
        }
    }
}

impl Default for GestureLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_transform(controller: &mut ViewportController, transform: AffineTransform2D) {
    if let Err(error) = controller.set_scene_to_canvas_transform(transform) {
        warn!("Ignoring non-invertible viewport transform: {}", error);
    }
}

/// Keeps one canvas point anchored to the same scene point while the
/// transform around it changes.
pub struct FixedPointAligner {
    canvas: ScenePoint2D,
    pivot: ScenePoint2D,
}

impl FixedPointAligner {
    pub fn new(scene: &Scene2D, canvas: ScenePoint2D) -> Self {
        Self {
            canvas,
            pivot: canvas.apply(&scene.canvas_to_scene()),
        }
    }

    pub fn apply(&self, controller: &mut ViewportController) {
        let moved = self.canvas.apply(&controller.scene().canvas_to_scene());
        let transform = AffineTransform2D::combine(
            &controller.scene().scene_to_canvas(),
            &AffineTransform2D::offset(moved.x - self.pivot.x, moved.y - self.pivot.y),
        );
        apply_transform(controller, transform);
    }
}

// ── Pan ───────────────────────────────────────────────────────────────

/// Translates the scene so that the grabbed scene point follows the
/// pointer.
pub struct PanTracker {
    lifecycle: GestureLifecycle,
    pivot: ScenePoint2D,
    original_scene_to_canvas: AffineTransform2D,
    original_canvas_to_scene: AffineTransform2D,
}

impl PanTracker {
    pub fn new(controller: &ViewportController, event: &PointerEvent) -> Self {
        let scene = controller.scene();
        Self {
            lifecycle: GestureLifecycle::new(),
            pivot: event.main_position().apply(&scene.canvas_to_scene()),
            original_scene_to_canvas: scene.scene_to_canvas(),
            original_canvas_to_scene: scene.canvas_to_scene(),
        }
    }
}

impl PointerTracker for PanTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController) {
        let p = event.main_position().apply(&self.original_canvas_to_scene);
        apply_transform(
            controller,
            AffineTransform2D::combine(
                &self.original_scene_to_canvas,
                &AffineTransform2D::offset(p.x - self.pivot.x, p.y - self.pivot.y),
            ),
        );
    }

    fn pointer_up(
        &mut self,
        _event: &PointerEvent,
        _controller: &mut ViewportController,
        _undo_stack: &mut UndoStack,
    ) {
        self.lifecycle.pointer_up();
    }

    fn pointer_down(&mut self, _event: &PointerEvent, _controller: &mut ViewportController) {
        self.lifecycle.pointer_down();
    }

    fn is_alive(&self) -> bool {
        self.lifecycle.is_alive()
    }

    fn cancel(&mut self, controller: &mut ViewportController) {
        apply_transform(controller, self.original_scene_to_canvas);
    }
}

// ── Zoom ──────────────────────────────────────────────────────────────

const MIN_LOG2_ZOOM: f64 = -4.0;
const MAX_LOG2_ZOOM: f64 = 4.0;

/// Scales the scene as the pointer moves vertically, keeping the clicked
/// canvas point stationary.
pub struct ZoomTracker {
    lifecycle: GestureLifecycle,
    active: bool,
    click_y: f64,
    normalization: f64,
    original_scene_to_canvas: AffineTransform2D,
    aligner: FixedPointAligner,
}

impl ZoomTracker {
    pub fn new(controller: &ViewportController, event: &PointerEvent, canvas_height: u32) -> Self {
        let scene = controller.scene();
        let active = canvas_height > 3;
        if !active {
            warn!("Canvas is too small for zooming");
        }
        Self {
            lifecycle: GestureLifecycle::new(),
            active,
            click_y: event.main_position().y,
            normalization: if active {
                1.0 / f64::from(canvas_height - 1)
            } else {
                0.0
            },
            original_scene_to_canvas: scene.scene_to_canvas(),
            aligner: FixedPointAligner::new(scene, event.main_position()),
        }
    }
}

impl PointerTracker for ZoomTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController) {
        if !self.active {
            return;
        }

        let dy = ((event.main_position().y - self.click_y) * self.normalization).clamp(-1.0, 1.0);
        let z = MIN_LOG2_ZOOM + (MAX_LOG2_ZOOM - MIN_LOG2_ZOOM) * (dy + 1.0) / 2.0;
        let zoom = 2.0_f64.powf(z);

        apply_transform(
            controller,
            AffineTransform2D::combine(
                &AffineTransform2D::scaling(zoom, zoom),
                &self.original_scene_to_canvas,
            ),
        );
        self.aligner.apply(controller);
    }

    fn pointer_up(
        &mut self,
        _event: &PointerEvent,
        _controller: &mut ViewportController,
        _undo_stack: &mut UndoStack,
    ) {
        self.lifecycle.pointer_up();
    }

    fn pointer_down(&mut self, _event: &PointerEvent, _controller: &mut ViewportController) {
        self.lifecycle.pointer_down();
    }

    fn is_alive(&self) -> bool {
        self.lifecycle.is_alive()
    }

    fn cancel(&mut self, controller: &mut ViewportController) {
        apply_transform(controller, self.original_scene_to_canvas);
    }
}

// ── Rotate ────────────────────────────────────────────────────────────

const ROTATE_DEAD_ZONE: f64 = 5.0;

/// Rotates the scene around the clicked canvas point.
pub struct RotateTracker {
    lifecycle: GestureLifecycle,
    click: ScenePoint2D,
    reference_angle: f64,
    first: bool,
    original_scene_to_canvas: AffineTransform2D,
    aligner: FixedPointAligner,
}

impl RotateTracker {
    pub fn new(controller: &ViewportController, event: &PointerEvent) -> Self {
        let scene = controller.scene();
        Self {
            lifecycle: GestureLifecycle::new(),
            click: event.main_position(),
            reference_angle: 0.0,
            first: true,
            original_scene_to_canvas: scene.scene_to_canvas(),
            aligner: FixedPointAligner::new(scene, event.main_position()),
        }
    }
}

impl PointerTracker for RotateTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController) {
        let dx = event.main_position().x - self.click.x;
        let dy = event.main_position().y - self.click.y;

        if dx.abs() > ROTATE_DEAD_ZONE || dy.abs() > ROTATE_DEAD_ZONE {
            let angle = dy.atan2(dx);
            if self.first {
                self.reference_angle = angle;
                self.first = false;
            }

            apply_transform(
                controller,
                AffineTransform2D::combine(
                    &AffineTransform2D::rotation(angle - self.reference_angle),
                    &self.original_scene_to_canvas,
                ),
            );
            self.aligner.apply(controller);
        }
    }

    fn pointer_up(
        &mut self,
        _event: &PointerEvent,
        _controller: &mut ViewportController,
        _undo_stack: &mut UndoStack,
    ) {
        self.lifecycle.pointer_up();
    }

    fn pointer_down(&mut self, _event: &PointerEvent, _controller: &mut ViewportController) {
        self.lifecycle.pointer_down();
    }

    fn is_alive(&self) -> bool {
        self.lifecycle.is_alive()
    }

    fn cancel(&mut self, controller: &mut ViewportController) {
        apply_transform(controller, self.original_scene_to_canvas);
    }
}

// ── Grayscale windowing ───────────────────────────────────────────────

/// Adjusts the windowing of a float texture layer: horizontal pointer
/// motion drives the center, vertical motion the width, both scaled so
/// that crossing the canvas sweeps the full value range.
pub struct GrayscaleWindowingTracker {
    lifecycle: GestureLifecycle,
    layer_depth: i32,
    active: bool,
    click: ScenePoint2D,
    original_center: f32,
    original_width: f32,
    normalization: f64,
}

impl GrayscaleWindowingTracker {
    pub fn new(
        controller: &ViewportController,
        layer_depth: i32,
        event: &PointerEvent,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Self {
        let mut tracker = Self {
            lifecycle: GestureLifecycle::new(),
            layer_depth,
            active: false,
            click: event.main_position(),
            original_center: 0.0,
            original_width: 0.0,
            normalization: 0.0,
        };

        if canvas_width > 3 && canvas_height > 3 {
            if let Ok(SceneLayer::FloatTexture(layer)) = controller.scene().get_layer(layer_depth) {
                let (center, width) = layer.windowing();
                let (min_value, max_value) = layer.image().range();
                tracker.original_center = center;
                tracker.original_width = width;
                tracker.normalization = f64::from(max_value - min_value)
                    / f64::from(canvas_width.min(canvas_height) - 1);
                tracker.active = true;
            } else {
                info!("Cannot create a grayscale windowing tracker on a non-float texture");
            }
        }

        tracker
    }
}

impl PointerTracker for GrayscaleWindowingTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController) {
        if !self.active {
            return;
        }

        let dx = event.main_position().x - self.click.x;
        let dy = event.main_position().y - self.click.y;
        let center = self.original_center + (dx * self.normalization) as f32;
        let width = (self.original_width + (dy * self.normalization) as f32).max(1.0);
        controller.set_layer_windowing(self.layer_depth, center, width);
    }

    fn pointer_up(
        &mut self,
        _event: &PointerEvent,
        _controller: &mut ViewportController,
        _undo_stack: &mut UndoStack,
    ) {
        self.lifecycle.pointer_up();
    }

    fn pointer_down(&mut self, _event: &PointerEvent, _controller: &mut ViewportController) {
        self.lifecycle.pointer_down();
    }

    fn is_alive(&self) -> bool {
        self.lifecycle.is_alive()
    }

    fn cancel(&mut self, controller: &mut ViewportController) {
        if self.active {
            controller.set_layer_windowing(self.layer_depth, self.original_center, self.original_width);
        }
    }
}
