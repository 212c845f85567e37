//! Interaction scenarios driving the viewport stack through its public
//! API: pointer gestures, undo history, annotation persistence, and
//! rendering through a real software compositor.

use serde_json::json;

use sliceview_core::{Color, PolylineSceneLayer, SceneLayer, ScenePoint2D};
use sliceview_renderer::{Compositor, SoftwareCompositor};
use sliceview_viewport::{
    AnnotationShape, AnnotationTool, CreateLineTracker, DefaultViewportInteractor, MouseButton,
    PointerEvent, UndoStack, Viewport, ViewportController,
};

fn press(x: f64, y: f64) -> PointerEvent {
    PointerEvent::new(x, y, MouseButton::Left)
}

fn middle(x: f64, y: f64) -> PointerEvent {
    PointerEvent::new(x, y, MouseButton::Middle)
}

fn bounded_layer() -> SceneLayer {
    let mut layer = PolylineSceneLayer::new();
    layer.add_chain(
        vec![
            ScenePoint2D::new(0.0, 0.0),
            ScenePoint2D::new(100.0, 0.0),
            ScenePoint2D::new(100.0, 100.0),
            ScenePoint2D::new(0.0, 100.0),
        ],
        true,
        Color::new(255, 255, 255),
    );
    SceneLayer::Polyline(layer)
}

/// Drags out a line measure from `from` to `to` and releases, going
/// through the controller's tracker dispatch.
fn draw_line(
    controller: &mut ViewportController,
    undo_stack: &mut UndoStack,
    from: (f64, f64),
    to: (f64, f64),
) {
    let tracker = CreateLineTracker::new(controller, &press(from.0, from.1));
    controller.start_tracker(Box::new(tracker));
    controller.handle_pointer_move(&press(to.0, to.1));
    controller.handle_pointer_up(&press(to.0, to.1), undo_stack);
    assert!(!controller.has_active_tracker());
}

#[test]
fn test_pan_shifts_every_scene_point_by_the_canvas_delta() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut viewport = Viewport::with_compositor(Box::new(SoftwareCompositor::new(800, 600)));
    let mut undo_stack = UndoStack::new();
    let interactor = DefaultViewportInteractor::new();

    let mut lock = viewport.lock();
    lock.controller_mut()
        .scene_mut()
        .set_layer(0, bounded_layer());
    lock.fit_content().unwrap();
    let before = lock.controller().scene().scene_to_canvas();

    let controller = lock.controller_mut();
    controller.handle_pointer_down(&interactor, &middle(400.0, 300.0), 800, 600, &mut undo_stack);
    assert!(controller.has_active_tracker());
    assert!(controller.handle_pointer_move(&middle(420.0, 310.0)));
    controller.handle_pointer_up(&middle(420.0, 310.0), &mut undo_stack);
    assert!(!controller.has_active_tracker());

    // A 20 x 10 pixel drag moves the canvas image of every scene point
    // by exactly that amount, leaving the zoom untouched.
    let after = controller.scene().scene_to_canvas();
    for &(x, y) in &[(0.0, 0.0), (100.0, 100.0), (33.0, 66.0)] {
        let (bx, by) = before.apply(x, y);
        let (ax, ay) = after.apply(x, y);
        assert!((ax - bx - 20.0).abs() < 1e-9);
        assert!((ay - by - 10.0).abs() < 1e-9);
    }
    assert!((after.compute_zoom() - before.compute_zoom()).abs() < 1e-9);

    // Panning never touches the undo history.
    assert!(undo_stack.is_empty());
    lock.refresh().unwrap();
}

#[test]
fn test_new_gesture_discards_redo_history() {
    let mut controller = ViewportController::new();
    let mut undo_stack = UndoStack::new();

    draw_line(&mut controller, &mut undo_stack, (0.0, 0.0), (10.0, 0.0));
    draw_line(&mut controller, &mut undo_stack, (0.0, 20.0), (10.0, 20.0));
    assert_eq!(undo_stack.len(), 2);

    undo_stack.undo(&mut controller);
    assert!(undo_stack.can_redo());
    assert_eq!(controller.measure_tools().count(), 1);

    // A fresh creation drops the undone one from the history.
    draw_line(&mut controller, &mut undo_stack, (0.0, 40.0), (10.0, 40.0));
    assert_eq!(undo_stack.len(), 2);
    assert!(!undo_stack.can_redo());
    assert_eq!(controller.measure_tools().count(), 2);

    undo_stack.undo(&mut controller);
    undo_stack.undo(&mut controller);
    assert_eq!(controller.measure_tools().count(), 0);
    assert!(!undo_stack.can_undo());
}

#[test]
fn test_annotation_serialization_matches_the_documented_format() {
    let mut controller = ViewportController::new();
    controller.enable_annotations(50);

    let source = json!({
        "annotations": [
            { "type": "segment", "x1": 10.0, "y1": 20.0, "x2": 30.0, "y2": 40.0 }
        ],
        "units": "pixels",
    });
    controller.unserialize_annotations(&source).unwrap();
    assert_eq!(controller.serialize_annotations().unwrap(), source);
}

#[test]
fn test_annotation_round_trip_between_viewports() {
    let mut controller = ViewportController::new();
    let mut undo_stack = UndoStack::new();
    let interactor = DefaultViewportInteractor::new();
    controller.enable_annotations(50);
    controller.set_annotation_tool(AnnotationTool::Segment);

    controller.handle_pointer_down(&interactor, &press(10.0, 20.0), 800, 600, &mut undo_stack);
    controller.handle_pointer_move(&press(30.0, 40.0));
    controller.handle_pointer_up(&press(30.0, 40.0), &mut undo_stack);

    let serialized = controller.serialize_annotations().unwrap();

    let mut restored = ViewportController::new();
    restored.enable_annotations(50);
    restored.unserialize_annotations(&serialized).unwrap();

    let annotations = restored.annotations().unwrap();
    assert_eq!(annotations.annotation_count(), 1);
    match annotations.annotations().next().unwrap().shape() {
        AnnotationShape::Segment { p1, p2 } => {
            assert_eq!(p1, ScenePoint2D::new(10.0, 20.0));
            assert_eq!(p2, ScenePoint2D::new(30.0, 40.0));
        }
        other => panic!("expected a segment, got {:?}", other),
    };
}

#[test]
fn test_measure_layers_reach_the_canvas() {
    let mut controller = ViewportController::new();
    let mut undo_stack = UndoStack::new();
    draw_line(&mut controller, &mut undo_stack, (-50.0, 0.0), (50.0, 0.0));

    let mut compositor = SoftwareCompositor::new(200, 200);
    compositor.refresh(controller.scene()).unwrap();

    // The segment crosses the canvas center and is drawn in the default
    // line color, which is dominated by its green channel.
    let pixmap = compositor.pixmap();
    let i = (100 * pixmap.width() as usize + 100) * 4;
    assert!(pixmap.data()[i + 1] > 50);

    // Undoing the creation removes the layers from the next frame.
    undo_stack.undo(&mut controller);
    compositor.refresh(controller.scene()).unwrap();
    let i = (100 * compositor.pixmap().width() as usize + 100) * 4;
    assert_eq!(compositor.pixmap().data()[i + 1], 0);
}
