use std::collections::{HashMap, VecDeque};

use log::warn;
use serde_json::Value;
use uuid::Uuid;

use sliceview_core::{AffineTransform2D, Scene2D, SceneError, SceneLayer, ScenePoint2D};

use crate::annotations::{AnnotationTool, AnnotationsSceneLayer};
use crate::commands::UndoStack;
use crate::events::PointerEvent;
use crate::interactor::ViewportInteractor;
use crate::measure::{MeasureTool, MeasureToolMemento, MeasureZone};
use crate::measure_trackers::{EditAngleTracker, EditLineTracker};
use crate::style::RenderingStyle;
use crate::trackers::PointerTracker;

/// Outbound notification queued by the controller and drained by the
/// embedder through `take_events`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    TransformChanged,
    SceneUpdated,
    GrayscaleWindowingChanged { center: f32, width: f32 },
    AnnotationAdded,
    AnnotationRemoved,
    AnnotationChanged,
}

/// Owner of the scene and of everything interacting with it: the
/// measure-tool arena, the optional annotations layer, and the one
/// pointer tracker that may be in flight.
///
/// Deactivated measure tools stay in the arena so that an undone
/// creation can be redone; only the insertion-ordered active list
/// decides what is visible and hit-testable.
pub struct ViewportController {
    scene: Scene2D,
    style: RenderingStyle,
    tools: HashMap<Uuid, MeasureTool>,
    active_tools: Vec<Uuid>,
    annotations: Option<AnnotationsSceneLayer>,
    tracker: Option<Box<dyn PointerTracker>>,
    canvas_to_scene_factor: f64,
    events: VecDeque<ViewportEvent>,
}

impl ViewportController {
    pub fn new() -> Self {
        Self {
            scene: Scene2D::new(),
            style: RenderingStyle::default(),
            tools: HashMap::new(),
            active_tools: Vec::new(),
            annotations: None,
            tracker: None,
            canvas_to_scene_factor: 1.0,
            events: VecDeque::new(),
        }
    }

    // ── Scene and transform ───────────────────────────────────────────

    pub fn scene(&self) -> &Scene2D {
        &self.scene
    }

    /// Mutable scene access; assumes the scene is about to change and
    /// queues `SceneUpdated`.
    pub fn scene_mut(&mut self) -> &mut Scene2D {
        self.events.push_back(ViewportEvent::SceneUpdated);
        &mut self.scene
    }

    pub fn set_scene_to_canvas_transform(
        &mut self,
        transform: AffineTransform2D,
    ) -> Result<(), SceneError> {
        self.scene.set_scene_to_canvas_transform(transform)?;
        self.on_transform_changed();
        Ok(())
    }

    /// Fits the scene content to the canvas, then redraws the tools at
    /// the new zoom.
    pub fn fit_content(&mut self, canvas_width: u32, canvas_height: u32) -> Result<(), SceneError> {
        self.scene.fit_content(canvas_width, canvas_height)?;
        self.on_transform_changed();
        Ok(())
    }

    pub fn zoom(&self) -> f64 {
        self.scene.scene_to_canvas().compute_zoom()
    }

    /// Scene units per canvas pixel; cached, the tool geometry uses it
    /// on every refresh.
    pub fn canvas_to_scene_factor(&self) -> f64 {
        self.canvas_to_scene_factor
    }

    /// Side of the square tool handles, in scene units.
    pub fn handle_side_scene(&self) -> f64 {
        self.style.handle_side * self.canvas_to_scene_factor
    }

    /// Hit-test threshold, in scene units.
    pub fn hit_test_distance_scene(&self) -> f64 {
        self.style.hit_test_max_distance * self.canvas_to_scene_factor
    }

    /// Radius of the measure-tool arcs, in scene units.
    pub fn arc_radius_scene(&self) -> f64 {
        self.style.arc_radius * self.canvas_to_scene_factor
    }

    fn on_transform_changed(&mut self) {
        self.canvas_to_scene_factor = self.scene.canvas_to_scene().compute_zoom();
        self.refresh_tool_geometry();
        self.events.push_back(ViewportEvent::TransformChanged);
    }

    fn refresh_tool_geometry(&mut self) {
        for id in self.active_tools.clone() {
            if let Some(tool) = self.tools.get_mut(&id) {
                tool.refresh_scene(&mut self.scene, &self.style);
            }
        }
        if let Some(annotations) = &mut self.annotations {
            annotations.recompute(&mut self.scene, &self.style);
        }
    }

    // ── Style ─────────────────────────────────────────────────────────

    pub fn style(&self) -> &RenderingStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: RenderingStyle) {
        self.style = style;
        self.refresh_tool_geometry();
    }

    // ── Windowing ─────────────────────────────────────────────────────

    /// Applies a custom grayscale windowing to the float texture layer
    /// at `depth`, queueing `GrayscaleWindowingChanged` on success.
    pub fn set_layer_windowing(&mut self, depth: i32, center: f32, width: f32) {
        match self.scene.get_layer_mut(depth) {
            Ok(SceneLayer::FloatTexture(layer)) => match layer.set_custom_windowing(center, width) {
                Ok(()) => {
                    self.events
                        .push_back(ViewportEvent::GrayscaleWindowingChanged { center, width });
                }
                Err(error) => warn!("Cannot apply the grayscale windowing: {}", error),
            },
            _ => warn!("No float texture layer at depth {}", depth),
        }
    }

    // ── Measure tools ─────────────────────────────────────────────────

    /// Registers the tool, activates it, and draws it.
    ///
    /// Panics when a tool with the same id is already registered.
    pub fn add_measure_tool(&mut self, tool: MeasureTool) -> Uuid {
        let id = tool.id();
        assert!(
            !self.tools.contains_key(&id),
            "measure tool registered twice"
        );
        self.tools.insert(id, tool);
        self.active_tools.push(id);
        self.refresh_measure_tool(id);
        id
    }

    pub fn measure_tool(&self, id: Uuid) -> Option<&MeasureTool> {
        self.tools.get(&id)
    }

    pub(crate) fn measure_tool_mut(&mut self, id: Uuid) -> Option<&mut MeasureTool> {
        self.tools.get_mut(&id)
    }

    /// Active tools in insertion order.
    pub fn measure_tools(&self) -> impl Iterator<Item = &MeasureTool> {
        self.active_tools
            .iter()
            .filter_map(move |id| self.tools.get(id))
    }

    pub fn measure_tool_state(&self, id: Uuid) -> Option<MeasureToolMemento> {
        self.tools.get(&id).map(MeasureTool::state)
    }

    pub fn set_measure_tool_state(&mut self, id: Uuid, memento: &MeasureToolMemento) {
        if let Some(tool) = self.tools.get_mut(&id) {
            tool.set_state(memento);
            tool.refresh_scene(&mut self.scene, &self.style);
        }
    }

    /// Re-enables a deactivated tool and puts it back on the active
    /// list.
    pub fn activate_measure_tool(&mut self, id: Uuid) {
        if let Some(tool) = self.tools.get_mut(&id) {
            tool.enable();
            if !self.active_tools.contains(&id) {
                self.active_tools.push(id);
            }
            tool.refresh_scene(&mut self.scene, &self.style);
        }
    }

    /// Hides the tool and takes it off the active list; it stays in
    /// the arena so a command can activate it again.
    pub fn deactivate_measure_tool(&mut self, id: Uuid) {
        if let Some(tool) = self.tools.get_mut(&id) {
            tool.disable(&mut self.scene);
        }
        self.active_tools.retain(|active| *active != id);
    }

    /// User-facing deletion: same as deactivation, which keeps the
    /// undo history working.
    ///
    /// Panics when the id was never registered.
    pub fn remove_measure_tool(&mut self, id: Uuid) {
        assert!(
            self.tools.contains_key(&id),
            "removing an unknown measure tool"
        );
        self.deactivate_measure_tool(id);
    }

    /// Drops the tool entirely; for cancelled creations that never
    /// reached the undo stack.
    pub(crate) fn discard_measure_tool(&mut self, id: Uuid) {
        if let Some(mut tool) = self.tools.remove(&id) {
            tool.disable(&mut self.scene);
        }
        self.active_tools.retain(|active| *active != id);
    }

    pub(crate) fn refresh_measure_tool(&mut self, id: Uuid) {
        if let Some(tool) = self.tools.get_mut(&id) {
            tool.refresh_scene(&mut self.scene, &self.style);
        }
    }

    /// First hit in insertion order; `p` is in scene coordinates.
    pub fn hit_test(&self, p: ScenePoint2D) -> Option<(Uuid, MeasureZone)> {
        for id in &self.active_tools {
            if let Some(tool) = self.tools.get(id) {
                if let Some(zone) = tool.hit_test(p, self.canvas_to_scene_factor, &self.style) {
                    return Some((*id, zone));
                }
            }
        }
        None
    }

    pub fn set_measure_tool_highlight(&mut self, id: Uuid, zone: Option<MeasureZone>) {
        if let Some(tool) = self.tools.get_mut(&id) {
            if tool.set_highlight(zone) {
                tool.refresh_scene(&mut self.scene, &self.style);
            }
        }
    }

    // ── Annotations ───────────────────────────────────────────────────

    /// Creates the annotations layer at `depth`; a no-op when one is
    /// already installed.
    pub fn enable_annotations(&mut self, depth: i32) {
        if self.annotations.is_none() {
            let mut annotations = AnnotationsSceneLayer::new(depth);
            annotations.recompute(&mut self.scene, &self.style);
            self.annotations = Some(annotations);
        }
    }

    pub fn set_annotation_tool(&mut self, tool: AnnotationTool) {
        if let Some(annotations) = &mut self.annotations {
            annotations.set_active_tool(tool);
            annotations.recompute(&mut self.scene, &self.style);
        }
    }

    pub fn annotations(&self) -> Option<&AnnotationsSceneLayer> {
        self.annotations.as_ref()
    }

    pub fn serialize_annotations(&self) -> Option<Value> {
        self.annotations.as_ref().map(AnnotationsSceneLayer::serialize)
    }

    pub fn unserialize_annotations(&mut self, serialized: &Value) -> Result<(), SceneError> {
        match &mut self.annotations {
            Some(annotations) => {
                annotations.unserialize(serialized)?;
                annotations.recompute(&mut self.scene, &self.style);
                self.events.push_back(ViewportEvent::SceneUpdated);
                Ok(())
            }
            None => {
                warn!("No annotations layer to unserialize into");
                Ok(())
            }
        }
    }

    /// Split borrow for the annotation trackers, which update the
    /// layer and redraw it in one go.
    pub(crate) fn annotation_parts(
        &mut self,
    ) -> (
        Option<&mut AnnotationsSceneLayer>,
        &mut Scene2D,
        &RenderingStyle,
        &mut VecDeque<ViewportEvent>,
    ) {
        (
            self.annotations.as_mut(),
            &mut self.scene,
            &self.style,
            &mut self.events,
        )
    }

    // ── Events ────────────────────────────────────────────────────────

    pub fn take_events(&mut self) -> Vec<ViewportEvent> {
        self.events.drain(..).collect()
    }

    pub(crate) fn queue_event(&mut self, event: ViewportEvent) {
        self.events.push_back(event);
    }

    // ── Pointer dispatch ──────────────────────────────────────────────

    /// Installs an externally created tracker (measure creation,
    /// custom gestures); pointer events are forwarded to it until it
    /// dies.
    pub fn start_tracker(&mut self, tracker: Box<dyn PointerTracker>) {
        if self.tracker.is_some() {
            warn!("Discarding a tracker that was still active");
            self.cancel_active_tracker();
        }
        self.tracker = Some(tracker);
    }

    pub fn has_active_tracker(&self) -> bool {
        self.tracker.is_some()
    }

    pub fn cancel_active_tracker(&mut self) {
        if let Some(mut tracker) = self.tracker.take() {
            tracker.cancel(self);
        }
    }

    /// Routes a press: the active tracker first, then an armed
    /// annotations layer (which consumes the press even on a miss),
    /// then the measure tools, and the interactor last.
    pub fn handle_pointer_down(
        &mut self,
        interactor: &dyn ViewportInteractor,
        event: &PointerEvent,
        canvas_width: u32,
        canvas_height: u32,
        _undo_stack: &mut UndoStack,
    ) {
        if let Some(mut tracker) = self.tracker.take() {
            tracker.pointer_down(event, self);
            if tracker.is_alive() {
                self.tracker = Some(tracker);
            }
            return;
        }

        let scene_pos = event.main_position().apply(&self.scene.canvas_to_scene());

        let armed = self
            .annotations
            .as_ref()
            .map_or(false, |a| a.active_tool() != AnnotationTool::None);
        if armed {
            let factor = self.canvas_to_scene_factor;
            if let Some(annotations) = &mut self.annotations {
                self.tracker =
                    annotations.create_tracker(scene_pos, factor, &self.style, &mut self.events);
                annotations.recompute(&mut self.scene, &self.style);
            }
            return;
        }

        if let Some((id, zone)) = self.hit_test(scene_pos) {
            let is_line = matches!(self.measure_tool(id), Some(MeasureTool::Line(_)));
            let tracker: Option<Box<dyn PointerTracker>> = if is_line {
                EditLineTracker::new(self, id, zone, event)
                    .map(|tracker| Box::new(tracker) as Box<dyn PointerTracker>)
            } else {
                EditAngleTracker::new(self, id, zone, event)
                    .map(|tracker| Box::new(tracker) as Box<dyn PointerTracker>)
            };
            if tracker.is_some() {
                self.tracker = tracker;
                return;
            }
        }

        self.tracker = interactor.create_tracker(self, event, canvas_width, canvas_height);
    }

    /// Forwards a move to the active tracker, or updates the hover
    /// state when no gesture is in flight. Returns whether a repaint
    /// is warranted.
    pub fn handle_pointer_move(&mut self, event: &PointerEvent) -> bool {
        if let Some(mut tracker) = self.tracker.take() {
            tracker.pointer_move(event, self);
            self.tracker = Some(tracker);
            return true;
        }

        let scene_pos = event.main_position().apply(&self.scene.canvas_to_scene());
        let mut changed = self.update_measure_highlight(scene_pos);
        if self.update_annotation_hover(scene_pos) {
            changed = true;
        }
        changed
    }

    /// Forwards a release; a tracker that completed commits its
    /// command to `undo_stack` inside `pointer_up`.
    pub fn handle_pointer_up(&mut self, event: &PointerEvent, undo_stack: &mut UndoStack) {
        if let Some(mut tracker) = self.tracker.take() {
            tracker.pointer_up(event, self, undo_stack);
            if tracker.is_alive() {
                self.tracker = Some(tracker);
            }
        }
    }

    fn update_measure_highlight(&mut self, p: ScenePoint2D) -> bool {
        let hit = self.hit_test(p);
        let mut changed = false;
        for id in self.active_tools.clone() {
            let zone = match hit {
                Some((hit_id, zone)) if hit_id == id => Some(zone),
                _ => None,
            };
            if let Some(tool) = self.tools.get_mut(&id) {
                if tool.set_highlight(zone) {
                    tool.refresh_scene(&mut self.scene, &self.style);
                    changed = true;
                }
            }
        }
        changed
    }

    fn update_annotation_hover(&mut self, p: ScenePoint2D) -> bool {
        let factor = self.canvas_to_scene_factor;
        if let Some(annotations) = &mut self.annotations {
            if annotations.set_mouse_hover(p, factor, &self.style) {
                annotations.recompute(&mut self.scene, &self.style);
                return true;
            }
        }
        false
    }
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use sliceview_core::{Color, PolylineSceneLayer};

    use super::*;
    use crate::events::MouseButton;
    use crate::interactor::DefaultViewportInteractor;
    use crate::measure::LineMeasureTool;
    use crate::measure_trackers::CreateLineTracker;

    fn press(x: f64, y: f64) -> PointerEvent {
        PointerEvent::new(x, y, MouseButton::Left)
    }

    fn line_tool(
        controller: &mut ViewportController,
        start: (f64, f64),
        end: (f64, f64),
    ) -> Uuid {
        controller.add_measure_tool(MeasureTool::Line(LineMeasureTool::new(
            ScenePoint2D::new(start.0, start.1),
            ScenePoint2D::new(end.0, end.1),
        )))
    }

    #[test]
    fn test_create_edit_undo_redo_round_trip() {
        let mut controller = ViewportController::new();
        let mut undo_stack = UndoStack::new();
        let interactor = DefaultViewportInteractor::new();

        // Draw a line from (10, 10) to (60, 10).
        let tracker = CreateLineTracker::new(&mut controller, &press(10.0, 10.0));
        controller.start_tracker(Box::new(tracker));
        assert!(controller.handle_pointer_move(&press(60.0, 10.0)));
        controller.handle_pointer_up(&press(60.0, 10.0), &mut undo_stack);
        assert!(!controller.has_active_tracker());
        assert_eq!(undo_stack.len(), 1);

        let id = controller.measure_tools().next().unwrap().id();

        // Grab the end handle and drag it to (80, 30).
        controller.handle_pointer_down(&interactor, &press(60.0, 10.0), 800, 600, &mut undo_stack);
        assert!(controller.has_active_tracker());
        controller.handle_pointer_move(&press(80.0, 30.0));
        controller.handle_pointer_up(&press(80.0, 30.0), &mut undo_stack);
        assert_eq!(undo_stack.len(), 2);
        assert_eq!(
            controller.measure_tool_state(id),
            Some(MeasureToolMemento::Line {
                start: ScenePoint2D::new(10.0, 10.0),
                end: ScenePoint2D::new(80.0, 30.0),
            })
        );

        // Undo the edit, then the creation.
        undo_stack.undo(&mut controller);
        assert_eq!(
            controller.measure_tool_state(id),
            Some(MeasureToolMemento::Line {
                start: ScenePoint2D::new(10.0, 10.0),
                end: ScenePoint2D::new(60.0, 10.0),
            })
        );
        undo_stack.undo(&mut controller);
        assert_eq!(controller.measure_tools().count(), 0);
        assert!(!controller.measure_tool(id).unwrap().is_enabled());

        // Redo both.
        undo_stack.redo(&mut controller);
        assert_eq!(controller.measure_tools().count(), 1);
        undo_stack.redo(&mut controller);
        assert_eq!(
            controller.measure_tool_state(id),
            Some(MeasureToolMemento::Line {
                start: ScenePoint2D::new(10.0, 10.0),
                end: ScenePoint2D::new(80.0, 30.0),
            })
        );
    }

    #[test]
    fn test_earlier_tool_wins_overlapping_hits() {
        let mut controller = ViewportController::new();
        let first = line_tool(&mut controller, (0.0, 0.0), (100.0, 0.0));
        let second = line_tool(&mut controller, (0.0, 5.0), (100.0, 5.0));

        // Both segments are within the threshold; insertion order
        // breaks the tie.
        assert_eq!(
            controller.hit_test(ScenePoint2D::new(50.0, 4.0)),
            Some((first, MeasureZone::Segment))
        );

        // Even an exact hit on the second tool's handle loses to an
        // earlier tool that also matches.
        assert_eq!(
            controller.hit_test(ScenePoint2D::new(0.0, 5.0)),
            Some((first, MeasureZone::Start))
        );

        controller.deactivate_measure_tool(first);
        assert_eq!(
            controller.hit_test(ScenePoint2D::new(50.0, 4.0)),
            Some((second, MeasureZone::Segment))
        );
    }

    #[test]
    fn test_pointer_move_updates_measure_highlight() {
        let mut controller = ViewportController::new();
        let id = line_tool(&mut controller, (0.0, 0.0), (100.0, 0.0));

        assert!(controller.handle_pointer_move(&press(50.0, 3.0)));
        assert_eq!(
            controller.measure_tool(id).unwrap().highlight(),
            Some(MeasureZone::Segment)
        );

        // Unchanged hover reports no repaint.
        assert!(!controller.handle_pointer_move(&press(50.0, 3.0)));

        assert!(controller.handle_pointer_move(&press(50.0, 200.0)));
        assert_eq!(controller.measure_tool(id).unwrap().highlight(), None);
    }

    #[test]
    fn test_armed_annotations_consume_the_press() {
        let mut controller = ViewportController::new();
        let mut undo_stack = UndoStack::new();
        let interactor = DefaultViewportInteractor::new();
        line_tool(&mut controller, (0.0, 0.0), (100.0, 0.0));
        controller.enable_annotations(50);
        controller.set_annotation_tool(AnnotationTool::Segment);

        // The press lands on a measure handle, but the armed layer
        // takes it.
        controller.handle_pointer_down(&interactor, &press(0.0, 0.0), 800, 600, &mut undo_stack);
        assert!(controller.has_active_tracker());
        assert_eq!(controller.annotations().unwrap().annotation_count(), 1);

        controller.handle_pointer_move(&press(40.0, 40.0));
        controller.handle_pointer_up(&press(40.0, 40.0), &mut undo_stack);
        assert!(!controller.has_active_tracker());
        assert!(controller
            .take_events()
            .contains(&ViewportEvent::AnnotationAdded));

        // Annotations never reach the undo stack.
        assert_eq!(undo_stack.len(), 0);
    }

    #[test]
    fn test_pointer_move_updates_annotation_hover() {
        let mut controller = ViewportController::new();
        controller.enable_annotations(50);
        {
            let (annotations, scene, style, _events) = controller.annotation_parts();
            let layer = annotations.unwrap();
            layer.add_segment(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(100.0, 0.0));
            layer.recompute(scene, style);
        }
        controller.set_annotation_tool(AnnotationTool::Edit);

        assert!(controller.handle_pointer_move(&press(50.0, 3.0)));
        assert!(controller.annotations().unwrap().has_hover());

        assert!(controller.handle_pointer_move(&press(50.0, 200.0)));
        assert!(!controller.annotations().unwrap().has_hover());
    }

    #[test]
    fn test_interactor_reached_on_miss() {
        let mut controller = ViewportController::new();
        let mut undo_stack = UndoStack::new();
        let interactor = DefaultViewportInteractor::new();
        line_tool(&mut controller, (0.0, 0.0), (100.0, 0.0));

        // Far away from the tool: the press falls through to the
        // interactor, and the middle button pans.
        controller.handle_pointer_down(
            &interactor,
            &PointerEvent::new(400.0, 300.0, MouseButton::Middle),
            800,
            600,
            &mut undo_stack,
        );
        assert!(controller.has_active_tracker());

        controller.handle_pointer_move(&PointerEvent::new(420.0, 310.0, MouseButton::Middle));
        let (x, y) = controller.scene().scene_to_canvas().apply(0.0, 0.0);
        assert!((x - 20.0).abs() < 1e-10);
        assert!((y - 10.0).abs() < 1e-10);

        controller.handle_pointer_up(
            &PointerEvent::new(420.0, 310.0, MouseButton::Middle),
            &mut undo_stack,
        );
        assert!(!controller.has_active_tracker());
    }

    #[test]
    fn test_fit_content_is_idempotent() {
        let mut controller = ViewportController::new();
        let mut layer = PolylineSceneLayer::new();
        layer.add_chain(
            vec![ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(100.0, 50.0)],
            false,
            Color::new(255, 255, 255),
        );
        controller
            .scene_mut()
            .set_layer(0, SceneLayer::Polyline(layer));
        controller.take_events();

        controller.fit_content(200, 100).unwrap();
        assert!(controller
            .take_events()
            .contains(&ViewportEvent::TransformChanged));
        let first = controller.scene().scene_to_canvas();

        // The content center lands on the canvas origin at zoom 2.
        let (x, y) = first.apply(50.0, 25.0);
        assert!(x.abs() < 1e-10 && y.abs() < 1e-10);
        assert!((controller.zoom() - 2.0).abs() < 1e-10);
        assert!((controller.canvas_to_scene_factor() - 0.5).abs() < 1e-10);

        controller.fit_content(200, 100).unwrap();
        assert_eq!(controller.scene().scene_to_canvas(), first);
    }

    #[test]
    fn test_transform_change_rescales_tool_handles() {
        let mut controller = ViewportController::new();
        let id = line_tool(&mut controller, (0.0, 0.0), (100.0, 0.0));

        controller
            .set_scene_to_canvas_transform(AffineTransform2D::scaling(2.0, 2.0))
            .unwrap();

        // Handles keep their canvas size, so their scene size halves.
        assert!((controller.handle_side_scene() - 5.0).abs() < 1e-10);

        // The hit threshold shrinks accordingly: 8 scene units away is
        // a miss at zoom 2.
        assert_eq!(controller.hit_test(ScenePoint2D::new(50.0, 8.0)), None);
        assert_eq!(
            controller.hit_test(ScenePoint2D::new(50.0, 7.0)),
            Some((id, MeasureZone::Segment))
        );
    }

    #[test]
    fn test_scene_mut_queues_scene_updated() {
        let mut controller = ViewportController::new();
        controller.scene_mut();
        let events = controller.take_events();
        assert_eq!(events, vec![ViewportEvent::SceneUpdated]);
        assert!(controller.take_events().is_empty());
    }

    #[test]
    fn test_annotation_serialization_wrappers() {
        let mut controller = ViewportController::new();
        assert!(controller.serialize_annotations().is_none());

        controller.enable_annotations(50);
        {
            let (annotations, scene, style, _events) = controller.annotation_parts();
            let layer = annotations.unwrap();
            layer.add_segment(ScenePoint2D::new(1.0, 2.0), ScenePoint2D::new(3.0, 4.0));
            layer.recompute(scene, style);
        }

        let serialized = controller.serialize_annotations().unwrap();

        let mut restored = ViewportController::new();
        restored.enable_annotations(50);
        restored.unserialize_annotations(&serialized).unwrap();
        assert_eq!(restored.annotations().unwrap().annotation_count(), 1);
        assert!(restored
            .take_events()
            .contains(&ViewportEvent::SceneUpdated));
    }

    #[test]
    fn test_cancelling_restores_the_gesture_state() {
        let mut controller = ViewportController::new();
        let mut undo_stack = UndoStack::new();
        let interactor = DefaultViewportInteractor::new();

        let original = controller.scene().scene_to_canvas();
        controller.handle_pointer_down(
            &interactor,
            &PointerEvent::new(100.0, 100.0, MouseButton::Middle),
            800,
            600,
            &mut undo_stack,
        );
        controller.handle_pointer_move(&PointerEvent::new(150.0, 150.0, MouseButton::Middle));
        assert_ne!(controller.scene().scene_to_canvas(), original);

        controller.cancel_active_tracker();
        assert!(!controller.has_active_tracker());
        assert_eq!(controller.scene().scene_to_canvas(), original);
    }
}
