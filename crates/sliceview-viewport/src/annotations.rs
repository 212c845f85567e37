use std::collections::VecDeque;
use std::f64::consts::PI;

use log::error;
use serde_json::{json, Value};
use uuid::Uuid;

use sliceview_core::{
    BitmapAnchor, MacroSceneLayer, PolylineSceneLayer, Scene2D, SceneError, SceneLayer,
    ScenePoint2D, TextSceneLayer,
};

use crate::commands::UndoStack;
use crate::controller::{ViewportController, ViewportEvent};
use crate::events::PointerEvent;
use crate::style::RenderingStyle;
use crate::toolbox;
use crate::trackers::PointerTracker;

/// Arc radius of angle annotations, in canvas pixels.
const ARC_RADIUS: f64 = 20.0;

/// Border around annotation labels, in canvas pixels.
const LABEL_BORDER: u32 = 10;

/// Unit of the scene coordinates, which drives the label formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Millimeters,
    Pixels,
}

/// Tool armed on the annotations layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationTool {
    /// Clicking an annotation drags its grabbed part.
    Edit,
    /// The layer leaves all pointer events alone.
    None,
    Segment,
    Angle,
    Circle,
    /// Clicking an annotation deletes it.
    Remove,
}

/// Geometry of one annotation, defined by its control points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnnotationShape {
    Segment {
        p1: ScenePoint2D,
        p2: ScenePoint2D,
    },
    Angle {
        side1_end: ScenePoint2D,
        center: ScenePoint2D,
        side2_end: ScenePoint2D,
    },
    /// The two control points are the ends of a diameter.
    Circle {
        p1: ScenePoint2D,
        p2: ScenePoint2D,
    },
}

impl AnnotationShape {
    /// Control points, in serialization order.
    pub fn points(&self) -> Vec<ScenePoint2D> {
        match self {
            AnnotationShape::Segment { p1, p2 } => vec![*p1, *p2],
            AnnotationShape::Angle {
                side1_end,
                center,
                side2_end,
            } => vec![*side1_end, *center, *side2_end],
            AnnotationShape::Circle { p1, p2 } => vec![*p1, *p2],
        }
    }

    pub fn point(&self, index: usize) -> Option<ScenePoint2D> {
        self.points().get(index).copied()
    }

    /// Straight segments of the shape; the circle contributes none.
    fn segments(&self) -> Vec<(ScenePoint2D, ScenePoint2D)> {
        match self {
            AnnotationShape::Segment { p1, p2 } => vec![(*p1, *p2)],
            AnnotationShape::Angle {
                side1_end,
                center,
                side2_end,
            } => vec![(*side1_end, *center), (*center, *side2_end)],
            AnnotationShape::Circle { .. } => Vec::new(),
        }
    }

    /// Copy of the shape with one control point replaced; an
    /// out-of-range index leaves the shape unchanged.
    pub fn with_point(&self, index: usize, p: ScenePoint2D) -> AnnotationShape {
        match (self, index) {
            (AnnotationShape::Segment { p2, .. }, 0) => AnnotationShape::Segment { p1: p, p2: *p2 },
            (AnnotationShape::Segment { p1, .. }, 1) => AnnotationShape::Segment { p1: *p1, p2: p },
            (
                AnnotationShape::Angle {
                    center, side2_end, ..
                },
                0,
            ) => AnnotationShape::Angle {
                side1_end: p,
                center: *center,
                side2_end: *side2_end,
            },
            (
                AnnotationShape::Angle {
                    side1_end,
                    side2_end,
                    ..
                },
                1,
            ) => AnnotationShape::Angle {
                side1_end: *side1_end,
                center: p,
                side2_end: *side2_end,
            },
            (
                AnnotationShape::Angle {
                    side1_end, center, ..
                },
                2,
            ) => AnnotationShape::Angle {
                side1_end: *side1_end,
                center: *center,
                side2_end: p,
            },
            (AnnotationShape::Circle { p2, .. }, 0) => AnnotationShape::Circle { p1: p, p2: *p2 },
            (AnnotationShape::Circle { p1, .. }, 1) => AnnotationShape::Circle { p1: *p1, p2: p },
            _ => *self,
        }
    }

    pub fn translated(&self, delta: ScenePoint2D) -> AnnotationShape {
        match self {
            AnnotationShape::Segment { p1, p2 } => AnnotationShape::Segment {
                p1: *p1 + delta,
                p2: *p2 + delta,
            },
            AnnotationShape::Angle {
                side1_end,
                center,
                side2_end,
            } => AnnotationShape::Angle {
                side1_end: *side1_end + delta,
                center: *center + delta,
                side2_end: *side2_end + delta,
            },
            AnnotationShape::Circle { p1, p2 } => AnnotationShape::Circle {
                p1: *p1 + delta,
                p2: *p2 + delta,
            },
        }
    }
}

/// Part of an annotation hit by the pointer. The angle arc and the
/// labels are decorations, never hit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationZone {
    /// Square handle over the control point with this index.
    Handle(usize),
    /// Body of the straight segment with this index.
    Segment(usize),
    /// Outline of a circle.
    Outline,
}

impl AnnotationZone {
    /// Hit-test priority class; lower wins over larger distances.
    fn priority(&self) -> u8 {
        match self {
            AnnotationZone::Handle(_) => 0,
            AnnotationZone::Segment(_) => 1,
            AnnotationZone::Outline => 2,
        }
    }
}

/// One annotation of the set.
#[derive(Debug)]
pub struct Annotation {
    id: Uuid,
    shape: AnnotationShape,
    label_visible: bool,
}

impl Annotation {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn shape(&self) -> AnnotationShape {
        self.shape
    }

    pub fn is_label_visible(&self) -> bool {
        self.label_visible
    }
}

/// A set of persistent annotations rendered into one macro layer of
/// the scene.
///
/// The control points are the model; `recompute` rebuilds the macro
/// sub-layers from them: a single polyline holding circles and arcs,
/// then segment bodies, then the handles on top, followed by one text
/// sub-layer per visible label.
#[derive(Debug)]
pub struct AnnotationsSceneLayer {
    depth: i32,
    units: Units,
    active_tool: AnnotationTool,
    annotations: Vec<Annotation>,
    hover: Option<(Uuid, AnnotationZone)>,
}

impl AnnotationsSceneLayer {
    pub fn new(depth: i32) -> Self {
        Self {
            depth,
            units: Units::Millimeters,
            active_tool: AnnotationTool::None,
            annotations: Vec::new(),
            hover: None,
        }
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn units(&self) -> Units {
        self.units
    }

    /// Changing the units invalidates every measurement, so the whole
    /// set is cleared.
    pub fn set_units(&mut self, units: Units) {
        if self.units != units {
            self.units = units;
            self.clear();
        }
    }

    pub fn active_tool(&self) -> AnnotationTool {
        self.active_tool
    }

    pub fn set_active_tool(&mut self, tool: AnnotationTool) {
        self.active_tool = tool;
        if tool == AnnotationTool::None {
            self.hover = None;
        }
    }

    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    /// Annotations in insertion order.
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn annotation(&self, id: Uuid) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn annotation_shape(&self, id: Uuid) -> Option<AnnotationShape> {
        self.annotation(id).map(|a| a.shape)
    }

    fn add(&mut self, shape: AnnotationShape) -> Uuid {
        let id = Uuid::new_v4();
        self.annotations.push(Annotation {
            id,
            shape,
            label_visible: true,
        });
        id
    }

    pub fn add_segment(&mut self, p1: ScenePoint2D, p2: ScenePoint2D) -> Uuid {
        self.add(AnnotationShape::Segment { p1, p2 })
    }

    pub fn add_angle(
        &mut self,
        side1_end: ScenePoint2D,
        center: ScenePoint2D,
        side2_end: ScenePoint2D,
    ) -> Uuid {
        self.add(AnnotationShape::Angle {
            side1_end,
            center,
            side2_end,
        })
    }

    pub fn add_circle(&mut self, p1: ScenePoint2D, p2: ScenePoint2D) -> Uuid {
        self.add(AnnotationShape::Circle { p1, p2 })
    }

    pub fn set_annotation_shape(&mut self, id: Uuid, shape: AnnotationShape) {
        if let Some(annotation) = self.annotations.iter_mut().find(|a| a.id == id) {
            annotation.shape = shape;
        }
    }

    pub fn set_label_visible(&mut self, id: Uuid, visible: bool) {
        if let Some(annotation) = self.annotations.iter_mut().find(|a| a.id == id) {
            annotation.label_visible = visible;
        }
    }

    /// Removes one annotation; returns whether it existed.
    pub fn delete_annotation(&mut self, id: Uuid) -> bool {
        let before = self.annotations.len();
        self.annotations.retain(|a| a.id != id);
        if let Some((hovered, _)) = self.hover {
            if hovered == id {
                self.hover = None;
            }
        }
        self.annotations.len() != before
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
        self.hover = None;
    }

    /// Best annotation part under `p`: handles beat segment bodies,
    /// which beat circle outlines; ties within a class go to the
    /// nearest part.
    pub fn hit_test(
        &self,
        p: ScenePoint2D,
        factor: f64,
        style: &RenderingStyle,
    ) -> Option<(Uuid, AnnotationZone)> {
        let threshold = factor * style.hit_test_max_distance;

        let mut best: Option<(u8, f64, Uuid, AnnotationZone)> = None;
        let mut consider = |distance: f64, id: Uuid, zone: AnnotationZone| {
            if distance > threshold {
                return;
            }
            let class = zone.priority();
            let better = match best {
                None => true,
                Some((best_class, best_distance, _, _)) => (class, distance) < (best_class, best_distance),
            };
            if better {
                best = Some((class, distance, id, zone));
            }
        };

        for annotation in &self.annotations {
            for (i, point) in annotation.shape.points().iter().enumerate() {
                consider(point.distance_to(&p), annotation.id, AnnotationZone::Handle(i));
            }
            for (i, (a, b)) in annotation.shape.segments().iter().enumerate() {
                let distance = ScenePoint2D::squared_distance_pt_segment(a, b, &p).sqrt();
                consider(distance, annotation.id, AnnotationZone::Segment(i));
            }
            if let AnnotationShape::Circle { p1, p2 } = annotation.shape {
                let center = ScenePoint2D::midpoint(&p1, &p2);
                let radius = p1.distance_to(&p2) / 2.0;
                consider(
                    (center.distance_to(&p) - radius).abs(),
                    annotation.id,
                    AnnotationZone::Outline,
                );
            }
        }

        best.map(|(_, _, id, zone)| (id, zone))
    }

    /// Updates the hovered part from the pointer position; returns
    /// whether the hover changed. No part is hovered while the layer
    /// is inactive.
    pub fn set_mouse_hover(
        &mut self,
        p: ScenePoint2D,
        factor: f64,
        style: &RenderingStyle,
    ) -> bool {
        let hover = if self.active_tool == AnnotationTool::None {
            None
        } else {
            self.hit_test(p, factor, style)
        };
        if hover == self.hover {
            false
        } else {
            self.hover = hover;
            true
        }
    }

    pub fn has_hover(&self) -> bool {
        self.hover.is_some()
    }

    fn chain_color(&self, id: Uuid, zone: AnnotationZone, style: &RenderingStyle) -> sliceview_core::Color {
        if self.hover == Some((id, zone)) {
            style.annotation_hover_color
        } else {
            style.annotation_color
        }
    }

    /// Rebuilds the macro layer at the chosen depth from the model.
    /// The macro layer itself stays in place so that compositors keep
    /// its identity; only its sub-layers are replaced.
    pub fn recompute(&mut self, scene: &mut Scene2D, style: &RenderingStyle) {
        let scene_to_canvas = scene.scene_to_canvas();
        let canvas_to_scene = scene.canvas_to_scene();
        let factor = canvas_to_scene.compute_zoom();

        let mut polyline = PolylineSceneLayer::new();

        for annotation in &self.annotations {
            match annotation.shape {
                AnnotationShape::Circle { p1, p2 } => {
                    let center = ScenePoint2D::midpoint(&p1, &p2);
                    let radius = p1.distance_to(&p2) / 2.0;
                    toolbox::add_circle(
                        &mut polyline,
                        center,
                        radius,
                        self.chain_color(annotation.id, AnnotationZone::Outline, style),
                    );
                }
                AnnotationShape::Angle {
                    side1_end,
                    center,
                    side2_end,
                } => {
                    let angle1 = (side1_end.y - center.y).atan2(side1_end.x - center.x);
                    let angle2 = (side2_end.y - center.y).atan2(side2_end.x - center.x);
                    toolbox::add_shortest_arc(
                        &mut polyline,
                        center,
                        ARC_RADIUS * factor,
                        angle1,
                        angle2,
                        style.annotation_color,
                    );
                }
                AnnotationShape::Segment { .. } => {}
            }
        }

        for annotation in &self.annotations {
            for (i, (a, b)) in annotation.shape.segments().iter().enumerate() {
                polyline.add_chain(
                    vec![*a, *b],
                    false,
                    self.chain_color(annotation.id, AnnotationZone::Segment(i), style),
                );
            }
        }

        for annotation in &self.annotations {
            for (i, point) in annotation.shape.points().iter().enumerate() {
                toolbox::add_square(
                    &mut polyline,
                    &scene_to_canvas,
                    &canvas_to_scene,
                    *point,
                    style.handle_side,
                    self.chain_color(annotation.id, AnnotationZone::Handle(i), style),
                );
            }
        }

        let labels: Vec<TextSceneLayer> = self
            .annotations
            .iter()
            .filter(|a| a.label_visible)
            .map(|a| self.build_label(a, style, factor))
            .collect();

        if !matches!(scene.get_layer(self.depth), Ok(SceneLayer::Macro(_))) {
            scene.set_layer(self.depth, SceneLayer::Macro(MacroSceneLayer::new()));
        }
        if let Ok(SceneLayer::Macro(layer)) = scene.get_layer_mut(self.depth) {
            layer.clear();
            layer.add_layer(SceneLayer::Polyline(polyline));
            for label in labels {
                layer.add_layer(SceneLayer::Text(label));
            }
        }
    }

    fn build_label(&self, annotation: &Annotation, style: &RenderingStyle, factor: f64) -> TextSceneLayer {
        let mut label = TextSceneLayer::new();
        label.set_color(style.annotation_text_color);
        label.set_font_index(style.font_index);
        label.set_font_size(style.font_size);
        label.set_border(LABEL_BORDER);

        match annotation.shape {
            AnnotationShape::Segment { p1, p2 } => {
                let length = p1.distance_to(&p2);
                let text = match self.units {
                    Units::Millimeters => format!("{:.2} cm", length / 10.0),
                    Units::Pixels => format!("{:.1} px", length),
                };
                label.set_text(&text);
                let position = if p1.x < p2.x { p2 } else { p1 };
                label.set_position(position.x, position.y);
                label.set_anchor(BitmapAnchor::CenterLeft);
            }
            AnnotationShape::Circle { p1, p2 } => {
                let diameter = p1.distance_to(&p2);
                let text = match self.units {
                    Units::Millimeters => {
                        let area = PI * diameter * diameter / 4.0;
                        format!("⌀ {:.2} cm\nA {:.2} cm²", diameter / 10.0, area / 100.0)
                    }
                    // No area in pixel units.
                    Units::Pixels => format!("⌀ {:.1} px", diameter),
                };
                label.set_text(&text);
                let position = if p1.x < p2.x { p2 } else { p1 };
                label.set_position(position.x, position.y);
                label.set_anchor(BitmapAnchor::CenterLeft);
            }
            AnnotationShape::Angle {
                side1_end,
                center,
                side2_end,
            } => {
                let angle1 = (side1_end.y - center.y).atan2(side1_end.x - center.x);
                let angle2 = (side2_end.y - center.y).atan2(side2_end.x - center.x);
                let delta = toolbox::normalize_angle(angle2 - angle1);
                let theta = angle1 + delta / 2.0;
                let distance = 2.0 * ARC_RADIUS * factor;
                label.set_text(&format!("{:.1}°", delta.abs().to_degrees()));
                label.set_position(
                    center.x + distance * theta.cos(),
                    center.y + distance * theta.sin(),
                );
                label.set_anchor(BitmapAnchor::Center);
            }
        }
        label
    }

    // ── Persistence ───────────────────────────────────────────────────

    pub fn serialize(&self) -> Value {
        let annotations: Vec<Value> = self
            .annotations
            .iter()
            .map(|annotation| match annotation.shape {
                AnnotationShape::Segment { p1, p2 } => json!({
                    "type": "segment",
                    "x1": p1.x,
                    "y1": p1.y,
                    "x2": p2.x,
                    "y2": p2.y,
                }),
                AnnotationShape::Angle {
                    side1_end,
                    center,
                    side2_end,
                } => json!({
                    "type": "angle",
                    "x1": side1_end.x,
                    "y1": side1_end.y,
                    "x2": center.x,
                    "y2": center.y,
                    "x3": side2_end.x,
                    "y3": side2_end.y,
                }),
                AnnotationShape::Circle { p1, p2 } => json!({
                    "type": "circle",
                    "x1": p1.x,
                    "y1": p1.y,
                    "x2": p2.x,
                    "y2": p2.y,
                }),
            })
            .collect();

        json!({
            "annotations": annotations,
            "units": match self.units {
                Units::Millimeters => "millimeters",
                Units::Pixels => "pixels",
            },
        })
    }

    /// Replaces the whole set from its serialized form. Structural
    /// problems abort with `BadFileFormat`; entries of an unknown type
    /// are logged and skipped.
    pub fn unserialize(&mut self, serialized: &Value) -> Result<(), SceneError> {
        self.clear();

        let object = serialized.as_object().ok_or_else(|| {
            SceneError::BadFileFormat("Annotations must be a JSON object".to_owned())
        })?;

        let units = object
            .get("units")
            .and_then(Value::as_str)
            .ok_or_else(|| SceneError::BadFileFormat("Missing units".to_owned()))?;
        self.units = match units {
            "millimeters" => Units::Millimeters,
            "pixels" => Units::Pixels,
            other => {
                return Err(SceneError::BadFileFormat(format!("Unknown units: {}", other)));
            }
        };

        let annotations = object
            .get("annotations")
            .and_then(Value::as_array)
            .ok_or_else(|| SceneError::BadFileFormat("Missing annotations array".to_owned()))?;

        for item in annotations {
            let entry = item.as_object().ok_or_else(|| {
                SceneError::BadFileFormat("Annotation entries must be objects".to_owned())
            })?;
            let kind = entry
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| SceneError::BadFileFormat("Annotation without a type".to_owned()))?;

            match kind {
                "segment" => {
                    let p1 = read_point(entry, "x1", "y1")?;
                    let p2 = read_point(entry, "x2", "y2")?;
                    self.add_segment(p1, p2);
                }
                "angle" => {
                    let side1_end = read_point(entry, "x1", "y1")?;
                    let center = read_point(entry, "x2", "y2")?;
                    let side2_end = read_point(entry, "x3", "y3")?;
                    self.add_angle(side1_end, center, side2_end);
                }
                "circle" => {
                    let p1 = read_point(entry, "x1", "y1")?;
                    let p2 = read_point(entry, "x2", "y2")?;
                    self.add_circle(p1, p2);
                }
                other => {
                    error!("Cannot unserialize an annotation of unknown type: {}", other);
                }
            }
        }
        Ok(())
    }

    /// Starts the pointer gesture of the armed tool. Model changes
    /// that complete immediately (deletion) happen here; `None` still
    /// means the press was consumed whenever a tool is armed.
    pub fn create_tracker(
        &mut self,
        scene_pos: ScenePoint2D,
        factor: f64,
        style: &RenderingStyle,
        events: &mut VecDeque<ViewportEvent>,
    ) -> Option<Box<dyn PointerTracker>> {
        match self.active_tool {
            AnnotationTool::None => None,
            AnnotationTool::Edit => {
                let (id, zone) = self.hit_test(scene_pos, factor, style)?;
                let original = self.annotation_shape(id)?;
                Some(Box::new(EditAnnotationTracker {
                    annotation_id: id,
                    zone,
                    click: scene_pos,
                    original,
                    alive: true,
                }))
            }
            AnnotationTool::Remove => {
                if let Some((id, _)) = self.hit_test(scene_pos, factor, style) {
                    self.delete_annotation(id);
                    events.push_back(ViewportEvent::AnnotationRemoved);
                }
                None
            }
            AnnotationTool::Segment => {
                let id = self.add_segment(scene_pos, scene_pos);
                Some(Box::new(CreateTwoPointTracker {
                    annotation_id: id,
                    alive: true,
                }))
            }
            AnnotationTool::Circle => {
                let id = self.add_circle(scene_pos, scene_pos);
                Some(Box::new(CreateTwoPointTracker {
                    annotation_id: id,
                    alive: true,
                }))
            }
            AnnotationTool::Angle => {
                // The first phase is drawn as a bare segment; the
                // release upgrades it in place to an angle.
                let id = self.add_segment(scene_pos, scene_pos);
                self.set_label_visible(id, false);
                Some(Box::new(CreateAngleAnnotationTracker {
                    annotation_id: id,
                    state: AngleAnnotationState::DraggingFirstSide,
                    alive: true,
                }))
            }
        }
    }
}

fn read_point(
    entry: &serde_json::Map<String, Value>,
    x: &str,
    y: &str,
) -> Result<ScenePoint2D, SceneError> {
    let read = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| SceneError::BadFileFormat(format!("Missing or non-numeric field: {}", key)))
    };
    Ok(ScenePoint2D::new(read(x)?, read(y)?))
}

// ── Trackers ──────────────────────────────────────────────────────────

fn scene_position(event: &PointerEvent, controller: &ViewportController) -> ScenePoint2D {
    event
        .main_position()
        .apply(&controller.scene().canvas_to_scene())
}

/// Drags the second control point of a fresh segment or circle.
struct CreateTwoPointTracker {
    annotation_id: Uuid,
    alive: bool,
}

impl PointerTracker for CreateTwoPointTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController) {
        let p = scene_position(event, controller);
        let (annotations, scene, style, _events) = controller.annotation_parts();
        if let Some(layer) = annotations {
            if let Some(shape) = layer.annotation_shape(self.annotation_id) {
                layer.set_annotation_shape(self.annotation_id, shape.with_point(1, p));
                layer.recompute(scene, style);
            }
        }
    }

    fn pointer_up(
        &mut self,
        _event: &PointerEvent,
        controller: &mut ViewportController,
        _undo_stack: &mut UndoStack,
    ) {
        controller.queue_event(ViewportEvent::AnnotationAdded);
        self.alive = false;
    }

    fn pointer_down(&mut self, _event: &PointerEvent, _controller: &mut ViewportController) {}

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn cancel(&mut self, controller: &mut ViewportController) {
        let (annotations, scene, style, _events) = controller.annotation_parts();
        if let Some(layer) = annotations {
            layer.delete_annotation(self.annotation_id);
            layer.recompute(scene, style);
        }
        self.alive = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AngleAnnotationState {
    DraggingFirstSide,
    DraggingSecondSide,
}

/// Creates an angle annotation in two drags. The first drag places a
/// label-less segment; releasing upgrades it in place to an angle
/// whose second side then follows the pointer.
struct CreateAngleAnnotationTracker {
    annotation_id: Uuid,
    state: AngleAnnotationState,
    alive: bool,
}

impl PointerTracker for CreateAngleAnnotationTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController) {
        let p = scene_position(event, controller);
        let (annotations, scene, style, _events) = controller.annotation_parts();
        let layer = match annotations {
            Some(layer) => layer,
            None => return,
        };
        let shape = match layer.annotation_shape(self.annotation_id) {
            Some(shape) => shape,
            None => return,
        };
        let moved = match self.state {
            AngleAnnotationState::DraggingFirstSide => shape.with_point(1, p),
            AngleAnnotationState::DraggingSecondSide => shape.with_point(2, p),
        };
        layer.set_annotation_shape(self.annotation_id, moved);
        layer.recompute(scene, style);
    }

    fn pointer_up(
        &mut self,
        _event: &PointerEvent,
        controller: &mut ViewportController,
        _undo_stack: &mut UndoStack,
    ) {
        match self.state {
            AngleAnnotationState::DraggingFirstSide => {
                let (annotations, scene, style, _events) = controller.annotation_parts();
                if let Some(layer) = annotations {
                    if let Some(AnnotationShape::Segment { p1, p2 }) =
                        layer.annotation_shape(self.annotation_id)
                    {
                        layer.set_annotation_shape(
                            self.annotation_id,
                            AnnotationShape::Angle {
                                side1_end: p1,
                                center: p2,
                                side2_end: p2,
                            },
                        );
                        layer.set_label_visible(self.annotation_id, true);
                        layer.recompute(scene, style);
                    }
                }
                self.state = AngleAnnotationState::DraggingSecondSide;
            }
            AngleAnnotationState::DraggingSecondSide => {
                controller.queue_event(ViewportEvent::AnnotationAdded);
                self.alive = false;
            }
        }
    }

    fn pointer_down(&mut self, _event: &PointerEvent, _controller: &mut ViewportController) {}

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn cancel(&mut self, controller: &mut ViewportController) {
        let (annotations, scene, style, _events) = controller.annotation_parts();
        if let Some(layer) = annotations {
            layer.delete_annotation(self.annotation_id);
            layer.recompute(scene, style);
        }
        self.alive = false;
    }
}

/// Drags one handle of an annotation, or the whole annotation when a
/// body part was grabbed.
struct EditAnnotationTracker {
    annotation_id: Uuid,
    zone: AnnotationZone,
    click: ScenePoint2D,
    original: AnnotationShape,
    alive: bool,
}

impl PointerTracker for EditAnnotationTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController) {
        let delta = scene_position(event, controller) - self.click;
        let moved = match self.zone {
            AnnotationZone::Handle(index) => match self.original.point(index) {
                Some(point) => self.original.with_point(index, point + delta),
                None => return,
            },
            AnnotationZone::Segment(_) | AnnotationZone::Outline => self.original.translated(delta),
        };

        let (annotations, scene, style, _events) = controller.annotation_parts();
        if let Some(layer) = annotations {
            layer.set_annotation_shape(self.annotation_id, moved);
            layer.recompute(scene, style);
        }
    }

    fn pointer_up(
        &mut self,
        _event: &PointerEvent,
        controller: &mut ViewportController,
        _undo_stack: &mut UndoStack,
    ) {
        controller.queue_event(ViewportEvent::AnnotationChanged);
        self.alive = false;
    }

    fn pointer_down(&mut self, _event: &PointerEvent, _controller: &mut ViewportController) {}

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn cancel(&mut self, controller: &mut ViewportController) {
        let (annotations, scene, style, _events) = controller.annotation_parts();
        if let Some(layer) = annotations {
            layer.set_annotation_shape(self.annotation_id, self.original);
            layer.recompute(scene, style);
        }
        self.alive = false;
    }
}

#[cfg(test)]
mod tests {
    use crate::events::MouseButton;

    use super::*;

    fn press(x: f64, y: f64) -> PointerEvent {
        PointerEvent::new(x, y, MouseButton::Left)
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut layer = AnnotationsSceneLayer::new(42);
        layer.set_units(Units::Pixels);
        layer.add_segment(ScenePoint2D::new(10.0, 20.0), ScenePoint2D::new(30.0, 40.0));

        let value = layer.serialize();
        assert_eq!(
            value,
            json!({
                "annotations": [
                    {"type": "segment", "x1": 10.0, "y1": 20.0, "x2": 30.0, "y2": 40.0},
                ],
                "units": "pixels",
            })
        );

        let mut restored = AnnotationsSceneLayer::new(42);
        restored.unserialize(&value).unwrap();
        assert_eq!(restored.units(), Units::Pixels);
        assert_eq!(restored.annotation_count(), 1);
        assert_eq!(
            restored.annotations().next().map(|a| a.shape()),
            Some(AnnotationShape::Segment {
                p1: ScenePoint2D::new(10.0, 20.0),
                p2: ScenePoint2D::new(30.0, 40.0),
            })
        );
    }

    #[test]
    fn test_serialize_all_shapes() {
        let mut layer = AnnotationsSceneLayer::new(1);
        layer.add_angle(
            ScenePoint2D::new(1.0, 2.0),
            ScenePoint2D::new(3.0, 4.0),
            ScenePoint2D::new(5.0, 6.0),
        );
        layer.add_circle(ScenePoint2D::new(7.0, 8.0), ScenePoint2D::new(9.0, 10.0));

        let mut restored = AnnotationsSceneLayer::new(1);
        restored.unserialize(&layer.serialize()).unwrap();
        assert_eq!(restored.annotation_count(), 2);
        assert_eq!(restored.units(), Units::Millimeters);

        let shapes: Vec<AnnotationShape> = restored.annotations().map(|a| a.shape()).collect();
        assert_eq!(
            shapes[0],
            AnnotationShape::Angle {
                side1_end: ScenePoint2D::new(1.0, 2.0),
                center: ScenePoint2D::new(3.0, 4.0),
                side2_end: ScenePoint2D::new(5.0, 6.0),
            }
        );
        assert_eq!(
            shapes[1],
            AnnotationShape::Circle {
                p1: ScenePoint2D::new(7.0, 8.0),
                p2: ScenePoint2D::new(9.0, 10.0),
            }
        );
    }

    #[test]
    fn test_unserialize_rejects_bad_structure() {
        let mut layer = AnnotationsSceneLayer::new(1);

        let result = layer.unserialize(&json!([1, 2, 3]));
        assert!(matches!(result, Err(SceneError::BadFileFormat(_))));

        let result = layer.unserialize(&json!({"annotations": [], "units": "parsecs"}));
        assert!(matches!(result, Err(SceneError::BadFileFormat(_))));

        let result = layer.unserialize(&json!({"annotations": 5, "units": "pixels"}));
        assert!(matches!(result, Err(SceneError::BadFileFormat(_))));

        let result = layer.unserialize(&json!({
            "annotations": [{"type": "segment", "x1": 1.0, "y1": 2.0, "x2": 3.0}],
            "units": "pixels",
        }));
        assert!(matches!(result, Err(SceneError::BadFileFormat(_))));
    }

    #[test]
    fn test_unserialize_skips_unknown_types() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut layer = AnnotationsSceneLayer::new(1);
        layer
            .unserialize(&json!({
                "annotations": [
                    {"type": "banana"},
                    {"type": "segment", "x1": 0.0, "y1": 0.0, "x2": 1.0, "y2": 1.0},
                ],
                "units": "millimeters",
            }))
            .unwrap();
        assert_eq!(layer.annotation_count(), 1);
    }

    #[test]
    fn test_set_units_clears_annotations() {
        let mut layer = AnnotationsSceneLayer::new(1);
        layer.add_segment(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(1.0, 0.0));

        layer.set_units(Units::Millimeters);
        assert_eq!(layer.annotation_count(), 1);

        layer.set_units(Units::Pixels);
        assert_eq!(layer.annotation_count(), 0);
    }

    #[test]
    fn test_hit_test_priorities() {
        let style = RenderingStyle::default();
        let mut layer = AnnotationsSceneLayer::new(1);
        let segment = layer.add_segment(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(100.0, 0.0));
        let circle = layer.add_circle(ScenePoint2D::new(200.0, 0.0), ScenePoint2D::new(300.0, 0.0));

        // Near both the end handle and the body: the handle wins.
        assert_eq!(
            layer.hit_test(ScenePoint2D::new(98.0, 2.0), 1.0, &style),
            Some((segment, AnnotationZone::Handle(1)))
        );
        assert_eq!(
            layer.hit_test(ScenePoint2D::new(50.0, 5.0), 1.0, &style),
            Some((segment, AnnotationZone::Segment(0)))
        );
        assert_eq!(
            layer.hit_test(ScenePoint2D::new(250.0, 49.0), 1.0, &style),
            Some((circle, AnnotationZone::Outline))
        );
        assert_eq!(layer.hit_test(ScenePoint2D::new(50.0, 40.0), 1.0, &style), None);
    }

    #[test]
    fn test_hover_requires_an_armed_tool() {
        let style = RenderingStyle::default();
        let mut layer = AnnotationsSceneLayer::new(1);
        layer.add_segment(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(100.0, 0.0));

        assert!(!layer.set_mouse_hover(ScenePoint2D::new(50.0, 2.0), 1.0, &style));
        assert!(!layer.has_hover());

        layer.set_active_tool(AnnotationTool::Edit);
        assert!(layer.set_mouse_hover(ScenePoint2D::new(50.0, 2.0), 1.0, &style));
        assert!(layer.has_hover());
        assert!(!layer.set_mouse_hover(ScenePoint2D::new(51.0, 2.0), 1.0, &style));

        layer.set_active_tool(AnnotationTool::None);
        assert!(!layer.has_hover());
    }

    #[test]
    fn test_recompute_builds_macro_layer() {
        let style = RenderingStyle::default();
        let mut scene = Scene2D::new();
        let mut layer = AnnotationsSceneLayer::new(10);
        layer.add_segment(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(100.0, 0.0));
        layer.add_circle(ScenePoint2D::new(200.0, 0.0), ScenePoint2D::new(300.0, 0.0));
        layer.add_angle(
            ScenePoint2D::new(100.0, 100.0),
            ScenePoint2D::new(0.0, 100.0),
            ScenePoint2D::new(0.0, 200.0),
        );

        layer.recompute(&mut scene, &style);

        match scene.get_layer(10) {
            Ok(SceneLayer::Macro(macro_layer)) => {
                // One polyline plus three labels.
                assert_eq!(macro_layer.slot_count(), 4);
                let mut layers = macro_layer.layers();
                match layers.next() {
                    Some(SceneLayer::Polyline(polyline)) => {
                        // Outline + arc, three segment bodies, seven handles.
                        assert_eq!(polyline.chain_count(), 12);
                    }
                    _ => panic!("Expected the polyline sub-layer first"),
                }
                assert!(layers.all(|l| matches!(l, SceneLayer::Text(_))));
            }
            _ => panic!("Expected a macro layer at depth 10"),
        }
    }

    #[test]
    fn test_segment_label_formats() {
        let style = RenderingStyle::default();
        let mut scene = Scene2D::new();

        let mut layer = AnnotationsSceneLayer::new(1);
        layer.add_segment(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(100.0, 0.0));
        layer.recompute(&mut scene, &style);
        assert_eq!(label_texts(&scene, 1), vec!["10.00 cm"]);

        let mut layer = AnnotationsSceneLayer::new(2);
        layer.set_units(Units::Pixels);
        layer.add_segment(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(100.0, 0.0));
        layer.recompute(&mut scene, &style);
        assert_eq!(label_texts(&scene, 2), vec!["100.0 px"]);
    }

    #[test]
    fn test_circle_label_formats() {
        let style = RenderingStyle::default();
        let mut scene = Scene2D::new();

        let mut layer = AnnotationsSceneLayer::new(1);
        layer.add_circle(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(40.0, 0.0));
        layer.recompute(&mut scene, &style);
        assert_eq!(label_texts(&scene, 1), vec!["⌀ 4.00 cm\nA 12.57 cm²"]);

        let mut layer = AnnotationsSceneLayer::new(2);
        layer.set_units(Units::Pixels);
        layer.add_circle(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(40.0, 0.0));
        layer.recompute(&mut scene, &style);
        assert_eq!(label_texts(&scene, 2), vec!["⌀ 40.0 px"]);
    }

    #[test]
    fn test_angle_label_on_the_bisector() {
        let style = RenderingStyle::default();
        let mut scene = Scene2D::new();
        let mut layer = AnnotationsSceneLayer::new(1);
        layer.add_angle(
            ScenePoint2D::new(100.0, 0.0),
            ScenePoint2D::new(0.0, 0.0),
            ScenePoint2D::new(0.0, 100.0),
        );
        layer.recompute(&mut scene, &style);

        match scene.get_layer(1) {
            Ok(SceneLayer::Macro(macro_layer)) => {
                let label = macro_layer
                    .layers()
                    .find_map(|l| match l {
                        SceneLayer::Text(text) => Some(text),
                        _ => None,
                    })
                    .unwrap();
                assert_eq!(label.text(), "90.0°");
                let expected = 40.0 * std::f64::consts::FRAC_PI_4.cos();
                assert!((label.position().x - expected).abs() < 1e-10);
                assert!((label.position().y - expected).abs() < 1e-10);
            }
            _ => panic!("Expected a macro layer at depth 1"),
        }
    }

    fn label_texts(scene: &Scene2D, depth: i32) -> Vec<String> {
        match scene.get_layer(depth) {
            Ok(SceneLayer::Macro(macro_layer)) => macro_layer
                .layers()
                .filter_map(|l| match l {
                    SceneLayer::Text(text) => Some(text.text().to_owned()),
                    _ => None,
                })
                .collect(),
            _ => panic!("Expected a macro layer at depth {}", depth),
        }
    }

    // ── Tracker scenarios ─────────────────────────────────────────────

    #[test]
    fn test_two_point_tracker_creates_circle() {
        let mut controller = ViewportController::new();
        let mut undo_stack = UndoStack::new();
        controller.enable_annotations(7);
        controller.set_annotation_tool(AnnotationTool::Circle);

        let mut tracker = {
            let (annotations, _scene, style, events) = controller.annotation_parts();
            annotations
                .unwrap()
                .create_tracker(ScenePoint2D::new(10.0, 10.0), 1.0, style, events)
                .unwrap()
        };

        tracker.pointer_move(&press(50.0, 10.0), &mut controller);
        tracker.pointer_up(&press(50.0, 10.0), &mut controller, &mut undo_stack);
        assert!(!tracker.is_alive());

        let annotations = controller.annotations().unwrap();
        assert_eq!(annotations.annotation_count(), 1);
        assert_eq!(
            annotations.annotations().next().map(|a| a.shape()),
            Some(AnnotationShape::Circle {
                p1: ScenePoint2D::new(10.0, 10.0),
                p2: ScenePoint2D::new(50.0, 10.0),
            })
        );
        assert!(controller
            .take_events()
            .contains(&ViewportEvent::AnnotationAdded));
    }

    #[test]
    fn test_two_point_tracker_cancel_discards() {
        let mut controller = ViewportController::new();
        controller.enable_annotations(7);
        controller.set_annotation_tool(AnnotationTool::Segment);

        let mut tracker = {
            let (annotations, _scene, style, events) = controller.annotation_parts();
            annotations
                .unwrap()
                .create_tracker(ScenePoint2D::new(10.0, 10.0), 1.0, style, events)
                .unwrap()
        };
        tracker.pointer_move(&press(60.0, 20.0), &mut controller);
        tracker.cancel(&mut controller);

        assert_eq!(controller.annotations().unwrap().annotation_count(), 0);
    }

    #[test]
    fn test_angle_tracker_upgrades_in_place() {
        let mut controller = ViewportController::new();
        let mut undo_stack = UndoStack::new();
        controller.enable_annotations(7);
        controller.set_annotation_tool(AnnotationTool::Angle);

        let mut tracker = {
            let (annotations, _scene, style, events) = controller.annotation_parts();
            annotations
                .unwrap()
                .create_tracker(ScenePoint2D::new(0.0, 0.0), 1.0, style, events)
                .unwrap()
        };

        let first_id = controller.annotations().unwrap().annotations().next().unwrap().id();
        assert!(!controller
            .annotations()
            .unwrap()
            .annotation(first_id)
            .unwrap()
            .is_label_visible());

        tracker.pointer_move(&press(50.0, 0.0), &mut controller);
        tracker.pointer_up(&press(50.0, 0.0), &mut controller, &mut undo_stack);
        assert!(tracker.is_alive());

        // Upgraded to an angle without changing the identifier.
        let annotations = controller.annotations().unwrap();
        assert_eq!(annotations.annotation_count(), 1);
        assert_eq!(
            annotations.annotation_shape(first_id),
            Some(AnnotationShape::Angle {
                side1_end: ScenePoint2D::new(0.0, 0.0),
                center: ScenePoint2D::new(50.0, 0.0),
                side2_end: ScenePoint2D::new(50.0, 0.0),
            })
        );
        assert!(annotations.annotation(first_id).unwrap().is_label_visible());

        tracker.pointer_move(&press(50.0, 50.0), &mut controller);
        tracker.pointer_up(&press(50.0, 50.0), &mut controller, &mut undo_stack);
        assert!(!tracker.is_alive());

        assert_eq!(
            controller.annotations().unwrap().annotation_shape(first_id),
            Some(AnnotationShape::Angle {
                side1_end: ScenePoint2D::new(0.0, 0.0),
                center: ScenePoint2D::new(50.0, 0.0),
                side2_end: ScenePoint2D::new(50.0, 50.0),
            })
        );
        assert!(controller
            .take_events()
            .contains(&ViewportEvent::AnnotationAdded));
    }

    #[test]
    fn test_edit_tracker_translates_body_grab() {
        let mut controller = ViewportController::new();
        let mut undo_stack = UndoStack::new();
        controller.enable_annotations(7);

        let id = {
            let (annotations, scene, style, _events) = controller.annotation_parts();
            let layer = annotations.unwrap();
            let id = layer.add_segment(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(100.0, 0.0));
            layer.recompute(scene, style);
            id
        };
        controller.set_annotation_tool(AnnotationTool::Edit);

        let mut tracker = {
            let (annotations, _scene, style, events) = controller.annotation_parts();
            annotations
                .unwrap()
                .create_tracker(ScenePoint2D::new(50.0, 0.0), 1.0, style, events)
                .unwrap()
        };

        tracker.pointer_move(&press(60.0, 10.0), &mut controller);
        tracker.pointer_up(&press(60.0, 10.0), &mut controller, &mut undo_stack);

        assert_eq!(
            controller.annotations().unwrap().annotation_shape(id),
            Some(AnnotationShape::Segment {
                p1: ScenePoint2D::new(10.0, 10.0),
                p2: ScenePoint2D::new(110.0, 10.0),
            })
        );
        assert!(controller
            .take_events()
            .contains(&ViewportEvent::AnnotationChanged));
    }

    #[test]
    fn test_edit_tracker_cancel_restores_shape() {
        let mut controller = ViewportController::new();
        controller.enable_annotations(7);

        let id = {
            let (annotations, scene, style, _events) = controller.annotation_parts();
            let layer = annotations.unwrap();
            let id = layer.add_segment(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(100.0, 0.0));
            layer.recompute(scene, style);
            id
        };
        controller.set_annotation_tool(AnnotationTool::Edit);

        let mut tracker = {
            let (annotations, _scene, style, events) = controller.annotation_parts();
            annotations
                .unwrap()
                .create_tracker(ScenePoint2D::new(100.0, 0.0), 1.0, style, events)
                .unwrap()
        };
        tracker.pointer_move(&press(150.0, 50.0), &mut controller);
        tracker.cancel(&mut controller);

        assert_eq!(
            controller.annotations().unwrap().annotation_shape(id),
            Some(AnnotationShape::Segment {
                p1: ScenePoint2D::new(0.0, 0.0),
                p2: ScenePoint2D::new(100.0, 0.0),
            })
        );
    }

    #[test]
    fn test_remove_tool_deletes_on_hit() {
        let mut controller = ViewportController::new();
        controller.enable_annotations(7);

        {
            let (annotations, scene, style, _events) = controller.annotation_parts();
            let layer = annotations.unwrap();
            layer.add_segment(ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(100.0, 0.0));
            layer.recompute(scene, style);
        }
        controller.set_annotation_tool(AnnotationTool::Remove);

        let tracker = {
            let (annotations, _scene, style, events) = controller.annotation_parts();
            annotations
                .unwrap()
                .create_tracker(ScenePoint2D::new(50.0, 0.0), 1.0, style, events)
        };
        assert!(tracker.is_none());
        assert_eq!(controller.annotations().unwrap().annotation_count(), 0);
        assert!(controller
            .take_events()
            .contains(&ViewportEvent::AnnotationRemoved));

        // A miss deletes nothing.
        let tracker = {
            let (annotations, _scene, style, events) = controller.annotation_parts();
            annotations
                .unwrap()
                .create_tracker(ScenePoint2D::new(500.0, 500.0), 1.0, style, events)
        };
        assert!(tracker.is_none());
    }
}
