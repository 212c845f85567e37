use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sliceview_core::{Scene2D, ScenePoint2D};

use crate::layer_holder::LayerHolder;
use crate::style::RenderingStyle;
use crate::toolbox;

/// Part of a measure tool hit by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureZone {
    /// Start handle of a line.
    Start,
    /// End handle of a line.
    End,
    /// Body of a line segment.
    Segment,
    /// Handle at the free end of the first angle side.
    Side1End,
    /// Handle at the free end of the second angle side.
    Side2End,
    /// Vertex of an angle.
    Center,
    /// Body of the first angle side.
    Side1,
    /// Body of the second angle side.
    Side2,
}

/// Snapshot of the control points of a measure tool, used by the
/// undo/redo commands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MeasureToolMemento {
    Line {
        start: ScenePoint2D,
        end: ScenePoint2D,
    },
    Angle {
        side1_end: ScenePoint2D,
        center: ScenePoint2D,
        side2_end: ScenePoint2D,
    },
}

fn squared_distance(a: &ScenePoint2D, b: &ScenePoint2D) -> f64 {
    let d = *b - *a;
    d.dot(&d)
}

/// Squared hit-test threshold in scene units, for a given
/// canvas-to-scene factor.
fn squared_threshold(factor: f64, style: &RenderingStyle) -> f64 {
    let distance = factor * style.hit_test_max_distance;
    distance * distance
}

// ── Line ──────────────────────────────────────────────────────────────

/// Interactive distance measurement between two scene points.
#[derive(Debug)]
pub struct LineMeasureTool {
    id: Uuid,
    enabled: bool,
    start: ScenePoint2D,
    end: ScenePoint2D,
    holder: LayerHolder,
    highlight: Option<MeasureZone>,
}

impl LineMeasureTool {
    pub fn new(start: ScenePoint2D, end: ScenePoint2D) -> Self {
        Self {
            id: Uuid::new_v4(),
            enabled: true,
            start,
            end,
            holder: LayerHolder::new(1, 5),
            highlight: None,
        }
    }

    pub fn start(&self) -> ScenePoint2D {
        self.start
    }

    pub fn end(&self) -> ScenePoint2D {
        self.end
    }

    pub fn set_start(&mut self, start: ScenePoint2D) {
        self.start = start;
    }

    pub fn set_end(&mut self, end: ScenePoint2D) {
        self.end = end;
    }

    pub fn set(&mut self, start: ScenePoint2D, end: ScenePoint2D) {
        self.start = start;
        self.end = end;
    }

    /// Handles are checked before the segment body, so a point close
    /// to both resolves to the handle.
    fn hit_zone(&self, p: ScenePoint2D, factor: f64, style: &RenderingStyle) -> Option<MeasureZone> {
        let threshold = squared_threshold(factor, style);

        if squared_distance(&p, &self.start) <= threshold {
            return Some(MeasureZone::Start);
        }
        if squared_distance(&p, &self.end) <= threshold {
            return Some(MeasureZone::End);
        }
        if ScenePoint2D::squared_distance_pt_segment(&self.start, &self.end, &p) <= threshold {
            return Some(MeasureZone::Segment);
        }
        None
    }

    fn refresh(&mut self, scene: &mut Scene2D, style: &RenderingStyle) {
        if !self.enabled {
            self.holder.delete_layers(scene);
            return;
        }

        let scene_to_canvas = scene.scene_to_canvas();
        let canvas_to_scene = scene.canvas_to_scene();
        let factor = canvas_to_scene.compute_zoom();

        let highlight = self.highlight;
        let pick = |zone: MeasureZone| {
            if highlight == Some(zone) {
                style.line_highlight_color
            } else {
                style.line_color
            }
        };

        let polyline = self.holder.polyline_layer(scene, 0);
        polyline.clear();
        polyline.add_chain(vec![self.start, self.end], false, pick(MeasureZone::Segment));
        toolbox::add_square(
            polyline,
            &scene_to_canvas,
            &canvas_to_scene,
            self.start,
            style.handle_side,
            pick(MeasureZone::Start),
        );
        toolbox::add_square(
            polyline,
            &scene_to_canvas,
            &canvas_to_scene,
            self.end,
            style.handle_side,
            pick(MeasureZone::End),
        );

        let label = format!("{:.2} mm", self.start.distance_to(&self.end));
        let midpoint = ScenePoint2D::midpoint(&self.start, &self.end);
        toolbox::set_text_with_outline(&mut self.holder, scene, style, &label, midpoint, factor);
    }
}

// ── Angle ─────────────────────────────────────────────────────────────

/// Interactive angle measurement: two sides joined at a vertex, with a
/// shortest arc and a degree label between them.
#[derive(Debug)]
pub struct AngleMeasureTool {
    id: Uuid,
    enabled: bool,
    side1_end: ScenePoint2D,
    center: ScenePoint2D,
    side2_end: ScenePoint2D,
    /// Cleared while the first side of a new angle is being placed, so
    /// the tool renders as a bare segment without arc or label.
    side2_visible: bool,
    holder: LayerHolder,
    highlight: Option<MeasureZone>,
}

impl AngleMeasureTool {
    pub fn new(side1_end: ScenePoint2D, center: ScenePoint2D, side2_end: ScenePoint2D) -> Self {
        Self {
            id: Uuid::new_v4(),
            enabled: true,
            side1_end,
            center,
            side2_end,
            side2_visible: true,
            holder: LayerHolder::new(1, 5),
            highlight: None,
        }
    }

    pub fn side1_end(&self) -> ScenePoint2D {
        self.side1_end
    }

    pub fn center(&self) -> ScenePoint2D {
        self.center
    }

    pub fn side2_end(&self) -> ScenePoint2D {
        self.side2_end
    }

    pub fn set_side1_end(&mut self, p: ScenePoint2D) {
        self.side1_end = p;
    }

    pub fn set_center(&mut self, p: ScenePoint2D) {
        self.center = p;
    }

    pub fn set_side2_end(&mut self, p: ScenePoint2D) {
        self.side2_end = p;
    }

    pub fn set_side2_visible(&mut self, visible: bool) {
        self.side2_visible = visible;
    }

    fn side1_angle(&self) -> f64 {
        (self.side1_end.y - self.center.y).atan2(self.side1_end.x - self.center.x)
    }

    fn side2_angle(&self) -> f64 {
        (self.side2_end.y - self.center.y).atan2(self.side2_end.x - self.center.x)
    }

    fn hit_zone(&self, p: ScenePoint2D, factor: f64, style: &RenderingStyle) -> Option<MeasureZone> {
        let threshold = squared_threshold(factor, style);

        if squared_distance(&p, &self.side1_end) <= threshold {
            return Some(MeasureZone::Side1End);
        }
        if squared_distance(&p, &self.side2_end) <= threshold {
            return Some(MeasureZone::Side2End);
        }
        if squared_distance(&p, &self.center) <= threshold {
            return Some(MeasureZone::Center);
        }
        if ScenePoint2D::squared_distance_pt_segment(&self.center, &self.side1_end, &p) <= threshold {
            return Some(MeasureZone::Side1);
        }
        if ScenePoint2D::squared_distance_pt_segment(&self.center, &self.side2_end, &p) <= threshold {
            return Some(MeasureZone::Side2);
        }
        None
    }

    fn refresh(&mut self, scene: &mut Scene2D, style: &RenderingStyle) {
        if !self.enabled {
            self.holder.delete_layers(scene);
            return;
        }

        let scene_to_canvas = scene.scene_to_canvas();
        let canvas_to_scene = scene.canvas_to_scene();
        let factor = canvas_to_scene.compute_zoom();

        let highlight = self.highlight;
        let pick = |zone: MeasureZone| {
            if highlight == Some(zone) {
                style.angle_highlight_color
            } else {
                style.angle_color
            }
        };

        // Grabbing either side body highlights both sides.
        let side_color = if matches!(highlight, Some(MeasureZone::Side1) | Some(MeasureZone::Side2))
        {
            style.angle_highlight_color
        } else {
            style.angle_color
        };

        let polyline = self.holder.polyline_layer(scene, 0);
        polyline.clear();

        polyline.add_chain(vec![self.side1_end, self.center], false, side_color);
        if self.side2_visible {
            polyline.add_chain(vec![self.side2_end, self.center], false, side_color);
        }

        toolbox::add_square(
            polyline,
            &scene_to_canvas,
            &canvas_to_scene,
            self.side1_end,
            style.handle_side,
            pick(MeasureZone::Side1End),
        );

        if self.side2_visible {
            toolbox::add_square(
                polyline,
                &scene_to_canvas,
                &canvas_to_scene,
                self.side2_end,
                style.handle_side,
                pick(MeasureZone::Side2End),
            );
            toolbox::add_shortest_arc(
                polyline,
                self.center,
                style.arc_radius * factor,
                self.side1_angle(),
                self.side2_angle(),
                pick(MeasureZone::Center),
            );

            let delta = toolbox::normalize_angle(self.side2_angle() - self.side1_angle());
            let theta = self.side1_angle() + delta / 2.0;
            let distance = style.text_center_distance * factor;
            let position = ScenePoint2D::new(
                self.center.x + distance * theta.cos(),
                self.center.y + distance * theta.sin(),
            );
            let label = format!("{:.2}°", delta.abs().to_degrees());
            toolbox::set_text_with_outline(&mut self.holder, scene, style, &label, position, factor);
        } else {
            // While placing the first side, the vertex gets a plain
            // handle and no arc or label is shown.
            toolbox::add_square(
                polyline,
                &scene_to_canvas,
                &canvas_to_scene,
                self.center,
                style.handle_side,
                pick(MeasureZone::Center),
            );
            toolbox::clear_text_layers(&mut self.holder, scene);
        }
    }
}

// ── Common wrapper ────────────────────────────────────────────────────

/// A measure tool owned by a viewport controller.
#[derive(Debug)]
pub enum MeasureTool {
    Line(LineMeasureTool),
    Angle(AngleMeasureTool),
}

impl MeasureTool {
    pub fn id(&self) -> Uuid {
        match self {
            MeasureTool::Line(tool) => tool.id,
            MeasureTool::Angle(tool) => tool.id,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            MeasureTool::Line(tool) => tool.enabled,
            MeasureTool::Angle(tool) => tool.enabled,
        }
    }

    /// Marks the tool visible again; the caller refreshes the scene.
    pub fn enable(&mut self) {
        match self {
            MeasureTool::Line(tool) => tool.enabled = true,
            MeasureTool::Angle(tool) => tool.enabled = true,
        }
    }

    /// Hides the tool and removes its layers from the scene.
    pub fn disable(&mut self, scene: &mut Scene2D) {
        match self {
            MeasureTool::Line(tool) => {
                tool.enabled = false;
                tool.holder.delete_layers(scene);
            }
            MeasureTool::Angle(tool) => {
                tool.enabled = false;
                tool.holder.delete_layers(scene);
            }
        }
    }

    /// Rebuilds the tool's scene layers from its control points. Does
    /// nothing beyond removing the layers when the tool is disabled.
    pub fn refresh_scene(&mut self, scene: &mut Scene2D, style: &RenderingStyle) {
        match self {
            MeasureTool::Line(tool) => tool.refresh(scene, style),
            MeasureTool::Angle(tool) => tool.refresh(scene, style),
        }
    }

    /// Zone under `p` in scene coordinates, or `None` when nothing is
    /// within the hit-test threshold or the tool is disabled.
    pub fn hit_test(
        &self,
        p: ScenePoint2D,
        factor: f64,
        style: &RenderingStyle,
    ) -> Option<MeasureZone> {
        if !self.is_enabled() {
            return None;
        }
        match self {
            MeasureTool::Line(tool) => tool.hit_zone(p, factor, style),
            MeasureTool::Angle(tool) => tool.hit_zone(p, factor, style),
        }
    }

    /// Changes the highlighted zone; returns whether it changed, so
    /// the caller knows whether a refresh is needed.
    pub fn set_highlight(&mut self, zone: Option<MeasureZone>) -> bool {
        let slot = match self {
            MeasureTool::Line(tool) => &mut tool.highlight,
            MeasureTool::Angle(tool) => &mut tool.highlight,
        };
        if *slot == zone {
            false
        } else {
            *slot = zone;
            true
        }
    }

    pub fn highlight(&self) -> Option<MeasureZone> {
        match self {
            MeasureTool::Line(tool) => tool.highlight,
            MeasureTool::Angle(tool) => tool.highlight,
        }
    }

    pub fn state(&self) -> MeasureToolMemento {
        match self {
            MeasureTool::Line(tool) => MeasureToolMemento::Line {
                start: tool.start,
                end: tool.end,
            },
            MeasureTool::Angle(tool) => MeasureToolMemento::Angle {
                side1_end: tool.side1_end,
                center: tool.center,
                side2_end: tool.side2_end,
            },
        }
    }

    /// Restores the control points from a memento of the same kind; a
    /// mismatched memento is ignored.
    pub fn set_state(&mut self, memento: &MeasureToolMemento) {
        match (self, memento) {
            (MeasureTool::Line(tool), MeasureToolMemento::Line { start, end }) => {
                tool.start = *start;
                tool.end = *end;
            }
            (
                MeasureTool::Angle(tool),
                MeasureToolMemento::Angle {
                    side1_end,
                    center,
                    side2_end,
                },
            ) => {
                tool.side1_end = *side1_end;
                tool.center = *center;
                tool.side2_end = *side2_end;
            }
            _ => warn!("Measure tool memento does not match the tool kind"),
        }
    }
}
