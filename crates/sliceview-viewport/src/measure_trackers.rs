use log::warn;
use uuid::Uuid;

use sliceview_core::ScenePoint2D;

use crate::commands::{CreateMeasureCommand, EditMeasureCommand, UndoStack};
use crate::controller::ViewportController;
use crate::events::PointerEvent;
use crate::measure::{AngleMeasureTool, LineMeasureTool, MeasureTool, MeasureToolMemento, MeasureZone};
use crate::trackers::PointerTracker;

fn scene_position(event: &PointerEvent, controller: &ViewportController) -> ScenePoint2D {
    event
        .main_position()
        .apply(&controller.scene().canvas_to_scene())
}

// ── Creation ──────────────────────────────────────────────────────────

/// Drags out a new line measure: both ends start at the press position
/// and the end point follows the pointer until release.
pub struct CreateLineTracker {
    tool_id: Uuid,
    alive: bool,
}

impl CreateLineTracker {
    pub fn new(controller: &mut ViewportController, event: &PointerEvent) -> Self {
        let p = scene_position(event, controller);
        let tool_id = controller.add_measure_tool(MeasureTool::Line(LineMeasureTool::new(p, p)));
        Self {
            tool_id,
            alive: true,
        }
    }
}

impl PointerTracker for CreateLineTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController) {
        let p = scene_position(event, controller);
        if let Some(MeasureTool::Line(tool)) = controller.measure_tool_mut(self.tool_id) {
            tool.set_end(p);
        }
        controller.refresh_measure_tool(self.tool_id);
    }

    fn pointer_up(
        &mut self,
        _event: &PointerEvent,
        _controller: &mut ViewportController,
        undo_stack: &mut UndoStack,
    ) {
        undo_stack.push(Box::new(CreateMeasureCommand::new(
            self.tool_id,
            "Create line measure",
        )));
        self.alive = false;
    }

    fn pointer_down(&mut self, _event: &PointerEvent, _controller: &mut ViewportController) {
        warn!("Ignoring additional press while creating a line measure");
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn cancel(&mut self, controller: &mut ViewportController) {
        controller.discard_measure_tool(self.tool_id);
        self.alive = false;
    }
}

/// Phase of the two-stage angle creation gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AngleCreationState {
    /// First drag: the vertex follows the pointer.
    CreatingSide1,
    /// Second drag: the end of side 2 follows the pointer.
    CreatingSide2,
    /// Geometry frozen by the second press; the next release commits.
    Finished,
}

/// Creates an angle measure in two drags: the first places side 1 and
/// the vertex, the second opens side 2.
pub struct CreateAngleTracker {
    tool_id: Uuid,
    state: AngleCreationState,
    alive: bool,
}

impl CreateAngleTracker {
    pub fn new(controller: &mut ViewportController, event: &PointerEvent) -> Self {
        let p = scene_position(event, controller);
        let mut tool = AngleMeasureTool::new(p, p, p);
        tool.set_side2_visible(false);
        let tool_id = controller.add_measure_tool(MeasureTool::Angle(tool));
        Self {
            tool_id,
            state: AngleCreationState::CreatingSide1,
            alive: true,
        }
    }
}

impl PointerTracker for CreateAngleTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController) {
        let p = scene_position(event, controller);
        match self.state {
            AngleCreationState::CreatingSide1 => {
                // The collapsed side 2 follows the vertex until the
                // second phase opens it.
                if let Some(MeasureTool::Angle(tool)) = controller.measure_tool_mut(self.tool_id) {
                    tool.set_center(p);
                    tool.set_side2_end(p);
                }
                controller.refresh_measure_tool(self.tool_id);
            }
            AngleCreationState::CreatingSide2 => {
                if let Some(MeasureTool::Angle(tool)) = controller.measure_tool_mut(self.tool_id) {
                    tool.set_side2_end(p);
                }
                controller.refresh_measure_tool(self.tool_id);
            }
            AngleCreationState::Finished => {}
        }
    }

    fn pointer_up(
        &mut self,
        _event: &PointerEvent,
        controller: &mut ViewportController,
        undo_stack: &mut UndoStack,
    ) {
        match self.state {
            AngleCreationState::CreatingSide1 => {
                if let Some(MeasureTool::Angle(tool)) = controller.measure_tool_mut(self.tool_id) {
                    tool.set_side2_visible(true);
                }
                controller.refresh_measure_tool(self.tool_id);
                self.state = AngleCreationState::CreatingSide2;
            }
            AngleCreationState::CreatingSide2 => {
                // Release without the finishing press; keep dragging.
            }
            AngleCreationState::Finished => {
                undo_stack.push(Box::new(CreateMeasureCommand::new(
                    self.tool_id,
                    "Create angle measure",
                )));
                self.alive = false;
            }
        }
    }

    fn pointer_down(&mut self, _event: &PointerEvent, _controller: &mut ViewportController) {
        match self.state {
            AngleCreationState::CreatingSide2 => {
                self.state = AngleCreationState::Finished;
            }
            AngleCreationState::CreatingSide1 | AngleCreationState::Finished => {
                warn!("Ignoring out-of-order press while creating an angle measure");
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn cancel(&mut self, controller: &mut ViewportController) {
        controller.discard_measure_tool(self.tool_id);
        self.alive = false;
    }
}

// ── Edition ───────────────────────────────────────────────────────────

/// Moves the grabbed handle of a line measure, or the whole line when
/// its body was grabbed. Every move re-applies the pointer delta to
/// the state captured at the press.
pub struct EditLineTracker {
    tool_id: Uuid,
    zone: MeasureZone,
    click: ScenePoint2D,
    original: MeasureToolMemento,
    alive: bool,
}

impl EditLineTracker {
    /// `zone` is the part of the tool grabbed at `event`, as reported
    /// by its hit test.
    pub fn new(
        controller: &ViewportController,
        tool_id: Uuid,
        zone: MeasureZone,
        event: &PointerEvent,
    ) -> Option<Self> {
        let click = scene_position(event, controller);
        let original = controller.measure_tool_state(tool_id)?;
        Some(Self {
            tool_id,
            zone,
            click,
            original,
            alive: true,
        })
    }
}

impl PointerTracker for EditLineTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController) {
        let delta = scene_position(event, controller) - self.click;
        let (start, end) = match self.original {
            MeasureToolMemento::Line { start, end } => (start, end),
            MeasureToolMemento::Angle { .. } => return,
        };

        let moved = match self.zone {
            MeasureZone::Start => MeasureToolMemento::Line {
                start: start + delta,
                end,
            },
            MeasureZone::End => MeasureToolMemento::Line {
                start,
                end: end + delta,
            },
            MeasureZone::Segment => MeasureToolMemento::Line {
                start: start + delta,
                end: end + delta,
            },
            _ => {
                warn!("Please retry the measure editing operation");
                return;
            }
        };
        controller.set_measure_tool_state(self.tool_id, &moved);
    }

    fn pointer_up(
        &mut self,
        _event: &PointerEvent,
        controller: &mut ViewportController,
        undo_stack: &mut UndoStack,
    ) {
        if let Some(modified) = controller.measure_tool_state(self.tool_id) {
            undo_stack.push(Box::new(EditMeasureCommand::new(
                self.tool_id,
                self.original,
                modified,
                "Edit line measure",
            )));
        }
        self.alive = false;
    }

    fn pointer_down(&mut self, _event: &PointerEvent, _controller: &mut ViewportController) {
        warn!("Ignoring additional press while editing a line measure");
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn cancel(&mut self, controller: &mut ViewportController) {
        controller.set_measure_tool_state(self.tool_id, &self.original);
        self.alive = false;
    }
}

/// Moves one point of an angle measure, or the whole figure when a
/// side body was grabbed. Grabbing the vertex bends the angle without
/// moving the side ends.
pub struct EditAngleTracker {
    tool_id: Uuid,
    zone: MeasureZone,
    click: ScenePoint2D,
    original: MeasureToolMemento,
    alive: bool,
}

impl EditAngleTracker {
    pub fn new(
        controller: &ViewportController,
        tool_id: Uuid,
        zone: MeasureZone,
        event: &PointerEvent,
    ) -> Option<Self> {
        let click = scene_position(event, controller);
        let original = controller.measure_tool_state(tool_id)?;
        Some(Self {
            tool_id,
            zone,
            click,
            original,
            alive: true,
        })
    }
}

impl PointerTracker for EditAngleTracker {
    fn pointer_move(&mut self, event: &PointerEvent, controller: &mut ViewportController) {
        let delta = scene_position(event, controller) - self.click;
        let (side1_end, center, side2_end) = match self.original {
            MeasureToolMemento::Angle {
                side1_end,
                center,
                side2_end,
            } => (side1_end, center, side2_end),
            MeasureToolMemento::Line { .. } => return,
        };

        let moved = match self.zone {
            MeasureZone::Center => MeasureToolMemento::Angle {
                side1_end,
                center: center + delta,
                side2_end,
            },
            MeasureZone::Side1 | MeasureZone::Side2 => MeasureToolMemento::Angle {
                side1_end: side1_end + delta,
                center: center + delta,
                side2_end: side2_end + delta,
            },
            MeasureZone::Side1End => MeasureToolMemento::Angle {
                side1_end: side1_end + delta,
                center,
                side2_end,
            },
            MeasureZone::Side2End => MeasureToolMemento::Angle {
                side1_end,
                center,
                side2_end: side2_end + delta,
            },
            _ => {
                warn!("Please retry the measure editing operation");
                return;
            }
        };
        controller.set_measure_tool_state(self.tool_id, &moved);
    }

    fn pointer_up(
        &mut self,
        _event: &PointerEvent,
        controller: &mut ViewportController,
        undo_stack: &mut UndoStack,
    ) {
        if let Some(modified) = controller.measure_tool_state(self.tool_id) {
            undo_stack.push(Box::new(EditMeasureCommand::new(
                self.tool_id,
                self.original,
                modified,
                "Edit angle measure",
            )));
        }
        self.alive = false;
    }

    fn pointer_down(&mut self, _event: &PointerEvent, _controller: &mut ViewportController) {
        warn!("Ignoring additional press while editing an angle measure");
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn cancel(&mut self, controller: &mut ViewportController) {
        controller.set_measure_tool_state(self.tool_id, &self.original);
        self.alive = false;
    }
}
