use uuid::Uuid;

use crate::controller::ViewportController;
use crate::measure::MeasureToolMemento;

/// A reversible change to the measure tools of a viewport.
///
/// Commands are recorded after the fact: the tracker that performs the
/// change also pushes the matching command onto the [`UndoStack`], so
/// pushing never re-executes anything.
pub trait MeasureCommand: std::fmt::Debug + Send {
    /// Reverse the change on the controller.
    fn undo(&mut self, controller: &mut ViewportController);
    /// Apply the change again after an undo.
    fn redo(&mut self, controller: &mut ViewportController);
    /// Human-readable description for the undo/redo history.
    fn description(&self) -> &str;
}

// ── Concrete commands ─────────────────────────────────────────────────

/// Records the interactive creation of a measure tool.
///
/// The tool is already registered and active when this command is
/// pushed. Undo deactivates it, redo activates it again; the tool
/// itself stays owned by the controller throughout.
#[derive(Debug)]
pub struct CreateMeasureCommand {
    tool_id: Uuid,
    description: String,
}

impl CreateMeasureCommand {
    pub fn new(tool_id: Uuid, description: &str) -> Self {
        Self {
            tool_id,
            description: description.to_owned(),
        }
    }
}

impl MeasureCommand for CreateMeasureCommand {
    fn undo(&mut self, controller: &mut ViewportController) {
        controller.deactivate_measure_tool(self.tool_id);
    }

    fn redo(&mut self, controller: &mut ViewportController) {
        controller.activate_measure_tool(self.tool_id);
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Records an edit of a measure tool as a pair of mementos.
#[derive(Debug)]
pub struct EditMeasureCommand {
    tool_id: Uuid,
    /// State of the tool before the edit started.
    original: MeasureToolMemento,
    /// State of the tool once the edit was committed.
    modified: MeasureToolMemento,
    description: String,
}

impl EditMeasureCommand {
    pub fn new(
        tool_id: Uuid,
        original: MeasureToolMemento,
        modified: MeasureToolMemento,
        description: &str,
    ) -> Self {
        Self {
            tool_id,
            original,
            modified,
            description: description.to_owned(),
        }
    }
}

impl MeasureCommand for EditMeasureCommand {
    fn undo(&mut self, controller: &mut ViewportController) {
        controller.set_measure_tool_state(self.tool_id, &self.original);
    }

    fn redo(&mut self, controller: &mut ViewportController) {
        controller.set_measure_tool_state(self.tool_id, &self.modified);
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Records the deletion of a measure tool.
///
/// Construction performs the deletion itself, so the caller only has
/// to push the returned command.
#[derive(Debug)]
pub struct DeleteMeasureCommand {
    tool_id: Uuid,
    description: String,
}

impl DeleteMeasureCommand {
    pub fn new(controller: &mut ViewportController, tool_id: Uuid, description: &str) -> Self {
        controller.deactivate_measure_tool(tool_id);
        Self {
            tool_id,
            description: description.to_owned(),
        }
    }
}

impl MeasureCommand for DeleteMeasureCommand {
    fn undo(&mut self, controller: &mut ViewportController) {
        controller.activate_measure_tool(self.tool_id);
    }

    fn redo(&mut self, controller: &mut ViewportController) {
        controller.deactivate_measure_tool(self.tool_id);
    }

    fn description(&self) -> &str {
        &self.description
    }
}

// ── Undo stack ────────────────────────────────────────────────────────

/// Linear undo/redo history over measure commands.
///
/// The stack keeps a single vector of commands together with the count
/// of currently applied ones. Pushing a new command discards every
/// undone command beyond that count, so redo history is lost as soon
/// as the user performs a fresh action.
#[derive(Debug, Default)]
pub struct UndoStack {
    commands: Vec<Box<dyn MeasureCommand>>,
    num_applied: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            num_applied: 0,
        }
    }

    /// Record an already-performed command, dropping any redo history.
    pub fn push(&mut self, command: Box<dyn MeasureCommand>) {
        self.commands.truncate(self.num_applied);
        self.commands.push(command);
        self.num_applied += 1;
    }

    /// Reverse the most recent applied command.
    ///
    /// Callers must check [`UndoStack::can_undo`] first.
    pub fn undo(&mut self, controller: &mut ViewportController) {
        assert!(self.can_undo());
        self.commands[self.num_applied - 1].undo(controller);
        self.num_applied -= 1;
    }

    /// Re-apply the most recently undone command.
    ///
    /// Callers must check [`UndoStack::can_redo`] first.
    pub fn redo(&mut self, controller: &mut ViewportController) {
        assert!(self.can_redo());
        self.commands[self.num_applied].redo(controller);
        self.num_applied += 1;
    }

    pub fn can_undo(&self) -> bool {
        self.num_applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.num_applied < self.commands.len()
    }

    /// Description of the command an undo would reverse, if any.
    pub fn undo_description(&self) -> Option<&str> {
        if self.can_undo() {
            Some(self.commands[self.num_applied - 1].description())
        } else {
            None
        }
    }

    /// Description of the command a redo would re-apply, if any.
    pub fn redo_description(&self) -> Option<&str> {
        if self.can_redo() {
            Some(self.commands[self.num_applied].description())
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.num_applied = 0;
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
