use crate::controller::ViewportController;
use crate::events::{MouseButton, PointerEvent};
use crate::trackers::{
    GrayscaleWindowingTracker, PanTracker, PointerTracker, RotateTracker, ZoomTracker,
};

/// Decides which gesture, if any, a pointer press on the scene
/// background starts. The controller consults the interactor last,
/// after measure tools and annotations had their chance.
pub trait ViewportInteractor {
    fn create_tracker(
        &self,
        controller: &ViewportController,
        event: &PointerEvent,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Option<Box<dyn PointerTracker>>;

    /// Whether `handle_mouse_hover` wants the plain pointer moves that
    /// happen outside of any gesture.
    fn has_mouse_hover(&self) -> bool {
        false
    }

    fn handle_mouse_hover(&self, _controller: &mut ViewportController, _event: &PointerEvent) {}
}

/// Gesture a mouse button can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Pan,
    Zoom,
    Rotate,
    GrayscaleWindowing,
    None,
}

/// Starts the tracker implementing `action`, so that interactors only
/// have to map buttons to actions.
pub fn create_tracker_for_action(
    action: MouseAction,
    controller: &ViewportController,
    event: &PointerEvent,
    canvas_width: u32,
    canvas_height: u32,
    windowing_layer_depth: i32,
) -> Option<Box<dyn PointerTracker>> {
    match action {
        MouseAction::Pan => Some(Box::new(PanTracker::new(controller, event))),
        MouseAction::Zoom => Some(Box::new(ZoomTracker::new(controller, event, canvas_height))),
        MouseAction::Rotate => Some(Box::new(RotateTracker::new(controller, event))),
        MouseAction::GrayscaleWindowing => Some(Box::new(GrayscaleWindowingTracker::new(
            controller,
            windowing_layer_depth,
            event,
            canvas_width,
            canvas_height,
        ))),
        MouseAction::None => None,
    }
}

/// Radiology-flavored bindings: the left button adjusts the grayscale
/// windowing of one texture layer, the middle button pans, the right
/// button zooms.
#[derive(Debug, Clone)]
pub struct DefaultViewportInteractor {
    left_action: MouseAction,
    middle_action: MouseAction,
    right_action: MouseAction,
    windowing_layer_depth: i32,
}

impl DefaultViewportInteractor {
    pub fn new() -> Self {
        Self {
            left_action: MouseAction::GrayscaleWindowing,
            middle_action: MouseAction::Pan,
            right_action: MouseAction::Zoom,
            windowing_layer_depth: 0,
        }
    }

    pub fn set_left_action(&mut self, action: MouseAction) {
        self.left_action = action;
    }

    pub fn set_middle_action(&mut self, action: MouseAction) {
        self.middle_action = action;
    }

    pub fn set_right_action(&mut self, action: MouseAction) {
        self.right_action = action;
    }

    /// Depth of the texture layer targeted by grayscale windowing.
    pub fn set_windowing_layer_depth(&mut self, depth: i32) {
        self.windowing_layer_depth = depth;
    }

    fn action(&self, button: MouseButton) -> MouseAction {
        match button {
            MouseButton::Left => self.left_action,
            MouseButton::Middle => self.middle_action,
            MouseButton::Right => self.right_action,
            MouseButton::None => MouseAction::None,
        }
    }
}

impl Default for DefaultViewportInteractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportInteractor for DefaultViewportInteractor {
    fn create_tracker(
        &self,
        controller: &ViewportController,
        event: &PointerEvent,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Option<Box<dyn PointerTracker>> {
        create_tracker_for_action(
            self.action(event.button()),
            controller,
            event,
            canvas_width,
            canvas_height,
            self.windowing_layer_depth,
        )
    }
}
