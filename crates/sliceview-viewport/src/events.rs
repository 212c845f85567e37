use serde::{Deserialize, Serialize};
use sliceview_core::ScenePoint2D;

/// Mouse button carried by a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    None,
}

/// One pointer sample in canvas coordinates, with optional auxiliary
/// touch positions and keyboard modifier flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    main_position: ScenePoint2D,
    auxiliary_positions: Vec<ScenePoint2D>,
    button: MouseButton,
    shift: bool,
    control: bool,
    alt: bool,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64, button: MouseButton) -> Self {
        Self {
            main_position: ScenePoint2D::new(x, y),
            auxiliary_positions: Vec::new(),
            button,
            shift: false,
            control: false,
            alt: false,
        }
    }

    pub fn add_auxiliary_position(&mut self, x: f64, y: f64) {
        self.auxiliary_positions.push(ScenePoint2D::new(x, y));
    }

    pub fn set_modifiers(&mut self, shift: bool, control: bool, alt: bool) {
        self.shift = shift;
        self.control = control;
        self.alt = alt;
    }

    pub fn main_position(&self) -> ScenePoint2D {
        self.main_position
    }

    pub fn auxiliary_count(&self) -> usize {
        self.auxiliary_positions.len()
    }

    pub fn auxiliary_position(&self, index: usize) -> ScenePoint2D {
        self.auxiliary_positions[index]
    }

    pub fn button(&self) -> MouseButton {
        self.button
    }

    pub fn is_shift_pressed(&self) -> bool {
        self.shift
    }

    pub fn is_control_pressed(&self) -> bool {
        self.control
    }

    pub fn is_alt_pressed(&self) -> bool {
        self.alt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_event() {
        let mut event = PointerEvent::new(10.0, 20.0, MouseButton::Left);
        event.add_auxiliary_position(30.0, 40.0);
        event.set_modifiers(true, false, false);

        assert_eq!(event.main_position(), ScenePoint2D::new(10.0, 20.0));
        assert_eq!(event.auxiliary_count(), 1);
        assert_eq!(event.auxiliary_position(0), ScenePoint2D::new(30.0, 40.0));
        assert_eq!(event.button(), MouseButton::Left);
        assert!(event.is_shift_pressed());
        assert!(!event.is_control_pressed());
    }
}
