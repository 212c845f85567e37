use serde::{Deserialize, Serialize};
use sliceview_core::Color;

/// Visual constants of the measure and annotation subsystem.
///
/// Distances are in canvas pixels; tools convert them to scene units
/// through the current canvas-to-scene factor, so handles and hit zones
/// keep the same on-screen size at any zoom level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderingStyle {
    pub arc_radius: f64,
    pub text_center_distance: f64,
    pub handle_side: f64,
    pub hit_test_max_distance: f64,
    pub text_color: Color,
    pub text_outline_color: Color,
    pub line_color: Color,
    pub line_highlight_color: Color,
    pub angle_color: Color,
    pub angle_highlight_color: Color,
    pub annotation_color: Color,
    pub annotation_hover_color: Color,
    pub annotation_text_color: Color,
    pub font_index: usize,
    pub font_size: u32,
}

impl Default for RenderingStyle {
    fn default() -> Self {
        Self {
            arc_radius: 30.0,
            text_center_distance: 90.0,
            handle_side: 10.0,
            hit_test_max_distance: 15.0,
            text_color: Color::new(0, 223, 81),
            text_outline_color: Color::new(0, 56, 21),
            line_color: Color::new(0, 223, 21),
            line_highlight_color: Color::new(0, 21, 223),
            angle_color: Color::new(0, 183, 17),
            angle_highlight_color: Color::new(0, 17, 183),
            annotation_color: Color::new(0x40, 0x82, 0xad),
            annotation_hover_color: Color::new(0x40, 0xad, 0x79),
            annotation_text_color: Color::new(0x4e, 0xde, 0x99),
            font_index: 0,
            font_size: 14,
        }
    }
}
