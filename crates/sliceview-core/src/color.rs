use serde::{Deserialize, Serialize};

/// An RGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            red: 255,
            green: 255,
            blue: 255,
        }
    }
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn red_as_float(&self) -> f32 {
        f32::from(self.red) / 255.0
    }

    pub fn green_as_float(&self) -> f32 {
        f32::from(self.green) / 255.0
    }

    pub fn blue_as_float(&self) -> f32 {
        f32::from(self.blue) / 255.0
    }
}
