use serde::{Deserialize, Serialize};

use crate::geometry::ScenePoint2D;

/// An axis-aligned bounding box accumulated from points, empty until the
/// first point is added.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent2D {
    empty: bool,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl Default for Extent2D {
    fn default() -> Self {
        Self::new()
    }
}

impl Extent2D {
    pub fn new() -> Self {
        Self {
            empty: true,
            x1: 0.0,
            y1: 0.0,
            x2: 0.0,
            y2: 0.0,
        }
    }

    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            empty: false,
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn add_point(&mut self, x: f64, y: f64) {
        if self.empty {
            self.x1 = x;
            self.y1 = y;
            self.x2 = x;
            self.y2 = y;
            self.empty = false;
        } else {
            self.x1 = self.x1.min(x);
            self.y1 = self.y1.min(y);
            self.x2 = self.x2.max(x);
            self.y2 = self.y2.max(y);
        }
    }

    pub fn union(&mut self, other: &Extent2D) {
        if !other.empty {
            self.add_point(other.x1, other.y1);
            self.add_point(other.x2, other.y2);
        }
    }

    pub fn x1(&self) -> f64 {
        self.x1
    }

    pub fn y1(&self) -> f64 {
        self.y1
    }

    pub fn x2(&self) -> f64 {
        self.x2
    }

    pub fn y2(&self) -> f64 {
        self.y2
    }

    /// Zero when empty.
    pub fn width(&self) -> f64 {
        if self.empty {
            0.0
        } else {
            self.x2 - self.x1
        }
    }

    /// Zero when empty.
    pub fn height(&self) -> f64 {
        if self.empty {
            0.0
        } else {
            self.y2 - self.y1
        }
    }

    pub fn center(&self) -> ScenePoint2D {
        ScenePoint2D::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        !self.empty && x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }
}
