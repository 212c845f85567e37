use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A 2D point in scene coordinates (millimeters for medical images).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenePoint2D {
    pub x: f64,
    pub y: f64,
}

impl ScenePoint2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(&self, other: &ScenePoint2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance_to(&self, other: &ScenePoint2D) -> f64 {
        (*other - *self).magnitude()
    }

    pub fn midpoint(a: &ScenePoint2D, b: &ScenePoint2D) -> Self {
        Self {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        }
    }

    /// Squared distance from point `p` to the segment joining `a` and `b`.
    ///
    /// Projects `p` onto the segment and clamps to the endpoints; a
    /// degenerate segment falls back to the distance to `a`.
    pub fn squared_distance_pt_segment(
        a: &ScenePoint2D,
        b: &ScenePoint2D,
        p: &ScenePoint2D,
    ) -> f64 {
        let n = *b - *a;
        let pa = *a - *p;

        let c = n.dot(&pa);

        // Closest point is a
        if c > 0.0 {
            return pa.dot(&pa);
        }

        let bp = *p - *b;

        // Closest point is b
        if n.dot(&bp) > 0.0 {
            return bp.dot(&bp);
        }

        let nq = n.dot(&n);
        if nq < 1e-10 {
            // Degenerate segment
            pa.dot(&pa)
        } else {
            // Closest point is between a and b
            let e = pa - n * (c / nq);
            e.dot(&e)
        }
    }
}

impl Add for ScenePoint2D {
    type Output = ScenePoint2D;

    fn add(self, rhs: ScenePoint2D) -> ScenePoint2D {
        ScenePoint2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for ScenePoint2D {
    type Output = ScenePoint2D;

    fn sub(self, rhs: ScenePoint2D) -> ScenePoint2D {
        ScenePoint2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for ScenePoint2D {
    type Output = ScenePoint2D;

    fn mul(self, rhs: f64) -> ScenePoint2D {
        ScenePoint2D::new(self.x * rhs, self.y * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = ScenePoint2D::new(0.0, 0.0);
        let b = ScenePoint2D::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_midpoint() {
        let a = ScenePoint2D::new(2.0, -2.0);
        let b = ScenePoint2D::new(4.0, 6.0);
        let m = ScenePoint2D::midpoint(&a, &b);
        assert!((m.x - 3.0).abs() < 1e-10);
        assert!((m.y - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_segment_distance_interior() {
        let a = ScenePoint2D::new(0.0, 0.0);
        let b = ScenePoint2D::new(10.0, 0.0);
        let p = ScenePoint2D::new(5.0, 3.0);
        let d2 = ScenePoint2D::squared_distance_pt_segment(&a, &b, &p);
        assert!((d2 - 9.0).abs() < 1e-10);
    }

    #[test]
    fn test_segment_distance_clamps_to_endpoints() {
        let a = ScenePoint2D::new(0.0, 0.0);
        let b = ScenePoint2D::new(10.0, 0.0);
        let before = ScenePoint2D::new(-3.0, 4.0);
        let after = ScenePoint2D::new(13.0, 4.0);
        assert!((ScenePoint2D::squared_distance_pt_segment(&a, &b, &before) - 25.0).abs() < 1e-10);
        assert!((ScenePoint2D::squared_distance_pt_segment(&a, &b, &after) - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_segment_distance_degenerate() {
        let a = ScenePoint2D::new(1.0, 1.0);
        let p = ScenePoint2D::new(4.0, 5.0);
        let d2 = ScenePoint2D::squared_distance_pt_segment(&a, &a, &p);
        assert!((d2 - 25.0).abs() < 1e-10);
    }
}
