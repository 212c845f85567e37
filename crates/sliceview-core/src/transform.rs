use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::geometry::ScenePoint2D;

/// A 2D affine transform stored as a row-major 3x3 homogeneous matrix.
///
/// The last row is always `0 0 1`; every constructor and combination
/// preserves this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform2D {
    m: [[f64; 3]; 3],
}

impl Default for AffineTransform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineTransform2D {
    pub const IDENTITY: AffineTransform2D = AffineTransform2D {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Translation by `(dx, dy)`.
    pub fn offset(dx: f64, dy: f64) -> Self {
        Self {
            m: [[1.0, 0.0, dx], [0.0, 1.0, dy], [0.0, 0.0, 1.0]],
        }
    }

    /// Scaling by `(sx, sy)` about the origin.
    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self {
            m: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Rotation by `angle` radians about the origin.
    pub fn rotation(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            m: [[cos, -sin, 0.0], [sin, cos, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Rotation by `angle` radians about `(cx, cy)`.
    pub fn rotation_about(angle: f64, cx: f64, cy: f64) -> Self {
        Self::combine(
            &Self::offset(cx, cy),
            &Self::combine(&Self::rotation(angle), &Self::offset(-cx, -cy)),
        )
    }

    /// Mirror transform inside a `width` x `height` box, so that flipping
    /// maps the box onto itself.
    pub fn flip(flip_x: bool, flip_y: bool, width: u32, height: u32) -> Self {
        Self::combine(
            &Self::scaling(if flip_x { -1.0 } else { 1.0 }, if flip_y { -1.0 } else { 1.0 }),
            &Self::offset(
                if flip_x { -f64::from(width) } else { 0.0 },
                if flip_y { -f64::from(height) } else { 0.0 },
            ),
        )
    }

    /// Builds a transform from explicit rows. The last row must be `0 0 1`.
    pub fn from_rows(m: [[f64; 3]; 3]) -> Self {
        assert!(m[2][0] == 0.0 && m[2][1] == 0.0 && m[2][2] == 1.0);
        Self { m }
    }

    /// Composition applying `b` first, then `a`.
    pub fn combine(a: &AffineTransform2D, b: &AffineTransform2D) -> Self {
        let mut m = [[0.0; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| a.m[i][k] * b.m[k][j]).sum();
            }
        }
        Self { m }
    }

    /// Composition of a sequence, the last transform being applied first.
    pub fn combine_all(transforms: &[AffineTransform2D]) -> Self {
        transforms
            .iter()
            .fold(Self::IDENTITY, |acc, t| Self::combine(&acc, t))
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m[0][0] * x + self.m[0][1] * y + self.m[0][2],
            self.m[1][0] * x + self.m[1][1] * y + self.m[1][2],
        )
    }

    pub fn apply_to(&self, p: &ScenePoint2D) -> ScenePoint2D {
        let (x, y) = self.apply(p.x, p.y);
        ScenePoint2D::new(x, y)
    }

    /// Inverse transform, or `SceneError::SingularTransform` when the
    /// determinant of the linear part vanishes.
    pub fn invert(&self) -> Result<AffineTransform2D, SceneError> {
        let det = self.m[0][0] * self.m[1][1] - self.m[0][1] * self.m[1][0];
        if det.abs() < 1e-12 {
            return Err(SceneError::SingularTransform);
        }

        let inv_det = 1.0 / det;
        let a = self.m[1][1] * inv_det;
        let b = -self.m[0][1] * inv_det;
        let c = -self.m[1][0] * inv_det;
        let d = self.m[0][0] * inv_det;
        Ok(Self {
            m: [
                [a, b, -(a * self.m[0][2] + b * self.m[1][2])],
                [c, d, -(c * self.m[0][2] + d * self.m[1][2])],
                [0.0, 0.0, 1.0],
            ],
        })
    }

    /// Isotropic zoom factor: the length of the image of the unit diagonal
    /// `(1, 1)/sqrt(2)`. Degenerate transforms report 1.
    pub fn compute_zoom(&self) -> f64 {
        let origin = self.apply_to(&ScenePoint2D::new(0.0, 0.0));
        let diagonal = self.apply_to(&ScenePoint2D::new(1.0, 1.0));
        let zoom = (diagonal - origin).magnitude() / 2f64.sqrt();
        if zoom < 1e-10 {
            1.0
        } else {
            zoom
        }
    }

    pub fn element(&self, row: usize, column: usize) -> f64 {
        self.m[row][column]
    }

    /// The six affine coefficients `(sx, kx, ky, sy, tx, ty)` such that
    /// `x' = sx*x + kx*y + tx` and `y' = ky*x + sy*y + ty`.
    pub fn coefficients(&self) -> (f64, f64, f64, f64, f64, f64) {
        (
            self.m[0][0], self.m[0][1], self.m[1][0], self.m[1][1], self.m[0][2], self.m[1][2],
        )
    }
}

impl ScenePoint2D {
    pub fn apply(&self, t: &AffineTransform2D) -> ScenePoint2D {
        t.apply_to(self)
    }
}
