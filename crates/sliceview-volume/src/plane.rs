//! 3D cutting planes: the coordinate frames along which a volume is
//! sliced into the 2D images shown in a viewport.

use log::warn;
use serde::{Deserialize, Serialize};

/// Tolerance used for the orthonormality check and for plane comparisons.
const FRAME_TOLERANCE: f64 = 1e-5;

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn is_near(a: f64, b: f64) -> bool {
    (a - b).abs() < FRAME_TOLERANCE
}

/// An oriented plane in 3D space, defined by an origin and two in-plane
/// axes. A valid plane has orthonormal axes; a frame failing the check is
/// replaced by the canonical axial frame and flagged invalid so slicers
/// can refuse it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuttingPlane {
    origin: [f64; 3],
    axis_x: [f64; 3],
    axis_y: [f64; 3],
    valid: bool,
}

impl Default for CuttingPlane {
    fn default() -> Self {
        Self::axial()
    }
}

impl CuttingPlane {
    pub fn new(origin: [f64; 3], axis_x: [f64; 3], axis_y: [f64; 3]) -> Self {
        let orthonormal = is_near(norm(axis_x), 1.0)
            && is_near(norm(axis_y), 1.0)
            && is_near(dot(axis_x, axis_y), 0.0);
        if orthonormal {
            Self {
                origin,
                axis_x,
                axis_y,
                valid: true,
            }
        } else {
            warn!("cutting plane axes are not orthonormal, falling back to axial frame");
            Self {
                valid: false,
                ..Self::axial()
            }
        }
    }

    /// Plane of an axial (transverse) view at z = 0.
    pub fn axial() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            axis_x: [1.0, 0.0, 0.0],
            axis_y: [0.0, 1.0, 0.0],
            valid: true,
        }
    }

    /// Plane of a coronal view at y = 0.
    pub fn coronal() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            axis_x: [1.0, 0.0, 0.0],
            axis_y: [0.0, 0.0, -1.0],
            valid: true,
        }
    }

    /// Plane of a sagittal view at x = 0.
    pub fn sagittal() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            axis_x: [0.0, 1.0, 0.0],
            axis_y: [0.0, 0.0, -1.0],
            valid: true,
        }
    }

    /// Whether the constructor accepted the frame as orthonormal.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn axis_x(&self) -> [f64; 3] {
        self.axis_x
    }

    pub fn axis_y(&self) -> [f64; 3] {
        self.axis_y
    }

    /// Unit normal of the plane (X × Y).
    pub fn normal(&self) -> [f64; 3] {
        cross(self.axis_x, self.axis_y)
    }

    /// Projects a world point onto the plane, returning in-plane scene
    /// coordinates.
    pub fn project_point(&self, p: [f64; 3]) -> (f64, f64) {
        let d = sub(p, self.origin);
        (dot(d, self.axis_x), dot(d, self.axis_y))
    }

    /// Maps in-plane scene coordinates back to a world point.
    pub fn map_slice_to_world(&self, x: f64, y: f64) -> [f64; 3] {
        [
            self.origin[0] + x * self.axis_x[0] + y * self.axis_y[0],
            self.origin[1] + x * self.axis_x[1] + y * self.axis_y[1],
            self.origin[2] + x * self.axis_x[2] + y * self.axis_y[2],
        ]
    }

    /// Signed distance of a world point along the plane normal.
    pub fn project_along_normal(&self, p: [f64; 3]) -> f64 {
        dot(sub(p, self.origin), self.normal())
    }

    /// Signed distance between two parallel planes, or `None` when the
    /// normals differ beyond tolerance.
    pub fn distance_to_parallel_plane(&self, other: &CuttingPlane) -> Option<f64> {
        let n1 = self.normal();
        let n2 = other.normal();
        let aligned = is_near(n1[0], n2[0]) && is_near(n1[1], n2[1]) && is_near(n1[2], n2[2]);
        if aligned {
            Some(self.project_along_normal(other.origin))
        } else {
            None
        }
    }

    /// Whether `other` is geometrically the same plane (parallel and at
    /// distance zero). Used by layer sources to skip rebuilds.
    pub fn is_same_plane(&self, other: &CuttingPlane) -> bool {
        matches!(self.distance_to_parallel_plane(other), Some(d) if d.abs() < FRAME_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_frame_falls_back_to_axial() {
        let plane = CuttingPlane::new([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(!plane.is_valid());
        assert_eq!(plane.axis_x(), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_non_orthogonal_axes_are_rejected() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let plane = CuttingPlane::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [s, s, 0.0]);
        assert!(!plane.is_valid());
    }

    #[test]
    fn test_projection_round_trip() {
        let plane = CuttingPlane::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]);
        assert!(plane.is_valid());
        let world = plane.map_slice_to_world(5.0, -2.0);
        let (x, y) = plane.project_point(world);
        assert!((x - 5.0).abs() < 1e-10);
        assert!((y + 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_normal_is_axis_cross_product() {
        let plane = CuttingPlane::axial();
        assert_eq!(plane.normal(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_distance_between_parallel_planes() {
        let a = CuttingPlane::axial();
        let b = CuttingPlane::new([0.0, 0.0, 4.5], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert!((a.distance_to_parallel_plane(&b).unwrap() - 4.5).abs() < 1e-10);
        assert!(!a.is_same_plane(&b));
        assert!(a.distance_to_parallel_plane(&CuttingPlane::coronal()).is_none());
    }

    #[test]
    fn test_same_plane_ignores_in_plane_origin_shift() {
        let a = CuttingPlane::axial();
        let b = CuttingPlane::new([10.0, -3.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(a.is_same_plane(&b));
    }
}
