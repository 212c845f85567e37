//! The slicer contract: how a 3D volume turns a cutting plane into a
//! 2D scene layer. The scene core never reads voxels directly; it only
//! sees the layers produced here.

use sliceview_core::SceneLayer;

use crate::plane::CuttingPlane;

/// One slice extracted from a volume for a given cutting plane.
///
/// The revision comes from the underlying volume data: a slice of the
/// same plane with the same revision is guaranteed to produce the same
/// layer, which is what lets layer sources skip rebuilds.
pub trait ExtractedSlice {
    /// Whether the slicer could handle the requested plane.
    fn is_valid(&self) -> bool;

    /// Revision of the volume data backing this slice.
    fn revision(&self) -> u64;

    /// Builds the scene layer for this slice. `None` means the slice
    /// carries no drawable content (the booked slot is cleared).
    fn create_layer(&self) -> Option<SceneLayer>;
}

/// A source of slices, typically backed by a loaded 3D volume.
pub trait VolumeSlicer {
    fn extract_slice(&self, plane: &CuttingPlane) -> Box<dyn ExtractedSlice>;
}

/// The slice returned when a slicer cannot handle a plane at all, for
/// example an orthogonal-only slicer given an oblique frame.
pub struct InvalidSlice;

impl ExtractedSlice for InvalidSlice {
    fn is_valid(&self) -> bool {
        false
    }

    fn revision(&self) -> u64 {
        0
    }

    fn create_layer(&self) -> Option<SceneLayer> {
        None
    }
}
