//! The bridge between a volume slicer and one depth slot of a scene:
//! rebuilds the slot's layer only when the cutting plane or the
//! underlying data actually changed.

use log::debug;
use sliceview_core::{Scene2D, SceneLayer};

use crate::plane::CuttingPlane;
use crate::slicer::VolumeSlicer;
use crate::style::LayerStyleConfigurator;

/// Feeds slices of one volume into one depth slot of a scene.
///
/// The source books its depth with a `Null` layer on creation and keeps
/// the slot occupied until [`detach`](Self::detach). Rebuilds are
/// skipped when both invalidation keys are unchanged: the cutting plane
/// (same geometric plane) and the slice data revision. A style change
/// alone re-applies the configurator without re-slicing.
pub struct VolumeSceneLayerSource {
    depth: i32,
    slicer: Box<dyn VolumeSlicer>,
    configurator: Option<Box<dyn LayerStyleConfigurator>>,
    last_plane: Option<CuttingPlane>,
    last_revision: u64,
    last_style_revision: Option<u64>,
}

impl VolumeSceneLayerSource {
    /// Books `depth` in the scene. The slot must be free.
    pub fn new(scene: &mut Scene2D, depth: i32, slicer: Box<dyn VolumeSlicer>) -> Self {
        assert!(
            !scene.has_layer(depth),
            "depth {depth} is already owned by another layer source"
        );
        scene.set_layer(depth, SceneLayer::Null);
        Self {
            depth,
            slicer,
            configurator: None,
            last_plane: None,
            last_revision: 0,
            last_style_revision: None,
        }
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Installs or replaces the style configurator. The style is
    /// applied on the next update even if the revisions coincide.
    pub fn set_configurator(&mut self, configurator: Box<dyn LayerStyleConfigurator>) {
        self.configurator = Some(configurator);
        self.last_style_revision = None;
    }

    pub fn remove_configurator(&mut self) {
        self.configurator = None;
        self.last_style_revision = None;
    }

    pub fn configurator(&self) -> Option<&dyn LayerStyleConfigurator> {
        self.configurator.as_deref()
    }

    /// Brings the booked slot up to date for `plane`.
    pub fn update(&mut self, scene: &mut Scene2D, plane: &CuttingPlane) {
        let slice = self.slicer.extract_slice(plane);
        if !slice.is_valid() {
            debug!("slicer cannot handle the cutting plane, clearing depth {}", self.depth);
            self.clear(scene);
            return;
        }

        let same_plane = self
            .last_plane
            .as_ref()
            .is_some_and(|last| last.is_same_plane(plane));
        if same_plane && slice.revision() == self.last_revision {
            // Geometry is up to date; only the style may have moved.
            if let Some(configurator) = &self.configurator {
                if self.last_style_revision != Some(configurator.revision()) {
                    if let Ok(layer) = scene.get_layer_mut(self.depth) {
                        configurator.apply(layer);
                    }
                    self.last_style_revision = Some(configurator.revision());
                }
            }
            return;
        }

        match slice.create_layer() {
            Some(mut layer) => {
                if let Some(configurator) = &self.configurator {
                    configurator.apply(&mut layer);
                    self.last_style_revision = Some(configurator.revision());
                }
                scene.set_layer(self.depth, layer);
            }
            None => self.clear(scene),
        }
        self.last_plane = Some(*plane);
        self.last_revision = slice.revision();
    }

    /// Removes the booked layer from the scene. The source must not be
    /// used afterwards.
    pub fn detach(self, scene: &mut Scene2D) {
        scene.delete_layer(self.depth);
    }

    fn clear(&mut self, scene: &mut Scene2D) {
        scene.set_layer(self.depth, SceneLayer::Null);
        self.last_plane = None;
        self.last_revision = 0;
        self.last_style_revision = None;
    }
}
