use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::SceneError;
use crate::extent::Extent2D;
use crate::layer::SceneLayer;
use crate::transform::AffineTransform2D;

#[derive(Debug)]
struct LayerEntry {
    identifier: u64,
    layer: SceneLayer,
}

/// A 2D scene: layers ordered by depth, plus the scene-to-canvas transform.
///
/// Each layer slot carries a unique identifier that changes whenever the
/// slot is assigned a new layer, so renderers can tell replacement apart
/// from in-place mutation (which only bumps the layer revision).
#[derive(Debug)]
pub struct Scene2D {
    id: Uuid,
    layers: BTreeMap<i32, LayerEntry>,
    layer_counter: u64,
    scene_to_canvas: AffineTransform2D,
    canvas_to_scene: AffineTransform2D,
}

impl Default for Scene2D {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene2D {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            layers: BTreeMap::new(),
            layer_counter: 0,
            scene_to_canvas: AffineTransform2D::IDENTITY,
            canvas_to_scene: AffineTransform2D::IDENTITY,
        }
    }

    /// Identity of this scene, used by compositors to detect that they are
    /// being fed a different scene. Cloning produces a new identity.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Inserts or replaces the layer at `depth` and returns a mutable
    /// reference to it. Replacement allocates a fresh layer identifier.
    pub fn set_layer(&mut self, depth: i32, layer: SceneLayer) -> &mut SceneLayer {
        let identifier = self.layer_counter;
        self.layer_counter += 1;
        let entry = self.layers.entry(depth).or_insert(LayerEntry {
            identifier,
            layer: SceneLayer::Null,
        });
        entry.identifier = identifier;
        entry.layer = layer;
        &mut entry.layer
    }

    pub fn has_layer(&self, depth: i32) -> bool {
        self.layers.contains_key(&depth)
    }

    pub fn get_layer(&self, depth: i32) -> Result<&SceneLayer, SceneError> {
        self.layers
            .get(&depth)
            .map(|entry| &entry.layer)
            .ok_or(SceneError::LayerNotFound(depth))
    }

    pub fn get_layer_mut(&mut self, depth: i32) -> Result<&mut SceneLayer, SceneError> {
        self.layers
            .get_mut(&depth)
            .map(|entry| &mut entry.layer)
            .ok_or(SceneError::LayerNotFound(depth))
    }

    /// Removes the layer at `depth`. Nothing happens if the slot is empty.
    pub fn delete_layer(&mut self, depth: i32) {
        self.layers.remove(&depth);
    }

    /// Removes the layer at `depth` and hands its ownership back.
    pub fn release_layer(&mut self, depth: i32) -> Result<SceneLayer, SceneError> {
        self.layers
            .remove(&depth)
            .map(|entry| entry.layer)
            .ok_or(SceneError::LayerNotFound(depth))
    }

    pub fn layer_identifier(&self, depth: i32) -> Option<u64> {
        self.layers.get(&depth).map(|entry| entry.identifier)
    }

    /// Smallest occupied depth, 0 when the scene has no layer.
    pub fn min_depth(&self) -> i32 {
        self.layers.keys().next().copied().unwrap_or(0)
    }

    /// Largest occupied depth, 0 when the scene has no layer.
    pub fn max_depth(&self) -> i32 {
        self.layers.keys().next_back().copied().unwrap_or(0)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layers in ascending depth order, with their identifiers.
    pub fn layers(&self) -> impl Iterator<Item = (i32, u64, &SceneLayer)> {
        self.layers
            .iter()
            .map(|(&depth, entry)| (depth, entry.identifier, &entry.layer))
    }

    pub fn scene_to_canvas(&self) -> AffineTransform2D {
        self.scene_to_canvas
    }

    pub fn canvas_to_scene(&self) -> AffineTransform2D {
        self.canvas_to_scene
    }

    /// Sets the scene-to-canvas transform. The inverse is computed first;
    /// a singular transform leaves the scene untouched.
    pub fn set_scene_to_canvas_transform(
        &mut self,
        transform: AffineTransform2D,
    ) -> Result<(), SceneError> {
        let inverse = transform.invert()?;
        self.scene_to_canvas = transform;
        self.canvas_to_scene = inverse;
        Ok(())
    }

    pub fn get_bounding_box(&self) -> Extent2D {
        let mut extent = Extent2D::new();
        for entry in self.layers.values() {
            extent.union(&entry.layer.extent());
        }
        extent
    }

    /// Adjusts the transform so the scene content fills the canvas,
    /// preserving the aspect ratio. Does nothing when the scene is empty.
    pub fn fit_content(&mut self, canvas_width: u32, canvas_height: u32) -> Result<(), SceneError> {
        let extent = self.get_bounding_box();
        if extent.is_empty() {
            return Ok(());
        }

        let mut zoom = f64::INFINITY;
        if extent.width() > 1e-10 {
            zoom = zoom.min(f64::from(canvas_width) / extent.width());
        }
        if extent.height() > 1e-10 {
            zoom = zoom.min(f64::from(canvas_height) / extent.height());
        }
        if !zoom.is_finite() || zoom < 1e-6 {
            zoom = 1.0;
        }

        let center = extent.center();
        self.set_scene_to_canvas_transform(AffineTransform2D::combine(
            &AffineTransform2D::scaling(zoom, zoom),
            &AffineTransform2D::offset(-center.x, -center.y),
        ))
    }
}

impl Clone for Scene2D {
    /// Deep copy with a new scene identity and fresh layer identifiers.
    fn clone(&self) -> Self {
        let mut scene = Scene2D::new();
        scene.scene_to_canvas = self.scene_to_canvas;
        scene.canvas_to_scene = self.canvas_to_scene;
        for (&depth, entry) in &self.layers {
            scene.set_layer(depth, entry.layer.clone());
        }
        scene
    }
}
