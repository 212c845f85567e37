use sliceview_core::{PolylineSceneLayer, Scene2D, SceneLayer, TextSceneLayer};

/// Books a contiguous block of scene depths for a tool's visuals.
///
/// The block starts above everything already in the scene, with the
/// polyline sub-block first and the text sub-block after it. Layers are
/// created lazily on first access and removed by `delete_layers`.
#[derive(Debug)]
pub struct LayerHolder {
    polyline_count: usize,
    text_count: usize,
    base_depth: Option<i32>,
}

impl LayerHolder {
    pub fn new(polyline_count: usize, text_count: usize) -> Self {
        Self {
            polyline_count,
            text_count,
            base_depth: None,
        }
    }

    pub fn polyline_count(&self) -> usize {
        self.polyline_count
    }

    pub fn text_count(&self) -> usize {
        self.text_count
    }

    pub fn is_created(&self) -> bool {
        self.base_depth.is_some()
    }

    fn create_layers(&mut self, scene: &mut Scene2D) -> i32 {
        let base = scene.max_depth() + 100;
        for i in 0..self.polyline_count {
            scene.set_layer(
                base + i as i32,
                SceneLayer::Polyline(PolylineSceneLayer::new()),
            );
        }
        for i in 0..self.text_count {
            scene.set_layer(
                base + (self.polyline_count + i) as i32,
                SceneLayer::Text(TextSceneLayer::new()),
            );
        }
        self.base_depth = Some(base);
        base
    }

    pub fn delete_layers(&mut self, scene: &mut Scene2D) {
        if let Some(base) = self.base_depth.take() {
            for i in 0..(self.polyline_count + self.text_count) {
                scene.delete_layer(base + i as i32);
            }
        }
    }

    pub fn polyline_layer<'a>(
        &mut self,
        scene: &'a mut Scene2D,
        index: usize,
    ) -> &'a mut PolylineSceneLayer {
        assert!(index < self.polyline_count);
        let base = match self.base_depth {
            Some(base) => base,
            None => self.create_layers(scene),
        };
        let depth = base + index as i32;
        match scene.get_layer_mut(depth) {
            Ok(SceneLayer::Polyline(layer)) => layer,
            _ => panic!("Booked polyline layer at depth {} was clobbered", depth),
        }
    }

    pub fn text_layer<'a>(&mut self, scene: &'a mut Scene2D, index: usize) -> &'a mut TextSceneLayer {
        assert!(index < self.text_count);
        let base = match self.base_depth {
            Some(base) => base,
            None => self.create_layers(scene),
        };
        let depth = base + (self.polyline_count + index) as i32;
        match scene.get_layer_mut(depth) {
            Ok(SceneLayer::Text(layer)) => layer,
            _ => panic!("Booked text layer at depth {} was clobbered", depth),
        }
    }
}
