use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::extent::Extent2D;
use crate::geometry::ScenePoint2D;
use crate::texture::{ColorTextureSceneLayer, FloatTextureSceneLayer};

/// Anchor point of a rasterized bitmap relative to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitmapAnchor {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// Discriminant of a scene layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    Null,
    Polyline,
    Text,
    ColorTexture,
    FloatTexture,
    Macro,
}

// ── Polylines ─────────────────────────────────────────────────────────

/// One chain of a polyline layer, open or closed, with its own color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineChain {
    pub points: Vec<ScenePoint2D>,
    pub closed: bool,
    pub color: Color,
}

/// A set of colored chains stroked with a shared thickness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineSceneLayer {
    chains: Vec<PolylineChain>,
    thickness: f64,
    revision: u64,
}

impl Default for PolylineSceneLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PolylineSceneLayer {
    pub fn new() -> Self {
        Self {
            chains: Vec::new(),
            thickness: 1.0,
            revision: 0,
        }
    }

    pub fn add_chain(&mut self, points: Vec<ScenePoint2D>, closed: bool, color: Color) {
        self.chains.push(PolylineChain {
            points,
            closed,
            color,
        });
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        self.chains.clear();
        self.revision += 1;
    }

    pub fn set_thickness(&mut self, thickness: f64) {
        self.thickness = thickness;
        self.revision += 1;
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn chains(&self) -> &[PolylineChain] {
        &self.chains
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn extent(&self) -> Extent2D {
        let mut extent = Extent2D::new();
        for chain in &self.chains {
            for p in &chain.points {
                extent.add_point(p.x, p.y);
            }
        }
        extent
    }
}

// ── Text ──────────────────────────────────────────────────────────────

/// A text label positioned in scene coordinates. Setters bump the
/// revision only when the value actually changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSceneLayer {
    text: String,
    color: Color,
    x: f64,
    y: f64,
    font_index: usize,
    font_size: u32,
    anchor: BitmapAnchor,
    border: u32,
    revision: u64,
}

impl Default for TextSceneLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSceneLayer {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            color: Color::default(),
            x: 0.0,
            y: 0.0,
            font_index: 0,
            font_size: 14,
            anchor: BitmapAnchor::Center,
            border: 0,
            revision: 0,
        }
    }

    pub fn set_text(&mut self, text: &str) {
        if self.text != text {
            self.text = text.to_string();
            self.revision += 1;
        }
    }

    pub fn set_color(&mut self, color: Color) {
        if self.color != color {
            self.color = color;
            self.revision += 1;
        }
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        if self.x != x || self.y != y {
            self.x = x;
            self.y = y;
            self.revision += 1;
        }
    }

    pub fn set_font_index(&mut self, font_index: usize) {
        if self.font_index != font_index {
            self.font_index = font_index;
            self.revision += 1;
        }
    }

    pub fn set_font_size(&mut self, font_size: u32) {
        if self.font_size != font_size {
            self.font_size = font_size;
            self.revision += 1;
        }
    }

    pub fn set_anchor(&mut self, anchor: BitmapAnchor) {
        if self.anchor != anchor {
            self.anchor = anchor;
            self.revision += 1;
        }
    }

    pub fn set_border(&mut self, border: u32) {
        if self.border != border {
            self.border = border;
            self.revision += 1;
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn position(&self) -> ScenePoint2D {
        ScenePoint2D::new(self.x, self.y)
    }

    pub fn font_index(&self) -> usize {
        self.font_index
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn anchor(&self) -> BitmapAnchor {
        self.anchor
    }

    pub fn border(&self) -> u32 {
        self.border
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

// ── Macro layers ──────────────────────────────────────────────────────

/// A layer grouping sub-layers in indexed slots. Deleting a slot recycles
/// its index: the next `add_layer` reuses the smallest free slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroSceneLayer {
    slots: Vec<Option<SceneLayer>>,
    recycled: BTreeSet<usize>,
    revision: u64,
}

impl Default for MacroSceneLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroSceneLayer {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            recycled: BTreeSet::new(),
            revision: 0,
        }
    }

    pub fn add_layer(&mut self, layer: SceneLayer) -> usize {
        self.revision += 1;
        match self.recycled.pop_first() {
            Some(index) => {
                self.slots[index] = Some(layer);
                index
            }
            None => {
                self.slots.push(Some(layer));
                self.slots.len() - 1
            }
        }
    }

    /// Replaces the sub-layer at `index`. The slot must be occupied.
    pub fn update_layer(&mut self, index: usize, layer: SceneLayer) {
        assert!(self.has_layer(index));
        self.slots[index] = Some(layer);
        self.revision += 1;
    }

    pub fn has_layer(&self, index: usize) -> bool {
        index < self.slots.len() && !self.recycled.contains(&index)
    }

    pub fn delete_layer(&mut self, index: usize) {
        assert!(self.has_layer(index));
        self.slots[index] = None;
        self.recycled.insert(index);
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.recycled.clear();
        self.revision += 1;
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Occupied sub-layers in slot order.
    pub fn layers(&self) -> impl Iterator<Item = &SceneLayer> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn extent(&self) -> Extent2D {
        let mut extent = Extent2D::new();
        for layer in self.layers() {
            extent.union(&layer.extent());
        }
        extent
    }
}

// ── The layer enum ────────────────────────────────────────────────────

/// A layer of a 2D scene. The set of kinds is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneLayer {
    /// Books a depth slot without rendering anything.
    Null,
    Polyline(PolylineSceneLayer),
    Text(TextSceneLayer),
    ColorTexture(ColorTextureSceneLayer),
    FloatTexture(FloatTextureSceneLayer),
    Macro(MacroSceneLayer),
}

impl SceneLayer {
    pub fn kind(&self) -> LayerKind {
        match self {
            SceneLayer::Null => LayerKind::Null,
            SceneLayer::Polyline(_) => LayerKind::Polyline,
            SceneLayer::Text(_) => LayerKind::Text,
            SceneLayer::ColorTexture(_) => LayerKind::ColorTexture,
            SceneLayer::FloatTexture(_) => LayerKind::FloatTexture,
            SceneLayer::Macro(_) => LayerKind::Macro,
        }
    }

    pub fn revision(&self) -> u64 {
        match self {
            SceneLayer::Null => 0,
            SceneLayer::Polyline(l) => l.revision(),
            SceneLayer::Text(l) => l.revision(),
            SceneLayer::ColorTexture(l) => l.revision(),
            SceneLayer::FloatTexture(l) => l.revision(),
            SceneLayer::Macro(l) => l.revision(),
        }
    }

    /// Bounding box of the layer. Null and text layers contribute nothing.
    pub fn extent(&self) -> Extent2D {
        match self {
            SceneLayer::Null | SceneLayer::Text(_) => Extent2D::new(),
            SceneLayer::Polyline(l) => l.extent(),
            SceneLayer::ColorTexture(l) => l.extent(),
            SceneLayer::FloatTexture(l) => l.extent(),
            SceneLayer::Macro(l) => l.extent(),
        }
    }
}
