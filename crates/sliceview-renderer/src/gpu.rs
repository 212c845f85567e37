use std::collections::BTreeSet;

use sliceview_core::{
    AffineTransform2D, Color, ColorImage, MacroSceneLayer, PolylineSceneLayer, Scene2D, SceneLayer,
    TextSceneLayer,
};

use crate::cache::RevisionCache;
use crate::compositor::{Compositor, RenderError};
use crate::fonts::{anchor_translation, FontProvider};

pub type TextureId = u64;
pub type MeshId = u64;

/// Low-level drawing backend for the GPU compositor.
///
/// Implementations wrap a real graphics API; [`RecordingDevice`] provides a
/// headless stand-in. Meshes are interleaved line-list buffers of
/// `x y r g b` vertices (two vertices per segment, colors in `[0, 1]`),
/// so a whole polyline layer is a single upload. `is_context_lost` is a
/// query and never fails; a lost context makes `refresh` return
/// [`RenderError::ContextLost`] without touching any cached handle.
pub trait GpuDevice {
    fn is_context_lost(&self) -> bool;

    fn set_viewport_size(&mut self, width: u32, height: u32);

    fn clear(&mut self, color: Color);

    fn create_texture(&mut self, image: &ColorImage) -> TextureId;

    fn update_texture(&mut self, id: TextureId, image: &ColorImage);

    fn delete_texture(&mut self, id: TextureId);

    fn create_mesh(&mut self, vertices: &[f32]) -> MeshId;

    fn update_mesh(&mut self, id: MeshId, vertices: &[f32]);

    fn delete_mesh(&mut self, id: MeshId);

    fn draw_texture(
        &mut self,
        id: TextureId,
        transform: &AffineTransform2D,
        linear_interpolation: bool,
    );

    fn draw_mesh(&mut self, id: MeshId, transform: &AffineTransform2D, thickness: f64);
}

enum GpuLayer {
    Polyline { mesh: MeshId },
    Texture { texture: TextureId },
    Text { texture: TextureId, width: u32, height: u32 },
    Macro { children: Vec<Option<GpuLayer>> },
}

struct GpuContext<'a, D> {
    device: &'a mut D,
    fonts: Option<&'a dyn FontProvider>,
}

/// Compositor rendering through a [`GpuDevice`], uploading layer data once
/// and re-uploading only when layer revisions move.
pub struct GpuCompositor<D: GpuDevice> {
    device: D,
    canvas_width: u32,
    canvas_height: u32,
    cache: RevisionCache<GpuLayer>,
    font_provider: Option<Box<dyn FontProvider>>,
}

impl<D: GpuDevice> GpuCompositor<D> {
    pub fn new(mut device: D, canvas_width: u32, canvas_height: u32) -> Self {
        device.set_viewport_size(canvas_width, canvas_height);
        Self {
            device,
            canvas_width,
            canvas_height,
            cache: RevisionCache::new(),
            font_provider: None,
        }
    }

    pub fn set_font_provider(&mut self, provider: Box<dyn FontProvider>) {
        self.font_provider = Some(provider);
        self.reset_scene();
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: GpuDevice> Compositor for GpuCompositor<D> {
    fn set_canvas_size(&mut self, width: u32, height: u32) {
        self.canvas_width = width;
        self.canvas_height = height;
        self.device.set_viewport_size(width, height);
    }

    fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    fn canvas_height(&self) -> u32 {
        self.canvas_height
    }

    fn refresh(&mut self, scene: &Scene2D) -> Result<(), RenderError> {
        if self.device.is_context_lost() {
            return Err(RenderError::ContextLost);
        }

        let mut ctx = GpuContext {
            device: &mut self.device,
            fonts: self.font_provider.as_deref(),
        };
        let evicted = self.cache.sync(scene, &mut ctx, create_layer, update_layer);
        for payload in evicted {
            free_layer(&mut self.device, payload);
        }

        self.device.clear(Color::BLACK);

        let root = AffineTransform2D::combine(
            &AffineTransform2D::offset(
                f64::from(self.canvas_width) / 2.0,
                f64::from(self.canvas_height) / 2.0,
            ),
            &scene.scene_to_canvas(),
        );

        for (depth, _, layer) in scene.layers() {
            if let Some(payload) = self.cache.get(depth) {
                draw_layer(&mut self.device, payload, layer, &root);
            }
        }

        Ok(())
    }

    fn reset_scene(&mut self) {
        for payload in self.cache.reset() {
            free_layer(&mut self.device, payload);
        }
    }
}

// ── Upload and teardown ───────────────────────────────────────────────

/// Expands a polyline layer into a single line-list vertex buffer.
fn polyline_vertices(layer: &PolylineSceneLayer) -> Vec<f32> {
    let mut vertices = Vec::new();
    for chain in layer.chains() {
        let red = chain.color.red_as_float();
        let green = chain.color.green_as_float();
        let blue = chain.color.blue_as_float();
        let mut push = |p: &sliceview_core::ScenePoint2D| {
            vertices.extend_from_slice(&[p.x as f32, p.y as f32, red, green, blue]);
        };
        for pair in chain.points.windows(2) {
            push(&pair[0]);
            push(&pair[1]);
        }
        if chain.closed && chain.points.len() > 2 {
            push(&chain.points[chain.points.len() - 1]);
            push(&chain.points[0]);
        }
    }
    vertices
}

fn text_image(fonts: Option<&dyn FontProvider>, layer: &TextSceneLayer) -> Option<ColorImage> {
    let glyph = fonts?.rasterize(layer.font_index(), layer.font_size(), layer.text())?;
    if glyph.width == 0 || glyph.height == 0 {
        return None;
    }
    let color = layer.color();
    let mut pixels = Vec::with_capacity(glyph.alpha.len() * 4);
    for &alpha in &glyph.alpha {
        pixels.extend_from_slice(&[color.red, color.green, color.blue, alpha]);
    }
    Some(ColorImage::new(glyph.width, glyph.height, pixels))
}

fn create_layer<D: GpuDevice>(ctx: &mut GpuContext<'_, D>, layer: &SceneLayer) -> Option<GpuLayer> {
    match layer {
        SceneLayer::Null => None,
        SceneLayer::Polyline(l) => Some(GpuLayer::Polyline {
            mesh: ctx.device.create_mesh(&polyline_vertices(l)),
        }),
        SceneLayer::ColorTexture(l) => Some(GpuLayer::Texture {
            texture: ctx.device.create_texture(l.image()),
        }),
        SceneLayer::FloatTexture(l) => Some(GpuLayer::Texture {
            texture: ctx.device.create_texture(&l.to_rgba()),
        }),
        SceneLayer::Text(l) => {
            let image = text_image(ctx.fonts, l)?;
            Some(GpuLayer::Text {
                texture: ctx.device.create_texture(&image),
                width: image.width(),
                height: image.height(),
            })
        }
        SceneLayer::Macro(l) => Some(GpuLayer::Macro {
            children: l.layers().map(|sub| create_layer(ctx, sub)).collect(),
        }),
    }
}

fn update_layer<D: GpuDevice>(
    ctx: &mut GpuContext<'_, D>,
    payload: &mut GpuLayer,
    layer: &SceneLayer,
) {
    match (&mut *payload, layer) {
        (GpuLayer::Polyline { mesh }, SceneLayer::Polyline(l)) => {
            ctx.device.update_mesh(*mesh, &polyline_vertices(l));
        }
        (GpuLayer::Texture { texture }, SceneLayer::ColorTexture(l)) => {
            ctx.device.update_texture(*texture, l.image());
        }
        (GpuLayer::Texture { texture }, SceneLayer::FloatTexture(l)) => {
            ctx.device.update_texture(*texture, &l.to_rgba());
        }
        (GpuLayer::Text { texture, width, height }, SceneLayer::Text(l)) => {
            if let Some(image) = text_image(ctx.fonts, l) {
                ctx.device.update_texture(*texture, &image);
                *width = image.width();
                *height = image.height();
            }
        }
        _ => {
            // The layer changed kind in place; rebuild the whole payload.
            if let Some(rebuilt) = create_layer(ctx, layer) {
                let old = std::mem::replace(payload, rebuilt);
                free_layer(ctx.device, old);
            }
        }
    }
}

fn free_layer<D: GpuDevice>(device: &mut D, payload: GpuLayer) {
    match payload {
        GpuLayer::Polyline { mesh } => device.delete_mesh(mesh),
        GpuLayer::Texture { texture } | GpuLayer::Text { texture, .. } => {
            device.delete_texture(texture);
        }
        GpuLayer::Macro { children } => {
            for child in children.into_iter().flatten() {
                free_layer(device, child);
            }
        }
    }
}

// ── Drawing ───────────────────────────────────────────────────────────

fn draw_layer<D: GpuDevice>(
    device: &mut D,
    payload: &GpuLayer,
    layer: &SceneLayer,
    transform: &AffineTransform2D,
) {
    match (payload, layer) {
        (GpuLayer::Polyline { mesh }, SceneLayer::Polyline(l)) => {
            device.draw_mesh(*mesh, transform, l.thickness());
        }
        (GpuLayer::Texture { texture }, SceneLayer::ColorTexture(l)) => {
            device.draw_texture(
                *texture,
                &AffineTransform2D::combine(transform, &l.transform()),
                l.is_linear_interpolation(),
            );
        }
        (GpuLayer::Texture { texture }, SceneLayer::FloatTexture(l)) => {
            device.draw_texture(
                *texture,
                &AffineTransform2D::combine(transform, &l.transform()),
                l.is_linear_interpolation(),
            );
        }
        (GpuLayer::Text { texture, width, height }, SceneLayer::Text(l)) => {
            let position = transform.apply_to(&l.position());
            let (dx, dy) = anchor_translation(l.anchor(), *width, *height, l.border());
            device.draw_texture(
                *texture,
                &AffineTransform2D::offset(position.x + dx, position.y + dy),
                false,
            );
        }
        (GpuLayer::Macro { children }, SceneLayer::Macro(l)) => {
            draw_macro(device, children, l, transform);
        }
        _ => {}
    }
}

fn draw_macro<D: GpuDevice>(
    device: &mut D,
    children: &[Option<GpuLayer>],
    layer: &MacroSceneLayer,
    transform: &AffineTransform2D,
) {
    for (child, sub) in children.iter().zip(layer.layers()) {
        if let Some(child) = child {
            draw_layer(device, child, sub, transform);
        }
    }
}

// ── Recording device ──────────────────────────────────────────────────

/// A headless [`GpuDevice`] that records calls instead of drawing. Useful
/// both as a null backend and for asserting upload behavior in tests.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    context_lost: bool,
    next_id: u64,
    live_textures: BTreeSet<TextureId>,
    live_meshes: BTreeSet<MeshId>,
    pub texture_creates: usize,
    pub texture_updates: usize,
    pub mesh_creates: usize,
    pub mesh_updates: usize,
    pub draw_calls: usize,
    pub clears: usize,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_context_lost(&mut self, lost: bool) {
        self.context_lost = lost;
    }

    pub fn live_texture_count(&self) -> usize {
        self.live_textures.len()
    }

    pub fn live_mesh_count(&self) -> usize {
        self.live_meshes.len()
    }

    pub fn upload_count(&self) -> usize {
        self.texture_creates + self.texture_updates + self.mesh_creates + self.mesh_updates
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl GpuDevice for RecordingDevice {
    fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    fn set_viewport_size(&mut self, _width: u32, _height: u32) {}

    fn clear(&mut self, _color: Color) {
        self.clears += 1;
    }

    fn create_texture(&mut self, _image: &ColorImage) -> TextureId {
        self.texture_creates += 1;
        let id = self.allocate();
        self.live_textures.insert(id);
        id
    }

    fn update_texture(&mut self, id: TextureId, _image: &ColorImage) {
        assert!(self.live_textures.contains(&id));
        self.texture_updates += 1;
    }

    fn delete_texture(&mut self, id: TextureId) {
        assert!(self.live_textures.remove(&id));
    }

    fn create_mesh(&mut self, _vertices: &[f32]) -> MeshId {
        self.mesh_creates += 1;
        let id = self.allocate();
        self.live_meshes.insert(id);
        id
    }

    fn update_mesh(&mut self, id: MeshId, _vertices: &[f32]) {
        assert!(self.live_meshes.contains(&id));
        self.mesh_updates += 1;
    }

    fn delete_mesh(&mut self, id: MeshId) {
        assert!(self.live_meshes.remove(&id));
    }

    fn draw_texture(
        &mut self,
        _id: TextureId,
        _transform: &AffineTransform2D,
        _linear_interpolation: bool,
    ) {
        self.draw_calls += 1;
    }

    fn draw_mesh(&mut self, _id: MeshId, _transform: &AffineTransform2D, _thickness: f64) {
        self.draw_calls += 1;
    }
}
