use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiny_skia::{
    FilterQuality, IntSize, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};

use sliceview_core::{
    AffineTransform2D, ColorImage, MacroSceneLayer, PolylineSceneLayer, Scene2D, SceneLayer,
    TextSceneLayer,
};

use crate::cache::RevisionCache;
use crate::compositor::{Compositor, RenderError};
use crate::fonts::FontProvider;

enum SoftwareLayer {
    /// A texture converted to a premultiplied pixmap.
    Texture(Pixmap),
    /// A rasterized text label, `None` when no glyphs are available.
    Text(Option<Pixmap>),
    /// Drawn straight from the scene layer on every refresh.
    Direct,
}

/// CPU compositor rasterizing scenes onto a `tiny_skia::Pixmap`.
///
/// Texture layers are converted once and cached by layer revision; windowing
/// changes on a float texture trigger a single reconversion.
pub struct SoftwareCompositor {
    pixmap: Pixmap,
    canvas_width: u32,
    canvas_height: u32,
    cache: RevisionCache<SoftwareLayer>,
    font_provider: Option<Box<dyn FontProvider>>,
}

impl SoftwareCompositor {
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            pixmap: new_pixmap(canvas_width, canvas_height),
            canvas_width,
            canvas_height,
            cache: RevisionCache::new(),
            font_provider: None,
        }
    }

    pub fn set_font_provider(&mut self, provider: Box<dyn FontProvider>) {
        self.font_provider = Some(provider);
        self.cache.reset();
    }

    /// The last rendered frame.
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Writes the last rendered frame as a PNG file.
    pub fn write_png<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        let file = File::create(path)?;
        let mut encoder = png::Encoder::new(
            BufWriter::new(file),
            self.pixmap.width(),
            self.pixmap.height(),
        );
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;

        let mut data = Vec::with_capacity(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        writer.write_image_data(&data)?;
        Ok(())
    }
}

impl Compositor for SoftwareCompositor {
    fn set_canvas_size(&mut self, width: u32, height: u32) {
        if width != self.canvas_width || height != self.canvas_height {
            self.canvas_width = width;
            self.canvas_height = height;
            self.pixmap = new_pixmap(width, height);
        }
    }

    fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    fn canvas_height(&self) -> u32 {
        self.canvas_height
    }

    fn refresh(&mut self, scene: &Scene2D) -> Result<(), RenderError> {
        let mut fonts = self.font_provider.as_deref();
        self.cache.sync(
            scene,
            &mut fonts,
            |fonts, layer| build_payload(*fonts, layer),
            |fonts, payload, layer| {
                if let Some(rebuilt) = build_payload(*fonts, layer) {
                    *payload = rebuilt;
                }
            },
        );

        self.pixmap.fill(tiny_skia::Color::BLACK);

        let root = AffineTransform2D::combine(
            &AffineTransform2D::offset(
                f64::from(self.canvas_width) / 2.0,
                f64::from(self.canvas_height) / 2.0,
            ),
            &scene.scene_to_canvas(),
        );

        for (depth, _, layer) in scene.layers() {
            match (layer, self.cache.get(depth)) {
                (SceneLayer::Polyline(l), Some(SoftwareLayer::Direct)) => {
                    draw_polyline(&mut self.pixmap, l, &root);
                }
                (SceneLayer::Macro(l), Some(SoftwareLayer::Direct)) => {
                    draw_macro(&mut self.pixmap, l, &root, fonts);
                }
                (SceneLayer::ColorTexture(l), Some(SoftwareLayer::Texture(texture))) => {
                    draw_texture(
                        &mut self.pixmap,
                        texture,
                        &AffineTransform2D::combine(&root, &l.transform()),
                        l.is_linear_interpolation(),
                    );
                }
                (SceneLayer::FloatTexture(l), Some(SoftwareLayer::Texture(texture))) => {
                    draw_texture(
                        &mut self.pixmap,
                        texture,
                        &AffineTransform2D::combine(&root, &l.transform()),
                        l.is_linear_interpolation(),
                    );
                }
                (SceneLayer::Text(l), Some(SoftwareLayer::Text(Some(bitmap)))) => {
                    draw_text(&mut self.pixmap, bitmap, l, &root);
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn reset_scene(&mut self) {
        self.cache.reset();
    }
}

/// Renders a detached snapshot of the scene, fitted to `width` x `height`.
/// The stored scene transform is left untouched.
pub fn screenshot(
    scene: &Scene2D,
    width: u32,
    height: u32,
    fonts: Option<&dyn FontProvider>,
) -> Result<Pixmap, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidCanvas { width, height });
    }

    let mut snapshot = scene.clone();
    snapshot.fit_content(width, height)?;

    let mut pixmap = new_pixmap(width, height);
    pixmap.fill(tiny_skia::Color::BLACK);

    let root = AffineTransform2D::combine(
        &AffineTransform2D::offset(f64::from(width) / 2.0, f64::from(height) / 2.0),
        &snapshot.scene_to_canvas(),
    );

    for (_, _, layer) in snapshot.layers() {
        draw_uncached(&mut pixmap, layer, &root, fonts);
    }
    Ok(pixmap)
}

// ── Layer preparation ─────────────────────────────────────────────────

fn new_pixmap(width: u32, height: u32) -> Pixmap {
    match Pixmap::new(width.max(1), height.max(1)) {
        Some(pixmap) => pixmap,
        // Only reachable when width * height overflows.
        None => Pixmap::new(1, 1).unwrap(),
    }
}

fn build_payload(fonts: Option<&dyn FontProvider>, layer: &SceneLayer) -> Option<SoftwareLayer> {
    match layer {
        SceneLayer::Null => None,
        SceneLayer::Polyline(_) | SceneLayer::Macro(_) => Some(SoftwareLayer::Direct),
        SceneLayer::ColorTexture(l) => Some(SoftwareLayer::Texture(to_pixmap(l.image())?)),
        SceneLayer::FloatTexture(l) => Some(SoftwareLayer::Texture(to_pixmap(&l.to_rgba())?)),
        SceneLayer::Text(l) => Some(SoftwareLayer::Text(rasterize_text(fonts, l))),
    }
}

fn to_pixmap(image: &ColorImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let mut data = Vec::with_capacity(image.pixels().len());
    for pixel in image.pixels().chunks_exact(4) {
        let alpha = u16::from(pixel[3]);
        data.extend_from_slice(&[
            (u16::from(pixel[0]) * alpha / 255) as u8,
            (u16::from(pixel[1]) * alpha / 255) as u8,
            (u16::from(pixel[2]) * alpha / 255) as u8,
            pixel[3],
        ]);
    }
    Pixmap::from_vec(data, size)
}

fn rasterize_text(fonts: Option<&dyn FontProvider>, layer: &TextSceneLayer) -> Option<Pixmap> {
    let glyph = fonts?.rasterize(layer.font_index(), layer.font_size(), layer.text())?;
    let size = IntSize::from_wh(glyph.width, glyph.height)?;
    let color = layer.color();

    let mut data = Vec::with_capacity(glyph.alpha.len() * 4);
    for &alpha in &glyph.alpha {
        let a = u16::from(alpha);
        data.extend_from_slice(&[
            (u16::from(color.red) * a / 255) as u8,
            (u16::from(color.green) * a / 255) as u8,
            (u16::from(color.blue) * a / 255) as u8,
            alpha,
        ]);
    }
    Pixmap::from_vec(data, size)
}

// ── Drawing ───────────────────────────────────────────────────────────

fn to_skia_transform(t: &AffineTransform2D) -> Transform {
    let (sx, kx, ky, sy, tx, ty) = t.coefficients();
    Transform::from_row(sx as f32, ky as f32, kx as f32, sy as f32, tx as f32, ty as f32)
}

fn draw_polyline(pixmap: &mut Pixmap, layer: &PolylineSceneLayer, transform: &AffineTransform2D) {
    let stroke = Stroke {
        width: layer.thickness() as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };

    for chain in layer.chains() {
        if chain.points.len() < 2 {
            continue;
        }

        let mut pb = PathBuilder::new();
        let mut points = chain.points.iter();
        if let Some(first) = points.next() {
            let (x, y) = transform.apply(first.x, first.y);
            pb.move_to(x as f32, y as f32);
        }
        for p in points {
            let (x, y) = transform.apply(p.x, p.y);
            pb.line_to(x as f32, y as f32);
        }
        if chain.closed {
            pb.close();
        }

        if let Some(path) = pb.finish() {
            let mut paint = Paint::default();
            paint.set_color_rgba8(chain.color.red, chain.color.green, chain.color.blue, 255);
            paint.anti_alias = true;
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }
}

fn draw_texture(
    pixmap: &mut Pixmap,
    texture: &Pixmap,
    transform: &AffineTransform2D,
    linear_interpolation: bool,
) {
    let paint = PixmapPaint {
        quality: if linear_interpolation {
            FilterQuality::Bilinear
        } else {
            FilterQuality::Nearest
        },
        ..Default::default()
    };
    pixmap.draw_pixmap(
        0,
        0,
        texture.as_ref(),
        &paint,
        to_skia_transform(transform),
        None,
    );
}

fn draw_text(
    pixmap: &mut Pixmap,
    bitmap: &Pixmap,
    layer: &TextSceneLayer,
    transform: &AffineTransform2D,
) {
    let position = transform.apply_to(&layer.position());
    let (dx, dy) = crate::fonts::anchor_translation(
        layer.anchor(),
        bitmap.width(),
        bitmap.height(),
        layer.border(),
    );
    pixmap.draw_pixmap(
        (position.x + dx).round() as i32,
        (position.y + dy).round() as i32,
        bitmap.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
}

fn draw_macro(
    pixmap: &mut Pixmap,
    layer: &MacroSceneLayer,
    transform: &AffineTransform2D,
    fonts: Option<&dyn FontProvider>,
) {
    for sub in layer.layers() {
        draw_uncached(pixmap, sub, transform, fonts);
    }
}

/// Draws a layer without cached state, converting textures and rasterizing
/// text on the fly.
fn draw_uncached(
    pixmap: &mut Pixmap,
    layer: &SceneLayer,
    transform: &AffineTransform2D,
    fonts: Option<&dyn FontProvider>,
) {
    match layer {
        SceneLayer::Null => {}
        SceneLayer::Polyline(l) => draw_polyline(pixmap, l, transform),
        SceneLayer::Macro(l) => draw_macro(pixmap, l, transform, fonts),
        SceneLayer::ColorTexture(l) => {
            if let Some(texture) = to_pixmap(l.image()) {
                draw_texture(
                    pixmap,
                    &texture,
                    &AffineTransform2D::combine(transform, &l.transform()),
                    l.is_linear_interpolation(),
                );
            }
        }
        SceneLayer::FloatTexture(l) => {
            if let Some(texture) = to_pixmap(&l.to_rgba()) {
                draw_texture(
                    pixmap,
                    &texture,
                    &AffineTransform2D::combine(transform, &l.transform()),
                    l.is_linear_interpolation(),
                );
            }
        }
        SceneLayer::Text(l) => {
            if let Some(bitmap) = rasterize_text(fonts, l) {
                draw_text(pixmap, &bitmap, l, transform);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sliceview_core::{Color, FloatImage, FloatTextureSceneLayer, ScenePoint2D};

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> (u8, u8, u8, u8) {
        let i = (y * pixmap.width() + x) as usize * 4;
        let d = pixmap.data();
        (d[i], d[i + 1], d[i + 2], d[i + 3])
    }

    #[test]
    fn test_refresh_clears_to_black() {
        let mut compositor = SoftwareCompositor::new(8, 8);
        compositor.refresh(&Scene2D::new()).unwrap();
        assert_eq!(pixel(compositor.pixmap(), 3, 3), (0, 0, 0, 255));
    }

    #[test]
    fn test_polyline_is_stroked() {
        let mut scene = Scene2D::new();
        let mut layer = PolylineSceneLayer::new();
        layer.set_thickness(2.0);
        layer.add_chain(
            vec![ScenePoint2D::new(-10.0, 0.0), ScenePoint2D::new(10.0, 0.0)],
            false,
            Color::new(255, 0, 0),
        );
        scene.set_layer(0, SceneLayer::Polyline(layer));

        let mut compositor = SoftwareCompositor::new(32, 32);
        compositor.refresh(&scene).unwrap();

        // The chain crosses the canvas center.
        let (r, g, b, _) = pixel(compositor.pixmap(), 16, 16);
        assert!(r > 200);
        assert_eq!(g, 0);
        assert_eq!(b, 0);
    }

    #[test]
    fn test_float_texture_windowing() {
        let mut scene = Scene2D::new();
        let mut layer = FloatTextureSceneLayer::new(FloatImage::new(2, 2, vec![0.0; 4]));
        layer.set_custom_windowing(0.0, 100.0).unwrap();
        scene.set_layer(0, SceneLayer::FloatTexture(layer));

        let mut compositor = SoftwareCompositor::new(2, 2);
        compositor.refresh(&scene).unwrap();

        // Value 0 at center 0 maps to mid gray.
        let (r, _, _, a) = pixel(compositor.pixmap(), 1, 1);
        assert!(r > 100 && r < 160);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_screenshot_dimensions() {
        let mut scene = Scene2D::new();
        let mut layer = PolylineSceneLayer::new();
        layer.add_chain(
            vec![ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(4.0, 4.0)],
            false,
            Color::default(),
        );
        scene.set_layer(0, SceneLayer::Polyline(layer));

        let shot = screenshot(&scene, 64, 48, None).unwrap();
        assert_eq!(shot.width(), 64);
        assert_eq!(shot.height(), 48);
        assert!(screenshot(&scene, 0, 48, None).is_err());
    }

    #[test]
    fn test_text_without_provider_is_skipped() {
        let mut scene = Scene2D::new();
        let mut layer = TextSceneLayer::new();
        layer.set_text("42 mm");
        scene.set_layer(0, SceneLayer::Text(layer));

        let mut compositor = SoftwareCompositor::new(16, 16);
        compositor.refresh(&scene).unwrap();
        assert_eq!(pixel(compositor.pixmap(), 8, 8), (0, 0, 0, 255));
    }
}
