//! Geometry helpers shared by the measure tools and the annotations layer.

use std::f64::consts::PI;

use sliceview_core::{
    AffineTransform2D, BitmapAnchor, Color, PolylineSceneLayer, Scene2D, ScenePoint2D,
};

use crate::layer_holder::LayerHolder;
use crate::style::RenderingStyle;

const ARC_SUBDIVISIONS: usize = 63;

/// Brings an angle into `[-pi, pi)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut normalized = angle % (2.0 * PI);
    if normalized < -PI {
        normalized += 2.0 * PI;
    }
    if normalized >= PI {
        normalized -= 2.0 * PI;
    }
    normalized
}

/// Signed angle at `center` between the rays toward `p1` and `p2`.
pub fn measure_angle(p1: &ScenePoint2D, center: &ScenePoint2D, p2: &ScenePoint2D) -> f64 {
    let angle1 = (p1.y - center.y).atan2(p1.x - center.x);
    let angle2 = (p2.y - center.y).atan2(p2.x - center.x);
    normalize_angle(angle2 - angle1)
}

/// Adds a closed square chain centered on `center` whose sides stay
/// parallel to the canvas axes. `side` is in canvas pixels.
pub fn add_square(
    layer: &mut PolylineSceneLayer,
    scene_to_canvas: &AffineTransform2D,
    canvas_to_scene: &AffineTransform2D,
    center: ScenePoint2D,
    side: f64,
    color: Color,
) {
    let canvas_center = center.apply(scene_to_canvas);
    let left = canvas_center.x - side / 2.0;
    let top = canvas_center.y - side / 2.0;
    let right = canvas_center.x + side / 2.0;
    let bottom = canvas_center.y + side / 2.0;

    let points = vec![
        ScenePoint2D::new(left, top).apply(canvas_to_scene),
        ScenePoint2D::new(right, top).apply(canvas_to_scene),
        ScenePoint2D::new(right, bottom).apply(canvas_to_scene),
        ScenePoint2D::new(left, bottom).apply(canvas_to_scene),
    ];
    layer.add_chain(points, true, color);
}

/// Adds the shortest arc between `start_angle` and `end_angle` around
/// `center`, sweeping at most half a turn. `radius` is in scene units.
pub fn add_shortest_arc(
    layer: &mut PolylineSceneLayer,
    center: ScenePoint2D,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    color: Color,
) {
    let sweep = normalize_angle(end_angle - start_angle);
    let increment = sweep / ARC_SUBDIVISIONS as f64;

    let mut points = Vec::with_capacity(ARC_SUBDIVISIONS + 1);
    let mut theta = start_angle;
    for _ in 0..=ARC_SUBDIVISIONS {
        points.push(ScenePoint2D::new(
            center.x + radius * theta.cos(),
            center.y + radius * theta.sin(),
        ));
        theta += increment;
    }
    layer.add_chain(points, false, color);
}

/// Adds a closed circle chain around `center`. `radius` is in scene units.
pub fn add_circle(layer: &mut PolylineSceneLayer, center: ScenePoint2D, radius: f64, color: Color) {
    let increment = 2.0 * PI / ARC_SUBDIVISIONS as f64;

    let mut points = Vec::with_capacity(ARC_SUBDIVISIONS);
    let mut theta: f64 = 0.0;
    for _ in 0..ARC_SUBDIVISIONS {
        points.push(ScenePoint2D::new(
            center.x + radius * theta.cos(),
            center.y + radius * theta.sin(),
        ));
        theta += increment;
    }
    layer.add_chain(points, true, color);
}

/// Writes a label into the holder's five text layers, drawing four
/// outline copies offset by two canvas pixels under a centered copy in
/// the main text color.
pub fn set_text_with_outline(
    holder: &mut LayerHolder,
    scene: &mut Scene2D,
    style: &RenderingStyle,
    text: &str,
    position: ScenePoint2D,
    factor: f64,
) {
    const OFFSETS: [(f64, f64); 5] = [(2.0, 0.0), (0.0, -2.0), (-2.0, 0.0), (0.0, 2.0), (0.0, 0.0)];

    for (i, (dx, dy)) in OFFSETS.iter().enumerate() {
        let color = if i == OFFSETS.len() - 1 {
            style.text_color
        } else {
            style.text_outline_color
        };
        let layer = holder.text_layer(scene, i);
        layer.set_text(text);
        layer.set_color(color);
        layer.set_position(position.x + dx * factor, position.y + dy * factor);
        layer.set_font_index(style.font_index);
        layer.set_font_size(style.font_size);
        layer.set_anchor(BitmapAnchor::Center);
    }
}

/// Blanks out all text layers of the holder.
pub fn clear_text_layers(holder: &mut LayerHolder, scene: &mut Scene2D) {
    for i in 0..holder.text_count() {
        holder.text_layer(scene, i).set_text("");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(0.0)).abs() < 1e-10);
        assert!((normalize_angle(PI) - (-PI)).abs() < 1e-10);
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-10);
        assert!((normalize_angle(-PI) - (-PI)).abs() < 1e-10);
        assert!((normalize_angle(PI / 2.0) - PI / 2.0).abs() < 1e-10);
        assert!((normalize_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_measure_angle() {
        let center = ScenePoint2D::new(0.0, 0.0);
        let p1 = ScenePoint2D::new(1.0, 0.0);
        let p2 = ScenePoint2D::new(0.0, 1.0);
        assert!((measure_angle(&p1, &center, &p2) - PI / 2.0).abs() < 1e-10);
        assert!((measure_angle(&p2, &center, &p1) + PI / 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_add_square_is_canvas_aligned() {
        let mut scene = Scene2D::new();
        scene
            .set_scene_to_canvas_transform(AffineTransform2D::rotation(PI / 4.0))
            .unwrap();

        let mut layer = PolylineSceneLayer::new();
        add_square(
            &mut layer,
            &scene.scene_to_canvas(),
            &scene.canvas_to_scene(),
            ScenePoint2D::new(0.0, 0.0),
            10.0,
            Color::default(),
        );

        let chain = &layer.chains()[0];
        assert!(chain.closed);
        assert_eq!(chain.points.len(), 4);

        // Corners form an axis-aligned square once mapped back to canvas.
        let to_canvas = scene.scene_to_canvas();
        let corners: Vec<ScenePoint2D> = chain.points.iter().map(|p| p.apply(&to_canvas)).collect();
        assert!((corners[0].x - (-5.0)).abs() < 1e-10);
        assert!((corners[0].y - (-5.0)).abs() < 1e-10);
        assert!((corners[2].x - 5.0).abs() < 1e-10);
        assert!((corners[2].y - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_add_shortest_arc_subdivisions() {
        let mut layer = PolylineSceneLayer::new();
        add_shortest_arc(
            &mut layer,
            ScenePoint2D::new(0.0, 0.0),
            10.0,
            0.0,
            PI / 2.0,
            Color::default(),
        );

        let chain = &layer.chains()[0];
        assert_eq!(chain.points.len(), ARC_SUBDIVISIONS + 1);
        assert!(!chain.closed);
        assert!((chain.points[0].x - 10.0).abs() < 1e-10);
        let last = chain.points[chain.points.len() - 1];
        assert!(last.x.abs() < 1e-9);
        assert!((last.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_add_shortest_arc_takes_short_way_around() {
        let mut layer = PolylineSceneLayer::new();
        // From 170 to -170 degrees the short sweep crosses pi, not zero.
        let start = 170.0_f64.to_radians();
        let end = -170.0_f64.to_radians();
        add_shortest_arc(
            &mut layer,
            ScenePoint2D::new(0.0, 0.0),
            1.0,
            start,
            end,
            Color::default(),
        );

        let chain = &layer.chains()[0];
        let mid = chain.points[chain.points.len() / 2];
        assert!(mid.x < -0.99);
    }

    #[test]
    fn test_add_circle() {
        let mut layer = PolylineSceneLayer::new();
        add_circle(&mut layer, ScenePoint2D::new(1.0, 2.0), 3.0, Color::default());

        let chain = &layer.chains()[0];
        assert!(chain.closed);
        assert_eq!(chain.points.len(), ARC_SUBDIVISIONS);
        for p in &chain.points {
            let distance = ((p.x - 1.0).powi(2) + (p.y - 2.0).powi(2)).sqrt();
            assert!((distance - 3.0).abs() < 1e-10);
        }
    }
}
