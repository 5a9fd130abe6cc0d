//! Rasterizes a scene with tiny-skia.
//!
//! Paint order is fixed: background color, background image, objects back to
//! front, then the selection overlay when requested.

use image::{Rgba, RgbaImage};
use kurbo::{Affine, BezPath, PathEl};
use tiny_skia::{
    Color as SkColor, ColorU8, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};
use tracing::debug;
use crate::error::{EditorError, Result};
use crate::objects::{CanvasObject, ImageObject, ObjectKind, ShapeObject, TextObject};
use crate::scene::Scene;
use crate::selection::{handle_position, handle_positions, object_frame, HANDLE_SIZE};
use crate::types::{Color, HandleType};

const OVERLAY_COLOR: Color = Color::rgb(0x4f, 0xac, 0xfe);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    /// Uniform output scale relative to the canvas size.
    pub scale: f64,
    /// Draw the selection border and handles.
    pub overlay: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions { scale: 1.0, overlay: false }
    }
}

impl RenderOptions {
    pub fn editor() -> Self {
        RenderOptions { scale: 1.0, overlay: true }
    }
}

pub fn render(scene: &Scene, options: &RenderOptions) -> Result<RgbaImage> {
    let size = scene.canvas_size();
    let (w, h) = size.scaled_pixels(options.scale);
    let mut pixmap = Pixmap::new(w, h)
        .ok_or_else(|| EditorError::Encode(format!("cannot allocate a {}x{} surface", w, h)))?;
    let base = Transform::from_scale(
        (w as f64 / size.width.max(1.0)) as f32,
        (h as f64 / size.height.max(1.0)) as f32,
    );

    pixmap.fill(sk_color(scene.background_color(), 1.0));

    if let Some(bg) = scene.background() {
        if let Some(src) = pixmap_from_rgba(&bg.pixels) {
            let t = base
                .pre_translate(bg.offset.x as f32, bg.offset.y as f32)
                .pre_scale(bg.scale as f32, bg.scale as f32);
            pixmap.draw_pixmap(0, 0, src.as_ref(), &image_paint(1.0), t, None);
        }
    }

    for obj in scene.objects() {
        let t = base.pre_concat(affine_to_transform(obj.transform()));
        match &obj.kind {
            ObjectKind::Image(image) => draw_image(&mut pixmap, obj, image, t),
            ObjectKind::Text(text) => draw_text(&mut pixmap, obj, text, t),
            ObjectKind::Shape(shape) => draw_shape(&mut pixmap, obj, shape, t),
        }
    }

    if options.overlay {
        if let Some(obj) = scene.selected() {
            draw_selection_overlay(&mut pixmap, obj, base);
        }
    }

    Ok(pixmap_to_rgba(&pixmap))
}

fn draw_image(pixmap: &mut Pixmap, obj: &CanvasObject, image: &ImageObject, t: Transform) {
    let Some(src) = pixmap_from_rgba(&image.pixels) else { return; };
    let t = fit_bitmap(t, obj, image.natural_width, image.natural_height);
    pixmap.draw_pixmap(0, 0, src.as_ref(), &image_paint(obj.opacity), t, None);
}

fn draw_text(pixmap: &mut Pixmap, obj: &CanvasObject, text: &TextObject, t: Transform) {
    let Some(raster) = &text.raster else {
        debug!(id = %obj.id, "text has no raster yet, skipped");
        return;
    };
    let Some(src) = pixmap_from_rgba(raster) else { return; };
    let t = fit_bitmap(t, obj, raster.width(), raster.height());
    pixmap.draw_pixmap(0, 0, src.as_ref(), &image_paint(obj.opacity), t, None);
}

fn draw_shape(pixmap: &mut Pixmap, obj: &CanvasObject, shape: &ShapeObject, t: Transform) {
    let Some(path) = to_skia_path(&shape.path(obj.width, obj.height)) else { return; };
    let mut paint = Paint::default();
    paint.anti_alias = true;
    paint.set_color(sk_color(shape.fill, obj.opacity));
    pixmap.fill_path(&path, &paint, FillRule::Winding, t, None);

    if let Some(stroke_color) = shape.stroke.filter(|_| shape.stroke_width > 0.0) {
        paint.set_color(sk_color(stroke_color, obj.opacity));
        let stroke = Stroke { width: shape.stroke_width as f32, ..Stroke::default() };
        pixmap.stroke_path(&path, &paint, &stroke, t, None);
    }
}

/// Maps a `bw`x`bh` bitmap onto the object's centered local box.
fn fit_bitmap(t: Transform, obj: &CanvasObject, bw: u32, bh: u32) -> Transform {
    t.pre_translate((-obj.width / 2.0) as f32, (-obj.height / 2.0) as f32)
        .pre_scale((obj.width / bw.max(1) as f64) as f32, (obj.height / bh.max(1) as f64) as f32)
}

fn draw_selection_overlay(pixmap: &mut Pixmap, obj: &CanvasObject, base: Transform) {
    let (w, h) = obj.scaled_size();
    let frame = base.pre_concat(affine_to_transform(object_frame(obj)));

    let mut paint = Paint::default();
    paint.anti_alias = true;
    paint.set_color(sk_color(OVERLAY_COLOR, 1.0));
    let border = Stroke { width: 1.5, ..Stroke::default() };
    if let Some(rect) = tiny_skia::Rect::from_xywh((-w / 2.0) as f32, (-h / 2.0) as f32, w as f32, h as f32) {
        let path = PathBuilder::from_rect(rect);
        pixmap.stroke_path(&path, &paint, &border, frame, None);
    }

    let top = handle_position(obj, HandleType::Top);
    let rotate = handle_position(obj, HandleType::Rotate);
    let mut pb = PathBuilder::new();
    pb.move_to(top.x as f32, top.y as f32);
    pb.line_to(rotate.x as f32, rotate.y as f32);
    if let Some(line) = pb.finish() {
        pixmap.stroke_path(&line, &paint, &Stroke { width: 1.0, ..Stroke::default() }, base, None);
    }

    let mut fill = Paint::default();
    fill.anti_alias = true;
    fill.set_color(SkColor::WHITE);
    let outline = Stroke { width: 1.0, ..Stroke::default() };
    let half = (HANDLE_SIZE / 2.0) as f32;
    for (handle, p) in handle_positions(obj) {
        let path = if handle == HandleType::Rotate {
            PathBuilder::from_circle(p.x as f32, p.y as f32, half)
        } else {
            tiny_skia::Rect::from_xywh(p.x as f32 - half, p.y as f32 - half, half * 2.0, half * 2.0)
                .map(PathBuilder::from_rect)
        };
        if let Some(path) = path {
            pixmap.fill_path(&path, &fill, FillRule::Winding, base, None);
            pixmap.stroke_path(&path, &paint, &outline, base, None);
        }
    }
}

fn image_paint(opacity: f64) -> PixmapPaint {
    PixmapPaint {
        opacity: opacity.clamp(0.0, 1.0) as f32,
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    }
}

fn sk_color(c: Color, opacity: f64) -> SkColor {
    let a = (c.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
    SkColor::from_rgba8(c.r, c.g, c.b, a)
}

pub fn affine_to_transform(a: Affine) -> Transform {
    let [sx, ky, kx, sy, tx, ty] = a.as_coeffs();
    Transform::from_row(sx as f32, ky as f32, kx as f32, sy as f32, tx as f32, ty as f32)
}

pub fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => {
                pb.cubic_to(c1.x as f32, c1.y as f32, c2.x as f32, c2.y as f32, p.x as f32, p.y as f32)
            }
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

/// Straight-alpha RGBA into a premultiplied pixmap.
fn pixmap_from_rgba(img: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(img.width(), img.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use kurbo::Point;
    use crate::icons::IconKind;
    use crate::objects::TextStyle;
    use crate::scene::Fit;
    use crate::types::{CanvasSize, ObjectId};

    fn px(img: &RgbaImage, x: u32, y: u32) -> [u8; 4] {
        img.get_pixel(x, y).0
    }

    fn square(scene: &mut Scene, center: Point, size: f64, color: Color) -> ObjectId {
        let id = scene.allocate_id();
        // A circle icon still fills its center; corners of the box stay empty.
        scene.add_object(CanvasObject::new_shape(id, center, IconKind::Circle, size, color))
    }

    #[test]
    fn output_size_follows_scale() {
        let scene = Scene::default();
        let img = render(&scene, &RenderOptions { scale: 0.3, overlay: false }).unwrap();
        assert_eq!(img.dimensions(), (240, 180));
        assert_eq!(px(&img, 10, 10), [255, 255, 255, 255]);
    }

    #[test]
    fn later_objects_paint_over_earlier_ones() {
        let mut scene = Scene::new(CanvasSize::new(100.0, 100.0));
        square(&mut scene, Point::new(50.0, 50.0), 40.0, Color::rgb(255, 0, 0));
        let top = square(&mut scene, Point::new(50.0, 50.0), 40.0, Color::rgb(0, 0, 255));
        let img = render(&scene, &RenderOptions::default()).unwrap();
        assert_eq!(px(&img, 50, 50), [0, 0, 255, 255]);

        scene.send_backward(top);
        let img = render(&scene, &RenderOptions::default()).unwrap();
        assert_eq!(px(&img, 50, 50), [255, 0, 0, 255]);
    }

    #[test]
    fn background_is_painted_under_objects() {
        let mut scene = Scene::new(CanvasSize::new(100.0, 100.0));
        let bg = RgbaImage::from_pixel(50, 50, Rgba([0, 255, 0, 255]));
        scene.set_background(Arc::new(bg), Fit::new(100.0, 100.0));
        square(&mut scene, Point::new(50.0, 50.0), 20.0, Color::rgb(255, 0, 0));
        let img = render(&scene, &RenderOptions::default()).unwrap();
        assert_eq!(px(&img, 5, 5), [0, 255, 0, 255]);
        assert_eq!(px(&img, 50, 50), [255, 0, 0, 255]);
    }

    #[test]
    fn overlay_only_when_requested() {
        let mut scene = Scene::new(CanvasSize::new(200.0, 200.0));
        square(&mut scene, Point::new(100.0, 100.0), 100.0, Color::rgb(255, 0, 0));
        let plain = render(&scene, &RenderOptions::default()).unwrap();
        let editor = render(&scene, &RenderOptions::editor()).unwrap();
        // The border runs along y = 50, outside the circle.
        assert_eq!(px(&plain, 75, 50), [255, 255, 255, 255]);
        assert_ne!(px(&editor, 75, 50), [255, 255, 255, 255]);
        assert_ne!(plain.as_raw(), editor.as_raw());
    }

    #[test]
    fn text_without_raster_is_skipped_and_raster_is_drawn() {
        let mut scene = Scene::new(CanvasSize::new(100.0, 100.0));
        let id = scene.allocate_id();
        scene.add_object(CanvasObject::new_text(id, Point::new(50.0, 50.0), "hi", TextStyle::default()));
        let img = render(&scene, &RenderOptions::default()).unwrap();
        assert_eq!(px(&img, 50, 50), [255, 255, 255, 255]);

        scene.get_mut(id).unwrap().set_text_raster(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
        let img = render(&scene, &RenderOptions::default()).unwrap();
        assert_eq!(px(&img, 50, 50), [0, 0, 0, 255]);
    }

    #[test]
    fn image_objects_respect_scale() {
        let mut scene = Scene::new(CanvasSize::new(100.0, 100.0));
        let id = scene.allocate_id();
        let pixels = Arc::new(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255])));
        let mut obj = CanvasObject::new_image(id, Point::new(50.0, 50.0), pixels, None);
        obj.scale_x = 4.0;
        obj.scale_y = 4.0;
        scene.add_object(obj);
        let img = render(&scene, &RenderOptions::default()).unwrap();
        assert_eq!(px(&img, 35, 50), [0, 0, 255, 255]);
        assert_eq!(px(&img, 20, 50), [255, 255, 255, 255]);
    }

    #[test]
    fn affine_conversion_matches_kurbo() {
        let a = Affine::translate((10.0, 20.0)) * Affine::rotate(0.5) * Affine::scale_non_uniform(2.0, 3.0);
        let t = affine_to_transform(a);
        let p = a * Point::new(1.0, 1.0);
        let mut q = [tiny_skia::Point::from_xy(1.0, 1.0)];
        t.map_points(&mut q);
        assert!((q[0].x as f64 - p.x).abs() < 1e-3 && (q[0].y as f64 - p.y).abs() < 1e-3);
    }
}
