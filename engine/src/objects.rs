use std::sync::Arc;
use serde::{Serialize, Deserialize};
use kurbo::{Affine, BezPath, Point, Rect, Vec2};
use image::RgbaImage;
use crate::types::{Color, FontStyle, FontWeight, ObjectId, TextAlign};
use crate::icons::IconKind;

/// Average glyph advance as a fraction of the font size, used until the host reports real metrics.
pub const TEXT_CHAR_ADVANCE: f64 = 0.6;
pub const TEXT_LINE_HEIGHT: f64 = 1.16;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f64,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub font_style: FontStyle,
    #[serde(default)]
    pub text_align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle {
            font_family: "Inter".to_string(),
            font_size: 32.0,
            fill: Color::WHITE,
            stroke: Color::BLACK,
            stroke_width: 2.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            text_align: TextAlign::Center,
        }
    }
}

/// Partial text attribute update; absent fields are left untouched.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct TextStylePatch {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f64>,
    pub font_weight: Option<FontWeight>,
    pub font_style: Option<FontStyle>,
    pub text_align: Option<TextAlign>,
}

#[derive(Serialize, Clone, Debug)]
pub struct TextObject {
    pub content: String,
    pub style: TextStyle,
    /// Whether `width`/`height` come from host-measured font metrics.
    pub measured: bool,
    #[serde(skip)]
    pub raster: Option<Arc<RgbaImage>>,
}

impl TextObject {
    /// Natural box from approximate metrics: longest line times the glyph advance, by line count.
    pub fn estimate_size(&self) -> (f64, f64) {
        let size = self.style.font_size;
        let lines: Vec<&str> = self.content.split('\n').collect();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0).max(1);
        (longest as f64 * size * TEXT_CHAR_ADVANCE, lines.len() as f64 * size * TEXT_LINE_HEIGHT)
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct ImageObject {
    pub natural_width: u32,
    pub natural_height: u32,
    pub source_url: Option<String>,
    #[serde(skip)]
    pub pixels: Arc<RgbaImage>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ShapeObject {
    pub icon: IconKind,
    pub fill: Color,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
}

impl ShapeObject {
    pub fn path(&self, width: f64, height: f64) -> BezPath {
        self.icon.shape().build_path(width, height)
    }
}

#[derive(Serialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectKind {
    Text(TextObject),
    Image(ImageObject),
    Shape(ShapeObject),
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Text(_) => "text",
            ObjectKind::Image(_) => "image",
            ObjectKind::Shape(_) => "shape",
        }
    }
}

/// A positioned drawable. `x`/`y` is the center of the object; `width`/`height`
/// are unscaled, so the on-canvas box is `width * scale_x` by `height * scale_y`.
#[derive(Serialize, Clone, Debug)]
pub struct CanvasObject {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation: f64, // in degrees
    pub opacity: f64,
    pub selectable: bool,
    pub evented: bool,
    pub kind: ObjectKind,
}

impl CanvasObject {
    fn with_kind(id: ObjectId, center: Point, width: f64, height: f64, kind: ObjectKind) -> Self {
        CanvasObject {
            id, x: center.x, y: center.y, width, height,
            scale_x: 1.0, scale_y: 1.0, rotation: 0.0, opacity: 1.0,
            selectable: true, evented: true, kind,
        }
    }

    pub fn new_text(id: ObjectId, center: Point, content: &str, style: TextStyle) -> Self {
        let text = TextObject { content: content.to_string(), style, measured: false, raster: None };
        let (w, h) = text.estimate_size();
        Self::with_kind(id, center, w, h, ObjectKind::Text(text))
    }

    pub fn new_image(id: ObjectId, center: Point, pixels: Arc<RgbaImage>, source_url: Option<String>) -> Self {
        let (w, h) = pixels.dimensions();
        let image = ImageObject { natural_width: w, natural_height: h, source_url, pixels };
        Self::with_kind(id, center, w as f64, h as f64, ObjectKind::Image(image))
    }

    pub fn new_shape(id: ObjectId, center: Point, icon: IconKind, size: f64, fill: Color) -> Self {
        let shape = ShapeObject { icon, fill, stroke: None, stroke_width: 0.0 };
        Self::with_kind(id, center, size, size, ObjectKind::Shape(shape))
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn scaled_size(&self) -> (f64, f64) {
        (self.width * self.scale_x, self.height * self.scale_y)
    }

    /// Local (origin-centered, unscaled) to world coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.center().to_vec2())
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    pub fn local_rect(&self) -> Rect {
        Rect::new(-self.width / 2.0, -self.height / 2.0, self.width / 2.0, self.height / 2.0)
    }

    /// Axis-aligned world bounds of the rotated, scaled box.
    pub fn bounds(&self) -> Rect {
        self.transform().transform_rect_bbox(self.local_rect())
    }

    pub fn contains(&self, p: Point) -> bool {
        let t = self.transform();
        if t.determinant().abs() < f64::EPSILON {
            return false;
        }
        let local = t.inverse() * p;
        let r = self.local_rect();
        local.x >= r.x0 && local.x <= r.x1 && local.y >= r.y0 && local.y <= r.y1
    }

    /// Copy with a fresh id and every attribute value-copied, moved by `offset`.
    pub fn duplicate(&self, id: ObjectId, offset: Vec2) -> CanvasObject {
        let mut copy = self.clone();
        copy.id = id;
        copy.x += offset.x;
        copy.y += offset.y;
        copy
    }

    pub fn as_text(&self) -> Option<&TextObject> {
        match &self.kind {
            ObjectKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.as_text().is_some()
    }

    /// Replaces the text content. Returns false for non-text objects.
    pub fn set_text_content(&mut self, content: &str) -> bool {
        let ObjectKind::Text(text) = &mut self.kind else { return false; };
        if text.content == content {
            return true;
        }
        text.content = content.to_string();
        self.invalidate_text_layout();
        true
    }

    pub fn apply_text_style(&mut self, patch: &TextStylePatch) -> bool {
        let ObjectKind::Text(text) = &mut self.kind else { return false; };
        let style = &mut text.style;
        if let Some(v) = &patch.font_family { style.font_family = v.clone(); }
        if let Some(v) = patch.font_size { style.font_size = v.max(1.0); }
        if let Some(v) = patch.fill { style.fill = v; }
        if let Some(v) = patch.stroke { style.stroke = v; }
        if let Some(v) = patch.stroke_width { style.stroke_width = v.max(0.0); }
        if let Some(v) = patch.font_weight { style.font_weight = v; }
        if let Some(v) = patch.font_style { style.font_style = v; }
        if let Some(v) = patch.text_align { style.text_align = v; }
        self.invalidate_text_layout();
        true
    }

    /// Host-measured natural size of a text object.
    pub fn set_text_metrics(&mut self, width: f64, height: f64) -> bool {
        let ObjectKind::Text(text) = &mut self.kind else { return false; };
        text.measured = true;
        self.width = width.max(1.0);
        self.height = height.max(1.0);
        true
    }

    pub fn set_text_raster(&mut self, raster: RgbaImage) -> bool {
        let ObjectKind::Text(text) = &mut self.kind else { return false; };
        text.raster = Some(Arc::new(raster));
        true
    }

    fn invalidate_text_layout(&mut self) {
        if let ObjectKind::Text(text) = &mut self.kind {
            text.raster = None;
            text.measured = false;
            let (w, h) = text.estimate_size();
            self.width = w;
            self.height = h;
        }
    }
}
