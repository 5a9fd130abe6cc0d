use std::sync::Arc;
use serde::{Serialize, Deserialize};
use kurbo::{Point, Vec2};
use image::RgbaImage;
use tracing::debug;
use crate::objects::CanvasObject;
use crate::types::{CanvasSize, Color, ObjectId};

/// Bounding box a background image is fitted into.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Fit {
    pub max_width: f64,
    pub max_height: f64,
    /// When false, images smaller than the box keep their natural size.
    pub allow_upscale: bool,
}

impl Fit {
    pub fn new(max_width: f64, max_height: f64) -> Self {
        Fit { max_width, max_height, allow_upscale: true }
    }

    pub fn no_upscale(self) -> Self {
        Fit { allow_upscale: false, ..self }
    }

    pub fn scale_for(&self, width: f64, height: f64) -> f64 {
        let scale = (self.max_width / width.max(1.0)).min(self.max_height / height.max(1.0));
        if self.allow_upscale { scale } else { scale.min(1.0) }
    }
}

impl Default for Fit {
    fn default() -> Self {
        Fit::new(800.0, 600.0)
    }
}

/// The backdrop image. Painted before every object and never part of the z-order.
#[derive(Clone, Debug)]
pub struct Background {
    pub pixels: Arc<RgbaImage>,
    pub scale: f64,
    pub offset: Vec2,
}

impl Background {
    pub fn natural_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

#[derive(Clone, Debug)]
pub struct Scene {
    objects: Vec<CanvasObject>,
    background: Option<Background>,
    background_color: Color,
    selection: Option<ObjectId>,
    canvas_size: CanvasSize,
    next_id: u32,
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new(CanvasSize::default())
    }
}

impl Scene {
    pub fn new(canvas_size: CanvasSize) -> Self {
        Scene {
            objects: Vec::new(),
            background: None,
            background_color: Color::WHITE,
            selection: None,
            canvas_size,
            next_id: 1,
        }
    }

    pub fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Keeps ids monotonic when this scene replaces `other` (undo/redo).
    pub(crate) fn inherit_id_counter(&mut self, other: &Scene) {
        self.next_id = self.next_id.max(other.next_id);
    }

    /// Appends `obj` as the topmost object and selects it.
    pub fn add_object(&mut self, mut obj: CanvasObject) -> ObjectId {
        if obj.id.0 >= self.next_id {
            self.next_id = obj.id.0 + 1;
        } else if self.index_of(obj.id).is_some() {
            obj.id = self.allocate_id();
        }
        let id = obj.id;
        self.objects.push(obj);
        self.selection = Some(id);
        id
    }

    /// Removes by id. Unknown ids are ignored.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<CanvasObject> {
        let Some(index) = self.index_of(id) else {
            debug!(%id, "remove_object: no such object");
            return None;
        };
        if self.selection == Some(id) {
            self.selection = None;
        }
        Some(self.objects.remove(index))
    }

    /// Replaces the background and resizes the canvas to the fitted image.
    pub fn set_background(&mut self, pixels: Arc<RgbaImage>, fit: Fit) -> CanvasSize {
        let (w, h) = pixels.dimensions();
        let scale = fit.scale_for(w as f64, h as f64);
        self.canvas_size = CanvasSize::new(w as f64 * scale, h as f64 * scale);
        self.background = Some(Background { pixels, scale, offset: Vec2::ZERO });
        self.canvas_size
    }

    pub fn clear_background(&mut self) {
        self.background = None;
    }

    pub fn bring_forward(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(i) if i + 1 < self.objects.len() => {
                self.objects.swap(i, i + 1);
                true
            }
            _ => false,
        }
    }

    pub fn send_backward(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(i) if i > 0 => {
                self.objects.swap(i, i - 1);
                true
            }
            _ => false,
        }
    }

    /// Sets or clears the selection. Returns whether the selection changed.
    pub fn select(&mut self, id: Option<ObjectId>) -> bool {
        let target = match id {
            Some(id) => match self.get(id) {
                Some(obj) if obj.selectable => Some(id),
                _ => {
                    debug!(%id, "select: missing or unselectable object");
                    return false;
                }
            },
            None => None,
        };
        let changed = self.selection != target;
        self.selection = target;
        changed
    }

    /// Topmost evented object under `p`.
    pub fn hit_test(&self, p: Point) -> Option<ObjectId> {
        self.objects.iter().rev().find(|o| o.evented && o.contains(p)).map(|o| o.id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&CanvasObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut CanvasObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    pub fn objects(&self) -> &[CanvasObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    pub fn selected(&self) -> Option<&CanvasObject> {
        self.selection.and_then(|id| self.get(id))
    }

    pub fn selected_mut(&mut self) -> Option<&mut CanvasObject> {
        let id = self.selection?;
        self.get_mut(id)
    }

    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn background_color(&self) -> Color {
        self.background_color
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background_color = color;
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas_size
    }

    pub fn center(&self) -> Point {
        self.canvas_size.center()
    }

    /// Drops every object and the background; the canvas keeps its size.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.background = None;
        self.selection = None;
    }
}
