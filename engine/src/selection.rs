use kurbo::{Affine, Point};
use crate::objects::CanvasObject;
use crate::scene::Scene;
use crate::types::{HandleType, ObjectId};

pub const HANDLE_RADIUS: f64 = 6.0;
pub const HANDLE_SIZE: f64 = 8.0;
/// Distance of the rotate handle above the top edge.
pub const ROTATE_OFFSET: f64 = 30.0;

/// Translation and rotation of the object, without its scale.
pub fn object_frame(obj: &CanvasObject) -> Affine {
    Affine::translate(obj.center().to_vec2()) * Affine::rotate(obj.rotation.to_radians())
}

/// Handle position in the object's unscaled-rotation frame (origin at the center).
pub fn local_handle_position(obj: &CanvasObject, handle: HandleType) -> Point {
    let (w, h) = obj.scaled_size();
    let (ux, uy) = handle.unit_offset();
    let y = if handle == HandleType::Rotate { -h / 2.0 - ROTATE_OFFSET } else { uy * h / 2.0 };
    Point::new(ux * w / 2.0, y)
}

pub fn handle_position(obj: &CanvasObject, handle: HandleType) -> Point {
    object_frame(obj) * local_handle_position(obj, handle)
}

pub fn handle_positions(obj: &CanvasObject) -> Vec<(HandleType, Point)> {
    HandleType::SCALE_HANDLES.iter()
        .chain(std::iter::once(&HandleType::Rotate))
        .map(|&h| (h, handle_position(obj, h)))
        .collect()
}

/// Handle of the current selection under `p`, if any.
pub fn hit_test_handles(scene: &Scene, p: Point) -> Option<(ObjectId, HandleType)> {
    let obj = scene.selected()?;
    handle_positions(obj).into_iter()
        .find(|(_, hp)| hp.distance(p) <= HANDLE_RADIUS)
        .map(|(h, _)| (obj.id, h))
}
