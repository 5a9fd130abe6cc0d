use kurbo::Vec2;
use crate::objects::CanvasObject;
use crate::types::ObjectId;

/// Single-slot clipboard holding a detached copy of one object.
#[derive(Clone, Debug, Default)]
pub struct Clipboard {
    slot: Option<CanvasObject>,
}

impl Clipboard {
    pub fn new() -> Self {
        Clipboard::default()
    }

    /// Stores a deep copy of `obj`, replacing whatever was held before.
    pub fn copy(&mut self, obj: &CanvasObject) {
        self.slot = Some(obj.clone());
    }

    /// A new object built from the stored copy, or `None` when empty.
    /// The stored copy itself is left as it was.
    pub fn paste(&self, id: ObjectId, offset: Vec2) -> Option<CanvasObject> {
        self.slot.as_ref().map(|obj| {
            let mut pasted = obj.duplicate(id, offset);
            pasted.evented = true;
            pasted
        })
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    pub fn peek(&self) -> Option<&CanvasObject> {
        self.slot.as_ref()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}
