use serde::Serialize;
use kurbo::{Point, Vec2};
use tracing::debug;
use crate::selection::{hit_test_handles, object_frame};
use crate::session::EditorSession;
use crate::types::{HandleType, Key, Modifiers, ObjectId};

/// Smallest scale factor a resize can reach on either axis.
pub const MIN_SCALE: f64 = 0.01;

/// Something the host has to react to after an input event.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    RenderNeeded,
    SelectionChanged { id: Option<ObjectId> },
    ObjectAdded { id: ObjectId },
    ObjectRemoved { id: ObjectId },
    ObjectModified { id: ObjectId },
    /// Show the in-place editor over this text object.
    TextEditRequested { id: ObjectId },
    TextEditFinished { id: ObjectId },
    /// Content or style changed; the host should re-measure and re-rasterize the text.
    TextLayoutNeeded { id: ObjectId },
    Copied { id: ObjectId },
    /// A new background changed the canvas dimensions.
    CanvasResized { width: f64, height: f64 },
}

/// Geometry captured when a resize gesture starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeStart {
    /// World position of the handle opposite to the grabbed one.
    pub anchor: Point,
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionState {
    Idle,
    Selected(ObjectId),
    Dragging { id: ObjectId, last: Point },
    Resizing { id: ObjectId, handle: HandleType, start: ResizeStart, changed: bool },
    Rotating { id: ObjectId, center: Point, changed: bool },
    TextEditing { id: ObjectId, recorded: bool },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Selected(_) => "selected",
            InteractionState::Dragging { .. } => "dragging",
            InteractionState::Resizing { .. } => "resizing",
            InteractionState::Rotating { .. } => "rotating",
            InteractionState::TextEditing { .. } => "text_editing",
        }
    }
}

impl EditorSession {
    pub fn pointer_down(&mut self, p: Point) -> Vec<Action> {
        if !self.is_alive() {
            return Vec::new();
        }
        let mut actions = self.finish_text_editing();
        self.pending_drag = None;

        if let Some((id, handle)) = hit_test_handles(&self.scene, p) {
            let Some(obj) = self.scene.get(id) else { return actions; };
            self.state = if handle == HandleType::Rotate {
                InteractionState::Rotating { id, center: obj.center(), changed: false }
            } else {
                let (ux, uy) = handle.unit_offset();
                let (w, h) = obj.scaled_size();
                let anchor = object_frame(obj) * Point::new(-ux * w / 2.0, -uy * h / 2.0);
                let start = ResizeStart {
                    anchor,
                    width: obj.width,
                    height: obj.height,
                    scale_x: obj.scale_x,
                    scale_y: obj.scale_y,
                    rotation: obj.rotation,
                };
                InteractionState::Resizing { id, handle, start, changed: false }
            };
            debug!(%id, ?handle, state = self.state.name(), "handle grabbed");
            return actions;
        }

        let hit = self.scene.hit_test(p)
            .filter(|id| self.scene.get(*id).map_or(false, |o| o.selectable));
        match hit {
            Some(id) => {
                if self.scene.select(Some(id)) {
                    actions.push(Action::SelectionChanged { id: Some(id) });
                    actions.push(Action::RenderNeeded);
                }
                self.state = InteractionState::Selected(id);
                self.pending_drag = Some(p);
            }
            None => {
                if self.scene.select(None) {
                    actions.push(Action::SelectionChanged { id: None });
                    actions.push(Action::RenderNeeded);
                }
                self.state = InteractionState::Idle;
            }
        }
        actions
    }

    pub fn pointer_move(&mut self, p: Point) -> Vec<Action> {
        if !self.is_alive() {
            return Vec::new();
        }
        if let (InteractionState::Selected(id), Some(origin)) = (self.state.clone(), self.pending_drag) {
            if origin == p {
                return Vec::new();
            }
            self.pending_drag = None;
            self.record("Move");
            self.state = InteractionState::Dragging { id, last: origin };
        }

        match self.state.clone() {
            InteractionState::Dragging { id, last } => {
                let Some(obj) = self.scene.get_mut(id) else { return self.lose_target(id); };
                let delta = p - last;
                obj.x += delta.x;
                obj.y += delta.y;
                self.state = InteractionState::Dragging { id, last: p };
                vec![Action::RenderNeeded]
            }
            InteractionState::Resizing { id, handle, start, changed } => {
                if self.scene.get(id).is_none() {
                    return self.lose_target(id);
                }
                if !changed {
                    self.record("Resize");
                }
                if let Some(obj) = self.scene.get_mut(id) {
                    let (scale_x, scale_y, center) = resize_geometry(handle, &start, p);
                    obj.scale_x = scale_x;
                    obj.scale_y = scale_y;
                    obj.x = center.x;
                    obj.y = center.y;
                }
                self.state = InteractionState::Resizing { id, handle, start, changed: true };
                vec![Action::RenderNeeded]
            }
            InteractionState::Rotating { id, center, changed } => {
                if self.scene.get(id).is_none() {
                    return self.lose_target(id);
                }
                if !changed {
                    self.record("Rotate");
                }
                if let Some(obj) = self.scene.get_mut(id) {
                    obj.rotation = rotation_towards(center, p);
                }
                self.state = InteractionState::Rotating { id, center, changed: true };
                vec![Action::RenderNeeded]
            }
            _ => Vec::new(),
        }
    }

    pub fn pointer_up(&mut self, _p: Point) -> Vec<Action> {
        self.pending_drag = None;
        let (id, changed) = match self.state {
            InteractionState::Dragging { id, .. } => (id, true),
            InteractionState::Resizing { id, changed, .. } | InteractionState::Rotating { id, changed, .. } => (id, changed),
            _ => return Vec::new(),
        };
        self.state = InteractionState::Selected(id);
        if changed { vec![Action::ObjectModified { id }] } else { Vec::new() }
    }

    /// Double-clicking a text object opens it for in-place editing.
    pub fn double_click(&mut self, p: Point) -> Vec<Action> {
        if !self.is_alive() {
            return Vec::new();
        }
        let Some(id) = self.scene.hit_test(p) else { return Vec::new(); };
        if !self.scene.get(id).map_or(false, |o| o.is_text() && o.selectable) {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if let InteractionState::TextEditing { id: current, .. } = self.state {
            if current == id {
                return actions;
            }
            actions.extend(self.finish_text_editing());
        }
        if self.scene.select(Some(id)) {
            actions.push(Action::SelectionChanged { id: Some(id) });
        }
        self.pending_drag = None;
        self.state = InteractionState::TextEditing { id, recorded: false };
        debug!(%id, "text editing started");
        actions.push(Action::TextEditRequested { id });
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Live content update from the host's text editor. One history entry per editing pass.
    pub fn text_input(&mut self, content: &str) -> Vec<Action> {
        let InteractionState::TextEditing { id, recorded } = self.state else { return Vec::new(); };
        let unchanged = match self.scene.get(id).and_then(|o| o.as_text()) {
            Some(text) => text.content == content,
            None => return self.lose_target(id),
        };
        if unchanged {
            return Vec::new();
        }
        if !recorded {
            self.record("Edit Text");
            self.state = InteractionState::TextEditing { id, recorded: true };
        }
        if let Some(obj) = self.scene.get_mut(id) {
            obj.set_text_content(content);
        }
        vec![Action::TextLayoutNeeded { id }, Action::RenderNeeded]
    }

    pub fn key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if !self.is_alive() {
            return Vec::new();
        }
        if matches!(self.state, InteractionState::TextEditing { .. }) {
            return if *key == Key::Escape { self.finish_text_editing() } else { Vec::new() };
        }
        let shortcut = modifiers.platform();
        match key {
            Key::Delete | Key::Backspace => self.delete_selected(),
            Key::Escape => self.select(None),
            Key::Char('c') if shortcut => self.copy_selected(),
            Key::Char('v') if shortcut => self.paste(),
            Key::Char('z') if shortcut && modifiers.shift => self.redo(),
            Key::Char('z') if shortcut => self.undo(),
            Key::Char('y') if shortcut => self.redo(),
            _ => Vec::new(),
        }
    }

    pub fn copy_selected(&mut self) -> Vec<Action> {
        let Some(obj) = self.scene.selected() else { return Vec::new(); };
        let id = obj.id;
        self.clipboard.copy(obj);
        debug!(%id, "copied to clipboard");
        vec![Action::Copied { id }]
    }

    /// Adds a fresh copy of the clipboard content, offset from where it was copied.
    pub fn paste(&mut self) -> Vec<Action> {
        if !self.is_alive() || self.clipboard.is_empty() {
            return Vec::new();
        }
        let id = self.scene.allocate_id();
        let offset: Vec2 = self.config().paste_offset();
        match self.clipboard.paste(id, offset) {
            Some(obj) => self.insert(obj, "Paste"),
            None => Vec::new(),
        }
    }

    pub(crate) fn finish_text_editing(&mut self) -> Vec<Action> {
        let InteractionState::TextEditing { id, .. } = self.state else { return Vec::new(); };
        self.state = if self.scene.get(id).is_some() {
            InteractionState::Selected(id)
        } else {
            InteractionState::Idle
        };
        debug!(%id, "text editing finished");
        vec![Action::TextEditFinished { id }, Action::RenderNeeded]
    }

    /// The gesture target vanished under us; drop back to whatever the scene says.
    fn lose_target(&mut self, id: ObjectId) -> Vec<Action> {
        debug!(%id, "gesture target no longer in scene");
        self.pending_drag = None;
        self.state = match self.scene.selection() {
            Some(sel) => InteractionState::Selected(sel),
            None => InteractionState::Idle,
        };
        Vec::new()
    }
}

/// New scale factors and center for a resize from `start` with the grabbed handle at `p`.
/// Corner handles keep the aspect ratio; edge handles change one axis.
pub fn resize_geometry(handle: HandleType, start: &ResizeStart, p: Point) -> (f64, f64, Point) {
    let (ux, uy) = handle.unit_offset();
    let (sin, cos) = start.rotation.to_radians().sin_cos();
    let d = p - start.anchor;
    let local = Vec2::new(d.x * cos + d.y * sin, -d.x * sin + d.y * cos);

    let start_w = start.width * start.scale_x;
    let start_h = start.height * start.scale_y;
    let mut fx = if ux != 0.0 && start_w > 0.0 { local.x * ux / start_w } else { 1.0 };
    let mut fy = if uy != 0.0 && start_h > 0.0 { local.y * uy / start_h } else { 1.0 };
    if handle.is_corner() {
        let f = fx.max(fy);
        fx = f;
        fy = f;
    }
    let scale_x = (start.scale_x * fx).max(MIN_SCALE);
    let scale_y = (start.scale_y * fy).max(MIN_SCALE);

    let half = Vec2::new(ux * start.width * scale_x / 2.0, uy * start.height * scale_y / 2.0);
    let rotated = Vec2::new(half.x * cos - half.y * sin, half.x * sin + half.y * cos);
    (scale_x, scale_y, start.anchor + rotated)
}

/// Rotation in degrees that points the top edge of an object at `center` towards `p`.
pub fn rotation_towards(center: Point, p: Point) -> f64 {
    let d = p - center;
    (d.y.atan2(d.x).to_degrees() + 90.0).rem_euclid(360.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::IconKind;
    use crate::selection::handle_position;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn session_with_icon() -> (EditorSession, ObjectId) {
        let mut session = EditorSession::default();
        session.add_icon(IconKind::Circle, Some(100.0), None);
        let id = session.scene().selection().unwrap();
        (session, id)
    }

    fn ctrl() -> Modifiers {
        Modifiers { ctrl: true, ..Default::default() }
    }

    #[test]
    fn click_selects_and_empty_click_deselects() {
        let (mut session, id) = session_with_icon();
        session.select(None);
        let actions = session.pointer_down(Point::new(400.0, 300.0));
        assert!(actions.contains(&Action::SelectionChanged { id: Some(id) }));
        assert_eq!(session.state(), &InteractionState::Selected(id));
        session.pointer_up(Point::new(400.0, 300.0));

        let actions = session.pointer_down(Point::new(10.0, 10.0));
        assert!(actions.contains(&Action::SelectionChanged { id: None }));
        assert_eq!(session.state(), &InteractionState::Idle);
        assert!(!session.scene().has_selection());
    }

    #[test]
    fn drag_moves_by_pointer_delta() {
        let (mut session, id) = session_with_icon();
        session.pointer_down(Point::new(400.0, 300.0));
        assert!(session.pointer_move(Point::new(400.0, 300.0)).is_empty());
        session.pointer_move(Point::new(420.0, 310.0));
        assert!(matches!(session.state(), InteractionState::Dragging { .. }));
        session.pointer_move(Point::new(430.0, 290.0));
        let actions = session.pointer_up(Point::new(430.0, 290.0));
        assert_eq!(actions, vec![Action::ObjectModified { id }]);
        assert_eq!(session.scene().get(id).unwrap().center(), Point::new(430.0, 290.0));
        assert_eq!(session.state(), &InteractionState::Selected(id));
    }

    #[test]
    fn click_without_move_records_no_history() {
        let (mut session, _) = session_with_icon();
        let before = session.history().action_names().len();
        session.pointer_down(Point::new(400.0, 300.0));
        assert!(session.pointer_up(Point::new(400.0, 300.0)).is_empty());
        assert_eq!(session.history().action_names().len(), before);
    }

    #[test]
    fn corner_resize_keeps_aspect_from_opposite_corner() {
        let (mut session, id) = session_with_icon();
        let obj = session.scene().get(id).unwrap();
        let grab = handle_position(obj, HandleType::BottomRight);
        assert_eq!(grab, Point::new(450.0, 350.0));
        session.pointer_down(grab);
        assert!(matches!(session.state(), InteractionState::Resizing { .. }));
        session.pointer_move(Point::new(550.0, 380.0));
        session.pointer_up(Point::new(550.0, 380.0));
        let obj = session.scene().get(id).unwrap();
        assert!(close(obj.scale_x, 2.0) && close(obj.scale_y, 2.0));
        // Top-left corner stays put.
        assert!(close(obj.x, 450.0) && close(obj.y, 350.0));
    }

    #[test]
    fn edge_resize_changes_one_axis() {
        let (mut session, id) = session_with_icon();
        session.pointer_down(Point::new(450.0, 300.0));
        session.pointer_move(Point::new(500.0, 330.0));
        let obj = session.scene().get(id).unwrap();
        assert!(close(obj.scale_x, 1.5) && close(obj.scale_y, 1.0));
        assert!(close(obj.x, 425.0) && close(obj.y, 300.0));
    }

    #[test]
    fn resize_never_collapses_below_minimum() {
        let (mut session, id) = session_with_icon();
        session.pointer_down(Point::new(450.0, 300.0));
        session.pointer_move(Point::new(100.0, 300.0));
        let obj = session.scene().get(id).unwrap();
        assert!(close(obj.scale_x, MIN_SCALE));
    }

    #[test]
    fn resize_respects_rotation() {
        let start = ResizeStart { anchor: Point::new(0.0, 0.0), width: 10.0, height: 10.0, scale_x: 1.0, scale_y: 1.0, rotation: 90.0 };
        // Rotated 90 degrees, the object's +x axis points down the screen.
        let (sx, sy, center) = resize_geometry(HandleType::Right, &start, Point::new(0.0, 20.0));
        assert!(close(sx, 2.0) && close(sy, 1.0));
        assert!(close(center.x, 0.0) && close(center.y, 10.0));
    }

    #[test]
    fn rotate_handle_points_top_edge_at_pointer() {
        let (mut session, id) = session_with_icon();
        session.pointer_down(Point::new(400.0, 220.0));
        assert!(matches!(session.state(), InteractionState::Rotating { .. }));
        session.pointer_move(Point::new(500.0, 300.0));
        assert!(close(session.scene().get(id).unwrap().rotation, 90.0));
        session.pointer_move(Point::new(300.0, 300.0));
        assert!(close(session.scene().get(id).unwrap().rotation, 270.0));
        let actions = session.pointer_up(Point::new(300.0, 300.0));
        assert_eq!(actions, vec![Action::ObjectModified { id }]);
    }

    #[test]
    fn rotation_is_normalized() {
        let c = Point::ORIGIN;
        assert!(close(rotation_towards(c, Point::new(0.0, -1.0)), 0.0));
        assert!(close(rotation_towards(c, Point::new(0.0, 1.0)), 180.0));
        assert!(close(rotation_towards(c, Point::new(-1.0, -1.0)), 315.0));
    }

    #[test]
    fn text_editing_round_trip() {
        let mut session = EditorSession::default();
        session.add_text(Some("hello"), None);
        let id = session.scene().selection().unwrap();
        let actions = session.double_click(Point::new(400.0, 300.0));
        assert!(actions.contains(&Action::TextEditRequested { id }));
        session.text_input("hello w");
        session.text_input("hello world");
        assert_eq!(session.scene().get(id).unwrap().as_text().unwrap().content, "hello world");
        // Keys other than Escape belong to the text editor.
        assert!(session.key_down(&Key::Delete, Modifiers::default()).is_empty());
        assert_eq!(session.scene().len(), 1);
        let actions = session.key_down(&Key::Escape, Modifiers::default());
        assert!(actions.contains(&Action::TextEditFinished { id }));
        assert_eq!(session.state(), &InteractionState::Selected(id));
        // The whole pass undoes as one step.
        session.undo();
        assert_eq!(session.scene().get(id).unwrap().as_text().unwrap().content, "hello");
    }

    #[test]
    fn click_exits_text_editing() {
        let mut session = EditorSession::default();
        session.add_text(Some("hello"), None);
        let id = session.scene().selection().unwrap();
        session.double_click(Point::new(400.0, 300.0));
        let actions = session.pointer_down(Point::new(5.0, 5.0));
        assert!(actions.contains(&Action::TextEditFinished { id }));
        assert_eq!(session.state(), &InteractionState::Idle);
    }

    #[test]
    fn double_click_on_icon_does_nothing() {
        let (mut session, _) = session_with_icon();
        assert!(session.double_click(Point::new(400.0, 300.0)).is_empty());
    }

    #[test]
    fn delete_key_removes_selection() {
        let (mut session, id) = session_with_icon();
        let actions = session.key_down(&Key::Backspace, Modifiers::default());
        assert!(actions.contains(&Action::ObjectRemoved { id }));
        assert!(session.scene().is_empty());
        assert_eq!(session.state(), &InteractionState::Idle);
        assert!(session.key_down(&Key::Delete, Modifiers::default()).is_empty());
    }

    #[test]
    fn copy_paste_offsets_from_copy_position() {
        let (mut session, id) = session_with_icon();
        assert!(session.key_down(&Key::Char('v'), ctrl()).is_empty());
        session.key_down(&Key::Char('c'), ctrl());
        session.scene.get_mut(id).unwrap().x = 100.0;
        session.key_down(&Key::Char('v'), Modifiers { meta: true, ..Default::default() });
        let first = session.scene().selected().unwrap().clone();
        assert_ne!(first.id, id);
        assert_eq!(first.center(), Point::new(410.0, 310.0));
        session.key_down(&Key::Char('v'), ctrl());
        let second = session.scene().selected().unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.center(), first.center());
        assert_eq!(session.scene().len(), 3);
    }

    #[test]
    fn plain_letters_are_not_shortcuts() {
        let (mut session, _) = session_with_icon();
        assert!(session.key_down(&Key::Char('c'), Modifiers::default()).is_empty());
        assert!(session.clipboard().is_empty());
    }

    #[test]
    fn undo_and_redo_shortcuts() {
        let (mut session, id) = session_with_icon();
        session.key_down(&Key::Delete, Modifiers::default());
        session.key_down(&Key::Char('z'), ctrl());
        assert!(session.scene().get(id).is_some());
        session.key_down(&Key::Char('z'), Modifiers { ctrl: true, shift: true, ..Default::default() });
        assert!(session.scene().get(id).is_none());
        session.key_down(&Key::Char('z'), ctrl());
        session.key_down(&Key::Char('y'), ctrl());
        assert!(session.scene().is_empty());
    }

    #[test]
    fn escape_deselects() {
        let (mut session, _) = session_with_icon();
        let actions = session.key_down(&Key::Escape, Modifiers::default());
        assert!(actions.contains(&Action::SelectionChanged { id: None }));
        assert_eq!(session.state(), &InteractionState::Idle);
    }

    #[test]
    fn drag_of_removed_object_is_a_no_op() {
        let (mut session, id) = session_with_icon();
        session.pointer_down(Point::new(400.0, 300.0));
        session.pointer_move(Point::new(410.0, 300.0));
        session.scene.remove_object(id);
        assert!(session.pointer_move(Point::new(420.0, 300.0)).is_empty());
        assert_eq!(session.state(), &InteractionState::Idle);
    }

    #[test]
    fn actions_serialize_with_type_tag() {
        let json = serde_json::to_string(&Action::SelectionChanged { id: Some(ObjectId(3)) }).unwrap();
        assert_eq!(json, r#"{"type":"selection_changed","id":3}"#);
        let json = serde_json::to_string(&Action::RenderNeeded).unwrap();
        assert_eq!(json, r#"{"type":"render_needed"}"#);
    }
}
