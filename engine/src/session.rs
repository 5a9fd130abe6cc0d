use std::sync::Arc;
use image::RgbaImage;
use kurbo::Point;
use tracing::{debug, info};
use crate::clipboard::Clipboard;
use crate::config::EditorConfig;
use crate::controller::{Action, InteractionState};
use crate::history::History;
use crate::icons::IconKind;
use crate::objects::{CanvasObject, TextStyle, TextStylePatch};
use crate::scene::Scene;
use crate::types::{Color, ObjectId};

/// One editing session: the scene plus everything that edits it.
pub struct EditorSession {
    pub(crate) scene: Scene,
    pub(crate) state: InteractionState,
    /// Pointer-down position on the selected body; a drag starts on the first move.
    pub(crate) pending_drag: Option<Point>,
    pub(crate) clipboard: Clipboard,
    pub(crate) history: History,
    pub(crate) load_generation: u64,
    config: EditorConfig,
    alive: bool,
}

impl Default for EditorSession {
    fn default() -> Self {
        EditorSession::new(EditorConfig::default())
    }
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        EditorSession {
            scene: Scene::new(config.max_canvas),
            state: InteractionState::Idle,
            pending_drag: None,
            clipboard: Clipboard::new(),
            history: History::new(config.history_limit),
            load_generation: 0,
            config,
            alive: true,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Tears the session down. Later events and load completions are ignored.
    pub fn dispose(&mut self) {
        info!("disposing editor session");
        self.alive = false;
        self.scene.clear();
        self.clipboard.clear();
        self.history.clear();
        self.state = InteractionState::Idle;
        self.pending_drag = None;
    }

    pub(crate) fn record(&mut self, action_name: &str) {
        self.history.record(&self.scene, action_name);
    }

    pub(crate) fn insert(&mut self, obj: CanvasObject, action_name: &str) -> Vec<Action> {
        self.record(action_name);
        let id = self.scene.add_object(obj);
        debug!(%id, action_name, "object added");
        self.state = InteractionState::Selected(id);
        self.pending_drag = None;
        vec![Action::ObjectAdded { id }, Action::SelectionChanged { id: Some(id) }, Action::RenderNeeded]
    }

    /// Adds a text object at the canvas center, using the configured defaults for anything omitted.
    pub fn add_text(&mut self, content: Option<&str>, style: Option<TextStyle>) -> Vec<Action> {
        if !self.alive {
            return Vec::new();
        }
        let content = content.unwrap_or(&self.config.default_text_content).to_string();
        let style = style.unwrap_or_else(|| self.config.default_text.clone());
        let id = self.scene.allocate_id();
        let obj = CanvasObject::new_text(id, self.scene.center(), &content, style);
        let mut actions = self.insert(obj, "Add Text");
        actions.push(Action::TextLayoutNeeded { id });
        actions
    }

    pub fn add_icon(&mut self, kind: IconKind, size: Option<f64>, color: Option<Color>) -> Vec<Action> {
        if !self.alive {
            return Vec::new();
        }
        let size = size.unwrap_or(self.config.default_icon_size).max(1.0);
        let color = color.unwrap_or(self.config.default_icon_color);
        let id = self.scene.allocate_id();
        let obj = CanvasObject::new_shape(id, self.scene.center(), kind, size, color);
        self.insert(obj, "Add Icon")
    }

    /// Adds a bitmap as a movable object, shrunk to fit the canvas if needed.
    pub fn add_image_object(&mut self, pixels: Arc<RgbaImage>, source_url: Option<String>) -> Vec<Action> {
        if !self.alive {
            return Vec::new();
        }
        let id = self.scene.allocate_id();
        let mut obj = CanvasObject::new_image(id, self.scene.center(), pixels, source_url);
        let size = self.scene.canvas_size();
        let scale = (size.width / obj.width.max(1.0)).min(size.height / obj.height.max(1.0)).min(1.0);
        obj.scale_x = scale;
        obj.scale_y = scale;
        self.insert(obj, "Add Image")
    }

    pub fn select(&mut self, id: Option<ObjectId>) -> Vec<Action> {
        if !self.alive || !self.scene.select(id) {
            return Vec::new();
        }
        self.state = match self.scene.selection() {
            Some(id) => InteractionState::Selected(id),
            None => InteractionState::Idle,
        };
        self.pending_drag = None;
        vec![Action::SelectionChanged { id: self.scene.selection() }, Action::RenderNeeded]
    }

    pub fn remove(&mut self, id: ObjectId) -> Vec<Action> {
        if !self.alive || self.scene.get(id).is_none() {
            debug!(%id, "remove: no such object");
            return Vec::new();
        }
        let was_selected = self.scene.selection() == Some(id);
        self.record("Delete");
        self.scene.remove_object(id);
        let mut actions = vec![Action::ObjectRemoved { id }];
        if was_selected {
            self.state = InteractionState::Idle;
            self.pending_drag = None;
            actions.push(Action::SelectionChanged { id: None });
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn delete_selected(&mut self) -> Vec<Action> {
        match self.scene.selection() {
            Some(id) => self.remove(id),
            None => Vec::new(),
        }
    }

    /// Copies the selection next to itself. The clipboard is left alone.
    pub fn duplicate_selected(&mut self) -> Vec<Action> {
        if !self.alive {
            return Vec::new();
        }
        let Some(source) = self.scene.selected().cloned() else { return Vec::new(); };
        let id = self.scene.allocate_id();
        let copy = source.duplicate(id, self.config.paste_offset());
        self.insert(copy, "Duplicate")
    }

    pub fn bring_forward_selected(&mut self) -> Vec<Action> {
        self.reorder_selected("Bring Forward", Scene::bring_forward)
    }

    pub fn send_backward_selected(&mut self) -> Vec<Action> {
        self.reorder_selected("Send Backward", Scene::send_backward)
    }

    fn reorder_selected(&mut self, action_name: &str, step: fn(&mut Scene, ObjectId) -> bool) -> Vec<Action> {
        if !self.alive {
            return Vec::new();
        }
        let Some(id) = self.scene.selection() else { return Vec::new(); };
        let before = self.scene.clone();
        if !step(&mut self.scene, id) {
            return Vec::new();
        }
        self.history.record(&before, action_name);
        vec![Action::ObjectModified { id }, Action::RenderNeeded]
    }

    pub fn set_text_content(&mut self, id: ObjectId, content: &str) -> Vec<Action> {
        if !self.alive {
            return Vec::new();
        }
        let unchanged = match self.scene.get(id).and_then(|o| o.as_text()) {
            Some(text) => text.content == content,
            None => {
                debug!(%id, "set_text_content: no such text object");
                return Vec::new();
            }
        };
        if unchanged {
            return Vec::new();
        }
        self.record("Edit Text");
        if let Some(obj) = self.scene.get_mut(id) {
            obj.set_text_content(content);
        }
        vec![Action::ObjectModified { id }, Action::TextLayoutNeeded { id }, Action::RenderNeeded]
    }

    pub fn update_text_style(&mut self, id: ObjectId, patch: &TextStylePatch) -> Vec<Action> {
        if !self.alive || !self.scene.get(id).map_or(false, CanvasObject::is_text) {
            debug!(%id, "update_text_style: no such text object");
            return Vec::new();
        }
        self.record("Text Style");
        if let Some(obj) = self.scene.get_mut(id) {
            obj.apply_text_style(patch);
        }
        vec![Action::ObjectModified { id }, Action::TextLayoutNeeded { id }, Action::RenderNeeded]
    }

    /// Host-measured font metrics. Layout feedback, not an undoable edit.
    pub fn set_text_metrics(&mut self, id: ObjectId, width: f64, height: f64) -> Vec<Action> {
        if !self.alive {
            return Vec::new();
        }
        match self.scene.get_mut(id) {
            Some(obj) if obj.is_text() => {
                obj.set_text_metrics(width, height);
                vec![Action::RenderNeeded]
            }
            _ => Vec::new(),
        }
    }

    pub fn set_text_raster(&mut self, id: ObjectId, raster: RgbaImage) -> Vec<Action> {
        if !self.alive {
            return Vec::new();
        }
        match self.scene.get_mut(id) {
            Some(obj) if obj.is_text() => {
                obj.set_text_raster(raster);
                vec![Action::RenderNeeded]
            }
            _ => Vec::new(),
        }
    }

    pub fn set_background_color(&mut self, color: Color) -> Vec<Action> {
        if !self.alive || self.scene.background_color() == color {
            return Vec::new();
        }
        self.record("Background Color");
        self.scene.set_background_color(color);
        vec![Action::RenderNeeded]
    }

    pub fn clear_background(&mut self) -> Vec<Action> {
        if !self.alive || self.scene.background().is_none() {
            return Vec::new();
        }
        self.record("Clear Background");
        self.scene.clear_background();
        vec![Action::RenderNeeded]
    }

    /// Closes an open text editor first, so the host hears about it.
    pub fn undo(&mut self) -> Vec<Action> {
        if !self.alive || !self.history.can_undo() {
            return Vec::new();
        }
        let mut actions: Vec<Action> = self.finish_text_editing().into_iter()
            .filter(|a| *a != Action::RenderNeeded)
            .collect();
        self.history.undo(&mut self.scene);
        debug!("undo");
        actions.extend(self.after_history_jump());
        actions
    }

    pub fn redo(&mut self) -> Vec<Action> {
        if !self.alive || !self.history.can_redo() {
            return Vec::new();
        }
        let mut actions: Vec<Action> = self.finish_text_editing().into_iter()
            .filter(|a| *a != Action::RenderNeeded)
            .collect();
        self.history.redo(&mut self.scene);
        debug!("redo");
        actions.extend(self.after_history_jump());
        actions
    }

    fn after_history_jump(&mut self) -> Vec<Action> {
        self.pending_drag = None;
        self.state = match self.scene.selection() {
            Some(id) => InteractionState::Selected(id),
            None => InteractionState::Idle,
        };
        vec![Action::SelectionChanged { id: self.scene.selection() }, Action::RenderNeeded]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_text_uses_defaults_at_center() {
        let mut session = EditorSession::default();
        let actions = session.add_text(None, None);
        let obj = session.scene().selected().unwrap();
        assert_eq!(obj.center(), Point::new(400.0, 300.0));
        let text = obj.as_text().unwrap();
        assert_eq!(text.content, "Your text here");
        assert_eq!(text.style.font_size, 32.0);
        assert!(actions.contains(&Action::RenderNeeded));
        assert!(actions.contains(&Action::TextLayoutNeeded { id: obj.id }));
    }

    #[test]
    fn add_icon_uses_configured_size_and_color() {
        let mut session = EditorSession::default();
        session.add_icon(IconKind::Star, None, None);
        let obj = session.scene().selected().unwrap();
        assert_eq!((obj.width, obj.height), (48.0, 48.0));
        match &obj.kind {
            crate::objects::ObjectKind::Shape(s) => assert_eq!(s.fill, Color::rgb(0xff, 0x66, 0x00)),
            _ => panic!("expected shape"),
        }
    }

    #[test]
    fn large_image_object_is_scaled_down() {
        let mut session = EditorSession::default();
        session.add_image_object(Arc::new(RgbaImage::new(1600, 300)), None);
        let obj = session.scene().selected().unwrap();
        assert_eq!(obj.scale_x, 0.5);
        assert_eq!(obj.scaled_size(), (800.0, 150.0));
    }

    #[test]
    fn duplicate_offsets_copy_and_keeps_clipboard_empty() {
        let mut session = EditorSession::default();
        session.add_icon(IconKind::Heart, None, None);
        let source = session.scene().selected().unwrap().id;
        session.duplicate_selected();
        let copy = session.scene().selected().unwrap();
        assert_ne!(copy.id, source);
        assert_eq!(copy.center(), Point::new(410.0, 310.0));
        assert!(session.clipboard().is_empty());
    }

    #[test]
    fn remove_missing_id_is_silent() {
        let mut session = EditorSession::default();
        assert!(session.remove(ObjectId(7)).is_empty());
        assert!(!session.history().can_undo());
    }

    #[test]
    fn reorder_at_extreme_records_nothing() {
        let mut session = EditorSession::default();
        session.add_icon(IconKind::Circle, None, None);
        let recorded = session.history().action_names().len();
        assert!(session.bring_forward_selected().is_empty());
        assert_eq!(session.history().action_names().len(), recorded);
    }

    #[test]
    fn style_update_ignores_non_text() {
        let mut session = EditorSession::default();
        session.add_icon(IconKind::Circle, None, None);
        let id = session.scene().selection().unwrap();
        assert!(session.update_text_style(id, &TextStylePatch::default()).is_empty());
    }

    #[test]
    fn undo_restores_previous_scene() {
        let mut session = EditorSession::default();
        session.add_text(Some("top"), None);
        let id = session.scene().selection().unwrap();
        session.set_text_content(id, "changed");
        session.undo();
        assert_eq!(session.scene().get(id).unwrap().as_text().unwrap().content, "top");
        session.undo();
        assert!(session.scene().is_empty());
        assert_eq!(session.state(), &InteractionState::Idle);
        session.redo();
        assert_eq!(session.scene().len(), 1);
    }

    #[test]
    fn undo_while_editing_text_closes_the_editor() {
        let mut session = EditorSession::default();
        session.add_text(Some("hello"), None);
        let id = session.scene().selection().unwrap();
        session.double_click(Point::new(400.0, 300.0));
        session.text_input("hello there");

        let actions = session.undo();
        assert_eq!(actions[0], Action::TextEditFinished { id });
        assert_eq!(actions.iter().filter(|a| **a == Action::RenderNeeded).count(), 1);
        assert_eq!(session.state(), &InteractionState::Selected(id));
        assert_eq!(session.scene().get(id).unwrap().as_text().unwrap().content, "hello");

        let actions = session.redo();
        assert!(!actions.contains(&Action::TextEditFinished { id }));
        assert_eq!(session.scene().get(id).unwrap().as_text().unwrap().content, "hello there");

        // Undo during a second pass closes it the same way, and editing resumes afterwards.
        session.double_click(Point::new(400.0, 300.0));
        session.text_input("hello again");
        assert_eq!(session.redo(), Vec::new());
        assert_eq!(session.undo()[0], Action::TextEditFinished { id });
        session.double_click(Point::new(400.0, 300.0));
        session.text_input("final");
        assert_eq!(session.scene().get(id).unwrap().as_text().unwrap().content, "final");
    }

    #[test]
    fn disposed_session_ignores_edits() {
        let mut session = EditorSession::default();
        session.add_icon(IconKind::Circle, None, None);
        session.dispose();
        assert!(!session.is_alive());
        assert!(session.scene().is_empty());
        assert!(session.add_text(None, None).is_empty());
        assert!(session.scene().is_empty());
    }
}
