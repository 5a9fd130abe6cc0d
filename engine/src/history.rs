use crate::scene::Scene;

#[derive(Clone)]
pub struct Snapshot {
    pub scene: Scene,
    pub action_name: String,
}

/// Snapshot-based undo/redo over whole scenes. Bitmaps are reference counted,
/// so a snapshot copies object attributes only.
pub struct History {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        History { undo_stack: Vec::new(), redo_stack: Vec::new(), limit: limit.max(1) }
    }

    /// Records the scene as it was before `action_name` is applied.
    pub fn record(&mut self, scene: &Scene, action_name: &str) {
        self.undo_stack.push(Snapshot { scene: scene.clone(), action_name: action_name.to_string() });
        if self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    pub fn undo(&mut self, scene: &mut Scene) -> bool {
        let Some(prev) = self.undo_stack.pop() else { return false; };
        let current = std::mem::replace(scene, prev.scene);
        scene.inherit_id_counter(&current);
        self.redo_stack.push(Snapshot { scene: current, action_name: prev.action_name });
        true
    }

    pub fn redo(&mut self, scene: &mut Scene) -> bool {
        let Some(next) = self.redo_stack.pop() else { return false; };
        let current = std::mem::replace(scene, next.scene);
        scene.inherit_id_counter(&current);
        self.undo_stack.push(Snapshot { scene: current, action_name: next.action_name });
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn action_names(&self) -> Vec<String> {
        self.undo_stack.iter().map(|s| s.action_name.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
