pub mod types;
pub mod error;
pub mod config;
pub mod icons;
pub mod templates;
pub mod objects;
pub mod scene;
pub mod clipboard;
pub mod history;
pub mod selection;
pub mod session;
pub mod controller;
pub mod loader;
pub mod render;
pub mod export;
pub mod feed;
pub mod storage;
pub mod bridge;
pub mod engine;

pub use engine::MemeEngine;
pub use config::EditorConfig;
pub use controller::{Action, InteractionState};
pub use error::EditorError;
pub use session::EditorSession;
pub use types::*;
pub use objects::*;
