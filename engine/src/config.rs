use serde::{Serialize, Deserialize};
use kurbo::Vec2;
use tracing::warn;
use crate::error::Result;
use crate::objects::TextStyle;
use crate::scene::Fit;
use crate::types::{CanvasSize, Color};

const PLACEHOLDERS: [&str; 4] = [
    "your_instantdb_app_id_here",
    "your_instantdb_app_id",
    "your_cloudinary_cloud_name",
    "your_cloudinary_upload_preset",
];

/// Credentials for the hosted database and the image CDN.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub database_app_id: Option<String>,
    pub cdn_cloud_name: Option<String>,
    pub cdn_upload_preset: Option<String>,
}

fn is_set(value: &Option<String>) -> bool {
    match value.as_deref().map(str::trim) {
        Some(v) => !v.is_empty() && !PLACEHOLDERS.contains(&v),
        None => false,
    }
}

impl BackendConfig {
    pub fn is_database_configured(&self) -> bool {
        is_set(&self.database_app_id)
    }

    pub fn is_cdn_configured(&self) -> bool {
        is_set(&self.cdn_cloud_name) && is_set(&self.cdn_upload_preset)
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Features {
    pub canvas: bool,
    pub save: bool,
    pub feed: bool,
    /// Saved images are embedded as data URLs instead of uploaded.
    pub inline_images: bool,
    pub messages: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct EditorConfig {
    pub max_canvas: CanvasSize,
    pub allow_upscale: bool,
    pub paste_offset: f64,
    pub thumbnail_multiplier: f64,
    pub history_limit: usize,
    pub default_text: TextStyle,
    pub default_text_content: String,
    pub default_icon_size: f64,
    pub default_icon_color: Color,
    pub backend: BackendConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            max_canvas: CanvasSize::new(800.0, 600.0),
            allow_upscale: true,
            paste_offset: 10.0,
            thumbnail_multiplier: 0.3,
            history_limit: 100,
            default_text: TextStyle::default(),
            default_text_content: "Your text here".to_string(),
            default_icon_size: 48.0,
            default_icon_color: Color::rgb(0xff, 0x66, 0x00),
            backend: BackendConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Parses a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(EditorConfig::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    pub fn fit(&self) -> Fit {
        Fit { max_width: self.max_canvas.width, max_height: self.max_canvas.height, allow_upscale: self.allow_upscale }
    }

    pub fn paste_offset(&self) -> Vec2 {
        Vec2::new(self.paste_offset, self.paste_offset)
    }

    /// Which features are usable with the configured backend. The canvas always is.
    pub fn features(&self) -> Features {
        let database = self.backend.is_database_configured();
        let cdn = self.backend.is_cdn_configured();
        let mut messages = Vec::new();
        if !database {
            let msg = "Database app id is not configured; saving and the feed are disabled.";
            warn!("{}", msg);
            messages.push(msg.to_string());
        }
        if database && !cdn {
            let msg = "Image CDN is not configured; saved images are stored inline.";
            warn!("{}", msg);
            messages.push(msg.to_string());
        }
        Features { canvas: true, save: database, feed: database, inline_images: !cdn, messages }
    }
}
