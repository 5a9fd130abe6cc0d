use serde::{Serialize, Deserialize};
use kurbo::BezPath;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IconMetadata {
    pub id: String,
    pub name: String,
    pub category: String,
}

/// A parametric icon outline. Paths are generated in local coordinates
/// centered on the origin, spanning `-w/2..w/2` by `-h/2..h/2`.
pub trait IconShape {
    fn metadata(&self) -> IconMetadata;
    fn build_path(&self, width: f64, height: f64) -> BezPath;
}

pub mod circle;
pub mod star;
pub mod heart;
pub mod arrow;
pub mod speech_bubble;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum IconKind {
    Circle,
    Star,
    Heart,
    Arrow,
    SpeechBubble,
}

impl IconKind {
    pub const ALL: [IconKind; 5] = [
        IconKind::Circle, IconKind::Star, IconKind::Heart, IconKind::Arrow, IconKind::SpeechBubble,
    ];

    pub fn shape(self) -> Box<dyn IconShape> {
        match self {
            IconKind::Circle => Box::new(circle::CircleIcon),
            IconKind::Star => Box::new(star::StarIcon),
            IconKind::Heart => Box::new(heart::HeartIcon),
            IconKind::Arrow => Box::new(arrow::ArrowIcon),
            IconKind::SpeechBubble => Box::new(speech_bubble::SpeechBubbleIcon),
        }
    }

    pub fn from_id(id: &str) -> Option<IconKind> {
        IconKind::ALL.into_iter().find(|k| k.shape().metadata().id == id)
    }
}

pub fn catalog() -> Vec<IconMetadata> {
    IconKind::ALL.iter().map(|k| k.shape().metadata()).collect()
}
