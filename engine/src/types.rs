use serde::{Serialize, Deserialize};
use kurbo::Point;

/// Stable identifier of a canvas object, unique within its scene.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub const fn new(width: f64, height: f64) -> Self {
        CanvasSize { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Pixel dimensions of this size scaled by `multiplier`, rounded, never below 1px.
    pub fn scaled_pixels(&self, multiplier: f64) -> (u32, u32) {
        let w = (self.width * multiplier).round().max(1.0);
        let h = (self.height * multiplier).round().max(1.0);
        (w as u32, h as u32)
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        CanvasSize::new(800.0, 600.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum HandleType {
    TopLeft, TopRight, BottomLeft, BottomRight,
    Top, Bottom, Left, Right,
    Rotate,
}

impl HandleType {
    pub const SCALE_HANDLES: [HandleType; 8] = [
        HandleType::TopLeft, HandleType::TopRight, HandleType::BottomLeft, HandleType::BottomRight,
        HandleType::Top, HandleType::Bottom, HandleType::Left, HandleType::Right,
    ];

    /// Unit position of the handle on the object's box, (-1..1, -1..1) from the center.
    pub fn unit_offset(self) -> (f64, f64) {
        match self {
            HandleType::TopLeft => (-1.0, -1.0),
            HandleType::TopRight => (1.0, -1.0),
            HandleType::BottomLeft => (-1.0, 1.0),
            HandleType::BottomRight => (1.0, 1.0),
            HandleType::Top | HandleType::Rotate => (0.0, -1.0),
            HandleType::Bottom => (0.0, 1.0),
            HandleType::Left => (-1.0, 0.0),
            HandleType::Right => (1.0, 0.0),
        }
    }

    pub fn is_corner(self) -> bool {
        matches!(self, HandleType::TopLeft | HandleType::TopRight | HandleType::BottomLeft | HandleType::BottomRight)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// An sRGB color with straight alpha, parsed from CSS hex notation.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` and the keyword `transparent`.
    pub fn parse(s: &str) -> Option<Color> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("transparent") {
            return Some(Color::TRANSPARENT);
        }
        let hex = s.strip_prefix('#').filter(|h| h.is_ascii())?;
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Color { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: byte(6)? }),
            _ => None,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value).ok_or_else(|| format!("invalid color: {}", value))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        c.to_hex()
    }
}

/// Keyboard modifier state at the time of an input event.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Modifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
}

impl Modifiers {
    /// Ctrl on Linux/Windows, Cmd on macOS. Either one counts.
    pub fn platform(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Key {
    Delete,
    Backspace,
    Escape,
    Char(char),
    Other(String),
}

impl Key {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Key {
        match key {
            "Delete" => Key::Delete,
            "Backspace" => Key::Backspace,
            "Escape" | "Esc" => Key::Escape,
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
                    _ => Key::Other(key.to_string()),
                }
            }
        }
    }
}
