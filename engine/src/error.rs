use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("store request failed: {0}")]
    Store(String),
    #[error("could not encode image: {0}")]
    Encode(String),
    #[error("not configured: {0}")]
    Config(String),
    #[error("a title is required")]
    InvalidTitle,
}

impl From<serde_json::Error> for EditorError {
    fn from(e: serde_json::Error) -> Self {
        EditorError::Config(e.to_string())
    }
}

impl EditorError {
    /// `{"error": "..."}` payload returned across the JavaScript boundary.
    pub fn to_json(&self) -> String {
        serde_json::json!({ "error": self.to_string() }).to_string()
    }
}

pub type Result<T> = std::result::Result<T, EditorError>;
