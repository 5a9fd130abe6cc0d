use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use async_trait::async_trait;
use image::RgbaImage;
use tracing::{info, warn};
use crate::controller::Action;
use crate::error::{EditorError, Result};
use crate::session::EditorSession;

#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<RgbaImage>,
}

impl DecodedImage {
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(EditorError::Decode("image has no pixels".to_string()));
        }
        Ok(DecodedImage { width, height, pixels: Arc::new(pixels) })
    }
}

#[async_trait(?Send)]
pub trait ImageDecoder {
    async fn decode(&self, bytes: &[u8]) -> Result<DecodedImage>;
}

/// Decodes PNG and JPEG in-process with the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterDecoder;

#[async_trait(?Send)]
impl ImageDecoder for RasterDecoder {
    async fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        decode_bytes(bytes)
    }
}

pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedImage> {
    let img = image::load_from_memory(bytes).map_err(|e| EditorError::Decode(e.to_string()))?;
    DecodedImage::from_rgba(img.to_rgba8())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadTarget {
    /// Replaces the background; only the newest request may apply.
    Background,
    /// Adds a movable image object. Concurrent object loads all apply.
    Object,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    target: LoadTarget,
}

impl LoadTicket {
    pub fn target(&self) -> LoadTarget {
        self.target
    }
}

#[derive(Debug, PartialEq)]
pub enum LoadOutcome {
    Applied(Vec<Action>),
    /// A newer background load was started after this one.
    Stale,
    Disposed,
}

impl EditorSession {
    pub fn begin_load(&mut self, target: LoadTarget) -> LoadTicket {
        if target == LoadTarget::Background {
            self.load_generation += 1;
        }
        LoadTicket { generation: self.load_generation, target }
    }

    /// Applies a finished decode in one step, or drops it if the session moved on.
    pub fn complete_load(&mut self, ticket: LoadTicket, image: DecodedImage, source_url: Option<String>) -> LoadOutcome {
        if !self.is_alive() {
            warn!("image load finished after the session was disposed");
            return LoadOutcome::Disposed;
        }
        match ticket.target {
            LoadTarget::Background => {
                if ticket.generation != self.load_generation {
                    warn!(ticket = ticket.generation, latest = self.load_generation, "discarding stale background load");
                    return LoadOutcome::Stale;
                }
                self.record("Set Background");
                let fit = self.config().fit();
                let size = self.scene.set_background(image.pixels, fit);
                info!(width = image.width, height = image.height, canvas_width = size.width, canvas_height = size.height, "background set");
                LoadOutcome::Applied(vec![
                    Action::CanvasResized { width: size.width, height: size.height },
                    Action::RenderNeeded,
                ])
            }
            LoadTarget::Object => LoadOutcome::Applied(self.add_image_object(image.pixels, source_url)),
        }
    }
}

/// Decodes `bytes` and applies the result to `session`. The session is not
/// borrowed while the decoder runs, so events keep flowing during the load.
pub async fn load_image(
    session: &Rc<RefCell<EditorSession>>,
    decoder: &dyn ImageDecoder,
    bytes: &[u8],
    target: LoadTarget,
    source_url: Option<String>,
) -> Result<LoadOutcome> {
    let ticket = session.borrow_mut().begin_load(target);
    let decoded = decoder.decode(bytes).await;
    match decoded {
        Ok(image) => Ok(session.borrow_mut().complete_load(ticket, image, source_url)),
        Err(e) => {
            warn!(error = %e, "image load failed");
            Err(e)
        }
    }
}
