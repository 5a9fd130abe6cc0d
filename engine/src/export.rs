use std::io::Cursor;
use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use serde::{Serialize, Deserialize};
use tracing::{info, warn};
use wasm_bindgen::JsCast;
use crate::error::{EditorError, Result};
use crate::render::{render, RenderOptions};
use crate::scene::Scene;
use crate::types::ObjectId;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// 0.0 to 1.0. Ignored for PNG.
    pub quality: f64,
    pub scale_multiplier: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions { format: ExportFormat::Png, quality: 1.0, scale_multiplier: 1.0 }
    }
}

impl ExportOptions {
    pub fn png(scale_multiplier: f64) -> Self {
        ExportOptions { scale_multiplier, ..Default::default() }
    }

    pub fn jpeg(quality: f64) -> Self {
        ExportOptions { format: ExportFormat::Jpeg, quality, ..Default::default() }
    }
}

/// Maps a 0..1 quality onto the JPEG encoder's 1..=100 range.
pub fn jpeg_quality(quality: f64) -> u8 {
    let q = if quality.is_finite() { quality.clamp(0.0, 1.0) } else { 1.0 };
    (q * 100.0).round().max(1.0) as u8
}

#[derive(Clone, Debug)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ExportFormat,
}

impl ExportedImage {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime_type(), general_purpose::STANDARD.encode(&self.bytes))
    }

    /// `{stem}.png` or `{stem}.jpg`; a blank stem becomes `meme`.
    pub fn file_name(&self, stem: &str) -> String {
        let stem = stem.trim();
        let stem = if stem.is_empty() { "meme" } else { stem };
        format!("{}.{}", stem, self.format.extension())
    }
}

/// Text objects still waiting for a host raster.
pub fn pending_text_layout(scene: &Scene) -> Vec<ObjectId> {
    scene.objects().iter()
        .filter(|o| o.as_text().is_some_and(|t| t.raster.is_none()))
        .map(|o| o.id)
        .collect()
}

/// Renders the scene without any overlay and encodes it.
/// Fails while any text is unrasterized, so captions are never dropped.
pub fn export(scene: &Scene, options: &ExportOptions) -> Result<ExportedImage> {
    let multiplier = options.scale_multiplier;
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(EditorError::Encode(format!("invalid scale multiplier {}", multiplier)));
    }
    let pending = pending_text_layout(scene);
    if !pending.is_empty() {
        let ids: Vec<String> = pending.iter().map(|id| id.to_string()).collect();
        warn!(count = pending.len(), "export refused, text layout pending");
        return Err(EditorError::Encode(format!("text not rasterized yet: {}", ids.join(", "))));
    }
    let pixels = render(scene, &RenderOptions { scale: multiplier, overlay: false })?;
    let (width, height) = pixels.dimensions();
    let bytes = encode(pixels, options.format, options.quality)?;
    info!(width, height, format = options.format.extension(), size = bytes.len(), "scene exported");
    Ok(ExportedImage { bytes, width, height, format: options.format })
}

pub fn encode(pixels: RgbaImage, format: ExportFormat, quality: f64) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let (img, output) = match format {
        ExportFormat::Png => (DynamicImage::ImageRgba8(pixels), ImageOutputFormat::Png),
        ExportFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(pixels).to_rgb8();
            (DynamicImage::ImageRgb8(rgb), ImageOutputFormat::Jpeg(jpeg_quality(quality)))
        }
    };
    img.write_to(&mut Cursor::new(&mut bytes), output)
        .map_err(|e| EditorError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Hands encoded bytes to the user as a file. Fire and forget.
pub trait FileSaver {
    fn download(&self, bytes: &[u8], file_name: &str, mime_type: &str);
}

/// Saves through a temporary object URL and a synthetic anchor click.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserDownload;

impl FileSaver for BrowserDownload {
    fn download(&self, bytes: &[u8], file_name: &str, mime_type: &str) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            warn!("download requested without a document");
            return;
        };
        let parts = js_sys::Array::new();
        parts.push(&js_sys::Uint8Array::from(bytes));
        let opts = web_sys::BlobPropertyBag::new();
        opts.set_type(mime_type);
        let Ok(blob) = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &opts) else {
            warn!(file_name, "could not create blob for download");
            return;
        };
        let Ok(url) = web_sys::Url::create_object_url_with_blob(&blob) else { return; };
        if let Ok(a) = document.create_element("a") {
            let _ = a.set_attribute("href", &url);
            let _ = a.set_attribute("download", file_name);
            if let Some(anchor) = a.dyn_ref::<web_sys::HtmlAnchorElement>() {
                anchor.click();
            }
        }
        let _ = web_sys::Url::revoke_object_url(&url);
    }
}

/// Exports and passes the result to `saver` as `{stem}.{ext}`. Returns the file name used.
pub fn download(scene: &Scene, options: &ExportOptions, stem: &str, saver: &dyn FileSaver) -> Result<String> {
    let image = export(scene, options)?;
    let file_name = image.file_name(stem);
    saver.download(&image.bytes, &file_name, image.format.mime_type());
    info!(file_name = %file_name, "download started");
    Ok(file_name)
}
