use std::cell::RefCell;
use std::rc::Rc;
use image::RgbaImage;
use js_sys::Promise;
use kurbo::Point;
use wasm_bindgen::prelude::*;
use wasm_bindgen::Clamped;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{CanvasRenderingContext2d, ImageData};
use crate::bridge::{JsBlobStore, JsMemeStore};
use crate::config::EditorConfig;
use crate::controller::Action;
use crate::error::EditorError;
use crate::export::{self, BrowserDownload, ExportOptions};
use crate::feed::{FeedOrder, MemeFilter, VoteValue};
use crate::icons::{self, IconKind};
use crate::loader::{load_image, LoadOutcome, LoadTarget, RasterDecoder};
use crate::objects::{TextStyle, TextStylePatch};
use crate::render::{self, RenderOptions};
use crate::session::EditorSession;
use crate::storage::{self, BlobStore, SaveImages, SaveRequest};
use crate::templates::{self, TemplateCategory};
use crate::types::{Color, Key, Modifiers, ObjectId};

fn init_logging() {
    console_error_panic_hook::set_once();
    #[cfg(target_arch = "wasm32")]
    {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(tracing_wasm::set_as_global_default);
    }
}

fn actions_json(actions: &[Action]) -> String {
    serde_json::to_string(actions).unwrap_or_else(|_| "[]".to_string())
}

fn js_err(e: EditorError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_options<T: serde::de::DeserializeOwned + Default>(json: &str) -> Result<T, EditorError> {
    if json.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(json)?)
}

/// The editor as seen from JavaScript. Input handlers return a JSON array of actions.
#[wasm_bindgen]
pub struct MemeEngine {
    session: Rc<RefCell<EditorSession>>,
}

#[wasm_bindgen]
impl MemeEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<MemeEngine, JsValue> {
        init_logging();
        let config = EditorConfig::from_json(config_json).map_err(js_err)?;
        let features = config.features();
        tracing::info!(save = features.save, feed = features.feed, "meme engine ready");
        Ok(MemeEngine { session: Rc::new(RefCell::new(EditorSession::new(config))) })
    }

    pub fn features(&self) -> String {
        serde_json::to_string(&self.session.borrow().config().features()).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn icon_catalog(&self) -> String {
        serde_json::to_string(&icons::catalog()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn template_catalog(&self) -> String {
        serde_json::to_string(&templates::catalog()).unwrap_or_else(|_| "[]".to_string())
    }

    /// `category` is `all`, `classic`, `modern` or `business`; `query` searches names and keywords.
    pub fn filter_templates(&self, category: &str, query: &str) -> String {
        let category = match TemplateCategory::parse_filter(category) {
            Ok(c) => c,
            Err(msg) => return EditorError::Config(msg).to_json(),
        };
        let found = templates::filter_templates(&templates::catalog(), category, query);
        serde_json::to_string(&found).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn pointer_down(&self, x: f64, y: f64) -> String {
        actions_json(&self.session.borrow_mut().pointer_down(Point::new(x, y)))
    }

    pub fn pointer_move(&self, x: f64, y: f64) -> String {
        actions_json(&self.session.borrow_mut().pointer_move(Point::new(x, y)))
    }

    pub fn pointer_up(&self, x: f64, y: f64) -> String {
        actions_json(&self.session.borrow_mut().pointer_up(Point::new(x, y)))
    }

    pub fn double_click(&self, x: f64, y: f64) -> String {
        actions_json(&self.session.borrow_mut().double_click(Point::new(x, y)))
    }

    pub fn key_down(&self, key: &str, ctrl: bool, meta: bool, shift: bool, alt: bool) -> String {
        let modifiers = Modifiers { ctrl, meta, shift, alt };
        actions_json(&self.session.borrow_mut().key_down(&Key::from_dom(key), modifiers))
    }

    pub fn text_input(&self, content: &str) -> String {
        actions_json(&self.session.borrow_mut().text_input(content))
    }

    /// `style` is a full text style object, or `undefined` for the defaults.
    pub fn add_text(&self, content: Option<String>, style: JsValue) -> String {
        let style: Option<TextStyle> = if style.is_undefined() || style.is_null() {
            None
        } else {
            match serde_wasm_bindgen::from_value(style) {
                Ok(s) => Some(s),
                Err(e) => return EditorError::Config(e.to_string()).to_json(),
            }
        };
        actions_json(&self.session.borrow_mut().add_text(content.as_deref(), style))
    }

    pub fn add_icon(&self, icon_id: &str, size: Option<f64>, color: Option<String>) -> String {
        let Some(kind) = IconKind::from_id(icon_id) else {
            return EditorError::Config(format!("unknown icon {}", icon_id)).to_json();
        };
        let color = match color.as_deref().map(Color::parse) {
            Some(None) => return EditorError::Config("invalid color".to_string()).to_json(),
            Some(c) => c,
            None => None,
        };
        actions_json(&self.session.borrow_mut().add_icon(kind, size, color))
    }

    pub fn select(&self, id: Option<u32>) -> String {
        actions_json(&self.session.borrow_mut().select(id.map(ObjectId)))
    }

    pub fn remove(&self, id: u32) -> String {
        actions_json(&self.session.borrow_mut().remove(ObjectId(id)))
    }

    pub fn delete_selected(&self) -> String {
        actions_json(&self.session.borrow_mut().delete_selected())
    }

    pub fn duplicate_selected(&self) -> String {
        actions_json(&self.session.borrow_mut().duplicate_selected())
    }

    pub fn bring_forward(&self) -> String {
        actions_json(&self.session.borrow_mut().bring_forward_selected())
    }

    pub fn send_backward(&self) -> String {
        actions_json(&self.session.borrow_mut().send_backward_selected())
    }

    pub fn copy(&self) -> String {
        actions_json(&self.session.borrow_mut().copy_selected())
    }

    pub fn paste(&self) -> String {
        actions_json(&self.session.borrow_mut().paste())
    }

    pub fn undo(&self) -> String {
        actions_json(&self.session.borrow_mut().undo())
    }

    pub fn redo(&self) -> String {
        actions_json(&self.session.borrow_mut().redo())
    }

    pub fn set_text_content(&self, id: u32, content: &str) -> String {
        actions_json(&self.session.borrow_mut().set_text_content(ObjectId(id), content))
    }

    pub fn update_text_style(&self, id: u32, patch_json: &str) -> String {
        let patch: TextStylePatch = match parse_options(patch_json) {
            Ok(p) => p,
            Err(e) => return e.to_json(),
        };
        actions_json(&self.session.borrow_mut().update_text_style(ObjectId(id), &patch))
    }

    pub fn set_text_metrics(&self, id: u32, width: f64, height: f64) -> String {
        actions_json(&self.session.borrow_mut().set_text_metrics(ObjectId(id), width, height))
    }

    /// Host-rendered RGBA pixels for a text object.
    pub fn set_text_raster(&self, id: u32, width: u32, height: u32, rgba: Vec<u8>) -> String {
        let Some(raster) = RgbaImage::from_raw(width, height, rgba) else {
            return EditorError::Decode("raster size does not match its data".to_string()).to_json();
        };
        actions_json(&self.session.borrow_mut().set_text_raster(ObjectId(id), raster))
    }

    pub fn set_background_color(&self, color: &str) -> String {
        match Color::parse(color) {
            Some(c) => actions_json(&self.session.borrow_mut().set_background_color(c)),
            None => EditorError::Config(format!("invalid color {}", color)).to_json(),
        }
    }

    pub fn clear_background(&self) -> String {
        actions_json(&self.session.borrow_mut().clear_background())
    }

    /// Resolves with the actions JSON once decoded; stale or disposed loads resolve with `[]`.
    pub fn load_background(&self, bytes: Vec<u8>) -> Promise {
        self.load(bytes, LoadTarget::Background, None)
    }

    pub fn load_image_object(&self, bytes: Vec<u8>, source_url: Option<String>) -> Promise {
        self.load(bytes, LoadTarget::Object, source_url)
    }

    pub fn render(&self, ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
        let session = self.session.borrow();
        let pixels = render::render(session.scene(), &RenderOptions::editor()).map_err(js_err)?;
        let (w, h) = pixels.dimensions();
        let data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(pixels.as_raw().as_slice()), w, h)?;
        ctx.put_image_data(&data, 0.0, 0.0)
    }

    pub fn export_image(&self, options_json: &str) -> Result<Vec<u8>, JsValue> {
        let options: ExportOptions = parse_options(options_json).map_err(js_err)?;
        let image = export::export(self.session.borrow().scene(), &options).map_err(js_err)?;
        Ok(image.bytes)
    }

    pub fn export_data_url(&self, options_json: &str) -> Result<String, JsValue> {
        let options: ExportOptions = parse_options(options_json).map_err(js_err)?;
        let image = export::export(self.session.borrow().scene(), &options).map_err(js_err)?;
        Ok(image.to_data_url())
    }

    /// Exports and triggers a browser download. Returns the file name.
    pub fn download(&self, options_json: &str, file_stem: &str) -> Result<String, JsValue> {
        let options: ExportOptions = parse_options(options_json).map_err(js_err)?;
        export::download(self.session.borrow().scene(), &options, file_stem, &BrowserDownload).map_err(js_err)
    }

    /// Captures the canvas now, then uploads through `uploader` (may be `null`) and
    /// records the meme in `store`. Resolves with the new meme id.
    pub fn save(&self, request_json: &str, store: JsValue, uploader: JsValue) -> Promise {
        let prepared = (|| {
            let request: SaveRequest = serde_json::from_str(request_json)?;
            let session = self.session.borrow();
            let images = SaveImages::capture(session.scene(), session.config())?;
            Ok::<_, EditorError>((request, images, session.config().clone()))
        })();
        let (request, images, config) = match prepared {
            Ok(p) => p,
            Err(e) => return Promise::reject(&js_err(e)),
        };
        let store = JsMemeStore::new(store);
        let uploader = JsBlobStore::from_js(uploader);
        future_to_promise(async move {
            let blobs = uploader.as_ref().map(|u| u as &dyn BlobStore);
            let id = storage::save_meme(&store, blobs, &config, &images, &request, js_sys::Date::now())
                .await
                .map_err(js_err)?;
            Ok(JsValue::from_str(&id))
        })
    }

    /// Resolves with a JSON array of `{meme, score}` entries.
    pub fn load_feed(&self, store: JsValue, filter_json: &str, order: &str) -> Promise {
        let filter: MemeFilter = match parse_options(filter_json) {
            Ok(f) => f,
            Err(e) => return Promise::reject(&js_err(e)),
        };
        let order: FeedOrder = match serde_json::from_value(serde_json::Value::String(order.to_string())) {
            Ok(o) => o,
            Err(e) => return Promise::reject(&js_err(e.into())),
        };
        let store = JsMemeStore::new(store);
        future_to_promise(async move {
            let feed = storage::load_feed(&store, &filter, order, js_sys::Date::now()).await.map_err(js_err)?;
            Ok(JsValue::from_str(&serde_json::to_string(&feed).unwrap_or_else(|_| "[]".to_string())))
        })
    }

    /// `value` is 1 or -1. Resolves with the applied change as JSON.
    pub fn vote(&self, store: JsValue, meme_id: String, user_id: String, value: i8) -> Promise {
        let value = match VoteValue::try_from(value) {
            Ok(v) => v,
            Err(e) => return Promise::reject(&JsValue::from_str(&e)),
        };
        let store = JsMemeStore::new(store);
        future_to_promise(async move {
            let change = storage::cast_vote(&store, &meme_id, &user_id, value).await.map_err(js_err)?;
            Ok(JsValue::from_str(&serde_json::to_string(&change).unwrap_or_else(|_| "{}".to_string())))
        })
    }

    pub fn get_objects_json(&self) -> String {
        serde_json::to_string(self.session.borrow().scene().objects()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn get_selected_id(&self) -> Option<u32> {
        self.session.borrow().scene().selection().map(|id| id.0)
    }

    pub fn get_state(&self) -> String {
        self.session.borrow().state().name().to_string()
    }

    pub fn get_history(&self) -> String {
        serde_json::to_string(&self.session.borrow().history().action_names()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn can_undo(&self) -> bool {
        self.session.borrow().history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.borrow().history().can_redo()
    }

    pub fn canvas_width(&self) -> f64 {
        self.session.borrow().scene().canvas_size().width
    }

    pub fn canvas_height(&self) -> f64 {
        self.session.borrow().scene().canvas_size().height
    }

    /// Call when the editor view goes away. In-flight loads are dropped on completion.
    pub fn dispose(&self) {
        self.session.borrow_mut().dispose();
    }
}

impl MemeEngine {
    fn load(&self, bytes: Vec<u8>, target: LoadTarget, source_url: Option<String>) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            match load_image(&session, &RasterDecoder, &bytes, target, source_url).await {
                Ok(LoadOutcome::Applied(actions)) => Ok(JsValue::from_str(&actions_json(&actions))),
                Ok(_) => Ok(JsValue::from_str("[]")),
                Err(e) => Err(js_err(e)),
            }
        })
    }
}
