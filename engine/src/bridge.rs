//! Store implementations backed by JavaScript objects supplied by the host page.

use async_trait::async_trait;
use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use crate::error::{EditorError, Result};
use crate::feed::{FeedOrder, MemeFilter, VoteChange};
use crate::storage::{BlobStore, MemeRecord, MemeStore, NewMeme, Vote};

/// Calls `target[name](...args)` and awaits the result if it is a promise.
async fn call_method(target: &JsValue, name: &str, args: &[JsValue]) -> std::result::Result<JsValue, JsValue> {
    let f: Function = Reflect::get(target, &JsValue::from_str(name))?.dyn_into()?;
    let argv = Array::new();
    for arg in args {
        argv.push(arg);
    }
    let ret = f.apply(target, &argv)?;
    match ret.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(value) => Ok(value),
    }
}

pub(crate) fn describe(e: &JsValue) -> String {
    if let Some(s) = e.as_string() {
        return s;
    }
    Reflect::get(e, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", e))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| EditorError::Store(e.to_string()))
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T> {
    serde_wasm_bindgen::from_value(value).map_err(|e| EditorError::Store(e.to_string()))
}

/// Wraps an object with `upload(bytes: Uint8Array, fileName: string): Promise<string>`.
pub struct JsBlobStore {
    target: JsValue,
}

impl JsBlobStore {
    /// `None` for `null`/`undefined`, so a missing uploader falls back to inline images.
    pub fn from_js(target: JsValue) -> Option<Self> {
        if target.is_null() || target.is_undefined() {
            None
        } else {
            Some(JsBlobStore { target })
        }
    }
}

#[async_trait(?Send)]
impl BlobStore for JsBlobStore {
    async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<String> {
        let args = [Uint8Array::from(bytes).into(), JsValue::from_str(file_name)];
        let url = call_method(&self.target, "upload", &args).await
            .map_err(|e| EditorError::Upload(describe(&e)))?;
        url.as_string().ok_or_else(|| EditorError::Upload("uploader did not return a URL".to_string()))
    }
}

/// Wraps an object exposing `createMeme`, `deleteMeme`, `listMemes`, `votesFor`
/// and `applyVote`, each returning a value or a promise.
pub struct JsMemeStore {
    target: JsValue,
}

impl JsMemeStore {
    pub fn new(target: JsValue) -> Self {
        JsMemeStore { target }
    }

    async fn call(&self, name: &str, args: &[JsValue]) -> Result<JsValue> {
        call_method(&self.target, name, args).await.map_err(|e| EditorError::Store(describe(&e)))
    }
}

#[async_trait(?Send)]
impl MemeStore for JsMemeStore {
    async fn create_meme(&self, meme: NewMeme) -> Result<String> {
        let id = self.call("createMeme", &[to_js(&meme)?]).await?;
        id.as_string().ok_or_else(|| EditorError::Store("createMeme did not return an id".to_string()))
    }

    async fn delete_meme(&self, id: &str) -> Result<()> {
        self.call("deleteMeme", &[JsValue::from_str(id)]).await?;
        Ok(())
    }

    async fn list_memes(&self, filter: &MemeFilter, order: FeedOrder, now_ms: f64) -> Result<Vec<MemeRecord>> {
        let args = [to_js(filter)?, to_js(&order)?, JsValue::from_f64(now_ms)];
        from_js(self.call("listMemes", &args).await?)
    }

    async fn votes_for(&self, meme_id: &str) -> Result<Vec<Vote>> {
        from_js(self.call("votesFor", &[JsValue::from_str(meme_id)]).await?)
    }

    async fn apply_vote(&self, meme_id: &str, user_id: &str, change: VoteChange) -> Result<()> {
        let args = [JsValue::from_str(meme_id), JsValue::from_str(user_id), to_js(&change)?];
        self.call("applyVote", &args).await?;
        Ok(())
    }
}
