use std::cell::RefCell;
use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use tracing::{info, warn};
use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::export::{export, ExportOptions, ExportedImage};
use crate::feed::{rank, toggle_vote, FeedEntry, FeedOrder, MemeFilter, VoteChange, VoteValue};
use crate::scene::Scene;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemeRecord {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub thumbnail_url: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    #[serde(rename = "userEmail")]
    pub owner_label: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewMeme {
    pub title: String,
    pub image_url: String,
    pub thumbnail_url: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    #[serde(rename = "userEmail")]
    pub owner_label: String,
    pub created_at: f64,
}

impl NewMeme {
    pub fn into_record(self, id: String) -> MemeRecord {
        MemeRecord {
            id,
            title: self.title,
            image_url: self.image_url,
            thumbnail_url: self.thumbnail_url,
            owner_id: self.owner_id,
            owner_label: self.owner_label,
            created_at: self.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub meme_id: String,
    pub user_id: String,
    pub value: VoteValue,
}

/// Image hosting. Returns the public URL of the stored file.
#[async_trait(?Send)]
pub trait BlobStore {
    async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<String>;
}

/// The hosted meme database.
#[async_trait(?Send)]
pub trait MemeStore {
    async fn create_meme(&self, meme: NewMeme) -> Result<String>;
    async fn delete_meme(&self, id: &str) -> Result<()>;
    async fn list_memes(&self, filter: &MemeFilter, order: FeedOrder, now_ms: f64) -> Result<Vec<MemeRecord>>;
    async fn votes_for(&self, meme_id: &str) -> Result<Vec<Vote>>;
    async fn apply_vote(&self, meme_id: &str, user_id: &str, change: VoteChange) -> Result<()>;
}

/// Votes `value` on a meme for `user_id`, toggling off a repeated vote.
pub async fn cast_vote(store: &dyn MemeStore, meme_id: &str, user_id: &str, value: VoteValue) -> Result<VoteChange> {
    let votes = store.votes_for(meme_id).await?;
    let change = toggle_vote(votes.iter().find(|v| v.user_id == user_id), value);
    store.apply_vote(meme_id, user_id, change.clone()).await?;
    Ok(change)
}

/// Lists memes with their scores, in feed order.
pub async fn load_feed(store: &dyn MemeStore, filter: &MemeFilter, order: FeedOrder, now_ms: f64) -> Result<Vec<FeedEntry>> {
    let memes = store.list_memes(filter, order, now_ms).await?;
    let mut votes = Vec::new();
    for meme in &memes {
        votes.extend(store.votes_for(&meme.id).await?);
    }
    Ok(rank(memes, &votes, order, now_ms))
}

/// In-process store for offline use and tests.
#[derive(Default)]
pub struct MemoryMemeStore {
    memes: RefCell<Vec<MemeRecord>>,
    votes: RefCell<Vec<Vote>>,
    next_id: RefCell<u64>,
}

impl MemoryMemeStore {
    pub fn new() -> Self {
        MemoryMemeStore::default()
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        format!("{}-{}", prefix, *next)
    }

    pub fn len(&self) -> usize {
        self.memes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.memes.borrow().is_empty()
    }
}

#[async_trait(?Send)]
impl MemeStore for MemoryMemeStore {
    async fn create_meme(&self, meme: NewMeme) -> Result<String> {
        let id = self.fresh_id("meme");
        self.memes.borrow_mut().push(meme.into_record(id.clone()));
        Ok(id)
    }

    async fn delete_meme(&self, id: &str) -> Result<()> {
        self.memes.borrow_mut().retain(|m| m.id != id);
        self.votes.borrow_mut().retain(|v| v.meme_id != id);
        Ok(())
    }

    async fn list_memes(&self, filter: &MemeFilter, order: FeedOrder, now_ms: f64) -> Result<Vec<MemeRecord>> {
        let memes: Vec<MemeRecord> = self.memes.borrow().iter().filter(|m| filter.matches(m)).cloned().collect();
        let votes = self.votes.borrow();
        Ok(rank(memes, &votes, order, now_ms).into_iter().map(|e| e.meme).collect())
    }

    async fn votes_for(&self, meme_id: &str) -> Result<Vec<Vote>> {
        Ok(self.votes.borrow().iter().filter(|v| v.meme_id == meme_id).cloned().collect())
    }

    async fn apply_vote(&self, meme_id: &str, user_id: &str, change: VoteChange) -> Result<()> {
        match change {
            VoteChange::Create { value } => {
                let id = self.fresh_id("vote");
                self.votes.borrow_mut().push(Vote { id, meme_id: meme_id.to_string(), user_id: user_id.to_string(), value });
            }
            VoteChange::Update { vote_id, value } => {
                let mut votes = self.votes.borrow_mut();
                let vote = votes.iter_mut().find(|v| v.id == vote_id)
                    .ok_or_else(|| EditorError::Store(format!("no vote {}", vote_id)))?;
                vote.value = value;
            }
            VoteChange::Remove { vote_id } => self.votes.borrow_mut().retain(|v| v.id != vote_id),
        }
        Ok(())
    }
}

/// The two encodings a save uploads: full-size PNG and a reduced PNG thumbnail.
#[derive(Clone, Debug)]
pub struct SaveImages {
    pub full: ExportedImage,
    pub thumbnail: ExportedImage,
}

impl SaveImages {
    /// Exports synchronously, so the async part of a save never needs the scene.
    pub fn capture(scene: &Scene, config: &EditorConfig) -> Result<Self> {
        Ok(SaveImages {
            full: export(scene, &ExportOptions::png(1.0))?,
            thumbnail: export(scene, &ExportOptions::png(config.thumbnail_multiplier))?,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub title: String,
    pub owner_id: String,
    #[serde(default)]
    pub owner_label: String,
}

/// Uploads both images and then creates the meme record. Nothing is written
/// to the store unless both uploads succeed.
pub async fn save_meme(
    store: &dyn MemeStore,
    blobs: Option<&dyn BlobStore>,
    config: &EditorConfig,
    images: &SaveImages,
    request: &SaveRequest,
    now_ms: f64,
) -> Result<String> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(EditorError::InvalidTitle);
    }
    if !config.backend.is_database_configured() {
        return Err(EditorError::Config("database app id".to_string()));
    }

    let (image_url, thumbnail_url) = match blobs.filter(|_| config.backend.is_cdn_configured()) {
        Some(blobs) => {
            let ts = now_ms as u64;
            let image_url = blobs.upload(&images.full.bytes, &format!("meme_{}.png", ts)).await?;
            let thumbnail_url = blobs.upload(&images.thumbnail.bytes, &format!("thumb_{}.png", ts)).await?;
            (image_url, thumbnail_url)
        }
        None => {
            warn!("image CDN not configured, storing images inline");
            (images.full.to_data_url(), images.thumbnail.to_data_url())
        }
    };

    let label = if request.owner_label.trim().is_empty() { "Unknown" } else { request.owner_label.as_str() };
    let id = store.create_meme(NewMeme {
        title: title.to_string(),
        image_url,
        thumbnail_url,
        owner_id: request.owner_id.clone(),
        owner_label: label.to_string(),
        created_at: now_ms,
    }).await?;
    info!(meme_id = %id, "meme saved");
    Ok(id)
}
