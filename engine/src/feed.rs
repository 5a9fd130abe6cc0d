use serde::{Serialize, Deserialize};
use crate::storage::{MemeRecord, Vote};

/// Trending weight falls linearly to zero over this age.
pub const TRENDING_WINDOW_MS: f64 = 7.0 * 24.0 * 60.0 * 60.0 * 1000.0;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedOrder {
    #[default]
    Top,
    New,
    Trending,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum MemeFilter {
    #[default]
    All,
    Owner(String),
}

impl MemeFilter {
    pub fn matches(&self, meme: &MemeRecord) -> bool {
        match self {
            MemeFilter::All => true,
            MemeFilter::Owner(id) => meme.owner_id == *id,
        }
    }
}

/// An up or down vote, stored as `1` / `-1`.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(try_from = "i8", into = "i8")]
pub enum VoteValue {
    Up,
    Down,
}

impl TryFrom<i8> for VoteValue {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(VoteValue::Up),
            -1 => Ok(VoteValue::Down),
            other => Err(format!("vote value must be 1 or -1, got {}", other)),
        }
    }
}

impl From<VoteValue> for i8 {
    fn from(v: VoteValue) -> i8 {
        match v {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct MemeScore {
    pub score: i64,
    pub upvotes: u32,
    pub downvotes: u32,
}

pub fn score<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> MemeScore {
    let mut s = MemeScore::default();
    for vote in votes {
        match vote.value {
            VoteValue::Up => s.upvotes += 1,
            VoteValue::Down => s.downvotes += 1,
        }
    }
    s.score = s.upvotes as i64 - s.downvotes as i64;
    s
}

pub fn trending_score(score: i64, created_at: f64, now_ms: f64) -> f64 {
    let age = now_ms - created_at;
    score as f64 * (1.0 - age / TRENDING_WINDOW_MS).max(0.0)
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct FeedEntry {
    pub meme: MemeRecord,
    pub score: MemeScore,
}

/// Scores every meme against `votes` and sorts the feed. Ties keep input order.
pub fn rank(memes: Vec<MemeRecord>, votes: &[Vote], order: FeedOrder, now_ms: f64) -> Vec<FeedEntry> {
    let mut entries: Vec<FeedEntry> = memes.into_iter()
        .map(|meme| {
            let score = score(votes.iter().filter(|v| v.meme_id == meme.id));
            FeedEntry { meme, score }
        })
        .collect();
    match order {
        FeedOrder::Top => entries.sort_by(|a, b| b.score.score.cmp(&a.score.score)),
        FeedOrder::New => entries.sort_by(|a, b| b.meme.created_at.total_cmp(&a.meme.created_at)),
        FeedOrder::Trending => entries.sort_by(|a, b| {
            let sa = trending_score(a.score.score, a.meme.created_at, now_ms);
            let sb = trending_score(b.score.score, b.meme.created_at, now_ms);
            sb.total_cmp(&sa)
        }),
    }
    entries
}

/// What a click on a vote button does to the user's existing vote.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum VoteChange {
    Create { value: VoteValue },
    Update { vote_id: String, value: VoteValue },
    Remove { vote_id: String },
}

/// Same value again withdraws the vote; the other value flips it.
pub fn toggle_vote(existing: Option<&Vote>, value: VoteValue) -> VoteChange {
    match existing {
        Some(vote) if vote.value == value => VoteChange::Remove { vote_id: vote.id.clone() },
        Some(vote) => VoteChange::Update { vote_id: vote.id.clone(), value },
        None => VoteChange::Create { value },
    }
}
