//! Core data models used throughout Corkboard.
//!
//! Blocks are the captured items, channels are the named buckets they live
//! in. Verticals have no record of their own: a vertical is just the shared
//! `vertical` string on a set of channels (see [`crate::taxonomy`]).
//!
//! Field names serialize in camelCase so the persisted snapshot keeps the
//! `channelId` / `createdAt` / `activeChannelId` shape.

use serde::{Deserialize, Serialize};

/// What a block's `content` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlockKind {
    Text,
    Link,
    Image,
}

impl BlockKind {
    /// Guess the kind of freshly pasted content.
    ///
    /// `data:image/...` payloads are images, `http(s)://` strings are links,
    /// everything else is text.
    pub fn detect(content: &str) -> Self {
        let trimmed = content.trim_start();
        if trimmed.starts_with("data:image/") {
            BlockKind::Image
        } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            BlockKind::Link
        } else {
            BlockKind::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Text => "TEXT",
            BlockKind::Link => "LINK",
            BlockKind::Image => "IMAGE",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TEXT" => Ok(BlockKind::Text),
            "LINK" => Ok(BlockKind::Link),
            "IMAGE" => Ok(BlockKind::Image),
            other => anyhow::bail!("Unknown block type: '{}'. Must be text, link, or image.", other),
        }
    }
}

/// A captured item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Unix milliseconds.
    pub created_at: i64,
}

/// Accept `null` where a list is expected.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A named bucket of blocks, optionally grouped under a vertical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<String>,
    #[serde(default)]
    pub slug: String,
    /// Unix milliseconds.
    pub created_at: i64,
}

/// The user-editable fields of a block, used for both create and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Full replacement payload for [`crate::content`]'s update operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockUpdate {
    pub kind: BlockKind,
    pub content: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Structured metadata returned by the enrichment service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
}

/// An in-progress edit. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditDraft {
    /// `None` while composing a new block.
    pub block_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub content: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Ticket of the analysis request whose result this draft will accept.
    #[serde(skip)]
    pub pending_analysis: Option<u64>,
}

impl EditDraft {
    pub fn blank() -> Self {
        Self {
            block_id: None,
            kind: BlockKind::Text,
            content: String::new(),
            title: None,
            description: None,
            tags: Vec::new(),
            pending_analysis: None,
        }
    }

    pub fn from_block(block: &Block) -> Self {
        Self {
            block_id: Some(block.id.clone()),
            kind: block.kind,
            content: block.content.clone(),
            title: block.title.clone(),
            description: block.description.clone(),
            tags: block.tags.clone(),
            pending_analysis: None,
        }
    }
}

/// The whole application state.
///
/// `api_key`, `editing`, `insight` and the ticket bookkeeping are
/// session-only: the persisted snapshot (see [`crate::persistence`]) leaves
/// them out. Export serializes everything except the bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub blocks: Vec<Block>,
    pub channels: Vec<Channel>,
    pub active_channel_id: Option<String>,
    pub api_key: Option<String>,
    pub editing: Option<EditDraft>,
    pub insight: Option<String>,
    #[serde(skip)]
    pub pending_insight: Option<u64>,
    #[serde(skip)]
    pub ticket_counter: u64,
}

impl AppState {
    /// An empty state with no channels and no blocks.
    pub fn empty() -> Self {
        Self {
            blocks: Vec::new(),
            channels: Vec::new(),
            active_channel_id: None,
            api_key: None,
            editing: None,
            insight: None,
            pending_insight: None,
            ticket_counter: 0,
        }
    }

    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Whether a usable credential is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
