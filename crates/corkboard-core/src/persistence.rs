//! Loading and saving [`AppState`] through a [`KvStore`].
//!
//! # Records
//!
//! | Key (default) | Value |
//! |---------------|-------|
//! | `corkboard_data` | JSON `{ "blocks": [...], "channels": [...], "activeChannelId": ... }` |
//! | `corkboard_api_key` | the bare credential string |
//!
//! The snapshot never contains the credential or any session field (open
//! edit draft, insight text). The credential has its own record so it can be
//! cleared or rotated without touching content.
//!
//! # Failure policy
//!
//! Neither [`Persistence::load`] nor [`Persistence::save`] returns an error.
//!
//! - A missing snapshot loads as the built-in defaults.
//! - Unreadable records are dropped one by one; a snapshot that can't be read
//!   at all loads as the defaults. In both cases the stored bytes are first
//!   copied to `<snapshot key>.unreadable` so the next save can't destroy them.
//! - If the snapshot can't be read from the store, or the copy can't be
//!   written, the session is read-only: [`Persistence::save`] leaves the
//!   stored snapshot alone.
//! - A failed write is logged and the in-memory state stays authoritative.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{new_id, now_millis, AppState, Block, Channel};
use crate::store::KvStore;
use crate::taxonomy::slugify;

pub const DEFAULT_SNAPSHOT_KEY: &str = "corkboard_data";
pub const DEFAULT_CREDENTIAL_KEY: &str = "corkboard_api_key";
/// Appended to the snapshot key to name the copy of an unreadable snapshot.
pub const UNREADABLE_SUFFIX: &str = ".unreadable";

/// Keys under which the two records are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub snapshot: String,
    pub credential: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            snapshot: DEFAULT_SNAPSHOT_KEY.to_string(),
            credential: DEFAULT_CREDENTIAL_KEY.to_string(),
        }
    }
}

/// The persisted subset of [`AppState`].
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<'a> {
    blocks: &'a [Block],
    channels: &'a [Channel],
    active_channel_id: Option<&'a str>,
}

/// Channels every fresh board starts with.
const SEED_CHANNELS: &[(Option<&str>, &str)] = &[
    (None, "Inbox"),
    (Some("Design"), "Inspiration"),
    (Some("Design"), "Typography"),
    (Some("Research"), "Reading List"),
];

/// Built-in defaults used on first run and whenever the snapshot is unusable.
pub fn default_state() -> AppState {
    let now = now_millis();
    let channels = SEED_CHANNELS
        .iter()
        .map(|(vertical, title)| Channel {
            id: new_id(),
            title: title.to_string(),
            vertical: vertical.map(str::to_string),
            slug: slugify(title),
            created_at: now,
        })
        .collect();

    AppState {
        channels,
        ..AppState::empty()
    }
}

/// Serialize the persistable part of `state`.
pub fn snapshot_json(state: &AppState) -> serde_json::Result<String> {
    serde_json::to_string(&Snapshot {
        blocks: &state.blocks,
        channels: &state.channels,
        active_channel_id: state.active_channel_id.as_deref(),
    })
}

/// A stored snapshot merged over the defaults.
#[derive(Debug)]
pub struct Merged {
    pub state: AppState,
    /// Records (or fields) that could not be read and were left out.
    pub dropped: usize,
}

/// Shallow-merge a stored snapshot over `defaults`.
///
/// Each top-level field that is present replaces the default wholesale;
/// absent fields keep the default. Blocks and channels are read one record
/// at a time and unreadable ones are counted in [`Merged::dropped`]. An
/// error means nothing could be salvaged: the value is not a JSON object,
/// or `blocks`/`channels` is not an array.
pub fn merge_snapshot(raw: &str, mut state: AppState) -> anyhow::Result<Merged> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(mut fields) = value else {
        anyhow::bail!("snapshot is not a JSON object");
    };

    let mut dropped = 0;
    if let Some(blocks) = fields.remove("blocks") {
        state.blocks = parse_records(blocks, "blocks", &mut dropped)?;
    }
    if let Some(channels) = fields.remove("channels") {
        state.channels = parse_records(channels, "channels", &mut dropped)?;
    }
    if let Some(active) = fields.remove("activeChannelId") {
        match serde_json::from_value(active) {
            Ok(active) => state.active_channel_id = active,
            Err(e) => {
                warn!("Ignoring unreadable activeChannelId: {}", e);
                dropped += 1;
            }
        }
    }
    Ok(Merged { state, dropped })
}

fn parse_records<T: DeserializeOwned>(
    value: Value,
    field: &str,
    dropped: &mut usize,
) -> anyhow::Result<Vec<T>> {
    let Value::Array(items) = value else {
        anyhow::bail!("`{}` is not an array", field);
    };
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(field, index, "Dropping unreadable record: {}", e);
                *dropped += 1;
            }
        }
    }
    Ok(records)
}

/// Restore referential integrity on a freshly loaded state.
///
/// A dangling active filter resets to "all"; blocks pointing at a missing
/// channel become unfiled. Nothing is deleted.
pub fn repair(state: &mut AppState) {
    if let Some(active) = state.active_channel_id.as_deref() {
        if state.channel(active).is_none() {
            warn!(channel = %active, "active channel no longer exists, showing all blocks");
            state.active_channel_id = None;
        }
    }

    let known: std::collections::HashSet<&str> =
        state.channels.iter().map(|c| c.id.as_str()).collect();
    let mut orphaned = 0;
    for block in &mut state.blocks {
        if let Some(channel) = block.channel_id.as_deref() {
            if !known.contains(channel) {
                block.channel_id = None;
                orphaned += 1;
            }
        }
    }
    if orphaned > 0 {
        warn!(orphaned, "blocks referenced missing channels and were unfiled");
    }
}

/// Write-through persistence over a [`KvStore`].
#[derive(Clone)]
pub struct Persistence {
    kv: Arc<dyn KvStore>,
    keys: StorageKeys,
    read_only: Arc<AtomicBool>,
}

impl Persistence {
    pub fn new(kv: Arc<dyn KvStore>, keys: StorageKeys) -> Self {
        Self {
            kv,
            keys,
            read_only: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Key that holds the last unreadable snapshot.
    pub fn unreadable_key(&self) -> String {
        format!("{}{}", self.keys.snapshot, UNREADABLE_SUFFIX)
    }

    /// Whether [`save`](Self::save) is refusing to overwrite the snapshot.
    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::Relaxed)
    }

    /// Load the stored state merged over defaults, plus the stored credential.
    pub async fn load(&self) -> AppState {
        let defaults = default_state();
        let mut state = match self.kv.get(&self.keys.snapshot).await {
            Ok(Some(raw)) => match merge_snapshot(&raw, defaults.clone()) {
                Ok(Merged { state, dropped: 0 }) => state,
                Ok(Merged { state, dropped }) => {
                    warn!(dropped, "Stored snapshot had unreadable records");
                    self.preserve_unreadable(&raw).await;
                    state
                }
                Err(e) => {
                    warn!("Stored snapshot is unreadable, starting from defaults: {}", e);
                    self.preserve_unreadable(&raw).await;
                    defaults
                }
            },
            Ok(None) => {
                debug!("no stored snapshot, using defaults");
                defaults
            }
            Err(e) => {
                warn!(
                    "Failed to read stored snapshot, changes will not be saved: {:#}",
                    e
                );
                self.read_only.store(true, Ordering::Relaxed);
                defaults
            }
        };
        repair(&mut state);

        state.api_key = match self.kv.get(&self.keys.credential).await {
            Ok(key) => key.filter(|k| !k.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read stored credential: {:#}", e);
                None
            }
        };
        state
    }

    /// Copy `raw` aside before it can be overwritten. An existing copy is
    /// kept and the new one goes under a timestamped key. If no copy can be
    /// made the session turns read-only.
    async fn preserve_unreadable(&self, raw: &str) {
        let mut key = self.unreadable_key();
        match self.kv.get(&key).await {
            Ok(None) => {}
            Ok(Some(existing)) if existing == raw => return,
            Ok(Some(_)) => key = format!("{}.{}", key, now_millis()),
            Err(e) => {
                warn!("Failed to check {}, changes will not be saved: {:#}", key, e);
                self.read_only.store(true, Ordering::Relaxed);
                return;
            }
        }
        match self.kv.set(&key, raw).await {
            Ok(()) => warn!(key = %key, "Original snapshot preserved"),
            Err(e) => {
                warn!("Failed to preserve snapshot, changes will not be saved: {:#}", e);
                self.read_only.store(true, Ordering::Relaxed);
            }
        }
    }

    /// Persist the snapshot. Returns whether the write succeeded; failures
    /// are logged, never raised.
    pub async fn save(&self, state: &AppState) -> bool {
        if self.is_read_only() {
            warn!("Stored snapshot could not be read; not overwriting it");
            return false;
        }
        let json = match snapshot_json(state) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize state: {}", e);
                return false;
            }
        };
        match self.kv.set(&self.keys.snapshot, &json).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist state: {:#}", e);
                false
            }
        }
    }

    /// Store the credential in its own record; `None` or blank clears it.
    pub async fn save_api_key(&self, key: Option<&str>) -> bool {
        let result = match key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => self.kv.set(&self.keys.credential, key).await,
            None => self.kv.remove(&self.keys.credential).await,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist credential: {:#}", e);
                false
            }
        }
    }
}
