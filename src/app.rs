//! The application controller.
//!
//! [`AppController`] owns the one [`AppState`] of the process and is the
//! only thing that mutates it. Each mutating call applies the change and
//! then writes the snapshot through [`Persistence`] before returning, so
//! one call is one persisted state. Validation no-ops and not-found errors
//! skip the write.
//!
//! Enrichment never touches blocks directly: analysis results land in the
//! open edit draft and connection text lands in the insight slot, both
//! guarded by the ticket scheme in [`corkboard_core::session`].

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use corkboard_core::enrichment::EnrichmentService;
use corkboard_core::error::BoardResult;
use corkboard_core::models::{Analysis, AppState, Block, BlockFields, BlockKind, BlockUpdate, EditDraft};
use corkboard_core::persistence::Persistence;
use corkboard_core::session::{Committed, DraftChange, InsightRequest};
use corkboard_core::taxonomy::{group_for_display, ChannelGroups};

use crate::config::Config;
use crate::sqlite_store::SqliteKv;
use crate::{db, gemini, migrate};

pub struct AppController {
    state: AppState,
    persistence: Persistence,
    enrichment: EnrichmentService,
    /// Credential from the environment, used when none is stored.
    env_api_key: Option<String>,
}

impl AppController {
    /// Build a controller and load state from `persistence`.
    pub async fn new(
        persistence: Persistence,
        enrichment: EnrichmentService,
        env_api_key: Option<String>,
    ) -> Self {
        let mut app = Self {
            state: AppState::empty(),
            persistence,
            enrichment,
            env_api_key: env_api_key.filter(|k| !k.trim().is_empty()),
        };
        app.load_state().await;
        app
    }

    /// Open the configured SQLite store and model backend.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        let kv = Arc::new(SqliteKv::new(pool));
        let persistence = Persistence::new(kv, config.storage.keys());
        let enrichment = EnrichmentService::new(gemini::create_model(&config.enrichment)?);

        let env_api_key = config
            .enrichment
            .api_key_env
            .as_deref()
            .filter(|name| !name.is_empty())
            .and_then(|name| std::env::var(name).ok());

        Ok(Self::new(persistence, enrichment, env_api_key).await)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    // ============ Persistence ============

    /// Replace the in-memory state with what is stored.
    pub async fn load_state(&mut self) {
        self.state = self.persistence.load().await;
        if self.state.api_key.is_none() {
            self.state.api_key = self.env_api_key.clone();
        }
        debug!(
            blocks = self.state.blocks.len(),
            channels = self.state.channels.len(),
            "state loaded"
        );
    }

    /// Write the snapshot now. Returns whether the write succeeded.
    pub async fn save_state(&self) -> bool {
        self.persistence.save(&self.state).await
    }

    async fn persist(&self) {
        // Failures are already logged; the in-memory state stays authoritative.
        self.persistence.save(&self.state).await;
    }

    /// Store (or, with `None`, clear) the credential.
    pub async fn set_api_key(&mut self, key: Option<&str>) -> bool {
        let key = key.map(str::trim).filter(|k| !k.is_empty());
        self.state.api_key = key.map(str::to_string).or_else(|| self.env_api_key.clone());
        self.persistence.save_api_key(key).await
    }

    // ============ Taxonomy ============

    pub fn list_channels(&self) -> ChannelGroups<'_> {
        group_for_display(&self.state.channels)
    }

    pub async fn create_channel(&mut self, name: &str) -> Option<String> {
        let id = self.state.create_channel(name)?;
        self.persist().await;
        info!(channel = %id, "channel created");
        Some(id)
    }

    pub async fn rename_channel(&mut self, id: &str, name: &str) -> BoardResult<bool> {
        let changed = self.state.rename_channel(id, name)?;
        if changed {
            self.persist().await;
        }
        Ok(changed)
    }

    /// Delete a channel and its blocks. Returns the number of blocks removed.
    pub async fn delete_channel(&mut self, id: &str) -> BoardResult<usize> {
        let removed = self.state.delete_channel(id)?;
        self.persist().await;
        info!(channel = %id, removed, "channel deleted");
        Ok(removed)
    }

    pub async fn rename_vertical(&mut self, old: &str, new: &str) -> usize {
        let touched = self.state.rename_vertical(old, new);
        if touched > 0 {
            self.persist().await;
        }
        touched
    }

    pub async fn dissolve_vertical(&mut self, name: &str) -> usize {
        let touched = self.state.dissolve_vertical(name);
        if touched > 0 {
            self.persist().await;
        }
        touched
    }

    pub async fn set_active_channel(&mut self, id: Option<&str>) -> BoardResult<()> {
        self.state.set_active_channel(id)?;
        self.persist().await;
        Ok(())
    }

    // ============ Content ============

    pub fn list_visible_blocks(&self, search_term: &str) -> Vec<&Block> {
        self.state.visible_blocks(search_term)
    }

    pub async fn create_block(
        &mut self,
        kind: BlockKind,
        content: &str,
        fields: BlockFields,
        channel_id: Option<&str>,
    ) -> BoardResult<Option<String>> {
        let id = self.state.create_block(kind, content, fields, channel_id)?;
        if id.is_some() {
            self.persist().await;
        }
        Ok(id)
    }

    pub async fn update_block(&mut self, id: &str, update: BlockUpdate) -> BoardResult<bool> {
        let changed = self.state.update_block(id, update)?;
        if changed {
            self.persist().await;
        }
        Ok(changed)
    }

    pub async fn delete_block(&mut self, id: &str) -> bool {
        let removed = self.state.delete_block(id);
        if removed {
            self.persist().await;
        }
        removed
    }

    // ============ Enrichment ============

    /// One-shot analysis that writes nowhere.
    pub async fn analyze_content(&self, content: &str, kind: BlockKind) -> Analysis {
        self.enrichment
            .analyze_content(self.state.api_key.as_deref(), content, kind)
            .await
    }

    /// Raw connections call. Callers are expected to pass at least two
    /// blocks; [`discover_connections`](Self::discover_connections) does
    /// that check.
    pub async fn find_connections(&self, blocks: &[&Block]) -> String {
        self.enrichment
            .find_connections(self.state.api_key.as_deref(), blocks)
            .await
    }

    /// Look for connections among the visible blocks and store the answer
    /// in the insight slot. Returns the slot's text.
    pub async fn discover_connections(&mut self, search_term: &str) -> Option<&str> {
        if let InsightRequest::Ready(ticket) = self.state.start_insight(search_term) {
            let refs: Vec<&Block> = ticket.blocks.iter().collect();
            let text = self
                .enrichment
                .find_connections(self.state.api_key.as_deref(), &refs)
                .await;
            self.state.apply_insight(&ticket, text);
        }
        self.state.insight.as_deref()
    }

    pub fn dismiss_insight(&mut self) {
        self.state.dismiss_insight();
    }

    // ============ Edit sessions ============

    pub fn begin_edit(&mut self, block_id: Option<&str>) -> BoardResult<&EditDraft> {
        self.state.begin_edit(block_id)
    }

    pub fn edit_draft(&mut self, change: DraftChange) -> BoardResult<()> {
        self.state.edit_draft(change)
    }

    pub fn close_edit(&mut self) {
        self.state.close_edit();
    }

    /// Analyse the open draft and fill its fields if the result is still
    /// wanted when it arrives. Returns whether it was applied.
    pub async fn analyze_draft(&mut self) -> BoardResult<bool> {
        let ticket = self.state.start_analysis()?;
        let analysis = self
            .enrichment
            .analyze_content(self.state.api_key.as_deref(), &ticket.content, ticket.kind)
            .await;
        Ok(self.state.apply_analysis(&ticket, analysis))
    }

    pub async fn commit_edit(&mut self) -> BoardResult<Committed> {
        let outcome = self.state.commit_edit()?;
        if outcome != Committed::Rejected {
            self.persist().await;
        }
        Ok(outcome)
    }

    // ============ Export ============

    /// The full in-memory state as pretty JSON, unfiltered.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.state)?)
    }
}
