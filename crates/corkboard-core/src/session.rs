//! Edit sessions and enrichment tickets.
//!
//! Enrichment calls suspend, so their results can arrive after the user has
//! moved on. Every request takes a ticket from a counter on [`AppState`]; the
//! draft (or the insight slot) remembers only the newest ticket it issued.
//! A result is applied only if its ticket is still that newest one, so a
//! superseded request, a closed draft, or a draft reopened later all
//! discard the late answer instead of overwriting fresher data.

use tracing::debug;

use crate::content::parse_tags;
use crate::enrichment::TOO_FEW_BLOCKS_INSIGHT;
use crate::error::{BoardError, BoardResult};
use crate::models::{Analysis, AppState, Block, BlockFields, BlockKind, BlockUpdate, EditDraft};

/// A pending analysis of the open draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisTicket {
    pub id: u64,
    pub content: String,
    pub kind: BlockKind,
}

/// A pending connections request over the visible blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightTicket {
    pub id: u64,
    pub blocks: Vec<Block>,
}

/// Outcome of starting an insight request.
#[derive(Debug, Clone, PartialEq)]
pub enum InsightRequest {
    /// Send these blocks to the backend.
    Ready(InsightTicket),
    /// Not enough blocks; the message has already been placed in the slot.
    TooFewBlocks,
}

/// Partial change to the open draft. `None` fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct DraftChange {
    pub kind: Option<BlockKind>,
    pub content: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Comma-separated, see [`parse_tags`].
    pub tags: Option<String>,
}

/// What committing a draft did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Committed {
    Created(String),
    Updated(String),
    /// Blank content; nothing was written and the draft stays open.
    Rejected,
}

impl AppState {
    fn next_ticket(&mut self) -> u64 {
        self.ticket_counter += 1;
        self.ticket_counter
    }

    /// Open a draft for an existing block, or a blank one for a new block.
    /// Any previously open draft is discarded.
    pub fn begin_edit(&mut self, block_id: Option<&str>) -> BoardResult<&EditDraft> {
        let draft = match block_id {
            Some(id) => {
                let block = self
                    .block(id)
                    .ok_or_else(|| BoardError::BlockNotFound(id.to_string()))?;
                EditDraft::from_block(block)
            }
            None => EditDraft::blank(),
        };
        Ok(self.editing.insert(draft))
    }

    /// Drop the open draft. Pending analysis results will be ignored.
    pub fn close_edit(&mut self) {
        self.editing = None;
    }

    pub fn edit_draft(&mut self, change: DraftChange) -> BoardResult<()> {
        let draft = self.editing.as_mut().ok_or(BoardError::NoEditSession)?;
        if let Some(kind) = change.kind {
            draft.kind = kind;
        }
        if let Some(content) = change.content {
            draft.content = content;
        }
        if let Some(title) = change.title {
            draft.title = Some(title);
        }
        if let Some(description) = change.description {
            draft.description = Some(description);
        }
        if let Some(tags) = change.tags {
            draft.tags = parse_tags(&tags);
        }
        Ok(())
    }

    /// Issue a ticket for analysing the draft's current content.
    ///
    /// Supersedes any earlier ticket for this draft.
    pub fn start_analysis(&mut self) -> BoardResult<AnalysisTicket> {
        if self.editing.is_none() {
            return Err(BoardError::NoEditSession);
        }
        let id = self.next_ticket();
        let draft = self.editing.as_mut().ok_or(BoardError::NoEditSession)?;
        draft.pending_analysis = Some(id);
        Ok(AnalysisTicket {
            id,
            content: draft.content.clone(),
            kind: draft.kind,
        })
    }

    /// Write an analysis into the draft if `ticket` is still current.
    ///
    /// The title is always replaced; summary and tags only when non-empty,
    /// so an unconfigured-credential result doesn't wipe existing input.
    /// Returns `false` for stale tickets.
    pub fn apply_analysis(&mut self, ticket: &AnalysisTicket, analysis: Analysis) -> bool {
        let Some(draft) = self
            .editing
            .as_mut()
            .filter(|d| d.pending_analysis == Some(ticket.id))
        else {
            debug!(ticket = ticket.id, "discarding stale analysis");
            return false;
        };

        draft.pending_analysis = None;
        draft.title = Some(analysis.title);
        if !analysis.summary.is_empty() {
            draft.description = Some(analysis.summary);
        }
        if !analysis.tags.is_empty() {
            draft.tags = analysis.tags;
        }
        true
    }

    /// Save the draft through the block operations and close it.
    pub fn commit_edit(&mut self) -> BoardResult<Committed> {
        let draft = self.editing.clone().ok_or(BoardError::NoEditSession)?;

        let outcome = match &draft.block_id {
            Some(id) => {
                let update = BlockUpdate {
                    kind: draft.kind,
                    content: draft.content,
                    title: draft.title,
                    description: draft.description,
                    tags: draft.tags,
                };
                if self.update_block(id, update)? {
                    Committed::Updated(id.clone())
                } else {
                    Committed::Rejected
                }
            }
            None => {
                let fields = BlockFields {
                    title: draft.title,
                    description: draft.description,
                    tags: draft.tags,
                };
                match self.create_block(draft.kind, &draft.content, fields, None)? {
                    Some(id) => Committed::Created(id),
                    None => Committed::Rejected,
                }
            }
        };

        if outcome != Committed::Rejected {
            self.editing = None;
        }
        Ok(outcome)
    }

    /// Begin a connections request over the blocks visible for `search_term`.
    ///
    /// With fewer than two visible blocks the insight slot gets a guidance
    /// message and no ticket is issued.
    pub fn start_insight(&mut self, search_term: &str) -> InsightRequest {
        let blocks: Vec<Block> = self
            .visible_blocks(search_term)
            .into_iter()
            .cloned()
            .collect();

        if blocks.len() < 2 {
            self.pending_insight = None;
            self.insight = Some(TOO_FEW_BLOCKS_INSIGHT.to_string());
            return InsightRequest::TooFewBlocks;
        }

        let id = self.next_ticket();
        self.pending_insight = Some(id);
        InsightRequest::Ready(InsightTicket { id, blocks })
    }

    /// Store insight text if `ticket` is still the newest request.
    pub fn apply_insight(&mut self, ticket: &InsightTicket, text: String) -> bool {
        if self.pending_insight != Some(ticket.id) {
            debug!(ticket = ticket.id, "discarding stale insight");
            return false;
        }
        self.pending_insight = None;
        self.insight = Some(text);
        true
    }

    /// Clear the insight slot and forget any pending request.
    pub fn dismiss_insight(&mut self) {
        self.pending_insight = None;
        self.insight = None;
    }
}
