//! Blocks: creation, editing, deletion, and the visible-block projection.

use tracing::debug;

use crate::error::{BoardError, BoardResult};
use crate::models::{new_id, now_millis, AppState, Block, BlockFields, BlockKind, BlockUpdate};

/// Split a comma-separated tag string.
///
/// Segments are trimmed and empty ones dropped. Order is kept and duplicates
/// are left alone.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Filter blocks by search term and channel, newest first.
///
/// The term matches `content` or `title` case-insensitively; an empty term
/// matches everything. `active_channel_id = None` means every channel.
pub fn visible_blocks<'a>(
    blocks: &'a [Block],
    search_term: &str,
    active_channel_id: Option<&str>,
) -> Vec<&'a Block> {
    let needle = search_term.to_lowercase();
    let mut visible: Vec<&Block> = blocks
        .iter()
        .filter(|b| match active_channel_id {
            Some(active) => b.channel_id.as_deref() == Some(active),
            None => true,
        })
        .filter(|b| {
            needle.is_empty()
                || b.content.to_lowercase().contains(&needle)
                || b
                    .title
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains(&needle))
        })
        .collect();
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    visible
}

impl AppState {
    /// Create a block and prepend it.
    ///
    /// Without an explicit channel the block goes to the active channel, then
    /// the first channel, then nowhere. Returns `Ok(None)` if `content` is
    /// blank; an explicit channel that doesn't exist is an error.
    pub fn create_block(
        &mut self,
        kind: BlockKind,
        content: &str,
        fields: BlockFields,
        channel_id: Option<&str>,
    ) -> BoardResult<Option<String>> {
        if content.trim().is_empty() {
            return Ok(None);
        }

        let channel_id = match channel_id {
            Some(id) => {
                if self.channel(id).is_none() {
                    return Err(BoardError::ChannelNotFound(id.to_string()));
                }
                Some(id.to_string())
            }
            None => self.default_channel_id(),
        };

        let block = Block {
            id: new_id(),
            kind,
            content: content.to_string(),
            title: non_blank(fields.title),
            description: non_blank(fields.description),
            tags: fields.tags,
            channel_id,
            created_at: now_millis(),
        };
        let id = block.id.clone();
        debug!(block = %id, kind = %kind, "created block");
        self.blocks.insert(0, block);
        Ok(Some(id))
    }

    /// Replace a block's editable fields. `id`, `created_at` and the channel
    /// stay as they are.
    ///
    /// `Ok(false)` when the new content is blank.
    pub fn update_block(&mut self, id: &str, update: BlockUpdate) -> BoardResult<bool> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| BoardError::BlockNotFound(id.to_string()))?;

        if update.content.trim().is_empty() {
            return Ok(false);
        }

        block.kind = update.kind;
        block.content = update.content;
        block.title = non_blank(update.title);
        block.description = non_blank(update.description);
        block.tags = update.tags;
        Ok(true)
    }

    /// Remove a block. Returns whether anything was removed.
    pub fn delete_block(&mut self, id: &str) -> bool {
        let before = self.blocks.len();
        self.blocks.retain(|b| b.id != id);
        self.blocks.len() != before
    }

    /// Blocks matching `search_term` under the current channel filter.
    pub fn visible_blocks(&self, search_term: &str) -> Vec<&Block> {
        visible_blocks(
            &self.blocks,
            search_term,
            self.active_channel_id.as_deref(),
        )
    }

    fn default_channel_id(&self) -> Option<String> {
        self.active_channel_id
            .as_deref()
            .and_then(|id| self.channel(id))
            .or_else(|| self.channels.first())
            .map(|c| c.id.clone())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, content: &str, title: Option<&str>, channel: Option<&str>, at: i64) -> Block {
        Block {
            id: id.to_string(),
            kind: BlockKind::Text,
            content: content.to_string(),
            title: title.map(str::to_string),
            description: None,
            tags: Vec::new(),
            channel_id: channel.map(str::to_string),
            created_at: at,
        }
    }

    fn update(content: &str) -> BlockUpdate {
        BlockUpdate {
            kind: BlockKind::Text,
            content: content.to_string(),
            title: None,
            description: None,
            tags: vec!["a".to_string(), "b".to_string()],
        }
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(" rust, cli ,, rust ,"), vec!["rust", "cli", "rust"]);
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ,").is_empty());
    }

    #[test]
    fn test_visible_all_sorted_newest_first() {
        let blocks = vec![
            block("1", "old", None, Some("c1"), 10),
            block("2", "newest", None, None, 30),
            block("3", "middle", None, Some("c2"), 20),
        ];
        let ids: Vec<&str> = visible_blocks(&blocks, "", None)
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[test]
    fn test_visible_filters_channel_and_term() {
        let blocks = vec![
            block("1", "Rust ownership", None, Some("c1"), 10),
            block("2", "python", Some("About RUST"), Some("c1"), 20),
            block("3", "rust again", None, Some("c2"), 30),
            block("4", "unrelated", None, Some("c1"), 40),
        ];
        let ids: Vec<&str> = visible_blocks(&blocks, "rust", Some("c1"))
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn test_create_block_falls_back_to_active_then_first() {
        let mut state = AppState::empty();
        let first = state.create_channel("First").unwrap();
        let second = state.create_channel("Second").unwrap();

        let id = state
            .create_block(BlockKind::Text, "hello", BlockFields::default(), None)
            .unwrap()
            .unwrap();
        assert_eq!(state.block(&id).unwrap().channel_id.as_deref(), Some(second.as_str()));

        state.set_active_channel(None).unwrap();
        let id = state
            .create_block(BlockKind::Text, "again", BlockFields::default(), None)
            .unwrap()
            .unwrap();
        assert_eq!(state.block(&id).unwrap().channel_id.as_deref(), Some(first.as_str()));
        // prepended
        assert_eq!(state.blocks[0].id, id);
    }

    #[test]
    fn test_create_block_without_channels_is_unfiled() {
        let mut state = AppState::empty();
        let id = state
            .create_block(BlockKind::Link, "https://example.com", BlockFields::default(), None)
            .unwrap()
            .unwrap();
        assert!(state.block(&id).unwrap().channel_id.is_none());
    }

    #[test]
    fn test_create_block_rejects_blank_content() {
        let mut state = AppState::empty();
        let result = state
            .create_block(BlockKind::Text, "  \n", BlockFields::default(), None)
            .unwrap();
        assert!(result.is_none());
        assert!(state.blocks.is_empty());
    }

    #[test]
    fn test_create_block_unknown_channel() {
        let mut state = AppState::empty();
        let err = state
            .create_block(BlockKind::Text, "x", BlockFields::default(), Some("ghost"))
            .unwrap_err();
        assert_eq!(err, BoardError::ChannelNotFound("ghost".to_string()));
        assert!(state.blocks.is_empty());
    }

    #[test]
    fn test_update_block_keeps_identity() {
        let mut state = AppState::empty();
        let channel = state.create_channel("Inbox").unwrap();
        let id = state
            .create_block(
                BlockKind::Text,
                "draft",
                BlockFields {
                    title: Some("T".to_string()),
                    ..Default::default()
                },
                None,
            )
            .unwrap()
            .unwrap();
        let created_at = state.block(&id).unwrap().created_at;

        let mut change = update("final");
        change.kind = BlockKind::Link;
        assert!(state.update_block(&id, change).unwrap());

        let block = state.block(&id).unwrap();
        assert_eq!(block.content, "final");
        assert_eq!(block.kind, BlockKind::Link);
        assert_eq!(block.title, None);
        assert_eq!(block.tags, vec!["a", "b"]);
        assert_eq!(block.created_at, created_at);
        assert_eq!(block.channel_id.as_deref(), Some(channel.as_str()));
    }

    #[test]
    fn test_update_missing_block_reports_not_found() {
        let mut state = AppState::empty();
        state
            .create_block(BlockKind::Text, "one", BlockFields::default(), None)
            .unwrap();
        let err = state.update_block("ghost", update("x")).unwrap_err();
        assert_eq!(err, BoardError::BlockNotFound("ghost".to_string()));
        assert_eq!(state.blocks.len(), 1);
    }

    #[test]
    fn test_update_blank_content_is_noop() {
        let mut state = AppState::empty();
        let id = state
            .create_block(BlockKind::Text, "keep", BlockFields::default(), None)
            .unwrap()
            .unwrap();
        assert!(!state.update_block(&id, update(" ")).unwrap());
        assert_eq!(state.block(&id).unwrap().content, "keep");
    }

    #[test]
    fn test_delete_block() {
        let mut state = AppState::empty();
        let id = state
            .create_block(BlockKind::Text, "bye", BlockFields::default(), None)
            .unwrap()
            .unwrap();
        assert!(state.delete_block(&id));
        assert!(!state.delete_block(&id));
        assert!(state.blocks.is_empty());
    }
}
