//! Channels and the vertical grouping derived from them.
//!
//! There is no vertical record. A vertical exists exactly as long as at least
//! one channel carries its name in [`Channel::vertical`], so renaming or
//! dissolving one is a bulk rewrite of that field across channels.
//!
//! # Name syntax
//!
//! Channel names typed by the user may carry their vertical inline:
//!
//! | Input | Vertical | Title |
//! |-------|----------|-------|
//! | `Inbox` | none | `Inbox` |
//! | `Design/Patterns` | `Design` | `Patterns` |
//! | `Design / UI/UX` | `Design` | `UI/UX` |
//! | `/Loose` | none | `Loose` |
//!
//! Only the first `/` splits; both sides are trimmed.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{BoardError, BoardResult};
use crate::models::{new_id, now_millis, AppState, Channel};

/// A parsed `vertical/title` channel name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelName {
    pub vertical: Option<String>,
    pub title: String,
}

/// Parse raw user input into a channel name.
///
/// Returns `None` when there is no usable title (blank input, or nothing
/// after the separator).
pub fn parse_channel_name(raw: &str) -> Option<ChannelName> {
    let (vertical, title) = match raw.split_once('/') {
        Some((v, t)) => (Some(v.trim()), t.trim()),
        None => (None, raw.trim()),
    };

    if title.is_empty() {
        return None;
    }

    Some(ChannelName {
        vertical: vertical.filter(|v| !v.is_empty()).map(str::to_string),
        title: title.to_string(),
    })
}

/// Lowercase, hyphen-joined form of a title. Cosmetic only.
pub fn slugify(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Channels partitioned for display.
#[derive(Debug, Default)]
pub struct ChannelGroups<'a> {
    /// Channels with no vertical, shown under "General".
    pub general: Vec<&'a Channel>,
    /// Vertical name to member channels, keys in sorted order.
    pub verticals: BTreeMap<String, Vec<&'a Channel>>,
}

/// Partition channels into the ungrouped list and per-vertical groups.
///
/// Member order inside each group follows the input order.
pub fn group_for_display(channels: &[Channel]) -> ChannelGroups<'_> {
    let mut groups = ChannelGroups::default();
    for channel in channels {
        match &channel.vertical {
            Some(v) => groups.verticals.entry(v.clone()).or_default().push(channel),
            None => groups.general.push(channel),
        }
    }
    groups
}

impl AppState {
    /// Create a channel from raw `vertical/title` input and make it active.
    ///
    /// Returns the new channel's id, or `None` if the name was blank.
    pub fn create_channel(&mut self, raw_name: &str) -> Option<String> {
        let name = parse_channel_name(raw_name)?;
        let channel = Channel {
            id: new_id(),
            slug: slugify(&name.title),
            title: name.title,
            vertical: name.vertical,
            created_at: now_millis(),
        };
        let id = channel.id.clone();
        debug!(channel = %id, title = %channel.title, "created channel");
        self.channels.push(channel);
        self.active_channel_id = Some(id.clone());
        Some(id)
    }

    /// Rename a channel in place, re-parsing the vertical.
    ///
    /// `Ok(false)` when the name is blank or nothing changed.
    pub fn rename_channel(&mut self, id: &str, new_raw_name: &str) -> BoardResult<bool> {
        let channel = self
            .channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| BoardError::ChannelNotFound(id.to_string()))?;

        let Some(name) = parse_channel_name(new_raw_name) else {
            return Ok(false);
        };
        if name.title == channel.title && name.vertical == channel.vertical {
            return Ok(false);
        }

        channel.slug = slugify(&name.title);
        channel.title = name.title;
        channel.vertical = name.vertical;
        Ok(true)
    }

    /// Delete a channel together with every block filed in it.
    ///
    /// Returns the number of blocks removed by the cascade.
    pub fn delete_channel(&mut self, id: &str) -> BoardResult<usize> {
        let before = self.channels.len();
        self.channels.retain(|c| c.id != id);
        if self.channels.len() == before {
            return Err(BoardError::ChannelNotFound(id.to_string()));
        }

        let blocks_before = self.blocks.len();
        self.blocks
            .retain(|b| b.channel_id.as_deref() != Some(id));
        let removed = blocks_before - self.blocks.len();

        if self.active_channel_id.as_deref() == Some(id) {
            self.active_channel_id = None;
        }
        debug!(channel = %id, removed, "deleted channel");
        Ok(removed)
    }

    /// Move every channel in vertical `old` to vertical `new`.
    ///
    /// Returns how many channels were rewritten. A blank `new`, or one equal
    /// to `old`, changes nothing.
    pub fn rename_vertical(&mut self, old: &str, new: &str) -> usize {
        let old = old.trim();
        let new = new.trim();
        if new.is_empty() || new == old {
            return 0;
        }
        let mut touched = 0;
        for channel in self
            .channels
            .iter_mut()
            .filter(|c| c.vertical.as_deref() == Some(old))
        {
            channel.vertical = Some(new.to_string());
            touched += 1;
        }
        touched
    }

    /// Ungroup every channel in vertical `name`. Channels and blocks survive.
    pub fn dissolve_vertical(&mut self, name: &str) -> usize {
        let name = name.trim();
        let mut touched = 0;
        for channel in self
            .channels
            .iter_mut()
            .filter(|c| c.vertical.as_deref() == Some(name))
        {
            channel.vertical = None;
            touched += 1;
        }
        touched
    }

    /// Select a channel filter, or `None` for all blocks.
    pub fn set_active_channel(&mut self, id: Option<&str>) -> BoardResult<()> {
        match id {
            Some(id) if self.channel(id).is_none() => {
                Err(BoardError::ChannelNotFound(id.to_string()))
            }
            _ => {
                self.active_channel_id = id.map(str::to_string);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Block, BlockKind};

    fn block_in(channel: Option<&str>, created_at: i64) -> Block {
        Block {
            id: new_id(),
            kind: BlockKind::Text,
            content: "note".to_string(),
            title: None,
            description: None,
            tags: Vec::new(),
            channel_id: channel.map(str::to_string),
            created_at,
        }
    }

    #[test]
    fn test_parse_plain_name() {
        let name = parse_channel_name("Inbox").unwrap();
        assert_eq!(name.vertical, None);
        assert_eq!(name.title, "Inbox");
    }

    #[test]
    fn test_parse_grouped_name() {
        let name = parse_channel_name("Design/Patterns").unwrap();
        assert_eq!(name.vertical.as_deref(), Some("Design"));
        assert_eq!(name.title, "Patterns");
    }

    #[test]
    fn test_parse_splits_on_first_slash_only() {
        let name = parse_channel_name("  Design / UI/UX  ").unwrap();
        assert_eq!(name.vertical.as_deref(), Some("Design"));
        assert_eq!(name.title, "UI/UX");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(parse_channel_name("").is_none());
        assert!(parse_channel_name("   ").is_none());
        assert!(parse_channel_name("Design/").is_none());
        assert!(parse_channel_name("Design/   ").is_none());
    }

    #[test]
    fn test_parse_empty_vertical_is_ungrouped() {
        let name = parse_channel_name(" / Loose").unwrap();
        assert_eq!(name.vertical, None);
        assert_eq!(name.title, "Loose");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Reading  List"), "reading-list");
        assert_eq!(slugify("UI/UX"), "ui/ux");
    }

    #[test]
    fn test_create_channel_becomes_active() {
        let mut state = AppState::empty();
        let id = state.create_channel("Design/Patterns").unwrap();
        let channel = state.channel(&id).unwrap();
        assert_eq!(channel.vertical.as_deref(), Some("Design"));
        assert_eq!(channel.title, "Patterns");
        assert_eq!(channel.slug, "patterns");
        assert_eq!(state.active_channel_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_create_channel_blank_is_noop() {
        let mut state = AppState::empty();
        assert!(state.create_channel("  ").is_none());
        assert!(state.channels.is_empty());
        assert!(state.active_channel_id.is_none());
    }

    #[test]
    fn test_rename_channel() {
        let mut state = AppState::empty();
        let id = state.create_channel("Inbox").unwrap();

        assert!(state.rename_channel(&id, "Work/Todo").unwrap());
        let channel = state.channel(&id).unwrap();
        assert_eq!(channel.title, "Todo");
        assert_eq!(channel.vertical.as_deref(), Some("Work"));

        assert!(!state.rename_channel(&id, "Work/Todo").unwrap());
        assert!(!state.rename_channel(&id, "   ").unwrap());
        assert_eq!(state.channel(&id).unwrap().title, "Todo");
    }

    #[test]
    fn test_rename_missing_channel() {
        let mut state = AppState::empty();
        assert_eq!(
            state.rename_channel("nope", "x"),
            Err(BoardError::ChannelNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_delete_channel_cascades() {
        let mut state = AppState::empty();
        let a = state.create_channel("A").unwrap();
        let b = state.create_channel("B").unwrap();
        state.blocks.push(block_in(Some(&a), 1));
        state.blocks.push(block_in(Some(&b), 2));
        state.blocks.push(block_in(Some(&a), 3));
        state.blocks.push(block_in(None, 4));

        assert_eq!(state.delete_channel(&a).unwrap(), 2);
        assert!(state
            .blocks
            .iter()
            .all(|blk| blk.channel_id.as_deref() != Some(a.as_str())));
        assert_eq!(state.blocks.len(), 2);
        // b was active and survives
        assert_eq!(state.active_channel_id.as_deref(), Some(b.as_str()));
    }

    #[test]
    fn test_delete_active_channel_resets_filter() {
        let mut state = AppState::empty();
        let id = state.create_channel("Only").unwrap();
        state.delete_channel(&id).unwrap();
        assert!(state.active_channel_id.is_none());
        assert!(state.channels.is_empty());
    }

    #[test]
    fn test_delete_missing_channel() {
        let mut state = AppState::empty();
        state.blocks.push(block_in(None, 1));
        assert!(state.delete_channel("ghost").is_err());
        assert_eq!(state.blocks.len(), 1);
    }

    #[test]
    fn test_rename_vertical_regroups() {
        let mut state = AppState::empty();
        state.create_channel("Design/Inspiration").unwrap();
        state.create_channel("Design/Typography").unwrap();
        state.create_channel("Research/Papers").unwrap();

        assert_eq!(state.rename_vertical("Design", "Visual"), 2);

        let groups = group_for_display(&state.channels);
        assert!(!groups.verticals.contains_key("Design"));
        let visual: Vec<&str> = groups.verticals["Visual"]
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(visual, vec!["Inspiration", "Typography"]);
        assert_eq!(groups.verticals["Research"].len(), 1);
    }

    #[test]
    fn test_rename_vertical_noops() {
        let mut state = AppState::empty();
        state.create_channel("Design/Inspiration").unwrap();
        assert_eq!(state.rename_vertical("Design", ""), 0);
        assert_eq!(state.rename_vertical("Design", "Design"), 0);
        assert_eq!(state.rename_vertical("Missing", "Other"), 0);
        assert_eq!(state.channels[0].vertical.as_deref(), Some("Design"));
    }

    #[test]
    fn test_vertical_names_are_trimmed() {
        let mut state = AppState::empty();
        state.create_channel(" Design / Inspiration").unwrap();
        state.create_channel("Research/Papers").unwrap();

        assert_eq!(state.rename_vertical(" Design ", " Visual "), 1);
        assert_eq!(state.channels[0].vertical.as_deref(), Some("Visual"));
        assert_eq!(state.rename_vertical("Visual", " Visual"), 0);

        assert_eq!(state.dissolve_vertical("  Research"), 1);
        assert_eq!(state.channels[1].vertical, None);
    }

    #[test]
    fn test_dissolve_vertical_keeps_blocks() {
        let mut state = AppState::empty();
        let a = state.create_channel("Design/Inspiration").unwrap();
        state.create_channel("Design/Typography").unwrap();
        state.blocks.push(block_in(Some(&a), 1));

        assert_eq!(state.dissolve_vertical("Design"), 2);
        assert!(state
            .channels
            .iter()
            .all(|c| c.vertical.as_deref() != Some("Design")));
        assert_eq!(state.channels.len(), 2);
        assert_eq!(state.blocks.len(), 1);

        let groups = group_for_display(&state.channels);
        assert_eq!(groups.general.len(), 2);
        assert!(groups.verticals.is_empty());
    }

    #[test]
    fn test_group_keys_sorted() {
        let mut state = AppState::empty();
        state.create_channel("Zeta/One").unwrap();
        state.create_channel("Inbox").unwrap();
        state.create_channel("Alpha/Two").unwrap();

        let groups = group_for_display(&state.channels);
        let keys: Vec<&String> = groups.verticals.keys().collect();
        assert_eq!(keys, vec!["Alpha", "Zeta"]);
        assert_eq!(groups.general[0].title, "Inbox");
    }

    #[test]
    fn test_set_active_channel() {
        let mut state = AppState::empty();
        let id = state.create_channel("A").unwrap();
        state.set_active_channel(None).unwrap();
        assert!(state.active_channel_id.is_none());
        state.set_active_channel(Some(&id)).unwrap();
        assert_eq!(state.active_channel_id.as_deref(), Some(id.as_str()));
        assert!(state.set_active_channel(Some("ghost")).is_err());
        assert_eq!(state.active_channel_id.as_deref(), Some(id.as_str()));
    }
}
