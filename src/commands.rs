//! CLI command handlers.
//!
//! Each `run_*` function drives one subcommand through the
//! [`AppController`] and prints a human-readable result. Records can be
//! referred to by full id, by a unique id prefix (the 8-character short ids
//! printed by `cork blocks` / `cork channels`), and channels also by title or
//! `Vertical/Title`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::Engine;

use corkboard_core::content::parse_tags;
use corkboard_core::models::{AppState, Block, BlockFields, BlockKind, Channel};
use corkboard_core::session::{Committed, DraftChange};

use crate::app::AppController;

const SHORT_ID: usize = 8;
const MIN_PREFIX: usize = 4;

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID).unwrap_or(id)
}

/// Find a channel by id, unique id prefix, title, or `Vertical/Title`.
pub fn resolve_channel(state: &AppState, reference: &str) -> Result<String> {
    let reference = reference.trim();
    if let Some(channel) = state.channel(reference) {
        return Ok(channel.id.clone());
    }

    let wanted = reference.to_lowercase();
    let by_name: Vec<&Channel> = state
        .channels
        .iter()
        .filter(|c| {
            let title = c.title.to_lowercase();
            let qualified = match &c.vertical {
                Some(v) => format!("{}/{}", v.to_lowercase(), title),
                None => title.clone(),
            };
            title == wanted || qualified == wanted
        })
        .collect();
    let candidates = if by_name.is_empty() && reference.len() >= MIN_PREFIX {
        state
            .channels
            .iter()
            .filter(|c| c.id.starts_with(reference))
            .collect()
    } else {
        by_name
    };

    match candidates.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => bail!("channel not found: {}", reference),
        many => bail!(
            "'{}' matches {} channels; use the id instead",
            reference,
            many.len()
        ),
    }
}

/// Find a block by id or unique id prefix.
pub fn resolve_block(state: &AppState, reference: &str) -> Result<String> {
    let reference = reference.trim();
    if let Some(block) = state.block(reference) {
        return Ok(block.id.clone());
    }
    if reference.len() < MIN_PREFIX {
        bail!("block not found: {}", reference);
    }
    let matches: Vec<&Block> = state
        .blocks
        .iter()
        .filter(|b| b.id.starts_with(reference))
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => bail!("block not found: {}", reference),
        many => bail!("'{}' matches {} blocks; use more of the id", reference, many.len()),
    }
}

/// Read an image file into a `data:` URL.
pub fn image_data_url(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        other => bail!("Unsupported image type: '{}'", other),
    };
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image: {}", path.display()))?;
    Ok(format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    ))
}

fn format_ts(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn preview(block: &Block) -> String {
    if let Some(title) = block.title.as_deref() {
        return title.to_string();
    }
    let first_line = block.content.lines().next().unwrap_or_default();
    if block.kind == BlockKind::Image && first_line.starts_with("data:") {
        return "[embedded image]".to_string();
    }
    let mut text: String = first_line.chars().take(60).collect();
    if first_line.chars().count() > 60 {
        text.push('…');
    }
    text
}

// ============ Channels ============

pub fn run_channels(app: &AppController) {
    let state = app.state();
    let groups = app.list_channels();
    let active = state.active_channel_id.as_deref();

    let print = |channel: &Channel| {
        let marker = if Some(channel.id.as_str()) == active { "*" } else { " " };
        let count = state
            .blocks
            .iter()
            .filter(|b| b.channel_id.as_deref() == Some(channel.id.as_str()))
            .count();
        println!(
            "  {} {:<24} {:>4}  {}",
            marker,
            channel.title,
            count,
            short_id(&channel.id)
        );
    };

    println!("General");
    for channel in &groups.general {
        print(*channel);
    }
    for (vertical, channels) in &groups.verticals {
        println!("{}", vertical);
        for channel in channels {
            print(*channel);
        }
    }

    let unfiled = state.blocks.iter().filter(|b| b.channel_id.is_none()).count();
    if unfiled > 0 {
        println!("({} unfiled blocks)", unfiled);
    }
    if active.is_none() {
        println!("(showing all blocks)");
    }
}

pub async fn run_channel_new(app: &mut AppController, name: &str) -> Result<()> {
    match app.create_channel(name).await {
        Some(id) => println!("Created channel {}", short_id(&id)),
        None => println!("Nothing to create: channel name is empty."),
    }
    Ok(())
}

pub async fn run_channel_rename(app: &mut AppController, channel: &str, name: &str) -> Result<()> {
    let id = resolve_channel(app.state(), channel)?;
    if app.rename_channel(&id, name).await? {
        println!("Renamed channel {}", short_id(&id));
    } else {
        println!("No change.");
    }
    Ok(())
}

pub async fn run_channel_delete(app: &mut AppController, channel: &str, yes: bool) -> Result<()> {
    let id = resolve_channel(app.state(), channel)?;
    if !yes {
        bail!("Refusing to delete a channel and its blocks without --yes");
    }
    let removed = app.delete_channel(&id).await?;
    println!("Deleted channel {} and {} blocks", short_id(&id), removed);
    Ok(())
}

pub async fn run_channel_use(app: &mut AppController, channel: &str) -> Result<()> {
    if channel.eq_ignore_ascii_case("all") {
        app.set_active_channel(None).await?;
        println!("Showing all blocks");
        return Ok(());
    }
    let id = resolve_channel(app.state(), channel)?;
    app.set_active_channel(Some(&id)).await?;
    println!("Active channel: {}", short_id(&id));
    Ok(())
}

pub async fn run_vertical_rename(app: &mut AppController, old: &str, new: &str) -> Result<()> {
    let touched = app.rename_vertical(old, new).await;
    println!("Moved {} channels", touched);
    Ok(())
}

pub async fn run_vertical_dissolve(app: &mut AppController, name: &str) -> Result<()> {
    let touched = app.dissolve_vertical(name).await;
    println!("Ungrouped {} channels", touched);
    Ok(())
}

// ============ Blocks ============

pub fn run_blocks(app: &AppController, search: &str) {
    let state = app.state();
    let blocks = app.list_visible_blocks(search);
    if blocks.is_empty() {
        println!("No blocks.");
        return;
    }
    for block in blocks {
        let channel = block
            .channel_id
            .as_deref()
            .and_then(|id| state.channel(id))
            .map(|c| c.title.as_str())
            .unwrap_or("unfiled");
        println!(
            "{}  {:<5}  {}  {}",
            short_id(&block.id),
            block.kind.as_str(),
            format_ts(block.created_at),
            preview(block)
        );
        let tags: Vec<String> = block.tags.iter().map(|t| format!("#{}", t)).collect();
        println!("          [{}] {}", channel, tags.join(" "));
    }
}

/// Input for `cork add`.
pub struct AddArgs {
    pub content: Option<String>,
    pub kind: Option<BlockKind>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub channel: Option<String>,
    pub image: Option<std::path::PathBuf>,
    pub analyze: bool,
}

pub async fn run_add(app: &mut AppController, args: AddArgs) -> Result<()> {
    let (content, detected) = match (&args.image, args.content) {
        (Some(path), _) => (image_data_url(path)?, BlockKind::Image),
        (None, Some(content)) => {
            let kind = BlockKind::detect(&content);
            (content, kind)
        }
        (None, None) => bail!("Provide CONTENT or --image"),
    };
    let kind = args.kind.unwrap_or(detected);

    let channel_id = match args.channel.as_deref() {
        Some(reference) => Some(resolve_channel(app.state(), reference)?),
        None => None,
    };

    let mut fields = BlockFields {
        title: args.title,
        description: args.description,
        tags: args.tags.as_deref().map(parse_tags).unwrap_or_default(),
    };

    if args.analyze {
        let analysis = app.analyze_content(&content, kind).await;
        fields.title = fields.title.or(Some(analysis.title));
        if fields.description.is_none() && !analysis.summary.is_empty() {
            fields.description = Some(analysis.summary);
        }
        if fields.tags.is_empty() {
            fields.tags = analysis.tags;
        }
    }

    match app
        .create_block(kind, &content, fields, channel_id.as_deref())
        .await?
    {
        Some(id) => println!("Created block {}", short_id(&id)),
        None => println!("Nothing to add: content is empty."),
    }
    Ok(())
}

/// Input for `cork edit`.
pub struct EditArgs {
    pub block: String,
    pub kind: Option<BlockKind>,
    pub content: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub analyze: bool,
}

pub async fn run_edit(app: &mut AppController, args: EditArgs) -> Result<()> {
    let id = resolve_block(app.state(), &args.block)?;
    app.begin_edit(Some(&id))?;
    app.edit_draft(DraftChange {
        kind: args.kind,
        content: args.content,
        title: args.title,
        description: args.description,
        tags: args.tags,
    })?;

    if args.analyze && !app.analyze_draft().await? {
        eprintln!("Analysis result arrived too late and was discarded.");
    }

    match app.commit_edit().await? {
        Committed::Updated(id) | Committed::Created(id) => {
            println!("Updated block {}", short_id(&id))
        }
        Committed::Rejected => {
            app.close_edit();
            bail!("Block content cannot be empty");
        }
    }
    Ok(())
}

pub async fn run_delete(app: &mut AppController, block: &str, yes: bool) -> Result<()> {
    let id = resolve_block(app.state(), block)?;
    if !yes {
        bail!("Refusing to delete a block without --yes");
    }
    app.delete_block(&id).await;
    println!("Deleted block {}", short_id(&id));
    Ok(())
}

pub fn run_show(app: &AppController, block: &str) -> Result<()> {
    let id = resolve_block(app.state(), block)?;
    let state = app.state();
    let Some(block) = state.block(&id) else {
        bail!("block not found: {}", id);
    };
    println!("id:          {}", block.id);
    println!("type:        {}", block.kind);
    println!("created:     {}", format_ts(block.created_at));
    println!(
        "channel:     {}",
        block
            .channel_id
            .as_deref()
            .and_then(|c| state.channel(c))
            .map(|c| c.title.as_str())
            .unwrap_or("unfiled")
    );
    println!("title:       {}", block.title.as_deref().unwrap_or(""));
    println!("description: {}", block.description.as_deref().unwrap_or(""));
    println!("tags:        {}", block.tags.join(", "));
    println!();
    println!("{}", block.content);
    Ok(())
}

// ============ Enrichment ============

pub async fn run_analyze(app: &AppController, block: &str) -> Result<()> {
    let id = resolve_block(app.state(), block)?;
    let Some(block) = app.state().block(&id) else {
        bail!("block not found: {}", id);
    };
    if !app.state().has_api_key() {
        eprintln!("No API key configured. Set one with `cork key set <KEY>`.");
    }
    let analysis = app.analyze_content(&block.content, block.kind).await;
    println!("title:   {}", analysis.title);
    println!("summary: {}", analysis.summary);
    println!("tags:    {}", analysis.tags.join(", "));
    Ok(())
}

pub async fn run_connect(app: &mut AppController, search: &str) -> Result<()> {
    if let Some(text) = app.discover_connections(search).await {
        println!("{}", text);
    }
    Ok(())
}

pub async fn run_key_set(app: &mut AppController, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("API key must not be empty; use `cork key clear` to remove it");
    }
    if !app.set_api_key(Some(value)).await {
        bail!("Failed to store the API key");
    }
    println!("API key saved.");
    Ok(())
}

pub async fn run_key_clear(app: &mut AppController) -> Result<()> {
    if !app.set_api_key(None).await {
        bail!("Failed to clear the API key");
    }
    println!("API key cleared.");
    Ok(())
}
