//! # Corkboard CLI (`cork`)
//!
//! The `cork` binary is the interface to a local corkboard: channels grouped
//! into verticals, blocks of text, links and images pinned to them, and
//! optional AI enrichment through the Gemini API.
//!
//! ## Usage
//!
//! ```bash
//! cork --config ./config/cork.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cork init` | Create the SQLite database |
//! | `cork channels` | List channels grouped by vertical |
//! | `cork channel new "Design/Patterns"` | Create a channel (and make it active) |
//! | `cork channel use <channel>\|all` | Switch the active channel |
//! | `cork vertical rename <old> <new>` | Move every channel of a vertical |
//! | `cork blocks --search <term>` | List visible blocks, newest first |
//! | `cork add <content>` | Pin a block to the active channel |
//! | `cork edit <id> --analyze` | Edit a block, optionally AI-filling its fields |
//! | `cork connect` | Ask the model for themes across visible blocks |
//! | `cork key set <key>` | Store the Gemini API key |
//! | `cork export` | Dump the whole board as JSON |
//!
//! A missing config file is not an error: the defaults keep the database at
//! `./data/cork.sqlite` and use the Gemini backend.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use corkboard::app::AppController;
use corkboard::commands::{self, AddArgs, EditArgs};
use corkboard::{config, export, migrate};
use corkboard_core::models::BlockKind;

/// Corkboard: a local board of channels and blocks with optional AI
/// enrichment.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cork.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cork",
    about = "Corkboard: pin text, links and images to channels, with optional AI enrichment",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cork.toml`. Built-in defaults are used when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/cork.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database. Safe to run repeatedly.
    Init,

    /// List channels, grouped by vertical. The active channel is marked `*`.
    Channels,

    /// Manage channels.
    Channel {
        #[command(subcommand)]
        action: ChannelAction,
    },

    /// Manage verticals (channel groups).
    Vertical {
        #[command(subcommand)]
        action: VerticalAction,
    },

    /// List blocks in the active channel (or all), newest first.
    Blocks {
        /// Case-insensitive filter on content, title and tags.
        #[arg(long, short, default_value = "")]
        search: String,
    },

    /// Show one block in full.
    Show {
        /// Block id or unique id prefix.
        block: String,
    },

    /// Add a block.
    ///
    /// The type is detected from the content (`http(s)://` is a link,
    /// `data:image` is an image) unless `--type` is given.
    Add {
        /// Block content. Optional when `--image` is given.
        content: Option<String>,

        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<BlockKind>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Comma-separated tags.
        #[arg(long)]
        tags: Option<String>,

        /// Target channel (id, title or `Vertical/Title`). Defaults to the
        /// active channel.
        #[arg(long)]
        channel: Option<String>,

        /// Embed an image file as a data URL.
        #[arg(long, value_name = "FILE", conflicts_with = "content")]
        image: Option<PathBuf>,

        /// Fill title, description and tags from the model when not given.
        #[arg(long)]
        analyze: bool,
    },

    /// Edit a block.
    Edit {
        /// Block id or unique id prefix.
        block: String,

        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<BlockKind>,

        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Comma-separated tags; replaces the existing tags.
        #[arg(long)]
        tags: Option<String>,

        /// Run AI analysis on the edited content before saving.
        #[arg(long)]
        analyze: bool,
    },

    /// Delete a block.
    Delete {
        block: String,

        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },

    /// Print an AI analysis of a block without changing it.
    Analyze { block: String },

    /// Ask the model for themes connecting the visible blocks.
    Connect {
        #[arg(long, short, default_value = "")]
        search: String,
    },

    /// Manage the stored Gemini API key.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Export the whole board, including the API key, as JSON.
    Export {
        /// Write to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ChannelAction {
    /// Create a channel. `Vertical/Title` files it under a vertical.
    New { name: String },
    /// Rename (and possibly regroup) a channel.
    Rename { channel: String, name: String },
    /// Delete a channel and every block in it.
    Delete {
        channel: String,
        #[arg(long)]
        yes: bool,
    },
    /// Make a channel active; `all` clears the selection.
    Use { channel: String },
}

#[derive(Subcommand)]
enum VerticalAction {
    /// Move every channel of a vertical to a new name.
    Rename { old: String, new: String },
    /// Ungroup every channel of a vertical.
    Dissolve { name: String },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store a key.
    Set { value: String },
    /// Remove the stored key.
    Clear,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "corkboard=debug,corkboard_core=debug"
    } else {
        "corkboard=warn,corkboard_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!(path = %cli.config.display(), "config not found, using defaults");
        config::Config::minimal()
    };

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized at {}", cfg.db.path.display());
        return Ok(());
    }

    let mut app = AppController::open(&cfg).await?;

    match cli.command {
        // Handled before the store is opened.
        Commands::Init => {}
        Commands::Channels => commands::run_channels(&app),
        Commands::Channel { action } => match action {
            ChannelAction::New { name } => commands::run_channel_new(&mut app, &name).await?,
            ChannelAction::Rename { channel, name } => {
                commands::run_channel_rename(&mut app, &channel, &name).await?
            }
            ChannelAction::Delete { channel, yes } => {
                commands::run_channel_delete(&mut app, &channel, yes).await?
            }
            ChannelAction::Use { channel } => commands::run_channel_use(&mut app, &channel).await?,
        },
        Commands::Vertical { action } => match action {
            VerticalAction::Rename { old, new } => {
                commands::run_vertical_rename(&mut app, &old, &new).await?
            }
            VerticalAction::Dissolve { name } => {
                commands::run_vertical_dissolve(&mut app, &name).await?
            }
        },
        Commands::Blocks { search } => commands::run_blocks(&app, &search),
        Commands::Show { block } => commands::run_show(&app, &block)?,
        Commands::Add {
            content,
            kind,
            title,
            description,
            tags,
            channel,
            image,
            analyze,
        } => {
            commands::run_add(
                &mut app,
                AddArgs {
                    content,
                    kind,
                    title,
                    description,
                    tags,
                    channel,
                    image,
                    analyze,
                },
            )
            .await?
        }
        Commands::Edit {
            block,
            kind,
            content,
            title,
            description,
            tags,
            analyze,
        } => {
            commands::run_edit(
                &mut app,
                EditArgs {
                    block,
                    kind,
                    content,
                    title,
                    description,
                    tags,
                    analyze,
                },
            )
            .await?
        }
        Commands::Delete { block, yes } => commands::run_delete(&mut app, &block, yes).await?,
        Commands::Analyze { block } => commands::run_analyze(&app, &block).await?,
        Commands::Connect { search } => commands::run_connect(&mut app, &search).await?,
        Commands::Key { action } => match action {
            KeyAction::Set { value } => commands::run_key_set(&mut app, &value).await?,
            KeyAction::Clear => commands::run_key_clear(&mut app).await?,
        },
        Commands::Export { output } => export::run_export(&app, output.as_deref())?,
    }

    Ok(())
}
