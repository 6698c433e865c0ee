//! # Corkboard
//!
//! A local-first capture board for text, links, and images.
//!
//! Blocks are pinned to channels; channels are optionally grouped into
//! verticals by a `Vertical/Title` naming convention. The whole board is
//! one in-memory state that is snapshotted to a key-value table in SQLite
//! after every change. An optional language-model backend (Gemini) suggests
//! titles, summaries and tags for a block, and finds themes across blocks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────────┐
//! │   CLI    │──▶│ AppController │──▶│ Persistence  │──▶ SQLite kv
//! │  (cork)  │   │   AppState    │   └──────────────┘
//! └──────────┘   └──────┬────────┘
//!                       │          ┌──────────────┐
//!                       └─────────▶│  Enrichment  │──▶ Gemini API
//!                                  └──────────────┘
//! ```
//!
//! The domain logic (taxonomy, content, sessions, snapshot format, prompt
//! construction) lives in the runtime-free `corkboard-core` crate. This crate
//! supplies the SQLite store, the HTTP model backend, configuration, and
//! the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite key-value store |
//! | [`gemini`] | Language-model backends |
//! | [`app`] | The application controller |
//! | [`commands`] | CLI command handlers |
//! | [`export`] | JSON export |

pub mod app;
pub mod commands;
pub mod config;
pub mod db;
pub mod export;
pub mod gemini;
pub mod migrate;
pub mod sqlite_store;

pub use corkboard_core;
