//! # Corkboard Core
//!
//! Runtime-free logic for Corkboard: the block/channel data model, the
//! taxonomy and content operations, snapshot load/merge/save over an
//! abstract key-value store, edit sessions, and the enrichment service over
//! an abstract language-model backend.
//!
//! This crate contains no tokio, sqlx, reqwest, or filesystem I/O. The
//! SQLite store and the HTTP model client live in the `corkboard` app crate.

pub mod content;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod persistence;
pub mod session;
pub mod store;
pub mod taxonomy;
