//! Shortcut tracker client and story-enrichment pipeline.

mod client;
mod enrich;
mod partial;

pub use client::{ShortcutClient, ShortcutError, DEFAULT_BASE_URL};
