//! AI enrichment: per-block analysis and cross-block connections.
//!
//! [`EnrichmentService`] sits on top of any [`LanguageModel`] backend and
//! owns the parts that don't depend on the wire format: prompt building,
//! input truncation, response validation, and the fallbacks.
//!
//! Enrichment is advisory. Neither operation returns an error: a missing
//! credential or a failed call turns into a fixed payload that callers
//! treat as an ordinary (if unhelpful) result.
//!
//! | Situation | `analyze_content` | `find_connections` |
//! |-----------|-------------------|--------------------|
//! | no credential | [`Analysis::unconfigured`], no request | [`NO_CREDENTIAL_INSIGHT`], no request |
//! | backend error / bad response | [`Analysis::failed`] | [`FAILED_INSIGHT`] |

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::models::{Analysis, Block, BlockKind};

/// Content beyond this many characters is cut before analysis.
pub const ANALYSIS_CHAR_LIMIT: usize = 5000;
/// Only this many blocks are sent when looking for connections.
pub const CONNECTIONS_MAX_BLOCKS: usize = 20;
/// Per-block preview length in the connections prompt.
pub const CONNECTIONS_PREVIEW_CHARS: usize = 150;
/// Tag count upper bound kept from a response.
pub const MAX_TAGS: usize = 5;

pub const NO_CREDENTIAL_INSIGHT: &str =
    "Add an API key (cork key set <KEY>) to discover connections between your blocks.";
pub const FAILED_INSIGHT: &str = "Could not generate connections. Check your API key.";
pub const TOO_FEW_BLOCKS_INSIGHT: &str = "Add at least two blocks to find connections.";

const ANALYSIS_FAILED_SUMMARY: &str = "Analysis failed or Key invalid.";

impl Analysis {
    /// Result when no credential is configured.
    pub fn unconfigured() -> Self {
        Self {
            title: "Untitled".to_string(),
            summary: String::new(),
            tags: Vec::new(),
        }
    }

    /// Result when the backend call or its response was unusable.
    pub fn failed() -> Self {
        Self {
            title: "Untitled".to_string(),
            summary: ANALYSIS_FAILED_SUMMARY.to_string(),
            tags: vec!["error".to_string()],
        }
    }
}

/// A hosted generative-language backend.
///
/// Implementations perform one request per call and return the raw model
/// text; validation happens in [`EnrichmentService`].
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Generate a JSON document constrained to `schema`.
    async fn generate_structured(&self, api_key: &str, prompt: &str, schema: &Value)
        -> Result<String>;

    /// Generate free text.
    async fn generate_text(&self, api_key: &str, prompt: &str) -> Result<String>;
}

/// Response schema for [`EnrichmentService::analyze_content`].
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "summary": { "type": "STRING" },
            "tags": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["title", "summary", "tags"]
    })
}

/// First `limit` characters of `text` (char-boundary safe).
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn analysis_prompt(content: &str, kind: BlockKind) -> String {
    let kind = match kind {
        BlockKind::Text => "text note",
        BlockKind::Link => "link",
        BlockKind::Image => "image reference",
    };
    format!(
        "Analyze the following {kind} saved to a personal collection.\n\
         Return a short title of at most 6 words, a one-sentence summary, \
         and 3 to 5 relevant tags. Each tag must be a single lowercase word.\n\n\
         Content:\n{}",
        truncate_chars(content, ANALYSIS_CHAR_LIMIT)
    )
}

pub fn connections_prompt(blocks: &[&Block]) -> String {
    let mut prompt = String::from(
        "Here are items saved to a personal collection. Identify a hidden theme, \
         pattern, or connection that spans several of them. Answer in two or three \
         sentences and mention the items by number.\n",
    );
    for (i, block) in blocks.iter().take(CONNECTIONS_MAX_BLOCKS).enumerate() {
        let preview = truncate_chars(&block.content, CONNECTIONS_PREVIEW_CHARS);
        match block.title.as_deref() {
            Some(title) => {
                prompt.push_str(&format!("\n[{}] ({}) {}: {}", i + 1, block.kind, title, preview))
            }
            None => prompt.push_str(&format!("\n[{}] ({}) {}", i + 1, block.kind, preview)),
        }
    }
    prompt
}

#[derive(Deserialize)]
struct RawAnalysis {
    title: String,
    summary: String,
    tags: Vec<String>,
}

/// Validate and normalise a structured analysis response.
pub fn parse_analysis(raw: &str) -> Result<Analysis> {
    let parsed: RawAnalysis = serde_json::from_str(raw.trim())?;

    let title = parsed.title.trim();
    if title.is_empty() {
        bail!("analysis response has an empty title");
    }

    let tags = parsed
        .tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .take(MAX_TAGS)
        .collect();

    Ok(Analysis {
        title: title.to_string(),
        summary: parsed.summary.trim().to_string(),
        tags,
    })
}

/// Analysis and connection finding with graceful degradation.
#[derive(Clone)]
pub struct EnrichmentService {
    model: Arc<dyn LanguageModel>,
}

impl EnrichmentService {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Suggest a title, summary and tags for one piece of content.
    pub async fn analyze_content(
        &self,
        api_key: Option<&str>,
        content: &str,
        kind: BlockKind,
    ) -> Analysis {
        let Some(api_key) = usable_key(api_key) else {
            debug!("no credential, skipping analysis");
            return Analysis::unconfigured();
        };

        let prompt = analysis_prompt(content, kind);
        let result = self
            .model
            .generate_structured(api_key, &prompt, &analysis_schema())
            .await
            .and_then(|raw| parse_analysis(&raw));

        match result {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(model = %self.model.model_name(), "Analysis failed: {:#}", e);
                Analysis::failed()
            }
        }
    }

    /// Ask for a theme connecting several blocks.
    ///
    /// Callers should not bother with fewer than two blocks; see
    /// [`TOO_FEW_BLOCKS_INSIGHT`].
    pub async fn find_connections(&self, api_key: Option<&str>, blocks: &[&Block]) -> String {
        let Some(api_key) = usable_key(api_key) else {
            debug!("no credential, skipping connections");
            return NO_CREDENTIAL_INSIGHT.to_string();
        };

        let prompt = connections_prompt(blocks);
        match self.model.generate_text(api_key, &prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!(model = %self.model.model_name(), "Connections response was empty");
                FAILED_INSIGHT.to_string()
            }
            Err(e) => {
                warn!(model = %self.model.model_name(), "Connections failed: {:#}", e);
                FAILED_INSIGHT.to_string()
            }
        }
    }
}

fn usable_key(api_key: Option<&str>) -> Option<&str> {
    api_key.map(str::trim).filter(|k| !k.is_empty())
}
