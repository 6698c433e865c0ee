//! End-to-end behaviour of [`AppController`] over an in-memory store and a
//! scripted model backend.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use corkboard::app::AppController;
use corkboard_core::enrichment::{EnrichmentService, LanguageModel, TOO_FEW_BLOCKS_INSIGHT};
use corkboard_core::models::{BlockFields, BlockKind, BlockUpdate};
use corkboard_core::persistence::{Persistence, StorageKeys};
use corkboard_core::session::{Committed, DraftChange};
use corkboard_core::store::memory::InMemoryKv;
use corkboard_core::store::KvStore;

/// Replies with fixed text and remembers every prompt it was given.
struct FakeModel {
    analysis: String,
    connections: String,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            analysis: r#"{"title":"Grid Systems","summary":"A note on layout grids.","tags":["Design","layout"]}"#
                .to_string(),
            connections: "Items 1 and 2 are both about structure.".to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    fn model_name(&self) -> &str {
        "fake"
    }

    async fn generate_structured(&self, _api_key: &str, prompt: &str, _schema: &Value) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.analysis.clone())
    }

    async fn generate_text(&self, _api_key: &str, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.connections.clone())
    }
}

async fn controller(kv: Arc<InMemoryKv>, model: Arc<FakeModel>) -> AppController {
    let persistence = Persistence::new(kv, StorageKeys::default());
    AppController::new(persistence, EnrichmentService::new(model), None).await
}

#[tokio::test]
async fn test_state_survives_restart() {
    let kv = Arc::new(InMemoryKv::new());
    let model = FakeModel::new();

    let (channel, block) = {
        let mut app = controller(kv.clone(), model.clone()).await;
        let channel = app.create_channel("Design/Patterns").await.unwrap();
        let block = app
            .create_block(BlockKind::Link, "https://example.com", BlockFields::default(), None)
            .await
            .unwrap()
            .unwrap();
        app.set_api_key(Some("key-1")).await;
        (channel, block)
    };

    let app = controller(kv.clone(), model).await;
    let state = app.state();
    assert_eq!(state.active_channel_id.as_deref(), Some(channel.as_str()));
    let stored = state.block(&block).unwrap();
    assert_eq!(stored.channel_id.as_deref(), Some(channel.as_str()));
    assert_eq!(stored.kind, BlockKind::Link);
    assert_eq!(state.api_key.as_deref(), Some("key-1"));

    let snapshot = kv.get("corkboard_data").await.unwrap().unwrap();
    assert!(!snapshot.contains("key-1"));
}

#[tokio::test]
async fn test_load_repairs_dangling_references() {
    let snapshot = r#"{
        "blocks": [{"id":"b1","type":"TEXT","content":"orphan","tags":[],"channelId":"gone","createdAt":1}],
        "channels": [{"id":"c1","title":"Only","slug":"only","createdAt":1}],
        "activeChannelId": "also-gone"
    }"#;
    let kv = Arc::new(InMemoryKv::new().with_entry("corkboard_data", snapshot));
    let app = controller(kv, FakeModel::new()).await;

    let state = app.state();
    assert_eq!(state.active_channel_id, None);
    assert_eq!(state.blocks.len(), 1);
    assert_eq!(state.blocks[0].channel_id, None);
    assert_eq!(state.channels.len(), 1);
}

#[tokio::test]
async fn test_analysis_fills_draft_then_commits() {
    let model = FakeModel::new();
    let mut app = controller(Arc::new(InMemoryKv::new()), model.clone()).await;
    app.set_api_key(Some("k")).await;

    app.begin_edit(None).unwrap();
    app.edit_draft(DraftChange {
        content: Some("Notes on 12-column layouts".to_string()),
        ..DraftChange::default()
    })
    .unwrap();
    assert!(app.analyze_draft().await.unwrap());

    let draft = app.state().editing.clone().unwrap();
    assert_eq!(draft.title.as_deref(), Some("Grid Systems"));
    assert_eq!(draft.description.as_deref(), Some("A note on layout grids."));
    assert_eq!(draft.tags, vec!["design", "layout"]);

    let Committed::Created(id) = app.commit_edit().await.unwrap() else {
        panic!("expected a new block");
    };
    assert!(app.state().editing.is_none());
    let block = app.state().block(&id).unwrap();
    assert_eq!(block.title.as_deref(), Some("Grid Systems"));
    // Filed in the first seeded channel since none is active.
    assert_eq!(block.channel_id.as_deref(), Some(app.state().channels[0].id.as_str()));

    assert!(model.prompts()[0].contains("Notes on 12-column layouts"));
}

#[tokio::test]
async fn test_analysis_without_key_makes_no_request() {
    let model = FakeModel::new();
    let app = controller(Arc::new(InMemoryKv::new()), model.clone()).await;

    let analysis = app.analyze_content("anything", BlockKind::Text).await;
    assert_eq!(analysis.title, "Untitled");
    assert!(analysis.tags.is_empty());
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn test_connections_use_visible_blocks_only() {
    let model = FakeModel::new();
    let mut app = controller(Arc::new(InMemoryKv::new()), model.clone()).await;
    app.set_api_key(Some("k")).await;

    for i in 0..25 {
        app.create_block(BlockKind::Text, &format!("note {}", i), BlockFields::default(), None)
            .await
            .unwrap();
    }

    let text = app.discover_connections("").await.map(str::to_string);
    assert_eq!(text.as_deref(), Some("Items 1 and 2 are both about structure."));

    let prompt = model.prompts().pop().unwrap();
    assert!(prompt.contains("[20]"));
    assert!(!prompt.contains("[21]"));

    app.dismiss_insight();
    assert!(app.state().insight.is_none());

    // A search that narrows to one block never reaches the model.
    let before = model.prompts().len();
    let text = app.discover_connections("note 7").await.map(str::to_string);
    assert_eq!(text.as_deref(), Some(TOO_FEW_BLOCKS_INSIGHT));
    assert_eq!(model.prompts().len(), before);
}

#[tokio::test]
async fn test_update_and_delete_persist() {
    let kv = Arc::new(InMemoryKv::new());
    let model = FakeModel::new();

    let id = {
        let mut app = controller(kv.clone(), model.clone()).await;
        let id = app
            .create_block(BlockKind::Text, "before", BlockFields::default(), None)
            .await
            .unwrap()
            .unwrap();
        let changed = app
            .update_block(
                &id,
                BlockUpdate {
                    kind: BlockKind::Text,
                    content: "after".to_string(),
                    title: Some("  ".to_string()),
                    description: None,
                    tags: vec!["x".to_string()],
                },
            )
            .await
            .unwrap();
        assert!(changed);
        id
    };

    let mut app = controller(kv.clone(), model.clone()).await;
    let block = app.state().block(&id).unwrap();
    assert_eq!(block.content, "after");
    assert_eq!(block.title, None);
    assert_eq!(block.tags, vec!["x"]);

    assert!(app.delete_block(&id).await);
    assert!(!app.delete_block(&id).await);

    let app = controller(kv, model).await;
    assert!(app.state().block(&id).is_none());
}
