// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end engine testing.
//!
//! `TestHarness` assembles a complete engine over a temp SQLite database
//! and a scripted [`MockProvider`]. The store is wrapped in a
//! [`FlakyStore`] so tests can count writes and inject failures.

use std::sync::Arc;

use confide_config::model::{ConfideConfig, DisconnectPolicy};
use confide_core::{ConfideError, ConversationId, ConversationStore, OwnerId};
use confide_engine::{ChatEngine, ChatTurn, TaskOutcome, TurnReport};
use futures::StreamExt;

use crate::flaky_store::{FlakyStore, temp_store};
use crate::mock_provider::{MockProvider, StreamScript};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: ConfideConfig,
    scripts: Vec<StreamScript>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: ConfideConfig::default(),
            scripts: Vec::new(),
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.config.context.window_size = window_size;
        self
    }

    pub fn with_disconnect_policy(mut self, policy: DisconnectPolicy) -> Self {
        self.config.engine.on_disconnect = policy;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.context.system_prompt = Some(prompt.into());
        self
    }

    /// Queue stream scripts, replayed one per turn.
    pub fn with_streams(mut self, scripts: Vec<StreamScript>) -> Self {
        self.scripts = scripts;
        self
    }

    pub async fn build(self) -> Result<TestHarness, ConfideError> {
        let (sqlite, temp_dir) = temp_store().await?;
        let flaky = Arc::new(FlakyStore::new(sqlite));
        let store: Arc<dyn ConversationStore> = flaky.clone();
        let provider = Arc::new(MockProvider::with_streams(self.scripts));

        let engine =
            Arc::new(ChatEngine::new(&self.config, Arc::clone(&store), provider.clone()).await);

        Ok(TestHarness {
            engine,
            provider,
            store,
            flaky,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete engine with mock adapters and temp storage.
pub struct TestHarness {
    pub engine: Arc<ChatEngine>,
    pub provider: Arc<MockProvider>,
    /// The store the engine writes through.
    pub store: Arc<dyn ConversationStore>,
    /// Handle to the same store for fault injection and write counts.
    pub flaky: Arc<FlakyStore>,
    pub config: ConfideConfig,
    _temp_dir: tempfile::TempDir,
}

/// What the caller saw for one turn, plus the completion report.
#[derive(Debug)]
pub struct TurnResult {
    pub conversation_id: ConversationId,
    pub is_new: bool,
    pub fragments: Vec<String>,
    /// The error that terminated the caller stream, if any.
    pub error: Option<ConfideError>,
    pub report: TurnReport,
}

impl TurnResult {
    pub fn text(&self) -> String {
        self.fragments.concat()
    }

    /// Wait for the compaction and title jobs this turn queued.
    pub async fn settle(&mut self) -> (Option<TaskOutcome>, Option<TaskOutcome>) {
        let compaction = match self.report.compaction.take() {
            Some(ticket) => Some(ticket.wait().await),
            None => None,
        };
        let title = match self.report.title.take() {
            Some(ticket) => Some(ticket.wait().await),
            None => None,
        };
        (compaction, title)
    }
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Create a harness with default settings.
    pub async fn new() -> Result<Self, ConfideError> {
        Self::builder().build().await
    }

    /// Start a turn and return the live handle without draining it.
    pub async fn start_turn(
        &self,
        owner: &str,
        conversation_id: Option<&ConversationId>,
        text: &str,
    ) -> Result<ChatTurn, ConfideError> {
        self.engine
            .handle_turn(&OwnerId::new(owner), conversation_id.cloned(), text)
            .await
    }

    /// Drive one turn: drain the caller stream, then await the completion
    /// callback.
    pub async fn send_turn(
        &self,
        owner: &str,
        conversation_id: Option<&ConversationId>,
        text: &str,
    ) -> Result<TurnResult, ConfideError> {
        let ChatTurn {
            conversation_id,
            is_new,
            mut fragments,
            completion,
        } = self.start_turn(owner, conversation_id, text).await?;

        let mut received = Vec::new();
        let mut error = None;
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => received.push(fragment),
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        let report = completion.wait().await?;
        Ok(TurnResult {
            conversation_id,
            is_new,
            fragments: received,
            error,
            report,
        })
    }

    pub async fn push_stream(&self, script: StreamScript) {
        self.provider.push_stream(script).await;
    }

    /// Stored summary for a conversation, empty if it does not exist.
    pub async fn history(&self, id: &ConversationId) -> Result<String, ConfideError> {
        Ok(self
            .store
            .get_conversation(id)
            .await?
            .map(|c| c.history)
            .unwrap_or_default())
    }
}
