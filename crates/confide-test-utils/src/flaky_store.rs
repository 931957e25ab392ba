// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fault-injecting wrapper around a real conversation store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use confide_config::model::StorageConfig;
use confide_core::{
    AdapterType, ConfideError, Conversation, ConversationId, ConversationStore, HealthStatus,
    Message, OwnerId, PluginAdapter, Sender,
};
use confide_storage::SqliteStore;

/// Open a fresh SQLite store in a temporary directory.
///
/// The returned `TempDir` must outlive the store.
pub async fn temp_store() -> Result<(Arc<SqliteStore>, tempfile::TempDir), ConfideError> {
    let dir = tempfile::TempDir::new().map_err(|e| ConfideError::Storage { source: e.into() })?;
    let path = dir.path().join("test.db").to_string_lossy().to_string();
    let store = SqliteStore::new(StorageConfig {
        database_path: path,
        wal_mode: true,
    });
    store.initialize().await?;
    Ok((Arc::new(store), dir))
}

fn injected(operation: &str) -> ConfideError {
    debug!(operation, "injecting storage failure");
    ConfideError::Storage {
        source: format!("injected failure: {operation}").into(),
    }
}

/// Delegates to an inner store, failing selected operations on demand and
/// counting every mutating call.
pub struct FlakyStore {
    inner: Arc<dyn ConversationStore>,
    fail_ai_insert: AtomicBool,
    fail_user_insert: AtomicBool,
    fail_append_history: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn ConversationStore>) -> Self {
        Self {
            inner,
            fail_ai_insert: AtomicBool::new(false),
            fail_user_insert: AtomicBool::new(false),
            fail_append_history: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Make inserts of `AI` messages fail.
    pub fn fail_ai_messages(&self, fail: bool) {
        self.fail_ai_insert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_user_messages(&self, fail: bool) {
        self.fail_user_insert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_history_appends(&self, fail: bool) {
        self.fail_append_history.store(fail, Ordering::SeqCst);
    }

    /// Successful and failed write attempts made through this wrapper.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for FlakyStore {
    fn name(&self) -> &str {
        "flaky-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ConfideError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), ConfideError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl ConversationStore for FlakyStore {
    async fn initialize(&self) -> Result<(), ConfideError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), ConfideError> {
        self.inner.close().await
    }

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), ConfideError> {
        self.record_write();
        self.inner.create_conversation(conversation).await
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, ConfideError> {
        self.inner.get_conversation(id).await
    }

    async fn list_conversations(&self, owner: &OwnerId) -> Result<Vec<Conversation>, ConfideError> {
        self.inner.list_conversations(owner).await
    }

    async fn update_title(&self, id: &ConversationId, title: &str) -> Result<(), ConfideError> {
        self.record_write();
        self.inner.update_title(id, title).await
    }

    async fn update_memo(&self, id: &ConversationId, memo: &str) -> Result<(), ConfideError> {
        self.record_write();
        self.inner.update_memo(id, memo).await
    }

    async fn append_history(
        &self,
        id: &ConversationId,
        summary: &str,
    ) -> Result<(), ConfideError> {
        self.record_write();
        if self.fail_append_history.load(Ordering::SeqCst) {
            return Err(injected("append_history"));
        }
        self.inner.append_history(id, summary).await
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), ConfideError> {
        self.record_write();
        self.inner.delete_conversation(id).await
    }

    async fn insert_message(&self, message: &Message) -> Result<(), ConfideError> {
        self.record_write();
        let fail = match message.sender {
            Sender::User => self.fail_user_insert.load(Ordering::SeqCst),
            Sender::Ai => self.fail_ai_insert.load(Ordering::SeqCst),
        };
        if fail {
            return Err(injected("insert_message"));
        }
        self.inner.insert_message(message).await
    }

    async fn get_messages(&self, id: &ConversationId) -> Result<Vec<Message>, ConfideError> {
        self.inner.get_messages(id).await
    }
}
