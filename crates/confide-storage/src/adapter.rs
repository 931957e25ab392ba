// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ConversationStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use confide_config::model::StorageConfig;
use confide_core::types::{Conversation, ConversationId, Message, OwnerId};
use confide_core::{AdapterType, ConfideError, ConversationStore, HealthStatus, PluginAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed conversation store.
///
/// The database is opened on the first call to
/// [`ConversationStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new store; no connection is opened yet.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, ConfideError> {
        self.db.get().ok_or_else(|| ConfideError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), ConfideError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ConfideError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ConfideError> {
        if self.db.get().is_some() {
            self.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn initialize(&self) -> Result<(), ConfideError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ConfideError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ConfideError> {
        self.checkpoint().await
    }

    // --- Conversation operations ---

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), ConfideError> {
        queries::conversations::create_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, ConfideError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn list_conversations(&self, owner: &OwnerId) -> Result<Vec<Conversation>, ConfideError> {
        queries::conversations::list_conversations(self.db()?, owner).await
    }

    async fn update_title(&self, id: &ConversationId, title: &str) -> Result<(), ConfideError> {
        queries::conversations::update_title(self.db()?, id, title).await
    }

    async fn update_memo(&self, id: &ConversationId, memo: &str) -> Result<(), ConfideError> {
        queries::conversations::update_memo(self.db()?, id, memo).await
    }

    async fn append_history(
        &self,
        id: &ConversationId,
        summary: &str,
    ) -> Result<(), ConfideError> {
        queries::conversations::append_history(self.db()?, id, summary).await
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), ConfideError> {
        queries::conversations::delete_conversation(self.db()?, id).await
    }

    // --- Message operations ---

    async fn insert_message(&self, message: &Message) -> Result<(), ConfideError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn get_messages(&self, id: &ConversationId) -> Result<Vec<Message>, ConfideError> {
        queries::messages::get_messages(self.db()?, id).await
    }
}
