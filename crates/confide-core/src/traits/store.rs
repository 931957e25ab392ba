// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store trait for persistence backends.

use async_trait::async_trait;

use crate::error::ConfideError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Conversation, ConversationId, Message, OwnerId};

/// Durable CRUD over conversations and their messages.
///
/// Messages are append-only; they disappear only when their conversation
/// is deleted.
#[async_trait]
pub trait ConversationStore: PluginAdapter {
    /// Initializes the backend (migrations, connection).
    async fn initialize(&self) -> Result<(), ConfideError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), ConfideError>;

    // --- Conversation operations ---

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), ConfideError>;

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, ConfideError>;

    /// Conversations owned by `owner`, newest first.
    async fn list_conversations(&self, owner: &OwnerId) -> Result<Vec<Conversation>, ConfideError>;

    async fn update_title(&self, id: &ConversationId, title: &str) -> Result<(), ConfideError>;

    async fn update_memo(&self, id: &ConversationId, memo: &str) -> Result<(), ConfideError>;

    /// Appends `summary` to the long-term history in a single write.
    ///
    /// Fails with `NotFound` if the conversation no longer exists.
    async fn append_history(&self, id: &ConversationId, summary: &str)
    -> Result<(), ConfideError>;

    /// Removes the conversation and all of its messages.
    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), ConfideError>;

    // --- Message operations ---

    async fn insert_message(&self, message: &Message) -> Result<(), ConfideError>;

    /// Messages of a conversation, oldest first.
    async fn get_messages(&self, id: &ConversationId) -> Result<Vec<Message>, ConfideError>;
}
