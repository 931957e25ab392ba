// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owner-checked conversation list, detail, update, and delete.

use std::sync::Arc;

use confide_context::ContextWindow;
use confide_context::title::MAX_TITLE_CHARS;
use confide_core::{
    ConfideError, Conversation, ConversationId, ConversationStore, Message, OwnerId, Sender,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::locks::ConversationLocks;
use crate::state::ConversationStates;

/// Load a conversation and check that `owner` created it.
pub(crate) async fn load_owned(
    store: &dyn ConversationStore,
    owner: &OwnerId,
    id: &ConversationId,
) -> Result<Conversation, ConfideError> {
    let conversation = store
        .get_conversation(id)
        .await?
        .ok_or_else(|| ConfideError::conversation_not_found(id.as_str()))?;
    if conversation.owner_id != *owner {
        return Err(ConfideError::Forbidden(format!(
            "conversation {id} belongs to another user"
        )));
    }
    Ok(conversation)
}

/// One row of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub id: String,
    pub text: String,
    pub sender: Sender,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            text: message.content,
            sender: message.sender,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    pub id: ConversationId,
    pub title: String,
    pub summary_memo: Option<String>,
    pub created_at: String,
    pub messages: Vec<MessageView>,
}

/// Fields a caller may change. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

pub struct ConversationService {
    store: Arc<dyn ConversationStore>,
    window: Arc<ContextWindow>,
    locks: Arc<ConversationLocks>,
    states: Arc<ConversationStates>,
    placeholder_title: String,
}

impl ConversationService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        window: Arc<ContextWindow>,
        locks: Arc<ConversationLocks>,
        states: Arc<ConversationStates>,
        placeholder_title: String,
    ) -> Self {
        Self {
            store,
            window,
            locks,
            states,
            placeholder_title,
        }
    }

    fn display_title(&self, title: Option<String>) -> String {
        title.unwrap_or_else(|| self.placeholder_title.clone())
    }

    fn summary(&self, conversation: Conversation) -> ConversationSummary {
        ConversationSummary {
            id: conversation.id,
            title: self.display_title(conversation.title),
            created_at: conversation.created_at,
        }
    }

    /// The owner's conversations, newest first.
    pub async fn list(&self, owner: &OwnerId) -> Result<Vec<ConversationSummary>, ConfideError> {
        let conversations = self.store.list_conversations(owner).await?;
        Ok(conversations.into_iter().map(|c| self.summary(c)).collect())
    }

    pub async fn detail(
        &self,
        owner: &OwnerId,
        id: &ConversationId,
    ) -> Result<ConversationDetail, ConfideError> {
        let conversation = load_owned(self.store.as_ref(), owner, id).await?;
        let messages = self.store.get_messages(id).await?;
        Ok(ConversationDetail {
            id: conversation.id,
            title: self.display_title(conversation.title),
            summary_memo: conversation.memo,
            created_at: conversation.created_at,
            messages: messages.into_iter().map(MessageView::from).collect(),
        })
    }

    /// Change the title and/or memo. A blank title is ignored; the window
    /// and the stored history are never touched.
    pub async fn update(
        &self,
        owner: &OwnerId,
        id: &ConversationId,
        update: ConversationUpdate,
    ) -> Result<ConversationSummary, ConfideError> {
        let mut conversation = load_owned(self.store.as_ref(), owner, id).await?;

        if let Some(title) = update.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let title: String = title.chars().take(MAX_TITLE_CHARS).collect();
            self.store.update_title(id, &title).await?;
            conversation.title = Some(title);
        }
        if let Some(memo) = update.memo {
            self.store.update_memo(id, &memo).await?;
            conversation.memo = Some(memo);
        }

        Ok(self.summary(conversation))
    }

    /// Delete the conversation and its messages, then forget its in-memory
    /// state. Waits for an in-flight turn on the same conversation to finish.
    pub async fn delete(&self, owner: &OwnerId, id: &ConversationId) -> Result<(), ConfideError> {
        load_owned(self.store.as_ref(), owner, id).await?;

        let guard = self.locks.acquire(id).await;
        self.store.delete_conversation(id).await?;
        self.window.remove(id);
        self.states.forget(id);
        drop(guard);
        self.locks.remove(id);

        info!(conversation_id = %id, owner = %owner, "conversation deleted");
        Ok(())
    }
}
