// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compaction: folds an evicted window into the conversation's long-term
//! summary via a single non-streaming completion call.

use std::sync::Arc;

use confide_core::{
    CompletionProvider, ConfideError, ConversationId, ConversationStore, PromptMessage,
    ProviderRequest, Sender, Turn,
};
use tracing::{debug, info};

/// Instruction for the summarization call.
pub const SUMMARY_PROMPT: &str = "\
Summarize the following conversation. Write the summary in plain text only, \
without emoji or markdown syntax.
Summarize each message in this form:
user: [summary of what the user expressed]
ai: [summary of how the AI responded]";

/// Render turns as `user: ...` / `ai: ...` lines.
pub fn transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let speaker = match turn.sender {
                Sender::User => "user",
                Sender::Ai => "ai",
            };
            format!("{speaker}: {}\n", turn.text)
        })
        .collect()
}

/// Build the summarization request. Only the evicted turns are included.
pub fn summary_request(model: &str, max_tokens: u32, evicted: &[Turn]) -> ProviderRequest {
    ProviderRequest {
        model: model.to_string(),
        messages: vec![PromptMessage::system(format!(
            "{SUMMARY_PROMPT}\n\nConversation:\n{}",
            transcript(evicted)
        ))],
        max_tokens,
    }
}

fn compaction_error(message: &str, source: ConfideError) -> ConfideError {
    ConfideError::Compaction {
        message: message.to_string(),
        source: Some(Box::new(source)),
    }
}

/// Summarizes evicted turns and appends the result to the stored history.
pub struct Compactor {
    provider: Arc<dyn CompletionProvider>,
    store: Arc<dyn ConversationStore>,
    model: String,
    max_tokens: u32,
}

impl Compactor {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        store: Arc<dyn ConversationStore>,
        model: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            store,
            model,
            max_tokens,
        }
    }

    /// Summarize `evicted` and append the summary to the conversation.
    ///
    /// The history is written once, after a non-blank summary exists, so a
    /// failure at any step leaves it exactly as it was.
    pub async fn compact(
        &self,
        id: &ConversationId,
        evicted: &[Turn],
    ) -> Result<String, ConfideError> {
        if evicted.is_empty() {
            return Err(ConfideError::Compaction {
                message: "nothing to compact".to_string(),
                source: None,
            });
        }

        debug!(conversation_id = %id, turns = evicted.len(), "requesting summary");
        let response = self
            .provider
            .complete(summary_request(&self.model, self.max_tokens, evicted))
            .await
            .map_err(|e| compaction_error("summary generation failed", e))?;

        let summary = response.content.trim();
        if summary.is_empty() {
            return Err(ConfideError::Compaction {
                message: "provider returned an empty summary".to_string(),
                source: None,
            });
        }

        self.store
            .append_history(id, summary)
            .await
            .map_err(|e| compaction_error("failed to persist summary", e))?;

        info!(
            conversation_id = %id,
            turns = evicted.len(),
            summary_len = summary.len(),
            "history compacted"
        );
        Ok(summary.to_string())
    }
}
