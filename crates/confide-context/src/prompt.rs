// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly for live chat turns.
//!
//! The ordering is fixed: policy instruction, then the long-term summary
//! framed as background (only when non-empty), then the context window
//! oldest-first. Nothing is truncated or rewritten here.

use std::sync::Arc;

use confide_config::model::ContextConfig;
use confide_core::{
    ConfideError, ConversationId, ConversationStore, PromptMessage, ProviderRequest, Turn,
};
use tracing::{info, warn};

use crate::window::ContextWindow;

/// Default counselling policy, including the crisis override text the model
/// must emit unchanged.
pub const DEFAULT_POLICY: &str = "\
You are an AI friend who listens to people's worries. Your purpose is to give the user \
a safe, non-judgmental space to express their thoughts and feelings.
You are not a therapist or a medical professional, so you must never give medical advice, \
diagnoses, or treatment plans.

If you judge that you lack context about the user to answer well, refer to the \
information inside the braces of history : { }.

If the user explicitly expresses intent to self-harm, intent to harm others, or an \
immediate crisis (a threat to life or safety), respond with exactly the following text \
and add nothing else:

[It sounds like you are going through a very hard time right now. Please reach out for \
professional help immediately. In South Korea you can call the 24-hour suicide prevention \
line at 109, or in an emergency call 119 (medical) or 112 (police).]

Answer in plain text only. Do not use markdown syntax such as #, *, - or ```.";

/// Loads the policy following config priority: file > inline > default.
///
/// An unreadable or empty file falls through to the next source.
pub async fn load_policy(config: &ContextConfig) -> String {
    if let Some(ref file_path) = config.system_prompt_file {
        match tokio::fs::read_to_string(file_path).await {
            Ok(content) if !content.trim().is_empty() => {
                info!(path = file_path.as_str(), "loaded system policy from file");
                return content.trim().to_string();
            }
            Ok(_) => {
                warn!(path = file_path.as_str(), "system policy file is empty, falling back");
            }
            Err(e) => {
                warn!(
                    path = file_path.as_str(),
                    error = %e,
                    "failed to read system policy file, falling back"
                );
            }
        }
    }

    if let Some(ref prompt) = config.system_prompt
        && !prompt.trim().is_empty()
    {
        return prompt.clone();
    }

    DEFAULT_POLICY.to_string()
}

/// Frames a non-empty summary as background context.
pub fn history_block(history: &str) -> Option<String> {
    let history = history.trim();
    (!history.is_empty()).then(|| format!("history : {{ {history} }}"))
}

/// Compose the ordered prompt from its three parts.
pub fn compose(policy: &str, history: &str, window: &[Turn]) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(window.len() + 2);
    messages.push(PromptMessage::system(policy));
    if let Some(block) = history_block(history) {
        messages.push(PromptMessage::system(block));
    }
    messages.extend(window.iter().map(PromptMessage::from));
    messages
}

/// Builds the live-turn request for a conversation from the stored summary
/// and the current window.
pub struct PromptAssembler {
    policy: String,
    model: String,
    max_tokens: u32,
    store: Arc<dyn ConversationStore>,
    window: Arc<ContextWindow>,
}

impl PromptAssembler {
    pub fn new(
        policy: String,
        model: String,
        max_tokens: u32,
        store: Arc<dyn ConversationStore>,
        window: Arc<ContextWindow>,
    ) -> Self {
        Self {
            policy,
            model,
            max_tokens,
            store,
            window,
        }
    }

    pub fn policy(&self) -> &str {
        &self.policy
    }

    /// Read the latest summary and window and compose the request.
    pub async fn build(&self, id: &ConversationId) -> Result<ProviderRequest, ConfideError> {
        let conversation = self
            .store
            .get_conversation(id)
            .await?
            .ok_or_else(|| ConfideError::conversation_not_found(id.as_str()))?;

        Ok(ProviderRequest {
            model: self.model.clone(),
            messages: compose(&self.policy, &conversation.history, &self.window.snapshot(id)),
            max_tokens: self.max_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confide_core::{Conversation, OwnerId, PromptRole};
    use confide_test_utils::temp_store;

    #[test]
    fn compose_orders_policy_history_window() {
        let window = vec![Turn::user("hi"), Turn::ai("hello"), Turn::user("rough day")];
        let messages = compose("policy", "user: [lonely]", &window);

        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0], PromptMessage::system("policy"));
        assert_eq!(messages[1].role, PromptRole::System);
        assert_eq!(messages[1].content, "history : { user: [lonely] }");
        assert_eq!(messages[2].role, PromptRole::User);
        assert_eq!(messages[3].role, PromptRole::Assistant);
        assert_eq!(messages[4].content, "rough day");
    }

    #[test]
    fn empty_history_is_omitted() {
        let messages = compose("policy", "  ", &[Turn::user("hi")]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, PromptRole::User);
    }

    #[test]
    fn default_policy_carries_crisis_override() {
        assert!(DEFAULT_POLICY.contains("109"));
        assert!(DEFAULT_POLICY.contains("119"));
        assert!(DEFAULT_POLICY.contains("112"));
        assert!(DEFAULT_POLICY.contains("history : { }"));
        assert!(DEFAULT_POLICY.contains("plain text only"));
    }

    #[tokio::test]
    async fn policy_priority_is_file_then_inline_then_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("policy.md");
        std::fs::write(&file, "  from file  \n").unwrap();

        let mut config = ContextConfig {
            system_prompt: Some("inline".to_string()),
            system_prompt_file: Some(file.display().to_string()),
            ..ContextConfig::default()
        };
        assert_eq!(load_policy(&config).await, "from file");

        config.system_prompt_file = Some(dir.path().join("missing.md").display().to_string());
        assert_eq!(load_policy(&config).await, "inline");

        config.system_prompt = None;
        assert_eq!(load_policy(&config).await, DEFAULT_POLICY);
    }

    #[tokio::test]
    async fn build_reads_current_summary_and_window() {
        let (store, _dir) = temp_store().await.unwrap();
        let id = ConversationId::new("c-1");
        store
            .create_conversation(&Conversation {
                id: id.clone(),
                owner_id: OwnerId::new("alice"),
                title: None,
                history: String::new(),
                memo: None,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            })
            .await
            .unwrap();
        store.append_history(&id, "user: [tired]").await.unwrap();

        let window = Arc::new(ContextWindow::new(10));
        window.append(&id, Turn::user("still tired"));

        let assembler =
            PromptAssembler::new("policy".into(), "m".into(), 64, store.clone(), window);
        let request = assembler.build(&id).await.unwrap();
        assert_eq!(request.model, "m");
        assert_eq!(request.max_tokens, 64);
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1].content, "history : { user: [tired] }");

        let missing = assembler.build(&ConversationId::new("nope")).await;
        assert!(matches!(missing, Err(ConfideError::NotFound { .. })));
    }
}
