// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! First-exchange title generation.

use std::sync::Arc;

use confide_core::{
    CompletionProvider, ConfideError, ConversationId, ConversationStore, PromptMessage,
    ProviderRequest,
};
use tracing::info;

pub const TITLE_PROMPT: &str =
    "Create a conversation title of at most six words for the following exchange:\n";

/// Longest title the store accepts, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

pub fn title_request(
    model: &str,
    max_tokens: u32,
    user_text: &str,
    assistant_text: &str,
) -> ProviderRequest {
    ProviderRequest {
        model: model.to_string(),
        messages: vec![PromptMessage::system(format!(
            "{TITLE_PROMPT}user: {user_text}\nai: {assistant_text}"
        ))],
        max_tokens,
    }
}

/// Trim, strip wrapping quotes, and cap the length. `None` when nothing is left.
pub fn sanitize_title(raw: &str) -> Option<String> {
    let quotes: &[char] = &['"', '\'', '\u{201c}', '\u{201d}'];
    let title = raw.trim().trim_matches(quotes).trim();
    if title.is_empty() {
        return None;
    }
    Some(title.chars().take(MAX_TITLE_CHARS).collect())
}

pub struct TitleGenerator {
    provider: Arc<dyn CompletionProvider>,
    store: Arc<dyn ConversationStore>,
    model: String,
    max_tokens: u32,
}

impl TitleGenerator {
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

    /// Generate a title from the first exchange and store it.
    pub async fn generate(
        &self,
        id: &ConversationId,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<String, ConfideError> {
        let response = self
            .provider
            .complete(title_request(
                &self.model,
                self.max_tokens,
                user_text,
                assistant_text,
            ))
            .await?;

        let title = sanitize_title(&response.content)
            .ok_or_else(|| ConfideError::provider("provider returned an empty title"))?;
        self.store.update_title(id, &title).await?;

        info!(conversation_id = %id, title = %title, "conversation titled");
        Ok(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confide_core::{Conversation, OwnerId};
    use confide_test_utils::{MockProvider, temp_store};

    #[test]
    fn sanitize_strips_quotes_and_whitespace() {
        assert_eq!(
            sanitize_title("  \"Coping with exam stress\"\n").as_deref(),
            Some("Coping with exam stress")
        );
        assert_eq!(sanitize_title("\u{201c}Hard week\u{201d}").as_deref(), Some("Hard week"));
        assert_eq!(sanitize_title(" '' "), None);
    }

    #[test]
    fn sanitize_caps_length_on_char_boundary() {
        let long = "가".repeat(150);
        let title = sanitize_title(&long).unwrap();
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn title_request_embeds_first_exchange() {
        let request = title_request("small", 32, "I failed my exam", "I'm sorry to hear that");
        assert_eq!(
            request.messages[0].content,
            format!("{TITLE_PROMPT}user: I failed my exam\nai: I'm sorry to hear that")
        );
    }

    #[tokio::test]
    async fn generate_stores_sanitized_title() {
        let (store, _dir) = temp_store().await.unwrap();
        let id = ConversationId::new("c-title");
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

        let provider = Arc::new(MockProvider::new());
        provider.push_completion("\"Exam worries\"").await;
        let generator = TitleGenerator::new(provider, store.clone(), "small".into(), 32);

        assert_eq!(generator.generate(&id, "u", "a").await.unwrap(), "Exam worries");
        let stored = store.get_conversation(&id).await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Exam worries"));
    }
}
