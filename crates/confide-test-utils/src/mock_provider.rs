// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted completion provider for deterministic testing.
//!
//! `MockProvider` replays queued stream scripts and completion results and
//! counts every upstream call, so tests can assert how many generations a
//! single turn actually started.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use tokio::sync::Mutex;

use confide_core::{
    AdapterType, CompletionProvider, ConfideError, HealthStatus, PluginAdapter, ProviderRequest,
    ProviderResponse, TokenStream,
};

/// How one `stream` call behaves.
#[derive(Debug, Clone, Default)]
pub struct StreamScript {
    /// Fragments emitted in order.
    pub fragments: Vec<String>,
    /// Error raised after the last fragment, if any.
    pub fail_with: Option<String>,
    /// Fail the `stream` call itself instead of returning a stream.
    pub open_error: Option<String>,
    /// Pause before each fragment.
    pub delay: Option<Duration>,
    /// Pause inside the `stream` call before it returns.
    pub open_delay: Option<Duration>,
}

impl StreamScript {
    /// Emit each fragment, then finish normally.
    pub fn fragments<S: Into<String>>(fragments: impl IntoIterator<Item = S>) -> Self {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Emit each fragment, then fail with `message`.
    pub fn failing<S: Into<String>>(
        fragments: impl IntoIterator<Item = S>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::fragments(fragments)
        }
    }

    /// Reject the request before any fragment is produced.
    pub fn open_failure(message: impl Into<String>) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Sleep `delay` before every fragment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep `delay` before the stream is handed back.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }
}

/// A mock provider that returns pre-configured streams and completions.
///
/// When a queue is empty, `stream` yields `["mock ", "response"]` and
/// `complete` returns `"mock response"`.
#[derive(Default)]
pub struct MockProvider {
    streams: Mutex<VecDeque<StreamScript>>,
    completions: Mutex<VecDeque<Result<String, String>>>,
    stream_requests: Mutex<Vec<ProviderRequest>>,
    complete_requests: Mutex<Vec<ProviderRequest>>,
    stream_calls: AtomicUsize,
    complete_calls: AtomicUsize,
    fragments_emitted: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider whose streams replay `scripts` in order.
    pub fn with_streams(scripts: Vec<StreamScript>) -> Self {
        Self {
            streams: Mutex::new(VecDeque::from(scripts)),
            ..Self::default()
        }
    }

    pub async fn push_stream(&self, script: StreamScript) {
        self.streams.lock().await.push_back(script);
    }

    /// Queue a successful `complete` result.
    pub async fn push_completion(&self, text: impl Into<String>) {
        self.completions.lock().await.push_back(Ok(text.into()));
    }

    /// Queue a failing `complete` result.
    pub async fn push_completion_error(&self, message: impl Into<String>) {
        self.completions.lock().await.push_back(Err(message.into()));
    }

    /// Number of upstream generations started through `stream`.
    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    /// Fragments actually pulled out of the upstream streams so far.
    pub fn fragments_emitted(&self) -> usize {
        self.fragments_emitted.load(Ordering::SeqCst)
    }

    pub async fn stream_requests(&self) -> Vec<ProviderRequest> {
        self.stream_requests.lock().await.clone()
    }

    pub async fn complete_requests(&self) -> Vec<ProviderRequest> {
        self.complete_requests.lock().await.clone()
    }

    /// `complete` requests whose prompt starts with `prefix`.
    pub async fn complete_requests_starting_with(&self, prefix: &str) -> usize {
        self.complete_requests
            .lock()
            .await
            .iter()
            .filter(|r| r.messages.first().is_some_and(|m| m.content.starts_with(prefix)))
            .count()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ConfideError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ConfideError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ConfideError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.complete_requests.lock().await.push(request);

        let next = self
            .completions
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok("mock response".to_string()));
        match next {
            Ok(content) => Ok(ProviderResponse { content }),
            Err(message) => Err(ConfideError::provider(message)),
        }
    }

    async fn stream(&self, request: ProviderRequest) -> Result<TokenStream, ConfideError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.stream_requests.lock().await.push(request);

        let script = self
            .streams
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| StreamScript::fragments(["mock ", "response"]));

        if let Some(delay) = script.open_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = script.open_error {
            return Err(ConfideError::provider(message));
        }

        let mut items: Vec<Result<String, ConfideError>> =
            script.fragments.into_iter().map(Ok).collect();
        if let Some(message) = script.fail_with {
            items.push(Err(ConfideError::provider(message)));
        }

        let delay = script.delay;
        let emitted = Arc::clone(&self.fragments_emitted);
        let stream = stream::iter(items).then(move |item| {
            let emitted = Arc::clone(&emitted);
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if item.is_ok() {
                    emitted.fetch_add(1, Ordering::SeqCst);
                }
                item
            }
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "test-model".to_string(),
            messages: vec![],
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn default_stream_when_queue_empty() {
        let provider = MockProvider::new();
        let fragments: Vec<String> = provider
            .stream(request())
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments.concat(), "mock response");
        assert_eq!(provider.stream_calls(), 1);
        assert_eq!(provider.fragments_emitted(), 2);
    }

    #[tokio::test]
    async fn failing_script_errors_after_fragments() {
        let provider =
            MockProvider::with_streams(vec![StreamScript::failing(["a", "b", "c"], "cut off")]);
        let items: Vec<_> = provider.stream(request()).await.unwrap().collect().await;
        assert_eq!(items.len(), 4);
        assert!(items[..3].iter().all(|r| r.is_ok()));
        assert!(matches!(items[3], Err(ConfideError::Provider { .. })));
    }

    #[tokio::test]
    async fn open_failure_rejects_the_call() {
        let provider = MockProvider::with_streams(vec![StreamScript::open_failure("refused")]);
        assert!(provider.stream(request()).await.is_err());
        assert_eq!(provider.stream_calls(), 1);
    }

    #[tokio::test]
    async fn completions_replay_in_order_then_default() {
        let provider = MockProvider::new();
        provider.push_completion("first").await;
        provider.push_completion_error("overloaded").await;

        assert_eq!(provider.complete(request()).await.unwrap().content, "first");
        assert!(provider.complete(request()).await.is_err());
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            "mock response"
        );
        assert_eq!(provider.complete_calls(), 3);
    }
}
