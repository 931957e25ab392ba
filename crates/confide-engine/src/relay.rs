// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-subscription fan-out of one upstream token stream.
//!
//! A [`Relay`] owns the upstream stream. Subscribers are registered before
//! [`Relay::start`], which spawns one producer loop that pulls the upstream
//! exactly once, forwards every fragment in arrival order to each
//! subscriber, and accumulates the full text. The accumulated text is
//! delivered through [`RelayCompletion`] once the upstream is finished.

use confide_config::model::DisconnectPolicy;
use confide_core::{ConfideError, TokenStream};
use futures::StreamExt;
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug};

/// How the upstream sequence ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayStatus {
    /// The upstream finished normally.
    Complete,
    /// The upstream raised an error after the accumulated text.
    Failed(String),
    /// Every subscriber left and the upstream was dropped early.
    Abandoned,
}

/// Accumulated text plus the way the stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub text: String,
    pub status: RelayStatus,
}

impl RelayOutcome {
    /// True unless the upstream ran to its natural end.
    pub fn is_partial(&self) -> bool {
        self.status != RelayStatus::Complete
    }
}

type Subscriber = mpsc::UnboundedSender<Result<String, ConfideError>>;

pub struct Relay {
    upstream: TokenStream,
    policy: DisconnectPolicy,
    subscribers: Vec<Subscriber>,
}

impl Relay {
    pub fn new(upstream: TokenStream, policy: DisconnectPolicy) -> Self {
        Self {
            upstream,
            policy,
            subscribers: Vec::new(),
        }
    }

    /// Register a live consumer. Every subscriber sees the same fragments in
    /// the same order; an upstream error is delivered as the final item.
    pub fn subscribe(&mut self) -> TokenStream {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        Box::pin(futures::stream::poll_fn(move |cx| rx.poll_recv(cx)))
    }

    /// Spawn the producer loop onto the current runtime.
    pub fn start(self) -> RelayCompletion {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(
            async move {
                let outcome = self.pump().await;
                // The completion sink may have been dropped; the outcome is then unobserved.
                let _ = tx.send(outcome);
            }
            .in_current_span(),
        );
        RelayCompletion { rx }
    }

    async fn pump(self) -> RelayOutcome {
        let Relay {
            mut upstream,
            policy,
            mut subscribers,
        } = self;
        let cancellable = policy == DisconnectPolicy::CancelUpstream && !subscribers.is_empty();
        let mut text = String::new();

        let status = loop {
            let next = if cancellable {
                tokio::select! {
                    next = upstream.next() => next,
                    _ = all_closed(&subscribers) => break RelayStatus::Abandoned,
                }
            } else {
                upstream.next().await
            };

            match next {
                Some(Ok(fragment)) => {
                    text.push_str(&fragment);
                    subscribers.retain(|sub| sub.send(Ok(fragment.clone())).is_ok());
                }
                Some(Err(e)) => {
                    let message = match e {
                        ConfideError::Provider { message, .. } => message,
                        other => other.to_string(),
                    };
                    for sub in &subscribers {
                        let _ = sub.send(Err(ConfideError::provider(message.clone())));
                    }
                    break RelayStatus::Failed(message);
                }
                None => break RelayStatus::Complete,
            }
        };

        debug!(
            accumulated = text.len(),
            status = ?status,
            "relay finished"
        );
        RelayOutcome { text, status }
    }
}

async fn all_closed(subscribers: &[Subscriber]) {
    join_all(subscribers.iter().map(|sub| sub.closed())).await;
}

/// Resolves once the producer loop has finished.
#[derive(Debug)]
pub struct RelayCompletion {
    rx: oneshot::Receiver<RelayOutcome>,
}

impl RelayCompletion {
    pub async fn wait(self) -> RelayOutcome {
        self.rx.await.unwrap_or_else(|_| RelayOutcome {
            text: String::new(),
            status: RelayStatus::Failed("relay producer stopped unexpectedly".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn upstream(items: Vec<Result<&'static str, &'static str>>) -> TokenStream {
        Box::pin(futures::stream::iter(items.into_iter().map(|item| {
            item.map(str::to_string).map_err(ConfideError::provider)
        })))
    }

    /// Emits `count` fragments, sleeping between them, and counts pulls.
    fn slow_upstream(count: usize, pulled: Arc<AtomicUsize>) -> TokenStream {
        Box::pin(futures::stream::iter(0..count).then(move |i| {
            let pulled = Arc::clone(&pulled);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                pulled.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ConfideError>(format!("f{i} "))
            }
        }))
    }

    #[tokio::test]
    async fn every_subscriber_sees_fragments_in_order() {
        let mut relay = Relay::new(
            upstream(vec![Ok("a"), Ok("b"), Ok("c")]),
            DisconnectPolicy::RunToCompletion,
        );
        let first = relay.subscribe();
        let second = relay.subscribe();
        let completion = relay.start();

        let first: Vec<String> = first.map(|r| r.unwrap()).collect().await;
        let second: Vec<String> = second.map(|r| r.unwrap()).collect().await;
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, second);

        let outcome = completion.wait().await;
        assert_eq!(outcome.text, "abc");
        assert!(!outcome.is_partial());
    }

    #[tokio::test]
    async fn upstream_error_terminates_subscribers_and_keeps_partial_text() {
        let mut relay = Relay::new(
            upstream(vec![Ok("one "), Ok("two "), Ok("three"), Err("connection reset")]),
            DisconnectPolicy::RunToCompletion,
        );
        let live = relay.subscribe();
        let completion = relay.start();

        let items: Vec<_> = live.collect().await;
        assert_eq!(items.len(), 4);
        assert!(items[..3].iter().all(|r| r.is_ok()));
        assert!(matches!(&items[3], Err(ConfideError::Provider { message, .. }) if message == "connection reset"));

        let outcome = completion.wait().await;
        assert_eq!(outcome.text, "one two three");
        assert_eq!(
            outcome.status,
            RelayStatus::Failed("connection reset".to_string())
        );
    }

    #[tokio::test]
    async fn accumulates_without_any_subscriber() {
        let relay = Relay::new(
            upstream(vec![Ok("x"), Ok("y")]),
            DisconnectPolicy::CancelUpstream,
        );
        let outcome = relay.start().wait().await;
        assert_eq!(outcome.text, "xy");
        assert_eq!(outcome.status, RelayStatus::Complete);
    }

    #[tokio::test]
    async fn run_to_completion_survives_caller_disconnect() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let mut relay = Relay::new(
            slow_upstream(5, Arc::clone(&pulled)),
            DisconnectPolicy::RunToCompletion,
        );
        let mut live = relay.subscribe();
        let completion = relay.start();

        assert_eq!(live.next().await.unwrap().unwrap(), "f0 ");
        drop(live);

        let outcome = completion.wait().await;
        assert_eq!(outcome.text, "f0 f1 f2 f3 f4 ");
        assert_eq!(outcome.status, RelayStatus::Complete);
        assert_eq!(pulled.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn cancel_upstream_stops_once_every_subscriber_leaves() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let mut relay = Relay::new(
            slow_upstream(50, Arc::clone(&pulled)),
            DisconnectPolicy::CancelUpstream,
        );
        let mut live = relay.subscribe();
        let completion = relay.start();

        assert_eq!(live.next().await.unwrap().unwrap(), "f0 ");
        drop(live);

        let outcome = completion.wait().await;
        assert_eq!(outcome.status, RelayStatus::Abandoned);
        assert!(outcome.is_partial());
        assert!(outcome.text.starts_with("f0 "));
        assert!(pulled.load(Ordering::SeqCst) < 50);
    }
}
