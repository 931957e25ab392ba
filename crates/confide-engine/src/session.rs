// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestration for the chat engine.
//!
//! [`ChatEngine::handle_turn`] authorizes the caller, durably records the
//! user message and starts one upstream completion behind a [`Relay`]. The
//! caller receives the live half of the relay; a completion task consumes
//! the accumulated text, persists the assistant turn, advances the context
//! window, and queues compaction and title generation.
//!
//! Everything after the first fragment is best-effort: failures are logged
//! and reported through [`TurnReport`], never pushed into the caller stream.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use confide_config::model::{ConfideConfig, DisconnectPolicy};
use confide_context::{Compactor, ContextWindow, PromptAssembler, TitleGenerator, load_policy};
use confide_core::{
    CompletionProvider, ConfideError, Conversation, ConversationId, ConversationStore, Message,
    OwnerId, ProviderRequest, Sender, TokenStream, Turn,
};
use tokio::sync::{OwnedMutexGuard, oneshot};
use tracing::{Instrument, debug, info, warn};

use crate::conversations::{ConversationService, load_owned};
use crate::locks::ConversationLocks;
use crate::relay::{Relay, RelayCompletion, RelayOutcome, RelayStatus};
use crate::state::{ConversationState, ConversationStates};
use crate::tasks::{Job, JobRunner, TaskQueue, TaskTicket};

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A started turn.
pub struct ChatTurn {
    pub conversation_id: ConversationId,
    /// True when this turn created the conversation.
    pub is_new: bool,
    /// Live fragments in upstream order; an upstream error is the last item.
    pub fragments: TokenStream,
    pub completion: TurnCompletion,
}

impl std::fmt::Debug for ChatTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatTurn")
            .field("conversation_id", &self.conversation_id)
            .field("is_new", &self.is_new)
            .finish_non_exhaustive()
    }
}

/// What the completion callback did once the stream was drained.
#[derive(Debug)]
pub struct TurnReport {
    pub assistant_text: String,
    /// The upstream failed or was cancelled before its natural end.
    pub partial: bool,
    /// The assistant message was written to the store.
    pub persisted: bool,
    pub compaction: Option<TaskTicket>,
    pub title: Option<TaskTicket>,
}

impl TurnReport {
    fn unpersisted(assistant_text: String, partial: bool, compaction: Option<TaskTicket>) -> Self {
        Self {
            assistant_text,
            partial,
            persisted: false,
            compaction,
            title: None,
        }
    }
}

/// Resolves after the completion callback has finished.
#[derive(Debug)]
pub struct TurnCompletion {
    rx: oneshot::Receiver<TurnReport>,
}

impl TurnCompletion {
    fn ready(report: TurnReport) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(report);
        Self { rx }
    }

    pub async fn wait(self) -> Result<TurnReport, ConfideError> {
        self.rx
            .await
            .map_err(|_| ConfideError::Internal("turn completion task stopped".to_string()))
    }
}

/// Runs compaction and title jobs for the task queue.
struct BackgroundJobs {
    compactor: Compactor,
    titles: TitleGenerator,
    states: Arc<ConversationStates>,
}

#[async_trait]
impl JobRunner for BackgroundJobs {
    async fn run(&self, job: &Job) -> Result<(), ConfideError> {
        match job {
            Job::Compact {
                conversation_id,
                evicted,
            } => {
                let result = self.compactor.compact(conversation_id, evicted).await;
                self.states.end_compaction(conversation_id);
                result.map(|_| ())
            }
            Job::GenerateTitle {
                conversation_id,
                user_text,
                assistant_text,
            } => self
                .titles
                .generate(conversation_id, user_text, assistant_text)
                .await
                .map(|_| ()),
        }
    }
}

/// State shared between the engine and its completion tasks.
struct Shared {
    store: Arc<dyn ConversationStore>,
    window: Arc<ContextWindow>,
    locks: Arc<ConversationLocks>,
    states: Arc<ConversationStates>,
    tasks: Arc<TaskQueue>,
}

/// Held for the lifetime of one turn: the conversation lock plus the
/// `Streaming` state.
///
/// Dropping it ends the turn wherever that happens, including when the
/// caller abandons `handle_turn` at an await point.
struct TurnGuard {
    shared: Arc<Shared>,
    id: ConversationId,
    lock: Option<OwnedMutexGuard<()>>,
}

impl TurnGuard {
    fn begin(shared: Arc<Shared>, id: ConversationId, lock: OwnedMutexGuard<()>) -> Self {
        shared.states.begin_streaming(&id);
        Self {
            shared,
            id,
            lock: Some(lock),
        }
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.shared.states.end_streaming(&self.id);
        drop(self.lock.take());
        self.shared.locks.evict_idle(&self.id);
    }
}

impl Shared {
    async fn schedule_compaction(
        &self,
        id: &ConversationId,
        evicted: Vec<Turn>,
    ) -> Option<TaskTicket> {
        let turns = evicted.len();
        self.states.begin_compaction(id);
        match self
            .tasks
            .submit(Job::Compact {
                conversation_id: id.clone(),
                evicted,
            })
            .await
        {
            Ok(ticket) => {
                debug!(conversation_id = %id, turns, "compaction queued");
                Some(ticket)
            }
            Err(e) => {
                self.states.end_compaction(id);
                warn!(conversation_id = %id, error = %e, "failed to queue compaction, evicted turns lost");
                None
            }
        }
    }

    async fn schedule_title(
        &self,
        id: &ConversationId,
        user_text: &str,
        assistant_text: &str,
    ) -> Option<TaskTicket> {
        let job = Job::GenerateTitle {
            conversation_id: id.clone(),
            user_text: user_text.to_string(),
            assistant_text: assistant_text.to_string(),
        };
        match self.tasks.submit(job).await {
            Ok(ticket) => Some(ticket),
            Err(e) => {
                warn!(conversation_id = %id, error = %e, "failed to queue title generation");
                None
            }
        }
    }

    /// The completion callback: runs once, after the relay has finished.
    async fn finish(
        &self,
        id: &ConversationId,
        user_text: &str,
        is_new: bool,
        outcome: RelayOutcome,
        mut compaction: Option<TaskTicket>,
    ) -> TurnReport {
        let partial = outcome.is_partial();
        match &outcome.status {
            RelayStatus::Complete => {}
            RelayStatus::Failed(message) => warn!(
                conversation_id = %id,
                error = %message,
                received = outcome.text.len(),
                "completion stream failed, keeping partial response"
            ),
            RelayStatus::Abandoned => info!(
                conversation_id = %id,
                received = outcome.text.len(),
                "caller disconnected, upstream cancelled"
            ),
        }

        let text = outcome.text;
        if text.is_empty() {
            debug!(conversation_id = %id, "empty assistant response, nothing to persist");
            return TurnReport::unpersisted(text, partial, compaction);
        }

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: id.clone(),
            sender: Sender::Ai,
            content: text.clone(),
            created_at: now(),
        };
        let persisted = match self.store.insert_message(&message).await {
            Ok(()) => {
                debug!(conversation_id = %id, partial, "persisted assistant response");
                true
            }
            Err(e) => {
                warn!(conversation_id = %id, error = %e, "failed to persist assistant response");
                false
            }
        };

        // The window only advances once the assistant turn is durable.
        if persisted {
            if let Some(evicted) = self.window.append(id, Turn::ai(text.clone())) {
                compaction = self.schedule_compaction(id, evicted).await.or(compaction);
            }
            if let Some(evicted) = self.window.take_if_full(id) {
                compaction = self.schedule_compaction(id, evicted).await.or(compaction);
            }
        }

        // A title is only derived from an exchange that made it to the log.
        let title = if is_new && persisted {
            self.schedule_title(id, user_text, &text).await
        } else {
            None
        };

        TurnReport {
            assistant_text: text,
            partial,
            persisted,
            compaction,
            title,
        }
    }
}

/// The conversational streaming engine.
pub struct ChatEngine {
    shared: Arc<Shared>,
    provider: Arc<dyn CompletionProvider>,
    assembler: PromptAssembler,
    conversations: ConversationService,
    on_disconnect: DisconnectPolicy,
    shutdown_timeout: Duration,
}

impl ChatEngine {
    /// Build the engine and start its background worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn new(
        config: &ConfideConfig,
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        let window = Arc::new(ContextWindow::new(config.context.window_size));
        let locks = Arc::new(ConversationLocks::new());
        let states = Arc::new(ConversationStates::new());

        let policy = load_policy(&config.context).await;
        let assembler = PromptAssembler::new(
            policy,
            config.model.chat_model.clone(),
            config.model.max_tokens,
            Arc::clone(&store),
            Arc::clone(&window),
        );

        let runner = Arc::new(BackgroundJobs {
            compactor: Compactor::new(
                Arc::clone(&provider),
                Arc::clone(&store),
                config.model.summary_model.clone(),
                config.model.summary_max_tokens,
            ),
            titles: TitleGenerator::new(
                Arc::clone(&provider),
                Arc::clone(&store),
                config.model.title_model.clone(),
                config.model.title_max_tokens,
            ),
            states: Arc::clone(&states),
        });
        let tasks = Arc::new(TaskQueue::start(
            config.engine.task_queue_capacity,
            config.engine.task_workers,
            runner,
        ));

        let conversations = ConversationService::new(
            Arc::clone(&store),
            Arc::clone(&window),
            Arc::clone(&locks),
            Arc::clone(&states),
            config.context.placeholder_title.clone(),
        );

        info!(
            window_size = window.capacity(),
            on_disconnect = %config.engine.on_disconnect,
            "chat engine ready"
        );

        Self {
            shared: Arc::new(Shared {
                store,
                window,
                locks,
                states,
                tasks,
            }),
            provider,
            assembler,
            conversations,
            on_disconnect: config.engine.on_disconnect,
            shutdown_timeout: Duration::from_secs(config.engine.shutdown_timeout_secs),
        }
    }

    pub fn conversations(&self) -> &ConversationService {
        &self.conversations
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.shared.store
    }

    pub fn window(&self) -> &ContextWindow {
        &self.shared.window
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.shared.tasks
    }

    pub fn state(&self, id: &ConversationId) -> ConversationState {
        self.shared.states.get(id)
    }

    pub fn system_policy(&self) -> &str {
        self.assembler.policy()
    }

    /// Start one chat turn.
    ///
    /// Blank text, a missing conversation, and a foreign owner are rejected
    /// before anything is written or any upstream call is made.
    pub async fn handle_turn(
        &self,
        owner: &OwnerId,
        conversation_id: Option<ConversationId>,
        text: &str,
    ) -> Result<ChatTurn, ConfideError> {
        if text.trim().is_empty() {
            return Err(ConfideError::Validation(
                "message must not be blank".to_string(),
            ));
        }

        let (id, is_new) = match conversation_id {
            Some(id) => {
                load_owned(self.shared.store.as_ref(), owner, &id).await?;
                (id, false)
            }
            None => (self.create_conversation(owner).await?, true),
        };

        let lock = self.shared.locks.acquire(&id).await;
        let guard = TurnGuard::begin(Arc::clone(&self.shared), id.clone(), lock);

        let (request, early_compaction) = self.prepare(&id, text).await?;

        let upstream = match self.provider.stream(request).await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!(conversation_id = %id, error = %e, "completion stream could not be opened");
                drop(guard);
                let report = TurnReport::unpersisted(String::new(), true, early_compaction);
                return Ok(ChatTurn {
                    conversation_id: id,
                    is_new,
                    fragments: Box::pin(futures::stream::once(futures::future::ready(Err::<String, _>(e)))),
                    completion: TurnCompletion::ready(report),
                });
            }
        };

        let mut relay = Relay::new(upstream, self.on_disconnect);
        let fragments = relay.subscribe();
        let relay_done = relay.start();

        let completion = self.spawn_completion(
            id.clone(),
            text.to_string(),
            is_new,
            relay_done,
            early_compaction,
            guard,
        );

        Ok(ChatTurn {
            conversation_id: id,
            is_new,
            fragments,
            completion,
        })
    }

    async fn create_conversation(&self, owner: &OwnerId) -> Result<ConversationId, ConfideError> {
        let conversation = Conversation {
            id: ConversationId::new(uuid::Uuid::new_v4().to_string()),
            owner_id: owner.clone(),
            title: None,
            history: String::new(),
            memo: None,
            created_at: now(),
        };
        self.shared.store.create_conversation(&conversation).await?;
        info!(conversation_id = %conversation.id, owner = %owner, "conversation created");
        Ok(conversation.id)
    }

    /// Record the user turn and assemble the prompt. Runs under the
    /// conversation lock.
    async fn prepare(
        &self,
        id: &ConversationId,
        text: &str,
    ) -> Result<(ProviderRequest, Option<TaskTicket>), ConfideError> {
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: id.clone(),
            sender: Sender::User,
            content: text.to_string(),
            created_at: now(),
        };
        self.shared.store.insert_message(&message).await?;
        debug!(conversation_id = %id, "persisted user message");

        // Only a window left full by a skipped assistant append evicts here.
        let early_compaction = match self.shared.window.append(id, Turn::user(text)) {
            Some(evicted) => self.shared.schedule_compaction(id, evicted).await,
            None => None,
        };

        let request = self.assembler.build(id).await?;
        Ok((request, early_compaction))
    }

    fn spawn_completion(
        &self,
        id: ConversationId,
        user_text: String,
        is_new: bool,
        relay_done: RelayCompletion,
        early_compaction: Option<TaskTicket>,
        guard: TurnGuard,
    ) -> TurnCompletion {
        let (tx, rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(
            async move {
                let outcome = relay_done.wait().await;
                let report = shared
                    .finish(&id, &user_text, is_new, outcome, early_compaction)
                    .await;
                drop(guard);
                let _ = tx.send(report);
            }
            .in_current_span(),
        );
        TurnCompletion { rx }
    }

    /// Stop accepting background jobs and drain the queue.
    pub async fn shutdown(&self) -> bool {
        self.shared.tasks.shutdown(self.shutdown_timeout).await
    }
}
