// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background task queue for work kept off the response path.
//!
//! Jobs are sharded by conversation id over a fixed set of workers. Each
//! worker drains its shard in submission order, so two compactions of the
//! same conversation never overlap, while a slow summary for one
//! conversation only delays the conversations that share its shard. Every submission
//! returns a [`TaskTicket`] that resolves once the job has run, which lets
//! callers observe failures that would otherwise only reach the log.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use confide_core::{ConfideError, ConversationId, Turn};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

#[derive(Debug, Clone)]
pub enum Job {
    /// Fold evicted window turns into the stored history.
    Compact {
        conversation_id: ConversationId,
        evicted: Vec<Turn>,
    },
    /// Title a new conversation from its first exchange.
    GenerateTitle {
        conversation_id: ConversationId,
        user_text: String,
        assistant_text: String,
    },
}

impl Job {
    pub fn kind(&self) -> &'static str {
        match self {
            Job::Compact { .. } => "compact",
            Job::GenerateTitle { .. } => "generate_title",
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            Job::Compact {
                conversation_id, ..
            }
            | Job::GenerateTitle {
                conversation_id, ..
            } => conversation_id,
        }
    }
}

/// Executes queued jobs.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(&self, job: &Job) -> Result<(), ConfideError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed(String),
    /// The job never ran (queue shut down or worker aborted).
    Dropped,
}

#[derive(Debug)]
pub struct TaskTicket {
    kind: &'static str,
    rx: oneshot::Receiver<TaskOutcome>,
}

impl TaskTicket {
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub async fn wait(self) -> TaskOutcome {
        self.rx.await.unwrap_or(TaskOutcome::Dropped)
    }
}

struct Envelope {
    job: Job,
    reply: oneshot::Sender<TaskOutcome>,
}

#[derive(Debug, Default)]
struct TaskStats {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

pub struct TaskQueue {
    shards: Vec<mpsc::Sender<Envelope>>,
    closing: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<TaskStats>,
}

impl TaskQueue {
    /// Spawn `workers` workers. `capacity` bounds the waiting jobs per worker.
    pub fn start(capacity: usize, workers: usize, runner: Arc<dyn JobRunner>) -> Self {
        let closing = CancellationToken::new();
        let stats = Arc::new(TaskStats::default());
        let (shards, handles) = (0..workers.max(1))
            .map(|_| {
                let (tx, rx) = mpsc::channel(capacity.max(1));
                let worker = tokio::spawn(
                    run_worker(rx, Arc::clone(&runner), closing.clone(), Arc::clone(&stats))
                        .in_current_span(),
                );
                (tx, worker)
            })
            .unzip();
        Self {
            shards,
            closing,
            workers: Mutex::new(handles),
            stats,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_for(&self, id: &ConversationId) -> usize {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    /// Queue a job, waiting for space if its shard is full.
    pub async fn submit(&self, job: Job) -> Result<TaskTicket, ConfideError> {
        if self.closing.is_cancelled() {
            return Err(ConfideError::Internal("task queue is shut down".to_string()));
        }
        let kind = job.kind();
        let shard = self.shard_for(job.conversation_id());
        let (reply, rx) = oneshot::channel();
        self.shards[shard]
            .send(Envelope { job, reply })
            .await
            .map_err(|_| ConfideError::Internal("task queue is shut down".to_string()))?;
        Ok(TaskTicket { kind, rx })
    }

    /// Jobs that ran to success.
    pub fn completed(&self) -> usize {
        self.stats.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.stats.failed.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closing.is_cancelled()
    }

    /// Stop accepting jobs and wait up to `timeout` for queued ones to finish.
    ///
    /// Returns false if any worker had to be aborted.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.closing.cancel();
        let mut workers = std::mem::take(&mut *self.workers.lock().await);
        if workers.is_empty() {
            return true;
        }

        let drained = futures::future::join_all(workers.iter_mut());
        match tokio::time::timeout(timeout, drained).await {
            Ok(_) => {
                info!("task queue drained");
                true
            }
            Err(_) => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "task queue did not drain in time, aborting workers"
                );
                for worker in &workers {
                    worker.abort();
                }
                false
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Envelope>,
    runner: Arc<dyn JobRunner>,
    closing: CancellationToken,
    stats: Arc<TaskStats>,
) {
    loop {
        tokio::select! {
            biased;
            next = rx.recv() => match next {
                Some(envelope) => execute(runner.as_ref(), &stats, envelope).await,
                None => break,
            },
            _ = closing.cancelled() => {
                rx.close();
                while let Some(envelope) = rx.recv().await {
                    execute(runner.as_ref(), &stats, envelope).await;
                }
                break;
            }
        }
    }
    debug!("task worker stopped");
}

async fn execute(runner: &dyn JobRunner, stats: &TaskStats, envelope: Envelope) {
    let Envelope { job, reply } = envelope;
    let outcome = match runner.run(&job).await {
        Ok(()) => {
            stats.completed.fetch_add(1, Ordering::SeqCst);
            TaskOutcome::Succeeded
        }
        Err(e) => {
            stats.failed.fetch_add(1, Ordering::SeqCst);
            warn!(
                job = job.kind(),
                conversation_id = %job.conversation_id(),
                error = %e,
                "background job failed"
            );
            TaskOutcome::Failed(e.to_string())
        }
    };
    // Nobody may be waiting on the ticket.
    let _ = reply.send(outcome);
}
