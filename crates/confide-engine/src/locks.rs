// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation serialization.

use std::sync::Arc;

use confide_core::ConversationId;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per conversation id.
///
/// A turn holds the guard from authorization until its completion callback
/// has finished, so window appends and summary updates for one conversation
/// never interleave. Different conversations never contend.
#[derive(Debug, Default)]
pub struct ConversationLocks {
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn acquire(&self, id: &ConversationId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.locks.entry(id.clone()).or_default().value());
        lock.lock_owned().await
    }

    /// Drop the lock entry. A guard already handed out stays valid.
    pub fn remove(&self, id: &ConversationId) {
        self.locks.remove(id);
    }

    /// Drop the entry for `id` if nobody holds or waits on its lock.
    ///
    /// `acquire` clones the mutex under the same shard lock, so an entry
    /// that is in use is never removed.
    pub fn evict_idle(&self, id: &ConversationId) {
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_conversation_is_serialized() {
        let locks = Arc::new(ConversationLocks::new());
        let id = ConversationId::new("c1");

        let guard = locks.acquire(&id).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_conversations_do_not_contend() {
        let locks = ConversationLocks::new();
        let _a = locks.acquire(&ConversationId::new("a")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&ConversationId::new("b")),
        )
        .await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn remove_forgets_the_entry() {
        let locks = ConversationLocks::new();
        let id = ConversationId::new("gone");
        drop(locks.acquire(&id).await);
        locks.remove(&id);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn idle_entries_are_evicted() {
        let locks = ConversationLocks::new();
        let id = ConversationId::new("idle");
        let guard = locks.acquire(&id).await;

        locks.evict_idle(&id);
        assert_eq!(locks.len(), 1, "held lock must stay");

        drop(guard);
        locks.evict_idle(&id);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn entry_with_a_waiter_is_kept() {
        let locks = Arc::new(ConversationLocks::new());
        let id = ConversationId::new("busy");
        let guard = locks.acquire(&id).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        drop(guard);
        locks.evict_idle(&id);
        waiter.await.unwrap();
        locks.evict_idle(&id);
        assert!(locks.is_empty());
    }
}
