// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded per-conversation short-term memory.
//!
//! Each conversation holds at most `capacity` turns, oldest first. Overflow
//! is handled in bulk: when the window reaches capacity its whole content is
//! captured and cleared in one step, and the captured turns are handed to
//! the compactor. There is no sliding drop of single turns.
//!
//! Every operation runs under the map's per-key lock, so capture-and-clear
//! is never observed half done. Ordering across turns of one conversation is
//! the caller's job (see the engine's conversation locks).

use confide_core::{ConversationId, Turn};
use dashmap::DashMap;

#[derive(Debug)]
pub struct ContextWindow {
    capacity: usize,
    windows: DashMap<ConversationId, Vec<Turn>>,
}

impl ContextWindow {
    /// Create a window store bounded to `capacity` turns per conversation.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            windows: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a turn.
    ///
    /// If the window is already full, its content is evicted first and
    /// returned, so the length never exceeds capacity after an append.
    pub fn append(&self, id: &ConversationId, turn: Turn) -> Option<Vec<Turn>> {
        let mut window = self.windows.entry(id.clone()).or_default();
        let evicted = (window.len() >= self.capacity).then(|| std::mem::take(&mut *window));
        window.push(turn);
        evicted
    }

    /// Capture and clear the window if it has reached capacity.
    ///
    /// The emptied entry is dropped.
    pub fn take_if_full(&self, id: &ConversationId) -> Option<Vec<Turn>> {
        let evicted = {
            let mut window = self.windows.get_mut(id)?;
            (window.len() >= self.capacity).then(|| std::mem::take(&mut *window))
        };
        if evicted.is_some() {
            self.windows.remove_if(id, |_, window| window.is_empty());
        }
        evicted
    }

    /// Copy of the current turns, oldest first.
    pub fn snapshot(&self, id: &ConversationId) -> Vec<Turn> {
        self.windows
            .get(id)
            .map(|window| window.clone())
            .unwrap_or_default()
    }

    pub fn len(&self, id: &ConversationId) -> usize {
        self.windows.get(id).map_or(0, |window| window.len())
    }

    pub fn is_empty(&self, id: &ConversationId) -> bool {
        self.len(id) == 0
    }

    /// Empty a conversation's window. An empty window holds no entry.
    pub fn clear(&self, id: &ConversationId) {
        self.windows.remove(id);
    }

    /// Conversations currently holding at least one turn.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Drop a conversation's window entirely (conversation deleted).
    pub fn remove(&self, id: &ConversationId) {
        self.windows.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cid(id: &str) -> ConversationId {
        ConversationId::new(id)
    }

    #[test]
    fn snapshot_is_oldest_first() {
        let window = ContextWindow::new(4);
        window.append(&cid("c"), Turn::user("one"));
        window.append(&cid("c"), Turn::ai("two"));
        let snapshot = window.snapshot(&cid("c"));
        assert_eq!(snapshot, vec![Turn::user("one"), Turn::ai("two")]);
    }

    #[test]
    fn take_if_full_captures_and_clears_at_boundary() {
        let window = ContextWindow::new(2);
        let id = cid("c");
        window.append(&id, Turn::user("hi"));
        assert!(window.take_if_full(&id).is_none());

        window.append(&id, Turn::ai("hello"));
        let evicted = window.take_if_full(&id).unwrap();
        assert_eq!(evicted.len(), 2);
        assert!(window.is_empty(&id));
        assert_eq!(window.tracked(), 0);
    }

    #[test]
    fn append_to_full_window_evicts_in_bulk_first() {
        let window = ContextWindow::new(2);
        let id = cid("c");
        window.append(&id, Turn::user("a"));
        window.append(&id, Turn::user("b"));

        let evicted = window.append(&id, Turn::user("c")).unwrap();
        assert_eq!(evicted, vec![Turn::user("a"), Turn::user("b")]);
        assert_eq!(window.snapshot(&id), vec![Turn::user("c")]);
    }

    #[test]
    fn windows_are_independent_per_conversation() {
        let window = ContextWindow::new(3);
        window.append(&cid("a"), Turn::user("x"));
        window.append(&cid("b"), Turn::user("y"));
        window.clear(&cid("a"));
        assert_eq!(window.len(&cid("a")), 0);
        assert_eq!(window.len(&cid("b")), 1);

        window.remove(&cid("b"));
        assert!(window.snapshot(&cid("b")).is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(ContextWindow::new(0).capacity(), 1);
    }

    proptest! {
        #[test]
        fn length_never_exceeds_capacity(capacity in 1usize..12, ops in proptest::collection::vec(any::<bool>(), 0..80)) {
            let window = ContextWindow::new(capacity);
            let id = cid("p");
            for take in ops {
                if take {
                    window.take_if_full(&id);
                } else {
                    window.append(&id, Turn::user("t"));
                }
                prop_assert!(window.len(&id) <= capacity);
            }
        }
    }
}
