// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Observable per-conversation lifecycle: Idle -> Streaming -> (Compacting)? -> Idle.

use confide_core::ConversationId;
use dashmap::{DashMap, DashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// No turn in flight and no compaction pending.
    Idle,
    /// A turn is streaming or running its completion callback.
    Streaming,
    /// A compaction is queued or running; the next turn may still stream.
    Compacting,
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationState::Idle => write!(f, "idle"),
            ConversationState::Streaming => write!(f, "streaming"),
            ConversationState::Compacting => write!(f, "compacting"),
        }
    }
}

/// Tracks streaming turns and pending compactions. Absent ids are idle.
#[derive(Debug, Default)]
pub struct ConversationStates {
    streaming: DashSet<ConversationId>,
    compacting: DashMap<ConversationId, usize>,
}

impl ConversationStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Streaming takes precedence over a pending compaction.
    pub fn get(&self, id: &ConversationId) -> ConversationState {
        if self.streaming.contains(id) {
            ConversationState::Streaming
        } else if self.compacting.contains_key(id) {
            ConversationState::Compacting
        } else {
            ConversationState::Idle
        }
    }

    pub fn begin_streaming(&self, id: &ConversationId) {
        self.streaming.insert(id.clone());
    }

    pub fn end_streaming(&self, id: &ConversationId) {
        self.streaming.remove(id);
    }

    pub fn begin_compaction(&self, id: &ConversationId) {
        *self.compacting.entry(id.clone()).or_insert(0) += 1;
    }

    pub fn end_compaction(&self, id: &ConversationId) {
        if let Some(mut pending) = self.compacting.get_mut(id) {
            *pending = pending.saturating_sub(1);
        }
        self.compacting.remove_if(id, |_, pending| *pending == 0);
    }

    pub fn forget(&self, id: &ConversationId) {
        self.streaming.remove(id);
        self.compacting.remove(id);
    }
}
