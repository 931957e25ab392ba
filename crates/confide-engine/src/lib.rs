// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational streaming engine for confide.
//!
//! Turns a user's chat message into a token-by-token response while keeping
//! a bounded context window per conversation, persisting each exchange once,
//! and compacting overflowed context into a long-term summary in the
//! background.

pub mod conversations;
pub mod locks;
pub mod relay;
pub mod session;
pub mod shutdown;
pub mod state;
pub mod tasks;

pub use conversations::{
    ConversationDetail, ConversationService, ConversationSummary, ConversationUpdate, MessageView,
};
pub use relay::{Relay, RelayCompletion, RelayOutcome, RelayStatus};
pub use session::{ChatEngine, ChatTurn, TurnCompletion, TurnReport};
pub use state::ConversationState;
pub use tasks::{Job, JobRunner, TaskOutcome, TaskQueue, TaskTicket};
