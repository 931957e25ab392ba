// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types live in `confide-core::types` so they can cross the
//! store trait boundary; they are re-exported here for the query modules.

pub use confide_core::types::{Conversation, ConversationId, Message, OwnerId, Sender};
