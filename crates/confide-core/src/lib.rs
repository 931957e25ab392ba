// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the confide chat engine.
//!
//! Provides the error taxonomy, the shared conversation and prompt types,
//! and the collaborator traits (completion provider, conversation store,
//! identity resolver) the engine is written against.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ConfideError;
pub use types::{
    AdapterType, Conversation, ConversationId, HealthStatus, Message, OwnerId, PromptMessage,
    PromptRole, ProviderRequest, ProviderResponse, Sender, TokenStream, Turn,
};

pub use traits::{CompletionProvider, ConversationStore, IdentityResolver, PluginAdapter};
