// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the chat engine.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod identity;
pub mod provider;
pub mod store;

pub use adapter::PluginAdapter;
pub use identity::IdentityResolver;
pub use provider::CompletionProvider;
pub use store::ConversationStore;
