// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation context for the confide chat engine.
//!
//! - [`window`]: bounded short-term memory per conversation
//! - [`prompt`]: ordered prompt assembly (policy, summary, window)
//! - [`compaction`]: folding evicted turns into the long-term summary
//! - [`title`]: first-exchange title generation

pub mod compaction;
pub mod prompt;
pub mod title;
pub mod window;

pub use compaction::Compactor;
pub use prompt::{DEFAULT_POLICY, PromptAssembler, load_policy};
pub use title::TitleGenerator;
pub use window::ContextWindow;
