// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for confide integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - scripted completion provider with call counters
//! - [`FlakyStore`] - store wrapper with injectable write failures
//! - [`TestHarness`] - full engine over temp SQLite and the mock provider

pub mod flaky_store;
pub mod harness;
pub mod mock_provider;

pub use flaky_store::{FlakyStore, temp_store};
pub use harness::{TestHarness, TestHarnessBuilder, TurnResult};
pub use mock_provider::{MockProvider, StreamScript};
