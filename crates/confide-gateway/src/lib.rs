// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the confide chat engine.
//!
//! Exposes the streaming chat endpoint and the conversation endpoints over
//! axum, resolving bearer tokens to owners before any handler runs.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod sse;

pub use auth::StaticTokenResolver;
pub use error::{ApiError, ErrorResponse};
pub use server::{GatewayState, build_router, init_tracing, run, start_server};
