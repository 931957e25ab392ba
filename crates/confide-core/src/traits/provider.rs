// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion provider trait. Vendor protocols live behind this boundary.

use async_trait::async_trait;

use crate::error::ConfideError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse, TokenStream};

/// An external language model.
///
/// `stream` returns a lazy sequence that may fail mid-way; every call to
/// `stream` is a separate upstream generation.
#[async_trait]
pub trait CompletionProvider: PluginAdapter {
    /// Sends a completion request and returns the full response text.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ConfideError>;

    /// Sends a completion request and returns a stream of text fragments.
    async fn stream(&self, request: ProviderRequest) -> Result<TokenStream, ConfideError>;
}
