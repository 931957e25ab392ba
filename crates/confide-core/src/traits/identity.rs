// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity resolution boundary.

use async_trait::async_trait;

use crate::error::ConfideError;
use crate::types::OwnerId;

/// Maps a caller credential to a stable owner identifier.
#[async_trait]
pub trait IdentityResolver: Send + Sync + 'static {
    /// Returns `Ok(None)` when the credential is unknown.
    async fn resolve(&self, credential: &str) -> Result<Option<OwnerId>, ConfideError>;
}
