// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token identity resolution for the gateway.
//!
//! Every `/api` request must carry `Authorization: Bearer <token>`. The
//! token is resolved to an [`OwnerId`] before any handler runs and the owner
//! is attached to the request as an extension. Unresolvable credentials are
//! rejected with 401 (fail-closed, including when no tokens are configured).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use confide_config::model::TokenConfig;
use confide_core::{ConfideError, IdentityResolver, OwnerId};

use crate::error::ApiError;

/// Resolves statically configured bearer tokens.
#[derive(Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, OwnerId>,
}

impl StaticTokenResolver {
    pub fn new(tokens: impl IntoIterator<Item = (String, OwnerId)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn from_config(tokens: &[TokenConfig]) -> Self {
        Self::new(
            tokens
                .iter()
                .map(|t| (t.token.clone(), OwnerId::new(t.owner.clone()))),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Debug for StaticTokenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenResolver")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

#[async_trait]
impl IdentityResolver for StaticTokenResolver {
    async fn resolve(&self, credential: &str) -> Result<Option<OwnerId>, ConfideError> {
        Ok(self.tokens.get(credential).cloned())
    }
}

/// Middleware that resolves the bearer token and attaches the owner.
pub async fn auth_middleware(
    State(resolver): State<Arc<dyn IdentityResolver>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        tracing::debug!("request without bearer token rejected");
        return Err(ConfideError::Unauthorized.into());
    };

    let owner = resolver
        .resolve(token)
        .await?
        .ok_or(ConfideError::Unauthorized)?;

    request.extensions_mut().insert(owner);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_configured_tokens_only() {
        let resolver = StaticTokenResolver::from_config(&[TokenConfig {
            token: "t-alice".to_string(),
            owner: "alice".to_string(),
        }]);
        assert_eq!(
            resolver.resolve("t-alice").await.unwrap(),
            Some(OwnerId::new("alice"))
        );
        assert_eq!(resolver.resolve("t-bob").await.unwrap(), None);
    }

    #[test]
    fn debug_hides_tokens() {
        let resolver = StaticTokenResolver::new([("secret".to_string(), OwnerId::new("a"))]);
        let debug = format!("{resolver:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains('1'));
    }
}
