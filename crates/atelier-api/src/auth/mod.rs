//! Caller identity extraction.
//!
//! Authentication policy is an external capability: a provider turns a
//! bearer token into an opaque `Identity` or nothing. Anonymous callers may
//! read finalized content; every mutation requires an identity.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use subtle::ConstantTimeEq;

use atelier_core::models::Identity;
use atelier_core::AppError;

use crate::error::HttpAppError;
use crate::state::AppState;

/// External identity capability: token in, identity out.
pub trait IdentityProvider: Send + Sync {
    fn authenticate(&self, token: &str) -> Option<Identity>;
}

/// Static-token provider configured from the environment. Suitable for a
/// single-admin deployment; anything richer plugs in behind the same trait.
pub struct StaticTokenProvider {
    token: Option<String>,
    identity: Identity,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>, identity: Identity) -> Self {
        if token.is_none() {
            tracing::warn!("API_TOKEN is not set; all mutation endpoints will reject");
        }
        Self { token, identity }
    }
}

impl IdentityProvider for StaticTokenProvider {
    fn authenticate(&self, token: &str) -> Option<Identity> {
        let expected = self.token.as_deref()?;
        let matches: bool = expected.as_bytes().ct_eq(token.as_bytes()).into();
        matches.then(|| self.identity.clone())
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Optional caller identity; `None` for anonymous requests.
pub struct Caller(pub Option<Identity>);

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = bearer_token(parts).and_then(|token| state.identity.authenticate(token));
        Ok(Caller(identity))
    }
}

/// Authenticated caller; rejects anonymous requests with 401.
pub struct RequireAuth(pub Identity);

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Caller(identity) = Caller::from_request_parts(parts, state).await?;
        identity
            .map(RequireAuth)
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("authentication required".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn provider(token: Option<&str>) -> StaticTokenProvider {
        StaticTokenProvider::new(
            token.map(String::from),
            Identity {
                id: Uuid::new_v4(),
                email: "admin@example.com".to_string(),
            },
        )
    }

    #[test]
    fn test_valid_token_authenticates() {
        let p = provider(Some("secret"));
        assert!(p.authenticate("secret").is_some());
    }

    #[test]
    fn test_wrong_token_rejected() {
        let p = provider(Some("secret"));
        assert!(p.authenticate("guess").is_none());
        assert!(p.authenticate("").is_none());
    }

    #[test]
    fn test_unconfigured_token_rejects_everything() {
        let p = provider(None);
        assert!(p.authenticate("anything").is_none());
    }
}
