// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated principals.
//!
//! Both extractors read the [`AuthenticationResult`] stored by the
//! authentication middleware; they never inspect credentials themselves.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal is a User or App
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticationResult, Principal};

/// Extractor that requires an authenticated principal.
///
/// Rejects anonymous requests with `401 authentication_required`.
pub struct Auth(pub Principal);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticationResult>()
            .and_then(|result| result.principal.clone())
            .map(Auth)
            .ok_or(AuthError::AuthenticationRequired)
    }
}

/// Optional authentication extractor.
///
/// Yields the full result, anonymous when the middleware did not run or
/// found no credentials.
pub struct OptionalAuth(pub AuthenticationResult);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let result = parts
            .extensions
            .get::<AuthenticationResult>()
            .cloned()
            .unwrap_or_else(AuthenticationResult::anonymous);
        Ok(OptionalAuth(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthScheme;
    use axum::http::Request;

    fn request_parts(result: Option<AuthenticationResult>) -> Parts {
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        if let Some(result) = result {
            parts.extensions.insert(result);
        }
        parts
    }

    #[tokio::test]
    async fn auth_extractor_requires_principal() {
        let mut parts = request_parts(Some(AuthenticationResult::anonymous()));
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::AuthenticationRequired)));

        let mut parts = request_parts(None);
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::AuthenticationRequired)));
    }

    #[tokio::test]
    async fn auth_extractor_reads_middleware_result() {
        let mut parts = request_parts(Some(AuthenticationResult::authenticated(
            Principal::user("heinz", ["USER"]),
            AuthScheme::Basic,
        )));
        let Auth(principal) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(principal.name(), "heinz");
    }

    #[tokio::test]
    async fn optional_auth_defaults_to_anonymous() {
        let mut parts = request_parts(None);
        let OptionalAuth(result) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(result.is_anonymous());
        assert_eq!(result.scheme, AuthScheme::None);
    }
}
