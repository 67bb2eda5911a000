// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Buffers the request, runs the [`Authenticator`](super::Authenticator) and
//! stores the [`AuthenticationResult`] in the request extensions before the
//! handler runs. Failed authentication short-circuits with the error response.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), authenticate));
//! ```

use axum::{
    extract::{Request, State},
    http::{
        header::{ACCEPT_LANGUAGE, ACCESS_CONTROL_EXPOSE_HEADERS},
        HeaderName, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::{AuthError, AuthenticationResult};
use crate::remote::client::TOKEN_HEADER;
use crate::request::ReplayableRequest;
use crate::state::AppState;

/// Query parameter that overrides `Accept-Language`.
pub const LANGUAGE_PARAM: &str = "language";

/// Authentication middleware function.
pub async fn authenticate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut request = match ReplayableRequest::buffer(request, state.max_body_bytes).await {
        Ok(request) => request,
        Err(e) => return AuthError::from(e).into_response(),
    };

    // Never trust an outcome that did not come from this middleware.
    request.extensions_mut().remove::<AuthenticationResult>();
    request.override_header_from_query(LANGUAGE_PARAM, ACCEPT_LANGUAGE);

    let cancel = state.shutdown.child_token();
    let result = match state.authenticator.authenticate(&request, &cancel).await {
        Ok(result) => result,
        Err(e) => {
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                error_code = e.error_code(),
                error = %e,
                "Authentication failed"
            );
            return e.into_response();
        }
    };

    debug!(
        scheme = ?result.scheme,
        principal = result.principal.as_ref().map(|p| p.name()),
        "Request authenticated"
    );

    let renewed_token = result.renewed_token.clone();
    request.extensions_mut().insert(result);

    let mut response = next.run(request.into_request()).await;
    if let Some(token) = renewed_token {
        expose_renewed_token(&mut response, &token);
    }
    response
}

/// Write the rotated bearer token and let browsers read it.
fn expose_renewed_token(response: &mut Response, token: &str) {
    let Ok(value) = HeaderValue::from_str(token) else {
        warn!("Rotated token is not a valid header value, dropping it");
        return;
    };
    let headers = response.headers_mut();
    headers.insert(HeaderName::from_static(TOKEN_HEADER), value);
    headers.append(
        ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(TOKEN_HEADER),
    );
}
