// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{body::Bytes, http::header::ACCEPT_LANGUAGE, http::HeaderMap, Json};
use serde::Serialize;

use crate::auth::{Auth, AuthenticationResult, OptionalAuth, Principal};

/// Authentication outcome of the current request; anonymous callers allowed.
pub async fn whoami(OptionalAuth(result): OptionalAuth) -> Json<AuthenticationResult> {
    Json(result)
}

/// Authenticated principal; 401 for anonymous callers.
pub async fn me(Auth(principal): Auth) -> Json<Principal> {
    Json(principal)
}

#[derive(Debug, Serialize)]
pub struct EchoResponse {
    pub principal: Principal,
    pub language: Option<String>,
    pub body: String,
}

/// Echo the body after authentication, showing it survived signature checks.
pub async fn echo(Auth(principal): Auth, headers: HeaderMap, body: Bytes) -> Json<EchoResponse> {
    Json(EchoResponse {
        principal,
        language: headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
