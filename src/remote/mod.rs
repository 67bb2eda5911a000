// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Service Delegation
//!
//! Services without a local user store forward credentials to the central
//! GBIF identity service:
//!
//! | Endpoint | Credentials forwarded |
//! |----------|-----------------------|
//! | `POST user/auth/basic` | original `Authorization: Basic ...` |
//! | `POST user/auth/jwt` | `Authorization: Bearer <token>`; response carries a rotated `token` header |
//! | `POST user/auth/app` | `x-gbif-user`, signed with this service's own app key |
//!
//! Transport failures and 5xx responses are retried with a fixed backoff;
//! 401/403 are final.

use axum::http::StatusCode;

use crate::signing::SigningError;

pub mod client;
pub mod retry;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{OutboundSigning, RemoteAuthClient, RemoteResponse, RemoteUser};
pub use retry::{with_retry, RetryPolicy};

/// Errors raised by identity service calls.
#[derive(Debug, thiserror::Error)]
pub enum RemoteAuthError {
    #[error("identity service rejected the credentials ({0})")]
    Rejected(StatusCode),

    #[error("identity service transport failure: {0}")]
    Transport(String),

    #[error("identity service returned {0}")]
    ServerError(StatusCode),

    #[error("identity service returned unexpected status {0}")]
    UnexpectedStatus(StatusCode),

    #[error("identity service response was invalid: {0}")]
    InvalidResponse(String),

    #[error("credentials cannot be forwarded: {0}")]
    InvalidCredentials(String),

    #[error("identity service call could not be signed: {0}")]
    Signing(#[from] SigningError),

    #[error("identity client misconfigured: {0}")]
    Configuration(String),

    #[error("identity service call cancelled")]
    Cancelled,

    #[error("identity service unavailable after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<RemoteAuthError>,
    },
}

impl RemoteAuthError {
    /// Transport failures and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ServerError(_))
    }
}
