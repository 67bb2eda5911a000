// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::remote::RemoteAuthError;
use crate::request::BufferError;
use crate::signing::SigningError;

/// Authentication error type.
///
/// Every variant is terminal for the request: no principal is attached and
/// the handler does not run.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Malformed authorization header: {0}")]
    MalformedAuthorizationHeader(String),

    #[error("Missing required header `{0}`")]
    MissingRequiredHeader(&'static str),

    #[error("Request path cannot be canonicalized: {0}")]
    InvalidRequestPath(String),

    #[error("Request body could not be read: {0}")]
    UnreadableBody(String),

    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Unknown app key `{0}`")]
    UnknownAppKey(String),

    #[error("Request signature does not match")]
    SignatureMismatch,

    #[error("Content-MD5 header does not match the request body")]
    ContentDigestMismatch,

    #[error("App key `{0}` may not identify as an application")]
    AppKeyNotAllowed(String),

    #[error("Invalid credentials")]
    RemoteAuthRejected,

    /// Identity service failures are reported to clients as plain
    /// authentication failures.
    #[error("Authentication failed")]
    RemoteAuthUnavailable,

    #[error("Authentication is required")]
    AuthenticationRequired,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MalformedAuthorizationHeader(_) => "malformed_authorization_header",
            AuthError::MissingRequiredHeader(_) => "missing_required_header",
            AuthError::InvalidRequestPath(_) => "invalid_request_path",
            AuthError::UnreadableBody(_) => "unreadable_body",
            AuthError::BodyTooLarge { .. } => "body_too_large",
            AuthError::UnknownAppKey(_) => "unknown_app_key",
            AuthError::SignatureMismatch => "signature_mismatch",
            AuthError::ContentDigestMismatch => "content_digest_mismatch",
            AuthError::AppKeyNotAllowed(_) => "app_key_not_allowed",
            AuthError::RemoteAuthRejected => "remote_auth_rejected",
            AuthError::RemoteAuthUnavailable => "remote_auth_unavailable",
            AuthError::AuthenticationRequired => "authentication_required",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MalformedAuthorizationHeader(_)
            | AuthError::MissingRequiredHeader(_)
            | AuthError::InvalidRequestPath(_)
            | AuthError::UnreadableBody(_) => StatusCode::BAD_REQUEST,
            AuthError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AuthError::UnknownAppKey(_)
            | AuthError::SignatureMismatch
            | AuthError::ContentDigestMismatch
            | AuthError::AppKeyNotAllowed(_)
            | AuthError::RemoteAuthRejected
            | AuthError::RemoteAuthUnavailable
            | AuthError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<SigningError> for AuthError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::PrivateKeyNotFound(key) => AuthError::UnknownAppKey(key),
            SigningError::InvalidPath(msg) => AuthError::InvalidRequestPath(msg),
            SigningError::MalformedAuthorization(msg) => AuthError::MalformedAuthorizationHeader(msg),
            SigningError::MissingHeader(name) => AuthError::MissingRequiredHeader(name),
            SigningError::ContentDigestMismatch => AuthError::ContentDigestMismatch,
            SigningError::SignatureMismatch => AuthError::SignatureMismatch,
            SigningError::InvalidHeaderValue(name) => {
                AuthError::MalformedAuthorizationHeader(format!("invalid value for `{name}`"))
            }
        }
    }
}

impl From<RemoteAuthError> for AuthError {
    fn from(err: RemoteAuthError) -> Self {
        match err {
            RemoteAuthError::Rejected(_) => AuthError::RemoteAuthRejected,
            RemoteAuthError::InvalidCredentials(msg) => AuthError::MalformedAuthorizationHeader(msg),
            _ => AuthError::RemoteAuthUnavailable,
        }
    }
}

impl From<BufferError> for AuthError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::TooLarge { limit } => AuthError::BodyTooLarge { limit },
            BufferError::Unreadable(msg) => AuthError::UnreadableBody(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
