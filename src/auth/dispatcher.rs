// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization scheme dispatch.
//!
//! | Header | Outcome |
//! |--------|---------|
//! | absent / unknown scheme | anonymous |
//! | `Basic <b64>` | identity service `user/auth/basic`; UUID user names are anonymous |
//! | `GBIF <key>:<sig>` | local signature check, then app principal or proxied user |
//! | `Bearer <token>` | identity service `user/auth/jwt`, token rotated |

use std::collections::HashSet;

use axum::http::header::AUTHORIZATION;
use base64ct::{Base64, Encoding};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::{AuthError, AuthScheme, AuthenticationResult, Principal};
use crate::remote::RemoteAuthClient;
use crate::request::ReplayableRequest;
use crate::signing::{GbifAuthService, GbifCredentials};

/// Authorization schemes this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeKind {
    Basic,
    Gbif,
    Bearer,
}

impl SchemeKind {
    /// Split an `Authorization` value into scheme and credentials.
    ///
    /// The scheme token is matched case-insensitively. Unknown schemes yield
    /// `None`.
    pub fn detect(authorization: &str) -> Option<(SchemeKind, &str)> {
        let value = authorization.trim_start();
        let (scheme, credentials) = value.split_once(' ').unwrap_or((value, ""));

        let kind = if scheme.eq_ignore_ascii_case("basic") {
            SchemeKind::Basic
        } else if scheme.eq_ignore_ascii_case("gbif") {
            SchemeKind::Gbif
        } else if scheme.eq_ignore_ascii_case("bearer") {
            SchemeKind::Bearer
        } else {
            return None;
        };
        Some((kind, credentials.trim()))
    }
}

/// Authenticates one request with whichever scheme its header names.
#[derive(Debug, Clone)]
pub struct Authenticator {
    gbif: GbifAuthService,
    remote: RemoteAuthClient,
    app_key_whitelist: Option<HashSet<String>>,
}

impl Authenticator {
    pub fn new(gbif: GbifAuthService, remote: RemoteAuthClient) -> Self {
        Self {
            gbif,
            remote,
            app_key_whitelist: None,
        }
    }

    /// Restrict GBIF self-identification to the listed app keys.
    pub fn with_app_key_whitelist<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.app_key_whitelist = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn gbif(&self) -> &GbifAuthService {
        &self.gbif
    }

    pub fn remote(&self) -> &RemoteAuthClient {
        &self.remote
    }

    pub async fn authenticate(
        &self,
        request: &ReplayableRequest,
        cancel: &CancellationToken,
    ) -> Result<AuthenticationResult, AuthError> {
        let Some(header) = request.headers().get(AUTHORIZATION) else {
            return Ok(AuthenticationResult::anonymous());
        };
        let header = header.to_str().map_err(|_| {
            AuthError::MalformedAuthorizationHeader("header is not visible ASCII".into())
        })?;

        let Some((kind, credentials)) = SchemeKind::detect(header) else {
            debug!("Unknown authorization scheme, continuing anonymously");
            return Ok(AuthenticationResult::anonymous());
        };
        debug!(scheme = ?kind, "Authenticating request");

        match kind {
            SchemeKind::Basic => self.basic(credentials, cancel).await,
            SchemeKind::Gbif => self.gbif_scheme(credentials, request, cancel).await,
            SchemeKind::Bearer => self.bearer(credentials, cancel).await,
        }
    }

    async fn basic(
        &self,
        credentials: &str,
        cancel: &CancellationToken,
    ) -> Result<AuthenticationResult, AuthError> {
        let decoded = Base64::decode_vec(credentials)
            .map_err(|_| AuthError::MalformedAuthorizationHeader("invalid base64".into()))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| AuthError::MalformedAuthorizationHeader("credentials are not UTF-8".into()))?;
        let (user, _password) = decoded.split_once(':').ok_or_else(|| {
            AuthError::MalformedAuthorizationHeader("expected `user:password`".into())
        })?;

        // Legacy clients send a UUID user name; those requests stay anonymous.
        if Uuid::parse_str(user).is_ok() {
            debug!("UUID basic user, continuing anonymously");
            return Ok(AuthenticationResult::anonymous());
        }

        let user = self
            .remote
            .authenticate_basic(&format!("Basic {credentials}"), cancel)
            .await?;
        Ok(AuthenticationResult::authenticated(
            user.into_principal(),
            AuthScheme::Basic,
        ))
    }

    async fn gbif_scheme(
        &self,
        credentials: &str,
        request: &ReplayableRequest,
        cancel: &CancellationToken,
    ) -> Result<AuthenticationResult, AuthError> {
        let credentials = GbifCredentials::parse(credentials)?;
        let validated = self.gbif.validate(
            &credentials,
            request.method(),
            request.request_target(),
            request.headers(),
            request.body(),
        )?;

        if validated.proxied_user == validated.app_key {
            if let Some(whitelist) = &self.app_key_whitelist {
                if !whitelist.contains(&validated.app_key) {
                    return Err(AuthError::AppKeyNotAllowed(validated.app_key));
                }
            }
            return Ok(AuthenticationResult::authenticated(
                Principal::app(validated.app_key),
                AuthScheme::Gbif,
            ));
        }

        let user = self
            .remote
            .authenticate_app_user(&validated.proxied_user, cancel)
            .await?;
        debug!(
            app_key = %validated.app_key,
            user = %user.user_name,
            "App authenticated on behalf of user"
        );
        Ok(AuthenticationResult::authenticated(
            user.into_principal(),
            AuthScheme::Gbif,
        ))
    }

    async fn bearer(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<AuthenticationResult, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MalformedAuthorizationHeader("empty bearer token".into()));
        }

        let response = self.remote.authenticate_jwt(token, cancel).await?;
        Ok(
            AuthenticationResult::authenticated(response.user.into_principal(), AuthScheme::Bearer)
                .with_renewed_token(response.token),
        )
    }
}
