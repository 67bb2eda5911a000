// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated identities and per-request authentication outcomes.

use std::collections::BTreeSet;

use serde::Serialize;

use super::roles::Role;

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Principal {
    /// End user, authenticated directly or proxied by a trusted app.
    User { name: String, roles: BTreeSet<String> },
    /// Trusted application identifying as itself.
    App { key: String, roles: BTreeSet<String> },
}

impl Principal {
    pub fn user<R, S>(name: impl Into<String>, roles: R) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Principal::User {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Application principal; always carries exactly the `APP` role.
    pub fn app(key: impl Into<String>) -> Self {
        Principal::App {
            key: key.into(),
            roles: BTreeSet::from([Role::App.as_str().to_owned()]),
        }
    }

    /// User name or app key.
    pub fn name(&self) -> &str {
        match self {
            Principal::User { name, .. } => name,
            Principal::App { key, .. } => key,
        }
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        match self {
            Principal::User { roles, .. } | Principal::App { roles, .. } => roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles()
            .iter()
            .any(|r| Role::parse(r) == Some(role))
    }

    pub fn is_app(&self) -> bool {
        matches!(self, Principal::App { .. })
    }
}

/// Scheme a request authenticated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthScheme {
    None,
    Basic,
    Gbif,
    Bearer,
}

/// Outcome of authenticating one request. Inserted into request extensions
/// by the authentication middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticationResult {
    pub principal: Option<Principal>,
    pub roles: BTreeSet<String>,
    pub scheme: AuthScheme,
    /// Rotated bearer token to hand back to the caller.
    #[serde(skip)]
    pub renewed_token: Option<String>,
}

impl AuthenticationResult {
    pub fn anonymous() -> Self {
        Self {
            principal: None,
            roles: BTreeSet::new(),
            scheme: AuthScheme::None,
            renewed_token: None,
        }
    }

    pub fn authenticated(principal: Principal, scheme: AuthScheme) -> Self {
        Self {
            roles: principal.roles().clone(),
            principal: Some(principal),
            scheme,
            renewed_token: None,
        }
    }

    pub fn with_renewed_token(mut self, token: Option<String>) -> Self {
        self.renewed_token = token;
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.principal.is_none()
    }
}
