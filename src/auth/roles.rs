// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! GBIF roles.

use serde::{Deserialize, Serialize};

/// Roles known to GBIF services.
///
/// The identity service may return roles this enum does not list; principals
/// keep roles as strings and this type names the ones the crate itself
/// assigns or checks.
///
/// - `User` - Registered end user
/// - `RegistryAdmin` - Full registry administration
/// - `RegistryEditor` - Registry editing rights
/// - `App` - Trusted application identifying as itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    RegistryAdmin,
    RegistryEditor,
    App,
}

impl Role {
    /// Wire name, as used by the identity service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::RegistryAdmin => "REGISTRY_ADMIN",
            Role::RegistryEditor => "REGISTRY_EDITOR",
            Role::App => "APP",
        }
    }

    /// Parse a role name (case-insensitive).
    pub fn parse(s: &str) -> Option<Role> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Some(Role::User),
            "REGISTRY_ADMIN" => Some(Role::RegistryAdmin),
            "REGISTRY_EDITOR" => Some(Role::RegistryEditor),
            "APP" => Some(Role::App),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
