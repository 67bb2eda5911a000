// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Multi-scheme request authentication for GBIF web services.
//!
//! ## Auth Flow
//!
//! 1. The middleware buffers the request body so it can be hashed and later
//!    parsed by the handler.
//! 2. The `Authorization` scheme selects a provider:
//!    - `Basic` → forwarded to the identity service
//!    - `GBIF` → HMAC-SHA1 signature checked against the local app key store
//!    - `Bearer` → exchanged with the identity service for a rotated token
//!    - anything else → anonymous
//! 3. The resulting [`AuthenticationResult`] is stored in the request
//!    extensions and read by the [`Auth`] / [`OptionalAuth`] extractors.
//! 4. After a Bearer success the response carries the rotated `token` header.
//!
//! ## Security
//!
//! - Unknown app keys are rejected, never treated as anonymous
//! - Identity service outages surface as 401, logged at error level
//! - Authorization (403) is left to handlers

pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod principal;
pub mod roles;

pub use dispatcher::{Authenticator, SchemeKind};
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use principal::{AuthScheme, AuthenticationResult, Principal};
pub use roles::Role;
