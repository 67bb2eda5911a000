// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! GBIF WS Auth - Request Authentication for GBIF Web Services
//!
//! Signs and validates GBIF app-key requests, delegates Basic and Bearer
//! credentials to the central identity service, and rotates bearer tokens.
//!
//! ## Modules
//!
//! - `signing` - Canonical string-to-sign, HMAC-SHA1 signer, app key store
//! - `request` - Replayable request wrapper with bounded body buffering
//! - `remote` - Identity service client with bounded retry
//! - `auth` - Scheme dispatch, middleware and extractors
//! - `api` - HTTP routes (Axum)

pub mod api;
pub mod auth;
pub mod config;
pub mod remote;
pub mod request;
pub mod signing;
pub mod state;
