// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # GBIF App-Key Signing
//!
//! Trusted GBIF applications authenticate with an HMAC-SHA1 signature over a
//! canonical description of the request:
//!
//! ```text
//! Authorization: GBIF <appKey>:<Base64(HMAC-SHA1(secret, StringToSign))>
//!
//! StringToSign = Method + "\n" +
//!                CanonicalPath + "\n" +
//!                [Content-Type + "\n"] +      (POST/PUT with a body only)
//!                [Content-MD5 + "\n"] +       (POST/PUT with a body only)
//!                ProxiedUser
//! ```
//!
//! The proxied user travels in the `x-gbif-user` header. A reverse proxy that
//! rewrites the path forwards the original one in `x-url`, which then replaces
//! the request's own path in the canonical string.
//!
//! The string to sign carries no timestamp or nonce, so a captured request can
//! be replayed. Interoperability with existing GBIF clients depends on this
//! exact layout; replay protection belongs in an outer layer.

pub mod canonical;
pub mod keystore;
pub mod service;
pub mod signer;

pub use canonical::{canonicalize, RequestDataToSign};
pub use keystore::{AppKeyStore, KeyStoreError};
pub use service::{GbifAuthService, GbifCredentials, SignFailurePolicy, ValidatedRequest};

/// Authorization scheme token for app-key signatures.
pub const GBIF_SCHEME: &str = "GBIF";

/// Header naming the user an application acts on behalf of.
pub const HEADER_GBIF_USER: &str = "x-gbif-user";

/// Header carrying the original request URL when a proxy rewrote the path.
pub const HEADER_ORIGINAL_REQUEST_URL: &str = "x-url";

/// Header carrying the base64 MD5 digest of the request body.
pub const HEADER_CONTENT_MD5: &str = "content-md5";

/// Errors raised while signing or validating GBIF app-key requests.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("no secret registered for app key `{0}`")]
    PrivateKeyNotFound(String),

    #[error("request path cannot be canonicalized: {0}")]
    InvalidPath(String),

    #[error("malformed GBIF authorization: {0}")]
    MalformedAuthorization(String),

    #[error("missing required header `{0}`")]
    MissingHeader(&'static str),

    #[error("Content-MD5 header does not match the request body")]
    ContentDigestMismatch,

    #[error("request signature does not match")]
    SignatureMismatch,

    #[error("invalid header value for `{0}`")]
    InvalidHeaderValue(&'static str),
}
