// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing of outgoing requests and validation of incoming ones.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Method};
use tracing::debug;

use super::canonical::{carries_content, RequestDataToSign};
use super::{
    signer, AppKeyStore, SigningError, GBIF_SCHEME, HEADER_CONTENT_MD5, HEADER_GBIF_USER,
};

/// What to do when an outgoing request cannot be signed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignFailurePolicy {
    /// Abort the outgoing call.
    #[default]
    Fail,
    /// Log a warning and send the request without a signature.
    SendUnsigned,
}

/// `<appKey>:<signature>` from a `GBIF` authorization header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GbifCredentials {
    pub app_key: String,
    pub signature: String,
}

impl GbifCredentials {
    /// Parse the credentials part that follows the `GBIF ` scheme token.
    pub fn parse(credentials: &str) -> Result<Self, SigningError> {
        let (app_key, signature) = credentials.trim().split_once(':').ok_or_else(|| {
            SigningError::MalformedAuthorization("expected `GBIF <appKey>:<signature>`".into())
        })?;

        if app_key.is_empty() || signature.is_empty() {
            return Err(SigningError::MalformedAuthorization(
                "app key and signature must not be empty".into(),
            ));
        }

        Ok(Self {
            app_key: app_key.to_owned(),
            signature: signature.to_owned(),
        })
    }

    /// Render the full `Authorization` header value.
    pub fn header_value(&self) -> String {
        format!("{GBIF_SCHEME} {}:{}", self.app_key, self.signature)
    }
}

/// Outcome of a successful signature validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub app_key: String,
    pub proxied_user: String,
}

/// Signs and validates GBIF app-key requests against an [`AppKeyStore`].
#[derive(Debug, Clone)]
pub struct GbifAuthService {
    keys: Arc<AppKeyStore>,
}

impl GbifAuthService {
    pub fn new(keys: Arc<AppKeyStore>) -> Self {
        Self { keys }
    }

    pub fn key_store(&self) -> &AppKeyStore {
        &self.keys
    }

    /// Signature of `data` under the secret registered for `app_key`.
    pub fn build_signature(
        &self,
        data: &RequestDataToSign,
        app_key: &str,
    ) -> Result<String, SigningError> {
        let secret = self.keys.secret(app_key)?;
        Ok(signer::sign(&data.string_to_sign(), secret))
    }

    /// Sign an outgoing request in place.
    ///
    /// Sets `x-gbif-user`, `Content-MD5` (POST/PUT with a body only) and the
    /// `Authorization` header. Headers are left untouched when the app key is
    /// unknown.
    pub fn sign_headers(
        &self,
        app_key: &str,
        proxied_user: &str,
        method: &Method,
        request_target: &str,
        headers: &mut HeaderMap,
        body: &[u8],
    ) -> Result<(), SigningError> {
        let secret = self.keys.secret(app_key)?;

        // The validator reads the user back as visible ASCII, so anything else
        // would be signed as an empty user.
        let user = HeaderValue::from_str(proxied_user)
            .ok()
            .filter(|value| value.to_str().is_ok())
            .ok_or(SigningError::InvalidHeaderValue(HEADER_GBIF_USER))?;
        let mut signed = headers.clone();
        signed.insert(HEADER_GBIF_USER, user);

        let data = RequestDataToSign::from_request(method, request_target, &signed, body)?;
        if let Some(digest) = &data.content_digest {
            let value = HeaderValue::from_str(digest)
                .map_err(|_| SigningError::InvalidHeaderValue(HEADER_CONTENT_MD5))?;
            signed.insert(HEADER_CONTENT_MD5, value);
        }

        let credentials = GbifCredentials {
            app_key: app_key.to_owned(),
            signature: signer::sign(&data.string_to_sign(), secret),
        };
        let authorization = HeaderValue::from_str(&credentials.header_value())
            .map_err(|_| SigningError::InvalidHeaderValue("authorization"))?;
        signed.insert(AUTHORIZATION, authorization);

        debug!(
            app_key = %app_key,
            method = %method,
            path = %data.url,
            "Signed outgoing request"
        );
        *headers = signed;
        Ok(())
    }

    /// Sign a built `reqwest` request in place.
    pub fn sign_reqwest(
        &self,
        app_key: &str,
        proxied_user: &str,
        request: &mut reqwest::Request,
    ) -> Result<(), SigningError> {
        let method = request.method().clone();
        let target = request.url().as_str().to_owned();
        let body = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        self.sign_headers(
            app_key,
            proxied_user,
            &method,
            &target,
            request.headers_mut(),
            &body,
        )
    }

    /// Validate the signature of an incoming request.
    ///
    /// Requires a non-empty `x-gbif-user` header. When a `Content-MD5` header
    /// accompanies a POST/PUT body it must match the recomputed digest.
    pub fn validate(
        &self,
        credentials: &GbifCredentials,
        method: &Method,
        request_target: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<ValidatedRequest, SigningError> {
        let proxied_user = headers
            .get(HEADER_GBIF_USER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .ok_or(SigningError::MissingHeader(HEADER_GBIF_USER))?;

        let data = RequestDataToSign::from_request(method, request_target, headers, body)?;

        if carries_content(method, body) {
            let declared = headers
                .get(HEADER_CONTENT_MD5)
                .and_then(|value| value.to_str().ok());
            if let (Some(declared), Some(computed)) = (declared, data.content_digest.as_deref()) {
                if declared.trim() != computed {
                    debug!(app_key = %credentials.app_key, "Content-MD5 does not match body");
                    return Err(SigningError::ContentDigestMismatch);
                }
            }
        }

        let secret = self.keys.secret(&credentials.app_key)?;
        if !signer::verify(&data.string_to_sign(), secret, &credentials.signature) {
            debug!(
                app_key = %credentials.app_key,
                method = %data.method,
                path = %data.url,
                "GBIF signature mismatch"
            );
            return Err(SigningError::SignatureMismatch);
        }

        debug!(
            app_key = %credentials.app_key,
            proxied_user = %proxied_user,
            "GBIF signature verified"
        );
        Ok(ValidatedRequest {
            app_key: credentials.app_key.clone(),
            proxied_user: proxied_user.to_owned(),
        })
    }
}
