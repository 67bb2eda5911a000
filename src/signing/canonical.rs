// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical string-to-sign construction.
//!
//! Client and server must derive byte-identical strings for the same logical
//! request, so both sides go through [`RequestDataToSign::from_request`].

use axum::http::{header::CONTENT_TYPE, HeaderMap, Method};
use url::Url;

use super::{signer, SigningError, HEADER_GBIF_USER, HEADER_ORIGINAL_REQUEST_URL};

/// Base used to resolve origin-form request targets such as `/dataset?q=1`.
const CANONICAL_BASE: &str = "http://localhost/";

/// The request attributes covered by a GBIF signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDataToSign {
    /// HTTP method, e.g. `POST`.
    pub method: String,
    /// Canonical path: no scheme, host or query string.
    pub url: String,
    /// Content type, only for POST/PUT requests with a body.
    pub content_type: Option<String>,
    /// Base64 MD5 of the body, only for POST/PUT requests with a body.
    pub content_digest: Option<String>,
    /// User the application acts for; empty for anonymous internal calls.
    pub proxied_user: String,
}

impl RequestDataToSign {
    /// Collect the signed attributes of a request.
    ///
    /// The `x-url` header, when present, replaces `request_target` so that
    /// signatures survive proxies that rewrite paths. The digest is always
    /// recomputed from `body`, never copied from a `Content-MD5` header.
    pub fn from_request(
        method: &Method,
        request_target: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Self, SigningError> {
        let raw_path = header_str(headers, HEADER_ORIGINAL_REQUEST_URL).unwrap_or(request_target);

        let (content_type, content_digest) = if carries_content(method, body) {
            (
                header_str(headers, CONTENT_TYPE.as_str())
                    .filter(|value| !value.is_empty())
                    .map(str::to_owned),
                Some(signer::content_md5(body)),
            )
        } else {
            (None, None)
        };

        Ok(Self {
            method: method.as_str().to_owned(),
            url: canonical_path(raw_path)?,
            content_type,
            content_digest,
            proxied_user: header_str(headers, HEADER_GBIF_USER)
                .unwrap_or_default()
                .to_owned(),
        })
    }

    /// Render the newline-separated string to sign.
    pub fn string_to_sign(&self) -> String {
        join_lines(
            &self.method,
            &self.url,
            self.content_type.as_deref(),
            self.content_digest.as_deref(),
            &self.proxied_user,
        )
    }
}

/// Build the string to sign from loose parts.
///
/// Optional fields that are `None` are left out entirely rather than rendered
/// as empty lines.
pub fn canonicalize(
    method: &str,
    raw_path: &str,
    content_type: Option<&str>,
    content_digest: Option<&str>,
    proxied_user: &str,
) -> Result<String, SigningError> {
    let path = canonical_path(raw_path)?;
    Ok(join_lines(method, &path, content_type, content_digest, proxied_user))
}

/// Normalize a request target down to its path.
///
/// Accepts absolute URLs and origin-form targets. Dot segments are collapsed,
/// and scheme, host, query and fragment are dropped.
///
/// Percent-encodings are kept exactly as sent: `%2f` and `%2F` produce
/// different canonical paths. Existing GBIF clients sign the path bytes they
/// send, so case-folding here would break their signatures.
pub fn canonical_path(raw: &str) -> Result<String, SigningError> {
    let url = match Url::parse(raw) {
        Ok(url) if !url.cannot_be_a_base() => url,
        Ok(_) => return Err(SigningError::InvalidPath(raw.to_owned())),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(CANONICAL_BASE)
            .and_then(|base| base.join(raw))
            .map_err(|e| SigningError::InvalidPath(format!("{raw}: {e}")))?,
        Err(e) => return Err(SigningError::InvalidPath(format!("{raw}: {e}"))),
    };
    Ok(url.path().to_owned())
}

/// Whether a request's content type and digest are part of its signature.
pub fn carries_content(method: &Method, body: &[u8]) -> bool {
    (method == Method::POST || method == Method::PUT) && !body.is_empty()
}

fn join_lines(
    method: &str,
    path: &str,
    content_type: Option<&str>,
    content_digest: Option<&str>,
    proxied_user: &str,
) -> String {
    let mut lines = vec![method, path];
    lines.extend(content_type);
    lines.extend(content_digest);
    lines.push(proxied_user);
    lines.join("\n")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
