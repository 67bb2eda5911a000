// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Replayable request wrapper.
//!
//! Signature validation hashes the body and the handler parses it, so the
//! body is buffered once up front. Buffering is bounded by a byte limit:
//! this wrapper is meant for ordinary REST payloads, not uploads.

use axum::{
    body::{Body, Bytes},
    extract::{OriginalUri, Request},
    http::{
        header::{CONTENT_LENGTH, InvalidHeaderValue},
        request::Parts,
        Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri,
    },
};
use http_body_util::{BodyExt, LengthLimitError, Limited};

/// Default body buffering limit (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Errors raised while buffering a request body.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("request body could not be read: {0}")]
    Unreadable(String),
}

/// A request whose body can be read any number of times and whose headers
/// may be rewritten before it reaches the handler.
#[derive(Debug)]
pub struct ReplayableRequest {
    parts: Parts,
    body: Bytes,
}

impl ReplayableRequest {
    /// Buffer the body of `request`, rejecting bodies over `limit` bytes.
    pub async fn buffer(request: Request, limit: usize) -> Result<Self, BufferError> {
        let (parts, body) = request.into_parts();

        let declared = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok());
        if declared.is_some_and(|length| length > limit) {
            return Err(BufferError::TooLarge { limit });
        }

        let collected = Limited::new(body, limit).collect().await.map_err(|e| {
            if e.is::<LengthLimitError>() {
                BufferError::TooLarge { limit }
            } else {
                BufferError::Unreadable(e.to_string())
            }
        })?;

        Ok(Self::from_parts(parts, collected.to_bytes()))
    }

    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self { parts, body }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Request target as received: path plus query, without scheme or host.
    ///
    /// Inside nested routers this is the target before the nest prefix was
    /// stripped, so signatures cover the path the client actually called.
    pub fn request_target(&self) -> &str {
        let uri = self
            .parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&self.parts.uri, |original| &original.0);
        uri.path_and_query().map_or("/", |target| target.as_str())
    }

    /// Buffered body; every call returns the same bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Mutable header view. Changes are seen by every later consumer.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    /// Header value as a string, if present and visible ASCII.
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.parts
            .headers
            .get(name.as_ref())
            .and_then(|value| value.to_str().ok())
    }

    /// Replace a header value.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<(), InvalidHeaderValue> {
        let value = HeaderValue::from_str(value)?;
        self.parts.headers.insert(name, value);
        Ok(())
    }

    /// Copy query parameter `param` into header `header`, if the parameter is
    /// present and non-empty. Returns whether the header was overridden.
    pub fn override_header_from_query(&mut self, param: &str, header: HeaderName) -> bool {
        let Some(query) = self.parts.uri.query() else {
            return false;
        };
        let value = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, value)| key == param && !value.is_empty())
            .map(|(_, value)| value.into_owned());

        match value {
            Some(value) => self.set_header(header, &value).is_ok(),
            None => false,
        }
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// Rebuild a request for the downstream handler from the buffered body.
    pub fn into_request(self) -> Request {
        Request::from_parts(self.parts, Body::from(self.body))
    }
}
