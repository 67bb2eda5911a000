// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! App key → secret lookup.
//!
//! The store is built once at startup and never mutated, so it is shared
//! behind an `Arc` and read concurrently without locks.
//!
//! ## File format
//!
//! ```text
//! # comment
//! app1=secret1
//! registry-ws = 3b2f...
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::SigningError;

/// Errors raised while loading an app key file.
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("failed to read app key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: expected `appKey=secret`")]
    MalformedLine { line: usize },

    #[error("line {line}: duplicate app key `{key}`")]
    DuplicateKey { line: usize, key: String },
}

/// Immutable registry of app keys and their HMAC secrets.
#[derive(Clone, Default)]
pub struct AppKeyStore {
    secrets: HashMap<String, String>,
}

impl AppKeyStore {
    /// Create a store from `(app_key, secret)` pairs.
    pub fn new<K, S>(entries: impl IntoIterator<Item = (K, S)>) -> Self
    where
        K: Into<String>,
        S: Into<String>,
    {
        Self {
            secrets: entries
                .into_iter()
                .map(|(key, secret)| (key.into(), secret.into()))
                .collect(),
        }
    }

    /// Load a store from a `key=secret` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KeyStoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| KeyStoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::parse(&contents)?;
        tracing::info!(
            path = %path.display(),
            app_keys = store.len(),
            "Loaded GBIF app keys"
        );
        Ok(store)
    }

    /// Parse `key=secret` lines. Blank lines and `#` comments are skipped.
    pub fn parse(contents: &str) -> Result<Self, KeyStoreError> {
        let mut secrets = HashMap::new();

        for (index, raw) in contents.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (key, secret) = trimmed
                .split_once('=')
                .map(|(k, s)| (k.trim(), s.trim()))
                .filter(|(k, s)| !k.is_empty() && !s.is_empty())
                .ok_or(KeyStoreError::MalformedLine { line })?;

            if secrets.insert(key.to_owned(), secret.to_owned()).is_some() {
                return Err(KeyStoreError::DuplicateKey {
                    line,
                    key: key.to_owned(),
                });
            }
        }

        Ok(Self { secrets })
    }

    /// Secret for `app_key`.
    pub fn secret(&self, app_key: &str) -> Result<&str, SigningError> {
        self.secrets
            .get(app_key)
            .map(String::as_str)
            .ok_or_else(|| SigningError::PrivateKeyNotFound(app_key.to_owned()))
    }

    pub fn contains(&self, app_key: &str) -> bool {
        self.secrets.contains_key(app_key)
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

// Secrets stay out of logs.
impl fmt::Debug for AppKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.secrets.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("AppKeyStore").field("app_keys", &keys).finish()
    }
}
