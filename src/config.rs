// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `GBIF_APPKEYS_FILE` | `key=secret` file with trusted app keys | Empty store |
//! | `GBIF_IDENTITY_URL` | Identity service base URL | Required |
//! | `GBIF_APP_KEY` | This service's own app key for signing identity calls | None |
//! | `GBIF_APP_KEY_WHITELIST` | Comma-separated keys allowed to identify as apps | All keys |
//! | `GBIF_SIGN_FAILURE_POLICY` | `fail` or `send-unsigned` | `fail` |
//! | `GBIF_MAX_BODY_BYTES` | Request body buffering limit | `10485760` |
//! | `GBIF_REMOTE_MAX_ATTEMPTS` | Attempts per identity service call | `5` |
//! | `GBIF_REMOTE_BACKOFF_MS` | Wait between attempts | `300` |
//! | `GBIF_REMOTE_TIMEOUT_SECS` | Per-attempt HTTP timeout | `10` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::remote::{client::DEFAULT_TIMEOUT, retry, RemoteAuthError};
use crate::request::DEFAULT_MAX_BODY_BYTES;
use crate::signing::{KeyStoreError, SignFailurePolicy};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Path of the app key file.
///
/// One `key=secret` pair per line; blank lines and `#` comments are ignored.
pub const APPKEYS_FILE_ENV: &str = "GBIF_APPKEYS_FILE";

/// Base URL of the identity service, e.g. `https://api.gbif.org/v1/`.
pub const IDENTITY_URL_ENV: &str = "GBIF_IDENTITY_URL";

/// App key this service signs `user/auth/app` calls with. Its secret must be
/// in the app key file.
pub const APP_KEY_ENV: &str = "GBIF_APP_KEY";

pub const APP_KEY_WHITELIST_ENV: &str = "GBIF_APP_KEY_WHITELIST";
pub const SIGN_FAILURE_POLICY_ENV: &str = "GBIF_SIGN_FAILURE_POLICY";
pub const MAX_BODY_BYTES_ENV: &str = "GBIF_MAX_BODY_BYTES";
pub const REMOTE_MAX_ATTEMPTS_ENV: &str = "GBIF_REMOTE_MAX_ATTEMPTS";
pub const REMOTE_BACKOFF_MS_ENV: &str = "GBIF_REMOTE_BACKOFF_MS";
pub const REMOTE_TIMEOUT_SECS_ENV: &str = "GBIF_REMOTE_TIMEOUT_SECS";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Configuration and startup errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),

    #[error("invalid value `{value}` for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    IdentityClient(#[from] RemoteAuthError),
}

/// Typed settings for the authentication layer and its host server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub host: String,
    pub port: u16,
    pub appkeys_file: Option<PathBuf>,
    pub identity_url: String,
    pub app_key: Option<String>,
    pub app_key_whitelist: Option<Vec<String>>,
    pub sign_failure_policy: SignFailurePolicy,
    pub max_body_bytes: usize,
    pub remote_max_attempts: u32,
    pub remote_backoff: Duration,
    pub remote_timeout: Duration,
}

impl AuthSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let identity_url = get(IDENTITY_URL_ENV).ok_or(ConfigError::Missing(IDENTITY_URL_ENV))?;

        let sign_failure_policy = match get(SIGN_FAILURE_POLICY_ENV).as_deref() {
            None | Some("fail") => SignFailurePolicy::Fail,
            Some("send-unsigned") => SignFailurePolicy::SendUnsigned,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: SIGN_FAILURE_POLICY_ENV,
                    value: other.to_owned(),
                    reason: "expected `fail` or `send-unsigned`".into(),
                })
            }
        };

        let app_key_whitelist = get(APP_KEY_WHITELIST_ENV).map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_owned)
                .collect()
        });

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?,
            appkeys_file: get(APPKEYS_FILE_ENV).map(PathBuf::from),
            identity_url,
            app_key: get(APP_KEY_ENV),
            app_key_whitelist,
            sign_failure_policy,
            max_body_bytes: parse_or(get(MAX_BODY_BYTES_ENV), MAX_BODY_BYTES_ENV, DEFAULT_MAX_BODY_BYTES)?,
            remote_max_attempts: parse_or(
                get(REMOTE_MAX_ATTEMPTS_ENV),
                REMOTE_MAX_ATTEMPTS_ENV,
                retry::DEFAULT_MAX_ATTEMPTS,
            )?,
            remote_backoff: Duration::from_millis(parse_or(
                get(REMOTE_BACKOFF_MS_ENV),
                REMOTE_BACKOFF_MS_ENV,
                retry::DEFAULT_BACKOFF.as_millis() as u64,
            )?),
            remote_timeout: Duration::from_secs(parse_or(
                get(REMOTE_TIMEOUT_SECS_ENV),
                REMOTE_TIMEOUT_SECS_ENV,
                DEFAULT_TIMEOUT.as_secs(),
            )?),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(value) => match value.parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        },
    }
}
