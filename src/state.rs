// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::auth::Authenticator;
use crate::config::{AuthSettings, ConfigError};
use crate::remote::{OutboundSigning, RemoteAuthClient, RetryPolicy};
use crate::request::DEFAULT_MAX_BODY_BYTES;
use crate::signing::{AppKeyStore, GbifAuthService};

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    /// Body buffering limit for authenticated routes.
    pub max_body_bytes: usize,
    /// Cancelled on shutdown; identity service calls run under child tokens.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(authenticator: Authenticator) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Wire the key store, identity client and authenticator from settings.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, ConfigError> {
        let keys = match &settings.appkeys_file {
            Some(path) => AppKeyStore::from_file(path)?,
            None => {
                warn!("No app key file configured, GBIF signatures will be rejected");
                AppKeyStore::default()
            }
        };
        let gbif = GbifAuthService::new(Arc::new(keys));

        let mut remote = RemoteAuthClient::new(&settings.identity_url, settings.remote_timeout)?
            .with_retry_policy(RetryPolicy::new(
                settings.remote_max_attempts,
                settings.remote_backoff,
            ));

        match &settings.app_key {
            Some(app_key) => {
                if !gbif.key_store().contains(app_key) {
                    warn!(app_key = %app_key, "Own app key has no secret in the key file");
                }
                remote = remote.with_signing(OutboundSigning {
                    app_key: app_key.clone(),
                    service: gbif.clone(),
                    on_failure: settings.sign_failure_policy,
                });
            }
            None => warn!("No own app key configured, proxied GBIF users cannot be resolved"),
        }

        let mut authenticator = Authenticator::new(gbif, remote);
        if let Some(whitelist) = &settings.app_key_whitelist {
            authenticator = authenticator.with_app_key_whitelist(whitelist.iter().cloned());
        }

        info!(
            identity_url = %settings.identity_url,
            max_body_bytes = settings.max_body_bytes,
            "Authentication configured"
        );
        Ok(Self::new(authenticator).with_max_body_bytes(settings.max_body_bytes))
    }
}
