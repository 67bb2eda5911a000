// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the GBIF identity service.

use std::collections::BTreeSet;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode};
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use url::Url;

use super::retry::{with_retry, RetryPolicy};
use super::RemoteAuthError;
use crate::auth::Principal;
use crate::signing::{GbifAuthService, SignFailurePolicy, HEADER_GBIF_USER};

pub const BASIC_AUTH_PATH: &str = "user/auth/basic";
pub const JWT_AUTH_PATH: &str = "user/auth/jwt";
pub const APP_AUTH_PATH: &str = "user/auth/app";

/// Response header carrying a freshly minted bearer token.
pub const TOKEN_HEADER: &str = "token";

/// Default per-attempt HTTP timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// User payload returned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub user_name: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl RemoteUser {
    pub fn into_principal(self) -> Principal {
        Principal::user(self.user_name, self.roles)
    }
}

/// Successful identity service response.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub user: RemoteUser,
    /// Rotated bearer token, when the service issued one.
    pub token: Option<String>,
}

/// How this service signs its own calls to the identity service.
#[derive(Debug, Clone)]
pub struct OutboundSigning {
    pub app_key: String,
    pub service: GbifAuthService,
    pub on_failure: SignFailurePolicy,
}

/// Identity service client with bounded retry.
#[derive(Debug, Clone)]
pub struct RemoteAuthClient {
    base_url: Url,
    http: Client,
    retry: RetryPolicy,
    signing: Option<OutboundSigning>,
}

impl RemoteAuthClient {
    /// Create a client for the identity service rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteAuthError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| RemoteAuthError::Configuration(format!("invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteAuthError::Configuration(format!(
                "base URL cannot have paths: {base_url}"
            )));
        }
        // Without a trailing slash `join` would replace the last segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteAuthError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http,
            retry: RetryPolicy::default(),
            signing: None,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_signing(mut self, signing: OutboundSigning) -> Self {
        self.signing = Some(signing);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Forward a `Basic` authorization header.
    pub async fn authenticate_basic(
        &self,
        authorization: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteUser, RemoteAuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header_value(authorization)?);
        let response = self
            .remote_authenticate(BASIC_AUTH_PATH, headers, cancel)
            .await?;
        Ok(response.user)
    }

    /// Exchange a bearer token for the user and a rotated token.
    pub async fn authenticate_jwt(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteResponse, RemoteAuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
        self.remote_authenticate(JWT_AUTH_PATH, headers, cancel)
            .await
    }

    /// Resolve the user an application acts for.
    pub async fn authenticate_app_user(
        &self,
        user_name: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteUser, RemoteAuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_GBIF_USER, header_value(user_name)?);
        let response = self
            .remote_authenticate(APP_AUTH_PATH, headers, cancel)
            .await?;
        Ok(response.user)
    }

    /// POST `headers` to `path` under the base URL, with retry.
    pub async fn remote_authenticate(
        &self,
        path: &str,
        headers: HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<RemoteResponse, RemoteAuthError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| RemoteAuthError::Configuration(format!("invalid endpoint {path}: {e}")))?;

        let result = with_retry(&self.retry, cancel, path, || {
            self.attempt(url.clone(), headers.clone())
        })
        .await;

        match &result {
            Ok(response) => debug!(
                endpoint = path,
                user = %response.user.user_name,
                "Identity service authenticated user"
            ),
            Err(RemoteAuthError::Rejected(status)) => warn!(
                endpoint = path,
                status = %status,
                "Identity service rejected credentials"
            ),
            Err(e) => error!(
                endpoint = path,
                error = %e,
                "Identity service unavailable"
            ),
        }
        result
    }

    async fn attempt(&self, url: Url, headers: HeaderMap) -> Result<RemoteResponse, RemoteAuthError> {
        let proxied_user = headers
            .get(HEADER_GBIF_USER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let mut request = self
            .http
            .post(url)
            .headers(headers)
            .build()
            .map_err(|e| RemoteAuthError::Configuration(e.to_string()))?;

        if let Some(user) = proxied_user {
            self.sign(&user, &mut request)?;
        }

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| RemoteAuthError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteAuthError::Rejected(status),
                s if s.is_server_error() => RemoteAuthError::ServerError(s),
                s => RemoteAuthError::UnexpectedStatus(s),
            });
        }

        let token = response
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_owned);

        let user = response
            .json::<RemoteUser>()
            .await
            .map_err(|e| RemoteAuthError::InvalidResponse(e.to_string()))?;

        Ok(RemoteResponse { user, token })
    }

    fn sign(&self, proxied_user: &str, request: &mut reqwest::Request) -> Result<(), RemoteAuthError> {
        let Some(signing) = &self.signing else {
            return Err(RemoteAuthError::Configuration(
                "no app key configured for signing identity service calls".into(),
            ));
        };

        match signing
            .service
            .sign_reqwest(&signing.app_key, proxied_user, request)
        {
            Ok(()) => Ok(()),
            Err(e) if signing.on_failure == SignFailurePolicy::SendUnsigned => {
                warn!(
                    app_key = %signing.app_key,
                    error = %e,
                    "Sending identity service request unsigned"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Forwarded values must be visible ASCII; the signer reads them back as text.
fn header_value(value: &str) -> Result<HeaderValue, RemoteAuthError> {
    HeaderValue::from_str(value)
        .ok()
        .filter(|header| header.to_str().is_ok())
        .ok_or_else(|| RemoteAuthError::InvalidCredentials("not a valid header value".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auth::AuthError;
    use crate::remote::mock::{unreachable_base_url, MockIdentityService};
    use crate::signing::AppKeyStore;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_millis(1))
    }

    fn client(base_url: &str) -> RemoteAuthClient {
        RemoteAuthClient::new(base_url, Duration::from_secs(2))
            .unwrap()
            .with_retry_policy(fast_retry())
    }

    fn signing(keys: &[(&str, &str)], app_key: &str, on_failure: SignFailurePolicy) -> OutboundSigning {
        OutboundSigning {
            app_key: app_key.to_owned(),
            service: GbifAuthService::new(Arc::new(AppKeyStore::new(keys.iter().copied()))),
            on_failure,
        }
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = RemoteAuthClient::new("http://registry.gbif.org/v1", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url().as_str(), "http://registry.gbif.org/v1/");
        assert_eq!(
            client.base_url().join(BASIC_AUTH_PATH).unwrap().as_str(),
            "http://registry.gbif.org/v1/user/auth/basic"
        );
    }

    #[test]
    fn invalid_base_url_is_a_configuration_error() {
        let err = RemoteAuthClient::new("not a url", DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, RemoteAuthError::Configuration(_)));
    }

    #[test]
    fn remote_user_parses_camel_case_payload() {
        let user: RemoteUser = serde_json::from_str(
            r#"{"userName":"heinz","roles":["USER","REGISTRY_ADMIN"],"email":"heinz@gbif.org","firstName":"Heinz"}"#,
        )
        .unwrap();
        assert_eq!(user.user_name, "heinz");
        assert!(user.roles.contains("REGISTRY_ADMIN"));
        assert_eq!(user.first_name.as_deref(), Some("Heinz"));
        assert!(user.last_name.is_none());
    }

    #[tokio::test]
    async fn basic_credentials_are_forwarded() {
        let mock = MockIdentityService::builder()
            .basic_user("heinz", "HEINZ", &["USER"])
            .spawn()
            .await;

        let user = client(&mock.base_url)
            .authenticate_basic("Basic aGVpbno6SEVJTlo=", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(user.user_name, "heinz");
        assert_eq!(user.roles, BTreeSet::from(["USER".to_owned()]));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_without_retry() {
        let mock = MockIdentityService::builder()
            .basic_user("heinz", "HEINZ", &["USER"])
            .spawn()
            .await;

        // heinz:wrong
        let err = client(&mock.base_url)
            .authenticate_basic("Basic aGVpbno6d3Jvbmc=", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteAuthError::Rejected(StatusCode::UNAUTHORIZED)));
        assert_eq!(mock.hits(), 1);
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let mock = MockIdentityService::builder()
            .basic_user("heinz", "HEINZ", &["USER"])
            .failing_first(2)
            .spawn()
            .await;

        let user = client(&mock.base_url)
            .authenticate_basic("Basic aGVpbno6SEVJTlo=", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(user.user_name, "heinz");
        assert_eq!(mock.hits(), 3);
    }

    #[tokio::test]
    async fn unreachable_service_exhausts_retries() {
        let base_url = unreachable_base_url().await;
        let err = client(&base_url)
            .authenticate_basic("Basic aGVpbno6SEVJTlo=", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteAuthError::Exhausted { attempts: 5, .. }));
    }

    #[tokio::test]
    async fn jwt_exchange_returns_rotated_token() {
        let mock = MockIdentityService::builder()
            .bearer_token("token-1", "heinz", &["USER"])
            .spawn()
            .await;

        let response = client(&mock.base_url)
            .authenticate_jwt("token-1", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.user.user_name, "heinz");
        let rotated = response.token.expect("rotated token");
        assert_ne!(rotated, "token-1");
    }

    #[tokio::test]
    async fn app_user_lookup_is_signed() {
        let mock = MockIdentityService::builder()
            .trusted_app("registry-ws", "registry-secret")
            .app_user("jane", &["USER", "REGISTRY_EDITOR"])
            .spawn()
            .await;

        let client = client(&mock.base_url).with_signing(signing(
            &[("registry-ws", "registry-secret")],
            "registry-ws",
            SignFailurePolicy::Fail,
        ));
        let user = client
            .authenticate_app_user("jane", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(user.user_name, "jane");
        assert!(user.roles.contains("REGISTRY_EDITOR"));
    }

    #[tokio::test]
    async fn unknown_own_key_fails_by_default() {
        let mock = MockIdentityService::builder()
            .trusted_app("registry-ws", "registry-secret")
            .app_user("jane", &["USER"])
            .spawn()
            .await;

        let client = client(&mock.base_url).with_signing(signing(
            &[],
            "registry-ws",
            SignFailurePolicy::Fail,
        ));
        let err = client
            .authenticate_app_user("jane", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteAuthError::Signing(_)));
        assert_eq!(mock.hits(), 0);
    }

    #[tokio::test]
    async fn unknown_own_key_can_send_unsigned() {
        let mock = MockIdentityService::builder()
            .trusted_app("registry-ws", "registry-secret")
            .app_user("jane", &["USER"])
            .spawn()
            .await;

        let client = client(&mock.base_url).with_signing(signing(
            &[],
            "registry-ws",
            SignFailurePolicy::SendUnsigned,
        ));
        let err = client
            .authenticate_app_user("jane", &CancellationToken::new())
            .await
            .unwrap_err();
        // The call goes out unsigned and the identity service refuses it.
        assert!(matches!(err, RemoteAuthError::Rejected(StatusCode::UNAUTHORIZED)));
        assert_eq!(mock.hits(), 1);
    }

    #[tokio::test]
    async fn app_user_lookup_without_signing_is_misconfigured() {
        let mock = MockIdentityService::builder().spawn().await;
        let err = client(&mock.base_url)
            .authenticate_app_user("jane", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteAuthError::Configuration(_)));
    }

    #[tokio::test]
    async fn forbidden_is_rejected_without_retry() {
        let mock = MockIdentityService::builder()
            .fixed_response(StatusCode::FORBIDDEN, "")
            .spawn()
            .await;

        let err = client(&mock.base_url)
            .authenticate_basic("Basic aGVpbno6SEVJTlo=", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteAuthError::Rejected(StatusCode::FORBIDDEN)));
        assert_eq!(mock.hits(), 1);
        assert!(matches!(AuthError::from(err), AuthError::RemoteAuthRejected));
    }

    #[tokio::test]
    async fn other_client_errors_are_final_and_unavailable() {
        for status in [StatusCode::NOT_FOUND, StatusCode::BAD_REQUEST] {
            let mock = MockIdentityService::builder()
                .fixed_response(status, "")
                .spawn()
                .await;

            let err = client(&mock.base_url)
                .authenticate_jwt("token-1", &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, RemoteAuthError::UnexpectedStatus(s) if s == status));
            assert_eq!(mock.hits(), 1, "{status}");
            assert!(matches!(AuthError::from(err), AuthError::RemoteAuthUnavailable));
        }
    }

    #[tokio::test]
    async fn undecodable_body_is_final_and_unavailable() {
        let mock = MockIdentityService::builder()
            .fixed_response(StatusCode::OK, "{\"user\":")
            .spawn()
            .await;

        let err = client(&mock.base_url)
            .authenticate_basic("Basic aGVpbno6SEVJTlo=", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteAuthError::InvalidResponse(_)));
        assert_eq!(mock.hits(), 1);
        assert!(matches!(AuthError::from(err), AuthError::RemoteAuthUnavailable));
    }

    #[tokio::test]
    async fn non_ascii_app_user_is_not_forwarded() {
        let mock = MockIdentityService::builder()
            .trusted_app("registry-ws", "registry-secret")
            .spawn()
            .await;

        let client = client(&mock.base_url).with_signing(signing(
            &[("registry-ws", "registry-secret")],
            "registry-ws",
            SignFailurePolicy::SendUnsigned,
        ));
        let err = client
            .authenticate_app_user("jürgen", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteAuthError::InvalidCredentials(_)));
        assert_eq!(mock.hits(), 0);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_call() {
        let base_url = unreachable_base_url().await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client(&base_url)
            .authenticate_basic("Basic aGVpbno6SEVJTlo=", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteAuthError::Cancelled));
    }
}
