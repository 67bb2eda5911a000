// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process stand-in for the GBIF identity service, for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::Engine;
use serde_json::json;
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::signing::{AppKeyStore, GbifAuthService, GbifCredentials, HEADER_GBIF_USER};

type Account = (String, Vec<String>);

#[derive(Default)]
pub(crate) struct MockIdentityBuilder {
    basic: HashMap<(String, String), Account>,
    tokens: HashMap<String, Account>,
    app_users: HashMap<String, Vec<String>>,
    apps: Vec<(String, String)>,
    failing_first: u32,
    fixed: Option<(StatusCode, &'static str)>,
}

fn roles(roles: &[&str]) -> Vec<String> {
    roles.iter().map(|r| (*r).to_owned()).collect()
}

impl MockIdentityBuilder {
    pub(crate) fn basic_user(mut self, name: &str, password: &str, user_roles: &[&str]) -> Self {
        self.basic.insert(
            (name.to_owned(), password.to_owned()),
            (name.to_owned(), roles(user_roles)),
        );
        self
    }

    pub(crate) fn bearer_token(mut self, token: &str, name: &str, user_roles: &[&str]) -> Self {
        self.tokens
            .insert(token.to_owned(), (name.to_owned(), roles(user_roles)));
        self
    }

    /// User resolvable through `user/auth/app`.
    pub(crate) fn app_user(mut self, name: &str, user_roles: &[&str]) -> Self {
        self.app_users.insert(name.to_owned(), roles(user_roles));
        self
    }

    /// App key allowed to call `user/auth/app`.
    pub(crate) fn trusted_app(mut self, key: &str, secret: &str) -> Self {
        self.apps.push((key.to_owned(), secret.to_owned()));
        self
    }

    /// Answer the first `n` calls with 503.
    pub(crate) fn failing_first(mut self, n: u32) -> Self {
        self.failing_first = n;
        self
    }

    /// Answer every call with `status` and a raw `body`.
    pub(crate) fn fixed_response(mut self, status: StatusCode, body: &'static str) -> Self {
        self.fixed = Some((status, body));
        self
    }

    pub(crate) async fn spawn(self) -> MockIdentityService {
        let state = Arc::new(MockState {
            basic: self.basic,
            tokens: Mutex::new(self.tokens),
            app_users: self.app_users,
            signatures: GbifAuthService::new(Arc::new(AppKeyStore::new(self.apps))),
            failures_left: AtomicU32::new(self.failing_first),
            fixed: self.fixed,
            hits: AtomicU32::new(0),
        });

        let router = Router::new()
            .route("/user/auth/basic", post(basic))
            .route("/user/auth/jwt", post(jwt))
            .route("/user/auth/app", post(app))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        MockIdentityService {
            base_url: format!("http://{addr}/"),
            state,
        }
    }
}

pub(crate) struct MockIdentityService {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockIdentityService {
    pub(crate) fn builder() -> MockIdentityBuilder {
        MockIdentityBuilder::default()
    }

    /// Requests received so far, failed ones included.
    pub(crate) fn hits(&self) -> u32 {
        self.state.hits.load(Ordering::SeqCst)
    }
}

/// Base URL nothing is listening on.
pub(crate) async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

struct MockState {
    basic: HashMap<(String, String), Account>,
    tokens: Mutex<HashMap<String, Account>>,
    app_users: HashMap<String, Vec<String>>,
    signatures: GbifAuthService,
    failures_left: AtomicU32,
    fixed: Option<(StatusCode, &'static str)>,
    hits: AtomicU32,
}

impl MockState {
    /// Count the hit and return the canned response, if this call gets one.
    fn intercept(&self) -> Option<Response> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Some(StatusCode::SERVICE_UNAVAILABLE.into_response());
        }
        self.fixed.map(|(status, body)| {
            (status, [("content-type", "application/json")], body).into_response()
        })
    }
}

fn user_json(name: &str, roles: &[String]) -> Json<serde_json::Value> {
    Json(json!({ "userName": name, "roles": roles }))
}

fn credentials<'a>(headers: &'a HeaderMap, scheme: &str) -> Option<&'a str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(scheme)
}

async fn basic(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Some(response) = state.intercept() {
        return response;
    }

    let decoded = credentials(&headers, "Basic ")
        .and_then(|b64| base64::engine::general_purpose::STANDARD.decode(b64).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok());
    let Some((user, password)) = decoded.as_deref().and_then(|s| s.split_once(':')) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match state.basic.get(&(user.to_owned(), password.to_owned())) {
        Some((name, roles)) => user_json(name, roles).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn jwt(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Some(response) = state.intercept() {
        return response;
    }

    let Some(token) = credentials(&headers, "Bearer ") else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let mut tokens = state.tokens.lock().unwrap();
    let Some(account) = tokens.get(token).cloned() else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let rotated = Uuid::new_v4().to_string();
    tokens.insert(rotated.clone(), account.clone());

    let mut response = user_json(&account.0, &account.1).into_response();
    response
        .headers_mut()
        .insert("token", HeaderValue::from_str(&rotated).unwrap());
    response
}

async fn app(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(response) = state.intercept() {
        return response;
    }

    let Some(credentials) = credentials(&headers, "GBIF ")
        .and_then(|value| GbifCredentials::parse(value).ok())
    else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let target = uri.path_and_query().map_or("/", |t| t.as_str());
    if state
        .signatures
        .validate(&credentials, &method, target, &headers, &body)
        .is_err()
    {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let user = headers
        .get(HEADER_GBIF_USER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    match state.app_users.get(user) {
        Some(roles) => user_json(user, roles).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}
