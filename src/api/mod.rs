// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{auth::middleware::authenticate, state::AppState};

pub mod health;
pub mod identity;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/whoami", get(identity::whoami))
        .route("/me", get(identity::me))
        .route("/echo", post(identity::echo))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state);

    // Expose-Headers is written by the auth middleware after token rotation.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", v1_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
}
