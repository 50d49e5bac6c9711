// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::require_admitted,
    models::{
        ChannelMessageRequest, DirectMessageRequest, ErrorResponse, MessageResponse, RoleRequest,
        SignedEnvelope,
    },
    state::AppState,
};

pub mod health;
pub mod interactions;
pub mod webhooks;

/// Build the HTTP app.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`: the
/// access gate reads the peer address from `ConnectInfo` and denies every
/// request when it is missing. `/interactions` sits outside the gate since
/// Discord is the caller and signs every request itself.
pub fn router(state: AppState) -> Router {
    let mut routes = Router::new()
        .route("/addrole", post(webhooks::add_role))
        .route("/removerole", post(webhooks::remove_role))
        .route("/sendmessage", post(webhooks::send_message))
        .route("/dmuser", post(webhooks::dm_user))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admitted,
        ));

    if state.interactions.is_some() {
        routes = routes.route("/interactions", post(interactions::handle_interaction));
    }

    routes.with_state(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        webhooks::add_role,
        webhooks::remove_role,
        webhooks::send_message,
        webhooks::dm_user,
        interactions::handle_interaction,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            SignedEnvelope,
            RoleRequest,
            ChannelMessageRequest,
            DirectMessageRequest,
            MessageResponse,
            ErrorResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Webhooks", description = "Signed operations on the Discord guild"),
        (name = "Discord", description = "Slash command interactions"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
