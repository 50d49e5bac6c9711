// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access gate as a route layer.
//!
//! Webhook handlers are gated again by [`VerifiedData`](super::VerifiedData);
//! this layer covers the routes that carry no signed body (health and API
//! docs), so a peer the policy rejects gets the same 403 everywhere.
//!
//! ```rust,ignore
//! let gated = Router::new()
//!     .route("/health", get(health))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_admitted));
//! ```

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::error;

use super::access::peer_ip;
use super::error::AuthError;
use crate::state::AppState;

/// Canonical peer IP from `ConnectInfo`. Missing connect info is a denial.
pub(crate) async fn remote_ip(parts: &mut Parts, state: &AppState) -> Result<String, AuthError> {
    let ConnectInfo(addr) = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
        .await
        .map_err(|_| {
            error!("Peer address unavailable; serve with connect info enabled");
            AuthError::AccessDenied
        })?;
    Ok(peer_ip(&addr))
}

/// Reject requests from peers outside the access policy.
pub async fn require_admitted(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = request.into_parts();
    let ip = remote_ip(&mut parts, &state).await?;
    state.pipeline.admit(&ip)?;

    Ok(next.run(Request::from_parts(parts, body)).await)
}
