// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated webhook payloads.
//!
//! Put `VerifiedData` last in a handler's argument list. It consumes the
//! body, so nothing else may read it:
//!
//! ```rust,ignore
//! async fn add_role(
//!     State(state): State<AppState>,
//!     VerifiedData(data): VerifiedData,
//! ) -> Result<Json<MessageResponse>, ApiError> {
//!     // `data` is the signed JSON string, not yet decoded
//! }
//! ```

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};

use super::error::AuthError;
use super::middleware::remote_ip;
pub use super::pipeline::VerifiedData;
use crate::state::AppState;

impl FromRequest<AppState> for VerifiedData {
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let remote_ip = remote_ip(&mut parts, state).await?;

        // The gate runs before a single body byte is read.
        state.pipeline.admit(&remote_ip)?;

        let req = Request::from_parts(parts, body);
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| AuthError::EnvelopeMalformed)?;

        state.pipeline.authenticate(&remote_ip, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::{envelope, sign, signing_key, test_state};
    use crate::auth::AccessPolicy;
    use axum::{
        body::{to_bytes, Body},
        extract::connect_info::MockConnectInfo,
        http::{Request as HttpRequest, StatusCode},
        routing::post,
        Router,
    };
    use std::collections::HashSet;
    use std::net::SocketAddr;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn echo(VerifiedData(data): VerifiedData) -> String {
        data
    }

    fn app(state: AppState, peer: &str) -> Router {
        let addr: SocketAddr = format!("{peer}:40000").parse().unwrap();
        Router::new()
            .route("/echo", post(echo))
            .with_state(state)
            .layer(MockConnectInfo(addr))
    }

    async fn send(app: Router, body: String) -> (StatusCode, String) {
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/echo")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn extracts_signed_data_for_admitted_peer() {
        let dir = TempDir::new().unwrap();
        let (state, _) = test_state(&dir, AccessPolicy::LocalOnly);
        let data = format!(r#"{{"timestamp":{}}}"#, chrono::Utc::now().timestamp_millis());
        let body = envelope(&sign(&signing_key(1), &data), &data);

        let (status, echoed) = send(app(state, "127.0.0.1"), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(echoed, data);
    }

    #[tokio::test]
    async fn rejects_peer_outside_whitelist_with_forbidden() {
        let dir = TempDir::new().unwrap();
        let policy = AccessPolicy::Whitelist(HashSet::from(["10.0.0.5".to_string()]));
        let (state, _) = test_state(&dir, policy);

        let (status, body) = send(app(state, "10.0.0.6"), "{ broken".to_string()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, r#"{"error":"Forbidden"}"#);
    }

    #[tokio::test]
    async fn admitted_peer_with_bad_envelope_gets_400() {
        let dir = TempDir::new().unwrap();
        let (state, _) = test_state(&dir, AccessPolicy::Open);

        let (status, body) = send(app(state, "203.0.113.7"), "{ broken".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"error":"Invalid request body"}"#);
    }

    #[tokio::test]
    async fn missing_connect_info_is_denied() {
        let dir = TempDir::new().unwrap();
        let (state, _) = test_state(&dir, AccessPolicy::Open);
        let app = Router::new().route("/echo", post(echo)).with_state(state);

        let (status, _) = send(app, "{}".to_string()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
