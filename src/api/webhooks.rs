// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed webhook handlers.
//!
//! Each handler receives the already-verified `data` string and decodes it
//! into its own payload type. Discord failures are logged in full and
//! reported to the caller as a bare 500.

use axum::{extract::State, Json};
use tracing::{error, info, warn};

use crate::{
    auth::VerifiedData,
    error::ApiError,
    models::{
        ChannelMessageRequest, DirectMessageRequest, ErrorResponse, MessageResponse, RoleRequest,
        SignedEnvelope, WebhookPayload,
    },
    state::AppState,
};

fn decode<T: WebhookPayload>(route: &'static str, data: &str) -> Result<T, ApiError> {
    T::decode(data).map_err(|reason| {
        warn!(route, reason, "Rejecting webhook with invalid data");
        ApiError::invalid_data()
    })
}

/// Grant a guild role to a member.
#[utoipa::path(
    post,
    path = "/addrole",
    tag = "Webhooks",
    request_body(
        content = SignedEnvelope,
        description = "`data` decodes to RoleRequest plus timestamp"
    ),
    responses(
        (status = 200, description = "Role added", body = MessageResponse),
        (status = 400, description = "Malformed envelope or data", body = ErrorResponse),
        (status = 403, description = "Caller or signature rejected", body = ErrorResponse),
        (status = 500, description = "Discord rejected the operation", body = ErrorResponse)
    )
)]
pub async fn add_role(
    State(state): State<AppState>,
    VerifiedData(data): VerifiedData,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: RoleRequest = decode("/addrole", &data)?;

    state
        .platform
        .add_role(&request.user_id, &request.role_id)
        .await
        .map_err(|e| {
            error!(
                user_id = %request.user_id,
                role_id = %request.role_id,
                error = %e,
                "Failed to add role"
            );
            ApiError::internal("Failed to add role")
        })?;

    info!(user_id = %request.user_id, role_id = %request.role_id, "Role added");
    Ok(Json(MessageResponse::new("Role added successfully")))
}

/// Remove a guild role from a member.
#[utoipa::path(
    post,
    path = "/removerole",
    tag = "Webhooks",
    request_body(
        content = SignedEnvelope,
        description = "`data` decodes to RoleRequest plus timestamp"
    ),
    responses(
        (status = 200, description = "Role removed", body = MessageResponse),
        (status = 400, description = "Malformed envelope or data", body = ErrorResponse),
        (status = 403, description = "Caller or signature rejected", body = ErrorResponse),
        (status = 500, description = "Discord rejected the operation", body = ErrorResponse)
    )
)]
pub async fn remove_role(
    State(state): State<AppState>,
    VerifiedData(data): VerifiedData,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: RoleRequest = decode("/removerole", &data)?;

    state
        .platform
        .remove_role(&request.user_id, &request.role_id)
        .await
        .map_err(|e| {
            error!(
                user_id = %request.user_id,
                role_id = %request.role_id,
                error = %e,
                "Failed to remove role"
            );
            ApiError::internal("Failed to remove role")
        })?;

    info!(user_id = %request.user_id, role_id = %request.role_id, "Role removed");
    Ok(Json(MessageResponse::new("Role removed successfully")))
}

/// Post a message to a channel.
#[utoipa::path(
    post,
    path = "/sendmessage",
    tag = "Webhooks",
    request_body(
        content = SignedEnvelope,
        description = "`data` decodes to ChannelMessageRequest plus timestamp"
    ),
    responses(
        (status = 200, description = "Message sent", body = MessageResponse),
        (status = 400, description = "Malformed envelope or data", body = ErrorResponse),
        (status = 403, description = "Caller or signature rejected", body = ErrorResponse),
        (status = 500, description = "Discord rejected the operation", body = ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    VerifiedData(data): VerifiedData,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: ChannelMessageRequest = decode("/sendmessage", &data)?;

    state
        .platform
        .send_channel_message(&request.channel_id, &request.message)
        .await
        .map_err(|e| {
            error!(channel_id = %request.channel_id, error = %e, "Failed to send message");
            ApiError::internal("Failed to send message")
        })?;

    info!(channel_id = %request.channel_id, "Channel message sent");
    Ok(Json(MessageResponse::new("Message sent successfully")))
}

/// Send a direct message to a user.
#[utoipa::path(
    post,
    path = "/dmuser",
    tag = "Webhooks",
    request_body(
        content = SignedEnvelope,
        description = "`data` decodes to DirectMessageRequest plus timestamp"
    ),
    responses(
        (status = 200, description = "Message sent", body = MessageResponse),
        (status = 400, description = "Malformed envelope or data", body = ErrorResponse),
        (status = 403, description = "Caller or signature rejected", body = ErrorResponse),
        (status = 500, description = "Discord rejected the operation", body = ErrorResponse)
    )
)]
pub async fn dm_user(
    State(state): State<AppState>,
    VerifiedData(data): VerifiedData,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: DirectMessageRequest = decode("/dmuser", &data)?;

    state
        .platform
        .send_direct_message(&request.user_id, &request.message)
        .await
        .map_err(|e| {
            error!(user_id = %request.user_id, error = %e, "Failed to send direct message");
            ApiError::internal("Failed to send direct message")
        })?;

    info!(user_id = %request.user_id, "Direct message sent");
    Ok(Json(MessageResponse::new("Message sent successfully")))
}
