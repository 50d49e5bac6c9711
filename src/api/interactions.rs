// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Discord HTTP interactions endpoint.
//!
//! This route sits outside the IP gate: Discord is the caller, and every
//! request is authenticated with Discord's own signature headers instead.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};

use crate::{
    auth::{KeyRotator, RotationError},
    discord::{
        commands::{SET_TOKEN_COMMAND, SHOP_COMMANDS, TOKEN_OPTION},
        interactions::{
            CommandData, Embed, Member, INTERACTION_APPLICATION_COMMAND, INTERACTION_PING,
            SIGNATURE_HEADER, TIMESTAMP_HEADER,
        },
        Interaction, InteractionResponse,
    },
    error::ApiError,
    state::AppState,
};

const SHOP_EMBED_COLOR: u32 = 0xFFFFFF;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Receive a slash command or ping from Discord.
#[utoipa::path(
    post,
    path = "/interactions",
    tag = "Discord",
    request_body(content = String, description = "Raw interaction JSON"),
    params(
        ("X-Signature-Ed25519" = String, Header, description = "Hex Ed25519 signature"),
        ("X-Signature-Timestamp" = String, Header, description = "Signed timestamp")
    ),
    responses(
        (status = 200, description = "Interaction response"),
        (status = 400, description = "Unparseable interaction"),
        (status = 401, description = "Invalid request signature")
    )
)]
pub async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InteractionResponse>, Response> {
    let Some(verifier) = state.interactions.as_ref() else {
        return Err(StatusCode::NOT_FOUND.into_response());
    };

    let signature = header(&headers, SIGNATURE_HEADER);
    let timestamp = header(&headers, TIMESTAMP_HEADER);
    let verified = match (signature, timestamp) {
        (Some(signature), Some(timestamp)) => verifier.verify(signature, timestamp, &body),
        _ => false,
    };
    if !verified {
        warn!("Rejecting interaction with invalid signature");
        return Err(
            ApiError::new(StatusCode::UNAUTHORIZED, "invalid request signature").into_response(),
        );
    }

    let interaction: Interaction = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Rejecting unparseable interaction");
        ApiError::bad_request("Invalid interaction").into_response()
    })?;

    match (interaction.kind, interaction.data) {
        (INTERACTION_PING, _) => Ok(Json(InteractionResponse::pong())),
        (INTERACTION_APPLICATION_COMMAND, Some(data)) => Ok(Json(
            run_command(&state, &data, interaction.member.as_ref()).await,
        )),
        (kind, _) => {
            warn!(kind, "Unsupported interaction type");
            Err(ApiError::bad_request("Unsupported interaction type").into_response())
        }
    }
}

async fn run_command(
    state: &AppState,
    data: &CommandData,
    member: Option<&Member>,
) -> InteractionResponse {
    let name = data.name.as_str();

    if SHOP_COMMANDS.contains(&name) {
        return InteractionResponse::embed(Embed {
            description: format!("Here's the shop link: {}", state.shop_link),
            color: SHOP_EMBED_COLOR,
        });
    }

    if name == SET_TOKEN_COMMAND {
        return set_token(Arc::clone(&state.rotator), data, member).await;
    }

    warn!(command = name, "Unknown slash command");
    InteractionResponse::ephemeral("Unknown command.")
}

async fn set_token(
    rotator: Arc<KeyRotator>,
    data: &CommandData,
    member: Option<&Member>,
) -> InteractionResponse {
    let Some(member) = member else {
        return InteractionResponse::ephemeral("Error: Member data not found.");
    };
    let user_id = member.user_id().unwrap_or("unknown").to_string();

    if !member.is_admin() {
        warn!(user_id = %user_id, "Non-administrator attempted /settoken");
        return InteractionResponse::ephemeral(RotationError::Unauthorized.reply());
    }

    let token = data
        .string_option(TOKEN_OPTION)
        .unwrap_or_default()
        .to_string();
    if token.trim().is_empty() {
        return InteractionResponse::ephemeral(RotationError::MissingInput.reply());
    }

    let outcome = tokio::task::spawn_blocking(move || rotator.rotate(&token, true)).await;

    match outcome {
        Ok(Ok(())) => {
            info!(user_id = %user_id, "Verification key rotated via /settoken");
            InteractionResponse::ephemeral("Token set successfully.")
        }
        Ok(Err(e)) => {
            warn!(user_id = %user_id, error = %e, "Key rotation failed");
            InteractionResponse::ephemeral(e.reply())
        }
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Key rotation task failed");
            InteractionResponse::ephemeral("Error saving token: rotation task failed")
        }
    }
}
