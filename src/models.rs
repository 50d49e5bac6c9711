// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the webhook API.
//!
//! Every webhook call carries a [`SignedEnvelope`]. Its `data` field is a
//! JSON *string*; the signature covers those exact bytes. Once the request
//! pipeline accepts the envelope, the handler decodes `data` into one of
//! the operation payloads below.
//!
//! ## Payload Categories
//!
//! - **Roles**: [`RoleRequest`] for `/addrole` and `/removerole`
//! - **Messages**: [`ChannelMessageRequest`] and [`DirectMessageRequest`]

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Envelope
// =============================================================================

/// Outer body of every webhook request.
#[derive(Debug, Clone, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// Base64 Ed25519 signature over the raw bytes of `data`.
    /// May be omitted when signing is disabled.
    #[serde(default)]
    pub signature: Option<String>,
    /// JSON-encoded operation payload, including a millisecond `timestamp`.
    #[schema(example = r#"{"timestamp":1700000000000,"userID":"123","roleID":"456"}"#)]
    pub data: String,
}

// =============================================================================
// Operation Payloads
// =============================================================================

/// Operation payload carried in `data`.
pub trait WebhookPayload: DeserializeOwned {
    /// Reject payloads with empty identifiers or content.
    fn validate(&self) -> Result<(), &'static str>;

    /// Decode and validate the signed `data` string.
    fn decode(data: &str) -> Result<Self, &'static str> {
        let payload: Self = serde_json::from_str(data).map_err(|_| "undecodable payload")?;
        payload.validate()?;
        Ok(payload)
    }
}

fn require(value: &str, what: &'static str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        Err(what)
    } else {
        Ok(())
    }
}

/// Body of `/addrole` and `/removerole`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RoleRequest {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "roleID")]
    pub role_id: String,
}

impl WebhookPayload for RoleRequest {
    fn validate(&self) -> Result<(), &'static str> {
        require(&self.user_id, "empty userID")?;
        require(&self.role_id, "empty roleID")
    }
}

/// Body of `/sendmessage`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ChannelMessageRequest {
    #[serde(rename = "channelID")]
    pub channel_id: String,
    pub message: String,
}

impl WebhookPayload for ChannelMessageRequest {
    fn validate(&self) -> Result<(), &'static str> {
        require(&self.channel_id, "empty channelID")?;
        require(&self.message, "empty message")
    }
}

/// Body of `/dmuser`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DirectMessageRequest {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub message: String,
}

impl WebhookPayload for DirectMessageRequest {
    fn validate(&self) -> Result<(), &'static str> {
        require(&self.user_id, "empty userID")?;
        require(&self.message, "empty message")
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Success body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error body shared by every failure response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ErrorResponse {
    #[schema(example = "Forbidden")]
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_request_ignores_timestamp_and_extra_fields() {
        let request = RoleRequest::decode(
            r#"{"timestamp":1700000000000,"userID":"U1","roleID":"R1","note":"x"}"#,
        )
        .unwrap();

        assert_eq!(
            request,
            RoleRequest {
                user_id: "U1".to_string(),
                role_id: "R1".to_string()
            }
        );
    }

    #[test]
    fn missing_or_empty_ids_are_rejected() {
        assert!(RoleRequest::decode(r#"{"userID":"U1"}"#).is_err());
        assert!(RoleRequest::decode(r#"{"userID":"","roleID":"R1"}"#).is_err());
        assert!(RoleRequest::decode(r#"{"userID":"U1","roleID":"  "}"#).is_err());
        assert!(RoleRequest::decode(r#"{"userID":1,"roleID":"R1"}"#).is_err());
        assert!(ChannelMessageRequest::decode(r#"{"channelID":"C1","message":""}"#).is_err());
        assert!(DirectMessageRequest::decode(r#"{"message":"hi"}"#).is_err());
    }

    #[test]
    fn message_payloads_decode() {
        let channel =
            ChannelMessageRequest::decode(r#"{"channelID":"C1","message":"hi"}"#).unwrap();
        assert_eq!(channel.channel_id, "C1");

        let dm = DirectMessageRequest::decode(r#"{"userID":"U1","message":"hi"}"#).unwrap();
        assert_eq!(dm.user_id, "U1");
        assert_eq!(dm.message, "hi");
    }

    #[test]
    fn envelope_signature_is_optional() {
        let envelope: SignedEnvelope = serde_json::from_str(r#"{"data":"{}"}"#).unwrap();
        assert_eq!(envelope.signature, None);
        assert!(serde_json::from_str::<SignedEnvelope>(r#"{"signature":"s"}"#).is_err());
    }
}
