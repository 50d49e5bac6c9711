// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Discord HTTP interaction payloads and request verification.
//!
//! Discord signs every interaction with the application key:
//! Ed25519 over `X-Signature-Timestamp || body`, hex encoded in
//! `X-Signature-Ed25519`.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::commands::ADMINISTRATOR;
use super::DiscordError;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

const RESPONSE_PONG: u8 = 1;
const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
const FLAG_EPHEMERAL: u64 = 1 << 6;

/// Incoming interaction. Only the fields the bridge reads are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<CommandData>,
    #[serde(default)]
    pub member: Option<Member>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandDataOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandDataOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl CommandData {
    /// Value of a string option, if present.
    pub fn string_option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.name == name)
            .and_then(|option| option.value.as_ref())
            .and_then(Value::as_str)
    }
}

/// Guild member that invoked the command.
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
    /// Resolved permissions in the invoking channel, as a decimal string.
    #[serde(default)]
    pub permissions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
}

impl Member {
    pub fn is_admin(&self) -> bool {
        self.permissions
            .as_deref()
            .and_then(|bits| bits.parse::<u64>().ok())
            .is_some_and(|bits| bits & ADMINISTRATOR != 0)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub description: String,
    pub color: u32,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: RESPONSE_PONG,
            data: None,
        }
    }

    /// Message visible only to the invoker.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            kind: RESPONSE_CHANNEL_MESSAGE,
            data: Some(ResponseData {
                content: Some(content.into()),
                flags: Some(FLAG_EPHEMERAL),
                ..ResponseData::default()
            }),
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            kind: RESPONSE_CHANNEL_MESSAGE,
            data: Some(ResponseData {
                embeds: vec![embed],
                ..ResponseData::default()
            }),
        }
    }
}

/// Checks Discord's request signatures against the application public key.
#[derive(Debug, Clone)]
pub struct InteractionVerifier {
    key: VerifyingKey,
}

impl InteractionVerifier {
    /// Build from the hex public key shown in the developer portal.
    pub fn from_hex(public_key_hex: &str) -> Result<Self, DiscordError> {
        let raw = hex::decode(public_key_hex.trim()).map_err(|e| {
            DiscordError::InvalidConfig(format!("DISCORD_PUBLIC_KEY is not hex: {e}"))
        })?;
        let raw: [u8; 32] = raw.try_into().map_err(|_| {
            DiscordError::InvalidConfig("DISCORD_PUBLIC_KEY must be 32 bytes".to_string())
        })?;
        let key = VerifyingKey::from_bytes(&raw).map_err(|e| {
            DiscordError::InvalidConfig(format!("DISCORD_PUBLIC_KEY is invalid: {e}"))
        })?;
        Ok(Self { key })
    }

    pub fn verify(&self, signature_hex: &str, timestamp: &str, body: &[u8]) -> bool {
        let Ok(signature) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(signature) = <[u8; 64]>::try_from(signature.as_slice()) else {
            return false;
        };

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify(&message, &Signature::from_bytes(&signature))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use serde_json::json;

    fn verifier_for(signer: &SigningKey) -> InteractionVerifier {
        InteractionVerifier::from_hex(&hex::encode(signer.verifying_key().as_bytes())).unwrap()
    }

    #[test]
    fn verifies_timestamp_and_body_together() {
        let signer = SigningKey::from_bytes(&[5; 32]);
        let verifier = verifier_for(&signer);
        let body = br#"{"type":1}"#;
        let signature = hex::encode(signer.sign(b"1700000000{\"type\":1}").to_bytes());

        assert!(verifier.verify(&signature, "1700000000", body));
        assert!(!verifier.verify(&signature, "1700000001", body));
        assert!(!verifier.verify(&signature, "1700000000", br#"{"type":2}"#));
        assert!(!verifier.verify("zz", "1700000000", body));
        assert!(!verifier.verify(&signature[..64], "1700000000", body));
    }

    #[test]
    fn rejects_bad_public_key_config() {
        assert!(InteractionVerifier::from_hex("not hex").is_err());
        assert!(InteractionVerifier::from_hex("abcd").is_err());
    }

    #[test]
    fn admin_bit_is_read_from_permission_string() {
        let member = |permissions: Option<&str>| Member {
            user: None,
            permissions: permissions.map(str::to_string),
        };

        assert!(member(Some("8")).is_admin());
        assert!(member(Some("2147483656")).is_admin());
        assert!(!member(Some("2147483648")).is_admin());
        assert!(!member(Some("garbage")).is_admin());
        assert!(!member(None).is_admin());
    }

    #[test]
    fn parses_settoken_invocation() {
        let interaction: Interaction = serde_json::from_value(json!({
            "type": 2,
            "guild_id": "G1",
            "member": { "user": { "id": "U1", "username": "admin" }, "permissions": "8" },
            "data": {
                "name": "settoken",
                "options": [{ "name": "token", "type": 3, "value": "abc" }]
            }
        }))
        .unwrap();

        let data = interaction.data.unwrap();
        assert_eq!(data.name, "settoken");
        assert_eq!(data.string_option("token"), Some("abc"));
        assert_eq!(data.string_option("missing"), None);
        assert_eq!(interaction.member.unwrap().user_id(), Some("U1"));
    }

    #[test]
    fn responses_serialize_to_discord_shapes() {
        assert_eq!(
            serde_json::to_value(InteractionResponse::pong()).unwrap(),
            json!({ "type": 1 })
        );
        assert_eq!(
            serde_json::to_value(InteractionResponse::ephemeral("hi")).unwrap(),
            json!({ "type": 4, "data": { "content": "hi", "flags": 64 } })
        );
        assert_eq!(
            serde_json::to_value(InteractionResponse::embed(Embed {
                description: "link".to_string(),
                color: 0xFFFFFF,
            }))
            .unwrap(),
            json!({
                "type": 4,
                "data": { "embeds": [{ "description": "link", "color": 16777215 }] }
            })
        );
    }
}
