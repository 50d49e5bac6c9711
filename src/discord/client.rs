// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Discord REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, Method, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use super::{ApplicationCommand, ChatPlatform, DiscordError};

pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

/// Environment-supplied Discord credentials.
#[derive(Clone)]
pub struct DiscordSettings {
    pub token: String,
    pub application_id: Option<String>,
    pub public_key: Option<String>,
    pub api_base_url: String,
    pub guild_id: String,
}

impl DiscordSettings {
    /// Read `DISCORD_*` variables. `guild_id` comes from the config file.
    ///
    /// `DISCORD_PUBLIC_KEY` becomes required when `use_signing` is set.
    pub fn from_env(guild_id: &str, use_signing: bool) -> Result<Self, DiscordError> {
        let settings = Self {
            token: env_required("DISCORD_TOKEN")?,
            application_id: env_optional("DISCORD_APPLICATION_ID"),
            public_key: env_optional("DISCORD_PUBLIC_KEY"),
            api_base_url: env_or_default("DISCORD_API_BASE_URL", DEFAULT_API_BASE_URL),
            guild_id: guild_id.to_string(),
        };
        settings.require_interactions(use_signing)?;
        Ok(settings)
    }

    /// With signing on, `/settoken` is the only way to install or replace
    /// the verification key at runtime, and Discord can only deliver it to
    /// `/interactions`, which needs the application public key.
    pub fn require_interactions(&self, use_signing: bool) -> Result<(), DiscordError> {
        if use_signing && self.public_key.is_none() {
            return Err(DiscordError::MissingConfig(
                "DISCORD_PUBLIC_KEY (required while useSigning is on)".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for DiscordSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSettings")
            .field("token", &"<redacted>")
            .field("application_id", &self.application_id)
            .field("public_key", &self.public_key)
            .field("api_base_url", &self.api_base_url)
            .field("guild_id", &self.guild_id)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    id: String,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
}

#[derive(Debug, Clone)]
pub struct DiscordClient {
    api_base_url: Url,
    token: String,
    application_id: String,
    guild_id: String,
    http: Client,
}

impl DiscordClient {
    /// Build the client and check the bot token against `/users/@me`.
    ///
    /// Without `DISCORD_APPLICATION_ID` the bot user id is used, which is
    /// the application id for every bot created since 2020.
    pub async fn connect(settings: &DiscordSettings) -> Result<Self, DiscordError> {
        if settings.guild_id.trim().is_empty() {
            return Err(DiscordError::MissingConfig("guildID".to_string()));
        }

        let api_base_url = Url::parse(&settings.api_base_url).map_err(|e| {
            DiscordError::InvalidConfig(format!("DISCORD_API_BASE_URL is not a URL: {e}"))
        })?;
        if api_base_url.cannot_be_a_base() {
            return Err(DiscordError::InvalidConfig(
                "DISCORD_API_BASE_URL cannot be a base URL".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| DiscordError::Request(format!("failed to build HTTP client: {e}")))?;

        let mut client = Self {
            api_base_url,
            token: settings.token.clone(),
            application_id: settings.application_id.clone().unwrap_or_default(),
            guild_id: settings.guild_id.clone(),
            http,
        };

        let me: CurrentUser = client
            .send(Method::GET, &["users", "@me"], None)
            .await?
            .json()
            .await
            .map_err(|e| DiscordError::InvalidResponse(format!("GET /users/@me: {e}")))?;

        if client.application_id.is_empty() {
            client.application_id = me.id.clone();
        }

        info!(
            bot_user = %me.username,
            bot_id = %me.id,
            application_id = %client.application_id,
            guild_id = %client.guild_id,
            "Connected to Discord"
        );
        Ok(client)
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, DiscordError> {
        let mut url = self.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DiscordError::InvalidConfig("DISCORD_API_BASE_URL cannot be a base URL".to_string())
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> Result<Response, DiscordError> {
        let url = self.endpoint(segments)?;
        let label = format!("{method} {}", url.path());

        let mut request = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DiscordError::Request(format!("{label} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DiscordError::Api { status, body });
        }

        debug!(request = %label, status = response.status().as_u16(), "Discord request ok");
        Ok(response)
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn add_role(&self, user_id: &str, role_id: &str) -> Result<(), DiscordError> {
        self.send(
            Method::PUT,
            &["guilds", &self.guild_id, "members", user_id, "roles", role_id],
            None,
        )
        .await?;
        Ok(())
    }

    async fn remove_role(&self, user_id: &str, role_id: &str) -> Result<(), DiscordError> {
        self.send(
            Method::DELETE,
            &["guilds", &self.guild_id, "members", user_id, "roles", role_id],
            None,
        )
        .await?;
        Ok(())
    }

    async fn send_channel_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<(), DiscordError> {
        self.send(
            Method::POST,
            &["channels", channel_id, "messages"],
            Some(json!({ "content": content })),
        )
        .await?;
        Ok(())
    }

    async fn send_direct_message(&self, user_id: &str, content: &str) -> Result<(), DiscordError> {
        let channel: Channel = self
            .send(
                Method::POST,
                &["users", "@me", "channels"],
                Some(json!({ "recipient_id": user_id })),
            )
            .await?
            .json()
            .await
            .map_err(|e| DiscordError::InvalidResponse(format!("POST /users/@me/channels: {e}")))?;

        self.send_channel_message(&channel.id, content).await
    }

    async fn register_commands(&self, commands: &[ApplicationCommand]) -> Result<(), DiscordError> {
        let body = serde_json::to_value(commands)
            .map_err(|e| DiscordError::InvalidResponse(format!("serialize commands failed: {e}")))?;
        self.send(
            Method::PUT,
            &["applications", &self.application_id, "guilds", &self.guild_id, "commands"],
            Some(body),
        )
        .await?;

        for command in commands {
            info!(command = %command.name, "Slash command registered");
        }
        Ok(())
    }

    async fn clear_commands(&self) -> Result<(), DiscordError> {
        self.send(
            Method::PUT,
            &["applications", &self.application_id, "guilds", &self.guild_id, "commands"],
            Some(json!([])),
        )
        .await?;
        info!(guild_id = %self.guild_id, "Guild slash commands removed");
        Ok(())
    }
}

fn env_required(name: &str) -> Result<String, DiscordError> {
    env_optional(name).ok_or_else(|| DiscordError::MissingConfig(name.to_string()))
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::{
        body::Bytes,
        extract::State,
        http::{HeaderMap, Method as HttpMethod, StatusCode, Uri},
        response::IntoResponse,
        Json, Router,
    };
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Fake Discord API that logs `METHOD path auth body` per request.
    async fn fake_discord(
        State(log): State<Log>,
        method: HttpMethod,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> axum::response::Response {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        log.lock().push(format!(
            "{method} {} {auth} {}",
            uri.path(),
            String::from_utf8_lossy(&body)
        ));

        match (method.as_str(), uri.path()) {
            ("GET", "/api/v10/users/@me") => {
                Json(json!({ "id": "42", "username": "bridge" })).into_response()
            }
            ("POST", "/api/v10/users/@me/channels") => Json(json!({ "id": "DM9" })).into_response(),
            (_, path) if path.contains("/roles/forbidden") => (
                StatusCode::FORBIDDEN,
                r#"{"message":"Missing Permissions"}"#,
            )
                .into_response(),
            ("POST", _) => Json(json!({ "id": "M1" })).into_response(),
            ("PUT", path) if path.ends_with("/commands") => Json(json!([])).into_response(),
            _ => StatusCode::NO_CONTENT.into_response(),
        }
    }

    async fn spawn_fake() -> (String, Log) {
        let log: Log = Arc::default();
        let app = Router::new().fallback(fake_discord).with_state(log.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/api/v10"), log)
    }

    fn settings(base: &str, application_id: Option<&str>) -> DiscordSettings {
        DiscordSettings {
            token: "secret-token".to_string(),
            application_id: application_id.map(str::to_string),
            public_key: None,
            api_base_url: base.to_string(),
            guild_id: "G1".to_string(),
        }
    }

    #[tokio::test]
    async fn connect_falls_back_to_bot_id_for_application_id() {
        let (base, log) = spawn_fake().await;

        let client = DiscordClient::connect(&settings(&base, None)).await.unwrap();
        assert_eq!(client.application_id(), "42");
        assert_eq!(log.lock()[0], "GET /api/v10/users/@me Bot secret-token ");

        let client = DiscordClient::connect(&settings(&base, Some("777"))).await.unwrap();
        assert_eq!(client.application_id(), "777");
    }

    #[tokio::test]
    async fn role_and_message_calls_hit_expected_routes() {
        let (base, log) = spawn_fake().await;
        let client = DiscordClient::connect(&settings(&base, None)).await.unwrap();

        client.add_role("U1", "R1").await.unwrap();
        client.remove_role("U1", "R1").await.unwrap();
        client.send_channel_message("C1", "hello").await.unwrap();
        client.send_direct_message("U2", "psst").await.unwrap();

        let log = log.lock();
        assert_eq!(
            &log[1..],
            [
                "PUT /api/v10/guilds/G1/members/U1/roles/R1 Bot secret-token ",
                "DELETE /api/v10/guilds/G1/members/U1/roles/R1 Bot secret-token ",
                r#"POST /api/v10/channels/C1/messages Bot secret-token {"content":"hello"}"#,
                r#"POST /api/v10/users/@me/channels Bot secret-token {"recipient_id":"U2"}"#,
                r#"POST /api/v10/channels/DM9/messages Bot secret-token {"content":"psst"}"#,
            ]
        );
    }

    #[tokio::test]
    async fn ids_are_encoded_as_single_path_segments() {
        let (base, log) = spawn_fake().await;
        let client = DiscordClient::connect(&settings(&base, None)).await.unwrap();

        client.add_role("U1/../../x", "R1").await.unwrap();
        assert!(log.lock()[1]
            .starts_with("PUT /api/v10/guilds/G1/members/U1%2F..%2F..%2Fx/roles/R1 "));
    }

    #[tokio::test]
    async fn non_success_status_surfaces_as_api_error() {
        let (base, _) = spawn_fake().await;
        let client = DiscordClient::connect(&settings(&base, None)).await.unwrap();

        let err = client.add_role("U1", "forbidden").await.unwrap_err();
        match err {
            DiscordError::Api { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("Missing Permissions"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn commands_are_bulk_overwritten_and_cleared() {
        let (base, log) = spawn_fake().await;
        let client = DiscordClient::connect(&settings(&base, Some("A1"))).await.unwrap();

        client
            .register_commands(&crate::discord::guild_commands())
            .await
            .unwrap();
        client.clear_commands().await.unwrap();

        let log = log.lock();
        let commands = "PUT /api/v10/applications/A1/guilds/G1/commands Bot secret-token";
        assert!(log[1].starts_with(&format!("{commands} [{{")));
        assert_eq!(log[2], format!("{commands} []"));
    }

    #[tokio::test]
    async fn connect_rejects_blank_guild() {
        let mut settings = settings("http://127.0.0.1:1/api/v10", None);
        settings.guild_id = " ".to_string();

        let err = DiscordClient::connect(&settings).await.unwrap_err();
        assert!(matches!(err, DiscordError::MissingConfig(_)));
    }

    #[test]
    fn signing_without_public_key_is_refused() {
        let mut settings = settings(DEFAULT_API_BASE_URL, None);

        let err = settings.require_interactions(true).unwrap_err();
        assert!(err.to_string().contains("DISCORD_PUBLIC_KEY"));
        assert!(settings.require_interactions(false).is_ok());

        settings.public_key = Some("ab".repeat(32));
        assert!(settings.require_interactions(true).is_ok());
    }
}
