// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Discord integration.
//!
//! Webhook handlers talk to Discord only through [`ChatPlatform`], so they
//! can be exercised without a network. [`DiscordClient`] is the REST
//! implementation; the guild it acts on is fixed by configuration.

pub mod client;
pub mod commands;
pub mod interactions;

use async_trait::async_trait;

pub use client::{DiscordClient, DiscordSettings};
pub use commands::{guild_commands, ApplicationCommand, CommandOption, ADMINISTRATOR};
pub use interactions::{Interaction, InteractionResponse, InteractionVerifier};

#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("Discord configuration missing: {0}")]
    MissingConfig(String),

    #[error("Discord configuration invalid: {0}")]
    InvalidConfig(String),

    #[error("Discord request failed: {0}")]
    Request(String),

    #[error("Discord API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Discord response was invalid: {0}")]
    InvalidResponse(String),
}

/// Operations the webhook and interaction handlers need from the chat
/// service. All of them target the configured guild.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn add_role(&self, user_id: &str, role_id: &str) -> Result<(), DiscordError>;

    async fn remove_role(&self, user_id: &str, role_id: &str) -> Result<(), DiscordError>;

    async fn send_channel_message(&self, channel_id: &str, content: &str)
        -> Result<(), DiscordError>;

    /// Open (or reuse) a DM channel with `user_id` and post `content`.
    async fn send_direct_message(&self, user_id: &str, content: &str) -> Result<(), DiscordError>;

    /// Overwrite the guild's slash commands with `commands`.
    async fn register_commands(&self, commands: &[ApplicationCommand]) -> Result<(), DiscordError>;

    /// Remove every guild slash command registered by this application.
    async fn clear_commands(&self) -> Result<(), DiscordError>;
}

#[cfg(test)]
pub use recording::RecordingPlatform;

#[cfg(test)]
mod recording {
    use parking_lot::Mutex;

    use super::*;

    /// In-memory platform that records each call as `op:arg:arg`.
    #[derive(Debug, Default)]
    pub struct RecordingPlatform {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingPlatform {
        /// A platform whose every call fails with a 403 from Discord.
        pub fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn record(&self, call: String) -> Result<(), DiscordError> {
            self.calls.lock().push(call);
            if self.fail {
                return Err(DiscordError::Api {
                    status: 403,
                    body: r#"{"message":"Missing Permissions","code":50013}"#.to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ChatPlatform for RecordingPlatform {
        async fn add_role(&self, user_id: &str, role_id: &str) -> Result<(), DiscordError> {
            self.record(format!("add_role:{user_id}:{role_id}"))
        }

        async fn remove_role(&self, user_id: &str, role_id: &str) -> Result<(), DiscordError> {
            self.record(format!("remove_role:{user_id}:{role_id}"))
        }

        async fn send_channel_message(
            &self,
            channel_id: &str,
            content: &str,
        ) -> Result<(), DiscordError> {
            self.record(format!("send_channel_message:{channel_id}:{content}"))
        }

        async fn send_direct_message(
            &self,
            user_id: &str,
            content: &str,
        ) -> Result<(), DiscordError> {
            self.record(format!("send_direct_message:{user_id}:{content}"))
        }

        async fn register_commands(
            &self,
            commands: &[ApplicationCommand],
        ) -> Result<(), DiscordError> {
            let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
            self.record(format!("register_commands:{}", names.join(",")))
        }

        async fn clear_commands(&self) -> Result<(), DiscordError> {
            self.record("clear_commands".to_string())
        }
    }
}
