// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Guild slash command definitions.

use serde::Serialize;

/// `ADMINISTRATOR` permission bit.
pub const ADMINISTRATOR: u64 = 1 << 3;

/// Commands that reply with the shop link.
pub const SHOP_COMMANDS: [&str; 3] = ["shop", "store", "platinpay"];

/// Administrator command that installs a new verification key.
pub const SET_TOKEN_COMMAND: &str = "settoken";

/// Name of the `settoken` option carrying the key blob.
pub const TOKEN_OPTION: &str = "token";

const OPTION_TYPE_STRING: u8 = 3;

/// Body of a command in a bulk-overwrite request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationCommand {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    /// Discord expects the bit set as a decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOption {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ApplicationCommand {
    fn simple(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            options: Vec::new(),
            default_member_permissions: None,
        }
    }
}

/// Every command the bridge registers in its guild.
pub fn guild_commands() -> Vec<ApplicationCommand> {
    let mut commands: Vec<ApplicationCommand> = SHOP_COMMANDS
        .iter()
        .map(|name| ApplicationCommand::simple(name, "Sends a shop link."))
        .collect();

    commands.push(ApplicationCommand {
        options: vec![CommandOption {
            kind: OPTION_TYPE_STRING,
            name: TOKEN_OPTION.to_string(),
            description: "The public key/token".to_string(),
            required: true,
        }],
        default_member_permissions: Some(ADMINISTRATOR.to_string()),
        ..ApplicationCommand::simple(
            SET_TOKEN_COMMAND,
            "Set the public key/token for signature verification",
        )
    });

    commands
}
