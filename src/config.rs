// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Settings come from a TOML file with a single `[config]` table, plus a few
//! environment variables for secrets and logging.
//!
//! ```toml
//! [config]
//! port = 8082
//! guildID = "123456789012345678"
//! shopLink = "https://shop.example.com"
//! localOnly = true
//! whitelistOnly = false
//! whitelistedIPs = []
//! useSigning = true
//! ```
//!
//! ## File Keys
//!
//! | Key | Description | Default |
//! |-----|-------------|---------|
//! | `port` | Server bind port | Required |
//! | `guildID` | Discord guild the bridge manages | Required |
//! | `shopLink` | Link sent by `/shop`, `/store` and `/platinpay` | `""` |
//! | `localOnly` | Accept webhooks from loopback only | `false` |
//! | `whitelistOnly` | Accept webhooks from `whitelistedIPs` only | `false` |
//! | `whitelistedIPs` | Exact peer addresses for whitelist mode | `[]` |
//! | `useSigning` | Require signed envelopes | `true` |
//! | `host` | Server bind address | `0.0.0.0` |
//! | `publicKeyPath` | Verification key file | `public_key.pem` |
//! | `tlsCertPath` / `tlsKeyPath` | PEM files; HTTPS when both are set | unset |
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CONFIG_PATH` | Config file location | `config.toml` |
//! | `DISCORD_TOKEN` | Bot token | Required |
//! | `DISCORD_APPLICATION_ID` | Application owning the slash commands | Bot user id |
//! | `DISCORD_PUBLIC_KEY` | Hex key for `/interactions` | Required when `useSigning` |
//! | `DISCORD_API_BASE_URL` | REST base URL | `https://discord.com/api/v10` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::auth::AccessPolicy;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

pub const DEFAULT_PUBLIC_KEY_PATH: &str = "public_key.pem";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level TOML document.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    config: BridgeConfig,
}

/// The `[config]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    pub port: u16,
    #[serde(rename = "guildID")]
    pub guild_id: String,
    #[serde(default)]
    pub shop_link: String,
    #[serde(default)]
    pub local_only: bool,
    #[serde(default)]
    pub whitelist_only: bool,
    #[serde(rename = "whitelistedIPs", default)]
    pub whitelisted_ips: Vec<String>,
    #[serde(default = "default_use_signing")]
    pub use_signing: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_public_key_path")]
    pub public_key_path: PathBuf,
    #[serde(default)]
    pub tls_cert_path: Option<PathBuf>,
    #[serde(default)]
    pub tls_key_path: Option<PathBuf>,
}

fn default_use_signing() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_public_key_path() -> PathBuf {
    PathBuf::from(DEFAULT_PUBLIC_KEY_PATH)
}

/// Certificate and key for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl BridgeConfig {
    /// Load from `CONFIG_PATH`, or `config.toml` in the working directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        Self::load(Path::new(&path))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|e| match e {
            ParseFailure::Toml(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Invalid(msg) => ConfigError::Invalid(msg),
        })
    }

    fn parse(raw: &str) -> Result<Self, ParseFailure> {
        let file: ConfigFile = toml::from_str(raw).map_err(ParseFailure::Toml)?;
        file.config.validate().map_err(ParseFailure::Invalid)?;
        Ok(file.config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.guild_id.trim().is_empty() {
            return Err("guildID must not be empty".to_string());
        }
        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            return Err("tlsCertPath and tlsKeyPath must be set together".to_string());
        }
        if !self.local_only && self.whitelist_only && self.whitelisted_ips.is_empty() {
            tracing::warn!(
                "whitelistOnly is set with an empty whitelistedIPs; every webhook will be rejected"
            );
        }
        Ok(())
    }

    /// Gate policy. `localOnly` takes precedence over `whitelistOnly`.
    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::from_flags(self.local_only, self.whitelist_only, &self.whitelisted_ips)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|e| {
            ConfigError::Invalid(format!("host {:?} is not an IP address: {e}", self.host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn tls(&self) -> Option<TlsPaths> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.clone(),
                key: key.clone(),
            }),
            _ => None,
        }
    }
}

enum ParseFailure {
    Toml(toml::de::Error),
    Invalid(String),
}
