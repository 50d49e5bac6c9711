// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! PlatinPay Bridge - Signed Webhook to Discord Bridge
//!
//! This crate receives Ed25519-signed webhook calls from a shop backend and
//! turns them into Discord guild operations: granting and removing roles,
//! posting channel messages and sending direct messages.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers (Axum) and OpenAPI document
//! - `auth` - IP gate, key store, signature verification and key rotation
//! - `config` - TOML configuration
//! - `discord` - Discord REST client, slash commands and interactions
//! - `logging` - Tracing subscriber setup

pub mod api;
pub mod auth;
pub mod config;
pub mod discord;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
