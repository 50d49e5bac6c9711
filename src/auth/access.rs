// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IP-based admission for webhook routes.
//!
//! The gate sees only the TCP peer address. Forwarding headers are never
//! consulted, so a client cannot talk its way past the gate.

use std::collections::HashSet;
use std::net::SocketAddr;

/// Literal loopback addresses accepted in local-only mode.
pub const LOOPBACK_LITERALS: [&str; 2] = ["127.0.0.1", "::1"];

/// Which callers may reach the webhook routes. Fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Loopback callers only.
    LocalOnly,
    /// Exact string match against the configured addresses.
    Whitelist(HashSet<String>),
    /// Everyone.
    Open,
}

impl AccessPolicy {
    /// Build the policy from the config flags. `local_only` takes precedence
    /// over `whitelist_only`; with neither set the gate is open.
    pub fn from_flags(local_only: bool, whitelist_only: bool, whitelisted_ips: &[String]) -> Self {
        if local_only {
            AccessPolicy::LocalOnly
        } else if whitelist_only {
            AccessPolicy::Whitelist(whitelisted_ips.iter().cloned().collect())
        } else {
            AccessPolicy::Open
        }
    }

    /// Whether `remote_ip` may proceed.
    pub fn check(&self, remote_ip: &str) -> bool {
        match self {
            AccessPolicy::LocalOnly => LOOPBACK_LITERALS.contains(&remote_ip),
            AccessPolicy::Whitelist(allowed) => allowed.contains(remote_ip),
            AccessPolicy::Open => true,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            AccessPolicy::LocalOnly => "local-only",
            AccessPolicy::Whitelist(_) => "whitelist",
            AccessPolicy::Open => "open",
        }
    }
}

/// Render a peer address the way the gate compares it. IPv4-mapped IPv6
/// peers (dual-stack listeners) are shown in their IPv4 form.
pub fn peer_ip(addr: &SocketAddr) -> String {
    addr.ip().to_canonical().to_string()
}
