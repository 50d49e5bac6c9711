// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{KeyRotator, KeyStore, RequestPipeline};
use crate::discord::{ChatPlatform, InteractionVerifier};

#[derive(Clone)]
pub struct AppState {
    /// Gate and signature checks for webhook routes.
    pub pipeline: Arc<RequestPipeline>,
    /// Installs keys submitted through `/settoken`.
    pub rotator: Arc<KeyRotator>,
    pub platform: Arc<dyn ChatPlatform>,
    /// Present when `DISCORD_PUBLIC_KEY` is configured.
    pub interactions: Option<Arc<InteractionVerifier>>,
    pub shop_link: Arc<str>,
}

impl AppState {
    pub fn new(pipeline: RequestPipeline, platform: Arc<dyn ChatPlatform>) -> Self {
        let rotator = KeyRotator::new(Arc::clone(pipeline.keys()));
        Self {
            pipeline: Arc::new(pipeline),
            rotator: Arc::new(rotator),
            platform,
            interactions: None,
            shop_link: Arc::from(""),
        }
    }

    pub fn with_interactions(mut self, verifier: InteractionVerifier) -> Self {
        self.interactions = Some(Arc::new(verifier));
        self
    }

    pub fn with_shop_link(mut self, shop_link: impl AsRef<str>) -> Self {
        self.shop_link = Arc::from(shop_link.as_ref());
        self
    }

    pub fn keys(&self) -> &Arc<KeyStore> {
        self.pipeline.keys()
    }
}
