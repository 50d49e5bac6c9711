// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use platinpay_bridge::{
    api::router,
    auth::{Ed25519, KeyStore, RequestPipeline, SystemClock},
    config::BridgeConfig,
    discord::{guild_commands, ChatPlatform, DiscordClient, DiscordSettings, InteractionVerifier},
    logging::init_tracing,
    state::AppState,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Time given to in-flight requests once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Bridge stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), BoxError> {
    let config = BridgeConfig::from_env()?;
    let settings = DiscordSettings::from_env(&config.guild_id, config.use_signing)?;

    let keys = if config.use_signing {
        KeyStore::open(&config.public_key_path, Arc::new(Ed25519))
    } else {
        KeyStore::new(&config.public_key_path, Arc::new(Ed25519))
    };
    let policy = config.access_policy();
    info!(
        access = policy.mode(),
        signing = config.use_signing,
        key_loaded = keys.is_loaded(),
        "Webhook authentication configured"
    );
    let pipeline = RequestPipeline::new(
        policy,
        config.use_signing,
        Arc::new(keys),
        Arc::new(SystemClock),
    );

    let discord = Arc::new(DiscordClient::connect(&settings).await?);

    let mut state = AppState::new(pipeline, discord.clone()).with_shop_link(&config.shop_link);
    match settings.public_key.as_deref() {
        Some(public_key) => {
            state = state.with_interactions(InteractionVerifier::from_hex(public_key)?);
            discord.register_commands(&guild_commands()).await?;
        }
        None => warn!("DISCORD_PUBLIC_KEY not set; slash commands are not registered"),
    }

    let app = router(state);
    let addr = config.bind_addr()?;

    let shutdown = CancellationToken::new();
    let handle = Handle::new();
    tokio::spawn(watch_signals(shutdown.clone()));
    tokio::spawn({
        let shutdown = shutdown.clone();
        let handle = handle.clone();
        async move {
            shutdown.cancelled().await;
            info!("Draining connections");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    let served = match config.tls() {
        Some(tls) => {
            rustls::crypto::ring::default_provider()
                .install_default()
                .map_err(|_| "failed to install rustls crypto provider")?;
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            info!(%addr, "PlatinPay bridge listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(service)
                .await
        }
        None => {
            info!(%addr, "PlatinPay bridge listening on http (docs at /docs)");
            axum_server::bind(addr).handle(handle).serve(service).await
        }
    };
    shutdown.cancel();

    match discord.clear_commands().await {
        Ok(()) => info!("Guild commands cleaned up"),
        Err(e) => warn!(error = %e, "Failed to clean up guild commands"),
    }

    served?;
    info!("Server stopped");
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
        _ = shutdown.cancelled() => return,
    }

    shutdown.cancel();
}
