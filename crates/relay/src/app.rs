use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing::instrument;

use crate::{
    AppState,
    auth::{HandoffStore, OAuthFlowService, RobloxOAuthProvider, SystemClock, spawn_sweeper},
    config::RelayConfig,
    routes,
    social::RobloxSocialClient,
};

const USER_AGENT: &str = "RobloxOAuthRelay/1.0";

pub struct Server;

impl Server {
    #[instrument(
        name = "relay_server",
        skip(config),
        fields(listen_addr = %config.listen_addr)
    )]
    pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.upstream_timeout)
            .build()
            .context("failed to create HTTP client")?;

        let store = Arc::new(HandoffStore::new(Arc::new(SystemClock)));
        let _sweeper = spawn_sweeper(Arc::clone(&store), config.sweep_interval);

        let provider = RobloxOAuthProvider::new(http_client.clone(), &config.roblox)
            .context("failed to configure OAuth provider")?;

        if config.oauth.is_some() {
            tracing::info!("OAuth client credentials loaded");
        } else {
            tracing::warn!(
                "OAuth client credentials missing. Set OAUTH_CLIENT_ID, OAUTH_CLIENT_SECRET, and OAUTH_REDIRECT_URI to enable the callback."
            );
        }

        let flow = Arc::new(OAuthFlowService::new(
            Arc::new(provider),
            store,
            config.oauth.clone(),
            config.bridge_target_origin.clone(),
        ));
        let social = Arc::new(RobloxSocialClient::new(http_client, &config.roblox));

        let state = AppState::new(flow, social);

        let router = routes::router(state);
        let addr: SocketAddr = config
            .listen_addr
            .parse()
            .context("listen address is invalid")?;
        let tcp_listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("failed to bind tcp listener")?;

        tracing::info!(
            %addr,
            upstream_timeout_secs = config.upstream_timeout.as_secs(),
            "oauth relay listening"
        );

        axum::serve(tcp_listener, router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("oauth relay server failure")?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
