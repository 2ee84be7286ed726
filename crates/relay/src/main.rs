use anyhow::anyhow;
use relay::{Server, config::RelayConfig, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    utils::sentry::init_once("relay");
    init_tracing();

    let config = RelayConfig::from_env()?;
    Server::run(config).await
}
