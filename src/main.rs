use walletd::{AppConfig, ServiceContext, gateway, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let _guard = logging::init_logging(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        port = config.port,
        "Starting walletd"
    );

    let port = config.port;
    let ctx = ServiceContext::initialize(config).await?;

    gateway::run_server(port, ctx).await
}
