use clap::Parser;
use order_assistant_proxy::{build_router, ProxyConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .with_target(false)
        .init();

    let config = ProxyConfig::parse();
    let listen = config.listen;
    tracing::info!(
        backend = %config.backend_url,
        bot = %config.bot_url,
        "proxy listening on {listen}"
    );
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, build_router(config)).await
}
