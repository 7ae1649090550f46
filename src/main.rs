use clap::Parser;
use mongo_proxy::{logger, net, ProxyConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ProxyConfig::parse();
    logger::init_logger(config.verbose, config.log_json);
    tracing::debug!(?config, "Loaded configuration.");

    let app = mongo_proxy::router(&config);

    let listener = net::bind_with_retry(&config.host, config.port, config.port_retries).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("API server running at http://{}:{}", net::local_ipv4(), port);

    axum::serve(listener, app).await?;
    Ok(())
}
