mod api;
mod config;
mod error;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use risk_engine::RiskEngine;
use server::RiskScannerServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting risk-scanner MCP server");

    let config = Config::from_env()?;
    info!(
        low_content_chars = config.engine.content.low_content_chars,
        meaningful_min_chars = config.engine.content.meaningful_min_chars,
        popup_min_score = config.engine.popup_min_score,
        custom_catalog = config.engine.risk_cards_path.is_some(),
        "configuration loaded"
    );

    let engine = Arc::new(RiskEngine::from_config(config.engine.clone())?);
    info!(cards = engine.registry().len(), "risk engine ready");

    let server = RiskScannerServer::new(engine);

    if let Some(addr) = config.tcp_listen_addr {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                tracing::info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                tracing::info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
