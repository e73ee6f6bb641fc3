//! swpd - SWP reference server daemon.
//!
//! Binds the protocol server on a TCP address and runs until interrupted.
//! Frame processing, validation policy, and the in-memory backends all live
//! in the library crate; this binary is the thin transport adapter.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use swp_daemon::{ProtocolServer, ServerConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// SWP reference server.
#[derive(Parser, Debug)]
#[command(name = "swpd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:7411")]
    bind: SocketAddr,

    /// Log filter (overridden by RUST_LOG when set).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enforce timestamp freshness on inbound envelopes.
    #[arg(long)]
    enforce_timestamp: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig {
        enforce_timestamp: args.enforce_timestamp,
        ..ServerConfig::default()
    }
    .with_bind_addr(args.bind);

    let server = ProtocolServer::bind(config)
        .await
        .with_context(|| format!("bind {}", args.bind))?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_cancel.cancel();
        }
    });

    server.serve(cancel).await.context("serve")
}
