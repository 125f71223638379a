use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};

use dns_forwarder::{
    config::{self, Config},
    forwarder::Forwarder,
    server::Server,
};

/// A small DNS server that answers A queries itself or forwards them to a resolver.
#[derive(Debug, Parser)]
#[command(name = "dns-forwarder", version)]
struct Args {
    /// Resolver to forward questions to, as host:port. Answers locally when absent or empty.
    #[arg(long)]
    resolver: Option<String>,

    /// Address to listen on
    #[arg(long, default_value = config::DEFAULT_BIND)]
    bind: SocketAddr,

    /// Maximum number of requests handled at the same time
    #[arg(long, default_value_t = config::DEFAULT_MAX_IN_FLIGHT)]
    max_in_flight: usize,

    /// How long to wait for the resolver to answer one question, in milliseconds
    #[arg(long, default_value_t = config::DEFAULT_UPSTREAM_TIMEOUT.as_millis() as u64)]
    upstream_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let config = Config::new(
        args.bind,
        args.resolver.as_deref(),
        args.max_in_flight,
        Duration::from_millis(args.upstream_timeout_ms),
    )
    .await
    .context("invalid configuration")?;

    let forwarder = Forwarder::from_config(&config);
    let server = Server::bind(config.bind, forwarder, config.max_in_flight)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind))?;

    match config.resolver {
        Some(resolver) => info!(bind = %config.bind, %resolver, "forwarding questions"),
        None => info!(bind = %config.bind, "answering questions locally"),
    }

    server
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;
    Ok(())
}
