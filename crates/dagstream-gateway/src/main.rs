use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dagstream_core::{config::DagstreamConfig, types::Dag};
use tracing::{info, warn};

mod app;
mod http;
mod producer;

/// Streams DAG state frames to browser clients over server-sent events.
#[derive(Debug, Parser)]
#[command(name = "dagstream-gateway", version, about)]
struct Args {
    /// Config file (default: $DAGSTREAM_CONFIG, then ./dagstream.toml).
    #[arg(short, long)]
    config: Option<String>,

    /// Listen port, overrides gateway.port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Serve subscribers without running the built-in DAG producer.
    #[arg(long)]
    no_producer: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dagstream_gateway=info,dagstream_hub=info,tower_http=debug".into()
            }),
        )
        .init();

    let args = Args::parse();

    // config: --config > DAGSTREAM_CONFIG env > ./dagstream.toml
    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("DAGSTREAM_CONFIG").ok());
    let mut config = DagstreamConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        DagstreamConfig::default()
    });
    if let Some(port) = args.port {
        config.gateway.port = port;
    }
    if args.no_producer {
        config.producer.enabled = false;
    }
    config.validate()?;

    let hub = dagstream_hub::spawn_hub(&config.hub);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    if config.producer.enabled {
        let producer = producer::DagProducer::new(
            hub.clone(),
            Duration::from_secs(config.producer.interval_secs),
            Dag::release_pipeline(),
        );
        tokio::spawn(producer.run(shutdown_rx));
    } else {
        info!("DAG producer disabled");
    }

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, hub));
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("dagstream gateway listening on {}", addr);

    // SSE responses never finish on their own, so a graceful drain would
    // wait forever; stop serving as soon as the signal arrives.
    tokio::select! {
        res = axum::serve(listener, router).into_future() => res?,
        _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
    }

    let _ = shutdown_tx.send(true);
    Ok(())
}
