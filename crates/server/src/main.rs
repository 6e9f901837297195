//! fedsync server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fedsync_common::Config;
use fedsync_federation::{DeliveryQueueService, DiscardingQueue, HttpFetcher};
use fedsync_queue::{DeliverContext, HttpTransport, RetryConfig, TaskDeliveryQueue};
use fedsync_server::Node;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fedsync=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    init_tracing(config.server.json_logs);

    info!(url = %config.server.url, "Starting fedsync node");

    let fetcher = Arc::new(HttpFetcher::new(config.federation.fetch_timeout())?);
    let queue: DeliveryQueueService = if config.federation.enabled {
        let transport = Arc::new(HttpTransport::new(Duration::from_millis(
            config.delivery.request_timeout_ms,
        ))?);
        let retry = RetryConfig::from(&config.delivery);
        info!(
            max_retries = retry.max_retries,
            concurrency = config.delivery.concurrency,
            "Starting delivery worker"
        );
        let ctx = DeliverContext::new(transport, retry)
            .with_dead_letter_capacity(config.delivery.dead_letter_capacity);
        Arc::new(TaskDeliveryQueue::spawn(ctx, config.delivery.concurrency))
    } else {
        info!("Federation disabled");
        Arc::new(DiscardingQueue)
    };

    let node = Node::new(&config, queue, fetcher)?;
    let app = node.router();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
