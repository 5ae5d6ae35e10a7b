//! Pinpoint HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use pinpoint::alias::AliasTable;
use pinpoint::config::Config;
use pinpoint::gateway::{HandlerState, create_router_with_state};
use pinpoint::resolver::{Resolver, ResolverConfig};
use pinpoint::scoring::RelevanceScorer;
use pinpoint::store::{CatalogSnapshot, CatalogStore};
use pinpoint::upstream::CatalogSearchClient;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!(
        r#"
██████╗ ██╗███╗   ██╗██████╗  ██████╗ ██╗███╗   ██╗████████╗
██╔══██╗██║████╗  ██║██╔══██╗██╔═══██╗██║████╗  ██║╚══██╔══╝
██████╔╝██║██╔██╗ ██║██████╔╝██║   ██║██║██╔██╗ ██║   ██║
██╔═══╝ ██║██║╚██╗██║██╔═══╝ ██║   ██║██║██║╚██╗██║   ██║
██║     ██║██║ ╚████║██║     ╚██████╔╝██║██║ ╚████║   ██║
╚═╝     ╚═╝╚═╝  ╚═══╝╚═╝      ╚═════╝ ╚═╝╚═╝  ╚═══╝   ╚═╝

        GROUND. RESOLVE. NEVER GUESS.
                                        AGPL-3.0
"#
    );

    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        upstream = %config.upstream_url,
        "Pinpoint starting"
    );

    let alias = Arc::new(AliasTable::curated());
    tracing::info!(entries = alias.len(), "stable alias table loaded");

    // The catalog cache starts empty; the external refresh process swaps in
    // snapshots once it connects. /ready reports pending until then.
    let store = Arc::new(CatalogStore::with_memo_capacity(
        CatalogSnapshot::empty(),
        config.memo_capacity,
    ));

    let backend = CatalogSearchClient::new(&config.upstream_url, &config.invoke_url);

    let resolver_config = ResolverConfig {
        thresholds: config.ambiguity_thresholds(),
        default_timeout: config.request_budget(),
        default_retries: config.upstream_retries,
        resolver_first_search: config.resolver_first_search,
    };
    let resolver = Arc::new(Resolver::new(
        alias,
        store,
        backend,
        RelevanceScorer::new(config.min_overlap),
        resolver_config,
    ));

    let app = create_router_with_state(HandlerState::new(resolver));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Pinpoint shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("PINPOINT_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    rt.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("failed to build client");

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
