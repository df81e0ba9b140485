use std::net::IpAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use game_persistence::{GameStore, MemoryStore, SeaOrmStore, connection::connect_and_migrate};
use game_server::{
    broadcaster::Broadcaster,
    config::Config,
    create_routes,
    registry::{RegistrySettings, SessionRegistry},
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Stamp Arena server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn GameStore> = if config.uses_memory_store() {
        info!("Using in-memory game store");
        Arc::new(MemoryStore::new())
    } else {
        // Initialize database connection and run migrations
        match connect_and_migrate(&config.database_url).await {
            Ok(db) => Arc::new(SeaOrmStore::new(db)),
            Err(e) => {
                error!("Failed to connect to database and run migrations: {}", e);
                std::process::exit(1);
            }
        }
    };

    let broadcaster = Arc::new(Broadcaster::new(
        config.poll_interval(),
        config.keepalive_interval(),
    ));
    let registry = Arc::new(SessionRegistry::new(
        store,
        broadcaster,
        RegistrySettings::from(&config),
    ));

    let routes = create_routes(registry.clone());

    // Start cleanup task
    let cleanup_registry = registry.clone();
    let cleanup_interval = config.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            cleanup_registry.cleanup().await;
        }
    });

    let host = match config.host.parse::<IpAddr>() {
        Ok(host) => host,
        Err(e) => {
            error!("Invalid HOST {}: {}", config.host, e);
            std::process::exit(1);
        }
    };

    info!("Server starting on {}:{}", config.host, config.port);

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown((host, config.port), async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
                .expect("Failed to listen for SIGINT");
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to listen for SIGTERM");

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}
