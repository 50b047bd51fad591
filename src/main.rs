#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use rank_rally_server::config;
use rank_rally_server::http::{self, AppState};
use rank_rally_server::logging;
use rank_rally_server::providers::{HttpEmojiService, HttpItemStore, ItemStore, NullItemStore};
use rank_rally_server::registry::RoomRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Rank Rally -- realtime room server for a ranking party game
#[derive(Parser, Debug)]
#[command(name = "rank-rally-server")]
#[command(about = "Realtime room-based ranking game coordination server")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = Arc::new(config::load());

    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate(&cfg);
    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Room TTL: {}s", cfg.server.room_ttl_secs);
                println!("  Heartbeat interval: {}s", cfg.server.heartbeat_interval_secs);
                println!("  Items per game: {}", cfg.room.items_per_game);
                println!(
                    "  Item store: {}",
                    cfg.providers.item_store_url.as_deref().unwrap_or("disabled")
                );
                println!(
                    "  Emoji service: {}",
                    cfg.providers
                        .emoji_service_url
                        .as_deref()
                        .unwrap_or("disabled")
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }
    validation_result.map_err(|e| anyhow::anyhow!("invalid configuration:\n{e}"))?;

    logging::init_with_config(&cfg.logging);

    let request_timeout = Duration::from_secs(cfg.providers.request_timeout_secs);
    let emoji = Arc::new(HttpEmojiService::new(
        cfg.providers.emoji_service_url.clone(),
        cfg.providers.emoji_daily_budget,
        request_timeout,
    ));
    let items: Arc<dyn ItemStore> = match &cfg.providers.item_store_url {
        Some(url) => Arc::new(HttpItemStore::new(url.clone(), request_timeout)),
        None => Arc::new(NullItemStore),
    };

    let registry = RoomRegistry::new(Arc::clone(&cfg), emoji);
    tokio::spawn(Arc::clone(&registry).sweep_task());

    let state = AppState {
        registry: Arc::clone(&registry),
        items,
        config: Arc::clone(&cfg),
    };

    use tower_http::cors::{Any, CorsLayer};
    let cors = if cfg.cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cfg
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();
        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    let router = http::create_router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.cors_origins,
        "Rank Rally server started - rooms: POST /room/{{code}}, channel: /room/{{code}}/ws"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.shutdown();
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
