mod config;
mod db;
mod error;
mod models;
mod normalize;
mod routes;
mod sources;
mod store;
mod sync;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{Command, Config};
use crate::routes::api::AppState;
use crate::store::PgJobStore;

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(state: AppState) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jobfeed=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;
        tracing::info!("Migrations complete");
    }

    let state = AppState {
        store: Arc::new(PgJobStore::new(pool)),
        options: config.sync_options(),
    };

    match config.command.clone().unwrap_or(Command::Serve) {
        Command::Sync { countries } => {
            let requested: Vec<String> = countries
                .as_deref()
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            let report = sync::run_sync(&state.options, state.store.as_ref(), &requested).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Serve => {
            let readyz_state = state.clone();
            let app = Router::new()
                .route("/healthz", get(healthz))
                .route("/readyz", get(move || readyz(readyz_state.clone())))
                .merge(routes::api::router(state))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive());

            let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
            tracing::info!("Listening on {}", config.listen_addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
