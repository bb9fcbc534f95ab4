//! HTTP API.
//!
//! Routes live under `/api`, with a `/health` check at the root. When a static
//! directory is configured, every other path is served from it, falling back
//! to `index.html` so a single-page UI can handle its own routes.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::service::TeamService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TeamService>,
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/members",
            get(handlers::list_members).post(handlers::create_member),
        )
        .route("/members/bulk", post(handlers::bulk_replace))
        .route("/members/reset-points", post(handlers::reset_points))
        .route("/members/import", post(handlers::import_sheet))
        .route("/members/export", get(handlers::export_sheet))
        .route(
            "/members/{id}",
            put(handlers::update_member).delete(handlers::delete_member),
        )
        .route("/members/{id}/{category}", patch(handlers::adjust_member))
        .route("/categories", get(handlers::list_categories))
        .route("/categories/{id}", put(handlers::update_category))
        .route("/categories/key/{key}", put(handlers::update_category_by_key))
}

/// Build the application router
pub fn router(service: Arc<TeamService>, static_dir: Option<&Path>) -> Router {
    let state = AppState { service };

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes())
        .with_state(state);

    if let Some(dir) = static_dir {
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until Ctrl-C
pub async fn run(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
