mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::dashboard))
        .route("/api/summary", get(routes::summary))
        .route("/cache/clear", post(routes::clear_cache))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, bind: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}
