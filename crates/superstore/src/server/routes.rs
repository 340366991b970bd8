use std::fmt::Display;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use superstore_core::{DashboardView, RegionFilter};

use super::AppState;

/// Repeated `region` parameters select regions; none selects all of them.
fn region_filter(params: &[(String, String)]) -> RegionFilter {
    RegionFilter::new(
        params
            .iter()
            .filter(|(key, _)| key == "region")
            .map(|(_, value)| value.clone()),
    )
}

fn internal_error(context: &str, err: impl Display) -> StatusCode {
    tracing::error!("{context}: {err:#}");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn build_view(
    state: &AppState,
    params: &[(String, String)],
) -> Result<DashboardView, StatusCode> {
    let table = state
        .table()
        .await
        .map_err(|err| internal_error("failed to load transactions", err))?;
    DashboardView::build(&table, &region_filter(params), state.top_n())
        .map_err(|err| internal_error("failed to compute dashboard", err))
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Html<String>, StatusCode> {
    let view = build_view(&state, &params).await?;
    Ok(Html(view.render_html()))
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<DashboardView>, StatusCode> {
    build_view(&state, &params).await.map(Json)
}

pub async fn clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.clear_cache().await;
    StatusCode::NO_CONTENT
}
