use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;

use crate::error::AppError;
use crate::routes::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/media/scan", post(trigger_scan))
}

async fn trigger_scan(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    tracing::info!("Manual scan requested");
    let summary = state.scanner.scan().await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        summary.to_string(),
    ))
}
