use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::models::media;
use crate::routes::AppState;
use crate::stream;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/media/stream/{id}", get(stream_media))
        .route("/api/media/{id}/favorite", patch(toggle_favorite))
        .route("/api/media/{id}/watch", patch(toggle_watched))
        .route("/api/media/{id}/position", get(get_position).put(set_position))
        .route("/api/media/{id}/poster", get(poster))
}

fn not_found() -> AppError {
    AppError::NotFound("Media not found".to_string())
}

async fn stream_media(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let item = media::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    stream::serve_file(std::path::Path::new(&item.filepath), &headers).await
}

async fn toggle_favorite(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let favorite = media::toggle_favorite(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    let message = if favorite {
        "Added to favorites"
    } else {
        "Removed from favorites"
    };
    Ok(Json(json!({ "message": message, "favorite": favorite })))
}

async fn toggle_watched(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let watched = media::toggle_watched(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    let message = if watched {
        "Marked as watched"
    } else {
        "Marked as unwatched"
    };
    Ok(Json(json!({ "message": message, "watched": watched })))
}

#[derive(Deserialize)]
struct PositionBody {
    position: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PositionState {
    position: f64,
    last_played: Option<String>,
}

async fn set_position(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<PositionBody>,
) -> Result<Json<Value>, AppError> {
    if !body.position.is_finite() || body.position < 0.0 {
        return Err(AppError::BadRequest(
            "Position must be a non-negative number of seconds".to_string(),
        ));
    }
    if !media::set_position(&state.pool, id, body.position).await? {
        return Err(not_found());
    }
    Ok(Json(json!({ "message": "Position saved" })))
}

async fn get_position(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PositionState>, AppError> {
    let item = media::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(PositionState {
        position: item.position,
        last_played: item.last_played,
    }))
}

async fn poster(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, AppError> {
    let item = media::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    let path = item
        .poster
        .ok_or_else(|| AppError::NotFound("Poster not found".to_string()))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("Poster not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(([(header::CONTENT_TYPE, image_content_type(&path))], bytes).into_response())
}

fn image_content_type(path: &str) -> &'static str {
    let ext = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
