pub mod library;
pub mod playback;
pub mod scan;

use crate::scanner::Scanner;
use axum::Router;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub scanner: Scanner,
}

impl axum::extract::FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(library::router())
        .merge(playback::router())
        .merge(scan::router())
        .with_state(state)
}
