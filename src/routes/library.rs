use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::extract::ApiPath;
use crate::models::media::{self, Media, Stats};
use crate::models::series;
use crate::routes::AppState;
use crate::tmdb::genres::distinct_genres;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/media", get(list_library))
        .route("/api/media/genres", get(list_genres))
        .route("/api/media/search", get(search))
        .route("/api/media/favorites", get(list_favorites))
        .route("/api/media/watched", get(list_watched))
        .route("/api/media/stats", get(stats))
        .route("/api/media/{id}", get(get_media))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    #[serde(default)]
    genre: Option<String>,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    page: Option<String>,
    #[serde(default)]
    limit: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TypeFilter {
    All,
    Movies,
    Series,
}

impl TypeFilter {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("movie") => TypeFilter::Movies,
            Some("tvSeries") | Some("series") | Some("episode") => TypeFilter::Series,
            _ => TypeFilter::All,
        }
    }
}

/// One browsable entry: a series with its episodes, or a movie wrapping itself.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub id: i64,
    pub title: String,
    pub overview: String,
    pub genre: String,
    pub poster: Option<String>,
    pub backdrop: Option<String>,
    pub media_type: String,
    pub episodes: Vec<Media>,
}

impl From<Media> for LibraryEntry {
    fn from(m: Media) -> Self {
        LibraryEntry {
            id: m.id,
            title: m.title.clone(),
            overview: m.description.clone(),
            genre: m.genre.clone(),
            poster: m.poster.clone(),
            backdrop: m.backdrop.clone(),
            media_type: m.media_type.clone(),
            episodes: vec![m],
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub limit: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    fn new(total: usize, page: usize, limit: usize) -> Self {
        let total_pages = total.div_ceil(limit);
        Pagination {
            total,
            total_pages,
            current_page: page,
            limit,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Serialize)]
struct LibraryPage {
    series: Vec<LibraryEntry>,
    pagination: Pagination,
}

async fn list_library(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<LibraryPage>, AppError> {
    let genre = query.genre.as_deref().map(str::trim).filter(|g| !g.is_empty());
    let filter = TypeFilter::parse(query.media_type.as_deref());
    let page = query
        .page
        .as_deref()
        .and_then(|p| p.parse::<usize>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let limit = query
        .limit
        .as_deref()
        .and_then(|l| l.parse::<usize>().ok())
        .filter(|l| *l >= 1)
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT);

    let mut entries: Vec<LibraryEntry> = Vec::new();
    if filter != TypeFilter::Movies {
        for s in series::list(&state.pool, genre).await? {
            let episodes = media::list_episodes(&state.pool, s.id).await?;
            entries.push(LibraryEntry {
                id: s.id,
                title: s.title,
                overview: s.overview,
                genre: s.genre,
                poster: s.poster,
                backdrop: s.backdrop,
                media_type: s.media_type,
                episodes,
            });
        }
    }
    if filter != TypeFilter::Series {
        entries.extend(
            media::list_movies(&state.pool, genre)
                .await?
                .into_iter()
                .map(LibraryEntry::from),
        );
    }
    entries.sort_by(|a, b| {
        a.title
            .to_lowercase()
            .cmp(&b.title.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });

    let pagination = Pagination::new(entries.len(), page, limit);
    let series = entries
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();

    Ok(Json(LibraryPage { series, pagination }))
}

async fn list_genres(State(pool): State<SqlitePool>) -> Result<Json<Vec<String>>, AppError> {
    let stored = media::genre_strings(&pool).await?;
    Ok(Json(distinct_genres(&stored)))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesHit {
    name: String,
    overview: String,
    poster: Option<String>,
    year: String,
    genre: String,
    rating: f64,
    media_type: &'static str,
    episodes: Vec<Media>,
}

#[derive(Serialize)]
struct SearchResults {
    movies: Vec<Media>,
    series: Vec<SeriesHit>,
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, AppError> {
    let term = query.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(AppError::BadRequest("Search query is required".to_string()));
    }

    let movies = media::search_movies(&state.pool, term).await?;
    let mut hits = Vec::new();
    for s in series::search(&state.pool, term).await? {
        let episodes = media::list_episodes(&state.pool, s.id).await?;
        hits.push(SeriesHit {
            name: s.title,
            overview: s.overview,
            poster: s.poster,
            year: s.first_air_year,
            genre: s.genre,
            rating: s.vote_average,
            media_type: "tvSeries",
            episodes,
        });
    }

    Ok(Json(SearchResults {
        movies,
        series: hits,
    }))
}

async fn list_favorites(State(pool): State<SqlitePool>) -> Result<Json<Vec<Media>>, AppError> {
    Ok(Json(media::list_favorites(&pool).await?))
}

async fn list_watched(State(pool): State<SqlitePool>) -> Result<Json<Vec<Media>>, AppError> {
    Ok(Json(media::list_watched(&pool).await?))
}

async fn stats(State(pool): State<SqlitePool>) -> Result<Json<Stats>, AppError> {
    Ok(Json(media::stats(&pool).await?))
}

async fn get_media(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Media>, AppError> {
    let item = media::get_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;
    Ok(Json(item))
}
