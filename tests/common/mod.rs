#![allow(dead_code, unused_imports)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use mediashelf::config::Library;
use mediashelf::models::media::{MediaType, NewMedia};
use mediashelf::models::series::NewSeries;
use mediashelf::routes::{build_router, AppState};
use mediashelf::scanner::Scanner;
use mediashelf::tmdb::{
    EpisodeInfo, ImageSize, MetadataProvider, MovieCandidate, ProviderError, SeriesCandidate,
};

pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("failed to create test pool");

    mediashelf::db::run_migrations(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

/// Scripted provider: answers from lookup tables, optionally failing or
/// sleeping, and records every image fetch.
#[derive(Default)]
pub struct FakeProvider {
    movies: HashMap<String, Vec<MovieCandidate>>,
    series: HashMap<String, Vec<SeriesCandidate>>,
    seasons: HashMap<(i64, i64), Vec<EpisodeInfo>>,
    failing: HashSet<String>,
    failing_images: HashSet<String>,
    delay: Option<Duration>,
    pub image_fetches: Mutex<Vec<String>>,
    pub series_searches: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movie(mut self, query: &str, movie: MovieCandidate) -> Self {
        self.movies.entry(query.to_string()).or_default().push(movie);
        self
    }

    pub fn with_series(mut self, query: &str, series: SeriesCandidate) -> Self {
        self.series.entry(query.to_string()).or_default().push(series);
        self
    }

    pub fn with_season(mut self, series_id: i64, season: i64, episodes: Vec<EpisodeInfo>) -> Self {
        self.seasons.insert((series_id, season), episodes);
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    /// Image downloads whose remote path is `image_path` fail.
    pub fn failing_image(mut self, image_path: &str) -> Self {
        self.failing_images.insert(image_path.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self, url_suffix: &str) -> usize {
        self.image_fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.ends_with(url_suffix))
            .count()
    }

    async fn pause(&self) {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
    }

    fn check(&self, query: &str) -> Result<(), ProviderError> {
        if self.failing.contains(query) {
            Err(ProviderError::Status(503))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    async fn search_movie(
        &self,
        query: &str,
        _year: Option<i64>,
    ) -> Result<Vec<MovieCandidate>, ProviderError> {
        self.pause().await;
        self.check(query)?;
        Ok(self.movies.get(query).cloned().unwrap_or_default())
    }

    async fn search_series(&self, query: &str) -> Result<Vec<SeriesCandidate>, ProviderError> {
        self.series_searches.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check(query)?;
        Ok(self.series.get(query).cloned().unwrap_or_default())
    }

    async fn season_episodes(
        &self,
        series_id: i64,
        season: i64,
    ) -> Result<Vec<EpisodeInfo>, ProviderError> {
        self.pause().await;
        Ok(self
            .seasons
            .get(&(series_id, season))
            .cloned()
            .unwrap_or_default())
    }

    fn image_url(&self, image_path: &str, size: ImageSize) -> String {
        format!("https://images.test/{}{}", size.as_str(), image_path)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.pause().await;
        self.image_fetches.lock().unwrap().push(url.to_string());
        if self.failing_images.iter().any(|p| url.ends_with(p.as_str())) {
            return Err(ProviderError::Status(404));
        }
        Ok(format!("image:{url}").into_bytes())
    }
}

pub fn movie(id: i64, title: &str) -> MovieCandidate {
    MovieCandidate {
        id,
        title: Some(title.to_string()),
        ..MovieCandidate::default()
    }
}

pub fn show(id: i64, name: &str) -> SeriesCandidate {
    SeriesCandidate {
        id,
        name: Some(name.to_string()),
        ..SeriesCandidate::default()
    }
}

pub fn episode(number: i64, name: &str) -> EpisodeInfo {
    EpisodeInfo {
        episode_number: number,
        name: Some(name.to_string()),
        ..EpisodeInfo::default()
    }
}

/// A media root with empty Movies and Series folders.
pub fn media_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("Movies")).unwrap();
    std::fs::create_dir_all(dir.path().join("Series")).unwrap();
    dir
}

pub fn add_file(root: &Path, relative: &str, size: usize) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, vec![b'x'; size]).unwrap();
    path
}

pub fn test_library(root: &Path) -> Arc<Library> {
    Arc::new(Library::new(
        root.to_path_buf(),
        "Movies",
        "Series",
        &[".mp4".to_string(), ".mkv".to_string()],
    ))
}

pub fn test_scanner(
    pool: &SqlitePool,
    root: &Path,
    assets: &Path,
    provider: Option<Arc<FakeProvider>>,
) -> Scanner {
    let provider = provider.map(|p| p as Arc<dyn MetadataProvider>);
    Scanner::new(pool.clone(), test_library(root), provider, assets.to_path_buf(), 4)
}

pub fn test_app(pool: SqlitePool, scanner: Scanner) -> Router {
    build_router(AppState { pool, scanner })
}

/// App whose scanner has no provider and a non-existent media root.
pub fn offline_app(pool: SqlitePool) -> Router {
    let scanner = Scanner::new(
        pool.clone(),
        test_library(Path::new("/nonexistent-media-root")),
        None,
        PathBuf::from("/nonexistent-assets"),
        1,
    );
    test_app(pool, scanner)
}

pub async fn insert_movie(pool: &SqlitePool, title: &str, path: &str) -> i64 {
    let mut record = NewMedia::minimal(
        path.to_string(),
        Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        1_000_000,
        title.to_string(),
        MediaType::Movie,
    );
    record.genre = "Drama".to_string();
    mediashelf::models::media::insert(pool, &record)
        .await
        .expect("insert movie failed")
        .expect("movie path already cataloged")
}

pub async fn insert_series(pool: &SqlitePool, title: &str, genre: &str) -> i64 {
    let record = NewSeries {
        genre: genre.to_string(),
        ..NewSeries::titled(title)
    };
    mediashelf::models::series::insert_if_absent(pool, &record)
        .await
        .expect("insert series failed")
}

pub async fn insert_episode(
    pool: &SqlitePool,
    series_id: i64,
    title: &str,
    path: &str,
    season: i64,
    episode: i64,
) -> i64 {
    let mut record = NewMedia::minimal(
        path.to_string(),
        "episode.mp4".to_string(),
        2_000_000,
        title.to_string(),
        MediaType::Episode,
    );
    record.series_id = Some(series_id);
    record.season = Some(season);
    record.episode = Some(episode);
    mediashelf::models::media::insert(pool, &record)
        .await
        .expect("insert episode failed")
        .expect("episode path already cataloged")
}

pub async fn media_count(pool: &SqlitePool) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM media")
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

pub async fn series_count(pool: &SqlitePool) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM series")
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with_range(uri: &str, range: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("range", range)
        .body(Body::empty())
        .unwrap()
}

pub fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn patch(uri: &str) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn put_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: axum::http::Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes()
        .to_vec()
}

pub async fn body_string(response: axum::http::Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("body not utf8")
}

pub async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body not json")
}

pub fn header<'a>(response: &'a axum::http::Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}
