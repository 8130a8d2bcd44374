use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::{AssetError, AssetStore};
use crate::config::Library;
use crate::models::media::{self, MediaType, NewMedia};
use crate::models::series::{self, NewSeries, Series};
use crate::scanner::parse;
use crate::tmdb::genres::genre_names;
use crate::tmdb::{
    best_movie, year_of, EpisodeInfo, ImageSize, MetadataProvider, ProviderError,
    SeriesCandidate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The path was already cataloged.
    Skipped,
    Inserted(i64),
}

#[derive(Debug)]
pub enum ReconcileError {
    Unclassified(PathBuf),
    NonUtf8Path(PathBuf),
    MissingSeriesName(PathBuf),
    Provider(ProviderError),
    Asset(AssetError),
    Io(std::io::Error),
    Database(sqlx::Error),
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileError::Unclassified(p) => {
                write!(f, "{} is neither under the movies nor the series root", p.display())
            }
            ReconcileError::NonUtf8Path(p) => {
                write!(f, "{} is not a valid UTF-8 path", p.display())
            }
            ReconcileError::MissingSeriesName(p) => {
                write!(f, "{} has no series directory below the series root", p.display())
            }
            ReconcileError::Provider(e) => write!(f, "{e}"),
            ReconcileError::Asset(e) => write!(f, "{e}"),
            ReconcileError::Io(e) => write!(f, "filesystem error: {e}"),
            ReconcileError::Database(e) => write!(f, "database error: {e}"),
        }
    }
}

impl std::error::Error for ReconcileError {}

impl From<ProviderError> for ReconcileError {
    fn from(e: ProviderError) -> Self {
        ReconcileError::Provider(e)
    }
}

impl From<AssetError> for ReconcileError {
    fn from(e: AssetError) -> Self {
        ReconcileError::Asset(e)
    }
}

impl From<std::io::Error> for ReconcileError {
    fn from(e: std::io::Error) -> Self {
        ReconcileError::Io(e)
    }
}

impl From<sqlx::Error> for ReconcileError {
    fn from(e: sqlx::Error) -> Self {
        ReconcileError::Database(e)
    }
}

/// Matches discovered files against the provider and writes one catalog row per file.
#[derive(Clone)]
pub struct Reconciler {
    pool: SqlitePool,
    library: Arc<Library>,
    provider: Arc<dyn MetadataProvider>,
    assets: AssetStore,
}

impl Reconciler {
    pub fn new(
        pool: SqlitePool,
        library: Arc<Library>,
        provider: Arc<dyn MetadataProvider>,
        assets_dir: PathBuf,
    ) -> Self {
        let assets = AssetStore::new(assets_dir, provider.clone());
        Self {
            pool,
            library,
            provider,
            assets,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub async fn reconcile(&self, path: &Path) -> Result<Outcome, ReconcileError> {
        let filepath = path
            .to_str()
            .ok_or_else(|| ReconcileError::NonUtf8Path(path.to_path_buf()))?
            .to_string();
        if media::find_by_filepath(&self.pool, &filepath).await?.is_some() {
            tracing::debug!("Already cataloged: {filepath}");
            return Ok(Outcome::Skipped);
        }

        let media_type = parse::classify(path, &self.library)
            .ok_or_else(|| ReconcileError::Unclassified(path.to_path_buf()))?;
        let meta = tokio::fs::metadata(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| filepath.clone());
        let query = parse::query_from_filename(&filename);

        let mut record = NewMedia::minimal(
            filepath,
            filename,
            meta.len() as i64,
            query.clone(),
            media_type,
        );
        match media_type {
            MediaType::Movie => self.resolve_movie(&query, &mut record).await?,
            MediaType::Episode => self.resolve_episode(path, &query, &mut record).await?,
        }

        match media::insert(&self.pool, &record).await? {
            Some(id) => {
                tracing::info!(
                    id,
                    media_type = media_type.as_str(),
                    title = %record.title,
                    path = %record.filepath,
                    "Cataloged media"
                );
                Ok(Outcome::Inserted(id))
            }
            None => Ok(Outcome::Skipped),
        }
    }

    async fn resolve_movie(&self, query: &str, record: &mut NewMedia) -> Result<(), ReconcileError> {
        let (search_title, year) = parse::split_title_year(query);
        let mut candidates = self.provider.search_movie(&search_title, year).await?;
        if candidates.is_empty() && year.is_some() {
            // Filename years are often off by one from the provider's release date.
            candidates = self.provider.search_movie(&search_title, None).await?;
        }
        let Some(movie) = best_movie(candidates, year) else {
            tracing::debug!("No provider match for movie {query:?}");
            return Ok(());
        };

        record.title = non_empty(movie.title).unwrap_or_else(|| query.to_string());
        record.description = movie.overview.unwrap_or_default();
        record.year = year_of(movie.release_date.as_deref());
        record.genre = genre_names(&movie.genre_ids);
        record.language = movie.original_language.unwrap_or_default();
        record.rating = movie.vote_average.unwrap_or(0.0);

        // Remakes share a title; the year keeps their artwork apart.
        let owner = match record.year.as_str() {
            "" => record.title.clone(),
            y => format!("{} ({y})", record.title),
        };
        if let Some(poster) = non_empty(movie.poster_path) {
            let local = self
                .assets
                .store(&owner, "poster", &poster, ImageSize::Poster)
                .await?;
            record.poster = Some(local.to_string_lossy().to_string());
        }
        if let Some(backdrop) = non_empty(movie.backdrop_path) {
            let local = self
                .assets
                .store(&owner, "backdrop", &backdrop, ImageSize::Backdrop)
                .await?;
            record.backdrop = Some(local.to_string_lossy().to_string());
        }
        Ok(())
    }

    async fn resolve_episode(
        &self,
        path: &Path,
        query: &str,
        record: &mut NewMedia,
    ) -> Result<(), ReconcileError> {
        let location = parse::episode_location(path, &self.library)
            .ok_or_else(|| ReconcileError::MissingSeriesName(path.to_path_buf()))?;
        record.season = Some(location.season);
        record.episode = Some(location.episode);

        let show = self.ensure_series(&location.series_name).await?;
        record.series_id = Some(show.row.id);
        record.genre = show.row.genre.clone();
        record.language = show.row.original_language.clone();

        let episode: Option<EpisodeInfo> = match show.provider_id {
            Some(provider_id) => self
                .provider
                .season_episodes(provider_id, location.season)
                .await?
                .into_iter()
                .find(|e| e.episode_number == location.episode),
            None => None,
        };

        let series_title = show.provider_id.map(|_| show.row.title.clone());
        let (ep_name, ep_overview, ep_air_date, ep_still, ep_rating) = match episode {
            Some(e) => (
                non_empty(e.name),
                non_empty(e.overview),
                e.air_date,
                non_empty(e.still_path),
                e.vote_average.filter(|v| *v > 0.0),
            ),
            None => (None, None, None, None, None),
        };

        record.title = ep_name
            .or(series_title)
            .unwrap_or_else(|| query.to_string());
        record.description = ep_overview.unwrap_or_else(|| show.row.overview.clone());
        record.year = match year_of(ep_air_date.as_deref()) {
            y if !y.is_empty() => y,
            _ => show.row.first_air_year.clone(),
        };
        record.rating = ep_rating.unwrap_or(show.row.vote_average);
        record.backdrop = show.row.backdrop.clone();
        record.poster = match ep_still {
            Some(still) => {
                let kind = format!("s{:02}e{:02}", location.season, location.episode);
                let local = self
                    .assets
                    .store(&show.row.title, &kind, &still, ImageSize::Still)
                    .await?;
                Some(local.to_string_lossy().to_string())
            }
            None => show.row.poster.clone(),
        };
        Ok(())
    }

    /// Find or create the series row for a show name. Existing rows are reused as
    /// they are; a new row is created even when the provider has no match.
    async fn ensure_series(&self, name: &str) -> Result<ResolvedSeries, ReconcileError> {
        if let Some(row) = series::find_by_title(&self.pool, name).await? {
            let provider_id = match row.tmdb_id {
                Some(id) => Some(id),
                None => self
                    .provider
                    .search_series(name)
                    .await?
                    .first()
                    .map(|c| c.id),
            };
            return Ok(ResolvedSeries { row, provider_id });
        }

        let candidate = self.provider.search_series(name).await?.into_iter().next();
        let provider_id = candidate.as_ref().map(|c| c.id);
        let record = match candidate {
            Some(c) => self.series_record(name, c).await?,
            None => {
                tracing::debug!("No provider match for series {name:?}");
                NewSeries::titled(name)
            }
        };

        // A concurrent reconcile may own the title by now; use whichever row won.
        let id = series::insert_if_absent(&self.pool, &record).await?;
        let row = series::get_by_id(&self.pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(ResolvedSeries {
            provider_id: row.tmdb_id.or(provider_id),
            row,
        })
    }

    async fn series_record(
        &self,
        name: &str,
        c: SeriesCandidate,
    ) -> Result<NewSeries, ReconcileError> {
        let mut record = NewSeries {
            title: name.to_string(),
            tmdb_id: Some(c.id),
            original_name: c.original_name.unwrap_or_default(),
            overview: c.overview.unwrap_or_default(),
            first_air_year: year_of(c.first_air_date.as_deref()),
            genre: genre_names(&c.genre_ids),
            original_language: c.original_language.unwrap_or_default(),
            origin_country: c.origin_country,
            popularity: c.popularity.unwrap_or(0.0),
            vote_average: c.vote_average.unwrap_or(0.0),
            vote_count: c.vote_count.unwrap_or(0),
            poster: None,
            backdrop: None,
        };
        if let Some(poster) = non_empty(c.poster_path) {
            let local = self
                .assets
                .store(name, "poster", &poster, ImageSize::Poster)
                .await?;
            record.poster = Some(local.to_string_lossy().to_string());
        }
        if let Some(backdrop) = non_empty(c.backdrop_path) {
            let local = self
                .assets
                .store(name, "backdrop", &backdrop, ImageSize::Backdrop)
                .await?;
            record.backdrop = Some(local.to_string_lossy().to_string());
        }
        Ok(record)
    }
}

struct ResolvedSeries {
    row: Series,
    provider_id: Option<i64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
