use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, sqlx::FromRow, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub filepath: String,
    pub filename: String,
    #[serde(rename = "size")]
    pub size_bytes: i64,
    pub year: String,
    pub genre: String,
    pub language: String,
    pub rating: f64,
    pub media_type: String,
    pub season: Option<i64>,
    pub episode: Option<i64>,
    pub poster: Option<String>,
    pub backdrop: Option<String>,
    pub favorite: bool,
    pub watched: bool,
    pub position: f64,
    pub last_played: Option<String>,
    pub series_id: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Movie,
    Episode,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Episode => "episode",
        }
    }
}

/// A fully reconciled row, ready to be written once.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub filepath: String,
    pub filename: String,
    pub size_bytes: i64,
    pub title: String,
    pub description: String,
    pub year: String,
    pub genre: String,
    pub language: String,
    pub rating: f64,
    pub media_type: MediaType,
    pub season: Option<i64>,
    pub episode: Option<i64>,
    pub poster: Option<String>,
    pub backdrop: Option<String>,
    pub series_id: Option<i64>,
}

impl NewMedia {
    /// Filename-derived record with every descriptive field at its default.
    pub fn minimal(
        filepath: String,
        filename: String,
        size_bytes: i64,
        title: String,
        media_type: MediaType,
    ) -> Self {
        NewMedia {
            filepath,
            filename,
            size_bytes,
            title,
            description: String::new(),
            year: String::new(),
            genre: String::new(),
            language: String::new(),
            rating: 0.0,
            media_type,
            season: None,
            episode: None,
            poster: None,
            backdrop: None,
            series_id: None,
        }
    }
}

pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Media>, sqlx::Error> {
    sqlx::query_as::<_, Media>("SELECT * FROM media WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_filepath(pool: &SqlitePool, filepath: &str) -> Result<Option<Media>, sqlx::Error> {
    sqlx::query_as::<_, Media>("SELECT * FROM media WHERE filepath = ?")
        .bind(filepath)
        .fetch_optional(pool)
        .await
}

/// Insert a new row unless one already exists for the same filepath.
/// Returns `None` when the path was already cataloged.
pub async fn insert(pool: &SqlitePool, record: &NewMedia) -> Result<Option<i64>, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO media (filepath, filename, size_bytes, title, description, year, genre,
                            language, rating, media_type, season, episode, poster, backdrop, series_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(filepath) DO NOTHING",
    )
    .bind(&record.filepath)
    .bind(&record.filename)
    .bind(record.size_bytes)
    .bind(&record.title)
    .bind(&record.description)
    .bind(&record.year)
    .bind(&record.genre)
    .bind(&record.language)
    .bind(record.rating)
    .bind(record.media_type.as_str())
    .bind(record.season)
    .bind(record.episode)
    .bind(&record.poster)
    .bind(&record.backdrop)
    .bind(record.series_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        Ok(None)
    } else {
        Ok(Some(result.last_insert_rowid()))
    }
}

pub async fn list_filepaths(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT filepath FROM media")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn list_movies(pool: &SqlitePool, genre: Option<&str>) -> Result<Vec<Media>, sqlx::Error> {
    sqlx::query_as::<_, Media>(
        "SELECT * FROM media
         WHERE media_type = 'movie' AND (? IS NULL OR genre LIKE '%' || ? || '%')
         ORDER BY title, id",
    )
    .bind(genre)
    .bind(genre)
    .fetch_all(pool)
    .await
}

pub async fn list_episodes(pool: &SqlitePool, series_id: i64) -> Result<Vec<Media>, sqlx::Error> {
    sqlx::query_as::<_, Media>(
        "SELECT * FROM media WHERE series_id = ? AND media_type = 'episode'
         ORDER BY season, episode, title",
    )
    .bind(series_id)
    .fetch_all(pool)
    .await
}

pub async fn search_movies(pool: &SqlitePool, term: &str) -> Result<Vec<Media>, sqlx::Error> {
    sqlx::query_as::<_, Media>(
        "SELECT * FROM media WHERE media_type = 'movie' AND title LIKE '%' || ? || '%'
         ORDER BY title",
    )
    .bind(term)
    .fetch_all(pool)
    .await
}

pub async fn list_favorites(pool: &SqlitePool) -> Result<Vec<Media>, sqlx::Error> {
    sqlx::query_as::<_, Media>("SELECT * FROM media WHERE favorite = 1 ORDER BY title")
        .fetch_all(pool)
        .await
}

pub async fn list_watched(pool: &SqlitePool) -> Result<Vec<Media>, sqlx::Error> {
    sqlx::query_as::<_, Media>(
        "SELECT * FROM media WHERE watched = 1 ORDER BY last_played DESC, title",
    )
    .fetch_all(pool)
    .await
}

/// Flip the favorite flag. Returns the new value, or `None` for an unknown id.
pub async fn toggle_favorite(pool: &SqlitePool, id: i64) -> Result<Option<bool>, sqlx::Error> {
    let row: Option<(bool,)> =
        sqlx::query_as("UPDATE media SET favorite = NOT favorite WHERE id = ? RETURNING favorite")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|r| r.0))
}

pub async fn toggle_watched(pool: &SqlitePool, id: i64) -> Result<Option<bool>, sqlx::Error> {
    let row: Option<(bool,)> =
        sqlx::query_as("UPDATE media SET watched = NOT watched WHERE id = ? RETURNING watched")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|r| r.0))
}

pub async fn set_position(pool: &SqlitePool, id: i64, position: f64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE media SET position = ?, last_played = datetime('now') WHERE id = ?",
    )
    .bind(position)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Every genre string stored on media and series rows.
pub async fn genre_strings(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT genre FROM media WHERE genre != ''
         UNION SELECT genre FROM series WHERE genre != ''",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

#[derive(Debug, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_media: i64,
    pub movies: i64,
    pub episodes: i64,
    pub series: i64,
    pub favorites: i64,
    pub watched: i64,
    pub total_size: i64,
}

pub async fn stats(pool: &SqlitePool) -> Result<Stats, sqlx::Error> {
    sqlx::query_as::<_, Stats>(
        "SELECT
           COUNT(*) AS total_media,
           COALESCE(SUM(media_type = 'movie'), 0) AS movies,
           COALESCE(SUM(media_type = 'episode'), 0) AS episodes,
           (SELECT COUNT(*) FROM series) AS series,
           COALESCE(SUM(favorite), 0) AS favorites,
           COALESCE(SUM(watched), 0) AS watched,
           COALESCE(SUM(size_bytes), 0) AS total_size
         FROM media",
    )
    .fetch_one(pool)
    .await
}
