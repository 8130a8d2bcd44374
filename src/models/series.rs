use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, sqlx::FromRow, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: i64,
    pub title: String,
    pub tmdb_id: Option<i64>,
    pub original_name: String,
    pub overview: String,
    pub first_air_year: String,
    pub genre: String,
    pub original_language: String,
    pub origin_country: String,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i64,
    pub media_type: String,
    pub poster: Option<String>,
    pub backdrop: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewSeries {
    pub title: String,
    pub tmdb_id: Option<i64>,
    pub original_name: String,
    pub overview: String,
    pub first_air_year: String,
    pub genre: String,
    pub original_language: String,
    pub origin_country: Vec<String>,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i64,
    pub poster: Option<String>,
    pub backdrop: Option<String>,
}

impl NewSeries {
    pub fn titled(title: &str) -> Self {
        NewSeries {
            title: title.to_string(),
            ..NewSeries::default()
        }
    }
}

pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Series>, sqlx::Error> {
    sqlx::query_as::<_, Series>("SELECT * FROM series WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_title(pool: &SqlitePool, title: &str) -> Result<Option<Series>, sqlx::Error> {
    sqlx::query_as::<_, Series>("SELECT * FROM series WHERE title = ?")
        .bind(title)
        .fetch_optional(pool)
        .await
}

/// Insert the series unless a row with the same title exists, then return the
/// id of whichever row owns the title. An existing row is never overwritten.
pub async fn insert_if_absent(pool: &SqlitePool, record: &NewSeries) -> Result<i64, sqlx::Error> {
    let origin_country =
        serde_json::to_string(&record.origin_country).unwrap_or_else(|_| "[]".to_string());

    sqlx::query(
        "INSERT INTO series (title, tmdb_id, original_name, overview, first_air_year, genre,
                             original_language, origin_country, popularity, vote_average,
                             vote_count, poster, backdrop)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(title) DO NOTHING",
    )
    .bind(&record.title)
    .bind(record.tmdb_id)
    .bind(&record.original_name)
    .bind(&record.overview)
    .bind(&record.first_air_year)
    .bind(&record.genre)
    .bind(&record.original_language)
    .bind(origin_country)
    .bind(record.popularity)
    .bind(record.vote_average)
    .bind(record.vote_count)
    .bind(&record.poster)
    .bind(&record.backdrop)
    .execute(pool)
    .await?;

    let row: (i64,) = sqlx::query_as("SELECT id FROM series WHERE title = ?")
        .bind(&record.title)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn list(pool: &SqlitePool, genre: Option<&str>) -> Result<Vec<Series>, sqlx::Error> {
    sqlx::query_as::<_, Series>(
        "SELECT * FROM series
         WHERE (? IS NULL OR genre LIKE '%' || ? || '%')
         ORDER BY title",
    )
    .bind(genre)
    .bind(genre)
    .fetch_all(pool)
    .await
}

/// Series whose title matches, or that own an episode whose title matches.
pub async fn search(pool: &SqlitePool, term: &str) -> Result<Vec<Series>, sqlx::Error> {
    sqlx::query_as::<_, Series>(
        "SELECT * FROM series s
         WHERE s.title LIKE '%' || ? || '%'
            OR EXISTS (SELECT 1 FROM media m
                       WHERE m.series_id = s.id AND m.title LIKE '%' || ? || '%')
         ORDER BY s.title",
    )
    .bind(term)
    .bind(term)
    .fetch_all(pool)
    .await
}
