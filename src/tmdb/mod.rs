pub mod genres;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const TMDB_BASE: &str = "https://api.themoviedb.org";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum ProviderError {
    Http(reqwest::Error),
    Status(u16),
    RateLimited,
    Decode(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Http(e) => write!(f, "provider request failed: {e}"),
            ProviderError::Status(code) => write!(f, "provider returned HTTP {code}"),
            ProviderError::RateLimited => write!(f, "provider rate limit exceeded"),
            ProviderError::Decode(msg) => write!(f, "provider response could not be decoded: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Http(e)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieCandidate {
    pub id: i64,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    pub original_language: Option<String>,
    pub vote_average: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeriesCandidate {
    pub id: i64,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    pub original_language: Option<String>,
    #[serde(default)]
    pub origin_country: Vec<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpisodeInfo {
    pub episode_number: i64,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub still_path: Option<String>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Poster,
    Backdrop,
    Still,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Poster => "w500",
            ImageSize::Backdrop => "w1280",
            ImageSize::Still => "w300",
        }
    }
}

/// Source of external movie/TV metadata. Candidate lists are ordered best-first
/// and may be empty.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// `year`, when known, narrows the search to that release year.
    async fn search_movie(
        &self,
        query: &str,
        year: Option<i64>,
    ) -> Result<Vec<MovieCandidate>, ProviderError>;

    async fn search_series(&self, query: &str) -> Result<Vec<SeriesCandidate>, ProviderError>;

    async fn season_episodes(
        &self,
        series_id: i64,
        season: i64,
    ) -> Result<Vec<EpisodeInfo>, ProviderError>;

    fn image_url(&self, image_path: &str, size: ImageSize) -> String;

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}

#[derive(Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct SeasonResponse {
    #[serde(default)]
    episodes: Vec<EpisodeInfo>,
}

#[derive(Clone)]
pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn new(api_key: String, language: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            language,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let mut params = vec![
            ("api_key", self.api_key.as_str()),
            ("language", self.language.as_str()),
        ];
        params.extend_from_slice(extra);

        let resp = self
            .client
            .get(format!("{TMDB_BASE}/3{path}"))
            .query(&params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        check_status(&resp)?;
        Ok(resp.json::<T>().await?)
    }
}

fn check_status(resp: &reqwest::Response) -> Result<(), ProviderError> {
    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Err(ProviderError::RateLimited)
    } else if !status.is_success() {
        Err(ProviderError::Status(status.as_u16()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn search_movie(
        &self,
        query: &str,
        year: Option<i64>,
    ) -> Result<Vec<MovieCandidate>, ProviderError> {
        let year_str = year.map(|y| y.to_string());
        let mut params = vec![("query", query)];
        if let Some(ref y) = year_str {
            params.push(("year", y.as_str()));
        }
        let resp: SearchResponse<MovieCandidate> = self.get_json("/search/movie", &params).await?;
        Ok(resp.results)
    }

    async fn search_series(&self, query: &str) -> Result<Vec<SeriesCandidate>, ProviderError> {
        let resp: SearchResponse<SeriesCandidate> =
            self.get_json("/search/tv", &[("query", query)]).await?;
        Ok(resp.results)
    }

    async fn season_episodes(
        &self,
        series_id: i64,
        season: i64,
    ) -> Result<Vec<EpisodeInfo>, ProviderError> {
        let resp: SeasonResponse = self
            .get_json(&format!("/tv/{series_id}/season/{season}"), &[])
            .await?;
        Ok(resp.episodes)
    }

    fn image_url(&self, image_path: &str, size: ImageSize) -> String {
        image_url(image_path, size)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let resp = self.client.get(url).timeout(REQUEST_TIMEOUT).send().await?;
        check_status(&resp)?;
        Ok(resp.bytes().await?.to_vec())
    }
}

pub fn image_url(image_path: &str, size: ImageSize) -> String {
    if image_path.starts_with('/') {
        format!("{TMDB_IMAGE_BASE}/{}{image_path}", size.as_str())
    } else {
        format!("{TMDB_IMAGE_BASE}/{}/{image_path}", size.as_str())
    }
}

/// The candidate released in `year` if there is one, else the first.
pub fn best_movie(candidates: Vec<MovieCandidate>, year: Option<i64>) -> Option<MovieCandidate> {
    let wanted = year.map(|y| y.to_string());
    let pos = wanted
        .and_then(|w| {
            candidates
                .iter()
                .position(|c| year_of(c.release_date.as_deref()) == w)
        })
        .unwrap_or(0);
    candidates.into_iter().nth(pos)
}

/// Four-digit year prefix of a provider date, or empty.
pub fn year_of(date: Option<&str>) -> String {
    match date {
        Some(d) if d.len() >= 4 && d.as_bytes()[..4].iter().all(u8::is_ascii_digit) => {
            d[..4].to_string()
        }
        _ => String::new(),
    }
}
