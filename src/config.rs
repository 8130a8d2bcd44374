use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    #[serde(default = "default_movies_dir")]
    pub movies_dir: String,
    #[serde(default = "default_series_dir")]
    pub series_dir: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    pub tmdb_api_key: Option<String>,
    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,
    #[serde(default = "default_true")]
    pub watch: bool,
    #[serde(default)]
    pub scan_on_startup: bool,
}

fn default_database_url() -> String {
    "sqlite://mediashelf.db".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_media_root() -> PathBuf {
    PathBuf::from("/media")
}

fn default_movies_dir() -> String {
    "Movies".to_string()
}

fn default_series_dir() -> String {
    "Series".to_string()
}

fn default_extensions() -> Vec<String> {
    [".mp4", ".mkv", ".avi", ".mov", ".m4v", ".webm"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_tmdb_language() -> String {
    "en-US".to_string()
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("posters")
}

fn default_scan_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: default_database_url(),
            listen_addr: default_listen_addr(),
            media_root: default_media_root(),
            movies_dir: default_movies_dir(),
            series_dir: default_series_dir(),
            extensions: default_extensions(),
            tmdb_api_key: None,
            tmdb_language: default_tmdb_language(),
            assets_dir: default_assets_dir(),
            scan_concurrency: default_scan_concurrency(),
            watch: true,
            scan_on_startup: false,
        }
    }
}

impl AppConfig {
    /// Load from an optional TOML file. Without a file every field takes its default.
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let config: AppConfig = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| format!("failed to read config file '{path}': {e}"))?;
                toml::from_str(&content)?
            }
            None => AppConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for ext in &self.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(format!("extension {ext:?} must start with a dot").into());
            }
        }
        if self.scan_concurrency == 0 {
            return Err("scan_concurrency must be at least 1".into());
        }
        if self.movies_dir.is_empty() || self.series_dir.is_empty() {
            return Err("movies_dir and series_dir must not be empty".into());
        }
        Ok(())
    }

    /// The non-empty API key, if one is configured.
    pub fn api_key(&self) -> Option<&str> {
        self.tmdb_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn library(&self) -> Library {
        let media_root =
            std::path::absolute(&self.media_root).unwrap_or_else(|_| self.media_root.clone());
        Library::new(
            media_root,
            &self.movies_dir,
            &self.series_dir,
            &self.extensions,
        )
    }
}

/// Immutable description of the media tree shared by the walker, the title
/// extractor and the reconciler.
#[derive(Debug, Clone)]
pub struct Library {
    pub media_root: PathBuf,
    pub movies_dir: String,
    pub series_dir: String,
    extensions: HashSet<String>,
}

impl Library {
    pub fn new(media_root: PathBuf, movies_dir: &str, series_dir: &str, extensions: &[String]) -> Self {
        Library {
            media_root,
            movies_dir: movies_dir.to_string(),
            series_dir: series_dir.to_string(),
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    pub fn movies_root(&self) -> PathBuf {
        self.media_root.join(&self.movies_dir)
    }

    pub fn series_root(&self) -> PathBuf {
        self.media_root.join(&self.series_dir)
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        vec![self.movies_root(), self.series_root()]
    }

    /// Case-insensitive check against the accepted extension set.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&format!(".{}", e.to_lowercase())))
            .unwrap_or(false)
    }
}
