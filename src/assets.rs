use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::tmdb::{ImageSize, MetadataProvider, ProviderError};

#[derive(Debug)]
pub enum AssetError {
    Provider(ProviderError),
    Io(std::io::Error),
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetError::Provider(e) => write!(f, "image download failed: {e}"),
            AssetError::Io(e) => write!(f, "image could not be stored: {e}"),
        }
    }
}

impl std::error::Error for AssetError {}

impl From<ProviderError> for AssetError {
    fn from(e: ProviderError) -> Self {
        AssetError::Provider(e)
    }
}

impl From<std::io::Error> for AssetError {
    fn from(e: std::io::Error) -> Self {
        AssetError::Io(e)
    }
}

/// Downloads provider artwork into `<root>/<sanitized owner>/<kind>.<ext>`.
/// A path that already exists on disk is never fetched again.
#[derive(Clone)]
pub struct AssetStore {
    root: PathBuf,
    provider: Arc<dyn MetadataProvider>,
    in_flight: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AssetStore {
    pub fn new(root: PathBuf, provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            root,
            provider,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn path_for(&self, owner: &str, kind: &str, remote_path: &str) -> PathBuf {
        let ext = Path::new(remote_path)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("jpg")
            .to_lowercase();
        self.root
            .join(sanitize_title(owner))
            .join(format!("{}.{ext}", sanitize_title(kind)))
    }

    /// Fetch `remote_path` at `size` unless it is already stored. Returns the local path.
    pub async fn store(
        &self,
        owner: &str,
        kind: &str,
        remote_path: &str,
        size: ImageSize,
    ) -> Result<PathBuf, AssetError> {
        let dest = self.path_for(owner, kind, remote_path);
        let lock = self.lock_for(&dest);
        let result = {
            let _guard = lock.lock().await;
            self.fetch_into(&dest, remote_path, size).await
        };
        drop(lock);
        self.release(&dest);
        result.map(|_| dest)
    }

    async fn fetch_into(
        &self,
        dest: &Path,
        remote_path: &str,
        size: ImageSize,
    ) -> Result<(), AssetError> {
        if tokio::fs::try_exists(dest).await? {
            tracing::debug!("Asset already present: {}", dest.display());
            return Ok(());
        }

        let url = self.provider.image_url(remote_path, size);
        let bytes = self.provider.fetch_image(&url).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = part_path(dest);
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, dest).await?;
        tracing::debug!("Stored asset {} ({} bytes)", dest.display(), bytes.len());
        Ok(())
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(path.to_path_buf()).or_default().clone()
    }

    fn release(&self, path: &Path) {
        let mut map = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = map.get(path) {
            // Only the map itself still holds it.
            if Arc::strong_count(lock) == 1 {
                map.remove(path);
            }
        }
    }
}

/// In-progress download path: the full destination name plus `.part`.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Reduce a title to a single safe path segment.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').trim();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}
