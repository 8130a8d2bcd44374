pub mod parse;
pub mod reconcile;
pub mod walk;

use futures::stream::{self, StreamExt};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Library;
use crate::models::media;
use crate::tmdb::MetadataProvider;
use reconcile::{Outcome, Reconciler};
use walk::WalkError;

#[derive(Debug, Default, Clone)]
pub struct ScanSummary {
    pub discovered: usize,
    pub skipped: usize,
    pub processed: usize,
    pub failed: usize,
    pub walk_errors: Vec<WalkError>,
}

impl std::fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scan complete: {} files found, {} new, {} already cataloged, {} failed",
            self.discovered, self.processed, self.skipped, self.failed
        )?;
        if !self.walk_errors.is_empty() {
            write!(f, ", {} unreadable paths", self.walk_errors.len())?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ScanError {
    MissingApiKey,
    MissingMediaRoot(PathBuf),
    AlreadyRunning,
    NoReachableRoots(Vec<WalkError>),
    AllFailed(ScanSummary),
    Database(sqlx::Error),
    Task(String),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::MissingApiKey => write!(f, "TMDB API key is not configured"),
            ScanError::MissingMediaRoot(p) => {
                write!(f, "media root {} does not exist", p.display())
            }
            ScanError::AlreadyRunning => write!(f, "a scan is already running"),
            ScanError::NoReachableRoots(errors) => {
                let roots: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                write!(f, "no media directory could be read: {}", roots.join("; "))
            }
            ScanError::AllFailed(summary) => {
                write!(f, "scan failed: all {} new files failed to process", summary.failed)
            }
            ScanError::Database(e) => write!(f, "database error: {e}"),
            ScanError::Task(msg) => write!(f, "scan task failed: {msg}"),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<sqlx::Error> for ScanError {
    fn from(e: sqlx::Error) -> Self {
        ScanError::Database(e)
    }
}

/// Runs full library scans, one at a time.
#[derive(Clone)]
pub struct Scanner {
    pool: SqlitePool,
    library: Arc<Library>,
    reconciler: Option<Reconciler>,
    concurrency: usize,
    in_flight: Arc<Mutex<()>>,
}

impl Scanner {
    /// Without a provider every scan fails with [`ScanError::MissingApiKey`].
    pub fn new(
        pool: SqlitePool,
        library: Arc<Library>,
        provider: Option<Arc<dyn MetadataProvider>>,
        assets_dir: PathBuf,
        concurrency: usize,
    ) -> Self {
        let reconciler = provider
            .map(|p| Reconciler::new(pool.clone(), library.clone(), p, assets_dir));
        Self {
            pool,
            library,
            reconciler,
            concurrency: concurrency.max(1),
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    pub fn reconciler(&self) -> Option<&Reconciler> {
        self.reconciler.as_ref()
    }

    pub async fn scan(&self) -> Result<ScanSummary, ScanError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| ScanError::AlreadyRunning)?;
        let reconciler = self.reconciler.as_ref().ok_or(ScanError::MissingApiKey)?;

        let media_root = self.library.media_root.clone();
        let root_ok = tokio::fs::metadata(&media_root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !root_ok {
            return Err(ScanError::MissingMediaRoot(media_root));
        }

        let roots = self.library.roots();
        let root_count = roots.len();
        let library = self.library.clone();
        let report = tokio::task::spawn_blocking(move || walk::walk_roots(&roots, &library))
            .await
            .map_err(|e| ScanError::Task(e.to_string()))?;

        for err in &report.errors {
            tracing::warn!("Walk error: {err}");
        }
        if report.is_total_failure(root_count) {
            return Err(ScanError::NoReachableRoots(report.errors));
        }

        let mut summary = ScanSummary {
            discovered: report.files.len(),
            walk_errors: report.errors,
            ..ScanSummary::default()
        };
        let seen: HashSet<String> = report
            .files
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();

        let results: Vec<_> = stream::iter(report.files)
            .map(|path| async move {
                let result = reconciler.reconcile(&path).await;
                (path, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (path, result) in results {
            match result {
                Ok(Outcome::Inserted(_)) => summary.processed += 1,
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(path = %path.display(), error = %e, "failed to reconcile file");
                }
            }
        }

        let missing = media::list_filepaths(&self.pool)
            .await?
            .iter()
            .filter(|p| !seen.contains(*p))
            .count();
        if missing > 0 {
            tracing::warn!("{missing} cataloged files were not found on disk");
        }

        tracing::info!(
            discovered = summary.discovered,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Scan finished"
        );

        if summary.processed == 0 && summary.failed > 0 {
            return Err(ScanError::AllFailed(summary));
        }
        Ok(summary)
    }
}
