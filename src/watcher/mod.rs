use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::Library;
use crate::scanner::reconcile::{Outcome, Reconciler};
use crate::scanner::walk;

/// How long a new file's size must hold still before it is cataloged.
const SETTLE_INTERVAL: Duration = Duration::from_secs(2);

/// Paths worth reconciling from a filesystem event: files or directories
/// created in, or renamed into, the library.
pub fn candidate_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(CreateKind::File)
        | EventKind::Create(CreateKind::Folder)
        | EventKind::Create(CreateKind::Any) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().cloned().into_iter().collect()
        }
        _ => Vec::new(),
    }
}

/// Media files behind a candidate path: the file itself, or every accepted
/// file below a directory that was moved in whole.
pub fn expand(path: &Path, library: &Library) -> Vec<PathBuf> {
    if path.is_dir() {
        let report = walk::walk_roots(&[path.to_path_buf()], library);
        for err in &report.errors {
            tracing::warn!("Walk error: {err}");
        }
        report.files
    } else if path.is_file() && library.accepts(path) {
        vec![path.to_path_buf()]
    } else {
        Vec::new()
    }
}

/// Poll the file size every `interval` until two reads agree. Returns the
/// settled size.
pub async fn wait_until_stable(path: &Path, interval: Duration) -> std::io::Result<u64> {
    let mut last = tokio::fs::metadata(path).await?.len();
    loop {
        tokio::time::sleep(interval).await;
        let size = tokio::fs::metadata(path).await?.len();
        if size == last {
            return Ok(size);
        }
        last = size;
    }
}

pub async fn start(reconciler: Reconciler) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (tx, mut rx) = mpsc::channel::<Event>(100);

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        },
        notify::Config::default(),
    )?;

    for dir in reconciler.library().roots() {
        if dir.exists() {
            watcher.watch(&dir, RecursiveMode::Recursive)?;
            tracing::info!("Watching directory: {}", dir.display());
        } else {
            tracing::warn!(
                "Media directory does not exist, skipping watch: {}",
                dir.display()
            );
        }
    }

    tokio::spawn(async move {
        // Keep watcher alive
        let _watcher = watcher;
        let pending: Arc<Mutex<HashSet<PathBuf>>> = Arc::new(Mutex::new(HashSet::new()));

        while let Some(event) = rx.recv().await {
            for path in candidate_paths(&event) {
                tokio::spawn(handle_candidate(reconciler.clone(), pending.clone(), path));
            }
        }
    });

    Ok(())
}

async fn handle_candidate(
    reconciler: Reconciler,
    pending: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
) {
    let lookup = reconciler.clone();
    let files = tokio::task::spawn_blocking(move || expand(&path, lookup.library()))
        .await
        .unwrap_or_default();

    for file in files {
        // Copies raise several events per file; one task owns each path.
        if !lock(&pending).insert(file.clone()) {
            continue;
        }
        settle_and_reconcile(&reconciler, &file).await;
        lock(&pending).remove(&file);
    }
}

async fn settle_and_reconcile(reconciler: &Reconciler, file: &Path) {
    tracing::info!("New media file detected: {}", file.display());
    match wait_until_stable(file, SETTLE_INTERVAL).await {
        Ok(size) => tracing::debug!("{} settled at {size} bytes", file.display()),
        Err(e) => {
            tracing::warn!("File vanished before it settled {}: {e}", file.display());
            return;
        }
    }
    match reconciler.reconcile(file).await {
        Ok(Outcome::Inserted(id)) => tracing::info!("Cataloged {} as {id}", file.display()),
        Ok(Outcome::Skipped) => {}
        Err(e) => tracing::error!("Error reconciling {}: {e}", file.display()),
    }
}

fn lock(pending: &Mutex<HashSet<PathBuf>>) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}
