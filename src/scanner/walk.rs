use std::path::{Path, PathBuf};

use crate::config::Library;

#[derive(Debug, Clone)]
pub struct WalkError {
    pub path: PathBuf,
    pub message: String,
}

impl std::fmt::Display for WalkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

#[derive(Debug, Default)]
pub struct WalkReport {
    pub files: Vec<PathBuf>,
    pub errors: Vec<WalkError>,
    /// Roots that could not be opened at all.
    pub failed_roots: usize,
}

impl WalkReport {
    /// No files were found and no root could be walked.
    pub fn is_total_failure(&self, root_count: usize) -> bool {
        self.files.is_empty() && root_count > 0 && self.failed_roots == root_count
    }
}

/// Walk every root and collect files the library accepts. A root that cannot be
/// opened is recorded and the remaining roots are still walked.
pub fn walk_roots(roots: &[PathBuf], library: &Library) -> WalkReport {
    let mut report = WalkReport::default();

    for root in roots {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.clone());
        match std::fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                report.failed_roots += 1;
                report.errors.push(WalkError {
                    path: root,
                    message: "not a directory".to_string(),
                });
                continue;
            }
            Err(e) => {
                report.failed_roots += 1;
                report.errors.push(WalkError {
                    path: root,
                    message: e.to_string(),
                });
                continue;
            }
        }
        tracing::info!("Walking media root: {}", root.display());
        walk_recursive(&root, library, &mut report);
    }

    report
}

fn walk_recursive(dir: &Path, library: &Library, report: &mut WalkReport) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "cannot read directory");
            report.errors.push(WalkError {
                path: dir.to_path_buf(),
                message: e.to_string(),
            });
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let ft = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };
        // Symlinked directories are not followed; symlinked files are.
        if ft.is_dir() {
            walk_recursive(&path, library, report);
        } else if (ft.is_file() || (ft.is_symlink() && path.is_file())) && library.accepts(&path) {
            // Catalog rows key on the path as text; a lossy name could not be streamed back.
            if path.to_str().is_none() {
                tracing::warn!(path = %path.display(), "skipping file with a non UTF-8 name");
                report.errors.push(WalkError {
                    path,
                    message: "file name is not valid UTF-8".to_string(),
                });
                continue;
            }
            report.files.push(path);
        }
    }
}
