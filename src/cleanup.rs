//! Best-effort removal of intermediate files
//!
//! Intermediate files (downloaded series archives, the staging tree, a
//! consumed worklist) never fail a run when they cannot be deleted. The path
//! is registered with [`DeferredCleanup`] instead and removal is retried once
//! more when the process exits.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Paths whose deletion failed, removed again at process exit
#[derive(Debug, Default)]
pub struct DeferredCleanup {
    paths: Mutex<Vec<PathBuf>>,
}

impl DeferredCleanup {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path for deletion at exit
    pub fn register(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(path = %path.display(), "deferring deletion to exit");
        self.lock().push(path);
    }

    /// Registered paths, in registration order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Delete every registered path, most recent first, and clear the list
    ///
    /// Returns the paths that still could not be deleted.
    pub fn run(&self) -> Vec<PathBuf> {
        let paths = std::mem::take(&mut *self.lock());
        if paths.is_empty() {
            return Vec::new();
        }
        info!(count = paths.len(), "running deferred cleanup");

        let mut remaining = Vec::new();
        for path in paths.into_iter().rev() {
            let result = match std::fs::symlink_metadata(&path) {
                Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(&path),
                Ok(_) => std::fs::remove_file(&path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(path = %path.display(), error = %e, "failed to delete at exit");
                remaining.push(path);
            }
        }
        remaining
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Delete a file, deferring to exit when that fails
pub async fn remove_file_or_defer(path: &Path, deferred: &DeferredCleanup) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "deleted file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to delete file");
            deferred.register(path);
        }
    }
}

/// Recursively delete a file or directory tree
///
/// Children are removed before their directory. Anything that cannot be
/// deleted is registered with `deferred`; the walk carries on with the rest.
pub fn remove_tree<'a>(
    path: &'a Path,
    deferred: &'a DeferredCleanup,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        use tokio::fs;

        let meta = match fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(?path, error = %e, "failed to stat during cleanup");
                deferred.register(path);
                return;
            }
        };

        if !meta.is_dir() {
            remove_file_or_defer(path, deferred).await;
            return;
        }

        match fs::read_dir(path).await {
            Ok(mut entries) => {
                while let Ok(Some(entry)) = entries.next_entry().await {
                    remove_tree(&entry.path(), deferred).await;
                }
            }
            Err(e) => {
                warn!(?path, error = %e, "failed to read directory during cleanup");
            }
        }

        if let Err(e) = fs::remove_dir(path).await {
            warn!(?path, error = %e, "failed to delete directory");
            deferred.register(path);
        }
    })
}
