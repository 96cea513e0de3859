//! Repackaging downloaded series into one archive per subject
//!
//! Each series archive is unpacked below `<output>/<subject>/<modality>/`,
//! the staging tree is zipped into `<output>/<subject>.zip` and then removed.
//! [`StagingDir`] removes the staging tree if any step fails on the way.

use crate::cleanup::{DeferredCleanup, remove_file_or_defer, remove_tree};
use crate::error::{Error, Result};
use crate::extraction::{ZipExtractor, ZipPacker};
use crate::types::Modality;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Staging directory removed on drop unless disarmed
///
/// Removal on drop is synchronous; a path that cannot be removed is handed to
/// the deferred cleanup list.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    deferred: Arc<DeferredCleanup>,
    armed: bool,
}

impl StagingDir {
    fn new(path: PathBuf, deferred: Arc<DeferredCleanup>) -> Self {
        Self {
            path,
            deferred,
            armed: true,
        }
    }

    /// Staging directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!(path = %self.path.display(), "removing staging directory");
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove staging directory");
                self.deferred.register(&self.path);
            }
        }
    }
}

/// Subject archive under construction
#[derive(Debug)]
pub struct SubjectPackage {
    subject_id: String,
    archive_path: PathBuf,
    staging: StagingDir,
}

impl SubjectPackage {
    /// Start a package for `subject_id` below `output_dir`
    ///
    /// A staging directory left over from an interrupted run is removed
    /// first. Whatever cannot be removed is deferred; if files remain the
    /// package is not started.
    pub async fn begin(
        output_dir: &Path,
        subject_id: &str,
        deferred: Arc<DeferredCleanup>,
    ) -> Result<Self> {
        let staging_path = output_dir.join(subject_id);

        if tokio::fs::try_exists(&staging_path).await? {
            warn!(path = %staging_path.display(), "removing stale staging directory");
            remove_tree(&staging_path, &deferred).await;
            if has_entries(&staging_path).await? {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::DirectoryNotEmpty,
                    format!(
                        "stale staging directory {} could not be emptied",
                        staging_path.display()
                    ),
                )));
            }
        }
        tokio::fs::create_dir_all(&staging_path).await?;

        Ok(Self {
            subject_id: subject_id.to_string(),
            archive_path: output_dir.join(format!("{}.zip", subject_id)),
            staging: StagingDir::new(staging_path, deferred),
        })
    }

    /// Staging directory of one modality
    pub fn series_dir(&self, modality: Modality) -> PathBuf {
        self.staging.path().join(modality.dir_name())
    }

    /// Unpack a downloaded series archive into the modality directory
    ///
    /// The series archive is deleted afterwards, also when unpacking fails.
    ///
    /// Returns the number of files unpacked.
    pub async fn add_series(&self, modality: Modality, series_archive: &Path) -> Result<usize> {
        let dest = self.series_dir(modality);
        info!(
            subject = %self.subject_id,
            %modality,
            archive = %series_archive.display(),
            "extracting series archive"
        );

        let archive_owned = series_archive.to_path_buf();
        let extracted = spawn_blocking(move || ZipExtractor::extract(&archive_owned, &dest))
            .await
            .map_err(|e| Error::archive(series_archive, format!("extraction task failed: {}", e)))
            .and_then(|result| result);

        // the series archive is not kept, whether or not it unpacked
        remove_file_or_defer(series_archive, &self.staging.deferred).await;
        Ok(extracted?.len())
    }

    /// Write the subject archive, PET entries first, and remove the staging
    /// directory
    pub async fn finish(mut self) -> Result<PathBuf> {
        let pet = self.series_dir(Modality::Pet);
        let ct = self.series_dir(Modality::Ct);
        let archive = self.archive_path.clone();

        info!(subject = %self.subject_id, archive = %archive.display(), "packing subject archive");
        let archive_owned = archive.clone();
        let entries = spawn_blocking(move || {
            ZipPacker::pack_directories(&archive_owned, &[pet.as_path(), ct.as_path()])
        })
        .await
        .map_err(|e| Error::archive(&archive, format!("packing task failed: {}", e)))??;
        debug!(subject = %self.subject_id, entries = entries.len(), "subject archive written");

        remove_tree(self.staging.path(), &self.staging.deferred).await;
        self.staging.disarm();
        Ok(archive)
    }
}

async fn has_entries(dir: &Path) -> Result<bool> {
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => Ok(entries.next_entry().await?.is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
