//! Worklist batch processing
//!
//! [`Downloader`] drives one worklist file at a time through parsing, series
//! resolution, download and repackaging.

use crate::cleanup::{DeferredCleanup, remove_file_or_defer};
use crate::client::RepositoryClient;
use crate::config::DownloadConfig;
use crate::error::{BatchFailure, Error, Result};
use crate::fetcher::fetch_series;
use crate::overrides::MetadataOverride;
use crate::repackage::SubjectPackage;
use crate::resolver::find_series;
use crate::types::Modality;
use crate::worklist::WorklistRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Order in which series are downloaded and staged
const DOWNLOAD_ORDER: [Modality; 2] = [Modality::Ct, Modality::Pet];

/// Downloads the CT and PET series named by worklist files and packs them
/// into one archive per subject
pub struct Downloader<C> {
    client: C,
    config: DownloadConfig,
    deferred: Arc<DeferredCleanup>,
}

impl<C: RepositoryClient> Downloader<C> {
    /// Create a downloader on top of a connected repository client
    pub fn new(client: C, config: DownloadConfig, deferred: Arc<DeferredCleanup>) -> Self {
        Self {
            client,
            config,
            deferred,
        }
    }

    /// The repository client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Give back the repository client, e.g. to log off
    pub fn into_client(self) -> C {
        self.client
    }

    /// Process worklist files in order and return the archives produced
    ///
    /// The first failure aborts the batch unless `continue_on_error` is set,
    /// in which case every file is attempted and the failures are reported
    /// together as [`Error::Batch`].
    pub async fn download_all(&self, worklists: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut archives = Vec::with_capacity(worklists.len());
        let mut failures = Vec::new();

        for worklist in worklists {
            match self.download_worklist(worklist).await {
                Ok(archive) => archives.push(archive),
                Err(e) if self.config.continue_on_error => {
                    error!(worklist = %worklist.display(), error = %e, "worklist failed, continuing");
                    failures.push(BatchFailure {
                        worklist: worklist.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        if !failures.is_empty() {
            return Err(Error::Batch {
                failures,
                total: worklists.len(),
            });
        }
        Ok(archives)
    }

    /// Process a single worklist file
    ///
    /// With `delete_worklist` set the file is removed once its archive
    /// exists; a file that cannot be removed is left to deferred cleanup.
    pub async fn download_worklist(&self, worklist: &Path) -> Result<PathBuf> {
        let record = WorklistRecord::from_file(worklist).await?;
        let archive = self.download_record(&record).await?;

        if self.config.delete_worklist {
            info!(worklist = %worklist.display(), "deleting worklist file");
            remove_file_or_defer(worklist, &self.deferred).await;
        }
        Ok(archive)
    }

    /// Download both series of a parsed worklist into
    /// `<output_dir>/<subject_id>.zip`
    ///
    /// Both series are resolved before anything is downloaded.
    pub async fn download_record(&self, record: &WorklistRecord) -> Result<PathBuf> {
        info!(
            study = %record.study_id,
            subject = %record.subject_id,
            "processing worklist"
        );

        let mut series = Vec::with_capacity(DOWNLOAD_ORDER.len());
        for modality in DOWNLOAD_ORDER {
            let description = record.series_description(modality);
            let cid = find_series(&self.client, &record.study_id, description).await?;
            series.push((modality, cid));
        }

        let output_dir = &self.config.output_dir;
        tokio::fs::create_dir_all(output_dir).await?;

        let overrides = MetadataOverride::for_subject(&record.subject_id);
        let package =
            SubjectPackage::begin(output_dir, &record.subject_id, self.deferred.clone()).await?;

        for (modality, cid) in &series {
            let fetched = fetch_series(&self.client, cid, &overrides, output_dir).await?;
            package.add_series(*modality, &fetched).await?;
        }

        let archive = package.finish().await?;
        info!(
            subject = %record.subject_id,
            archive = %archive.display(),
            "subject archive ready"
        );
        Ok(archive)
    }
}
