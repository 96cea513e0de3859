//! Downloading a series as a re-identified zip archive

use crate::client::RepositoryClient;
use crate::error::Result;
use crate::overrides::MetadataOverride;
use crate::types::Cid;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Path of the archive a series is downloaded to
pub fn series_archive_path(dest_dir: &Path, series: &Cid) -> PathBuf {
    dest_dir.join(format!("{}.zip", series))
}

/// Ask the repository to package `series` with `overrides` applied and save
/// the archive as `<dest_dir>/<series>.zip`
///
/// No timeout or retry is applied. A partially written archive is removed
/// when the transfer fails.
pub async fn fetch_series<C>(
    client: &C,
    series: &Cid,
    overrides: &MetadataOverride,
    dest_dir: &Path,
) -> Result<PathBuf>
where
    C: RepositoryClient + ?Sized,
{
    let archive = series_archive_path(dest_dir, series);
    info!(%series, overrides = overrides.len(), "downloading DICOM series");

    if let Err(e) = client.extract(series, overrides, &archive).await {
        if let Err(rm) = tokio::fs::remove_file(&archive).await
            && rm.kind() != std::io::ErrorKind::NotFound
        {
            warn!(archive = %archive.display(), error = %rm, "failed to remove partial archive");
        }
        return Err(e);
    }

    info!(%series, archive = %archive.display(), "downloaded DICOM series");
    Ok(archive)
}
