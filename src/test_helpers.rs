//! Shared test helpers: an in-memory repository and zip fixtures.

use crate::client::RepositoryClient;
use crate::error::{Error, RemoteError, Result};
use crate::overrides::MetadataOverride;
use crate::resolver::series_query;
use crate::types::Cid;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Mutex;

/// Repository answering queries and downloads from canned data
#[derive(Default)]
pub(crate) struct MockRepository {
    series: HashMap<String, Vec<Cid>>,
    archives: HashMap<Cid, Vec<(String, Vec<u8>)>>,
    failing: HashSet<Cid>,
    queries: Mutex<Vec<String>>,
    extractions: Mutex<Vec<(Cid, MetadataOverride)>>,
}

impl MockRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Series of `study` answering to `description`
    pub(crate) fn with_series(mut self, study: &str, description: &str, cids: &[&str]) -> Self {
        self.series.insert(
            series_query(&Cid::from(study), description),
            cids.iter().map(|c| Cid::from(*c)).collect(),
        );
        self
    }

    /// Archive content returned when `series` is downloaded
    pub(crate) fn with_archive(mut self, series: &str, files: &[(&str, &[u8])]) -> Self {
        self.archives.insert(
            Cid::from(series),
            files
                .iter()
                .map(|(name, data)| (name.to_string(), data.to_vec()))
                .collect(),
        );
        self
    }

    /// Downloading `series` writes a few bytes and then fails
    pub(crate) fn failing_extract(mut self, series: &str) -> Self {
        self.failing.insert(Cid::from(series));
        self
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub(crate) fn extractions(&self) -> Vec<(Cid, MetadataOverride)> {
        self.extractions.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RepositoryClient for MockRepository {
    async fn query(&self, criteria: &str) -> Result<Vec<Cid>> {
        self.queries.lock().unwrap().push(criteria.to_string());
        Ok(self.series.get(criteria).cloned().unwrap_or_default())
    }

    async fn extract(
        &self,
        series: &Cid,
        overrides: &MetadataOverride,
        output: &Path,
    ) -> Result<()> {
        self.extractions
            .lock()
            .unwrap()
            .push((series.clone(), overrides.clone()));

        if self.failing.contains(series) {
            std::fs::write(output, b"PK\x03\x04trunc").unwrap();
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }

        let Some(files) = self.archives.get(series) else {
            return Err(RemoteError::Service {
                service: "daris.dicom.download".to_string(),
                error: "arc.mf.server.Services$ExServiceError".to_string(),
                message: format!("asset {} does not exist", series),
            }
            .into());
        };
        let entries: Vec<(&str, &[u8])> = files
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
            .collect();
        create_zip_archive(output, &entries);
        Ok(())
    }
}

/// Write a stored (uncompressed) zip holding the given files
pub(crate) fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

/// Entry names and contents of a zip, in archive order
pub(crate) fn read_zip_entries(archive_path: &Path) -> Vec<(String, Vec<u8>)> {
    let file = std::fs::File::open(archive_path).unwrap();
    let mut archive = ::zip::ZipArchive::new(file).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (entry.name().to_string(), data)
        })
        .collect()
}
