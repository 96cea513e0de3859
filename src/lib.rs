//! # a4download
//!
//! Downloads the CT and PET series named by patient worklist files from a
//! DaRIS (Mediaflux) repository, re-identified under a new subject id, and
//! packs them into one ZIP archive per subject.
//!
//! ## Pipeline
//!
//! For every worklist file:
//! 1. parse the study id, new subject id and the two series descriptions
//! 2. resolve each description to exactly one series in the study
//! 3. download each series as a ZIP with the subject's DICOM overrides applied
//! 4. unpack both into a staging directory and pack `<subject>.zip`
//!    (`pet/…` entries, then `ct/…`)
//!
//! ## Quick Start
//!
//! ```no_run
//! use a4download::{Config, DeferredCleanup, Downloader, MediafluxClient};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.server.token = Some("secure-identity-token".to_string());
//!     config.worklists = vec!["p1.txt".into()];
//!     config.validate()?;
//!
//!     let deferred = Arc::new(DeferredCleanup::new());
//!     let client = MediafluxClient::connect(&config.server).await?;
//!     let downloader = Downloader::new(client, config.download.clone(), deferred.clone());
//!
//!     let archives = downloader.download_all(&config.worklists).await;
//!     downloader.into_client().close().await?;
//!     deferred.run();
//!
//!     for archive in archives? {
//!         println!("{}", archive.display());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Best-effort and deferred file removal
pub mod cleanup;
/// Command line interface
pub mod cli;
/// Repository service client
pub mod client;
/// Configuration types
pub mod config;
/// Worklist batch processing
pub mod downloader;
/// Error types
pub mod error;
/// ZIP extraction and packing
pub mod extraction;
/// Series download
pub mod fetcher;
/// DICOM metadata overrides
pub mod overrides;
/// Per-subject archive assembly
pub mod repackage;
/// Series lookup by description
pub mod resolver;
/// Core identifier types
pub mod types;
/// Patient worklist parsing
pub mod worklist;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use cleanup::DeferredCleanup;
pub use cli::Cli;
pub use client::{MediafluxClient, RepositoryClient};
pub use config::{Config, DownloadConfig, Protocol, ServerConfig};
pub use downloader::Downloader;
pub use error::{Error, RemoteError, Result, WorklistError};
pub use overrides::MetadataOverride;
pub use types::{Cid, InvalidCidError, Modality};
pub use worklist::WorklistRecord;
