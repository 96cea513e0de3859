//! Error types for a4download
//!
//! Every fallible operation in the crate returns [`Result`]. The variants follow
//! the stages of a download: configuration, worklist parsing, series
//! resolution, repository calls, and the archive work on local disk.

use crate::types::{Cid, InvalidCidError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for a4download operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for a4download
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration or command line error
    #[error("{message}")]
    Config {
        /// Human-readable error message
        message: String,
        /// The setting that caused the error (e.g., "token")
        key: Option<String>,
    },

    /// The worklist file is incomplete or malformed
    #[error(transparent)]
    Worklist(#[from] WorklistError),

    /// No series in the study carries the requested description
    #[error("No dicom series with description: '{description}' found in study {study}.")]
    SeriesNotFound {
        /// Series description that was searched for
        description: String,
        /// Study that was searched
        study: Cid,
    },

    /// More than one series in the study carries the requested description
    #[error(
        "Found more than one dicom series ({count}) with description: '{description}' in study {study}."
    )]
    AmbiguousSeries {
        /// Series description that was searched for
        description: String,
        /// Study that was searched
        study: Cid,
        /// Number of matching series
        count: usize,
    },

    /// The repository answered with an error or an unusable reply
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Transport failure talking to the repository
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing a zip archive failed
    #[error("archive error: {}: {reason}", .archive.display())]
    Archive {
        /// The archive being read or written
        archive: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Operation not supported (e.g., the native tcp/ip protocol)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// One or more worklist files failed while continuing on error
    #[error("{} of {total} worklist file(s) failed: {}", .failures.len(), summarize(.failures))]
    Batch {
        /// Failed worklist files with the error each one produced
        failures: Vec<BatchFailure>,
        /// Number of worklist files processed
        total: usize,
    },
}

impl Error {
    /// Build a configuration error for the given setting
    pub fn config(message: impl Into<String>, key: Option<&str>) -> Self {
        Error::Config {
            message: message.into(),
            key: key.map(str::to_string),
        }
    }

    pub(crate) fn archive(archive: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Error::Archive {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }
}

/// A worklist file that failed during a continue-on-error batch
#[derive(Debug)]
pub struct BatchFailure {
    /// The worklist file
    pub worklist: PathBuf,
    /// Rendered error message
    pub message: String,
}

fn summarize(failures: &[BatchFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.worklist.display(), f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Worklist validation errors
#[derive(Debug, Error)]
pub enum WorklistError {
    /// A required `KEY:` line never appeared in the file
    #[error("No {field} found in file {}.", .path.display())]
    MissingField {
        /// Name of the missing key, without the colon
        field: &'static str,
        /// The worklist file
        path: PathBuf,
    },

    /// A required `KEY:` line appeared but carried no value
    #[error("Empty {field} in file {}.", .path.display())]
    EmptyField {
        /// Name of the empty key, without the colon
        field: &'static str,
        /// The worklist file
        path: PathBuf,
    },

    /// The DaRIS id is neither a study nor a dataset id
    #[error("{source} (in file {})", .path.display())]
    InvalidCid {
        /// The worklist file
        path: PathBuf,
        /// Why the id was rejected
        #[source]
        source: InvalidCidError,
    },

    /// A series description holds a single quote, which would end the
    /// quoted literal of the series query
    #[error("{field} in file {} contains a single quote.", .path.display())]
    QuoteInDescription {
        /// Name of the description key, without the colon
        field: &'static str,
        /// The worklist file
        path: PathBuf,
    },

    /// The file is not valid UTF-8 or UTF-16
    #[error("cannot decode worklist file {} as {encoding}", .path.display())]
    Encoding {
        /// The worklist file
        path: PathBuf,
        /// Encoding that was detected from the byte-order mark
        encoding: &'static str,
    },
}

/// Errors reported by, or about, the repository server
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service replied with an error document
    #[error("service {service} failed: {message}")]
    Service {
        /// Service name (e.g., "asset.query")
        service: String,
        /// Error class reported by the server
        error: String,
        /// Error message reported by the server
        message: String,
    },

    /// The server answered with a non-success HTTP status
    #[error("HTTP {status} calling service {service}: {body}")]
    Status {
        /// Service name
        service: String,
        /// HTTP status code
        status: reqwest::StatusCode,
        /// Response body, possibly empty
        body: String,
    },

    /// The reply could not be understood
    #[error("malformed reply from service {service}: {reason}")]
    MalformedReply {
        /// Service name
        service: String,
        /// Why the reply was rejected
        reason: String,
    },

    /// XML envelope could not be parsed
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}
