//! Core types for a4download

use thiserror::Error;

/// Depth of a DaRIS citeable id that names a study
pub const STUDY_CID_DEPTH: usize = 6;

/// Depth of a DaRIS citeable id that names a dataset (a series) inside a study
pub const DATASET_CID_DEPTH: usize = 7;

/// DaRIS citeable id: a dot-separated path of integers locating an object in
/// the project > subject > ex-method > study > dataset hierarchy.
///
/// The depth of an id (its number of segments) tells its level.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cid(String);

impl Cid {
    /// Create a Cid from its string form
    pub fn new(cid: impl Into<String>) -> Self {
        Self(cid.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of dot-separated segments
    pub fn depth(&self) -> usize {
        self.0.split('.').count()
    }

    /// The id with its last segment removed, or the id itself if it has no dot
    pub fn parent(&self) -> Cid {
        match self.0.rfind('.') {
            Some(idx) => Cid(self.0[..idx].to_string()),
            None => self.clone(),
        }
    }

    /// Normalize to a study id
    ///
    /// A study id is returned unchanged and a dataset id is truncated to the
    /// study containing it. Any other depth is rejected, and so is an id
    /// with a segment that is not a decimal number.
    pub fn to_study(&self) -> Result<Cid, InvalidCidError> {
        let study = match self.depth() {
            STUDY_CID_DEPTH => self.clone(),
            DATASET_CID_DEPTH => self.parent(),
            depth => {
                return Err(InvalidCidError::Depth {
                    cid: self.clone(),
                    depth,
                });
            }
        };
        if !self.is_numeric() {
            return Err(InvalidCidError::Segment { cid: self.clone() });
        }
        Ok(study)
    }

    fn is_numeric(&self) -> bool {
        self.0
            .split('.')
            .all(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl std::fmt::Display for Cid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cid {
    fn from(cid: &str) -> Self {
        Self(cid.to_string())
    }
}

impl From<String> for Cid {
    fn from(cid: String) -> Self {
        Self(cid)
    }
}

impl AsRef<str> for Cid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A citeable id that cannot name a study
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCidError {
    /// The id is at a level other than study or dataset
    #[error("Invalid DaRIS citeable id: {cid} (depth {depth}). It must be a study id.")]
    Depth {
        /// The rejected id
        cid: Cid,
        /// Its depth
        depth: usize,
    },

    /// A segment is empty or not a decimal number
    #[error("Invalid DaRIS citeable id: {cid}. Every segment must be a number.")]
    Segment {
        /// The rejected id
        cid: Cid,
    },
}

/// Imaging modality of a series in a subject package
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Modality {
    /// Computed tomography
    Ct,
    /// Positron emission tomography
    Pet,
}

impl Modality {
    /// Name of the subdirectory (and archive folder) holding this series
    pub fn dir_name(self) -> &'static str {
        match self {
            Modality::Ct => "ct",
            Modality::Pet => "pet",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Ct => write!(f, "CT"),
            Modality::Pet => write!(f, "PET"),
        }
    }
}
