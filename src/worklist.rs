//! Patient worklist parsing
//!
//! A worklist is a small text file, UTF-8 or UTF-16 with a byte-order mark,
//! naming the source study and the identifiers of one download job:
//!
//! ```text
//! DARIS_ID: 1005.3.12.4.1.7
//! NEWID: 0042
//! CTFILETSEND: CT WB 3.0 B30f
//! PETFILETSEND: PET WB AC
//! ```
//!
//! Lines may end in LF, CRLF or a bare CR. Any other line is ignored. When a
//! key is repeated the last value wins.

use crate::error::{Result, WorklistError};
use crate::types::{Cid, Modality};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Key of the source study (or dataset) id
pub const DARIS_ID: &str = "DARIS_ID";
/// Key of the new subject id
pub const NEWID: &str = "NEWID";
/// Key of the CT series description
pub const CTFILETSEND: &str = "CTFILETSEND";
/// Key of the PET series description
pub const PETFILETSEND: &str = "PETFILETSEND";

/// Prefix every new subject id carries
pub const SUBJECT_ID_PREFIX: &str = "A4";

/// One parsed worklist file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorklistRecord {
    /// File the record was parsed from
    pub source: PathBuf,
    /// Study holding both series, always at study depth
    pub study_id: Cid,
    /// New subject id, always starting with `A4`
    pub subject_id: String,
    /// Description of the CT series to download
    pub ct_series_description: String,
    /// Description of the PET series to download
    pub pet_series_description: String,
}

impl WorklistRecord {
    /// Read and parse a worklist file
    pub async fn from_file(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "parsing patient worklist file");
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::parse(&bytes, path)?)
    }

    /// Parse worklist content; `path` is only used in error messages
    pub fn parse(bytes: &[u8], path: &Path) -> std::result::Result<Self, WorklistError> {
        let text = decode_text(bytes, path)?;

        let mut cid = None;
        let mut new_id = None;
        let mut ct = None;
        let mut pet = None;

        for line in text.split(['\r', '\n']).filter(|l| !l.is_empty()) {
            if let Some(value) = value_of(line, DARIS_ID) {
                cid = Some(value);
            } else if let Some(value) = value_of(line, NEWID) {
                new_id = Some(value);
            } else if let Some(value) = value_of(line, CTFILETSEND) {
                ct = Some(value);
            } else if let Some(value) = value_of(line, PETFILETSEND) {
                pet = Some(value);
            }
        }

        let cid = required(cid, DARIS_ID, path)?;
        let new_id = required(new_id, NEWID, path)?;
        let ct = required(ct, CTFILETSEND, path)?;
        let pet = required(pet, PETFILETSEND, path)?;
        for (description, field) in [(ct, CTFILETSEND), (pet, PETFILETSEND)] {
            if description.contains('\'') {
                return Err(WorklistError::QuoteInDescription {
                    field,
                    path: path.to_path_buf(),
                });
            }
        }

        let study_id = Cid::new(cid)
            .to_study()
            .map_err(|source| WorklistError::InvalidCid {
                path: path.to_path_buf(),
                source,
            })?;

        let record = Self {
            source: path.to_path_buf(),
            study_id,
            subject_id: normalize_subject_id(new_id),
            ct_series_description: ct.to_string(),
            pet_series_description: pet.to_string(),
        };
        debug!(?record, "parsed worklist");
        Ok(record)
    }

    /// Description of the series of the given modality
    pub fn series_description(&self, modality: Modality) -> &str {
        match modality {
            Modality::Ct => &self.ct_series_description,
            Modality::Pet => &self.pet_series_description,
        }
    }
}

fn value_of<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key)?.strip_prefix(':').map(str::trim)
}

fn required<'a>(
    value: Option<&'a str>,
    field: &'static str,
    path: &Path,
) -> std::result::Result<&'a str, WorklistError> {
    match value {
        None => Err(WorklistError::MissingField {
            field,
            path: path.to_path_buf(),
        }),
        Some("") => Err(WorklistError::EmptyField {
            field,
            path: path.to_path_buf(),
        }),
        Some(value) => Ok(value),
    }
}

/// Prefix a subject id with `A4` unless it already starts with it (any case)
pub fn normalize_subject_id(raw: &str) -> String {
    let has_prefix = raw
        .get(..SUBJECT_ID_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(SUBJECT_ID_PREFIX));
    if has_prefix {
        raw.to_string()
    } else {
        format!("{}{}", SUBJECT_ID_PREFIX, raw)
    }
}

/// Decode worklist bytes, choosing the encoding from the byte-order mark
///
/// `FF FE` selects UTF-16LE and `FE FF` UTF-16BE; anything else is read as
/// UTF-8 with an optional UTF-8 BOM. `FF FF` is also taken as UTF-16LE, which
/// is how older worklist exports were sniffed.
pub fn decode_text(bytes: &[u8], path: &Path) -> std::result::Result<String, WorklistError> {
    match bytes {
        [0xFF, 0xFE | 0xFF, rest @ ..] => decode_utf16(rest, false, path),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, true, path),
        _ => {
            let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
            String::from_utf8(body.to_vec()).map_err(|_| WorklistError::Encoding {
                path: path.to_path_buf(),
                encoding: "UTF-8",
            })
        }
    }
}

fn decode_utf16(
    bytes: &[u8],
    big_endian: bool,
    path: &Path,
) -> std::result::Result<String, WorklistError> {
    let encoding = if big_endian { "UTF-16BE" } else { "UTF-16LE" };
    let err = || WorklistError::Encoding {
        path: path.to_path_buf(),
        encoding,
    };
    if bytes.len() % 2 != 0 {
        return Err(err());
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            if big_endian {
                u16::from_be_bytes(pair)
            } else {
                u16::from_le_bytes(pair)
            }
        })
        .collect();
    String::from_utf16(&units).map_err(|_| err())
}
