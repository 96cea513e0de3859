//! Locating a DICOM series inside a study by its description

use crate::client::RepositoryClient;
use crate::error::{Error, Result};
use crate::types::Cid;
use tracing::{debug, info};

/// Query selecting the series of `study` whose DICOM description equals
/// `description` exactly
pub fn series_query(study: &Cid, description: &str) -> String {
    format!(
        "cid in '{}' and xpath(mf-dicom-series/description)='{}'",
        study, description
    )
}

/// Find the one series in `study` with the given description
///
/// Fails when no series matches or when the description is ambiguous.
pub async fn find_series<C>(client: &C, study: &Cid, description: &str) -> Result<Cid>
where
    C: RepositoryClient + ?Sized,
{
    debug!(%study, description, "looking for DICOM series");
    let mut matches = client.query(&series_query(study, description)).await?;
    match matches.len() {
        0 => Err(Error::SeriesNotFound {
            description: description.to_string(),
            study: study.clone(),
        }),
        1 => {
            let series = matches.remove(0);
            info!(%study, %series, description, "found DICOM series");
            Ok(series)
        }
        count => Err(Error::AmbiguousSeries {
            description: description.to_string(),
            study: study.clone(),
            count,
        }),
    }
}
