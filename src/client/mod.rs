//! Repository client
//!
//! The repository is reached through [`RepositoryClient`], a two-call seam:
//! `query` returns the citeable ids matching a selection, and `extract` asks
//! the server to package a series and streams the archive to a local file.
//! [`MediafluxClient`] implements it over the Mediaflux HTTP service protocol.

mod xml;

use crate::config::ServerConfig;
use crate::error::{Error, RemoteError, Result};
use crate::overrides::MetadataOverride;
use crate::types::Cid;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use xml::{ServiceArgs, ServiceReply, request_document};

/// Service running asset queries
pub const QUERY_SERVICE: &str = "asset.query";
/// Service packaging DICOM series for download
pub const DOWNLOAD_SERVICE: &str = "daris.dicom.download";
/// Service opening a session from a secure identity token
pub const LOGON_SERVICE: &str = "system.logon";
/// Service closing a session
pub const LOGOFF_SERVICE: &str = "system.logoff";

/// Remote research-data repository
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Ids of the objects matching a query expression
    async fn query(&self, criteria: &str) -> Result<Vec<Cid>>;

    /// Package a series as a zip with the given overrides applied and write
    /// the archive to `output`
    async fn extract(
        &self,
        series: &Cid,
        overrides: &MetadataOverride,
        output: &Path,
    ) -> Result<()>;
}

/// Mediaflux HTTP client holding an authenticated session
pub struct MediafluxClient {
    http: reqwest::Client,
    endpoint: Url,
    session: String,
}

impl std::fmt::Debug for MediafluxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediafluxClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl MediafluxClient {
    /// Connect to the server and log on with the configured token
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let endpoint = config.service_url()?;
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Error::config(
                    "No secure identity token is specified (use --token or A4DOWNLOAD_TOKEN).",
                    Some("token"),
                )
            })?;

        let http = reqwest::Client::builder().build()?;

        info!(endpoint = %endpoint, "connecting to Mediaflux server");
        let reply = call(
            &http,
            &endpoint,
            LOGON_SERVICE,
            None,
            &ServiceArgs::new().add("token", token),
        )
        .await?;
        let session = reply
            .value("session")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RemoteError::MalformedReply {
                service: LOGON_SERVICE.to_string(),
                reason: "no session in reply".to_string(),
            })?
            .to_string();
        debug!("logged on");

        Ok(Self {
            http,
            endpoint,
            session,
        })
    }

    /// Run a service that answers with an XML reply
    async fn execute(&self, service: &str, args: &ServiceArgs) -> Result<ServiceReply> {
        call(&self.http, &self.endpoint, service, Some(&self.session), args).await
    }

    /// End the session
    pub async fn close(self) -> Result<()> {
        self.execute(LOGOFF_SERVICE, &ServiceArgs::new()).await?;
        debug!("logged off");
        Ok(())
    }
}

#[async_trait]
impl RepositoryClient for MediafluxClient {
    async fn query(&self, criteria: &str) -> Result<Vec<Cid>> {
        let args = ServiceArgs::new()
            .add("where", criteria)
            .add("action", "get-cid");
        let reply = self.execute(QUERY_SERVICE, &args).await?;
        Ok(reply.values("cid").map(Cid::from).collect())
    }

    async fn extract(
        &self,
        series: &Cid,
        overrides: &MetadataOverride,
        output: &Path,
    ) -> Result<()> {
        let args = ServiceArgs::new()
            .add("atype", "zip")
            .add("cid", series.as_str())
            .raw(&overrides.to_xml());
        let body = request_document(DOWNLOAD_SERVICE, Some(&self.session), &args);
        let mut response = post(&self.http, &self.endpoint, DOWNLOAD_SERVICE, body).await?;

        if is_xml(&response) {
            // A download answers with the archive itself; an XML body is a reply.
            let text = response.text().await?;
            ServiceReply::parse(DOWNLOAD_SERVICE, &text)?.into_result(DOWNLOAD_SERVICE)?;
            return Err(RemoteError::MalformedReply {
                service: DOWNLOAD_SERVICE.to_string(),
                reason: "expected an archive stream, got an XML result".to_string(),
            }
            .into());
        }

        let mut file = tokio::fs::File::create(output).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!(%series, bytes = written, output = %output.display(), "archive stream written");
        Ok(())
    }
}

async fn call(
    http: &reqwest::Client,
    endpoint: &Url,
    service: &str,
    session: Option<&str>,
    args: &ServiceArgs,
) -> Result<ServiceReply> {
    let body = request_document(service, session, args);
    let response = post(http, endpoint, service, body).await?;
    let text = response.text().await?;
    Ok(ServiceReply::parse(service, &text)?.into_result(service)?)
}

/// POST a request document, turning HTTP failures into [`RemoteError`]s
async fn post(
    http: &reqwest::Client,
    endpoint: &Url,
    service: &str,
    body: String,
) -> Result<reqwest::Response> {
    debug!(service, "calling service");
    let response = http
        .post(endpoint.clone())
        .header(CONTENT_TYPE, "text/xml; charset=utf-8")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    // Service errors may come back with a 4xx/5xx status and an error reply.
    if let Ok(reply) = ServiceReply::parse(service, &text)
        && let Err(e) = reply.into_result(service)
    {
        return Err(e.into());
    }
    warn!(service, %status, "service call failed");
    Err(RemoteError::Status {
        service: service.to_string(),
        status,
        body: text,
    }
    .into())
}

fn is_xml(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let v = v.to_ascii_lowercase();
            v.starts_with("text/xml") || v.starts_with("application/xml")
        })
        .unwrap_or(false)
}
