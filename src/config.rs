//! Configuration types for a4download

use crate::error::{Error, Result};
use std::path::PathBuf;
use url::Url;

/// Default repository host
pub const DEFAULT_HOST: &str = "daris-1.cloud.unimelb.edu.au";

/// Default repository port
pub const DEFAULT_PORT: u16 = 443;

/// Path of the Mediaflux HTTP service endpoint
pub const SERVICE_PATH: &str = "/__mflux_svc__";

/// Transport used to reach the repository server
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Protocol {
    /// Plain HTTP
    Http,
    /// HTTP over TLS
    #[default]
    Https,
    /// Native Mediaflux socket protocol
    #[value(name = "tcp/ip")]
    TcpIp,
}

impl Protocol {
    /// URL scheme for the HTTP based protocols
    pub fn scheme(self) -> Option<&'static str> {
        match self {
            Protocol::Http => Some("http"),
            Protocol::Https => Some("https"),
            Protocol::TcpIp => None,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
            Protocol::TcpIp => write!(f, "tcp/ip"),
        }
    }
}

/// Repository server connection settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server hostname (default: daris-1.cloud.unimelb.edu.au)
    pub host: String,

    /// Server port (default: 443)
    pub port: u16,

    /// Transport protocol (default: https)
    pub protocol: Protocol,

    /// Secure identity token used to log on
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            protocol: Protocol::default(),
            token: None,
        }
    }
}

impl ServerConfig {
    /// URL of the HTTP service endpoint
    pub fn service_url(&self) -> Result<Url> {
        let scheme = self.protocol.scheme().ok_or_else(|| {
            Error::NotSupported(format!(
                "the {} protocol is not supported, use http or https",
                self.protocol
            ))
        })?;
        let raw = format!("{}://{}:{}{}", scheme, self.host, self.port, SERVICE_PATH);
        Url::parse(&raw).map_err(|e| {
            Error::config(
                format!("Invalid Mediaflux server address {}: {}", raw, e),
                Some("host"),
            )
        })
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config(
                "No Mediaflux server host is specified.",
                Some("host"),
            ));
        }
        if self.port == 0 {
            return Err(Error::config(
                format!("Invalid Mediaflux server port: {}", self.port),
                Some("port"),
            ));
        }
        Ok(())
    }
}

/// Download behavior settings
#[derive(Clone, Debug)]
pub struct DownloadConfig {
    /// Directory receiving the subject archives (default: current directory)
    pub output_dir: PathBuf,

    /// Delete each worklist file after its archive has been produced
    pub delete_worklist: bool,

    /// Keep processing the remaining worklist files after one fails
    pub continue_on_error: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            delete_worklist: false,
            continue_on_error: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Main configuration for a download run
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Repository connection
    pub server: ServerConfig,

    /// Download behavior
    pub download: DownloadConfig,

    /// Worklist files, processed in order
    pub worklists: Vec<PathBuf>,
}

impl Config {
    /// Check the configuration before connecting
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        if self.worklists.is_empty() {
            return Err(Error::config(
                "No patient worklist file is specified.",
                Some("worklists"),
            ));
        }
        for worklist in &self.worklists {
            if !worklist.exists() {
                return Err(Error::config(
                    format!("File {} is not found.", worklist.display()),
                    Some("worklists"),
                ));
            }
        }
        if self.download.output_dir.is_file() {
            return Err(Error::config(
                format!(
                    "Output directory {} is a file.",
                    self.download.output_dir.display()
                ),
                Some("output_dir"),
            ));
        }
        Ok(())
    }
}
