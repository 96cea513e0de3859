//! Command line interface

use crate::config::{Config, DEFAULT_HOST, DEFAULT_PORT, DownloadConfig, Protocol, ServerConfig};
use crate::error::Result;
use clap::{ArgAction, Parser, value_parser};
use std::path::PathBuf;

/// Environment variable read when `--token` is not given
pub const TOKEN_ENV: &str = "A4DOWNLOAD_TOKEN";

/// Download CT and PET series listed in patient worklist files from DaRIS,
/// re-identify them and pack one archive per subject.
#[derive(Parser, Debug)]
#[command(
    name = "a4download",
    version,
    about,
    override_usage = "a4download [options] [-o out-dir] [-d] worklist-files..."
)]
pub struct Cli {
    /// The mediaflux server host
    #[arg(long, value_name = "mflux-host", default_value = DEFAULT_HOST)]
    pub host: String,

    /// The mediaflux server port
    #[arg(
        long,
        value_name = "mflux-port",
        default_value_t = DEFAULT_PORT,
        value_parser = value_parser!(u16).range(1..)
    )]
    pub port: u16,

    /// The mediaflux server protocol
    #[arg(
        long,
        value_name = "mflux-protocol",
        value_enum,
        ignore_case = true,
        default_value_t = Protocol::Https
    )]
    pub protocol: Protocol,

    /// The secure identity token to authenticate with Mediaflux server
    #[arg(long, value_name = "secure-token", env = TOKEN_ENV, hide_env_values = true)]
    pub token: Option<String>,

    /// The output directory. If not specified, defaults to current directory
    #[arg(short = 'o', value_name = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Delete the input worklist txt file after downloading. If not
    /// specified, the worklist file will not be deleted
    #[arg(short = 'd')]
    pub delete_worklist: bool,

    /// Keep going with the remaining worklist files after one fails
    #[arg(long)]
    pub continue_on_error: bool,

    /// Increase logging (-vv reaches trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Patient worklist files
    #[arg(value_name = "worklist-files")]
    pub worklists: Vec<PathBuf>,
}

impl Cli {
    /// Build and validate the run configuration
    pub fn into_config(self) -> Result<Config> {
        let download_defaults = DownloadConfig::default();
        let config = Config {
            server: ServerConfig {
                host: self.host,
                port: self.port,
                protocol: self.protocol,
                token: self.token.filter(|t| !t.trim().is_empty()),
            },
            download: DownloadConfig {
                output_dir: self.output_dir.unwrap_or(download_defaults.output_dir),
                delete_worklist: self.delete_worklist,
                continue_on_error: self.continue_on_error,
            },
            worklists: self.worklists,
        };
        config.validate()?;
        Ok(config)
    }

    /// Log filter directive for the `-v` count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
