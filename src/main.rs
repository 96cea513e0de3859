use a4download::{Cli, Config, DeferredCleanup, Downloader, MediafluxClient, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = e.print();
            return code;
        }
    };
    init_tracing(cli.log_level());

    let deferred = Arc::new(DeferredCleanup::new());
    let result = match cli.into_config() {
        Ok(config) => run(config, deferred.clone()).await,
        Err(e) => Err(e),
    };

    let leftover = deferred.run();
    if !leftover.is_empty() {
        warn!(count = leftover.len(), "some intermediate files could not be deleted");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            let _ = Cli::command().print_help();
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, deferred: Arc<DeferredCleanup>) -> Result<()> {
    let client = MediafluxClient::connect(&config.server).await?;
    let downloader = Downloader::new(client, config.download, deferred);

    let result = downloader.download_all(&config.worklists).await;

    if let Err(e) = downloader.into_client().close().await {
        warn!(error = %e, "failed to log off");
    }

    for archive in result? {
        info!(archive = %archive.display(), "done");
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("a4download={level}")));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
