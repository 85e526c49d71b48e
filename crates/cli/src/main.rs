mod args;
mod batch;

use anyhow::{bail, Result};
use std::{fs::OpenOptions, path::Path, sync::Arc};

use aoexp_core::{
    config::{self, AppConfig},
    GameCatalog,
};
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::args::Command;

#[tokio::main]
async fn main() -> Result<()> {
    let args = match args::parse(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{}", args::USAGE);
            return Ok(());
        }
        Err(err) => {
            eprintln!("{}", args::USAGE);
            return Err(err);
        }
    };

    let written = config::ensure_default_config()?;
    let mut config = AppConfig::load()?;
    config.privacy |= args.privacy;
    init_logging(args.debug, config.log_file.as_deref())?;
    if let Some(path) = written {
        info!("wrote default configuration to {}", path.display());
    }

    let recordings = batch::recordings(&args)?;
    let catalog = match args.command {
        Command::Usernames => None,
        Command::Convert | Command::Analyse => {
            Some(Arc::new(GameCatalog::load(&config.catalog_path)?))
        }
    };
    info!("processing {} recording(s)", recordings.len());

    let results = batch::run_all(recordings, args.command, catalog, Arc::new(config)).await;
    let total = results.len();
    let mut failed = 0;
    for result in results {
        match result.output {
            Ok(text) => println!("{text}"),
            Err(err) => {
                failed += 1;
                error!("{}: {err:#}", result.name);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {total} recording(s) failed");
    }
    Ok(())
}

fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .compact()
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
