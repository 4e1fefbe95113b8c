use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::error;

use quietinstall::cli::{Cli, Command};
use quietinstall::config::{self, AppConfig};
use quietinstall::install::runners;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(real_main(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn real_main(cli: Cli) -> Result<bool> {
    let cfg_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };
    let cfg = AppConfig::load_or_create(&cfg_path)?;

    match &cli.command {
        Command::Install { paths, scan } => {
            runners::run_install(&cli, &cfg, paths, scan.as_ref()).await
        }
        Command::Catalog {
            file,
            category,
            select,
            list,
        } => runners::run_catalog(&cli, &cfg, file, category.as_deref(), select, *list).await,
    }
}
