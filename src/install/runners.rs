//! Top-level runners for the `install` and `catalog` commands
//!
//! Both wire an [`Orchestrator`] to a progress renderer and Ctrl-C, run one batch,
//! clean the temp namespace and print the summary.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{info, warn};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::catalog::{BatchResult, Catalog, InstallableItem, Status};
use super::core::{EngineEvent, EventSink};
use super::discovery;
use super::download::{Downloader, TempNamespace};
use super::environment;
use super::hook::HookRunner;
use super::launcher::{
    DeclineRetry, ElevationPrompt, ElevationTool, Launcher, LauncherConfig, PrivilegeLevel,
    SystemRunner,
};
use super::orchestration::Orchestrator;
use super::wizard::{self, status_style};
use crate::cli::Cli;
use crate::config::AppConfig;

/// Install local files. Returns whether every attempted item succeeded.
pub async fn run_install(
    cli: &Cli,
    config: &AppConfig,
    paths: &[PathBuf],
    scan: Option<&PathBuf>,
) -> Result<bool> {
    let mut candidates = paths.to_vec();
    let scan_dir = scan.or_else(|| {
        // The configured folder only applies when nothing was named explicitly
        if paths.is_empty() {
            config.scan_dir.as_ref()
        } else {
            None
        }
    });
    if let Some(dir) = scan_dir {
        info!("Scanning {} for installers", dir.display());
        candidates.extend(discovery::scan_dir(dir, config.scan_depth));
    }

    let orchestrator = build_orchestrator(cli, config)?;
    let temp = orchestrator.temp().clone();
    let mut items =
        tokio::task::spawn_blocking(move || discovery::items_from_paths(candidates, &temp))
            .await
            .context("Installer discovery panicked")?;
    if items.is_empty() {
        orchestrator.temp().cleanup();
        anyhow::bail!("No installers to run (pass .exe/.msi/.zip paths or --scan DIR)");
    }

    banner(&format!("Installing {} item(s)", items.len()));
    let (events, renderer) = spawn_renderer(items.len());
    let orchestrator = orchestrator.with_events(events);
    let ctrl_c = on_ctrl_c(orchestrator.stop_handle());

    let batch = orchestrator.install_only(&mut items).await;

    finish(orchestrator, ctrl_c, renderer, &items, &batch).await;
    Ok(batch.all_succeeded())
}

/// Download and install catalog entries. Returns whether every attempted item succeeded.
pub async fn run_catalog(
    cli: &Cli,
    config: &AppConfig,
    file: &std::path::Path,
    category: Option<&str>,
    select: &[String],
    list: bool,
) -> Result<bool> {
    let catalog = Catalog::load(file)
        .with_context(|| format!("Failed to load catalog {}", file.display()))?;

    if list {
        wizard::print_catalog(catalog.select(category, select));
        return Ok(true);
    }

    let mut items: Vec<InstallableItem> = catalog
        .select(category, select)
        .map(|entry| InstallableItem::from_catalog(Arc::new(entry.clone())))
        .collect();
    if items.is_empty() {
        anyhow::bail!("No catalog entries match the selection");
    }

    banner(&format!("Downloading and installing {} item(s)", items.len()));
    let (events, renderer) = spawn_renderer(items.len());
    let orchestrator = build_orchestrator(cli, config)?.with_events(events);
    let cancel = CancellationToken::new();
    let ctrl_c = on_ctrl_c(cancel.clone());

    let batch = orchestrator.download_then_install(&mut items, &cancel).await;

    finish(orchestrator, ctrl_c, renderer, &items, &batch).await;
    Ok(batch.all_succeeded())
}

fn build_orchestrator(cli: &Cli, config: &AppConfig) -> Result<Orchestrator> {
    let privilege = PrivilegeLevel::detect();
    let elevation_tool = ElevationTool::detect(config.elevation_tool);
    if cfg!(unix) && !privilege.is_elevated() && elevation_tool.is_none() {
        warn!("Not running as root and neither pkexec nor sudo was found; installs will fail");
    }

    let interactive = !cli.no_interaction && environment::is_interactive();
    let prompt: Arc<dyn ElevationPrompt> = if interactive {
        Arc::new(wizard::InquirePrompt)
    } else {
        Arc::new(DeclineRetry)
    };

    let launcher = Launcher::new(
        LauncherConfig {
            privilege,
            capture_output: config.verbose_capture || cli.verbose,
            elevation_retries: config.elevation_retries,
        },
        Arc::new(SystemRunner::new(elevation_tool)),
        prompt,
    );
    let downloader =
        Downloader::new(&config.download).context("Failed to create HTTP client")?;

    let hook = if cli.no_hook {
        None
    } else {
        config
            .hook
            .command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(|c| HookRunner::new(c).with_preview_chars(config.hook.preview_chars))
    };

    Ok(Orchestrator::new(launcher, downloader, TempNamespace::for_process()).with_hook(hook))
}

fn on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping after the current item");
            token.cancel();
        }
    })
}

/// Spawn the task that turns engine events into progress bars
fn spawn_renderer(total: usize) -> (EventSink, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<EngineEvent>(256);

    let multi = if environment::wants_progress_bars() {
        MultiProgress::new()
    } else {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    };

    let overall = multi.add(ProgressBar::new(total as u64));
    overall.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    let download = multi.add(ProgressBar::new(0));
    download.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.green/blue}] {bytes}/{total_bytes}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );

    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                EngineEvent::StatusChanged {
                    index,
                    name,
                    status,
                } => {
                    let style = status_style(status);
                    overall.set_message(format!("{} {}", style.icon, name));
                    let _ = multi.println(format!(
                        "  {} {:<11} #{} {}",
                        style.icon,
                        style.label,
                        index + 1,
                        name
                    ));
                    if status == Status::Downloading {
                        download.reset();
                        download.set_length(0);
                        download.set_message(name);
                    }
                }
                EngineEvent::DownloadProgress {
                    bytes_read,
                    total_bytes,
                    ..
                } => {
                    if let Some(total) = total_bytes {
                        download.set_length(total);
                    }
                    download.set_position(bytes_read);
                }
                EngineEvent::BatchProgress { completed, .. } => {
                    overall.set_position(completed as u64);
                }
                EngineEvent::BatchFinished(_) => break,
            }
        }
        download.finish_and_clear();
        overall.finish_and_clear();
    });

    (EventSink::new(tx), handle)
}

async fn finish(
    orchestrator: Orchestrator,
    ctrl_c: JoinHandle<()>,
    renderer: JoinHandle<()>,
    items: &[InstallableItem],
    batch: &BatchResult,
) {
    ctrl_c.abort();
    let temp = orchestrator.temp().clone();
    // Release the last sender so the renderer drains and exits
    drop(orchestrator);
    let _ = renderer.await;

    let removed = temp.cleanup();
    if removed > 0 {
        info!("Removed {} temporary download folder(s)", removed);
    }

    wizard::print_summary(items, batch);
}

fn banner(text: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    let _ = writeln!(stdout, "⚡ {text}\n");
    let _ = stdout.reset();
}
