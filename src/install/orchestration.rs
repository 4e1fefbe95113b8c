//! Batch orchestration: drives selected items to a terminal status, one at a time
//!
//! Every stage is awaited from the single worker that owns the item slice, so two
//! installers never run at once. Stop requests are honoured between items only.

use std::path::PathBuf;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::catalog::{BatchResult, InstallOutcome, InstallableItem, ItemSource, Status};
use super::core::{EngineEvent, EventSink};
use super::download::{Downloader, TempNamespace};
use super::error::DownloadError;
use super::hook::HookRunner;
use super::launcher::Launcher;

pub struct Orchestrator {
    launcher: Launcher,
    downloader: Downloader,
    hook: Option<HookRunner>,
    temp: TempNamespace,
    events: EventSink,
    stop: CancellationToken,
}

impl Orchestrator {
    pub fn new(launcher: Launcher, downloader: Downloader, temp: TempNamespace) -> Self {
        Self {
            launcher,
            downloader,
            hook: None,
            temp,
            events: EventSink::detached(),
            stop: CancellationToken::new(),
        }
    }

    pub fn with_hook(mut self, hook: Option<HookRunner>) -> Self {
        self.hook = hook;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Token that stops the run after the current item; may be cancelled from any task
    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn request_stop(&self) {
        info!("Stop requested; finishing the current item");
        self.stop.cancel();
    }

    pub fn temp(&self) -> &TempNamespace {
        &self.temp
    }

    /// Install items whose file is already on disk, in selection order.
    pub async fn install_only(&self, items: &mut [InstallableItem]) -> BatchResult {
        let total = items.len();
        let mut batch = BatchResult {
            total,
            ..Default::default()
        };

        for (index, item) in items.iter_mut().enumerate() {
            if self.stop.is_cancelled() {
                info!("Stopped with {} item(s) left queued", total - index);
                break;
            }
            if item.status() != Status::Queued {
                debug!("Skipping {} ({})", item.name, item.status());
                continue;
            }

            batch.attempted += 1;
            self.set_status(index, item, Status::Installing).await;
            let outcome = self.launcher.install(item).await;
            self.settle(index, item, &outcome, &mut batch).await;
        }

        self.finish_batch(batch).await
    }

    /// Download catalog items, then install them; local files install directly.
    ///
    /// `cancel` is checked together with the orchestrator's own stop token, once per item.
    pub async fn download_then_install(
        &self,
        items: &mut [InstallableItem],
        cancel: &CancellationToken,
    ) -> BatchResult {
        let total = items.len();
        let mut batch = BatchResult {
            total,
            ..Default::default()
        };

        for (index, item) in items.iter_mut().enumerate() {
            if self.stop.is_cancelled() || cancel.is_cancelled() {
                info!("Stopped with {} item(s) left queued", total - index);
                break;
            }
            if item.status() != Status::Queued {
                debug!("Skipping {} ({})", item.name, item.status());
                continue;
            }

            batch.attempted += 1;

            let mut downloaded = None;
            if matches!(item.source, ItemSource::Catalog(_)) {
                self.set_status(index, item, Status::Downloading).await;
                match self.fetch(index, item).await {
                    Ok(path) => downloaded = Some(path),
                    Err(e) => {
                        warn!("Download of {} failed: {}", item.name, e);
                        self.set_status(index, item, Status::Failed).await;
                        self.report_progress(&batch).await;
                        continue;
                    }
                }
            }

            self.set_status(index, item, Status::Installing).await;
            let outcome = self.launcher.install(item).await;
            self.settle(index, item, &outcome, &mut batch).await;

            if outcome.succeeded
                && let Some(path) = downloaded
            {
                // Best effort; the temp namespace sweep catches anything left behind
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    debug!("Could not remove {}: {}", path.display(), e);
                }
            }
        }

        self.finish_batch(batch).await
    }

    async fn fetch(
        &self,
        index: usize,
        item: &mut InstallableItem,
    ) -> Result<PathBuf, DownloadError> {
        if item.remote_url().is_none() {
            return Err(DownloadError::MissingLocation);
        }
        let session = self.temp.new_session()?;
        self.downloader
            .download(item, index, &session, &self.events)
            .await
    }

    async fn set_status(&self, index: usize, item: &mut InstallableItem, status: Status) {
        if item.advance(status) {
            self.events
                .send(EngineEvent::StatusChanged {
                    index,
                    name: item.name.clone(),
                    status,
                })
                .await;
        }
    }

    async fn settle(
        &self,
        index: usize,
        item: &mut InstallableItem,
        outcome: &InstallOutcome,
        batch: &mut BatchResult,
    ) {
        if outcome.succeeded {
            batch.succeeded += 1;
            self.set_status(index, item, Status::Done).await;
        } else {
            if !outcome.stderr.is_empty() {
                debug!("{} stderr: {}", item.name, outcome.stderr.trim_end());
            }
            self.set_status(index, item, Status::Failed).await;
        }
        self.report_progress(batch).await;
    }

    /// Completed count grows by one for every attempted item that settled
    async fn report_progress(&self, batch: &BatchResult) {
        self.events
            .send(EngineEvent::BatchProgress {
                completed: batch.attempted,
                total: batch.total,
            })
            .await;
    }

    async fn finish_batch(&self, mut batch: BatchResult) -> BatchResult {
        info!(
            "Batch finished: {}/{} succeeded ({} queued)",
            batch.succeeded, batch.attempted, batch.total
        );

        if batch.all_succeeded() {
            if let Some(hook) = &self.hook {
                let report = hook.run().await;
                if !report.succeeded {
                    warn!("Post-install hook failed; installed items are unaffected");
                }
                batch.hook = Some(report);
            }
        } else if batch.attempted > 0 {
            info!("Not every item succeeded; skipping post-install hook");
        }

        self.events
            .send(EngineEvent::BatchFinished(batch.clone()))
            .await;
        batch
    }
}
