//! Streaming download of catalog payloads with progress tracking

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, info};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use url::Url;

use super::package::{PackageKind, unique_file_name};
use crate::config::DownloadSettings;
use crate::install::catalog::InstallableItem;
use crate::install::core::{EngineEvent, EventSink};
use crate::install::error::DownloadError;

/// HTTP downloader. One instance is shared by a whole run; calls are sequential.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    chunk_size: usize,
    inactivity_timeout: Duration,
}

impl Downloader {
    pub fn new(settings: &DownloadSettings) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            chunk_size: settings.chunk_size.max(1),
            inactivity_timeout: Duration::from_secs(settings.inactivity_timeout_secs),
        })
    }

    /// Stream the item's remote payload into `destination`.
    ///
    /// On success the item's `file_path` points at the finished file. On failure the
    /// partial file is left where it is; the temp namespace cleanup removes it later.
    /// The item's status is never touched here.
    pub async fn download(
        &self,
        item: &mut InstallableItem,
        index: usize,
        destination: &Path,
        events: &EventSink,
    ) -> Result<PathBuf, DownloadError> {
        let raw_url = item.remote_url().ok_or(DownloadError::MissingLocation)?;
        let url = Url::parse(raw_url).map_err(|source| DownloadError::InvalidUrl {
            url: raw_url.to_string(),
            source,
        })?;

        let kind = PackageKind::from_url(&url);
        let target = destination.join(unique_file_name(&item.name, kind));

        // send() resolves once headers are in, so the length is known before the body is read
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status(response.status()));
        }

        let total = response.content_length();
        item.total_bytes = total.unwrap_or(0);
        item.progress = total.map(|_| 0);
        info!(
            "Downloading {} from {} ({})",
            item.name,
            url,
            total.map_or_else(|| "unknown size".to_string(), |t| format!("{t} bytes"))
        );

        let mut file = tokio::fs::File::create(&target).await?;
        let mut stream = response.bytes_stream();
        let mut bytes_read: u64 = 0;

        loop {
            let chunk = match timeout(self.inactivity_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(None) => break,
                Err(_) => return Err(DownloadError::Stalled(self.inactivity_timeout)),
            };

            for piece in chunk.chunks(self.chunk_size) {
                file.write_all(piece).await?;
                bytes_read += piece.len() as u64;

                if let Some(t) = total {
                    item.progress = Some(percent_of(bytes_read, t));
                }
                events.send_best_effort(EngineEvent::DownloadProgress {
                    index,
                    bytes_read,
                    total_bytes: total,
                    percent: item.progress,
                });
            }
        }

        file.flush().await?;
        drop(file);

        if let Some(expected) = total {
            if bytes_read != expected {
                return Err(DownloadError::Incomplete {
                    expected,
                    received: bytes_read,
                });
            }
            item.progress = Some(100);
        } else {
            item.total_bytes = bytes_read;
        }

        debug!("Wrote {} bytes to {}", bytes_read, target.display());
        item.file_path = Some(target.clone());
        Ok(target)
    }
}

/// `floor(read * 100 / total)`, clamped to 100; an empty body counts as complete
fn percent_of(read: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (read.saturating_mul(100) / total).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_floors_and_clamps() {
        assert_eq!(percent_of(0, 1000), 0);
        assert_eq!(percent_of(9, 1000), 0);
        assert_eq!(percent_of(999, 1000), 99);
        assert_eq!(percent_of(1000, 1000), 100);
        assert_eq!(percent_of(5000, 1000), 100);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[tokio::test]
    async fn item_without_location_fails_before_any_io() {
        let downloader = Downloader::new(&DownloadSettings::default()).unwrap();
        let entry = crate::install::catalog::CatalogEntry {
            name: "Offline".to_string(),
            category: String::new(),
            download_url: None,
            silent_switches: None,
            vendor: None,
            version: None,
            architecture: None,
            needs_reboot: false,
            size: None,
        };
        let mut item = InstallableItem::from_catalog(std::sync::Arc::new(entry));
        let scratch = tempfile::tempdir().unwrap();

        let err = downloader
            .download(&mut item, 0, scratch.path(), &EventSink::detached())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::MissingLocation));
        assert!(item.file_path.is_none());
    }
}
