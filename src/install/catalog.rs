//! Catalog entries, installable items and their lifecycle

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::CatalogError;
use super::hook::HookReport;

/// Plain success
pub const EXIT_SUCCESS: i32 = 0;

/// `ERROR_SUCCESS_REBOOT_REQUIRED`: the installer finished but wants a restart
pub const EXIT_SUCCESS_REBOOT_REQUIRED: i32 = 3010;

/// Immutable descriptor of an installable program, as read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// Absent means "local only, cannot be fetched"
    #[serde(default)]
    pub download_url: Option<String>,
    /// Vendor-supplied unattended switches, used verbatim when present
    #[serde(default)]
    pub silent_switches: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub needs_reboot: bool,
    /// Human-readable size string from the catalog ("85 MB"), informational only
    #[serde(default)]
    pub size: Option<String>,
}

/// Parsed catalog file: `{ "software": [ ... ] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub software: Vec<CatalogEntry>,
}

impl Catalog {
    /// Load a catalog from JSON, or TOML when the file extension is `.toml`
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        let catalog: Catalog = if is_toml {
            toml::from_str(&text)?
        } else {
            serde_json::from_str(&text)?
        };

        log::info!(
            "Loaded {} catalog entries from {}",
            catalog.software.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Entries matching an optional category and an optional name selection.
    ///
    /// Both comparisons are case-insensitive. An empty `names` slice selects everything.
    pub fn select<'a>(
        &'a self,
        category: Option<&'a str>,
        names: &'a [String],
    ) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        self.software.iter().filter(move |entry| {
            let category_ok = category.is_none_or(|c| entry.category.eq_ignore_ascii_case(c));
            let name_ok = names.is_empty() || names.iter().any(|n| entry.name.eq_ignore_ascii_case(n));
            category_ok && name_ok
        })
    }
}

/// Lifecycle of an item within one run.
///
/// `Queued → Downloading → Installing → {Done | Failed}`; local files skip `Downloading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Queued,
    Downloading,
    Installing,
    Done,
    Failed,
}

impl Status {
    fn stage(self) -> u8 {
        match self {
            Status::Queued => 0,
            Status::Downloading => 1,
            Status::Installing => 2,
            Status::Done | Status::Failed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Queued => "queued",
            Status::Downloading => "downloading",
            Status::Installing => "installing",
            Status::Done => "done",
            Status::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Where an item comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource {
    LocalFile(PathBuf),
    Catalog(Arc<CatalogEntry>),
}

/// Mutable runtime record tracking one installer through the pipeline.
#[derive(Debug, Clone)]
pub struct InstallableItem {
    pub name: String,
    pub source: ItemSource,
    /// Known once the file is on disk: the local path, or where the downloader wrote it
    pub file_path: Option<PathBuf>,
    /// Best effort; 0 until learned
    pub total_bytes: u64,
    /// 0-100 while downloading, `None` when the total is unknown
    pub progress: Option<u8>,
    status: Status,
}

impl InstallableItem {
    /// Wrap a local installer file. The size is read from the filesystem.
    /// Item for an installer already on disk. Relative paths are made absolute against
    /// the current directory so the launch never falls back to a `PATH` lookup.
    pub fn from_local_file(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = std::path::absolute(path.into())?;
        let metadata = std::fs::metadata(&path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            source: ItemSource::LocalFile(path.clone()),
            file_path: Some(path),
            total_bytes: metadata.len(),
            progress: None,
            status: Status::Queued,
        })
    }

    pub fn from_catalog(entry: Arc<CatalogEntry>) -> Self {
        Self {
            name: entry.name.clone(),
            source: ItemSource::Catalog(entry),
            file_path: None,
            total_bytes: 0,
            progress: None,
            status: Status::Queued,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Move forward to `next`. Returns `false` (and leaves the status alone) on a regression
    /// or on any transition out of a terminal state.
    pub fn advance(&mut self, next: Status) -> bool {
        if self.status.is_terminal() || next.stage() < self.status.stage() {
            log::debug!(
                "Refusing status change {} -> {} for {}",
                self.status,
                next,
                self.name
            );
            return false;
        }
        self.status = next;
        true
    }

    /// External clear/reset: back to `Queued` with progress forgotten
    pub fn reset(&mut self) {
        self.status = Status::Queued;
        self.progress = None;
        if let ItemSource::Catalog(_) = self.source {
            self.file_path = None;
            self.total_bytes = 0;
        }
    }

    pub fn catalog_entry(&self) -> Option<&CatalogEntry> {
        match &self.source {
            ItemSource::Catalog(entry) => Some(entry),
            ItemSource::LocalFile(_) => None,
        }
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.catalog_entry()
            .and_then(|e| e.download_url.as_deref())
            .filter(|u| !u.trim().is_empty())
    }

    pub fn silent_switches(&self) -> Option<&str> {
        self.catalog_entry().and_then(|e| e.silent_switches.as_deref())
    }
}

/// Result of one launcher invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub exit_code: i32,
    pub succeeded: bool,
    /// Empty unless output capture was requested
    pub stdout: String,
    pub stderr: String,
}

impl InstallOutcome {
    pub fn from_exit(exit_code: i32, stdout: String, stderr: String) -> Self {
        Self {
            exit_code,
            succeeded: is_success_exit_code(exit_code),
            stdout,
            stderr,
        }
    }

    /// The process never ran (missing file, spawn error, denied elevation)
    pub fn not_started(reason: impl Into<String>) -> Self {
        Self {
            exit_code: -1,
            succeeded: false,
            stdout: String::new(),
            stderr: reason.into(),
        }
    }
}

/// Exit code 0 and the reboot-required sentinel are the only successes
pub fn is_success_exit_code(code: i32) -> bool {
    code == EXIT_SUCCESS || code == EXIT_SUCCESS_REBOOT_REQUIRED
}

/// Aggregate over one processed batch
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total: usize,
    pub attempted: usize,
    pub succeeded: usize,
    /// Present only when the post-install hook ran
    pub hook: Option<HookReport>,
}

impl BatchResult {
    /// At least one item was attempted and every attempted item reached `Done`
    pub fn all_succeeded(&self) -> bool {
        self.attempted > 0 && self.attempted == self.succeeded
    }
}
