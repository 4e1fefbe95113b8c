//! Installation orchestration engine
//!
//! Takes a queue of installable items (local installer files or catalog entries)
//! to a terminal status: download with progress, silent-switch resolution,
//! elevation-aware launch with a bounded retry on a declined prompt, and a
//! post-install hook after a fully successful batch.

pub mod catalog;
pub mod core;
pub mod discovery;
pub mod download;
pub mod environment;
pub mod error;
pub mod hook;
pub mod launcher;
pub mod orchestration;
pub mod runners;
pub mod switches;
pub mod wizard;

pub use catalog::{
    BatchResult, Catalog, CatalogEntry, InstallOutcome, InstallableItem, ItemSource, Status,
};
pub use self::core::{AsyncTask, EngineEvent, EventSink};
pub use download::{Downloader, TempNamespace};
pub use error::{ArchiveError, CatalogError, DownloadError, LaunchError};
pub use hook::{HookReport, HookRunner};
pub use launcher::{
    DeclineRetry, ElevationPrompt, Launcher, LauncherConfig, PrivilegeLevel, ProcessRunner,
    SystemRunner,
};
pub use orchestration::Orchestrator;
