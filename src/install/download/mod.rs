//! Remote payload download
//!
//! ## Module Organization
//!
//! - `core` - streaming HTTP download with per-chunk progress
//! - `package` - package format detection and unique file naming
//! - `temp` - process-private temporary namespace with per-download sessions

mod core;
mod package;
mod temp;

pub use self::core::Downloader;
pub use package::{PackageKind, unique_file_name};
pub use temp::TempNamespace;
