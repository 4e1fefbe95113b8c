//! Local installer discovery
//!
//! Turns loose paths (command line, a scanned folder, a drop target) into queued
//! items. Installers are picked up by extension; zip archives are unpacked into a
//! temp session and every installer inside is queued in their place.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use super::catalog::InstallableItem;
use super::download::TempNamespace;
use super::error::ArchiveError;

/// Extensions accepted as installers, compared case-insensitively
pub const INSTALLER_EXTENSIONS: &[&str] = &["exe", "msi"];

/// Archive extensions unpacked at intake
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip"];

fn has_extension(path: &Path, known: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| known.iter().any(|k| ext.eq_ignore_ascii_case(k)))
}

pub fn is_installer_file(path: &Path) -> bool {
    has_extension(path, INSTALLER_EXTENSIONS)
}

pub fn is_archive_file(path: &Path) -> bool {
    has_extension(path, ARCHIVE_EXTENSIONS)
}

/// Installer and archive files under `dir`, up to `max_depth` levels deep, sorted by path
pub fn scan_dir(dir: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file()
                && (is_installer_file(entry.path()) || is_archive_file(entry.path()))
        })
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}

/// Unpack a zip archive into a fresh session of `temp` and return the installers it held.
///
/// Entries whose names would escape the session directory are skipped. Archives
/// nested inside the archive are left unpacked.
pub fn extract_installers(
    archive: &Path,
    temp: &TempNamespace,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let file = File::open(archive).map_err(|source| ArchiveError::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = ZipArchive::new(file)?;
    let session = temp.new_session()?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe archive entry {}", entry.name());
            continue;
        };
        let target = session.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
    }

    let installers: Vec<PathBuf> = scan_dir(&session, usize::MAX)
        .into_iter()
        .filter(|path| is_installer_file(path))
        .collect();
    info!(
        "Extracted {}: {} installer(s) found",
        archive.display(),
        installers.len()
    );
    Ok(installers)
}

/// Wrap paths into queued items, keeping the given order.
///
/// Archives are replaced by the installers they contain. Anything else that is not
/// an installer, and duplicates (after canonicalisation), are dropped with a warning.
/// Blocking; run it off the async workers.
pub fn items_from_paths<I>(paths: I, temp: &TempNamespace) -> Vec<InstallableItem>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for path in paths {
        if is_archive_file(&path) {
            match extract_installers(&path, temp) {
                Ok(found) => {
                    for installer in found {
                        push_installer(&mut items, &mut seen, installer);
                    }
                }
                Err(e) => warn!("Ignoring {}: {}", path.display(), e),
            }
            continue;
        }
        if !is_installer_file(&path) {
            warn!("Ignoring {}: not an .exe, .msi or .zip file", path.display());
            continue;
        }
        push_installer(&mut items, &mut seen, path);
    }
    items
}

fn push_installer(items: &mut Vec<InstallableItem>, seen: &mut HashSet<PathBuf>, path: PathBuf) {
    let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
    if !seen.insert(key) {
        debug!("Ignoring duplicate {}", path.display());
        return;
    }
    match InstallableItem::from_local_file(&path) {
        Ok(item) => items.push(item),
        Err(e) => warn!("Ignoring {}: {}", path.display(), e),
    }
}
