//! Process-private temporary namespace for downloads
//!
//! Layout: `<tmp>/quietinstall-<pid>/session-XXXXXX/<file>`. Every download gets its
//! own session directory; [`TempNamespace::cleanup`] removes them all at exit.

use std::io;
use std::path::{Path, PathBuf};

use log::debug;

#[derive(Debug, Clone)]
pub struct TempNamespace {
    root: PathBuf,
}

impl TempNamespace {
    /// Namespace under the system temp directory, keyed by process id
    pub fn for_process() -> Self {
        Self::at(std::env::temp_dir().join(format!("quietinstall-{}", std::process::id())))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, uniquely named session directory and return its path
    pub fn new_session(&self) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let dir = tempfile::Builder::new()
            .prefix("session-")
            .tempdir_in(&self.root)?;
        // The directory outlives this call; cleanup() owns its removal.
        Ok(dir.keep())
    }

    /// Delete every session directory, then the root. Failures are logged and skipped.
    ///
    /// Returns the number of session directories removed.
    pub fn cleanup(&self) -> usize {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Nothing to clean at {}: {}", self.root.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => debug!("Could not remove {}: {}", path.display(), e),
            }
        }

        if let Err(e) = std::fs::remove_dir(&self.root) {
            debug!("Could not remove {}: {}", self.root.display(), e);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_distinct_and_cleaned_up() {
        let scratch = tempfile::tempdir().unwrap();
        let ns = TempNamespace::at(scratch.path().join("ns"));

        let a = ns.new_session().unwrap();
        let b = ns.new_session().unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with(ns.root()));
        std::fs::write(a.join("partial.exe"), b"half").unwrap();

        assert_eq!(ns.cleanup(), 2);
        assert!(!ns.root().exists());
    }

    #[test]
    fn cleanup_of_missing_root_is_harmless() {
        let scratch = tempfile::tempdir().unwrap();
        let ns = TempNamespace::at(scratch.path().join("never-created"));
        assert_eq!(ns.cleanup(), 0);
    }

    #[test]
    fn process_namespace_is_keyed_by_pid() {
        let ns = TempNamespace::for_process();
        let name = ns.root().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, format!("quietinstall-{}", std::process::id()));
    }
}
