//! Package format detection from the download URL

use url::Url;

/// File type of a downloaded installer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Executable, // .exe bootstrapper/installer
    Msi,        // Windows installer package
}

impl PackageKind {
    /// Inspect the URL path for a known package extension; anything else is treated as `.exe`
    pub fn from_url(url: &Url) -> Self {
        let last_segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if last_segment.ends_with(".msi") {
            PackageKind::Msi
        } else {
            PackageKind::Executable
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            PackageKind::Executable => "exe",
            PackageKind::Msi => "msi",
        }
    }
}

/// `<name>-<uuid>.<ext>` with anything outside `[A-Za-z0-9._-]` replaced by `_`
pub fn unique_file_name(display_name: &str, kind: PackageKind) -> String {
    let mut stem: String = display_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.trim_matches('_').is_empty() {
        stem = "installer".to_string();
    }

    format!("{}-{}.{}", stem, uuid::Uuid::new_v4().simple(), kind.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msi_detected_case_insensitively_ignoring_query() {
        let url = Url::parse("https://example.com/pkgs/Node-v20.MSI?token=abc").unwrap();
        assert_eq!(PackageKind::from_url(&url), PackageKind::Msi);
    }

    #[test]
    fn anything_else_defaults_to_exe() {
        for raw in [
            "https://example.com/download?id=42",
            "https://example.com/",
            "https://example.com/file.zip",
            "https://example.com/setup.exe",
        ] {
            let url = Url::parse(raw).unwrap();
            assert_eq!(PackageKind::from_url(&url), PackageKind::Executable, "{raw}");
        }
    }

    #[test]
    fn unique_names_are_sanitised_and_distinct() {
        let a = unique_file_name("Notepad++ 8.6", PackageKind::Executable);
        let b = unique_file_name("Notepad++ 8.6", PackageKind::Executable);
        assert_ne!(a, b);
        assert!(a.starts_with("Notepad___8.6-"));
        assert!(a.ends_with(".exe"));

        let blank = unique_file_name("***", PackageKind::Msi);
        assert!(blank.starts_with("installer-"));
        assert!(blank.ends_with(".msi"));
    }
}
