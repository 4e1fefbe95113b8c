use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::install::hook::DEFAULT_PREVIEW_CHARS;
use crate::install::launcher::ElevationTool;

/// Top-level configuration, read from `quietinstall.toml`.
///
/// Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture installer stdout/stderr (only when already running elevated)
    pub verbose_capture: bool,
    /// Extra launch attempts offered after an elevation prompt is declined
    pub elevation_retries: u32,
    /// Unix elevation helper; auto-detected (pkexec, then sudo) when unset
    pub elevation_tool: Option<ElevationTool>,
    /// Folder scanned by `install` when no paths are given
    pub scan_dir: Option<PathBuf>,
    /// How deep the scan descends
    pub scan_depth: usize,
    pub download: DownloadSettings,
    pub hook: HookSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose_capture: false,
            elevation_retries: 1,
            elevation_tool: None,
            scan_dir: None,
            scan_depth: 1,
            download: DownloadSettings::default(),
            hook: HookSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    pub connect_timeout_secs: u64,
    /// Abort a download when no bytes arrive for this long
    pub inactivity_timeout_secs: u64,
    pub user_agent: String,
    /// Bytes written per progress update
    pub chunk_size: usize,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            inactivity_timeout_secs: 300,
            user_agent: format!("quietinstall/{}", env!("CARGO_PKG_VERSION")),
            chunk_size: 64 * 1024,
        }
    }
}

/// Post-install hook; disabled while `command` is unset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HookSettings {
    pub command: Option<String>,
    pub preview_chars: usize,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            command: None,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

/// `<config dir>/quietinstall/quietinstall.toml`
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("quietinstall");
    Ok(config_dir.join("quietinstall.toml"))
}

impl AppConfig {
    /// Read the config at `path`, writing the defaults there first if it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "Config not found at {}, creating default configuration",
                path.display()
            );
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            let default_toml = toml::to_string_pretty(&AppConfig::default())
                .context("Failed to serialize default config")?;
            fs::write(path, default_toml).context("Failed to write config file")?;
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Using config from: {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("quietinstall.toml");

        let config = AppConfig::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.elevation_retries, 1);
        assert_eq!(config.hook.preview_chars, 500);
        assert_eq!(config.download.chunk_size, 65536);

        // The written file parses back to the same values
        let again = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(again.download.user_agent, config.download.user_agent);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quietinstall.toml");
        std::fs::write(
            &path,
            "elevation_tool = \"sudo\"\n[hook]\ncommand = \"echo done\"\n",
        )
        .unwrap();

        let config = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(config.elevation_tool, Some(ElevationTool::Sudo));
        assert_eq!(config.hook.command.as_deref(), Some("echo done"));
        assert_eq!(config.hook.preview_chars, 500);
        assert_eq!(config.download.inactivity_timeout_secs, 300);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quietinstall.toml");
        std::fs::write(&path, "elevation_retries = \"lots\"").unwrap();
        assert!(AppConfig::load_or_create(&path).is_err());
    }
}
