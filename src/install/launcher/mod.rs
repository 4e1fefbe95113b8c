//! Elevation-aware installer launch
//!
//! ## Module Organization
//!
//! - `privilege` - privilege detection and the Unix elevation helper
//! - `runner` - the [`ProcessRunner`] seam and its tokio implementation
//! - `windows` - UAC launch via `ShellExecuteExW` (Windows only)

mod privilege;
mod runner;
#[cfg(windows)]
mod windows;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};

pub use privilege::{ElevationTool, PrivilegeLevel};
pub use runner::{LaunchMode, LaunchRequest, ProcessExit, ProcessRunner, SystemRunner};

use crate::install::catalog::{InstallOutcome, InstallableItem};
use crate::install::core::AsyncTask;
use crate::install::error::LaunchError;
use crate::install::switches::{self, PACKAGE_MANAGER};

/// Everything the launcher needs to know about its environment, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LauncherConfig {
    pub privilege: PrivilegeLevel,
    /// Pipe installer output back (only possible when already elevated)
    pub capture_output: bool,
    /// Extra launch attempts offered after the operator declines elevation
    pub elevation_retries: u32,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            privilege: PrivilegeLevel::Standard,
            capture_output: false,
            elevation_retries: 1,
        }
    }
}

/// Asks the operator whether a declined elevation prompt should be shown again
pub trait ElevationPrompt: Send + Sync {
    /// `attempt` is the number of launches made so far for this item
    fn offer_retry(&self, item_name: &str, attempt: u32) -> AsyncTask<bool>;
}

/// Never retries. Used when nobody is at the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineRetry;

impl ElevationPrompt for DeclineRetry {
    fn offer_retry(&self, _item_name: &str, _attempt: u32) -> AsyncTask<bool> {
        AsyncTask::ready(false)
    }
}

/// Builds the command line for an item, starts it at the right privilege and
/// classifies the exit code. Never fails: every problem becomes a failed outcome.
#[derive(Clone)]
pub struct Launcher {
    config: LauncherConfig,
    runner: Arc<dyn ProcessRunner>,
    prompt: Arc<dyn ElevationPrompt>,
}

impl Launcher {
    pub fn new(
        config: LauncherConfig,
        runner: Arc<dyn ProcessRunner>,
        prompt: Arc<dyn ElevationPrompt>,
    ) -> Self {
        Self {
            config,
            runner,
            prompt,
        }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Program and argument string for an installer file.
    ///
    /// Packages go through the package manager; everything else runs itself
    /// with resolved silent switches.
    pub fn command_for(path: &Path, catalog_switches: Option<&str>) -> (PathBuf, String) {
        if switches::is_package_file(path) {
            return (
                PathBuf::from(PACKAGE_MANAGER),
                switches::package_command_line(path),
            );
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let resolved = switches::resolve(&file_name, catalog_switches);
        log::debug!("Switches for {}: {:?}", file_name, resolved.source);
        (path.to_path_buf(), resolved.args)
    }

    fn mode(&self) -> LaunchMode {
        if self.config.privilege.is_elevated() {
            LaunchMode::Direct {
                capture: self.config.capture_output,
            }
        } else {
            LaunchMode::Elevated
        }
    }

    /// Run the item's installer to completion.
    ///
    /// The item must already have a file path. At most `1 + elevation_retries`
    /// processes are started, and only denied elevations lead to another one.
    pub async fn install(&self, item: &InstallableItem) -> InstallOutcome {
        let Some(path) = item.file_path.as_deref() else {
            warn!("{} has no installer file", item.name);
            return InstallOutcome::not_started("no installer file");
        };
        if !path.is_file() {
            warn!("Installer for {} not found at {}", item.name, path.display());
            return InstallOutcome::not_started(format!("{} not found", path.display()));
        }

        let mode = self.mode();
        let mut attempts: u32 = 0;

        loop {
            let (program, args) = Self::command_for(path, item.silent_switches());
            attempts += 1;
            info!("Installing {} (attempt {})", item.name, attempts);

            let request = LaunchRequest {
                program,
                args,
                mode,
            };

            match self.runner.run(request).await {
                Ok(exit) => {
                    let outcome = InstallOutcome::from_exit(exit.code, exit.stdout, exit.stderr);
                    if outcome.succeeded {
                        info!("{} installed (exit code {})", item.name, outcome.exit_code);
                    } else {
                        warn!("{} failed with exit code {}", item.name, outcome.exit_code);
                    }
                    return outcome;
                }
                Err(LaunchError::ElevationDenied) => {
                    if attempts > self.config.elevation_retries {
                        warn!("Elevation declined for {}, giving up", item.name);
                        return InstallOutcome::not_started(LaunchError::ElevationDenied.to_string());
                    }
                    if !self.prompt.offer_retry(&item.name, attempts).await {
                        warn!("Elevation declined for {}, not retrying", item.name);
                        return InstallOutcome::not_started(LaunchError::ElevationDenied.to_string());
                    }
                }
                Err(e) => {
                    error!("Could not launch installer for {}: {}", item.name, e);
                    return InstallOutcome::not_started(e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::install::switches::EULA_SUFFIX;

    #[derive(Default)]
    struct ScriptedRunner {
        replies: Mutex<VecDeque<Result<ProcessExit, LaunchError>>>,
        seen: Mutex<Vec<LaunchRequest>>,
    }

    impl ScriptedRunner {
        fn replying(replies: Vec<Result<ProcessExit, LaunchError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::default(),
            })
        }

        fn launches(&self) -> Vec<LaunchRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl ProcessRunner for ScriptedRunner {
        fn run(&self, request: LaunchRequest) -> AsyncTask<Result<ProcessExit, LaunchError>> {
            self.seen.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(ProcessExit::code(0)));
            AsyncTask::ready(reply)
        }
    }

    struct CountingPrompt {
        answer: bool,
        asked: AtomicU32,
    }

    impl CountingPrompt {
        fn answering(answer: bool) -> Arc<Self> {
            Arc::new(Self {
                answer,
                asked: AtomicU32::new(0),
            })
        }
    }

    impl ElevationPrompt for CountingPrompt {
        fn offer_retry(&self, _item_name: &str, _attempt: u32) -> AsyncTask<bool> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            AsyncTask::ready(self.answer)
        }
    }

    fn local_item(dir: &Path, name: &str) -> InstallableItem {
        let path = dir.join(name);
        std::fs::write(&path, b"MZ").unwrap();
        InstallableItem::from_local_file(path).unwrap()
    }

    fn launcher(
        privilege: PrivilegeLevel,
        runner: Arc<ScriptedRunner>,
        prompt: Arc<CountingPrompt>,
    ) -> Launcher {
        let config = LauncherConfig {
            privilege,
            capture_output: true,
            elevation_retries: 1,
        };
        Launcher::new(config, runner, prompt)
    }

    #[test]
    fn msi_uses_package_manager() {
        let (program, args) = Launcher::command_for(Path::new("/dl/tool.MSI"), Some("/S"));
        assert_eq!(program, PathBuf::from("msiexec"));
        assert!(args.starts_with("/i "));
        assert!(args.contains("/qn"));
    }

    #[test]
    fn exe_runs_itself_with_resolved_switches() {
        let (program, args) = Launcher::command_for(Path::new("/dl/installer.exe"), None);
        assert_eq!(program, PathBuf::from("/dl/installer.exe"));
        assert_eq!(args, format!("/S {EULA_SUFFIX}"));
    }

    #[tokio::test]
    async fn elevated_process_launches_directly_with_capture() {
        let dir = tempfile::tempdir().unwrap();
        let item = local_item(dir.path(), "installer.exe");
        let runner = ScriptedRunner::replying(vec![Ok(ProcessExit {
            code: 3010,
            stdout: "ok".to_string(),
            stderr: String::new(),
        })]);

        let outcome = launcher(PrivilegeLevel::Elevated, runner.clone(), CountingPrompt::answering(true))
            .install(&item)
            .await;

        assert!(outcome.succeeded);
        assert_eq!(outcome.exit_code, 3010);
        assert_eq!(outcome.stdout, "ok");
        assert_eq!(runner.launches()[0].mode, LaunchMode::Direct { capture: true });
    }

    #[tokio::test]
    async fn relative_local_file_launches_by_absolute_path() {
        let dir = tempfile::Builder::new()
            .prefix("launch-relative-")
            .tempdir_in(".")
            .unwrap();
        let relative = Path::new(dir.path().file_name().unwrap()).join("setup.exe");
        std::fs::write(&relative, b"MZ").unwrap();
        let item = InstallableItem::from_local_file(&relative).unwrap();
        let runner = ScriptedRunner::replying(vec![Ok(ProcessExit::code(0))]);

        let outcome = launcher(PrivilegeLevel::Elevated, runner.clone(), CountingPrompt::answering(true))
            .install(&item)
            .await;

        assert!(outcome.succeeded);
        let program = &runner.launches()[0].program;
        assert!(program.is_absolute(), "{}", program.display());
        assert!(program.ends_with(&relative));
    }

    #[tokio::test]
    async fn standard_process_requests_elevation() {
        let dir = tempfile::tempdir().unwrap();
        let item = local_item(dir.path(), "installer.exe");
        let runner = ScriptedRunner::replying(vec![Ok(ProcessExit::code(1))]);

        let outcome = launcher(PrivilegeLevel::Standard, runner.clone(), CountingPrompt::answering(true))
            .install(&item)
            .await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.exit_code, 1);
        assert_eq!(runner.launches()[0].mode, LaunchMode::Elevated);
    }

    #[tokio::test]
    async fn denied_elevation_is_retried_once_when_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let item = local_item(dir.path(), "installer.exe");
        let runner = ScriptedRunner::replying(vec![
            Err(LaunchError::ElevationDenied),
            Ok(ProcessExit::code(0)),
        ]);
        let prompt = CountingPrompt::answering(true);

        let outcome = launcher(PrivilegeLevel::Standard, runner.clone(), prompt.clone())
            .install(&item)
            .await;

        assert!(outcome.succeeded);
        assert_eq!(runner.launches().len(), 2);
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let item = local_item(dir.path(), "installer.exe");
        let runner = ScriptedRunner::replying(vec![
            Err(LaunchError::ElevationDenied),
            Err(LaunchError::ElevationDenied),
            Err(LaunchError::ElevationDenied),
        ]);
        let prompt = CountingPrompt::answering(true);

        let outcome = launcher(PrivilegeLevel::Standard, runner.clone(), prompt.clone())
            .install(&item)
            .await;

        assert!(!outcome.succeeded);
        assert_eq!(runner.launches().len(), 2);
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn declined_retry_fails_without_relaunch() {
        let dir = tempfile::tempdir().unwrap();
        let item = local_item(dir.path(), "installer.exe");
        let runner = ScriptedRunner::replying(vec![Err(LaunchError::ElevationDenied)]);

        let outcome = launcher(PrivilegeLevel::Standard, runner.clone(), CountingPrompt::answering(false))
            .install(&item)
            .await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.exit_code, -1);
        assert_eq!(runner.launches().len(), 1);
    }

    #[tokio::test]
    async fn spawn_failure_is_a_failed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let item = local_item(dir.path(), "installer.exe");
        let runner = ScriptedRunner::replying(vec![Err(LaunchError::Spawn {
            program: PathBuf::from("installer.exe"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        })]);
        let prompt = CountingPrompt::answering(true);

        let outcome = launcher(PrivilegeLevel::Elevated, runner, prompt.clone())
            .install(&item)
            .await;

        assert!(!outcome.succeeded);
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_file_never_launches() {
        let dir = tempfile::tempdir().unwrap();
        let mut item = local_item(dir.path(), "installer.exe");
        item.file_path = Some(dir.path().join("gone.exe"));
        let runner = ScriptedRunner::replying(vec![]);

        let outcome = launcher(PrivilegeLevel::Elevated, runner.clone(), CountingPrompt::answering(true))
            .install(&item)
            .await;

        assert!(!outcome.succeeded);
        assert!(runner.launches().is_empty());
    }
}
