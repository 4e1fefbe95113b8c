//! Spawning installer processes

use std::path::PathBuf;
use std::process::Stdio;

use log::debug;
use tokio::process::Command;

use super::privilege::ElevationTool;
use crate::install::core::AsyncTask;
use crate::install::error::LaunchError;

/// How the installer process should be started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// The current process already has the privilege it needs. No window; output
    /// is piped back only when `capture` is set.
    Direct { capture: bool },
    /// Go through the platform's consent prompt. Output is never redirected.
    Elevated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub program: PathBuf,
    /// Full argument string; split with shell rules on Unix, passed raw on Windows
    pub args: String,
    pub mode: LaunchMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessExit {
    pub fn code(code: i32) -> Self {
        Self {
            code,
            ..Default::default()
        }
    }
}

/// Runs one process to completion.
///
/// The boundary between the launcher's decisions and the operating system.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, request: LaunchRequest) -> AsyncTask<Result<ProcessExit, LaunchError>>;
}

/// Real processes via tokio, with the platform's elevation mechanism for [`LaunchMode::Elevated`].
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    /// Used on Unix for elevated launches
    elevation_tool: Option<ElevationTool>,
}

impl SystemRunner {
    pub fn new(elevation_tool: Option<ElevationTool>) -> Self {
        Self { elevation_tool }
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, request: LaunchRequest) -> AsyncTask<Result<ProcessExit, LaunchError>> {
        debug!(
            "Launching {} {} ({:?})",
            request.program.display(),
            request.args,
            request.mode
        );

        match request.mode {
            LaunchMode::Direct { capture } => {
                let command = match direct_command(&request) {
                    Ok(command) => command,
                    Err(e) => return AsyncTask::ready(Err(e)),
                };
                let program = request.program;
                AsyncTask::from_future(run_direct(command, capture))
                    .map_err(move |source| LaunchError::Spawn { program, source })
            }
            LaunchMode::Elevated => self.run_elevated(request),
        }
    }
}

#[cfg(windows)]
fn direct_command(request: &LaunchRequest) -> Result<Command, LaunchError> {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    let mut command = Command::new(&request.program);
    // Installer switches (`/DIR="C:\Program Files\x"`) do not survive re-quoting
    command.raw_arg(&request.args);
    command.creation_flags(CREATE_NO_WINDOW);
    Ok(command)
}

#[cfg(not(windows))]
fn direct_command(request: &LaunchRequest) -> Result<Command, LaunchError> {
    let mut command = Command::new(&request.program);
    command.args(shell_words::split(&request.args)?);
    Ok(command)
}

async fn run_direct(mut command: Command, capture: bool) -> std::io::Result<ProcessExit> {
    command.stdin(Stdio::null()).kill_on_drop(false);

    if capture {
        let output = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?
            .wait_with_output()
            .await?;
        Ok(ProcessExit {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    } else {
        let status = command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        Ok(ProcessExit::code(status.code().unwrap_or(-1)))
    }
}

impl SystemRunner {
    #[cfg(windows)]
    fn run_elevated(&self, request: LaunchRequest) -> AsyncTask<Result<ProcessExit, LaunchError>> {
        AsyncTask::from_future(async move {
            let LaunchRequest { program, args, .. } = request;
            // ShellExecuteExW and the wait on its handle both block
            tokio::task::spawn_blocking(move || super::windows::run_as_admin(&program, &args))
                .await
                .map_err(|e| LaunchError::Wait(e.to_string()))?
                .map(ProcessExit::code)
        })
    }

    #[cfg(unix)]
    fn run_elevated(&self, request: LaunchRequest) -> AsyncTask<Result<ProcessExit, LaunchError>> {
        let Some(tool) = self.elevation_tool else {
            return AsyncTask::ready(Err(LaunchError::Unsupported));
        };

        AsyncTask::from_future(async move {
            let mut command = Command::new(tool.program());
            command
                .arg(&request.program)
                .args(shell_words::split(&request.args)?)
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());

            let status = command.status().await.map_err(|source| LaunchError::Spawn {
                program: PathBuf::from(tool.program()),
                source,
            })?;
            let code = status.code().unwrap_or(-1);

            if tool.denial_exit_code() == Some(code) {
                return Err(LaunchError::ElevationDenied);
            }
            Ok(ProcessExit::code(code))
        })
    }

    #[cfg(not(any(unix, windows)))]
    fn run_elevated(&self, _request: LaunchRequest) -> AsyncTask<Result<ProcessExit, LaunchError>> {
        AsyncTask::ready(Err(LaunchError::Unsupported))
    }
}
