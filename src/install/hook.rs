//! Post-install hook: one shell command run after a fully successful batch

use std::process::Stdio;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Default length of the captured-output previews, in characters
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// What the hook did. Failure here never changes item statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookReport {
    pub succeeded: bool,
    /// `None` when the command could not be started or was killed by a signal
    pub exit_code: Option<i32>,
    /// Truncated preview of standard output
    pub stdout: String,
    /// Truncated preview of standard error (or the spawn error)
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct HookRunner {
    command: String,
    preview_chars: usize,
}

impl HookRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the command through the platform shell and wait for it.
    ///
    /// Both streams are read line by line while the process runs, so a chatty
    /// command cannot fill a pipe and stall.
    pub async fn run(&self) -> HookReport {
        info!("Running post-install hook: {}", self.command);

        let mut child = match shell_command(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("Post-install hook could not start: {}", e);
                return HookReport {
                    succeeded: false,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: truncate_preview(&e.to_string(), self.preview_chars),
                };
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (out, err) = tokio::join!(
            collect_lines(stdout, self.preview_chars),
            collect_lines(stderr, self.preview_chars)
        );

        let exit_code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                warn!("Failed waiting for post-install hook: {}", e);
                None
            }
        };
        let succeeded = exit_code == Some(0);

        if succeeded {
            info!("Post-install hook finished");
        } else {
            warn!("Post-install hook failed (exit code {:?})", exit_code);
        }

        HookReport {
            succeeded,
            exit_code,
            stdout: out.preview(self.preview_chars),
            stderr: err.preview(self.preview_chars),
        }
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Output kept from one stream. Reading continues after the cap so the pipe never fills.
#[derive(Debug, Default)]
struct Captured {
    text: String,
    chars: usize,
    dropped: bool,
}

impl Captured {
    fn preview(&self, max_chars: usize) -> String {
        let mut preview = truncate_preview(&self.text, max_chars);
        if self.dropped && !preview.ends_with("...") {
            preview.push_str("...");
        }
        preview
    }
}

async fn collect_lines<R>(stream: Option<R>, cap_chars: usize) -> Captured
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let Some(stream) = stream else {
        return captured;
    };

    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!("hook: {}", line);
                if captured.chars > cap_chars {
                    captured.dropped = true;
                    continue;
                }
                captured.chars += line.chars().count() + 1;
                captured.text.push_str(&line);
                captured.text.push('\n');
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading hook output: {}", e);
                break;
            }
        }
    }
    captured
}

/// First `max_chars` characters of `text`, with `...` appended when something was cut
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    let text = text.trim_end();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
