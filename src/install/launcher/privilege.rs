//! Process privilege detection and the elevation helper used on Unix

use serde::{Deserialize, Serialize};

/// Privilege of the current process, determined once at startup and passed down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    Elevated,
    Standard,
}

impl PrivilegeLevel {
    pub fn detect() -> Self {
        let elevated = is_elevated();
        log::debug!("Process elevated: {elevated}");
        if elevated {
            PrivilegeLevel::Elevated
        } else {
            PrivilegeLevel::Standard
        }
    }

    pub fn is_elevated(self) -> bool {
        matches!(self, PrivilegeLevel::Elevated)
    }
}

#[cfg(unix)]
fn is_elevated() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(windows)]
fn is_elevated() -> bool {
    use std::mem;

    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::Security::{
        GetTokenInformation, TOKEN_ELEVATION, TOKEN_QUERY, TokenElevation,
    };
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    let mut token = HANDLE::default();
    unsafe {
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token).is_err() {
            return false;
        }

        let mut elevation: TOKEN_ELEVATION = mem::zeroed();
        let mut return_length: u32 = 0;
        let queried = GetTokenInformation(
            token,
            TokenElevation,
            Some(&mut elevation as *mut _ as *mut std::ffi::c_void),
            mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut return_length,
        );
        let _ = CloseHandle(token);

        queried.is_ok() && elevation.TokenIsElevated != 0
    }
}

#[cfg(not(any(unix, windows)))]
fn is_elevated() -> bool {
    false
}

/// Program that asks the operator for consent and runs a command as root (Unix only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElevationTool {
    /// polkit agent; shows a graphical consent dialog
    Pkexec,
    /// terminal password prompt
    Sudo,
}

impl ElevationTool {
    pub fn program(self) -> &'static str {
        match self {
            ElevationTool::Pkexec => "pkexec",
            ElevationTool::Sudo => "sudo",
        }
    }

    /// Exit code that means the operator dismissed the prompt.
    ///
    /// sudo reports a refused password as a plain `1`, which cannot be told apart
    /// from a failing installer, so only pkexec denials are recognised.
    pub fn denial_exit_code(self) -> Option<i32> {
        match self {
            ElevationTool::Pkexec => Some(126),
            ElevationTool::Sudo => None,
        }
    }

    /// `preferred` if it is on `PATH`, otherwise the first of pkexec/sudo that is
    pub fn detect(preferred: Option<ElevationTool>) -> Option<ElevationTool> {
        let candidates = match preferred {
            Some(tool) => vec![tool],
            None => vec![ElevationTool::Pkexec, ElevationTool::Sudo],
        };
        candidates
            .into_iter()
            .find(|tool| which::which(tool.program()).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pkexec_has_a_denial_code() {
        assert_eq!(ElevationTool::Pkexec.denial_exit_code(), Some(126));
        assert_eq!(ElevationTool::Sudo.denial_exit_code(), None);
    }

    #[test]
    fn tool_names_deserialize_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            tool: ElevationTool,
        }
        let parsed: Wrapper = toml::from_str("tool = \"sudo\"").unwrap();
        assert_eq!(parsed.tool, ElevationTool::Sudo);
    }

    #[test]
    fn detected_level_is_consistent() {
        let level = PrivilegeLevel::detect();
        assert_eq!(level.is_elevated(), level == PrivilegeLevel::Elevated);
    }
}
