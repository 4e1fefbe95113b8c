//! UAC elevation through `ShellExecuteExW` with the `runas` verb

use std::mem;
use std::path::Path;

use windows::Win32::Foundation::{CloseHandle, ERROR_CANCELLED};
use windows::Win32::System::Threading::{GetExitCodeProcess, INFINITE, WaitForSingleObject};
use windows::Win32::UI::Shell::{SEE_MASK_NOCLOSEPROCESS, SHELLEXECUTEINFOW, ShellExecuteExW};
use windows::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;
use windows::core::{HSTRING, PCWSTR};

use crate::install::error::LaunchError;

/// Start `program` elevated and block until it exits. Must run off the async workers.
pub(super) fn run_as_admin(program: &Path, args: &str) -> Result<i32, LaunchError> {
    let verb = HSTRING::from("runas");
    let file = HSTRING::from(program.as_os_str());
    let parameters = HSTRING::from(args);

    let mut info = SHELLEXECUTEINFOW {
        cbSize: mem::size_of::<SHELLEXECUTEINFOW>() as u32,
        fMask: SEE_MASK_NOCLOSEPROCESS,
        lpVerb: PCWSTR(verb.as_ptr()),
        lpFile: PCWSTR(file.as_ptr()),
        lpParameters: PCWSTR(parameters.as_ptr()),
        nShow: SW_SHOWNORMAL.0,
        ..Default::default()
    };

    unsafe {
        if let Err(e) = ShellExecuteExW(&mut info) {
            // The consent dialog was dismissed
            if e.code() == ERROR_CANCELLED.to_hresult() {
                return Err(LaunchError::ElevationDenied);
            }
            return Err(LaunchError::Spawn {
                program: program.to_path_buf(),
                source: std::io::Error::other(e),
            });
        }

        let process = info.hProcess;
        if process.is_invalid() {
            return Err(LaunchError::Wait("no process handle returned".to_string()));
        }

        let _ = WaitForSingleObject(process, INFINITE);
        let mut exit_code: u32 = 0;
        let queried = GetExitCodeProcess(process, &mut exit_code);
        let _ = CloseHandle(process);
        queried.map_err(|e| LaunchError::Wait(e.to_string()))?;

        // NTSTATUS-style codes wrap to negative values, as they do for std's ExitStatus
        Ok(exit_code as i32)
    }
}
