//! Silent-switch resolution: which arguments make an installer run unattended
//!
//! Precedence, first match wins:
//! 1. catalog-supplied switches, verbatim (plus EULA tokens if they lack any)
//! 2. the ordered [`SWITCH_RULES`] table, matched against the lower-cased file name
//! 3. [`FALLBACK_SWITCHES`], every common silent flag at once
//!
//! Windows installer packages never get here: the launcher builds a fixed
//! `msiexec` command line for them via [`package_command_line`].

use std::path::Path;

/// Appended to catalog switches that do not mention a EULA themselves
pub const EULA_SUFFIX: &str = "/ACCEPTEULA=1 /EULA=1";

/// Silent flags of the common installer frameworks (NSIS, Inno Setup, InstallShield,
/// MSI-wrapping bootstrappers, Squirrel and friends).
pub const FRAMEWORK_FLAGS: &[&str] = &[
    "/S",
    "/s",
    "/SILENT",
    "/VERYSILENT",
    "/SUPPRESSMSGBOXES",
    "/NORESTART",
    "/SP-",
    "/quiet",
    "/qn",
    "/norestart",
    "/passive",
    "-s",
    "-q",
    "--silent",
];

/// Used when nothing else matched. Installers are expected to ignore the flags they do not know.
pub const FALLBACK_SWITCHES: &str = "/S /s /SILENT /VERYSILENT /SUPPRESSMSGBOXES /NORESTART /SP- /quiet /qn /norestart /passive -s -q --silent /ACCEPTEULA=1 /EULA=1";

/// Program used for Windows installer packages
pub const PACKAGE_MANAGER: &str = "msiexec";

/// One row of the heuristic table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchRule {
    pub family: &'static str,
    /// Any of these substrings in the lower-cased file name selects the rule
    pub patterns: &'static [&'static str],
    /// Patterns must start a word: at the beginning of the name or after a separator
    pub anchored: bool,
    pub args: &'static str,
}

impl SwitchRule {
    pub fn matches(&self, lower_name: &str) -> bool {
        self.patterns.iter().any(|p| {
            if self.anchored {
                starts_word(lower_name, p)
            } else {
                lower_name.contains(p)
            }
        })
    }
}

fn starts_word(name: &str, pattern: &str) -> bool {
    name.match_indices(pattern).any(|(at, _)| {
        name[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Evaluated top to bottom. Named applications come before the generic
/// `setup`/`install` patterns so that e.g. `SteamSetup.exe` hits its own row.
pub const SWITCH_RULES: &[SwitchRule] = &[
    SwitchRule {
        family: "chrome",
        patterns: &["chrome"],
        anchored: true,
        args: "/silent /install",
    },
    SwitchRule {
        family: "firefox",
        patterns: &["firefox"],
        anchored: true,
        args: "-ms",
    },
    SwitchRule {
        family: "vscode",
        patterns: &["vscode"],
        anchored: true,
        args: "/VERYSILENT /NORESTART /MERGETASKS=!runcode",
    },
    SwitchRule {
        family: "git",
        patterns: &["git-"],
        anchored: true,
        args: "/VERYSILENT /NORESTART /NOCANCEL /SP-",
    },
    SwitchRule {
        family: "python",
        patterns: &["python-"],
        anchored: true,
        args: "/quiet InstallAllUsers=1 PrependPath=1",
    },
    SwitchRule {
        family: "7-zip",
        patterns: &["7z"],
        anchored: true,
        args: "/S",
    },
    SwitchRule {
        family: "vlc",
        patterns: &["vlc-"],
        anchored: true,
        args: "/L=1033 /S",
    },
    SwitchRule {
        family: "notepad++",
        patterns: &["npp.", "notepad++"],
        anchored: true,
        args: "/S",
    },
    SwitchRule {
        family: "discord",
        patterns: &["discord"],
        anchored: true,
        args: "-s",
    },
    SwitchRule {
        family: "zoom",
        patterns: &["zoom"],
        anchored: true,
        args: "/silent",
    },
    SwitchRule {
        family: "steam",
        patterns: &["steam"],
        anchored: true,
        args: "/S",
    },
    SwitchRule {
        family: "java",
        patterns: &["jre-", "jdk-", "javasetup"],
        anchored: true,
        args: "/s",
    },
    SwitchRule {
        family: "winrar",
        patterns: &["winrar"],
        anchored: true,
        args: "/S",
    },
    SwitchRule {
        family: "nsis",
        patterns: &["setup", "install"],
        anchored: false,
        args: "/S /ACCEPTEULA=1 /EULA=1",
    },
];

/// Which precedence step produced the arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchSource {
    Catalog,
    Heuristic(&'static str),
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSwitches {
    pub args: String,
    pub source: SwitchSource,
}

/// Derive unattended arguments for an installer file name.
pub fn resolve(file_name: &str, catalog_switches: Option<&str>) -> ResolvedSwitches {
    if let Some(switches) = catalog_switches.map(str::trim).filter(|s| !s.is_empty()) {
        let args = if switches.to_ascii_uppercase().contains("EULA") {
            switches.to_string()
        } else {
            format!("{switches} {EULA_SUFFIX}")
        };
        return ResolvedSwitches {
            args,
            source: SwitchSource::Catalog,
        };
    }

    let lower = file_name.to_lowercase();
    if let Some(rule) = SWITCH_RULES.iter().find(|r| r.matches(&lower)) {
        return ResolvedSwitches {
            args: rule.args.to_string(),
            source: SwitchSource::Heuristic(rule.family),
        };
    }

    ResolvedSwitches {
        args: FALLBACK_SWITCHES.to_string(),
        source: SwitchSource::Fallback,
    }
}

/// `.msi` files go through the package manager instead of the resolver
pub fn is_package_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("msi"))
}

/// Arguments for `msiexec`: install quietly, never restart, accept the EULA
pub fn package_command_line(path: &Path) -> String {
    format!(
        "/i \"{}\" /qn /norestart ACCEPTEULA=1 IACCEPTEULA=YES",
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn catalog_switches_without_eula_get_suffix() {
        let resolved = resolve("whatever.exe", Some("/VERYSILENT /NORESTART"));
        assert_eq!(resolved.source, SwitchSource::Catalog);
        assert!(resolved.args.starts_with("/VERYSILENT /NORESTART"));
        assert!(resolved.args.ends_with(EULA_SUFFIX));
    }

    #[test]
    fn catalog_switches_with_eula_are_verbatim() {
        let resolved = resolve("whatever.exe", Some("/S /AcceptEula=yes"));
        assert_eq!(resolved.args, "/S /AcceptEula=yes");
    }

    #[test]
    fn blank_catalog_switches_fall_through_to_heuristics() {
        let resolved = resolve("SteamSetup.exe", Some("   "));
        assert_eq!(resolved.source, SwitchSource::Heuristic("steam"));
    }

    #[test]
    fn every_rule_returns_its_own_args() {
        let samples = [
            ("ChromeSetup.exe", "chrome"),
            ("Firefox Installer.exe", "firefox"),
            ("VSCodeUserSetup-x64-1.90.0.exe", "vscode"),
            ("Git-2.45.1-64-bit.exe", "git"),
            ("python-3.12.4-amd64.exe", "python"),
            ("7z2406-x64.exe", "7-zip"),
            ("vlc-3.0.21-win64.exe", "vlc"),
            ("npp.8.6.8.Installer.x64.exe", "notepad++"),
            ("DiscordSetup.exe", "discord"),
            ("ZoomInstallerFull.exe", "zoom"),
            ("SteamSetup.exe", "steam"),
            ("jre-8u411-windows-x64.exe", "java"),
            ("winrar-x64-701.exe", "winrar"),
            ("product_setup.exe", "nsis"),
        ];

        for (file, family) in samples {
            let rule = SWITCH_RULES
                .iter()
                .find(|r| r.family == family)
                .expect("family in table");
            let resolved = resolve(file, None);
            assert_eq!(resolved.source, SwitchSource::Heuristic(family), "{file}");
            assert_eq!(resolved.args, rule.args, "{file}");
        }
    }

    #[test]
    fn named_patterns_only_match_at_word_start() {
        assert_eq!(
            resolve("digit-recorder-setup.exe", None).source,
            SwitchSource::Heuristic("nsis")
        );
        assert_eq!(resolve("legit-tool.exe", None).source, SwitchSource::Fallback);
        assert_eq!(resolve("autozoom-1.2.exe", None).source, SwitchSource::Fallback);
        assert_eq!(resolve("mainsteam_player.exe", None).source, SwitchSource::Fallback);
        assert_eq!(
            resolve("portable_git-2.45.exe", None).source,
            SwitchSource::Heuristic("git")
        );
        assert_eq!(
            resolve("TeamViewerSetup.exe", None).source,
            SwitchSource::Heuristic("nsis")
        );
    }

    #[test]
    fn generic_installer_gets_nsis_flag_and_eula() {
        let resolved = resolve("installer.exe", None);
        assert_eq!(resolved.source, SwitchSource::Heuristic("nsis"));
        assert_eq!(resolved.args, format!("/S {EULA_SUFFIX}"));
    }

    #[test]
    fn unknown_names_get_fallback() {
        let resolved = resolve("mystery-tool-1.0.exe", None);
        assert_eq!(resolved.source, SwitchSource::Fallback);
        assert_eq!(resolved.args, FALLBACK_SWITCHES);
    }

    #[test]
    fn fallback_contains_every_framework_flag_and_eula() {
        let fallback = tokens(FALLBACK_SWITCHES);
        for flag in FRAMEWORK_FLAGS {
            assert!(fallback.contains(flag), "fallback is missing {flag}");
        }
        for eula in tokens(EULA_SUFFIX) {
            assert!(fallback.contains(&eula), "fallback is missing {eula}");
        }
    }

    #[test]
    fn msi_dispatch_is_case_insensitive() {
        assert!(is_package_file(Path::new("C:/dl/Node-v20.MSI")));
        assert!(!is_package_file(Path::new("C:/dl/setup.exe")));
        assert!(!is_package_file(Path::new("C:/dl/msi")));
    }

    #[test]
    fn package_command_line_is_quiet_and_norestart() {
        let args = package_command_line(Path::new("pkg.msi"));
        let parts = tokens(&args);
        assert_eq!(parts[0], "/i");
        assert!(parts.contains(&"/qn"));
        assert!(parts.contains(&"/norestart"));
        assert!(args.to_ascii_uppercase().contains("EULA"));
    }
}
