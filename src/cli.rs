use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Run third-party installers unattended")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging and installer output capture
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Never prompt; a declined elevation is not retried
    #[arg(long, global = true)]
    pub no_interaction: bool,

    /// Skip the post-install hook even if one is configured
    #[arg(long, global = true)]
    pub no_hook: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install local .exe/.msi files, or the installers inside .zip archives (Exit 0 = all succeeded, 1 = otherwise)
    Install {
        /// Installer files, in the order they should run
        paths: Vec<PathBuf>,

        /// Also queue every installer found in this folder
        #[arg(long)]
        scan: Option<PathBuf>,
    },
    /// Download and install entries from a catalog file (Exit 0 = all succeeded, 1 = otherwise)
    Catalog {
        /// Catalog file (.json, or .toml)
        file: PathBuf,

        /// Only entries in this category
        #[arg(long)]
        category: Option<String>,

        /// Only entries with these names (repeatable)
        #[arg(long = "select", short = 's')]
        select: Vec<String>,

        /// Print the matching entries and exit
        #[arg(long)]
        list: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn catalog_flags_parse() {
        let cli = Cli::parse_from([
            "quietinstall",
            "catalog",
            "apps.json",
            "--category",
            "Browsers",
            "-s",
            "Firefox",
            "-s",
            "Chrome",
            "--no-hook",
        ]);
        assert!(cli.no_hook);
        match cli.command {
            Command::Catalog {
                file,
                category,
                select,
                list,
            } => {
                assert_eq!(file, PathBuf::from("apps.json"));
                assert_eq!(category.as_deref(), Some("Browsers"));
                assert_eq!(select, vec!["Firefox", "Chrome"]);
                assert!(!list);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
