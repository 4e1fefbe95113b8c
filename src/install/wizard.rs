//! Operator-facing terminal output and prompts

use std::io::Write;

use inquire::Confirm;
use log::warn;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use super::catalog::{BatchResult, CatalogEntry, InstallableItem, Status};
use super::core::AsyncTask;
use super::launcher::ElevationPrompt;

/// How a status is drawn. Derived on demand; never stored on the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusStyle {
    pub label: &'static str,
    pub icon: &'static str,
    pub color: Color,
}

pub fn status_style(status: Status) -> StatusStyle {
    match status {
        Status::Queued => StatusStyle {
            label: "Queued",
            icon: "•",
            color: Color::White,
        },
        Status::Downloading => StatusStyle {
            label: "Downloading",
            icon: "↓",
            color: Color::Cyan,
        },
        Status::Installing => StatusStyle {
            label: "Installing",
            icon: "⚙",
            color: Color::Blue,
        },
        Status::Done => StatusStyle {
            label: "Done",
            icon: "✓",
            color: Color::Green,
        },
        Status::Failed => StatusStyle {
            label: "Failed",
            icon: "✗",
            color: Color::Red,
        },
    }
}

/// Asks on the terminal whether to show the elevation prompt again
#[derive(Debug, Clone, Copy, Default)]
pub struct InquirePrompt;

impl ElevationPrompt for InquirePrompt {
    fn offer_retry(&self, item_name: &str, attempt: u32) -> AsyncTask<bool> {
        let message = format!("Administrator access for {item_name} was declined. Try again?");
        AsyncTask::from_future(async move {
            let answer = tokio::task::spawn_blocking(move || {
                Confirm::new(&message)
                    .with_default(true)
                    .with_help_message(&format!("Attempt {attempt} was refused"))
                    .prompt()
            })
            .await;

            match answer {
                Ok(Ok(retry)) => retry,
                Ok(Err(e)) => {
                    warn!("Prompt cancelled: {}", e);
                    false
                }
                Err(e) => {
                    warn!("Prompt task failed: {}", e);
                    false
                }
            }
        })
    }
}

/// Print the catalog grouped by category
pub fn print_catalog<'a>(entries: impl IntoIterator<Item = &'a CatalogEntry>) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut current_category: Option<&str> = None;

    for entry in entries {
        if current_category != Some(entry.category.as_str()) {
            current_category = Some(entry.category.as_str());
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
            let heading = if entry.category.is_empty() {
                "Uncategorized"
            } else {
                entry.category.as_str()
            };
            let _ = writeln!(stdout, "\n{heading}");
            let _ = stdout.reset();
        }

        let _ = write!(stdout, "  {}", entry.name);
        if let Some(version) = &entry.version {
            let _ = write!(stdout, " {version}");
        }
        let _ = stdout.set_color(ColorSpec::new().set_dimmed(true));
        if let Some(vendor) = &entry.vendor {
            let _ = write!(stdout, "  ({vendor})");
        }
        if entry.download_url.is_none() {
            let _ = write!(stdout, "  [local only]");
        }
        let _ = stdout.reset();
        let _ = writeln!(stdout);
    }
}

/// Per-item status lines followed by the batch totals and hook output
pub fn print_summary(items: &[InstallableItem], batch: &BatchResult) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    let _ = writeln!(stdout);
    for item in items {
        let style = status_style(item.status());
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(style.color)));
        let _ = write!(stdout, "  {} {:<11}", style.icon, style.label);
        let _ = stdout.reset();
        let _ = writeln!(stdout, " {}", item.name);
    }

    let color = if batch.all_succeeded() {
        Color::Green
    } else {
        Color::Yellow
    };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = writeln!(
        stdout,
        "\n{}/{} installed successfully",
        batch.succeeded, batch.attempted
    );
    let _ = stdout.reset();

    if batch.attempted < batch.total {
        let _ = writeln!(
            stdout,
            "{} item(s) not attempted",
            batch.total - batch.attempted
        );
    }

    if let Some(report) = &batch.hook {
        if report.succeeded {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
            let _ = writeln!(stdout, "\n✓ Post-install hook succeeded");
        } else {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
            let _ = writeln!(
                stdout,
                "\n⚠ Post-install hook failed (exit code {})",
                report
                    .exit_code
                    .map_or_else(|| "none".to_string(), |c| c.to_string())
            );
        }
        let _ = stdout.reset();
        if !report.stdout.is_empty() {
            let _ = writeln!(stdout, "{}", report.stdout);
        }
        if !report.stderr.is_empty() {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
            let _ = writeln!(stdout, "{}", report.stderr);
            let _ = stdout.reset();
        }
    }
}
