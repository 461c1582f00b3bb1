//! Terminal front end for an installation run
//!
//! Prints section headers and per-asset status lines, and drives a download
//! bar from the manager's progress events.

use std::io::{IsTerminal, Write};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tokio::sync::mpsc;

use crate::config::InstallerConfig;

use super::manager::InstallReport;
use super::progress::{AssetPhase, AssetProgress};
use super::{InstallOutcome, ensure_installed};

/// Colors only when writing to a terminal
fn color_choice(is_terminal: bool) -> ColorChoice {
    if is_terminal {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn color_stdout() -> StandardStream {
    StandardStream::stdout(color_choice(std::io::stdout().is_terminal()))
}

/// Print a blue `==== title ====` banner
pub fn print_header(title: &str) {
    let mut stdout = color_stdout();
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Blue)).set_bold(true));
    let _ = writeln!(stdout, "==================== {title} ====================");
    let _ = stdout.reset();
}

fn download_bar(total_bytes: Option<u64>) -> ProgressBar {
    match total_bytes {
        Some(total) => {
            let pb = ProgressBar::new(total);
            let template = "   [{bar:40.green/blue}] {bytes}/{total_bytes}  {msg}";
            if let Ok(style) = ProgressStyle::default_bar().template(template) {
                pb.set_style(style.progress_chars("█▓░"));
            }
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            let template = "   {spinner} {bytes}  {msg}";
            if let Ok(style) = ProgressStyle::default_spinner().template(template) {
                pb.set_style(style);
            }
            pb
        }
    }
}

/// Consume progress events until the sender side is dropped
async fn render_progress(mut rx: mpsc::Receiver<AssetProgress>) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(progress) = rx.recv().await {
        if progress.phase == AssetPhase::Downloading {
            let pb = bar.get_or_insert_with(|| download_bar(progress.total_bytes));
            pb.set_position(progress.bytes_downloaded);
            pb.set_message(progress.asset.clone());
            continue;
        }

        if let Some(pb) = bar.take() {
            pb.finish_and_clear();
        }
        match progress.phase {
            // Final states are printed from the report
            AssetPhase::Installed | AssetPhase::Skipped | AssetPhase::Failed(_) => {}
            _ => eprintln!("[{}/{}] {}", progress.index, progress.total, progress.message()),
        }
    }

    if let Some(pb) = bar.take() {
        pb.finish_and_clear();
    }
}

/// Print one colored status line per asset
pub fn print_report(report: &InstallReport) {
    let mut stdout = color_stdout();

    for name in &report.installed {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = writeln!(stdout, "✓ {name} installed");
    }
    for name in &report.skipped {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = writeln!(stdout, "✓ {name} is already installed");
    }
    for failed in &report.failed {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
        let _ = writeln!(stdout, "✗ {}: {}", failed.name, failed.reason);
    }
    let _ = stdout.reset();
}

/// The report as a pretty-printed JSON document
pub fn report_json(report: &InstallReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize install report")
}

/// Install the engine and the voices matching `voice_filter`, reporting to the terminal
///
/// With `json` set, stdout carries only the JSON report; banners and status
/// lines are left out.
pub async fn run_install(
    config: &InstallerConfig,
    voice_filter: &str,
    json: bool,
) -> Result<InstallOutcome> {
    if !json {
        print_header("Installing Piper");
    }

    let (tx, rx) = mpsc::channel::<AssetProgress>(100);
    let progress_task = tokio::spawn(render_progress(rx));

    let result = ensure_installed(config, Some(voice_filter), Some(tx)).await;

    // The sender is dropped with the manager, so the renderer drains and exits
    progress_task.await.ok();
    let outcome = result.context("Installation aborted")?;

    if json {
        println!("{}", report_json(&outcome.report)?);
    } else {
        print_header("Summary");
        print_report(&outcome.report);
    }

    Ok(outcome)
}
