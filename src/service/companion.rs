//! Companion Piper HTTP server (Node.js, run through npm)

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use log::info;

/// Tools that must be on PATH before the server can start
pub const REQUIRED_TOOLS: &[&str] = &["node", "npm"];

/// Resolved locations of the required tools
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub node: PathBuf,
    pub npm: PathBuf,
}

/// Resolve every required tool, listing all missing ones in the error
pub fn check_tools() -> Result<Toolchain> {
    resolve_tools(|tool| which::which(tool).ok())
}

fn resolve_tools(mut lookup: impl FnMut(&str) -> Option<PathBuf>) -> Result<Toolchain> {
    let mut found = Vec::with_capacity(REQUIRED_TOOLS.len());
    let mut missing = Vec::new();

    for tool in REQUIRED_TOOLS {
        match lookup(tool) {
            Some(path) => {
                info!("{tool} found at {}", path.display());
                found.push(path);
            }
            None => missing.push(*tool),
        }
    }

    if !missing.is_empty() {
        bail!(
            "Missing required tools: {}. Install Node.js (which ships npm) and retry",
            missing.join(", ")
        );
    }

    let mut found = found.into_iter();
    match (found.next(), found.next()) {
        (Some(node), Some(npm)) => Ok(Toolchain { node, npm }),
        _ => bail!("Failed to resolve {}", REQUIRED_TOOLS.join(", ")),
    }
}

/// Run `npm <args>` in `dir`, forwarding its output to our terminal
async fn npm(npm_path: &Path, dir: &Path, args: &[&str]) -> Result<()> {
    let rendered = args.join(" ");
    info!("Running 'npm {rendered}' in {}", dir.display());

    let status = tokio::process::Command::new(npm_path)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("Failed to spawn 'npm {rendered}'"))?;

    if !status.success() {
        bail!("'npm {rendered}' exited with {status}");
    }
    Ok(())
}

/// Install the server's npm dependencies, then run it in the foreground
///
/// Returns when `npm start` exits.
pub async fn launch(server_dir: &Path) -> Result<()> {
    if !server_dir.join("package.json").exists() {
        bail!(
            "No package.json in {}; the companion server is not present",
            server_dir.display()
        );
    }

    let tools = check_tools()?;

    npm(&tools.npm, server_dir, &["install", "."]).await?;
    info!("'npm install' completed successfully");

    npm(&tools.npm, server_dir, &["start"]).await?;
    info!("'npm start' completed successfully");
    Ok(())
}
