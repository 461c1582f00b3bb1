mod cli;

use anyhow::{Result, bail};
use clap::Parser;
use log::{error, info};

use piper_bootstrap::config::InstallerConfig;
use piper_bootstrap::install::runners;
use piper_bootstrap::service::companion;

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    // Assets are installed one after another; a single thread is enough
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(real_main()) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<()> {
    let args = cli::Args::parse();

    let mut config = InstallerConfig::load(args.config.as_deref())?;
    if let Some(root) = args.root {
        config.install_root = root;
    }

    let filter = args.filter.unwrap_or_else(|| config.default_voice.clone());
    let outcome = runners::run_install(&config, &filter, args.json).await?;

    if outcome.engine_failed() {
        bail!("Piper engine could not be installed for {}", outcome.platform);
    }
    if !outcome.report.failed.is_empty() {
        info!(
            "{} voice(s) failed to install; continuing",
            outcome.report.failed.len()
        );
    }

    if args.no_server {
        return Ok(());
    }

    if !args.json {
        runners::print_header("Installing npm dependencies and starting Piper server");
    }
    companion::launch(&config.server_root()).await
}
