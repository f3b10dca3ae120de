//! `skynetd`: boots the kernel, wires in every collaborator crate,
//! optionally launches a bootstrap service, and runs the dispatch
//! worker pool until interrupted.

mod bootstrap;
mod config;
mod worker;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "skynetd", version, about = "A lightweight concurrent-services runtime")]
struct Cli {
    /// Path to the runtime's TOML config file.
    #[arg(short, long, default_value = "skynet.toml")]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let kernel = bootstrap::build_kernel(&config);
    bootstrap::launch_bootstrap(&kernel, &config)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            log::info!("received shutdown signal");
            shutdown.store(true, Ordering::Release);
        })
        .context("failed to install signal handler")?;
    }

    log::info!("skynetd starting with {} worker thread(s)", config.thread);
    worker::run_pool(kernel, config.thread, shutdown);
    log::info!("skynetd stopped");
    Ok(())
}
