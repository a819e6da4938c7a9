mod builtins;
mod config;
mod error;
mod exec;
mod input;
mod jobs;
mod parser;
mod shell;
mod signals;
mod utils;

use anyhow::Context;
use clap::Parser;
use config::{Cli, ShellConfig};
use jobs::JobControl;
use nix::libc;
use nix::unistd::dup2;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    // Redirect stderr to stdout so a driver reading stdout sees everything.
    if let Err(err) = dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO) {
        utils::unix_error("dup2 error", err);
    }

    // Parse command-line arguments.
    let cli = Cli::try_parse().unwrap_or_else(|_| utils::print_usage());
    if cli.help {
        utils::print_usage();
    }
    let config = ShellConfig::from(&cli);

    init_tracing(config.verbose);

    if let Err(err) = run(&config) {
        utils::app_error(format!("{:#}", err));
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("msh=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .init();
}

fn run(config: &ShellConfig) -> anyhow::Result<()> {
    // The job table is created empty before any child can exist.
    let control = Arc::new(JobControl::new());

    // Install signal handlers.
    let _signals = signals::install_signal_handlers(Arc::clone(&control))
        .context("failed to install signal handlers")?;

    // Run the main shell loop with the options.
    shell::run_shell(config, &control)?;
    Ok(())
}
