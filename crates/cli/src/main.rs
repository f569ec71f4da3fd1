//! asmlens binary.
//!
//! Compiles a C or C++ file with the configured compiler and prints the
//! filtered assembly listing, its source line mapping, or a running summary
//! while the file is edited.

mod cli;
mod commands;
mod watch;

use anyhow::Context;
use asmlens_config::Config;
use clap::Parser;

use crate::cli::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let config = Config::discover(cli.config.as_deref()).context("failed to load configuration")?;
	config.log_warnings();
	let manager = config.compile_manager();

	match cli.command {
		Command::Compile { file, json } => commands::compile(&manager, &file, json).await,
		Command::Map { file } => commands::map(&manager, &file).await,
		Command::Watch { file } => watch::watch(manager, config.sync, &file).await,
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("ASMLENS_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("asmlens=debug,warn")
			} else {
				EnvFilter::new("asmlens=info,warn")
			}
		});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(verbose)
		.init();
}
