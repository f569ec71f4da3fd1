//! CLI schema for the asmlens binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "asmlens")]
#[command(about = "Compile C/C++ sources to assembly and map listing lines back to source")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Configuration file (defaults to ./asmlens.toml, then the user config directory)
	#[arg(short, long, value_name = "PATH", global = true)]
	pub config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Print the filtered assembly listing of a file
	Compile {
		file: PathBuf,

		/// Print parsed lines with their source locations as JSON
		#[arg(long)]
		json: bool,
	},
	/// Print which assembly lines each source line produced
	Map { file: PathBuf },
	/// Recompile a file whenever it or a file it includes changes
	Watch { file: PathBuf },
}
