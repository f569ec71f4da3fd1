//! Compile errors.

use std::io;
use std::path::PathBuf;

use asmlens_primitives::Url;
use thiserror::Error;

/// Errors produced while compiling a source file to a listing.
#[derive(Debug, Error)]
pub enum CompileError {
	/// The compile settings name a compiler that is not registered.
	#[error("Compiler not found: {0}")]
	CompilerNotFound(String),
	/// Error raised while using the default compile settings for a file.
	#[error("(default compile info) {0}")]
	DefaultInfo(Box<CompileError>),
	/// Only local files can be compiled.
	#[error("not a local source file: {0}")]
	NotAFile(Url),
	/// The compiler executable could not be started.
	#[error("failed to run {}: {error}", exe.display())]
	Spawn {
		exe: PathBuf,
		#[source]
		error: io::Error,
	},
	/// The compiler ran and reported failure. `output` is its captured output.
	#[error("Failed to compile {}: {output}", file.display())]
	Failed {
		file: PathBuf,
		status: Option<i32>,
		output: String,
	},
	/// Scratch space for the listing could not be created.
	#[error("failed to create output directory: {0}")]
	OutputDir(#[source] io::Error),
	/// The compiler succeeded but its listing could not be read.
	#[error("failed to read compiler output {}: {error}", path.display())]
	ReadOutput {
		path: PathBuf,
		#[source]
		error: io::Error,
	},
}

/// Result type for compile operations.
pub type Result<T, E = CompileError> = std::result::Result<T, E>;
