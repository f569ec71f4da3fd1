//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {}: {error}", path.display())]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Invalid TOML, or a key that is not part of the schema.
	#[error("failed to parse {origin}: {error}")]
	Parse {
		/// File the text came from, or `<string>`.
		origin: String,
		error: toml::de::Error,
	},
}

/// Non-fatal problems found in an otherwise valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigWarning {
	/// A later `[[compilers]]` entry reused a name; it is ignored.
	#[error("duplicate compiler '{0}' ignored (first definition wins)")]
	DuplicateCompiler(String),
	/// Compile settings name a compiler that is not configured.
	#[error("compile settings for {scope} use unknown compiler '{compiler}'")]
	UnknownCompiler { scope: String, compiler: String },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
