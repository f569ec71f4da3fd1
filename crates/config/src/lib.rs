//! Configuration for asmlens.
//!
//! Configuration is written in TOML and describes the compilers that can
//! produce listings, which compiler and flags each file uses, the listing
//! filters, and assembly view behavior.
//!
//! # Configuration Files
//!
//! asmlens uses the first of these that exists:
//!
//! 1. The path passed with `--config`
//! 2. `./asmlens.toml`
//! 3. `$XDG_CONFIG_HOME/asmlens/config.toml` (platform config directory)
//! 4. Built-in defaults: no compilers, default filters
//!
//! # Schema
//!
//! ```toml
//! [[compilers]]
//! name = "gcc-13"
//! type = "gcc"            # gcc | msvc | clang-cl, detected from exe if omitted
//! exe = "/usr/bin/gcc-13"
//! args = ["-O2"]
//!
//! [default_compile_info]
//! compiler_name = "gcc-13"
//!
//! [[compile_info]]
//! file = "src/main.c"     # relative to this file
//! compiler_name = "gcc-13"
//! defines = ["NDEBUG"]
//!
//! [filters]
//! labels = true
//! library_code = false
//! directives = true
//! comment_only = true
//! trim = false
//!
//! [sync]
//! dim_unused_source_lines = true
//! recompile_debounce_ms = 100
//! ```
//!
//! Unknown keys are errors. Duplicate compiler names and references to
//! unknown compilers are collected in [`Config::warnings`].

pub mod compilers;
pub mod error;

use std::path::{Path, PathBuf};

use asmlens_compiler::{CompilationInfo, CompileManager, FilterOptions};
use asmlens_session::SyncSettings;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use tracing::{debug, warn};

pub use compilers::{CompilerConfig, FileCompileInfo};
pub use error::{ConfigError, ConfigWarning, Result};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG: &str = "asmlens.toml";

/// Parsed configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub compilers: Vec<CompilerConfig>,
	/// Settings for files without a `[[compile_info]]` entry.
	pub default_compile_info: Option<CompilationInfo>,
	pub compile_info: Vec<FileCompileInfo>,
	pub filters: FilterOptions,
	pub sync: SyncSettings,
	/// File this configuration was loaded from.
	#[serde(skip)]
	pub path: Option<PathBuf>,
	/// Non-fatal warnings encountered during loading.
	#[serde(skip)]
	pub warnings: Vec<ConfigWarning>,
}

impl Config {
	/// Parse a TOML string into a [`Config`].
	pub fn from_toml_str(input: &str) -> Result<Self> {
		Self::parse(input, "<string>")
	}

	fn parse(input: &str, origin: &str) -> Result<Self> {
		let mut config: Config = toml::from_str(input).map_err(|error| ConfigError::Parse {
			origin: origin.to_owned(),
			error,
		})?;
		config.warnings = config.validate();
		Ok(config)
	}

	/// Load configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		let mut config = Self::parse(&content, &path.display().to_string())?;
		if let Some(base) = path.parent() {
			for entry in &mut config.compile_info {
				entry.resolve_against(base);
			}
		}
		config.path = Some(path.to_path_buf());
		debug!(path = %path.display(), compilers = config.compilers.len(), "config.loaded");
		Ok(config)
	}

	/// Load from the first location in the lookup order that exists.
	pub fn discover(explicit: Option<&Path>) -> Result<Self> {
		let cwd = std::env::current_dir().ok();
		let user_dir = dirs::config_dir().map(|dir| dir.join("asmlens"));
		Self::discover_in(explicit, cwd.as_deref(), user_dir.as_deref())
	}

	/// [`discover`](Self::discover) with explicit search directories.
	pub fn discover_in(explicit: Option<&Path>, cwd: Option<&Path>, user_dir: Option<&Path>) -> Result<Self> {
		if let Some(path) = explicit {
			return Self::load(path);
		}
		let candidates = [
			cwd.map(|dir| dir.join(LOCAL_CONFIG)),
			user_dir.map(|dir| dir.join("config.toml")),
		];
		for candidate in candidates.into_iter().flatten() {
			if candidate.is_file() {
				return Self::load(candidate);
			}
		}
		debug!("config.defaults");
		Ok(Self::default())
	}

	fn validate(&self) -> Vec<ConfigWarning> {
		let mut warnings = Vec::new();
		let mut names = FxHashSet::default();
		for compiler in &self.compilers {
			if !names.insert(compiler.name.as_str()) {
				warnings.push(ConfigWarning::DuplicateCompiler(compiler.name.clone()));
			}
		}

		let mut check = |scope: String, compiler: &str| {
			if !compiler.is_empty() && !names.contains(compiler) {
				warnings.push(ConfigWarning::UnknownCompiler {
					scope,
					compiler: compiler.to_owned(),
				});
			}
		};
		if let Some(info) = &self.default_compile_info {
			check("the default entry".to_owned(), &info.compiler_name);
		}
		for entry in &self.compile_info {
			check(entry.file.display().to_string(), &entry.compiler_name);
		}
		warnings
	}

	pub fn log_warnings(&self) {
		for warning in &self.warnings {
			warn!(%warning, "config.warning");
		}
	}

	/// A [`CompileManager`] holding the configured compilers, compile
	/// settings and filters.
	///
	/// Without `[default_compile_info]`, files without settings use the first
	/// configured compiler.
	pub fn compile_manager(&self) -> CompileManager {
		let manager = CompileManager::new(self.filters);
		for compiler in &self.compilers {
			manager.add_compiler(compiler.to_info());
		}
		let default_info = self
			.default_compile_info
			.clone()
			.or_else(|| self.compilers.first().map(|compiler| CompilationInfo::new(&compiler.name)));
		if let Some(info) = default_info {
			manager.set_default_info(info);
		}
		for entry in &self.compile_info {
			manager.set_compilation_info(&entry.file, entry.info());
		}
		manager
	}
}
