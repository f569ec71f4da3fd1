//! Compiler descriptions and per-compile options.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kind::CompilerKind;

static GCC_DRIVER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(gcc|g\+\+)(-\d+(\.\d+)*)?(\.exe)?$").expect("valid gcc driver pattern"));

/// A named compiler executable and its fixed settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerInfo {
	pub name: String,
	#[serde(rename = "type", default)]
	pub kind: CompilerKind,
	pub exe: PathBuf,
	#[serde(default)]
	pub args: Vec<String>,
	/// Overrides the flavor's include flag.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub include_flag: Option<String>,
	#[serde(default)]
	pub include_paths: Vec<String>,
	/// Overrides the flavor's define flag.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub define_flag: Option<String>,
	#[serde(default)]
	pub defines: Vec<String>,
	#[serde(default)]
	pub env: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub demangler: Option<PathBuf>,
	#[serde(default)]
	pub demangler_args: Vec<String>,
	#[serde(default)]
	pub supports_demangle: bool,
	#[serde(default)]
	pub supports_intel: bool,
	#[serde(default)]
	pub supports_library_code_filter: bool,
}

impl CompilerInfo {
	pub fn new(name: impl Into<String>, kind: CompilerKind, exe: impl Into<PathBuf>) -> Self {
		let gcc = kind == CompilerKind::Gcc;
		Self {
			name: name.into(),
			kind,
			exe: exe.into(),
			args: Vec::new(),
			include_flag: None,
			include_paths: Vec::new(),
			define_flag: None,
			defines: Vec::new(),
			env: BTreeMap::new(),
			demangler: None,
			demangler_args: Vec::new(),
			supports_demangle: gcc,
			supports_intel: gcc,
			supports_library_code_filter: gcc,
		}
	}

	/// Describes a compiler found at `exe`, named after the executable.
	///
	/// For GCC drivers a sibling `c++filt` is picked up as the demangler.
	pub fn detect(exe: &Path) -> Self {
		let name = exe
			.file_stem()
			.map(|stem| stem.to_string_lossy().into_owned())
			.unwrap_or_else(|| exe.display().to_string());
		let kind = CompilerKind::detect(exe);
		let mut info = Self::new(name, kind, exe);

		if kind == CompilerKind::Gcc {
			info.demangler = find_demangler(exe);
		}

		debug!(name = %info.name, kind = %kind, demangler = ?info.demangler, "compiler.detect");
		info
	}

	pub fn include_flag(&self) -> &str {
		self.include_flag
			.as_deref()
			.unwrap_or(self.kind.default_include_flag())
	}

	pub fn define_flag(&self) -> &str {
		self.define_flag
			.as_deref()
			.unwrap_or(self.kind.default_define_flag())
	}
}

fn find_demangler(exe: &Path) -> Option<PathBuf> {
	let exe_str = exe.to_str()?;
	if !GCC_DRIVER.is_match(exe_str) {
		return None;
	}
	let candidate = PathBuf::from(GCC_DRIVER.replace(exe_str, "c++filt$4").into_owned());
	candidate.is_file().then(|| candidate.canonicalize().unwrap_or(candidate))
}

/// Per-file settings merged into a compiler invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
	pub args: Vec<String>,
	pub defines: Vec<String>,
	pub includes: Vec<String>,
	pub env: BTreeMap<String, String>,
}
