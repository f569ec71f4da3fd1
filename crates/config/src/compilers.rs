//! Compiler and per-file compile settings tables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use asmlens_compiler::{CompilationInfo, CompilerInfo, CompilerKind};
use serde::Deserialize;

/// One `[[compilers]]` entry.
///
/// Capability flags default to what the flavor supports; an omitted `type`
/// is detected from the executable name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
	pub name: String,
	#[serde(rename = "type", default)]
	pub kind: Option<CompilerKind>,
	pub exe: PathBuf,
	#[serde(default)]
	pub args: Vec<String>,
	#[serde(default)]
	pub include_flag: Option<String>,
	#[serde(default)]
	pub include_paths: Vec<String>,
	#[serde(default)]
	pub define_flag: Option<String>,
	#[serde(default)]
	pub defines: Vec<String>,
	#[serde(default)]
	pub env: BTreeMap<String, String>,
	#[serde(default)]
	pub demangler: Option<PathBuf>,
	#[serde(default)]
	pub demangler_args: Vec<String>,
	#[serde(default)]
	pub supports_demangle: Option<bool>,
	#[serde(default)]
	pub supports_intel: Option<bool>,
	#[serde(default)]
	pub supports_library_code_filter: Option<bool>,
}

impl CompilerConfig {
	pub fn to_info(&self) -> CompilerInfo {
		let kind = self.kind.unwrap_or_else(|| CompilerKind::detect(&self.exe));
		let mut info = CompilerInfo::new(self.name.clone(), kind, self.exe.clone());
		info.args = self.args.clone();
		info.include_flag = self.include_flag.clone();
		info.include_paths = self.include_paths.clone();
		info.define_flag = self.define_flag.clone();
		info.defines = self.defines.clone();
		info.env = self.env.clone();
		info.demangler_args = self.demangler_args.clone();
		info.demangler = match &self.demangler {
			Some(demangler) => Some(demangler.clone()),
			None if kind == CompilerKind::Gcc => CompilerInfo::detect(&self.exe).demangler,
			None => None,
		};
		if let Some(supported) = self.supports_demangle {
			info.supports_demangle = supported;
		}
		if let Some(supported) = self.supports_intel {
			info.supports_intel = supported;
		}
		if let Some(supported) = self.supports_library_code_filter {
			info.supports_library_code_filter = supported;
		}
		info
	}
}

/// One `[[compile_info]]` entry: compile settings for a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileCompileInfo {
	/// Relative paths are resolved against the config file's directory.
	pub file: PathBuf,
	pub compiler_name: String,
	pub defines: Vec<String>,
	pub includes: Vec<String>,
	pub args: Vec<String>,
}

impl FileCompileInfo {
	pub fn info(&self) -> CompilationInfo {
		CompilationInfo {
			compiler_name: self.compiler_name.clone(),
			defines: self.defines.clone(),
			includes: self.includes.clone(),
			args: self.args.clone(),
		}
	}

	pub(crate) fn resolve_against(&mut self, base: &Path) {
		if self.file.is_relative() {
			self.file = base.join(&self.file);
		}
	}
}
