//! Named compilers and per-file compile settings.


use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use asmlens_primitives::{ParsedLine, Url, normalize_path};
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::SourceCompiler;
use crate::error::{CompileError, Result};
use crate::filters::FilterOptions;
use crate::info::{CompileOptions, CompilerInfo};
use crate::toolchain::Toolchain;

/// Which compiler builds a file, and with what extra settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilationInfo {
	pub compiler_name: String,
	pub defines: Vec<String>,
	pub includes: Vec<String>,
	pub args: Vec<String>,
}

impl CompilationInfo {
	pub fn new(compiler_name: impl Into<String>) -> Self {
		Self {
			compiler_name: compiler_name.into(),
			..Self::default()
		}
	}

	pub fn options(&self) -> CompileOptions {
		CompileOptions {
			args: self.args.clone(),
			defines: self.defines.clone(),
			includes: self.includes.clone(),
			env: BTreeMap::new(),
		}
	}
}

/// Compile settings keyed by normalized file path, with a fallback entry.
#[derive(Debug, Clone, Default)]
pub struct CompileInfoDatabase {
	entries: FxHashMap<PathBuf, CompilationInfo>,
	default_info: CompilationInfo,
}

impl CompileInfoDatabase {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, file: &Path) -> Option<&CompilationInfo> {
		self.entries.get(&normalize_path(file))
	}

	/// Settings for `file`, and whether they came from a file entry rather
	/// than the default.
	pub fn get_or_default(&self, file: &Path) -> (&CompilationInfo, bool) {
		match self.get(file) {
			Some(info) => (info, true),
			None => (&self.default_info, false),
		}
	}

	/// Stores settings for `file`; returns true if they differ from before.
	pub fn set(&mut self, file: &Path, info: CompilationInfo) -> bool {
		let previous = self.entries.insert(normalize_path(file), info.clone());
		previous.as_ref() != Some(&info)
	}

	pub fn remove(&mut self, file: &Path) -> Option<CompilationInfo> {
		self.entries.remove(&normalize_path(file))
	}

	pub fn default_info(&self) -> &CompilationInfo {
		&self.default_info
	}

	pub fn set_default(&mut self, info: CompilationInfo) {
		self.default_info = info;
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Compilers by unique name.
#[derive(Debug, Clone, Default)]
pub struct CompilerRegistry {
	compilers: BTreeMap<String, Arc<Toolchain>>,
}

impl CompilerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.compilers.keys().map(String::as_str)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.compilers.contains_key(name)
	}

	pub fn get(&self, name: &str) -> Option<&Arc<Toolchain>> {
		self.compilers.get(name)
	}

	/// Registers `toolchain`, replacing any compiler with the same name.
	pub fn register(&mut self, toolchain: Toolchain) -> Arc<Toolchain> {
		let toolchain = Arc::new(toolchain);
		self.compilers
			.insert(toolchain.name().to_owned(), Arc::clone(&toolchain));
		toolchain
	}

	/// Returns the compiler named `info.name`, registering `info` if absent.
	pub fn get_or_register(&mut self, info: CompilerInfo) -> Arc<Toolchain> {
		match self.compilers.get(&info.name) {
			Some(existing) => Arc::clone(existing),
			None => self.register(Toolchain::new(info)),
		}
	}
}

/// Resolves a file to its compiler and settings, and compiles it.
///
/// Shared between the compile cache and whatever feeds it settings (config
/// reloads, build-system integration), so every part sits behind a lock.
/// Locks are never held across a compile.
#[derive(Debug, Default)]
pub struct CompileManager {
	registry: RwLock<CompilerRegistry>,
	database: RwLock<CompileInfoDatabase>,
	filters: RwLock<FilterOptions>,
}

impl CompileManager {
	pub fn new(filters: FilterOptions) -> Self {
		Self {
			filters: RwLock::new(filters),
			..Self::default()
		}
	}

	/// Adds a compiler unless one with that name exists.
	///
	/// Returns false, and logs a warning, for duplicates.
	pub fn add_compiler(&self, info: CompilerInfo) -> bool {
		let mut registry = self.registry.write();
		if registry.contains(&info.name) {
			warn!(name = %info.name, "compiler.duplicate_skipped");
			return false;
		}
		debug!(name = %info.name, kind = %info.kind, exe = %info.exe.display(), "compiler.registered");
		registry.register(Toolchain::new(info));
		true
	}

	pub fn compiler_names(&self) -> Vec<String> {
		self.registry.read().names().map(str::to_owned).collect()
	}

	pub fn compiler(&self, name: &str) -> Option<Arc<Toolchain>> {
		self.registry.read().get(name).cloned()
	}

	pub(crate) fn registry_mut(&self) -> parking_lot::RwLockWriteGuard<'_, CompilerRegistry> {
		self.registry.write()
	}

	pub fn set_default_info(&self, info: CompilationInfo) {
		self.database.write().set_default(info);
	}

	pub fn default_info(&self) -> CompilationInfo {
		self.database.read().default_info().clone()
	}

	/// Stores settings for `file`; returns true if they changed.
	pub fn set_compilation_info(&self, file: &Path, info: CompilationInfo) -> bool {
		self.database.write().set(file, info)
	}

	pub fn compilation_info(&self, file: &Path) -> Option<CompilationInfo> {
		self.database.read().get(file).cloned()
	}

	pub fn filters(&self) -> FilterOptions {
		*self.filters.read()
	}

	pub fn set_filters(&self, filters: FilterOptions) {
		*self.filters.write() = filters;
	}

	/// Compiles `file` with its settings, or the default settings.
	///
	/// Errors raised while using the default settings are wrapped in
	/// [`CompileError::DefaultInfo`].
	pub async fn compile(&self, file: &Path) -> Result<Vec<ParsedLine>> {
		let (info, found) = {
			let database = self.database.read();
			let (info, found) = database.get_or_default(file);
			(info.clone(), found)
		};
		let wrap = |error: CompileError| {
			if found {
				error
			} else {
				CompileError::DefaultInfo(Box::new(error))
			}
		};

		let toolchain = self
			.compiler(&info.compiler_name)
			.ok_or_else(|| wrap(CompileError::CompilerNotFound(info.compiler_name.clone())))?;
		let filters = self.filters();

		debug!(
			file = %file.display(),
			compiler = %toolchain.name(),
			default_info = !found,
			"compiler.compile"
		);
		toolchain
			.compile(file, &info.options(), &filters)
			.await
			.map_err(wrap)
	}
}

#[async_trait]
impl SourceCompiler for CompileManager {
	async fn compile(&self, source: &Url) -> Result<Vec<ParsedLine>> {
		let path = source
			.to_file_path()
			.map_err(|()| CompileError::NotAFile(source.clone()))?;
		CompileManager::compile(self, &path).await
	}
}
