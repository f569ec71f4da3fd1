//! Compile settings reported by a build system.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::database::{CompilationInfo, CompileManager};
use crate::info::CompilerInfo;

/// Per-file settings as a build system reports them: the compiler is
/// identified by path, and arguments may arrive as multi-argument fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSystemCompileInfo {
	pub compiler_path: PathBuf,
	pub defines: Vec<String>,
	pub includes: Vec<String>,
	pub args: Vec<String>,
}

/// Name under which a build-system compiler is registered.
pub fn build_system_compiler_name(compiler_path: &Path) -> String {
	let base = compiler_path
		.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_else(|| compiler_path.display().to_string());
	format!("build: {base}")
}

impl CompileManager {
	/// Registers the reported compilers and stores per-file settings.
	///
	/// Returns the files whose settings changed.
	pub fn apply_build_system_info(
		&self,
		entries: impl IntoIterator<Item = (PathBuf, BuildSystemCompileInfo)>,
	) -> Vec<PathBuf> {
		let mut changed = Vec::new();
		for (file, reported) in entries {
			let mut detected = CompilerInfo::detect(&reported.compiler_path);
			detected.name = build_system_compiler_name(&reported.compiler_path);
			let name = self.registry_mut().get_or_register(detected).name().to_owned();

			let info = CompilationInfo {
				compiler_name: name,
				defines: reported.defines,
				includes: reported.includes,
				args: reported
					.args
					.iter()
					.flat_map(|fragment| fragment.split_whitespace())
					.map(str::to_owned)
					.collect(),
			};
			if self.set_compilation_info(&file, info) {
				debug!(file = %file.display(), "compiler.build_info_changed");
				changed.push(file);
			}
		}
		if !changed.is_empty() {
			info!(files = changed.len(), "compiler.build_info_applied");
		}
		changed
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::filters::FilterOptions;
	use crate::kind::CompilerKind;

	fn reported(compiler: &str, args: &[&str]) -> BuildSystemCompileInfo {
		BuildSystemCompileInfo {
			compiler_path: PathBuf::from(compiler),
			defines: vec!["NDEBUG".into()],
			includes: vec!["/proj/include".into()],
			args: args.iter().map(|arg| (*arg).to_owned()).collect(),
		}
	}

	#[test]
	fn registers_compiler_and_splits_fragments() {
		let manager = CompileManager::new(FilterOptions::default());
		let changed = manager.apply_build_system_info([(
			PathBuf::from("/proj/src/main.cpp"),
			reported("/usr/bin/g++-13", &["-O2 -g", "-std=c++20"]),
		)]);

		assert_eq!(changed, [PathBuf::from("/proj/src/main.cpp")]);
		assert_eq!(manager.compiler_names(), ["build: g++-13"]);

		let info = manager
			.compilation_info(Path::new("/proj/src/main.cpp"))
			.unwrap();
		assert_eq!(info.compiler_name, "build: g++-13");
		assert_eq!(info.args, ["-O2", "-g", "-std=c++20"]);
		assert_eq!(info.includes, ["/proj/include"]);

		let toolchain = manager.compiler("build: g++-13").unwrap();
		assert_eq!(toolchain.info().kind, CompilerKind::Gcc);
	}

	#[test]
	fn unchanged_settings_are_not_reported() {
		let manager = CompileManager::new(FilterOptions::default());
		let entry = || {
			(
				PathBuf::from("/proj/a.c"),
				reported("C:/VC/bin/cl.exe", &["/O2"]),
			)
		};
		assert_eq!(manager.apply_build_system_info([entry()]).len(), 1);
		assert!(manager.apply_build_system_info([entry()]).is_empty());
		assert_eq!(
			manager.compiler("build: cl.exe").unwrap().info().kind,
			CompilerKind::Msvc
		);
	}
}
