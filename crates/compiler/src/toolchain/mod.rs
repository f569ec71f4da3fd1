//! A configured compiler executable.


use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use asmlens_primitives::ParsedLine;
use tracing::{debug, warn};

use crate::error::{CompileError, Result};
use crate::exec::execute;
use crate::filters::FilterOptions;
use crate::info::{CompileOptions, CompilerInfo};
use crate::parser::AsmParser;

/// One compiler, ready to produce parsed listings.
#[derive(Debug, Clone)]
pub struct Toolchain {
	info: CompilerInfo,
	parser: Arc<dyn AsmParser>,
}

impl Toolchain {
	pub fn new(info: CompilerInfo) -> Self {
		let parser = info.kind.parser();
		Self { info, parser }
	}

	pub fn info(&self) -> &CompilerInfo {
		&self.info
	}

	pub fn name(&self) -> &str {
		&self.info.name
	}

	/// Command line for compiling `file` into `output`.
	///
	/// Order: compiler args, file args, compiler includes, file includes,
	/// compiler defines, file defines, output arguments, then the file.
	pub fn arguments(
		&self,
		file: &Path,
		options: &CompileOptions,
		filters: &FilterOptions,
		output: &Path,
	) -> Vec<String> {
		let info = &self.info;
		let include = info.include_flag();
		let define = info.define_flag();

		let mut args = Vec::new();
		args.extend(info.args.iter().cloned());
		args.extend(options.args.iter().cloned());
		args.extend(
			info.include_paths
				.iter()
				.chain(&options.includes)
				.map(|path| format!("{include}{path}")),
		);
		args.extend(
			info.defines
				.iter()
				.chain(&options.defines)
				.map(|define_arg| format!("{define}{define_arg}")),
		);
		if filters.intel
			&& info.supports_intel
			&& let Some(flag) = info.kind.intel_syntax_flag()
		{
			args.push(flag.to_owned());
		}
		args.extend(info.kind.prepare_invocation(output));
		args.push(file.display().to_string());
		args
	}

	/// Compiles `file` and parses the listing the compiler wrote.
	pub async fn compile(
		&self,
		file: &Path,
		options: &CompileOptions,
		filters: &FilterOptions,
	) -> Result<Vec<ParsedLine>> {
		let scratch = tempfile::Builder::new()
			.prefix("asmlens-")
			.tempdir()
			.map_err(CompileError::OutputDir)?;
		let stem = file.file_stem().unwrap_or(file.as_os_str());
		let output = scratch.path().join(stem).with_extension("asm");

		let args = self.arguments(file, options, filters, &output);
		let env: BTreeMap<String, String> = self
			.info
			.env
			.iter()
			.chain(&options.env)
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect();

		debug!(compiler = %self.info.name, file = %file.display(), "compiler.exec_start");
		let result = execute(&self.info.exe, &args, &env, None).await?;
		debug!(
			compiler = %self.info.name,
			status = ?result.status,
			"compiler.exec_done"
		);

		if !result.success() {
			return Err(CompileError::Failed {
				file: file.to_path_buf(),
				status: result.status,
				output: result.diagnostics(),
			});
		}

		let bytes = tokio::fs::read(&output)
			.await
			.map_err(|error| CompileError::ReadOutput {
				path: output.clone(),
				error,
			})?;
		let mut asm = String::from_utf8_lossy(&bytes).into_owned();

		if filters.demangle && self.info.supports_demangle {
			asm = self.demangle(asm).await;
		}

		let mut lines = self.parser.process(&asm, filters);
		if let Some(dir) = file.parent() {
			resolve_relative_sources(&mut lines, dir);
		}
		Ok(lines)
	}

	/// Pipes `asm` through the demangler, keeping it unchanged on failure.
	async fn demangle(&self, asm: String) -> String {
		let Some(demangler) = &self.info.demangler else {
			return asm;
		};
		match execute(demangler, &self.info.demangler_args, &BTreeMap::new(), Some(&asm)).await {
			Ok(out) if out.success() => out.stdout,
			Ok(out) => {
				warn!(demangler = %demangler.display(), status = ?out.status, "compiler.demangle_failed");
				asm
			}
			Err(error) => {
				warn!(demangler = %demangler.display(), %error, "compiler.demangle_failed");
				asm
			}
		}
	}
}

/// Compilers report headers and the main file relative to their working
/// directory; anchor those at the compiled file's directory.
fn resolve_relative_sources(lines: &mut [ParsedLine], dir: &Path) {
	for source in lines.iter_mut().filter_map(|line| line.source.as_mut()) {
		if source.file.is_relative() && !source.file.as_os_str().is_empty() {
			source.file = dir.join(&source.file);
		}
	}
}

impl From<CompilerInfo> for Toolchain {
	fn from(info: CompilerInfo) -> Self {
		Self::new(info)
	}
}
