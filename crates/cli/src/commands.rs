//! One-shot commands: `compile` and `map`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use asmlens_compiler::CompileManager;
use asmlens_listing::CompiledUnit;
use asmlens_primitives::{ParsedLine, Url, assembly_uri, source_uri};
use tracing::debug;

/// Absolute, normalized path of `file` and its document URI.
pub fn resolve_source(file: &Path) -> Result<(PathBuf, Url)> {
	let path = std::path::absolute(file).with_context(|| format!("invalid path {}", file.display()))?;
	let uri = source_uri(&path)?;
	Ok((path, uri))
}

async fn compile_unit(manager: &CompileManager, file: &Path) -> Result<(CompiledUnit, Vec<ParsedLine>)> {
	let (path, source) = resolve_source(file)?;
	let lines = manager.compile(&path).await?;
	debug!(file = %path.display(), lines = lines.len(), "cli.compiled");
	let unit = CompiledUnit::new(source.clone(), assembly_uri(&source)?, lines.clone());
	Ok((unit, lines))
}

pub async fn compile(manager: &CompileManager, file: &Path, json: bool) -> Result<()> {
	let (unit, lines) = compile_unit(manager, file).await?;
	if json {
		println!("{}", serde_json::to_string_pretty(&lines)?);
	} else {
		println!("{}", unit.content());
	}
	Ok(())
}

pub async fn map(manager: &CompileManager, file: &Path) -> Result<()> {
	let (unit, _) = compile_unit(manager, file).await?;
	print!("{}", render_map(&unit, source_line_count));
	Ok(())
}

/// Line count of a source document on disk, if it can be read.
pub fn source_line_count(uri: &Url) -> Option<usize> {
	let path = uri.to_file_path().ok()?;
	let text = std::fs::read_to_string(path).ok()?;
	Some(text.lines().count())
}

/// Source-line → assembly-line buckets per referenced file, 1-based.
///
/// The primary source comes first, then the other files in URI order.
pub fn render_map(unit: &CompiledUnit, line_count: impl Fn(&Url) -> Option<usize>) -> String {
	let primary = unit.primary_source();
	let mut files: Vec<&Url> = unit.referenced_sources().iter().collect();
	files.sort_by(|a, b| {
		(*a != primary)
			.cmp(&(*b != primary))
			.then_with(|| a.as_str().cmp(b.as_str()))
	});

	let mut out = String::new();
	for file in files {
		let label = file
			.to_file_path()
			.map(|path| path.display().to_string())
			.unwrap_or_else(|_| file.to_string());
		let _ = writeln!(out, "{label}");
		for (line, asm_lines) in unit.index().buckets(file) {
			let asm: Vec<String> = asm_lines.iter().map(|asm| (asm + 1).to_string()).collect();
			let _ = writeln!(out, "  {:>5} -> {}", line + 1, asm.join(", "));
		}
		if let Some(total) = line_count(file) {
			let unused = if unit.index().contains_file(file) {
				unit.index().unused_source_lines(file, total).len()
			} else {
				total
			};
			let _ = writeln!(out, "  {unused} of {total} lines produced no code");
		}
	}
	out
}

/// One-line description of a finished compile.
pub fn summary(unit: &CompiledUnit) -> String {
	let index = unit.index();
	format!(
		"{} lines, {} mapped, {} source files",
		unit.line_count(),
		index.mapped_line_count(),
		unit.referenced_sources().len()
	)
}
