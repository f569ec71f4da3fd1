//! Source line to assembly line correspondence.

use std::path::Path;

use asmlens_primitives::{ParsedLine, Url, source_uri};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

/// Assembly line indices mapped from one source line, in listing order.
pub type AsmLines = SmallVec<[usize; 4]>;

/// A 0-based line in a source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLine {
	pub file: Url,
	pub line: usize,
	pub column: Option<u32>,
}

/// Bidirectional line mapping built from a parsed listing.
///
/// Every assembly line with a resolvable source location lands in exactly one
/// bucket keyed by `(file, 0-based source line)`. Source lines without a
/// bucket are unused: no assembly was generated for them.
#[derive(Debug, Clone, Default)]
pub struct LineMappingIndex {
	files: FxHashMap<Url, FxHashMap<usize, AsmLines>>,
	reverse: Vec<Option<SourceLine>>,
}

impl LineMappingIndex {
	/// Builds the index in a single pass over the listing.
	pub fn build(lines: &[ParsedLine]) -> Self {
		let mut files: FxHashMap<Url, FxHashMap<usize, AsmLines>> = FxHashMap::default();
		let mut reverse = Vec::with_capacity(lines.len());
		let mut last_file: Option<(&Path, Url)> = None;

		for (asm_line, line) in lines.iter().enumerate() {
			let resolved = line.resolvable_source().and_then(|source| {
				let line_index = source.line_index()?;
				let cached = last_file
					.as_ref()
					.filter(|(path, _)| *path == source.file())
					.map(|(_, uri)| uri.clone());
				let file = match cached {
					Some(uri) => uri,
					None => match source_uri(source.file()) {
						Ok(uri) => {
							last_file = Some((source.file(), uri.clone()));
							uri
						}
						Err(err) => {
							trace!(asm_line, error = %err, "listing.index.unresolved_file");
							return None;
						}
					},
				};
				Some(SourceLine {
					file,
					line: line_index,
					column: source.column,
				})
			});

			if let Some(source) = &resolved {
				files
					.entry(source.file.clone())
					.or_default()
					.entry(source.line)
					.or_default()
					.push(asm_line);
			}
			reverse.push(resolved);
		}

		Self { files, reverse }
	}

	/// Assembly lines generated from `source_line` of `file`.
	pub fn assembly_lines_for(&self, file: &Url, source_line: usize) -> Option<&[usize]> {
		self.files.get(file)?.get(&source_line).map(|lines| lines.as_slice())
	}

	/// Source lines of `file` in `0..total_lines` that produced no assembly.
	///
	/// Files that do not appear in the listing at all yield nothing: without
	/// any mapping there is no basis to call a line unused.
	pub fn unused_source_lines(&self, file: &Url, total_lines: usize) -> Vec<usize> {
		let Some(mapping) = self.files.get(file) else {
			return Vec::new();
		};
		(0..total_lines).filter(|line| !mapping.contains_key(line)).collect()
	}

	/// Reverse lookup: the source line an assembly line came from.
	pub fn source_line_of(&self, asm_line: usize) -> Option<&SourceLine> {
		self.reverse.get(asm_line)?.as_ref()
	}

	/// Buckets of `file` sorted by source line.
	pub fn buckets(&self, file: &Url) -> Vec<(usize, &[usize])> {
		let Some(mapping) = self.files.get(file) else {
			return Vec::new();
		};
		let mut buckets: Vec<_> = mapping.iter().map(|(line, asm)| (*line, asm.as_slice())).collect();
		buckets.sort_unstable_by_key(|(line, _)| *line);
		buckets
	}

	pub fn contains_file(&self, file: &Url) -> bool {
		self.files.contains_key(file)
	}

	/// Source files with at least one mapped line.
	pub fn files(&self) -> impl Iterator<Item = &Url> {
		self.files.keys()
	}

	/// Number of listing lines the index was built from.
	pub fn assembly_line_count(&self) -> usize {
		self.reverse.len()
	}

	/// Number of listing lines that carry a mapping.
	pub fn mapped_line_count(&self) -> usize {
		self.reverse.iter().filter(|source| source.is_some()).count()
	}
}
