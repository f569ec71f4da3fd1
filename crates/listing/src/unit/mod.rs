//! Per-compilation snapshots and the compile outcome.

use std::sync::Arc;

use asmlens_primitives::{ParsedLine, Url};
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::index::{LineMappingIndex, SourceLine};

/// Immutable result of one successful compilation.
#[derive(Debug)]
pub struct CompiledUnit {
	primary_source: Url,
	assembly: Url,
	lines: Vec<ParsedLine>,
	index: LineMappingIndex,
	referenced_sources: FxHashSet<Url>,
}

impl CompiledUnit {
	pub fn new(primary_source: Url, assembly: Url, lines: Vec<ParsedLine>) -> Self {
		let index = LineMappingIndex::build(&lines);
		let mut referenced_sources: FxHashSet<Url> = index.files().cloned().collect();
		referenced_sources.insert(primary_source.clone());

		Self {
			primary_source,
			assembly,
			lines,
			index,
			referenced_sources,
		}
	}

	pub fn primary_source(&self) -> &Url {
		&self.primary_source
	}

	pub fn assembly(&self) -> &Url {
		&self.assembly
	}

	pub fn lines(&self) -> &[ParsedLine] {
		&self.lines
	}

	pub fn line_count(&self) -> usize {
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	pub fn index(&self) -> &LineMappingIndex {
		&self.index
	}

	/// Every source document that appears in the listing, plus the primary source.
	pub fn referenced_sources(&self) -> &FxHashSet<Url> {
		&self.referenced_sources
	}

	pub fn references(&self, uri: &Url) -> bool {
		self.referenced_sources.contains(uri)
	}

	/// Text of the virtual assembly document.
	pub fn content(&self) -> String {
		let mut out = String::with_capacity(self.lines.iter().map(|l| l.text.len() + 1).sum());
		for (i, line) in self.lines.iter().enumerate() {
			if i > 0 {
				out.push('\n');
			}
			out.push_str(&line.text);
		}
		out
	}

	/// Go-to-source target for an assembly line.
	pub fn definition_at(&self, asm_line: usize) -> Option<&SourceLine> {
		self.index.source_line_of(asm_line)
	}
}

/// A compilation that did not produce a listing.
///
/// `message` carries the compiler's diagnostic output verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileFailure {
	pub source_uri: Url,
	pub message: String,
}

impl CompileFailure {
	pub fn new(source_uri: Url, message: impl Into<String>) -> Self {
		Self {
			source_uri,
			message: message.into(),
		}
	}
}

/// Latest compile outcome for one assembly document.
///
/// Callers must check for [`UnitState::Failed`] before trusting a listing.
#[derive(Debug, Clone)]
pub enum UnitState {
	Compiled(Arc<CompiledUnit>),
	Failed(CompileFailure),
}

impl UnitState {
	pub fn compiled(&self) -> Option<&Arc<CompiledUnit>> {
		match self {
			Self::Compiled(unit) => Some(unit),
			Self::Failed(_) => None,
		}
	}

	pub fn failure(&self) -> Option<&CompileFailure> {
		match self {
			Self::Compiled(_) => None,
			Self::Failed(failure) => Some(failure),
		}
	}

	pub fn is_failed(&self) -> bool {
		matches!(self, Self::Failed(_))
	}

	pub fn to_result(&self) -> Result<Arc<CompiledUnit>, CompileFailure> {
		match self {
			Self::Compiled(unit) => Ok(Arc::clone(unit)),
			Self::Failed(failure) => Err(failure.clone()),
		}
	}

	/// Document text: the listing, or the failure message.
	pub fn content(&self) -> String {
		match self {
			Self::Compiled(unit) => unit.content(),
			Self::Failed(failure) => failure.message.clone(),
		}
	}
}

impl From<Result<CompiledUnit, CompileFailure>> for UnitState {
	fn from(result: Result<CompiledUnit, CompileFailure>) -> Self {
		match result {
			Ok(unit) => Self::Compiled(Arc::new(unit)),
			Err(failure) => Self::Failed(failure),
		}
	}
}
