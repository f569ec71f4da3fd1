use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Location in a source file that produced a line of assembly.
///
/// Lines are 1-based as emitted by the compiler, where line `0` means the
/// instruction has no source (compiler generated code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
	pub file: PathBuf,
	pub line: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub column: Option<u32>,
}

impl SourceLocation {
	pub fn new(file: impl Into<PathBuf>, line: u32) -> Self {
		Self {
			file: file.into(),
			line,
			column: None,
		}
	}

	pub fn with_column(mut self, column: u32) -> Self {
		self.column = Some(column);
		self
	}

	/// Returns true when both a file and a real line number are present.
	pub fn is_resolvable(&self) -> bool {
		!self.file.as_os_str().is_empty() && self.line > 0
	}

	/// Returns the 0-based line index, or `None` for the "no source" marker.
	pub fn line_index(&self) -> Option<usize> {
		(self.line > 0).then(|| self.line as usize - 1)
	}

	pub fn file(&self) -> &Path {
		&self.file
	}
}

/// One line of a compiled listing in display order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedLine {
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source: Option<SourceLocation>,
}

impl ParsedLine {
	pub fn new(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			source: None,
		}
	}

	pub fn with_source(text: impl Into<String>, source: SourceLocation) -> Self {
		Self {
			text: text.into(),
			source: Some(source),
		}
	}

	/// Source location, if it can be mapped back to a source line.
	pub fn resolvable_source(&self) -> Option<&SourceLocation> {
		self.source.as_ref().filter(|source| source.is_resolvable())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn line_zero_is_not_resolvable() {
		let loc = SourceLocation::new("/src/main.c", 0);
		assert!(!loc.is_resolvable());
		assert_eq!(loc.line_index(), None);
	}

	#[test]
	fn empty_file_is_not_resolvable() {
		let line = ParsedLine::with_source("ret", SourceLocation::new("", 4));
		assert!(line.resolvable_source().is_none());
	}

	#[test]
	fn line_index_is_zero_based() {
		let loc = SourceLocation::new("/src/main.c", 3).with_column(7);
		assert!(loc.is_resolvable());
		assert_eq!(loc.line_index(), Some(2));
		assert_eq!(loc.column, Some(7));
	}

	#[test]
	fn serde_omits_absent_source() {
		let json = serde_json::to_string(&ParsedLine::new("nop")).unwrap();
		assert_eq!(json, r#"{"text":"nop"}"#);

		let back: ParsedLine = serde_json::from_str(r#"{"text":"mov","source":{"file":"/a.c","line":2}}"#).unwrap();
		assert_eq!(back.source, Some(SourceLocation::new("/a.c", 2)));
	}
}
