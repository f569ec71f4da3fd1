use std::path::PathBuf;
use std::sync::LazyLock;

use asmlens_primitives::{ParsedLine, SourceLocation};
use regex::Regex;
use rustc_hash::FxHashSet;

use super::{AsmParser, collect_identifiers, display_text};
use crate::filters::FilterOptions;

static FILE_MARKER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^; File (.+?)\s*$").expect("valid file marker pattern"));
static LINE_MARKER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^; Line (\d+)").expect("valid line marker pattern"));
static PROC_START: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^([\w$@?]+)\s+PROC\b").expect("valid proc pattern"));
static PROC_END: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[\w$@?]+\s+ENDP\b").expect("valid endp pattern"));
static LABEL_DEF: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^([\w$@?.]+):").expect("valid label pattern"));
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(?:\s*(?:TITLE|INCLUDELIB|include|PUBLIC|EXTRN|END)\b|\s*\.\w|[\w$@?]+\s+(?:SEGMENT|ENDS)\b)")
		.expect("valid directive pattern")
});

/// Parser for MSVC `/FA` listings.
///
/// `; File` and `; Line` comments carry the source location of the
/// instructions that follow them.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsvcParser;

fn used_labels(asm: &str) -> FxHashSet<String> {
	let mut used = FxHashSet::default();
	for line in asm.lines() {
		if line.starts_with(char::is_whitespace)
			&& !line.trim_start().starts_with(';')
			&& !DIRECTIVE.is_match(line)
		{
			collect_identifiers(line, &mut used);
		}
	}
	used
}

impl AsmParser for MsvcParser {
	fn process(&self, asm: &str, filters: &FilterOptions) -> Vec<ParsedLine> {
		let used = filters.labels.then(|| used_labels(asm));
		let mut out = Vec::new();
		let mut file: Option<PathBuf> = None;
		let mut line_number: Option<u32> = None;

		for line in asm.lines() {
			if let Some(caps) = FILE_MARKER.captures(line) {
				file = Some(PathBuf::from(&caps[1]));
				line_number = None;
			} else if let Some(caps) = LINE_MARKER.captures(line) {
				line_number = caps[1].parse().ok().filter(|n| *n > 0);
			}

			let trimmed = line.trim_start();
			let source = if trimmed.is_empty() || trimmed.starts_with(';') {
				if filters.comment_only {
					continue;
				}
				None
			} else if PROC_START.is_match(line) {
				None
			} else if PROC_END.is_match(line) {
				line_number = None;
				if filters.directives {
					continue;
				}
				None
			} else if DIRECTIVE.is_match(line) {
				if filters.directives {
					continue;
				}
				None
			} else if let Some(caps) = LABEL_DEF.captures(line) {
				if let Some(used) = &used
					&& !used.contains(&caps[1])
				{
					continue;
				}
				None
			} else {
				file.as_ref()
					.zip(line_number)
					.map(|(file, number)| SourceLocation::new(file.clone(), number))
			};

			out.push(ParsedLine {
				text: display_text(line, filters),
				source,
			});
		}
		out
	}
}
