//! Assembly listing parsers.
//!
//! A parser turns the raw listing a compiler wrote into display lines, each
//! optionally carrying the source location that produced it. Filtering
//! (labels, directives, comments, library code) happens here so the mapping
//! index only ever sees the lines the user will see.

mod gas;
mod msvc;


use std::fmt::Debug;
use std::sync::LazyLock;

use asmlens_primitives::ParsedLine;
use regex::Regex;
use rustc_hash::FxHashSet;

pub use gas::GasParser;
pub use msvc::MsvcParser;

use crate::filters::FilterOptions;

/// Parses one compiler's listing format.
pub trait AsmParser: Send + Sync + Debug {
	fn process(&self, asm: &str, filters: &FilterOptions) -> Vec<ParsedLine>;
}

static IDENTIFIER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"[\w$.@?]+").expect("valid identifier pattern"));

/// Records every identifier-like token of `text` in `used`.
///
/// Symbol suffixes such as `@PLT` also record the bare name.
pub(crate) fn collect_identifiers(text: &str, used: &mut FxHashSet<String>) {
	for token in IDENTIFIER.find_iter(text) {
		let token = token.as_str();
		if let Some((bare, _)) = token.split_once('@')
			&& !bare.is_empty()
		{
			used.insert(bare.to_owned());
		}
		used.insert(token.to_owned());
	}
}

/// Applies tab expansion and, with `filters.trim`, whitespace squashing.
pub(crate) fn display_text(line: &str, filters: &FilterOptions) -> String {
	let expanded = expand_tabs(line);
	if filters.trim {
		squash_horizontal_whitespace(&expanded, true)
	} else {
		expanded
	}
}

/// Replaces tabs with spaces up to the next multiple of eight columns.
pub fn expand_tabs(line: &str) -> String {
	if !line.contains('\t') {
		return line.to_owned();
	}
	let mut out = String::with_capacity(line.len() + 8);
	let mut column = 0usize;
	for ch in line.chars() {
		if ch == '\t' {
			let pad = 8 - column % 8;
			out.extend(std::iter::repeat_n(' ', pad));
			column += pad;
		} else {
			out.push(ch);
			column += 1;
		}
	}
	out
}

/// Collapses runs of horizontal whitespace to one space, leaving quoted
/// strings untouched.
///
/// An indented line keeps at most a two-space indent; a blank line becomes
/// empty.
pub fn squash_horizontal_whitespace(line: &str, at_start: bool) -> String {
	match split_quoted(line) {
		Some((before, quoted, after)) => {
			let mut out = squash_horizontal_whitespace(before, at_start);
			out.push_str(quoted);
			out.push_str(&squash_horizontal_whitespace(after, false));
			out
		}
		None => squash_plain(line, at_start),
	}
}

/// Splits off the first complete double-quoted string, honouring `\` escapes.
fn split_quoted(line: &str) -> Option<(&str, &str, &str)> {
	let open = line.find('"')?;
	let mut escaped = false;
	for (offset, ch) in line[open + 1..].char_indices() {
		match ch {
			_ if escaped => escaped = false,
			'\\' => escaped = true,
			'"' => {
				let close = open + 1 + offset + 1;
				return Some((&line[..open], &line[open..close], &line[close..]));
			}
			_ => {}
		}
	}
	None
}

fn squash_plain(line: &str, at_start: bool) -> String {
	if line.trim().is_empty() {
		return String::new();
	}

	let mut out = String::with_capacity(line.len());
	if line.starts_with(char::is_whitespace) {
		if at_start && line.chars().nth(1) == Some(' ') {
			out.push_str("  ");
		} else {
			out.push(' ');
		}
	}
	for (i, word) in line.split_whitespace().enumerate() {
		if i > 0 {
			out.push(' ');
		}
		out.push_str(word);
	}
	if line.ends_with(char::is_whitespace) {
		out.push(' ');
	}
	out
}
