use serde::{Deserialize, Serialize};

/// Listing output filters.
///
/// Defaults hide unused labels, directives and comment-only lines, and keep
/// library code visible: when part of the project itself is a library,
/// hiding it is surprising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterOptions {
	/// Hide labels that nothing references.
	pub labels: bool,
	/// Hide functions with no code from the main source file.
	pub library_code: bool,
	/// Hide assembler directives (data directives are kept).
	pub directives: bool,
	/// Hide lines that only contain a comment.
	pub comment_only: bool,
	/// Collapse runs of horizontal whitespace.
	pub trim: bool,
	/// Pipe the listing through the compiler's demangler.
	pub demangle: bool,
	/// Ask the compiler for Intel syntax.
	pub intel: bool,
	/// Keep `llvm.dbg.*` intrinsic calls (LLVM IR listings).
	pub debug_calls: bool,
}

impl Default for FilterOptions {
	fn default() -> Self {
		Self {
			labels: true,
			library_code: false,
			directives: true,
			comment_only: true,
			trim: false,
			demangle: false,
			intel: false,
			debug_calls: false,
		}
	}
}

impl FilterOptions {
	/// Filters that keep the listing exactly as the compiler wrote it.
	pub fn none() -> Self {
		Self {
			labels: false,
			library_code: false,
			directives: false,
			comment_only: false,
			trim: false,
			demangle: false,
			intel: false,
			debug_calls: false,
		}
	}
}
