use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use asmlens_primitives::{ParsedLine, SourceLocation};
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use super::{AsmParser, collect_identifiers, display_text};
use crate::filters::FilterOptions;

macro_rules! pattern {
	($name:ident, $re:literal) => {
		static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).expect(stringify!($name)));
	};
}

pattern!(FILE_NUMBERED, r#"^\s*\.file\s+(\d+)\s+"([^"]*)"(?:\s+"([^"]*)")?"#);
pattern!(FILE_MAIN, r#"^\s*\.file\s+"([^"]*)""#);
pattern!(LOC, r"^\s*\.loc\s+(\d+)\s+(\d+)(?:\s+(\d+))?");
pattern!(LABEL_DEF, r#"^\s*(?:\.proc\s+)?([\w$.@]+|"[\w$.@]+"):"#);
pattern!(DIRECTIVE, r"^\s*\.[A-Za-z_]");
pattern!(
	DATA_DIRECTIVE,
	r"^\s*\.(?:string|ascii|asciz|byte|short|long|quad|value|word|int|zero|octa|float|double|skip|space|sleb128|uleb128|2byte|4byte|8byte)\b"
);
pattern!(SOURCE_RESET, r"^\s*\.(?:cfi_endproc|data|text|section)\b");
pattern!(SECTION, r"^\s*(?:\.section\s+([\w.$@]+)|\.(?:text|data|bss)\b)");
pattern!(COMMENT_ONLY, r"^\s*(?:#|//|;)");
pattern!(SYMBOL_DECL, r"^\s*\.(?:globl|global|weak)\s+([\w$.@]+)");
pattern!(FUNCTION_TYPE, r"^\s*\.type\s+([\w$.@]+)\s*,\s*[@%]function");
pattern!(DEBUG_CALL, r"@llvm\.dbg\.");

/// Parser for GNU assembler listings (GCC, clang, clang-cl).
///
/// Source locations come from `.file`/`.loc` debug directives, so the
/// compiler must be run with debug info for lines to map back.
#[derive(Debug, Clone, Copy, Default)]
pub struct GasParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
	Label,
	Directive,
	Data,
	Comment,
	Blank,
	Instruction,
}

fn classify(line: &str) -> Kind {
	if line.trim().is_empty() {
		Kind::Blank
	} else if LABEL_DEF.is_match(line) {
		Kind::Label
	} else if DATA_DIRECTIVE.is_match(line) {
		Kind::Data
	} else if DIRECTIVE.is_match(line) {
		Kind::Directive
	} else if COMMENT_ONLY.is_match(line) {
		Kind::Comment
	} else {
		Kind::Instruction
	}
}

/// Tracks whether the cursor is inside a `.debug_*` section.
fn update_debug_section(line: &str, in_debug: &mut bool) {
	if let Some(caps) = SECTION.captures(line) {
		*in_debug = caps.get(1).is_some_and(|name| name.as_str().starts_with(".debug"));
	}
}

fn label_name(line: &str) -> Option<&str> {
	let name = LABEL_DEF.captures(line)?.get(1)?.as_str();
	Some(name.trim_matches('"'))
}

fn is_local_label(name: &str) -> bool {
	name.starts_with(".L") || name.starts_with("L.")
}

/// File table and referenced symbols, gathered before any line is emitted.
#[derive(Debug, Default)]
struct Prescan {
	files: FxHashMap<u32, PathBuf>,
	main_file: Option<PathBuf>,
	used_labels: FxHashSet<String>,
}

impl Prescan {
	fn run(asm: &str) -> Self {
		let mut scan = Self::default();
		let mut in_debug = false;
		for line in asm.lines() {
			update_debug_section(line, &mut in_debug);
			if let Some(caps) = FILE_NUMBERED.captures(line) {
				let Ok(number) = caps[1].parse::<u32>() else {
					continue;
				};
				let path = match caps.get(3) {
					Some(name) => Path::new(&caps[2]).join(name.as_str()),
					None => PathBuf::from(&caps[2]),
				};
				scan.files.insert(number, path);
				continue;
			}
			if let Some(caps) = FILE_MAIN.captures(line) {
				if scan.main_file.is_none() {
					scan.main_file = Some(PathBuf::from(&caps[1]));
				}
				continue;
			}
			if let Some(caps) = SYMBOL_DECL.captures(line).or_else(|| FUNCTION_TYPE.captures(line)) {
				scan.used_labels.insert(caps[1].to_owned());
				continue;
			}
			match classify(line) {
				Kind::Instruction => collect_identifiers(line, &mut scan.used_labels),
				Kind::Data if !in_debug => collect_identifiers(line, &mut scan.used_labels),
				_ => {}
			}
		}
		scan
	}

	fn is_main_file(&self, file: &Path) -> bool {
		match &self.main_file {
			Some(main) => file.ends_with(main) || main.ends_with(file),
			None => true,
		}
	}
}

/// Lines emitted under one non-local label.
#[derive(Debug, Default)]
struct Block {
	lines: Vec<ParsedLine>,
	has_code: bool,
	has_main_code: bool,
}

impl AsmParser for GasParser {
	fn process(&self, asm: &str, filters: &FilterOptions) -> Vec<ParsedLine> {
		let scan = Prescan::run(asm);
		let mut out = Vec::new();
		let mut block = Block::default();
		let mut current: Option<SourceLocation> = None;
		let mut in_debug = false;

		let flush = |block: &mut Block, out: &mut Vec<ParsedLine>| {
			let block = std::mem::take(block);
			if filters.library_code && block.has_code && !block.has_main_code {
				trace!(lines = block.lines.len(), "compiler.gas.library_block_hidden");
				return;
			}
			out.extend(block.lines);
		};

		for line in asm.lines() {
			if let Some(caps) = LOC.captures(line) {
				let file = caps[1].parse::<u32>().ok().and_then(|n| scan.files.get(&n));
				let number = caps[2].parse::<u32>().unwrap_or(0);
				current = match file {
					Some(file) if number > 0 => {
						let location = SourceLocation::new(file.clone(), number);
						match caps.get(3).and_then(|col| col.as_str().parse::<u32>().ok()) {
							Some(col) if col > 0 => Some(location.with_column(col)),
							_ => Some(location),
						}
					}
					_ => None,
				};
			} else if SOURCE_RESET.is_match(line) {
				current = None;
			}

			update_debug_section(line, &mut in_debug);
			if filters.directives && in_debug {
				continue;
			}
			if !filters.debug_calls && DEBUG_CALL.is_match(line) {
				continue;
			}

			let kind = classify(line);
			let source = match kind {
				Kind::Label => {
					let name = label_name(line).unwrap_or_default();
					if !is_local_label(name) {
						flush(&mut block, &mut out);
					}
					if filters.labels && !scan.used_labels.contains(name) {
						continue;
					}
					None
				}
				Kind::Directive if filters.directives => continue,
				Kind::Directive | Kind::Data => None,
				Kind::Comment | Kind::Blank if filters.comment_only => continue,
				Kind::Comment | Kind::Blank => None,
				Kind::Instruction => {
					block.has_code = true;
					if let Some(location) = &current
						&& scan.is_main_file(&location.file)
					{
						block.has_main_code = true;
					}
					current.clone()
				}
			};

			block.lines.push(ParsedLine {
				text: display_text(line, filters),
				source,
			});
		}
		flush(&mut block, &mut out);
		out
	}
}
