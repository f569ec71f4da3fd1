//! Compiler flavors.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::parser::{AsmParser, GasParser, MsvcParser};

/// Compiler flavor, selecting argument conventions and the listing parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerKind {
	/// GCC and clang driver conventions, gas listing output.
	#[default]
	Gcc,
	/// MSVC `cl.exe`, MASM-style listing output.
	Msvc,
	/// `clang-cl`: MSVC driver conventions, gas listing output.
	ClangCl,
}

impl CompilerKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Gcc => "gcc",
			Self::Msvc => "msvc",
			Self::ClangCl => "clang-cl",
		}
	}

	/// Guesses the flavor from the executable name.
	pub fn detect(exe: &Path) -> Self {
		let stem = exe
			.file_stem()
			.map(|stem| stem.to_string_lossy().to_lowercase())
			.unwrap_or_default();
		match stem.as_str() {
			"clang-cl" => Self::ClangCl,
			"cl" => Self::Msvc,
			_ => Self::Gcc,
		}
	}

	/// Arguments that make the compiler write an assembly listing to `output`.
	pub fn prepare_invocation(self, output: &Path) -> Vec<String> {
		match self {
			Self::Gcc => vec!["-S".into(), "-o".into(), output.display().to_string()],
			Self::Msvc | Self::ClangCl => {
				vec!["/c".into(), "/FA".into(), format!("/Fa{}", output.display())]
			}
		}
	}

	pub const fn default_include_flag(self) -> &'static str {
		match self {
			Self::Gcc => "-I",
			Self::Msvc | Self::ClangCl => "/I",
		}
	}

	pub const fn default_define_flag(self) -> &'static str {
		match self {
			Self::Gcc => "-D",
			Self::Msvc | Self::ClangCl => "/D",
		}
	}

	/// Flag requesting Intel syntax, for flavors that default to AT&T.
	pub const fn intel_syntax_flag(self) -> Option<&'static str> {
		match self {
			Self::Gcc => Some("-masm=intel"),
			Self::Msvc | Self::ClangCl => None,
		}
	}

	pub fn parser(self) -> Arc<dyn AsmParser> {
		match self {
			Self::Gcc | Self::ClangCl => Arc::new(GasParser),
			Self::Msvc => Arc::new(MsvcParser),
		}
	}
}

impl std::fmt::Display for CompilerKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
