//! Compiler collaborator for asmlens.
//!
//! Turns a source file into a parsed assembly listing:
//!
//! - [`CompilerKind`]: per-flavor strategy (output arguments, flags, parser)
//! - [`Toolchain`]: one configured compiler executable
//! - [`parser`]: gas and MSVC listing parsers behind [`AsmParser`]
//! - [`CompileManager`]: named compilers plus per-file compile settings,
//!   exposed to the compile cache through [`SourceCompiler`]

pub mod buildsystem;
pub mod database;
pub mod error;
pub mod exec;
pub mod filters;
pub mod info;
pub mod kind;
pub mod parser;
pub mod toolchain;

use asmlens_primitives::{ParsedLine, Url};
use async_trait::async_trait;

pub use buildsystem::BuildSystemCompileInfo;
pub use database::{CompilationInfo, CompileInfoDatabase, CompileManager, CompilerRegistry};
pub use error::{CompileError, Result};
pub use filters::FilterOptions;
pub use info::{CompileOptions, CompilerInfo};
pub use kind::CompilerKind;
pub use parser::{AsmParser, GasParser, MsvcParser};
pub use toolchain::Toolchain;

/// Compiles a source document into listing lines.
///
/// This is the only boundary the compile cache depends on.
#[async_trait]
pub trait SourceCompiler: Send + Sync {
	async fn compile(&self, source: &Url) -> Result<Vec<ParsedLine>>;
}
