//! Compiled listing snapshots.
//!
//! A [`CompiledUnit`] is the immutable result of one successful compilation:
//! the parsed listing, the [`LineMappingIndex`] built from it, and the set of
//! source documents it references. Units are replaced wholesale on every
//! recompilation and shared behind `Arc`, so readers always observe a
//! complete snapshot.

pub mod index;
pub mod unit;

pub use index::{AsmLines, LineMappingIndex, SourceLine};
pub use unit::{CompileFailure, CompiledUnit, UnitState};
