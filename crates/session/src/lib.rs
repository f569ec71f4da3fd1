//! Editor-facing half of asmlens.
//!
//! [`CompileCache`] owns one compiled unit per assembly view and coalesces
//! recompiles. [`SelectionSynchronizer`] keeps a source/assembly editor pair
//! decorated and cross-navigated, gated by [`EditorVisibilityTracker`].
//! [`AssemblyDocuments`] ties both to an [`EditorHost`] for every open view.

pub mod cache;
mod decorations;
pub mod documents;
pub mod editor;
pub mod event;
pub mod synchronizer;
#[cfg(test)]
pub(crate) mod test_helpers;
pub mod visibility;

pub use cache::{CompileCache, EntryPhase, UnitChanged};
pub use documents::AssemblyDocuments;
pub use editor::{
	DecorationKind, EditorHandle, EditorHost, HostError, RevealKind, SelectionChange, SelectionKind,
	ShowOptions, TextEditor, ViewColumn,
};
pub use event::{Emitter, Subscription, Subscriptions};
pub use synchronizer::{SelectionSynchronizer, SyncPhase, SyncSettings};
pub use visibility::{EditorVisibilityTracker, VisibleSet};
