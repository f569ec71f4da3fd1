//! Host editor boundary.
//!
//! Editor handles are not stable: the same document can come back as a new
//! handle after being hidden and shown again. Nothing here keeps a handle
//! across events; documents are compared by URI.

use std::sync::Arc;

use asmlens_primitives::Url;
use async_trait::async_trait;
use thiserror::Error;

/// Decorations the synchronizer applies, each to whole lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationKind {
	/// The selected line and the lines it corresponds to.
	SelectedLine,
	/// Source lines no assembly was generated for.
	UnusedLine,
	/// Compile-in-progress marker on the assembly view.
	Loading,
}

impl DecorationKind {
	pub const ALL: [Self; 3] = [Self::SelectedLine, Self::UnusedLine, Self::Loading];
}

/// How a revealed line is scrolled into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealKind {
	#[default]
	InCenterIfOutsideViewport,
	InCenter,
	AtTop,
}

/// What caused a selection change.
///
/// Events fired because an editor was merely opened carry no kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
	Keyboard,
	Mouse,
	Command,
}

/// Editor column in the host layout, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewColumn(pub u8);

impl ViewColumn {
	pub const ONE: Self = Self(1);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShowOptions {
	pub column: Option<ViewColumn>,
	/// Keep keyboard focus in the currently focused editor.
	pub preserve_focus: bool,
}

/// A visible text editor.
pub trait TextEditor: Send + Sync {
	fn document(&self) -> &Url;
	fn line_count(&self) -> usize;
	/// 0-based line of the primary cursor.
	fn selection_line(&self) -> usize;
	fn view_column(&self) -> Option<ViewColumn>;
	/// Replaces every decoration of `kind` with `lines`.
	fn set_decorations(&self, kind: DecorationKind, lines: &[usize]);
	fn reveal_line(&self, line: usize, reveal: RevealKind);
}

pub type EditorHandle = Arc<dyn TextEditor>;

#[derive(Debug, Error)]
pub enum HostError {
	#[error("failed to open {uri}: {message}")]
	Open { uri: Url, message: String },
}

/// The editor application hosting the views.
#[async_trait]
pub trait EditorHost: Send + Sync {
	fn visible_editors(&self) -> Vec<EditorHandle>;
	/// Opens `uri`, or returns the existing editor for it.
	async fn show_document(&self, uri: &Url, options: ShowOptions) -> Result<EditorHandle, HostError>;
	fn show_error(&self, message: &str);
}

/// A selection moved in some editor.
#[derive(Clone)]
pub struct SelectionChange {
	pub editor: EditorHandle,
	/// 0-based line of the new primary selection.
	pub line: usize,
	pub kind: Option<SelectionKind>,
}

impl std::fmt::Debug for SelectionChange {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SelectionChange")
			.field("document", &self.editor.document().as_str())
			.field("line", &self.line)
			.field("kind", &self.kind)
			.finish()
	}
}
