use asmlens_primitives::Url;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::editor::{DecorationKind, EditorHandle, ViewColumn};

/// Last decoration set applied per editor slot.
///
/// Editors are identified by document and column, since handles change
/// across visibility events. Must be reset whenever the visible set changes:
/// hosts drop decorations of editors that leave the screen.
#[derive(Debug, Default)]
pub(crate) struct DecorationLedger {
	applied: FxHashMap<(Url, Option<ViewColumn>, DecorationKind), Vec<usize>>,
}

impl DecorationLedger {
	/// Sets `kind` on `editor` to `lines`, skipping the host call when that
	/// exact set is already applied.
	pub(crate) fn apply(&mut self, editor: &EditorHandle, kind: DecorationKind, lines: Vec<usize>) {
		let key = (editor.document().clone(), editor.view_column(), kind);
		if self.applied.get(&key) == Some(&lines) {
			trace!(document = %key.0, ?kind, "sync.decorations_unchanged");
			return;
		}
		editor.set_decorations(kind, &lines);
		self.applied.insert(key, lines);
	}

	pub(crate) fn clear(&mut self, editor: &EditorHandle) {
		for kind in DecorationKind::ALL {
			self.apply(editor, kind, Vec::new());
		}
	}

	pub(crate) fn reset(&mut self) {
		self.applied.clear();
	}
}
