//! Selection synchronization between an assembly view and its sources.
//!
//! [`SelectionSynchronizer`] is a two-phase state machine driven by three
//! inputs: a new unit from the compile cache, a change of visible editors,
//! and a selection change in some editor.
//!
//! # Phases
//!
//! - [`SyncPhase::Inactive`]: the assembly editor or all of its source
//!   editors are hidden. Every decoration is cleared and events are ignored.
//! - [`SyncPhase::Active`]: unused source lines are dimmed and selections are
//!   mirrored between the editors.
//!
//! A failed compile suspends all decoration work until the next unit
//! arrives. Selection events without a kind come from editors being opened
//! and are dropped, so opening a source editor during navigation cannot
//! overwrite the selection that caused it.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use asmlens_listing::{CompiledUnit, SourceLine, UnitState};
use asmlens_primitives::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::decorations::DecorationLedger;
use crate::editor::{
	DecorationKind, EditorHandle, EditorHost, RevealKind, SelectionChange, ShowOptions, ViewColumn,
};
use crate::visibility::{EditorVisibilityTracker, VisibleSet};

/// User settings for assembly views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
	pub dim_unused_source_lines: bool,
	pub recompile_debounce_ms: u64,
}

impl Default for SyncSettings {
	fn default() -> Self {
		Self {
			dim_unused_source_lines: true,
			recompile_debounce_ms: 100,
		}
	}
}

impl SyncSettings {
	pub fn recompile_debounce(&self) -> Duration {
		Duration::from_millis(self.recompile_debounce_ms)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
	Inactive,
	Active,
}

/// The last deliberate selection, replayed when the view becomes active.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
	Source { document: Url, line: usize },
	Assembly { line: usize },
}

pub struct SelectionSynchronizer {
	host: Arc<dyn EditorHost>,
	tracker: EditorVisibilityTracker,
	settings: SyncSettings,
	/// `None` until the first compile finishes.
	unit: Option<UnitState>,
	phase: SyncPhase,
	ledger: DecorationLedger,
	last_selection: Option<Selection>,
}

impl std::fmt::Debug for SelectionSynchronizer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SelectionSynchronizer")
			.field("assembly", &self.tracker.assembly().as_str())
			.field("phase", &self.phase)
			.field("last_selection", &self.last_selection)
			.finish_non_exhaustive()
	}
}

impl SelectionSynchronizer {
	pub fn new(host: Arc<dyn EditorHost>, primary_source: Url, assembly: Url, settings: SyncSettings) -> Self {
		Self {
			host,
			tracker: EditorVisibilityTracker::new(primary_source, assembly),
			settings,
			unit: None,
			phase: SyncPhase::Inactive,
			ledger: DecorationLedger::default(),
			last_selection: None,
		}
	}

	pub fn phase(&self) -> SyncPhase {
		self.phase
	}

	pub fn unit(&self) -> Option<&UnitState> {
		self.unit.as_ref()
	}

	pub fn assembly(&self) -> &Url {
		self.tracker.assembly()
	}

	pub fn primary_source(&self) -> &Url {
		self.tracker.primary_source()
	}

	fn visible(&self) -> VisibleSet {
		self.tracker.classify(&self.host.visible_editors(), self.unit.as_ref())
	}

	fn compiled(&self) -> Option<Arc<CompiledUnit>> {
		self.unit.as_ref()?.compiled().cloned()
	}

	/// Swaps in the result of a finished compile and redecorates.
	pub fn on_unit_changed(&mut self, state: UnitState) {
		debug!(
			assembly = %self.tracker.assembly(),
			failed = state.is_failed(),
			"sync.unit_changed"
		);
		// Sources of the outgoing unit may not be referenced by the new one.
		let outgoing = self.visible();
		self.clear(&outgoing);
		self.unit = Some(state);
		self.refresh();
	}

	/// Clears and recomputes every decoration from the current unit.
	pub fn refresh(&mut self) {
		let visible = self.visible();
		self.update_phase(&visible);
		self.clear(&visible);
		if self.phase == SyncPhase::Active {
			self.decorate(&visible);
		}
	}

	pub fn on_visible_editors_changed(&mut self) {
		self.ledger.reset();
		let visible = self.visible();
		match self.update_phase(&visible) {
			(_, SyncPhase::Inactive) => self.clear(&visible),
			(SyncPhase::Inactive, SyncPhase::Active) => self.decorate(&visible),
			(SyncPhase::Active, SyncPhase::Active) => match self.unit.clone() {
				None => self.show_loading(&visible),
				Some(UnitState::Compiled(unit)) => self.dim_unused(&unit, &visible),
				Some(UnitState::Failed(_)) => {}
			},
		}
	}

	pub async fn on_selection_changed(&mut self, change: &SelectionChange) {
		if change.kind.is_none() {
			trace!(document = %change.editor.document(), "sync.selection_without_kind");
			return;
		}
		if self.phase == SyncPhase::Inactive {
			return;
		}
		let Some(unit) = self.compiled() else {
			return;
		};

		let visible = self.visible();
		let document = change.editor.document();
		if unit.references(document) {
			trace!(document = %document, line = change.line, "sync.source_selected");
			self.last_selection = Some(Selection::Source {
				document: document.clone(),
				line: change.line,
			});
			self.select_source(&unit, &visible, &change.editor, change.line, true);
		} else if document == self.tracker.assembly() {
			trace!(line = change.line, "sync.assembly_selected");
			self.last_selection = Some(Selection::Assembly { line: change.line });
			let Some(target) = self.highlight_assembly(&unit, &visible, &change.editor, change.line) else {
				return;
			};
			let Some(editor) = self.source_editor(&visible, &target.file).await else {
				return;
			};
			self.highlight_target(&editor, &target, true);
		}
	}

	/// Clears every decoration from the visible editors.
	pub fn dispose(&mut self) {
		let visible = self.visible();
		self.clear(&visible);
		self.phase = SyncPhase::Inactive;
	}

	fn update_phase(&mut self, visible: &VisibleSet) -> (SyncPhase, SyncPhase) {
		let previous = self.phase;
		self.phase = if visible.is_active() {
			SyncPhase::Active
		} else {
			SyncPhase::Inactive
		};
		match (previous, self.phase) {
			(SyncPhase::Inactive, SyncPhase::Active) => {
				debug!(assembly = %self.tracker.assembly(), sources = visible.sources.len(), "sync.activate");
			}
			(SyncPhase::Active, SyncPhase::Inactive) => {
				debug!(assembly = %self.tracker.assembly(), "sync.deactivate");
			}
			_ => {}
		}
		(previous, self.phase)
	}

	fn clear(&mut self, visible: &VisibleSet) {
		for editor in visible.editors() {
			self.ledger.clear(editor);
		}
	}

	fn decorate(&mut self, visible: &VisibleSet) {
		match self.unit.clone() {
			None => self.show_loading(visible),
			Some(UnitState::Failed(_)) => {}
			Some(UnitState::Compiled(unit)) => {
				self.dim_unused(&unit, visible);
				if !unit.is_empty() {
					self.replay_selection(&unit, visible);
				}
			}
		}
	}

	fn show_loading(&mut self, visible: &VisibleSet) {
		if let Some(assembly) = &visible.assembly {
			self.ledger.apply(assembly, DecorationKind::Loading, vec![0]);
		}
	}

	fn dim_unused(&mut self, unit: &CompiledUnit, visible: &VisibleSet) {
		if !self.settings.dim_unused_source_lines {
			return;
		}
		for editor in &visible.sources {
			let unused = unit
				.index()
				.unused_source_lines(editor.document(), editor.line_count());
			self.ledger.apply(editor, DecorationKind::UnusedLine, unused);
		}
	}

	/// Re-applies the last deliberate selection without scrolling, falling
	/// back to the cursor of the first visible source editor.
	fn replay_selection(&mut self, unit: &CompiledUnit, visible: &VisibleSet) {
		let replayed = match self.last_selection.clone() {
			Some(Selection::Source { document, line }) => match visible.source_for(&document).cloned() {
				Some(editor) => {
					self.select_source(unit, visible, &editor, line, false);
					true
				}
				None => false,
			},
			Some(Selection::Assembly { line }) => match visible.assembly.clone() {
				Some(assembly) => {
					if let Some(target) = self.highlight_assembly(unit, visible, &assembly, line)
						&& let Some(editor) = visible.source_for(&target.file).cloned()
					{
						self.highlight_target(&editor, &target, false);
					}
					true
				}
				None => false,
			},
			None => false,
		};

		if !replayed && let Some(first) = visible.sources.first().cloned() {
			let line = first.selection_line();
			self.select_source(unit, visible, &first, line, false);
		}
	}

	/// Highlights `line` in `editor` and the union of assembly lines mapped
	/// from every visible source editor's selection.
	///
	/// The changed editor's lines come first, so `reveal` scrolls to them.
	fn select_source(
		&mut self,
		unit: &CompiledUnit,
		visible: &VisibleSet,
		editor: &EditorHandle,
		line: usize,
		reveal: bool,
	) {
		let Some(assembly) = &visible.assembly else {
			return;
		};
		self.ledger.apply(editor, DecorationKind::SelectedLine, vec![line]);

		let limit = assembly.line_count();
		let mut lines: Vec<usize> = Vec::new();
		let mut collect = |document: &Url, source_line: usize| {
			let mapped = unit.index().assembly_lines_for(document, source_line).unwrap_or_default();
			for &asm_line in mapped {
				if asm_line < limit && !lines.contains(&asm_line) {
					lines.push(asm_line);
				}
			}
		};
		collect(editor.document(), line);
		for other in &visible.sources {
			if other.document() != editor.document() {
				collect(other.document(), other.selection_line());
			}
		}

		let first = lines.first().copied();
		self.ledger.apply(assembly, DecorationKind::SelectedLine, lines);
		if reveal && let Some(first) = first {
			assembly.reveal_line(first, RevealKind::InCenterIfOutsideViewport);
		}
	}

	/// Highlights `line` in the assembly editor and returns the source line
	/// it came from. Unmapped lines clear the source highlights.
	fn highlight_assembly(
		&mut self,
		unit: &CompiledUnit,
		visible: &VisibleSet,
		assembly: &EditorHandle,
		line: usize,
	) -> Option<SourceLine> {
		self.ledger.apply(assembly, DecorationKind::SelectedLine, vec![line]);
		let target = unit.definition_at(line).cloned();
		if target.is_none() {
			for editor in &visible.sources {
				self.ledger.apply(editor, DecorationKind::SelectedLine, Vec::new());
			}
		}
		target
	}

	fn highlight_target(&mut self, editor: &EditorHandle, target: &SourceLine, reveal: bool) {
		if target.line >= editor.line_count() {
			return;
		}
		self.ledger.apply(editor, DecorationKind::SelectedLine, vec![target.line]);
		if reveal {
			editor.reveal_line(target.line, RevealKind::InCenterIfOutsideViewport);
		}
	}

	/// The visible editor for `document`, opening one beside the visible
	/// sources without taking focus if there is none.
	async fn source_editor(&self, visible: &VisibleSet, document: &Url) -> Option<EditorHandle> {
		if let Some(editor) = visible.source_for(document) {
			return Some(editor.clone());
		}
		let column = visible
			.sources
			.first()
			.and_then(|editor| editor.view_column())
			.unwrap_or(ViewColumn::ONE);
		let options = ShowOptions {
			column: Some(column),
			preserve_focus: true,
		};
		match self.host.show_document(document, options).await {
			Ok(editor) => Some(editor),
			Err(error) => {
				warn!(document = %document, %error, "sync.open_source_failed");
				None
			}
		}
	}
}
