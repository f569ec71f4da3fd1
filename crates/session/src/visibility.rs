//! Which editors of an assembly view are on screen.

use asmlens_listing::UnitState;
use asmlens_primitives::Url;

use crate::editor::EditorHandle;

/// Visible editors relevant to one assembly view.
#[derive(Clone, Default)]
pub struct VisibleSet {
	/// First visible editor showing the assembly document.
	pub assembly: Option<EditorHandle>,
	/// Visible editors showing any source the unit references, in host order.
	pub sources: Vec<EditorHandle>,
}

impl VisibleSet {
	/// Synchronization runs only with the assembly editor and at least one
	/// of its sources on screen.
	pub fn is_active(&self) -> bool {
		self.assembly.is_some() && !self.sources.is_empty()
	}

	pub fn source_for(&self, document: &Url) -> Option<&EditorHandle> {
		self.sources.iter().find(|editor| editor.document() == document)
	}

	/// Source editors followed by the assembly editor.
	pub fn editors(&self) -> impl Iterator<Item = &EditorHandle> {
		self.sources.iter().chain(self.assembly.as_ref())
	}
}

impl std::fmt::Debug for VisibleSet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VisibleSet")
			.field("assembly", &self.assembly.is_some())
			.field(
				"sources",
				&self.sources.iter().map(|e| e.document().as_str()).collect::<Vec<_>>(),
			)
			.finish()
	}
}

/// Classifies visible editors for one assembly view by document identity.
#[derive(Debug, Clone)]
pub struct EditorVisibilityTracker {
	primary_source: Url,
	assembly: Url,
}

impl EditorVisibilityTracker {
	pub fn new(primary_source: Url, assembly: Url) -> Self {
		Self {
			primary_source,
			assembly,
		}
	}

	pub fn primary_source(&self) -> &Url {
		&self.primary_source
	}

	pub fn assembly(&self) -> &Url {
		&self.assembly
	}

	/// Splits `editors` into the assembly editor and the source editors of
	/// `unit`.
	///
	/// Without a compiled unit only the primary source counts as referenced.
	pub fn classify(&self, editors: &[EditorHandle], unit: Option<&UnitState>) -> VisibleSet {
		let referenced = unit.and_then(UnitState::compiled).map(|unit| unit.referenced_sources());
		let is_source = |document: &Url| match referenced {
			Some(referenced) => referenced.contains(document),
			None => *document == self.primary_source,
		};

		let mut visible = VisibleSet::default();
		for editor in editors {
			let document = editor.document();
			if *document == self.assembly {
				if visible.assembly.is_none() {
					visible.assembly = Some(editor.clone());
				}
			} else if is_source(document) {
				visible.sources.push(editor.clone());
			}
		}
		visible
	}
}
