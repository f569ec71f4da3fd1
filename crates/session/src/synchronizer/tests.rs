use asmlens_listing::CompileFailure;
use asmlens_primitives::ParsedLine;
use pretty_assertions::assert_eq;

use super::*;
use crate::editor::SelectionKind;
use crate::test_helpers::{
	MAIN_C, MockEditor, RecordingHost, UTIL_H, asm_of, scenario_a, two_files, uri,
};

struct Fixture {
	host: Arc<RecordingHost>,
	main: Arc<MockEditor>,
	asm: Arc<MockEditor>,
	sync: SelectionSynchronizer,
}

fn compiled(lines: Vec<ParsedLine>) -> UnitState {
	UnitState::Compiled(Arc::new(CompiledUnit::new(uri(MAIN_C), asm_of(MAIN_C), lines)))
}

fn fixture_with(lines: Vec<ParsedLine>, settings: SyncSettings) -> Fixture {
	let host = RecordingHost::new();
	let main = MockEditor::new(uri(MAIN_C), 6, 1);
	let asm = MockEditor::new(asm_of(MAIN_C), lines.len(), 2);
	host.show(&[&main, &asm]);

	let mut sync = SelectionSynchronizer::new(host.clone(), uri(MAIN_C), asm_of(MAIN_C), settings);
	sync.refresh();
	sync.on_unit_changed(compiled(lines));
	Fixture { host, main, asm, sync }
}

fn fixture(lines: Vec<ParsedLine>) -> Fixture {
	fixture_with(lines, SyncSettings::default())
}

#[test]
fn loading_marker_until_first_unit() {
	let host = RecordingHost::new();
	let main = MockEditor::new(uri(MAIN_C), 6, 1);
	let asm = MockEditor::new(asm_of(MAIN_C), 1, 2);
	host.show(&[&main, &asm]);

	let mut sync = SelectionSynchronizer::new(host.clone(), uri(MAIN_C), asm_of(MAIN_C), SyncSettings::default());
	sync.refresh();
	assert_eq!(sync.phase(), SyncPhase::Active);
	assert_eq!(asm.decorations(DecorationKind::Loading), [0]);

	sync.on_unit_changed(compiled(scenario_a()));
	assert!(asm.decorations(DecorationKind::Loading).is_empty());
}

#[test]
fn activation_dims_unused_lines_and_selects_implicitly() {
	let f = fixture(scenario_a());

	assert_eq!(f.sync.phase(), SyncPhase::Active);
	assert_eq!(f.main.decorations(DecorationKind::UnusedLine), [0, 1, 3, 4, 5]);
	assert_eq!(f.main.decorations(DecorationKind::SelectedLine), [0]);
	assert!(f.asm.decorations(DecorationKind::SelectedLine).is_empty());
	assert!(f.asm.reveals().is_empty());
}

#[tokio::test]
async fn selecting_source_line_highlights_and_reveals_assembly() {
	let mut f = fixture(scenario_a());

	f.sync.on_selection_changed(&f.main.select(2)).await;

	assert_eq!(f.main.decorations(DecorationKind::SelectedLine), [2]);
	assert_eq!(f.asm.decorations(DecorationKind::SelectedLine), [0, 1]);
	assert_eq!(f.asm.reveals(), [0]);
}

#[tokio::test]
async fn selecting_unmapped_assembly_line_clears_source_highlight() {
	let mut f = fixture(scenario_a());
	f.sync.on_selection_changed(&f.main.select(2)).await;

	f.sync.on_selection_changed(&f.asm.select(2)).await;

	assert_eq!(f.asm.decorations(DecorationKind::SelectedLine), [2]);
	assert!(f.main.decorations(DecorationKind::SelectedLine).is_empty());
	assert!(f.main.reveals().is_empty());
	assert!(f.host.opened().is_empty());
}

#[tokio::test]
async fn selecting_mapped_assembly_line_reveals_visible_source() {
	let mut f = fixture(scenario_a());

	f.sync.on_selection_changed(&f.asm.select(1)).await;

	assert_eq!(f.asm.decorations(DecorationKind::SelectedLine), [1]);
	assert_eq!(f.main.decorations(DecorationKind::SelectedLine), [2]);
	assert_eq!(f.main.reveals(), [2]);
	assert!(f.host.opened().is_empty());
}

#[tokio::test]
async fn assembly_selection_opens_hidden_source_beside_visible_ones() {
	let mut f = fixture(two_files());

	f.sync.on_selection_changed(&f.asm.select(2)).await;

	let opened = f.host.opened();
	assert_eq!(opened.len(), 1);
	assert_eq!(opened[0].0, uri(UTIL_H));
	assert_eq!(
		opened[0].1,
		ShowOptions {
			column: Some(ViewColumn(1)),
			preserve_focus: true,
		}
	);

	let header = f.host.editor_for(&uri(UTIL_H)).unwrap();
	assert_eq!(header.decorations(DecorationKind::SelectedLine), [1]);
	assert_eq!(header.reveals(), [1]);
}

#[tokio::test]
async fn selection_union_spans_visible_sources() {
	let f = fixture(two_files());
	let header = MockEditor::new(uri(UTIL_H), 4, 3);
	let _ = header.select(1);
	f.host.show(&[&f.main, &header, &f.asm]);
	let mut sync = f.sync;
	sync.on_visible_editors_changed();

	sync.on_selection_changed(&f.main.select(0)).await;

	assert_eq!(f.asm.decorations(DecorationKind::SelectedLine), [1, 2]);
	assert_eq!(f.asm.reveals(), [1]);
}

#[tokio::test]
async fn selection_from_editor_open_is_ignored() {
	let mut f = fixture(scenario_a());
	let mut change = f.main.select(2);
	change.kind = None;

	f.sync.on_selection_changed(&change).await;

	assert_eq!(f.main.decorations(DecorationKind::SelectedLine), [0]);
	assert!(f.asm.decorations(DecorationKind::SelectedLine).is_empty());
	assert!(f.asm.reveals().is_empty());
}

#[tokio::test]
async fn failed_unit_suspends_decorations() {
	let mut f = fixture(scenario_a());
	f.sync.on_selection_changed(&f.main.select(2)).await;

	f.sync
		.on_unit_changed(UnitState::Failed(CompileFailure::new(uri(MAIN_C), "boom")));
	assert!(f.main.snapshot().is_empty());
	assert!(f.asm.snapshot().is_empty());

	f.sync.on_selection_changed(&f.main.select(3)).await;
	assert!(f.main.snapshot().is_empty());
	assert!(f.asm.snapshot().is_empty());
	assert_eq!(f.asm.reveals(), [0]);
}

#[tokio::test]
async fn hide_and_show_restores_state() {
	let mut f = fixture(scenario_a());
	f.sync.on_selection_changed(&f.main.select(2)).await;
	let main_before = f.main.snapshot();
	let asm_before = f.asm.snapshot();

	f.host.hide_all();
	f.sync.on_visible_editors_changed();
	assert_eq!(f.sync.phase(), SyncPhase::Inactive);

	f.host.show(&[&f.main, &f.asm]);
	f.sync.on_visible_editors_changed();
	assert_eq!(f.sync.phase(), SyncPhase::Active);
	assert_eq!(f.main.snapshot(), main_before);
	assert_eq!(f.asm.snapshot(), asm_before);
}

#[tokio::test]
async fn deactivation_clears_remaining_editor() {
	let mut f = fixture(scenario_a());
	f.sync.on_selection_changed(&f.main.select(2)).await;

	f.host.show(&[&f.main]);
	f.sync.on_visible_editors_changed();
	assert_eq!(f.sync.phase(), SyncPhase::Inactive);
	assert!(f.main.snapshot().is_empty());

	f.sync.on_selection_changed(&f.main.select(3)).await;
	assert!(f.main.snapshot().is_empty());

	f.host.show(&[&f.main, &f.asm]);
	f.sync.on_visible_editors_changed();
	assert_eq!(f.main.decorations(DecorationKind::SelectedLine), [2]);
	assert_eq!(f.asm.decorations(DecorationKind::SelectedLine), [0, 1]);
}

#[tokio::test]
async fn repeated_application_is_stable() {
	let mut f = fixture(scenario_a());
	let change = f.main.select(2);

	f.sync.on_selection_changed(&change).await;
	let calls = (f.main.set_calls(), f.asm.set_calls());
	let state = (f.main.snapshot(), f.asm.snapshot());

	f.sync.on_selection_changed(&change).await;
	assert_eq!((f.main.set_calls(), f.asm.set_calls()), calls);
	assert_eq!((f.main.snapshot(), f.asm.snapshot()), state);

	f.sync.refresh();
	f.sync.refresh();
	assert_eq!((f.main.snapshot(), f.asm.snapshot()), state);
}

#[test]
fn dimming_can_be_disabled() {
	let settings = SyncSettings {
		dim_unused_source_lines: false,
		..SyncSettings::default()
	};
	let f = fixture_with(scenario_a(), settings);
	assert!(f.main.decorations(DecorationKind::UnusedLine).is_empty());
}

#[tokio::test]
async fn keyboard_and_command_selections_are_deliberate() {
	let mut f = fixture(scenario_a());
	for kind in [SelectionKind::Keyboard, SelectionKind::Command] {
		let mut change = f.main.select(2);
		change.kind = Some(kind);
		f.sync.on_selection_changed(&change).await;
		assert_eq!(f.asm.decorations(DecorationKind::SelectedLine), [0, 1]);
	}
}

#[test]
fn default_settings() {
	assert_eq!(SyncSettings::default().recompile_debounce(), Duration::from_millis(100));
	assert!(SyncSettings::default().dim_unused_source_lines);
}
