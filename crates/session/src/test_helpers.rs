//! In-memory compiler and editor host for session tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use asmlens_compiler::{CompileError, SourceCompiler};
use asmlens_primitives::{ParsedLine, SourceLocation, Url, assembly_uri, source_uri};
use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::editor::{
	DecorationKind, EditorHandle, EditorHost, HostError, RevealKind, SelectionChange, SelectionKind,
	ShowOptions, TextEditor, ViewColumn,
};

pub(crate) const MAIN_C: &str = "/src/main.c";
pub(crate) const UTIL_H: &str = "/src/util.h";

pub(crate) fn uri(path: &str) -> Url {
	source_uri(Path::new(path)).unwrap()
}

pub(crate) fn asm_of(path: &str) -> Url {
	assembly_uri(&uri(path)).unwrap()
}

/// `mov`/`ret` from main.c line 3, then an unmapped `nop`.
pub(crate) fn scenario_a() -> Vec<ParsedLine> {
	vec![
		ParsedLine::with_source("mov eax, 1", SourceLocation::new(MAIN_C, 3)),
		ParsedLine::with_source("ret", SourceLocation::new(MAIN_C, 3)),
		ParsedLine::new("nop"),
	]
}

/// main.c lines 1 and 5 plus an inlined helper from util.h line 2.
pub(crate) fn two_files() -> Vec<ParsedLine> {
	vec![
		ParsedLine::new("main:"),
		ParsedLine::with_source("push rbp", SourceLocation::new(MAIN_C, 1)),
		ParsedLine::with_source("imul eax, eax", SourceLocation::new(UTIL_H, 2)),
		ParsedLine::with_source("pop rbp", SourceLocation::new(MAIN_C, 5)),
		ParsedLine::with_source("ret", SourceLocation::new(MAIN_C, 5)),
	]
}

/// Counts compiles; answers from a queue of scripted outcomes, repeating the
/// last one.
pub(crate) struct MockCompiler {
	calls: AtomicUsize,
	panic_next: AtomicBool,
	delay: Duration,
	outcomes: Mutex<VecDeque<Result<Vec<ParsedLine>, String>>>,
}

impl MockCompiler {
	pub(crate) fn new(lines: Vec<ParsedLine>) -> Arc<Self> {
		Self::scripted([Ok(lines)])
	}

	pub(crate) fn failing(message: &str) -> Arc<Self> {
		Self::scripted([Err(message.to_owned())])
	}

	pub(crate) fn scripted(outcomes: impl IntoIterator<Item = Result<Vec<ParsedLine>, String>>) -> Arc<Self> {
		Arc::new(Self {
			calls: AtomicUsize::new(0),
			panic_next: AtomicBool::new(false),
			delay: Duration::from_millis(20),
			outcomes: Mutex::new(outcomes.into_iter().collect()),
		})
	}

	/// Makes the next compile panic instead of answering.
	pub(crate) fn panic_once(&self) {
		self.panic_next.store(true, Ordering::SeqCst);
	}

	pub(crate) fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn next_outcome(&self) -> Result<Vec<ParsedLine>, String> {
		let mut outcomes = self.outcomes.lock();
		if outcomes.len() > 1 {
			outcomes.pop_front().unwrap()
		} else {
			outcomes.front().cloned().unwrap()
		}
	}
}

#[async_trait]
impl SourceCompiler for MockCompiler {
	async fn compile(&self, source: &Url) -> asmlens_compiler::Result<Vec<ParsedLine>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if self.panic_next.swap(false, Ordering::SeqCst) {
			panic!("compiler crashed on {source}");
		}
		let outcome = self.next_outcome();
		tokio::time::sleep(self.delay).await;
		outcome.map_err(|output| CompileError::Failed {
			file: source.to_file_path().unwrap(),
			status: Some(1),
			output,
		})
	}
}

/// Lets every spawned task run until the runtime is idle.
///
/// Tests run with a paused clock, so the sleep only returns once nothing
/// else can make progress.
pub(crate) async fn settle() {
	tokio::time::sleep(Duration::from_secs(1)).await;
}

#[derive(Default)]
struct EditorLog {
	decorations: FxHashMap<DecorationKind, Vec<usize>>,
	reveals: Vec<(usize, RevealKind)>,
	set_calls: usize,
}

pub(crate) struct MockEditor {
	document: Url,
	line_count: usize,
	column: Option<ViewColumn>,
	selection: AtomicUsize,
	log: Mutex<EditorLog>,
}

impl MockEditor {
	pub(crate) fn new(document: Url, line_count: usize, column: u8) -> Arc<Self> {
		Arc::new(Self {
			document,
			line_count,
			column: Some(ViewColumn(column)),
			selection: AtomicUsize::new(0),
			log: Mutex::new(EditorLog::default()),
		})
	}

	pub(crate) fn decorations(&self, kind: DecorationKind) -> Vec<usize> {
		self.log.lock().decorations.get(&kind).cloned().unwrap_or_default()
	}

	/// Every non-empty decoration set, for whole-state comparisons.
	pub(crate) fn snapshot(&self) -> Vec<(DecorationKind, Vec<usize>)> {
		DecorationKind::ALL
			.into_iter()
			.map(|kind| (kind, self.decorations(kind)))
			.filter(|(_, lines)| !lines.is_empty())
			.collect()
	}

	pub(crate) fn reveals(&self) -> Vec<usize> {
		self.log.lock().reveals.iter().map(|(line, _)| *line).collect()
	}

	pub(crate) fn set_calls(&self) -> usize {
		self.log.lock().set_calls
	}

	pub(crate) fn select(self: &Arc<Self>, line: usize) -> SelectionChange {
		self.selection.store(line, Ordering::SeqCst);
		SelectionChange {
			editor: Arc::clone(self) as EditorHandle,
			line,
			kind: Some(SelectionKind::Mouse),
		}
	}

	/// Hosts drop decorations of editors that leave the screen.
	fn forget_decorations(&self) {
		self.log.lock().decorations.clear();
	}
}

impl TextEditor for MockEditor {
	fn document(&self) -> &Url {
		&self.document
	}

	fn line_count(&self) -> usize {
		self.line_count
	}

	fn selection_line(&self) -> usize {
		self.selection.load(Ordering::SeqCst)
	}

	fn view_column(&self) -> Option<ViewColumn> {
		self.column
	}

	fn set_decorations(&self, kind: DecorationKind, lines: &[usize]) {
		let mut log = self.log.lock();
		log.set_calls += 1;
		log.decorations.insert(kind, lines.to_vec());
	}

	fn reveal_line(&self, line: usize, reveal: RevealKind) {
		self.log.lock().reveals.push((line, reveal));
	}
}

/// Editor host recording every open and error.
#[derive(Default)]
pub(crate) struct RecordingHost {
	visible: Mutex<Vec<Arc<MockEditor>>>,
	opened: Mutex<Vec<(Url, ShowOptions)>>,
	errors: Mutex<Vec<String>>,
	on_error: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl RecordingHost {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub(crate) fn show(&self, editors: &[&Arc<MockEditor>]) {
		*self.visible.lock() = editors.iter().map(|editor| Arc::clone(editor)).collect();
	}

	pub(crate) fn hide_all(&self) {
		for editor in self.visible.lock().drain(..) {
			editor.forget_decorations();
		}
	}

	pub(crate) fn editor_for(&self, document: &Url) -> Option<Arc<MockEditor>> {
		self.visible
			.lock()
			.iter()
			.find(|editor| &editor.document == document)
			.cloned()
	}

	pub(crate) fn opened(&self) -> Vec<(Url, ShowOptions)> {
		self.opened.lock().clone()
	}

	pub(crate) fn errors(&self) -> Vec<String> {
		self.errors.lock().clone()
	}

	/// Runs `hook` after every recorded error.
	pub(crate) fn on_error(&self, hook: impl Fn() + Send + Sync + 'static) {
		*self.on_error.lock() = Some(Box::new(hook));
	}
}

#[async_trait]
impl EditorHost for RecordingHost {
	fn visible_editors(&self) -> Vec<EditorHandle> {
		self.visible
			.lock()
			.iter()
			.map(|editor| Arc::clone(editor) as EditorHandle)
			.collect()
	}

	async fn show_document(&self, uri: &Url, options: ShowOptions) -> Result<EditorHandle, HostError> {
		self.opened.lock().push((uri.clone(), options));
		if let Some(editor) = self.editor_for(uri) {
			return Ok(editor as EditorHandle);
		}
		let column = options.column.unwrap_or(ViewColumn::ONE);
		let editor = MockEditor::new(uri.clone(), 10, column.0);
		self.visible.lock().push(Arc::clone(&editor));
		Ok(editor as EditorHandle)
	}

	fn show_error(&self, message: &str) {
		self.errors.lock().push(message.to_owned());
		if let Some(hook) = &*self.on_error.lock() {
			hook();
		}
	}
}
