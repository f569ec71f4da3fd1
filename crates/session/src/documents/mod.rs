//! Registry of open assembly views.
//!
//! Each view owns a [`SelectionSynchronizer`] running on its own task. Host
//! events are routed to views as [`ViewCmd`]s, so a view handles them one at
//! a time and in arrival order, including the awaits made while opening a
//! source editor. Compile results reach views through the cache's
//! [`UnitChanged`] event.


use std::sync::{Arc, Weak};

use asmlens_listing::{SourceLine, UnitState};
use asmlens_primitives::{UriError, Url, assembly_uri, source_of_assembly};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::cache::{CompileCache, UnitChanged};
use crate::editor::{EditorHost, SelectionChange};
use crate::event::Subscriptions;
use crate::synchronizer::{SelectionSynchronizer, SyncSettings};

/// Command protocol for a view task.
#[derive(Debug)]
enum ViewCmd {
	Refresh,
	Unit(UnitState),
	Selection(SelectionChange),
	VisibleEditorsChanged,
	Close,
}

#[derive(Clone)]
struct View {
	source: Url,
	tx: mpsc::UnboundedSender<ViewCmd>,
}

impl View {
	fn send(&self, cmd: ViewCmd) {
		if self.tx.send(cmd).is_err() {
			trace!(source = %self.source, "documents.view_gone");
		}
	}
}

struct Registry {
	host: Arc<dyn EditorHost>,
	cache: CompileCache,
	settings: SyncSettings,
	views: Mutex<FxHashMap<Url, View>>,
}

impl Registry {
	/// The host is called with no registry lock held, so it may call back in.
	fn unit_changed(&self, event: &UnitChanged) {
		let Some(view) = self.views.lock().get(&event.assembly).cloned() else {
			return;
		};
		if let Some(failure) = event.state.failure() {
			self.host.show_error(&failure.message);
		}
		view.send(ViewCmd::Unit(event.state.clone()));
	}

	fn broadcast(&self, cmd: impl Fn() -> ViewCmd) {
		for view in self.views.lock().values() {
			view.send(cmd());
		}
	}
}

/// Open assembly views and their shared compile cache.
pub struct AssemblyDocuments {
	registry: Arc<Registry>,
	subscriptions: Subscriptions,
}

impl std::fmt::Debug for AssemblyDocuments {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AssemblyDocuments")
			.field("views", &self.registry.views.lock().len())
			.field("settings", &self.registry.settings)
			.finish_non_exhaustive()
	}
}

impl AssemblyDocuments {
	pub fn new(host: Arc<dyn EditorHost>, cache: CompileCache, settings: SyncSettings) -> Self {
		let registry = Arc::new(Registry {
			host,
			cache,
			settings,
			views: Mutex::new(FxHashMap::default()),
		});
		let weak: Weak<Registry> = Arc::downgrade(&registry);
		let mut subscriptions = Subscriptions::new();
		subscriptions.push(registry.cache.on_changed(move |event| {
			if let Some(registry) = weak.upgrade() {
				registry.unit_changed(event);
			}
		}));
		Self { registry, subscriptions }
	}

	pub fn cache(&self) -> &CompileCache {
		&self.registry.cache
	}

	/// Opens the assembly view for `source` and returns its URI.
	///
	/// The first compile starts in the background; opening a view that is
	/// already open only returns its URI.
	pub fn open(&self, source: &Url) -> Result<Url, UriError> {
		let assembly = assembly_uri(source)?;
		let cached = {
			let mut views = self.registry.views.lock();
			if views.contains_key(&assembly) {
				return Ok(assembly);
			}

			let (tx, rx) = mpsc::unbounded_channel();
			let sync = SelectionSynchronizer::new(
				Arc::clone(&self.registry.host),
				source.clone(),
				assembly.clone(),
				self.registry.settings,
			);
			tokio::spawn(run_view(sync, rx));

			let view = View {
				source: source.clone(),
				tx,
			};
			view.send(ViewCmd::Refresh);
			let state = self.registry.cache.state(source);
			let cached = state.is_some();
			if let Some(state) = state {
				view.send(ViewCmd::Unit(state));
			}
			views.insert(assembly.clone(), view);
			cached
		};
		debug!(source = %source, assembly = %assembly, cached, "documents.open");

		if !cached {
			let cache = self.registry.cache.clone();
			let source = source.clone();
			tokio::spawn(async move {
				// The outcome reaches the view through `UnitChanged`.
				let _ = cache.get_or_compile(&source).await;
			});
		}
		Ok(assembly)
	}

	pub fn is_open(&self, assembly: &Url) -> bool {
		self.registry.views.lock().contains_key(assembly)
	}

	pub fn open_views(&self) -> Vec<Url> {
		let mut views: Vec<Url> = self.registry.views.lock().keys().cloned().collect();
		views.sort();
		views
	}

	/// Text of an assembly document, compiling its source if needed.
	///
	/// Failed compiles yield the compiler output. `None` when `assembly` is
	/// not an assembly URI.
	pub async fn content(&self, assembly: &Url) -> Option<String> {
		let source = source_of_assembly(assembly)?;
		match self.registry.cache.get_or_compile(&source).await {
			Ok(unit) => Some(unit.content()),
			Err(failure) => Some(failure.message),
		}
	}

	/// Go-to-source target for `line` of an assembly document.
	pub fn definition(&self, assembly: &Url, line: usize) -> Option<SourceLine> {
		let source = source_of_assembly(assembly)?;
		let state = self.registry.cache.state(&source)?;
		state.compiled()?.definition_at(line).cloned()
	}

	pub fn selection_changed(&self, change: SelectionChange) {
		self.registry.broadcast(|| ViewCmd::Selection(change.clone()));
	}

	pub fn visible_editors_changed(&self) {
		self.registry.broadcast(|| ViewCmd::VisibleEditorsChanged);
	}

	/// A source file was saved. Views compiled from it, or whose listing
	/// includes it, recompile after the debounce window.
	pub fn file_changed(&self, file: &Url) {
		let sources: Vec<Url> = self
			.registry
			.views
			.lock()
			.values()
			.map(|view| view.source.clone())
			.collect();
		for source in sources {
			let affected = &source == file
				|| self
					.registry
					.cache
					.state(&source)
					.is_some_and(|state| state.compiled().is_some_and(|unit| unit.references(file)));
			if affected {
				trace!(source = %source, changed = %file, "documents.file_changed");
				self.registry.cache.invalidate(&source);
			}
		}
	}

	/// Compile settings of `sources` changed; their open views recompile now.
	pub fn compile_settings_changed(&self, sources: &[Url]) {
		let open: Vec<Url> = self
			.registry
			.views
			.lock()
			.values()
			.filter(|view| sources.contains(&view.source))
			.map(|view| view.source.clone())
			.collect();
		for source in open {
			debug!(source = %source, "documents.settings_changed");
			self.registry.cache.recompile(&source);
		}
	}

	/// Closes the view for `assembly`, clearing its decorations and dropping
	/// its cache entry.
	pub fn close(&self, assembly: &Url) {
		let Some(view) = self.registry.views.lock().remove(assembly) else {
			return;
		};
		view.send(ViewCmd::Close);
		self.registry.cache.dispose(&view.source);
		debug!(assembly = %assembly, "documents.close");
	}
}

impl Drop for AssemblyDocuments {
	fn drop(&mut self) {
		self.subscriptions.dispose();
		let views = std::mem::take(&mut *self.registry.views.lock());
		for view in views.into_values() {
			view.send(ViewCmd::Close);
		}
	}
}

async fn run_view(mut sync: SelectionSynchronizer, mut rx: mpsc::UnboundedReceiver<ViewCmd>) {
	while let Some(cmd) = rx.recv().await {
		match cmd {
			ViewCmd::Refresh => sync.refresh(),
			ViewCmd::Unit(state) => sync.on_unit_changed(state),
			ViewCmd::Selection(change) => sync.on_selection_changed(&change).await,
			ViewCmd::VisibleEditorsChanged => sync.on_visible_editors_changed(),
			ViewCmd::Close => {
				sync.dispose();
				break;
			}
		}
	}
	trace!(assembly = %sync.assembly(), "documents.view_stopped");
}
