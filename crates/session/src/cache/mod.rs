//! Compiled units per assembly view.
//!
//! [`CompileCache`] owns the current [`UnitState`] for every tracked view,
//! keyed by the view's assembly URI. It guarantees:
//! - At most one compile in flight per view; concurrent requests share it
//! - Invalidations within [`RECOMPILE_DEBOUNCE`] collapse into one recompile
//! - Failures are stored and returned until the next invalidation
//! - Every finished compile, successful or not, fires [`UnitChanged`]

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use asmlens_compiler::SourceCompiler;
use asmlens_listing::{CompileFailure, CompiledUnit, UnitState};
use asmlens_primitives::{Url, assembly_uri};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::event::{Emitter, Subscription};

/// Default quiet period before a file change triggers a recompile.
pub const RECOMPILE_DEBOUNCE: Duration = Duration::from_millis(100);

type PendingCompile = Shared<BoxFuture<'static, UnitState>>;

/// A compile finished for `source`.
///
/// Subscribers must check `state` for failure; "changed" does not mean new
/// listing data.
#[derive(Debug, Clone)]
pub struct UnitChanged {
	pub source: Url,
	pub assembly: Url,
	pub state: UnitState,
}

/// Current phase of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPhase {
	/// Nothing scheduled.
	Idle,
	/// An invalidation is waiting out the debounce window.
	Debouncing,
	/// A compile is running.
	InFlight,
}

struct Entry {
	source: Url,
	state: Option<UnitState>,
	in_flight: Option<PendingCompile>,
	/// Another compile was requested while one was in flight.
	rerun: bool,
	/// Bumped by every invalidation; only the newest debounce timer fires.
	debounce_generation: u64,
	debouncing: bool,
	/// Identity of this entry across dispose and re-creation.
	epoch: u64,
}

impl Entry {
	fn phase(&self) -> EntryPhase {
		if self.in_flight.is_some() {
			EntryPhase::InFlight
		} else if self.debouncing {
			EntryPhase::Debouncing
		} else {
			EntryPhase::Idle
		}
	}
}

struct CacheInner {
	compiler: Arc<dyn SourceCompiler>,
	debounce: Duration,
	entries: Mutex<FxHashMap<Url, Entry>>,
	next_epoch: AtomicU64,
	changed: Emitter<UnitChanged>,
}

/// Shared handle to the compile cache.
#[derive(Clone)]
pub struct CompileCache {
	inner: Arc<CacheInner>,
}

impl std::fmt::Debug for CompileCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CompileCache")
			.field("debounce", &self.inner.debounce)
			.field("entries", &self.inner.entries.lock().len())
			.finish()
	}
}

impl CompileCache {
	pub fn new(compiler: Arc<dyn SourceCompiler>) -> Self {
		Self::with_debounce(compiler, RECOMPILE_DEBOUNCE)
	}

	pub fn with_debounce(compiler: Arc<dyn SourceCompiler>, debounce: Duration) -> Self {
		Self {
			inner: Arc::new(CacheInner {
				compiler,
				debounce,
				entries: Mutex::new(FxHashMap::default()),
				next_epoch: AtomicU64::new(0),
				changed: Emitter::new(),
			}),
		}
	}

	/// Returns the stored unit for `source`, compiling it if there is none.
	///
	/// A stored failure is returned as-is; it is only replaced after
	/// [`invalidate`](Self::invalidate) or [`recompile`](Self::recompile).
	pub async fn get_or_compile(&self, source: &Url) -> Result<Arc<CompiledUnit>, CompileFailure> {
		let key = key_for(source)?;
		let pending = {
			let mut entries = self.inner.entries.lock();
			let entry = entries
				.entry(key.clone())
				.or_insert_with(|| self.inner.new_entry(source));
			if let Some(state) = &entry.state {
				return state.to_result();
			}
			match &entry.in_flight {
				Some(pending) => {
					trace!(source = %source, "cache.join_in_flight");
					pending.clone()
				}
				None => self.inner.start(&key, entry),
			}
		};
		pending.await.to_result()
	}

	/// Schedules a recompile of a tracked source after the debounce window.
	///
	/// Untracked sources are ignored.
	pub fn invalidate(&self, source: &Url) {
		let Ok(key) = assembly_uri(source) else {
			return;
		};
		let (epoch, generation) = {
			let mut entries = self.inner.entries.lock();
			let Some(entry) = entries.get_mut(&key) else {
				trace!(source = %source, "cache.invalidate_untracked");
				return;
			};
			entry.debounce_generation += 1;
			entry.debouncing = true;
			(entry.epoch, entry.debounce_generation)
		};

		let inner = Arc::clone(&self.inner);
		tokio::spawn(async move {
			tokio::time::sleep(inner.debounce).await;
			inner.debounce_elapsed(&key, epoch, generation);
		});
	}

	/// Recompiles `source` now, tracking it if it was not tracked.
	///
	/// With a compile already in flight, one more runs after it finishes.
	pub fn recompile(&self, source: &Url) {
		let Ok(key) = key_for(source) else {
			return;
		};
		let mut entries = self.inner.entries.lock();
		let entry = entries
			.entry(key.clone())
			.or_insert_with(|| self.inner.new_entry(source));
		entry.debouncing = false;
		self.inner.request(&key, entry);
	}

	/// The stored state for `source`, without compiling.
	pub fn state(&self, source: &Url) -> Option<UnitState> {
		let key = assembly_uri(source).ok()?;
		self.inner.entries.lock().get(&key)?.state.clone()
	}

	pub fn phase(&self, source: &Url) -> Option<EntryPhase> {
		let key = assembly_uri(source).ok()?;
		self.inner.entries.lock().get(&key).map(Entry::phase)
	}

	pub fn is_tracked(&self, source: &Url) -> bool {
		assembly_uri(source).is_ok_and(|key| self.inner.entries.lock().contains_key(&key))
	}

	/// Stops tracking `source`. A compile still running is discarded.
	pub fn dispose(&self, source: &Url) {
		let Ok(key) = assembly_uri(source) else {
			return;
		};
		if self.inner.entries.lock().remove(&key).is_some() {
			debug!(source = %source, "cache.dispose");
		}
	}

	pub fn on_changed(&self, listener: impl Fn(&UnitChanged) + Send + Sync + 'static) -> Subscription {
		self.inner.changed.subscribe(listener)
	}
}

fn key_for(source: &Url) -> Result<Url, CompileFailure> {
	assembly_uri(source).map_err(|error| CompileFailure::new(source.clone(), error.to_string()))
}

impl CacheInner {
	fn new_entry(&self, source: &Url) -> Entry {
		Entry {
			source: source.clone(),
			state: None,
			in_flight: None,
			rerun: false,
			debounce_generation: 0,
			debouncing: false,
			epoch: self.next_epoch.fetch_add(1, Ordering::Relaxed),
		}
	}

	/// Timers of a disposed entry never fire for its replacement.
	fn debounce_elapsed(self: &Arc<Self>, key: &Url, epoch: u64, generation: u64) {
		let mut entries = self.entries.lock();
		let Some(entry) = entries.get_mut(key) else {
			return;
		};
		if entry.epoch != epoch || entry.debounce_generation != generation {
			return;
		}
		entry.debouncing = false;
		self.request(key, entry);
	}

	/// Starts a compile, or queues one behind the compile in flight.
	fn request(self: &Arc<Self>, key: &Url, entry: &mut Entry) {
		if entry.in_flight.is_some() {
			trace!(source = %entry.source, "cache.rerun_queued");
			entry.rerun = true;
		} else {
			self.start(key, entry);
		}
	}

	fn start(self: &Arc<Self>, key: &Url, entry: &mut Entry) -> PendingCompile {
		entry.rerun = false;
		debug!(source = %entry.source, "cache.compile_start");

		let (key, source, epoch) = (key.clone(), entry.source.clone(), entry.epoch);
		let compile = tokio::spawn(compile_unit(
			Arc::clone(&self.compiler),
			key.clone(),
			source.clone(),
		));
		let inner = Arc::clone(self);
		let task = tokio::spawn(async move {
			// A panicking compiler fails this attempt only; the entry still settles.
			let state = compile.await.unwrap_or_else(|error| {
				warn!(source = %source, %error, "cache.compile_panicked");
				UnitState::Failed(CompileFailure::new(
					source.clone(),
					format!("compile task failed: {error}"),
				))
			});
			inner.finish(key, source, epoch, state.clone());
			state
		});

		let fallback = entry.source.clone();
		let pending = async move {
			task.await.unwrap_or_else(|error| {
				UnitState::Failed(CompileFailure::new(fallback, format!("compile task failed: {error}")))
			})
		}
		.boxed()
		.shared();

		entry.in_flight = Some(pending.clone());
		pending
	}

	/// Stores a finished compile and notifies subscribers, unless the entry
	/// was disposed meanwhile.
	fn finish(self: &Arc<Self>, key: Url, source: Url, epoch: u64, state: UnitState) {
		{
			let mut entries = self.entries.lock();
			let Some(entry) = entries.get_mut(&key).filter(|entry| entry.epoch == epoch) else {
				debug!(source = %source, "cache.compile_discarded");
				return;
			};
			entry.state = Some(state.clone());
			entry.in_flight = None;
			if entry.rerun {
				self.start(&key, entry);
			}
		}

		self.changed.fire(&UnitChanged {
			source,
			assembly: key,
			state,
		});
	}
}

async fn compile_unit(compiler: Arc<dyn SourceCompiler>, key: Url, source: Url) -> UnitState {
	match compiler.compile(&source).await {
		Ok(lines) => {
			let unit = CompiledUnit::new(source.clone(), key, lines);
			debug!(
				source = %source,
				lines = unit.line_count(),
				files = unit.referenced_sources().len(),
				"cache.compile_done"
			);
			UnitState::Compiled(Arc::new(unit))
		}
		Err(error) => {
			let failure = CompileFailure::new(source.clone(), error.to_string());
			warn!(source = %source, message = %failure.message, "cache.compile_failed");
			UnitState::Failed(failure)
		}
	}
}
