//! `asmlens watch`: recompile on file changes.
//!
//! Filesystem events for the watched file, or for any file its last listing
//! referenced, invalidate the cache entry; the cache debounces bursts of
//! saves into one recompile. Directories of newly referenced files are added
//! to the watch set after every successful compile.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use asmlens_compiler::CompileManager;
use asmlens_listing::UnitState;
use asmlens_primitives::{Url, source_uri};
use asmlens_session::{CompileCache, SyncSettings, UnitChanged};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::commands::{resolve_source, summary};

pub async fn watch(manager: CompileManager, settings: SyncSettings, file: &Path) -> Result<()> {
	let (path, source) = resolve_source(file)?;
	let cache = CompileCache::with_debounce(Arc::new(manager), settings.recompile_debounce());

	let (unit_tx, mut unit_rx) = mpsc::unbounded_channel::<UnitChanged>();
	let _subscription = cache.on_changed(move |event| {
		let _ = unit_tx.send(event.clone());
	});

	let (fs_tx, mut fs_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
	let mut watcher = RecommendedWatcher::new(
		move |result: notify::Result<Event>| {
			let _ = fs_tx.send(result);
		},
		notify::Config::default(),
	)?;
	let mut watched: FxHashSet<PathBuf> = FxHashSet::default();
	watch_parent(&mut watcher, &mut watched, &path)?;

	info!(file = %path.display(), "watch.start");
	cache.recompile(&source);

	let ctrl_c = tokio::signal::ctrl_c();
	tokio::pin!(ctrl_c);
	loop {
		tokio::select! {
			Some(event) = unit_rx.recv() => {
				report(&event);
				if let Some(unit) = event.state.compiled() {
					for referenced in unit.referenced_sources() {
						if let Ok(path) = referenced.to_file_path()
							&& let Err(error) = watch_parent(&mut watcher, &mut watched, &path)
						{
							warn!(path = %path.display(), %error, "watch.add_failed");
						}
					}
				}
			}
			Some(result) = fs_rx.recv() => match result {
				Ok(event) => {
					if affects(&cache, &source, &event) {
						cache.invalidate(&source);
					}
				}
				Err(error) => warn!(%error, "watch.notify_error"),
			},
			_ = &mut ctrl_c => break,
		}
	}
	info!("watch.stop");
	Ok(())
}

fn watch_parent(watcher: &mut RecommendedWatcher, watched: &mut FxHashSet<PathBuf>, file: &Path) -> notify::Result<()> {
	let Some(dir) = file.parent() else {
		return Ok(());
	};
	if watched.insert(dir.to_path_buf()) {
		watcher.watch(dir, RecursiveMode::NonRecursive)?;
		debug!(dir = %dir.display(), "watch.dir_added");
	}
	Ok(())
}

/// Whether `event` touched `source` or a file its current listing uses.
fn affects(cache: &CompileCache, source: &Url, event: &Event) -> bool {
	if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
		return false;
	}
	let state = cache.state(source);
	event.paths.iter().filter_map(|path| source_uri(path).ok()).any(|uri| {
		&uri == source
			|| state
				.as_ref()
				.is_some_and(|state| state.compiled().is_some_and(|unit| unit.references(&uri)))
	})
}

fn report(event: &UnitChanged) {
	let file = event
		.source
		.to_file_path()
		.map(|path| path.display().to_string())
		.unwrap_or_else(|_| event.source.to_string());
	match &event.state {
		UnitState::Compiled(unit) => println!("{file}: {}", summary(unit)),
		UnitState::Failed(failure) => eprintln!("{file}: {}", failure.message),
	}
}
