use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;

use super::*;
use crate::test_helpers::{MAIN_C, MockCompiler, asm_of, scenario_a, settle, uri};

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_compile() {
	let compiler = MockCompiler::new(scenario_a());
	let cache = CompileCache::new(compiler.clone());
	let source = uri(MAIN_C);

	let (first, second) = tokio::join!(cache.get_or_compile(&source), cache.get_or_compile(&source));
	let (first, second) = (first.unwrap(), second.unwrap());

	assert_eq!(compiler.calls(), 1);
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(first.assembly(), &asm_of(MAIN_C));
	assert_eq!(first.index().assembly_lines_for(&source, 2), Some(&[0, 1][..]));
}

#[tokio::test(start_paused = true)]
async fn cached_unit_is_reused() {
	let compiler = MockCompiler::new(scenario_a());
	let cache = CompileCache::new(compiler.clone());
	let source = uri(MAIN_C);

	let first = cache.get_or_compile(&source).await.unwrap();
	let second = cache.get_or_compile(&source).await.unwrap();
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(compiler.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_invalidations_collapse_into_one_recompile() {
	let compiler = MockCompiler::new(scenario_a());
	let cache = CompileCache::new(compiler.clone());
	let source = uri(MAIN_C);
	cache.get_or_compile(&source).await.unwrap();

	for _ in 0..5 {
		cache.invalidate(&source);
		tokio::time::sleep(Duration::from_millis(30)).await;
	}
	assert_eq!(cache.phase(&source), Some(EntryPhase::Debouncing));
	assert_eq!(compiler.calls(), 1);

	settle().await;
	assert_eq!(compiler.calls(), 2);
	assert_eq!(cache.phase(&source), Some(EntryPhase::Idle));
}

#[tokio::test(start_paused = true)]
async fn invalidations_in_separate_windows_each_recompile() {
	let compiler = MockCompiler::new(scenario_a());
	let cache = CompileCache::new(compiler.clone());
	let source = uri(MAIN_C);
	cache.get_or_compile(&source).await.unwrap();

	cache.invalidate(&source);
	settle().await;
	cache.invalidate(&source);
	settle().await;
	assert_eq!(compiler.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn failure_is_cached_until_invalidated() {
	let compiler = MockCompiler::scripted([Err("main.c:1: error: boom".to_owned()), Ok(scenario_a())]);
	let cache = CompileCache::new(compiler.clone());
	let source = uri(MAIN_C);

	let first = cache.get_or_compile(&source).await.unwrap_err();
	let second = cache.get_or_compile(&source).await.unwrap_err();
	assert_eq!(first, second);
	assert_eq!(first.source_uri, source);
	assert!(first.message.ends_with("main.c:1: error: boom"));
	assert_eq!(compiler.calls(), 1);

	cache.invalidate(&source);
	settle().await;
	assert_eq!(compiler.calls(), 2);
	assert!(cache.get_or_compile(&source).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn changed_fires_for_success_and_failure() {
	let compiler = MockCompiler::scripted([Ok(scenario_a()), Err("boom".to_owned())]);
	let cache = CompileCache::new(compiler);
	let source = uri(MAIN_C);

	let seen = Arc::new(Mutex::new(Vec::new()));
	let log = Arc::clone(&seen);
	let _subscription = cache.on_changed(move |event| {
		log.lock().push((event.assembly.clone(), event.state.is_failed()));
	});

	cache.get_or_compile(&source).await.unwrap();
	cache.recompile(&source);
	settle().await;

	assert_eq!(*seen.lock(), [(asm_of(MAIN_C), false), (asm_of(MAIN_C), true)]);
	assert!(cache.state(&source).unwrap().is_failed());
}

#[tokio::test(start_paused = true)]
async fn recompile_while_in_flight_runs_once_more() {
	let compiler = MockCompiler::new(scenario_a());
	let cache = CompileCache::new(compiler.clone());
	let source = uri(MAIN_C);

	cache.recompile(&source);
	assert_eq!(cache.phase(&source), Some(EntryPhase::InFlight));
	for _ in 0..3 {
		cache.recompile(&source);
	}
	settle().await;
	assert_eq!(compiler.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn previous_unit_stays_visible_during_recompile() {
	let compiler = MockCompiler::new(scenario_a());
	let cache = CompileCache::new(compiler);
	let source = uri(MAIN_C);
	let unit = cache.get_or_compile(&source).await.unwrap();

	cache.recompile(&source);
	let during = cache.state(&source).unwrap();
	assert!(Arc::ptr_eq(during.compiled().unwrap(), &unit));

	settle().await;
	let after = cache.state(&source).unwrap();
	assert!(!Arc::ptr_eq(after.compiled().unwrap(), &unit));
}

#[tokio::test(start_paused = true)]
async fn untracked_invalidation_is_ignored() {
	let compiler = MockCompiler::new(scenario_a());
	let cache = CompileCache::new(compiler.clone());
	let source = uri(MAIN_C);

	cache.invalidate(&source);
	settle().await;
	assert_eq!(compiler.calls(), 0);
	assert!(!cache.is_tracked(&source));
}

#[tokio::test(start_paused = true)]
async fn dispose_discards_running_compile() {
	let compiler = MockCompiler::new(scenario_a());
	let cache = CompileCache::new(compiler.clone());
	let source = uri(MAIN_C);

	let fired = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&fired);
	let _subscription = cache.on_changed(move |_| {
		counter.fetch_add(1, Ordering::SeqCst);
	});

	cache.recompile(&source);
	cache.dispose(&source);
	settle().await;

	assert_eq!(compiler.calls(), 1);
	assert_eq!(fired.load(Ordering::SeqCst), 0);
	assert!(cache.state(&source).is_none());
	assert!(!cache.is_tracked(&source));
}

#[tokio::test(start_paused = true)]
async fn panicking_compile_fails_only_that_attempt() {
	let compiler = MockCompiler::new(scenario_a());
	compiler.panic_once();
	let cache = CompileCache::new(compiler.clone());
	let source = uri(MAIN_C);

	let fired = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&fired);
	let _subscription = cache.on_changed(move |_| {
		counter.fetch_add(1, Ordering::SeqCst);
	});

	let failure = cache.get_or_compile(&source).await.unwrap_err();
	assert!(failure.message.starts_with("compile task failed"));
	assert_eq!(cache.phase(&source), Some(EntryPhase::Idle));
	assert_eq!(fired.load(Ordering::SeqCst), 1);

	cache.invalidate(&source);
	settle().await;
	assert_eq!(compiler.calls(), 2);
	assert_eq!(fired.load(Ordering::SeqCst), 2);
	assert!(cache.get_or_compile(&source).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn panic_with_queued_rerun_still_recompiles() {
	let compiler = MockCompiler::new(scenario_a());
	compiler.panic_once();
	let cache = CompileCache::new(compiler.clone());
	let source = uri(MAIN_C);

	cache.recompile(&source);
	cache.recompile(&source);
	settle().await;

	assert_eq!(compiler.calls(), 2);
	assert_eq!(cache.phase(&source), Some(EntryPhase::Idle));
	assert!(cache.state(&source).unwrap().compiled().is_some());
}

#[tokio::test(start_paused = true)]
async fn stale_timer_of_disposed_entry_is_ignored() {
	let compiler = MockCompiler::new(scenario_a());
	let cache = CompileCache::new(compiler.clone());
	let source = uri(MAIN_C);
	cache.get_or_compile(&source).await.unwrap();

	cache.invalidate(&source);
	cache.dispose(&source);
	cache.get_or_compile(&source).await.unwrap();
	assert_eq!(compiler.calls(), 2);

	tokio::time::sleep(Duration::from_millis(30)).await;
	cache.invalidate(&source);
	settle().await;

	assert_eq!(compiler.calls(), 3);
}
