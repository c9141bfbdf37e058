//! Integration tests for roots-changed dispatch

use scriptdeps::cache::{DependenciesCache, ScriptDependenciesCache};
use scriptdeps::config::ScriptingSettings;
use scriptdeps::project::{Project, Scheduler, SerialScheduler};
use scriptdeps::resolver::ScriptResolver;
use scriptdeps::services::ScriptServices;
use scriptdeps::test_utils::{StaticContentLoader, StaticResolver, TestHarness};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::Handle;

use super::{definition, deps, resolved, script};

#[tokio::test]
async fn test_known_roots_do_not_fire() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let resolver = Arc::new(StaticResolver::new(resolved(&["lib-a.jar"])));
    let definition = definition(ScriptResolver::Sync(resolver));

    harness.services.request_update(&script("a.kts"), &definition);
    harness.services.request_update(&script("b.kts"), &definition);

    // b.kts only references roots a.kts already brought in
    assert_eq!(harness.project.roots_change_count(), 1);
    assert_eq!(harness.project.script_dependencies_modification_count(), 1);
}

#[tokio::test]
async fn test_listeners_are_notified() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    harness.project.on_roots_changed(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let resolver = Arc::new(StaticResolver::new(resolved(&["lib-a.jar"])));
    harness
        .services
        .request_update(&script("a.kts"), &definition(ScriptResolver::Sync(resolver)));

    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disposed_project_skips_roots_change() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    harness.project.dispose();

    let file = script("a.kts");
    let resolver = Arc::new(StaticResolver::new(resolved(&["lib-a.jar"])));
    harness
        .services
        .request_update(&file, &definition(ScriptResolver::Sync(resolver)));

    assert_eq!(harness.cache.get(file.identity()), Some(deps(&["lib-a.jar"])));
    assert_eq!(harness.project.roots_change_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_serial_scheduler_defers_roots_change() {
    let project = Arc::new(Project::new("serial"));
    let scheduler = Arc::new(SerialScheduler::spawn(&Handle::current()));
    let cache = Arc::new(ScriptDependenciesCache::new());
    let services = ScriptServices::builder(project.clone())
        .settings(ScriptingSettings {
            show_progress: false,
            ..ScriptingSettings::default()
        })
        .cache(cache.clone())
        .scheduler(scheduler.clone())
        .content(Arc::new(StaticContentLoader))
        .build()
        .unwrap();

    let file = script("a.kts");
    let resolver = Arc::new(StaticResolver::new(resolved(&["lib-a.jar"])));
    services.request_update(&file, &definition(ScriptResolver::legacy(resolver)));
    services.coalescer().wait_idle().await;
    scheduler.flush().await;

    assert_eq!(cache.get(file.identity()), Some(deps(&["lib-a.jar"])));
    assert_eq!(project.roots_change_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dispose_before_deferred_mutation_runs() {
    let project = Arc::new(Project::new("serial"));
    let scheduler = Arc::new(SerialScheduler::spawn(&Handle::current()));
    let services = ScriptServices::builder(project.clone())
        .settings(ScriptingSettings::headless())
        .scheduler(scheduler.clone())
        .content(Arc::new(StaticContentLoader))
        .build()
        .unwrap();

    // Hold the mutation queue so the roots change stays pending
    let (release, hold) = std::sync::mpsc::channel::<()>();
    scheduler.run_serialized(Box::new(move || {
        let _ = hold.recv();
    }));

    let resolver = Arc::new(StaticResolver::new(resolved(&["lib-a.jar"])));
    services.request_update(&script("a.kts"), &definition(ScriptResolver::Sync(resolver)));

    project.dispose();
    release.send(()).unwrap();
    scheduler.flush().await;

    assert_eq!(project.roots_change_count(), 0);
}
