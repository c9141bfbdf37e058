//! Integration tests for the one-loader-per-script registry

use scriptdeps::cache::DependenciesCache;
use scriptdeps::config::ScriptingSettings;
use scriptdeps::resolver::ScriptResolver;
use scriptdeps::test_utils::{GatedResolver, StaticResolver, TestHarness};
use std::sync::Arc;

use super::{definition, deps, resolved, script};

/// A second request while resolving reuses the live loader
#[tokio::test(flavor = "multi_thread")]
async fn test_second_request_reaches_existing_loader() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let resolver = Arc::new(GatedResolver::new(resolved(&["lib-a.jar"])));
    let definition = definition(ScriptResolver::legacy(resolver.clone()));
    let file = script("build.gradle.kts");

    harness.services.request_update(&file, &definition);
    resolver.wait_entered(1).await;

    let first = harness.services.registry().get(file.identity()).expect("loader is live");
    harness.services.request_update(&file, &definition);
    let second = harness.services.registry().get(file.identity()).expect("loader is live");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(harness.services.registry().created_count(), 1);
    assert_eq!(harness.services.registry().len(), 1);

    resolver.open();
    harness.services.coalescer().wait_idle().await;

    // Same content version: the second trigger was skipped
    assert_eq!(resolver.entered(), 1);
    assert!(harness.services.registry().is_empty());
    assert_eq!(harness.cache.get(file.identity()), Some(deps(&["lib-a.jar"])));
}

/// Many threads, one script
#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_requests_create_one_loader() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let resolver = Arc::new(GatedResolver::new(resolved(&["lib-a.jar"])));
    let definition = definition(ScriptResolver::legacy(resolver.clone()));
    let file = script("build.gradle.kts");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let services = harness.services.clone();
        let file = file.clone();
        let definition = definition.clone();
        handles.push(std::thread::spawn(move || services.request_update(&file, &definition)));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(harness.services.registry().created_count(), 1);

    resolver.open();
    harness.services.coalescer().wait_idle().await;

    assert_eq!(resolver.entered(), 1);
    assert!(harness.services.registry().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_newer_content_while_resolving_runs_again() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let resolver = Arc::new(GatedResolver::new(resolved(&["lib-a.jar"])));
    let definition = definition(ScriptResolver::legacy(resolver.clone()));
    let file = script("build.gradle.kts");

    harness.services.request_update(&file, &definition);
    resolver.wait_entered(1).await;

    file.touch();
    harness.services.request_update(&file, &definition);
    // Still queued once, however often it is asked
    harness.services.request_update(&file, &definition);

    resolver.open();
    harness.services.coalescer().wait_idle().await;

    assert_eq!(resolver.entered(), 2);
    assert_eq!(harness.services.registry().created_count(), 1);
    assert_eq!(harness.services.coalescer().tasks_created(), 1);
}

#[tokio::test]
async fn test_registry_releases_loader_after_processing() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let resolver = Arc::new(StaticResolver::new(resolved(&["lib-a.jar"])));
    let definition = definition(ScriptResolver::Sync(resolver.clone()));
    let file = script("build.gradle.kts");

    harness.services.request_update(&file, &definition);
    harness.services.request_update(&file, &definition);

    assert!(harness.services.registry().is_empty());
    assert_eq!(harness.services.registry().created_count(), 2);
    assert_eq!(resolver.calls(), 2);
}

#[tokio::test]
async fn test_distinct_scripts_get_distinct_loaders() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let resolver = Arc::new(StaticResolver::new(resolved(&["lib-a.jar"])));
    let definition = definition(ScriptResolver::Sync(resolver));

    harness.services.request_update(&script("a.kts"), &definition);
    harness.services.request_update(&script("b.kts"), &definition);

    assert_eq!(harness.services.registry().created_count(), 2);
    assert_eq!(harness.cache.len(), 2);
}
