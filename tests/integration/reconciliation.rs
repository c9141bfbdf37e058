//! Integration tests for reconciling resolve results with the cache

use scriptdeps::cache::DependenciesCache;
use scriptdeps::config::ScriptingSettings;
use scriptdeps::content::ScriptSource;
use scriptdeps::dependencies::{ResolveResult, ScriptReport, Severity};
use scriptdeps::resolver::{DependenciesResolver, ScriptResolver};
use scriptdeps::script::ScriptDefinition;
use scriptdeps::test_utils::{StaticResolver, TestHarness};
use std::sync::Arc;

use super::{definition, deps, resolved, script};

/// Notifications enabled, no spinner in test output.
fn interactive() -> ScriptingSettings {
    ScriptingSettings {
        show_progress: false,
        ..ScriptingSettings::default()
    }
}

fn legacy(result: ResolveResult) -> (Arc<StaticResolver>, ScriptResolver) {
    let resolver = Arc::new(StaticResolver::new(result));
    (resolver.clone(), ScriptResolver::legacy(resolver))
}

struct Unreachable;

impl DependenciesResolver for Unreachable {
    fn resolve(&self, _source: &ScriptSource) -> anyhow::Result<ResolveResult> {
        anyhow::bail!("repository unreachable")
    }
}

/// No cache entry, first result stored without asking
#[tokio::test(flavor = "multi_thread")]
async fn test_first_resolution_is_stored() {
    let harness = TestHarness::new(interactive());
    let (resolver, kind) = legacy(resolved(&["lib-a.jar"]));
    let file = script("build.gradle.kts");

    harness.services.request_update(&file, &definition(kind));
    harness.services.coalescer().wait_idle().await;

    assert_eq!(resolver.calls(), 1);
    assert_eq!(harness.cache.get(file.identity()), Some(deps(&["lib-a.jar"])));
    assert_eq!(file.dependencies(), Some(deps(&["lib-a.jar"])));
    assert!(harness.notifications.offered().is_empty());
    assert_eq!(harness.project.roots_change_count(), 1);
}

#[tokio::test]
async fn test_first_resolution_is_adjusted() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let resolver = Arc::new(StaticResolver::new(resolved(&["lib-a.jar", "template.jar"])));
    let definition = Arc::new(
        ScriptDefinition::new("gradle", ScriptResolver::Sync(resolver))
            .with_template_classpath(["template.jar"]),
    );
    let file = script("build.gradle.kts");

    harness.services.request_update(&file, &definition);

    assert_eq!(
        harness.cache.get(file.identity()),
        Some(deps(&["template.jar", "lib-a.jar"]))
    );
}

/// Same set after adjustment, only reports change
#[tokio::test(flavor = "multi_thread")]
async fn test_unchanged_set_updates_reports_only() {
    let harness = TestHarness::new(interactive());
    let file = script("build.gradle.kts");
    harness.cache.save(file.identity(), deps(&["lib-a.jar"]));

    let warning = ScriptReport::warning("slow resolve");
    let (_, kind) = legacy(ResolveResult::success(deps(&["lib-a.jar"]), vec![warning.clone()]));

    harness.services.request_update(&file, &definition(kind));
    harness.services.coalescer().wait_idle().await;

    assert_eq!(harness.cache.get(file.identity()), Some(deps(&["lib-a.jar"])));
    assert_eq!(harness.reports.reports(file.identity()), vec![warning]);
    assert!(harness.notifications.offered().is_empty());
    assert_eq!(harness.notifications.retracted(), vec![file.identity().clone()]);
    assert_eq!(harness.project.roots_change_count(), 0);
}

/// Changed set is offered and stored only on accept
#[tokio::test(flavor = "multi_thread")]
async fn test_changed_set_waits_for_accept() {
    let harness = TestHarness::new(interactive());
    let file = script("build.gradle.kts");
    harness.cache.save(file.identity(), deps(&["lib-a.jar"]));

    let (_, kind) = legacy(resolved(&["lib-a.jar", "lib-b.jar"]));
    harness.services.request_update(&file, &definition(kind));
    harness.services.coalescer().wait_idle().await;

    assert_eq!(harness.notifications.offered(), vec![file.identity().clone()]);
    assert!(harness.notifications.is_showing(file.identity()));
    assert_eq!(harness.cache.get(file.identity()), Some(deps(&["lib-a.jar"])));
    assert_eq!(harness.project.roots_change_count(), 0);

    assert!(harness.notifications.accept(file.identity()));

    assert_eq!(
        harness.cache.get(file.identity()),
        Some(deps(&["lib-a.jar", "lib-b.jar"]))
    );
    assert_eq!(file.dependencies(), Some(deps(&["lib-a.jar", "lib-b.jar"])));
    assert!(!harness.notifications.is_showing(file.identity()));
    assert_eq!(harness.project.roots_change_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_auto_reload_stores_changed_set() {
    let harness = TestHarness::new(ScriptingSettings {
        auto_reload: true,
        ..interactive()
    });
    let file = script("build.gradle.kts");
    harness.cache.save(file.identity(), deps(&["lib-a.jar"]));

    let (_, kind) = legacy(resolved(&["lib-b.jar"]));
    harness.services.request_update(&file, &definition(kind));
    harness.services.coalescer().wait_idle().await;

    assert!(harness.notifications.offered().is_empty());
    assert_eq!(harness.cache.get(file.identity()), Some(deps(&["lib-b.jar"])));
    assert_eq!(harness.project.roots_change_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_headless_never_offers() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let file = script("build.gradle.kts");
    harness.cache.save(file.identity(), deps(&["lib-a.jar"]));

    let (_, kind) = legacy(resolved(&["lib-b.jar"]));
    harness.services.request_update(&file, &definition(kind));
    harness.services.coalescer().wait_idle().await;

    assert!(harness.notifications.offered().is_empty());
    assert_eq!(harness.cache.get(file.identity()), Some(deps(&["lib-b.jar"])));
}

/// A failure never replaces a known-good set
#[tokio::test(flavor = "multi_thread")]
async fn test_failure_keeps_last_known_good() {
    let harness = TestHarness::new(interactive());
    let file = script("build.gradle.kts");
    harness.cache.save(file.identity(), deps(&["lib-a.jar"]));

    let (_, kind) = legacy(ResolveResult::failure(vec![ScriptReport::error("offline")]));
    harness.services.request_update(&file, &definition(kind));
    harness.services.coalescer().wait_idle().await;

    assert_eq!(harness.cache.get(file.identity()), Some(deps(&["lib-a.jar"])));
    assert_eq!(
        harness.reports.reports(file.identity()),
        vec![ScriptReport::error("offline")]
    );
    assert!(harness.notifications.offered().is_empty());
}

#[tokio::test]
async fn test_resolver_error_becomes_report() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let file = script("build.gradle.kts");

    harness
        .services
        .request_update(&file, &definition(ScriptResolver::Sync(Arc::new(Unreachable))));

    assert_eq!(harness.cache.get(file.identity()), None);
    let reports = harness.reports.reports(file.identity());
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity, Severity::Error);
    assert!(reports[0].message.contains("repository unreachable"));
    assert!(harness.services.registry().is_empty());
}

/// The same result twice writes reports once
#[tokio::test]
async fn test_repeated_result_is_idempotent() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let resolver = Arc::new(StaticResolver::new(ResolveResult::success(
        deps(&["lib-a.jar"]),
        vec![ScriptReport::warning("slow resolve")],
    )));
    let definition = definition(ScriptResolver::Sync(resolver.clone()));
    let file = script("build.gradle.kts");

    harness.services.request_update(&file, &definition);
    assert_eq!(harness.reports.attach_count(), 1);

    harness.services.request_update(&file, &definition);
    assert_eq!(resolver.calls(), 2);
    assert_eq!(harness.reports.attach_count(), 1);
    assert_eq!(harness.project.roots_change_count(), 1);
    assert!(harness.notifications.offered().is_empty());
}

#[tokio::test]
async fn test_cleared_reports_are_propagated() {
    let harness = TestHarness::new(ScriptingSettings::headless());
    let resolver = Arc::new(StaticResolver::new(ResolveResult::success(
        deps(&["lib-a.jar"]),
        vec![ScriptReport::warning("slow resolve")],
    )));
    let definition = definition(ScriptResolver::Sync(resolver.clone()));
    let file = script("build.gradle.kts");

    harness.services.request_update(&file, &definition);
    assert!(file.reports().is_some());

    resolver.set_result(resolved(&["lib-a.jar"]));
    harness.services.request_update(&file, &definition);

    assert_eq!(file.reports(), None);
    assert!(harness.reports.reports(file.identity()).is_empty());
    assert_eq!(harness.reports.attach_count(), 2);
}

/// An offer nobody decides on must not keep the services alive
#[tokio::test(flavor = "multi_thread")]
async fn test_undecided_offer_releases_services() {
    let harness = TestHarness::new(interactive());
    let file = script("build.gradle.kts");
    harness.cache.save(file.identity(), deps(&["lib-a.jar"]));

    let (_, kind) = legacy(resolved(&["lib-b.jar"]));
    harness.services.request_update(&file, &definition(kind));
    harness.services.coalescer().wait_idle().await;
    assert!(harness.notifications.is_showing(file.identity()));

    let services = Arc::downgrade(&harness.services);
    let notifications = harness.notifications.clone();
    let cache = harness.cache.clone();
    drop(harness);

    assert!(services.upgrade().is_none());

    // The surface outlived the services: accepting stores nothing
    assert!(!notifications.accept(file.identity()));
    assert_eq!(cache.get(file.identity()), Some(deps(&["lib-a.jar"])));
}
