//! Integration tests for the cache snapshot and the settings file

use anyhow::Result;
use scriptdeps::cache::{DependenciesCache, ScriptDependenciesCache};
use scriptdeps::config::{AUTO_RELOAD_ENV, ScriptingSettings};
use scriptdeps::project::{InlineScheduler, Project};
use scriptdeps::resolver::ScriptResolver;
use scriptdeps::services::ScriptServices;
use scriptdeps::test_utils::{StaticContentLoader, StaticResolver};
use serial_test::serial;
use std::sync::Arc;
use tempfile::TempDir;

use super::{definition, deps, resolved, script};

fn session(settings: ScriptingSettings, project: &Arc<Project>) -> Result<Arc<ScriptServices>> {
    ScriptServices::builder(project.clone())
        .settings(settings)
        .scheduler(Arc::new(InlineScheduler))
        .content(Arc::new(StaticContentLoader))
        .build()
}

#[tokio::test]
async fn test_cache_snapshot_survives_restart() -> Result<()> {
    let temp = TempDir::new()?;
    let cache_path = temp.path().join("state/dependencies.json");
    let settings = ScriptingSettings {
        cache_path: Some(cache_path.clone()),
        ..ScriptingSettings::headless()
    };
    let resolver = Arc::new(StaticResolver::new(resolved(&["lib-a.jar"])));
    let definition = definition(ScriptResolver::Sync(resolver));
    let file = script("build.gradle.kts");

    let first_project = Arc::new(Project::new("first"));
    let first = session(settings.clone(), &first_project)?;
    first.request_update(&file, &definition);
    assert!(cache_path.exists());
    assert_eq!(first_project.roots_change_count(), 1);

    // A new session starts from the snapshot: same result, nothing to re-index
    let second_project = Arc::new(Project::new("second"));
    let second = session(settings, &second_project)?;
    assert_eq!(second.cache().get(file.identity()), Some(deps(&["lib-a.jar"])));

    second.request_update(&file, &definition);
    assert_eq!(second_project.roots_change_count(), 0);

    let reloaded = ScriptDependenciesCache::load_from(&cache_path);
    assert!(reloaded.entry(file.identity()).is_some());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_snapshot_is_rebuilt() -> Result<()> {
    let temp = TempDir::new()?;
    let cache_path = temp.path().join("dependencies.json");
    std::fs::write(&cache_path, "{ not json")?;

    let project = Arc::new(Project::new("corrupt"));
    let services = session(
        ScriptingSettings {
            cache_path: Some(cache_path.clone()),
            ..ScriptingSettings::headless()
        },
        &project,
    )?;
    let file = script("build.gradle.kts");
    let resolver = Arc::new(StaticResolver::new(resolved(&["lib-a.jar"])));
    services.request_update(&file, &definition(ScriptResolver::Sync(resolver)));

    let reloaded = ScriptDependenciesCache::load_from(&cache_path);
    assert_eq!(reloaded.get(file.identity()), Some(deps(&["lib-a.jar"])));
    Ok(())
}

#[tokio::test]
async fn test_settings_file_round_trip() -> Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("config.toml");
    tokio::fs::write(&path, "auto_reload = true\nshow_progress = false\n").await?;

    let settings = ScriptingSettings::load_from(&path).await?;
    assert!(settings.auto_reload);
    assert!(!settings.show_progress);
    assert!(!settings.headless);
    assert_eq!(settings.cache_path, None);
    Ok(())
}

#[tokio::test]
async fn test_invalid_settings_file_is_an_error() -> Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("config.toml");
    tokio::fs::write(&path, "auto_reload = \"sometimes\"\n").await?;

    let err = ScriptingSettings::load_from(&path).await.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse settings"));
    Ok(())
}

#[test]
#[serial]
fn test_env_override_enables_auto_reload() {
    unsafe {
        std::env::set_var(AUTO_RELOAD_ENV, "1");
    }
    let settings = ScriptingSettings::default().with_env_overrides();
    unsafe {
        std::env::remove_var(AUTO_RELOAD_ENV);
    }
    assert!(settings.auto_reload);
}
