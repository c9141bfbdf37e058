//! Integration test suite for scriptdeps
//!
//! End-to-end tests that drive the loader pipeline through [`ScriptServices`] with
//! recording collaborators from `scriptdeps::test_utils`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **reconciliation**: first store, no-regression, offers and auto-reload
//! - **registry**: one loader per script under concurrent requests
//! - **background**: the shared background task, queue draining, superseded runs
//! - **roots**: roots-changed dispatch, serialized mutations, disposed projects
//! - **persistence**: cache snapshots and settings files
//!
//! [`ScriptServices`]: scriptdeps::services::ScriptServices

mod persistence;
mod reconciliation;
mod registry;
mod roots;

use scriptdeps::dependencies::{ResolveResult, ScriptDependencies};
use scriptdeps::resolver::ScriptResolver;
use scriptdeps::script::{ScriptDefinition, ScriptFile};
use std::sync::Arc;

/// Dependencies with only the given classpath roots.
pub fn deps(classpath: &[&str]) -> ScriptDependencies {
    ScriptDependencies::with_classpath(classpath.iter().copied())
}

/// Successful result with no reports.
pub fn resolved(classpath: &[&str]) -> ResolveResult {
    ResolveResult::success(deps(classpath), vec![])
}

pub fn script(path: &str) -> Arc<ScriptFile> {
    Arc::new(ScriptFile::new(path))
}

pub fn definition(resolver: ScriptResolver) -> Arc<ScriptDefinition> {
    Arc::new(ScriptDefinition::new("test", resolver))
}
