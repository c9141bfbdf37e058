//! scriptdeps - Script Dependency Resolution and Caching
//!
//! Keeps the resolved dependencies of configuration scripts (build scripts and
//! similar) up to date for a host application. Each script's configuration is handed
//! to a pluggable resolver; the result is reconciled with a cache, and the host is told
//! when the project's indexed roots must be re-scanned.
//!
//! # Architecture Overview
//!
//! A request for a script flows through three stages:
//!
//! - **Registry**: at most one live loader per script. Concurrent requests for the
//!   same script reach the same loader.
//! - **Resolution**: synchronous resolvers run on the requesting thread. Async and
//!   legacy resolvers run on one shared background task that drains a queue, so any
//!   number of pending scripts shows up as a single unit of work.
//! - **Reconciliation**: a first result is stored unconditionally. A changed result is
//!   stored or offered to the user. A failed result never replaces a known-good set.
//!
//! ## Key Features
//!
//! - **Coalesced background work**: one spinner, one task, however many scripts wait
//! - **No regressions**: transient resolver failures only update diagnostics
//! - **Injected collaborators**: cache, report sink, notification surface, scheduler
//!   and content loader are traits bundled in [`services::ScriptServices`]
//! - **Persistent cache**: JSON snapshot written atomically
//!
//! # Core Modules
//!
//! ## Pipeline
//! - [`loader`] - Per-script loader state machine, strategies, registry, coalescer
//! - [`services`] - The collaborators a loader works with
//! - [`resolver`] - Resolver traits and the [`resolver::ResolverKind`] tag
//! - [`content`] - Loading script text and turning failures into reports
//!
//! ## Data
//! - [`script`] - Script identity, live file handle, and definitions
//! - [`dependencies`] - Dependency sets, reports, and resolve results
//! - [`cache`] - Dependency cache and its on-disk snapshot
//!
//! ## Host Surfaces
//! - [`project`] - Project model and serialized mutation scheduling
//! - [`reports`] - Diagnostic sink
//! - [`notifications`] - Update offers awaiting a user decision
//!
//! ## Supporting Modules
//! - [`config`] - Settings from `~/.scriptdeps/config.toml` and the environment
//! - [`core`] - Error types and user-facing error formatting
//! - [`utils`] - Atomic writes, logging setup, progress spinner
//!
//! # Example
//!
//! ```rust,no_run
//! use scriptdeps::config::ScriptingSettings;
//! use scriptdeps::project::Project;
//! use scriptdeps::resolver::ScriptResolver;
//! use scriptdeps::script::{ScriptDefinition, ScriptFile};
//! use scriptdeps::services::ScriptServices;
//! # use scriptdeps::resolver::DependenciesResolver;
//! # use scriptdeps::content::ScriptSource;
//! # use scriptdeps::dependencies::ResolveResult;
//! use std::sync::Arc;
//!
//! # struct MyResolver;
//! # impl DependenciesResolver for MyResolver {
//! #     fn resolve(&self, _: &ScriptSource) -> anyhow::Result<ResolveResult> {
//! #         Ok(ResolveResult::default())
//! #     }
//! # }
//! # async fn example() -> anyhow::Result<()> {
//! let services = ScriptServices::builder(Arc::new(Project::new("demo")))
//!     .settings(ScriptingSettings::load().await?)
//!     .build()?;
//!
//! let definition = Arc::new(ScriptDefinition::new(
//!     "gradle",
//!     ScriptResolver::legacy(Arc::new(MyResolver)),
//! ));
//! let file = Arc::new(ScriptFile::new("build.gradle.kts"));
//!
//! services.request_update(&file, &definition);
//! services.coalescer().wait_idle().await;
//! # Ok(())
//! # }
//! ```

// Pipeline
pub mod content;
pub mod loader;
pub mod resolver;
pub mod services;

// Data
pub mod cache;
pub mod dependencies;
pub mod script;

// Host surfaces
pub mod notifications;
pub mod project;
pub mod reports;

// Supporting modules
pub mod config;
pub mod core;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
