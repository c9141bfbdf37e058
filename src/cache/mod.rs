//! Resolved dependency cache
//!
//! The cache maps a [`ScriptIdentity`] to the last adjusted [`ScriptDependencies`]
//! stored for it and remembers every root it has ever seen. The loader asks it three
//! questions:
//!
//! - [`get`](DependenciesCache::get): is there a previous result at all? An absent
//!   entry means the next result is a first resolution and is stored unconditionally.
//! - [`save`](DependenciesCache::save): store a value and report whether it actually
//!   changed anything.
//! - [`has_uncached_roots`](DependenciesCache::has_uncached_roots): would storing this
//!   set introduce roots the project has not indexed yet?
//!
//! # Concurrency
//!
//! [`ScriptDependenciesCache`] is backed by [`DashMap`]/[`DashSet`] so it can be shared
//! between the requesting threads and the background worker without an outer lock.
//! Writes for one script are serialized by the registry's one-loader-per-script rule.
//!
//! # Persistence
//!
//! A cache built with [`ScriptDependenciesCache::load_from`] rewrites its JSON snapshot
//! after every save that changed something. Snapshot failures are logged and do not
//! fail the save.

mod persist;

pub use persist::SNAPSHOT_VERSION;

use crate::dependencies::ScriptDependencies;
use crate::script::ScriptIdentity;
use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use persist::{CacheSnapshot, SnapshotEntry};
use std::path::PathBuf;
use std::sync::Mutex;

/// The cache service consumed by the loader.
pub trait DependenciesCache: Send + Sync {
    /// The stored dependency set for `script`, if any.
    fn get(&self, script: &ScriptIdentity) -> Option<ScriptDependencies>;

    /// Store `dependencies` for `script`. Returns `true` when the stored value changed.
    fn save(&self, script: &ScriptIdentity, dependencies: ScriptDependencies) -> bool;

    /// Whether `dependencies` references any root not present in the cache.
    fn has_uncached_roots(&self, dependencies: &ScriptDependencies) -> bool;
}

/// One cached script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub dependencies: ScriptDependencies,
    pub resolved_at: DateTime<Utc>,
}

/// In-process dependency cache with an optional JSON snapshot.
#[derive(Debug, Default)]
pub struct ScriptDependenciesCache {
    entries: DashMap<ScriptIdentity, CachedEntry>,
    known_roots: DashSet<PathBuf>,
    snapshot_path: Option<PathBuf>,
    // Serializes snapshot writes; entries themselves are lock-free.
    snapshot_lock: Mutex<()>,
}

impl ScriptDependenciesCache {
    /// An empty cache that lives only in memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cache backed by the snapshot at `path`.
    ///
    /// A missing snapshot gives an empty cache. An unreadable one is discarded with a
    /// warning, since resolution rebuilds it.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot = match CacheSnapshot::load(&path) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!("Discarding dependency cache snapshot: {err:#}");
                CacheSnapshot::default()
            }
        };

        let cache = Self {
            snapshot_path: Some(path),
            ..Self::default()
        };
        for (script, entry) in snapshot.entries {
            cache.remember_roots(&entry.dependencies);
            cache.entries.insert(
                script,
                CachedEntry {
                    dependencies: entry.dependencies,
                    resolved_at: entry.resolved_at,
                },
            );
        }
        if let Some(path) = &cache.snapshot_path {
            tracing::debug!("Loaded {} cached scripts from {}", cache.entries.len(), path.display());
        }
        cache
    }

    /// The full entry for `script`, including when it was stored.
    pub fn entry(&self, script: &ScriptIdentity) -> Option<CachedEntry> {
        self.entries.get(script).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop the entry for `script`. Known roots are kept: they stay indexed.
    pub fn remove(&self, script: &ScriptIdentity) -> Option<ScriptDependencies> {
        self.entries.remove(script).map(|(_, entry)| entry.dependencies)
    }

    /// Write the snapshot now.
    ///
    /// # Errors
    ///
    /// Fails when the snapshot cannot be written. Does nothing for an in-memory cache.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let _guard = self.snapshot_lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut snapshot = CacheSnapshot::default();
        for entry in &self.entries {
            snapshot.entries.insert(
                entry.key().clone(),
                SnapshotEntry {
                    dependencies: entry.dependencies.clone(),
                    resolved_at: entry.resolved_at,
                },
            );
        }
        snapshot.persist(path)
    }

    fn remember_roots(&self, dependencies: &ScriptDependencies) {
        for root in dependencies.roots() {
            self.known_roots.insert(root.clone());
        }
    }
}

impl DependenciesCache for ScriptDependenciesCache {
    fn get(&self, script: &ScriptIdentity) -> Option<ScriptDependencies> {
        self.entries.get(script).map(|entry| entry.dependencies.clone())
    }

    fn save(&self, script: &ScriptIdentity, dependencies: ScriptDependencies) -> bool {
        let changed = match self.entries.entry(script.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().dependencies == dependencies {
                    false
                } else {
                    self.remember_roots(&dependencies);
                    let entry = occupied.get_mut();
                    entry.dependencies = dependencies;
                    entry.resolved_at = Utc::now();
                    true
                }
            }
            Entry::Vacant(vacant) => {
                self.remember_roots(&dependencies);
                vacant.insert(CachedEntry {
                    dependencies,
                    resolved_at: Utc::now(),
                });
                true
            }
        };

        if changed {
            tracing::debug!("Cached dependencies for {script}");
            if let Err(err) = self.persist() {
                tracing::warn!("Failed to persist dependency cache: {err:#}");
            }
        }
        changed
    }

    fn has_uncached_roots(&self, dependencies: &ScriptDependencies) -> bool {
        dependencies.roots().any(|root| !self.known_roots.contains(root))
    }
}
