//! The table of live loaders, one per script.

use super::ScriptDependenciesLoader;
use crate::script::{ScriptDefinition, ScriptFile, ScriptIdentity};
use crate::services::ScriptServices;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Process-wide table of in-flight loaders keyed by script.
///
/// Insertion goes through the map's entry API, so two concurrent requests for the
/// same script cannot both create a loader. A loader is removed when its result has
/// been processed, not when resolution starts: until then, later requests reach the
/// existing loader.
#[derive(Debug, Default)]
pub struct LoaderRegistry {
    loaders: DashMap<ScriptIdentity, Arc<ScriptDependenciesLoader>>,
    created: AtomicUsize,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for the dependencies of `file` to be brought up to date.
    ///
    /// Reuses the live loader for the script if there is one; otherwise creates the
    /// loader matching the definition's resolver kind. Either way the loader is then
    /// triggered, outside of any map lock.
    pub fn request_update(
        &self,
        services: &Arc<ScriptServices>,
        file: &Arc<ScriptFile>,
        definition: &Arc<ScriptDefinition>,
    ) {
        let loader = match self.loaders.entry(file.identity().clone()) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(vacant) => {
                let loader = Arc::new(ScriptDependenciesLoader::new(
                    Arc::clone(file),
                    Arc::clone(definition),
                    Arc::clone(services),
                ));
                self.created.fetch_add(1, Ordering::AcqRel);
                debug!(
                    "Created {} loader for {}",
                    if loader.runs_in_background() { "background" } else { "inline" },
                    file.identity()
                );
                vacant.insert(Arc::clone(&loader));
                loader
            }
        };

        loader.trigger_update();
    }

    /// The live loader for `script`, if any.
    pub fn get(&self, script: &ScriptIdentity) -> Option<Arc<ScriptDependenciesLoader>> {
        self.loaders.get(script).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, script: &ScriptIdentity) -> bool {
        self.loaders.contains_key(script)
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// How many loaders have been created over the registry's lifetime.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Acquire)
    }

    /// Remove `loader`, but only if it is still the registered one for its script.
    pub(crate) fn remove(&self, loader: &Arc<ScriptDependenciesLoader>) {
        self.loaders
            .remove_if(loader.identity(), |_, registered| Arc::ptr_eq(registered, loader));
    }
}
