//! The per-script dependency loader.
//!
//! A [`ScriptDependenciesLoader`] drives one script from "needs resolving" to
//! "reconciled with the cache":
//!
//! ```text
//! Idle --trigger_update--> Running --resolver--> Resolved (process_result)
//!   \
//!    `--guard declines--> Skipped (no side effects)
//! ```
//!
//! The loader owns no policy of its own beyond reconciliation. Which thread resolves
//! the script, whether an update may be skipped, and whether the user is asked before
//! a changed set is stored are decided by the [`LoaderStrategy`] picked from the
//! definition's resolver kind:
//!
//! - [`SyncLoader`]: resolves inline on the caller's thread, never asks the user.
//! - [`AsyncLoader`]: joins the shared background task, skips requests for a content
//!   version it already requested, can abort an in-flight resolution, and asks the
//!   user unless auto-reload is on.
//!
//! # Reconciliation
//!
//! [`ScriptDependenciesLoader::process_result`] runs exactly once per completed
//! resolution:
//!
//! 1. The loader leaves the [`LoaderRegistry`], so the next request creates a new one.
//! 2. With no cache entry, the adjusted set is stored and reports attached.
//! 3. Otherwise the adjusted set is compared with the cached one. A difference is
//!    either offered to the user or stored right away; no difference only refreshes
//!    reports and retracts a stale offer.
//!
//! A failed resolution (no dependencies) never overwrites a cached set.

mod async_loader;
mod background;
mod registry;
mod sync_loader;

pub use async_loader::AsyncLoader;
pub use background::BackgroundCoalescer;
pub use registry::LoaderRegistry;
pub use sync_loader::SyncLoader;

use crate::config::ScriptingSettings;
use crate::dependencies::ResolveResult;
use crate::notifications::PendingUpdate;
use crate::script::{ScriptDefinition, ScriptFile, ScriptIdentity};
use crate::services::ScriptServices;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// What differs between loader kinds.
pub trait LoaderStrategy: Send + Sync {
    /// Whether resolution goes through the shared background task.
    fn should_use_background_thread(&self) -> bool;

    /// Whether a changed result may be offered to the user instead of stored.
    fn should_show_notification(&self, settings: &ScriptingSettings) -> bool;

    /// Guard consulted by every trigger. Returning `false` skips the update.
    fn should_run_new_update(&self, _file: &ScriptFile) -> bool {
        true
    }

    /// Cancel work started by a previous trigger.
    fn cancel_update(&self) {}

    /// Claim a place in the background queue. `false` means the loader is already
    /// queued and will pick up the newest content when it runs.
    fn claim_queue_slot(&self) -> bool {
        true
    }

    /// Resolve the script and hand the result to
    /// [`ScriptDependenciesLoader::process_result`]. Blocks the calling thread.
    fn load_dependencies(&self, loader: &Arc<ScriptDependenciesLoader>);
}

/// Drives dependency resolution for one script.
pub struct ScriptDependenciesLoader {
    file: Arc<ScriptFile>,
    definition: Arc<ScriptDefinition>,
    services: Arc<ScriptServices>,
    strategy: Box<dyn LoaderStrategy>,
}

impl ScriptDependenciesLoader {
    /// Build the loader matching the definition's resolver kind.
    pub fn new(
        file: Arc<ScriptFile>,
        definition: Arc<ScriptDefinition>,
        services: Arc<ScriptServices>,
    ) -> Self {
        let strategy: Box<dyn LoaderStrategy> = if definition.resolver_kind().runs_in_background() {
            Box::new(AsyncLoader::new())
        } else {
            Box::new(SyncLoader)
        };
        Self {
            file,
            definition,
            services,
            strategy,
        }
    }

    pub fn identity(&self) -> &ScriptIdentity {
        self.file.identity()
    }

    pub fn file(&self) -> &Arc<ScriptFile> {
        &self.file
    }

    pub fn definition(&self) -> &Arc<ScriptDefinition> {
        &self.definition
    }

    pub(crate) fn services(&self) -> &Arc<ScriptServices> {
        &self.services
    }

    /// Whether this loader resolves on the background task.
    pub fn runs_in_background(&self) -> bool {
        self.strategy.should_use_background_thread()
    }

    /// Start (or restart) resolution for this script.
    pub fn trigger_update(self: &Arc<Self>) {
        if !self.strategy.should_run_new_update(&self.file) {
            trace!("Skipping dependency update for {}: already requested", self.identity());
            return;
        }

        self.strategy.cancel_update();

        if self.strategy.should_use_background_thread() {
            if self.strategy.claim_queue_slot() {
                debug!("Queueing dependency update for {}", self.identity());
                self.services.coalescer().schedule(Arc::clone(self));
            } else {
                trace!("{} is already queued", self.identity());
            }
        } else {
            debug!("Resolving dependencies for {} inline", self.identity());
            self.load_dependencies();
        }
    }

    /// Run the strategy's resolution on the current thread.
    pub(crate) fn load_dependencies(self: &Arc<Self>) {
        self.strategy.load_dependencies(self);
    }

    /// Reconcile a completed resolution with the cache.
    pub fn process_result(self: &Arc<Self>, result: ResolveResult) {
        self.services.registry().remove(self);

        let script = self.identity();
        let cache = self.services.cache();

        let Some(cached) = cache.get(script) else {
            debug!("First dependency resolution for {script}");
            self.apply_result(&result);
            return;
        };

        let Some(raw) = result.dependencies.as_ref() else {
            debug!("Resolution for {script} produced no dependencies; keeping cached set");
            self.attach_reports_if_changed(&result);
            return;
        };

        let adjusted = self.definition.adjust(raw);
        if adjusted != cached {
            if self.strategy.should_show_notification(self.services.settings())
                && !self.services.settings().headless
            {
                debug!("Dependencies of {script} changed; asking before storing");
                self.services
                    .notifications()
                    .offer(PendingUpdate::new(self, result));
            } else {
                debug!("Dependencies of {script} changed; storing");
                self.apply_result(&result);
            }
        } else {
            trace!("Dependencies of {script} unchanged");
            self.attach_reports_if_changed(&result);
            if self.strategy.should_show_notification(self.services.settings()) {
                self.services.notifications().retract(script);
            }
        }
    }

    fn apply_result(&self, result: &ResolveResult) {
        let retract_offer = self.strategy.should_show_notification(self.services.settings());
        store_result(&self.services, &self.file, &self.definition, result, retract_offer);
    }

    fn attach_reports_if_changed(&self, result: &ResolveResult) {
        attach_reports_if_changed(&self.services, &self.file, result);
    }
}

/// Store a result as-is: dependencies first, then reports.
///
/// Shared by the loader and by an accepted [`PendingUpdate`], which outlives the
/// loader that offered it.
pub(crate) fn store_result(
    services: &ScriptServices,
    file: &ScriptFile,
    definition: &ScriptDefinition,
    result: &ResolveResult,
    retract_offer: bool,
) {
    let script = file.identity();
    if retract_offer {
        services.notifications().retract(script);
    }

    if let Some(raw) = result.dependencies.as_ref() {
        let dependencies = definition.adjust(raw);
        let cache = services.cache();
        let roots_changed = cache.has_uncached_roots(&dependencies);
        if cache.save(script, dependencies.clone()) {
            file.set_dependencies(dependencies);
        }

        if roots_changed {
            notify_roots_changed(services, script);
        }
    }

    attach_reports_if_changed(services, file, result);
}

fn attach_reports_if_changed(services: &ScriptServices, file: &ScriptFile, result: &ResolveResult) {
    if file.reports().as_deref() != result.reports_or_none() {
        file.set_reports(&result.reports);
        services.reports().attach(file.identity(), &result.reports);
    }
}

fn notify_roots_changed(services: &ScriptServices, script: &ScriptIdentity) {
    let project = Arc::clone(services.project());
    debug!("New roots for {script}; scheduling roots change");
    services.scheduler().run_serialized(Box::new(move || {
        if let Err(err) = project.make_roots_change() {
            debug!("Roots change not applied: {err}");
        }
    }));
}

impl fmt::Debug for ScriptDependenciesLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptDependenciesLoader")
            .field("script", self.identity())
            .field("definition", &self.definition.name())
            .field("background", &self.runs_in_background())
            .finish()
    }
}
