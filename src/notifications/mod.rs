//! Offering changed dependencies to the user.
//!
//! When a background resolution produces a dependency set that differs from the
//! cached one, and auto-reload is off, the loader does not store it. It hands a
//! [`PendingUpdate`] to the [`NotificationSurface`] instead. Nothing changes until the
//! host calls [`PendingUpdate::accept`]; dropping the update discards it.

use crate::dependencies::ResolveResult;
use crate::loader::{ScriptDependenciesLoader, store_result};
use crate::script::{ScriptDefinition, ScriptFile, ScriptIdentity};
use crate::services::ScriptServices;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// A resolved result waiting for the user's decision.
///
/// Holds the services weakly: the services own the surface that holds the offer, so
/// an offer nobody decides on must not keep them alive.
pub struct PendingUpdate {
    services: Weak<ScriptServices>,
    file: Arc<ScriptFile>,
    definition: Arc<ScriptDefinition>,
    result: ResolveResult,
}

impl PendingUpdate {
    pub(crate) fn new(loader: &ScriptDependenciesLoader, result: ResolveResult) -> Self {
        Self {
            services: Arc::downgrade(loader.services()),
            file: Arc::clone(loader.file()),
            definition: Arc::clone(loader.definition()),
            result,
        }
    }

    pub fn script(&self) -> &ScriptIdentity {
        self.file.identity()
    }

    /// The result that would be stored on accept.
    pub fn result(&self) -> &ResolveResult {
        &self.result
    }

    /// Store the offered result: save the dependencies, publish them on the file,
    /// attach its reports and fire roots-changed when new roots appear.
    ///
    /// Returns `false` without storing anything when the services are gone.
    pub fn accept(self) -> bool {
        let Some(services) = self.services.upgrade() else {
            debug!("Dropping accepted update for {}: services are gone", self.script());
            return false;
        };
        debug!("Accepted dependency update for {}", self.script());
        store_result(&services, &self.file, &self.definition, &self.result, true);
        true
    }
}

impl fmt::Debug for PendingUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingUpdate")
            .field("script", self.script())
            .field("result", &self.result)
            .finish()
    }
}

/// The host's notification UI, reduced to what the loader needs.
pub trait NotificationSurface: Send + Sync {
    /// Show an update offer for `update.script()`, replacing any previous one.
    fn offer(&self, update: PendingUpdate);

    /// Remove the offer for `script`, if one is showing.
    fn retract(&self, script: &ScriptIdentity);
}

/// Keeps at most one pending offer per script until the host decides.
#[derive(Debug, Default)]
pub struct PendingNotifications {
    pending: DashMap<ScriptIdentity, PendingUpdate>,
    offered: AtomicUsize,
}

impl PendingNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_showing(&self, script: &ScriptIdentity) -> bool {
        self.pending.contains_key(script)
    }

    /// Total number of offers made so far.
    pub fn offer_count(&self) -> usize {
        self.offered.load(Ordering::Acquire)
    }

    /// Take the pending offer for `script` out of the surface.
    pub fn take(&self, script: &ScriptIdentity) -> Option<PendingUpdate> {
        self.pending.remove(script).map(|(_, update)| update)
    }

    /// Accept the pending offer for `script`. Returns `false` when none is showing
    /// or the offer could no longer be stored.
    pub fn accept(&self, script: &ScriptIdentity) -> bool {
        self.take(script).is_some_and(PendingUpdate::accept)
    }

    /// Discard the pending offer for `script`.
    pub fn dismiss(&self, script: &ScriptIdentity) -> bool {
        self.take(script).is_some()
    }
}

impl NotificationSurface for PendingNotifications {
    fn offer(&self, update: PendingUpdate) {
        self.offered.fetch_add(1, Ordering::AcqRel);
        debug!("Offering dependency update for {}", update.script());
        self.pending.insert(update.script().clone(), update);
    }

    fn retract(&self, script: &ScriptIdentity) {
        if self.pending.remove(script).is_some() {
            debug!("Retracted stale dependency offer for {script}");
        }
    }
}
