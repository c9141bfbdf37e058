//! The project model and its serialized mutation context.
//!
//! The loader never changes project roots directly. It hands a mutation to the
//! project's [`Scheduler`], which runs mutations one at a time:
//!
//! - [`InlineScheduler`] runs the mutation right away on the calling thread. Used in
//!   headless/test mode.
//! - [`SerialScheduler`] queues mutations onto a single tokio task that applies them
//!   in submission order, after whatever the host queued before.
//!
//! A mutation that runs after [`Project::dispose`] must not touch the project; the
//! roots-changed mutation checks [`Project::is_disposed`] first.

use crate::core::ScriptDepsError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

/// A deferred change to the project model.
pub type Mutation = Box<dyn FnOnce() + Send + 'static>;

/// Callback invoked after every roots change.
pub type RootsListener = Arc<dyn Fn() + Send + Sync>;

/// Runs project mutations one at a time.
pub trait Scheduler: Send + Sync {
    fn run_serialized(&self, mutation: Mutation);
}

/// Runs each mutation immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn run_serialized(&self, mutation: Mutation) {
        mutation();
    }
}

/// Applies mutations in order on a dedicated tokio task.
#[derive(Debug, Clone)]
pub struct SerialScheduler {
    sender: mpsc::UnboundedSender<Mutation>,
}

impl SerialScheduler {
    /// Start the mutation task on `handle`.
    pub fn spawn(handle: &Handle) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Mutation>();
        handle.spawn(async move {
            while let Some(mutation) = receiver.recv().await {
                mutation();
            }
            trace!("Project mutation queue closed");
        });
        Self { sender }
    }

    /// Wait until every mutation submitted before this call has run.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.run_serialized(Box::new(move || {
            let _ = done.send(());
        }));
        let _ = wait.await;
    }
}

impl Scheduler for SerialScheduler {
    fn run_serialized(&self, mutation: Mutation) {
        if self.sender.send(mutation).is_err() {
            warn!("Project mutation queue is closed; dropping mutation");
        }
    }
}

/// The project whose script roots the loader keeps up to date.
pub struct Project {
    name: String,
    disposed: AtomicBool,
    roots_changes: AtomicU64,
    modification_count: AtomicU64,
    listeners: RwLock<Vec<RootsListener>>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            disposed: AtomicBool::new(false),
            roots_changes: AtomicU64::new(0),
            modification_count: AtomicU64::new(0),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tear the project down. Pending mutations become no-ops.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            debug!("Project '{}' disposed", self.name);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Number of roots changes applied so far.
    pub fn roots_change_count(&self) -> u64 {
        self.roots_changes.load(Ordering::Acquire)
    }

    /// Modification counter for script dependencies; bumps on every roots change.
    pub fn script_dependencies_modification_count(&self) -> u64 {
        self.modification_count.load(Ordering::Acquire)
    }

    /// Register a listener for roots changes (the host re-indexes from here).
    pub fn on_roots_changed(&self, listener: RootsListener) {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner).push(listener);
    }

    /// Apply a roots change. Must only be called from a serialized mutation.
    ///
    /// # Errors
    ///
    /// [`ScriptDepsError::ProjectDisposed`] when the project was disposed first; no
    /// counter moves and no listener runs.
    pub(crate) fn make_roots_change(&self) -> Result<(), ScriptDepsError> {
        if self.is_disposed() {
            return Err(ScriptDepsError::ProjectDisposed);
        }

        self.roots_changes.fetch_add(1, Ordering::AcqRel);
        self.modification_count.fetch_add(1, Ordering::AcqRel);
        debug!("Roots changed in project '{}'", self.name);

        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner).clone();
        for listener in listeners {
            listener();
        }
        Ok(())
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name)
            .field("disposed", &self.is_disposed())
            .field("roots_changes", &self.roots_change_count())
            .finish()
    }
}
