//! One shared background task for all queued resolutions.
//!
//! Instead of one background job per script, every background loader joins a single
//! task that drains a FIFO queue. The task is the one user-visible "Loading script
//! dependencies..." unit of work, however many scripts are waiting.
//!
//! # Locking
//!
//! The slot holding the current task is behind an [`RwLock`]:
//!
//! - Producers append to the running task while holding the **read** lock.
//! - Creating a task takes the **write** lock and re-checks the slot, so two callers
//!   that both saw an empty slot still create only one task.
//! - The worker, once it finds the queue empty, takes the **write** lock and checks
//!   the queue again before clearing the slot. A producer therefore either lands in
//!   the queue before that check (and is drained) or sees an empty slot (and starts a
//!   new task). Nothing is dropped.

use super::ScriptDependenciesLoader;
use crate::utils::progress::ProgressBar;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error};

/// Title of the background unit of work.
pub const TASK_TITLE: &str = "Loading script dependencies...";

/// Batches background loaders into a single task.
#[derive(Clone)]
pub struct BackgroundCoalescer {
    inner: Arc<CoalescerState>,
}

struct CoalescerState {
    slot: RwLock<Option<Arc<BackgroundTask>>>,
    runtime: Handle,
    show_progress: bool,
    created: AtomicUsize,
    completed: AtomicUsize,
    busy: watch::Sender<bool>,
}

/// The currently running task: its queue and its spinner.
struct BackgroundTask {
    id: usize,
    queue: Mutex<VecDeque<Arc<ScriptDependenciesLoader>>>,
    progress: ProgressBar,
}

impl BackgroundTask {
    fn new(id: usize, show_progress: bool) -> Self {
        let progress = ProgressBar::new_spinner(show_progress);
        progress.set_prefix(format!("#{id}"));
        progress.set_message(TASK_TITLE);
        Self {
            id,
            queue: Mutex::new(VecDeque::new()),
            progress,
        }
    }

    fn push(&self, loader: Arc<ScriptDependenciesLoader>) {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).push_back(loader);
    }

    fn pop(&self) -> Option<Arc<ScriptDependenciesLoader>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }

    fn is_empty(&self) -> bool {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

impl BackgroundCoalescer {
    /// A coalescer that runs its task on `runtime`'s blocking pool.
    pub fn new(runtime: Handle, show_progress: bool) -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            inner: Arc::new(CoalescerState {
                slot: RwLock::new(None),
                runtime,
                show_progress,
                created: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                busy,
            }),
        }
    }

    /// Add `loader` to the running task, starting one if none is running.
    pub fn schedule(&self, loader: Arc<ScriptDependenciesLoader>) {
        {
            let slot = self.inner.slot.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(task) = slot.as_ref() {
                task.push(loader);
                return;
            }
        }

        let mut slot = self.inner.slot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.as_ref() {
            task.push(loader);
            return;
        }

        let id = self.inner.created.fetch_add(1, Ordering::AcqRel) + 1;
        let task = Arc::new(BackgroundTask::new(id, self.inner.show_progress));
        task.push(loader);
        *slot = Some(Arc::clone(&task));
        self.inner.busy.send_replace(true);
        drop(slot);

        debug!("Started background dependency task #{id}");
        let state = Arc::clone(&self.inner);
        self.inner.runtime.spawn_blocking(move || state.run(task));
    }

    /// Whether a task is currently running.
    pub fn is_running(&self) -> bool {
        self.inner.slot.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Number of tasks created so far.
    pub fn tasks_created(&self) -> usize {
        self.inner.created.load(Ordering::Acquire)
    }

    /// Number of tasks whose completion has fired.
    pub fn tasks_completed(&self) -> usize {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Wait until no task is running.
    pub async fn wait_idle(&self) {
        let mut busy = self.inner.busy.subscribe();
        let _ = busy.wait_for(|busy| !*busy).await;
    }
}

impl CoalescerState {
    fn run(&self, task: Arc<BackgroundTask>) {
        loop {
            while let Some(loader) = task.pop() {
                task.progress.set_message(format!("{TASK_TITLE} {}", loader.identity()));
                let outcome = catch_unwind(AssertUnwindSafe(|| loader.load_dependencies()));
                if outcome.is_err() {
                    error!("Dependency loader for {} panicked", loader.identity());
                    loader.services().registry().remove(&loader);
                }
                task.progress.inc(1);
            }

            let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
            if task.is_empty() {
                self.complete(&mut slot);
                break;
            }
        }

        task.progress.finish_and_clear();
        debug!(
            "Background dependency task #{} finished after {} scripts",
            task.id,
            task.progress.position()
        );
    }

    /// Completion callback: clears the shared slot. Runs once per task, under the
    /// slot's write lock.
    fn complete(&self, slot: &mut Option<Arc<BackgroundTask>>) {
        *slot = None;
        self.completed.fetch_add(1, Ordering::AcqRel);
        self.busy.send_replace(false);
    }
}

impl std::fmt::Debug for BackgroundCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundCoalescer")
            .field("running", &self.is_running())
            .field("tasks_created", &self.tasks_created())
            .field("tasks_completed", &self.tasks_completed())
            .finish()
    }
}
