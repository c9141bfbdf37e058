//! Background resolution for async and legacy resolvers.

use super::{LoaderStrategy, ScriptDependenciesLoader};
use crate::config::ScriptingSettings;
use crate::content::load_and_resolve;
use crate::script::ScriptFile;
use futures::future::{AbortHandle, abortable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Resolves on the shared background task.
///
/// - A trigger for a content version that was already requested is skipped.
/// - A trigger while the loader is waiting in the queue does not queue it twice.
/// - A trigger for a newer version aborts the resolution in flight; the aborted run
///   processes no result.
#[derive(Debug, Default)]
pub struct AsyncLoader {
    last_requested_stamp: Mutex<Option<u64>>,
    queued: AtomicBool,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl AsyncLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoaderStrategy for AsyncLoader {
    fn should_use_background_thread(&self) -> bool {
        true
    }

    fn should_show_notification(&self, settings: &ScriptingSettings) -> bool {
        !settings.auto_reload
    }

    fn should_run_new_update(&self, file: &ScriptFile) -> bool {
        let stamp = file.modification_stamp();
        let mut last = self.last_requested_stamp.lock().unwrap_or_else(PoisonError::into_inner);
        if *last == Some(stamp) {
            return false;
        }
        *last = Some(stamp);
        true
    }

    fn cancel_update(&self) {
        if let Some(handle) = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
        }
    }

    fn claim_queue_slot(&self) -> bool {
        !self.queued.swap(true, Ordering::AcqRel)
    }

    fn load_dependencies(&self, loader: &Arc<ScriptDependenciesLoader>) {
        self.queued.store(false, Ordering::Release);

        let services = loader.services();
        let (resolution, handle) = abortable(load_and_resolve(
            services.content().as_ref(),
            loader.definition(),
            loader.file(),
        ));
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        let outcome = services.runtime().block_on(resolution);
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).take();

        match outcome {
            Ok(result) => loader.process_result(result),
            Err(_) => debug!("Resolution for {} was superseded", loader.identity()),
        }
    }
}
