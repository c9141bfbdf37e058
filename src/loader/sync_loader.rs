//! Inline resolution for synchronous resolvers.

use super::{LoaderStrategy, ScriptDependenciesLoader};
use crate::config::ScriptingSettings;
use crate::content::load_and_resolve;
use std::sync::Arc;

/// Resolves on the requesting thread and stores changes without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncLoader;

impl LoaderStrategy for SyncLoader {
    fn should_use_background_thread(&self) -> bool {
        false
    }

    fn should_show_notification(&self, _settings: &ScriptingSettings) -> bool {
        false
    }

    fn load_dependencies(&self, loader: &Arc<ScriptDependenciesLoader>) {
        let services = loader.services();
        // A sync resolver's future is ready as soon as it is created.
        let result = futures::executor::block_on(load_and_resolve(
            services.content().as_ref(),
            loader.definition(),
            loader.file(),
        ));
        loader.process_result(result);
    }
}
