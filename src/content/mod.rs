//! Fetching a script's resolver configuration.
//!
//! The [`ContentLoader`] boundary is deliberately thin: it hands the resolver the
//! script text and the content version it was read at. [`load_and_resolve`] is the
//! single place where loading and resolving are combined and where their failures are
//! turned into reports.

use crate::core::ScriptDepsError;
use crate::dependencies::{ResolveResult, ScriptReport};
use crate::script::{ScriptDefinition, ScriptFile, ScriptIdentity};
use anyhow::Result;
use tracing::debug;

/// What a resolver gets to look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    /// The script being resolved
    pub identity: ScriptIdentity,
    /// Script text
    pub text: String,
    /// Modification stamp of the file when the text was read
    pub stamp: u64,
}

impl ScriptSource {
    pub fn new(identity: ScriptIdentity, text: impl Into<String>, stamp: u64) -> Self {
        Self {
            identity,
            text: text.into(),
            stamp,
        }
    }
}

/// Loads the configuration source for a script.
pub trait ContentLoader: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the content cannot be read; the loader attaches it to
    /// the script as an error report.
    fn load(&self, file: &ScriptFile) -> Result<ScriptSource>;
}

/// Reads script text from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsContentLoader;

impl ContentLoader for FsContentLoader {
    fn load(&self, file: &ScriptFile) -> Result<ScriptSource> {
        let stamp = file.modification_stamp();
        let text = std::fs::read_to_string(file.path()).map_err(|err| ScriptDepsError::ContentLoadFailed {
            path: file.path().display().to_string(),
            reason: err.to_string(),
        })?;
        Ok(ScriptSource::new(file.identity().clone(), text, stamp))
    }
}

/// Load the script's content and run the definition's resolver on it.
///
/// Never fails: a content or resolver error becomes a [`ResolveResult`] with no
/// dependencies and a single error report.
pub async fn load_and_resolve(
    content: &dyn ContentLoader,
    definition: &ScriptDefinition,
    file: &ScriptFile,
) -> ResolveResult {
    let source = match content.load(file) {
        Ok(source) => source,
        Err(err) => {
            debug!("Content load failed for {}: {err:#}", file.identity());
            return ResolveResult::failure(vec![ScriptReport::error(format!(
                "Failed to load script content: {err:#}"
            ))]);
        }
    };

    match definition.resolver().resolve(source).await {
        Ok(result) => result,
        Err(err) => {
            debug!("Resolver '{}' failed for {}: {err:#}", definition.name(), file.identity());
            let err = ScriptDepsError::ResolutionFailed {
                script: file.identity().to_string(),
                reason: format!("{err:#}"),
            };
            ResolveResult::failure(vec![ScriptReport::error(err.to_string())])
        }
    }
}
