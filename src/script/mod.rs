//! Script files and the definitions that describe how to resolve them.
//!
//! - [`ScriptIdentity`] is the key used by the registry, the cache and the
//!   notification surface.
//! - [`ScriptFile`] is the live handle for a script: its identity, a modification
//!   stamp that changes whenever the content changes, and data attached by the loader
//!   (last reports, published dependencies).
//! - [`ScriptDefinition`] pairs a resolver with the adjustment applied to every raw
//!   resolver result.

use crate::dependencies::{ScriptDependencies, ScriptReport};
use crate::resolver::{ResolverKind, ScriptResolver};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Stable key identifying a script across updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptIdentity(PathBuf);

impl ScriptIdentity {
    /// Create an identity for the script at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// The script path.
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ScriptIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for ScriptIdentity {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// A live script file.
///
/// The modification stamp is the content version: hosts call [`ScriptFile::touch`]
/// (or [`ScriptFile::set_modification_stamp`]) whenever the text changes. Attached
/// reports and dependencies are what the host shows for the script right now.
#[derive(Debug)]
pub struct ScriptFile {
    identity: ScriptIdentity,
    modification_stamp: AtomicU64,
    reports: RwLock<Option<Vec<ScriptReport>>>,
    dependencies: RwLock<Option<ScriptDependencies>>,
}

impl ScriptFile {
    /// Create a handle with modification stamp 0 and nothing attached.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            identity: ScriptIdentity::new(path),
            modification_stamp: AtomicU64::new(0),
            reports: RwLock::new(None),
            dependencies: RwLock::new(None),
        }
    }

    pub fn identity(&self) -> &ScriptIdentity {
        &self.identity
    }

    pub fn path(&self) -> &Path {
        self.identity.path()
    }

    pub fn modification_stamp(&self) -> u64 {
        self.modification_stamp.load(Ordering::Acquire)
    }

    pub fn set_modification_stamp(&self, stamp: u64) {
        self.modification_stamp.store(stamp, Ordering::Release);
    }

    /// Record a content change, returning the new stamp.
    pub fn touch(&self) -> u64 {
        self.modification_stamp.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Reports currently attached to the file. `None` means nothing to show.
    pub fn reports(&self) -> Option<Vec<ScriptReport>> {
        self.reports.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the attached reports. An empty list is stored as `None`.
    pub fn set_reports(&self, reports: &[ScriptReport]) {
        let value = if reports.is_empty() { None } else { Some(reports.to_vec()) };
        *self.reports.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Dependencies last published for this file.
    pub fn dependencies(&self) -> Option<ScriptDependencies> {
        self.dependencies.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_dependencies(&self, dependencies: ScriptDependencies) {
        *self.dependencies.write().unwrap_or_else(PoisonError::into_inner) = Some(dependencies);
    }
}

/// How scripts of one kind are resolved.
///
/// `template_classpath` and `default_imports` come from the script template; they
/// are merged into every resolved set by [`ScriptDefinition::adjust`].
pub struct ScriptDefinition {
    name: String,
    resolver: ScriptResolver,
    template_classpath: Vec<PathBuf>,
    default_imports: Vec<String>,
}

impl ScriptDefinition {
    pub fn new(name: impl Into<String>, resolver: ScriptResolver) -> Self {
        Self {
            name: name.into(),
            resolver,
            template_classpath: Vec::new(),
            default_imports: Vec::new(),
        }
    }

    /// Classpath roots the template itself needs.
    pub fn with_template_classpath<I, P>(mut self, classpath: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.template_classpath = classpath.into_iter().map(Into::into).collect();
        self
    }

    /// Imports every script of this kind gets implicitly.
    pub fn with_default_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_imports = imports.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolver(&self) -> &ScriptResolver {
        &self.resolver
    }

    pub fn resolver_kind(&self) -> ResolverKind {
        self.resolver.kind()
    }

    /// Canonicalize a raw resolver result.
    ///
    /// Template classpath and default imports go first, then the resolved entries;
    /// repeated entries are dropped. Every cache write and every comparison against
    /// the cache goes through this.
    pub fn adjust(&self, raw: &ScriptDependencies) -> ScriptDependencies {
        let mut adjusted = ScriptDependencies {
            java_home: raw.java_home.clone(),
            classpath: self.template_classpath.clone(),
            imports: self.default_imports.clone(),
            sources: raw.sources.clone(),
            scripts: raw.scripts.clone(),
        };
        adjusted.classpath.extend(raw.classpath.iter().cloned());
        adjusted.imports.extend(raw.imports.iter().cloned());
        adjusted.dedup();
        adjusted
    }
}

impl fmt::Debug for ScriptDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptDefinition")
            .field("name", &self.name)
            .field("resolver", &self.resolver.kind())
            .field("template_classpath", &self.template_classpath)
            .field("default_imports", &self.default_imports)
            .finish()
    }
}
