//! Resolver abstractions and the resolver-kind dispatch.
//!
//! A script definition carries one [`ScriptResolver`]. Its [`ResolverKind`] decides
//! which loader strategy the registry constructs:
//!
//! | Kind                       | Loader      | Where resolution runs             |
//! |----------------------------|-------------|-----------------------------------|
//! | [`ResolverKind::Sync`]     | SyncLoader  | inline, on the requesting thread  |
//! | [`ResolverKind::Async`]    | AsyncLoader | shared background worker          |
//! | [`ResolverKind::LegacyAsync`] | AsyncLoader | shared background worker       |
//!
//! Resolvers report failure either through `Err` or through a [`ResolveResult`]
//! without dependencies. The loader turns `Err` into an error report; nothing thrown
//! by a resolver reaches callers of the registry.

use crate::content::ScriptSource;
use crate::dependencies::ResolveResult;
use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;

/// Which kind of resolver a definition carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverKind {
    /// Resolves synchronously; cheap enough to run on the caller's thread
    Sync,
    /// Delivers its result through a future
    Async,
    /// A blocking resolver from the older API that still has to run in the background
    LegacyAsync,
}

impl ResolverKind {
    /// Whether loaders for this kind hand their work to the background coalescer.
    pub fn runs_in_background(self) -> bool {
        !matches!(self, ResolverKind::Sync)
    }
}

/// A blocking resolver.
pub trait DependenciesResolver: Send + Sync {
    /// Resolve the dependencies declared by `source`.
    ///
    /// # Errors
    ///
    /// Any error is reported to the user as an error report attached to the script.
    fn resolve(&self, source: &ScriptSource) -> anyhow::Result<ResolveResult>;
}

/// A resolver that delivers its result asynchronously.
///
/// The returned future is polled on the background worker and may be aborted when a
/// newer update for the same script supersedes it.
pub trait AsyncDependenciesResolver: Send + Sync {
    fn resolve_async(&self, source: ScriptSource) -> BoxFuture<'static, anyhow::Result<ResolveResult>>;
}

/// Adapts a blocking resolver from the older API to the async interface.
///
/// The wrapped resolver runs when the future is created, which happens on the
/// background worker; it therefore never blocks a requesting thread.
#[derive(Clone)]
pub struct LegacyResolverWrapper {
    inner: Arc<dyn DependenciesResolver>,
}

impl LegacyResolverWrapper {
    pub fn new(inner: Arc<dyn DependenciesResolver>) -> Self {
        Self { inner }
    }
}

impl AsyncDependenciesResolver for LegacyResolverWrapper {
    fn resolve_async(&self, source: ScriptSource) -> BoxFuture<'static, anyhow::Result<ResolveResult>> {
        future::ready(self.inner.resolve(&source)).boxed()
    }
}

/// The resolver attached to a script definition, tagged by kind.
#[derive(Clone)]
pub enum ScriptResolver {
    Sync(Arc<dyn DependenciesResolver>),
    Async(Arc<dyn AsyncDependenciesResolver>),
    Legacy(LegacyResolverWrapper),
}

impl ScriptResolver {
    /// Wrap a blocking resolver from the older API.
    pub fn legacy(inner: Arc<dyn DependenciesResolver>) -> Self {
        ScriptResolver::Legacy(LegacyResolverWrapper::new(inner))
    }

    pub fn kind(&self) -> ResolverKind {
        match self {
            ScriptResolver::Sync(_) => ResolverKind::Sync,
            ScriptResolver::Async(_) => ResolverKind::Async,
            ScriptResolver::Legacy(_) => ResolverKind::LegacyAsync,
        }
    }

    /// Resolve `source` as a future, whatever the kind.
    ///
    /// For a sync resolver the work happens immediately and the future is ready.
    pub fn resolve(&self, source: ScriptSource) -> BoxFuture<'static, anyhow::Result<ResolveResult>> {
        match self {
            ScriptResolver::Sync(resolver) => future::ready(resolver.resolve(&source)).boxed(),
            ScriptResolver::Async(resolver) => resolver.resolve_async(source),
            ScriptResolver::Legacy(wrapper) => wrapper.resolve_async(source),
        }
    }
}

impl fmt::Debug for ScriptResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptResolver::{:?}", self.kind())
    }
}
