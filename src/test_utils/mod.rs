//! Test utilities for scriptdeps
//!
//! Recording collaborators and resolvers with controllable timing, plus a
//! [`TestHarness`] that wires them into an isolated [`ScriptServices`].
//!
//! # Example
//!
//! ```rust,no_run
//! use scriptdeps::config::ScriptingSettings;
//! use scriptdeps::test_utils::TestHarness;
//!
//! # async fn example() {
//! let harness = TestHarness::new(ScriptingSettings::headless());
//! assert!(harness.services.registry().is_empty());
//! # }
//! ```

use crate::cache::ScriptDependenciesCache;
use crate::config::ScriptingSettings;
use crate::content::{ContentLoader, ScriptSource};
use crate::dependencies::{ResolveResult, ScriptReport};
use crate::notifications::{NotificationSurface, PendingNotifications, PendingUpdate};
use crate::project::{InlineScheduler, Project};
use crate::reports::{ReportSink, ScriptReportSink};
use crate::resolver::{AsyncDependenciesResolver, DependenciesResolver};
use crate::script::{ScriptFile, ScriptIdentity};
use crate::services::ScriptServices;
use futures::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, Once, PoisonError};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; does nothing when neither is set.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Sync resolver returning a configurable result.
#[derive(Debug)]
pub struct StaticResolver {
    result: Mutex<ResolveResult>,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new(result: ResolveResult) -> Self {
        Self {
            result: Mutex::new(result),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_result(&self, result: ResolveResult) {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = result;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DependenciesResolver for StaticResolver {
    fn resolve(&self, _source: &ScriptSource) -> anyhow::Result<ResolveResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

/// Sync resolver that blocks every call until [`GatedResolver::open`] is called.
#[derive(Debug)]
pub struct GatedResolver {
    result: ResolveResult,
    open: Mutex<bool>,
    signal: Condvar,
    entered: AtomicUsize,
}

impl GatedResolver {
    pub fn new(result: ResolveResult) -> Self {
        Self {
            result,
            open: Mutex::new(false),
            signal: Condvar::new(),
            entered: AtomicUsize::new(0),
        }
    }

    /// Release every blocked and future call.
    pub fn open(&self) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.signal.notify_all();
    }

    /// Number of calls that have started.
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// Poll until at least `count` calls have started.
    pub async fn wait_entered(&self, count: usize) {
        while self.entered() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

impl DependenciesResolver for GatedResolver {
    fn resolve(&self, _source: &ScriptSource) -> anyhow::Result<ResolveResult> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        while !*open {
            open = self.signal.wait(open).unwrap_or_else(PoisonError::into_inner);
        }
        Ok(self.result.clone())
    }
}

/// Async resolver that answers after a delay.
#[derive(Debug)]
pub struct DelayedResolver {
    result: ResolveResult,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl DelayedResolver {
    pub fn new(result: ResolveResult, delay: Duration) -> Self {
        Self {
            result,
            delay,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Poll until at least `count` calls have started.
    pub async fn wait_calls(&self, count: usize) {
        while self.calls() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

impl AsyncDependenciesResolver for DelayedResolver {
    fn resolve_async(&self, _source: ScriptSource) -> BoxFuture<'static, anyhow::Result<ResolveResult>> {
        let result = self.result.clone();
        let delay = self.delay;
        let calls = Arc::clone(&self.calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            Ok(result)
        }
        .boxed()
    }
}

/// Content loader that never touches the disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticContentLoader;

impl ContentLoader for StaticContentLoader {
    fn load(&self, file: &ScriptFile) -> anyhow::Result<ScriptSource> {
        Ok(ScriptSource::new(file.identity().clone(), "", file.modification_stamp()))
    }
}

/// Report sink that counts how often it was written to.
#[derive(Debug, Default)]
pub struct CountingReportSink {
    inner: ScriptReportSink,
    attaches: AtomicUsize,
}

impl CountingReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    pub fn reports(&self, script: &ScriptIdentity) -> Vec<ScriptReport> {
        self.inner.reports(script)
    }
}

impl ReportSink for CountingReportSink {
    fn attach(&self, script: &ScriptIdentity, reports: &[ScriptReport]) {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        self.inner.attach(script, reports);
    }
}

/// Notification surface that remembers every call.
///
/// Offers are kept in an inner [`PendingNotifications`] so tests can accept them.
#[derive(Debug, Default)]
pub struct RecordingNotifications {
    inner: PendingNotifications,
    offered: Mutex<Vec<ScriptIdentity>>,
    retracted: Mutex<Vec<ScriptIdentity>>,
}

impl RecordingNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts offered so far, in order.
    pub fn offered(&self) -> Vec<ScriptIdentity> {
        self.offered.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Scripts retracted so far, in order.
    pub fn retracted(&self) -> Vec<ScriptIdentity> {
        self.retracted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_showing(&self, script: &ScriptIdentity) -> bool {
        self.inner.is_showing(script)
    }

    pub fn accept(&self, script: &ScriptIdentity) -> bool {
        self.inner.accept(script)
    }
}

impl NotificationSurface for RecordingNotifications {
    fn offer(&self, update: PendingUpdate) {
        self.offered.lock().unwrap_or_else(PoisonError::into_inner).push(update.script().clone());
        self.inner.offer(update);
    }

    fn retract(&self, script: &ScriptIdentity) {
        self.retracted.lock().unwrap_or_else(PoisonError::into_inner).push(script.clone());
        self.inner.retract(script);
    }
}

/// Isolated services with recording collaborators.
///
/// Roots changes run inline, content comes from [`StaticContentLoader`].
pub struct TestHarness {
    pub services: Arc<ScriptServices>,
    pub cache: Arc<ScriptDependenciesCache>,
    pub reports: Arc<CountingReportSink>,
    pub notifications: Arc<RecordingNotifications>,
    pub project: Arc<Project>,
}

impl TestHarness {
    /// Must be called inside a tokio runtime.
    pub fn new(settings: ScriptingSettings) -> Self {
        let cache = Arc::new(ScriptDependenciesCache::new());
        let reports = Arc::new(CountingReportSink::new());
        let notifications = Arc::new(RecordingNotifications::new());
        let project = Arc::new(Project::new("test"));
        let services = ScriptServices::builder(Arc::clone(&project))
            .settings(settings)
            .cache(cache.clone())
            .reports(reports.clone())
            .notifications(notifications.clone())
            .scheduler(Arc::new(InlineScheduler))
            .content(Arc::new(StaticContentLoader))
            .build()
            .expect("test harness must run inside a tokio runtime");
        Self {
            services,
            cache,
            reports,
            notifications,
            project,
        }
    }
}
