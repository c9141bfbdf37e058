//! The collaborators a loader works with, bundled per project.
//!
//! Nothing in scriptdeps is a global: the loader registry, the background coalescer,
//! the cache and the rest are owned by a [`ScriptServices`] value that loaders receive
//! on construction. Tests build isolated instances with their own collaborators.
//!
//! # Examples
//!
//! ```rust,no_run
//! use scriptdeps::config::ScriptingSettings;
//! use scriptdeps::project::Project;
//! use scriptdeps::services::ScriptServices;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = ScriptingSettings::load().await?;
//! let services = ScriptServices::builder(Arc::new(Project::new("demo")))
//!     .settings(settings)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::cache::{DependenciesCache, ScriptDependenciesCache};
use crate::config::ScriptingSettings;
use crate::content::{ContentLoader, FsContentLoader};
use crate::core::ScriptDepsError;
use crate::loader::{BackgroundCoalescer, LoaderRegistry};
use crate::notifications::{NotificationSurface, PendingNotifications};
use crate::project::{InlineScheduler, Project, Scheduler, SerialScheduler};
use crate::reports::{ReportSink, ScriptReportSink};
use crate::script::{ScriptDefinition, ScriptFile};
use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Everything the dependency loader needs for one project.
pub struct ScriptServices {
    project: Arc<Project>,
    settings: ScriptingSettings,
    cache: Arc<dyn DependenciesCache>,
    reports: Arc<dyn ReportSink>,
    notifications: Arc<dyn NotificationSurface>,
    scheduler: Arc<dyn Scheduler>,
    content: Arc<dyn ContentLoader>,
    registry: LoaderRegistry,
    coalescer: BackgroundCoalescer,
    runtime: Handle,
}

impl ScriptServices {
    pub fn builder(project: Arc<Project>) -> ScriptServicesBuilder {
        ScriptServicesBuilder::new(project)
    }

    /// Bring the dependencies of `file` up to date. Entry point for hosts.
    pub fn request_update(self: &Arc<Self>, file: &Arc<ScriptFile>, definition: &Arc<ScriptDefinition>) {
        self.registry.request_update(self, file, definition);
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    pub fn settings(&self) -> &ScriptingSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<dyn DependenciesCache> {
        &self.cache
    }

    pub fn reports(&self) -> &Arc<dyn ReportSink> {
        &self.reports
    }

    pub fn notifications(&self) -> &Arc<dyn NotificationSurface> {
        &self.notifications
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn content(&self) -> &Arc<dyn ContentLoader> {
        &self.content
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.registry
    }

    pub fn coalescer(&self) -> &BackgroundCoalescer {
        &self.coalescer
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

impl fmt::Debug for ScriptServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptServices")
            .field("project", &self.project)
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .field("coalescer", &self.coalescer)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ScriptServices`]. Every collaborator has a default.
pub struct ScriptServicesBuilder {
    project: Arc<Project>,
    settings: ScriptingSettings,
    cache: Option<Arc<dyn DependenciesCache>>,
    reports: Option<Arc<dyn ReportSink>>,
    notifications: Option<Arc<dyn NotificationSurface>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    content: Option<Arc<dyn ContentLoader>>,
    runtime: Option<Handle>,
}

impl ScriptServicesBuilder {
    fn new(project: Arc<Project>) -> Self {
        Self {
            project,
            settings: ScriptingSettings::default(),
            cache: None,
            reports: None,
            notifications: None,
            scheduler: None,
            content: None,
            runtime: None,
        }
    }

    pub fn settings(mut self, settings: ScriptingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn cache(mut self, cache: Arc<dyn DependenciesCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn reports(mut self, reports: Arc<dyn ReportSink>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn notifications(mut self, notifications: Arc<dyn NotificationSurface>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn content(mut self, content: Arc<dyn ContentLoader>) -> Self {
        self.content = Some(content);
        self
    }

    /// Runtime for the background task and async resolvers.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Assemble the services.
    ///
    /// Defaults: a cache backed by `settings.cache_path` (in memory when unset),
    /// [`ScriptReportSink`], [`PendingNotifications`], [`FsContentLoader`], and an
    /// [`InlineScheduler`] in headless mode or a [`SerialScheduler`] otherwise.
    ///
    /// # Errors
    ///
    /// [`ScriptDepsError::ServiceMissing`] when no runtime was given and the caller is
    /// not inside a tokio runtime.
    pub fn build(self) -> Result<Arc<ScriptServices>> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| ScriptDepsError::ServiceMissing {
                service: "tokio runtime".to_string(),
            })?,
        };

        let settings = self.settings;
        let cache = self.cache.unwrap_or_else(|| match &settings.cache_path {
            Some(path) => Arc::new(ScriptDependenciesCache::load_from(path)),
            None => Arc::new(ScriptDependenciesCache::new()),
        });
        let scheduler = self.scheduler.unwrap_or_else(|| {
            if settings.headless {
                Arc::new(InlineScheduler)
            } else {
                Arc::new(SerialScheduler::spawn(&runtime))
            }
        });

        Ok(Arc::new(ScriptServices {
            project: self.project,
            cache,
            reports: self.reports.unwrap_or_else(|| Arc::new(ScriptReportSink::new())),
            notifications: self.notifications.unwrap_or_else(|| Arc::new(PendingNotifications::new())),
            scheduler,
            content: self.content.unwrap_or_else(|| Arc::new(FsContentLoader)),
            registry: LoaderRegistry::new(),
            coalescer: BackgroundCoalescer::new(runtime.clone(), settings.show_progress),
            settings,
            runtime,
        }))
    }
}
