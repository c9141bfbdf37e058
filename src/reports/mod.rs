//! Where resolution diagnostics go.
//!
//! The loader only calls a [`ReportSink`] when the reports for a script actually
//! changed (an empty list and no list count as the same). The default sink,
//! [`ScriptReportSink`], keeps the latest reports per script for the host to render
//! and logs them.

use crate::dependencies::{ScriptReport, Severity};
use crate::script::ScriptIdentity;
use dashmap::DashMap;
use tracing::{debug, warn};

pub trait ReportSink: Send + Sync {
    /// Replace the reports shown for `script`. An empty slice clears them.
    fn attach(&self, script: &ScriptIdentity, reports: &[ScriptReport]);
}

/// Keeps the latest reports per script.
#[derive(Debug, Default)]
pub struct ScriptReportSink {
    reports: DashMap<ScriptIdentity, Vec<ScriptReport>>,
}

impl ScriptReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports currently shown for `script`.
    pub fn reports(&self, script: &ScriptIdentity) -> Vec<ScriptReport> {
        self.reports.get(script).map(|r| r.value().clone()).unwrap_or_default()
    }
}

impl ReportSink for ScriptReportSink {
    fn attach(&self, script: &ScriptIdentity, reports: &[ScriptReport]) {
        if reports.is_empty() {
            debug!("Clearing reports for {script}");
            self.reports.remove(script);
            return;
        }

        for report in reports {
            match report.severity {
                Severity::Error | Severity::Fatal => warn!("{script}: {report}"),
                _ => debug!("{script}: {report}"),
            }
        }
        self.reports.insert(script.clone(), reports.to_vec());
    }
}
