//! Resolved dependency sets and resolution outcomes.
//!
//! A resolver turns a script's configuration into a [`ResolveResult`]: an optional
//! [`ScriptDependencies`] plus an ordered list of [`ScriptReport`] diagnostics. A result
//! without dependencies is a failure; its reports explain why.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// The external roots and metadata resolved for one script.
///
/// Equality is structural and order-sensitive; use
/// [`ScriptDefinition::adjust`](crate::script::ScriptDefinition::adjust) to bring a raw
/// resolver result into canonical form before comparing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDependencies {
    /// JDK or runtime home used to run the script, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_home: Option<PathBuf>,
    /// Binary classpath roots
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    /// Default imports added to the script
    #[serde(default)]
    pub imports: Vec<String>,
    /// Source roots for the classpath entries
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Other scripts this script includes
    #[serde(default)]
    pub scripts: Vec<PathBuf>,
}

impl ScriptDependencies {
    /// Dependencies consisting only of the given classpath roots.
    pub fn with_classpath<I, P>(classpath: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            classpath: classpath.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Every root that needs indexing: classpath followed by sources.
    pub fn roots(&self) -> impl Iterator<Item = &PathBuf> {
        self.classpath.iter().chain(self.sources.iter())
    }

    /// Remove repeated entries, keeping the first occurrence of each.
    pub fn dedup(&mut self) {
        dedup_in_place(&mut self.classpath);
        dedup_in_place(&mut self.imports);
        dedup_in_place(&mut self.sources);
        dedup_in_place(&mut self.scripts);
    }
}

fn dedup_in_place<T: Clone + Eq + std::hash::Hash>(items: &mut Vec<T>) {
    let mut seen = HashSet::with_capacity(items.len());
    items.retain(|item| seen.insert(item.clone()));
}

/// Severity of a [`ScriptReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Debug output from the resolver
    Debug,
    /// Informational message
    Info,
    /// Something looks off but resolution continued
    Warning,
    /// Resolution failed or produced an unusable result
    Error,
    /// The resolver crashed
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// A location inside a script, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

/// One diagnostic produced while resolving a script's dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptReport {
    /// Human-readable message
    pub message: String,
    /// Severity
    pub severity: Severity,
    /// Where in the script the diagnostic applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl ScriptReport {
    /// Create a report without a position.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            position: None,
        }
    }

    /// Shorthand for an [`Severity::Error`] report.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Shorthand for a [`Severity::Warning`] report.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Attach a position.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.position = Some(Position { line, column });
        self
    }
}

impl fmt::Display for ScriptReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(Position { line, column }) => {
                write!(f, "{}: {} ({line}:{column})", self.severity, self.message)
            }
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Outcome of one resolution attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveResult {
    /// The resolved set, absent when resolution failed
    pub dependencies: Option<ScriptDependencies>,
    /// Diagnostics in the order the resolver produced them
    pub reports: Vec<ScriptReport>,
}

impl ResolveResult {
    /// A successful resolution.
    pub fn success(dependencies: ScriptDependencies, reports: Vec<ScriptReport>) -> Self {
        Self {
            dependencies: Some(dependencies),
            reports,
        }
    }

    /// A failed resolution; only reports are available.
    pub fn failure(reports: Vec<ScriptReport>) -> Self {
        Self {
            dependencies: None,
            reports,
        }
    }

    /// Whether this result carries no dependency set.
    pub fn is_failure(&self) -> bool {
        self.dependencies.is_none()
    }

    /// Reports normalized so that "no reports" has a single representation.
    ///
    /// An empty list and an absent list compare equal after this.
    pub fn reports_or_none(&self) -> Option<&[ScriptReport]> {
        normalize_reports(&self.reports)
    }
}

/// `None` for an empty slice, `Some` otherwise.
pub fn normalize_reports(reports: &[ScriptReport]) -> Option<&[ScriptReport]> {
    if reports.is_empty() { None } else { Some(reports) }
}
