//! Error handling for scriptdeps
//!
//! Resolution failures are not errors in this crate: a resolver that fails produces a
//! [`ResolveResult`](crate::dependencies::ResolveResult) with no dependencies and an
//! error report, and that result flows through the normal reconciliation path. The
//! types in this module cover what is left:
//!
//! - [`ScriptDepsError`] - strongly-typed failures of the surrounding machinery
//!   (cache snapshots, configuration, missing services)
//! - [`ErrorContext`] - wrapper that adds a suggestion and details for the host to
//!   display
//!
//! # Examples
//!
//! ```rust,no_run
//! use scriptdeps::core::{ScriptDepsError, ErrorContext};
//!
//! let context = ErrorContext::new(ScriptDepsError::ServiceMissing {
//!     service: "DependenciesCache".to_string(),
//! })
//! .with_suggestion("Register a cache with ScriptServices::builder()");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for scriptdeps operations.
#[derive(Error, Debug)]
pub enum ScriptDepsError {
    /// A required collaborator was not provided when building the services.
    ///
    /// This is a programmer error. It is fatal and never retried.
    #[error("Required service is missing: {service}")]
    ServiceMissing {
        /// Name of the missing service
        service: String,
    },

    /// The owning project was disposed before the operation ran
    #[error("Project has been disposed")]
    ProjectDisposed,

    /// Script content could not be read
    #[error("Failed to load script content from {path}: {reason}")]
    ContentLoadFailed {
        /// Path of the script
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// A resolver returned an error instead of a result
    ///
    /// Only ever rendered into an error report; it never escapes to callers of
    /// [`LoaderRegistry::request_update`](crate::loader::LoaderRegistry::request_update).
    #[error("Dependency resolution failed for {script}: {reason}")]
    ResolutionFailed {
        /// Path of the script being resolved
        script: String,
        /// Resolver-provided reason
        reason: String,
    },

    /// The persistent cache snapshot could not be read
    #[error("Failed to read dependency cache from {path}: {reason}")]
    CacheReadFailed {
        /// Snapshot path
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// The persistent cache snapshot could not be written
    #[error("Failed to write dependency cache to {path}: {reason}")]
    CacheWriteFailed {
        /// Snapshot path
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl ScriptDepsError {
    /// Whether this error signals a programming mistake rather than a runtime condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScriptDepsError::ServiceMissing { .. })
    }
}

/// An error together with an optional suggestion and extra details.
///
/// Hosts use this to render a failure to the user; the crate itself only builds
/// them, it never prints on its own.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ScriptDepsError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    pub fn new(error: ScriptDepsError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// Errors that are not a [`ScriptDepsError`] are wrapped as a configuration error
/// carrying the full context chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    match error.downcast::<ScriptDepsError>() {
        Ok(err) => {
            let suggestion = match &err {
                ScriptDepsError::ServiceMissing { .. } => {
                    Some("Provide every collaborator when building ScriptServices")
                }
                ScriptDepsError::CacheReadFailed { .. } => {
                    Some("Delete the dependency cache snapshot; it is rebuilt on the next resolution")
                }
                ScriptDepsError::TomlError(_) | ScriptDepsError::ConfigError { .. } => {
                    Some("Check the syntax of ~/.scriptdeps/config.toml")
                }
                _ => None,
            };
            let context = ErrorContext::new(err);
            match suggestion {
                Some(suggestion) => context.with_suggestion(suggestion),
                None => context,
            }
        }
        Err(other) => ErrorContext::new(ScriptDepsError::ConfigError {
            message: format!("{other:#}"),
        }),
    }
}
