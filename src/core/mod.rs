//! Core types shared across scriptdeps.
//!
//! At the moment this is the error layer; see [`error`].

pub mod error;

pub use error::{user_friendly_error, ErrorContext, ScriptDepsError};
