//! JSON snapshot of the dependency cache.
//!
//! The snapshot lives next to the user's other scriptdeps state (see
//! [`ScriptingSettings::cache_path`](crate::config::ScriptingSettings::cache_path)).
//! It is rewritten atomically after every accepted save, and a snapshot that cannot be
//! parsed is discarded with a warning: resolution repopulates the cache anyway.

use crate::core::ScriptDepsError;
use crate::dependencies::ScriptDependencies;
use crate::script::ScriptIdentity;
use crate::utils::fs::atomic_write;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheSnapshot {
    pub version: u32,
    #[serde(default)]
    pub entries: BTreeMap<ScriptIdentity, SnapshotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SnapshotEntry {
    pub dependencies: ScriptDependencies,
    pub resolved_at: DateTime<Utc>,
}

impl Default for CacheSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl CacheSnapshot {
    /// Read a snapshot, treating a missing file as empty.
    ///
    /// A file that exists but cannot be parsed, or has a different format version,
    /// is reported as [`ScriptDepsError::CacheReadFailed`].
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(ScriptDepsError::CacheReadFailed {
                    path: path.display().to_string(),
                    reason: err.to_string(),
                }
                .into());
            }
        };

        let snapshot: Self = serde_json::from_slice(&data).map_err(|err| {
            ScriptDepsError::CacheReadFailed {
                path: path.display().to_string(),
                reason: err.to_string(),
            }
        })?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ScriptDepsError::CacheReadFailed {
                path: path.display().to_string(),
                reason: format!("unsupported snapshot version {}", snapshot.version),
            }
            .into());
        }

        Ok(snapshot)
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        atomic_write(path, &data).map_err(|err| {
            ScriptDepsError::CacheWriteFailed {
                path: path.display().to_string(),
                reason: format!("{err:#}"),
            }
            .into()
        })
    }
}
