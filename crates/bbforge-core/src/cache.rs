//! Versioned JSON snapshots in the base directory.
//!
//! Every file is an envelope `{ schema_version, generated_at, data }`. A set
//! of snapshots is committed together: everything is serialized and written
//! to temp files first, and only then renamed into place. A failure while
//! writing leaves every existing file untouched. Renames are atomic per file
//! only; a rename failure midway leaves the files renamed before it replaced.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CacheError;

/// Current on-disk schema. Files with any other version are rejected.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T: Serialize> {
    schema_version: u32,
    generated_at: DateTime<Utc>,
    data: &'a T,
}

#[derive(Deserialize)]
struct RawEnvelope {
    schema_version: u32,
    data: serde_json::Value,
}

/// A serialized snapshot waiting to be committed.
#[derive(Debug, Clone)]
pub struct PendingSnapshot {
    name: String,
    bytes: Vec<u8>,
}

impl PendingSnapshot {
    pub fn encode<T: Serialize>(name: impl Into<String>, data: &T) -> Result<Self, CacheError> {
        let name = name.into();
        let envelope = EnvelopeRef {
            schema_version: CACHE_SCHEMA_VERSION,
            generated_at: Utc::now(),
            data,
        };
        let bytes = serde_json::to_vec_pretty(&envelope).map_err(|source| CacheError::Encode {
            name: name.clone(),
            source,
        })?;
        Ok(Self { name, bytes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Snapshot files under a single directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Load a snapshot. A missing file is `Ok(None)`.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CacheError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read(&path).map_err(|source| CacheError::Read {
            path: path.clone(),
            source,
        })?;
        let envelope: RawEnvelope =
            serde_json::from_slice(&content).map_err(|source| CacheError::Decode {
                path: path.clone(),
                source,
            })?;

        if envelope.schema_version != CACHE_SCHEMA_VERSION {
            return Err(CacheError::SchemaMismatch {
                path,
                found: envelope.schema_version,
                expected: CACHE_SCHEMA_VERSION,
            });
        }

        let data = serde_json::from_value(envelope.data)
            .map_err(|source| CacheError::Decode { path, source })?;
        Ok(Some(data))
    }

    /// Write a single snapshot.
    pub fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<(), CacheError> {
        self.commit(vec![PendingSnapshot::encode(name, data)?])
    }

    /// Commit a set of snapshots: write every temp file, then rename them all.
    ///
    /// If any temp write fails, the temp files written so far are removed and
    /// no existing snapshot is touched. If a rename fails, targets renamed
    /// before it keep their new content and the remaining temp files are
    /// removed.
    pub fn commit(&self, snapshots: Vec<PendingSnapshot>) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            let target = self.path_for(&snapshot.name);
            let temp = self.dir.join(format!(".{}.tmp.{}", snapshot.name, std::process::id()));
            if let Err(source) = fs::write(&temp, &snapshot.bytes) {
                for (written, _) in &staged {
                    let _ = fs::remove_file(written);
                }
                return Err(CacheError::Write { path: temp, source });
            }
            staged.push((temp, target));
        }

        let mut staged = staged.into_iter();
        while let Some((temp, target)) = staged.next() {
            if let Err(source) = fs::rename(&temp, &target) {
                let _ = fs::remove_file(&temp);
                for (pending, _) in staged {
                    let _ = fs::remove_file(pending);
                }
                return Err(CacheError::Write { path: target, source });
            }
            debug!(path = %target.display(), "Committed cache snapshot");
        }

        Ok(())
    }
}
