//! Index of released source tarballs on the download mirror.
//!
//! Built from the mirror's plain-text recursive listing (`ls -lR`). Directory
//! headers set the current directory; regular file lines named
//! `<name>-<version>.tar.<ext>` record where that release lives.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, trace};

use crate::config::DownloadConfig;
use crate::error::IndexError;
use crate::net::{HttpClient, Request};

static DIRECTORY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\./)?(.+):$").expect("valid directory regex"));

static ARCHIVE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^dl].* ((.*)-(.*)\.tar\.(bz2|xz|gz))$").expect("valid archive regex")
});

/// (package name, version) to a path relative to the mirror base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadIndex {
    base_url: String,
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl DownloadIndex {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Parse a recursive listing. Later entries for the same release replace
    /// earlier ones. Lines that are not valid UTF-8 are decoded lossily, so a
    /// single odd file name never rejects the listing.
    pub fn from_listing(
        mut reader: impl BufRead,
        base_url: impl Into<String>,
        strip_prefix: &str,
    ) -> io::Result<Self> {
        let mut index = Self::new(base_url);
        let mut current_dir = String::new();
        let mut raw = Vec::new();

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            let decoded = String::from_utf8_lossy(&raw);
            if let Cow::Owned(_) = decoded {
                trace!(line = %decoded.trim_end(), "Listing line is not valid UTF-8");
            }
            let line = decoded.trim_end_matches(['\n', '\r']);

            if let Some(caps) = DIRECTORY_LINE.captures(line) {
                let dir = &caps[2];
                current_dir = dir.strip_prefix(strip_prefix).unwrap_or(dir).to_string();
                continue;
            }

            if let Some(caps) = ARCHIVE_LINE.captures(line) {
                let path = if current_dir.is_empty() {
                    caps[1].to_string()
                } else {
                    format!("{}/{}", current_dir.trim_end_matches('/'), &caps[1])
                };
                index.insert(&caps[2], &caps[3], path);
            }
        }

        Ok(index)
    }

    /// Download and parse the listing named in `[download]`.
    pub fn refresh(http: &HttpClient, config: &DownloadConfig) -> Result<Self, IndexError> {
        info!(url = %config.listing_url, "Refreshing download index");
        let request = Request::get(&config.listing_url);
        let index = http
            .consume(&request, |body| {
                Self::from_listing(io::BufReader::new(body), &config.base_url, &config.strip_prefix)
            })
            .map_err(|source| IndexError::Network {
                url: config.listing_url.clone(),
                source,
            })?;
        info!(releases = index.len(), "Download index refreshed");
        Ok(index)
    }

    pub fn insert(&mut self, name: &str, version: &str, path: String) {
        let versions = self.entries.entry(name.to_string()).or_default();
        if let Some(previous) = versions.insert(version.to_string(), path) {
            debug!(name, version, previous = %previous, "Replacing duplicate download entry");
        }
    }

    /// Number of (name, version) entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a release artifact.
    pub fn resolve(&self, name: &str, version: &str) -> Result<String, IndexError> {
        let path = self
            .entries
            .get(name)
            .and_then(|versions| versions.get(version))
            .ok_or_else(|| IndexError::NotFound {
                name: name.to_string(),
                version: version.to_string(),
            })?;
        Ok(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    /// SHA-256 of a release artifact, streamed through the hasher.
    pub fn checksum_of(
        &self,
        http: &HttpClient,
        name: &str,
        version: &str,
    ) -> Result<String, IndexError> {
        let url = self.resolve(name, version)?;
        debug!(%url, "Computing artifact checksum");

        let digest = http
            .consume(&Request::get(&url), |body| {
                let mut hasher = Sha256::new();
                io::copy(body, &mut hasher)?;
                Ok(hasher.finalize())
            })
            .map_err(|source| IndexError::Network {
                url: url.clone(),
                source,
            })?;

        Ok(hex::encode(digest))
    }
}
