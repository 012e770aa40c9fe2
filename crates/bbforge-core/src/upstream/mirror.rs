//! Local git mirror of the metadata repository.

use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{Repository, build::RepoBuilder};
use tracing::{debug, info, warn};

use crate::error::FatalError;

#[derive(Debug, Clone)]
pub struct MetadataMirror {
    url: String,
    path: PathBuf,
}

impl MetadataMirror {
    /// The directory is `<name>-<digest of url>` under `base_dir`, so changing
    /// the repository URL never reuses another repository's mirror.
    pub fn new(url: impl Into<String>, base_dir: &Path, name: &str) -> Self {
        let url = url.into();
        let digest = blake3::hash(url.as_bytes()).to_hex();
        let path = base_dir.join(format!("{name}-{}", &digest.as_str()[..12]));
        Self { url, path }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the mirror, or clone it when absent.
    ///
    /// An existing mirror is fast-forwarded on a best-effort basis; failing to
    /// update only logs a warning.
    pub fn sync(&self) -> Result<(), FatalError> {
        match Repository::open(&self.path) {
            Ok(repo) => {
                debug!(path = %self.path.display(), "Opened metadata mirror");
                if let Err(e) = self.fast_forward(&repo) {
                    warn!(url = %self.url, error = %e, "Failed to update metadata mirror, using existing checkout");
                }
                Ok(())
            }
            Err(open_err) => {
                debug!(path = %self.path.display(), error = %open_err, "No usable mirror, cloning");
                info!(url = %self.url, "Cloning metadata repository");
                RepoBuilder::new()
                    .clone(&self.url, &self.path)
                    .map_err(|source| FatalError::Mirror {
                        url: self.url.clone(),
                        path: self.path.clone(),
                        source,
                    })?;
                Ok(())
            }
        }
    }

    fn fast_forward(&self, repo: &Repository) -> Result<(), git2::Error> {
        let head = repo.head()?;
        let refname = head
            .name()
            .ok_or_else(|| git2::Error::from_str("HEAD is not a named reference"))?
            .to_string();
        let branch = head.shorthand().unwrap_or("HEAD").to_string();

        let mut remote = repo.find_remote("origin")?;
        remote.fetch(&[branch.as_str()], None, None)?;

        let fetch_head = repo.find_reference("FETCH_HEAD")?;
        let incoming = repo.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = repo.merge_analysis(&[&incoming])?;

        if analysis.is_up_to_date() {
            debug!(branch = %branch, "Metadata mirror is up to date");
            return Ok(());
        }
        if !analysis.is_fast_forward() {
            return Err(git2::Error::from_str("local mirror has diverged from origin"));
        }

        let mut reference = repo.find_reference(&refname)?;
        reference.set_target(incoming.id(), "bbforge: fast-forward metadata mirror")?;
        repo.set_head(&refname)?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
        info!(branch = %branch, commit = %incoming.id(), "Updated metadata mirror");
        Ok(())
    }
}
