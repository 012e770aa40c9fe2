//! GitLab v4 content API used for per-project auxiliary files.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use url::Url;

use crate::error::FetchError;
use crate::net::{HttpClient, Request};

/// Entry of a repository tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    /// `blob` or `tree`.
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

impl TreeEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "blob"
    }
}

/// Read access to files in hosted repositories.
///
/// A missing file or directory is [`FetchError::NotFound`].
pub trait RemoteApi: Send + Sync + fmt::Debug {
    fn file(&self, repo_path: &str, file_path: &str, reference: &str) -> Result<Vec<u8>, FetchError>;

    fn tree(&self, repo_path: &str, directory: &str, reference: &str) -> Result<Vec<TreeEntry>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Clone)]
pub struct GitLabApi {
    api_base: Url,
    token: Option<String>,
    http: HttpClient,
}

impl GitLabApi {
    /// `gitlab` is the instance root, e.g. `https://invent.kde.org/`.
    pub fn new(gitlab: &Url, token: Option<String>, http: HttpClient) -> Result<Self, url::ParseError> {
        Ok(Self {
            api_base: gitlab.join("api/v4/")?,
            token,
            http,
        })
    }

    /// `/projects/<url-encoded repo path>/repository/<segments...>`
    fn endpoint(&self, repo_path: &str, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::Decode {
                url: self.api_base.to_string(),
                message: "GitLab URL cannot be a base".into(),
            })?
            .pop_if_empty()
            .push("projects")
            .push(repo_path)
            .push("repository")
            .extend(segments);
        Ok(url)
    }

    fn request(&self, url: &Url) -> Request {
        let request = Request::get(url.as_str());
        match &self.token {
            Some(token) => request.header("PRIVATE-TOKEN", token.as_str()),
            None => request,
        }
    }
}

impl RemoteApi for GitLabApi {
    fn file(&self, repo_path: &str, file_path: &str, reference: &str) -> Result<Vec<u8>, FetchError> {
        let mut url = self.endpoint(repo_path, &["files", file_path])?;
        url.query_pairs_mut().append_pair("ref", reference);

        let response: FileResponse = self.http.get_json(&self.request(&url))?;
        if !response.encoding.is_empty() && response.encoding != "base64" {
            return Err(FetchError::Decode {
                url: url.to_string(),
                message: format!("unsupported encoding '{}'", response.encoding),
            });
        }

        let content: String = response.content.split_whitespace().collect();
        STANDARD.decode(content).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    fn tree(&self, repo_path: &str, directory: &str, reference: &str) -> Result<Vec<TreeEntry>, FetchError> {
        let mut url = self.endpoint(repo_path, &["tree"])?;
        url.query_pairs_mut()
            .append_pair("path", directory)
            .append_pair("ref", reference)
            .append_pair("per_page", "100");

        self.http.get_json(&self.request(&url))
    }
}
