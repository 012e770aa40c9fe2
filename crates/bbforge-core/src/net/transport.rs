use std::fmt;
use std::io::Read;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::error::FetchError;

/// Response body handed to the caller for streaming.
pub type Body = Box<dyn Read + Send>;

/// A GET request with optional extra headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Performs exactly one HTTP attempt.
///
/// A 404 maps to [`FetchError::NotFound`], any other non-success status to
/// [`FetchError::Status`]. Retrying is the caller's concern.
pub trait Transport: Send + Sync + fmt::Debug {
    fn get(&self, request: &Request) -> Result<Body, FetchError>;
}

/// Blocking `reqwest` transport with a per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bbforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, request: &Request) -> Result<Body, FetchError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().map_err(|e| FetchError::Transport {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(request.url.clone()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        Ok(Box::new(response))
    }
}
