use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::{CancellationToken, ReqwestTransport, Request, RetryPolicy, Transport};
use crate::config::NetworkConfig;
use crate::error::FetchError;

/// HTTP client combining a transport, the retry policy and cancellation.
///
/// Cloning is cheap; clones share the transport and the cancellation flag.
#[derive(Debug, Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl HttpClient {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            transport,
            retry,
            cancel,
        }
    }

    /// Build the production client from `[network]` settings.
    pub fn from_config(network: &NetworkConfig, cancel: CancellationToken) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(Duration::from_secs(network.timeout_secs))?;
        let retry = RetryPolicy::new(
            network.max_retries,
            Duration::from_millis(network.retry_delay_ms),
        );
        Ok(Self::new(Arc::new(transport), retry, cancel))
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fetch the whole body into memory.
    pub fn get_bytes(&self, request: &Request) -> Result<Vec<u8>, FetchError> {
        self.consume(request, |body| {
            let mut buf = Vec::new();
            body.read_to_end(&mut buf)?;
            Ok(buf)
        })
    }

    pub fn get_json<T: DeserializeOwned>(&self, request: &Request) -> Result<T, FetchError> {
        let bytes = self.get_bytes(request)?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode {
            url: request.url.clone(),
            message: e.to_string(),
        })
    }

    /// Stream the body through `sink`.
    ///
    /// Opening the response and draining it form one unit under the retry
    /// policy; `sink` starts from scratch on every attempt. A read error
    /// counts as a transport failure.
    pub fn consume<T>(
        &self,
        request: &Request,
        mut sink: impl FnMut(&mut dyn Read) -> io::Result<T>,
    ) -> Result<T, FetchError> {
        self.retry.run(&self.cancel, &request.url, || {
            let mut body = self.transport.get(request)?;
            sink(&mut body).map_err(|e| FetchError::Transport {
                url: request.url.clone(),
                message: e.to_string(),
            })
        })
    }
}
