//! Blocking HTTP plumbing shared by the remote content API and the download
//! index: one-attempt transports, a bounded retry policy and cancellation.

mod cancel;
mod client;
mod retry;
mod transport;

pub use cancel::CancellationToken;
pub use client::HttpClient;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use transport::{Body, ReqwestTransport, Request, Transport};
