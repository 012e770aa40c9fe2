use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::FetchError;

/// Shared cancellation flag checked by long-running operations.
///
/// Clones observe the same flag. The CLI hands [`CancellationToken::flag`] to
/// a signal handler so an interrupt stops a refresh between calls.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// The underlying flag, for registration with signal handlers.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Fail with [`FetchError::Cancelled`] once cancellation was requested.
    pub fn check(&self) -> Result<(), FetchError> {
        if self.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }
}
