use std::sync::atomic::{AtomicBool, Ordering};

use speed_core::StoreError;

use crate::backend::ObjectBackend;

/// Cached result of the storage token check.
///
/// The token is verified against the backend once and the result is reused
/// until [`TokenGuard::invalidate`] is called, which the store does whenever
/// the backend answers with [`StoreError::TokenInvalid`].
#[derive(Debug, Default)]
pub struct TokenGuard {
    verified: AtomicBool,
}

impl TokenGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ensure(&self, backend: &dyn ObjectBackend) -> Result<(), StoreError> {
        if self.verified.load(Ordering::Acquire) {
            return Ok(());
        }
        if backend.check_token().await? {
            self.verified.store(true, Ordering::Release);
            tracing::debug!(backend = backend.backend_name(), "Storage token verified");
            Ok(())
        } else {
            tracing::error!(backend = backend.backend_name(), "Storage token rejected");
            Err(StoreError::TokenInvalid)
        }
    }

    pub fn invalidate(&self) {
        if self.verified.swap(false, Ordering::AcqRel) {
            tracing::warn!("Storage token invalidated");
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::Acquire)
    }
}
