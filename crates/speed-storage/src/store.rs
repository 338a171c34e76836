use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use speed_core::{ArtifactReference, ArtifactStore, StoreError};
use tracing::Instrument;

use crate::backend::ObjectBackend;
use crate::naming;
use crate::token::TokenGuard;

/// Default number of names tried per upload (the bare name plus nine suffixes).
pub const DEFAULT_ATTEMPTS: u32 = 10;

/// Default pause between colliding upload attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// How many suffixed names to try, and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Report storage on top of an [`ObjectBackend`].
///
/// Every public operation first passes the [`TokenGuard`]. Files live flat
/// under `base_dir`; uploads never overwrite and fall back to `name(n)`.
pub struct DiskStore {
    backend: Arc<dyn ObjectBackend>,
    base_dir: String,
    policy: CollisionPolicy,
    guard: TokenGuard,
    span: tracing::Span,
}

impl DiskStore {
    pub fn new(backend: Arc<dyn ObjectBackend>, base_dir: impl Into<String>) -> Self {
        Self {
            backend,
            base_dir: base_dir.into(),
            policy: CollisionPolicy::default(),
            guard: TokenGuard::new(),
            span: tracing::Span::none(),
        }
    }

    pub fn with_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    /// Verify the token and create the base directory if it is missing.
    pub async fn connect(&self) -> Result<(), StoreError> {
        async {
            self.ensure_token().await?;
            let exists = self.observe(self.backend.is_dir(&self.base_dir).await)?;
            if !exists {
                match self.backend.mkdir(&self.base_dir).await {
                    Err(StoreError::AlreadyExists(_)) => {}
                    other => self.observe(other)?,
                }
            }
            tracing::info!(
                backend = self.backend.backend_name(),
                base_dir = %self.base_dir,
                "Storage connected"
            );
            Ok::<(), StoreError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Upload `bytes`, renaming on collision. Returns the path actually used.
    pub async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<String, StoreError> {
        self.ensure_token().await?;

        let attempts = self.policy.attempts.max(1);
        for attempt in 0..attempts {
            let path = self.file_path(file_name, attempt);
            match self.backend.upload(&path, bytes).await {
                Ok(()) => {
                    tracing::info!(parent: &self.span, path = %path, size = bytes.len(), "File uploaded");
                    return Ok(path);
                }
                Err(StoreError::AlreadyExists(_)) => {
                    tracing::warn!(parent: &self.span, path = %path, "File already exists");
                }
                Err(e) => return self.observe(Err(e)),
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(self.policy.backoff).await;
            }
        }

        Err(StoreError::NameExhausted {
            name: file_name.to_string(),
            attempts,
        })
    }

    /// Upload and return a public download link.
    pub async fn upload_and_publish(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<ArtifactReference, StoreError> {
        let path = self.upload(bytes, file_name).await?;
        let link = self.observe(self.backend.publish(&path).await)?;
        tracing::info!(parent: &self.span, path = %path, "File published");
        Ok(link)
    }

    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        self.ensure_token().await?;
        self.observe(self.backend.list(&self.base_dir).await)
    }

    pub async fn download(&self, file_name: &str) -> Result<Vec<u8>, StoreError> {
        self.ensure_token().await?;
        let path = self.file_path(file_name, 0);
        self.observe(self.backend.download(&path).await)
    }

    pub async fn remove(&self, file_name: &str) -> Result<(), StoreError> {
        self.ensure_token().await?;
        let path = self.file_path(file_name, 0);
        self.observe(self.backend.remove(&path).await)?;
        tracing::info!(parent: &self.span, path = %path, "File removed");
        Ok(())
    }

    fn file_path(&self, file_name: &str, attempt: u32) -> String {
        naming::join(&self.base_dir, &naming::suffixed(file_name, attempt))
    }

    async fn ensure_token(&self) -> Result<(), StoreError> {
        self.guard.ensure(self.backend.as_ref()).await
    }

    fn observe<T>(&self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        if let Err(StoreError::TokenInvalid) = &result {
            self.guard.invalidate();
        }
        result
    }
}

impl ArtifactStore for DiskStore {
    fn store<'a>(
        &'a self,
        bytes: &'a [u8],
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ArtifactReference, StoreError>> + Send + 'a>> {
        Box::pin(self.upload_and_publish(bytes, name))
    }

    fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }
}
