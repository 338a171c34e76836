use std::future::Future;
use std::pin::Pin;

use crate::error::StoreError;

/// An opaque reference to a stored artifact, usually a public download link.
pub type ArtifactReference = String;

/// Contract for the durable object store that receives produced reports.
///
/// `store` never overwrites: when `name` is taken the implementation picks a
/// suffixed alternative (`name(1)`, `name(2)`, ...) and gives up with
/// [`StoreError::NameExhausted`] after a bounded number of attempts.
///
/// Uses Pin<Box<dyn Future>> for dyn-compatibility.
pub trait ArtifactStore: Send + Sync {
    fn store<'a>(
        &'a self,
        bytes: &'a [u8],
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ArtifactReference, StoreError>> + Send + 'a>>;

    /// Backend name for logging.
    fn backend_name(&self) -> &str;
}
