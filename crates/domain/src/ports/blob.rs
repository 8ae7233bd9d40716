use crate::DomainResult;

/// Opaque blob store for portfolio uploads. Returns a stable URL for the
/// stored object.
pub trait BlobStore: Send + Sync {
    fn store(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> crate::ports::BoxFuture<'_, DomainResult<String>>;
}
