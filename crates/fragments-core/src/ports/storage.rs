//! Storage backend port: the persistence seam the repository talks through.
//!
//! Metadata records and byte payloads are stored separately, keyed by
//! (owner, fragment id). The repository never assumes the two halves are
//! written atomically, and never assumes more than these six calls.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Fragment, FragmentId, OwnerId};

/// Failure reported by a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not complete the call (I/O, connectivity,
    /// missing key on delete).
    #[error("backend operation failed: {0}")]
    OperationFailed(String),

    /// Metadata exists but its payload could not be produced. A corruption
    /// signal, distinct from "no such fragment".
    #[error("payload missing for a fragment whose metadata exists")]
    PayloadMissing,
}

/// Key-value persistence for fragment metadata and payloads.
///
/// This trait is the swap seam: an in-memory map serves tests and
/// development, a networked object/metadata store serves production, and the
/// choice is made once at process startup.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write (or overwrite) the metadata record for `fragment`'s (owner, id).
    async fn write_metadata(&self, fragment: &Fragment) -> Result<(), BackendError>;

    /// Read the metadata record, or `None` if absent.
    async fn read_metadata(
        &self,
        owner_id: &OwnerId,
        id: FragmentId,
    ) -> Result<Option<Fragment>, BackendError>;

    /// Write (or overwrite) the byte payload for (owner, id).
    async fn write_data(
        &self,
        owner_id: &OwnerId,
        id: FragmentId,
        data: &[u8],
    ) -> Result<(), BackendError>;

    /// Read the byte payload, or `None` if absent.
    async fn read_data(
        &self,
        owner_id: &OwnerId,
        id: FragmentId,
    ) -> Result<Option<Vec<u8>>, BackendError>;

    /// All fragment ids stored for `owner_id`, possibly empty. Order is
    /// backend-defined but stable within one call.
    async fn list_ids(&self, owner_id: &OwnerId) -> Result<Vec<FragmentId>, BackendError>;

    /// Remove both the metadata record and the payload for (owner, id).
    async fn delete(&self, owner_id: &OwnerId, id: FragmentId) -> Result<(), BackendError>;
}
