//! In-memory storage backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Fragment, FragmentId, OwnerId};
use crate::ports::storage::{BackendError, StorageBackend};

/// One owner's stored fragments. Metadata and payloads are held in separate
/// maps because the storage contract allows either half to exist without the
/// other mid-write.
#[derive(Debug, Default)]
struct OwnerState {
    metadata: HashMap<FragmentId, Fragment>,
    /// Metadata insertion order, so listings are stable.
    order: Vec<FragmentId>,
    data: HashMap<FragmentId, Vec<u8>>,
}

/// In-memory [`StorageBackend`] for tests and development.
///
/// A single lock over all owners is plenty at this scale; contention is a
/// production-backend concern.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    owners: Mutex<HashMap<OwnerId, OwnerState>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn write_metadata(&self, fragment: &Fragment) -> Result<(), BackendError> {
        let mut owners = self.owners.lock().await;
        let state = owners.entry(fragment.owner_id().clone()).or_default();
        if state
            .metadata
            .insert(fragment.id(), fragment.clone())
            .is_none()
        {
            state.order.push(fragment.id());
        }
        Ok(())
    }

    async fn read_metadata(
        &self,
        owner_id: &OwnerId,
        id: FragmentId,
    ) -> Result<Option<Fragment>, BackendError> {
        let owners = self.owners.lock().await;
        Ok(owners
            .get(owner_id)
            .and_then(|state| state.metadata.get(&id))
            .cloned())
    }

    async fn write_data(
        &self,
        owner_id: &OwnerId,
        id: FragmentId,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let mut owners = self.owners.lock().await;
        let state = owners.entry(owner_id.clone()).or_default();
        state.data.insert(id, data.to_vec());
        Ok(())
    }

    async fn read_data(
        &self,
        owner_id: &OwnerId,
        id: FragmentId,
    ) -> Result<Option<Vec<u8>>, BackendError> {
        let owners = self.owners.lock().await;
        Ok(owners
            .get(owner_id)
            .and_then(|state| state.data.get(&id))
            .cloned())
    }

    async fn list_ids(&self, owner_id: &OwnerId) -> Result<Vec<FragmentId>, BackendError> {
        let owners = self.owners.lock().await;
        Ok(owners
            .get(owner_id)
            .map(|state| state.order.clone())
            .unwrap_or_default())
    }

    async fn delete(&self, owner_id: &OwnerId, id: FragmentId) -> Result<(), BackendError> {
        let mut owners = self.owners.lock().await;
        let state = owners.get_mut(owner_id).ok_or_else(|| {
            BackendError::OperationFailed(format!("no fragments stored for owner {owner_id}"))
        })?;
        if state.metadata.remove(&id).is_none() {
            return Err(BackendError::OperationFailed(format!(
                "no fragment {id} for owner {owner_id}"
            )));
        }
        state.order.retain(|&listed| listed != id);
        state.data.remove(&id);
        Ok(())
    }
}
