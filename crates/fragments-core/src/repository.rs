//! Owner-scoped fragment operations over a storage backend.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, error, info, warn};

use crate::domain::{Fragment, FragmentError, FragmentId, OwnerId, StorageStep};
use crate::ports::clock::Clock;
use crate::ports::storage::{BackendError, StorageBackend};

/// Result of a listing: bare ids, or fully hydrated fragments when the
/// caller asked for expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Ids(Vec<FragmentId>),
    Fragments(Vec<Fragment>),
}

/// Owner-scoped operations over stored fragments.
///
/// Holds no cross-call state of its own: every call re-reads through the
/// backend, so calls from different owners or tasks can run concurrently
/// without coordination. The two-step `set_data` write is deliberately not
/// transactional; see the method docs.
pub struct FragmentRepository {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
}

impl FragmentRepository {
    pub fn new(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// List fragments for `owner_id`: ids in backend order, or each one
    /// hydrated when `expand` is set. Hydration fans out one backend read
    /// per id concurrently; results come back one per listed id. An owner
    /// with no fragments gets an empty listing, not an error.
    pub async fn list_by_owner(
        &self,
        owner_id: &OwnerId,
        expand: bool,
    ) -> Result<Listing, FragmentError> {
        debug!(owner = %owner_id, expand, "listing fragments for owner");
        let ids = self
            .backend
            .list_ids(owner_id)
            .await
            .map_err(|source| storage(StorageStep::Metadata, source))?;

        if !expand {
            debug!(count = ids.len(), "returning fragment ids");
            return Ok(Listing::Ids(ids));
        }

        let fragments =
            try_join_all(ids.iter().map(|&id| self.get_by_id(owner_id, id))).await?;
        info!(owner = %owner_id, count = fragments.len(), "expanded fragments for owner");
        Ok(Listing::Fragments(fragments))
    }

    /// Fetch one fragment's metadata, scoped to its owner.
    pub async fn get_by_id(
        &self,
        owner_id: &OwnerId,
        id: FragmentId,
    ) -> Result<Fragment, FragmentError> {
        debug!(owner = %owner_id, fragment = %id, "getting fragment by id");
        let record = self
            .backend
            .read_metadata(owner_id, id)
            .await
            .map_err(|source| storage(StorageStep::Metadata, source))?;

        match record {
            Some(fragment) => Ok(fragment),
            None => {
                warn!(owner = %owner_id, fragment = %id, "fragment not found");
                Err(FragmentError::NotFound {
                    owner: owner_id.clone(),
                    id,
                })
            }
        }
    }

    /// Persist `fragment`'s metadata, refreshing `updated` first.
    ///
    /// On backend failure the in-memory fragment keeps its new `updated`
    /// timestamp: the caller is holding a dirty entity and decides whether
    /// to retry or discard it.
    pub async fn save(&self, fragment: &mut Fragment) -> Result<(), FragmentError> {
        fragment.touch(self.clock.now());
        debug!(fragment = %fragment.id(), "saving fragment metadata");
        self.backend
            .write_metadata(fragment)
            .await
            .map_err(|source| {
                error!(fragment = %fragment.id(), %source, "error saving fragment metadata");
                storage(StorageStep::Metadata, source)
            })?;
        info!(fragment = %fragment.id(), "fragment metadata saved");
        Ok(())
    }

    /// Read the fragment's payload.
    ///
    /// Metadata without a readable payload is corruption, reported as a
    /// storage failure rather than `NotFound`.
    pub async fn get_data(&self, fragment: &Fragment) -> Result<Vec<u8>, FragmentError> {
        debug!(fragment = %fragment.id(), "getting fragment data");
        let data = self
            .backend
            .read_data(fragment.owner_id(), fragment.id())
            .await
            .map_err(|source| storage(StorageStep::Data, source))?;

        data.ok_or_else(|| {
            error!(fragment = %fragment.id(), "fragment metadata exists but payload is missing");
            storage(StorageStep::Data, BackendError::PayloadMissing)
        })
    }

    /// Attach `data` to the fragment: refresh `updated`, recompute `size`
    /// from the byte length, write the metadata, then write the payload.
    ///
    /// The two writes are not atomic and there is no rollback. If the
    /// metadata write lands and the payload write fails, the stored metadata
    /// is ahead of the stored bytes; the error's step says which write
    /// failed so the caller can retry or reconcile.
    pub async fn set_data(
        &self,
        fragment: &mut Fragment,
        data: &[u8],
    ) -> Result<(), FragmentError> {
        if data.is_empty() {
            warn!(fragment = %fragment.id(), "attempt to set empty data");
            return Err(FragmentError::InvalidArgument("data must not be empty"));
        }

        fragment.touch(self.clock.now());
        fragment.set_size(data.len() as u64);
        debug!(fragment = %fragment.id(), size = fragment.size(), "setting fragment data");

        self.backend
            .write_metadata(fragment)
            .await
            .map_err(|source| {
                error!(fragment = %fragment.id(), %source, "error writing metadata for data update");
                storage(StorageStep::Metadata, source)
            })?;
        self.backend
            .write_data(fragment.owner_id(), fragment.id(), data)
            .await
            .map_err(|source| {
                error!(fragment = %fragment.id(), %source, "error writing payload; stored metadata is now ahead of stored data");
                storage(StorageStep::Data, source)
            })?;

        info!(fragment = %fragment.id(), size = fragment.size(), "fragment data saved");
        Ok(())
    }

    /// Remove the metadata record and the payload for (owner, id).
    ///
    /// One logical operation from the caller's perspective; if the backend
    /// fails partway it may have removed one artifact and not the other,
    /// and that surfaces as an error rather than being hidden.
    pub async fn delete_by_id(
        &self,
        owner_id: &OwnerId,
        id: FragmentId,
    ) -> Result<(), FragmentError> {
        debug!(owner = %owner_id, fragment = %id, "deleting fragment");
        self.backend
            .delete(owner_id, id)
            .await
            .map_err(|source| {
                error!(owner = %owner_id, fragment = %id, %source, "error deleting fragment");
                storage(StorageStep::Delete, source)
            })?;
        info!(owner = %owner_id, fragment = %id, "fragment deleted");
        Ok(())
    }
}

fn storage(step: StorageStep, source: BackendError) -> FragmentError {
    FragmentError::Storage { step, source }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::domain::ContentTypeRegistry;
    use crate::impls::InMemoryBackend;
    use crate::ports::clock::FixedClock;

    /// Wraps the in-memory backend and fails selected calls, to exercise the
    /// non-atomic write window.
    struct FailingBackend {
        inner: InMemoryBackend,
        fail_metadata_writes: AtomicBool,
        fail_data_writes: AtomicBool,
    }

    impl FailingBackend {
        fn new() -> Self {
            Self {
                inner: InMemoryBackend::new(),
                fail_metadata_writes: AtomicBool::new(false),
                fail_data_writes: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl StorageBackend for FailingBackend {
        async fn write_metadata(&self, fragment: &Fragment) -> Result<(), BackendError> {
            if self.fail_metadata_writes.load(Ordering::Relaxed) {
                return Err(BackendError::OperationFailed("injected failure".into()));
            }
            self.inner.write_metadata(fragment).await
        }

        async fn read_metadata(
            &self,
            owner_id: &OwnerId,
            id: FragmentId,
        ) -> Result<Option<Fragment>, BackendError> {
            self.inner.read_metadata(owner_id, id).await
        }

        async fn write_data(
            &self,
            owner_id: &OwnerId,
            id: FragmentId,
            data: &[u8],
        ) -> Result<(), BackendError> {
            if self.fail_data_writes.load(Ordering::Relaxed) {
                return Err(BackendError::OperationFailed("injected failure".into()));
            }
            self.inner.write_data(owner_id, id, data).await
        }

        async fn read_data(
            &self,
            owner_id: &OwnerId,
            id: FragmentId,
        ) -> Result<Option<Vec<u8>>, BackendError> {
            self.inner.read_data(owner_id, id).await
        }

        async fn list_ids(&self, owner_id: &OwnerId) -> Result<Vec<FragmentId>, BackendError> {
            self.inner.list_ids(owner_id).await
        }

        async fn delete(&self, owner_id: &OwnerId, id: FragmentId) -> Result<(), BackendError> {
            self.inner.delete(owner_id, id).await
        }
    }

    fn registry() -> ContentTypeRegistry {
        ContentTypeRegistry::default()
    }

    fn owner() -> OwnerId {
        OwnerId::new("user123").unwrap()
    }

    fn fixed_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn repository(clock: Arc<FixedClock>) -> FragmentRepository {
        FragmentRepository::new(Arc::new(InMemoryBackend::new()), clock)
    }

    fn fragment(owner_id: &OwnerId, clock: &FixedClock) -> Fragment {
        Fragment::new(owner_id.clone(), "text/plain", &registry(), clock.now()).unwrap()
    }

    #[tokio::test]
    async fn set_data_then_get_data_round_trips() {
        let clock = fixed_clock();
        let repo = repository(clock.clone());
        let owner = owner();
        let mut fragment = fragment(&owner, &clock);

        repo.set_data(&mut fragment, b"hello fragments").await.unwrap();

        assert_eq!(fragment.size(), b"hello fragments".len() as u64);
        let data = repo.get_data(&fragment).await.unwrap();
        assert_eq!(data, b"hello fragments");
    }

    #[tokio::test]
    async fn set_data_refreshes_updated_and_size() {
        let clock = fixed_clock();
        let repo = repository(clock.clone());
        let owner = owner();
        let mut fragment = fragment(&owner, &clock);
        let created = fragment.created();

        clock.advance(Duration::seconds(10));
        repo.set_data(&mut fragment, b"12345").await.unwrap();

        assert_eq!(fragment.size(), 5);
        assert_eq!(fragment.created(), created);
        assert_eq!(fragment.updated(), created + Duration::seconds(10));

        // The stored record matches the in-memory entity.
        let stored = repo.get_by_id(&owner, fragment.id()).await.unwrap();
        assert_eq!(stored, fragment);
    }

    #[tokio::test]
    async fn set_data_rejects_empty_payload() {
        let clock = fixed_clock();
        let repo = repository(clock.clone());
        let owner = owner();
        let mut fragment = fragment(&owner, &clock);

        let err = repo.set_data(&mut fragment, b"").await.unwrap_err();
        assert!(matches!(err, FragmentError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn save_refreshes_updated_and_nothing_else() {
        let clock = fixed_clock();
        let repo = repository(clock.clone());
        let owner = owner();
        let mut fragment = fragment(&owner, &clock);
        repo.set_data(&mut fragment, b"stable").await.unwrap();

        clock.advance(Duration::seconds(1));
        repo.save(&mut fragment).await.unwrap();
        let first_updated = fragment.updated();

        clock.advance(Duration::seconds(1));
        repo.save(&mut fragment).await.unwrap();

        // Saving twice with no intervening mutation moves `updated` both
        // times and leaves every other field identical.
        assert!(fragment.updated() > first_updated);
        let stored = repo.get_by_id(&owner, fragment.id()).await.unwrap();
        assert_eq!(stored.id(), fragment.id());
        assert_eq!(stored.size(), fragment.size());
        assert_eq!(stored.created(), fragment.created());
        assert_eq!(stored.content_type(), fragment.content_type());
    }

    #[tokio::test]
    async fn listing_reflects_writes_deletes_and_owner_isolation() {
        let clock = fixed_clock();
        let repo = repository(clock.clone());
        let alice = OwnerId::new("alice").unwrap();
        let bob = OwnerId::new("bob").unwrap();

        let mut kept = fragment(&alice, &clock);
        let mut dropped = fragment(&alice, &clock);
        let mut bobs = fragment(&bob, &clock);
        repo.set_data(&mut kept, b"kept").await.unwrap();
        repo.set_data(&mut dropped, b"dropped").await.unwrap();
        repo.set_data(&mut bobs, b"bobs").await.unwrap();

        repo.delete_by_id(&alice, dropped.id()).await.unwrap();

        assert_eq!(
            repo.list_by_owner(&alice, false).await.unwrap(),
            Listing::Ids(vec![kept.id()])
        );
        assert_eq!(
            repo.list_by_owner(&bob, false).await.unwrap(),
            Listing::Ids(vec![bobs.id()])
        );
    }

    #[tokio::test]
    async fn listing_an_unknown_owner_is_empty_not_an_error() {
        let clock = fixed_clock();
        let repo = repository(clock);

        let listing = repo
            .list_by_owner(&OwnerId::new("nobody").unwrap(), false)
            .await
            .unwrap();
        assert_eq!(listing, Listing::Ids(vec![]));

        let expanded = repo
            .list_by_owner(&OwnerId::new("nobody").unwrap(), true)
            .await
            .unwrap();
        assert_eq!(expanded, Listing::Fragments(vec![]));
    }

    #[tokio::test]
    async fn expanded_listing_hydrates_one_fragment_per_id() {
        let clock = fixed_clock();
        let repo = repository(clock.clone());
        let owner = owner();

        let mut first = fragment(&owner, &clock);
        let mut second = fragment(&owner, &clock);
        repo.set_data(&mut first, b"first").await.unwrap();
        repo.set_data(&mut second, b"second").await.unwrap();

        let Listing::Ids(ids) = repo.list_by_owner(&owner, false).await.unwrap() else {
            panic!("expected ids");
        };
        let Listing::Fragments(fragments) = repo.list_by_owner(&owner, true).await.unwrap()
        else {
            panic!("expected fragments");
        };

        assert_eq!(fragments.len(), ids.len());
        for id in ids {
            assert_eq!(fragments.iter().filter(|f| f.id() == id).count(), 1);
        }
    }

    #[tokio::test]
    async fn deleted_fragments_are_gone_from_every_path() {
        let clock = fixed_clock();
        let repo = repository(clock.clone());
        let owner = owner();
        let mut fragment = fragment(&owner, &clock);
        repo.set_data(&mut fragment, b"short lived").await.unwrap();

        repo.delete_by_id(&owner, fragment.id()).await.unwrap();

        let err = repo.get_by_id(&owner, fragment.id()).await.unwrap_err();
        assert!(matches!(err, FragmentError::NotFound { .. }));

        let err = repo.get_data(&fragment).await.unwrap_err();
        assert!(matches!(err, FragmentError::Storage { .. }));
    }

    #[tokio::test]
    async fn get_data_without_payload_is_a_storage_error_not_not_found() {
        let clock = fixed_clock();
        let repo = repository(clock.clone());
        let owner = owner();
        let mut fragment = fragment(&owner, &clock);

        // Metadata only; no data was ever attached.
        repo.save(&mut fragment).await.unwrap();

        let err = repo.get_data(&fragment).await.unwrap_err();
        assert!(matches!(
            err,
            FragmentError::Storage {
                step: StorageStep::Data,
                source: BackendError::PayloadMissing,
            }
        ));
    }

    #[tokio::test]
    async fn failed_payload_write_leaves_metadata_ahead_of_data() {
        let clock = fixed_clock();
        let backend = Arc::new(FailingBackend::new());
        let repo = FragmentRepository::new(backend.clone(), clock.clone());
        let owner = owner();
        let mut fragment = fragment(&owner, &clock);
        repo.set_data(&mut fragment, b"v1").await.unwrap();

        backend.fail_data_writes.store(true, Ordering::Relaxed);
        clock.advance(Duration::seconds(30));
        let err = repo.set_data(&mut fragment, b"v2 is longer").await.unwrap_err();

        assert!(matches!(
            err,
            FragmentError::Storage {
                step: StorageStep::Data,
                ..
            }
        ));

        // The inconsistency window is real and observable: stored metadata
        // already claims the new size while the payload is still v1.
        let stored = repo.get_by_id(&owner, fragment.id()).await.unwrap();
        assert_eq!(stored.size(), b"v2 is longer".len() as u64);
        let data = repo.get_data(&stored).await.unwrap();
        assert_eq!(data, b"v1");
    }

    #[tokio::test]
    async fn failed_metadata_write_fails_the_whole_set_data() {
        let clock = fixed_clock();
        let backend = Arc::new(FailingBackend::new());
        let repo = FragmentRepository::new(backend.clone(), clock.clone());
        let owner = owner();
        let mut fragment = fragment(&owner, &clock);

        backend.fail_metadata_writes.store(true, Ordering::Relaxed);
        let err = repo.set_data(&mut fragment, b"never lands").await.unwrap_err();

        assert!(matches!(
            err,
            FragmentError::Storage {
                step: StorageStep::Metadata,
                ..
            }
        ));
        // Nothing was stored for this fragment.
        let err = repo.get_by_id(&owner, fragment.id()).await.unwrap_err();
        assert!(matches!(err, FragmentError::NotFound { .. }));
    }

    #[tokio::test]
    async fn failed_save_leaves_the_entity_dirty() {
        let clock = fixed_clock();
        let backend = Arc::new(FailingBackend::new());
        let repo = FragmentRepository::new(backend.clone(), clock.clone());
        let owner = owner();
        let mut fragment = fragment(&owner, &clock);
        let before = fragment.updated();

        backend.fail_metadata_writes.store(true, Ordering::Relaxed);
        clock.advance(Duration::seconds(7));
        let err = repo.save(&mut fragment).await.unwrap_err();

        assert!(matches!(err, FragmentError::Storage { .. }));
        // `updated` moved before the write was attempted and stays moved.
        assert_eq!(fragment.updated(), before + Duration::seconds(7));
    }
}
