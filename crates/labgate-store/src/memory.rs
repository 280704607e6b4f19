//! In-memory storage backend for testing and development

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use labgate_types::{Grant, Principal, ResourceRecord, StoreError, StoreResult};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{AttendanceStore, GrantStore, PrincipalStore, ResourceStore};

/// In-memory implementation of every store trait
///
/// Cloning is cheap and clones share the same data. The `unavailable` switch
/// makes every read fail, which is how tests exercise fail-closed behavior.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<MemoryStore>>,
    unavailable: Arc<AtomicBool>,
    reads: Arc<AtomicU64>,
}

#[derive(Default)]
struct MemoryStore {
    principals: HashMap<String, Principal>,
    /// Grants indexed by principal id
    grants: HashMap<String, Vec<Grant>>,
    /// Resources indexed by (kind, id)
    resources: HashMap<(String, String), ResourceRecord>,
    /// (principal id, course id) pairs with at least one attendance record
    attendance: HashSet<(String, String)>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_principal(&self, principal: Principal) {
        let mut store = self.data.write().await;
        store.principals.insert(principal.id.clone(), principal);
    }

    pub async fn remove_principal(&self, id: &str) -> Option<Principal> {
        let mut store = self.data.write().await;
        store.principals.remove(id)
    }

    pub async fn add_grant(&self, grant: Grant) {
        let mut store = self.data.write().await;
        store.grants.entry(grant.principal_id.clone()).or_default().push(grant);
    }

    /// Remove all grants of a principal, returning how many were dropped
    pub async fn revoke_grants(&self, principal_id: &str) -> usize {
        let mut store = self.data.write().await;
        store.grants.remove(principal_id).map(|grants| grants.len()).unwrap_or(0)
    }

    pub async fn put_resource(&self, record: ResourceRecord) {
        let mut store = self.data.write().await;
        store.resources.insert((record.kind.clone(), record.id.clone()), record);
    }

    pub async fn record_attendance(&self, principal_id: &str, course_id: &str) {
        let mut store = self.data.write().await;
        store.attendance.insert((principal_id.to_string(), course_id.to_string()));
    }

    /// Make every subsequent read fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of read operations served (including failed ones)
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn begin_read(&self, operation: &'static str) -> StoreResult<()> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.unavailable.load(Ordering::SeqCst) {
            debug!(operation, "Memory backend marked unavailable");
            return Err(StoreError::Unavailable(format!("{} rejected", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl PrincipalStore for MemoryBackend {
    async fn get_principal(&self, id: &str) -> StoreResult<Option<Principal>> {
        self.begin_read("get_principal")?;
        let store = self.data.read().await;
        Ok(store.principals.get(id).cloned())
    }
}

#[async_trait]
impl GrantStore for MemoryBackend {
    async fn get_grants(&self, principal_id: &str) -> StoreResult<Vec<Grant>> {
        self.begin_read("get_grants")?;
        let store = self.data.read().await;
        Ok(store.grants.get(principal_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ResourceStore for MemoryBackend {
    async fn get_resource(&self, kind: &str, id: &str) -> StoreResult<Option<ResourceRecord>> {
        self.begin_read("get_resource")?;
        let store = self.data.read().await;
        Ok(store.resources.get(&(kind.to_string(), id.to_string())).cloned())
    }
}

#[async_trait]
impl AttendanceStore for MemoryBackend {
    async fn has_attendance(&self, principal_id: &str, course_id: &str) -> StoreResult<bool> {
        self.begin_read("has_attendance")?;
        let store = self.data.read().await;
        Ok(store.attendance.contains(&(principal_id.to_string(), course_id.to_string())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use chrono::Utc;
    use labgate_types::{Permission, Role};

    use super::*;

    #[tokio::test]
    async fn test_principal_round_trip() {
        let backend = MemoryBackend::new();
        backend.put_principal(Principal::new("d1", Role::Dosen)).await;

        let principal = backend.get_principal("d1").await.unwrap().unwrap();
        assert_eq!(principal.role, Role::Dosen);
        assert!(backend.get_principal("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_grants_are_returned_unfiltered() {
        let backend = MemoryBackend::new();
        let now = Utc::now();
        backend
            .add_grant(Grant {
                principal_id: "m1".to_string(),
                permission: Permission::parse("reports:export").unwrap(),
                granted_by: "a1".to_string(),
                granted_at: now,
                expires_at: Some(now - chrono::Duration::hours(1)),
            })
            .await;

        // Expiry filtering is the resolver's job, not the store's
        assert_eq!(backend.get_grants("m1").await.unwrap().len(), 1);
        assert_eq!(backend.revoke_grants("m1").await, 1);
        assert!(backend.get_grants("m1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_backend_fails_reads() {
        let backend = MemoryBackend::new();
        backend.set_unavailable(true);

        assert!(matches!(backend.get_grants("m1").await, Err(StoreError::Unavailable(_))));
        assert!(backend.has_attendance("m1", "c1").await.is_err());
        assert_eq!(backend.read_count(), 2);

        backend.set_unavailable(false);
        assert!(!backend.has_attendance("m1", "c1").await.unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let backend = MemoryBackend::new();
        let clone = backend.clone();
        clone.put_resource(ResourceRecord::new("reports", "r1")).await;
        assert!(backend.get_resource("reports", "r1").await.unwrap().is_some());
    }
}
