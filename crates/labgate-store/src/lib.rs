//! # Labgate Store - Storage Abstraction Layer
//!
//! The permission engine treats persistence as an opaque collaborator. These
//! traits are the narrow read-only surface it consumes; anything that can
//! answer them (a SQL database, a document store, an in-memory fixture) can
//! back the engine.

use async_trait::async_trait;
use labgate_types::{Grant, Principal, ResourceRecord, StoreResult};

pub mod memory;

pub use memory::MemoryBackend;

/// Lookup of principals by id
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Get a principal, or `None` if no such principal exists
    async fn get_principal(&self, id: &str) -> StoreResult<Option<Principal>>;
}

/// Lookup of individually-granted permissions
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Get every grant recorded for a principal, expired ones included
    async fn get_grants(&self, principal_id: &str) -> StoreResult<Vec<Grant>>;
}

/// Lookup of resource instances used by ownership checks
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_resource(&self, kind: &str, id: &str) -> StoreResult<Option<ResourceRecord>>;
}

/// Positive evidence of course enrollment
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Check whether at least one attendance record links the principal to the course
    async fn has_attendance(&self, principal_id: &str, course_id: &str) -> StoreResult<bool>;
}
