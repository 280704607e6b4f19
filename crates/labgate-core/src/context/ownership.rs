use std::sync::Arc;

use async_trait::async_trait;
use labgate_const::{REASON_NOT_OWNER, REASON_OWNER, REASON_RESOURCE_NOT_FOUND};
use labgate_store::ResourceStore;
use labgate_types::{ContextAttributes, PermissionResult, Principal};
use tracing::debug;

use super::{ContextError, ContextEvaluator};

/// Allows only the principal named in the record's owner field
pub struct OwnershipEvaluator {
    store: Arc<dyn ResourceStore>,
    owner_field: String,
}

impl OwnershipEvaluator {
    pub fn new(store: Arc<dyn ResourceStore>, owner_field: impl Into<String>) -> Self {
        Self { store, owner_field: owner_field.into() }
    }
}

#[async_trait]
impl ContextEvaluator for OwnershipEvaluator {
    fn name(&self) -> &'static str {
        "ownership"
    }

    async fn evaluate(
        &self,
        principal: &Principal,
        resource: &str,
        resource_id: &str,
        attributes: &ContextAttributes,
    ) -> Result<PermissionResult, ContextError> {
        let owner_field = match attributes {
            ContextAttributes::Ownership(ctx) => {
                ctx.owner_field.as_deref().unwrap_or(&self.owner_field)
            },
            _ => &self.owner_field,
        };

        let Some(record) = self.store.get_resource(resource, resource_id).await? else {
            return Ok(PermissionResult::deny(REASON_RESOURCE_NOT_FOUND));
        };

        if record.field(owner_field) == Some(principal.id.as_str()) {
            Ok(PermissionResult::allow(REASON_OWNER))
        } else {
            debug!(
                principal = %principal.id,
                resource = %resource,
                resource_id = %resource_id,
                owner_field = %owner_field,
                "Principal does not own resource"
            );
            Ok(PermissionResult::deny(REASON_NOT_OWNER))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use labgate_store::MemoryBackend;
    use labgate_types::{OwnershipContext, ResourceRecord, Role};

    use super::*;

    async fn evaluator_with_report() -> OwnershipEvaluator {
        let backend = MemoryBackend::new();
        backend
            .put_resource(
                ResourceRecord::new("reports", "r1")
                    .with_field("student_id", "m1")
                    .with_field("reviewer_id", "d1"),
            )
            .await;
        OwnershipEvaluator::new(Arc::new(backend), "student_id")
    }

    #[tokio::test]
    async fn test_owner_allowed() {
        let evaluator = evaluator_with_report().await;
        let owner = Principal::new("m1", Role::Mahasiswa);

        let result =
            evaluator.evaluate(&owner, "reports", "r1", &ContextAttributes::None).await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.reason, "Resource owner");
    }

    #[tokio::test]
    async fn test_non_owner_denied() {
        let evaluator = evaluator_with_report().await;
        let other = Principal::new("m2", Role::Mahasiswa);

        let result =
            evaluator.evaluate(&other, "reports", "r1", &ContextAttributes::None).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.reason, "Not resource owner");
    }

    #[tokio::test]
    async fn test_missing_resource_denied() {
        let evaluator = evaluator_with_report().await;
        let owner = Principal::new("m1", Role::Mahasiswa);

        let result =
            evaluator.evaluate(&owner, "reports", "r404", &ContextAttributes::None).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.reason, "Resource not found");
    }

    #[tokio::test]
    async fn test_owner_field_override() {
        let evaluator = evaluator_with_report().await;
        let reviewer = Principal::new("d1", Role::Dosen);
        let attributes = ContextAttributes::Ownership(OwnershipContext {
            owner_field: Some("reviewer_id".to_string()),
        });

        let result = evaluator.evaluate(&reviewer, "reports", "r1", &attributes).await.unwrap();
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_error() {
        let backend = MemoryBackend::new();
        backend.set_unavailable(true);
        let evaluator = OwnershipEvaluator::new(Arc::new(backend), "student_id");
        let owner = Principal::new("m1", Role::Mahasiswa);

        let result = evaluator.evaluate(&owner, "reports", "r1", &ContextAttributes::None).await;
        assert!(matches!(result, Err(ContextError::Store(_))));
    }
}
