use async_trait::async_trait;
use labgate_const::REASON_ASSIGNMENT_UNCHECKED;
use labgate_types::{ContextAttributes, PermissionResult, Principal};
use tracing::debug;

use super::{ContextError, ContextEvaluator};

/// Lab technician to lab assignment check
///
/// There is no assignment table yet, so this always allows. Replace it with a
/// store-backed lookup before relying on per-lab isolation.
pub struct AssignmentEvaluator;

#[async_trait]
impl ContextEvaluator for AssignmentEvaluator {
    fn name(&self) -> &'static str {
        "assignment"
    }

    async fn evaluate(
        &self,
        principal: &Principal,
        resource: &str,
        resource_id: &str,
        attributes: &ContextAttributes,
    ) -> Result<PermissionResult, ContextError> {
        let lab_id = match attributes {
            ContextAttributes::Assignment(ctx) => ctx.lab_id.as_deref().unwrap_or(resource_id),
            _ => resource_id,
        };

        debug!(
            principal = %principal.id,
            resource = %resource,
            lab = %lab_id,
            "Lab assignment not verified, allowing"
        );

        Ok(PermissionResult::allow(REASON_ASSIGNMENT_UNCHECKED))
    }
}
