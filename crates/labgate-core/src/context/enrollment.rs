use std::sync::Arc;

use async_trait::async_trait;
use labgate_const::{REASON_ENROLLED, REASON_NOT_ENROLLED, REASON_NO_ENROLLMENT_CHECK};
use labgate_store::AttendanceStore;
use labgate_types::{ContextAttributes, PermissionResult, Principal};

use super::{ContextError, ContextEvaluator};

/// Student to course enrollment check
///
/// Enrollment is proven by at least one attendance record. Without a course id
/// in the context there is nothing to check and the decision stands.
pub struct EnrollmentEvaluator {
    store: Arc<dyn AttendanceStore>,
}

impl EnrollmentEvaluator {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ContextEvaluator for EnrollmentEvaluator {
    fn name(&self) -> &'static str {
        "enrollment"
    }

    async fn evaluate(
        &self,
        principal: &Principal,
        _resource: &str,
        _resource_id: &str,
        attributes: &ContextAttributes,
    ) -> Result<PermissionResult, ContextError> {
        let course_id = match attributes {
            ContextAttributes::Enrollment(ctx) => ctx.course_id.as_deref(),
            _ => None,
        };

        let Some(course_id) = course_id else {
            return Ok(PermissionResult::allow(REASON_NO_ENROLLMENT_CHECK));
        };

        if self.store.has_attendance(&principal.id, course_id).await? {
            Ok(PermissionResult::allow(REASON_ENROLLED))
        } else {
            Ok(PermissionResult::deny(REASON_NOT_ENROLLED))
        }
    }
}
