//! Any/all composition of permission checks

use futures::future::join_all;
use labgate_const::{REASON_ALL_GRANTED, REASON_MISSING_PERMISSION_PREFIX};

use super::*;

impl Evaluator {
    /// Allowed if at least one of `pairs` is allowed
    ///
    /// Pairs are tried in order and the first allow is returned as-is.
    #[instrument(skip(self, pairs, context), fields(size = pairs.len()))]
    pub async fn any(
        &self,
        principal_id: &str,
        pairs: &[(&str, &str)],
        context: Option<&PermissionContext>,
    ) -> Result<PermissionResult> {
        metrics::record_batch_check("any", pairs.len());

        let required = parse_pairs(pairs)?;
        if required.is_empty() {
            return Ok(PermissionResult::deny(REASON_NO_PERMISSIONS_REQUESTED));
        }

        let mut denials = Vec::with_capacity(required.len());
        for permission in &required {
            let result = self
                .evaluate(principal_id, permission.resource(), permission.action(), context)
                .await?;
            if result.allowed {
                return Ok(result);
            }
            denials.push(result);
        }

        let names: Vec<String> = required.iter().map(ToString::to_string).collect();
        let reason = format!("{}: one of {}", REASON_MISSING_PERMISSION_PREFIX, names.join(", "));
        Ok(aggregate(&denials, reason, names))
    }

    /// Allowed only if every pair is allowed
    ///
    /// Every pair is evaluated, so a denial names all missing permissions.
    #[instrument(skip(self, pairs, context), fields(size = pairs.len()))]
    pub async fn all(
        &self,
        principal_id: &str,
        pairs: &[(&str, &str)],
        context: Option<&PermissionContext>,
    ) -> Result<PermissionResult> {
        metrics::record_batch_check("all", pairs.len());

        let required = parse_pairs(pairs)?;
        if required.is_empty() {
            return Ok(PermissionResult::deny(REASON_NO_PERMISSIONS_REQUESTED));
        }

        let checks = required.iter().map(|permission| {
            self.evaluate(principal_id, permission.resource(), permission.action(), context)
        });
        let results = join_all(checks).await.into_iter().collect::<Result<Vec<_>>>()?;

        let mut missing = Vec::new();
        let mut denials = Vec::new();
        for (permission, result) in required.iter().zip(results) {
            if !result.allowed {
                missing.push(permission.to_string());
                denials.push(result);
            }
        }

        if missing.is_empty() {
            return Ok(PermissionResult::allow(REASON_ALL_GRANTED));
        }

        debug!(
            principal = %principal_id,
            missing = ?missing,
            "Batch check denied"
        );

        let reason = format!("{}: {}", REASON_MISSING_PERMISSION_PREFIX, missing.join(", "));
        Ok(aggregate(&denials, reason, missing))
    }
}

/// Validate every pair before evaluating any of them
fn parse_pairs(pairs: &[(&str, &str)]) -> Result<Vec<Permission>> {
    pairs
        .iter()
        .map(|(resource, action)| Permission::new(*resource, *action).map_err(Into::into))
        .collect()
}

/// Combine constituent denials; the first resolution failure wins over policy
fn aggregate(
    denials: &[PermissionResult],
    reason: String,
    required: Vec<String>,
) -> PermissionResult {
    match denials.iter().find_map(|result| result.failure.clone()) {
        Some(failure) => PermissionResult::failed(failure).with_required(required),
        None => PermissionResult::deny(reason).with_required(required),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use labgate_store::MemoryBackend;

    use super::*;
    use crate::EvalError;

    async fn evaluator() -> (Arc<MemoryBackend>, Evaluator) {
        let backend = Arc::new(MemoryBackend::new());
        backend.put_principal(Principal::new("d1", Role::Dosen)).await;
        let evaluator = Evaluator::from_config(&Config::default(), backend.clone()).unwrap();
        (backend, evaluator)
    }

    #[tokio::test]
    async fn test_any_returns_first_allow() {
        let (_, evaluator) = evaluator().await;

        let result = evaluator
            .any("d1", &[("users", "create"), ("courses", "read")], None)
            .await
            .unwrap();
        assert!(result.allowed);
        assert_eq!(result.reason, "Allowed by role");
    }

    #[tokio::test]
    async fn test_any_denial_lists_every_required_permission() {
        let (_, evaluator) = evaluator().await;

        let result = evaluator
            .any("d1", &[("users", "create"), ("inventory", "delete")], None)
            .await
            .unwrap();
        assert!(!result.allowed);
        assert_eq!(
            result.required_permissions,
            Some(vec!["users:create".to_string(), "inventory:delete".to_string()])
        );
        assert_eq!(result.reason, "Missing permission: one of users:create, inventory:delete");
    }

    #[tokio::test]
    async fn test_all_names_only_missing_permissions() {
        let (_, evaluator) = evaluator().await;

        let result = evaluator
            .all("d1", &[("users", "create"), ("courses", "read"), ("users", "delete")], None)
            .await
            .unwrap();
        assert!(!result.allowed);
        assert_eq!(
            result.required_permissions,
            Some(vec!["users:create".to_string(), "users:delete".to_string()])
        );
        assert_eq!(result.reason, "Missing permission: users:create, users:delete");
    }

    #[tokio::test]
    async fn test_all_allowed() {
        let (_, evaluator) = evaluator().await;

        let result =
            evaluator.all("d1", &[("courses", "read"), ("reports", "grade")], None).await.unwrap();
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn test_empty_batches_deny() {
        let (_, evaluator) = evaluator().await;

        let any = evaluator.any("d1", &[], None).await.unwrap();
        assert!(!any.allowed);
        assert_eq!(any.reason, "No permissions requested");

        let all = evaluator.all("d1", &[], None).await.unwrap();
        assert!(!all.allowed);
        assert_eq!(all.reason, "No permissions requested");
    }

    #[tokio::test]
    async fn test_malformed_pair_rejects_whole_batch() {
        let (_, evaluator) = evaluator().await;

        let result = evaluator.all("d1", &[("courses", "read"), ("courses", "")], None).await;
        assert!(matches!(result, Err(EvalError::InvalidPermission(_))));

        // Nothing was evaluated, so nothing was cached
        assert_eq!(evaluator.cache_stats().unwrap().misses, 0);
    }

    #[tokio::test]
    async fn test_aggregate_keeps_resolution_failure() {
        let (backend, evaluator) = evaluator().await;
        backend.set_unavailable(true);

        let result =
            evaluator.all("d1", &[("courses", "read"), ("labs", "read")], None).await.unwrap();
        assert!(!result.allowed);
        assert!(result.is_resolution_failure());
        assert_eq!(result.reason, "Permission check failed");
        assert_eq!(
            result.required_permissions,
            Some(vec!["courses:read".to_string(), "labs:read".to_string()])
        );
    }
}
