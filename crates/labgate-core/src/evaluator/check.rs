//! Single permission checks

use labgate_types::ContextAttributes;
use tracing::Instrument;

use super::*;

impl Evaluator {
    /// Decide whether `principal_id` may perform `action` on `resource`
    ///
    /// Denials and unresolvable inputs come back as `Ok` results; `Err` is
    /// reserved for a malformed `resource:action` pair.
    pub async fn evaluate(
        &self,
        principal_id: &str,
        resource: &str,
        action: &str,
        context: Option<&PermissionContext>,
    ) -> Result<PermissionResult> {
        let required = Permission::new(resource, action)?;

        let span = logging::auth_span(principal_id, resource, action);
        let start = Instant::now();

        let key = DecisionKey::new(
            principal_id.to_string(),
            resource.to_string(),
            action.to_string(),
            context,
        );

        if let Some(cache) = &self.cache {
            if let Some(result) = cache.get(&key).await {
                metrics::record_cache_hit();
                debug!(
                    parent: &span,
                    allowed = result.allowed,
                    duration = ?start.elapsed(),
                    "Permission check complete (from cache)"
                );
                self.finish(&span, start, &result);
                return Ok(result);
            }
            metrics::record_cache_miss();
        }

        let result =
            self.evaluate_uncached(principal_id, &required, context).instrument(span.clone()).await;

        // Resolution failures are transient; never pin them for a TTL
        if let Some(cache) = &self.cache {
            if !result.is_resolution_failure() {
                cache.put(key, result.clone(), cache.default_ttl()).await;
            }
        }

        debug!(
            parent: &span,
            allowed = result.allowed,
            reason = %result.reason,
            duration = ?start.elapsed(),
            "Permission check complete"
        );

        self.finish(&span, start, &result);
        Ok(result)
    }

    fn finish(&self, span: &tracing::Span, start: Instant, result: &PermissionResult) {
        let elapsed = start.elapsed();
        let decision = if result.allowed { "allow" } else { "deny" };

        metrics::record_check(
            result.allowed,
            result.is_resolution_failure(),
            elapsed.as_secs_f64(),
        );
        logging::record_auth_decision(span, decision, elapsed.as_millis());
        logging::log_slow_check("evaluate", elapsed.as_millis(), self.slow_check_threshold_ms);
    }

    async fn evaluate_uncached(
        &self,
        principal_id: &str,
        required: &Permission,
        context: Option<&PermissionContext>,
    ) -> PermissionResult {
        let principal = match self.load_principal(principal_id).await {
            Ok(principal) => principal,
            Err(failure) => return PermissionResult::failed(failure),
        };

        if !principal.active {
            return PermissionResult::deny(REASON_USER_INACTIVE);
        }

        let base = match catalog::default_permissions(principal.role) {
            PermissionSet::All => PermissionResult::allow(REASON_ALLOWED_BY_ROLE),
            defaults if defaults.contains(required) => {
                PermissionResult::allow(REASON_ALLOWED_BY_ROLE)
            },
            _ => match self.grants.has_permission(principal_id, required, Utc::now()).await {
                Ok(true) => PermissionResult::allow(REASON_ALLOWED_BY_GRANT),
                Ok(false) => return PermissionResult::missing(required),
                Err(failure) => return PermissionResult::failed(failure),
            },
        };

        let Some(context) = context else {
            return base;
        };
        let Some(resource_id) = context.resource_id.as_deref() else {
            return base;
        };

        self.check_context(&principal, required.resource(), resource_id, &context.attributes).await
    }

    /// Run the context evaluator for `resource`, if one is registered
    ///
    /// Errors and panics inside the evaluator become resolution failures.
    async fn check_context(
        &self,
        principal: &Principal,
        resource: &str,
        resource_id: &str,
        attributes: &ContextAttributes,
    ) -> PermissionResult {
        let Some(evaluator) = self.contexts.get(resource) else {
            return PermissionResult::allow(REASON_NO_CONTEXT_REQUIRED);
        };

        let span = logging::context_span(resource, resource_id);
        let outcome =
            AssertUnwindSafe(evaluator.evaluate(principal, resource, resource_id, attributes))
                .catch_unwind()
                .instrument(span.clone())
                .await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(
                    evaluator = evaluator.name(),
                    resource = %resource,
                    resource_id = %resource_id,
                    error = %e,
                    "Context check failed"
                );
                PermissionResult::failed(ResolutionFailure::ContextCheck(e.to_string()))
            },
            Err(_) => {
                warn!(
                    evaluator = evaluator.name(),
                    resource = %resource,
                    resource_id = %resource_id,
                    "Context evaluator panicked"
                );
                PermissionResult::failed(ResolutionFailure::ContextCheck(format!(
                    "{} evaluator panicked",
                    evaluator.name()
                )))
            },
        };

        logging::record_context_result(&span, result.allowed);
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use async_trait::async_trait;
    use labgate_store::MemoryBackend;
    use labgate_types::{Grant, ResourceRecord};

    use super::*;
    use crate::{
        EvalError,
        context::{ContextError, ContextEvaluator},
    };

    struct PanickingEvaluator;

    #[async_trait]
    impl ContextEvaluator for PanickingEvaluator {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn evaluate(
            &self,
            _principal: &Principal,
            _resource: &str,
            _resource_id: &str,
            _attributes: &ContextAttributes,
        ) -> std::result::Result<PermissionResult, ContextError> {
            panic!("evaluator bug");
        }
    }

    struct BrokenEvaluator;

    #[async_trait]
    impl ContextEvaluator for BrokenEvaluator {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn evaluate(
            &self,
            _principal: &Principal,
            _resource: &str,
            _resource_id: &str,
            _attributes: &ContextAttributes,
        ) -> std::result::Result<PermissionResult, ContextError> {
            Err(ContextError::InvalidContext("missing lab id".to_string()))
        }
    }

    async fn seeded() -> (Arc<MemoryBackend>, Evaluator) {
        let backend = Arc::new(MemoryBackend::new());
        backend.put_principal(Principal::new("a1", Role::Admin)).await;
        backend.put_principal(Principal::new("m1", Role::Mahasiswa)).await;
        backend.put_principal(Principal::new("m2", Role::Mahasiswa)).await;
        backend
            .put_resource(ResourceRecord::new("reports", "r1").with_field("student_id", "m1"))
            .await;

        let evaluator = Evaluator::from_config(&Config::default(), backend.clone()).unwrap();
        (backend, evaluator)
    }

    #[tokio::test]
    async fn test_malformed_permission_is_contract_error() {
        let (_, evaluator) = seeded().await;

        let result = evaluator.evaluate("m1", "reports", "", None).await;
        assert!(matches!(result, Err(EvalError::InvalidPermission(_))));

        let result = evaluator.evaluate("m1", "lab reports", "read", None).await;
        assert!(matches!(result, Err(EvalError::InvalidPermission(_))));
    }

    #[tokio::test]
    async fn test_allow_reason_states_basis() {
        let (backend, evaluator) = seeded().await;
        backend
            .add_grant(Grant {
                principal_id: "m1".to_string(),
                permission: Permission::parse("inventory:read").unwrap(),
                granted_by: "a1".to_string(),
                granted_at: Utc::now(),
                expires_at: None,
            })
            .await;

        let by_role = evaluator.evaluate("m1", "reports", "create", None).await.unwrap();
        assert_eq!(by_role.reason, "Allowed by role");

        let by_grant = evaluator.evaluate("m1", "inventory", "read", None).await.unwrap();
        assert_eq!(by_grant.reason, "Allowed by grant");
    }

    #[tokio::test]
    async fn test_inactive_principal_denied() {
        let (backend, evaluator) = seeded().await;
        let mut retired = Principal::new("a2", Role::Admin);
        retired.active = false;
        backend.put_principal(retired).await;

        let result = evaluator.evaluate("a2", "inventory", "delete", None).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.reason, "User inactive");
        assert!(!result.is_resolution_failure());
    }

    #[tokio::test]
    async fn test_context_without_resource_id_keeps_base_result() {
        let (_, evaluator) = seeded().await;
        let context = PermissionContext::default();

        let result = evaluator.evaluate("m2", "reports", "update", Some(&context)).await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.reason, "Allowed by role");
    }

    #[tokio::test]
    async fn test_kind_without_evaluator_allows_with_context() {
        let (_, evaluator) = seeded().await;
        let context = PermissionContext::for_resource("s1");

        let result = evaluator.evaluate("m1", "schedules", "read", Some(&context)).await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.reason, "No additional context required");
    }

    #[tokio::test]
    async fn test_context_not_run_after_base_denial() {
        let (_, evaluator) = seeded().await;
        let context = PermissionContext::for_resource("r1");

        // m1 owns r1 but has no reports:grade
        let result = evaluator.evaluate("m1", "reports", "grade", Some(&context)).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.reason, "Missing permission: reports:grade");
    }

    #[tokio::test]
    async fn test_panicking_context_evaluator_fails_closed() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put_principal(Principal::new("l1", Role::Laboran)).await;

        let mut contexts = ContextRegistry::new();
        contexts.register("inventory", Arc::new(PanickingEvaluator)).unwrap();
        let evaluator = Evaluator::new(backend.clone(), backend, contexts);
        let context = PermissionContext::for_resource("i1");

        let result = evaluator.evaluate("l1", "inventory", "update", Some(&context)).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.reason, "Permission check failed");
        assert!(matches!(result.failure, Some(ResolutionFailure::ContextCheck(_))));

        // Unrelated checks still work
        let result = evaluator.evaluate("l1", "labs", "read", None).await.unwrap();
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn test_context_error_fails_closed_and_is_not_cached() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put_principal(Principal::new("l1", Role::Laboran)).await;

        let mut contexts = ContextRegistry::new();
        contexts.register("labs", Arc::new(BrokenEvaluator)).unwrap();
        let evaluator = Evaluator::new(backend.clone(), backend, contexts);
        let context = PermissionContext::for_resource("lab-1");

        for _ in 0..2 {
            let result = evaluator.evaluate("l1", "labs", "update", Some(&context)).await.unwrap();
            assert!(!result.allowed);
            assert_eq!(
                result.failure,
                Some(ResolutionFailure::ContextCheck("Invalid context: missing lab id".to_string()))
            );
        }

        let stats = evaluator.cache_stats().unwrap();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
    }

    #[tokio::test]
    async fn test_store_outage_fails_closed_and_is_not_cached() {
        let (backend, evaluator) = seeded().await;
        let context = PermissionContext::for_resource("r1");

        backend.set_unavailable(true);
        // Principal load fails first while the backend is down
        let result = evaluator.evaluate("m1", "reports", "read", Some(&context)).await.unwrap();
        assert!(matches!(result.failure, Some(ResolutionFailure::PrincipalFetch(_))));

        backend.set_unavailable(false);
        let result = evaluator.evaluate("m1", "reports", "read", Some(&context)).await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.reason, "Resource owner");
    }
}
