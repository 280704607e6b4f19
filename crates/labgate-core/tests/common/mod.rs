//! Helper utilities for integration tests

#![allow(dead_code)] // Some test files use subsets of these utilities

use std::sync::Arc;

use labgate_config::Config;
use labgate_core::Evaluator;
use labgate_store::MemoryBackend;
use labgate_test_fixtures::campus_backend;
pub use labgate_types::{PermissionContext, PermissionResult};

/// Test fixture for setting up a complete evaluation environment
pub struct TestFixture {
    pub store: Arc<MemoryBackend>,
    pub evaluator: Evaluator,
}

impl TestFixture {
    /// Evaluator with default configuration over the seeded campus
    pub async fn new() -> Self {
        Self::with_config(&Config::default()).await
    }

    pub async fn with_config(config: &Config) -> Self {
        let store = Arc::new(campus_backend().await);
        let evaluator = Evaluator::from_config(config, store.clone()).unwrap();

        Self { store, evaluator }
    }

    pub async fn check(
        &self,
        principal: &str,
        resource: &str,
        action: &str,
        context: Option<&PermissionContext>,
    ) -> anyhow::Result<PermissionResult> {
        Ok(self.evaluator.evaluate(principal, resource, action, context).await?)
    }

    /// Assert that a check is allowed
    pub async fn assert_allowed(&self, principal: &str, resource: &str, action: &str) {
        let result = self.check(principal, resource, action, None).await.unwrap();
        assert!(
            result.allowed,
            "Expected {} to be allowed {}:{}, got: {}",
            principal, resource, action, result.reason
        );
    }

    /// Assert that a check is denied
    pub async fn assert_denied(&self, principal: &str, resource: &str, action: &str) {
        let result = self.check(principal, resource, action, None).await.unwrap();
        assert!(
            !result.allowed,
            "Expected {} to be denied {}:{}, got: {}",
            principal, resource, action, result.reason
        );
    }
}
