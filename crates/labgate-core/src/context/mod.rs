//! Instance-level context checks
//!
//! A context evaluator refines a role/grant-level allow for one resource
//! kind. It only ever runs on an already-allowed decision, so it can narrow
//! access to a denial but never grant it.

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use labgate_const::{RESOURCE_COURSES, RESOURCE_LABS};
use labgate_store::{AttendanceStore, ResourceStore};
use labgate_types::{ContextAttributes, PermissionResult, Principal, StoreError, is_valid_segment};
use thiserror::Error;

use crate::{EvalError, Result};

mod assignment;
mod enrollment;
mod ownership;

pub use assignment::AssignmentEvaluator;
pub use enrollment::EnrollmentEvaluator;
pub use ownership::OwnershipEvaluator;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid context: {0}")]
    InvalidContext(String),
}

/// A resource-specific refinement strategy
#[async_trait]
pub trait ContextEvaluator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn evaluate(
        &self,
        principal: &Principal,
        resource: &str,
        resource_id: &str,
        attributes: &ContextAttributes,
    ) -> std::result::Result<PermissionResult, ContextError>;
}

/// Context evaluators keyed by resource kind
#[derive(Clone, Default)]
pub struct ContextRegistry {
    evaluators: HashMap<String, Arc<dyn ContextEvaluator>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an evaluator for a resource kind
    ///
    /// A malformed kind or a second registration for the same kind is a
    /// wiring mistake and fails loudly.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        evaluator: Arc<dyn ContextEvaluator>,
    ) -> Result<()> {
        let kind = kind.into();

        if !is_valid_segment(&kind) {
            return Err(EvalError::Contract(format!(
                "Cannot register context evaluator for malformed resource kind '{}'",
                kind
            )));
        }

        if let Some(existing) = self.evaluators.get(&kind) {
            return Err(EvalError::Contract(format!(
                "Resource kind '{}' already has the '{}' context evaluator",
                kind,
                existing.name()
            )));
        }

        self.evaluators.insert(kind, evaluator);
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<dyn ContextEvaluator>> {
        self.evaluators.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.evaluators.keys().map(String::as_str)
    }

    /// The standard wiring: ownership for each kind in `owner_fields`,
    /// assignment for labs, enrollment for courses
    pub fn standard(
        resources: Arc<dyn ResourceStore>,
        attendance: Arc<dyn AttendanceStore>,
        owner_fields: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut registry = Self::new();

        for (kind, field) in owner_fields {
            registry.register(
                kind.clone(),
                Arc::new(OwnershipEvaluator::new(Arc::clone(&resources), field.clone())),
            )?;
        }

        registry.register(RESOURCE_LABS, Arc::new(AssignmentEvaluator))?;
        registry.register(RESOURCE_COURSES, Arc::new(EnrollmentEvaluator::new(attendance)))?;

        Ok(registry)
    }
}

impl fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.kinds().collect();
        kinds.sort_unstable();
        f.debug_struct("ContextRegistry").field("kinds", &kinds).finish()
    }
}
