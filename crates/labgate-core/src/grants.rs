//! Grant resolution
//!
//! Reads a principal's individual grants and keeps only those still in force.

use std::{collections::BTreeSet, sync::Arc};

use chrono::{DateTime, Utc};
use labgate_store::GrantStore;
use labgate_types::{Permission, ResolutionFailure};
use tracing::{debug, warn};

/// Resolves the directly-granted permissions of a principal
#[derive(Clone)]
pub struct GrantResolver {
    store: Arc<dyn GrantStore>,
}

impl GrantResolver {
    pub fn new(store: Arc<dyn GrantStore>) -> Self {
        Self { store }
    }

    /// Permissions granted to `principal_id` that are active at `at`
    ///
    /// A store failure is reported as `ResolutionFailure::GrantFetch` and never
    /// collapsed into "no grants".
    pub async fn direct_permissions(
        &self,
        principal_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<Permission>, ResolutionFailure> {
        let grants = self.store.get_grants(principal_id).await.map_err(|e| {
            warn!(principal = %principal_id, error = %e, "Failed to fetch grants");
            ResolutionFailure::GrantFetch(e.to_string())
        })?;

        let total = grants.len();
        let mut seen = BTreeSet::new();
        let permissions: Vec<Permission> = grants
            .into_iter()
            .filter(|grant| grant.is_active_at(at))
            .map(|grant| grant.permission)
            .filter(|permission| seen.insert(permission.clone()))
            .collect();

        if permissions.len() < total {
            debug!(
                principal = %principal_id,
                total,
                active = permissions.len(),
                "Ignored expired or duplicate grants"
            );
        }

        Ok(permissions)
    }

    /// Check whether an active grant covers `permission`
    pub async fn has_permission(
        &self,
        principal_id: &str,
        permission: &Permission,
        at: DateTime<Utc>,
    ) -> Result<bool, ResolutionFailure> {
        let permissions = self.direct_permissions(principal_id, at).await?;
        Ok(permissions.contains(permission))
    }
}
