//! Permission evaluation engine

use std::{collections::BTreeSet, panic::AssertUnwindSafe, sync::Arc, time::Instant};

use chrono::Utc;
use futures::FutureExt;
use labgate_cache::{CacheStats, DecisionCache, DecisionKey};
use labgate_config::{Config, validation};
use labgate_const::{
    REASON_ALLOWED_BY_GRANT, REASON_ALLOWED_BY_ROLE, REASON_INSUFFICIENT_ROLE,
    REASON_NO_CONTEXT_REQUIRED, REASON_NO_PERMISSIONS_REQUESTED, REASON_USER_INACTIVE,
};
use labgate_observe::{logging, metrics};
use labgate_store::{AttendanceStore, GrantStore, PrincipalStore, ResourceStore};
use labgate_types::{
    Permission, PermissionContext, PermissionResult, Principal, ResolutionFailure, Role,
};
use tracing::{debug, instrument, warn};

use crate::{
    EvalError, Result,
    catalog::{self, PermissionSet},
    context::ContextRegistry,
    grants::GrantResolver,
    identity::IdentityChange,
};

/// Everything a principal may currently do, ignoring instance context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectivePermissions {
    /// Role grants every permission
    All,
    /// Union of role defaults and active grants
    Explicit(BTreeSet<Permission>),
}

impl EffectivePermissions {
    pub fn contains(&self, permission: &Permission) -> bool {
        match self {
            EffectivePermissions::All => true,
            EffectivePermissions::Explicit(set) => set.contains(permission),
        }
    }
}

/// The main permission evaluator
pub struct Evaluator {
    principals: Arc<dyn PrincipalStore>,
    grants: GrantResolver,
    contexts: ContextRegistry,
    cache: Option<Arc<DecisionCache>>,
    slow_check_threshold_ms: u128,
}

impl Evaluator {
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        grants: Arc<dyn GrantStore>,
        contexts: ContextRegistry,
    ) -> Self {
        Self::new_with_cache(principals, grants, contexts, Some(Arc::new(DecisionCache::default())))
    }

    pub fn new_with_cache(
        principals: Arc<dyn PrincipalStore>,
        grants: Arc<dyn GrantStore>,
        contexts: ContextRegistry,
        cache: Option<Arc<DecisionCache>>,
    ) -> Self {
        Self {
            principals,
            grants: GrantResolver::new(grants),
            contexts,
            cache,
            slow_check_threshold_ms: 100,
        }
    }

    /// Build an evaluator over a single backend implementing every store
    ///
    /// The configuration is validated first; an invalid one is a contract
    /// violation.
    pub fn from_config<S>(config: &Config, store: Arc<S>) -> Result<Self>
    where
        S: PrincipalStore + GrantStore + ResourceStore + AttendanceStore + 'static,
    {
        validation::validate(config).map_err(|e| EvalError::Contract(e.to_string()))?;

        let contexts = ContextRegistry::standard(
            store.clone(),
            store.clone(),
            &config.evaluator.owner_fields,
        )?;

        let cache = if config.cache.enabled {
            let cache = match config.cache.max_capacity {
                Some(capacity) => DecisionCache::with_capacity(capacity, config.cache.ttl()),
                None => DecisionCache::new(config.cache.ttl()),
            };
            Some(Arc::new(cache))
        } else {
            None
        };

        let mut evaluator = Self::new_with_cache(store.clone(), store, contexts, cache);
        evaluator.slow_check_threshold_ms = u128::from(config.evaluator.slow_check_threshold_ms);
        Ok(evaluator)
    }

    /// Get a reference to the cache for manual invalidation
    pub fn cache(&self) -> Option<&Arc<DecisionCache>> {
        self.cache.as_ref()
    }

    pub fn contexts(&self) -> &ContextRegistry {
        &self.contexts
    }

    /// Cache statistics, or `None` when caching is disabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Drop every cached decision for one principal
    pub async fn invalidate(&self, principal_id: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(principal_id).await;
            metrics::record_cache_invalidation("principal");
        }
    }

    /// Drop every cached decision
    pub async fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all().await;
            metrics::record_cache_invalidation("all");
        }
    }

    /// React to the active identity changing
    pub async fn on_identity_change(&self, change: &IdentityChange) {
        debug!(
            previous = ?change.previous,
            current = ?change.current,
            "Identity changed, invalidating decision cache"
        );
        self.invalidate_all().await;
    }
}

// Method implementations organized by functionality
mod batch;
mod check;

impl Evaluator {
    async fn load_principal(
        &self,
        principal_id: &str,
    ) -> std::result::Result<Principal, ResolutionFailure> {
        match self.principals.get_principal(principal_id).await {
            Ok(Some(principal)) => Ok(principal),
            Ok(None) => Err(ResolutionFailure::PrincipalNotFound),
            Err(e) => {
                warn!(principal = %principal_id, error = %e, "Failed to load principal");
                Err(ResolutionFailure::PrincipalFetch(e.to_string()))
            },
        }
    }

    /// Role defaults plus active grants for a principal
    ///
    /// Inactive principals hold nothing.
    pub async fn effective_permissions(
        &self,
        principal_id: &str,
    ) -> std::result::Result<EffectivePermissions, ResolutionFailure> {
        let principal = self.load_principal(principal_id).await?;
        if !principal.active {
            return Ok(EffectivePermissions::Explicit(BTreeSet::new()));
        }

        let Some(defaults) = catalog::default_permissions(principal.role).permissions() else {
            return Ok(EffectivePermissions::All);
        };

        let mut set: BTreeSet<Permission> = defaults.into_iter().collect();
        set.extend(self.grants.direct_permissions(principal_id, Utc::now()).await?);

        Ok(EffectivePermissions::Explicit(set))
    }

    /// Role-level guard: allowed when the principal's role is at least `required`
    pub async fn require_role(&self, principal_id: &str, required: Role) -> PermissionResult {
        let principal = match self.load_principal(principal_id).await {
            Ok(principal) => principal,
            Err(failure) => return PermissionResult::failed(failure),
        };

        if !principal.active {
            return PermissionResult::deny(REASON_USER_INACTIVE);
        }

        if catalog::role_satisfies(principal.role, required) {
            PermissionResult::allow(REASON_ALLOWED_BY_ROLE)
        } else {
            debug!(
                principal = %principal_id,
                role = %principal.role,
                required = %required,
                "Role below required level"
            );
            PermissionResult::deny(format!("{}: requires {}", REASON_INSUFFICIENT_ROLE, required))
        }
    }
}
