//! # Labgate Core - Permission Evaluation Engine
//!
//! Decides whether a principal may perform an action on a resource by
//! combining role defaults, time-bounded grants and instance-level context
//! checks, with a decision cache in front.

use labgate_types::PermissionParseError;
use thiserror::Error;

pub mod catalog;
pub mod context;
pub mod evaluator;
pub mod grants;
pub mod identity;

pub use catalog::PermissionSet;
pub use context::{ContextEvaluator, ContextRegistry};
pub use evaluator::{EffectivePermissions, Evaluator};
pub use grants::GrantResolver;
pub use identity::{IdentityChange, IdentitySignal, IdentityWatcher};

/// Programming or contract violations
///
/// Ordinary denials and unresolvable inputs are reported through
/// `PermissionResult`, never through this type.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Invalid permission: {0}")]
    InvalidPermission(#[from] PermissionParseError),

    #[error("Contract violation: {0}")]
    Contract(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;
