//! # Labgate Types
//!
//! Shared type definitions for the labgate permission engine.
//!
//! This crate provides the domain vocabulary used across the workspace
//! (principals, roles, permissions, grants, decision results) so that the
//! store, cache and evaluator crates agree on a single source of truth.

#![deny(unsafe_code)]

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use labgate_const::{
    REASON_CHECK_FAILED, REASON_MISSING_PERMISSION_PREFIX, REASON_USER_NOT_FOUND,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod context;
pub mod role;

pub use context::{
    AssignmentContext, ContextAttributes, EnrollmentContext, OwnershipContext, PermissionContext,
};
pub use role::{Role, RoleParseError};

// ============================================================================
// Permission
// ============================================================================

/// A `resource:action` capability
///
/// Both halves are open vocabularies so new resources and actions can be
/// introduced without touching the evaluator. They must be non-empty and may
/// only contain ASCII alphanumerics, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission {
    resource: String,
    action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionParseError {
    #[error("Permission '{0}' is missing the ':' separator")]
    MissingSeparator(String),

    #[error("Permission '{0}' has an empty resource or action")]
    EmptySegment(String),

    #[error("Permission '{value}' contains invalid character '{ch}'")]
    InvalidCharacter { value: String, ch: char },
}

impl Permission {
    /// Build a permission from its two halves, validating both
    pub fn new(
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Result<Self, PermissionParseError> {
        let resource = resource.into();
        let action = action.into();
        let display = format!("{}:{}", resource, action);

        if resource.is_empty() || action.is_empty() {
            return Err(PermissionParseError::EmptySegment(display));
        }

        for segment in [&resource, &action] {
            if let Some(ch) = segment.chars().find(|c| !is_segment_char(*c)) {
                return Err(PermissionParseError::InvalidCharacter { value: display, ch });
            }
        }

        Ok(Self { resource, action })
    }

    /// Parse a `resource:action` string
    pub fn parse(value: &str) -> Result<Self, PermissionParseError> {
        let (resource, action) = value
            .split_once(':')
            .ok_or_else(|| PermissionParseError::MissingSeparator(value.to_string()))?;
        Self::new(resource, action)
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

/// Check if a resource kind or action name is well-formed
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(is_segment_char)
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

impl FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.to_string()
    }
}

// ============================================================================
// Principals, Grants and Resources
// ============================================================================

/// The authenticated entity whose access is being evaluated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role, active: true }
    }
}

/// An individually-assigned permission, independent of role
///
/// Grants with an `expires_at` at or before the evaluation time are inert.
/// Cleaning them up is the data store's business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub principal_id: String,
    pub permission: Permission,
    pub granted_by: String,
    pub granted_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Grant {
    /// Check whether the grant is still in force at `at`
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > at,
            None => true,
        }
    }
}

/// A resource instance as returned by the resource store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl ResourceRecord {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self { kind: kind.into(), id: id.into(), fields: BTreeMap::new() }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

// ============================================================================
// Decision Types
// ============================================================================

/// Why an evaluation could not reach an authoritative answer
///
/// These always surface as a denial (fail closed) but stay distinguishable
/// from a policy denial.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum ResolutionFailure {
    #[error("Principal not found")]
    PrincipalNotFound,

    #[error("Principal lookup failed: {0}")]
    PrincipalFetch(String),

    #[error("Grant lookup failed: {0}")]
    GrantFetch(String),

    #[error("Context check failed: {0}")]
    ContextCheck(String),
}

impl ResolutionFailure {
    /// The caller-facing reason string for this failure
    pub fn reason(&self) -> &'static str {
        match self {
            ResolutionFailure::PrincipalNotFound => REASON_USER_NOT_FOUND,
            _ => REASON_CHECK_FAILED,
        }
    }
}

/// The outcome of a permission evaluation
///
/// A denial is a value, not an error: callers must read `allowed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResult {
    pub allowed: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ResolutionFailure>,
}

impl PermissionResult {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self { allowed: true, reason: reason.into(), required_permissions: None, failure: None }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: reason.into(), required_permissions: None, failure: None }
    }

    /// Denial for a permission the principal does not hold
    pub fn missing(permission: &Permission) -> Self {
        Self {
            allowed: false,
            reason: format!("{}: {}", REASON_MISSING_PERMISSION_PREFIX, permission),
            required_permissions: Some(vec![permission.to_string()]),
            failure: None,
        }
    }

    /// Fail-closed denial for an evaluation that could not be resolved
    pub fn failed(failure: ResolutionFailure) -> Self {
        Self {
            allowed: false,
            reason: failure.reason().to_string(),
            required_permissions: None,
            failure: Some(failure),
        }
    }

    pub fn with_required(mut self, required: Vec<String>) -> Self {
        self.required_permissions = Some(required);
        self
    }

    /// True when the denial means "we couldn't tell" rather than "policy says no"
    pub fn is_resolution_failure(&self) -> bool {
        self.failure.is_some()
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_permission_parse() {
        let permission = Permission::parse("courses:read").unwrap();
        assert_eq!(permission.resource(), "courses");
        assert_eq!(permission.action(), "read");
        assert_eq!(permission.to_string(), "courses:read");
    }

    #[test]
    fn test_permission_parse_rejects_malformed() {
        assert_eq!(
            Permission::parse("courses"),
            Err(PermissionParseError::MissingSeparator("courses".to_string()))
        );
        assert!(matches!(Permission::parse(":read"), Err(PermissionParseError::EmptySegment(_))));
        assert!(matches!(
            Permission::parse("courses:re:ad"),
            Err(PermissionParseError::InvalidCharacter { ch: ':', .. })
        ));
        assert!(matches!(
            Permission::new("lab reports", "read"),
            Err(PermissionParseError::InvalidCharacter { ch: ' ', .. })
        ));
    }

    #[test]
    fn test_permission_serde_as_string() {
        let permission = Permission::parse("reports:export").unwrap();
        let json = serde_json::to_string(&permission).unwrap();
        assert_eq!(json, "\"reports:export\"");

        let bad: Result<Permission, _> = serde_json::from_str("\"reports\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_grant_expiry_boundary() {
        let now = Utc::now();
        let mut grant = Grant {
            principal_id: "u1".to_string(),
            permission: Permission::parse("reports:export").unwrap(),
            granted_by: "admin".to_string(),
            granted_at: now - Duration::days(1),
            expires_at: None,
        };
        assert!(grant.is_active_at(now));

        grant.expires_at = Some(now);
        assert!(!grant.is_active_at(now));

        grant.expires_at = Some(now + Duration::seconds(1));
        assert!(grant.is_active_at(now));
    }

    #[test]
    fn test_missing_result_names_permission() {
        let permission = Permission::parse("users:create").unwrap();
        let result = PermissionResult::missing(&permission);
        assert!(!result.allowed);
        assert_eq!(result.reason, "Missing permission: users:create");
        assert_eq!(result.required_permissions, Some(vec!["users:create".to_string()]));
        assert!(!result.is_resolution_failure());
    }

    #[test]
    fn test_failed_result_reasons() {
        let not_found = PermissionResult::failed(ResolutionFailure::PrincipalNotFound);
        assert_eq!(not_found.reason, "User not found");
        assert!(not_found.is_resolution_failure());

        let fetch =
            PermissionResult::failed(ResolutionFailure::GrantFetch("timeout".to_string()));
        assert_eq!(fetch.reason, "Permission check failed");
        assert!(!fetch.allowed);
    }

    #[test]
    fn test_resource_record_fields() {
        let record = ResourceRecord::new("reports", "r1").with_field("student_id", "s1");
        assert_eq!(record.field("student_id"), Some("s1"));
        assert_eq!(record.field("user_id"), None);
    }
}
