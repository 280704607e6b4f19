//! Instance-level evaluation context
//!
//! Each resource kind that needs an instance check has its own variant with
//! statically-known fields. Context evaluators dispatch on the resource kind
//! and read only the variant they understand.

use serde::{Deserialize, Serialize};

/// Context passed alongside a permission check
///
/// Absence of `resource_id` means no instance-level check applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionContext {
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub attributes: ContextAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextAttributes {
    #[default]
    None,
    Ownership(OwnershipContext),
    Enrollment(EnrollmentContext),
    Assignment(AssignmentContext),
}

/// Overrides for the ownership check
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnershipContext {
    /// Record field holding the owner id; falls back to the kind's default
    #[serde(default)]
    pub owner_field: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrollmentContext {
    #[serde(default)]
    pub course_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentContext {
    #[serde(default)]
    pub lab_id: Option<String>,
}

impl PermissionContext {
    /// Context targeting a single resource instance
    pub fn for_resource(resource_id: impl Into<String>) -> Self {
        Self { resource_id: Some(resource_id.into()), attributes: ContextAttributes::None }
    }

    pub fn with_attributes(mut self, attributes: ContextAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Enrollment context for a course; the course doubles as the resource id
    pub fn enrollment(course_id: impl Into<String>) -> Self {
        let course_id = course_id.into();
        Self {
            resource_id: Some(course_id.clone()),
            attributes: ContextAttributes::Enrollment(EnrollmentContext {
                course_id: Some(course_id),
            }),
        }
    }
}
