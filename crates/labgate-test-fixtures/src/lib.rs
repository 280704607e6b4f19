//! Test fixtures for labgate integration tests
//!
//! Builders for principals, grants and resource records, a seeded campus
//! backend, and the shared proptest configuration.

#![deny(unsafe_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod campus;
pub mod proptest_config;

use chrono::{DateTime, Duration, Utc};
use labgate_types::{Grant, Permission, Principal, ResourceRecord, Role};

pub use campus::campus_backend;

pub fn principal(id: &str, role: Role) -> Principal {
    Principal::new(id, role)
}

pub fn inactive_principal(id: &str, role: Role) -> Principal {
    Principal { active: false, ..Principal::new(id, role) }
}

/// Permanent grant issued a week ago by `a1`
pub fn grant(principal_id: &str, permission: &str) -> Grant {
    grant_expiring(principal_id, permission, None)
}

pub fn grant_expiring(
    principal_id: &str,
    permission: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Grant {
    Grant {
        principal_id: principal_id.to_string(),
        permission: Permission::parse(permission).expect("fixture permission must be well-formed"),
        granted_by: "a1".to_string(),
        granted_at: Utc::now() - Duration::days(7),
        expires_at,
    }
}

/// Grant that lapsed an hour ago
pub fn expired_grant(principal_id: &str, permission: &str) -> Grant {
    grant_expiring(principal_id, permission, Some(Utc::now() - Duration::hours(1)))
}

pub fn report(id: &str, student_id: &str) -> ResourceRecord {
    ResourceRecord::new("reports", id).with_field("student_id", student_id)
}

pub fn booking(id: &str, user_id: &str) -> ResourceRecord {
    ResourceRecord::new("bookings", id).with_field("user_id", user_id)
}
