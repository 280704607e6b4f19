//! Role catalog
//!
//! Static mapping of role to hierarchy level and default permission set.
//! Every function here is pure and total.

use labgate_types::{Permission, Role};

/// A role's default permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionSet {
    /// Every permission, present and future
    All,
    /// An explicit list of `(resource, action)` pairs
    Explicit(&'static [(&'static str, &'static str)]),
}

impl PermissionSet {
    pub fn contains(&self, permission: &Permission) -> bool {
        match self {
            PermissionSet::All => true,
            PermissionSet::Explicit(pairs) => pairs.iter().any(|(resource, action)| {
                *resource == permission.resource() && *action == permission.action()
            }),
        }
    }

    /// The explicit permissions, or `None` for `All`
    pub fn permissions(&self) -> Option<Vec<Permission>> {
        match self {
            PermissionSet::All => None,
            PermissionSet::Explicit(pairs) => Some(
                pairs
                    .iter()
                    .filter_map(|(resource, action)| Permission::new(*resource, *action).ok())
                    .collect(),
            ),
        }
    }
}

const DOSEN_DEFAULTS: &[(&str, &str)] = &[
    ("courses", "read"),
    ("courses", "update"),
    ("attendance", "read"),
    ("attendance", "create"),
    ("attendance", "update"),
    ("reports", "read"),
    ("reports", "grade"),
    ("labs", "read"),
    ("schedules", "read"),
    ("schedules", "create"),
    ("inventory", "read"),
];

const LABORAN_DEFAULTS: &[(&str, &str)] = &[
    ("labs", "read"),
    ("labs", "update"),
    ("inventory", "read"),
    ("inventory", "create"),
    ("inventory", "update"),
    ("schedules", "read"),
    ("schedules", "update"),
    ("bookings", "read"),
    ("bookings", "approve"),
];

const MAHASISWA_DEFAULTS: &[(&str, &str)] = &[
    ("courses", "read"),
    ("reports", "read"),
    ("reports", "create"),
    ("reports", "update"),
    ("attendance", "read"),
    ("schedules", "read"),
    ("bookings", "create"),
    ("bookings", "read"),
];

pub fn default_permissions(role: Role) -> PermissionSet {
    match role {
        Role::Admin => PermissionSet::All,
        Role::Dosen => PermissionSet::Explicit(DOSEN_DEFAULTS),
        Role::Laboran => PermissionSet::Explicit(LABORAN_DEFAULTS),
        Role::Mahasiswa => PermissionSet::Explicit(MAHASISWA_DEFAULTS),
    }
}

/// Hierarchy level; higher is more privileged
pub fn level(role: Role) -> u8 {
    match role {
        Role::Admin => 100,
        Role::Dosen => 70,
        Role::Laboran => 50,
        Role::Mahasiswa => 10,
    }
}

pub fn role_satisfies(principal_role: Role, required_role: Role) -> bool {
    level(principal_role) >= level(required_role)
}
