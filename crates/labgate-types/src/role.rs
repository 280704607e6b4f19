//! Role identifiers
//!
//! Levels and default permission sets live in the role catalog of
//! `labgate-core`; this module only names the roles.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named privilege tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Laboratory administrator
    Admin,
    /// Lecturer
    Dosen,
    /// Lab technician
    Laboran,
    /// Student
    Mahasiswa,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role: {0}")]
pub struct RoleParseError(pub String);

impl Role {
    pub const fn all() -> [Role; 4] {
        [Role::Admin, Role::Dosen, Role::Laboran, Role::Mahasiswa]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Dosen => "dosen",
            Role::Laboran => "laboran",
            Role::Mahasiswa => "mahasiswa",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::all()
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RoleParseError(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_str() {
        for role in Role::all() {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!("Dosen".parse::<Role>().unwrap(), Role::Dosen);
    }

    #[test]
    fn test_unknown_role() {
        assert_eq!("rektor".parse::<Role>(), Err(RoleParseError("rektor".to_string())));
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Laboran).unwrap(), "\"laboran\"");
    }
}
