//! # Labgate Constants
//!
//! Centralized constants used across the labgate crates.
//! Reason strings live here so callers and dashboards can match on a single
//! source of truth instead of scattering literals.

// ============================================================================
// Cache Constants
// ============================================================================

/// Default time-to-live for cached decisions, in seconds
///
/// Deliberately coarser than grant expiry precision. Callers that need an
/// immediate revocation must invalidate the principal explicitly.
pub const DEFAULT_DECISION_TTL_SECS: u64 = 300;

/// Channel capacity for identity-change notifications
///
/// A watcher that lags behind by more than this many events clears the whole
/// cache once and resumes.
pub const IDENTITY_CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// Denial Reasons
// ============================================================================

pub const REASON_USER_NOT_FOUND: &str = "User not found";
pub const REASON_USER_INACTIVE: &str = "User inactive";
pub const REASON_CHECK_FAILED: &str = "Permission check failed";
pub const REASON_MISSING_PERMISSION_PREFIX: &str = "Missing permission";
pub const REASON_NOT_OWNER: &str = "Not resource owner";
pub const REASON_RESOURCE_NOT_FOUND: &str = "Resource not found";
pub const REASON_NOT_ENROLLED: &str = "Not enrolled in course";
pub const REASON_INSUFFICIENT_ROLE: &str = "Insufficient role";
pub const REASON_NO_PERMISSIONS_REQUESTED: &str = "No permissions requested";

// ============================================================================
// Allow Reasons
// ============================================================================

pub const REASON_ALLOWED_BY_ROLE: &str = "Allowed by role";
pub const REASON_ALLOWED_BY_GRANT: &str = "Allowed by grant";
pub const REASON_ALL_GRANTED: &str = "All permissions granted";
pub const REASON_NO_CONTEXT_REQUIRED: &str = "No additional context required";
pub const REASON_NO_ENROLLMENT_CHECK: &str = "No enrollment check required";
pub const REASON_OWNER: &str = "Resource owner";
pub const REASON_ENROLLED: &str = "Enrolled in course";
pub const REASON_ASSIGNMENT_UNCHECKED: &str = "Lab assignment not verified";

// ============================================================================
// Well-known Resource Kinds
// ============================================================================

pub const RESOURCE_REPORTS: &str = "reports";
pub const RESOURCE_BOOKINGS: &str = "bookings";
pub const RESOURCE_LABS: &str = "labs";
pub const RESOURCE_COURSES: &str = "courses";
