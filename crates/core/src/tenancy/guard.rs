//! Tenant isolation guard.
//!
//! Every tenant-scoped read or write passes through [`authorize`] before any
//! other component runs. Role checks come after and never override a denial.

use std::fmt;

use serde::Serialize;

use coatbook_shared::types::TenantId;

use crate::error::IsolationError;

/// Why access was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// One of the tenant ids is absent or nil.
    MissingTenantContext,
    /// The tenants differ.
    CrossTenantAccess,
    /// The resource does not exist. Reported with the same opaque error as
    /// a cross-tenant access.
    NotFound,
}

impl DenialReason {
    /// Returns the string representation of the reason.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingTenantContext => "missing tenant context",
            Self::CrossTenantAccess => "cross-tenant access",
            Self::NotFound => "not found",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the isolation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Same tenant.
    Allowed,
    /// Access refused.
    Denied(DenialReason),
}

impl Access {
    /// Returns true if access is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

fn present(id: Option<TenantId>) -> Option<TenantId> {
    id.filter(|id| !id.is_nil())
}

/// Decides whether the acting tenant may touch a resource of `resource`.
///
/// A nil UUID counts as an absent id.
pub fn authorize(
    resource: impl Into<Option<TenantId>>,
    acting: impl Into<Option<TenantId>>,
) -> Access {
    match (present(resource.into()), present(acting.into())) {
        (Some(resource), Some(acting)) if resource == acting => Access::Allowed,
        (Some(_), Some(_)) => Access::Denied(DenialReason::CrossTenantAccess),
        _ => Access::Denied(DenialReason::MissingTenantContext),
    }
}

/// Like [`authorize`] but returns the opaque error on denial.
pub fn ensure_access(
    resource: impl Into<Option<TenantId>>,
    acting: impl Into<Option<TenantId>>,
) -> Result<(), IsolationError> {
    match authorize(resource, acting) {
        Access::Allowed => Ok(()),
        Access::Denied(reason) => Err(IsolationError::new(reason)),
    }
}
