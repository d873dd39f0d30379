//! Roles and permissions of tenant members.

use std::fmt;

use serde::{Deserialize, Serialize};

use coatbook_shared::types::{TenantId, UserId};

use crate::error::{ComplianceError, IsolationError};
use crate::tenancy::guard::ensure_access;

/// Member role, ordered from lowest to highest privilege.
///
/// Higher roles can perform all actions of lower roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only access.
    Viewer = 0,
    /// Workshop operator: prepares drafts.
    Operator = 1,
    /// Bookkeeper: records payments, exports the ledger.
    Accountant = 2,
    /// Full access except ownership transfer.
    Admin = 3,
    /// Full access.
    Owner = 4,
}

impl Role {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "viewer" => Some(Self::Viewer),
            "operator" => Some(Self::Operator),
            "accountant" => Some(Self::Accountant),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Operator => "operator",
            Self::Accountant => "accountant",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Returns true if this role grants the permission.
    #[must_use]
    pub fn allows(self, permission: Permission) -> bool {
        self >= permission.minimum_role()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions subject to a role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Create, edit and cancel drafts.
    EditDraft,
    /// Issue an invoice.
    IssueInvoice,
    /// Issue a credit note.
    IssueCreditNote,
    /// Record a completed payment.
    RecordPayment,
    /// Produce a ledger export.
    ExportLedger,
}

impl Permission {
    /// Lowest role granted this permission.
    #[must_use]
    pub fn minimum_role(self) -> Role {
        match self {
            Self::EditDraft => Role::Operator,
            Self::IssueInvoice | Self::RecordPayment | Self::ExportLedger => Role::Accountant,
            Self::IssueCreditNote => Role::Admin,
        }
    }

    /// Returns the string representation of the permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EditDraft => "edit_draft",
            Self::IssueInvoice => "issue_invoice",
            Self::IssueCreditNote => "issue_credit_note",
            Self::RecordPayment => "record_payment",
            Self::ExportLedger => "export_ledger",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified identity of the caller, as resolved by authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingContext {
    /// Tenant the caller acts for.
    pub tenant_id: TenantId,
    /// Authenticated user.
    pub user_id: UserId,
    /// Role of the user within the tenant.
    pub role: Role,
}

impl ActingContext {
    /// Creates a new acting context.
    #[must_use]
    pub const fn new(tenant_id: TenantId, user_id: UserId, role: Role) -> Self {
        Self {
            tenant_id,
            user_id,
            role,
        }
    }

    /// Tenant check only.
    pub fn ensure_tenant(&self, resource: TenantId) -> Result<(), IsolationError> {
        ensure_access(resource, self.tenant_id)
    }

    /// Tenant check, then role check.
    pub fn ensure(&self, resource: TenantId, permission: Permission) -> Result<(), ComplianceError> {
        self.ensure_tenant(resource)?;
        self.ensure_permission(permission)
    }

    /// Role check only.
    pub fn ensure_permission(&self, permission: Permission) -> Result<(), ComplianceError> {
        if self.role.allows(permission) {
            Ok(())
        } else {
            Err(ComplianceError::PermissionDenied {
                role: self.role,
                permission,
            })
        }
    }
}
