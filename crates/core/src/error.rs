//! Compliance error taxonomy.
//!
//! Four families, each with its own recovery rule:
//! - `ValidationError`: malformed input, fixed by the caller, never retried.
//! - `DomainInvariantError`: illegal transition or mutation, fatal to the operation.
//! - `IsolationError`: cross-tenant or unscoped access, always opaque.
//! - `Persistence`: storage collaborator failure, propagated verbatim.

use rust_decimal::Decimal;
use thiserror::Error;

use coatbook_shared::AppError;
use coatbook_shared::types::InvoiceId;

use crate::tenancy::{DenialReason, Permission, Role};
use crate::workflow::types::InvoiceStatus;

/// Malformed input data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An invoice needs at least one line item.
    #[error("Invoice must have at least one line item")]
    EmptyLineItems,

    /// Line designation is blank.
    #[error("Line {line}: designation cannot be empty")]
    EmptyDesignation {
        /// Line position (1-based).
        line: usize,
    },

    /// Quantity is zero or negative.
    #[error("Line {line}: quantity must be positive")]
    NonPositiveQuantity {
        /// Line position (1-based).
        line: usize,
    },

    /// Unit price is negative.
    #[error("Line {line}: unit price cannot be negative")]
    NegativeUnitPrice {
        /// Line position (1-based).
        line: usize,
    },

    /// Stored line total disagrees with quantity times unit price.
    #[error("Line {line}: line total {actual} does not match {expected}")]
    LineTotalMismatch {
        /// Line position (1-based).
        line: usize,
        /// Recomputed total.
        expected: Decimal,
        /// Stored total.
        actual: Decimal,
    },

    /// Tax rate outside the supported set.
    #[error("Unsupported tax rate: {0}%")]
    UnsupportedTaxRate(Decimal),

    /// Required party snapshot is absent.
    #[error("Missing {0} party")]
    MissingParty(&'static str),

    /// A required party field is blank.
    #[error("{party} {field} cannot be empty")]
    EmptyPartyField {
        /// Which party (`emitter` or `recipient`).
        party: &'static str,
        /// Which field.
        field: &'static str,
    },

    /// SIRET is not 14 digits.
    #[error("Invalid tax id: {0}")]
    InvalidTaxId(String),

    /// VAT number is not a country prefix followed by 2 to 13 alphanumerics.
    #[error("Invalid VAT number: {0}")]
    InvalidVatNumber(String),

    /// Country code is not two uppercase ASCII letters.
    #[error("Invalid country code: {0}")]
    InvalidCountryCode(String),

    /// IBAN fails the ISO 13616 checksum.
    #[error("Invalid IBAN")]
    InvalidIban,

    /// BIC is not 8 or 11 characters.
    #[error("Invalid BIC: {0}")]
    InvalidBic(String),

    /// E-mail address is malformed.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Document has no number yet.
    #[error("Document has no number")]
    MissingNumber,

    /// Document has no emission date yet.
    #[error("Document has no emission date")]
    MissingIssueDate,

    /// Due date precedes the emission date.
    #[error("Due date {due} is before emission date {issued}")]
    DueDateBeforeIssueDate {
        /// Emission date.
        issued: chrono::NaiveDate,
        /// Due date.
        due: chrono::NaiveDate,
    },

    /// Stored totals disagree with the line items.
    #[error("Totals mismatch: expected {expected}, got {actual}")]
    TotalsMismatch {
        /// Recomputed `total_ttc`.
        expected: Decimal,
        /// Stored `total_ttc`.
        actual: Decimal,
    },

    /// Text is not a document number of the expected layout.
    #[error("Invalid document number: {0}")]
    InvalidDocumentNumber(String),

    /// Payment amount is zero or negative.
    #[error("Payment amount must be positive")]
    NonPositivePaymentAmount,

    /// Payment reference is blank.
    #[error("Payment reference is required")]
    PaymentReferenceRequired,

    /// Payment would exceed the outstanding balance.
    #[error("Payment {amount} exceeds outstanding balance {outstanding}")]
    PaymentExceedsOutstanding {
        /// Payment amount.
        amount: Decimal,
        /// Outstanding balance before the payment.
        outstanding: Decimal,
    },

    /// Only completed payments move an invoice.
    #[error("Payment is not completed")]
    PaymentNotCompleted,

    /// Credit note without a reason.
    #[error("Credit note reason is required")]
    CreditReasonRequired,

    /// Ledger export only handles the functional currency.
    #[error("Currency {currency} differs from functional currency {functional}")]
    UnsupportedCurrency {
        /// Document currency.
        currency: String,
        /// Functional currency of the books.
        functional: String,
    },
}

/// Violation of a lifecycle rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainInvariantError {
    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: InvoiceStatus,
        /// The attempted target status.
        to: InvoiceStatus,
    },

    /// Attempted to modify an invoice that left draft.
    #[error("Cannot modify {status} invoice")]
    CannotModifyIssued {
        /// The current status.
        status: InvoiceStatus,
    },

    /// Only drafts may be deleted.
    #[error("Can only delete draft invoices")]
    CanOnlyDeleteDraft,

    /// Invoice already fully reversed.
    #[error("Invoice is already refunded")]
    AlreadyRefunded,

    /// Credit notes cannot themselves be credited.
    #[error("Cannot issue a credit note against a credit note")]
    CannotCreditCreditNote,

    /// Credit would exceed what remains creditable.
    #[error("Credit {requested} exceeds remaining creditable amount {remaining}")]
    CreditExceedsInvoice {
        /// Requested credit (incl. tax).
        requested: Decimal,
        /// Remaining creditable amount (incl. tax).
        remaining: Decimal,
    },

    /// Credit notes do not receive payments.
    #[error("Credit notes cannot receive payments")]
    NotPayable,

    /// Payment belongs to another invoice.
    #[error("Payment does not belong to invoice {0}")]
    PaymentInvoiceMismatch(InvoiceId),

    /// The number was already used for the same tenant and kind.
    #[error("Document number {0} already assigned")]
    DuplicateNumber(String),

    /// Another transition was applied concurrently.
    #[error("Concurrent modification of invoice {0}")]
    ConcurrentModification(InvoiceId),
}

/// Denied access to a tenant-scoped resource.
///
/// The message is the same for every reason so callers cannot learn whether
/// the resource exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Access denied")]
pub struct IsolationError {
    reason: DenialReason,
}

impl IsolationError {
    /// Creates an isolation error for the given reason.
    #[must_use]
    pub const fn new(reason: DenialReason) -> Self {
        Self { reason }
    }

    /// The precise reason, for security logging only.
    #[must_use]
    pub const fn reason(&self) -> DenialReason {
        self.reason
    }
}

/// Errors surfaced by compliance operations.
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// Malformed input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Lifecycle rule violation.
    #[error(transparent)]
    Invariant(#[from] DomainInvariantError),

    /// Tenant isolation violation.
    #[error(transparent)]
    Isolation(#[from] IsolationError),

    /// Role lacks the permission (tenant already matched).
    #[error("Role {role} lacks permission {permission}")]
    PermissionDenied {
        /// Acting role.
        role: Role,
        /// Required permission.
        permission: Permission,
    },

    /// Shared request budget exhausted.
    #[error("Too many requests, retry in {retry_after_secs}s")]
    Throttled {
        /// Seconds until the window resets.
        retry_after_secs: u64,
    },

    /// Storage collaborator failure.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ComplianceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Invariant(DomainInvariantError::ConcurrentModification(_)) => {
                "CONCURRENT_MODIFICATION"
            }
            Self::Invariant(_) => "DOMAIN_INVARIANT_VIOLATION",
            Self::Isolation(_) => "ACCESS_DENIED",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::Throttled { .. } => "THROTTLED",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Invariant(DomainInvariantError::ConcurrentModification(_)) => 409,
            Self::Invariant(_) => 422,
            Self::Isolation(_) | Self::PermissionDenied { .. } => 403,
            Self::Throttled { .. } => 429,
            Self::Persistence(_) => 500,
        }
    }
}

impl From<ComplianceError> for AppError {
    fn from(err: ComplianceError) -> Self {
        let message = err.to_string();
        match err {
            ComplianceError::Validation(_) => Self::Validation(message),
            ComplianceError::Invariant(DomainInvariantError::ConcurrentModification(_)) => {
                Self::Conflict(message)
            }
            ComplianceError::Invariant(_) => Self::BusinessRule(message),
            ComplianceError::Isolation(_) | ComplianceError::PermissionDenied { .. } => {
                Self::Forbidden(message)
            }
            ComplianceError::Throttled { .. } => Self::TooManyRequests(message),
            ComplianceError::Persistence(_) => Self::Database(message),
        }
    }
}
