//! Lifecycle domain types.
//!
//! Valid transitions:
//! - Draft → Issued (issue)
//! - Draft → Cancelled (cancel)
//! - Issued | PartiallyPaid → PartiallyPaid | Paid (completed payment)
//! - Issued | PartiallyPaid | Paid → Refunded (full credit note)

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use coatbook_shared::types::{InvoiceId, PaymentId, UserId};

use crate::invoice::Party;
use crate::numbering::DocumentNumber;

/// Invoice status in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Being prepared, freely editable.
    Draft,
    /// Numbered and frozen.
    Issued,
    /// Some completed payments received.
    PartiallyPaid,
    /// Fully paid.
    Paid,
    /// Fully reversed by a credit note.
    Refunded,
    /// Draft discarded before issuance.
    Cancelled,
}

impl InvoiceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Issued => "issued",
            Self::PartiallyPaid => "partially_paid",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "issued" => Some(Self::Issued),
            "partially_paid" => Some(Self::PartiallyPaid),
            "paid" => Some(Self::Paid),
            "refunded" => Some(Self::Refunded),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if the invoice can still be edited.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true once the invoice carries a legal number.
    #[must_use]
    pub fn is_issued(&self) -> bool {
        matches!(
            self,
            Self::Issued | Self::PartiallyPaid | Self::Paid | Self::Refunded
        )
    }

    /// Returns true if a credit note may still be issued against it.
    #[must_use]
    pub fn is_creditable(&self) -> bool {
        matches!(self, Self::Issued | Self::PartiallyPaid | Self::Paid)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Nothing received.
    Unpaid,
    /// Part of `total_ttc` received.
    Partial,
    /// `total_ttc` received.
    Paid,
    /// Reversed by a credit note.
    Refunded,
}

impl PaymentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle action representing a state transition with audit data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LifecycleAction {
    /// Issue a draft.
    Issue {
        /// The new status after issuance.
        new_status: InvoiceStatus,
        /// The minted number.
        number: DocumentNumber,
        /// Emission date.
        issue_date: NaiveDate,
        /// Due date.
        due_date: NaiveDate,
        /// Frozen seller snapshot.
        emitter: Party,
        /// Frozen buyer snapshot.
        recipient: Party,
        /// The user who issued the invoice.
        issued_by: UserId,
        /// When the invoice was issued.
        issued_at: DateTime<Utc>,
    },
    /// Discard a draft.
    Cancel {
        /// The new status after cancellation.
        new_status: InvoiceStatus,
        /// The user who cancelled the draft.
        cancelled_by: UserId,
        /// When the draft was cancelled.
        cancelled_at: DateTime<Utc>,
    },
    /// Apply a completed payment.
    RecordPayment {
        /// The new status after the payment.
        new_status: InvoiceStatus,
        /// The new settlement status.
        payment_status: PaymentStatus,
        /// The payment applied.
        payment_id: PaymentId,
        /// Amount of this payment.
        amount: Decimal,
        /// Cumulative amount paid after this payment.
        amount_paid: Decimal,
    },
    /// Fully reverse an invoice.
    Refund {
        /// The new status after the reversal.
        new_status: InvoiceStatus,
        /// The reversing credit note.
        credit_note_id: InvoiceId,
        /// Its number.
        credit_note_number: String,
        /// The user who issued the credit note.
        refunded_by: UserId,
        /// When it was issued.
        refunded_at: DateTime<Utc>,
    },
}

impl LifecycleAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub fn new_status(&self) -> InvoiceStatus {
        match self {
            Self::Issue { new_status, .. }
            | Self::Cancel { new_status, .. }
            | Self::RecordPayment { new_status, .. }
            | Self::Refund { new_status, .. } => *new_status,
        }
    }

    /// Audit label of the action.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Issue { .. } => "invoice.issued",
            Self::Cancel { .. } => "invoice.cancelled",
            Self::RecordPayment { .. } => "invoice.payment_recorded",
            Self::Refund { .. } => "invoice.refunded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Issued,
            InvoiceStatus::PartiallyPaid,
            InvoiceStatus::Paid,
            InvoiceStatus::Refunded,
            InvoiceStatus::Cancelled,
        ] {
            assert_eq!(InvoiceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InvoiceStatus::parse("ISSUED"), Some(InvoiceStatus::Issued));
        assert_eq!(InvoiceStatus::parse("posted"), None);
    }

    #[test]
    fn test_status_flags() {
        assert!(InvoiceStatus::Draft.is_editable());
        assert!(!InvoiceStatus::Issued.is_editable());
        assert!(!InvoiceStatus::Draft.is_issued());
        assert!(!InvoiceStatus::Cancelled.is_issued());
        assert!(InvoiceStatus::Refunded.is_issued());
        assert!(InvoiceStatus::Paid.is_creditable());
        assert!(!InvoiceStatus::Refunded.is_creditable());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::PartiallyPaid).unwrap(),
            "\"partially_paid\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Partial).unwrap(),
            "\"partial\""
        );
    }
}
