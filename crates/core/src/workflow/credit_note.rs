//! Credit notes (avoirs).
//!
//! An issued invoice is never edited or deleted. It is corrected by a new,
//! separately numbered credit note that snapshots the source parties and
//! links back to the source. A full credit note moves the source to
//! `refunded`; partial ones leave its status alone but the credited total
//! can never exceed the source `total_ttc`.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use coatbook_shared::types::{InvoiceId, UserId};

use crate::error::{ComplianceError, DomainInvariantError, ValidationError};
use crate::invoice::validation::validate_line_items;
use crate::invoice::{Invoice, InvoiceKind, LineItem, ReversalLink, Totals};
use crate::numbering::DocumentNumber;
use crate::workflow::service::LifecycleService;
use crate::workflow::types::{InvoiceStatus, LifecycleAction, PaymentStatus};

/// What the credit note reverses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "lines", rename_all = "snake_case")]
pub enum CreditNoteScope {
    /// Every line of the source.
    Full,
    /// The given lines only.
    Partial(Vec<LineItem>),
}

/// A request to credit an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditNoteRequest {
    /// Full or partial reversal.
    pub scope: CreditNoteScope,
    /// Why the invoice is credited. Printed on the document.
    pub reason: String,
}

/// Output of a credit note creation.
#[derive(Debug)]
pub struct CreditNoteOutput {
    /// The issued credit note.
    pub credit_note: Invoice,
    /// Action to apply to the source (`Refund` on a full credit note).
    pub source_action: Option<LifecycleAction>,
}

/// Stateless service for creating credit notes.
pub struct CreditNoteService;

impl CreditNoteService {
    /// Validates a request against the source and what was already credited.
    ///
    /// Runs before a number is minted. Returns the lines to credit.
    pub fn check(
        source: &Invoice,
        already_credited: Decimal,
        request: &CreditNoteRequest,
    ) -> Result<Vec<LineItem>, ComplianceError> {
        if request.reason.trim().is_empty() {
            return Err(ValidationError::CreditReasonRequired.into());
        }
        if source.kind() == InvoiceKind::CreditNote {
            return Err(DomainInvariantError::CannotCreditCreditNote.into());
        }
        match source.status() {
            status if status.is_creditable() => {}
            InvoiceStatus::Refunded => return Err(DomainInvariantError::AlreadyRefunded.into()),
            from => {
                return Err(DomainInvariantError::InvalidTransition {
                    from,
                    to: InvoiceStatus::Refunded,
                }
                .into());
            }
        }
        if source.number().is_none() {
            return Err(ValidationError::MissingNumber.into());
        }
        if source.issue_date().is_none() {
            return Err(ValidationError::MissingIssueDate.into());
        }

        let remaining = source.totals().total_ttc - already_credited;
        let lines = match &request.scope {
            CreditNoteScope::Full => {
                if already_credited > Decimal::ZERO {
                    return Err(DomainInvariantError::CreditExceedsInvoice {
                        requested: source.totals().total_ttc,
                        remaining,
                    }
                    .into());
                }
                source.lines().to_vec()
            }
            CreditNoteScope::Partial(lines) => {
                if lines.is_empty() {
                    return Err(ValidationError::EmptyLineItems.into());
                }
                validate_line_items(lines)?;
                let requested = Totals::compute(lines).total_ttc;
                if requested > remaining {
                    return Err(DomainInvariantError::CreditExceedsInvoice {
                        requested,
                        remaining,
                    }
                    .into());
                }
                lines.clone()
            }
        };
        Ok(lines)
    }

    /// Creates the credit note with its minted number.
    ///
    /// The number must belong to the year the note is created in.
    pub fn create(
        source: &Invoice,
        already_credited: Decimal,
        request: &CreditNoteRequest,
        number: DocumentNumber,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<CreditNoteOutput, ComplianceError> {
        let lines = Self::check(source, already_credited, request)?;
        let (Some(source_number), Some(source_date)) = (source.number(), source.issue_date())
        else {
            return Err(ValidationError::MissingNumber.into());
        };
        let emitter = source
            .emitter()
            .cloned()
            .ok_or(ValidationError::MissingParty("emitter"))?;
        let recipient = source
            .recipient()
            .cloned()
            .ok_or(ValidationError::MissingParty("recipient"))?;

        let issue_date = created_at.date_naive();
        if number.year() != issue_date.year() {
            return Err(ValidationError::InvalidDocumentNumber(number.to_string()).into());
        }
        let id = InvoiceId::new();
        let credit_note = Invoice {
            id,
            tenant_id: source.tenant_id(),
            client_id: source.client_id(),
            kind: InvoiceKind::CreditNote,
            nature: source.nature(),
            number: Some(number.clone()),
            status: InvoiceStatus::Issued,
            payment_status: PaymentStatus::Unpaid,
            currency: source.currency(),
            issue_date: Some(issue_date),
            due_date: Some(issue_date),
            emitter: Some(emitter),
            recipient: Some(recipient),
            totals: Totals::compute(&lines),
            lines,
            reversal: Some(ReversalLink {
                invoice_id: source.id(),
                number: source_number.to_string(),
                issue_date: source_date,
            }),
            payment_terms: None,
            exemption_reason: source.exemption_reason().map(str::to_string),
            credit_reason: Some(request.reason.trim().to_string()),
            amount_paid: Decimal::ZERO,
            version: 0,
            created_at,
            issued_at: Some(created_at),
        };

        let source_action = match request.scope {
            CreditNoteScope::Full => Some(LifecycleService::refund(
                source,
                id,
                number.to_string(),
                created_by,
                created_at,
            )?),
            CreditNoteScope::Partial(_) => None,
        };

        Ok(CreditNoteOutput {
            credit_note,
            source_action,
        })
    }
}
