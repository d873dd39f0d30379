//! The invoice aggregate.
//!
//! Fields are only writable inside the crate. Outside code edits a draft
//! through the setters below, which refuse once the invoice left `draft`,
//! and moves it along the lifecycle through [`Invoice::apply`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use coatbook_shared::types::{ClientId, Currency, InvoiceId, TenantId};

use crate::error::{ComplianceError, DomainInvariantError, ValidationError};
use crate::invoice::totals::tax_breakdown;
use crate::invoice::types::{
    InvoiceKind, LineItem, Party, ReversalLink, SaleNature, TaxSubtotal, Totals,
};
use crate::invoice::validation::validate_line_items;
use crate::numbering::DocumentNumber;
use crate::workflow::types::{InvoiceStatus, LifecycleAction, PaymentStatus};

/// Editable content of a new draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceDraft {
    /// Services or goods.
    #[serde(default)]
    pub nature: SaleNature,
    /// Invoice currency.
    #[serde(default)]
    pub currency: Currency,
    /// Billed lines.
    #[serde(default)]
    pub lines: Vec<LineItem>,
    /// Due date. Defaults to 30 days after emission.
    pub due_date: Option<NaiveDate>,
    /// Free-text payment terms.
    pub payment_terms: Option<String>,
    /// VAT exemption reason printed for 0% lines.
    pub exemption_reason: Option<String>,
}

/// An invoice or credit note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub(crate) id: InvoiceId,
    pub(crate) tenant_id: TenantId,
    pub(crate) client_id: ClientId,
    pub(crate) kind: InvoiceKind,
    pub(crate) nature: SaleNature,
    pub(crate) number: Option<DocumentNumber>,
    pub(crate) status: InvoiceStatus,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) currency: Currency,
    pub(crate) issue_date: Option<NaiveDate>,
    pub(crate) due_date: Option<NaiveDate>,
    pub(crate) emitter: Option<Party>,
    pub(crate) recipient: Option<Party>,
    pub(crate) lines: Vec<LineItem>,
    pub(crate) totals: Totals,
    pub(crate) reversal: Option<ReversalLink>,
    pub(crate) payment_terms: Option<String>,
    pub(crate) exemption_reason: Option<String>,
    pub(crate) credit_reason: Option<String>,
    pub(crate) amount_paid: Decimal,
    pub(crate) version: u64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) issued_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Creates a draft invoice for a client.
    pub fn draft(
        tenant_id: TenantId,
        client_id: ClientId,
        draft: InvoiceDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        validate_line_items(&draft.lines)?;
        Ok(Self {
            id: InvoiceId::new(),
            tenant_id,
            client_id,
            kind: InvoiceKind::Invoice,
            nature: draft.nature,
            number: None,
            status: InvoiceStatus::Draft,
            payment_status: PaymentStatus::Unpaid,
            currency: draft.currency,
            issue_date: None,
            due_date: draft.due_date,
            emitter: None,
            recipient: None,
            totals: Totals::compute(&draft.lines),
            lines: draft.lines,
            reversal: None,
            payment_terms: draft.payment_terms,
            exemption_reason: draft.exemption_reason,
            credit_reason: None,
            amount_paid: Decimal::ZERO,
            version: 0,
            created_at,
            issued_at: None,
        })
    }

    /// Invoice id.
    #[must_use]
    pub fn id(&self) -> InvoiceId {
        self.id
    }

    /// Owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Live client reference. Only meaningful while draft.
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Invoice or credit note.
    #[must_use]
    pub fn kind(&self) -> InvoiceKind {
        self.kind
    }

    /// Services or goods.
    #[must_use]
    pub fn nature(&self) -> SaleNature {
        self.nature
    }

    /// Legal number, assigned at issuance.
    #[must_use]
    pub fn number(&self) -> Option<&DocumentNumber> {
        self.number.as_ref()
    }

    /// Lifecycle status.
    #[must_use]
    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    /// Settlement status.
    #[must_use]
    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// Document currency.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Emission date.
    #[must_use]
    pub fn issue_date(&self) -> Option<NaiveDate> {
        self.issue_date
    }

    /// Due date.
    #[must_use]
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Seller snapshot.
    #[must_use]
    pub fn emitter(&self) -> Option<&Party> {
        self.emitter.as_ref()
    }

    /// Buyer snapshot.
    #[must_use]
    pub fn recipient(&self) -> Option<&Party> {
        self.recipient.as_ref()
    }

    /// Billed lines, in order.
    #[must_use]
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// Derived totals.
    #[must_use]
    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Per-rate tax breakdown.
    #[must_use]
    pub fn tax_breakdown(&self) -> Vec<TaxSubtotal> {
        tax_breakdown(&self.lines)
    }

    /// Link to the reversed invoice (credit notes only).
    #[must_use]
    pub fn reversal(&self) -> Option<&ReversalLink> {
        self.reversal.as_ref()
    }

    /// Payment terms text.
    #[must_use]
    pub fn payment_terms(&self) -> Option<&str> {
        self.payment_terms.as_deref()
    }

    /// VAT exemption reason.
    #[must_use]
    pub fn exemption_reason(&self) -> Option<&str> {
        self.exemption_reason.as_deref()
    }

    /// Why the credit note was issued.
    #[must_use]
    pub fn credit_reason(&self) -> Option<&str> {
        self.credit_reason.as_deref()
    }

    /// Sum of completed payments.
    #[must_use]
    pub fn amount_paid(&self) -> Decimal {
        self.amount_paid
    }

    /// `total_ttc` minus what was paid.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        self.totals.total_ttc - self.amount_paid
    }

    /// Optimistic concurrency version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Issuance timestamp.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    /// Returns true once numbered and frozen.
    #[must_use]
    pub fn is_issued(&self) -> bool {
        self.status.is_issued()
    }

    /// Recomputes totals and compares them with the stored ones.
    pub fn check_totals(&self) -> Result<(), ValidationError> {
        let expected = Totals::compute(&self.lines);
        if expected == self.totals {
            Ok(())
        } else {
            Err(ValidationError::TotalsMismatch {
                expected: expected.total_ttc,
                actual: self.totals.total_ttc,
            })
        }
    }

    fn ensure_draft(&self) -> Result<(), DomainInvariantError> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(DomainInvariantError::CannotModifyIssued {
                status: self.status,
            })
        }
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    /// Replaces the lines and recomputes the totals.
    pub fn set_lines(&mut self, lines: Vec<LineItem>) -> Result<(), ComplianceError> {
        self.ensure_draft()?;
        validate_line_items(&lines)?;
        self.totals = Totals::compute(&lines);
        self.lines = lines;
        self.touch();
        Ok(())
    }

    /// Points the draft at another client.
    pub fn set_client(&mut self, client_id: ClientId) -> Result<(), ComplianceError> {
        self.ensure_draft()?;
        self.client_id = client_id;
        self.touch();
        Ok(())
    }

    /// Sets or clears the due date.
    pub fn set_due_date(&mut self, due_date: Option<NaiveDate>) -> Result<(), ComplianceError> {
        self.ensure_draft()?;
        self.due_date = due_date;
        self.touch();
        Ok(())
    }

    /// Sets or clears the payment terms.
    pub fn set_payment_terms(&mut self, terms: Option<String>) -> Result<(), ComplianceError> {
        self.ensure_draft()?;
        self.payment_terms = terms;
        self.touch();
        Ok(())
    }

    /// Sets or clears the VAT exemption reason.
    pub fn set_exemption_reason(&mut self, reason: Option<String>) -> Result<(), ComplianceError> {
        self.ensure_draft()?;
        self.exemption_reason = reason;
        self.touch();
        Ok(())
    }

    /// Changes the sale nature.
    pub fn set_nature(&mut self, nature: SaleNature) -> Result<(), ComplianceError> {
        self.ensure_draft()?;
        self.nature = nature;
        self.touch();
        Ok(())
    }

    /// Applies a lifecycle action produced by the workflow services.
    ///
    /// Refuses an action whose target status is not reachable from the
    /// current one, so a stale action cannot be replayed.
    pub fn apply(&mut self, action: &LifecycleAction) -> Result<(), DomainInvariantError> {
        let to = action.new_status();
        if !crate::workflow::LifecycleService::is_valid_transition(self.status, to) {
            return Err(DomainInvariantError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        match action {
            LifecycleAction::Issue {
                new_status,
                number,
                issue_date,
                due_date,
                emitter,
                recipient,
                issued_at,
                ..
            } => {
                self.status = *new_status;
                self.number = Some(number.clone());
                self.issue_date = Some(*issue_date);
                self.due_date = Some(*due_date);
                self.emitter = Some(emitter.clone());
                self.recipient = Some(recipient.clone());
                self.issued_at = Some(*issued_at);
            }
            LifecycleAction::Cancel { new_status, .. } => {
                self.status = *new_status;
            }
            LifecycleAction::RecordPayment {
                new_status,
                payment_status,
                amount_paid,
                ..
            } => {
                self.status = *new_status;
                self.payment_status = *payment_status;
                self.amount_paid = *amount_paid;
            }
            LifecycleAction::Refund { new_status, .. } => {
                self.status = *new_status;
                self.payment_status = PaymentStatus::Refunded;
            }
        }
        self.touch();
        Ok(())
    }
}
