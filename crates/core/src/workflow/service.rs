//! Lifecycle service for invoice state transitions.
//!
//! Stateless: each function validates a transition against the current
//! invoice and returns the `LifecycleAction` to apply, with its audit data.
//! Nothing here mutates the invoice or touches storage.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use coatbook_shared::types::{InvoiceId, UserId};

use crate::error::{ComplianceError, DomainInvariantError, ValidationError};
use crate::invoice::validation::{validate_line_items, validate_party};
use crate::invoice::{Invoice, InvoiceKind, Party, Payment};
use crate::numbering::DocumentNumber;
use crate::workflow::types::{InvoiceStatus, LifecycleAction, PaymentStatus};

/// Days between emission and the default due date.
pub const DEFAULT_PAYMENT_DAYS: u64 = 30;

/// Stateless service for invoice lifecycle transitions.
pub struct LifecycleService;

impl LifecycleService {
    /// Checks that a draft can be issued on `issue_date` with these parties.
    ///
    /// Runs before a number is minted so a failing issuance never consumes
    /// one. Returns the due date the invoice will carry.
    pub fn check_issuable(
        invoice: &Invoice,
        emitter: &Party,
        recipient: &Party,
        issue_date: NaiveDate,
    ) -> Result<NaiveDate, ComplianceError> {
        if invoice.status() != InvoiceStatus::Draft || invoice.kind() != InvoiceKind::Invoice {
            return Err(DomainInvariantError::InvalidTransition {
                from: invoice.status(),
                to: InvoiceStatus::Issued,
            }
            .into());
        }
        if invoice.lines().is_empty() {
            return Err(ValidationError::EmptyLineItems.into());
        }
        validate_line_items(invoice.lines())?;
        invoice.check_totals()?;
        validate_party(emitter, "emitter")?;
        validate_party(recipient, "recipient")?;

        let due_date = match invoice.due_date() {
            Some(due) => due,
            None => issue_date
                .checked_add_days(Days::new(DEFAULT_PAYMENT_DAYS))
                .unwrap_or(issue_date),
        };
        if due_date < issue_date {
            return Err(ValidationError::DueDateBeforeIssueDate {
                issued: issue_date,
                due: due_date,
            }
            .into());
        }
        Ok(due_date)
    }

    /// Issues a draft with a freshly minted number.
    ///
    /// The number must belong to the emission year.
    pub fn issue(
        invoice: &Invoice,
        number: DocumentNumber,
        emitter: Party,
        recipient: Party,
        issued_by: UserId,
        issued_at: DateTime<Utc>,
    ) -> Result<LifecycleAction, ComplianceError> {
        let issue_date = issued_at.date_naive();
        let due_date = Self::check_issuable(invoice, &emitter, &recipient, issue_date)?;
        if number.year() != issue_date.year() {
            return Err(ValidationError::InvalidDocumentNumber(number.to_string()).into());
        }

        Ok(LifecycleAction::Issue {
            new_status: InvoiceStatus::Issued,
            number,
            issue_date,
            due_date,
            emitter,
            recipient,
            issued_by,
            issued_at,
        })
    }

    /// Discards a draft.
    pub fn cancel(
        invoice: &Invoice,
        cancelled_by: UserId,
        cancelled_at: DateTime<Utc>,
    ) -> Result<LifecycleAction, DomainInvariantError> {
        match invoice.status() {
            InvoiceStatus::Draft => Ok(LifecycleAction::Cancel {
                new_status: InvoiceStatus::Cancelled,
                cancelled_by,
                cancelled_at,
            }),
            _ => Err(DomainInvariantError::CanOnlyDeleteDraft),
        }
    }

    /// Applies a completed payment.
    ///
    /// `already_credited` is the total of partial credit notes issued against
    /// the invoice: it lowers what is still due. The invoice is `paid` once
    /// payments and credits cover its total. Overpayment is refused.
    pub fn record_payment(
        invoice: &Invoice,
        payment: &Payment,
        already_credited: Decimal,
    ) -> Result<LifecycleAction, ComplianceError> {
        if invoice.kind() == InvoiceKind::CreditNote {
            return Err(DomainInvariantError::NotPayable.into());
        }
        if payment.invoice_id() != invoice.id() {
            return Err(DomainInvariantError::PaymentInvoiceMismatch(invoice.id()).into());
        }
        if !payment.is_completed() {
            return Err(ValidationError::PaymentNotCompleted.into());
        }
        if !matches!(
            invoice.status(),
            InvoiceStatus::Issued | InvoiceStatus::PartiallyPaid
        ) {
            return Err(DomainInvariantError::InvalidTransition {
                from: invoice.status(),
                to: InvoiceStatus::Paid,
            }
            .into());
        }

        let outstanding = Self::amount_due(invoice, already_credited);
        if payment.amount() > outstanding {
            return Err(ValidationError::PaymentExceedsOutstanding {
                amount: payment.amount(),
                outstanding,
            }
            .into());
        }

        let amount_paid = invoice.amount_paid() + payment.amount();
        let (new_status, payment_status) = if payment.amount() == outstanding {
            (InvoiceStatus::Paid, PaymentStatus::Paid)
        } else {
            (InvoiceStatus::PartiallyPaid, PaymentStatus::Partial)
        };

        Ok(LifecycleAction::RecordPayment {
            new_status,
            payment_status,
            payment_id: payment.id(),
            amount: payment.amount(),
            amount_paid,
        })
    }

    /// What the customer still owes once payments and partial credits are
    /// deducted. Never negative.
    #[must_use]
    pub fn amount_due(invoice: &Invoice, already_credited: Decimal) -> Decimal {
        (invoice.outstanding() - already_credited).max(Decimal::ZERO)
    }

    /// Marks an invoice fully reversed by a credit note.
    pub fn refund(
        invoice: &Invoice,
        credit_note_id: InvoiceId,
        credit_note_number: String,
        refunded_by: UserId,
        refunded_at: DateTime<Utc>,
    ) -> Result<LifecycleAction, DomainInvariantError> {
        match invoice.status() {
            status if status.is_creditable() => Ok(LifecycleAction::Refund {
                new_status: InvoiceStatus::Refunded,
                credit_note_id,
                credit_note_number,
                refunded_by,
                refunded_at,
            }),
            InvoiceStatus::Refunded => Err(DomainInvariantError::AlreadyRefunded),
            from => Err(DomainInvariantError::InvalidTransition {
                from,
                to: InvoiceStatus::Refunded,
            }),
        }
    }

    /// Check if a status transition is valid.
    ///
    /// `PartiallyPaid → PartiallyPaid` is a further partial payment.
    #[must_use]
    pub fn is_valid_transition(from: InvoiceStatus, to: InvoiceStatus) -> bool {
        matches!(
            (from, to),
            (
                InvoiceStatus::Draft,
                InvoiceStatus::Issued | InvoiceStatus::Cancelled
            ) | (
                InvoiceStatus::Issued | InvoiceStatus::PartiallyPaid,
                InvoiceStatus::PartiallyPaid | InvoiceStatus::Paid
            ) | (
                InvoiceStatus::Issued | InvoiceStatus::PartiallyPaid | InvoiceStatus::Paid,
                InvoiceStatus::Refunded
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, draft_invoice, emitter, issue, recipient};
    use rust_decimal_macros::dec;

    #[test]
    fn test_issue_from_draft() {
        let invoice = draft_invoice();
        let number = DocumentNumber::parse("FC-2025-0001").unwrap();
        let action = LifecycleService::issue(
            &invoice,
            number.clone(),
            emitter(),
            recipient(),
            UserId::new(),
            at(2025, 3, 14),
        )
        .unwrap();
        assert_eq!(action.new_status(), InvoiceStatus::Issued);
        if let LifecycleAction::Issue {
            issue_date,
            due_date,
            number: minted,
            ..
        } = action
        {
            assert_eq!(minted, number);
            assert_eq!(issue_date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
            assert_eq!(due_date, NaiveDate::from_ymd_opt(2025, 4, 13).unwrap());
        } else {
            panic!("Expected Issue action");
        }
    }

    #[test]
    fn test_issue_requires_lines() {
        let mut invoice = draft_invoice();
        invoice.set_lines(vec![]).unwrap();
        let err = LifecycleService::check_issuable(
            &invoice,
            &emitter(),
            &recipient(),
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ComplianceError::Validation(ValidationError::EmptyLineItems)
        ));
    }

    #[test]
    fn test_issue_rejects_invalid_recipient() {
        let mut bad = recipient();
        bad.address.country_code = "France".to_string();
        let err = LifecycleService::check_issuable(
            &draft_invoice(),
            &emitter(),
            &bad,
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ComplianceError::Validation(ValidationError::InvalidCountryCode(_))
        ));
    }

    #[test]
    fn test_issue_rejects_past_due_date() {
        let mut invoice = draft_invoice();
        invoice
            .set_due_date(NaiveDate::from_ymd_opt(2025, 1, 1))
            .unwrap();
        let err = LifecycleService::check_issuable(
            &invoice,
            &emitter(),
            &recipient(),
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ComplianceError::Validation(ValidationError::DueDateBeforeIssueDate { .. })
        ));
    }

    #[test]
    fn test_issue_rejects_number_of_other_year() {
        let err = LifecycleService::issue(
            &draft_invoice(),
            DocumentNumber::parse("FC-2024-0001").unwrap(),
            emitter(),
            recipient(),
            UserId::new(),
            at(2025, 3, 14),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ComplianceError::Validation(ValidationError::InvalidDocumentNumber(_))
        ));
    }

    #[test]
    fn test_issue_twice_rejected() {
        let invoice = issue(draft_invoice(), "FC-2025-0001", at(2025, 3, 14));
        let err = LifecycleService::check_issuable(
            &invoice,
            &emitter(),
            &recipient(),
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ComplianceError::Invariant(DomainInvariantError::InvalidTransition {
                from: InvoiceStatus::Issued,
                to: InvoiceStatus::Issued
            })
        ));
    }

    #[test]
    fn test_cancel_only_draft() {
        let draft = draft_invoice();
        let action = LifecycleService::cancel(&draft, UserId::new(), Utc::now()).unwrap();
        assert_eq!(action.new_status(), InvoiceStatus::Cancelled);

        let issued = issue(draft_invoice(), "FC-2025-0001", at(2025, 3, 14));
        assert_eq!(
            LifecycleService::cancel(&issued, UserId::new(), Utc::now()),
            Err(DomainInvariantError::CanOnlyDeleteDraft)
        );
    }

    #[test]
    fn test_partial_then_full_payment() {
        // 4 x 45 at 20% -> 216.00
        let mut invoice = issue(draft_invoice(), "FC-2025-0001", at(2025, 3, 14));

        let first = Payment::completed(
            invoice.tenant_id(),
            invoice.id(),
            dec!(100),
            at(2025, 3, 20),
            "VIR-1",
        )
        .unwrap();
        let action = LifecycleService::record_payment(&invoice, &first, Decimal::ZERO).unwrap();
        assert_eq!(action.new_status(), InvoiceStatus::PartiallyPaid);
        invoice.apply(&action).unwrap();
        assert_eq!(invoice.payment_status(), PaymentStatus::Partial);
        assert_eq!(invoice.outstanding(), dec!(116));

        let second = Payment::completed(
            invoice.tenant_id(),
            invoice.id(),
            dec!(116),
            at(2025, 3, 28),
            "VIR-2",
        )
        .unwrap();
        let action = LifecycleService::record_payment(&invoice, &second, Decimal::ZERO).unwrap();
        invoice.apply(&action).unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        assert_eq!(invoice.payment_status(), PaymentStatus::Paid);
        assert_eq!(invoice.amount_paid(), dec!(216));
    }

    #[test]
    fn test_partial_credit_lowers_amount_due() {
        // 216.00 TTC, 108.00 already credited
        let mut invoice = issue(draft_invoice(), "FC-2025-0001", at(2025, 3, 14));
        assert_eq!(LifecycleService::amount_due(&invoice, dec!(108)), dec!(108));

        let too_much = Payment::completed(
            invoice.tenant_id(),
            invoice.id(),
            dec!(108.01),
            at(2025, 3, 20),
            "VIR-1",
        )
        .unwrap();
        assert!(matches!(
            LifecycleService::record_payment(&invoice, &too_much, dec!(108)),
            Err(ComplianceError::Validation(
                ValidationError::PaymentExceedsOutstanding { outstanding, .. }
            )) if outstanding == dec!(108)
        ));

        let rest = Payment::completed(
            invoice.tenant_id(),
            invoice.id(),
            dec!(108),
            at(2025, 3, 20),
            "VIR-2",
        )
        .unwrap();
        let action = LifecycleService::record_payment(&invoice, &rest, dec!(108)).unwrap();
        invoice.apply(&action).unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        assert_eq!(invoice.payment_status(), PaymentStatus::Paid);
        assert_eq!(invoice.amount_paid(), dec!(108));
    }

    #[test]
    fn test_fully_credited_invoice_takes_no_payment() {
        let invoice = issue(draft_invoice(), "FC-2025-0001", at(2025, 3, 14));
        assert_eq!(LifecycleService::amount_due(&invoice, dec!(216)), Decimal::ZERO);

        let payment = Payment::completed(
            invoice.tenant_id(),
            invoice.id(),
            dec!(0.01),
            at(2025, 3, 20),
            "VIR-1",
        )
        .unwrap();
        assert!(matches!(
            LifecycleService::record_payment(&invoice, &payment, dec!(216)),
            Err(ComplianceError::Validation(
                ValidationError::PaymentExceedsOutstanding { outstanding, .. }
            )) if outstanding == Decimal::ZERO
        ));
    }

    #[test]
    fn test_overpayment_rejected() {
        let invoice = issue(draft_invoice(), "FC-2025-0001", at(2025, 3, 14));
        let payment = Payment::completed(
            invoice.tenant_id(),
            invoice.id(),
            dec!(216.01),
            at(2025, 3, 20),
            "VIR-1",
        )
        .unwrap();
        assert!(matches!(
            LifecycleService::record_payment(&invoice, &payment, Decimal::ZERO),
            Err(ComplianceError::Validation(
                ValidationError::PaymentExceedsOutstanding { .. }
            ))
        ));
    }

    #[test]
    fn test_payment_on_draft_rejected() {
        let invoice = draft_invoice();
        let payment = Payment::completed(
            invoice.tenant_id(),
            invoice.id(),
            dec!(10),
            at(2025, 3, 20),
            "VIR-1",
        )
        .unwrap();
        assert!(matches!(
            LifecycleService::record_payment(&invoice, &payment, Decimal::ZERO),
            Err(ComplianceError::Invariant(
                DomainInvariantError::InvalidTransition {
                    from: InvoiceStatus::Draft,
                    ..
                }
            ))
        ));
    }

    #[test]
    fn test_payment_for_other_invoice_rejected() {
        let invoice = issue(draft_invoice(), "FC-2025-0001", at(2025, 3, 14));
        let payment = Payment::completed(
            invoice.tenant_id(),
            InvoiceId::new(),
            dec!(10),
            at(2025, 3, 20),
            "VIR-1",
        )
        .unwrap();
        assert!(matches!(
            LifecycleService::record_payment(&invoice, &payment, Decimal::ZERO),
            Err(ComplianceError::Invariant(
                DomainInvariantError::PaymentInvoiceMismatch(_)
            ))
        ));
    }

    #[test]
    fn test_refund_rules() {
        let issued = issue(draft_invoice(), "FC-2025-0001", at(2025, 3, 14));
        let action = LifecycleService::refund(
            &issued,
            InvoiceId::new(),
            "AV-2025-0001".to_string(),
            UserId::new(),
            Utc::now(),
        )
        .unwrap();
        let mut refunded = issued.clone();
        refunded.apply(&action).unwrap();
        assert_eq!(refunded.status(), InvoiceStatus::Refunded);
        assert_eq!(refunded.payment_status(), PaymentStatus::Refunded);

        assert_eq!(
            LifecycleService::refund(
                &refunded,
                InvoiceId::new(),
                "AV-2025-0002".to_string(),
                UserId::new(),
                Utc::now()
            ),
            Err(DomainInvariantError::AlreadyRefunded)
        );
        assert!(matches!(
            LifecycleService::refund(
                &draft_invoice(),
                InvoiceId::new(),
                "AV-2025-0003".to_string(),
                UserId::new(),
                Utc::now()
            ),
            Err(DomainInvariantError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_stale_action_not_replayed() {
        let mut invoice = draft_invoice();
        let cancel = LifecycleService::cancel(&invoice, UserId::new(), Utc::now()).unwrap();
        invoice.apply(&cancel).unwrap();
        assert!(invoice.apply(&cancel).is_err());
    }
}
