//! Property-based tests for LifecycleService.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use coatbook_shared::types::{InvoiceId, UserId};

use crate::error::{ComplianceError, DomainInvariantError};
use crate::invoice::Payment;
use crate::test_support::{at, draft_invoice, issue};
use crate::workflow::service::LifecycleService;
use crate::workflow::types::{InvoiceStatus, PaymentStatus};

fn arb_status() -> impl Strategy<Value = InvoiceStatus> {
    prop_oneof![
        Just(InvoiceStatus::Draft),
        Just(InvoiceStatus::Issued),
        Just(InvoiceStatus::PartiallyPaid),
        Just(InvoiceStatus::Paid),
        Just(InvoiceStatus::Refunded),
        Just(InvoiceStatus::Cancelled),
    ]
}

/// Splits of 216.00 into cents, as integers.
fn arb_installments() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..10_000i64, 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Nothing leaves a terminal state.
    #[test]
    fn prop_terminal_states_have_no_exit(to in arb_status()) {
        prop_assert!(!LifecycleService::is_valid_transition(InvoiceStatus::Refunded, to));
        prop_assert!(!LifecycleService::is_valid_transition(InvoiceStatus::Cancelled, to));
    }

    /// No transition leads back to draft.
    #[test]
    fn prop_never_back_to_draft(from in arb_status()) {
        prop_assert!(!LifecycleService::is_valid_transition(from, InvoiceStatus::Draft));
    }

    /// Only drafts can be cancelled.
    #[test]
    fn prop_only_draft_cancellable(from in arb_status()) {
        prop_assert_eq!(
            LifecycleService::is_valid_transition(from, InvoiceStatus::Cancelled),
            from == InvoiceStatus::Draft
        );
    }

    /// Cumulative payments never exceed total_ttc; the invoice is paid
    /// exactly when they reach it.
    #[test]
    fn prop_payments_never_overshoot(cents in arb_installments()) {
        let mut invoice = issue(draft_invoice(), "FC-2025-0001", at(2025, 3, 14));
        let total = invoice.totals().total_ttc;

        for (i, c) in cents.into_iter().enumerate() {
            let amount = Decimal::new(c, 2);
            let payment = Payment::completed(
                invoice.tenant_id(),
                invoice.id(),
                amount,
                Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap(),
                format!("VIR-{i}"),
            )
            .unwrap();
            match LifecycleService::record_payment(&invoice, &payment, Decimal::ZERO) {
                Ok(action) => invoice.apply(&action).unwrap(),
                Err(ComplianceError::Validation(_)) => {
                    prop_assert!(amount > invoice.outstanding());
                }
                Err(ComplianceError::Invariant(DomainInvariantError::InvalidTransition { from, .. })) => {
                    prop_assert_eq!(from, InvoiceStatus::Paid);
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
            prop_assert!(invoice.amount_paid() <= total);
            prop_assert_eq!(
                invoice.payment_status() == PaymentStatus::Paid,
                invoice.amount_paid() == total
            );
        }
    }

    /// A refund is available from every creditable status and nowhere else.
    #[test]
    fn prop_refund_only_from_creditable(status in arb_status()) {
        let mut invoice = issue(draft_invoice(), "FC-2025-0001", at(2025, 3, 14));
        invoice.status = status;
        let result = LifecycleService::refund(
            &invoice,
            InvoiceId::new(),
            "AV-2025-0001".to_string(),
            UserId::new(),
            Utc::now(),
        );
        prop_assert_eq!(result.is_ok(), status.is_creditable());
    }
}
