//! Property-based tests for the FEC export.

use std::collections::BTreeMap;
use std::str::FromStr;

use proptest::prelude::*;
use rust_decimal::Decimal;

use coatbook_shared::config::LedgerConfig;

use crate::invoice::validation::supported_tax_rates;
use crate::invoice::{Invoice, LineItem, Payment};
use crate::ledger::entry::FEC_COLUMNS;
use crate::ledger::export::LedgerExportBuilder;
use crate::test_support::{at, draft_with, issue};

fn arb_line() -> impl Strategy<Value = LineItem> {
    (
        1i64..2_000i64,
        1i64..500_000i64,
        prop::sample::select(supported_tax_rates().to_vec()),
    )
        .prop_map(|(qty, price, rate)| {
            LineItem::new("Thermolaquage", Decimal::new(qty, 1), Decimal::new(price, 2), rate)
        })
}

/// Issued invoices, each with an optional payment as a percentage of its total.
fn arb_books() -> impl Strategy<Value = (Vec<Invoice>, Vec<Payment>)> {
    prop::collection::vec(
        (prop::collection::vec(arb_line(), 1..6), 1u32..28, 0u32..=100),
        1..8,
    )
    .prop_map(|specs| {
        let mut invoices = Vec::new();
        let mut payments = Vec::new();
        for (n, (lines, day, pct)) in specs.into_iter().enumerate() {
            let invoice = issue(
                draft_with(lines),
                &format!("FC-2025-{:04}", n + 1),
                at(2025, 5, day),
            );
            let amount = (invoice.totals().total_ttc * Decimal::from(pct) / Decimal::ONE_HUNDRED)
                .round_dp(2);
            if amount > Decimal::ZERO {
                payments.push(
                    Payment::completed(
                        invoice.tenant_id(),
                        invoice.id(),
                        amount,
                        at(2025, 6, day),
                        format!("VIR-{n}"),
                    )
                    .unwrap(),
                );
            }
            invoices.push(invoice);
        }
        (invoices, payments)
    })
}

fn parse_amount(field: &str) -> Decimal {
    Decimal::from_str(&field.replace(',', ".")).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every entry balances and every record has all columns.
    #[test]
    fn prop_entries_balance((invoices, payments) in arb_books()) {
        let bytes = LedgerExportBuilder::build(&LedgerConfig::default(), &invoices, &payments).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        let text = text.strip_prefix('\u{FEFF}').unwrap();

        let mut balances: BTreeMap<(String, String), (Decimal, Decimal)> = BTreeMap::new();
        for record in text.split("\r\n").skip(1).filter(|r| !r.is_empty()) {
            let fields: Vec<&str> = record.split('\t').collect();
            prop_assert_eq!(fields.len(), FEC_COLUMNS.len());
            let entry = balances
                .entry((fields[0].to_string(), fields[2].to_string()))
                .or_default();
            entry.0 += parse_amount(fields[11]);
            entry.1 += parse_amount(fields[12]);
        }
        for (key, (debit, credit)) in &balances {
            prop_assert_eq!(debit, credit, "unbalanced entry {:?}", key);
        }

        let sales = balances.keys().filter(|(j, _)| j == "VT").count();
        let bank = balances.keys().filter(|(j, _)| j == "BQ").count();
        prop_assert_eq!(sales, invoices.len());
        prop_assert_eq!(bank, payments.len());
    }

    /// Shuffling the input never changes the output.
    #[test]
    fn prop_export_deterministic((invoices, payments) in arb_books()) {
        let config = LedgerConfig::default();
        let forward = LedgerExportBuilder::build(&config, &invoices, &payments).unwrap();

        let mut rev_invoices = invoices.clone();
        rev_invoices.reverse();
        let mut rev_payments = payments.clone();
        rev_payments.reverse();
        let backward = LedgerExportBuilder::build(&config, &rev_invoices, &rev_payments).unwrap();

        prop_assert_eq!(forward, backward);
    }
}
