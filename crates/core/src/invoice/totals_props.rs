//! Property-based tests for invoice totals.

use proptest::prelude::*;
use rust_decimal::Decimal;

use coatbook_shared::types::money::round_amount;

use crate::invoice::totals::tax_breakdown;
use crate::invoice::types::{LineItem, Totals};
use crate::invoice::validation::supported_tax_rates;

fn arb_rate() -> impl Strategy<Value = Decimal> {
    prop::sample::select(supported_tax_rates().to_vec())
}

fn arb_line() -> impl Strategy<Value = LineItem> {
    (1i64..10_000i64, 0i64..1_000_000i64, arb_rate()).prop_map(|(qty, price, rate)| {
        LineItem::new("Ligne", Decimal::new(qty, 2), Decimal::new(price, 3), rate)
    })
}

fn arb_lines() -> impl Strategy<Value = Vec<LineItem>> {
    prop::collection::vec(arb_line(), 1..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// total_ht is the sum of line totals and total_ttc = total_ht + total_tva.
    #[test]
    fn prop_totals_consistent(lines in arb_lines()) {
        let totals = Totals::compute(&lines);
        let ht: Decimal = lines.iter().map(|l| l.line_total_ht).sum();
        prop_assert_eq!(totals.total_ht, ht);
        prop_assert_eq!(totals.total_ttc, totals.total_ht + totals.total_tva);
    }

    /// total_tva is the rounded sum of exact per-line tax.
    #[test]
    fn prop_tva_is_rounded_exact_sum(lines in arb_lines()) {
        let exact: Decimal = lines
            .iter()
            .map(|l| l.line_total_ht * l.tax_rate / Decimal::ONE_HUNDRED)
            .sum();
        prop_assert_eq!(Totals::compute(&lines).total_tva, round_amount(exact));
    }

    /// The per-rate breakdown adds up to total_tva and total_ht exactly.
    #[test]
    fn prop_breakdown_sums_to_totals(lines in arb_lines()) {
        let totals = Totals::compute(&lines);
        let breakdown = tax_breakdown(&lines);
        let tva: Decimal = breakdown.iter().map(|t| t.amount).sum();
        let basis: Decimal = breakdown.iter().map(|t| t.basis).sum();
        prop_assert_eq!(tva, totals.total_tva);
        prop_assert_eq!(basis, totals.total_ht);
        prop_assert!(breakdown.windows(2).all(|w| w[0].rate > w[1].rate));
    }

    /// Every amount carries at most two decimals.
    #[test]
    fn prop_amounts_have_cents_precision(lines in arb_lines()) {
        let totals = Totals::compute(&lines);
        for amount in [totals.total_ht, totals.total_tva, totals.total_ttc] {
            prop_assert_eq!(round_amount(amount), amount);
        }
        for sub in tax_breakdown(&lines) {
            prop_assert_eq!(round_amount(sub.amount), sub.amount);
        }
    }
}
