//! Totals and per-rate tax breakdown.
//!
//! `total_ht` is the sum of line totals, `total_tva` is the rounded sum of
//! the exact per-line tax, `total_ttc` is their sum. The per-rate breakdown
//! is allocated from `total_tva` so it always adds up to it.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use coatbook_shared::types::money::{AMOUNT_SCALE, round_amount};

use crate::allocation::AllocationUtil;
use crate::invoice::types::{LineItem, TaxSubtotal, Totals};

/// Exact, unrounded tax of a line.
fn exact_tax(line: &LineItem) -> Decimal {
    line.line_total_ht * line.tax_rate / Decimal::ONE_HUNDRED
}

impl Totals {
    /// Computes totals from line items.
    #[must_use]
    pub fn compute(lines: &[LineItem]) -> Self {
        let total_ht: Decimal = lines.iter().map(|l| l.line_total_ht).sum();
        let total_tva = round_amount(lines.iter().map(exact_tax).sum());
        Self {
            total_ht,
            total_tva,
            total_ttc: total_ht + total_tva,
        }
    }
}

/// Per-rate breakdown, highest rate first.
///
/// Bases are exact sums of line totals. Amounts sum exactly to the
/// `total_tva` of [`Totals::compute`] on the same lines.
#[must_use]
pub fn tax_breakdown(lines: &[LineItem]) -> Vec<TaxSubtotal> {
    let mut buckets: BTreeMap<Decimal, (Decimal, Decimal)> = BTreeMap::new();
    for line in lines {
        let entry = buckets
            .entry(line.tax_rate.normalize())
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        entry.0 += line.line_total_ht;
        entry.1 += exact_tax(line);
    }

    let total_tva = Totals::compute(lines).total_tva;
    let buckets: Vec<(Decimal, Decimal, Decimal)> = buckets
        .into_iter()
        .rev()
        .map(|(rate, (basis, exact))| (rate, basis, exact))
        .collect();
    let weights: Vec<Decimal> = buckets.iter().map(|(_, _, exact)| *exact).collect();
    let amounts = AllocationUtil::allocate_by_weights(total_tva, &weights, AMOUNT_SCALE);

    buckets
        .into_iter()
        .zip(amounts)
        .map(|((rate, basis, _), amount)| TaxSubtotal {
            rate,
            basis,
            amount,
        })
        .collect()
}
