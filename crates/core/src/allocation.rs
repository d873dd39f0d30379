//! Proportional allocation using the Largest Remainder Method.
//!
//! Splits a rounded total into parts proportional to a set of weights so
//! that the parts, each rounded to the target precision, sum exactly to
//! the total. Used to spread `total_tva` over the per-rate tax breakdown.
//!
//! 1. Compute exact shares
//! 2. Round each share toward zero
//! 3. Hand the leftover units to the shares with the largest fractional parts

use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// Allocation utility for distributing amounts.
pub struct AllocationUtil;

impl AllocationUtil {
    /// Allocates `total` proportionally to `weights`.
    ///
    /// The result has one entry per weight and sums exactly to `total`
    /// (which must already carry at most `decimal_places` decimals). Ties in
    /// the fractional parts go to the earlier weight. When all weights are
    /// zero every share is zero.
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use coatbook_core::allocation::AllocationUtil;
    ///
    /// let parts = AllocationUtil::allocate_by_weights(dec!(10), &[dec!(1), dec!(1), dec!(1)], 2);
    /// assert_eq!(parts, vec![dec!(3.34), dec!(3.33), dec!(3.33)]);
    /// ```
    #[must_use]
    pub fn allocate_by_weights(
        total: Decimal,
        weights: &[Decimal],
        decimal_places: u32,
    ) -> Vec<Decimal> {
        let weight_sum: Decimal = weights.iter().copied().sum();
        if weights.is_empty() {
            return vec![];
        }
        if weight_sum.is_zero() {
            return vec![Decimal::ZERO; weights.len()];
        }

        let unit = Decimal::new(1, decimal_places);

        let exact: Vec<Decimal> = weights.iter().map(|w| total * *w / weight_sum).collect();

        let mut rounded: Vec<Decimal> = exact
            .iter()
            .map(|a| a.round_dp_with_strategy(decimal_places, RoundingStrategy::ToZero))
            .collect();

        let sum_rounded: Decimal = rounded.iter().copied().sum();
        let remainder = total - sum_rounded;

        let units_to_distribute = (remainder / unit)
            .round_dp_with_strategy(0, RoundingStrategy::ToZero)
            .to_u64()
            .unwrap_or(0);
        let units_to_distribute = usize::try_from(units_to_distribute).unwrap_or(0);

        if units_to_distribute == 0 {
            return rounded;
        }

        let mut remainders: Vec<(usize, Decimal)> = exact
            .iter()
            .zip(rounded.iter())
            .enumerate()
            .map(|(i, (e, r))| (i, *e - *r))
            .collect();

        // Stable: equal remainders keep their input order.
        remainders.sort_by(|a, b| b.1.cmp(&a.1));

        for (idx, _) in remainders.iter().take(units_to_distribute) {
            rounded[*idx] += unit;
        }

        rounded
    }
}
