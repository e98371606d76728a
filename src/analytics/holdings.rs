//! Partition cost bases into open holdings and closed positions and
//! attach profit/loss figures.

use rust_decimal::Decimal;
use std::collections::HashMap;

use super::cost_basis::CostBasis;

/// Open holdings (positive units) and closed positions (zero units).
/// Instruments whose unit balance went negative belong to neither.
#[derive(Debug, Clone, Default)]
pub struct PositionBuckets {
    pub holdings: Vec<CostBasis>,
    pub closed_positions: Vec<CostBasis>,
}

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Percentage of `absolute` against `denominator`, 0 when the
/// denominator is not positive.
fn guarded_percentage(absolute: Decimal, denominator: Decimal) -> Decimal {
    if denominator <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        absolute / denominator * HUNDRED
    }
}

fn attach_holding_pl(basis: &mut CostBasis, current_value: Option<Decimal>) {
    basis.current_value = current_value;
    let Some(cv) = current_value else {
        // No known market value: P/L stays unknown rather than zero
        return;
    };

    let net_cost = basis.net_cost();
    let abs_without = cv - net_cost;
    let abs_with = cv - (net_cost + basis.total_fees);

    basis.absolute_pl_without_fees = Some(abs_without);
    basis.percentage_pl_without_fees = Some(guarded_percentage(abs_without, net_cost));
    basis.absolute_pl_with_fees = Some(abs_with);
    basis.percentage_pl_with_fees =
        Some(guarded_percentage(abs_with, net_cost + basis.total_fees));
}

fn attach_closed_pl(basis: &mut CostBasis) {
    // A closed position is worth nothing by definition
    basis.current_value = Some(Decimal::ZERO);

    let abs_without = basis.total_gains_without_fees - basis.total_cost_without_fees;
    let abs_with = abs_without - basis.total_fees;

    basis.absolute_pl_without_fees = Some(abs_without);
    basis.percentage_pl_without_fees =
        Some(guarded_percentage(abs_without, basis.total_cost_without_fees));
    basis.absolute_pl_with_fees = Some(abs_with);
    basis.percentage_pl_with_fees = Some(guarded_percentage(
        abs_with,
        basis.total_cost_without_fees + basis.total_fees,
    ));
}

/// Split cost bases into buckets and attach P/L, looking up current
/// market values by ISIN.
pub fn classify_positions(
    bases: Vec<CostBasis>,
    current_values: &HashMap<String, Decimal>,
) -> PositionBuckets {
    let mut buckets = PositionBuckets::default();

    for mut basis in bases {
        if basis.total_units > Decimal::ZERO {
            let current_value = current_values.get(&basis.isin).copied();
            attach_holding_pl(&mut basis, current_value);
            buckets.holdings.push(basis);
        } else if basis.total_units == Decimal::ZERO {
            attach_closed_pl(&mut basis);
            buckets.closed_positions.push(basis);
        }
        // Negative units: oversold history, dropped from both buckets
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn basis(isin: &str, units: Decimal, cost: Decimal, gains: Decimal, fees: Decimal) -> CostBasis {
        CostBasis {
            isin: isin.to_string(),
            total_units: units,
            total_cost_without_fees: cost,
            total_gains_without_fees: gains,
            total_fees: fees,
            transaction_count: 2,
            current_value: None,
            absolute_pl_without_fees: None,
            percentage_pl_without_fees: None,
            absolute_pl_with_fees: None,
            percentage_pl_with_fees: None,
        }
    }

    #[test]
    fn test_holding_with_current_value() {
        let mut values = HashMap::new();
        values.insert("IE00B4L5Y983".to_string(), dec!(1200.00));

        let buckets = classify_positions(
            vec![basis("IE00B4L5Y983", dec!(10), dec!(1000.00), dec!(0), dec!(2.00))],
            &values,
        );

        assert_eq!(buckets.closed_positions.len(), 0);
        let h = &buckets.holdings[0];
        assert_eq!(h.current_value, Some(dec!(1200.00)));
        assert_eq!(h.absolute_pl_without_fees, Some(dec!(200.00)));
        assert_eq!(h.percentage_pl_without_fees, Some(dec!(20)));
        assert_eq!(h.absolute_pl_with_fees, Some(dec!(198.00)));
        // 198 / 1002 * 100
        let pct = h.percentage_pl_with_fees.unwrap();
        assert_eq!(pct.round_dp(2), dec!(19.76));
    }

    #[test]
    fn test_holding_after_partial_sell() {
        // 10 bought at 100, 3 sold at 110: net cost 670, value 920
        let mut values = HashMap::new();
        values.insert("IE00B4L5Y983".to_string(), dec!(921.25));

        let buckets = classify_positions(
            vec![basis(
                "IE00B4L5Y983",
                dec!(7),
                dec!(1000.00),
                dec!(330.00),
                dec!(3.00),
            )],
            &values,
        );

        let h = &buckets.holdings[0];
        assert_eq!(h.absolute_pl_without_fees, Some(dec!(251.25)));
        assert_eq!(h.percentage_pl_without_fees, Some(dec!(37.5)));
    }

    #[test]
    fn test_holding_without_current_value() {
        let buckets = classify_positions(
            vec![basis("IE00B4L5Y983", dec!(10), dec!(1000.00), dec!(0), dec!(2.00))],
            &HashMap::new(),
        );

        let h = &buckets.holdings[0];
        assert!(h.current_value.is_none());
        assert!(h.absolute_pl_without_fees.is_none());
        assert!(h.percentage_pl_without_fees.is_none());
        assert!(h.absolute_pl_with_fees.is_none());
        assert!(h.percentage_pl_with_fees.is_none());
    }

    #[test]
    fn test_closed_position() {
        // 10 bought at 100, 10 sold at 120, fees 4
        let buckets = classify_positions(
            vec![basis(
                "IE00B4L5Y983",
                dec!(0),
                dec!(1000.00),
                dec!(1200.00),
                dec!(4.00),
            )],
            &HashMap::new(),
        );

        assert_eq!(buckets.holdings.len(), 0);
        let c = &buckets.closed_positions[0];
        assert_eq!(c.current_value, Some(dec!(0)));
        assert_eq!(c.absolute_pl_without_fees, Some(dec!(200.00)));
        assert_eq!(c.percentage_pl_without_fees, Some(dec!(20)));
        assert_eq!(c.absolute_pl_with_fees, Some(dec!(196.00)));
        let pct = c.percentage_pl_with_fees.unwrap();
        assert_eq!(pct.round_dp(2), dec!(19.52));
    }

    #[test]
    fn test_negative_units_excluded() {
        let buckets = classify_positions(
            vec![basis("IE00B4L5Y983", dec!(-3), dec!(500.00), dec!(880.00), dec!(0))],
            &HashMap::new(),
        );

        assert!(buckets.holdings.is_empty());
        assert!(buckets.closed_positions.is_empty());
    }

    #[test]
    fn test_zero_denominator_guard() {
        // Free acquisition with a known value: percentage pinned to 0
        let mut values = HashMap::new();
        values.insert("IE00B4L5Y983".to_string(), dec!(50.00));

        let buckets = classify_positions(
            vec![basis("IE00B4L5Y983", dec!(5), dec!(0), dec!(0), dec!(0))],
            &values,
        );

        let h = &buckets.holdings[0];
        assert_eq!(h.absolute_pl_without_fees, Some(dec!(50.00)));
        assert_eq!(h.percentage_pl_without_fees, Some(dec!(0)));
    }
}
