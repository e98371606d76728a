//! Whole-portfolio aggregation across every instrument.

use itertools::Itertools;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::db::{self, PositionValue, Transaction, TransactionType};
use crate::error::Result;

use super::cost_basis::{cost_basis, CostBasis};
use super::holdings::classify_positions;

/// Portfolio-wide totals plus the classified position lists.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSummary {
    pub total_invested: Decimal,
    pub total_withdrawn: Decimal,
    pub total_fees: Decimal,
    pub total_current_portfolio_invested_value: Decimal,
    pub total_profit_loss: Decimal,
    pub holdings: Vec<CostBasis>,
    pub closed_positions: Vec<CostBasis>,
}

/// Aggregate the full transaction history and the stored market values.
///
/// `total_profit_loss` counts money out (withdrawals) and money still
/// invested (current value) against money in (purchases plus fees):
/// `current + withdrawn - fees - invested`.
pub fn portfolio_summary(
    transactions: &[Transaction],
    position_values: &[PositionValue],
) -> PortfolioSummary {
    let mut total_invested = Decimal::ZERO;
    let mut total_withdrawn = Decimal::ZERO;
    let mut total_fees = Decimal::ZERO;

    for tx in transactions {
        match tx.transaction_type {
            TransactionType::Buy => total_invested += tx.total_without_fees(),
            TransactionType::Sell => total_withdrawn += tx.total_without_fees(),
        }
        total_fees += tx.fee;
    }

    let current_values: HashMap<String, Decimal> = position_values
        .iter()
        .map(|pv| (pv.isin.clone(), pv.current_value))
        .collect();
    let total_current: Decimal = position_values.iter().map(|pv| pv.current_value).sum();

    let bases: Vec<CostBasis> = transactions
        .iter()
        .map(|tx| tx.isin.as_str())
        .unique()
        .sorted()
        .filter_map(|isin| cost_basis(isin, transactions, None))
        .collect();
    let buckets = classify_positions(bases, &current_values);

    PortfolioSummary {
        total_invested,
        total_withdrawn,
        total_fees,
        total_current_portfolio_invested_value: total_current,
        total_profit_loss: total_current + total_withdrawn - total_fees - total_invested,
        holdings: buckets.holdings,
        closed_positions: buckets.closed_positions,
    }
}

/// Portfolio summary over everything stored in the database.
pub fn portfolio_summary_for(conn: &Connection) -> Result<PortfolioSummary> {
    let transactions = db::all_transactions(conn)?;
    let position_values = db::all_position_values(conn)?;
    Ok(portfolio_summary(&transactions, &position_values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn tx(
        isin: &str,
        kind: TransactionType,
        units: Decimal,
        price: Decimal,
        fee: Decimal,
    ) -> Transaction {
        Transaction {
            id: None,
            date: "2024-01-15".parse().unwrap(),
            isin: isin.to_string(),
            broker: "DEGIRO".to_string(),
            fee,
            price_per_unit: price,
            units,
            transaction_type: kind,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn pv(isin: &str, value: Decimal) -> PositionValue {
        let now = Utc::now().naive_utc();
        PositionValue {
            id: None,
            isin: isin.to_string(),
            current_value: value,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_portfolio() {
        let summary = portfolio_summary(&[], &[]);
        assert_eq!(summary.total_invested, dec!(0));
        assert_eq!(summary.total_withdrawn, dec!(0));
        assert_eq!(summary.total_fees, dec!(0));
        assert_eq!(summary.total_current_portfolio_invested_value, dec!(0));
        assert_eq!(summary.total_profit_loss, dec!(0));
        assert!(summary.holdings.is_empty());
        assert!(summary.closed_positions.is_empty());
    }

    #[test]
    fn test_summary_totals() {
        let transactions = vec![
            tx("IE00B4L5Y983", TransactionType::Buy, dec!(10), dec!(100.00), dec!(2.00)),
            tx("US0378331005", TransactionType::Buy, dec!(5), dec!(200.00), dec!(1.50)),
        ];
        let values = vec![pv("IE00B4L5Y983", dec!(1100.00)), pv("US0378331005", dec!(1050.00))];

        let summary = portfolio_summary(&transactions, &values);
        assert_eq!(summary.total_invested, dec!(2000.00));
        assert_eq!(summary.total_withdrawn, dec!(0));
        assert_eq!(summary.total_fees, dec!(3.50));
        assert_eq!(summary.total_current_portfolio_invested_value, dec!(2150.00));
        // 2150 + 0 - 3.50 - 2000
        assert_eq!(summary.total_profit_loss, dec!(146.50));
        assert_eq!(summary.holdings.len(), 2);
    }

    #[test]
    fn test_summary_splits_buckets() {
        let transactions = vec![
            tx("IE00B4L5Y983", TransactionType::Buy, dec!(10), dec!(100.00), dec!(1.00)),
            tx("US0378331005", TransactionType::Buy, dec!(4), dec!(50.00), dec!(1.00)),
            tx("US0378331005", TransactionType::Sell, dec!(4), dec!(60.00), dec!(1.00)),
        ];
        let values = vec![pv("IE00B4L5Y983", dec!(1080.00))];

        let summary = portfolio_summary(&transactions, &values);
        assert_eq!(summary.holdings.len(), 1);
        assert_eq!(summary.holdings[0].isin, "IE00B4L5Y983");
        assert_eq!(summary.closed_positions.len(), 1);
        assert_eq!(summary.closed_positions[0].isin, "US0378331005");
        assert_eq!(
            summary.closed_positions[0].absolute_pl_without_fees,
            Some(dec!(40.00))
        );
        // 1080 + 240 - 3 - 1200
        assert_eq!(summary.total_profit_loss, dec!(117.00));
    }
}
