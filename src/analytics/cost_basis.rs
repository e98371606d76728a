//! Cost-basis calculation over an instrument's transaction history.
//!
//! Purchases and sales are tracked as two independent running sums:
//! `total_cost_without_fees` accumulates BUY price x units,
//! `total_gains_without_fees` accumulates SELL price x units. Sales are
//! never netted against an average purchase price. Fees accumulate for
//! both kinds.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{self, Transaction, TransactionType};
use crate::error::Result;

/// Derived cost basis for one instrument. Never persisted.
///
/// The five trailing fields stay `None` until a classifier attaches
/// profit/loss figures (see `analytics::holdings`).
#[derive(Debug, Clone, Serialize)]
pub struct CostBasis {
    pub isin: String,
    pub total_units: Decimal,
    pub total_cost_without_fees: Decimal,
    pub total_gains_without_fees: Decimal,
    pub total_fees: Decimal,
    pub transaction_count: usize,
    pub current_value: Option<Decimal>,
    pub absolute_pl_without_fees: Option<Decimal>,
    pub percentage_pl_without_fees: Option<Decimal>,
    pub absolute_pl_with_fees: Option<Decimal>,
    pub percentage_pl_with_fees: Option<Decimal>,
}

impl CostBasis {
    fn new(isin: &str) -> Self {
        Self {
            isin: isin.to_string(),
            total_units: Decimal::ZERO,
            total_cost_without_fees: Decimal::ZERO,
            total_gains_without_fees: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            transaction_count: 0,
            current_value: None,
            absolute_pl_without_fees: None,
            percentage_pl_without_fees: None,
            absolute_pl_with_fees: None,
            percentage_pl_with_fees: None,
        }
    }

    /// Cost minus gains. Can go negative when sales exceed purchases.
    pub fn net_cost(&self) -> Decimal {
        self.total_cost_without_fees - self.total_gains_without_fees
    }

    fn apply(&mut self, tx: &Transaction) {
        match tx.transaction_type {
            TransactionType::Buy => {
                self.total_units += tx.units;
                self.total_cost_without_fees += tx.total_without_fees();
            }
            TransactionType::Sell => {
                self.total_units -= tx.units;
                self.total_gains_without_fees += tx.total_without_fees();
            }
        }
        self.total_fees += tx.fee;
        self.transaction_count += 1;
    }
}

/// Compute the cost basis for `isin` from a date-ascending transaction
/// history. Transactions for other instruments and transactions after
/// `as_of` are skipped. Returns `None` when nothing matched: an
/// instrument with no transactions has no basis, which is not the same
/// as a zero one.
///
/// Overselling is not guarded here; `total_units` may end up negative.
pub fn cost_basis(
    isin: &str,
    transactions: &[Transaction],
    as_of: Option<NaiveDate>,
) -> Option<CostBasis> {
    let mut basis = CostBasis::new(isin);

    for tx in transactions {
        if tx.isin != isin {
            continue;
        }
        if let Some(cutoff) = as_of {
            if tx.date > cutoff {
                continue;
            }
        }
        basis.apply(tx);
    }

    if basis.transaction_count == 0 {
        None
    } else {
        Some(basis)
    }
}

/// Cost basis for one instrument read from the database.
pub fn cost_basis_for(
    conn: &Connection,
    isin: &str,
    as_of: Option<NaiveDate>,
) -> Result<Option<CostBasis>> {
    let transactions = db::transactions_for_isin(conn, isin)?;
    Ok(cost_basis(isin, &transactions, as_of))
}
