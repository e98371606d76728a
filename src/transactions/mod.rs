//! Transaction mutations with validation and position-state tracking.
//!
//! Every mutation measures the unit balance of the affected instrument
//! before and after, and emits a `PositionStateChanged` event when the
//! position crossed zero. The reconcile step consumes those events and
//! drops market values that no longer describe an open holding.

pub mod reconcile;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::analytics;
use crate::db::{self, Transaction, TransactionType};
use crate::error::{Result, TrackerError};
use crate::isin::normalize_isin;

pub use reconcile::reconcile_positions;

/// A position crossed the open/closed boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionStateChanged {
    /// Units went from positive to exactly zero.
    Closed { isin: String },
    /// Units went from zero back to positive.
    Reopened { isin: String },
}

/// Incoming transaction data, validated before insert.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub isin: String,
    pub broker: String,
    pub fee: Decimal,
    pub price_per_unit: Decimal,
    pub units: Decimal,
    pub transaction_type: TransactionType,
}

impl NewTransaction {
    /// Validate fields and return a normalized copy ready for storage.
    pub fn validated(&self) -> Result<NewTransaction> {
        let isin = normalize_isin(&self.isin).map_err(TrackerError::Validation)?;

        if self.date > Utc::now().date_naive() {
            return Err(
                TrackerError::Validation("transaction date must not be in the future".into())
                    .into(),
            );
        }
        let broker = self.broker.trim();
        if broker.is_empty() || broker.len() > 100 {
            return Err(
                TrackerError::Validation("broker must be 1-100 characters".into()).into(),
            );
        }
        if self.fee < Decimal::ZERO {
            return Err(TrackerError::Validation("fee must not be negative".into()).into());
        }
        if self.price_per_unit <= Decimal::ZERO {
            return Err(
                TrackerError::Validation("price per unit must be positive".into()).into(),
            );
        }
        if self.units <= Decimal::ZERO {
            return Err(TrackerError::Validation("units must be positive".into()).into());
        }

        Ok(NewTransaction {
            isin,
            broker: broker.to_string(),
            ..self.clone()
        })
    }
}

/// Fields of an existing transaction to overwrite.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub date: Option<NaiveDate>,
    pub isin: Option<String>,
    pub broker: Option<String>,
    pub fee: Option<Decimal>,
    pub price_per_unit: Option<Decimal>,
    pub units: Option<Decimal>,
    pub transaction_type: Option<TransactionType>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.isin.is_none()
            && self.broker.is_none()
            && self.fee.is_none()
            && self.price_per_unit.is_none()
            && self.units.is_none()
            && self.transaction_type.is_none()
    }
}

/// Unit balance for one instrument, zero when it has no history.
fn units_held(conn: &Connection, isin: &str) -> Result<Decimal> {
    Ok(analytics::cost_basis_for(conn, isin, None)?
        .map(|basis| basis.total_units)
        .unwrap_or(Decimal::ZERO))
}

/// Detect an open/closed boundary crossing from a before/after balance.
pub fn position_state_change(
    isin: &str,
    units_before: Decimal,
    units_after: Decimal,
) -> Option<PositionStateChanged> {
    if units_before > Decimal::ZERO && units_after == Decimal::ZERO {
        Some(PositionStateChanged::Closed {
            isin: isin.to_string(),
        })
    } else if units_before == Decimal::ZERO && units_after > Decimal::ZERO {
        Some(PositionStateChanged::Reopened {
            isin: isin.to_string(),
        })
    } else {
        None
    }
}

/// Validate, store, and reconcile a new transaction.
pub fn create_transaction(conn: &Connection, new: &NewTransaction) -> Result<Transaction> {
    let new = new.validated()?;

    let units_before = units_held(conn, &new.isin)?;

    let mut tx = Transaction {
        id: None,
        date: new.date,
        isin: new.isin.clone(),
        broker: new.broker.clone(),
        fee: new.fee,
        price_per_unit: new.price_per_unit,
        units: new.units,
        transaction_type: new.transaction_type,
        created_at: Utc::now().naive_utc(),
    };
    tx.id = Some(db::insert_transaction(conn, &tx)?);

    let units_after = units_held(conn, &new.isin)?;
    let events: Vec<_> = position_state_change(&new.isin, units_before, units_after)
        .into_iter()
        .collect();
    reconcile_positions(conn, &events);

    Ok(tx)
}

/// Apply a partial update and reconcile both affected instruments when
/// the update moves the transaction to a different ISIN.
pub fn update_transaction(
    conn: &Connection,
    id: i64,
    patch: &TransactionPatch,
) -> Result<Transaction> {
    if patch.is_empty() {
        return Err(TrackerError::Validation("nothing to update".into()).into());
    }

    let existing = db::get_transaction(conn, id)?
        .ok_or_else(|| TrackerError::NotFound(format!("transaction {}", id)))?;
    let old_isin = existing.isin.clone();

    let merged = NewTransaction {
        date: patch.date.unwrap_or(existing.date),
        isin: patch.isin.clone().unwrap_or_else(|| existing.isin.clone()),
        broker: patch.broker.clone().unwrap_or_else(|| existing.broker.clone()),
        fee: patch.fee.unwrap_or(existing.fee),
        price_per_unit: patch.price_per_unit.unwrap_or(existing.price_per_unit),
        units: patch.units.unwrap_or(existing.units),
        transaction_type: patch.transaction_type.unwrap_or(existing.transaction_type),
    }
    .validated()?;

    let old_before = units_held(conn, &old_isin)?;
    let new_before = if merged.isin != old_isin {
        Some(units_held(conn, &merged.isin)?)
    } else {
        None
    };

    let updated = Transaction {
        id: Some(id),
        date: merged.date,
        isin: merged.isin.clone(),
        broker: merged.broker,
        fee: merged.fee,
        price_per_unit: merged.price_per_unit,
        units: merged.units,
        transaction_type: merged.transaction_type,
        created_at: existing.created_at,
    };
    db::update_transaction(conn, &updated)?;

    let mut events = Vec::new();
    let old_after = units_held(conn, &old_isin)?;
    events.extend(position_state_change(&old_isin, old_before, old_after));
    if let Some(before) = new_before {
        let after = units_held(conn, &updated.isin)?;
        events.extend(position_state_change(&updated.isin, before, after));
    }
    reconcile_positions(conn, &events);

    Ok(updated)
}

/// Delete a transaction and reconcile its instrument.
pub fn delete_transaction(conn: &Connection, id: i64) -> Result<()> {
    let existing = db::get_transaction(conn, id)?
        .ok_or_else(|| TrackerError::NotFound(format!("transaction {}", id)))?;

    let units_before = units_held(conn, &existing.isin)?;
    db::delete_transaction(conn, id)?;
    let units_after = units_held(conn, &existing.isin)?;

    let events: Vec<_> = position_state_change(&existing.isin, units_before, units_after)
        .into_iter()
        .collect();
    reconcile_positions(conn, &events);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> NewTransaction {
        NewTransaction {
            date: "2024-01-15".parse().unwrap(),
            isin: "ie00b4l5y983".to_string(),
            broker: "DEGIRO".to_string(),
            fee: dec!(1.50),
            price_per_unit: dec!(100.00),
            units: dec!(10),
            transaction_type: TransactionType::Buy,
        }
    }

    #[test]
    fn test_validation_normalizes_isin() {
        let validated = sample().validated().unwrap();
        assert_eq!(validated.isin, "IE00B4L5Y983");
    }

    #[test]
    fn test_validation_rejects_bad_fields() {
        let mut bad = sample();
        bad.isin = "NOT-AN-ISIN".to_string();
        assert!(bad.validated().is_err());

        let mut bad = sample();
        bad.date = Utc::now().date_naive() + chrono::Days::new(1);
        assert!(bad.validated().is_err());

        let mut bad = sample();
        bad.fee = dec!(-0.01);
        assert!(bad.validated().is_err());

        let mut bad = sample();
        bad.price_per_unit = dec!(0);
        assert!(bad.validated().is_err());

        let mut bad = sample();
        bad.units = dec!(-1);
        assert!(bad.validated().is_err());

        let mut bad = sample();
        bad.broker = "  ".to_string();
        assert!(bad.validated().is_err());
    }

    #[test]
    fn test_position_state_change() {
        assert_eq!(
            position_state_change("X", dec!(10), dec!(0)),
            Some(PositionStateChanged::Closed {
                isin: "X".to_string()
            })
        );
        assert_eq!(
            position_state_change("X", dec!(0), dec!(5)),
            Some(PositionStateChanged::Reopened {
                isin: "X".to_string()
            })
        );
        // Still open, still closed, or oversold: no event
        assert_eq!(position_state_change("X", dec!(10), dec!(7)), None);
        assert_eq!(position_state_change("X", dec!(0), dec!(0)), None);
        assert_eq!(position_state_change("X", dec!(5), dec!(-2)), None);
    }
}
