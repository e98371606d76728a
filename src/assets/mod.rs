//! Non-ETF assets: validated upserts plus the assembled asset listing
//! used by the snapshot engine.
//!
//! The `investments` category is synthetic. Its value is always derived
//! from the ETF position values, so it can never be stored or upserted;
//! listings carry it as `CapturedAsset::Computed`.

use chrono::Utc;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::analytics;
use crate::db::{self, AssetType, Currency, OtherAsset};
use crate::error::{Result, TrackerError};

/// Account names accepted as `asset_detail` for cash assets.
pub const VALID_ACCOUNT_NAMES: &[&str] = &["CSOB", "KB", "Moneta", "Air Bank", "Revolut"];

/// Incoming asset data, validated before it touches the database.
#[derive(Debug, Clone)]
pub struct NewOtherAsset {
    pub asset_type: AssetType,
    pub asset_detail: Option<String>,
    pub currency: Currency,
    pub value: Decimal,
}

impl NewOtherAsset {
    pub fn validate(&self) -> Result<()> {
        if self.asset_type == AssetType::Investments {
            return Err(TrackerError::Validation(
                "'investments' is computed from position values and cannot be stored".into(),
            )
            .into());
        }
        if self.value < Decimal::ZERO {
            return Err(TrackerError::Validation("asset value must not be negative".into()).into());
        }

        if self.asset_type.is_cash() {
            let detail = self.asset_detail.as_deref().ok_or_else(|| {
                TrackerError::Validation(format!(
                    "{} requires an account name",
                    self.asset_type.as_str()
                ))
            })?;
            if !VALID_ACCOUNT_NAMES.contains(&detail) {
                return Err(TrackerError::Validation(format!(
                    "unknown account '{}', expected one of: {}",
                    detail,
                    VALID_ACCOUNT_NAMES.join(", ")
                ))
                .into());
            }
            let required = self
                .asset_type
                .required_currency()
                .unwrap_or(self.currency);
            if self.currency != required {
                return Err(TrackerError::Validation(format!(
                    "{} must be denominated in {}",
                    self.asset_type.as_str(),
                    required.as_str()
                ))
                .into());
            }
        } else if self.asset_detail.is_some() {
            return Err(TrackerError::Validation(format!(
                "{} does not take an account name",
                self.asset_type.as_str()
            ))
            .into());
        }

        Ok(())
    }
}

/// Create or update the asset identified by (asset_type, asset_detail).
pub fn upsert_other_asset(conn: &Connection, new: &NewOtherAsset) -> Result<OtherAsset> {
    new.validate()?;

    let now = Utc::now().naive_utc();
    let existing = db::find_other_asset(conn, new.asset_type, new.asset_detail.as_deref())?;

    match existing {
        Some(mut asset) => {
            asset.currency = new.currency;
            asset.value = new.value;
            asset.updated_at = now;
            db::update_other_asset(conn, &asset)?;
            Ok(asset)
        }
        None => {
            let mut asset = OtherAsset {
                id: None,
                asset_type: new.asset_type,
                asset_detail: new.asset_detail.clone(),
                currency: new.currency,
                value: new.value,
                created_at: now,
                updated_at: now,
            };
            asset.id = Some(db::insert_other_asset(conn, &asset)?);
            Ok(asset)
        }
    }
}

/// Delete the asset identified by (asset_type, asset_detail).
pub fn delete_other_asset(
    conn: &Connection,
    asset_type: AssetType,
    asset_detail: Option<&str>,
) -> Result<()> {
    if asset_type == AssetType::Investments {
        return Err(TrackerError::Validation(
            "'investments' is computed and cannot be deleted".into(),
        )
        .into());
    }
    if db::delete_other_asset(conn, asset_type, asset_detail)? {
        Ok(())
    } else {
        Err(TrackerError::NotFound(format!(
            "asset ({}, {})",
            asset_type.as_str(),
            asset_detail.unwrap_or("-")
        ))
        .into())
    }
}

/// One entry in the assembled asset listing: either a stored row or the
/// derived investments total.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapturedAsset {
    Stored(OtherAsset),
    Computed { value: Decimal },
}

impl CapturedAsset {
    pub fn asset_type_str(&self) -> &str {
        match self {
            CapturedAsset::Stored(asset) => asset.asset_type.as_str(),
            CapturedAsset::Computed { .. } => AssetType::Investments.as_str(),
        }
    }

    pub fn asset_detail(&self) -> Option<&str> {
        match self {
            CapturedAsset::Stored(asset) => asset.asset_detail.as_deref(),
            CapturedAsset::Computed { .. } => None,
        }
    }

    pub fn currency(&self) -> Currency {
        match self {
            CapturedAsset::Stored(asset) => asset.currency,
            // Position values are kept in EUR
            CapturedAsset::Computed { .. } => Currency::Eur,
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            CapturedAsset::Stored(asset) => asset.value,
            CapturedAsset::Computed { value } => *value,
        }
    }
}

/// Current value of the ETF portfolio: the sum of known market values
/// across open holdings. Zero when nothing is held or valued.
pub fn investments_value(conn: &Connection) -> Result<Decimal> {
    let summary = analytics::portfolio_summary_for(conn)?;
    Ok(summary
        .holdings
        .iter()
        .filter_map(|h| h.current_value)
        .sum())
}

/// The full asset listing: the computed investments entry first, then
/// every stored asset ordered by (asset_type, asset_detail). Returns the
/// listing together with the exchange rate in effect.
pub fn capture_assets(conn: &Connection) -> Result<(Vec<CapturedAsset>, Decimal)> {
    let rate = db::get_exchange_rate(conn)?;

    let mut captured = vec![CapturedAsset::Computed {
        value: investments_value(conn)?,
    }];
    captured.extend(db::all_other_assets(conn)?.into_iter().map(CapturedAsset::Stored));

    Ok((captured, rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_asset(
        asset_type: AssetType,
        detail: Option<&str>,
        currency: Currency,
        value: Decimal,
    ) -> NewOtherAsset {
        NewOtherAsset {
            asset_type,
            asset_detail: detail.map(String::from),
            currency,
            value,
        }
    }

    #[test]
    fn test_valid_assets() {
        assert!(new_asset(AssetType::Crypto, None, Currency::Eur, dec!(1500)).validate().is_ok());
        assert!(
            new_asset(AssetType::CashCzk, Some("CSOB"), Currency::Czk, dec!(2500))
                .validate()
                .is_ok()
        );
        assert!(
            new_asset(AssetType::CashEur, Some("Revolut"), Currency::Eur, dec!(0))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_investments_never_stored() {
        let err = new_asset(AssetType::Investments, None, Currency::Eur, dec!(1))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("computed"));
    }

    #[test]
    fn test_cash_requires_whitelisted_account() {
        assert!(new_asset(AssetType::CashCzk, None, Currency::Czk, dec!(100))
            .validate()
            .is_err());
        assert!(
            new_asset(AssetType::CashCzk, Some("NotABank"), Currency::Czk, dec!(100))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_cash_currency_pinned_to_type() {
        assert!(
            new_asset(AssetType::CashCzk, Some("CSOB"), Currency::Eur, dec!(100))
                .validate()
                .is_err()
        );
        assert!(
            new_asset(AssetType::CashEur, Some("CSOB"), Currency::Czk, dec!(100))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_non_cash_forbids_detail() {
        assert!(
            new_asset(AssetType::Crypto, Some("CSOB"), Currency::Eur, dec!(100))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_negative_value_rejected() {
        assert!(new_asset(AssetType::Crypto, None, Currency::Eur, dec!(-1))
            .validate()
            .is_err());
    }
}
