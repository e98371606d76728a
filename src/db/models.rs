use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Transaction type (buy or sell)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "B" => Ok(TransactionType::Buy),
            "SELL" | "S" => Ok(TransactionType::Sell),
            _ => Err(()),
        }
    }
}

/// ETF transaction (buy or sell of an instrument identified by ISIN)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub isin: String,
    pub broker: String,
    pub fee: Decimal,
    pub price_per_unit: Decimal,
    pub units: Decimal,
    pub transaction_type: TransactionType,
    pub created_at: NaiveDateTime,
}

impl Transaction {
    /// Traded amount excluding fees (units x price)
    pub fn total_without_fees(&self) -> Decimal {
        self.units * self.price_per_unit
    }
}

/// Asset categories tracked alongside the ETF portfolio
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AssetType {
    Investments, // Synthetic: total ETF portfolio value, never stored
    Crypto,
    CashEur,
    CashCzk,
    CdAccount,
    PensionFund,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Investments => "investments",
            AssetType::Crypto => "crypto",
            AssetType::CashEur => "cash_eur",
            AssetType::CashCzk => "cash_czk",
            AssetType::CdAccount => "cd_account",
            AssetType::PensionFund => "pension_fund",
        }
    }

    /// Cash assets require a named account; everything else forbids one.
    pub fn is_cash(&self) -> bool {
        matches!(self, AssetType::CashEur | AssetType::CashCzk)
    }

    /// Currency a cash asset type is pinned to.
    pub fn required_currency(&self) -> Option<Currency> {
        match self {
            AssetType::CashEur => Some(Currency::Eur),
            AssetType::CashCzk => Some(Currency::Czk),
            _ => None,
        }
    }
}

impl FromStr for AssetType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "investments" => Ok(AssetType::Investments),
            "crypto" => Ok(AssetType::Crypto),
            "cash_eur" => Ok(AssetType::CashEur),
            "cash_czk" => Ok(AssetType::CashCzk),
            "cd_account" => Ok(AssetType::CdAccount),
            "pension_fund" => Ok(AssetType::PensionFund),
            _ => Err(()),
        }
    }
}

/// Currencies supported for asset valuation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Currency {
    Eur,
    Czk,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Czk => "CZK",
        }
    }
}

impl FromStr for Currency {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "CZK" => Ok(Currency::Czk),
            _ => Err(()),
        }
    }
}

/// What kind of instrument an ISIN identifies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    Stock,
    Bond,
    RealAsset,
}

impl InstrumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Stock => "STOCK",
            InstrumentKind::Bond => "BOND",
            InstrumentKind::RealAsset => "REAL_ASSET",
        }
    }
}

impl FromStr for InstrumentKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STOCK" => Ok(InstrumentKind::Stock),
            "BOND" => Ok(InstrumentKind::Bond),
            "REAL_ASSET" | "REAL-ASSET" => Ok(InstrumentKind::RealAsset),
            _ => Err(()),
        }
    }
}

/// Display name and kind registered for one ISIN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsinMetadata {
    pub id: Option<i64>,
    pub isin: String,
    pub name: String,
    pub kind: InstrumentKind,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Latest manually entered market value for one open holding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionValue {
    pub id: Option<i64>,
    pub isin: String,
    pub current_value: Decimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Non-ETF holding (crypto, cash per account, CD, pension fund)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherAsset {
    pub id: Option<i64>,
    pub asset_type: AssetType,
    pub asset_detail: Option<String>,
    pub currency: Currency,
    pub value: Decimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One asset valuation row within a snapshot event.
///
/// asset_type and currency are free strings here: CSV imports may carry
/// historical categories the live enum no longer produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub id: Option<i64>,
    pub snapshot_date: NaiveDateTime,
    pub asset_type: String,
    pub asset_detail: Option<String>,
    pub currency: String,
    pub value: Decimal,
    pub exchange_rate: Decimal,
    pub value_eur: Decimal,
    pub created_at: NaiveDateTime,
}
