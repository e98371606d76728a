//! etfolio - ETF portfolio and asset tracker
//!
//! Tracks ETF buy/sell transactions and related assets (cash, crypto,
//! CDs, pension funds), derives cost bases and profit/loss, and captures
//! time-series asset snapshots with CZK/EUR conversion.

pub mod analytics;
pub mod assets;
pub mod db;
pub mod error;
pub mod importers;
pub mod instruments;
pub mod isin;
pub mod snapshots;
pub mod transactions;

pub use error::{Result, TrackerError};
