//! Portfolio analytics: cost bases, position classification, summary totals.

pub mod cost_basis;
pub mod holdings;
pub mod summary;

pub use cost_basis::{cost_basis, cost_basis_for, CostBasis};
pub use holdings::{classify_positions, PositionBuckets};
pub use summary::{portfolio_summary, portfolio_summary_for, PortfolioSummary};
