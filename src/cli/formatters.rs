//! Shared output formatting for command handlers.

use colored::Colorize;
use rust_decimal::Decimal;

/// Two-decimal money rendering.
pub fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// Optional money: "-" when unknown.
pub fn opt_money(value: Option<Decimal>) -> String {
    value.map(money).unwrap_or_else(|| "-".to_string())
}

/// Profit/loss colored green for gains, red for losses.
pub fn pl(value: Option<Decimal>) -> String {
    match value {
        None => "-".to_string(),
        Some(v) if v > Decimal::ZERO => format!("+{}", money(v)).green().to_string(),
        Some(v) if v < Decimal::ZERO => money(v).red().to_string(),
        Some(v) => money(v),
    }
}

/// Percentage with sign and two decimals.
pub fn pl_pct(value: Option<Decimal>) -> String {
    match value {
        None => "-".to_string(),
        Some(v) if v > Decimal::ZERO => format!("+{:.2}%", v).green().to_string(),
        Some(v) if v < Decimal::ZERO => format!("{:.2}%", v).red().to_string(),
        Some(v) => format!("{:.2}%", v),
    }
}
