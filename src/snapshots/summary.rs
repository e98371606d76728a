//! Per-date snapshot aggregation and trend statistics.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::AssetSnapshot;

/// Aggregates for one snapshot datetime.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub snapshot_date: NaiveDateTime,
    pub total_value_eur: Decimal,
    pub exchange_rate_used: Decimal,
    /// Native-currency totals, keyed by currency code, ascending.
    pub by_currency: BTreeMap<String, Decimal>,
    /// EUR totals, keyed by asset type, ascending.
    pub by_asset_type: BTreeMap<String, Decimal>,
    pub absolute_change_from_oldest: Decimal,
    pub percentage_change_from_oldest: Decimal,
}

/// Summaries newest-first plus the portfolio growth rate.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotTrend {
    pub summaries: Vec<SnapshotSummary>,
    /// Linear EUR growth per 30 days across the covered span, 2 dp.
    /// 0.00 when fewer than two dates or a zero-day span.
    pub avg_monthly_increment: Decimal,
}

const DAYS_PER_MONTH: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

/// Aggregate snapshot rows by capture datetime.
///
/// The change columns are measured against the oldest date present in
/// `snapshots` — when the caller passed a filtered range, the baseline
/// is the oldest date inside that range, not the all-time oldest.
pub fn summarize_snapshots(snapshots: &[AssetSnapshot]) -> SnapshotTrend {
    let mut by_date: BTreeMap<NaiveDateTime, Vec<&AssetSnapshot>> = BTreeMap::new();
    for row in snapshots {
        by_date.entry(row.snapshot_date).or_default().push(row);
    }

    if by_date.is_empty() {
        return SnapshotTrend {
            summaries: Vec::new(),
            avg_monthly_increment: Decimal::new(0, 2),
        };
    }

    // BTreeMap iterates ascending; the first entry is the baseline
    let mut ascending: Vec<SnapshotSummary> = Vec::with_capacity(by_date.len());
    for (date, rows) in &by_date {
        let total_value_eur: Decimal = rows.iter().map(|r| r.value_eur).sum();

        let mut by_currency: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut by_asset_type: BTreeMap<String, Decimal> = BTreeMap::new();
        for row in rows {
            *by_currency.entry(row.currency.clone()).or_default() += row.value;
            *by_asset_type.entry(row.asset_type.clone()).or_default() += row.value_eur;
        }

        ascending.push(SnapshotSummary {
            snapshot_date: *date,
            total_value_eur,
            exchange_rate_used: rows[0].exchange_rate,
            by_currency,
            by_asset_type,
            absolute_change_from_oldest: Decimal::ZERO,
            percentage_change_from_oldest: Decimal::ZERO,
        });
    }

    let baseline_total = ascending[0].total_value_eur;
    for summary in ascending.iter_mut().skip(1) {
        summary.absolute_change_from_oldest = summary.total_value_eur - baseline_total;
        summary.percentage_change_from_oldest = if baseline_total <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            summary.absolute_change_from_oldest / baseline_total * Decimal::ONE_HUNDRED
        };
    }

    let avg_monthly_increment = monthly_increment(&ascending);

    let mut summaries = ascending;
    summaries.reverse();

    SnapshotTrend {
        summaries,
        avg_monthly_increment,
    }
}

fn monthly_increment(ascending: &[SnapshotSummary]) -> Decimal {
    if ascending.len() < 2 {
        return Decimal::new(0, 2);
    }

    let oldest = &ascending[0];
    let newest = &ascending[ascending.len() - 1];
    let days = (newest.snapshot_date.date() - oldest.snapshot_date.date()).num_days();
    if days == 0 {
        return Decimal::new(0, 2);
    }

    let daily = (newest.total_value_eur - oldest.total_value_eur) / Decimal::from(days);
    (daily * DAYS_PER_MONTH).round_dp(2)
}
