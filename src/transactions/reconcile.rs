//! Best-effort cleanup of stored market values after a position crossed
//! the open/closed boundary.

use rusqlite::Connection;
use tracing::{info, warn};

use crate::db;

use super::PositionStateChanged;

/// Drop the stored market value for every instrument named in `events`.
///
/// A closed position must not keep a market value, and a reopened one
/// must not inherit the value recorded during its previous life.
/// Failures are logged and swallowed: the mutation that produced the
/// event has already succeeded and stays that way.
pub fn reconcile_positions(conn: &Connection, events: &[PositionStateChanged]) {
    for event in events {
        let (isin, reason) = match event {
            PositionStateChanged::Closed { isin } => (isin, "closed"),
            PositionStateChanged::Reopened { isin } => (isin, "reopened"),
        };

        match db::delete_position_value(conn, isin) {
            Ok(true) => info!(isin = %isin, reason, "Removed stale position value"),
            Ok(false) => {}
            Err(e) => warn!(
                isin = %isin,
                reason,
                error = %e,
                "Failed to remove stale position value"
            ),
        }
    }
}
