//! Instrument registry: display name and kind per ISIN.
//!
//! Transactions only carry the ISIN; the registry is what lets listings
//! show "Vanguard FTSE All-World" instead of IE00B4L5Y983. One row per
//! ISIN, so registering a known ISIN twice is a conflict.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::Connection;

use crate::db::{self, InstrumentKind, IsinMetadata};
use crate::error::{Result, TrackerError};
use crate::isin::normalize_isin;

/// Incoming registration data, validated before it touches the database.
#[derive(Debug, Clone)]
pub struct NewInstrument {
    pub isin: String,
    pub name: String,
    pub kind: InstrumentKind,
}

impl NewInstrument {
    /// Validate fields and return a normalized copy ready for storage.
    pub fn validated(&self) -> Result<NewInstrument> {
        let isin = normalize_isin(&self.isin).map_err(TrackerError::Validation)?;
        let name = self.name.trim();
        if name.is_empty() || name.len() > 255 {
            return Err(TrackerError::Validation("name must be 1-255 characters".into()).into());
        }
        Ok(NewInstrument {
            isin,
            name: name.to_string(),
            kind: self.kind,
        })
    }
}

/// Fields of an existing registration to overwrite.
#[derive(Debug, Clone, Default)]
pub struct InstrumentPatch {
    pub name: Option<String>,
    pub kind: Option<InstrumentKind>,
}

/// Register an instrument. Conflict when the ISIN is already known.
pub fn register_instrument(conn: &Connection, new: &NewInstrument) -> Result<IsinMetadata> {
    let new = new.validated()?;
    let now = Utc::now().naive_utc();

    let mut metadata = IsinMetadata {
        id: None,
        isin: new.isin,
        name: new.name,
        kind: new.kind,
        created_at: now,
        updated_at: now,
    };
    metadata.id = Some(db::insert_isin_metadata(conn, &metadata)?);
    Ok(metadata)
}

/// Create or update the registration for an ISIN.
pub fn upsert_instrument(conn: &Connection, new: &NewInstrument) -> Result<IsinMetadata> {
    let new = new.validated()?;
    let now = Utc::now().naive_utc();

    match db::get_isin_metadata(conn, &new.isin)? {
        Some(mut metadata) => {
            metadata.name = new.name;
            metadata.kind = new.kind;
            metadata.updated_at = now;
            db::update_isin_metadata(conn, &metadata)?;
            Ok(metadata)
        }
        None => {
            let mut metadata = IsinMetadata {
                id: None,
                isin: new.isin,
                name: new.name,
                kind: new.kind,
                created_at: now,
                updated_at: now,
            };
            metadata.id = Some(db::insert_isin_metadata(conn, &metadata)?);
            Ok(metadata)
        }
    }
}

/// Registration for one ISIN; NotFound when it was never registered.
pub fn get_instrument(conn: &Connection, isin: &str) -> Result<IsinMetadata> {
    let isin = normalize_isin(isin).map_err(TrackerError::Validation)?;
    db::get_isin_metadata(conn, &isin)?
        .ok_or_else(|| TrackerError::NotFound(format!("metadata for {}", isin)).into())
}

/// All registrations ordered by ISIN, optionally filtered by kind.
pub fn list_instruments(
    conn: &Connection,
    kind: Option<InstrumentKind>,
) -> Result<Vec<IsinMetadata>> {
    db::list_isin_metadata(conn, kind)
}

/// Apply a partial update to an existing registration.
pub fn update_instrument(
    conn: &Connection,
    isin: &str,
    patch: &InstrumentPatch,
) -> Result<IsinMetadata> {
    if patch.name.is_none() && patch.kind.is_none() {
        return Err(TrackerError::Validation("nothing to update".into()).into());
    }

    let mut metadata = get_instrument(conn, isin)?;
    let merged = NewInstrument {
        isin: metadata.isin.clone(),
        name: patch.name.clone().unwrap_or_else(|| metadata.name.clone()),
        kind: patch.kind.unwrap_or(metadata.kind),
    }
    .validated()?;

    metadata.name = merged.name;
    metadata.kind = merged.kind;
    metadata.updated_at = Utc::now().naive_utc();
    db::update_isin_metadata(conn, &metadata)?;
    Ok(metadata)
}

/// Remove the registration for an ISIN.
pub fn delete_instrument(conn: &Connection, isin: &str) -> Result<()> {
    let isin = normalize_isin(isin).map_err(TrackerError::Validation)?;
    if db::delete_isin_metadata(conn, &isin)? {
        Ok(())
    } else {
        Err(TrackerError::NotFound(format!("metadata for {}", isin)).into())
    }
}

/// ISIN -> display name lookup for listings.
pub fn instrument_names(conn: &Connection) -> Result<HashMap<String, String>> {
    Ok(list_instruments(conn, None)?
        .into_iter()
        .map(|m| (m.isin, m.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewInstrument {
        NewInstrument {
            isin: "ie00b4l5y983".to_string(),
            name: "  Vanguard FTSE All-World  ".to_string(),
            kind: InstrumentKind::Stock,
        }
    }

    #[test]
    fn test_validation_normalizes() {
        let validated = sample().validated().unwrap();
        assert_eq!(validated.isin, "IE00B4L5Y983");
        assert_eq!(validated.name, "Vanguard FTSE All-World");
    }

    #[test]
    fn test_validation_rejects_bad_fields() {
        let mut bad = sample();
        bad.isin = "NOT-AN-ISIN".to_string();
        assert!(bad.validated().is_err());

        let mut bad = sample();
        bad.name = "   ".to_string();
        assert!(bad.validated().is_err());

        let mut bad = sample();
        bad.name = "x".repeat(256);
        assert!(bad.validated().is_err());
    }
}
