//! ISIN code normalization and validation

use once_cell::sync::Lazy;
use regex::Regex;

/// ISIN format: 2-letter country code + 9 alphanumeric characters + 1 check digit
static ISIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{2}[A-Z0-9]{9}[0-9]$").expect("ISIN regex is valid")
});

/// Normalize an ISIN to uppercase and validate its format.
pub fn normalize_isin(raw: &str) -> Result<String, String> {
    let isin = raw.trim().to_uppercase();
    if !ISIN_RE.is_match(&isin) {
        return Err(format!(
            "invalid ISIN '{}': must be 12 characters (2 letters + 9 alphanumeric + 1 digit)",
            raw.trim()
        ));
    }
    Ok(isin)
}

/// Check an already-normalized ISIN without reallocating.
pub fn is_valid_isin(isin: &str) -> bool {
    ISIN_RE.is_match(isin)
}
