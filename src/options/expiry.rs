//! Expiry date format handling
//!
//! The exchange serves expiries as `DD-MMM-YYYY` (e.g. `16-Sep-2025`);
//! clients may submit the compact numeric `DDMMYY` form instead. The
//! numeric form is converted before matching against the upstream list.

use crate::error::{AppError, Result};
use chrono::NaiveDate;

/// Exchange-native expiry format
const UPSTREAM_FORMAT: &str = "%d-%b-%Y";

/// Compact client-side expiry format
const COMPACT_FORMAT: &str = "%d%m%y";

/// Accept an expiry in either form and return the exchange-native one
pub fn normalize(expiry: &str) -> Result<String> {
    let expiry = expiry.trim();
    if expiry.len() == 6 && expiry.chars().all(|c| c.is_ascii_digit()) {
        return compact_to_upstream(expiry);
    }
    // validate the text form so a typo fails fast instead of at matching
    NaiveDate::parse_from_str(expiry, UPSTREAM_FORMAT)
        .map_err(|_| AppError::Validation(format!("Unparseable expiry: {}", expiry)))?;
    Ok(expiry.to_string())
}

/// `DDMMYY` -> `DD-MMM-YYYY`
pub fn compact_to_upstream(compact: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(compact, COMPACT_FORMAT)
        .map_err(|_| AppError::Validation(format!("Unparseable expiry: {}", compact)))?;
    Ok(date.format(UPSTREAM_FORMAT).to_string())
}

/// `DD-MMM-YYYY` -> `DDMMYY`
pub fn upstream_to_compact(expiry: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(expiry, UPSTREAM_FORMAT)
        .map_err(|_| AppError::Validation(format!("Unparseable expiry: {}", expiry)))?;
    Ok(date.format(COMPACT_FORMAT).to_string())
}
