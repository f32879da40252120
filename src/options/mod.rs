//! Option-chain pipeline
//!
//! Fetches the raw chain from the exchange adapter, flattens the chosen
//! expiry, selects the strike band around the at-the-money level, and
//! persists an immutable snapshot. Live analytics reuse the same fetch
//! and flatten steps without touching disk.

pub mod analytics;
pub mod chain;
pub mod expiry;
pub mod snapshot;

use crate::error::{AppError, Result};
use crate::providers::types::{ChainRecords, OptionChainRaw};
use crate::state::AppState;
use chain::FlatRow;
use snapshot::SnapshotMeta;
use tracing::info;

/// Validated view over a raw chain document
struct ChainDocument {
    data: Vec<crate::providers::types::ChainEntry>,
    expiry_dates: Vec<String>,
    underlying_value: f64,
}

fn validate(raw: OptionChainRaw) -> Result<ChainDocument> {
    let ChainRecords {
        data,
        expiry_dates,
        underlying_value,
    } = raw
        .records
        .ok_or_else(|| AppError::Schema("Chain response missing 'records'".to_string()))?;

    let data =
        data.ok_or_else(|| AppError::Schema("Chain response missing 'records.data'".to_string()))?;
    let expiry_dates = expiry_dates.ok_or_else(|| {
        AppError::Schema("Chain response missing 'records.expiryDates'".to_string())
    })?;
    if expiry_dates.is_empty() {
        return Err(AppError::Schema(
            "Chain response has no expiry dates".to_string(),
        ));
    }
    let underlying_value = underlying_value.ok_or_else(|| {
        AppError::Schema("Chain response missing 'records.underlyingValue'".to_string())
    })?;

    Ok(ChainDocument {
        data,
        expiry_dates,
        underlying_value,
    })
}

/// Pick the nearest expiry, or validate a caller-supplied one against the
/// upstream list
fn resolve_expiry(doc: &ChainDocument, requested: Option<&str>) -> Result<String> {
    match requested {
        None => Ok(doc.expiry_dates[0].clone()),
        Some(wanted) => {
            if doc.expiry_dates.iter().any(|e| e == wanted) {
                Ok(wanted.to_string())
            } else {
                Err(AppError::NotFound(format!(
                    "Expiry {} not in upstream list: {:?}",
                    wanted, doc.expiry_dates
                )))
            }
        }
    }
}

/// Available expiries for an index
pub async fn available_expiries(state: &AppState, index: &str) -> Result<Vec<String>> {
    let raw = state.router.exchange().get_option_chain(index).await?;
    let doc = validate(raw)?;
    Ok(doc.expiry_dates)
}

/// Fetch, flatten, band and persist one snapshot; returns its metadata
///
/// `requested_expiry` must already be in exchange-native form (handlers
/// normalize the compact numeric form first). `None` selects the nearest
/// expiry.
pub async fn fetch_snapshot(
    state: &AppState,
    index: &str,
    requested_expiry: Option<&str>,
    num_strikes: usize,
) -> Result<SnapshotMeta> {
    let index = index.to_uppercase();
    info!("Fetching option chain for {}", index);

    let raw = state.router.exchange().get_option_chain(&index).await?;
    let doc = validate(raw)?;
    let expiry = resolve_expiry(&doc, requested_expiry)?;

    let rows = chain::flatten(&doc.data, &expiry);
    if rows.is_empty() {
        return Err(AppError::NotFound(format!(
            "No option data for expiry {}",
            expiry
        )));
    }

    let band = chain::band_around_atm(rows, doc.underlying_value, num_strikes)?;
    state
        .snapshots
        .persist(&index, &expiry, doc.underlying_value, &band)
        .await
}

/// Fetch and flatten one expiry without banding or persistence
pub async fn live_rows(
    state: &AppState,
    index: &str,
    requested_expiry: Option<&str>,
) -> Result<Vec<FlatRow>> {
    let index = index.to_uppercase();
    let raw = state.router.exchange().get_option_chain(&index).await?;
    let doc = validate(raw)?;
    let expiry = resolve_expiry(&doc, requested_expiry)?;

    let rows = chain::flatten(&doc.data, &expiry);
    if rows.is_empty() {
        return Err(AppError::NotFound(format!(
            "No option data for expiry {}",
            expiry
        )));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> OptionChainRaw {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_validate_requires_records_data_and_expiries() {
        assert!(matches!(
            validate(raw(json!({}))),
            Err(AppError::Schema(_))
        ));
        assert!(matches!(
            validate(raw(json!({"records": {"expiryDates": ["16-Sep-2025"], "underlyingValue": 1.0}}))),
            Err(AppError::Schema(_))
        ));
        assert!(matches!(
            validate(raw(json!({"records": {"data": [], "underlyingValue": 1.0}}))),
            Err(AppError::Schema(_))
        ));

        let doc = validate(raw(json!({
            "records": {
                "data": [],
                "expiryDates": ["16-Sep-2025"],
                "underlyingValue": 24875.0
            }
        })))
        .unwrap();
        assert_eq!(doc.underlying_value, 24875.0);
    }

    #[test]
    fn test_resolve_expiry_defaults_to_nearest() {
        let doc = validate(raw(json!({
            "records": {
                "data": [],
                "expiryDates": ["16-Sep-2025", "23-Sep-2025"],
                "underlyingValue": 24875.0
            }
        })))
        .unwrap();

        assert_eq!(resolve_expiry(&doc, None).unwrap(), "16-Sep-2025");
        assert_eq!(
            resolve_expiry(&doc, Some("23-Sep-2025")).unwrap(),
            "23-Sep-2025"
        );
        assert!(matches!(
            resolve_expiry(&doc, Some("30-Sep-2025")),
            Err(AppError::NotFound(_))
        ));
    }
}
