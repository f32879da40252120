//! Option-chain flattening and strike banding
//!
//! Turns the raw upstream chain into flat rows (nested CE/PE maps hoisted
//! into `CE_*`/`PE_*` columns) and selects the contiguous strike window
//! around the at-the-money level.

use crate::error::{AppError, Result};
use crate::providers::types::{ChainEntry, OptionSide};
use serde::{Deserialize, Serialize};

/// One flattened row of an option chain, CSV-shaped
///
/// Either side's columns are absent when the upstream row lacked that
/// sub-record; a row with neither side is dropped during flattening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatRow {
    #[serde(rename = "strikePrice")]
    pub strike_price: f64,
    #[serde(rename = "expiryDate")]
    pub expiry_date: String,
    #[serde(rename = "CE_openInterest")]
    pub ce_open_interest: Option<f64>,
    #[serde(rename = "CE_changeinOpenInterest")]
    pub ce_changein_open_interest: Option<f64>,
    #[serde(rename = "CE_totalTradedVolume")]
    pub ce_total_traded_volume: Option<f64>,
    #[serde(rename = "CE_impliedVolatility")]
    pub ce_implied_volatility: Option<f64>,
    #[serde(rename = "CE_lastPrice")]
    pub ce_last_price: Option<f64>,
    #[serde(rename = "CE_change")]
    pub ce_change: Option<f64>,
    #[serde(rename = "PE_openInterest")]
    pub pe_open_interest: Option<f64>,
    #[serde(rename = "PE_changeinOpenInterest")]
    pub pe_changein_open_interest: Option<f64>,
    #[serde(rename = "PE_totalTradedVolume")]
    pub pe_total_traded_volume: Option<f64>,
    #[serde(rename = "PE_impliedVolatility")]
    pub pe_implied_volatility: Option<f64>,
    #[serde(rename = "PE_lastPrice")]
    pub pe_last_price: Option<f64>,
    #[serde(rename = "PE_change")]
    pub pe_change: Option<f64>,
}

/// Banded chain plus the selection facts that go into snapshot metadata
#[derive(Debug, Clone)]
pub struct BandedChain {
    pub rows: Vec<FlatRow>,
    pub atm_strike: f64,
    pub selected_range: (f64, f64),
}

/// Flatten the raw rows matching one expiry
///
/// Rows with an unparseable strike or with neither a CE nor a PE
/// sub-record are dropped. Output order follows the upstream; banding
/// sorts later.
pub fn flatten(entries: &[ChainEntry], expiry: &str) -> Vec<FlatRow> {
    entries
        .iter()
        .filter(|e| e.expiry_date == expiry)
        .filter(|e| e.ce.is_some() || e.pe.is_some())
        .filter_map(|e| {
            let strike_price = e.strike_price.as_f64()?;
            Some(flatten_entry(strike_price, expiry, e))
        })
        .collect()
}

fn flatten_entry(strike_price: f64, expiry: &str, entry: &ChainEntry) -> FlatRow {
    fn side(side: &Option<OptionSide>) -> [Option<f64>; 6] {
        match side {
            Some(s) => [
                s.open_interest.as_f64(),
                s.changein_open_interest.as_f64(),
                s.total_traded_volume.as_f64(),
                s.implied_volatility.as_f64(),
                s.last_price.as_f64(),
                s.change.as_f64(),
            ],
            None => [None; 6],
        }
    }

    let [ce_oi, ce_coi, ce_vol, ce_iv, ce_ltp, ce_chg] = side(&entry.ce);
    let [pe_oi, pe_coi, pe_vol, pe_iv, pe_ltp, pe_chg] = side(&entry.pe);

    FlatRow {
        strike_price,
        expiry_date: expiry.to_string(),
        ce_open_interest: ce_oi,
        ce_changein_open_interest: ce_coi,
        ce_total_traded_volume: ce_vol,
        ce_implied_volatility: ce_iv,
        ce_last_price: ce_ltp,
        ce_change: ce_chg,
        pe_open_interest: pe_oi,
        pe_changein_open_interest: pe_coi,
        pe_total_traded_volume: pe_vol,
        pe_implied_volatility: pe_iv,
        pe_last_price: pe_ltp,
        pe_change: pe_chg,
    }
}

/// Sorted unique strikes of a flattened chain
pub fn unique_strikes(rows: &[FlatRow]) -> Vec<f64> {
    let mut strikes: Vec<f64> = rows.iter().map(|r| r.strike_price).collect();
    strikes.sort_by(|a, b| a.partial_cmp(b).expect("strikes are finite"));
    strikes.dedup();
    strikes
}

/// Index of the ATM strike: binary search for the underlying, then pull
/// back one step when the left neighbour is strictly closer
pub fn atm_index(strikes: &[f64], underlying: f64) -> usize {
    let mut idx = strikes.partition_point(|s| *s < underlying);
    if idx == strikes.len() {
        return strikes.len().saturating_sub(1);
    }
    if idx > 0 && (strikes[idx - 1] - underlying).abs() < (strikes[idx] - underlying).abs() {
        idx -= 1;
    }
    idx
}

/// Restrict a flattened chain to the contiguous window of `num_strikes`
/// on each side of the ATM strike; output is strike-ascending
pub fn band_around_atm(
    mut rows: Vec<FlatRow>,
    underlying: f64,
    num_strikes: usize,
) -> Result<BandedChain> {
    let strikes = unique_strikes(&rows);
    if strikes.is_empty() {
        return Err(AppError::Schema(
            "Option chain has no rows with numeric strikes".to_string(),
        ));
    }

    let atm = atm_index(&strikes, underlying);
    let low = atm.saturating_sub(num_strikes);
    let high = (atm + num_strikes).min(strikes.len() - 1);
    let (low_strike, high_strike) = (strikes[low], strikes[high]);

    rows.retain(|r| r.strike_price >= low_strike && r.strike_price <= high_strike);
    rows.sort_by(|a, b| {
        a.strike_price
            .partial_cmp(&b.strike_price)
            .expect("strikes are finite")
    });

    Ok(BandedChain {
        rows,
        atm_strike: strikes[atm],
        selected_range: (low_strike, high_strike),
    })
}
