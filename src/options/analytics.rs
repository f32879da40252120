//! Option-chain analytics
//!
//! Pure, deterministic functions over a flattened chain: put-call ratios,
//! top open-interest strikes, and the max-pain strike.

use super::chain::{unique_strikes, FlatRow};
use serde::Serialize;
use std::collections::HashMap;

/// Put-call ratios by open interest and by traded volume
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PcrSummary {
    pub pcr_by_oi: f64,
    pub pcr_by_volume: f64,
}

/// One strike with its open interest, for support/resistance ranking
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OiLevel {
    #[serde(rename = "strikePrice")]
    pub strike_price: f64,
    #[serde(rename = "openInterest")]
    pub open_interest: f64,
}

/// Max-pain strike and the loss value at that strike
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MaxPain {
    pub max_pain_strike: Option<i64>,
    pub max_loss_value: i64,
}

/// Combined analytics over one flattened chain
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub pcr_by_oi: f64,
    pub pcr_by_volume: f64,
    pub resistance_strikes: Vec<OiLevel>,
    pub support_strikes: Vec<OiLevel>,
    pub max_pain_strike: Option<i64>,
    pub max_loss_value: i64,
}

/// PCR by OI and volume; zero denominators produce 0.0, never NaN
pub fn pcr(rows: &[FlatRow]) -> PcrSummary {
    let sum = |f: fn(&FlatRow) -> Option<f64>| -> f64 {
        rows.iter().filter_map(f).sum()
    };

    let total_ce_oi = sum(|r| r.ce_open_interest);
    let total_pe_oi = sum(|r| r.pe_open_interest);
    let total_ce_vol = sum(|r| r.ce_total_traded_volume);
    let total_pe_vol = sum(|r| r.pe_total_traded_volume);

    let ratio = |pe: f64, ce: f64| if ce > 0.0 { round2(pe / ce) } else { 0.0 };

    PcrSummary {
        pcr_by_oi: ratio(total_pe_oi, total_ce_oi),
        pcr_by_volume: ratio(total_pe_vol, total_ce_vol),
    }
}

/// Top-N strikes by call OI (resistance) and put OI (support)
///
/// Ties rank the lower strike first; rows without the side's OI are
/// ignored, so a chain missing the column yields an empty list.
pub fn top_oi(rows: &[FlatRow], top_n: usize) -> (Vec<OiLevel>, Vec<OiLevel>) {
    fn rank(
        rows: &[FlatRow],
        top_n: usize,
        oi: fn(&FlatRow) -> Option<f64>,
    ) -> Vec<OiLevel> {
        let mut levels: Vec<OiLevel> = rows
            .iter()
            .filter_map(|r| {
                oi(r).map(|open_interest| OiLevel {
                    strike_price: r.strike_price,
                    open_interest,
                })
            })
            .collect();
        levels.sort_by(|a, b| {
            b.open_interest
                .partial_cmp(&a.open_interest)
                .expect("OI values are finite")
                .then(
                    a.strike_price
                        .partial_cmp(&b.strike_price)
                        .expect("strikes are finite"),
                )
        });
        levels.truncate(top_n);
        levels
    }

    (
        rank(rows, top_n, |r| r.ce_open_interest),
        rank(rows, top_n, |r| r.pe_open_interest),
    )
}

/// Max-pain: for each candidate strike K, the aggregate intrinsic value
/// owed at expiration; the strike minimizing it wins, lowest strike on a
/// tie. Empty chains report no strike and zero loss.
pub fn max_pain(rows: &[FlatRow]) -> MaxPain {
    let strikes = unique_strikes(rows);
    if strikes.is_empty() {
        return MaxPain {
            max_pain_strike: None,
            max_loss_value: 0,
        };
    }

    // per-strike OI totals (duplicate strikes collapse additively)
    let mut ce_oi: HashMap<u64, f64> = HashMap::new();
    let mut pe_oi: HashMap<u64, f64> = HashMap::new();
    for row in rows {
        let key = row.strike_price.to_bits();
        if let Some(oi) = row.ce_open_interest {
            *ce_oi.entry(key).or_default() += oi;
        }
        if let Some(oi) = row.pe_open_interest {
            *pe_oi.entry(key).or_default() += oi;
        }
    }

    let mut best: Option<(f64, f64)> = None;
    for candidate in &strikes {
        let mut loss = 0.0;
        for strike in &strikes {
            if strike > candidate {
                loss += (strike - candidate) * ce_oi.get(&strike.to_bits()).copied().unwrap_or(0.0);
            } else if strike < candidate {
                loss += (candidate - strike) * pe_oi.get(&strike.to_bits()).copied().unwrap_or(0.0);
            }
        }
        // strictly-less keeps the earliest (lowest) strike on ties
        if best.map_or(true, |(_, best_loss)| loss < best_loss) {
            best = Some((*candidate, loss));
        }
    }

    let (strike, loss) = best.expect("strikes is non-empty");
    MaxPain {
        max_pain_strike: Some(strike as i64),
        max_loss_value: loss as i64,
    }
}

/// The full analytics bundle over one chain
pub fn analyze(rows: &[FlatRow], top_n: usize) -> AnalyticsReport {
    let pcr = pcr(rows);
    let (resistance_strikes, support_strikes) = top_oi(rows, top_n);
    let pain = max_pain(rows);
    AnalyticsReport {
        pcr_by_oi: pcr.pcr_by_oi,
        pcr_by_volume: pcr.pcr_by_volume,
        resistance_strikes,
        support_strikes,
        max_pain_strike: pain.max_pain_strike,
        max_loss_value: pain.max_loss_value,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(strike: f64, ce_oi: Option<f64>, pe_oi: Option<f64>) -> FlatRow {
        serde_json::from_value(json!({
            "strikePrice": strike,
            "expiryDate": "16-Sep-2025",
            "CE_openInterest": ce_oi,
            "PE_openInterest": pe_oi
        }))
        .unwrap()
    }

    fn row_with_volume(strike: f64, ce_vol: f64, pe_vol: f64) -> FlatRow {
        serde_json::from_value(json!({
            "strikePrice": strike,
            "expiryDate": "16-Sep-2025",
            "CE_totalTradedVolume": ce_vol,
            "PE_totalTradedVolume": pe_vol
        }))
        .unwrap()
    }

    #[test]
    fn test_pcr_rounding() {
        let rows = vec![row(100.0, Some(300.0), Some(100.0))];
        let summary = pcr(&rows);
        assert_eq!(summary.pcr_by_oi, 0.33);
        assert_eq!(summary.pcr_by_volume, 0.0);
    }

    #[test]
    fn test_pcr_by_volume() {
        let rows = vec![
            row_with_volume(100.0, 400.0, 500.0),
            row_with_volume(200.0, 100.0, 250.0),
        ];
        assert_eq!(pcr(&rows).pcr_by_volume, 1.5);
    }

    #[test]
    fn test_pcr_missing_ce_column_is_zero_not_nan() {
        let rows = vec![
            row(100.0, None, Some(500.0)),
            row(200.0, None, Some(300.0)),
        ];
        let summary = pcr(&rows);
        assert_eq!(summary.pcr_by_oi, 0.0);
        assert!(summary.pcr_by_oi.is_finite());
    }

    #[test]
    fn test_pcr_empty_chain() {
        assert_eq!(
            pcr(&[]),
            PcrSummary {
                pcr_by_oi: 0.0,
                pcr_by_volume: 0.0
            }
        );
    }

    #[test]
    fn test_top_oi_ranks_and_truncates() {
        let rows = vec![
            row(100.0, Some(50.0), Some(10.0)),
            row(200.0, Some(80.0), Some(30.0)),
            row(300.0, Some(70.0), Some(20.0)),
        ];

        let (resistance, support) = top_oi(&rows, 2);
        assert_eq!(resistance[0].strike_price, 200.0);
        assert_eq!(resistance[1].strike_price, 300.0);
        assert_eq!(support[0].strike_price, 200.0);
        assert_eq!(support.len(), 2);
    }

    #[test]
    fn test_top_oi_tie_prefers_lower_strike() {
        let rows = vec![
            row(300.0, Some(80.0), None),
            row(100.0, Some(80.0), None),
        ];
        let (resistance, _) = top_oi(&rows, 1);
        assert_eq!(resistance[0].strike_price, 100.0);
    }

    #[test]
    fn test_top_oi_missing_column_yields_empty() {
        let rows = vec![row(100.0, None, Some(10.0))];
        let (resistance, support) = top_oi(&rows, 5);
        assert!(resistance.is_empty());
        assert_eq!(support.len(), 1);
    }

    #[test]
    fn test_top_n_larger_than_rows_returns_all() {
        let rows = vec![
            row(100.0, Some(1.0), None),
            row(200.0, Some(2.0), None),
        ];
        let (resistance, _) = top_oi(&rows, 10);
        assert_eq!(resistance.len(), 2);
    }

    #[test]
    fn test_max_pain_two_strike_scenario() {
        // loss at 24800 = 0; loss at 24900 = 100 * 100 = 10000
        let rows = vec![
            row(24800.0, Some(100.0), Some(0.0)),
            row(24900.0, Some(0.0), Some(100.0)),
        ];

        let pain = max_pain(&rows);
        assert_eq!(pain.max_pain_strike, Some(24800));
        assert_eq!(pain.max_loss_value, 0);
    }

    #[test]
    fn test_max_pain_empty_chain() {
        assert_eq!(
            max_pain(&[]),
            MaxPain {
                max_pain_strike: None,
                max_loss_value: 0
            }
        );
    }

    #[test]
    fn test_max_pain_tie_prefers_lowest_strike() {
        // no OI anywhere: every candidate has zero loss
        let rows = vec![row(100.0, None, None), row(200.0, None, None)];
        let pain = max_pain(&rows);
        assert_eq!(pain.max_pain_strike, Some(100));
    }

    #[test]
    fn test_max_pain_is_argmin_of_loss() {
        let rows = vec![
            row(100.0, Some(10.0), Some(40.0)),
            row(200.0, Some(20.0), Some(20.0)),
            row(300.0, Some(40.0), Some(10.0)),
        ];

        // loss(100) = 100*20 + 200*40 = 10000
        // loss(200) = 100*40 + 100*40 = 8000
        // loss(300) = 200*40 + 100*20 = 10000
        let pain = max_pain(&rows);
        assert_eq!(pain.max_pain_strike, Some(200));
        assert_eq!(pain.max_loss_value, 8000);
    }

    #[test]
    fn test_analyze_bundle() {
        let rows = vec![
            row(24800.0, Some(100.0), Some(0.0)),
            row(24900.0, Some(0.0), Some(100.0)),
        ];

        let report = analyze(&rows, 5);
        assert_eq!(report.pcr_by_oi, 1.0);
        assert_eq!(report.max_pain_strike, Some(24800));
        assert_eq!(report.resistance_strikes.len(), 2);
    }
}
