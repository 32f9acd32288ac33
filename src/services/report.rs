//! Offline statistics over a persisted metric series
//!
//! Reconstructs per-code time series from `query_series` output and
//! derives period return, maximum drawdown and log-return volatility for
//! the share price, plus the TVL change when a TVL series is present.
//! Pure derivation over already-persisted data; nothing here touches the
//! chain.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, MathematicalOps};

use crate::services::store::{MetricCode, SeriesPoint};

/// Error types for report derivation
#[derive(Debug)]
pub enum ReportError {
    EmptySeries(String),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::EmptySeries(code) => {
                write!(f, "No data points for {} in the period", code)
            }
        }
    }
}

impl std::error::Error for ReportError {}

/// Derived statistics for one vault over one period
#[derive(Debug, Clone, PartialEq)]
pub struct VaultPeriodReport {
    /// Share-price points entering the statistics
    pub points: usize,
    /// `close/open - 1` over the share price; None when the opening
    /// price is zero
    pub period_return: Option<Decimal>,
    /// Minimum of `value/running_max - 1` over the share price, <= 0
    pub max_drawdown: Decimal,
    /// Sample standard deviation of log returns; None with fewer than
    /// two usable returns
    pub volatility: Option<Decimal>,
    /// `close/open - 1` over TVL; None without a TVL series or with a
    /// zero opening value
    pub tvl_change: Option<Decimal>,
}

/// Extract one code's series, dropping repeated timestamps (the first
/// observation wins; input is already time-ordered).
fn series_for(points: &[SeriesPoint], code: &str) -> Vec<(DateTime<Utc>, Decimal)> {
    let mut out: Vec<(DateTime<Utc>, Decimal)> = Vec::new();
    for p in points.iter().filter(|p| p.code == code) {
        if out.last().map(|(ts, _)| *ts) == Some(p.ts) {
            continue;
        }
        out.push((p.ts, p.value));
    }
    out
}

fn change_over(series: &[(DateTime<Utc>, Decimal)]) -> Option<Decimal> {
    let (_, open) = series.first()?;
    let (_, close) = series.last()?;
    if open.is_zero() {
        return None;
    }
    Some(close / open - Decimal::ONE)
}

fn max_drawdown(series: &[(DateTime<Utc>, Decimal)]) -> Decimal {
    let mut running_max = Decimal::ZERO;
    let mut worst = Decimal::ZERO;
    for (_, value) in series {
        if *value > running_max {
            running_max = *value;
        } else if running_max > Decimal::ZERO {
            let drawdown = value / running_max - Decimal::ONE;
            worst = worst.min(drawdown);
        }
    }
    worst
}

/// Sample standard deviation (n-1 denominator) of log returns, skipping
/// pairs with a zero value on either side.
fn log_return_volatility(series: &[(DateTime<Utc>, Decimal)]) -> Option<Decimal> {
    let mut returns: Vec<Decimal> = Vec::new();
    for pair in series.windows(2) {
        let (_, prev) = pair[0];
        let (_, curr) = pair[1];
        if prev.is_zero() || curr.is_zero() {
            continue;
        }
        if let Some(r) = (curr / prev).checked_ln() {
            returns.push(r);
        }
    }

    let n = returns.len();
    if n < 2 {
        return None;
    }

    let count = Decimal::from(n as u64);
    let mean = returns.iter().sum::<Decimal>() / count;
    let variance = returns
        .iter()
        .map(|r| (*r - mean) * (*r - mean))
        .sum::<Decimal>()
        / (count - Decimal::ONE);

    variance.sqrt()
}

/// Derive the period report from one vault's series rows.
pub fn compute_report(points: &[SeriesPoint]) -> Result<VaultPeriodReport, ReportError> {
    let pps = series_for(points, MetricCode::SharePrice.code());
    if pps.is_empty() {
        return Err(ReportError::EmptySeries(
            MetricCode::SharePrice.code().to_string(),
        ));
    }
    let tvl = series_for(points, MetricCode::TvlAsset.code());

    Ok(VaultPeriodReport {
        points: pps.len(),
        period_return: change_over(&pps),
        max_drawdown: max_drawdown(&pps),
        volatility: log_return_volatility(&pps),
        tvl_change: change_over(&tvl),
    })
}
