use analysis_core::{AnalysisError, NormalizedSeries, Observation, TimeSeries};
use std::collections::BTreeSet;

/// Rebase a series so its first valid observation is exactly 1.0.
///
/// Every observation is divided by the first non-missing value; the origin
/// position becomes `v / v`, which is exactly 1.0 for any finite non-zero v.
/// Leading gaps stay missing. Callers comparing multiple tickers should treat
/// a failure here as dropping that ticker, not the whole comparison.
pub fn normalize(series: &TimeSeries) -> Result<NormalizedSeries, AnalysisError> {
    let (origin_date, origin) = series.first_valid().ok_or_else(|| {
        AnalysisError::ZeroOrMissingOrigin(format!(
            "{} has no valid observation to rebase against",
            series.ticker()
        ))
    })?;
    if origin == 0.0 {
        return Err(AnalysisError::ZeroOrMissingOrigin(format!(
            "{} origin at {} is zero",
            series.ticker(),
            origin_date
        )));
    }

    let rebased = series
        .observations()
        .iter()
        .map(|obs| Observation {
            date: obs.date,
            value: obs.value.map(|v| v / origin),
        })
        .collect();
    Ok(NormalizedSeries {
        series: series.derived(format!("{} normalized", series.field()), rebased),
    })
}

/// Restrict every series to the dates where all of them have a valid value.
///
/// The shared domain is the intersection of each series' non-missing dates,
/// so cross-ticker comparisons never line up a value against a gap. Aligning
/// an already-aligned set is a no-op. An empty input yields an empty output.
pub fn align(series_list: &[TimeSeries]) -> Result<Vec<TimeSeries>, AnalysisError> {
    if series_list.is_empty() {
        return Ok(Vec::new());
    }

    let mut shared: BTreeSet<_> = series_list[0].valid_dates();
    for series in &series_list[1..] {
        let dates = series.valid_dates();
        shared.retain(|date| dates.contains(date));
    }

    if shared.is_empty() {
        return Err(AnalysisError::NoOverlappingPeriod(format!(
            "no shared dates across {} series",
            series_list.len()
        )));
    }

    Ok(series_list
        .iter()
        .map(|series| series.restrict_to(&shared))
        .collect())
}
