use analysis_core::{AnalysisError, Observation, TimeSeries};
use rayon::prelude::*;
use statrs::statistics::Statistics;

/// Trading days per year, used to annualize daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Common moving-average windows for daily price series.
pub const DEFAULT_MA_WINDOWS: [usize; 3] = [20, 50, 200];

/// A rolling computation tagged with its window. `error` explains an
/// all-missing series produced from an unusable window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedSeries {
    pub window: usize,
    pub series: TimeSeries,
    pub error: Option<AnalysisError>,
}

/// Values of a window slice, only if every observation in it is present.
fn full_window(observations: &[Observation]) -> Option<Vec<f64>> {
    let values: Vec<f64> = observations.iter().filter_map(|obs| obs.value).collect();
    (values.len() == observations.len()).then_some(values)
}

fn all_missing(series: &TimeSeries, field: String) -> TimeSeries {
    let observations = series
        .observations()
        .iter()
        .map(|obs| Observation::missing(obs.date))
        .collect();
    series.derived(field, observations)
}

/// Trailing moving average over `window` observations.
///
/// Output has the same length and dates as the input. The first `window - 1`
/// positions are missing, as is any position whose window contains a gap.
pub fn moving_average(series: &TimeSeries, window: usize) -> Result<TimeSeries, AnalysisError> {
    if window == 0 || window > series.len() {
        return Err(AnalysisError::InvalidWindow(format!(
            "{} for {} series of length {}",
            window,
            series.ticker(),
            series.len()
        )));
    }

    let observations = series.observations();
    let mut out = Vec::with_capacity(observations.len());
    for (i, current) in observations.iter().enumerate() {
        let value = if i + 1 >= window {
            full_window(&observations[i + 1 - window..=i]).map(|values| {
                let sum: f64 = values.iter().sum();
                sum / window as f64
            })
        } else {
            None
        };
        out.push(Observation {
            date: current.date,
            value,
        });
    }
    Ok(series.derived(format!("{} MA({})", series.field(), window), out))
}

/// One moving average per requested window, in request order.
///
/// An unusable window does not fail the batch: it yields an all-missing
/// series with the `InvalidWindow` error attached, so one oversized window
/// never aborts the others.
pub fn moving_averages(series: &TimeSeries, windows: &[usize]) -> Vec<WindowedSeries> {
    windows
        .par_iter()
        .map(|&window| match moving_average(series, window) {
            Ok(result) => WindowedSeries {
                window,
                series: result,
                error: None,
            },
            Err(err) => WindowedSeries {
                window,
                series: all_missing(series, format!("{} MA({})", series.field(), window)),
                error: Some(err),
            },
        })
        .collect()
}

/// Period-over-period fractional change.
///
/// The first observation has no prior value and is dropped; a pair with a
/// missing side or a zero denominator yields missing.
pub fn percent_change(series: &TimeSeries) -> TimeSeries {
    let observations = series.observations();
    let mut out = Vec::with_capacity(observations.len().saturating_sub(1));
    for pair in observations.windows(2) {
        let value = match (pair[0].value, pair[1].value) {
            (Some(prev), Some(curr)) if prev != 0.0 => Some((curr - prev) / prev),
            _ => None,
        };
        out.push(Observation {
            date: pair[1].date,
            value,
        });
    }
    series.derived(format!("{} returns", series.field()), out)
}

/// Rolling sample standard deviation of period-over-period returns, scaled by
/// `sqrt(annualization_factor)`.
///
/// Output dates are the return dates (input length minus one); the first
/// `window - 1` return positions are missing. Sample (n-1) standard deviation
/// needs at least two points, so windows below 2 are invalid.
pub fn rolling_volatility(
    series: &TimeSeries,
    window: usize,
    annualization_factor: f64,
) -> Result<TimeSeries, AnalysisError> {
    let returns = percent_change(series);
    if window < 2 || window > returns.len() {
        return Err(AnalysisError::InvalidWindow(format!(
            "{} for {} return series of length {}",
            window,
            series.ticker(),
            returns.len()
        )));
    }

    let scale = annualization_factor.sqrt();
    let observations = returns.observations();
    let mut out = Vec::with_capacity(observations.len());
    for (i, current) in observations.iter().enumerate() {
        let value = if i + 1 >= window {
            full_window(&observations[i + 1 - window..=i])
                .map(|values| values.as_slice().std_dev() * scale)
        } else {
            None
        };
        out.push(Observation {
            date: current.date,
            value,
        });
    }
    Ok(series.derived(format!("{} volatility({})", series.field(), window), out))
}

/// One rolling volatility per requested window, with [`moving_averages`]
/// batch semantics: an unusable window yields an all-missing series with its
/// error attached instead of failing the others.
pub fn rolling_volatilities(
    series: &TimeSeries,
    windows: &[usize],
    annualization_factor: f64,
) -> Vec<WindowedSeries> {
    windows
        .par_iter()
        .map(
            |&window| match rolling_volatility(series, window, annualization_factor) {
                Ok(result) => WindowedSeries {
                    window,
                    series: result,
                    error: None,
                },
                Err(err) => WindowedSeries {
                    window,
                    series: all_missing(
                        series,
                        format!("{} volatility({})", series.field(), window),
                    ),
                    error: Some(err),
                },
            },
        )
        .collect()
}

/// Rolling volatility annualized with the trading-day convention.
pub fn annualized_volatility(
    series: &TimeSeries,
    window: usize,
) -> Result<TimeSeries, AnalysisError> {
    rolling_volatility(series, window, TRADING_DAYS_PER_YEAR)
}

/// Arithmetic mean of the valid observations; `None` when nothing is valid.
pub fn average(series: &TimeSeries) -> Option<f64> {
    let values: Vec<f64> = series
        .observations()
        .iter()
        .filter_map(|obs| obs.value)
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.as_slice().mean())
    }
}
