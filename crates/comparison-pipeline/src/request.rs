use analysis_core::{AnalysisError, NormalizedSeries};
use chrono::NaiveDate;
use rolling_statistics::WindowedSeries;
use serde::{Deserialize, Serialize};

/// A derived dataset the pipeline can compute for every surviving ticker.
///
/// An explicit registry: rendering layers enumerate these variants, nothing
/// is dispatched by name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DerivedMetric {
    /// Prices rebased so the first valid observation is exactly 1.0.
    Normalized,
    /// Trailing moving average over `window` observations.
    MovingAverage { window: usize },
    /// Rolling volatility of period-over-period returns, scaled by
    /// `sqrt(annualization_factor)`.
    Volatility {
        window: usize,
        annualization_factor: f64,
    },
}

/// Multi-ticker comparison over one field and a shared date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub tickers: Vec<String>,
    pub field: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub metrics: Vec<DerivedMetric>,
}

impl ComparisonRequest {
    /// Defaults to normalized prices; override with [`Self::with_metrics`].
    pub fn new(
        tickers: Vec<String>,
        field: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            tickers,
            field: field.into(),
            start,
            end,
            metrics: vec![DerivedMetric::Normalized],
        }
    }

    /// Typed single-ticker constructor, the explicit counterpart of wrapping
    /// one ticker in a list at the call site.
    pub fn single(
        ticker: impl Into<String>,
        field: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self::new(vec![ticker.into()], field, start, end)
    }

    pub fn with_metrics(mut self, metrics: Vec<DerivedMetric>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Lifecycle of a multi-ticker request. `Ready`, `PartialFailure` and
/// `Failed` are terminal; the rest name the stage a ticker was excluded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Pending,
    Fetching,
    Aligning,
    Computing,
    Ready,
    PartialFailure,
    Failed,
}

/// Why a ticker was dropped, and at which stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub ticker: String,
    pub stage: PipelineState,
    pub reason: AnalysisError,
}

/// One computed dataset for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputedMetric {
    Normalized(NormalizedSeries),
    MovingAverage(WindowedSeries),
    Volatility(WindowedSeries),
}

/// Everything computed for one surviving ticker, in the request's metric
/// registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerAnalytics {
    pub ticker: String,
    pub metrics: Vec<ComputedMetric>,
}

/// Final outcome: survivors in request order plus per-ticker exclusions with
/// their reasons, so presentation can say exactly what was skipped and why.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub state: PipelineState,
    pub analytics: Vec<TickerAnalytics>,
    pub exclusions: Vec<Exclusion>,
}

impl ComparisonResult {
    pub(crate) fn conclude(analytics: Vec<TickerAnalytics>, exclusions: Vec<Exclusion>) -> Self {
        let state = if analytics.is_empty() {
            PipelineState::Failed
        } else if exclusions.is_empty() {
            PipelineState::Ready
        } else {
            PipelineState::PartialFailure
        };
        Self {
            state,
            analytics,
            exclusions,
        }
    }
}
