use analysis_core::{AnalysisError, HistoricalSeriesProvider, TimeSeries};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;

pub mod request;
pub use request::{
    ComparisonRequest, ComparisonResult, ComputedMetric, DerivedMetric, Exclusion, PipelineState,
    TickerAnalytics,
};

/// Orchestrates normalization and rolling statistics across a ticker set.
///
/// Each request walks `Pending -> Fetching -> Aligning -> Computing` and ends
/// `Ready`, `PartialFailure` (some tickers dropped, with reasons) or `Failed`
/// (nothing usable). Per-ticker failures never abort the batch.
pub struct ComparativeAnalysisPipeline {
    provider: Arc<dyn HistoricalSeriesProvider>,
}

impl ComparativeAnalysisPipeline {
    pub fn new(provider: Arc<dyn HistoricalSeriesProvider>) -> Self {
        Self { provider }
    }

    /// Drive one request through every stage.
    pub async fn run(&self, request: &ComparisonRequest) -> ComparisonResult {
        tracing::info!(
            "comparing {} tickers on {} from {} to {}",
            request.tickers.len(),
            request.field,
            request.start,
            request.end
        );

        let (fetched, mut exclusions) = self.fetch_stage(request).await;
        if fetched.is_empty() {
            return ComparisonResult::conclude(Vec::new(), exclusions);
        }

        let aligned = align_stage(fetched, &mut exclusions);
        if aligned.is_empty() {
            return ComparisonResult::conclude(Vec::new(), exclusions);
        }

        let analytics = compute_stage(&aligned, &request.metrics, &mut exclusions);
        let result = ComparisonResult::conclude(analytics, exclusions);
        tracing::info!(
            "comparison finished: {:?} ({} kept, {} excluded)",
            result.state,
            result.analytics.len(),
            result.exclusions.len()
        );
        result
    }

    /// Fan the per-ticker fetches out, then reassemble in request order
    /// (never completion order) so results and golden files stay stable.
    async fn fetch_stage(
        &self,
        request: &ComparisonRequest,
    ) -> (Vec<TimeSeries>, Vec<Exclusion>) {
        let mut tasks = JoinSet::new();
        for (index, ticker) in request.tickers.iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let ticker = ticker.clone();
            let field = request.field.clone();
            let (start, end) = (request.start, request.end);
            tasks.spawn(async move {
                let outcome = provider.get(&ticker, &field, start, end).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Result<TimeSeries, AnalysisError>>> =
            request.tickers.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(err) => tracing::error!("fetch task failed: {}", err),
            }
        }

        let mut fetched = Vec::new();
        let mut exclusions = Vec::new();
        for (ticker, slot) in request.tickers.iter().zip(slots) {
            match slot {
                Some(Ok(series)) => fetched.push(series),
                Some(Err(reason)) => {
                    tracing::warn!("{}: excluded while fetching: {}", ticker, reason);
                    exclusions.push(Exclusion {
                        ticker: ticker.clone(),
                        stage: PipelineState::Fetching,
                        reason,
                    });
                }
                None => exclusions.push(Exclusion {
                    ticker: ticker.clone(),
                    stage: PipelineState::Fetching,
                    reason: AnalysisError::Fetch("fetch task aborted".to_string()),
                }),
            }
        }
        (fetched, exclusions)
    }
}

fn intersect_all(domains: &[BTreeSet<NaiveDate>]) -> BTreeSet<NaiveDate> {
    let mut iter = domains.iter();
    let Some(first) = iter.next() else {
        return BTreeSet::new();
    };
    let mut shared = first.clone();
    for domain in iter {
        shared.retain(|date| domain.contains(date));
    }
    shared
}

/// Shrink the ticker set until every survivor shares a date domain, excluding
/// as few tickers as possible, then restrict the survivors to that domain.
///
/// An empty whole-set intersection is resolved leave-one-out: drop the ticker
/// whose removal frees the largest shared domain. Ties, and the case where no
/// single removal helps, resolve to the earliest requested ticker.
fn align_stage(fetched: Vec<TimeSeries>, exclusions: &mut Vec<Exclusion>) -> Vec<TimeSeries> {
    let mut survivors: Vec<TimeSeries> = Vec::new();
    for series in fetched {
        if series.valid_dates().is_empty() {
            tracing::warn!("{}: excluded while aligning: no valid observations", series.ticker());
            exclusions.push(Exclusion {
                ticker: series.ticker().to_string(),
                stage: PipelineState::Aligning,
                reason: AnalysisError::NoOverlappingPeriod(format!(
                    "{} has no valid observations in the requested range",
                    series.ticker()
                )),
            });
        } else {
            survivors.push(series);
        }
    }

    while survivors.len() > 1 {
        let domains: Vec<BTreeSet<NaiveDate>> =
            survivors.iter().map(|series| series.valid_dates()).collect();
        if !intersect_all(&domains).is_empty() {
            break;
        }

        let mut drop_index = 0;
        let mut best = 0usize;
        for candidate in 0..survivors.len() {
            let rest: Vec<BTreeSet<NaiveDate>> = domains
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != candidate)
                .map(|(_, domain)| domain.clone())
                .collect();
            let size = intersect_all(&rest).len();
            if size > best {
                best = size;
                drop_index = candidate;
            }
        }

        let dropped = survivors.remove(drop_index);
        tracing::warn!(
            "{}: excluded while aligning: no overlap with the other tickers",
            dropped.ticker()
        );
        exclusions.push(Exclusion {
            ticker: dropped.ticker().to_string(),
            stage: PipelineState::Aligning,
            reason: AnalysisError::NoOverlappingPeriod(format!(
                "{} shares no valid dates with the rest of the request",
                dropped.ticker()
            )),
        });
    }

    // Survivors overlap by construction, so this restriction cannot fail.
    series_normalizer::align(&survivors).unwrap_or_else(|err| {
        tracing::error!("alignment failed after overlap resolution: {}", err);
        Vec::new()
    })
}

/// Evaluate the metric registry for every surviving ticker in parallel;
/// indexed collection keeps the output in request order.
fn compute_stage(
    aligned: &[TimeSeries],
    metrics: &[DerivedMetric],
    exclusions: &mut Vec<Exclusion>,
) -> Vec<TickerAnalytics> {
    let outcomes: Vec<Result<TickerAnalytics, Exclusion>> = aligned
        .par_iter()
        .map(|series| compute_ticker(series, metrics))
        .collect();

    let mut analytics = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(ticker_analytics) => analytics.push(ticker_analytics),
            Err(exclusion) => {
                tracing::warn!(
                    "{}: excluded while computing: {}",
                    exclusion.ticker,
                    exclusion.reason
                );
                exclusions.push(exclusion);
            }
        }
    }
    analytics
}

/// Evaluate every registered metric for one ticker. A failed normalization
/// drops the ticker; an unusable rolling window keeps it, with the window's
/// all-missing result and error attached.
fn compute_ticker(
    series: &TimeSeries,
    metrics: &[DerivedMetric],
) -> Result<TickerAnalytics, Exclusion> {
    let mut computed = Vec::with_capacity(metrics.len());
    for metric in metrics {
        match *metric {
            DerivedMetric::Normalized => {
                let normalized =
                    series_normalizer::normalize(series).map_err(|reason| Exclusion {
                        ticker: series.ticker().to_string(),
                        stage: PipelineState::Computing,
                        reason,
                    })?;
                computed.push(ComputedMetric::Normalized(normalized));
            }
            DerivedMetric::MovingAverage { window } => {
                if let Some(windowed) =
                    rolling_statistics::moving_averages(series, &[window]).pop()
                {
                    computed.push(ComputedMetric::MovingAverage(windowed));
                }
            }
            DerivedMetric::Volatility {
                window,
                annualization_factor,
            } => {
                if let Some(windowed) =
                    rolling_statistics::rolling_volatilities(series, &[window], annualization_factor)
                        .pop()
                {
                    computed.push(ComputedMetric::Volatility(windowed));
                }
            }
        }
    }
    Ok(TickerAnalytics {
        ticker: series.ticker().to_string(),
        metrics: computed,
    })
}
