use analysis_core::{FundamentalsProvider, MetricRow, MetricTable};
use serde_json::Value;
use std::collections::HashMap;

use crate::scale::parse_scaled_value;

/// Default comparison fields, matching what ad-hoc fundamental screens ask
/// a provider for.
pub const DEFAULT_METRIC_FIELDS: [&str; 5] = [
    "marketCap",
    "trailingPE",
    "forwardPE",
    "priceToBook",
    "profitMargins",
];

/// Raw, unparsed fundamentals for one ticker. Fields the provider did not
/// return are simply absent.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerProfile {
    pub ticker: String,
    pub values: HashMap<String, Value>,
}

/// Assembles comparable fundamental metrics across tickers.
pub struct MetricsAggregator<P> {
    provider: P,
}

impl<P: FundamentalsProvider> MetricsAggregator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// One row per requested ticker, in request order, numeric values parsed
    /// through the magnitude-suffix rules.
    ///
    /// A ticker whose provider call fails keeps its place as an all-missing
    /// row so the table shape stays predictable; dropping incomplete rows is
    /// the caller's separate cleaning step (`MetricTable::cleaned`).
    pub async fn fetch_metrics(&self, tickers: &[String], fields: &[String]) -> MetricTable {
        let mut rows = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let values = match self.provider.get(ticker).await {
                Ok(raw) => fields
                    .iter()
                    .map(|field| raw.get(field).and_then(parse_scaled_value))
                    .collect(),
                Err(err) => {
                    tracing::warn!("{}: fundamentals unavailable: {}", ticker, err);
                    vec![None; fields.len()]
                }
            };
            rows.push(MetricRow {
                ticker: ticker.clone(),
                values,
            });
        }
        MetricTable::from_rows(fields.to_vec(), rows)
    }

    /// Raw profile values (names, sectors, ranges) for each ticker, restricted
    /// to the requested fields but left unparsed for string-valued summaries.
    ///
    /// Always one profile per ticker in request order; a failed call yields an
    /// empty field map.
    pub async fn fetch_profiles(&self, tickers: &[String], fields: &[String]) -> Vec<TickerProfile> {
        let mut profiles = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let values = match self.provider.get(ticker).await {
                Ok(mut raw) => fields
                    .iter()
                    .filter_map(|field| raw.remove(field).map(|value| (field.clone(), value)))
                    .collect(),
                Err(err) => {
                    tracing::warn!("{}: profile unavailable: {}", ticker, err);
                    HashMap::new()
                }
            };
            profiles.push(TickerProfile {
                ticker: ticker.clone(),
                values,
            });
        }
        profiles
    }
}
