use crate::{AnalysisError, StatementPeriod, TimeSeries};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;

/// Source of dated price/volume history. Retries, rate limits and caching are
/// the provider's concern; the engine only sees the final per-ticker outcome.
#[async_trait]
pub trait HistoricalSeriesProvider: Send + Sync {
    async fn get(
        &self,
        ticker: &str,
        field: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries, AnalysisError>;
}

/// Source of point-in-time fundamentals (market cap, ratios, margins).
/// Values arrive as raw JSON scalars; absent fields are simply not in the map.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn get(&self, ticker: &str) -> Result<HashMap<String, Value>, AnalysisError>;
}

/// Source of financial-statement line items, in whatever period order the
/// upstream statement uses. A statement lacking the requested line yields
/// `AnalysisError::LineItemNotFound`.
#[async_trait]
pub trait StatementProvider: Send + Sync {
    async fn get(
        &self,
        ticker: &str,
        line_item: &str,
    ) -> Result<Vec<StatementPeriod>, AnalysisError>;
}
