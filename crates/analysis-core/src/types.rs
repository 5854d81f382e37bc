use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::AnalysisError;

/// A single dated observation. `None` marks a gap in the source data and is
/// never interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value: Some(value),
        }
    }

    pub fn missing(date: NaiveDate) -> Self {
        Self { date, value: None }
    }
}

/// Ordered observations for one field ("Close", "Volume", ...) of one ticker.
///
/// Dates are strictly increasing; gaps (missing trading days) are allowed.
/// Transforms never mutate a series in place, they build a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    ticker: String,
    field: String,
    observations: Vec<Observation>,
}

impl TimeSeries {
    /// Build a series, rejecting duplicate or out-of-order dates.
    pub fn new(
        ticker: impl Into<String>,
        field: impl Into<String>,
        observations: Vec<Observation>,
    ) -> Result<Self, AnalysisError> {
        let ticker = ticker.into();
        for pair in observations.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(AnalysisError::InvalidSeries(format!(
                    "{} has non-increasing date {} after {}",
                    ticker, pair[1].date, pair[0].date
                )));
            }
        }
        Ok(Self {
            ticker,
            field: field.into(),
            observations,
        })
    }

    /// Convenience constructor from fully-present (date, value) pairs.
    pub fn from_values(
        ticker: impl Into<String>,
        field: impl Into<String>,
        values: Vec<(NaiveDate, f64)>,
    ) -> Result<Self, AnalysisError> {
        let observations = values
            .into_iter()
            .map(|(date, value)| Observation::new(date, value))
            .collect();
        Self::new(ticker, field, observations)
    }

    /// Build a derived series for the same ticker under a new field name.
    ///
    /// `observations` must preserve the strictly-increasing date order of the
    /// source series (transforms that subset or map this series always do).
    pub fn derived(&self, field: impl Into<String>, observations: Vec<Observation>) -> TimeSeries {
        debug_assert!(observations
            .windows(2)
            .all(|pair| pair[0].date < pair[1].date));
        TimeSeries {
            ticker: self.ticker.clone(),
            field: field.into(),
            observations,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// First observation carrying a value, if any.
    pub fn first_valid(&self) -> Option<(NaiveDate, f64)> {
        self.observations
            .iter()
            .find_map(|obs| obs.value.map(|value| (obs.date, value)))
    }

    /// Dates on which this series has a value.
    pub fn valid_dates(&self) -> BTreeSet<NaiveDate> {
        self.observations
            .iter()
            .filter(|obs| obs.value.is_some())
            .map(|obs| obs.date)
            .collect()
    }

    /// New series keeping only observations on the given dates.
    pub fn restrict_to(&self, dates: &BTreeSet<NaiveDate>) -> TimeSeries {
        let observations = self
            .observations
            .iter()
            .filter(|obs| dates.contains(&obs.date))
            .copied()
            .collect();
        self.derived(self.field.clone(), observations)
    }
}

/// A series rebased so its first valid observation is exactly 1.0.
///
/// Produced by the normalizer; the invariant is not re-checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    pub series: TimeSeries,
}

/// One financial-statement line figure, in whatever period order the
/// statement provider delivers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub period_end: NaiveDate,
    pub value: Option<f64>,
}

/// Growth of one statement pair; `period_end` is the newer period of the two.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthPoint {
    pub period_end: NaiveDate,
    pub growth: Option<f64>,
}

/// Period-over-period growth of a statement line, oldest period first.
///
/// The last point covers the most recent pair of periods; a missing growth
/// marks a zero denominator or a gap in the underlying figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSeries {
    pub ticker: String,
    pub line_item: String,
    pub points: Vec<GrowthPoint>,
}

impl GrowthSeries {
    /// Growth for the most recent fully-computed period, if any.
    pub fn most_recent_growth(&self) -> Option<f64> {
        self.points.iter().rev().find_map(|point| point.growth)
    }
}

/// One ticker's metric values, positionally aligned with `MetricTable::fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub ticker: String,
    pub values: Vec<Option<f64>>,
}

/// How a consumer wants rows with missing required fields handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingFieldPolicy {
    /// Drop any row missing a required field (comparative display default).
    DropIncomplete,
    /// Keep every row, leaving gaps as missing (raw retrieval default).
    Retain,
}

/// Tabular per-ticker metrics with a fixed column set.
///
/// Materialized once from a complete row list; rows keep the order the
/// tickers were requested in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTable {
    pub fields: Vec<String>,
    pub rows: Vec<MetricRow>,
}

impl MetricTable {
    pub fn from_rows(fields: Vec<String>, rows: Vec<MetricRow>) -> Self {
        debug_assert!(rows.iter().all(|row| row.values.len() == fields.len()));
        Self { fields, rows }
    }

    /// Value for one ticker/field, `None` when absent or missing.
    pub fn get(&self, ticker: &str, field: &str) -> Option<f64> {
        let column = self.fields.iter().position(|f| f == field)?;
        self.rows
            .iter()
            .find(|row| row.ticker == ticker)
            .and_then(|row| row.values[column])
    }

    /// Caller-invoked cleaning step. With `DropIncomplete`, rows missing any
    /// required field are removed; a required field that is not a column at
    /// all counts as missing for every row.
    pub fn cleaned(&self, required: &[&str], policy: MissingFieldPolicy) -> MetricTable {
        match policy {
            MissingFieldPolicy::Retain => self.clone(),
            MissingFieldPolicy::DropIncomplete => {
                let columns: Vec<Option<usize>> = required
                    .iter()
                    .map(|name| self.fields.iter().position(|f| f == name))
                    .collect();
                let rows = self
                    .rows
                    .iter()
                    .filter(|row| {
                        columns
                            .iter()
                            .all(|col| col.is_some_and(|i| row.values[i].is_some()))
                    })
                    .cloned()
                    .collect();
                MetricTable {
                    fields: self.fields.clone(),
                    rows,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_series_rejects_duplicate_dates() {
        let obs = vec![
            Observation::new(date(2024, 1, 2), 10.0),
            Observation::new(date(2024, 1, 2), 11.0),
        ];
        let result = TimeSeries::new("AAPL", "Close", obs);
        assert!(matches!(result, Err(AnalysisError::InvalidSeries(_))));
    }

    #[test]
    fn test_series_rejects_out_of_order_dates() {
        let obs = vec![
            Observation::new(date(2024, 1, 3), 10.0),
            Observation::new(date(2024, 1, 2), 11.0),
        ];
        assert!(TimeSeries::new("AAPL", "Close", obs).is_err());
    }

    #[test]
    fn test_first_valid_skips_leading_gaps() {
        let series = TimeSeries::new(
            "AAPL",
            "Close",
            vec![
                Observation::missing(date(2024, 1, 2)),
                Observation::new(date(2024, 1, 3), 187.5),
            ],
        )
        .unwrap();
        assert_eq!(series.first_valid(), Some((date(2024, 1, 3), 187.5)));
    }

    #[test]
    fn test_restrict_to_keeps_only_shared_dates() {
        let series = TimeSeries::from_values(
            "AAPL",
            "Close",
            vec![
                (date(2024, 1, 2), 1.0),
                (date(2024, 1, 3), 2.0),
                (date(2024, 1, 4), 3.0),
            ],
        )
        .unwrap();
        let keep: BTreeSet<NaiveDate> = [date(2024, 1, 2), date(2024, 1, 4)].into();
        let restricted = series.restrict_to(&keep);
        assert_eq!(restricted.len(), 2);
        assert_eq!(restricted.observations()[1].date, date(2024, 1, 4));
    }

    #[test]
    fn test_most_recent_growth_skips_trailing_missing() {
        let growth = GrowthSeries {
            ticker: "AAPL".to_string(),
            line_item: "Total Revenue".to_string(),
            points: vec![
                GrowthPoint {
                    period_end: date(2022, 12, 31),
                    growth: Some(0.10),
                },
                GrowthPoint {
                    period_end: date(2023, 12, 31),
                    growth: None,
                },
            ],
        };
        assert_eq!(growth.most_recent_growth(), Some(0.10));
    }

    #[test]
    fn test_cleaned_drops_rows_missing_required_fields() {
        let table = MetricTable::from_rows(
            vec!["marketCap".to_string(), "trailingPE".to_string()],
            vec![
                MetricRow {
                    ticker: "AAPL".to_string(),
                    values: vec![Some(3.0e12), Some(31.0)],
                },
                MetricRow {
                    ticker: "XYZ".to_string(),
                    values: vec![Some(1.0e9), None],
                },
            ],
        );

        let cleaned = table.cleaned(&["trailingPE"], MissingFieldPolicy::DropIncomplete);
        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rows[0].ticker, "AAPL");

        let retained = table.cleaned(&["trailingPE"], MissingFieldPolicy::Retain);
        assert_eq!(retained.rows.len(), 2);
    }

    #[test]
    fn test_cleaned_treats_unknown_required_field_as_missing() {
        let table = MetricTable::from_rows(
            vec!["marketCap".to_string()],
            vec![MetricRow {
                ticker: "AAPL".to_string(),
                values: vec![Some(3.0e12)],
            }],
        );
        let cleaned = table.cleaned(&["priceToBook"], MissingFieldPolicy::DropIncomplete);
        assert!(cleaned.rows.is_empty());
    }
}
