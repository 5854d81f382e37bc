use analysis_core::{AnalysisError, GrowthPoint, GrowthSeries, StatementPeriod, StatementProvider};

/// Canonical income-statement line for revenue growth.
pub const TOTAL_REVENUE: &str = "Total Revenue";

/// Period-over-period growth of a statement line.
///
/// Statement providers commonly deliver periods newest-first; ordering is
/// detected from adjacent timestamps and normalized to oldest-first before
/// differencing, so the result always ends with the most recent pair. Each
/// point computes `(newer - older) / older` and is stamped with the newer
/// period's end date; a zero denominator or a missing figure on either side
/// yields a missing growth.
pub fn year_over_year_growth(
    ticker: impl Into<String>,
    line_item: impl Into<String>,
    periods: &[StatementPeriod],
) -> GrowthSeries {
    let descending = periods
        .windows(2)
        .all(|pair| pair[0].period_end >= pair[1].period_end);

    let mut ordered = periods.to_vec();
    if descending {
        ordered.reverse();
    } else {
        ordered.sort_by_key(|period| period.period_end);
    }

    let points = ordered
        .windows(2)
        .map(|pair| {
            let growth = match (pair[0].value, pair[1].value) {
                (Some(older), Some(newer)) if older != 0.0 => Some((newer - older) / older),
                _ => None,
            };
            GrowthPoint {
                period_end: pair[1].period_end,
                growth,
            }
        })
        .collect();

    GrowthSeries {
        ticker: ticker.into(),
        line_item: line_item.into(),
        points,
    }
}

/// Fetch a statement line for each ticker and derive its growth series.
///
/// Outcomes come back in input order. A ticker whose statement lacks the line
/// item, or whose fetch fails outright, is recorded with its error and the
/// batch continues with the rest.
pub async fn fetch_growth<P>(
    provider: &P,
    tickers: &[String],
    line_item: &str,
) -> Vec<(String, Result<GrowthSeries, AnalysisError>)>
where
    P: StatementProvider + ?Sized,
{
    let mut results = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let outcome = match provider.get(ticker, line_item).await {
            Ok(periods) => Ok(year_over_year_growth(
                ticker.clone(),
                line_item,
                &periods,
            )),
            Err(err) => {
                tracing::warn!("{}: {} growth unavailable: {}", ticker, line_item, err);
                Err(err)
            }
        };
        results.push((ticker.clone(), outcome));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn period_end(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 12, 31).unwrap()
    }

    fn period(year: i32, value: f64) -> StatementPeriod {
        StatementPeriod {
            period_end: period_end(year),
            value: Some(value),
        }
    }

    #[test]
    fn test_growth_newest_first_statement() {
        // Newest-first, the common statement order: 100 -> 200 is 100% growth
        // reported for the 2023 period.
        let periods = vec![period(2023, 200.0), period(2022, 100.0)];
        let growth = year_over_year_growth("AAPL", TOTAL_REVENUE, &periods);

        assert_eq!(growth.points.len(), 1);
        assert_eq!(growth.points[0].period_end, period_end(2023));
        assert_relative_eq!(growth.points[0].growth.unwrap(), 1.0);
        assert_relative_eq!(growth.most_recent_growth().unwrap(), 1.0);
    }

    #[test]
    fn test_growth_order_insensitive() {
        let newest_first = vec![period(2023, 240.0), period(2022, 200.0), period(2021, 160.0)];
        let oldest_first = vec![period(2021, 160.0), period(2022, 200.0), period(2023, 240.0)];

        let a = year_over_year_growth("AAPL", TOTAL_REVENUE, &newest_first);
        let b = year_over_year_growth("AAPL", TOTAL_REVENUE, &oldest_first);
        assert_eq!(a, b);
    }

    #[test]
    fn test_growth_points_are_oldest_first() {
        let periods = vec![period(2023, 240.0), period(2022, 200.0), period(2021, 160.0)];
        let growth = year_over_year_growth("AAPL", TOTAL_REVENUE, &periods);

        assert_eq!(growth.points.len(), 2);
        assert_eq!(growth.points[0].period_end, period_end(2022));
        assert_eq!(growth.points[1].period_end, period_end(2023));
        assert_relative_eq!(growth.points[0].growth.unwrap(), 0.25);
        assert_relative_eq!(growth.points[1].growth.unwrap(), 0.2);
    }

    #[test]
    fn test_growth_zero_denominator_is_missing() {
        let periods = vec![period(2023, 150.0), period(2022, 0.0), period(2021, 120.0)];
        let growth = year_over_year_growth("AAPL", TOTAL_REVENUE, &periods);

        // 2021 -> 2022 computes; 2022 -> 2023 divides by zero.
        assert!(growth.points[0].growth.is_some());
        assert_eq!(growth.points[1].growth, None);
        // Most recent falls back to the last computed pair.
        assert_relative_eq!(growth.most_recent_growth().unwrap(), -1.0);
    }

    #[test]
    fn test_growth_missing_figure_is_missing() {
        let periods = vec![
            period(2023, 150.0),
            StatementPeriod {
                period_end: period_end(2022),
                value: None,
            },
            period(2021, 120.0),
        ];
        let growth = year_over_year_growth("AAPL", TOTAL_REVENUE, &periods);

        assert_eq!(growth.points[0].growth, None);
        assert_eq!(growth.points[1].growth, None);
        assert_eq!(growth.most_recent_growth(), None);
    }

    #[test]
    fn test_growth_single_period_has_no_points() {
        let growth = year_over_year_growth("AAPL", TOTAL_REVENUE, &[period(2023, 100.0)]);
        assert!(growth.points.is_empty());
        assert_eq!(growth.most_recent_growth(), None);
    }

    struct FixtureStatements;

    #[async_trait]
    impl StatementProvider for FixtureStatements {
        async fn get(
            &self,
            ticker: &str,
            line_item: &str,
        ) -> Result<Vec<StatementPeriod>, AnalysisError> {
            match ticker {
                "AAPL" => Ok(vec![period(2023, 200.0), period(2022, 100.0)]),
                "NOREV" => Err(AnalysisError::LineItemNotFound(format!(
                    "{} for {}",
                    line_item, ticker
                ))),
                _ => Err(AnalysisError::Fetch(format!("unknown ticker {}", ticker))),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_growth_continues_past_failures() {
        let tickers = vec![
            "AAPL".to_string(),
            "NOREV".to_string(),
            "GONE".to_string(),
        ];
        let results = fetch_growth(&FixtureStatements, &tickers, TOTAL_REVENUE).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "AAPL");
        let growth = results[0].1.as_ref().unwrap();
        assert_relative_eq!(growth.most_recent_growth().unwrap(), 1.0);

        assert!(matches!(
            results[1].1,
            Err(AnalysisError::LineItemNotFound(_))
        ));
        assert!(matches!(results[2].1, Err(AnalysisError::Fetch(_))));
    }
}
