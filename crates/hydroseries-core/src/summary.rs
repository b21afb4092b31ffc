use chrono::Datelike;

use crate::error::{PipelineError, Result};
use crate::series::{HydrologicYear, StationSeries};

/// Statistics of one station over one hydrologic year. `mean`/`maximum`/
/// `minimum` are absent when the whole window is missing.
#[derive(Debug, Clone)]
pub struct YearSummary {
    pub station: String,
    pub year: HydrologicYear,
    pub mean: Option<f64>,
    pub maximum: Option<f64>,
    pub minimum: Option<f64>,
    pub collected: usize,
    pub empty: usize,
    pub collected_pct: f64,
    pub empty_pct: f64,
    pub total: f64,
}

/// Per-station, per-hydrologic-year statistics. Years run from the first
/// date's calendar year up to but excluding the last date's, so a trailing
/// partial year never produces a row.
pub fn summarize(series: &StationSeries) -> Result<Vec<YearSummary>> {
    let dates = series.dates()?;
    let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
        return Err(PipelineError::Validation(
            "series has no rows to summarize".to_string(),
        ));
    };
    let min_year = first.year();
    let max_year = last.year();

    let mut rows = Vec::new();
    for station in series.station_names() {
        let values = series.values(&station)?;
        for year in min_year..max_year {
            let window = HydrologicYear(year);
            let lo = dates.partition_point(|date| *date < window.start());
            let hi = dates.partition_point(|date| *date <= window.end());
            if lo >= hi {
                continue;
            }

            let slice = &values[lo..hi];
            let observed: Vec<f64> = slice.iter().flatten().copied().collect();
            let row_count = slice.len();
            let empty = row_count - observed.len();
            let empty_pct = empty as f64 / row_count as f64 * 100.0;

            let (mean, maximum, minimum) = if observed.is_empty() {
                (None, None, None)
            } else {
                (
                    Some(observed.iter().sum::<f64>() / observed.len() as f64),
                    Some(observed.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
                    Some(observed.iter().copied().fold(f64::INFINITY, f64::min)),
                )
            };

            rows.push(YearSummary {
                station: station.clone(),
                year: window,
                mean,
                maximum,
                minimum,
                collected: row_count - empty,
                empty,
                collected_pct: 100.0 - empty_pct,
                empty_pct,
                total: observed.iter().sum(),
            });
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::daily_range;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn one_row_per_full_hydrologic_year() {
        let dates = daily_range(date(1970, 10, 1), date(1974, 9, 30));
        let values = vec![Some(1.0); dates.len()];
        let series =
            StationSeries::from_columns(dates, vec![("A".to_string(), values)]).unwrap();

        let rows = summarize(&series).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].year.label(), "1970/1971");
        assert_eq!(rows[3].year.label(), "1973/1974");

        for row in &rows {
            assert_eq!(row.empty, 0);
            assert_eq!(row.collected_pct, 100.0);
            assert_eq!(row.empty_pct, 0.0);
            assert_eq!(row.mean, Some(1.0));
        }
        // 1971/1972 contains February 29, 1972
        assert_eq!(rows[0].collected, 365);
        assert_eq!(rows[1].collected, 366);
        assert_eq!(rows[1].total, 366.0);
    }

    #[test]
    fn missing_days_are_counted_and_percentaged() {
        let dates = daily_range(date(1970, 10, 1), date(1971, 9, 30));
        let mut values = vec![Some(2.0); dates.len()];
        for slot in values.iter_mut().take(73) {
            *slot = None;
        }
        let series =
            StationSeries::from_columns(dates, vec![("A".to_string(), values)]).unwrap();

        let rows = summarize(&series).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.empty, 73);
        assert_eq!(row.collected, 365 - 73);
        assert!((row.empty_pct - 20.0).abs() < 1e-9);
        assert!((row.collected_pct - 80.0).abs() < 1e-9);
        assert_eq!(row.total, (365 - 73) as f64 * 2.0);
    }

    #[test]
    fn all_null_year_has_no_mean_but_zero_total() {
        let dates = daily_range(date(1970, 10, 1), date(1971, 9, 30));
        let values = vec![None; dates.len()];
        let series =
            StationSeries::from_columns(dates, vec![("A".to_string(), values)]).unwrap();

        let rows = summarize(&series).unwrap();
        let row = &rows[0];
        assert_eq!(row.mean, None);
        assert_eq!(row.maximum, None);
        assert_eq!(row.minimum, None);
        assert_eq!(row.total, 0.0);
        assert_eq!(row.empty_pct, 100.0);
    }

    #[test]
    fn trailing_partial_year_is_excluded() {
        // data runs into December 1974: the 1974/1975 window is partial and
        // must not appear
        let dates = daily_range(date(1970, 10, 1), date(1974, 12, 31));
        let values = vec![Some(1.0); dates.len()];
        let series =
            StationSeries::from_columns(dates, vec![("A".to_string(), values)]).unwrap();

        let rows = summarize(&series).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows.last().unwrap().year.label(), "1973/1974");
    }

    #[test]
    fn every_station_gets_its_own_rows() {
        let dates = daily_range(date(1970, 10, 1), date(1972, 9, 30));
        let a = vec![Some(1.0); dates.len()];
        let b = vec![Some(3.0); dates.len()];
        let series = StationSeries::from_columns(
            dates,
            vec![("A".to_string(), a), ("B".to_string(), b)],
        )
        .unwrap();

        let rows = summarize(&series).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows.iter().filter(|row| row.station == "B").count(),
            2
        );
    }
}
