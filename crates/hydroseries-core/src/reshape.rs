use std::collections::HashMap;

use chrono::NaiveDate;
use hydroseries_parser::VariableBlock;

use crate::error::{PipelineError, Result};
use crate::series::{daily_range, HydrologicYear, StationSeries};

/// Turn one matrix block into a daily station series. The date span snaps to
/// hydrologic-year boundaries: the series starts on the October 1 preceding
/// the earliest data and ends on the September 30 following the latest data.
pub fn reshape_block(block: &VariableBlock, stations: &[String]) -> Result<StationSeries> {
    let records = &block.records;
    if records.is_empty() {
        return Err(PipelineError::Validation(format!(
            "{} block has no records to reshape",
            block.variable
        )));
    }

    let min_year = records.iter().map(|r| r.year).min().unwrap_or_default();
    let max_year = records.iter().map(|r| r.year).max().unwrap_or_default();
    let earliest_month = records
        .iter()
        .filter(|r| r.year == min_year)
        .map(|r| r.month)
        .min()
        .unwrap_or(1);
    let latest_month = records
        .iter()
        .filter(|r| r.year == max_year)
        .map(|r| r.month)
        .max()
        .unwrap_or(12);

    let start = if earliest_month <= 10 {
        HydrologicYear(min_year - 1).start()
    } else {
        HydrologicYear(min_year).start()
    };
    let end = if latest_month >= 9 {
        HydrologicYear(max_year).end()
    } else {
        HydrologicYear(max_year - 1).end()
    };

    let dates = daily_range(start, end);
    let row_index: HashMap<NaiveDate, usize> = dates
        .iter()
        .enumerate()
        .map(|(row, date)| (*date, row))
        .collect();

    let mut columns: Vec<(String, Vec<Option<f64>>)> = stations
        .iter()
        .map(|station| (station.clone(), vec![None; dates.len()]))
        .collect();
    let station_index: HashMap<&str, usize> = stations
        .iter()
        .enumerate()
        .map(|(idx, station)| (station.as_str(), idx))
        .collect();

    for record in records {
        let Some(&column) = station_index.get(record.station.as_str()) else {
            continue;
        };
        for (day_offset, value) in record.values.iter().enumerate() {
            let Some(value) = value else { continue };
            // day numbers that do not exist in this month (e.g. day 31 in
            // February) are dropped, not an error
            let day = (day_offset + 1) as u32;
            let Some(date) = NaiveDate::from_ymd_opt(record.year, record.month, day) else {
                continue;
            };
            if let Some(&row) = row_index.get(&date) {
                columns[column].1[row] = Some(*value);
            }
        }
    }

    StationSeries::from_columns(dates, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydroseries_parser::{MatrixVariable, MonthRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(station: &str, year: i32, month: u32, days: &[(usize, f64)]) -> MonthRecord {
        let mut values = [None; 31];
        for (day, value) in days {
            values[day - 1] = Some(*value);
        }
        MonthRecord {
            station: station.to_string(),
            year,
            month,
            values,
        }
    }

    fn block(records: Vec<MonthRecord>) -> VariableBlock {
        VariableBlock {
            variable: MatrixVariable::Precipitation,
            records,
        }
    }

    #[test]
    fn spans_whole_hydrologic_years() {
        let block = block(vec![
            record("A", 1974, 10, &[(1, 2.5)]),
            record("A", 1975, 5, &[(15, 1.0)]),
        ]);
        let series = reshape_block(&block, &["A".to_string()]).unwrap();
        let dates = series.dates().unwrap();

        // earliest month October -> start one hydrologic year earlier;
        // latest month May -> the 1975/1976 year is not opened
        assert_eq!(dates.first(), Some(&date(1973, 10, 1)));
        assert_eq!(dates.last(), Some(&date(1975, 9, 30)));
    }

    #[test]
    fn late_start_and_late_end_extend_forward() {
        let block = block(vec![record("A", 1974, 11, &[(1, 1.0)])]);
        let series = reshape_block(&block, &["A".to_string()]).unwrap();
        let dates = series.dates().unwrap();

        // November data: the 1974/1975 hydrologic year starts that October 1
        // and, being past September, closes the following September 30
        assert_eq!(dates.first(), Some(&date(1974, 10, 1)));
        assert_eq!(dates.last(), Some(&date(1975, 9, 30)));
    }

    #[test]
    fn places_values_on_their_dates() {
        let block = block(vec![record("A", 1974, 10, &[(1, 2.5), (3, 0.0)])]);
        let series = reshape_block(&block, &["A".to_string()]).unwrap();
        let dates = series.dates().unwrap();
        let values = series.values("A").unwrap();

        let first = dates.iter().position(|d| *d == date(1974, 10, 1)).unwrap();
        let third = dates.iter().position(|d| *d == date(1974, 10, 3)).unwrap();
        assert_eq!(values[first], Some(2.5));
        assert_eq!(values[third], Some(0.0));
        assert_eq!(values[first + 1], None);
    }

    #[test]
    fn drops_days_invalid_for_the_month() {
        let block = block(vec![record("A", 1975, 2, &[(28, 1.0), (30, 9.9), (31, 9.9)])]);
        let series = reshape_block(&block, &["A".to_string()]).unwrap();
        let values = series.values("A").unwrap();

        assert_eq!(values.iter().flatten().count(), 1);
        let dates = series.dates().unwrap();
        let feb28 = dates.iter().position(|d| *d == date(1975, 2, 28)).unwrap();
        assert_eq!(values[feb28], Some(1.0));
    }

    #[test]
    fn stations_without_records_become_all_null_columns() {
        let block = block(vec![record("A", 1974, 10, &[(1, 1.0)])]);
        let series =
            reshape_block(&block, &["A".to_string(), "B".to_string()]).unwrap();
        assert_eq!(series.station_names(), vec!["A", "B"]);
        assert!(series.values("B").unwrap().iter().all(|v| v.is_none()));
    }

    #[test]
    fn reshape_is_deterministic() {
        let block = block(vec![
            record("A", 1974, 10, &[(1, 2.5), (2, 0.0)]),
            record("B", 1975, 1, &[(10, 4.0)]),
        ]);
        let stations = vec!["A".to_string(), "B".to_string()];
        let first = reshape_block(&block, &stations).unwrap();
        let second = reshape_block(&block, &stations).unwrap();
        assert!(first.data_frame().equals_missing(second.data_frame()));
    }
}
