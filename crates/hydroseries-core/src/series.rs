use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::error::{PipelineError, Result};

pub const DATE_COLUMN: &str = "DATE";

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub(crate) fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}

/// Every calendar day from `start` to `end` inclusive.
pub fn daily_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    dates
}

/// The October 1 – September 30 accounting window used for all aggregation,
/// labelled by the calendar year it starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HydrologicYear(pub i32);

impl HydrologicYear {
    pub fn label(&self) -> String {
        format!("{}/{}", self.0, self.0 + 1)
    }

    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0, 10, 1).expect("October 1 is a valid date")
    }

    pub fn end(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 + 1, 9, 30).expect("September 30 is a valid date")
    }
}

impl fmt::Display for HydrologicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Daily observations for a set of stations: a `DATE` column holding a
/// contiguous daily index plus one nullable f64 column per station. Built
/// once by the reshaper (or read from a series file) and read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct StationSeries {
    df: DataFrame,
}

impl StationSeries {
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self> {
        let days: Vec<i32> = dates.iter().map(|date| date_to_days(*date)).collect();
        let date_series = Series::new(DATE_COLUMN.into(), days).cast(&DataType::Date)?;

        let mut cols: Vec<Column> = Vec::with_capacity(columns.len() + 1);
        cols.push(date_series.into());
        for (name, values) in columns {
            if name == DATE_COLUMN {
                return Err(PipelineError::Validation(format!(
                    "station name '{DATE_COLUMN}' collides with the date column"
                )));
            }
            if values.len() != dates.len() {
                return Err(PipelineError::Validation(format!(
                    "station '{name}' has {} values for {} dates",
                    values.len(),
                    dates.len()
                )));
            }
            cols.push(Series::new(name.as_str().into(), values).into());
        }

        Ok(Self {
            df: DataFrame::new(cols)?,
        })
    }

    pub fn read_csv(path: &Path, delimiter: u8) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, delimiter)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .from_reader(reader);
        let mut records = csv_reader.records();

        let header = records
            .next()
            .ok_or_else(|| PipelineError::Validation("series file is empty".to_string()))?
            .map_err(PipelineError::from)?;
        let first = header.get(0).unwrap_or("").trim();
        if first != DATE_COLUMN {
            return Err(PipelineError::Validation(format!(
                "series file must start with a '{DATE_COLUMN}' column, found '{first}'"
            )));
        }

        let names: Vec<String> = header
            .iter()
            .skip(1)
            .map(|name| name.trim().to_string())
            .collect();
        let mut dates: Vec<NaiveDate> = Vec::new();
        let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];

        for (row_idx, record) in records.enumerate() {
            let record = record.map_err(PipelineError::from)?;
            let line_index = row_idx + 2;
            let raw_date = record.get(0).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|err| {
                PipelineError::Validation(format!(
                    "row {line_index}: invalid date '{raw_date}': {err}"
                ))
            })?;
            dates.push(date);

            for (col_idx, column) in columns.iter_mut().enumerate() {
                let raw = record.get(col_idx + 1).unwrap_or("").trim();
                if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
                    column.push(None);
                } else {
                    let value = raw.parse::<f64>().map_err(|err| {
                        PipelineError::Validation(format!(
                            "row {line_index}: invalid value '{raw}' for station '{}': {err}",
                            names[col_idx]
                        ))
                    })?;
                    column.push(Some(value));
                }
            }
        }

        Self::from_columns(dates, names.into_iter().zip(columns).collect())
    }

    pub fn data_frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn station_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .filter(|name| name.as_str() != DATE_COLUMN)
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_station(&self, name: &str) -> bool {
        name != DATE_COLUMN && self.df.column(name).is_ok()
    }

    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        let col = self.df.column(DATE_COLUMN)?.date()?;
        let mut out = Vec::with_capacity(col.len());
        for idx in 0..col.len() {
            let days = col.get(idx).ok_or_else(|| {
                PipelineError::Processing("date column contained a null".to_string())
            })?;
            let date = days_to_date(days).ok_or_else(|| {
                PipelineError::Processing(format!("date column value {days} is out of range"))
            })?;
            out.push(date);
        }
        Ok(out)
    }

    pub fn values(&self, station: &str) -> Result<Vec<Option<f64>>> {
        let col = self.df.column(station).map_err(|_| {
            PipelineError::Validation(format!(
                "station '{station}' is not a column of the series"
            ))
        })?;
        let ca = col.f64()?;
        Ok((0..ca.len()).map(|idx| ca.get(idx)).collect())
    }

    /// Rows with `start <= DATE <= end`. The date index is ordered, so the
    /// restriction is a slice.
    pub fn restrict(&self, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PipelineError::InvalidParameter(format!(
                "start_date {start} is after end_date {end}"
            )));
        }
        let dates = self.dates()?;
        let offset = dates.partition_point(|date| *date < start);
        let upto = dates.partition_point(|date| *date <= end);
        if offset >= upto {
            return Err(PipelineError::Validation(format!(
                "series has no rows between {start} and {end}"
            )));
        }
        Ok(Self {
            df: self.df.slice(offset as i64, upto - offset),
        })
    }
}
