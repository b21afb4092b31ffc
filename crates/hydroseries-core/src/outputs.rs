use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::completion::StationRegression;
use crate::error::Result;
use crate::homogeneity::HomogeneityResult;
use crate::series::{StationSeries, DATE_COLUMN};
use crate::summary::YearSummary;

/// Shortest-roundtrip float form. Keeps "0.0" (never "0") so the files stay
/// byte-compatible with the historical pipeline outputs.
fn fmt_float(value: f64) -> String {
    format!("{value:?}")
}

fn fmt_optional(value: Option<f64>) -> String {
    value.map(fmt_float).unwrap_or_default()
}

// Downstream consumers of the report files parse Python-style booleans.
fn fmt_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

pub fn write_series<W: Write>(writer: W, series: &StationSeries, delimiter: u8) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    let stations = series.station_names();
    let mut header = vec![DATE_COLUMN.to_string()];
    header.extend(stations.iter().cloned());
    csv_writer.write_record(&header)?;

    let dates = series.dates()?;
    let columns: Vec<Vec<Option<f64>>> = stations
        .iter()
        .map(|station| series.values(station))
        .collect::<Result<_>>()?;

    for (row, date) in dates.iter().enumerate() {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        for column in &columns {
            record.push(fmt_optional(column[row]));
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_series_file(path: &Path, series: &StationSeries, delimiter: u8) -> Result<()> {
    let file = File::create(path)?;
    write_series(BufWriter::new(file), series, delimiter)
}

/// Regression diagnostics table: one column per ranked analysis station,
/// index rows R2 / Slope / Intercept / Pair of data.
pub fn write_diagnostics<W: Write>(
    writer: W,
    diagnostics: &[StationRegression],
    delimiter: u8,
) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    let mut header = vec![String::new()];
    header.extend(diagnostics.iter().map(|d| d.station.clone()));
    csv_writer.write_record(&header)?;

    let mut row = vec!["R2".to_string()];
    row.extend(diagnostics.iter().map(|d| fmt_float(d.r2)));
    csv_writer.write_record(&row)?;

    let mut row = vec!["Slope".to_string()];
    row.extend(diagnostics.iter().map(|d| fmt_float(d.slope)));
    csv_writer.write_record(&row)?;

    let mut row = vec!["Intercept".to_string()];
    row.extend(diagnostics.iter().map(|d| fmt_float(d.intercept)));
    csv_writer.write_record(&row)?;

    let mut row = vec!["Pair of data".to_string()];
    row.extend(diagnostics.iter().map(|d| d.pairs.to_string()));
    csv_writer.write_record(&row)?;

    csv_writer.flush()?;
    Ok(())
}

pub fn write_diagnostics_file(
    path: &Path,
    diagnostics: &[StationRegression],
    delimiter: u8,
) -> Result<()> {
    let file = File::create(path)?;
    write_diagnostics(BufWriter::new(file), diagnostics, delimiter)
}

/// Side-by-side homogeneity report: one column per (test, series) label.
pub fn write_homogeneity_report<W: Write>(
    writer: W,
    columns: &[(String, HomogeneityResult)],
    delimiter: u8,
) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    let mut header = vec![String::new()];
    header.extend(columns.iter().map(|(label, _)| label.clone()));
    csv_writer.write_record(&header)?;

    let mut row = vec!["Homogeneity".to_string()];
    row.extend(
        columns
            .iter()
            .map(|(_, r)| fmt_bool(r.homogeneous).to_string()),
    );
    csv_writer.write_record(&row)?;

    let mut row = vec!["Change Point Location".to_string()];
    row.extend(
        columns
            .iter()
            .map(|(_, r)| r.change_point.format("%Y-%m-%d").to_string()),
    );
    csv_writer.write_record(&row)?;

    let mut row = vec!["P-value".to_string()];
    row.extend(columns.iter().map(|(_, r)| fmt_float(r.p_value)));
    csv_writer.write_record(&row)?;

    let mut row = vec!["Maximum test Statistics".to_string()];
    row.extend(columns.iter().map(|(_, r)| fmt_float(r.statistic)));
    csv_writer.write_record(&row)?;

    let mut row = vec!["Average between change point".to_string()];
    row.extend(columns.iter().map(|(_, r)| {
        format!(
            "mean(mu1={:?}, mu2={:?})",
            r.mean_before, r.mean_after
        )
    }));
    csv_writer.write_record(&row)?;

    csv_writer.flush()?;
    Ok(())
}

pub fn write_homogeneity_report_file(
    path: &Path,
    columns: &[(String, HomogeneityResult)],
    delimiter: u8,
) -> Result<()> {
    let file = File::create(path)?;
    write_homogeneity_report(BufWriter::new(file), columns, delimiter)
}

const SUMMARY_COLUMNS: [&str; 10] = [
    "Hidrologic Year",
    "Station",
    "Year Mean",
    "Year Maximum",
    "Year minimum",
    "Year Collected Data",
    "Year Empty Data",
    "Year Collected Data (Percentage)",
    "Year Empty Data (Percentage)",
    "Sum of the Year",
];

pub fn write_summary<W: Write>(writer: W, rows: &[YearSummary], delimiter: u8) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    csv_writer.write_record(SUMMARY_COLUMNS)?;
    for row in rows {
        csv_writer.write_record(&[
            row.year.label(),
            row.station.clone(),
            fmt_optional(row.mean),
            fmt_optional(row.maximum),
            fmt_optional(row.minimum),
            row.collected.to_string(),
            row.empty.to_string(),
            fmt_float(row.collected_pct),
            fmt_float(row.empty_pct),
            fmt_float(row.total),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_summary_file(path: &Path, rows: &[YearSummary], delimiter: u8) -> Result<()> {
    let file = File::create(path)?;
    write_summary(BufWriter::new(file), rows, delimiter)
}
