use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use hydroseries_parser::{parse_matrix, MatrixVariable};

use crate::completion::{self, complete_series, Priorize, StationRegression};
use crate::error::{PipelineError, Result};
use crate::homogeneity::{run_tests, HomogeneityOptions, HomogeneityResult, TestKind};
use crate::model::{DatasetKind, TabularDataset, TaskResult};
use crate::outputs;
use crate::reshape::reshape_block;
use crate::series::{daily_range, StationSeries};
use crate::storage::LocalStorage;
use crate::summary::summarize;

pub const PRECIPITATION_SERIES_FILE: &str = "PrecipitationTimeSeries.csv";
pub const MAX_TEMPERATURE_SERIES_FILE: &str = "MaxTempTimeSeries.csv";
pub const MIN_TEMPERATURE_SERIES_FILE: &str = "MinTempTimeSeries.csv";
pub const STATIONS_ANALYSIS_FILE: &str = "StationsAnalysis.csv";
pub const MAX_STATIONS_ANALYSIS_FILE: &str = "StationsAnalysisMax.csv";
pub const MIN_STATIONS_ANALYSIS_FILE: &str = "StationsAnalysisMin.csv";
pub const HOMOGENEITY_TESTS_FILE: &str = "HomogeneityTests.csv";
pub const STATISTICAL_DATA_FILE: &str = "StatisticalData.csv";

/// Configuration surface shared by the two completion components. The typed
/// fields are validated at the boundary, before any file is read.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target_station: String,
    pub analysis_stations: Vec<String>,
    pub priorize: Priorize,
    pub tests: Vec<TestKind>,
    pub homogeneity: HomogeneityOptions,
}

impl CompletionParams {
    fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(PipelineError::InvalidParameter(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.analysis_stations.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "analysis_stations must not be empty".to_string(),
            ));
        }
        if self.tests.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "select at least one homogeneity test".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reshape a matrix spreadsheet into daily series files, auto-detecting the
/// precipitation or temperature layout.
pub fn reshape_matrix_file(
    input: &Path,
    delimiter: u8,
    storage: &LocalStorage,
) -> Result<TaskResult> {
    info!(input = %input.display(), "reshaping matrix file");
    let content = std::fs::read_to_string(input)?;
    let matrix = parse_matrix(&content, delimiter)?;
    storage.create()?;

    let mut result = TaskResult::default();
    for block in &matrix.blocks {
        let series = reshape_block(block, &matrix.stations)?;
        let (file_name, kind) = match block.variable {
            MatrixVariable::Precipitation => (PRECIPITATION_SERIES_FILE, DatasetKind::TimeSeries),
            MatrixVariable::TemperatureMax => {
                (MAX_TEMPERATURE_SERIES_FILE, DatasetKind::TimeSeriesMax)
            }
            MatrixVariable::TemperatureMin => {
                (MIN_TEMPERATURE_SERIES_FILE, DatasetKind::TimeSeriesMin)
            }
        };
        let path = storage.resolve(file_name);
        outputs::write_series_file(&path, &series, delimiter)?;
        info!(file = %path.display(), rows = series.height(), stations = matrix.stations.len(), "series written");
        result.push(TabularDataset::csv(kind, &path, delimiter));
    }
    Ok(result)
}

/// Complete a precipitation series for one target station and test the
/// completed series for homogeneity.
pub fn complete_precipitation(
    input: &Path,
    delimiter: u8,
    params: &CompletionParams,
    storage: &LocalStorage,
) -> Result<TaskResult> {
    params.validate()?;
    info!(input = %input.display(), target = %params.target_station, "completing precipitation series");

    let series = StationSeries::read_csv(input, delimiter)?;
    let filtered = series.restrict(params.start_date, params.end_date)?;

    let mut completion = complete_series(
        &filtered,
        &params.target_station,
        &params.analysis_stations,
        params.priorize,
    )?;
    completion::zero_intercept_artifacts(&mut completion.values, &completion.diagnostics);
    completion::round_values(&mut completion.values, 3);

    let dates = filtered.dates()?;
    let completed = StationSeries::from_columns(
        dates.clone(),
        vec![(params.target_station.clone(), completion.values.clone())],
    )?;

    storage.create()?;
    let mut result = TaskResult::default();

    let analysis_path = storage.resolve(STATIONS_ANALYSIS_FILE);
    outputs::write_diagnostics_file(&analysis_path, &completion.diagnostics, delimiter)?;
    result.push(TabularDataset::csv(
        DatasetKind::RegressionDiagnostics,
        &analysis_path,
        delimiter,
    ));

    let completed_path =
        storage.resolve(&format!("{}_completed.csv", params.target_station));
    outputs::write_series_file(&completed_path, &completed, delimiter)?;
    result.push(TabularDataset::csv(
        DatasetKind::CompletedSeries,
        &completed_path,
        delimiter,
    ));

    let test_results = run_tests(
        &dates,
        &completion.values,
        &params.tests,
        &params.homogeneity,
    )?;
    let columns = label_results(test_results, "");
    let tests_path = storage.resolve(HOMOGENEITY_TESTS_FILE);
    outputs::write_homogeneity_report_file(&tests_path, &columns, delimiter)?;
    result.push(TabularDataset::csv(
        DatasetKind::HomogeneityReport,
        &tests_path,
        delimiter,
    ));

    info!(unresolved = completion.unresolved, "precipitation completion finished");
    Ok(result)
}

/// Complete the paired max/min temperature series for one target station,
/// reconcile inverted extremes and test both completed columns.
pub fn complete_temperature(
    max_input: &Path,
    min_input: &Path,
    delimiter: u8,
    params: &CompletionParams,
    storage: &LocalStorage,
) -> Result<TaskResult> {
    params.validate()?;
    info!(
        max_input = %max_input.display(),
        min_input = %min_input.display(),
        target = %params.target_station,
        "completing temperature series"
    );

    let max_series = StationSeries::read_csv(max_input, delimiter)?;
    let min_series = StationSeries::read_csv(min_input, delimiter)?;
    let full_dates = daily_range(params.start_date, params.end_date);

    let (max_diagnostics, mut max_values) =
        complete_extreme(&max_series, params, &full_dates)?;
    let (min_diagnostics, mut min_values) =
        complete_extreme(&min_series, params, &full_dates)?;

    completion::reconcile_extremes(&mut max_values, &mut min_values);

    let max_name = format!("{}(MAX)", params.target_station);
    let min_name = format!("{}(MIN)", params.target_station);
    let completed = StationSeries::from_columns(
        full_dates.clone(),
        vec![
            (max_name, max_values.clone()),
            (min_name, min_values.clone()),
        ],
    )?;

    storage.create()?;
    let mut result = TaskResult::default();

    for (file_name, diagnostics) in [
        (MAX_STATIONS_ANALYSIS_FILE, &max_diagnostics),
        (MIN_STATIONS_ANALYSIS_FILE, &min_diagnostics),
    ] {
        let path = storage.resolve(file_name);
        outputs::write_diagnostics_file(&path, diagnostics, delimiter)?;
        result.push(TabularDataset::csv(
            DatasetKind::RegressionDiagnostics,
            &path,
            delimiter,
        ));
    }

    let completed_path =
        storage.resolve(&format!("{}_completed.csv", params.target_station));
    outputs::write_series_file(&completed_path, &completed, delimiter)?;
    result.push(TabularDataset::csv(
        DatasetKind::CompletedSeries,
        &completed_path,
        delimiter,
    ));

    let mut columns = Vec::new();
    for (suffix, values) in [("(MAX)", &max_values), ("(MIN)", &min_values)] {
        let test_results = run_tests(&full_dates, values, &params.tests, &params.homogeneity)?;
        columns.extend(label_results(test_results, suffix));
    }
    let tests_path = storage.resolve(HOMOGENEITY_TESTS_FILE);
    outputs::write_homogeneity_report_file(&tests_path, &columns, delimiter)?;
    result.push(TabularDataset::csv(
        DatasetKind::HomogeneityReport,
        &tests_path,
        delimiter,
    ));

    Ok(result)
}

/// Hydrologic-year statistics for every station of a series file.
pub fn extract_statistics(
    input: &Path,
    delimiter: u8,
    storage: &LocalStorage,
) -> Result<TaskResult> {
    info!(input = %input.display(), "extracting hydrologic-year statistics");
    let series = StationSeries::read_csv(input, delimiter)?;
    let rows = summarize(&series)?;

    storage.create()?;
    let path = storage.resolve(STATISTICAL_DATA_FILE);
    outputs::write_summary_file(&path, &rows, delimiter)?;
    info!(file = %path.display(), rows = rows.len(), "statistics written");

    let mut result = TaskResult::default();
    result.push(TabularDataset::csv(
        DatasetKind::StatisticalSummary,
        &path,
        delimiter,
    ));
    Ok(result)
}

/// Complete one temperature extreme and project it onto the requested daily
/// range; dates the input had no row for stay null.
fn complete_extreme(
    series: &StationSeries,
    params: &CompletionParams,
    full_dates: &[NaiveDate],
) -> Result<(Vec<StationRegression>, Vec<Option<f64>>)> {
    let filtered = series.restrict(params.start_date, params.end_date)?;
    let completion = complete_series(
        &filtered,
        &params.target_station,
        &params.analysis_stations,
        params.priorize,
    )?;

    let dates = filtered.dates()?;
    let by_date: HashMap<NaiveDate, Option<f64>> = dates
        .into_iter()
        .zip(completion.values.iter().copied())
        .collect();
    let projected = full_dates
        .iter()
        .map(|date| by_date.get(date).copied().flatten())
        .collect();

    Ok((completion.diagnostics, projected))
}

fn label_results(
    results: Vec<HomogeneityResult>,
    suffix: &str,
) -> Vec<(String, HomogeneityResult)> {
    results
        .into_iter()
        .map(|result| (format!("{}{}", result.test.report_label(), suffix), result))
        .collect()
}
