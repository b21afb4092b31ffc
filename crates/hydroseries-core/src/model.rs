use std::path::Path;

use serde::Serialize;

/// What a produced file contains, mirroring the dataset types the
/// orchestrator routes between tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    TimeSeries,
    TimeSeriesMax,
    TimeSeriesMin,
    CompletedSeries,
    RegressionDiagnostics,
    HomogeneityReport,
    StatisticalSummary,
}

/// One delimited output file handed downstream.
#[derive(Debug, Clone, Serialize)]
pub struct TabularDataset {
    pub kind: DatasetKind,
    pub resource: String,
    pub delimiter: String,
    pub file_format: String,
}

impl TabularDataset {
    pub fn csv(kind: DatasetKind, resource: &Path, delimiter: u8) -> Self {
        Self {
            kind,
            resource: resource.display().to_string(),
            delimiter: (delimiter as char).to_string(),
            file_format: ".csv".to_string(),
        }
    }
}

/// Result of one component invocation: the files it wrote plus the typed
/// dataset messages describing them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskResult {
    pub files: Vec<String>,
    pub datasets: Vec<TabularDataset>,
}

impl TaskResult {
    pub fn push(&mut self, dataset: TabularDataset) {
        self.files.push(dataset.resource.clone());
        self.datasets.push(dataset);
    }
}
