pub mod components;
pub mod completion;
pub mod error;
pub mod homogeneity;
pub mod model;
pub mod outputs;
pub mod reshape;
pub mod series;
pub mod storage;
pub mod summary;

pub use completion::{complete_series, Completion, Priorize, StationRegression};
pub use error::{PipelineError, Result};
pub use homogeneity::{parse_tests, run_tests, HomogeneityOptions, HomogeneityResult, TestKind};
pub use model::{DatasetKind, TabularDataset, TaskResult};
pub use series::{HydrologicYear, StationSeries, DATE_COLUMN};
pub use storage::LocalStorage;
