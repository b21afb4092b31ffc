use std::fmt;

use serde::{Deserialize, Serialize};

/// Variables a matrix spreadsheet can carry. A precipitation file holds one
/// block of `P1..P31` day columns; a temperature file holds a max and a min
/// block (`TMAX1..TMAX31`, `TMIN1..TMIN31`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixVariable {
    Precipitation,
    TemperatureMax,
    TemperatureMin,
}

impl MatrixVariable {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatrixVariable::Precipitation => "precipitation",
            MatrixVariable::TemperatureMax => "temperature_max",
            MatrixVariable::TemperatureMin => "temperature_min",
        }
    }

    /// Header prefix of the 31 day columns for this variable.
    pub fn day_column_prefix(&self) -> &'static str {
        match self {
            MatrixVariable::Precipitation => "P",
            MatrixVariable::TemperatureMax => "TMAX",
            MatrixVariable::TemperatureMin => "TMIN",
        }
    }

    /// Whether the -3/-4 "no precipitation" sentinel codes apply.
    pub fn maps_no_data_sentinels(&self) -> bool {
        matches!(self, MatrixVariable::Precipitation)
    }
}

impl fmt::Display for MatrixVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (station, year, month) row of a matrix file, with up to 31 day values
/// already converted to physical units. Slot `values[d - 1]` holds day `d`;
/// days the source left blank are `None`.
#[derive(Debug, Clone)]
pub struct MonthRecord {
    pub station: String,
    pub year: i32,
    pub month: u32,
    pub values: [Option<f64>; 31],
}

/// All records of one variable from a matrix file.
#[derive(Debug, Clone)]
pub struct VariableBlock {
    pub variable: MatrixVariable,
    pub records: Vec<MonthRecord>,
}

/// Parsed matrix file: station names in order of first appearance plus one
/// block per variable found in the file.
#[derive(Debug, Clone)]
pub struct ParsedMatrix {
    pub stations: Vec<String>,
    pub blocks: Vec<VariableBlock>,
}
