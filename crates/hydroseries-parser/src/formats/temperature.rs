use crate::errors::ParserError;
use crate::model::{MatrixVariable, MonthRecord, ParsedMatrix, VariableBlock};
use crate::registry::MatrixParser;

use super::common::{locate_base_columns, parse_day_value, parse_month, parse_year, DayColumns};

/// Parses temperature matrix files, which carry the daily maximum and the
/// daily minimum side by side in one row per (station, year, month).
pub struct TemperatureMatrixParser;

impl Default for TemperatureMatrixParser {
    fn default() -> Self {
        Self
    }
}

impl TemperatureMatrixParser {
    const NAME: &'static str = "TEMPERATURE_MATRIX";
}

impl MatrixParser for TemperatureMatrixParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str, delimiter: u8) -> Result<ParsedMatrix, ParserError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(content.as_bytes());

        let mut records = reader.records();

        let header = records
            .next()
            .ok_or(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "file is empty".to_string(),
            })?
            .map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;

        let base = locate_base_columns(Self::NAME, &header)?;
        let max_variable = MatrixVariable::TemperatureMax;
        let min_variable = MatrixVariable::TemperatureMin;
        let max_columns =
            DayColumns::resolve(Self::NAME, &header, max_variable.day_column_prefix())?;
        let min_columns =
            DayColumns::resolve(Self::NAME, &header, min_variable.day_column_prefix())?;

        let mut stations: Vec<String> = Vec::new();
        let mut max_records: Vec<MonthRecord> = Vec::new();
        let mut min_records: Vec<MonthRecord> = Vec::new();

        for (row_idx, record) in records.enumerate() {
            let record = record.map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;
            let line_index = row_idx + 2;

            if record.len() != header.len() {
                return Err(ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: format!(
                        "expected {} columns but found {}",
                        header.len(),
                        record.len()
                    ),
                });
            }

            let station = record.get(base.station).unwrap_or("").trim();
            if station.is_empty() {
                continue;
            }
            if !stations.iter().any(|existing| existing == station) {
                stations.push(station.to_string());
            }

            let Some(year) = parse_year(record.get(base.year).unwrap_or("")) else {
                continue;
            };
            let Some(month) = parse_month(record.get(base.month).unwrap_or("")) else {
                continue;
            };

            let mut max_values = [None; 31];
            let mut min_values = [None; 31];
            for day in 1..=31usize {
                let max_idx = max_columns.index(day);
                let min_idx = min_columns.index(day);
                max_values[day - 1] = parse_day_value(
                    Self::NAME,
                    record.get(max_idx).unwrap_or(""),
                    false,
                    line_index,
                    header.get(max_idx).unwrap_or(""),
                )?;
                min_values[day - 1] = parse_day_value(
                    Self::NAME,
                    record.get(min_idx).unwrap_or(""),
                    false,
                    line_index,
                    header.get(min_idx).unwrap_or(""),
                )?;
            }

            max_records.push(MonthRecord {
                station: station.to_string(),
                year,
                month,
                values: max_values,
            });
            min_records.push(MonthRecord {
                station: station.to_string(),
                year,
                month,
                values: min_values,
            });
        }

        if max_records.is_empty() {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        Ok(ParsedMatrix {
            stations,
            blocks: vec![
                VariableBlock {
                    variable: max_variable,
                    records: max_records,
                },
                VariableBlock {
                    variable: min_variable,
                    records: min_records,
                },
            ],
        })
    }
}
