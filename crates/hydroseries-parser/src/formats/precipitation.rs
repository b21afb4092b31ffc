use crate::errors::ParserError;
use crate::model::{MatrixVariable, MonthRecord, ParsedMatrix, VariableBlock};
use crate::registry::MatrixParser;

use super::common::{locate_base_columns, parse_day_value, parse_month, parse_year, DayColumns};

pub struct PrecipitationMatrixParser;

impl Default for PrecipitationMatrixParser {
    fn default() -> Self {
        Self
    }
}

impl PrecipitationMatrixParser {
    const NAME: &'static str = "PRECIPITATION_MATRIX";
}

impl MatrixParser for PrecipitationMatrixParser {
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
        let variable = MatrixVariable::Precipitation;
        let day_columns = DayColumns::resolve(Self::NAME, &header, variable.day_column_prefix())?;

        let mut stations: Vec<String> = Vec::new();
        let mut month_records: Vec<MonthRecord> = Vec::new();

        for (row_idx, record) in records.enumerate() {
            let record = record.map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;
            let line_index = row_idx + 2; // header occupies line 1

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

            // Rows whose year or month cannot be read are skipped, not fatal.
            let Some(year) = parse_year(record.get(base.year).unwrap_or("")) else {
                continue;
            };
            let Some(month) = parse_month(record.get(base.month).unwrap_or("")) else {
                continue;
            };

            let mut values = [None; 31];
            for day in 1..=31usize {
                let idx = day_columns.index(day);
                let raw = record.get(idx).unwrap_or("");
                let column = header.get(idx).unwrap_or("");
                values[day - 1] = parse_day_value(
                    Self::NAME,
                    raw,
                    variable.maps_no_data_sentinels(),
                    line_index,
                    column,
                )?;
            }

            month_records.push(MonthRecord {
                station: station.to_string(),
                year,
                month,
                values,
            });
        }

        if month_records.is_empty() {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        Ok(ParsedMatrix {
            stations,
            blocks: vec![VariableBlock {
                variable,
                records: month_records,
            }],
        })
    }
}
