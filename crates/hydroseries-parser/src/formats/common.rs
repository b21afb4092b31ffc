use csv::StringRecord;

use crate::errors::ParserError;

pub(crate) const STATION_COLUMN: &str = "NOMBRE";
pub(crate) const YEAR_COLUMN: &str = "AÑO";
// Some exported spreadsheets arrive with the year header mangled by a
// charset round-trip; it is accepted as an alias of the real header.
pub(crate) const YEAR_COLUMN_MOJIBAKE: &str = "AﾑO";
pub(crate) const MONTH_COLUMN: &str = "MES";

/// Raw recorded values are stored as tenths of the physical unit.
const SCALE_DIVISOR: f64 = 10.0;

/// Precipitation sentinel codes meaning "no precipitation".
const NO_DATA_SENTINELS: [f64; 2] = [-3.0, -4.0];

#[derive(Debug, Clone, Copy)]
pub(crate) struct BaseColumns {
    pub station: usize,
    pub year: usize,
    pub month: usize,
}

pub(crate) fn locate_base_columns(
    parser: &'static str,
    header: &StringRecord,
) -> Result<BaseColumns, ParserError> {
    let station = find_column(header, &[STATION_COLUMN]);
    let year = find_column(header, &[YEAR_COLUMN, YEAR_COLUMN_MOJIBAKE]);
    let month = find_column(header, &[MONTH_COLUMN]);

    match (station, year, month) {
        (Some(station), Some(year), Some(month)) => Ok(BaseColumns {
            station,
            year,
            month,
        }),
        _ => Err(ParserError::FormatMismatch {
            parser,
            reason: format!(
                "missing one of the {STATION_COLUMN}/{YEAR_COLUMN}/{MONTH_COLUMN} header columns"
            ),
        }),
    }
}

fn find_column(header: &StringRecord, names: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|field| names.iter().any(|name| field.trim() == *name))
}

/// Day-of-month to header-index lookup table, resolved once per file so data
/// rows never search the header again.
#[derive(Debug, Clone)]
pub(crate) struct DayColumns {
    indices: [usize; 31],
}

impl DayColumns {
    pub fn resolve(
        parser: &'static str,
        header: &StringRecord,
        prefix: &str,
    ) -> Result<Self, ParserError> {
        let mut indices = [0usize; 31];
        for day in 1..=31usize {
            let name = format!("{prefix}{day}");
            let position = header.iter().position(|field| field.trim() == name);
            match position {
                Some(idx) => indices[day - 1] = idx,
                None => {
                    return Err(ParserError::FormatMismatch {
                        parser,
                        reason: format!("missing day column '{name}'"),
                    });
                }
            }
        }
        Ok(Self { indices })
    }

    /// Header index of day `day` (1-based).
    pub fn index(&self, day: usize) -> usize {
        self.indices[day - 1]
    }
}

/// Years may be exported as plain integers or as Excel floats ("1974.0").
/// Unparseable cells yield `None` so the caller can skip the row.
pub(crate) fn parse_year(value: &str) -> Option<i32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(year) = trimmed.parse::<i32>() {
        return Some(year);
    }
    trimmed.parse::<f64>().ok().map(|year| year as i32)
}

pub(crate) fn parse_month(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let month = trimmed
        .parse::<u32>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|month| month as u32))?;
    (1..=12).contains(&month).then_some(month)
}

/// Parse one day cell into physical units: blank/nan cells are missing
/// observations, sentinel codes collapse to zero before scaling, everything
/// else divides by the storage scale.
pub(crate) fn parse_day_value(
    parser: &'static str,
    value: &str,
    map_sentinels: bool,
    line_index: usize,
    column: &str,
) -> Result<Option<f64>, ParserError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }

    let parsed = trimmed
        .parse::<f64>()
        .map_err(|err| ParserError::DataRow {
            parser,
            line_index,
            message: format!("failed to parse column '{column}' as float: {err}"),
        })?;

    if map_sentinels && NO_DATA_SENTINELS.contains(&parsed) {
        return Ok(Some(0.0));
    }

    Ok(Some(parsed / SCALE_DIVISOR))
}
