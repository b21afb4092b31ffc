use crate::errors::{ParserAttempt, ParserError};
use crate::formats::{PrecipitationMatrixParser, TemperatureMatrixParser};
use crate::model::ParsedMatrix;

pub trait MatrixParser {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str, delimiter: u8) -> Result<ParsedMatrix, ParserError>;
}

pub fn parse_matrix(content: &str, delimiter: u8) -> Result<ParsedMatrix, ParserError> {
    let precipitation = PrecipitationMatrixParser;
    let temperature = TemperatureMatrixParser;
    let parsers: [&dyn MatrixParser; 2] = [&precipitation, &temperature];
    parse_with_parsers(content, delimiter, &parsers)
}

pub fn parse_with_parsers(
    content: &str,
    delimiter: u8,
    parsers: &[&dyn MatrixParser],
) -> Result<ParsedMatrix, ParserError> {
    let mut attempts = Vec::new();

    for parser in parsers {
        match parser.parse(content, delimiter) {
            Ok(parsed) => return Ok(parsed),
            Err(ParserError::FormatMismatch { reason, .. }) => {
                attempts.push(ParserAttempt::new(parser.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::NoMatchingParser { attempts })
}
