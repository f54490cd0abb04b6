//! Operator scan (`AT+COPS=?`) parsing.

use crate::error::{AtError, Result};
use crate::signal::payload_after_colon;

/// One network operator reported by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    /// Availability: 0 unknown, 1 available, 2 current, 3 forbidden.
    pub stat: u8,
    pub long: String,
    pub short: String,
    pub numeric: u32,
    /// Access technology; only present on some firmware.
    pub access_technologies: Option<u8>,
}

/// Parses the parenthesized tuple list of a `+COPS: (...),(...)` line.
///
/// Firmware appends placeholder tuples listing the supported `<mode>` and
/// `<format>` values after the operators proper. Those carry no quoted name
/// fields, which is how they are told apart; matching known placeholder
/// strings verbatim would be tighter to the observed firmware but brittle
/// across it.
pub fn parse_operator_list(line: &str) -> Result<Vec<Operator>> {
    let payload = payload_after_colon(line)?;
    let mut operators = Vec::new();
    for segment in payload.split("),") {
        let segment = segment
            .trim()
            .trim_start_matches(',')
            .trim_matches(|c| c == '(' || c == ')')
            .trim();
        if segment.is_empty() || !is_operator_tuple(segment) {
            continue;
        }
        operators.push(parse_operator(segment)?);
    }
    Ok(operators)
}

/// An operator tuple has at least four fields and quoted names; the trailing
/// mode/format placeholders have neither.
fn is_operator_tuple(segment: &str) -> bool {
    segment.matches(',').count() >= 3 && segment.contains('"')
}

fn parse_operator(segment: &str) -> Result<Operator> {
    let unquote = |f: &str| f.trim().trim_matches('"').to_string();
    let fields: Vec<&str> = segment.split(',').collect();
    if fields.len() < 4 {
        return Err(AtError::parse(segment));
    }
    let int = |f: &str| {
        f.trim()
            .trim_matches('"')
            .parse::<i64>()
            .map_err(|_| AtError::parse(segment))
    };

    Ok(Operator {
        stat: int(fields[0])? as u8,
        long: unquote(fields[1]),
        short: unquote(fields[2]),
        numeric: int(fields[3])? as u32,
        access_technologies: fields
            .get(4)
            .map(|f| int(f).map(|v| v as u8))
            .transpose()?,
    })
}
