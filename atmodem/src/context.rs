//! PDP context and address listings.

use crate::error::{AtError, Result};
use crate::signal::payload_after_colon;

/// One PDP data-session profile, as listed by `AT+CGDCONT?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub id: u8,
    /// PDP type, e.g. `IP` or `IPV4V6`.
    pub context_type: String,
    pub apn: String,
    /// Configured address or raw remainder of the line.
    pub value: String,
}

/// One PDP address, as listed by `AT+CGPADDR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub id: u8,
    /// Empty when the context has no address assigned.
    pub ip: String,
}

/// Parses every `+CGDCONT:` line of a tokenized listing response.
///
/// Firmware variably omits optional trailing fields; missing ones default to
/// the empty string rather than erroring.
pub fn parse_contexts(lines: &[String]) -> Result<Vec<Context>> {
    lines
        .iter()
        .filter(|line| line.starts_with("+CGDCONT:"))
        .map(|line| parse_context_line(line))
        .collect()
}

fn parse_context_line(line: &str) -> Result<Context> {
    let payload = payload_after_colon(line)?;
    let mut fields = payload.split(',').map(|f| f.trim().trim_matches('"'));
    let id = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| AtError::parse(line))?;
    let mut rest = fields.map(str::to_string);
    Ok(Context {
        id,
        context_type: rest.next().unwrap_or_default(),
        apn: rest.next().unwrap_or_default(),
        value: rest.next().unwrap_or_default(),
    })
}

/// Parses every `+CGPADDR:` line of a tokenized listing response.
pub fn parse_addresses(lines: &[String]) -> Result<Vec<Address>> {
    lines
        .iter()
        .filter(|line| line.starts_with("+CGPADDR:"))
        .map(|line| parse_address_line(line))
        .collect()
}

fn parse_address_line(line: &str) -> Result<Address> {
    let payload = payload_after_colon(line)?;
    let mut fields = payload.split(',').map(|f| f.trim().trim_matches('"'));
    let id = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| AtError::parse(line))?;
    Ok(Address {
        id,
        ip: fields.next().unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn context_listing_filters_to_prefixed_lines() {
        let listing = lines(&[
            "AT+CGDCONT?",
            "+CGDCONT: 1,\"IP\",\"internet\",\"0.0.0.0\"",
            "+CGDCONT: 2,\"IPV4V6\",\"ims\"",
            "OK",
        ]);
        let contexts = parse_contexts(&listing).unwrap();
        assert_eq!(contexts.len(), 2);
        assert_eq!(
            contexts[0],
            Context {
                id: 1,
                context_type: "IP".into(),
                apn: "internet".into(),
                value: "0.0.0.0".into(),
            }
        );
        // Omitted trailing fields default to empty rather than erroring.
        assert_eq!(contexts[1].apn, "ims");
        assert_eq!(contexts[1].value, "");
    }

    #[test]
    fn context_with_garbage_id_is_an_error() {
        let listing = lines(&["+CGDCONT: x,\"IP\""]);
        assert!(parse_contexts(&listing).is_err());
    }

    #[test]
    fn address_listing() {
        let listing = lines(&[
            "AT+CGPADDR",
            "+CGPADDR: 1,\"10.11.12.13\"",
            "+CGPADDR: 2",
            "OK",
        ]);
        let addresses = parse_addresses(&listing).unwrap();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].ip, "10.11.12.13");
        assert_eq!(addresses[1].ip, "");
    }
}
