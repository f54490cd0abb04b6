use std::fmt;

/// Terminal outcome of a single AT command exchange.
///
/// Every exchange resolves to exactly one `Status`, even when the response
/// could not be read or decoded. Protocol rejections are values, not errors:
/// a device answering `ERROR` is a normal outcome the caller branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The device accepted the command (`OK` terminal line).
    Ok,
    /// The device rejected the command (`ERROR` terminal line).
    Error,
    /// No recognized terminator arrived before the deadline.
    Timeout,
    /// Non-UTF-8 bytes arrived, which indicates baud or framing corruption.
    DecodeError,
    /// The device is awaiting free-text input (`> ` prompt), e.g. an SMS body.
    Prompt,
    /// The SIM requires a PUK, not a PIN.
    ErrorSimPuk,
    /// The terminal line did not match any recognized shape.
    Unknown,
}

impl Status {
    /// True for the one unambiguously successful outcome.
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "OK",
            Status::Error => "ERROR",
            Status::Timeout => "TIMEOUT",
            Status::DecodeError => "DECODE_ERROR",
            Status::Prompt => "PROMPT",
            Status::ErrorSimPuk => "ERROR_SIM_PUK",
            Status::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}
