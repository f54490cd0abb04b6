use crate::status::Status;

/// Error definition for the library.
///
/// Protocol-level outcomes travel as [`Status`] values; `AtError` covers the
/// cases where an operation cannot hand back data at all: the transport
/// failed, a precondition step was rejected mid-sequence, or a payload line
/// did not parse.
#[allow(missing_docs)]
#[derive(thiserror::Error, Debug)]
pub enum AtError {
    #[error("serial transport failure")]
    Io(#[from] std::io::Error),
    #[error("failed to open serial port")]
    Serial(#[from] serialport::Error),
    #[error("command failed with status {0}")]
    Command(Status),
    #[error("malformed response line: {0}")]
    Parse(String),
    #[error("operation `{0}` is not supported by this device profile")]
    Unsupported(&'static str),
}

impl AtError {
    pub(crate) fn parse(line: impl Into<String>) -> Self {
        AtError::Parse(line.into())
    }
}

pub type Result<T> = std::result::Result<T, AtError>;
