//! SMS records and the text-mode listing parser.

use crate::error::{AtError, Result};

/// Which stored messages a listing should return.
///
/// Messages listed as unread are reclassified by the device and will not
/// appear under [`SmsGroup::Unread`] again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsGroup {
    Unread,
    Read,
    All,
}

impl SmsGroup {
    /// The `AT+CMGL` storage-class argument.
    pub fn as_str(self) -> &'static str {
        match self {
            SmsGroup::Unread => "REC UNREAD",
            SmsGroup::Read => "REC READ",
            SmsGroup::All => "ALL",
        }
    }
}

/// Delivery class for an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryClass {
    /// Stored on the SIM as usual.
    Normal,
    /// Class 0 "flash" message shown immediately on the recipient's screen.
    Flash,
}

impl DeliveryClass {
    /// The `<dcs>` argument of `AT+CSMP`.
    pub(crate) fn dcs(self) -> u8 {
        match self {
            DeliveryClass::Normal => 0,
            DeliveryClass::Flash => 16,
        }
    }
}

/// One received text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsRecord {
    pub sender: String,
    pub date: String,
    pub time: String,
    pub body: String,
}

/// Parses the tokenized lines of an `AT+CMGL` response.
///
/// A listing holds `2 + 2·N` non-empty lines for `N` messages: the command
/// echo first, the terminal status line last, and in between a `+CMGL`
/// header at each odd offset with the body on the line directly below it.
pub fn parse_sms_listing(lines: &[String]) -> Result<Vec<SmsRecord>> {
    if lines.len() < 2 || lines.len() % 2 != 0 {
        return Err(AtError::Parse(format!(
            "SMS listing has {} lines, expected 2 + 2*N",
            lines.len()
        )));
    }

    let mut records = Vec::new();
    let mut i = 1;
    while i + 1 < lines.len() {
        let header = &lines[i];
        let body = &lines[i + 1];

        let fields: Vec<&str> = header.split(',').collect();
        if fields.len() < 6 {
            return Err(AtError::parse(header.as_str()));
        }
        let sender = fields[2].replace('"', "");
        let date = fields[4].replace('"', "");
        // The time field carries the timezone suffix and a stray quote:
        // `10:57:32+08"`.
        let time = fields[5]
            .split('+')
            .next()
            .unwrap_or_default()
            .replace('"', "");

        records.push(SmsRecord {
            sender,
            date,
            time,
            body: body.clone(),
        });
        i += 2;
    }
    Ok(records)
}
