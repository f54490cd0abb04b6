//! Signal-quality and cell measurements.

use crate::error::{AtError, Result};

/// `+CSQ` sentinel for "not known or not detectable".
pub const UNKNOWN_CSQ: u8 = 99;

/// `+CESQ` sentinel for "not known or not detectable".
pub const UNKNOWN_CESQ: i32 = 255;

/// GSM signal quality as reported by `AT+CSQ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalQuality {
    /// Received signal strength indication, 0–31, 99 = unknown.
    pub rssi: u8,
    /// Bit error rate class, 0–7, 99 = unknown.
    pub ber: u8,
}

impl SignalQuality {
    /// Maps RSSI to a percentage. The 99 sentinel maps to 0, never to a
    /// scaled ratio.
    pub fn quality_percent(&self) -> f32 {
        if self.rssi == UNKNOWN_CSQ {
            return 0.0;
        }
        f32::from(self.rssi) / 31.0 * 100.0
    }
}

/// LTE signal quality, raw 3GPP-coded RSRP/RSRQ values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LteSignal {
    pub rsrp: i32,
    pub rsrq: i32,
}

impl LteSignal {
    /// RSRP in dBm. The 255 sentinel maps to the scale floor.
    pub fn rsrp_dbm(&self) -> i32 {
        if self.rsrp == UNKNOWN_CESQ {
            return -140;
        }
        self.rsrp - 140
    }

    /// RSRQ in dB. The 255 sentinel maps to the scale floor.
    pub fn rsrq_db(&self) -> f32 {
        if self.rsrq == UNKNOWN_CESQ {
            return -20.0;
        }
        self.rsrq as f32 * 0.5 - 19.5
    }

    /// Signal bars out of five, from the RSRP level.
    pub fn bars(&self) -> u8 {
        match self.rsrp_dbm() {
            v if v >= -80 => 5,
            v if v >= -90 => 4,
            v if v >= -100 => 3,
            v if v >= -110 => 2,
            _ => 1,
        }
    }

    /// RSRQ quality tier.
    pub fn tier(&self) -> &'static str {
        match self.rsrq_db() {
            v if v >= -10.0 => "Excellent",
            v if v >= -15.0 => "Good",
            v if v >= -20.0 => "Fair",
            _ => "Poor",
        }
    }
}

/// One cell-environment record, parsed positionally from a single line.
///
/// The field count and order are a device-profile contract, not universal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CellInfo {
    pub mcc: i64,
    pub mnc: i64,
    pub imsi: i64,
    pub roaming_status: i64,
    pub band: i64,
    pub bandwidth_index: i64,
    pub earfcn: i64,
    pub cell_id: i64,
    pub rsrp: i64,
    pub rsrq: i64,
    pub tac: i64,
    pub signal_level: i64,
    pub pcid: i64,
}

impl CellInfo {
    /// Builds a record from exactly 13 positional integer fields.
    pub fn from_fields(fields: &[i64]) -> Result<Self> {
        let &[mcc, mnc, imsi, roaming_status, band, bandwidth_index, earfcn, cell_id, rsrp, rsrq, tac, signal_level, pcid] =
            fields
        else {
            return Err(AtError::Parse(format!(
                "expected 13 cell info fields, got {}",
                fields.len()
            )));
        };
        Ok(CellInfo {
            mcc,
            mnc,
            imsi,
            roaming_status,
            band,
            bandwidth_index,
            earfcn,
            cell_id,
            rsrp,
            rsrq,
            tac,
            signal_level,
            pcid,
        })
    }
}

/// Parses a `+CSQ: <rssi>,<ber>` line.
pub fn parse_csq(line: &str) -> Result<SignalQuality> {
    let payload = payload_after_colon(line)?;
    let mut fields = payload.split(',').map(str::trim);
    let rssi = next_int(&mut fields, line)?;
    let ber = next_int(&mut fields, line)?;
    Ok(SignalQuality {
        rssi: rssi as u8,
        ber: ber as u8,
    })
}

pub(crate) fn payload_after_colon(line: &str) -> Result<&str> {
    line.split_once(':')
        .map(|(_, payload)| payload.trim())
        .ok_or_else(|| AtError::parse(line))
}

pub(crate) fn next_int<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    line: &str,
) -> Result<i64> {
    fields
        .next()
        .and_then(|f| f.trim_matches('"').parse().ok())
        .ok_or_else(|| AtError::parse(line))
}
