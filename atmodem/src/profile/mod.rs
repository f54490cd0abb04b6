//! Per-chipset extension point.
//!
//! A profile supplies data (band tables, vendor command strings) and the
//! parsers for responses whose layout differs per device. It never touches
//! the read/write/status machinery; the engine plugs profile output into the
//! generic command sequencing.

mod air780;
mod sim7600;

pub use air780::Air780;
pub use sim7600::Sim7600;

use std::time::Duration;

use crate::error::{AtError, Result};
use crate::signal::{CellInfo, LteSignal};

/// A query command plus the read deadline it needs. Some vendor queries
/// (cell environment, band scan) take far longer than the default.
#[derive(Debug, Clone, Copy)]
pub struct QuerySpec {
    pub command: &'static str,
    pub timeout: Duration,
}

impl QuerySpec {
    pub const fn new(command: &'static str) -> Self {
        QuerySpec {
            command,
            timeout: Duration::from_secs(10),
        }
    }

    pub const fn with_timeout(command: &'static str, timeout: Duration) -> Self {
        QuerySpec { command, timeout }
    }
}

/// A band-select command plus how its completion is detected. Some firmware
/// acknowledges a band change only through an unsolicited marker.
#[derive(Debug, Clone)]
pub struct SelectSpec {
    pub command: String,
    /// Stop substring for the follow-up read; empty when the standard
    /// OK/ERROR framing applies.
    pub stop: &'static str,
    pub timeout: Duration,
}

/// USB composition modes exposed by some LTE modems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbMode {
    /// `usb0` interface, plug-and-play.
    Rndis,
    /// `wwan0` interface, best for ModemManager.
    Qmi,
    /// `ppp0` interface, traditional dial-up style.
    Ppp,
}

/// Bidirectional mapping between a hardware band bitmask and standardized
/// band numbers, split by duplex mode.
///
/// Each entry pairs a single mask bit with the band it stands for.
#[derive(Debug, Clone, Copy)]
pub struct BandPlan {
    pub fdd: &'static [(u128, u16)],
    pub tdd: &'static [(u128, u16)],
}

impl BandPlan {
    /// Translates a band list into `(fdd_mask, tdd_mask)`. Bands absent from
    /// the plan are ignored.
    pub fn masks_for(&self, bands: &[u16]) -> (u128, u128) {
        let sum = |table: &[(u128, u16)]| -> u128 {
            table
                .iter()
                .filter(|(_, band)| bands.contains(band))
                .map(|&(mask, _)| mask)
                .sum()
        };
        (sum(self.fdd), sum(self.tdd))
    }

    /// Translates `(fdd_mask, tdd_mask)` back into a sorted band list.
    pub fn bands_for(&self, fdd_mask: u128, tdd_mask: u128) -> Vec<u16> {
        let mut bands: Vec<u16> = self
            .fdd
            .iter()
            .filter(|(mask, _)| fdd_mask & mask != 0)
            .chain(self.tdd.iter().filter(|(mask, _)| tdd_mask & mask != 0))
            .map(|&(_, band)| band)
            .collect();
        bands.sort_unstable();
        bands
    }
}

/// Per-chipset capability set consumed by the engine.
///
/// Defaults describe a plain GSM modem: `+CSQ` signal via the engine's
/// generic path and no LTE band or cell-environment support.
pub trait DeviceProfile {
    fn name(&self) -> &'static str;

    /// Band table for bitmask translation, when the device exposes one.
    fn band_plan(&self) -> Option<&BandPlan> {
        None
    }

    /// Query reporting the allowed-band configuration.
    fn band_query(&self) -> Option<QuerySpec> {
        None
    }

    /// Parses the band-query payload line into a band list.
    fn parse_allowed_bands(&self, line: &str) -> Result<Vec<u16>> {
        let _ = line;
        Err(AtError::Unsupported("allowed bands"))
    }

    /// Formats the command that restricts the device to `bands`.
    fn select_bands(&self, bands: &[u16]) -> Option<SelectSpec> {
        let _ = bands;
        None
    }

    /// Query reporting the band currently in use.
    fn active_band_query(&self) -> Option<QuerySpec> {
        None
    }

    /// Parses the active-band payload line.
    fn parse_active_band(&self, line: &str) -> Result<u16> {
        let _ = line;
        Err(AtError::Unsupported("active band"))
    }

    /// Query reporting LTE signal quality, for devices whose layout differs
    /// from plain `+CSQ`.
    fn lte_signal_query(&self) -> Option<QuerySpec> {
        None
    }

    fn parse_lte_signal(&self, line: &str) -> Result<LteSignal> {
        let _ = line;
        Err(AtError::Unsupported("LTE signal"))
    }

    /// Query reporting the serving-cell environment.
    fn cell_info_query(&self) -> Option<QuerySpec> {
        None
    }

    fn parse_cell_info(&self, line: &str) -> Result<CellInfo> {
        let _ = line;
        Err(AtError::Unsupported("cell info"))
    }

    /// Command restricting the radio to LTE only, where supported.
    fn lte_only_command(&self) -> Option<&'static str> {
        None
    }

    /// Command switching the USB composition, where supported.
    fn usb_mode_command(&self, mode: UsbMode) -> Option<String> {
        let _ = mode;
        None
    }
}

/// Profile for devices that only speak the generic command set.
#[derive(Debug, Default, Clone, Copy)]
pub struct Generic;

impl DeviceProfile for Generic {
    fn name(&self) -> &'static str {
        "generic"
    }
}
