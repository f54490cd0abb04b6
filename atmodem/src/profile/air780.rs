//! AIR780EU profile (ASR160x chipset).
//!
//! This module ships a reduced, locked AT command set and is preconfigured
//! for LTE, so the profile assumes LTE mode throughout.

use std::time::Duration;

use super::{BandPlan, DeviceProfile, QuerySpec, SelectSpec};
use crate::error::{AtError, Result};
use crate::signal::{next_int, payload_after_colon, CellInfo, LteSignal};

/// FDD mask bits per the AT manual. The working subset depends on the
/// regional variant; TDD bands do not work on the EU model. Bit 8 for band 8
/// is undocumented but confirmed.
static FDD_BANDS: &[(u128, u16)] = &[
    (1, 1),
    (4, 3),
    (8, 4),
    (16, 5),
    (64, 7),
    (128, 8),
    (65536, 17),
    (524288, 20),
    (268435456, 28),
];

static TDD_BANDS: &[(u128, u16)] =
    &[(2, 34), (32, 38), (64, 39), (128, 40), (256, 41)];

static BAND_PLAN: BandPlan = BandPlan {
    fdd: FDD_BANDS,
    tdd: TDD_BANDS,
};

/// Settings carried along in every `AT*BAND` select command.
const ROAMING: u8 = 1;
const SRV_DOMAIN: u8 = 1;
const BAND_PRIORITY_FLAG: u8 = 0;

#[derive(Debug, Default, Clone, Copy)]
pub struct Air780;

impl DeviceProfile for Air780 {
    fn name(&self) -> &'static str {
        "air780eu"
    }

    fn band_plan(&self) -> Option<&BandPlan> {
        Some(&BAND_PLAN)
    }

    fn band_query(&self) -> Option<QuerySpec> {
        Some(QuerySpec::new("AT*BAND?"))
    }

    /// `*BAND:5,0,0,<tdd_mask>,<fdd_mask>`
    fn parse_allowed_bands(&self, line: &str) -> Result<Vec<u16>> {
        let payload = payload_after_colon(line)?;
        let fields: Vec<i64> = payload
            .split(',')
            .map(|f| f.trim().parse().map_err(|_| AtError::parse(line)))
            .collect::<Result<_>>()?;
        let (Some(&tdd), Some(&fdd)) = (fields.get(3), fields.get(4)) else {
            return Err(AtError::parse(line));
        };
        Ok(BAND_PLAN.bands_for(fdd as u128, tdd as u128))
    }

    fn select_bands(&self, bands: &[u16]) -> Option<SelectSpec> {
        let (fdd_mask, tdd_mask) = BAND_PLAN.masks_for(bands);
        Some(SelectSpec {
            command: format!(
                "AT*BAND=5,0,0,{tdd_mask},{fdd_mask},{ROAMING},{SRV_DOMAIN},{BAND_PRIORITY_FLAG}"
            ),
            // The band change is acknowledged by an unsolicited +NITZ marker
            // rather than the OK/ERROR framing.
            stop: "+NITZ",
            timeout: Duration::from_secs(10),
        })
    }

    fn active_band_query(&self) -> Option<QuerySpec> {
        Some(QuerySpec::new("AT*BANDIND?"))
    }

    /// `*BANDIND: 0, 3, 7` — the second field is the band.
    fn parse_active_band(&self, line: &str) -> Result<u16> {
        let payload = payload_after_colon(line)?;
        let mut fields = payload.split(',').map(str::trim);
        let _ = next_int(&mut fields, line)?;
        Ok(next_int(&mut fields, line)? as u16)
    }

    fn lte_signal_query(&self) -> Option<QuerySpec> {
        Some(QuerySpec::new("AT+CESQ"))
    }

    /// `+CESQ: <rxlev>,<ber>,<rscp>,<ecno>,<rsrq>,<rsrp>`
    fn parse_lte_signal(&self, line: &str) -> Result<LteSignal> {
        let payload = payload_after_colon(line)?;
        let fields: Vec<i64> = payload
            .split(',')
            .map(|f| f.trim().trim_matches('"').parse())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| AtError::parse(line))?;
        let &[.., rsrq, rsrp] = fields.as_slice() else {
            return Err(AtError::parse(line));
        };
        Ok(LteSignal {
            rsrp: rsrp as i32,
            rsrq: rsrq as i32,
        })
    }

    /// Querying the cell environment can take a long while.
    fn cell_info_query(&self) -> Option<QuerySpec> {
        Some(QuerySpec::with_timeout("AT+CCED=0,1", Duration::from_secs(30)))
    }

    /// `+CCED:current cell:<13 comma-separated integers>`
    fn parse_cell_info(&self, line: &str) -> Result<CellInfo> {
        let payload = line
            .splitn(3, ':')
            .nth(2)
            .map(|p| p.trim().replace('"', ""))
            .ok_or_else(|| AtError::parse(line))?;
        let fields: Vec<i64> = payload
            .split(',')
            .map(|f| f.trim().parse())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| AtError::parse(line))?;
        CellInfo::from_fields(&fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_bands_from_band_masks() {
        let bands = Air780.parse_allowed_bands("*BAND:5,0,0,0,13").unwrap();
        assert_eq!(bands, vec![1, 3, 4]);

        let bands = Air780.parse_allowed_bands("*BAND:5,0,0,34,1").unwrap();
        assert_eq!(bands, vec![1, 34, 38]);
    }

    #[test]
    fn band_round_trip_through_select_command() {
        let plan = Air780.band_plan().unwrap();
        let bands = vec![1, 3, 8, 20, 38, 40];
        let (fdd, tdd) = plan.masks_for(&bands);
        assert_eq!(plan.bands_for(fdd, tdd), bands);
    }

    #[test]
    fn select_command_carries_both_masks() {
        let spec = Air780.select_bands(&[3, 38]).unwrap();
        assert_eq!(spec.command, "AT*BAND=5,0,0,32,4,1,1,0");
        assert_eq!(spec.stop, "+NITZ");
    }

    #[test]
    fn active_band_is_the_second_field() {
        assert_eq!(Air780.parse_active_band("*BANDIND: 0, 3, 7").unwrap(), 3);
    }

    #[test]
    fn cesq_takes_the_last_two_fields() {
        let signal = Air780
            .parse_lte_signal("+CESQ: 99,99,255,255,19,50")
            .unwrap();
        assert_eq!(signal, LteSignal { rsrp: 50, rsrq: 19 });
    }

    #[test]
    fn cced_payload_sits_after_the_second_colon() {
        let line = "+CCED:current cell:204,16,1234567,0,20,3,6300,31337,-98,-10,14,4,2";
        let info = Air780.parse_cell_info(line).unwrap();
        assert_eq!(info.mcc, 204);
        assert_eq!(info.band, 20);
        assert_eq!(info.pcid, 2);
    }

    #[test]
    fn malformed_lines_are_parse_errors() {
        assert!(Air780.parse_allowed_bands("*BAND:5,0").is_err());
        assert!(Air780.parse_lte_signal("+CESQ: x").is_err());
        assert!(Air780.parse_cell_info("+CCED:nope").is_err());
    }
}
