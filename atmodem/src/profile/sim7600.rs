//! SIM7600G-H profile.

use std::time::Duration;

use super::{DeviceProfile, QuerySpec, UsbMode};
use crate::error::{AtError, Result};
use crate::signal::payload_after_colon;

/// Width of the `+CNBP` LTE band bitmask: bit `n` stands for band `n + 1`.
const LTE_MASK_BITS: u32 = 72;

#[derive(Debug, Default, Clone, Copy)]
pub struct Sim7600;

impl DeviceProfile for Sim7600 {
    fn name(&self) -> &'static str {
        "sim7600gh"
    }

    fn band_query(&self) -> Option<QuerySpec> {
        Some(QuerySpec::new("AT+CNBP?"))
    }

    /// `+CNBP: <gsm_hex>,<lte_hex>,<tds_hex>` — the second field is the LTE
    /// band bitmask, in which bit position `n` enables band `n + 1`.
    fn parse_allowed_bands(&self, line: &str) -> Result<Vec<u16>> {
        let payload = payload_after_colon(line)?;
        let lte_hex = payload
            .split(',')
            .nth(1)
            .map(str::trim)
            .ok_or_else(|| AtError::parse(line))?;
        let digits = lte_hex.strip_prefix("0x").unwrap_or(lte_hex);
        // The full mask is wider than 128 bits; everything beyond the defined
        // LTE range is padding, so only the low bits are decoded.
        let low = if digits.len() > 32 {
            &digits[digits.len() - 32..]
        } else {
            digits
        };
        let mask =
            u128::from_str_radix(low, 16).map_err(|_| AtError::parse(line))?;

        Ok((0..LTE_MASK_BITS)
            .filter(|shift| mask >> shift & 1 == 1)
            .map(|shift| (shift + 1) as u16)
            .collect())
    }

    fn active_band_query(&self) -> Option<QuerySpec> {
        Some(QuerySpec::with_timeout("AT+CPSI?", Duration::from_secs(30)))
    }

    /// `+CPSI: LTE,Online,310-410,0x7C11,...,EUTRAN-BAND3,1850,...` — the
    /// band is carried in the `EUTRAN-BAND<n>` field.
    fn parse_active_band(&self, line: &str) -> Result<u16> {
        let payload = payload_after_colon(line)?;
        let (_, tail) = payload
            .split_once("EUTRAN-BAND")
            .ok_or_else(|| AtError::parse(line))?;
        let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().map_err(|_| AtError::parse(line))
    }

    /// LTE-only mode; takes effect after a reset.
    fn lte_only_command(&self) -> Option<&'static str> {
        Some("AT+CNMP=38")
    }

    fn usb_mode_command(&self, mode: UsbMode) -> Option<String> {
        let pid = match mode {
            UsbMode::Rndis => 9011,
            UsbMode::Qmi => 9001,
            UsbMode::Ppp => 9003,
        };
        Some(format!("AT+CUSBPIDSWITCH={pid},1,1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnbp_decodes_the_lte_bitmask() {
        // Bits 0, 2, 19 and 27 set: bands 1, 3, 20 and 28.
        let bands = Sim7600
            .parse_allowed_bands("+CNBP: 0x100200000EE80380,0x8080005,0x3F")
            .unwrap();
        assert_eq!(bands, vec![1, 3, 20, 28]);
    }

    #[test]
    fn cnbp_tolerates_very_wide_masks() {
        let line = "+CNBP: 0x100200000EE80380,0x480000000000000000000000000000000000000000000042000007FFFFDF3FFF,0x000000000000003F";
        let bands = Sim7600.parse_allowed_bands(line).unwrap();
        assert!(bands.contains(&1));
        assert!(bands.contains(&3));
        assert!(bands.iter().all(|&b| b >= 1 && b <= 72));
    }

    #[test]
    fn cpsi_band_extraction() {
        let line = "+CPSI: LTE,Online,310-410,0x7C11,12345678,456,EUTRAN-BAND3,1850,5,5,-98,-10,-65,15";
        assert_eq!(Sim7600.parse_active_band(line).unwrap(), 3);
    }

    #[test]
    fn cpsi_without_a_band_is_a_parse_error() {
        assert!(Sim7600.parse_active_band("+CPSI: NO SERVICE").is_err());
    }

    #[test]
    fn usb_mode_commands() {
        assert_eq!(
            Sim7600.usb_mode_command(UsbMode::Rndis).unwrap(),
            "AT+CUSBPIDSWITCH=9011,1,1"
        );
        assert_eq!(
            Sim7600.usb_mode_command(UsbMode::Qmi).unwrap(),
            "AT+CUSBPIDSWITCH=9001,1,1"
        );
        assert_eq!(
            Sim7600.usb_mode_command(UsbMode::Ppp).unwrap(),
            "AT+CUSBPIDSWITCH=9003,1,1"
        );
    }
}
