//! The device protocol engine: typed, multi-step AT operations.
//!
//! Each public operation is a short state machine of command/status checks:
//! re-establish synchronization, run an ordered list of commands, and
//! short-circuit on the first unexpected status, returning it unchanged so
//! the caller can tell which step failed.

use std::time::Duration;

use tracing::debug;

use crate::channel::AtChannel;
use crate::context::{parse_addresses, parse_contexts, Address, Context};
use crate::error::{AtError, Result};
use crate::operator::{parse_operator_list, Operator};
use crate::profile::{DeviceProfile, QuerySpec, UsbMode};
use crate::response::Terminator;
use crate::signal::{next_int, parse_csq, payload_after_colon, CellInfo, LteSignal, SignalQuality};
use crate::sms::{parse_sms_listing, DeliveryClass, SmsGroup, SmsRecord};
use crate::status::Status;
use crate::transport::{SerialTransport, Transport};

/// Operator scans routinely take tens of seconds.
const OPERATOR_SCAN_TIMEOUT: Duration = Duration::from_secs(45);

/// Hard bound on the wait for the unsolicited SIM-ready notification.
const UNLOCK_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Unsolicited marker the device emits once the SIM is usable.
const SMS_READY: &str = "SMS Ready";

/// Network registration state, from `AT+CREG?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub mode: u8,
    pub stat: u8,
}

/// A modem speaking the Hayes AT protocol over an exclusively owned
/// transport, with per-chipset behavior supplied by a [`DeviceProfile`].
pub struct Modem<T: Transport> {
    channel: AtChannel<T>,
    profile: Box<dyn DeviceProfile>,
}

impl Modem<SerialTransport> {
    /// Opens the serial device at `path`. The SIM may still need unlocking,
    /// and [`Modem::sync_baudrate`] must succeed before anything else is
    /// trusted.
    pub fn open(
        path: &str,
        baudrate: u32,
        profile: Box<dyn DeviceProfile>,
    ) -> Result<Self> {
        debug!("opening AT device at {path}, profile {}", profile.name());
        let transport = SerialTransport::open(path, baudrate)?;
        Ok(Modem::new(transport, profile))
    }
}

impl<T: Transport> Modem<T> {
    pub fn new(transport: T, profile: Box<dyn DeviceProfile>) -> Self {
        Modem {
            channel: AtChannel::new(transport),
            profile,
        }
    }

    pub fn profile_name(&self) -> &'static str {
        self.profile.name()
    }

    /// Synchronizes the device baudrate to the port. See
    /// [`AtChannel::sync_baudrate`].
    pub fn sync_baudrate(&mut self, retry: bool) -> Result<Status> {
        self.channel.sync_baudrate(retry)
    }

    /// Reboots the device.
    pub fn reboot(&mut self) -> Result<Status> {
        debug!("rebooting device");
        self.channel.send("AT+CFUN=1,1")?;
        self.channel.read_status("rebooting")
    }

    // ---- SIM ----

    /// Queries the SIM lock state: `Ok` when unlocked, `ErrorSimPuk` when a
    /// PUK is required, `Unknown` otherwise.
    pub fn sim_status(&mut self) -> Result<Status> {
        self.channel.reset_state()?;
        self.channel.send("AT+CPIN?")?;
        let response = self.channel.read_default()?;
        Ok(match response.line(1) {
            Some(line) if line.contains("READY") => Status::Ok,
            Some(line) if line.contains("SIM PUK") => Status::ErrorSimPuk,
            _ => Status::Unknown,
        })
    }

    /// Unlocks the SIM with `pin`, then waits for the device to signal
    /// readiness. Idempotent: when the SIM is already unlocked this returns
    /// `Ok` without submitting the PIN again.
    pub fn unlock_sim(&mut self, pin: &str) -> Result<Status> {
        self.channel.reset_state()?;
        if self.sim_status()? == Status::Ok {
            return Ok(Status::Ok);
        }

        debug!("submitting SIM pin");
        self.channel.send(&format!("AT+CPIN={pin}"))?;
        let status = self.channel.read_status("setting pin")?;
        if status != Status::Ok {
            return Ok(status);
        }

        // The ready notification is unsolicited and does not follow the
        // OK/ERROR framing; it arrives via the stop-substring path.
        debug!("awaiting SIM ready notification");
        let ready = self.channel.read(UNLOCK_READY_TIMEOUT, SMS_READY)?;
        if !ready.is_complete() {
            return Ok(ready.status());
        }
        debug!("SIM unlocked");
        Ok(Status::Ok)
    }

    // ---- SMS ----

    /// Sends a text message. The recipient-addressing step must answer with
    /// the `> ` prompt; any other status, `Ok` included, means the device
    /// rejected the address before accepting body text and is returned
    /// without writing the body.
    pub fn send_sms(
        &mut self,
        number: &str,
        text: &str,
        class: DeliveryClass,
    ) -> Result<Status> {
        self.channel.reset_state()?;
        debug!("sending SMS to {number}");

        self.channel.send("AT+CSCS=\"GSM\"")?;
        let status = self.channel.read_status("character set")?;
        if status != Status::Ok {
            return Ok(status);
        }

        self.channel.send("AT+CMGF=1")?;
        let status = self.channel.read_status("text mode")?;
        if status != Status::Ok {
            return Ok(status);
        }

        self.channel
            .send(&format!("AT+CSMP=17,167,0,{}", class.dcs()))?;
        let status = self.channel.read_status("message parameters")?;
        if status != Status::Ok {
            return Ok(status);
        }

        self.channel.send(&format!("AT+CMGS=\"{number}\""))?;
        let status = self.channel.read_status("addressing recipient")?;
        if status != Status::Prompt {
            return Ok(status);
        }

        self.channel.send_raw(text)?;
        self.channel.send_ctrl_z()?;
        let status = self.channel.read_status("sending message")?;
        debug!("message handed to the network: {status}");
        Ok(status)
    }

    /// Lists stored messages from `group`. A failed precondition or listing
    /// step surfaces its [`Status`] as [`AtError::Command`].
    ///
    /// Messages listed as unread will not show up as unread again.
    pub fn receive_sms(&mut self, group: SmsGroup) -> Result<Vec<SmsRecord>> {
        self.channel.reset_state()?;
        debug!("scanning {} messages", group.as_str());

        self.channel.send("AT+CSCS=\"GSM\"")?;
        self.expect_ok("character set")?;
        self.channel.send("AT+CMGF=1")?;
        self.expect_ok("text mode")?;

        self.channel.send(&format!("AT+CMGL=\"{}\"", group.as_str()))?;
        let response = self.channel.read_default()?;
        let status = response.status();
        if status != Status::Ok {
            return Err(AtError::Command(status));
        }
        parse_sms_listing(response.lines())
    }

    /// Deletes all read and sent messages, drafts included; unread messages
    /// are kept.
    pub fn delete_read_sms(&mut self) -> Result<Status> {
        self.channel.reset_state()?;
        self.channel.send("AT+CMGD=1,3")?;
        self.channel.read_status("deleting messages")
    }

    // ---- Radio status ----

    /// GSM signal quality via `AT+CSQ`. Both fields use 99 as the "unknown"
    /// sentinel; see [`SignalQuality::quality_percent`].
    pub fn signal_quality(&mut self) -> Result<SignalQuality> {
        self.channel.reset_state()?;
        self.channel.send("AT+CSQ")?;
        let response = self.expect_ok_response()?;
        let line = response.line(1).ok_or_else(|| AtError::parse(response.raw()))?;
        parse_csq(line)
    }

    /// Scans for visible network operators. Slow; see
    /// [`OPERATOR_SCAN_TIMEOUT`].
    pub fn scan_operators(&mut self) -> Result<Vec<Operator>> {
        self.channel.reset_state()?;
        debug!("scanning operators");
        self.channel.send("AT+COPS=?")?;
        let response = self.channel.read(OPERATOR_SCAN_TIMEOUT, "")?;
        let status = response.status();
        if status != Status::Ok {
            return Err(AtError::Command(status));
        }
        let line = response.line(1).ok_or_else(|| AtError::parse(response.raw()))?;
        parse_operator_list(line)
    }

    /// Network registration state via `AT+CREG?`.
    pub fn registration(&mut self) -> Result<Registration> {
        self.channel.reset_state()?;
        self.channel.send("AT+CREG?")?;
        let response = self.expect_ok_response()?;
        let line = response.line(1).ok_or_else(|| AtError::parse(response.raw()))?;
        let payload = payload_after_colon(line)?;
        let mut fields = payload.split(',').map(str::trim);
        Ok(Registration {
            mode: next_int(&mut fields, line)? as u8,
            stat: next_int(&mut fields, line)? as u8,
        })
    }

    // ---- PDP contexts ----

    /// Lists the configured PDP contexts.
    pub fn contexts(&mut self) -> Result<Vec<Context>> {
        self.channel.reset_state()?;
        self.channel.send("AT+CGDCONT?")?;
        let response = self.expect_ok_response()?;
        parse_contexts(response.lines())
    }

    /// Defines (or redefines) PDP context `id`.
    pub fn set_context(&mut self, id: u8, context_type: &str, apn: &str) -> Result<Status> {
        self.channel.reset_state()?;
        self.channel
            .send(&format!("AT+CGDCONT={id},\"{context_type}\",\"{apn}\""))?;
        self.channel.read_status("defining context")
    }

    /// Removes PDP context `id`.
    pub fn delete_context(&mut self, id: u8) -> Result<Status> {
        self.channel.reset_state()?;
        self.channel.send(&format!("AT+CGDCONT={id}"))?;
        self.channel.read_status("deleting context")
    }

    /// Activates PDP context `id`.
    pub fn activate_context(&mut self, id: u8) -> Result<Status> {
        self.channel.reset_state()?;
        self.channel.send(&format!("AT+CGACT=1,{id}"))?;
        self.channel.read_status("activating context")
    }

    /// Lists the PDP addresses currently assigned.
    pub fn addresses(&mut self) -> Result<Vec<Address>> {
        self.channel.reset_state()?;
        self.channel.send("AT+CGPADDR")?;
        let response = self.expect_ok_response()?;
        parse_addresses(response.lines())
    }

    // ---- Identity ----

    pub fn manufacturer(&mut self) -> Result<String> {
        self.query_payload("AT+CGMI")
    }

    pub fn model(&mut self) -> Result<String> {
        self.query_payload("AT+CGMM")
    }

    pub fn version(&mut self) -> Result<String> {
        self.query_payload("AT+CGMR")
    }

    pub fn serial(&mut self) -> Result<String> {
        self.query_payload("AT+CGSN")
    }

    pub fn imei(&mut self) -> Result<String> {
        self.query_payload("AT+GSN")
    }

    pub fn imsi(&mut self) -> Result<String> {
        self.query_payload("AT+CIMI")
    }

    pub fn iccid(&mut self) -> Result<String> {
        self.query_payload("AT+CCID")
    }

    // ---- Profile-routed operations ----

    /// LTE signal quality, for profiles whose layout differs from `+CSQ`.
    pub fn lte_signal(&mut self) -> Result<LteSignal> {
        let spec = self
            .profile
            .lte_signal_query()
            .ok_or(AtError::Unsupported("LTE signal"))?;
        let line = self.query_line(spec)?;
        self.profile.parse_lte_signal(&line)
    }

    /// Serving-cell environment record.
    pub fn cell_info(&mut self) -> Result<CellInfo> {
        let spec = self
            .profile
            .cell_info_query()
            .ok_or(AtError::Unsupported("cell info"))?;
        let line = self.query_line(spec)?;
        self.profile.parse_cell_info(&line)
    }

    /// The bands the device is currently allowed to use.
    pub fn allowed_bands(&mut self) -> Result<Vec<u16>> {
        let spec = self
            .profile
            .band_query()
            .ok_or(AtError::Unsupported("allowed bands"))?;
        let line = self.query_line(spec)?;
        self.profile.parse_allowed_bands(&line)
    }

    /// Restricts the device to `bands`. Bands outside the profile's band
    /// plan are ignored.
    pub fn set_allowed_bands(&mut self, bands: &[u16]) -> Result<Status> {
        let spec = self
            .profile
            .select_bands(bands)
            .ok_or(AtError::Unsupported("band selection"))?;
        self.channel.reset_state()?;
        self.channel.send(&spec.command)?;
        let response = self.channel.read(spec.timeout, spec.stop)?;
        // A stop-substring match is this firmware's acknowledgement.
        Ok(match response.terminator() {
            Some(Terminator::Stop) => Status::Ok,
            _ => response.status(),
        })
    }

    /// The band currently in use.
    pub fn active_band(&mut self) -> Result<u16> {
        let spec = self
            .profile
            .active_band_query()
            .ok_or(AtError::Unsupported("active band"))?;
        let line = self.query_line(spec)?;
        self.profile.parse_active_band(&line)
    }

    /// Restricts the radio to LTE and reboots so the setting takes effect.
    pub fn limit_to_lte(&mut self) -> Result<Status> {
        let command = self
            .profile
            .lte_only_command()
            .ok_or(AtError::Unsupported("LTE-only mode"))?;
        self.channel.reset_state()?;
        self.channel.send(command)?;
        let status = self.channel.read_status("LTE-only mode")?;
        if status != Status::Ok {
            return Ok(status);
        }
        // The device drops off the bus while rebooting.
        self.channel.send("AT+CFUN=1,1")?;
        self.channel.read(Duration::from_secs(10), "")?;
        Ok(Status::Ok)
    }

    /// Switches the USB composition. On success the device resets itself.
    pub fn set_usb_mode(&mut self, mode: UsbMode) -> Result<Status> {
        let command = self
            .profile
            .usb_mode_command(mode)
            .ok_or(AtError::Unsupported("USB mode switch"))?;
        self.channel.reset_state()?;
        self.channel.send(&command)?;
        self.channel.read_status("USB mode switch")
    }

    // ---- Helpers ----

    /// Single command, single payload line: reset, send, expect `Ok`, hand
    /// back line 1 (line 0 is the command echo).
    fn query_line(&mut self, spec: QuerySpec) -> Result<String> {
        self.channel.reset_state()?;
        self.channel.send(spec.command)?;
        let response = self.channel.read(spec.timeout, "")?;
        let status = response.status();
        if status != Status::Ok {
            return Err(AtError::Command(status));
        }
        response
            .line(1)
            .map(str::to_string)
            .ok_or_else(|| AtError::parse(response.raw()))
    }

    /// Identity variant of [`Modem::query_line`]: strips the `+XXX:` prefix
    /// and quoting that some firmware wraps around the payload.
    fn query_payload(&mut self, command: &'static str) -> Result<String> {
        let line = self.query_line(QuerySpec::new(command))?;
        let payload = line.split_once(':').map_or(line.as_str(), |(_, p)| p);
        Ok(payload.trim().trim_matches('"').to_string())
    }

    fn expect_ok(&mut self, context: &str) -> Result<()> {
        let status = self.channel.read_status(context)?;
        if status != Status::Ok {
            return Err(AtError::Command(status));
        }
        Ok(())
    }

    fn expect_ok_response(&mut self) -> Result<crate::response::Response> {
        let response = self.channel.read_default()?;
        let status = response.status();
        if status != Status::Ok {
            return Err(AtError::Command(status));
        }
        Ok(response)
    }

    /// The underlying channel, for callers needing raw command access.
    pub fn channel(&mut self) -> &mut AtChannel<T> {
        &mut self.channel
    }
}
