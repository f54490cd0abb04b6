//! The command channel: one write paired with one framed read.
//!
//! AT is strictly half-duplex; the poll loop in [`AtChannel::read`] is the
//! only point of suspension in the whole engine.

use std::str;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Result;
use crate::response::{find_terminator, Response};
use crate::status::Status;
use crate::transport::Transport;

/// Interval between polls of the transport's receive buffer.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default deadline for a single response.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for each baudrate synchronization probe.
const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// Probe ceiling for [`AtChannel::reset_state`].
const RESET_PROBES: usize = 10;

/// The bare probe command used for synchronization.
const PROBE: &str = "AT";

/// Ctrl-Z, the control byte that ends an SMS body prompt.
const CTRL_Z: u8 = 0x1a;

/// Pairs "write a command line" with "read the next framed response" over an
/// owned transport.
pub struct AtChannel<T: Transport> {
    transport: T,
}

impl<T: Transport> AtChannel<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Writes one command line, appending the CR-LF terminator.
    pub fn send(&mut self, command: &str) -> Result<()> {
        debug!("WRITE: {command}");
        self.transport
            .write_bytes(format!("{command}\r\n").as_bytes())?;
        Ok(())
    }

    /// Writes text verbatim, without a line terminator. Used for the SMS body,
    /// which is ended by Ctrl-Z instead.
    pub fn send_raw(&mut self, text: &str) -> Result<()> {
        debug!("WRITE (raw): {text}");
        self.transport.write_bytes(text.as_bytes())?;
        Ok(())
    }

    /// Writes the Ctrl-Z byte that ends an SMS body prompt.
    pub fn send_ctrl_z(&mut self) -> Result<()> {
        debug!("WRITE: Ctrl-Z");
        self.transport.write_bytes(&[CTRL_Z])?;
        Ok(())
    }

    /// Reads one whole response.
    ///
    /// Polls the transport every [`POLL_INTERVAL`]; every new chunk is
    /// appended and the *whole* buffer re-tested for a terminator, since
    /// terminators can straddle poll boundaries. Non-UTF-8 input aborts
    /// immediately with [`Status::DecodeError`] — garbled bytes mean a
    /// framing or baud problem that re-reading cannot fix. The deadline is
    /// measured from the start of the read, not from the last byte.
    ///
    /// `stop` is an early-terminator for unsolicited notifications that do
    /// not follow the OK/ERROR convention; empty disables that path.
    pub fn read(&mut self, timeout: Duration, stop: &str) -> Result<Response> {
        let start = Instant::now();
        let mut buffer = String::new();
        loop {
            let available = self.transport.bytes_available()?;
            if available > 0 {
                let chunk = self.transport.read_bytes(available)?;
                match str::from_utf8(&chunk) {
                    Ok(text) => buffer.push_str(text),
                    Err(_) => {
                        debug!("READ: undecodable bytes after {buffer:?}");
                        return Ok(Response::aborted(buffer, Status::DecodeError));
                    }
                }
                if let Some(terminator) = find_terminator(&buffer, stop) {
                    debug!("READ: {buffer:?}");
                    return Ok(Response::complete(buffer, terminator));
                }
            }
            if start.elapsed() >= timeout {
                debug!("READ (timeout): {buffer:?}");
                return Ok(Response::aborted(buffer, Status::Timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// [`AtChannel::read`] with the default deadline and no stop substring.
    pub fn read_default(&mut self) -> Result<Response> {
        self.read(DEFAULT_TIMEOUT, "")
    }

    /// Reads the next response and reduces it to its [`Status`], logging
    /// non-success with the caller's context.
    pub fn read_status(&mut self, context: &str) -> Result<Status> {
        let status = self.read_default()?.status();
        if status != Status::Ok && status != Status::Prompt {
            debug!("{status}: {context}");
        }
        Ok(status)
    }

    /// Synchronizes the device baudrate to the port by probing until `OK`.
    ///
    /// A mismatched baud rate produces garbage rather than errors, so this
    /// must succeed once before any higher-level operation is trusted. With
    /// `retry` false a single failed probe is reported instead of looped on.
    pub fn sync_baudrate(&mut self, retry: bool) -> Result<Status> {
        debug!("performing baudrate sync, retry={retry}");
        loop {
            self.send(PROBE)?;
            let status = self.read(SYNC_TIMEOUT, "")?.status();
            if status == Status::Ok {
                debug!("baudrate sync successful");
                return Ok(Status::Ok);
            }
            if !retry {
                debug!("baudrate sync failed: {status}");
                return Ok(status);
            }
            debug!("baudrate sync: {status}, retrying");
        }
    }

    /// Re-establishes a known-good `OK` baseline before a stateful sequence.
    ///
    /// Drains stale unread bytes left over from a prior aborted exchange so
    /// they cannot be misread as the start of the next response, then probes
    /// up to [`RESET_PROBES`] times, stopping on the first `OK`.
    pub fn reset_state(&mut self) -> Result<Status> {
        let stale = self.transport.bytes_available()?;
        if stale > 0 {
            let drained = self.transport.read_bytes(stale)?;
            debug!("drained {} stale bytes", drained.len());
        }
        let mut status = Status::Unknown;
        for _ in 0..RESET_PROBES {
            self.send(PROBE)?;
            status = self.read_status("reset probe")?;
            if status == Status::Ok {
                break;
            }
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    #[test]
    fn read_terminates_on_ok_and_tokenizes() {
        let mock = MockTransport::new().reply(&["AT+CSQ\r\n\r\n+CSQ: 20,3\r\n\r\nOK\r\n"]);
        let mut channel = AtChannel::new(mock);
        channel.send("AT+CSQ").unwrap();

        let start = Instant::now();
        let response = channel.read(Duration::from_secs(5), "").unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(response.is_complete());
        assert_eq!(response.last_line(), Some("OK"));
        assert_eq!(response.status(), Status::Ok);
    }

    #[test]
    fn read_reassembles_terminator_across_polls() {
        // The OK terminator is split over three chunks, one per poll.
        let mock = MockTransport::new().reply(&["AT\r\n", "\r\nO", "K\r\n"]);
        let mut channel = AtChannel::new(mock);
        channel.send("AT").unwrap();

        let response = channel.read(Duration::from_secs(5), "").unwrap();
        assert_eq!(response.status(), Status::Ok);
    }

    #[test]
    fn read_times_out_no_earlier_than_deadline() {
        let mut channel = AtChannel::new(MockTransport::new());
        let timeout = Duration::from_millis(50);

        let start = Instant::now();
        let response = channel.read(timeout, "").unwrap();
        let elapsed = start.elapsed();

        assert_eq!(response.status(), Status::Timeout);
        assert!(elapsed >= timeout, "returned after {elapsed:?}");
        // Deadline plus a generous envelope around one poll interval.
        assert!(elapsed < timeout + Duration::from_millis(100));
    }

    #[test]
    fn read_preserves_partial_text_on_timeout() {
        let mock = MockTransport::new().reply(&["half a respon"]);
        let mut channel = AtChannel::new(mock);
        channel.send("AT+SLOW").unwrap();

        let response = channel.read(Duration::from_millis(50), "").unwrap();
        assert_eq!(response.status(), Status::Timeout);
        assert_eq!(response.raw(), "half a respon");
    }

    #[test]
    fn read_aborts_on_undecodable_bytes() {
        // A baud mismatch turns the tail of the response into garbage.
        let chunks: &[&[u8]] = &[b"AT\r\n", &[0xff, 0xfe, 0x91]];
        let mock = MockTransport::new().reply_bytes(chunks);
        let mut channel = AtChannel::new(mock);
        channel.send("AT").unwrap();

        let response = channel.read(Duration::from_millis(200), "").unwrap();
        assert_eq!(response.status(), Status::DecodeError);
        assert_eq!(response.raw(), "AT\r\n");
    }

    #[test]
    fn read_stops_on_stop_substring_anywhere() {
        let mock = MockTransport::new().reply(&["boot noise\r\n", "SMS Ready\r\nmore"]);
        let mut channel = AtChannel::new(mock);
        channel.send("AT+CPIN=0000").unwrap();

        let response = channel.read(Duration::from_secs(5), "SMS Ready").unwrap();
        assert!(response.is_complete());
        assert!(response.raw().contains("SMS Ready"));
    }

    #[test]
    fn reset_state_drains_stale_bytes_then_probes() {
        let mock = MockTransport::new()
            .stale("leftover from an aborted exchange")
            .reply(&["AT\r\n\r\nOK\r\n"]);
        let mut channel = AtChannel::new(mock);

        assert_eq!(channel.reset_state().unwrap(), Status::Ok);
        // A single probe sufficed and the stale bytes never reached the parser.
        assert_eq!(channel.transport().written(), vec!["AT\r\n"]);
    }

    #[test]
    fn sync_baudrate_reports_failure_without_retry() {
        let mock = MockTransport::new().reply(&["AT\r\n\r\nERROR\r\n"]);
        let mut channel = AtChannel::new(mock);
        // With retry disabled a failed probe is reported once, not looped on.
        assert_eq!(channel.sync_baudrate(false).unwrap(), Status::Error);
        assert_eq!(channel.transport().written().len(), 1);
    }
}
