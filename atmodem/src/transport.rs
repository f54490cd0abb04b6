//! Byte-stream boundary between the AT engine and the outside world.
//!
//! The engine owns all timing policy; a transport only moves bytes and
//! answers how many are currently buffered for read.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;

/// A duplex byte stream with a non-blocking "bytes available" query.
pub trait Transport {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Reads up to `n` bytes that are already buffered. Never blocks for more
    /// than the transport's own short I/O timeout.
    fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>>;

    /// Number of bytes currently buffered for read.
    fn bytes_available(&mut self) -> io::Result<usize>;
}

/// [`Transport`] backed by a serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Opens the serial device at `path` with the given baud rate.
    ///
    /// The 500 ms port timeout only bounds individual reads of
    /// already-available bytes. Response deadlines live in the channel.
    pub fn open(path: &str, baudrate: u32) -> serialport::Result<Self> {
        let port = serialport::new(path, baudrate)
            .timeout(Duration::from_millis(500))
            .open()?;
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }

    fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let read = self.port.read(&mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let n = self
            .port
            .bytes_to_read()
            .map_err(|e| io::Error::other(e.to_string()))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport for driving the reader and engine without hardware.

    use super::Transport;
    use std::collections::VecDeque;
    use std::io;

    /// Each write pops one reply group; the group's chunks are then delivered
    /// one per poll, so terminators can straddle poll boundaries the way they
    /// do on a real serial link.
    #[derive(Default)]
    pub struct MockTransport {
        replies: VecDeque<Vec<Vec<u8>>>,
        staged: VecDeque<Vec<u8>>,
        pending: Vec<u8>,
        pub writes: Vec<Vec<u8>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a reply group consumed by the next unmatched write.
        pub fn reply(mut self, chunks: &[&str]) -> Self {
            self.replies
                .push_back(chunks.iter().map(|c| c.as_bytes().to_vec()).collect());
            self
        }

        /// Like [`MockTransport::reply`] but with raw bytes, for responses
        /// that are deliberately not valid UTF-8.
        pub fn reply_bytes(mut self, chunks: &[&[u8]]) -> Self {
            self.replies
                .push_back(chunks.iter().map(|c| c.to_vec()).collect());
            self
        }

        /// Queues a write that produces no reply at all (e.g. an SMS body).
        pub fn silent(mut self) -> Self {
            self.replies.push_back(Vec::new());
            self
        }

        /// Stages bytes as if they were already sitting in the UART buffer
        /// before any command was written.
        pub fn stale(mut self, bytes: &str) -> Self {
            self.pending.extend_from_slice(bytes.as_bytes());
            self
        }

        /// Everything written so far, lossily decoded per write call.
        pub fn written(&self) -> Vec<String> {
            self.writes
                .iter()
                .map(|w| String::from_utf8_lossy(w).into_owned())
                .collect()
        }
    }

    impl Transport for MockTransport {
        fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.writes.push(bytes.to_vec());
            if let Some(group) = self.replies.pop_front() {
                self.staged.extend(group);
            }
            Ok(())
        }

        fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
            let n = n.min(self.pending.len());
            Ok(self.pending.drain(..n).collect())
        }

        fn bytes_available(&mut self) -> io::Result<usize> {
            if self.pending.is_empty() {
                if let Some(chunk) = self.staged.pop_front() {
                    self.pending = chunk;
                }
            }
            Ok(self.pending.len())
        }
    }
}
