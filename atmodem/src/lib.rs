//! Client-side implementation of the Hayes AT command protocol for
//! controlling GSM/LTE modems over a serial link.
//!
//! The layering mirrors the protocol: a [`transport::Transport`] moves
//! bytes, an [`channel::AtChannel`] frames one command/response exchange at
//! a time, and a [`modem::Modem`] sequences multi-step typed operations
//! (SIM unlock, SMS, signal and cell queries, operator scan, PDP context
//! management) on top. Per-chipset data and parsers plug in through
//! [`profile::DeviceProfile`].
//!
//! AT is strictly half-duplex: one command in flight per device, and every
//! exchange resolves to exactly one [`Status`].

#![forbid(unsafe_code)]

pub mod channel;
pub mod context;
pub mod error;
pub mod modem;
pub mod operator;
pub mod profile;
pub mod response;
pub mod signal;
pub mod sms;
pub mod status;
pub mod transport;

pub use error::{AtError, Result};
pub use modem::{Modem, Registration};
pub use profile::{Air780, DeviceProfile, Generic, Sim7600};
pub use response::Response;
pub use signal::{CellInfo, LteSignal, SignalQuality};
pub use sms::{DeliveryClass, SmsGroup, SmsRecord};
pub use status::Status;
