//! A blocking driver for Hayes compatible data/voice modems and Telit GSM
//! modules, talking AT commands over a serial line.
//!
//! Every operation writes one command and then scans the modem output for the
//! reply it expects. The scan polls the line once per character period and
//! gives up after a deadline derived from the line speed and the configured
//! processing delay, so no call blocks longer than its deadline plus the
//! fixed guard times some commands need (`+++` escape, PIN unlock, SMS
//! submission).
//!
//! While scanning, unsolicited `RING` and `NO CARRIER` reports are recorded
//! on the [`Modem`], and can be queried with [`Modem::is_ringing`] and
//! [`Modem::is_hangup`].
//!
//! # Examples
//!
//! ```ignore
//! use hayes::{Line, ModemConfig, ModemKind, ModemTable};
//!
//! let mut modems: ModemTable<_, _, 2> = ModemTable::new(
//!     delay,
//!     [
//!         Some(Line::new(uart0, ModemConfig::new(ModemKind::Hayes))),
//!         Some(Line::new(uart1, ModemConfig::new(ModemKind::Telit).baud_rate(115_200))),
//!     ],
//! );
//!
//! let gsm = modems.open(1)?;
//! if gsm.init() && gsm.enter_pin(Some("1234")) && gsm.check_network() {
//!     gsm.set_pdu_mode();
//!     if let Some(sms) = gsm.get_sms() {
//!         // decode `sms.pdu`
//!         gsm.delete_sms(sms.index);
//!     }
//! }
//! ```
//!
//! # Optional Cargo Features
//!
//! - **`log`** *(enabled by default)*: Logs commands, scan results and line
//!   errors through the [`log`](https://crates.io/crates/log) facade.
//! - **`defmt`** *(disabled by default)*: Logs through `defmt` instead, and
//!   implements `defmt::Format` for the public types.

#![cfg_attr(not(test), no_std)]

// Must come first, every other module uses its macros
mod fmt;

mod config;
mod error;
mod generic;
mod gsm;
mod helpers;
mod modem;
mod registry;
mod scanner;
mod voice;

#[cfg(test)]
mod line_mock;

pub use config::{ModemConfig, ModemKind, DLE, ETX};
pub use error::Error;
pub use gsm::{signal_bars, Sms, DEFAULT_MAX_SMS, RESPONSE_LEN, SMS_LEN};
pub use helpers::LossyStr;
pub use modem::Modem;
pub use registry::{Line, ModemTable};
pub use scanner::CAPTURE_LEN;
pub use voice::filter_dle;
