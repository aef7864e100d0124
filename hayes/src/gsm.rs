//! GSM specific commands: SIM unlock, network status and SMS storage.
//!
//! Messages are exchanged in PDU mode. Encoding and decoding the PDU itself
//! is left to the caller, the modem only moves the hex string around.

use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};
use heapless::String;
use nom::{
    bytes::complete::take_until,
    character::complete::{anychar, char},
    sequence::{pair, preceded, tuple},
    IResult,
};

use crate::{
    config::{PIN_GUARD, SMS_GUARD},
    helpers::{atoi, contains, decimal, find, LossyStr},
    Modem,
};

/// Size of the buffer GSM replies are collected in.
pub const RESPONSE_LEN: usize = 512;

/// Longest PDU string [`Modem::get_sms`] hands out.
pub const SMS_LEN: usize = 512;

/// Storage size assumed while the modem has not reported one.
pub const DEFAULT_MAX_SMS: u16 = 20;

/// A message read from the modem storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sms {
    /// 1-based storage location, as accepted by [`Modem::delete_sms`].
    pub index: u16,
    /// The message in PDU format, as a hex string.
    pub pdu: String<SMS_LEN>,
}

/// `<stat>` of a `+CREG: <n>,<stat>` reply: the character after the first
/// comma.
fn registration_status(input: &[u8]) -> IResult<&[u8], char> {
    preceded(pair(take_until(","), char(',')), anychar)(input)
}

/// Third comma separated field of the reply, the total size of the first
/// storage area in `+CPMS: <mem1>,<used1>,<total1>,...`.
fn storage_total(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (rest, (_, _, _, _, total)) = tuple((
        take_until(","),
        char(','),
        take_until(","),
        char(','),
        take_until(","),
    ))(input)?;
    Ok((rest, total))
}

/// Map a raw `+CSQ` RSSI (0..=31, 99 when unknown) onto 0..=5 signal bars.
pub fn signal_bars(rssi: i32) -> u8 {
    let mut bars = 0; // -113 dBm or less
    if rssi > 0 {
        bars = 1; // -111 dBm
    }
    if rssi > 1 {
        bars = 2;
    }
    if rssi > 20 {
        bars = 3;
    }
    if rssi > 27 {
        bars = 4;
    }
    if rssi > 30 {
        bars = 5; // -51 dBm or more
    }
    if rssi > 31 {
        bars = 0; // not known or not detectable
    }
    bars
}

/// Extract the PDU line from a `+CMGR` reply.
///
/// The reply reads `\r\n+CMGR: <stat>,,<length>\r\n<pdu>\r\n\r\nOK\r\n`, the
/// PDU sits between the line ending of the header and the next `\r`.
fn message_body(rsp: &[u8]) -> Option<&[u8]> {
    let begin = 1 + find(rsp.get(1..)?, b"\r")?;
    let end = begin + 1 + find(&rsp[begin + 1..], b"\r")?;
    rsp.get(begin + 2..end).filter(|body| !body.is_empty())
}

impl<T, D> Modem<T, D>
where
    T: Read + ReadReady + Write,
    D: DelayNs,
{
    /// Write `cmd` and collect the reply up to `OK`. Returns the received
    /// bytes, or `None` on timeout.
    fn query<'b>(&mut self, cmd: &[u8], rsp: &'b mut [u8; RESPONSE_LEN]) -> Option<&'b [u8]> {
        self.write(cmd);
        match self.read(b"OK", rsp) {
            0 => None,
            len => Some(&rsp[..len]),
        }
    }

    /// Unlock the SIM.
    ///
    /// When the SIM asks for a PIN, `pin` is submitted and the SIM is given
    /// ten seconds to settle before its state is queried again. Returns
    /// whether the SIM ends up ready, which is false whenever a PIN is needed
    /// and `pin` is `None`.
    pub fn enter_pin(&mut self, pin: Option<&str>) -> bool {
        let mut rsp = [0u8; RESPONSE_LEN];
        let Some(mut len) = self.query(b"AT+CPIN?\r", &mut rsp).map(<[u8]>::len) else {
            return false;
        };

        if contains(&rsp[..len], b"+CPIN: SIM PIN") {
            match pin {
                Some(pin) => {
                    info!("SIM requires a PIN, unlocking");
                    self.write(b"AT+CPIN=");
                    self.write(pin.as_bytes());
                    self.write(b"\r");
                    self.sleep(PIN_GUARD);
                    self.read(b"OK", &mut []);

                    len = self
                        .query(b"AT+CPIN?\r", &mut rsp)
                        .map_or(0, <[u8]>::len);
                }
                None => warn!("SIM requires a PIN, but none was given"),
            }
        }

        contains(&rsp[..len], b"+CPIN: READY")
    }

    /// Whether the modem is registered on its home network or roaming.
    pub fn check_network(&mut self) -> bool {
        let mut rsp = [0u8; RESPONSE_LEN];
        let Some(rsp) = self.query(b"AT+CREG?\r", &mut rsp) else {
            return false;
        };
        if !contains(rsp, b"+CREG:") {
            return false;
        }

        match registration_status(rsp) {
            Ok((_, stat)) => {
                debug!("Network registration status {}", stat);
                stat == '1' || stat == '5'
            }
            Err(_) => {
                warn!("Malformed registration status: {:?}", LossyStr(rsp));
                false
            }
        }
    }

    /// Reception quality on a 0 (none or unknown) to 5 scale.
    pub fn signal_level(&mut self) -> u8 {
        let mut rsp = [0u8; RESPONSE_LEN];
        self.write(b"AT+CSQ\r");
        let len = self.read(b"OK", &mut rsp);
        let rsp = &rsp[..len];

        // `rsp` is empty after a timeout, and no level can be found
        let Some(pos) = find(rsp, b"+CSQ:") else {
            return 0;
        };
        let rssi = atoi(rsp.get(pos + 6..).unwrap_or_default());
        debug!("Signal quality RSSI {}", rssi);
        signal_bars(rssi)
    }

    /// Number of message slots in the SMS storage.
    ///
    /// The size is queried once and remembered until
    /// [`invalidate_max_sms`](Modem::invalidate_max_sms) is called. While the
    /// modem does not report a usable size, [`DEFAULT_MAX_SMS`] is returned.
    pub fn max_sms(&mut self) -> u16 {
        if let Some(max) = self.max_sms {
            return max;
        }

        let mut rsp = [0u8; RESPONSE_LEN];
        let Some(rsp) = self.query(b"AT+CPMS?\r", &mut rsp) else {
            return DEFAULT_MAX_SMS;
        };

        match storage_total(rsp).map(|(_, total)| atoi(total)) {
            Ok(total) if total > 0 => {
                let total = u16::try_from(total).unwrap_or(u16::MAX);
                debug!("SMS storage holds {} messages", total);
                self.max_sms = Some(total);
                total
            }
            _ => {
                warn!("Unusable storage status: {:?}", LossyStr(rsp));
                DEFAULT_MAX_SMS
            }
        }
    }

    /// Read the stored message with the highest index.
    ///
    /// Slots are probed from the top of the storage down. The first slot
    /// holding a received message, read or unread, is returned.
    pub fn get_sms(&mut self) -> Option<Sms> {
        let max = self.max_sms();

        for index in (1..=max).rev() {
            let mut rsp = [0u8; RESPONSE_LEN];
            self.write(b"AT+CMGR=");
            self.write(decimal(u32::from(index)).as_bytes());
            self.write(b"\r");
            let len = self.read(b"OK", &mut rsp);
            let rsp = &rsp[..len];

            let received = contains(rsp, b"OK")
                && !contains(rsp, b"+CMGR: 0,,0")
                && (contains(rsp, b" 1,") || contains(rsp, b" 0,"));
            if !received {
                trace!("No received message in slot {}", index);
                continue;
            }

            let Some(body) = message_body(rsp) else {
                continue;
            };
            let mut pdu = String::new();
            let valid = core::str::from_utf8(body)
                .ok()
                .is_some_and(|body| pdu.push_str(body).is_ok());
            if valid {
                debug!("Found message in slot {}", index);
                return Some(Sms { index, pdu });
            }
            warn!("Unusable message in slot {}: {:?}", index, LossyStr(body));
        }
        None
    }

    /// Send a message in PDU format.
    ///
    /// `pdu` is the hex string including the trailing Ctrl-Z. The length
    /// announced to the modem leaves out the terminator and the SMSC length
    /// octet, as `AT+CMGS` expects. After the message has been handed over,
    /// the network is given ten seconds to accept it.
    pub fn send_sms(&mut self, pdu: &str) -> bool {
        let Some(chars) = pdu.len().checked_sub(3) else {
            warn!("PDU too short to send: {} characters", pdu.len());
            return false;
        };
        let octets = u32::try_from(chars / 2).unwrap_or(u32::MAX);

        self.write(b"AT+CMGS=");
        self.write(decimal(octets).as_bytes());
        self.write(b"\r");
        if self.read(b">", &mut []) == 0 {
            return false;
        }

        self.write(pdu.as_bytes());
        self.sleep(SMS_GUARD);
        self.read(b"OK", &mut []) > 0
    }

    /// Switch message exchange to PDU mode.
    pub fn set_pdu_mode(&mut self) -> bool {
        self.command(b"AT+CMGF=0\r")
    }

    /// Delete the message stored at `index`.
    pub fn delete_sms(&mut self, index: u16) -> bool {
        self.write(b"AT+CMGD=");
        self.write(decimal(u32::from(index)).as_bytes());
        self.command(b"\r")
    }
}
