use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};
use heapless::Vec;

use crate::{
    config::DLE,
    helpers::{contains, LossyStr},
    Modem,
};

/// Number of response bytes the scanner keeps while matching.
pub const CAPTURE_LEN: usize = 512;

/// Time budget of a single scan.
///
/// Time only advances through the sleeps the scan performs itself, so the
/// budget holds on any delay source, virtual ones included.
struct Deadline {
    budget_us: u64,
    elapsed_us: u64,
}

impl Deadline {
    fn after(budget_us: u64) -> Self {
        Self {
            budget_us,
            elapsed_us: 0,
        }
    }

    fn sleep(&mut self, delay: &mut impl DelayNs, us: u32) {
        delay.delay_us(us);
        self.elapsed_us += u64::from(us);
    }

    fn expired(&self) -> bool {
        self.elapsed_us >= self.budget_us
    }
}

impl<T, D> Modem<T, D>
where
    T: Read + ReadReady + Write,
    D: DelayNs,
{
    /// Scan the modem output for `expected`.
    ///
    /// The capacity of the scan is `response.len()`. The scan sleeps one
    /// character period between polls of the line and gives up after
    /// `delay + capacity * char_period`.
    ///
    /// - With a non-empty `response`, the received bytes are collected
    ///   straight into `response`. The scan stops as soon as `expected` shows
    ///   up in them, or once `response.len() - 1` bytes have arrived. The rest
    ///   of `response` is zeroed and the byte count is returned.
    /// - With an empty `response`, only a match stops the scan early. The
    ///   most recent [`CAPTURE_LEN`] bytes are kept for matching, and the
    ///   number of bytes held at the match is returned, so the count never
    ///   exceeds [`CAPTURE_LEN`].
    ///
    /// Returns 0 when the deadline passes without a match, with `response`
    /// zeroed. An empty `expected` never matches, which turns the call into a
    /// timed listen.
    ///
    /// Independent of `expected`, every scan records a `RING` as an incoming
    /// call and a `NO CARRIER` as a dropped line. On Telit modules an `ERROR`
    /// ends the scan immediately with 0.
    pub fn read(&mut self, expected: &[u8], response: &mut [u8]) -> usize {
        let capacity = response.len();
        let char_period = self.config.char_period_us();
        let mut deadline =
            Deadline::after(self.config.delay_us() + u64::from(char_period) * capacity as u64);
        // Byte count that completes a bounded scan
        let limit = capacity.checked_sub(1);
        let fast_fail = self.config.kind.dialect().fast_fail;
        // Only used by unbounded scans
        let mut capture: Vec<u8, CAPTURE_LEN> = Vec::new();
        let mut filled = 0;

        loop {
            deadline.sleep(&mut self.delay, char_period);

            if let Some(byte) = self.try_read_byte() {
                if !(self.config.dle_filter && byte == DLE) {
                    match limit {
                        Some(limit) if filled < limit => {
                            response[filled] = byte;
                            filled += 1;
                        }
                        Some(_) => {}
                        None => {
                            if capture.is_full() {
                                capture.remove(0);
                            }
                            // never full here, a slot was freed above
                            if let Err(byte) = capture.push(byte) {
                                error!("Capture overflow, dropped byte {}", byte);
                            }
                        }
                    }
                }
            }

            let received: &[u8] = match limit {
                Some(_) => &response[..filled],
                None => &capture,
            };

            if let Some(token) = fast_fail {
                if contains(received, token) {
                    warn!("Modem reported an error: {:?}", LossyStr(received));
                    response.fill(0);
                    return 0;
                }
            }

            if contains(received, b"RING") {
                self.is_ringing = true;
            }
            if contains(received, b"NO CARRIER") {
                self.is_hangup = true;
            }

            let matched = contains(received, expected);
            match limit {
                None if matched => {
                    debug!(
                        "Matched {:?} after {} us",
                        LossyStr(expected),
                        deadline.elapsed_us
                    );
                    return capture.len();
                }
                Some(limit) if matched || filled >= limit => {
                    trace!("Received response: {:?}", LossyStr(received));
                    response[filled..].fill(0);
                    return filled;
                }
                _ => {}
            }

            if deadline.expired() {
                debug!(
                    "Timed out waiting for {:?} after {} us",
                    LossyStr(expected),
                    deadline.elapsed_us
                );
                if !received.is_empty() {
                    trace!("Unmatched response: {:?}", LossyStr(received));
                }
                response.fill(0);
                return 0;
            }
        }
    }
}
