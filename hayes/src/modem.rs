use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_io::{Error as _, Read, ReadReady, Write};

use crate::{helpers::LossyStr, Error, ModemConfig, ModemKind};

/// Driver for one modem attached to a serial line.
///
/// The modem exclusively owns the line it talks over, and the delay source
/// used to pace the response scanner. Every command blocks the caller until
/// the modem answers or the scan deadline runs out, so calls on one instance
/// are naturally serialized through `&mut self`.
///
/// The line must offer non-blocking reads through [`ReadReady`]: the scanner
/// only reads when a byte is already waiting.
pub struct Modem<T, D> {
    pub(crate) line: T,
    pub(crate) delay: D,
    pub(crate) config: ModemConfig,
    pub(crate) is_ringing: bool,
    pub(crate) is_hangup: bool,
    pub(crate) max_sms: Option<u16>,
}

impl<T, D> Modem<T, D>
where
    T: Read + ReadReady + Write,
    D: DelayNs,
{
    pub fn new(line: T, delay: D, config: ModemConfig) -> Result<Self, Error> {
        config.validate()?;

        debug!(
            "Opening {:?} modem at {} baud",
            config.kind, config.baud_rate
        );

        Ok(Self {
            line,
            delay,
            config,
            is_ringing: false,
            is_hangup: false,
            max_sms: None,
        })
    }

    /// Write a command to the modem.
    ///
    /// Any bytes the modem sent earlier and nobody consumed are discarded
    /// first, so the next scan only sees the answer to this command. Returns
    /// the number of bytes put on the line. A failing line cuts the command
    /// short without reporting an error.
    pub fn write(&mut self, cmd: &[u8]) -> usize {
        self.discard_input();

        if cmd.len() < 50 {
            debug!("Sending command: {:?}", LossyStr(cmd));
        } else {
            debug!("Sending command with long payload ({} bytes)", cmd.len());
        }

        let sent = self.write_raw(cmd);
        if sent < cmd.len() {
            warn!("Line accepted {} of {} bytes", sent, cmd.len());
        }
        sent
    }

    /// Put bytes on the line as they are, without touching pending input.
    pub(crate) fn write_raw(&mut self, bytes: &[u8]) -> usize {
        let mut sent = 0;
        for byte in bytes {
            if let Err(e) = self.line.write_all(core::slice::from_ref(byte)) {
                error!("Got serial write error {:?}", e.kind());
                break;
            }
            sent += 1;
        }
        if let Err(e) = self.line.flush() {
            error!("Got serial flush error {:?}", e.kind());
        }
        sent
    }

    /// Read one byte if the line already holds one.
    pub(crate) fn try_read_byte(&mut self) -> Option<u8> {
        match self.line.read_ready() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                error!("Got serial read error {:?}", e.kind());
                return None;
            }
        }

        let mut byte = 0;
        match self.line.read(core::slice::from_mut(&mut byte)) {
            Ok(1) => Some(byte),
            Ok(_) => None,
            Err(e) => {
                error!("Got serial read error {:?}", e.kind());
                None
            }
        }
    }

    fn discard_input(&mut self) {
        let mut discarded = 0usize;
        while self.try_read_byte().is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            trace!("Discarded {} stale bytes", discarded);
        }
    }

    /// Block for a fixed guard time.
    pub(crate) fn sleep(&mut self, duration: Duration) {
        let micros = u32::try_from(duration.as_micros()).unwrap_or(u32::MAX);
        self.delay.delay_us(micros);
    }
}

impl<T, D> Modem<T, D> {
    pub fn kind(&self) -> ModemKind {
        self.config.kind
    }

    /// Line speed in bits per second.
    pub fn baud_rate(&self) -> u32 {
        self.config.baud_rate
    }

    pub fn is_blocking(&self) -> bool {
        self.config.blocking
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Forget the SMS storage size learned by
    /// [`max_sms`](Modem::max_sms), forcing the next call to query the modem.
    pub fn invalidate_max_sms(&mut self) {
        self.max_sms = None;
    }

    pub(crate) fn reset_flags(&mut self) {
        self.is_ringing = false;
        self.is_hangup = false;
    }
}
