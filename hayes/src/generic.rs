//! Commands every Hayes compatible modem understands.

use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};

use crate::{
    config::{Hangup, DLE, ESCAPE_GUARD, ETX},
    Modem,
};

impl<T, D> Modem<T, D>
where
    T: Read + ReadReady + Write,
    D: DelayNs,
{
    /// Write `cmd` and wait for `OK`.
    pub(crate) fn command(&mut self, cmd: &[u8]) -> bool {
        self.write(cmd);
        self.read(b"OK", &mut []) > 0
    }

    /// Put the modem into a known command state.
    pub fn init(&mut self) -> bool {
        let init = self.config.kind.dialect().init;
        self.command(init)
    }

    /// Drop the current call.
    ///
    /// Hayes modems may be stuck in data or voice mode, where commands are
    /// not interpreted. If the modem does not answer a plain `AT`, it is sent
    /// `<DLE><ETX>` to end a voice transfer, and if that is not acknowledged
    /// either, the `+++` escape after the mandatory guard time.
    pub fn hangup(&mut self) -> bool {
        let hung_up = match self.config.kind.dialect().hangup {
            Hangup::Direct(cmd) => self.command(cmd),
            Hangup::Escalate {
                probe,
                escape,
                hangup,
            } => {
                if !self.command(probe) {
                    debug!("Modem not in command mode, sending <DLE><ETX>");
                    self.write(&[DLE, ETX]);
                    if self.read(b"VCON", &mut []) == 0 {
                        debug!("Escaping to command mode");
                        self.sleep(ESCAPE_GUARD);
                        self.write(escape);
                    }
                }
                self.command(hangup)
            }
        };

        if hung_up {
            self.is_ringing = false;
            self.is_hangup = true;
        }
        hung_up
    }

    /// Answer incoming calls after the first ring.
    pub fn set_autoanswer(&mut self) -> bool {
        self.command(b"ATS0=1\r")
    }

    pub fn echo_off(&mut self) -> bool {
        self.command(b"ATE0\r")
    }

    pub fn echo_on(&mut self) -> bool {
        self.command(b"ATE1\r")
    }

    /// Pick up an incoming call.
    pub fn answer(&mut self) -> bool {
        let answered = self.command(b"ATA\r");
        if answered {
            self.is_ringing = false;
        }
        answered
    }

    /// Call `number`. Telit modules place a voice call.
    pub fn dial(&mut self, number: &str) -> bool {
        let suffix = self.config.kind.dialect().dial_suffix;
        self.write(b"ATD ");
        self.write(number.as_bytes());
        if !suffix.is_empty() {
            self.write(suffix);
        }
        self.command(b"\r")
    }

    /// Whether a call is coming in. Once a `RING` has been seen this stays
    /// true without touching the line, until the call is answered or hung up.
    pub fn is_ringing(&mut self) -> bool {
        self.is_ringing || self.read(b"RING", &mut []) > 0
    }

    /// Whether the line has been dropped.
    pub fn is_hangup(&mut self) -> bool {
        self.is_hangup || self.read(b"NO CARRIER", &mut []) > 0
    }
}
