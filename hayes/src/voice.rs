//! Voice mode on Hayes modems: playing audio down an established call.
//!
//! Audio travels as raw samples between `AT#VTX` and the `<DLE><ETX>`
//! terminator. Samples coming back from the modem may carry `<DLE>` shielding
//! bytes, which [`filter_dle`] strips.

use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};

use crate::{
    config::{DLE, ETX},
    Modem,
};

impl<T, D> Modem<T, D>
where
    T: Read + ReadReady + Write,
    D: DelayNs,
{
    /// Switch the modem to voice mode. Telit modules have no voice mode.
    pub fn set_voice_mode(&mut self) -> bool {
        if !self.config.kind.dialect().voice {
            debug!("{:?} modems have no voice mode", self.config.kind);
            return false;
        }
        self.command(b"AT#CLS=8\r")
    }

    /// Play `wave` down the line.
    ///
    /// The samples are written once the modem acknowledges the transfer with
    /// `CONNECT`, and the transfer is closed with `<DLE><ETX>`. Returns false,
    /// without sending any samples, when the modem refuses the transfer or has
    /// no voice mode.
    pub fn send_wave(&mut self, wave: &[u8]) -> bool {
        if !self.config.kind.dialect().voice {
            debug!("{:?} modems have no voice mode", self.config.kind);
            return false;
        }

        self.write(b"AT#VTX\r");
        if self.read(b"CONNECT", &mut []) == 0 {
            return false;
        }

        debug!("Sending {} bytes of audio", wave.len());
        let sent = self.write_raw(wave);
        if sent < wave.len() {
            warn!("Audio cut short after {} of {} bytes", sent, wave.len());
        }
        self.write(&[DLE, ETX]);
        true
    }
}

/// Strip `<DLE>` bytes from a NUL terminated buffer, in place.
///
/// Bytes up to the first NUL (or the whole buffer if it holds none) are
/// compacted towards the front, and the freed tail up to the old terminator is
/// zeroed. Returns the new length.
pub fn filter_dle(buf: &mut [u8]) -> usize {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());

    let mut kept = 0;
    for i in 0..end {
        if buf[i] != DLE {
            buf[kept] = buf[i];
            kept += 1;
        }
    }
    buf[kept..end].fill(0);
    kept
}
