use embassy_time::Duration;

use crate::Error;

/// Data Link Escape, used by voice modems to frame in-band control codes.
pub const DLE: u8 = 0x10;
/// End of Text, sent after [`DLE`] to leave data or voice transfer mode.
pub const ETX: u8 = 0x03;

/// Silence required on both sides of the `+++` escape sequence.
pub(crate) const ESCAPE_GUARD: Duration = Duration::from_millis(1500);
/// Time the SIM needs to settle after a PIN has been submitted.
pub(crate) const PIN_GUARD: Duration = Duration::from_secs(10);
/// Time the network needs to accept a submitted SMS.
pub(crate) const SMS_GUARD: Duration = Duration::from_secs(10);

/// The command dialect spoken by the modem on a line.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemKind {
    /// Classic Hayes compatible data/voice modem (Rockwell chipset).
    #[default]
    Hayes,
    /// Telit GSM module.
    Telit,
}

/// How a dialect drops a call.
#[derive(Debug)]
pub(crate) enum Hangup {
    /// A single command answered with `OK`.
    Direct(&'static [u8]),
    /// Probe for command mode, fall back to `<DLE><ETX>` and then to the
    /// guarded `+++` escape, and finally hang up.
    Escalate {
        probe: &'static [u8],
        escape: &'static [u8],
        hangup: &'static [u8],
    },
}

/// Command strings and behaviour that differ between modem kinds.
#[derive(Debug)]
pub(crate) struct Dialect {
    pub(crate) init: &'static [u8],
    pub(crate) hangup: Hangup,
    /// Appended to the number by `dial`, making it a voice call on GSM modules.
    pub(crate) dial_suffix: &'static [u8],
    /// Response token that aborts any scan immediately.
    pub(crate) fast_fail: Option<&'static [u8]>,
    pub(crate) voice: bool,
}

static HAYES: Dialect = Dialect {
    init: b"AT&D0\\Q3M0E0\r",
    hangup: Hangup::Escalate {
        probe: b"AT\r",
        escape: b"+++",
        hangup: b"ATH0\r",
    },
    dial_suffix: b"",
    fast_fail: None,
    voice: true,
};

static TELIT: Dialect = Dialect {
    init: b"AT\r",
    hangup: Hangup::Direct(b"ATH\r"),
    dial_suffix: b";",
    fast_fail: Some(b"ERROR"),
    voice: false,
};

impl ModemKind {
    pub(crate) fn dialect(self) -> &'static Dialect {
        match self {
            Self::Hayes => &HAYES,
            Self::Telit => &TELIT,
        }
    }
}

/// Static configuration of one modem line.
///
/// The response scanner derives its deadlines from this: one character takes
/// `10_000_000 / baud_rate` microseconds on the wire, and `delay` is the time
/// the modem may take before it starts answering.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModemConfig {
    pub(crate) kind: ModemKind,
    pub(crate) baud_rate: u32,
    pub(crate) delay: Duration,
    pub(crate) dle_filter: bool,
    pub(crate) blocking: bool,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            kind: ModemKind::Hayes,
            baud_rate: 9600,
            delay: Duration::from_millis(100),
            dle_filter: false,
            blocking: true,
        }
    }
}

impl ModemConfig {
    #[must_use]
    pub fn new(kind: ModemKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Processing time granted to the modem on top of the transfer time of a
    /// response.
    #[must_use]
    pub const fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Drop every [`DLE`] byte the modem sends while scanning for responses.
    #[must_use]
    pub const fn dle_filter(mut self, enabled: bool) -> Self {
        self.dle_filter = enabled;
        self
    }

    #[must_use]
    pub const fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.baud_rate == 0 {
            return Err(Error::InvalidBaudRate);
        }
        Ok(())
    }

    /// Time one character occupies on the line, in microseconds (10 bit
    /// periods per byte). Never zero, so every scan makes progress towards its
    /// deadline.
    pub(crate) fn char_period_us(&self) -> u32 {
        (10_000_000 / self.baud_rate.max(1)).max(1)
    }

    pub(crate) fn delay_us(&self) -> u64 {
        self.delay.as_micros()
    }
}
