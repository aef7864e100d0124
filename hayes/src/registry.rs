use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};

use crate::{Error, Modem, ModemConfig};

/// A serial line together with the configuration of the modem behind it.
pub struct Line<T> {
    pub transport: T,
    pub config: ModemConfig,
}

impl<T> Line<T> {
    pub fn new(transport: T, config: ModemConfig) -> Self {
        Self { transport, config }
    }
}

enum Slot<T, D> {
    Vacant,
    Configured(Line<T>),
    Open(Modem<T, D>),
}

/// Fixed set of modems, addressed by their index in the table.
///
/// The table is built once from the lines present on the board. A line is
/// turned into a [`Modem`] the first time it is opened, and stays open for
/// as long as the table lives. Every modem gets its own copy of the delay
/// source.
pub struct ModemTable<T, D, const N: usize> {
    slots: [Slot<T, D>; N],
    delay: D,
}

impl<T, D, const N: usize> ModemTable<T, D, N>
where
    T: Read + ReadReady + Write,
    D: DelayNs + Clone,
{
    /// Create the table. `lines[id]` is the line of modem `id`, or `None`
    /// where no modem is fitted.
    pub fn new(delay: D, lines: [Option<Line<T>>; N]) -> Self {
        Self {
            slots: lines.map(|line| match line {
                Some(line) => Slot::Configured(line),
                None => Slot::Vacant,
            }),
            delay,
        }
    }

    /// Open modem `id`.
    ///
    /// Opening an already open modem hands out the same instance again, with
    /// its ringing and hangup flags cleared.
    ///
    /// # Panics
    ///
    /// If `id` is not below the table size `N`.
    pub fn open(&mut self, id: usize) -> Result<&mut Modem<T, D>, Error> {
        assert!(id < N, "modem id {} out of range", id);

        let slot = &mut self.slots[id];
        if let Slot::Configured(line) = slot {
            line.config.validate()?;
            if let Slot::Configured(line) = core::mem::replace(slot, Slot::Vacant) {
                *slot = Slot::Open(Modem::new(
                    line.transport,
                    self.delay.clone(),
                    line.config,
                )?);
            }
        }

        match slot {
            Slot::Open(modem) => {
                modem.reset_flags();
                Ok(modem)
            }
            _ => {
                warn!("No line configured for modem {}", id);
                Err(Error::NotConfigured)
            }
        }
    }

    /// Modem `id`, if it has been opened.
    pub fn get(&mut self, id: usize) -> Option<&mut Modem<T, D>> {
        match self.slots.get_mut(id) {
            Some(Slot::Open(modem)) => Some(modem),
            _ => None,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}
