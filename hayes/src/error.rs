/// Errors returned by the crate
///
/// Command operations on an open [`Modem`](crate::Modem) never fail with an
/// error: a timeout, a declined command and a malformed reply all read as a
/// negative result. These variants only cover setting a line up.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No line is configured for the requested id
    NotConfigured,
    /// The line configuration carries a zero baud rate
    InvalidBaudRate,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConfigured => f.write_str("no line configured for this modem id"),
            Self::InvalidBaudRate => f.write_str("line speed must be non-zero"),
        }
    }
}
