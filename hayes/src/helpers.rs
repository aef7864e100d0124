use core::fmt::Write as _;

use heapless::String;
use nom::{
    character::complete::{i32 as signed, multispace0},
    combinator::opt,
    sequence::preceded,
    IResult,
};

/// Wraps a byte slice so it can be logged as text when it is valid UTF-8,
/// and as raw bytes otherwise.
pub struct LossyStr<'a>(pub &'a [u8]);

impl core::fmt::Debug for LossyStr<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match core::str::from_utf8(self.0) {
            Ok(s) => write!(f, "{:?}", s),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LossyStr<'_> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=[u8]:a}", self.0)
    }
}

/// Substring search over raw bytes. An empty `needle` never matches.
pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack
            .windows(needle.len())
            .any(|window| window == needle)
}

/// Position of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn leading_integer(input: &[u8]) -> IResult<&[u8], Option<i32>> {
    opt(preceded(multispace0, signed))(input)
}

/// Parses the leading decimal integer of `input` the way the modem firmware
/// reports it: leading whitespace is skipped, parsing stops at the first
/// non-digit and anything unparsable reads as zero.
pub(crate) fn atoi(input: &[u8]) -> i32 {
    leading_integer(input)
        .ok()
        .and_then(|(_, value)| value)
        .unwrap_or(0)
}

/// Decimal rendering of an index or length for use inside an AT command.
pub(crate) fn decimal(value: u32) -> String<10> {
    let mut digits = String::new();
    // u32::MAX is ten digits long, this cannot overflow
    let _ = write!(digits, "{}", value);
    digits
}
