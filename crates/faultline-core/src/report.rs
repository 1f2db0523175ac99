//! Abort report formatting.
//!
//! Every line goes through a [`fmt::Write`] sink so the ABI layer can render
//! into a fixed stack buffer and hand raw bytes to `write(2)`, while tests
//! render into a `String`.
//!
//! Given identifier `7` the report reads:
//!
//! ```text
//! [7] Abort: Signal USR2
//! [7] Abort: Obtained 2 stack frames
//! [7]    harness(trigger+0x1d) [0x55d0c2a1b2cd]
//! [7]    libc.so.6(+0x29d90) [0x7f3a1c029d90]
//! ```
//!
//! Without an identifier the `"[7] "` prefix is omitted.

use std::fmt;

/// Upper bound on captured return addresses.
pub const MAX_FRAMES: usize = 64;

/// Line prefix derived from the optional process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix(pub Option<u32>);

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "[{id}] "),
            None => Ok(()),
        }
    }
}

/// Strips a symbol string down to the part after its last `/`.
#[must_use]
pub fn frame_label(symbol: &str) -> &str {
    match symbol.rfind('/') {
        Some(slash) => &symbol[slash + 1..],
        None => symbol,
    }
}

/// `"<prefix>Abort: Signal <mnemonic>"`.
pub fn write_signal_notice<W: fmt::Write>(
    out: &mut W,
    identifier: Option<u32>,
    mnemonic: &str,
) -> fmt::Result {
    writeln!(out, "{}Abort: Signal {mnemonic}", Prefix(identifier))
}

/// `"<prefix>Abort: <reason>"`, emitted ahead of a fatal check's abort.
pub fn write_fatal_notice<W: fmt::Write>(
    out: &mut W,
    identifier: Option<u32>,
    reason: &dyn fmt::Display,
) -> fmt::Result {
    writeln!(out, "{}Abort: {reason}", Prefix(identifier))
}

/// `"<prefix>Abort: Obtained <count> stack frames"`.
pub fn write_frame_header<W: fmt::Write>(
    out: &mut W,
    identifier: Option<u32>,
    count: usize,
) -> fmt::Result {
    writeln!(out, "{}Abort: Obtained {count} stack frames", Prefix(identifier))
}

/// `"<prefix>   <symbol>"`, with the symbol's directories stripped.
pub fn write_frame_line<W: fmt::Write>(
    out: &mut W,
    identifier: Option<u32>,
    symbol: &str,
) -> fmt::Result {
    writeln!(out, "{}   {}", Prefix(identifier), frame_label(symbol))
}

/// Header followed by one line per frame.
pub fn write_backtrace<W, S>(out: &mut W, identifier: Option<u32>, frames: &[S]) -> fmt::Result
where
    W: fmt::Write,
    S: AsRef<str>,
{
    write_frame_header(out, identifier, frames.len())?;
    for frame in frames {
        write_frame_line(out, identifier, frame.as_ref())?;
    }
    Ok(())
}
