//! Raw line output.

use std::io::{self, Write};

/// Writes literal text to a destination.
///
/// The sink writes raw bytes with no format interpretation, so arbitrary
/// text — including `%` characters — reaches the output unchanged.
#[derive(Debug)]
pub struct OutputWriter<W: Write> {
    inner: W,
}

impl<W: Write> OutputWriter<W> {
    /// Wraps a destination.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Copies `line` to the destination verbatim. The line carries its own
    /// terminator, as produced by `BufRead::read_line`.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.inner.write_all(line.as_bytes())
    }

    /// Flushes the destination.
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Unwraps the destination.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
