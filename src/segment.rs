//! Line segmentation over a byte stream.
//!
//! A sequential scan with no concurrency: each `\n`-terminated line is handed
//! to a callback with the delimiter stripped. The scan reports how it ended so
//! a read failure is never mistaken for a clean end of input.
//!
//! A final line without a trailing `\n` is not delivered. Input is expected to
//! be delimiter-terminated; the dropped tail is logged at `debug`.

use std::io::BufRead;
use std::ops::ControlFlow;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// How a segmentation scan ended.
#[derive(Debug)]
pub enum SegmentEnd {
    /// The stream reached end of input.
    EndOfStream { lines: usize },
    /// A read failed. `lines` were delivered before the failure.
    ReadFailure {
        lines: usize,
        source: std::io::Error,
    },
    /// The callback asked the scan to stop. The line it refused is not
    /// counted.
    Stopped { lines: usize },
}

impl SegmentEnd {
    /// Number of lines the callback accepted.
    pub fn lines(&self) -> usize {
        match self {
            SegmentEnd::EndOfStream { lines }
            | SegmentEnd::ReadFailure { lines, .. }
            | SegmentEnd::Stopped { lines } => *lines,
        }
    }

    /// Convert into a `Result`, surfacing a read failure as [`Error::ReadFailure`].
    pub fn into_result(self) -> Result<usize> {
        match self {
            SegmentEnd::EndOfStream { lines } | SegmentEnd::Stopped { lines } => Ok(lines),
            SegmentEnd::ReadFailure { lines, source } => Err(Error::ReadFailure {
                line: lines,
                source,
            }),
        }
    }
}

/// Invoke `on_line` once per line of `reader`, in stream order.
///
/// Only the trailing `\n` is stripped; a preceding `\r` is kept. A line that
/// is not valid UTF-8 ends the scan with [`SegmentEnd::ReadFailure`].
pub fn for_each_line<R, F>(mut reader: R, mut on_line: F) -> SegmentEnd
where
    R: BufRead,
    F: FnMut(String) -> ControlFlow<()>,
{
    let mut lines = 0;
    let mut buf = String::new();

    loop {
        buf.clear();
        match reader.read_line(&mut buf) {
            Ok(0) => return SegmentEnd::EndOfStream { lines },
            Ok(_) => {
                if buf.pop() != Some('\n') {
                    debug!(lines, "dropping unterminated final line");
                    return SegmentEnd::EndOfStream { lines };
                }
                if on_line(std::mem::take(&mut buf)).is_break() {
                    return SegmentEnd::Stopped { lines };
                }
                lines += 1;
            }
            Err(source) => {
                warn!(lines, error = %source, "segmenter read failed");
                return SegmentEnd::ReadFailure { lines, source };
            }
        }
    }
}

/// Collect every line of `reader`, failing on a read error.
pub fn collect_lines<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for_each_line(reader, |line| {
        out.push(line);
        ControlFlow::Continue(())
    })
    .into_result()?;
    Ok(out)
}
