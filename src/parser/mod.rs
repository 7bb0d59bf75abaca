//! Line-oriented parsers for the formats found inside a bugreport.
//!
//! Two contracts cover every parser:
//! * [`BlockParser`] turns an already delimited block of lines into an item.
//! * [`StreamParser`] consumes lines one at a time and keeps state between
//!   them, so arbitrarily long logs are never buffered.

mod anr;
pub mod bugreport;
pub mod dumpsys;
mod header;
mod java_crash;
mod kernel;
mod logcat;
mod meminfo;
mod monkey;
mod native_crash;
mod procrank;
pub mod section;
mod system_props;
mod top;
mod traces;

pub use anr::AnrParser;
pub use bugreport::BugreportParser;
pub use header::{extract_device_info, parse_command_line, HeaderParser};
pub use java_crash::JavaCrashParser;
pub use kernel::KernelLogParser;
pub use logcat::{parse_logcat_line, CrashKind, LogLine, LogcatParser};
pub use meminfo::MemInfoParser;
pub use monkey::MonkeyLogParser;
pub use native_crash::NativeCrashParser;
pub use procrank::ProcrankParser;
pub use system_props::SystemPropsParser;
pub use top::TopParser;
pub use traces::TracesParser;

use crate::error::Result;
use section::SectionContext;
use std::io::BufRead;

/// Parser for a complete, already delimited block of lines.
///
/// Implementations keep no state between calls: the same input always
/// yields the same output, and blank or unrecognizable input yields `None`.
pub trait BlockParser {
    type Output;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<Self::Output>;
}

/// Incremental parser fed one line at a time.
///
/// An instance parses one input. Call [`clear`](StreamParser::clear) before
/// reusing it; state left over from a previous input is otherwise mixed
/// into the next result.
pub trait StreamParser {
    type Output;

    fn parse_line(&mut self, line: &str);

    /// Close still-open events and build the result, `None` if nothing was recognized
    fn finish(&mut self) -> Option<Self::Output>;

    /// Discard all accumulated state
    fn clear(&mut self);

    /// Pick up facts about the enclosing report before a section is fed
    fn configure(&mut self, _ctx: &SectionContext) {}

    fn parse<I>(&mut self, lines: I) -> Option<Self::Output>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            self.parse_line(line.as_ref());
        }
        self.finish()
    }

    /// Parse everything a reader yields, without looking ahead
    fn parse_reader<R: BufRead>(&mut self, reader: R) -> Result<Option<Self::Output>>
    where
        Self: Sized,
    {
        for_each_line(reader, |line| self.parse_line(line))?;
        Ok(self.finish())
    }
}

/// Call `f` for every line of `reader`, without the line terminator.
/// Lines that are not valid UTF-8 are skipped. Returns the number of lines read.
pub fn for_each_line<R, F>(mut reader: R, mut f: F) -> Result<usize>
where
    R: BufRead,
    F: FnMut(&str),
{
    let mut buf = Vec::with_capacity(256);
    let mut count = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        count += 1;

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }

        match std::str::from_utf8(&buf) {
            Ok(line) => f(line),
            Err(e) => log::debug!("Skipping line {}: {}", count, e),
        }
    }

    Ok(count)
}

/// Join lines with `\n`
pub(crate) fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}
