use crate::item::{EventInfo, NativeCrashItem};
use crate::parser::{join_lines, BlockParser};
use once_cell::sync::Lazy;
use regex::Regex;

/// `*** *** *** *** *** *** *** *** *** *** *** *** *** *** *** ***`
pub(crate) static BANNER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\*\*\* \*\*\* \*\*\*").unwrap()
});

pub(crate) static FINGERPRINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Build fingerprint: '?(?P<fp>[^']*)'?\s*$").unwrap()
});

/// `pid: 3112, tid: 3112, name: Binder_1  >>> /system/bin/mediaserver <<<`
pub(crate) static PROCESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^pid: (?P<pid>\d+), tid: (?P<tid>\d+)(?:, name: .*?)?\s+>>> (?P<app>\S+) <<<",
    )
    .unwrap()
});

static SIGNAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^signal \d+ \((?P<signal>\w+)\)").unwrap()
});

static ABORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Abort message: '(?P<msg>.*)'\s*$").unwrap()
});

/// Parses a tombstone as printed by debuggerd
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCrashParser;

impl NativeCrashParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for NativeCrashParser {
    type Output = NativeCrashItem;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<NativeCrashItem> {
        let mut info = EventInfo::new(crate::item::NATIVE_CRASH);
        let mut fingerprint = None;
        let mut signal = None;
        let mut abort_message = None;
        let mut found = false;
        let mut stack: Vec<&str> = Vec::with_capacity(lines.len());

        for line in lines.iter().map(AsRef::as_ref) {
            if BANNER_RE.is_match(line) {
                continue;
            }
            stack.push(line);

            if let Some(c) = FINGERPRINT_RE.captures(line) {
                fingerprint.get_or_insert_with(|| c["fp"].to_string());
            } else if let Some(c) = PROCESS_RE.captures(line) {
                if !found {
                    info.pid = c["pid"].parse().ok();
                    info.tid = c["tid"].parse().ok();
                    info.app = Some(c["app"].to_string());
                    found = true;
                }
            } else if let Some(c) = SIGNAL_RE.captures(line) {
                signal.get_or_insert_with(|| c["signal"].to_string());
            } else if let Some(c) = ABORT_RE.captures(line) {
                abort_message.get_or_insert_with(|| c["msg"].to_string());
            }
        }

        if !found {
            return None;
        }

        info.stack = join_lines(&stack);

        Some(NativeCrashItem {
            info,
            fingerprint,
            signal,
            abort_message,
        })
    }
}
