use crate::item::{EventInfo, JavaCrashItem};
use crate::parser::{join_lines, BlockParser};
use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) const BEGIN_EXCEPTION: &str = "----- begin exception -----";
pub(crate) const END_EXCEPTION: &str = "----- end exception -----";

pub(crate) static SYSTEM_PROCESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\*\*\* FATAL EXCEPTION IN SYSTEM PROCESS: ?(?P<thread>.*)$").unwrap()
});

pub(crate) static FATAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^FATAL EXCEPTION: ?(?P<thread>.*)$").unwrap()
});

pub(crate) static PROCESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Process: (?P<app>[^,\s]+), PID: (?P<pid>\d+)").unwrap()
});

pub(crate) static PID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^PID: (?P<pid>\d+)\s*$").unwrap());

/// Dotted class name, optionally followed by `: message`
pub(crate) static EXCEPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<exception>[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)+)(?::\s?(?P<message>.*))?$",
    )
    .unwrap()
});

/// Parses an uncaught Java exception report
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaCrashParser;

impl JavaCrashParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for JavaCrashParser {
    type Output = JavaCrashItem;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<JavaCrashItem> {
        let mut info = EventInfo::new(crate::item::JAVA_CRASH);
        let mut exception = None;
        let mut message = None;
        let mut stack: Vec<&str> = Vec::new();

        for line in lines.iter().map(AsRef::as_ref) {
            let trimmed = line.trim();
            if trimmed == BEGIN_EXCEPTION || trimmed == END_EXCEPTION {
                continue;
            }

            if exception.is_some() {
                stack.push(line);
                continue;
            }

            // Header lines ahead of the exception
            if SYSTEM_PROCESS_RE.is_match(line) {
                info.app = Some("system_server".to_string());
            } else if let Some(c) = PROCESS_RE.captures(line) {
                info.app = Some(c["app"].to_string());
                info.pid = c["pid"].parse().ok();
            } else if let Some(c) = PID_RE.captures(line) {
                info.pid = c["pid"].parse().ok();
            } else if let Some(c) = EXCEPTION_RE.captures(line) {
                exception = Some(c["exception"].to_string());
                message = c.name("message").map(|m| m.as_str().to_string());
                stack.push(line);
            }
        }

        let exception = exception?;
        info.stack = join_lines(&stack);

        Some(JavaCrashItem {
            info,
            exception: Some(exception),
            message,
        })
    }
}
