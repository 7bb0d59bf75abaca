use crate::item::{ProcessTrace, TracesItem};
use crate::parser::BlockParser;
use crate::time::parse_datetime;
use once_cell::sync::Lazy;
use regex::Regex;

/// `----- pid 2887 at 2012-04-25 17:17:08 -----`
static PROCESS_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^----- pid (?P<pid>\d+) at (?P<time>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) -----$").unwrap()
});

static PROCESS_END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^----- end \d+ -----$").unwrap()
});

static CMD_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Cmd line: (?P<app>.*?)\s*$").unwrap()
});

/// Parses the `VM TRACES` dumps written when an ANR is raised
#[derive(Debug, Clone, Copy, Default)]
pub struct TracesParser;

impl TracesParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for TracesParser {
    type Output = TracesItem;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<TracesItem> {
        let mut processes = Vec::new();
        let mut current: Option<ProcessTrace> = None;
        let mut main_stack: Option<Vec<&str>> = None;

        for line in lines.iter().map(AsRef::as_ref) {
            let line = line.trim_end();

            if let Some(c) = PROCESS_START_RE.captures(line) {
                if let Some(open) = current.take() {
                    processes.push(close(open, main_stack.take()));
                }
                current = c["pid"].parse().ok().map(|pid| ProcessTrace {
                    pid,
                    time: parse_datetime(&c["time"]),
                    app: None,
                    stack: None,
                });
                main_stack = None;
                continue;
            }

            let trace = match current.as_mut() {
                Some(t) => t,
                None => continue,
            };

            if PROCESS_END_RE.is_match(line) {
                if let Some(open) = current.take() {
                    processes.push(close(open, main_stack.take()));
                }
                continue;
            }

            if let Some(stack) = main_stack.as_mut() {
                if line.is_empty() {
                    trace.stack = Some(stack.join("\n"));
                    main_stack = None;
                } else {
                    stack.push(line);
                }
            } else if trace.stack.is_none() && line.starts_with("\"main\" ") {
                main_stack = Some(vec![line]);
            } else if let Some(c) = CMD_LINE_RE.captures(line) {
                trace.app.get_or_insert_with(|| c["app"].to_string());
            }
        }

        if let Some(open) = current.take() {
            processes.push(close(open, main_stack.take()));
        }

        (!processes.is_empty()).then_some(TracesItem { processes })
    }
}

/// Finish a process dump whose main stack may still be open
fn close(mut trace: ProcessTrace, main_stack: Option<Vec<&str>>) -> ProcessTrace {
    if let Some(stack) = main_stack {
        trace.stack = Some(stack.join("\n"));
    }
    trace
}
