//! Logcat stream aggregation: multi-line crash reports are stitched back
//! together per `(pid, tid, tag)` even when other processes interleave.

use crate::item::{EventInfo, LogcatEvent, LogcatItem, MiscLogcatItem, ANR, JAVA_CRASH, NATIVE_CRASH};
use crate::parser::anr::{AnrParser, ANR_START_RE};
use crate::parser::java_crash::{
    JavaCrashParser, BEGIN_EXCEPTION, END_EXCEPTION, EXCEPTION_RE, FATAL_RE, PID_RE,
    PROCESS_RE, SYSTEM_PROCESS_RE,
};
use crate::parser::native_crash::{self, NativeCrashParser, BANNER_RE, FINGERPRINT_RE};
use crate::parser::section::SectionContext;
use crate::parser::{BlockParser, StreamParser};
use crate::patterns::{LineContext, LineMatcher, PatternRegistry};
use crate::time::{parse_month_day_time, TimeAnchor};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{HashMap, VecDeque};

pub const HIGH_CPU_USAGE: &str = "HIGH_CPU_USAGE";
pub const HIGH_MEMORY_USAGE: &str = "HIGH_MEMORY_USAGE";
pub const RUNTIME_RESTART: &str = "RUNTIME_RESTART";

/// Lines kept for building preambles
const MAX_BUFFER_SIZE: usize = 500;

/// Lines in each preamble
const DEFAULT_PREAMBLE_SIZE: usize = 15;

/// Logcat line regex (threadtime format), with optional uid column
pub static LOGCAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<date>\d{2}-\d{2})\s+(?P<time>\d{2}:\d{2}:\d{2}\.\d{3})\s+(?:(?P<uid>\S+)\s+)?(?P<pid>\d+)\s+(?P<tid>\d+)\s+(?P<level>[VDIWEFA])\s+(?P<tag>[^:]+?)\s*:\s?(?P<msg>.*)$"
    ).unwrap()
});

/// Logcat line regex (time format), no tid
pub static LOGCAT_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<date>\d{2}-\d{2})\s+(?P<time>\d{2}:\d{2}:\d{2}\.\d{3})\s+(?P<level>[VDIWEFA])/(?P<tag>[^(]+?)\s*\(\s*(?P<pid>\d+)\):\s?(?P<msg>.*)$"
    ).unwrap()
});

static ANR_CONTINUATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\s|PID:|Reason:|Parent:|Frozen:|Load:|Subject:|ErrorId:|Foreground:|Package is |CPU usage |[\d.]+% )"
    ).unwrap()
});

static JAVA_FRAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:at |Caused by:|Suppressed:|\.\.\. \d+ more)").unwrap()
});

static MAIN_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Calling main entry (?P<app>\S+)").unwrap()
});

/// One parsed logcat line, borrowing from the input
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine<'a> {
    pub date: &'a str,
    pub time: &'a str,
    pub uid: Option<&'a str>,
    pub pid: i32,
    pub tid: Option<i32>,
    pub level: &'a str,
    pub tag: &'a str,
    pub msg: &'a str,
}

fn group<'h>(c: &Captures<'h>, name: &str) -> &'h str {
    c.name(name).map_or("", |m| m.as_str())
}

fn parse_id(s: &str) -> Option<i32> {
    match s.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            log::debug!("Skipping logcat line with id '{}': {}", s, e);
            None
        }
    }
}

/// Parse a single logcat line in threadtime or time format
pub fn parse_logcat_line(line: &str) -> Option<LogLine<'_>> {
    if let Some(c) = LOGCAT_RE.captures(line) {
        return Some(LogLine {
            date: group(&c, "date"),
            time: group(&c, "time"),
            uid: c.name("uid").map(|m| m.as_str()),
            pid: parse_id(group(&c, "pid"))?,
            tid: Some(parse_id(group(&c, "tid"))?),
            level: group(&c, "level"),
            tag: group(&c, "tag"),
            msg: group(&c, "msg"),
        });
    }

    let c = LOGCAT_TIME_RE.captures(line)?;
    Some(LogLine {
        date: group(&c, "date"),
        time: group(&c, "time"),
        uid: None,
        pid: parse_id(group(&c, "pid"))?,
        tid: None,
        level: group(&c, "level"),
        tag: group(&c, "tag"),
        msg: group(&c, "msg"),
    })
}

const THREAD_SEPARATOR: &str = "--- --- ---";

/// Multi-line event families recognized in logcat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrashKind {
    Anr,
    JavaCrash,
    NativeCrash,
}

impl CrashKind {
    /// Line that always begins a new event
    fn is_start(self, msg: &str) -> bool {
        match self {
            CrashKind::Anr => ANR_START_RE.is_match(msg),
            CrashKind::JavaCrash => {
                FATAL_RE.is_match(msg)
                    || SYSTEM_PROCESS_RE.is_match(msg)
                    || msg.trim() == BEGIN_EXCEPTION
            }
            CrashKind::NativeCrash => BANNER_RE.is_match(msg),
        }
    }

    /// Line that may begin an event when none is open for its key
    fn can_open(self, msg: &str) -> bool {
        self.is_start(msg)
            || match self {
                CrashKind::Anr => false,
                CrashKind::JavaCrash => EXCEPTION_RE.is_match(msg) || PROCESS_RE.is_match(msg),
                CrashKind::NativeCrash => {
                    FINGERPRINT_RE.is_match(msg) || native_crash::PROCESS_RE.is_match(msg)
                }
            }
    }

    fn continues(self, pending: &PendingEvent, msg: &str) -> bool {
        match self {
            CrashKind::Anr => ANR_CONTINUATION_RE.is_match(msg),
            CrashKind::JavaCrash if pending.seen_exception => JAVA_FRAME_RE.is_match(msg),
            CrashKind::JavaCrash => {
                msg.trim().is_empty()
                    || PROCESS_RE.is_match(msg)
                    || PID_RE.is_match(msg)
                    || EXCEPTION_RE.is_match(msg)
            }
            // A second process header starts the next tombstone, unless it
            // follows a `--- --- ---` thread separator of the same dump
            CrashKind::NativeCrash if pending.seen_process => {
                let after_separator = pending
                    .messages
                    .last()
                    .map_or(false, |m| m.trim_start().starts_with(THREAD_SEPARATOR));
                !FINGERPRINT_RE.is_match(msg)
                    && (after_separator || !native_crash::PROCESS_RE.is_match(msg))
            }
            CrashKind::NativeCrash => true,
        }
    }

    /// Line that closes the event it belongs to
    fn is_end(self, msg: &str) -> bool {
        self == CrashKind::JavaCrash && msg.trim() == END_EXCEPTION
    }
}

/// `(level, tag)` pair whose lines feed a multi-line event
#[derive(Debug, Clone)]
struct CrashTag {
    level: String,
    tag: String,
    kind: CrashKind,
    category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AccumulatorKey {
    pid: i32,
    tid: Option<i32>,
    crash_tag: usize,
}

#[derive(Debug, Clone)]
struct PendingEvent {
    seq: u64,
    kind: CrashKind,
    category: String,
    pid: i32,
    tid: Option<i32>,
    tag: String,
    time: Option<NaiveDateTime>,
    last_preamble: String,
    process_preamble: String,
    messages: Vec<String>,
    seen_exception: bool,
    seen_process: bool,
}

impl PendingEvent {
    fn push(&mut self, msg: &str) {
        match self.kind {
            CrashKind::JavaCrash if !self.seen_exception && EXCEPTION_RE.is_match(msg) => {
                self.seen_exception = true;
            }
            CrashKind::NativeCrash if native_crash::PROCESS_RE.is_match(msg) => {
                self.seen_process = true;
            }
            _ => {}
        }
        self.messages.push(msg.to_string());
    }
}

static CPU_PEGGED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.* timed out \(is the CPU pegged\?\).*$").unwrap()
});

static BUFFER_LOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^GetBufferLock timed out for thread \d+ buffer .*$").unwrap()
});

static WATCHDOG_KILL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\*\*\* WATCHDOG KILLING SYSTEM PROCESS.*$").unwrap()
});

/// Stream parser for a logcat dump
#[derive(Debug, Clone)]
pub struct LogcatParser {
    anchor: TimeAnchor,
    explicit_anchor: bool,
    preamble_size: usize,
    crash_tags: Vec<CrashTag>,
    patterns: PatternRegistry,

    capturing: bool,
    seen_line: bool,
    start_time: Option<NaiveDateTime>,
    stop_time: Option<NaiveDateTime>,
    ring: VecDeque<(i32, String)>,
    open: HashMap<AccumulatorKey, PendingEvent>,
    done: Vec<(u64, LogcatEvent)>,
    main_entries: HashMap<i32, String>,
    next_seq: u64,
}

impl Default for LogcatParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogcatParser {
    /// Parser with the default crash tags and category rules.
    /// Timestamps get the current year unless configured otherwise.
    pub fn new() -> Self {
        let mut parser = Self {
            anchor: TimeAnchor::from_parts(None, None),
            explicit_anchor: false,
            preamble_size: DEFAULT_PREAMBLE_SIZE,
            crash_tags: Vec::new(),
            patterns: PatternRegistry::new(),
            capturing: true,
            seen_line: false,
            start_time: None,
            stop_time: None,
            ring: VecDeque::with_capacity(MAX_BUFFER_SIZE),
            open: HashMap::new(),
            done: Vec::new(),
            main_entries: HashMap::new(),
            next_seq: 0,
        };

        parser
            .add_java_crash_tag("E", "AndroidRuntime", JAVA_CRASH)
            .add_native_crash_tag("I", "DEBUG", NATIVE_CRASH)
            .add_native_crash_tag("F", "DEBUG", NATIVE_CRASH)
            .add_anr_tag("E", "ActivityManager", ANR);

        parser.patterns
            .add_tagged_pattern(
                Some(LineMatcher::Regex(CPU_PEGGED_RE.clone())),
                Some("W"),
                None,
                HIGH_CPU_USAGE,
            )
            .add_tagged_pattern(
                Some(LineMatcher::Regex(BUFFER_LOCK_RE.clone())),
                Some("E"),
                None,
                HIGH_MEMORY_USAGE,
            )
            .add_tagged_pattern(
                Some(LineMatcher::Regex(WATCHDOG_KILL_RE.clone())),
                Some("W"),
                Some("Watchdog"),
                RUNTIME_RESTART,
            );

        parser
    }

    /// Give every `MM-DD` timestamp this year
    pub fn with_year(mut self, year: i32) -> Self {
        self.anchor = TimeAnchor {
            tz: chrono_tz::UTC,
            year,
            report_date: None,
        };
        self.explicit_anchor = true;
        self
    }

    /// Pick each timestamp's year as the one closest to `date`
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.anchor = TimeAnchor::from_parts(None, Some(date));
        self.explicit_anchor = true;
        self
    }

    /// Number of lines in `last_preamble` and `process_preamble`
    pub fn with_preamble_size(mut self, size: usize) -> Self {
        self.preamble_size = size.min(MAX_BUFFER_SIZE);
        self
    }

    /// Report single lines matching the given constraints as misc events
    pub fn add_pattern(
        &mut self,
        matcher: Option<LineMatcher>,
        level: Option<&str>,
        tag: Option<&str>,
        category: &str,
    ) -> &mut Self {
        self.patterns.add_tagged_pattern(matcher, level, tag, category);
        self
    }

    pub fn add_crash_tag(&mut self, level: &str, tag: &str, kind: CrashKind, category: &str) -> &mut Self {
        self.crash_tags.push(CrashTag {
            level: level.to_string(),
            tag: tag.to_string(),
            kind,
            category: category.to_string(),
        });
        self
    }

    pub fn add_java_crash_tag(&mut self, level: &str, tag: &str, category: &str) -> &mut Self {
        self.add_crash_tag(level, tag, CrashKind::JavaCrash, category)
    }

    pub fn add_native_crash_tag(&mut self, level: &str, tag: &str, category: &str) -> &mut Self {
        self.add_crash_tag(level, tag, CrashKind::NativeCrash, category)
    }

    pub fn add_anr_tag(&mut self, level: &str, tag: &str, category: &str) -> &mut Self {
        self.add_crash_tag(level, tag, CrashKind::Anr, category)
    }

    fn crash_tag_index(&self, level: &str, tag: &str) -> Option<usize> {
        self.crash_tags
            .iter()
            .position(|t| t.level == level && t.tag == tag)
    }

    fn handle_logcat(&mut self, raw: &str, line: LogLine<'_>) {
        let ts = format!("{} {}", line.date, line.time);
        // A date that does not exist in the anchor year keeps the line, untimed
        let time = match parse_month_day_time(&ts, &self.anchor) {
            Ok(t) => {
                self.start_time.get_or_insert(t);
                self.stop_time = Some(t);
                Some(t)
            }
            Err(e) => {
                log::debug!("Keeping logcat line without a time: {}", e);
                None
            }
        };

        self.seen_line = true;

        if !self.capturing {
            return;
        }

        if line.tag == "ShutdownThread" && line.msg.starts_with("Rebooting") {
            self.discard_open("reboot");
            self.capturing = false;
            return;
        }

        if line.tag == "AndroidRuntime" {
            if let Some(c) = MAIN_ENTRY_RE.captures(line.msg) {
                self.main_entries.insert(line.pid, c["app"].to_string());
            }
        }

        let consumed = match self.crash_tag_index(line.level, line.tag) {
            Some(idx) => self.accumulate(idx, &line, time),
            None => false,
        };

        if !consumed {
            let ctx = LineContext::new(line.level, line.tag);
            if let Some(category) = self.patterns.classify_with(line.msg, &ctx) {
                let category = category.to_string();
                self.push_misc(category, &line, time);
            }
        }

        self.push_ring(line.pid, raw);
    }

    /// Feed a crash-tag line to its accumulator. Returns false if the line
    /// neither continued nor opened an event.
    fn accumulate(&mut self, idx: usize, line: &LogLine<'_>, time: Option<NaiveDateTime>) -> bool {
        let kind = self.crash_tags[idx].kind;
        let key = AccumulatorKey {
            pid: line.pid,
            tid: line.tid,
            crash_tag: idx,
        };

        if let Some(pending) = self.open.get_mut(&key) {
            if kind.is_end(line.msg) {
                pending.push(line.msg);
                self.finalize(&key);
                return true;
            }
            if !kind.is_start(line.msg) && kind.continues(pending, line.msg) {
                pending.push(line.msg);
                return true;
            }
            // Cutoff: the line does not belong to the open event
            self.finalize(&key);
        }

        if !kind.can_open(line.msg) {
            return false;
        }

        let (last_preamble, process_preamble) = self.preambles(line.pid);
        let mut pending = PendingEvent {
            seq: self.take_seq(),
            kind,
            category: self.crash_tags[idx].category.clone(),
            pid: line.pid,
            tid: line.tid,
            tag: line.tag.to_string(),
            time,
            last_preamble,
            process_preamble,
            messages: Vec::new(),
            seen_exception: false,
            seen_process: false,
        };
        pending.push(line.msg);
        self.open.insert(key, pending);
        true
    }

    fn finalize(&mut self, key: &AccumulatorKey) {
        let pending = match self.open.remove(key) {
            Some(p) => p,
            None => return,
        };

        let event = match pending.kind {
            CrashKind::Anr => AnrParser.parse(&pending.messages).map(LogcatEvent::Anr),
            CrashKind::JavaCrash => JavaCrashParser.parse(&pending.messages).map(LogcatEvent::JavaCrash),
            CrashKind::NativeCrash => NativeCrashParser.parse(&pending.messages).map(LogcatEvent::NativeCrash),
        };

        let mut event = match event {
            Some(e) => e,
            None => {
                log::debug!(
                    "Dropping unrecognized {:?} block of {} lines at {:?}",
                    pending.kind,
                    pending.messages.len(),
                    pending.time
                );
                return;
            }
        };

        let is_java = matches!(event, LogcatEvent::JavaCrash(_));
        let info = event.info_mut();
        info.category = pending.category;
        info.event_time = pending.time;
        info.tag = Some(pending.tag);
        info.last_preamble = pending.last_preamble;
        info.process_preamble = pending.process_preamble;
        if info.pid.is_none() {
            info.pid = Some(pending.pid);
            info.tid = pending.tid;
        }
        if is_java {
            if let Some(app) = info.pid.and_then(|pid| self.main_entries.get(&pid)) {
                info.app = Some(app.clone());
            }
        }

        self.done.push((pending.seq, event));
    }

    fn push_misc(&mut self, category: String, line: &LogLine<'_>, time: Option<NaiveDateTime>) {
        let (last_preamble, process_preamble) = self.preambles(line.pid);
        let info = EventInfo {
            category,
            event_time: time,
            pid: Some(line.pid),
            tid: line.tid,
            app: None,
            tag: Some(line.tag.to_string()),
            last_preamble,
            process_preamble,
            stack: line.msg.to_string(),
        };
        let seq = self.take_seq();
        self.done.push((seq, LogcatEvent::Misc(MiscLogcatItem { info })));
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn push_ring(&mut self, pid: i32, raw: &str) {
        if self.ring.len() == MAX_BUFFER_SIZE {
            self.ring.pop_front();
        }
        self.ring.push_back((pid, raw.to_string()));
    }

    /// `(last_preamble, process_preamble)` for an event starting now
    fn preambles(&self, pid: i32) -> (String, String) {
        let mut last: Vec<&str> = self
            .ring
            .iter()
            .rev()
            .take(self.preamble_size)
            .map(|(_, l)| l.as_str())
            .collect();
        last.reverse();

        let mut process: Vec<&str> = self
            .ring
            .iter()
            .rev()
            .filter(|(p, _)| *p == pid)
            .take(self.preamble_size)
            .map(|(_, l)| l.as_str())
            .collect();
        process.reverse();

        (last.join("\n"), process.join("\n"))
    }

    fn discard_open(&mut self, reason: &str) {
        if !self.open.is_empty() {
            log::debug!("Discarding {} open events at {}", self.open.len(), reason);
            self.open.clear();
        }
    }

    fn handle_other(&mut self, raw: &str) {
        let interrupted = raw.contains("logcat interrupted");
        let resumed = !self.capturing && raw.contains("--------- beginning of");
        if interrupted || resumed {
            self.discard_open("log interruption");
            self.ring.clear();
            self.capturing = true;
        }
    }
}

impl StreamParser for LogcatParser {
    type Output = LogcatItem;

    fn parse_line(&mut self, line: &str) {
        match parse_logcat_line(line) {
            Some(parsed) => self.handle_logcat(line, parsed),
            None => self.handle_other(line),
        }
    }

    fn finish(&mut self) -> Option<LogcatItem> {
        let mut keys: Vec<AccumulatorKey> = self.open.keys().cloned().collect();
        keys.sort_by_key(|k| self.open.get(k).map(|p| p.seq));
        for key in keys {
            self.finalize(&key);
        }

        if !self.seen_line {
            return None;
        }

        let mut events = std::mem::take(&mut self.done);
        events.sort_by_key(|(seq, _)| *seq);

        Some(LogcatItem {
            start_time: self.start_time,
            stop_time: self.stop_time,
            events: events.into_iter().map(|(_, e)| e).collect(),
        })
    }

    fn clear(&mut self) {
        self.capturing = true;
        self.seen_line = false;
        self.start_time = None;
        self.stop_time = None;
        self.ring.clear();
        self.open.clear();
        self.done.clear();
        self.main_entries.clear();
        self.next_seq = 0;
    }

    fn configure(&mut self, ctx: &SectionContext) {
        if self.explicit_anchor {
            return;
        }
        if let Some(date) = ctx.reference_date {
            self.anchor = TimeAnchor::from_parts(None, Some(date));
        }
    }
}
