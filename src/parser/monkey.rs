use crate::item::{
    AnrItem, DroppedCategory, EventInfo, JavaCrashItem, MonkeyCrash, MonkeyLogItem,
    NativeCrashItem, ANR, JAVA_CRASH, NATIVE_CRASH,
};
use crate::parser::native_crash::BANNER_RE;
use crate::parser::{
    join_lines, AnrParser, BlockParser, JavaCrashParser, NativeCrashParser, StreamParser,
    TracesParser,
};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

/// `# Wednesday, 04/25/2012 01:37:12 AM - device uptime = 242.13: Monkey command used for this test:`
static START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^# (?P<date>.+?) - device uptime = (?P<uptime>\d+(?:\.\d+)?): Monkey command used for this test:",
    )
    .unwrap()
});

static STOP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^# (?P<date>.+?) - device uptime = (?P<uptime>\d+(?:\.\d+)?): Monkey command ran for: (?P<mm>\d+):(?P<ss>\d+) \(mm:ss\)",
    )
    .unwrap()
});

static THROTTLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"--throttle (?P<ms>\d+)").unwrap());

static SEED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^:Monkey: seed=(?P<seed>-?\d+) count=(?P<count>\d+)").unwrap()
});

static PACKAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:AllowPackage: (?P<name>\S+)").unwrap());

static CATEGORY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:IncludeCategory: (?P<name>\S+)").unwrap());

static PROGRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*// Sending event #(?P<n>\d+)").unwrap());

static INJECTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Events injected: (?P<n>\d+)").unwrap());

/// `:Dropped: keys=0 pointers=0 trackballs=0 flips=0 rotations=0`
static DROPPED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:Dropped:(?P<rest>.*)$").unwrap());

static DROPPED_PART_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?P<name>\w+)=(?P<n>\d+)").unwrap());

static NOT_RESPONDING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^// NOT RESPONDING: (?P<app>\S+) \(pid (?P<pid>-?\d+)\)").unwrap()
});

static CRASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^// CRASH: (?P<app>\S+) \(pid (?P<pid>-?\d+)\)").unwrap()
});

const COMMAND_PREFIX: &str = "adb shell monkey";
const FINISHED: &str = "// Monkey finished";
const NO_ACTIVITIES: &str = "** No activities found to run, monkey aborted.";
const NEW_NATIVE_CRASH: &str = "New native crash detected";
const TRACES_START: &str = "anr traces:";
const TRACES_END: &str = "// anr traces status was";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Anr,
    Crash,
    EmptyNative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Lines of the ANR report or the `//` crash dump
    Report,
    /// ANR report done, traces not reached yet
    AwaitTraces,
    Traces,
    Closed,
}

#[derive(Debug, Clone)]
struct PendingCrash {
    kind: PendingKind,
    app: Option<String>,
    pid: Option<i32>,
    stage: Stage,
    lines: Vec<String>,
    trace_lines: Vec<String>,
}

impl PendingCrash {
    fn start(line: &str) -> Option<Self> {
        let (kind, c) = if let Some(c) = NOT_RESPONDING_RE.captures(line) {
            (PendingKind::Anr, Some(c))
        } else if let Some(c) = CRASH_RE.captures(line) {
            (PendingKind::Crash, Some(c))
        } else if line.trim_start().starts_with("**") && line.contains(NEW_NATIVE_CRASH) {
            (PendingKind::EmptyNative, None)
        } else {
            return None;
        };

        Some(Self {
            kind,
            app: c.as_ref().map(|c| c["app"].to_string()),
            // Monkey prints pid 0 when it could not tell
            pid: c
                .as_ref()
                .and_then(|c| c["pid"].parse().ok())
                .filter(|pid: &i32| *pid > 0),
            stage: if kind == PendingKind::EmptyNative {
                Stage::Closed
            } else {
                Stage::Report
            },
            lines: Vec::new(),
            trace_lines: Vec::new(),
        })
    }

    fn push(&mut self, line: &str) {
        match (self.kind, self.stage) {
            (_, Stage::Closed) => {}
            (PendingKind::Anr, Stage::Report) => {
                if line.trim().is_empty() {
                    self.stage = Stage::AwaitTraces;
                } else {
                    self.lines.push(line.to_string());
                }
            }
            (PendingKind::Anr, Stage::AwaitTraces) => {
                if line.trim() == TRACES_START {
                    self.stage = Stage::Traces;
                }
            }
            (PendingKind::Anr, Stage::Traces) => {
                if line.starts_with(TRACES_END) {
                    self.stage = Stage::Closed;
                } else {
                    self.trace_lines.push(line.to_string());
                }
            }
            // Crash dumps are `//` lines; monkey's own output may be mixed in
            (_, _) => {
                if let Some(rest) = line.strip_prefix("//") {
                    self.lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
                } else if line.starts_with("** ") {
                    self.stage = Stage::Closed;
                }
            }
        }
    }

    fn build(self) -> MonkeyCrash {
        let kind = self.kind;
        match kind {
            PendingKind::Anr => MonkeyCrash::Anr(self.build_anr()),
            PendingKind::Crash if self.is_native() => MonkeyCrash::NativeCrash(self.build_native()),
            PendingKind::Crash => MonkeyCrash::JavaCrash(self.build_java()),
            PendingKind::EmptyNative => MonkeyCrash::NativeCrash(self.build_native()),
        }
    }

    fn is_native(&self) -> bool {
        self.lines
            .iter()
            .any(|l| BANNER_RE.is_match(l) || l.starts_with("Short Msg: Native crash"))
    }

    fn build_anr(self) -> AnrItem {
        let mut anr = AnrParser.parse(&self.lines).unwrap_or_else(|| AnrItem {
            info: untitled(ANR, &self.lines),
            activity: None,
            reason: None,
            load: None,
            cpu_usage: None,
            trace: None,
        });
        fill(&mut anr.info, self.app, self.pid);

        // The dump printed after the report was taken for this ANR
        if let Some(traces) = TracesParser.parse(&self.trace_lines) {
            let pid = anr.info.pid;
            let with_stack = || traces.processes.iter().filter(|t| t.stack.is_some());
            anr.trace = with_stack()
                .find(|t| Some(t.pid) == pid)
                .or_else(|| with_stack().next())
                .and_then(|t| t.stack.clone());
        }
        anr
    }

    fn build_java(self) -> JavaCrashItem {
        let mut crash = JavaCrashParser.parse(&self.lines).unwrap_or_else(|| JavaCrashItem {
            info: untitled(JAVA_CRASH, &self.lines),
            exception: None,
            message: None,
        });
        fill(&mut crash.info, self.app, self.pid);
        crash
    }

    fn build_native(self) -> NativeCrashItem {
        let start = self
            .lines
            .iter()
            .position(|l| BANNER_RE.is_match(l))
            .unwrap_or(0);
        let lines: Vec<&str> = self.lines[start..]
            .iter()
            .map(String::as_str)
            .filter(|l| !l.contains(NEW_NATIVE_CRASH))
            .collect();

        let mut crash = NativeCrashParser.parse(&lines).unwrap_or_else(|| NativeCrashItem {
            info: untitled(NATIVE_CRASH, &lines),
            fingerprint: None,
            signal: None,
            abort_message: None,
        });
        fill(&mut crash.info, self.app, self.pid);
        crash
    }
}

fn untitled<S: AsRef<str>>(category: &str, lines: &[S]) -> EventInfo {
    EventInfo {
        stack: join_lines(lines),
        ..EventInfo::new(category)
    }
}

/// Fall back to the process named on the monkey's crash line
fn fill(info: &mut EventInfo, app: Option<String>, pid: Option<i32>) {
    if info.app.is_none() {
        info.app = app;
    }
    if info.pid.is_none() {
        info.pid = pid;
    }
}

/// `Wednesday, 04/25/2012 01:37:12 AM` or `Tue Apr 24 17:05:50 PST 2012`.
/// Zone abbreviations are ambiguous, so the time stays local.
fn parse_monkey_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%A, %m/%d/%Y %I:%M:%S %p") {
        return Some(t);
    }

    let fields: Vec<&str> = s.split_whitespace().collect();
    if fields.len() != 6 {
        return None;
    }
    let without_zone = [fields[0], fields[1], fields[2], fields[3], fields[5]].join(" ");
    NaiveDateTime::parse_from_str(&without_zone, "%a %b %d %H:%M:%S %Y").ok()
}

/// `242.13` seconds of uptime as ms
fn parse_uptime_ms(s: &str) -> Option<i64> {
    s.parse::<f64>().ok().map(|secs| (secs * 1000.0).round() as i64)
}

/// Stream parser for the output of `adb shell monkey -v`.
/// The first crash of the run is kept; later crash reports are ignored.
#[derive(Debug, Clone, Default)]
pub struct MonkeyLogParser {
    item: MonkeyLogItem,
    seen: bool,
    pending: Option<PendingCrash>,
}

impl MonkeyLogParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a run-level fact. Returns false if `line` carries none.
    fn parse_summary(&mut self, line: &str) -> bool {
        let item = &mut self.item;

        if let Some(c) = START_RE.captures(line) {
            item.start_time = parse_monkey_date(&c["date"]);
            item.start_uptime_ms = parse_uptime_ms(&c["uptime"]);
        } else if let Some(c) = STOP_RE.captures(line) {
            item.stop_time = parse_monkey_date(&c["date"]);
            item.stop_uptime_ms = parse_uptime_ms(&c["uptime"]);
            item.total_duration_ms = match (c["mm"].parse::<i64>(), c["ss"].parse::<i64>()) {
                (Ok(mm), Ok(ss)) => Some((mm * 60 + ss) * 1000),
                _ => None,
            };
        } else if line.starts_with(COMMAND_PREFIX) {
            if let Some(c) = THROTTLE_RE.captures(line) {
                item.throttle = c["ms"].parse().unwrap_or(0);
            }
            item.ignore_security_exceptions = line.contains("--ignore-security-exceptions");
        } else if let Some(c) = SEED_RE.captures(line) {
            item.seed = c["seed"].parse().ok();
            item.target_count = c["count"].parse().ok();
        } else if let Some(c) = PACKAGE_RE.captures(line) {
            push_unique(&mut item.packages, &c["name"]);
        } else if let Some(c) = CATEGORY_RE.captures(line) {
            push_unique(&mut item.categories, &c["name"]);
        } else if let Some(c) = PROGRESS_RE.captures(line) {
            if let Ok(n) = c["n"].parse() {
                item.intermediate_count = n;
            }
        } else if let Some(c) = INJECTED_RE.captures(line) {
            item.final_count = c["n"].parse().ok();
        } else if let Some(c) = DROPPED_RE.captures(line) {
            for part in DROPPED_PART_RE.captures_iter(&c["rest"]) {
                match (DroppedCategory::from_label(&part["name"]), part["n"].parse()) {
                    (Some(category), Ok(n)) => {
                        item.dropped.insert(category, n);
                    }
                    _ => log::trace!("Ignoring dropped counter '{}'", &part[0]),
                }
            }
        } else if line.trim() == FINISHED {
            item.is_finished = true;
        } else if line.trim() == NO_ACTIVITIES {
            item.no_activities = true;
        } else {
            return false;
        }
        true
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

impl StreamParser for MonkeyLogParser {
    type Output = MonkeyLogItem;

    fn parse_line(&mut self, line: &str) {
        if self.parse_summary(line) {
            self.seen = true;
            return;
        }

        match self.pending.as_mut() {
            Some(pending) => pending.push(line),
            None => {
                self.pending = PendingCrash::start(line);
                self.seen |= self.pending.is_some();
            }
        }
    }

    fn finish(&mut self) -> Option<MonkeyLogItem> {
        if let Some(pending) = self.pending.take() {
            self.item.crash = Some(pending.build());
        }
        if !self.seen {
            return None;
        }
        Some(std::mem::take(&mut self.item))
    }

    fn clear(&mut self) {
        self.item = MonkeyLogItem::default();
        self.seen = false;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;
    use chrono::NaiveDate;

    const RULER: &str = "--------------------------------------------------------------------------------";

    const MAPS_START: [&str; 16] = [
        "# Tuesday, 04/24/2012 05:05:50 PM - device uptime = 232.65: Monkey command used for this test:",
        "adb shell monkey -p com.google.android.apps.maps  -c android.intent.category.SAMPLE_CODE -c android.intent.category.CAR_DOCK -c android.intent.category.LAUNCHER -c android.intent.category.MONKEY -c android.intent.category.INFO  --ignore-security-exceptions --throttle 100  -s 501 -v -v -v 10000 ",
        "",
        ":Monkey: seed=501 count=10000",
        ":AllowPackage: com.google.android.apps.maps",
        ":IncludeCategory: android.intent.category.LAUNCHER",
        ":Switch: #Intent;action=android.intent.action.MAIN;category=android.intent.category.LAUNCHER;launchFlags=0x10200000;component=com.google.android.apps.maps/com.google.android.maps.LatitudeActivity;end",
        "    // Allowing start of Intent { act=android.intent.action.MAIN cat=[android.intent.category.LAUNCHER] cmp=com.google.android.apps.maps/com.google.android.maps.LatitudeActivity } in package com.google.android.apps.maps",
        "Sleeping for 100 milliseconds",
        ":Sending Touch (ACTION_DOWN): 0:(332.0,70.0)",
        ":Sending Touch (ACTION_UP): 0:(332.55292,76.54678)",
        "    //[calendar_time:2012-04-25 00:06:38.419  system_uptime:280799]",
        "    // Sending event #1600",
        ":Sending Touch (ACTION_MOVE): 0:(1052.2666,677.64594)",
        ":Sending Touch (ACTION_UP): 0:(1054.7593,687.3757)",
        "Sleeping for 100 milliseconds",
    ];

    const MAPS_END: [&str; 10] = [
        "** Monkey aborted due to error.",
        "Events injected: 1649",
        ":Sending rotation degree=0, persist=false",
        ":Dropped: keys=0 pointers=0 trackballs=0 flips=0 rotations=0",
        "## Network stats: elapsed time=48897ms (0ms mobile, 48897ms wifi, 0ms not connected)",
        "** System appears to have crashed at event 1649 of 10000 using seed 501",
        "",
        "# Tuesday, 04/24/2012 05:06:40 PM - device uptime = 282.53: Monkey command ran for: 00:49 (mm:ss)",
        "",
        RULER,
    ];

    const NATIVE_CRASH_DUMP: [&str; 30] = [
        "// CRASH: com.android.chrome (pid 2162)",
        "// Short Msg: Native crash",
        "// Long Msg: Native crash: Segmentation fault",
        "// Build Label: google/mantaray/manta:JellyBeanMR2/JWR02/624470:userdebug/dev-keys",
        "// Build Changelist: 624470",
        "// Build Time: 1364920502000",
        "// *** *** *** *** *** *** *** *** *** *** *** *** *** *** *** ***",
        "// Build fingerprint: 'google/mantaray/manta:4.1/JRO01/12345:userdebug/dev-keys'",
        "// Revision: '7'",
        "// pid: 2162, tid: 2216, name: .android.chrome  >>> com.android.chrome <<<",
        "// signal 11 (SIGSEGV), code 1 (SEGV_MAPERR), fault addr deadbaad",
        "//     r0 00000027  r1 00001000  r2 00000008  r3 deadbaad",
        "//     r4 00000000  r5 7af65e64  r6 00000000  r7 7af65ea4",
        "//     r8 401291f4  r9 00200000  sl 7784badc  fp 00001401",
        "//     ip 7af65ea4  sp 7af65e60  lr 400fed6b  pc 400fc2d4  cpsr 600f0030",
        "//     d0  3332303033312034  d1  6361707320737332",
        "//     d2  632e6c6f6f705f34  d3  205d29383231280a",
        "//     scr 60000010",
        "// ",
        "// backtrace:",
        "//     #00  pc 0001e2d4  /system/lib/libc.so",
        "//     #01  pc 0001c4bc  /system/lib/libc.so (abort+4)",
        "//     #02  pc 0023a515  /system/lib/libchromeview.so",
        "//     #03  pc 006f8a27  /system/lib/libchromeview.so",
        "// ",
        "// stack:",
        "//     7af65e20  77856cf8  ",
        "//     7af65e24  7af65e64  [stack:2216]",
        "//     7af65e28  00000014  ",
        "//     7af65e2c  76a88e6c  /system/lib/libchromeview.so",
    ];

    const ANR_RUN: [&str; 60] = [
        "# Tuesday, 04/24/2012 05:23:30 PM - device uptime = 216.48: Monkey command used for this test:",
        "adb shell monkey -p com.google.android.youtube  -c android.intent.category.SAMPLE_CODE -c android.intent.category.CAR_DOCK -c android.intent.category.LAUNCHER -c android.intent.category.MONKEY -c android.intent.category.INFO  --ignore-security-exceptions --throttle 100  -s 993 -v -v -v 10000 ",
        "",
        ":Monkey: seed=993 count=10000",
        ":AllowPackage: com.google.android.youtube",
        ":IncludeCategory: android.intent.category.LAUNCHER",
        ":Switch: #Intent;action=android.intent.action.MAIN;category=android.intent.category.LAUNCHER;launchFlags=0x10200000;component=com.google.android.youtube/.app.honeycomb.Shell%24HomeActivity;end",
        "    // Allowing start of Intent { act=android.intent.action.MAIN cat=[android.intent.category.LAUNCHER] cmp=com.google.android.youtube/.app.honeycomb.Shell$HomeActivity } in package com.google.android.youtube",
        "Sleeping for 100 milliseconds",
        ":Sending Key (ACTION_UP): 21    // KEYCODE_DPAD_LEFT",
        "Sleeping for 100 milliseconds",
        ":Sending Key (ACTION_DOWN): 22    // KEYCODE_DPAD_RIGHT",
        ":Sending Key (ACTION_UP): 22    // KEYCODE_DPAD_RIGHT",
        "    //[calendar_time:2012-04-25 00:27:27.155  system_uptime:454996]",
        "    // Sending event #5300",
        ":Sending Key (ACTION_UP): 19    // KEYCODE_DPAD_UP",
        "Sleeping for 100 milliseconds",
        ":Sending Trackball (ACTION_MOVE): 0:(4.0,3.0)",
        ":Sending Key (ACTION_DOWN): 20    // KEYCODE_DPAD_DOWN",
        ":Sending Key (ACTION_UP): 20    // KEYCODE_DPAD_DOWN",
        "// NOT RESPONDING: com.google.android.youtube (pid 3301)",
        "ANR in com.google.android.youtube (com.google.android.youtube/.app.honeycomb.phone.WatchActivity)",
        "Reason: keyDispatchingTimedOut",
        "Load: 1.0 / 1.05 / 0.6",
        "CPU usage from 4794ms to -1502ms ago with 99% awake:",
        "  18% 3301/com.google.android.youtube: 16% user + 2.3% kernel / faults: 268 minor 9 major",
        "  13% 313/system_server: 9.2% user + 4.4% kernel / faults: 906 minor 3 major",
        "34% TOTAL: 19% user + 13% kernel + 0.2% iowait + 1% softirq",
        "",
        "procrank:",
        "// procrank status was 0",
        "anr traces:",
        "",
        "",
        "----- pid 2887 at 2012-04-25 17:17:08 -----",
        "Cmd line: com.google.android.youtube",
        "",
        "DALVIK THREADS:",
        "(mutexes: tll=0 tsl=0 tscl=0 ghl=0)",
        "",
        "\"main\" prio=5 tid=1 SUSPENDED",
        "  | group=\"main\" sCount=1 dsCount=0 obj=0x00000001 self=0x00000001",
        "  | sysTid=2887 nice=0 sched=0/0 cgrp=foreground handle=0000000001",
        "  | schedstat=( 0 0 0 ) utm=5954 stm=1017 core=0",
        "  at class.method1(Class.java:1)",
        "  at class.method2(Class.java:2)",
        "  at class.method2(Class.java:2)",
        "",
        "----- end 2887 -----",
        "// anr traces status was 0",
        "** Monkey aborted due to error.",
        "Events injected: 5322",
        ":Sending rotation degree=0, persist=false",
        ":Dropped: keys=1 pointers=0 trackballs=0 flips=0 rotations=0",
        "## Network stats: elapsed time=252942ms (0ms mobile, 252942ms wifi, 0ms not connected)",
        "** System appears to have crashed at event 5322 of 10000 using seed 993",
        "",
        "# Tuesday, 04/24/2012 05:27:44 PM - device uptime = 471.37: Monkey command ran for: 04:14 (mm:ss)",
        "",
        RULER,
    ];

    fn maps_run(crash: &[&'static str]) -> Vec<&'static str> {
        MAPS_START
            .iter()
            .chain(crash)
            .chain(MAPS_END.iter())
            .copied()
            .collect()
    }

    fn parse(lines: &[&str]) -> MonkeyLogItem {
        MonkeyLogParser::new().parse(lines).unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, mo, d).and_then(|date| date.and_hms_opt(h, mi, s))
    }

    fn assert_maps_summary(log: &MonkeyLogItem) {
        assert_eq!(log.packages, vec!["com.google.android.apps.maps"]);
        assert_eq!(log.categories, vec!["android.intent.category.LAUNCHER"]);
        assert_eq!(log.throttle, 100);
        assert_eq!(log.seed, Some(501));
        assert_eq!(log.target_count, Some(10000));
        assert!(log.ignore_security_exceptions);
        assert_eq!(log.total_duration_ms, Some(49 * 1000));
        assert_eq!(log.start_uptime_ms, Some(232_650));
        assert_eq!(log.stop_uptime_ms, Some(282_530));
        assert_eq!(log.start_time, at(2012, 4, 24, 17, 5, 50));
        assert_eq!(log.stop_time, at(2012, 4, 24, 17, 6, 40));
        assert!(!log.is_finished);
        assert!(!log.no_activities);
        assert_eq!(log.intermediate_count, 1600);
        assert_eq!(log.final_count, Some(1649));
    }

    #[test]
    fn test_parse_success() {
        let lines = [
            "# Wednesday, 04/25/2012 01:37:12 AM - device uptime = 242.13: Monkey command used for this test:",
            "adb shell monkey -p com.google.android.browser  -c android.intent.category.SAMPLE_CODE -c android.intent.category.CAR_DOCK -c android.intent.category.LAUNCHER -c android.intent.category.MONKEY -c android.intent.category.INFO  --ignore-security-exceptions --throttle 100  -s 528 -v -v -v 10000 ",
            "",
            ":Monkey: seed=528 count=10000",
            ":AllowPackage: com.google.android.browser",
            ":IncludeCategory: android.intent.category.LAUNCHER",
            "Sleeping for 100 milliseconds",
            ":Sending Key (ACTION_DOWN): 23    // KEYCODE_DPAD_CENTER",
            ":Sending Trackball (ACTION_MOVE): 0:(-5.0,3.0)",
            "    //[calendar_time:2012-04-25 01:42:20.140  system_uptime:535179]",
            "    // Sending event #9900",
            ":Sending Trackball (ACTION_MOVE): 0:(2.0,-4.0)",
            "Events injected: 10000",
            ":Dropped: keys=5 pointers=6 trackballs=7 flips=8 rotations=9",
            "// Monkey finished",
            "",
            "# Wednesday, 04/25/2012 01:42:09 AM - device uptime = 539.21: Monkey command ran for: 04:57 (mm:ss)",
            "",
            RULER,
        ];
        let log = parse(&lines);

        assert_eq!(log.start_time, at(2012, 4, 25, 1, 37, 12));
        assert_eq!(log.stop_time, at(2012, 4, 25, 1, 42, 9));
        assert_eq!(log.packages, vec!["com.google.android.browser"]);
        assert_eq!(log.categories, vec!["android.intent.category.LAUNCHER"]);
        assert_eq!(log.throttle, 100);
        assert_eq!(log.seed, Some(528));
        assert_eq!(log.target_count, Some(10000));
        assert!(log.ignore_security_exceptions);
        assert_eq!(log.total_duration_ms, Some(4 * 60 * 1000 + 57 * 1000));
        assert_eq!(log.start_uptime_ms, Some(242_130));
        assert_eq!(log.stop_uptime_ms, Some(539_210));
        assert!(log.is_finished);
        assert!(!log.no_activities);
        assert_eq!(log.intermediate_count, 9900);
        assert_eq!(log.final_count, Some(10000));
        assert_eq!(log.dropped_count(DroppedCategory::Keys), Some(5));
        assert_eq!(log.dropped_count(DroppedCategory::Pointers), Some(6));
        assert_eq!(log.dropped_count(DroppedCategory::Trackballs), Some(7));
        assert_eq!(log.dropped_count(DroppedCategory::Flips), Some(8));
        assert_eq!(log.dropped_count(DroppedCategory::Rotations), Some(9));
        assert!(log.crash.is_none());
    }

    #[test]
    fn test_parse_anr() {
        let log = parse(&ANR_RUN);

        assert_eq!(log.packages, vec!["com.google.android.youtube"]);
        assert_eq!(log.seed, Some(993));
        assert_eq!(log.total_duration_ms, Some(4 * 60 * 1000 + 14 * 1000));
        assert_eq!(log.start_uptime_ms, Some(216_480));
        assert_eq!(log.stop_uptime_ms, Some(471_370));
        assert!(!log.is_finished);
        assert_eq!(log.intermediate_count, 5300);
        assert_eq!(log.final_count, Some(5322));
        assert_eq!(log.dropped_count(DroppedCategory::Keys), Some(1));

        let anr = match log.crash {
            Some(MonkeyCrash::Anr(anr)) => anr,
            other => panic!("expected an ANR, got {:?}", other),
        };
        assert_eq!(anr.info.app.as_deref(), Some("com.google.android.youtube"));
        assert_eq!(anr.info.pid, Some(3301));
        assert_eq!(anr.reason.as_deref(), Some("keyDispatchingTimedOut"));
        assert_eq!(anr.trace.as_deref(), Some(ANR_RUN[40..47].join("\n").as_str()));
    }

    #[test]
    fn test_anr_inside_traces_is_ignored() {
        let mut lines = ANR_RUN.to_vec();
        // The first report names pid 0 and carries the real pid on its own line
        lines[20] = "// NOT RESPONDING: com.google.android.youtube (pid 0)";
        lines.insert(22, "PID: 3301");
        let nested = [
            "// NOT RESPONDING: com.google.android.youtube (pid 3302)",
            "ANR in com.google.android.youtube (com.google.android.youtube/.app.honeycomb.phone.WatchActivity)",
            "Reason: Input dispatching timed out",
            "",
        ];
        for (i, line) in nested.iter().enumerate() {
            lines.insert(46 + i, line);
        }
        let log = parse(&lines);

        let anr = match log.crash {
            Some(MonkeyCrash::Anr(anr)) => anr,
            other => panic!("expected an ANR, got {:?}", other),
        };
        assert_eq!(anr.info.pid, Some(3301));
        assert_eq!(anr.reason.as_deref(), Some("keyDispatchingTimedOut"));
        assert_eq!(log.final_count, Some(5322));
    }

    #[test]
    fn test_parse_java_crash() {
        let log = parse(&maps_run(&[
            "// CRASH: com.google.android.apps.maps (pid 3161)",
            "// Short Msg: java.lang.Exception",
            "// Long Msg: java.lang.Exception: This is the message",
            "// Build Label: google/yakju/maguro:JellyBean/JRN24B/338896:userdebug/dev-keys",
            "// Build Changelist: 338896",
            "// Build Time: 1335309051000",
            "// java.lang.Exception: This is the message",
            "// \tat class.method1(Class.java:1)",
            "// \tat class.method2(Class.java:2)",
            "// \tat class.method3(Class.java:3)",
            "// ",
        ]));
        assert_maps_summary(&log);

        let crash = match log.crash {
            Some(MonkeyCrash::JavaCrash(crash)) => crash,
            other => panic!("expected a Java crash, got {:?}", other),
        };
        assert_eq!(crash.info.app.as_deref(), Some("com.google.android.apps.maps"));
        assert_eq!(crash.info.pid, Some(3161));
        assert_eq!(crash.exception.as_deref(), Some("java.lang.Exception"));
        assert_eq!(crash.message.as_deref(), Some("This is the message"));
        assert!(crash.info.stack.contains("\tat class.method3(Class.java:3)"));
    }

    #[test]
    fn test_java_crash_with_monkey_lines_mixed_in() {
        let log = parse(&maps_run(&[
            "// CRASH: com.google.android.apps.maps (pid 3161)",
            "// Short Msg: java.lang.Exception",
            ":Sending Touch (ACTION_UP): 0:(1054.7593,687.3757)",
            "// Long Msg: java.lang.Exception: This is the message",
            "Sleeping for 100 milliseconds",
            "// java.lang.Exception: This is the message",
            "// \tat class.method1(Class.java:1)",
            "// ",
        ]));
        assert_maps_summary(&log);

        let crash = match log.crash {
            Some(MonkeyCrash::JavaCrash(crash)) => crash,
            other => panic!("expected a Java crash, got {:?}", other),
        };
        assert_eq!(crash.info.pid, Some(3161));
        assert_eq!(crash.exception.as_deref(), Some("java.lang.Exception"));
        assert!(!crash.info.stack.contains("Sleeping"));
    }

    #[test]
    fn test_parse_native_crash() {
        let log = parse(&maps_run(&NATIVE_CRASH_DUMP));
        assert_maps_summary(&log);

        let crash = match log.crash {
            Some(MonkeyCrash::NativeCrash(crash)) => crash,
            other => panic!("expected a native crash, got {:?}", other),
        };
        assert_eq!(crash.info.app.as_deref(), Some("com.android.chrome"));
        assert_eq!(crash.info.pid, Some(2162));
        assert_eq!(
            crash.fingerprint.as_deref(),
            Some("google/mantaray/manta:4.1/JRO01/12345:userdebug/dev-keys")
        );
        assert_eq!(crash.signal.as_deref(), Some("SIGSEGV"));
        // Everything after the banner
        assert_eq!(crash.info.stack.lines().count(), 23);
    }

    #[test]
    fn test_native_crash_drops_detection_line() {
        let mut dump = NATIVE_CRASH_DUMP.to_vec();
        dump.push("// ** New native crash detected.");
        let log = parse(&maps_run(&dump));

        let crash = match log.crash {
            Some(MonkeyCrash::NativeCrash(crash)) => crash,
            other => panic!("expected a native crash, got {:?}", other),
        };
        assert_eq!(crash.info.pid, Some(2162));
        assert_eq!(crash.info.stack.lines().count(), 23);
        assert!(!crash.info.stack.contains(NEW_NATIVE_CRASH));
    }

    #[test]
    fn test_empty_native_crash() {
        let log = parse(&maps_run(&["** New native crash detected."]));
        assert_maps_summary(&log);

        let crash = match log.crash {
            Some(MonkeyCrash::NativeCrash(crash)) => crash,
            other => panic!("expected a native crash, got {:?}", other),
        };
        assert_eq!(crash.info.app, None);
        assert_eq!(crash.info.pid, None);
        assert_eq!(crash.fingerprint, None);
        assert_eq!(crash.info.stack, "");
    }

    #[test]
    fn test_no_activities() {
        let lines = [
            "# Wednesday, 04/25/2012 01:37:12 AM - device uptime = 242.13: Monkey command used for this test:",
            "adb shell monkey -p com.google.android.browser  -c android.intent.category.LAUNCHER --throttle 100  -s 528 -v -v -v 10000 ",
            "",
            ":Monkey: seed=528 count=10000",
            ":AllowPackage: com.google.android.browser",
            ":IncludeCategory: android.intent.category.LAUNCHER",
            "** No activities found to run, monkey aborted.",
            "",
            "# Wednesday, 04/25/2012 01:42:09 AM - device uptime = 539.21: Monkey command ran for: 04:57 (mm:ss)",
        ];
        let log = parse(&lines);

        assert!(log.no_activities);
        assert!(!log.is_finished);
        assert!(!log.ignore_security_exceptions);
        assert_eq!(log.intermediate_count, 0);
        assert_eq!(log.final_count, None);
        assert_eq!(log.dropped_count(DroppedCategory::Keys), None);
        assert!(log.dropped.is_empty());
        assert!(log.crash.is_none());
    }

    #[test]
    fn test_alternate_date_format() {
        let lines = [
            "# Tue Apr 24 17:05:50 PST 2012 - device uptime = 232.65: Monkey command used for this test:",
            "# Tue Apr 24 17:06:40 PST 2012 - device uptime = 282.53: Monkey command ran for: 00:49 (mm:ss)",
        ];
        let log = parse(&lines);

        assert_eq!(log.start_time, at(2012, 4, 24, 17, 5, 50));
        assert_eq!(log.stop_time, at(2012, 4, 24, 17, 6, 40));
        assert_eq!(log.total_duration_ms, Some(49_000));
    }

    #[test]
    fn test_not_a_monkey_log() {
        assert!(MonkeyLogParser::new().parse(["", "hello", RULER]).is_none());
    }

    #[test]
    fn test_clear_between_runs() {
        let mut parser = MonkeyLogParser::new();
        let first = parser.parse(maps_run(&["** New native crash detected."])).unwrap();
        parser.clear();
        let second = parser.parse(ANR_RUN).unwrap();

        assert_eq!(first.kind(), "MONKEY_LOG");
        assert!(matches!(first.crash, Some(MonkeyCrash::NativeCrash(_))));
        assert_eq!(second.seed, Some(993));
        assert!(matches!(second.crash, Some(MonkeyCrash::Anr(_))));
        assert_eq!(second.to_json()["crash"]["type"], "anr");
    }
}
