use crate::item::{AnrItem, CpuUsage, EventInfo, LoadAverage};
use crate::parser::{join_lines, BlockParser};
use once_cell::sync::Lazy;
use regex::Regex;

/// `ANR in com.foo (com.foo/.Bar)` or `ANR (application not responding) in process: com.foo`
pub(crate) static ANR_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^ANR (?:\(application not responding\) )?in (?:process: )?(?P<app>[^\s(]+)(?:\s+\((?P<activity>[^)]*)\))?",
    )
    .unwrap()
});

static PID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^PID: (?P<pid>\d+)\s*$").unwrap());

static REASON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Reason: (?P<reason>.*)$").unwrap());

static LOAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Load: (?P<l1>[\d.]+) / (?P<l5>[\d.]+) / (?P<l15>[\d.]+)").unwrap()
});

static TOTAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<total>[\d.]+)% TOTAL: (?P<rest>.*)$").unwrap()
});

static CPU_PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<pct>[\d.]+)% (?P<name>user|kernel|iowait|irq|softirq)").unwrap()
});

/// Parses the ActivityManager report written when an app stops responding
#[derive(Debug, Clone, Copy, Default)]
pub struct AnrParser;

impl AnrParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for AnrParser {
    type Output = AnrItem;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<AnrItem> {
        let mut info = EventInfo::new(crate::item::ANR);
        let mut activity = None;
        let mut reason = None;
        let mut load = None;
        let mut cpu_usage = None;
        let mut found = false;

        for line in lines.iter().map(AsRef::as_ref) {
            if !found {
                if let Some(c) = ANR_START_RE.captures(line) {
                    info.app = Some(c["app"].to_string());
                    activity = c.name("activity").map(|m| m.as_str().to_string());
                    found = true;
                }
                continue;
            }

            if let Some(c) = PID_RE.captures(line) {
                match c["pid"].parse() {
                    Ok(pid) => info.pid = Some(pid),
                    Err(e) => log::debug!("Ignoring ANR pid '{}': {}", &c["pid"], e),
                }
            } else if let Some(c) = REASON_RE.captures(line) {
                reason = Some(c["reason"].trim().to_string());
            } else if let Some(c) = LOAD_RE.captures(line) {
                load = parse_load(&c);
            } else if cpu_usage.is_none() {
                if let Some(c) = TOTAL_RE.captures(line) {
                    cpu_usage = parse_cpu_usage(&c);
                }
            }
        }

        if !found {
            return None;
        }

        info.stack = join_lines(lines);

        Some(AnrItem {
            info,
            activity,
            reason,
            load,
            cpu_usage,
            trace: None,
        })
    }
}

fn parse_load(c: &regex::Captures<'_>) -> Option<LoadAverage> {
    Some(LoadAverage {
        load_1: c["l1"].parse().ok()?,
        load_5: c["l5"].parse().ok()?,
        load_15: c["l15"].parse().ok()?,
    })
}

fn parse_cpu_usage(c: &regex::Captures<'_>) -> Option<CpuUsage> {
    let mut usage = CpuUsage {
        total: c["total"].parse().ok()?,
        ..Default::default()
    };

    for part in CPU_PART_RE.captures_iter(&c["rest"]) {
        let pct: f64 = match part["pct"].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        match &part["name"] {
            "user" => usage.user = pct,
            "kernel" => usage.kernel = pct,
            "iowait" => usage.iowait = pct,
            "irq" => usage.irq = pct,
            "softirq" => usage.softirq = pct,
            _ => {}
        }
    }

    Some(usage)
}
