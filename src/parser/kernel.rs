use crate::item::{
    KernelEvent, KernelLogItem, SelinuxDenial, KERNEL_ERROR, KERNEL_RESET, LOW_MEMORY_KILLER,
    NORMAL_REBOOT, SELINUX_DENIAL,
};
use crate::parser::StreamParser;
use crate::patterns::{LineMatcher, PatternRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashSet, VecDeque};

const DEFAULT_PREAMBLE_SIZE: usize = 15;

/// `<6>[  123.456789] msg`, optional priority and `[ T123]` caller id
static KERNEL_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:<\d+>)?\[\s*(?P<time>\d+\.\d+)\](?:\[\s*[TC]\d+\])?\s?(?P<msg>.*)$").unwrap()
});

static BOOT_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Booting Linux|Linux version )").unwrap()
});

static KERNEL_ERROR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:BUG|WARNING): .*$").unwrap()
});

static AVC_DENIED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*avc:\s+denied.*$").unwrap()
});

static AVC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"avc:\s+denied\s+\{\s*(?P<perm>[^}]*?)\s*\}").unwrap()
});

static AVC_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?P<key>scontext|tcontext|tclass)=(?P<value>\S+)").unwrap()
});

const RESET_SIGNATURES: &[&str] = &[
    "Internal error:",
    "Kernel panic",
    "Unable to handle kernel",
    "kernel BUG at",
    "Watchdog bark",
    "Watchdog bite",
    "SMSM: Modem SMSM state changed to SMSM_RESET",
    "subsys-restart: Resetting the SoC",
];

/// Stream parser for dmesg, last_kmsg and console-ramoops output
#[derive(Debug, Clone)]
pub struct KernelLogParser {
    patterns: PatternRegistry,
    singletons: Vec<String>,
    preamble_size: usize,

    seen_line: bool,
    start_time: Option<f64>,
    stop_time: Option<f64>,
    ring: VecDeque<String>,
    events: Vec<KernelEvent>,
    reported: HashSet<String>,
}

impl Default for KernelLogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelLogParser {
    pub fn new() -> Self {
        let mut patterns = PatternRegistry::new();
        for sig in RESET_SIGNATURES {
            patterns.add_pattern(LineMatcher::contains(sig), KERNEL_RESET);
        }
        patterns
            .add_pattern(LineMatcher::Regex(KERNEL_ERROR_RE.clone()), KERNEL_ERROR)
            .add_pattern(LineMatcher::Regex(AVC_DENIED_RE.clone()), SELINUX_DENIAL)
            .add_pattern(LineMatcher::contains("lowmemorykiller: Killing"), LOW_MEMORY_KILLER)
            .add_pattern(LineMatcher::contains("Out of memory: Kill"), LOW_MEMORY_KILLER)
            .add_pattern(LineMatcher::contains("Restarting system"), NORMAL_REBOOT);

        Self {
            patterns,
            singletons: vec![KERNEL_RESET.to_string()],
            preamble_size: DEFAULT_PREAMBLE_SIZE,
            seen_line: false,
            start_time: None,
            stop_time: None,
            ring: VecDeque::new(),
            events: Vec::new(),
            reported: HashSet::new(),
        }
    }

    /// Report kernel messages matching `matcher` under `category`.
    /// Added rules are checked after the built-in ones.
    pub fn add_pattern(&mut self, matcher: LineMatcher, category: &str) -> &mut Self {
        self.patterns.add_pattern(matcher, category);
        self
    }

    /// Keep only the first event of `category`
    pub fn add_singleton_category(&mut self, category: &str) -> &mut Self {
        if !self.singletons.iter().any(|c| c == category) {
            self.singletons.push(category.to_string());
        }
        self
    }

    pub fn with_preamble_size(mut self, size: usize) -> Self {
        self.preamble_size = size;
        self
    }

    fn classify(&mut self, raw: &str, msg: &str, time: Option<f64>) {
        let category = match self.patterns.classify(msg) {
            Some(c) => c.to_string(),
            None => return,
        };

        if self.singletons.contains(&category) && !self.reported.insert(category.clone()) {
            log::trace!("Ignoring repeated {} at {:?}: {}", category, time, raw);
            return;
        }

        let selinux = (category == SELINUX_DENIAL).then(|| parse_avc(msg));
        let preamble = self
            .ring
            .iter()
            .skip(self.ring.len().saturating_sub(self.preamble_size))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");

        self.events.push(KernelEvent {
            category,
            event_time: time,
            preamble,
            stack: msg.to_string(),
            selinux,
        });
    }

    fn push_ring(&mut self, raw: &str) {
        if self.ring.len() >= self.preamble_size.max(1) {
            self.ring.pop_front();
        }
        self.ring.push_back(raw.to_string());
    }
}

/// Extract the fields of an `avc: denied` message
fn parse_avc(msg: &str) -> SelinuxDenial {
    let mut denial = SelinuxDenial {
        permission: AVC_RE.captures(msg).map(|c| c["perm"].to_string()),
        ..Default::default()
    };

    for c in AVC_FIELD_RE.captures_iter(msg) {
        let value = Some(c["value"].to_string());
        match &c["key"] {
            "scontext" => denial.scontext = value,
            "tcontext" => denial.tcontext = value,
            "tclass" => denial.tclass = value,
            _ => {}
        }
    }

    denial
}

impl StreamParser for KernelLogParser {
    type Output = KernelLogItem;

    fn parse_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        let (msg, time) = match KERNEL_LINE_RE.captures(line) {
            Some(c) => {
                let time: Option<f64> = c["time"].parse().ok();
                if let Some(t) = time {
                    self.seen_line = true;
                    self.start_time.get_or_insert(t);
                    self.stop_time = Some(t);
                }
                (c.name("msg").map_or("", |m| m.as_str()), time)
            }
            None => (line.trim(), None),
        };

        if BOOT_MARKER_RE.is_match(msg) {
            self.ring.clear();
        }

        self.classify(line, msg, time);
        self.push_ring(line);
    }

    fn finish(&mut self) -> Option<KernelLogItem> {
        if !self.seen_line && self.events.is_empty() {
            return None;
        }

        Some(KernelLogItem {
            start_time: self.start_time,
            stop_time: self.stop_time,
            events: std::mem::take(&mut self.events),
        })
    }

    fn clear(&mut self) {
        self.seen_line = false;
        self.start_time = None;
        self.stop_time = None;
        self.ring.clear();
        self.events.clear();
        self.reported.clear();
    }
}
