use crate::item::{BatteryStatsItem, PowerUseEntry, WakelockEntry, WakelockKind};
use crate::parser::BlockParser;
use crate::time::parse_duration_ms;
use once_cell::sync::Lazy;
use regex::Regex;

static TIME_ON_BATTERY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Time on battery: (?P<dur>(?:\d+(?:ms|d|h|m|s) ?)+)").unwrap()
});

static SCREEN_ON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Screen on: (?P<dur>(?:\d+(?:ms|d|h|m|s) ?)+)").unwrap()
});

static POWER_USE_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Estimated power use \(mAh\):\s*$").unwrap()
});

/// `Capacity: 3000, Computed drain: 123.4, actual drain: 100-120`
static CAPACITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Capacity: (?P<cap>\d+), Computed drain: (?P<drain>\d+(?:\.\d+)?)").unwrap()
});

/// `Uid 1000: 20.5` with an optional `( cpu=... )` breakdown
static POWER_USE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<name>[^:]+): (?P<mah>\d+(?:\.\d+)?)(?:\s*\(.*\))?\s*$").unwrap()
});

/// `Kernel Wake lock PowerManagerService.WakeLocks: 1h 2m 3s 4ms (2510 times) realtime`
static KERNEL_WAKELOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*Kernel Wake lock (?P<name>.+?): (?P<dur>(?:\d+(?:ms|d|h|m|s) ?)+)\((?P<count>\d+) times\)",
    )
    .unwrap()
});

/// `Wake lock u0a22 NlpWakeLock: 1m 2s 3ms (15 times) realtime`
static PARTIAL_WAKELOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*Wake lock (?P<uid>\S+) (?P<name>.+?): (?P<dur>(?:\d+(?:ms|d|h|m|s) ?)+)\((?P<count>\d+) times\)",
    )
    .unwrap()
});

/// Parses the `dumpsys batterystats` summary
#[derive(Debug, Clone, Copy, Default)]
pub struct BatteryStatsParser;

impl BatteryStatsParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for BatteryStatsParser {
    type Output = BatteryStatsItem;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<BatteryStatsItem> {
        let mut item = BatteryStatsItem::default();
        // Indentation of the `Estimated power use` header while inside its block
        let mut power_use_indent: Option<usize> = None;

        for line in lines.iter().map(AsRef::as_ref) {
            if let Some(header_indent) = power_use_indent {
                if line.trim().is_empty() || indent(line) <= header_indent {
                    power_use_indent = None;
                } else if let Some(c) = POWER_USE_RE.captures(line) {
                    if let Ok(mah) = c["mah"].parse() {
                        item.power_use.push(PowerUseEntry {
                            name: c["name"].trim().to_string(),
                            mah,
                        });
                    }
                    continue;
                }
            }

            if POWER_USE_START_RE.is_match(line) {
                power_use_indent = Some(indent(line));
            } else if let Some(c) = CAPACITY_RE.captures(line) {
                item.capacity_mah = c["cap"].parse().ok();
                item.computed_drain_mah = c["drain"].parse().ok();
            } else if let Some(c) = TIME_ON_BATTERY_RE.captures(line) {
                if item.time_on_battery_ms.is_none() {
                    item.time_on_battery_ms = parse_duration_ms(&c["dur"]);
                }
            } else if let Some(c) = SCREEN_ON_RE.captures(line) {
                if item.screen_on_ms.is_none() {
                    item.screen_on_ms = parse_duration_ms(&c["dur"]);
                }
            } else if let Some(c) = KERNEL_WAKELOCK_RE.captures(line) {
                if let Some(entry) = wakelock(&c, WakelockKind::Kernel) {
                    item.wakelocks.push(entry);
                }
            } else if let Some(c) = PARTIAL_WAKELOCK_RE.captures(line) {
                if let Some(entry) = wakelock(&c, WakelockKind::Partial) {
                    item.wakelocks.push(entry);
                }
            }
        }

        let empty = item.time_on_battery_ms.is_none()
            && item.screen_on_ms.is_none()
            && item.capacity_mah.is_none()
            && item.wakelocks.is_empty()
            && item.power_use.is_empty();
        (!empty).then_some(item)
    }
}

fn indent(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn wakelock(c: &regex::Captures<'_>, kind: WakelockKind) -> Option<WakelockEntry> {
    Some(WakelockEntry {
        name: c["name"].trim_matches('"').to_string(),
        kind,
        uid: c.name("uid").map(|m| m.as_str().to_string()),
        held_ms: parse_duration_ms(&c["dur"])?,
        count: c["count"].parse().ok()?,
    })
}
