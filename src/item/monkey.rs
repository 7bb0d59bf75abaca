use super::{AnrItem, EventInfo, Item, JavaCrashItem, NativeCrashItem};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

/// Event families counted on the `:Dropped:` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DroppedCategory {
    Keys,
    Pointers,
    Trackballs,
    Flips,
    Rotations,
}

impl DroppedCategory {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "keys" => Some(DroppedCategory::Keys),
            "pointers" => Some(DroppedCategory::Pointers),
            "trackballs" => Some(DroppedCategory::Trackballs),
            "flips" => Some(DroppedCategory::Flips),
            "rotations" => Some(DroppedCategory::Rotations),
            _ => None,
        }
    }
}

/// Crash that stopped a monkey run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonkeyCrash {
    Anr(AnrItem),
    JavaCrash(JavaCrashItem),
    NativeCrash(NativeCrashItem),
}

impl MonkeyCrash {
    pub fn info(&self) -> &EventInfo {
        match self {
            MonkeyCrash::Anr(item) => &item.info,
            MonkeyCrash::JavaCrash(item) => &item.info,
            MonkeyCrash::NativeCrash(item) => &item.info,
        }
    }
}

/// Summary of one `adb shell monkey` run
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct MonkeyLogItem {
    pub start_time: Option<NaiveDateTime>,
    pub stop_time: Option<NaiveDateTime>,
    /// Device uptime when the run started, in ms
    pub start_uptime_ms: Option<i64>,
    pub stop_uptime_ms: Option<i64>,
    /// Wall time reported by `Monkey command ran for`, in ms
    pub total_duration_ms: Option<i64>,
    pub seed: Option<i64>,
    pub target_count: Option<u64>,
    /// Delay between events, in ms
    pub throttle: u64,
    pub ignore_security_exceptions: bool,
    pub packages: Vec<String>,
    pub categories: Vec<String>,
    /// Last `// Sending event #N` progress mark
    pub intermediate_count: u64,
    /// Count from `Events injected:`
    pub final_count: Option<u64>,
    pub dropped: BTreeMap<DroppedCategory, u64>,
    pub is_finished: bool,
    pub no_activities: bool,
    pub crash: Option<MonkeyCrash>,
}

impl MonkeyLogItem {
    pub fn dropped_count(&self, category: DroppedCategory) -> Option<u64> {
        self.dropped.get(&category).copied()
    }
}

impl Item for MonkeyLogItem {
    fn kind(&self) -> &'static str {
        "MONKEY_LOG"
    }
}
