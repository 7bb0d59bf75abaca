//! Typed results produced by the parsers.

mod bugreport;
mod dumpsys;
mod kernel;
mod logcat;
mod monkey;
mod system;

pub use bugreport::BugreportItem;
pub use dumpsys::{
    BatteryStatsItem, DumpsysItem, PackageEntry, PackageStatsItem, PowerUseEntry, WakelockEntry,
    WakelockKind, WifiStatsItem,
};
pub use kernel::{
    KernelEvent, KernelLogItem, SelinuxDenial, KERNEL_ERROR, KERNEL_RESET, LOW_MEMORY_KILLER,
    NORMAL_REBOOT, SELINUX_DENIAL,
};
pub use logcat::{
    AnrItem, CpuUsage, EventInfo, JavaCrashItem, LoadAverage, LogcatEvent, LogcatItem,
    MiscLogcatItem, NativeCrashItem, ANR, JAVA_CRASH, NATIVE_CRASH,
};
pub use monkey::{DroppedCategory, MonkeyCrash, MonkeyLogItem};
pub use system::{
    BugreportHeader, DeviceInfo, MemInfoItem, ProcessTrace, ProcrankEntry, ProcrankItem,
    SystemPropsItem, TopItem, TracesItem,
};

use serde::Serialize;
use serde_json::Value;

/// Common behavior of every parsed item
pub trait Item: Serialize {
    /// Stable label naming the item type
    fn kind(&self) -> &'static str;

    /// JSON view whose keys are the item's field names
    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Outcome of one bugreport section
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "item", rename_all = "snake_case")]
pub enum Section<T> {
    /// The section header never appeared
    Missing,
    /// The header appeared but nothing could be parsed from its body
    Empty,
    Parsed(T),
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Section::Missing
    }
}

impl<T> Section<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Section::Parsed(item) => Some(item),
            _ => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Section::Parsed(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Section::Parsed(item) => Some(item),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Section::Missing)
    }

    /// True when the header was seen, parsed or not
    pub fn is_present(&self) -> bool {
        !self.is_missing()
    }
}
