use super::Item;
use chrono::NaiveDateTime;
use serde::Serialize;

pub const ANR: &str = "ANR";
pub const JAVA_CRASH: &str = "JAVA_CRASH";
pub const NATIVE_CRASH: &str = "NATIVE_CRASH";

/// Fields shared by every event recovered from a logcat stream
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct EventInfo {
    pub category: String,
    pub event_time: Option<NaiveDateTime>,
    pub pid: Option<i32>,
    pub tid: Option<i32>,
    pub app: Option<String>,
    pub tag: Option<String>,
    /// Lines that preceded the event, across all processes
    pub last_preamble: String,
    /// Lines that preceded the event in the same process
    pub process_preamble: String,
    pub stack: String,
}

impl EventInfo {
    pub fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct LoadAverage {
    pub load_1: f64,
    pub load_5: f64,
    pub load_15: f64,
}

/// CPU breakdown from the `TOTAL` line of an ANR report, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct CpuUsage {
    pub total: f64,
    pub user: f64,
    pub kernel: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnrItem {
    pub info: EventInfo,
    pub activity: Option<String>,
    pub reason: Option<String>,
    pub load: Option<LoadAverage>,
    pub cpu_usage: Option<CpuUsage>,
    /// Main thread stack of the matching VM traces dump
    pub trace: Option<String>,
}

impl Item for AnrItem {
    fn kind(&self) -> &'static str {
        ANR
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JavaCrashItem {
    pub info: EventInfo,
    pub exception: Option<String>,
    pub message: Option<String>,
}

impl Item for JavaCrashItem {
    fn kind(&self) -> &'static str {
        JAVA_CRASH
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeCrashItem {
    pub info: EventInfo,
    pub fingerprint: Option<String>,
    pub signal: Option<String>,
    pub abort_message: Option<String>,
}

impl Item for NativeCrashItem {
    fn kind(&self) -> &'static str {
        NATIVE_CRASH
    }
}

/// Single-line event classified by a category rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiscLogcatItem {
    pub info: EventInfo,
}

impl Item for MiscLogcatItem {
    fn kind(&self) -> &'static str {
        "MISC_LOGCAT"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogcatEvent {
    Anr(AnrItem),
    JavaCrash(JavaCrashItem),
    NativeCrash(NativeCrashItem),
    Misc(MiscLogcatItem),
}

impl LogcatEvent {
    pub fn info(&self) -> &EventInfo {
        match self {
            LogcatEvent::Anr(item) => &item.info,
            LogcatEvent::JavaCrash(item) => &item.info,
            LogcatEvent::NativeCrash(item) => &item.info,
            LogcatEvent::Misc(item) => &item.info,
        }
    }

    pub(crate) fn info_mut(&mut self) -> &mut EventInfo {
        match self {
            LogcatEvent::Anr(item) => &mut item.info,
            LogcatEvent::JavaCrash(item) => &mut item.info,
            LogcatEvent::NativeCrash(item) => &mut item.info,
            LogcatEvent::Misc(item) => &mut item.info,
        }
    }

    pub fn category(&self) -> &str {
        &self.info().category
    }
}

/// Everything recovered from one logcat stream
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LogcatItem {
    pub start_time: Option<NaiveDateTime>,
    pub stop_time: Option<NaiveDateTime>,
    /// Events in the order they started
    pub events: Vec<LogcatEvent>,
}

impl LogcatItem {
    pub fn anrs(&self) -> impl Iterator<Item = &AnrItem> {
        self.events.iter().filter_map(|e| match e {
            LogcatEvent::Anr(item) => Some(item),
            _ => None,
        })
    }

    pub fn java_crashes(&self) -> impl Iterator<Item = &JavaCrashItem> {
        self.events.iter().filter_map(|e| match e {
            LogcatEvent::JavaCrash(item) => Some(item),
            _ => None,
        })
    }

    pub fn native_crashes(&self) -> impl Iterator<Item = &NativeCrashItem> {
        self.events.iter().filter_map(|e| match e {
            LogcatEvent::NativeCrash(item) => Some(item),
            _ => None,
        })
    }

    pub fn misc_events<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a MiscLogcatItem> {
        self.events.iter().filter_map(move |e| match e {
            LogcatEvent::Misc(item) if item.info.category == category => Some(item),
            _ => None,
        })
    }
}

impl Item for LogcatItem {
    fn kind(&self) -> &'static str {
        "LOGCAT"
    }
}
