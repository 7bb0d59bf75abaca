use super::Item;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

/// `/proc/meminfo` values, in kB
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct MemInfoItem {
    pub entries: BTreeMap<String, i64>,
}

impl MemInfoItem {
    pub fn get(&self, key: &str) -> Option<i64> {
        self.entries.get(key).copied()
    }
}

impl Item for MemInfoItem {
    fn kind(&self) -> &'static str {
        "MEM_INFO"
    }
}

/// One procrank row. Sizes are in kB.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcrankEntry {
    pub pid: i32,
    pub vss: i64,
    pub rss: i64,
    pub pss: i64,
    pub uss: i64,
    pub process_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ProcrankItem {
    pub processes: Vec<ProcrankEntry>,
}

impl ProcrankItem {
    pub fn get(&self, pid: i32) -> Option<&ProcrankEntry> {
        self.processes.iter().find(|p| p.pid == pid)
    }

    pub fn process_name(&self, pid: i32) -> Option<&str> {
        self.get(pid).map(|p| p.process_name.as_str())
    }
}

impl Item for ProcrankItem {
    fn kind(&self) -> &'static str {
        "PROCRANK"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SystemPropsItem {
    pub properties: BTreeMap<String, String>,
}

impl SystemPropsItem {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl Item for SystemPropsItem {
    fn kind(&self) -> &'static str {
        "SYSTEM_PROPS"
    }
}

/// CPU tick totals reported by `top`
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TopItem {
    pub user: i64,
    pub nice: i64,
    pub system: i64,
    pub idle: i64,
    pub iow: i64,
    pub irq: i64,
    pub sirq: i64,
    pub total: i64,
}

impl Item for TopItem {
    fn kind(&self) -> &'static str {
        "TOP"
    }
}

/// One process dump from a VM traces file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessTrace {
    pub pid: i32,
    pub time: Option<NaiveDateTime>,
    pub app: Option<String>,
    /// Stack of the `"main"` thread
    pub stack: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TracesItem {
    pub processes: Vec<ProcessTrace>,
}

impl Item for TracesItem {
    fn kind(&self) -> &'static str {
        "TRACES"
    }
}

/// Lines between `== dumpstate:` and the first section
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct BugreportHeader {
    pub build: Option<String>,
    pub fingerprint: Option<String>,
    pub bootloader: Option<String>,
    pub radio: Option<String>,
    pub network: Option<String>,
    pub kernel: Option<String>,
    pub uptime: Option<String>,
    pub command_line: BTreeMap<String, String>,
}

impl Item for BugreportHeader {
    fn kind(&self) -> &'static str {
        "BUGREPORT_HEADER"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DeviceInfo {
    pub brand: String,
    pub model: String,
    pub android_version: String,
    pub api_level: i32,
    pub build_id: String,
    pub fingerprint: String,
    pub timezone: Option<String>,
}

impl Item for DeviceInfo {
    fn kind(&self) -> &'static str {
        "DEVICE_INFO"
    }
}
