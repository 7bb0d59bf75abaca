use super::{
    BugreportHeader, DeviceInfo, DumpsysItem, Item, KernelLogItem, LogcatItem, MemInfoItem,
    ProcrankItem, Section, SystemPropsItem, TopItem, TracesItem,
};
use crate::time::TimeAnchor;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Assembled bugreport, one slot per known section
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct BugreportItem {
    /// Time from the `== dumpstate:` line
    pub report_time: Option<NaiveDateTime>,
    pub header: Section<BugreportHeader>,
    pub device: Option<DeviceInfo>,
    pub mem_info: Section<MemInfoItem>,
    pub top: Section<TopItem>,
    pub procrank: Section<ProcrankItem>,
    pub kernel_log: Section<KernelLogItem>,
    pub last_kmsg: Section<KernelLogItem>,
    pub system_log: Section<LogcatItem>,
    pub last_logcat: Section<LogcatItem>,
    pub system_props: Section<SystemPropsItem>,
    pub anr_traces: Section<TracesItem>,
    pub dumpsys: Section<DumpsysItem>,
}

impl BugreportItem {
    /// Time zone and reference date for converting event times to UTC
    pub fn time_anchor(&self) -> TimeAnchor {
        let tz_name = self
            .system_props
            .get()
            .and_then(|props| props.get("persist.sys.timezone"));
        TimeAnchor::from_parts(tz_name, self.report_time.map(|t| t.date()))
    }
}

impl Item for BugreportItem {
    fn kind(&self) -> &'static str {
        "BUGREPORT"
    }
}
