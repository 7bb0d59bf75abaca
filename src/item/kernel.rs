use super::Item;
use serde::Serialize;

pub const KERNEL_RESET: &str = "KERNEL_RESET";
pub const KERNEL_ERROR: &str = "KERNEL_ERROR";
pub const SELINUX_DENIAL: &str = "SELINUX_DENIAL";
pub const LOW_MEMORY_KILLER: &str = "LOW_MEMORY_KILLER";
pub const NORMAL_REBOOT: &str = "NORMAL_REBOOT";

/// Fields of an `avc: denied` record
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SelinuxDenial {
    pub permission: Option<String>,
    pub scontext: Option<String>,
    pub tcontext: Option<String>,
    pub tclass: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KernelEvent {
    pub category: String,
    /// Seconds since boot
    pub event_time: Option<f64>,
    pub preamble: String,
    pub stack: String,
    pub selinux: Option<SelinuxDenial>,
}

impl Item for KernelEvent {
    fn kind(&self) -> &'static str {
        "KERNEL_EVENT"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct KernelLogItem {
    pub start_time: Option<f64>,
    pub stop_time: Option<f64>,
    pub events: Vec<KernelEvent>,
}

impl KernelLogItem {
    pub fn events_of<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a KernelEvent> {
        self.events.iter().filter(move |e| e.category == category)
    }

    pub fn has_reset(&self) -> bool {
        self.events_of(KERNEL_RESET).next().is_some()
    }
}

impl Item for KernelLogItem {
    fn kind(&self) -> &'static str {
        "KERNEL_LOG"
    }
}
