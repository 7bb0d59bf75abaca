//! Post-pass linking facts found in different sections of one bugreport.

use crate::item::{
    BugreportItem, KernelEvent, KernelLogItem, LogcatEvent, LogcatItem, ProcessTrace,
    ProcrankItem, SystemPropsItem, TracesItem, KERNEL_RESET,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// Boot reasons left behind by a crash or a watchdog
static ABNORMAL_BOOT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)panic|watchdog|wdog|hw_reset|crash").unwrap()
});

const BOOT_REASON_PROP: &str = "ro.boot.bootreason";

/// Run every cross-reference step on an assembled report.
/// Sections that are not parsed are left untouched.
pub fn cross_reference(item: &mut BugreportItem) {
    if let Some(procrank) = item.procrank.get() {
        for log in [item.system_log.get_mut(), item.last_logcat.get_mut()]
            .into_iter()
            .flatten()
        {
            resolve_process_names(log, procrank);
        }
    }

    // Dumps written after an ANR never match it, so a previous boot's ANRs
    // only pick up dumps from that boot
    if let Some(traces) = item.anr_traces.get() {
        for log in [item.system_log.get_mut(), item.last_logcat.get_mut()]
            .into_iter()
            .flatten()
        {
            attach_traces(log, traces);
        }
    }

    if let (Some(kmsg), Some(props)) = (item.last_kmsg.get_mut(), item.system_props.get()) {
        apply_boot_reason(kmsg, props);
    }
}

/// Give each ANR the main-thread stack of its traces dump
pub fn attach_traces(log: &mut LogcatItem, traces: &TracesItem) {
    for event in &mut log.events {
        let anr = match event {
            LogcatEvent::Anr(anr) if anr.trace.is_none() => anr,
            _ => continue,
        };

        let candidates: Vec<&ProcessTrace> = traces
            .processes
            .iter()
            .filter(|t| t.stack.is_some())
            .filter(|t| {
                anr.info.pid == Some(t.pid)
                    || (anr.info.app.is_some() && anr.info.app == t.app)
            })
            .collect();

        let chosen = match anr.info.event_time {
            Some(at) => candidates
                .iter()
                .filter(|t| t.time.map_or(false, |time| time <= at))
                .fold(None, |best: Option<&&ProcessTrace>, t| match best {
                    Some(b) if b.time >= t.time => Some(b),
                    _ => Some(t),
                })
                .copied(),
            None => None,
        };

        let chosen = chosen.or_else(|| match candidates.as_slice() {
            [only] if only.time.is_none() || anr.info.event_time.is_none() => Some(*only),
            _ => None,
        });

        match chosen {
            Some(trace) => anr.trace = trace.stack.clone(),
            None if !candidates.is_empty() => {
                log::debug!(
                    "No traces dump fits the ANR of pid {:?} at {:?}",
                    anr.info.pid,
                    anr.info.event_time
                );
            }
            None => {}
        }
    }
}

/// Fill missing app names from the procrank process list
pub fn resolve_process_names(log: &mut LogcatItem, procrank: &ProcrankItem) {
    for event in &mut log.events {
        let info = event.info_mut();
        if info.app.is_some() {
            continue;
        }
        if let Some(name) = info.pid.and_then(|pid| procrank.process_name(pid)) {
            info.app = Some(name.to_string());
        }
    }
}

/// Record an abnormal last boot as a kernel reset, unless the last kmsg
/// already shows one
pub fn apply_boot_reason(kmsg: &mut KernelLogItem, props: &SystemPropsItem) {
    let reason = match props.get(BOOT_REASON_PROP) {
        Some(r) if ABNORMAL_BOOT_RE.is_match(r) => r,
        _ => return,
    };

    if kmsg.has_reset() {
        log::trace!("Keeping logged reset over boot reason '{}'", reason);
        return;
    }

    kmsg.events.push(KernelEvent {
        category: KERNEL_RESET.to_string(),
        event_time: None,
        preamble: String::new(),
        stack: format!("Last boot reason: {}", reason),
        selinux: None,
    });
}
