//! Full bugreport parsing: section dispatch, item assembly and cross-referencing.

use crate::crossref;
use crate::error::Result;
use crate::item::{
    BugreportHeader, BugreportItem, DumpsysItem, KernelLogItem, LogcatItem, MemInfoItem,
    ProcrankItem, Section, SystemPropsItem, TopItem, TracesItem,
};
use crate::parser::dumpsys::DumpsysParser;
use crate::parser::section::{
    BlockSection, DispatchResult, HeaderSyntax, SectionDefinition, SectionDispatcher,
    StreamSection,
};
use crate::parser::{
    extract_device_info, HeaderParser, KernelLogParser, LogcatParser, MemInfoParser,
    ProcrankParser, StreamParser, SystemPropsParser, TopParser, TracesParser,
};
use crate::time::parse_dumpstate_line;
use chrono::NaiveDateTime;

/// Item produced by one bugreport section
#[derive(Debug)]
pub enum SectionItem {
    Header(BugreportHeader),
    MemInfo(MemInfoItem),
    Top(TopItem),
    Procrank(ProcrankItem),
    KernelLog(KernelLogItem),
    Logcat(LogcatItem),
    SystemProps(SystemPropsItem),
    Traces(TracesItem),
    Dumpsys(DumpsysItem),
}

/// Stream parser for a whole bugreport text
pub struct BugreportParser {
    dispatcher: SectionDispatcher<SectionItem>,
    report_time: Option<NaiveDateTime>,
}

impl Default for BugreportParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BugreportParser {
    pub fn new() -> Self {
        Self::with_parsers(LogcatParser::new(), KernelLogParser::new())
    }

    /// Use the given logcat and kernel log parsers, e.g. with extra crash
    /// tags or patterns. Each is cloned for both sections of its format.
    pub fn with_parsers(logcat: LogcatParser, kernel: KernelLogParser) -> Self {
        let dispatcher = SectionDispatcher::new(HeaderSyntax::bugreport())
            .with_section(SectionDefinition::new(
                "header",
                &["dumpstate"],
                BlockSection::new(HeaderParser::new(), SectionItem::Header),
            ))
            .with_section(SectionDefinition::new(
                "mem_info",
                &["MEMORY INFO"],
                BlockSection::new(MemInfoParser::new(), SectionItem::MemInfo),
            ))
            .with_section(SectionDefinition::new(
                "top",
                &["CPU INFO"],
                BlockSection::new(TopParser::new(), SectionItem::Top),
            ))
            .with_section(SectionDefinition::new(
                "procrank",
                &["PROCRANK"],
                BlockSection::new(ProcrankParser::new(), SectionItem::Procrank),
            ))
            .with_section(SectionDefinition::new(
                "kernel_log",
                &["KERNEL LOG"],
                StreamSection::new(kernel.clone(), SectionItem::KernelLog),
            ))
            .with_section(SectionDefinition::new(
                "last_kmsg",
                &["LAST KMSG", "CONSOLE RAMOOPS"],
                StreamSection::new(kernel, SectionItem::KernelLog),
            ))
            .with_section(SectionDefinition::new(
                "system_log",
                &["SYSTEM LOG", "MAIN LOG", "MAIN AND SYSTEM LOG"],
                StreamSection::new(logcat.clone(), SectionItem::Logcat),
            ))
            .with_section(SectionDefinition::new(
                "last_logcat",
                &["LAST LOGCAT"],
                StreamSection::new(logcat, SectionItem::Logcat),
            ))
            .with_section(SectionDefinition::new(
                "system_props",
                &["SYSTEM PROPERTIES"],
                BlockSection::new(SystemPropsParser::new(), SectionItem::SystemProps),
            ))
            .with_section(SectionDefinition::new(
                "anr_traces",
                &["VM TRACES AT LAST ANR", "VM TRACES JUST NOW"],
                BlockSection::new(TracesParser::new(), SectionItem::Traces),
            ))
            .with_section(SectionDefinition::new(
                "dumpsys",
                &["DUMPSYS"],
                StreamSection::new(DumpsysParser::new(), SectionItem::Dumpsys),
            ));

        Self {
            dispatcher,
            report_time: None,
        }
    }

    /// Let the section header `name` select the section `id`
    pub fn add_section_synonym(&mut self, id: &str, name: &str) -> Result<()> {
        self.dispatcher.add_synonym(id, name)
    }
}

/// Take a section and unwrap its item with `f`
fn take<T>(
    result: &mut DispatchResult<SectionItem>,
    id: &str,
    f: impl Fn(SectionItem) -> Option<T>,
) -> Section<T> {
    match result.take(id) {
        Section::Parsed(item) => match f(item) {
            Some(item) => Section::Parsed(item),
            None => Section::Empty,
        },
        Section::Empty => Section::Empty,
        Section::Missing => Section::Missing,
    }
}

impl StreamParser for BugreportParser {
    type Output = BugreportItem;

    fn parse_line(&mut self, line: &str) {
        if let Some(time) = parse_dumpstate_line(line) {
            self.report_time.get_or_insert(time);
            self.dispatcher.context_mut().reference_date = Some(time.date());
        }
        self.dispatcher.feed(line);
    }

    fn finish(&mut self) -> Option<BugreportItem> {
        let mut result = self.dispatcher.finish();
        if self.report_time.is_none() && result.is_empty() {
            return None;
        }

        let mut item = BugreportItem {
            report_time: self.report_time,
            header: take(&mut result, "header", |i| match i {
                SectionItem::Header(h) => Some(h),
                _ => None,
            }),
            device: None,
            mem_info: take(&mut result, "mem_info", |i| match i {
                SectionItem::MemInfo(m) => Some(m),
                _ => None,
            }),
            top: take(&mut result, "top", |i| match i {
                SectionItem::Top(t) => Some(t),
                _ => None,
            }),
            procrank: take(&mut result, "procrank", |i| match i {
                SectionItem::Procrank(p) => Some(p),
                _ => None,
            }),
            kernel_log: take(&mut result, "kernel_log", |i| match i {
                SectionItem::KernelLog(k) => Some(k),
                _ => None,
            }),
            last_kmsg: take(&mut result, "last_kmsg", |i| match i {
                SectionItem::KernelLog(k) => Some(k),
                _ => None,
            }),
            system_log: take(&mut result, "system_log", |i| match i {
                SectionItem::Logcat(l) => Some(l),
                _ => None,
            }),
            last_logcat: take(&mut result, "last_logcat", |i| match i {
                SectionItem::Logcat(l) => Some(l),
                _ => None,
            }),
            system_props: take(&mut result, "system_props", |i| match i {
                SectionItem::SystemProps(p) => Some(p),
                _ => None,
            }),
            anr_traces: take(&mut result, "anr_traces", |i| match i {
                SectionItem::Traces(t) => Some(t),
                _ => None,
            }),
            dumpsys: take(&mut result, "dumpsys", |i| match i {
                SectionItem::Dumpsys(d) => Some(d),
                _ => None,
            }),
        };

        item.device = extract_device_info(item.system_props.get(), item.header.get());
        crossref::cross_reference(&mut item);

        Some(item)
    }

    fn clear(&mut self) {
        self.dispatcher.clear();
        self.report_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Item, KERNEL_RESET};
    use crate::parser::CrashKind;
    use chrono::NaiveDate;
    use std::io::Cursor;

    const BUGREPORT: &str = "\
========================================================
== dumpstate: 2012-04-26 12:59:16
========================================================

Build: IMM76D
Build fingerprint: 'google/soju/crespo:4.0.4/IMM76D/299849:userdebug/test-keys'
Kernel: Linux version 3.0.8
Command line: console=ttyFIQ0 androidboot.hardware=herring

------ MEMORY INFO (/proc/meminfo) ------
MemTotal:         353332 kB
MemFree:           65420 kB
------ CPU INFO (top -n 1 -d 1 -m 30 -t) ------

User 20 + Nice 0 + Sys 11 + Idle 295 + IOW 0 + IRQ 0 + SIRQ 1 = 327

------ PROCRANK (procrank) ------
  PID      Vss      Rss      Pss      Uss  cmdline
  178   87136K   81684K   52829K   50012K  system_server
 1313   78128K   77996K   48603K   45812K  com.google.android.apps.maps
------ 0.021s was the duration of 'PROCRANK' ------
------ KERNEL LOG (dmesg) ------
<6>[    0.000000] Booting Linux on physical CPU 0
<3>[   12.000000] lowmemorykiller: Killing 'com.android.browser' (3247), adj 10
------ SYSTEM LOG (logcat -v threadtime -d *:v) ------
--------- beginning of main
04-25 17:17:08.445   312   312 E ActivityManager: ANR in com.google.android.apps.maps (com.google.android.apps.maps/.MapsActivity)
04-25 17:17:08.445   312   312 E ActivityManager: PID: 1313
04-25 17:17:08.445   312   312 E ActivityManager: Reason: keyDispatchingTimedOut
04-25 17:17:10.000  1313  1313 E AndroidRuntime: FATAL EXCEPTION: main
04-25 17:17:10.000  1313  1313 E AndroidRuntime: java.lang.NullPointerException
04-25 17:17:10.000  1313  1313 E AndroidRuntime: \tat com.example.Foo.bar(Foo.java:1)
------ SYSTEM PROPERTIES ------
[ro.product.brand]: [google]
[ro.product.model]: [Nexus S]
[ro.build.version.sdk]: [15]
[ro.boot.bootreason]: [kernel_panic]
[persist.sys.timezone]: [America/Los_Angeles]
------ LAST KMSG (/proc/last_kmsg) ------
[    1.000000] init: starting
------ VM TRACES AT LAST ANR (/data/anr/traces.txt: 2012-04-25 17:17:08) ------

----- pid 1313 at 2012-04-25 17:17:08 -----
Cmd line: com.google.android.apps.maps

\"main\" prio=5 tid=1 NATIVE
  at android.os.MessageQueue.nativePollOnce(Native Method)

----- end 1313 -----
------ DUMPSYS (dumpsys) ------
DUMP OF SERVICE wifi:
CMD_START_SCAN
------ SOME UNKNOWN SECTION ------
ignored
";

    fn parse(text: &str) -> Option<BugreportItem> {
        BugreportParser::new().parse(text.lines())
    }

    #[test]
    fn test_parse_bugreport() {
        let item = parse(BUGREPORT).unwrap();

        assert_eq!(
            item.report_time,
            NaiveDate::from_ymd_opt(2012, 4, 26).and_then(|d| d.and_hms_opt(12, 59, 16))
        );
        assert_eq!(item.header.get().unwrap().build.as_deref(), Some("IMM76D"));
        assert_eq!(item.mem_info.get().unwrap().get("MemTotal"), Some(353332));
        assert_eq!(item.top.get().unwrap().total, 327);
        assert_eq!(item.procrank.get().unwrap().processes.len(), 2);
        assert_eq!(item.kernel_log.get().unwrap().events.len(), 1);
        assert_eq!(item.system_props.get().unwrap().get("ro.product.model"), Some("Nexus S"));
        assert_eq!(item.dumpsys.get().unwrap().wifi_stats.as_ref().unwrap().scans, 1);
        assert!(item.last_logcat.is_missing());

        let device = item.device.as_ref().unwrap();
        assert_eq!(device.brand, "google");
        assert_eq!(device.model, "Nexus S");
        assert_eq!(device.api_level, 15);
        assert_eq!(device.build_id, "IMM76D");
    }

    #[test]
    fn test_logcat_uses_report_year_and_traces() {
        let item = parse(BUGREPORT).unwrap();
        let log = item.system_log.get().unwrap();

        let anr = log.anrs().next().unwrap();
        assert_eq!(
            anr.info.event_time,
            NaiveDate::from_ymd_opt(2012, 4, 25).and_then(|d| d.and_hms_milli_opt(17, 17, 8, 445))
        );
        assert!(anr.trace.as_deref().unwrap().starts_with("\"main\" prio=5"));

        let crash = log.java_crashes().next().unwrap();
        assert_eq!(crash.info.pid, Some(1313));
        assert_eq!(crash.info.app.as_deref(), Some("com.google.android.apps.maps"));
    }

    #[test]
    fn test_boot_reason_adds_reset() {
        let item = parse(BUGREPORT).unwrap();
        let kmsg = item.last_kmsg.get().unwrap();

        let reset: Vec<_> = kmsg.events_of(KERNEL_RESET).collect();
        assert_eq!(reset.len(), 1);
        assert_eq!(reset[0].stack, "Last boot reason: kernel_panic");
    }

    #[test]
    fn test_section_states() {
        let text = "\
== dumpstate: 2012-04-26 12:59:16
------ MEMORY INFO (/proc/meminfo) ------
------ PROCRANK (procrank) ------
  PID      Vss      Rss      Pss      Uss  cmdline
";
        let item = parse(text).unwrap();
        assert_eq!(item.mem_info, Section::Empty);
        assert_eq!(item.procrank, Section::Empty);
        assert!(item.system_log.is_missing());
        assert!(item.device.is_none());

        let json = item.to_json();
        assert_eq!(json["mem_info"]["status"], "empty");
        assert_eq!(json["system_log"]["status"], "missing");
    }

    #[test]
    fn test_not_a_bugreport() {
        assert!(parse("").is_none());
        assert!(parse("hello\nworld").is_none());
    }

    #[test]
    fn test_log_header_synonyms() {
        for header in [
            "------ SYSTEM LOG (logcat -v threadtime -d *:v) ------",
            "------ MAIN LOG (logcat -b main -b system -v threadtime -d *:v) ------",
        ] {
            let item = parse(&format!(
                "{}\n04-25 09:55:47.799  3064  3082 I ActivityManager: Start proc",
                header
            ))
            .unwrap();
            assert!(item.system_log.get().is_some(), "{}", header);
        }
    }

    #[test]
    fn test_section_synonym() {
        let mut parser = BugreportParser::new();
        parser.add_section_synonym("mem_info", "MEMINFO").unwrap();
        assert!(parser.add_section_synonym("unknown", "X").is_err());

        let item = parser
            .parse(["------ MEMINFO ------", "MemFree: 1 kB"])
            .unwrap();
        assert_eq!(item.mem_info.get().unwrap().get("MemFree"), Some(1));
        assert_eq!(item.report_time, None);
    }

    #[test]
    fn test_custom_logcat_parser() {
        let mut logcat = LogcatParser::new();
        logcat.add_crash_tag("I", "TestRunner", CrashKind::JavaCrash, "TEST_CRASH");
        let mut parser = BugreportParser::with_parsers(logcat, KernelLogParser::new());

        let item = parser
            .parse([
                "== dumpstate: 2012-04-26 12:59:16",
                "------ SYSTEM LOG (logcat) ------",
                "04-25 09:55:47.799  3064  3082 I TestRunner: java.lang.Exception: boom",
                "04-25 09:55:47.799  3064  3082 I TestRunner: \tat Foo.bar(Foo.java:1)",
            ])
            .unwrap();

        let log = item.system_log.get().unwrap();
        assert_eq!(log.events.len(), 1);
        assert_eq!(log.events[0].category(), "TEST_CRASH");
    }

    #[test]
    fn test_parse_reader_and_clear() {
        let mut parser = BugreportParser::new();
        let first = parser
            .parse_reader(Cursor::new(BUGREPORT.as_bytes()))
            .unwrap()
            .unwrap();
        parser.clear();
        let second = parser
            .parse_reader(Cursor::new(BUGREPORT.as_bytes()))
            .unwrap()
            .unwrap();

        assert_eq!(first, second);
    }
}
