//! Parsers for the service dumps inside the `DUMPSYS` section.

mod battery_stats;
mod package_stats;
mod wifi_stats;

pub use battery_stats::BatteryStatsParser;
pub use package_stats::PackageStatsParser;
pub use wifi_stats::WifiStatsParser;

use crate::item::{BatteryStatsItem, DumpsysItem, PackageStatsItem, WifiStatsItem};
use crate::parser::section::{
    BlockSection, HeaderSyntax, SectionDefinition, SectionDispatcher,
};
use crate::parser::StreamParser;

/// Item produced by one service block
#[derive(Debug)]
pub enum ServiceItem {
    BatteryStats(BatteryStatsItem),
    WifiStats(WifiStatsItem),
    PackageStats(PackageStatsItem),
}

/// Splits `dumpsys` output into `DUMP OF SERVICE` blocks and parses the
/// services it knows about. Other services are skipped.
pub struct DumpsysParser {
    dispatcher: SectionDispatcher<ServiceItem>,
}

impl Default for DumpsysParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DumpsysParser {
    pub fn new() -> Self {
        let dispatcher = SectionDispatcher::new(HeaderSyntax::dumpsys())
            .with_section(SectionDefinition::new(
                "batterystats",
                &["batterystats"],
                BlockSection::new(BatteryStatsParser::new(), ServiceItem::BatteryStats),
            ))
            .with_section(SectionDefinition::new(
                "wifi",
                &["wifi"],
                BlockSection::new(WifiStatsParser::new(), ServiceItem::WifiStats),
            ))
            .with_section(SectionDefinition::new(
                "package",
                &["package"],
                BlockSection::new(PackageStatsParser::new(), ServiceItem::PackageStats),
            ));

        Self { dispatcher }
    }
}

impl StreamParser for DumpsysParser {
    type Output = DumpsysItem;

    fn parse_line(&mut self, line: &str) {
        self.dispatcher.feed(line);
    }

    fn finish(&mut self) -> Option<DumpsysItem> {
        let mut result = self.dispatcher.finish();
        let mut item = DumpsysItem::default();

        if let Some(ServiceItem::BatteryStats(stats)) = result.take("batterystats").into_option() {
            item.battery_stats = Some(stats);
        }
        if let Some(ServiceItem::WifiStats(stats)) = result.take("wifi").into_option() {
            item.wifi_stats = Some(stats);
        }
        if let Some(ServiceItem::PackageStats(stats)) = result.take("package").into_option() {
            item.package_stats = Some(stats);
        }

        if item.battery_stats.is_none() && item.wifi_stats.is_none() && item.package_stats.is_none() {
            return None;
        }
        Some(item)
    }

    fn clear(&mut self) {
        self.dispatcher.clear();
    }
}
