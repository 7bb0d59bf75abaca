use crate::item::WifiStatsItem;
use crate::parser::BlockParser;
use crate::patterns::{LineMatcher, PatternRegistry};

const SCAN: &str = "SCAN";
const DISCONNECT: &str = "DISCONNECT";
const ASSOCIATION: &str = "ASSOCIATION";

/// Counts state machine messages in the `dumpsys wifi` history
#[derive(Debug, Clone)]
pub struct WifiStatsParser {
    patterns: PatternRegistry,
}

impl Default for WifiStatsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiStatsParser {
    pub fn new() -> Self {
        let mut patterns = PatternRegistry::new();
        patterns
            .add_pattern(LineMatcher::contains("CMD_START_SCAN"), SCAN)
            .add_pattern(LineMatcher::contains("NETWORK_DISCONNECTION_EVENT"), DISCONNECT)
            .add_pattern(LineMatcher::contains("ASSOCIATED_BSSID_EVENT"), ASSOCIATION);
        Self { patterns }
    }
}

impl BlockParser for WifiStatsParser {
    type Output = WifiStatsItem;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<WifiStatsItem> {
        let mut item = WifiStatsItem::default();

        for line in lines.iter().map(AsRef::as_ref) {
            match self.patterns.classify(line) {
                Some(SCAN) => item.scans += 1,
                Some(DISCONNECT) => item.disconnects += 1,
                Some(ASSOCIATION) => item.associations += 1,
                _ => {}
            }
        }

        if item.scans == 0 && item.disconnects == 0 && item.associations == 0 {
            return None;
        }
        Some(item)
    }
}
