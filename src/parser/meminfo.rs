use crate::item::MemInfoItem;
use crate::parser::BlockParser;
use once_cell::sync::Lazy;
use regex::Regex;

/// `MemTotal:         376556 kB`
static MEMINFO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<key>[^:]+):\s*(?P<value>\d+)(?:\s*kB)?\s*$").unwrap()
});

/// Parses `/proc/meminfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct MemInfoParser;

impl MemInfoParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for MemInfoParser {
    type Output = MemInfoItem;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<MemInfoItem> {
        let mut item = MemInfoItem::default();

        for line in lines.iter().map(AsRef::as_ref) {
            if let Some(c) = MEMINFO_RE.captures(line.trim()) {
                if let Ok(value) = c["value"].parse() {
                    item.entries.insert(c["key"].trim().to_string(), value);
                }
            }
        }

        (!item.entries.is_empty()).then_some(item)
    }
}
