use crate::item::SystemPropsItem;
use crate::parser::BlockParser;
use once_cell::sync::Lazy;
use regex::Regex;

/// `[ro.build.id]: [IMM76D]`
static PROP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(?P<key>[^\]]+)\]: \[(?P<value>.*)\]$").unwrap()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPropsParser;

impl SystemPropsParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for SystemPropsParser {
    type Output = SystemPropsItem;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<SystemPropsItem> {
        let mut item = SystemPropsItem::default();

        for line in lines.iter().map(AsRef::as_ref) {
            if let Some(c) = PROP_RE.captures(line.trim()) {
                item.properties
                    .insert(c["key"].to_string(), c["value"].to_string());
            }
        }

        (!item.properties.is_empty()).then_some(item)
    }
}
