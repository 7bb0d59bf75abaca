use crate::item::{ProcrankEntry, ProcrankItem};
use crate::parser::BlockParser;
use once_cell::sync::Lazy;
use regex::Regex;

/// `  PID      Vss      Rss      Pss      Uss  [Swap  PSwap  USwap  ZSwap]  cmdline`
static ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?P<pid>\d+)\s+(?P<vss>\d+)K\s+(?P<rss>\d+)K\s+(?P<pss>\d+)K\s+(?P<uss>\d+)K\s+(?:\d+K\s+)*(?P<name>\S.*?)\s*$",
    )
    .unwrap()
});

/// Parses the `PROCRANK` table
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcrankParser;

impl ProcrankParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for ProcrankParser {
    type Output = ProcrankItem;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<ProcrankItem> {
        let processes: Vec<ProcrankEntry> = lines
            .iter()
            .filter_map(|line| {
                let c = ROW_RE.captures(line.as_ref())?;
                Some(ProcrankEntry {
                    pid: c["pid"].parse().ok()?,
                    vss: c["vss"].parse().ok()?,
                    rss: c["rss"].parse().ok()?,
                    pss: c["pss"].parse().ok()?,
                    uss: c["uss"].parse().ok()?,
                    process_name: c["name"].to_string(),
                })
            })
            .collect();

        (!processes.is_empty()).then_some(ProcrankItem { processes })
    }
}
