use crate::item::TopItem;
use crate::parser::BlockParser;
use once_cell::sync::Lazy;
use regex::Regex;

/// `User 20 + Nice 0 + Sys 11 + Idle 295 + IOW 0 + IRQ 0 + SIRQ 0 = 326`
static TICKS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"User (?P<user>\d+) \+ Nice (?P<nice>\d+) \+ Sys (?P<sys>\d+) \+ Idle (?P<idle>\d+) \+ IOW (?P<iow>\d+) \+ IRQ (?P<irq>\d+) \+ SIRQ (?P<sirq>\d+) = (?P<total>\d+)",
    )
    .unwrap()
});

/// Parses the tick summary printed by `top`
#[derive(Debug, Clone, Copy, Default)]
pub struct TopParser;

impl TopParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for TopParser {
    type Output = TopItem;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<TopItem> {
        let c = lines
            .iter()
            .find_map(|line| TICKS_RE.captures(line.as_ref()))?;
        let field = |name: &str| c[name].parse::<i64>().ok();

        Some(TopItem {
            user: field("user")?,
            nice: field("nice")?,
            system: field("sys")?,
            idle: field("idle")?,
            iow: field("iow")?,
            irq: field("irq")?,
            sirq: field("sirq")?,
            total: field("total")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top() {
        let lines = [
            "User 3%, System 3%, IOW 0%, IRQ 0%",
            "User 20 + Nice 0 + Sys 11 + Idle 295 + IOW 0 + IRQ 0 + SIRQ 1 = 327",
            "",
            "  PID PR CPU% S  #THR     VSS     RSS PCY UID      Name",
        ];
        let item = TopParser::new().parse(&lines).unwrap();

        assert_eq!(item.user, 20);
        assert_eq!(item.system, 11);
        assert_eq!(item.idle, 295);
        assert_eq!(item.sirq, 1);
        assert_eq!(item.total, 327);
    }

    #[test]
    fn test_no_summary() {
        assert!(TopParser::new().parse(&["User 3%, System 3%"]).is_none());
    }

    #[test]
    fn test_summary_among_noise() {
        let lines = [
            "garbage",
            "User 20 + Nice 0 + Sys 11 + Idle 295 + IOW 0 + IRQ 0 + SIRQ 1 = 327",
            "  1234  0   0% S    12  1000K   500K  fg u0_a1   noise",
        ];
        let item = TopParser::new().parse(&lines).unwrap();
        assert_eq!(item.total, 327);
        assert_eq!(item.idle, 295);
    }
}
