use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

/// Time anchor derived from bugreport content
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAnchor {
    pub tz: Tz,
    pub year: i32,
    pub report_date: Option<NaiveDate>,
}

static DUMPSTATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^== dumpstate:\s*(?P<ts>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})").unwrap()
});

impl TimeAnchor {
    /// Build an anchor from a `persist.sys.timezone` value and the report date.
    /// Unknown zones fall back to UTC.
    pub fn from_parts(tz_name: Option<&str>, report_date: Option<NaiveDate>) -> Self {
        let tz = tz_name
            .and_then(|name| name.trim().parse::<Tz>().ok())
            .unwrap_or(chrono_tz::UTC);
        let year = report_date
            .map(|d| d.year())
            .unwrap_or_else(|| Local::now().year());

        TimeAnchor { tz, year, report_date }
    }

    /// Year to give a `MM-DD` timestamp
    pub fn year_for(&self, mon: u32, day: u32) -> i32 {
        match self.report_date {
            Some(reference) => infer_year(mon, day, reference),
            None => self.year,
        }
    }
}

/// Report time from a `== dumpstate: 2024-08-24 14:22:33` line
pub fn parse_dumpstate_line(line: &str) -> Option<NaiveDateTime> {
    let cap = DUMPSTATE_RE.captures(line)?;
    NaiveDateTime::parse_from_str(&cap["ts"], "%Y-%m-%d %H:%M:%S").ok()
}

/// Infer the most likely year for a given month/day based on reference date
pub fn infer_year(mon: u32, day: u32, reference: NaiveDate) -> i32 {
    let ref_year = reference.year();

    // Try current year, previous year, and next year
    let candidates = [ref_year, ref_year - 1, ref_year + 1];

    candidates
        .into_iter()
        .filter_map(|y| NaiveDate::from_ymd_opt(y, mon, day))
        .min_by_key(|d| d.signed_duration_since(reference).num_days().abs())
        .map(|d| d.year())
        .unwrap_or(ref_year)
}
