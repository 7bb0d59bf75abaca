use crate::error::{ReportError, Result};
use crate::time::anchor::TimeAnchor;
use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Convert a device-local time to UTC.
/// Handles DST boundaries safely.
pub fn to_utc(naive: NaiveDateTime, anchor: &TimeAnchor) -> Result<DateTime<Utc>> {
    match anchor.tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _later) => {
            // DST ends: same local time maps to two UTC times
            // Strategy: use earlier interpretation (conservative)
            log::debug!(
                "Ambiguous time {} in {}, using earlier interpretation",
                naive, anchor.tz
            );
            Ok(earlier.with_timezone(&Utc))
        }
        LocalResult::None => {
            // DST starts: certain local times don't exist
            // Strategy: shift forward by 1 hour
            let adjusted = naive + chrono::Duration::hours(1);
            match anchor.tz.from_local_datetime(&adjusted) {
                LocalResult::Single(dt) => {
                    log::debug!(
                        "Non-existent time {} in {}, adjusted to {}",
                        naive, anchor.tz, dt
                    );
                    Ok(dt.with_timezone(&Utc))
                }
                _ => Err(ReportError::TimeConversion {
                    input: naive.to_string(),
                    reason: format!("DST gap in timezone {}", anchor.tz),
                }),
            }
        }
    }
}

/// Parse a logcat timestamp (`MM-DD HH:MM:SS.mmm`), taking the year from the anchor
pub fn parse_month_day_time(ts: &str, anchor: &TimeAnchor) -> Result<NaiveDateTime> {
    let err = |reason: &str| ReportError::TimeConversion {
        input: ts.to_string(),
        reason: reason.to_string(),
    };

    let (md, rest) = ts
        .trim()
        .split_once(' ')
        .ok_or_else(|| err("missing space separator"))?;
    let (mon_s, day_s) = md
        .split_once('-')
        .ok_or_else(|| err("invalid month-day format"))?;
    let mon: u32 = mon_s.parse().map_err(|_| err("invalid month"))?;
    let day: u32 = day_s.parse().map_err(|_| err("invalid day"))?;

    let (hms, ms_s) = rest
        .trim()
        .split_once('.')
        .unwrap_or((rest.trim(), "0"));
    let mut it = hms.split(':').map(str::parse::<u32>);
    let mut next = |name: &str| -> Result<u32> {
        it.next()
            .ok_or_else(|| err(&format!("missing {}", name)))?
            .map_err(|_| err(&format!("invalid {}", name)))
    };
    let h = next("hour")?;
    let m = next("minute")?;
    let s = next("second")?;

    let ms: u32 = ms_s
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .take(3)
        .collect::<String>()
        .parse()
        .map_err(|_| err("invalid milliseconds"))?;

    let year = anchor.year_for(mon, day);
    let date = NaiveDate::from_ymd_opt(year, mon, day)
        .ok_or_else(|| err(&format!("invalid date: {}-{}-{}", year, mon, day)))?;
    let time = NaiveTime::from_hms_milli_opt(h, m, s, ms)
        .ok_or_else(|| err(&format!("invalid time: {}:{}:{}.{}", h, m, s, ms)))?;

    Ok(NaiveDateTime::new(date, time))
}

/// Parse a full `YYYY-MM-DD HH:MM:SS[.fff]` timestamp
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let candidates = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

    candidates
        .iter()
        .find_map(|pat| NaiveDateTime::parse_from_str(s.trim(), pat).ok())
}

/// Parse a battery-stats style duration (`1d 2h 5m 30s 12ms`) into milliseconds
pub fn parse_duration_ms(s: &str) -> Option<i64> {
    let mut total = 0i64;
    let mut seen = false;

    for token in s.split_whitespace() {
        let split = token.find(|c: char| !c.is_ascii_digit())?;
        let (num, unit) = token.split_at(split);
        let value: i64 = num.parse().ok()?;
        let factor = match unit {
            "d" => 86_400_000,
            "h" => 3_600_000,
            "m" => 60_000,
            "s" => 1_000,
            "ms" => 1,
            _ => return None,
        };
        total = total.checked_add(value.checked_mul(factor)?)?;
        seen = true;
    }

    seen.then_some(total)
}
