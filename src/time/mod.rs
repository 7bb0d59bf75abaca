mod anchor;
mod conversion;

pub use anchor::{infer_year, parse_dumpstate_line, TimeAnchor};
pub use conversion::{parse_datetime, parse_duration_ms, parse_month_day_time, to_utc};
