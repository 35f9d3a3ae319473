//! Process-wide ambient timestamp, used for synthesized creation times
//! (default namespace, node) that have no engine-side counterpart.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};

static START_TIME: OnceLock<DateTime<Utc>> = OnceLock::new();

/// The time this process started. Read-only after first access; treat the
/// first call anywhere in the process as construction.
pub fn process_start_time() -> DateTime<Utc> {
    *START_TIME.get_or_init(Utc::now)
}

pub fn format_rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339()
}

pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
