//! Conversion from `chrono::DateTime<Utc>` (the type the engine model uses
//! for timestamps) to the `k8s_openapi` `Time` wrapper, which is backed by
//! `jiff::Timestamp`.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

/// Convert an engine timestamp into the `k8s_openapi` `Time` type.
pub fn to_k8s_time(dt: DateTime<Utc>) -> Time {
    let seconds = dt.timestamp();
    let nanos = dt.timestamp_subsec_nanos() as i32;
    Time(
        jiff::Timestamp::new(seconds, nanos)
            .unwrap_or_else(|_| jiff::Timestamp::new(seconds, 0).expect("valid timestamp seconds")),
    )
}
