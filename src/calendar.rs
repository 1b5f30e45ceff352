use chrono::{DateTime, Duration, Utc};

/// whole 24h periods from `from` to `to`, floored; negative when `to` is earlier
pub fn days_elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let seconds = (to - from).num_seconds();
    seconds.div_euclid(Duration::days(1).num_seconds())
}

/// `date` plus a tenure expressed in days
pub fn add_days(date: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    date + Duration::days(days as i64)
}
