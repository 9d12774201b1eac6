use chrono::{DateTime, Utc};
use tera::Tera;

use crate::config::{
    SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE, SECONDS_PER_MONTH, SECONDS_PER_YEAR,
    TEMPLATE_GLOB,
};
use crate::error::AppError;

/// Initialize the Tera template engine
pub fn init_templates() -> Result<Tera, AppError> {
    let mut tera = Tera::new(TEMPLATE_GLOB)?;
    tera.register_filter("timeago", timeago_filter);
    Ok(tera)
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

/// Human-readable relative time, e.g. "2 hours ago"
fn relative_time(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(date).num_seconds();

    if seconds < 0 {
        "in the future".to_string()
    } else if seconds < SECONDS_PER_MINUTE {
        "just now".to_string()
    } else if seconds < SECONDS_PER_HOUR {
        plural(seconds / SECONDS_PER_MINUTE, "minute")
    } else if seconds < SECONDS_PER_DAY {
        plural(seconds / SECONDS_PER_HOUR, "hour")
    } else if seconds < SECONDS_PER_MONTH {
        plural(seconds / SECONDS_PER_DAY, "day")
    } else if seconds < SECONDS_PER_YEAR {
        plural(seconds / SECONDS_PER_MONTH, "month")
    } else {
        plural(seconds / SECONDS_PER_YEAR, "year")
    }
}

/// Convert an RFC 3339 timestamp to relative time; other strings pass through
fn timeago_filter(
    value: &tera::Value,
    _args: &std::collections::HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let date_str = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("timeago filter expects a string"))?;

    let result = match DateTime::parse_from_rfc3339(date_str) {
        Ok(date) => relative_time(date.with_timezone(&Utc), Utc::now()),
        Err(_) => date_str.to_string(),
    };
    Ok(tera::Value::String(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_relative_time_units() {
        let now = Utc::now();
        assert_eq!(relative_time(now, now), "just now");
        assert_eq!(relative_time(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(relative_time(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(relative_time(now - Duration::days(3), now), "3 days ago");
        assert_eq!(relative_time(now + Duration::hours(1), now), "in the future");
    }

    #[test]
    fn test_timeago_passes_through_unparseable() {
        let value = tera::Value::String("yesterday-ish".into());
        let out = timeago_filter(&value, &Default::default()).unwrap();
        assert_eq!(out, tera::Value::String("yesterday-ish".into()));
    }
}
