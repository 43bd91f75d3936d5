use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::pose::{Intensity, PoseClass};

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_intensity(value: &str) -> Result<Intensity> {
    value
        .parse()
        .with_context(|| "failed to parse intensity".to_string())
}

pub fn parse_pose(value: &str) -> Result<PoseClass> {
    value
        .parse()
        .with_context(|| "failed to parse pose".to_string())
}
