use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::db::models::{DeliveryChannel, DeliveryStatus};
use crate::producers::FragmentKind;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fixed-width UTC form, so stored timestamps also sort lexically.
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

pub fn to_json<T: Serialize>(value: &T, field: &str) -> Result<String> {
    serde_json::to_string(value).with_context(|| format!("failed to encode {field}"))
}

pub fn parse_json<T: DeserializeOwned>(raw: &str, field: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("failed to decode {field}"))
}

pub fn parse_kind(value: &str) -> Result<FragmentKind> {
    FragmentKind::from_db(value).ok_or_else(|| anyhow!("unknown fragment kind {value}"))
}

pub fn parse_delivery_status(value: &str) -> Result<DeliveryStatus> {
    match value {
        "scheduled" => Ok(DeliveryStatus::Scheduled),
        "delivered" => Ok(DeliveryStatus::Delivered),
        "failed" => Ok(DeliveryStatus::Failed),
        other => Err(anyhow!("unknown delivery status {other}")),
    }
}

pub fn parse_channel(value: &str) -> Result<DeliveryChannel> {
    match value {
        "email" => Ok(DeliveryChannel::Email),
        "log" => Ok(DeliveryChannel::Log),
        other => Err(anyhow!("unknown delivery channel {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_format_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2031, 5, 1, 9, 0, 0).unwrap();
        assert_eq!(format_datetime(&whole), "2031-05-01T09:00:00.000Z");
        assert_eq!(parse_datetime(&format_datetime(&whole), "t").unwrap(), whole);
    }

    #[test]
    fn test_parse_datetime_accepts_offsets() {
        let parsed = parse_datetime("2031-05-01T11:00:00+02:00", "t").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2031, 5, 1, 9, 0, 0).unwrap());
        assert!(parse_datetime("yesterday", "delivery_date").is_err());
    }

    #[test]
    fn test_enum_labels() {
        assert_eq!(parse_delivery_status("failed").unwrap(), DeliveryStatus::Failed);
        assert!(parse_delivery_status("lost").is_err());
        assert_eq!(parse_channel("email").unwrap(), DeliveryChannel::Email);
        assert_eq!(parse_kind("audio").unwrap(), FragmentKind::Transcribed);
    }
}
