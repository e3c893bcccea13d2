use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::{AgendaStatus, MeetingStatus};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} value {value} is out of range"))
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

pub fn parse_meeting_status(value: &str) -> Result<MeetingStatus> {
    match value {
        "Scheduled" => Ok(MeetingStatus::Scheduled),
        "InProgress" => Ok(MeetingStatus::InProgress),
        "Completed" => Ok(MeetingStatus::Completed),
        other => Err(anyhow!("unknown meeting status {other}")),
    }
}

pub fn parse_agenda_status(value: &str) -> Result<AgendaStatus> {
    match value {
        "pending" => Ok(AgendaStatus::Pending),
        "running" => Ok(AgendaStatus::Running),
        "paused" => Ok(AgendaStatus::Paused),
        "completed" => Ok(AgendaStatus::Completed),
        "overtime" => Ok(AgendaStatus::Overtime),
        other => Err(anyhow!("unknown agenda status {other}")),
    }
}
