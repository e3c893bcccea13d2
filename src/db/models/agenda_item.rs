//! Agenda item models.
//!
//! An agenda item is one timeboxed segment of a meeting. `planned_duration`
//! and `actual_duration` are whole seconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decision::OverrunDecision;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AgendaStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Overtime,
}

impl Default for AgendaStatus {
    fn default() -> Self {
        AgendaStatus::Pending
    }
}

impl AgendaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgendaStatus::Pending => "pending",
            AgendaStatus::Running => "running",
            AgendaStatus::Paused => "paused",
            AgendaStatus::Completed => "completed",
            AgendaStatus::Overtime => "overtime",
        }
    }

    /// True for the states only the current item may hold.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AgendaStatus::Running | AgendaStatus::Paused | AgendaStatus::Overtime
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItem {
    pub id: String,
    pub meeting_id: String,
    pub title: String,
    pub order: u32,
    pub planned_duration: u64,
    pub actual_duration: u64,
    pub status: AgendaStatus,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub overrun_decisions: Vec<OverrunDecision>,
}

impl AgendaItem {
    pub fn new(meeting_id: &str, title: impl Into<String>, order: u32, planned_duration: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            meeting_id: meeting_id.to_string(),
            title: title.into(),
            order,
            planned_duration,
            actual_duration: 0,
            status: AgendaStatus::Pending,
            start_at: None,
            end_at: None,
            overrun_decisions: Vec::new(),
        }
    }

    pub fn overrun_sec(&self) -> u64 {
        self.actual_duration.saturating_sub(self.planned_duration)
    }
}

/// Partial update handed to the persistence layer. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgendaPatch {
    pub planned_duration: Option<u64>,
    pub actual_duration: Option<u64>,
    pub status: Option<AgendaStatus>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub order: Option<u32>,
    pub title: Option<String>,
}

impl AgendaPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
