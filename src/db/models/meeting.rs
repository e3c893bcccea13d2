//! Meeting models.
//!
//! A meeting owns its agenda. `agenda` is kept sorted by `order`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agenda_item::AgendaItem;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MeetingStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl Default for MeetingStatus {
    fn default() -> Self {
        MeetingStatus::Scheduled
    }
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "Scheduled",
            MeetingStatus::InProgress => "InProgress",
            MeetingStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub title: String,
    pub status: MeetingStatus,
    pub auto_transition: bool,
    #[serde(default)]
    pub agenda: Vec<AgendaItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            status: MeetingStatus::Scheduled,
            auto_transition: false,
            agenda: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn item(&self, agenda_id: &str) -> Option<&AgendaItem> {
        self.agenda.iter().find(|item| item.id == agenda_id)
    }

    pub fn item_mut(&mut self, agenda_id: &str) -> Option<&mut AgendaItem> {
        self.agenda.iter_mut().find(|item| item.id == agenda_id)
    }

    pub fn position(&self, agenda_id: &str) -> Option<usize> {
        self.agenda.iter().position(|item| item.id == agenda_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPatch {
    pub status: Option<MeetingStatus>,
    pub title: Option<String>,
    pub auto_transition: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-item line of a finished (or in-flight) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItemSummary {
    pub id: String,
    pub title: String,
    pub planned_duration: u64,
    pub actual_duration: u64,
    pub overrun_sec: u64,
    pub extend_count: usize,
    pub borrow_count: usize,
    pub skipped: bool,
}

/// Summary of a meeting for reporting after a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSummary {
    pub id: String,
    pub title: String,
    pub status: MeetingStatus,
    pub total_planned: u64,
    pub total_actual: u64,
    pub items: Vec<AgendaItemSummary>,
}
