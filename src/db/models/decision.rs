use std::{fmt, str::FromStr};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DecisionKind {
    Extend,
    Borrow,
    #[serde(alias = "skip")]
    Next,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Extend => "extend",
            DecisionKind::Borrow => "borrow",
            DecisionKind::Next => "next",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "extend" => Ok(DecisionKind::Extend),
            "borrow" => Ok(DecisionKind::Borrow),
            "next" | "skip" => Ok(DecisionKind::Next),
            other => Err(anyhow!("unknown overrun decision kind '{other}'")),
        }
    }
}

/// One entry in an agenda item's overrun ledger. Entries are never edited once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverrunDecision {
    #[serde(rename = "type")]
    pub kind: DecisionKind,
    pub amount_sec: Option<u64>,
    pub at: DateTime<Utc>,
    pub from_agenda_id: Option<String>,
    pub to_agenda_id: Option<String>,
}

impl OverrunDecision {
    pub fn extend(agenda_id: &str, amount_sec: u64, at: DateTime<Utc>) -> Self {
        Self {
            kind: DecisionKind::Extend,
            amount_sec: Some(amount_sec),
            at,
            from_agenda_id: Some(agenda_id.to_string()),
            to_agenda_id: Some(agenda_id.to_string()),
        }
    }

    pub fn borrow(from_agenda_id: &str, to_agenda_id: &str, amount_sec: u64, at: DateTime<Utc>) -> Self {
        Self {
            kind: DecisionKind::Borrow,
            amount_sec: Some(amount_sec),
            at,
            from_agenda_id: Some(from_agenda_id.to_string()),
            to_agenda_id: Some(to_agenda_id.to_string()),
        }
    }

    pub fn next(agenda_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            kind: DecisionKind::Next,
            amount_sec: None,
            at,
            from_agenda_id: Some(agenda_id.to_string()),
            to_agenda_id: None,
        }
    }
}
