//! Boundary notifications for the current agenda item.
//!
//! The run-clock decides *when* to notify; a [`Notifier`] decides *how*
//! (log line, bell, UI toast). A failing notifier never stops the clock.

use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Start,
    Warning,
    End,
    Overtime,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Start => "start",
            NotificationKind::Warning => "warning",
            NotificationKind::End => "end",
            NotificationKind::Overtime => "overtime",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub agenda_id: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        log_info!(
            "[{}] {} ({})",
            notification.kind.as_str(),
            notification.message,
            notification.agenda_id
        );
        Ok(())
    }
}

/// Keeps every notification in memory. Handy for callers that poll.
#[derive(Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.received
            .lock()
            .map(|guard| guard.iter().map(|n| n.kind).collect())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        if let Ok(mut guard) = self.received.lock() {
            guard.push(notification.clone());
        }
        Ok(())
    }
}

/// Fans a notification out to several notifiers. Every notifier is tried;
/// the first error is returned.
pub struct FanoutNotifier {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        let mut first_err = None;
        for notifier in &self.notifiers {
            if let Err(err) = notifier.notify(notification) {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Tracks which boundaries of the current item have already fired.
///
/// Boundaries re-arm when an extend or borrow moves the item back behind them.
#[derive(Debug, Clone, Default)]
pub struct BoundaryTracker {
    started: bool,
    warned: bool,
    ended: bool,
    overtime_minutes: u64,
}

impl BoundaryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns the start notification the first time it is called for an item.
    pub fn on_start(&mut self) -> Option<NotificationKind> {
        if self.started {
            return None;
        }
        self.started = true;
        Some(NotificationKind::Start)
    }

    /// Re-arms boundaries the item is back behind after its plan grew,
    /// without firing anything.
    pub fn rearm(&mut self, actual_sec: u64, planned_sec: u64, warning_threshold_sec: u64) {
        if planned_sec.saturating_sub(actual_sec) > warning_threshold_sec {
            self.warned = false;
        }
        if actual_sec < planned_sec {
            self.ended = false;
            self.overtime_minutes = 0;
        }
    }

    /// Boundaries crossed given the item's latest accounting.
    pub fn observe(
        &mut self,
        actual_sec: u64,
        planned_sec: u64,
        warning_threshold_sec: u64,
    ) -> Vec<(NotificationKind, u64)> {
        let mut crossed = Vec::new();
        let remaining = planned_sec.saturating_sub(actual_sec);
        self.rearm(actual_sec, planned_sec, warning_threshold_sec);

        if !self.warned
            && planned_sec > warning_threshold_sec
            && remaining > 0
            && remaining <= warning_threshold_sec
        {
            self.warned = true;
            crossed.push((NotificationKind::Warning, remaining));
        }

        if actual_sec >= planned_sec {
            if !self.ended {
                self.ended = true;
                // Reaching the plan also satisfies the warning.
                self.warned = true;
                crossed.push((NotificationKind::End, 0));
            }
            let minutes = (actual_sec - planned_sec) / 60;
            if minutes > self.overtime_minutes {
                self.overtime_minutes = minutes;
                crossed.push((NotificationKind::Overtime, minutes));
            }
        }

        crossed
    }
}

pub fn message_for(kind: NotificationKind, title: &str, value: u64) -> String {
    match kind {
        NotificationKind::Start => format!("Started \"{title}\""),
        NotificationKind::Warning => {
            let minutes = (value + 59) / 60;
            format!("{minutes} min left for \"{title}\"")
        }
        NotificationKind::End => format!("Time is up for \"{title}\""),
        NotificationKind::Overtime => format!("\"{title}\" is {value} min over"),
    }
}
