use serde::{Deserialize, Serialize};

use crate::db::models::AgendaStatus;

/// Timing accumulators for the current agenda item.
///
/// Elapsed time is `baseline_ms + now - started_at_ms - accumulated_pause_ms`,
/// frozen at `paused_at_ms` while a pause is open. Milliseconds are floored to whole
/// seconds before anything is written to the agenda.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunClockState {
    pub current_agenda_id: Option<String>,
    pub is_running: bool,
    pub started_at_ms: Option<u64>,
    pub paused_at_ms: Option<u64>,
    pub accumulated_pause_ms: u64,
    /// Time carried over from earlier running windows of the same item
    /// (a `stop` followed by another `start`).
    pub baseline_ms: u64,
    /// Last whole-second value written to the current item's `actual_duration`.
    pub last_emitted_sec: u64,
}

impl RunClockState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at_ms.is_some()
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        let Some(started) = self.started_at_ms else {
            return self.baseline_ms;
        };
        let upto = self.paused_at_ms.unwrap_or(now_ms);
        let window = upto
            .saturating_sub(started)
            .saturating_sub(self.accumulated_pause_ms);
        self.baseline_ms.saturating_add(window)
    }

    pub fn elapsed_sec(&self, now_ms: u64) -> u64 {
        self.elapsed_ms(now_ms) / 1000
    }

    /// Opens a fresh timing window for a new current item.
    pub fn reset_window(&mut self, now_ms: u64) {
        self.started_at_ms = Some(now_ms);
        self.paused_at_ms = None;
        self.accumulated_pause_ms = 0;
        self.baseline_ms = 0;
        self.last_emitted_sec = 0;
    }

    /// Freezes elapsed time into `baseline_ms` and closes the window.
    pub fn fold_window(&mut self, now_ms: u64) {
        self.baseline_ms = self.elapsed_ms(now_ms);
        self.started_at_ms = None;
        self.paused_at_ms = None;
        self.accumulated_pause_ms = 0;
    }

    /// Reopens a folded window; elapsed time continues from `baseline_ms`.
    pub fn reopen_window(&mut self, now_ms: u64) {
        self.started_at_ms = Some(now_ms);
        self.paused_at_ms = None;
        self.accumulated_pause_ms = 0;
    }

    pub fn has_window(&self) -> bool {
        self.started_at_ms.is_some()
    }

    pub fn begin_pause(&mut self, now_ms: u64) {
        if self.paused_at_ms.is_none() {
            self.paused_at_ms = Some(now_ms);
        }
    }

    /// Closes an open pause, returning how long it lasted.
    pub fn end_pause(&mut self, now_ms: u64) -> u64 {
        match self.paused_at_ms.take() {
            Some(paused_at) => {
                let span = now_ms.saturating_sub(paused_at);
                self.accumulated_pause_ms = self.accumulated_pause_ms.saturating_add(span);
                span
            }
            None => 0,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Status label for the current item given its accounting.
    pub fn derive_status(&self, actual_duration: u64, planned_duration: u64) -> AgendaStatus {
        if self.is_paused() {
            AgendaStatus::Paused
        } else if actual_duration >= planned_duration {
            AgendaStatus::Overtime
        } else {
            AgendaStatus::Running
        }
    }
}
