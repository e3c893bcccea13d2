//! The agenda run-clock.
//!
//! Converts meeting commands into state transitions over the active meeting's
//! agenda and keeps the current item's `actual_duration` in step with the
//! clock. Every command either applies completely or returns a [`ClockError`]
//! with nothing changed. Side effects for the outside world (persistence
//! patches, notifications) are queued as [`ClockEvent`]s and drained by the
//! caller.

use serde::Serialize;

use crate::clock::SharedClock;
use crate::db::models::{
    AgendaItem, AgendaPatch, AgendaStatus, Meeting, MeetingPatch, MeetingStatus, OverrunDecision,
};

use super::error::{ClockError, ClockResult};
use super::notify::{message_for, BoundaryTracker, Notification, NotificationKind};
use super::state::RunClockState;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub const DEFAULT_WARNING_THRESHOLD_SEC: u64 = 5 * 60;

#[derive(Debug, Clone, PartialEq)]
pub enum ClockEvent {
    AgendaPatched {
        meeting_id: String,
        agenda_id: String,
        patch: AgendaPatch,
    },
    DecisionAppended {
        meeting_id: String,
        agenda_id: String,
        decision: OverrunDecision,
    },
    MeetingPatched {
        meeting_id: String,
        patch: MeetingPatch,
    },
    Notify(Notification),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunClockSnapshot {
    pub state: RunClockState,
    pub meeting_id: Option<String>,
    pub meeting_status: Option<MeetingStatus>,
    pub current: Option<AgendaItem>,
    pub elapsed_sec: u64,
    pub remaining_sec: u64,
    pub is_paused: bool,
}

pub struct RunClock {
    meeting: Option<Meeting>,
    state: RunClockState,
    clock: SharedClock,
    boundaries: BoundaryTracker,
    warning_threshold_sec: u64,
    outbox: Vec<ClockEvent>,
}

impl RunClock {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            meeting: None,
            state: RunClockState::new(),
            clock,
            boundaries: BoundaryTracker::new(),
            warning_threshold_sec: DEFAULT_WARNING_THRESHOLD_SEC,
            outbox: Vec::new(),
        }
    }

    pub fn with_warning_threshold(mut self, seconds: u64) -> Self {
        self.warning_threshold_sec = seconds;
        self
    }

    pub fn set_warning_threshold(&mut self, seconds: u64) {
        self.warning_threshold_sec = seconds;
    }

    // ----- meeting selection -------------------------------------------------

    /// Makes `meeting` the active meeting. All timing state is re-initialized.
    pub fn set_meeting(&mut self, mut meeting: Meeting) {
        meeting.agenda.sort_by_key(|item| item.order);
        log_info!("run-clock switched to meeting {}", meeting.id);
        self.meeting = Some(meeting);
        self.state.clear();
        self.boundaries.reset();
    }

    /// Detaches the active meeting, folding the current item's time into it first.
    pub fn take_meeting(&mut self) -> Option<Meeting> {
        if self.state.is_running {
            let now = self.clock.now_ms();
            self.sync_actual(now);
        }
        self.state.clear();
        self.boundaries.reset();
        self.meeting.take()
    }

    pub fn meeting(&self) -> Option<&Meeting> {
        self.meeting.as_ref()
    }

    /// Applies an agenda edit (rename, reorder, delete, ...) to the active meeting.
    ///
    /// Deleting the current item clears it and stops the clock.
    pub fn edit_meeting<T, F>(&mut self, edit: F) -> ClockResult<T>
    where
        F: FnOnce(&mut Meeting) -> ClockResult<T>,
    {
        let meeting = self.meeting.as_mut().ok_or(ClockError::NoActiveMeeting)?;
        let result = edit(meeting)?;

        let current_gone = match self.state.current_agenda_id.as_deref() {
            Some(id) => meeting.item(id).is_none(),
            None => false,
        };
        if current_gone {
            log_warn!("current agenda item was removed; clock stopped");
            self.state.clear();
            self.boundaries.reset();
        }
        Ok(result)
    }

    // ----- queries -----------------------------------------------------------

    pub fn current_agenda_id(&self) -> Option<&str> {
        self.state.current_agenda_id.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn last_emitted_sec(&self) -> u64 {
        self.state.last_emitted_sec
    }

    pub fn state(&self) -> &RunClockState {
        &self.state
    }

    pub fn current_item(&self) -> Option<&AgendaItem> {
        let id = self.state.current_agenda_id.as_deref()?;
        self.meeting.as_ref()?.item(id)
    }

    pub fn snapshot(&self) -> RunClockSnapshot {
        let now = self.clock.now_ms();
        let current = self.current_item().cloned();
        let elapsed_sec = match &current {
            Some(item) => self.state.elapsed_sec(now).max(item.actual_duration),
            None => 0,
        };
        let remaining_sec = current
            .as_ref()
            .map(|item| item.planned_duration.saturating_sub(elapsed_sec))
            .unwrap_or(0);

        RunClockSnapshot {
            state: self.state.clone(),
            meeting_id: self.meeting.as_ref().map(|m| m.id.clone()),
            meeting_status: self.meeting.as_ref().map(|m| m.status),
            current,
            elapsed_sec,
            remaining_sec,
            is_paused: self.state.is_paused(),
        }
    }

    /// Hands over queued persistence patches and notifications.
    pub fn drain_events(&mut self) -> Vec<ClockEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ----- commands ----------------------------------------------------------

    /// Selects the item to run and resets the timing accumulators.
    ///
    /// An item left running/paused by an earlier run is picked up first;
    /// otherwise the lowest-ordered pending item. With neither, no item is current.
    /// Re-selecting the item that is already current keeps its sub-second remainder.
    pub fn initialize(&mut self) -> ClockResult {
        let meeting = self.meeting.as_ref().ok_or(ClockError::NoActiveMeeting)?;

        let next = meeting
            .agenda
            .iter()
            .find(|item| item.status.is_active())
            .or_else(|| first_pending(meeting, None));

        let carried_ms = match next {
            Some(item) if self.state.current_agenda_id.as_deref() == Some(item.id.as_str()) => {
                self.state.elapsed_ms(self.clock.now_ms())
            }
            _ => 0,
        };
        let selected = next.map(|item| (item.id.clone(), item.actual_duration));

        self.state.clear();
        self.boundaries.reset();

        if let Some((id, actual_duration)) = selected {
            self.state.current_agenda_id = Some(id);
            self.state.baseline_ms = carried_ms.max(actual_duration.saturating_mul(1000));
            self.state.last_emitted_sec = actual_duration;
        }
        Ok(())
    }

    pub fn start(&mut self) -> ClockResult {
        if self.meeting.is_none() {
            return Err(ClockError::NoActiveMeeting);
        }
        if self.state.current_agenda_id.is_none() {
            self.initialize()?;
        }
        let current_id = self
            .state
            .current_agenda_id
            .clone()
            .ok_or(ClockError::NoCurrentAgenda)?;
        self.require_item(&current_id)?;

        if self.state.is_running {
            if self.state.is_paused() {
                return self.resume();
            }
            return Ok(());
        }

        let now = self.clock.now_ms();
        if !self.state.has_window() {
            self.state.reopen_window(now);
        }
        self.state.is_running = true;
        self.activate_current(&current_id);
        log_info!("run-clock started agenda item {current_id}");
        Ok(())
    }

    pub fn pause(&mut self) -> ClockResult {
        if self.meeting.is_none() {
            return Err(ClockError::NoActiveMeeting);
        }
        if !self.state.is_running || self.state.is_paused() {
            return Ok(());
        }

        let now = self.clock.now_ms();
        self.sync_actual(now);
        self.state.begin_pause(now);
        if let Some(id) = self.state.current_agenda_id.clone() {
            self.set_status(&id, AgendaStatus::Paused);
        }
        Ok(())
    }

    pub fn resume(&mut self) -> ClockResult {
        if self.meeting.is_none() {
            return Err(ClockError::NoActiveMeeting);
        }
        if !self.state.is_paused() {
            return Ok(());
        }

        let now = self.clock.now_ms();
        let paused_for = self.state.end_pause(now);
        if let Some(id) = self.state.current_agenda_id.clone() {
            self.refresh_status(&id);
            log_info!("resumed agenda item {id} after {paused_for} ms");
        }
        Ok(())
    }

    /// Stops ticking. Current item, its status and its recorded time stay as they are.
    pub fn stop(&mut self) -> ClockResult {
        if self.meeting.is_none() {
            return Err(ClockError::NoActiveMeeting);
        }
        if !self.state.is_running {
            return Ok(());
        }

        let now = self.clock.now_ms();
        self.sync_actual(now);
        self.state.fold_window(now);
        self.state.is_running = false;
        Ok(())
    }

    /// Completes the current item and moves to the next pending one.
    pub fn next_agenda(&mut self) -> ClockResult {
        let current_id = self.require_current()?;
        self.advance_from(&current_id);
        Ok(())
    }

    /// Records a `next` decision on the current item, then advances.
    pub fn skip_current(&mut self) -> ClockResult {
        let current_id = self.require_current()?;
        let at = self.clock.now_utc();
        self.append_decision(&current_id, OverrunDecision::next(&current_id, at));
        self.advance_from(&current_id);
        Ok(())
    }

    pub fn extend_current(&mut self, seconds: u64) -> ClockResult {
        if self.meeting.is_none() {
            return Err(ClockError::NoActiveMeeting);
        }
        if seconds == 0 {
            return Err(ClockError::InvalidAmount);
        }
        let current_id = self.require_current()?;
        self.extend_agenda(&current_id, seconds)
    }

    /// Lengthens any item's timebox and records the decision against it.
    pub fn extend_agenda(&mut self, agenda_id: &str, seconds: u64) -> ClockResult {
        let meeting = self.meeting.as_mut().ok_or(ClockError::NoActiveMeeting)?;
        if seconds == 0 {
            return Err(ClockError::InvalidAmount);
        }
        let item = meeting.item_mut(agenda_id).ok_or(ClockError::AgendaNotFound)?;
        item.planned_duration = item.planned_duration.saturating_add(seconds);
        let planned = item.planned_duration;
        let meeting_id = meeting.id.clone();

        self.outbox.push(ClockEvent::AgendaPatched {
            meeting_id,
            agenda_id: agenda_id.to_string(),
            patch: AgendaPatch {
                planned_duration: Some(planned),
                ..Default::default()
            },
        });
        let at = self.clock.now_utc();
        self.append_decision(agenda_id, OverrunDecision::extend(agenda_id, seconds, at));
        self.after_budget_change(agenda_id);
        Ok(())
    }

    /// Takes `seconds` of planned time from the item right after the current one.
    ///
    /// The current item's own plan is left alone; it simply keeps running on
    /// the budget freed downstream.
    pub fn borrow_from_next(&mut self, seconds: u64) -> ClockResult {
        let meeting = self.meeting.as_ref().ok_or(ClockError::NoActiveMeeting)?;
        if seconds == 0 {
            return Err(ClockError::InvalidAmount);
        }
        let current_id = self
            .state
            .current_agenda_id
            .clone()
            .ok_or(ClockError::NoCurrentAgenda)?;
        let position = meeting
            .position(&current_id)
            .ok_or(ClockError::AgendaNotFound)?;
        let next_id = meeting
            .agenda
            .get(position + 1)
            .map(|item| item.id.clone())
            .ok_or(ClockError::NoNextAgenda)?;

        self.borrow_between(&next_id, &current_id, seconds)
    }

    /// Moves `seconds` of planned time away from `from_id`, recording the
    /// borrow on `to_id`.
    pub fn borrow_between(&mut self, from_id: &str, to_id: &str, seconds: u64) -> ClockResult {
        let meeting = self.meeting.as_mut().ok_or(ClockError::NoActiveMeeting)?;
        if seconds == 0 {
            return Err(ClockError::InvalidAmount);
        }
        if meeting.item(to_id).is_none() {
            return Err(ClockError::AgendaNotFound);
        }
        let from = meeting.item_mut(from_id).ok_or(ClockError::FromNotFound)?;
        let remaining = from
            .planned_duration
            .checked_sub(seconds)
            .ok_or(ClockError::NegativeNext)?;
        from.planned_duration = remaining;
        let meeting_id = meeting.id.clone();

        self.outbox.push(ClockEvent::AgendaPatched {
            meeting_id,
            agenda_id: from_id.to_string(),
            patch: AgendaPatch {
                planned_duration: Some(remaining),
                ..Default::default()
            },
        });
        let at = self.clock.now_utc();
        self.append_decision(to_id, OverrunDecision::borrow(from_id, to_id, seconds, at));
        log_info!("borrowed {seconds}s from {from_id} for {to_id}");
        Ok(())
    }

    /// One sampling tick. Writes the current item's elapsed whole seconds when
    /// they change and fires boundary notifications.
    ///
    /// Safe to call at any time: it re-checks the running and paused flags
    /// itself, so a tick that lands after `pause()` or `stop()` does nothing.
    /// Returns true when `actual_duration` was written.
    pub fn sample(&mut self) -> bool {
        if !self.state.is_running || self.state.is_paused() {
            return false;
        }
        let Some(current_id) = self.state.current_agenda_id.clone() else {
            return false;
        };
        let now = self.clock.now_ms();
        let wrote = self.sync_actual(now);
        self.refresh_status(&current_id);
        self.check_boundaries(&current_id);
        wrote
    }

    // ----- internals ---------------------------------------------------------

    fn require_current(&self) -> ClockResult<String> {
        if self.meeting.is_none() {
            return Err(ClockError::NoActiveMeeting);
        }
        let current_id = self
            .state
            .current_agenda_id
            .clone()
            .ok_or(ClockError::NoCurrentAgenda)?;
        self.require_item(&current_id)?;
        Ok(current_id)
    }

    fn require_item(&self, agenda_id: &str) -> ClockResult {
        let meeting = self.meeting.as_ref().ok_or(ClockError::NoActiveMeeting)?;
        meeting
            .item(agenda_id)
            .map(|_| ())
            .ok_or(ClockError::AgendaNotFound)
    }

    /// Writes elapsed whole seconds into the current item when they moved forward.
    fn sync_actual(&mut self, now_ms: u64) -> bool {
        let Some(current_id) = self.state.current_agenda_id.clone() else {
            return false;
        };
        let elapsed = self.state.elapsed_sec(now_ms);
        if elapsed == self.state.last_emitted_sec {
            return false;
        }
        let Some(meeting) = self.meeting.as_mut() else {
            return false;
        };
        let Some(item) = meeting.item_mut(&current_id) else {
            return false;
        };
        if elapsed <= item.actual_duration {
            self.state.last_emitted_sec = item.actual_duration;
            return false;
        }

        item.actual_duration = elapsed;
        self.state.last_emitted_sec = elapsed;
        log_debug!("agenda item {current_id} at {elapsed}s");
        self.outbox.push(ClockEvent::AgendaPatched {
            meeting_id: meeting.id.clone(),
            agenda_id: current_id,
            patch: AgendaPatch {
                actual_duration: Some(elapsed),
                ..Default::default()
            },
        });
        true
    }

    fn activate_current(&mut self, agenda_id: &str) {
        let at = self.clock.now_utc();
        let Some(meeting) = self.meeting.as_mut() else {
            return;
        };
        let meeting_id = meeting.id.clone();

        if meeting.status != MeetingStatus::InProgress {
            meeting.status = MeetingStatus::InProgress;
            meeting.updated_at = at;
            self.outbox.push(ClockEvent::MeetingPatched {
                meeting_id: meeting_id.clone(),
                patch: MeetingPatch {
                    status: Some(MeetingStatus::InProgress),
                    updated_at: Some(at),
                    ..Default::default()
                },
            });
        }

        let Some(item) = meeting.item_mut(agenda_id) else {
            return;
        };
        let mut patch = AgendaPatch::default();
        if item.start_at.is_none() {
            item.start_at = Some(at);
            patch.start_at = Some(at);
        }
        let status = self.state.derive_status(item.actual_duration, item.planned_duration);
        if item.status != status {
            item.status = status;
            patch.status = Some(status);
        }
        let title = item.title.clone();
        if !patch.is_empty() {
            self.outbox.push(ClockEvent::AgendaPatched {
                meeting_id,
                agenda_id: agenda_id.to_string(),
                patch,
            });
        }

        if let Some(kind) = self.boundaries.on_start() {
            self.push_notification(kind, agenda_id, &title, 0, at);
        }
        self.check_boundaries(agenda_id);
    }

    fn advance_from(&mut self, current_id: &str) {
        let now = self.clock.now_ms();
        let at = self.clock.now_utc();
        let was_running = self.state.is_running;
        if was_running {
            self.sync_actual(now);
        }

        let Some(meeting) = self.meeting.as_mut() else {
            return;
        };
        let meeting_id = meeting.id.clone();
        let auto_transition = meeting.auto_transition;

        if let Some(item) = meeting.item_mut(current_id) {
            item.end_at = Some(at);
            item.status = AgendaStatus::Completed;
            self.outbox.push(ClockEvent::AgendaPatched {
                meeting_id: meeting_id.clone(),
                agenda_id: current_id.to_string(),
                patch: AgendaPatch {
                    status: Some(AgendaStatus::Completed),
                    end_at: Some(at),
                    ..Default::default()
                },
            });
        }

        let next_id = first_pending(meeting, Some(current_id)).map(|item| item.id.clone());
        self.boundaries.reset();

        match next_id {
            Some(next_id) => {
                self.state.clear();
                self.state.current_agenda_id = Some(next_id.clone());
                if auto_transition && was_running {
                    self.state.reset_window(now);
                    self.state.is_running = true;
                    self.activate_current(&next_id);
                    log_info!("auto-started agenda item {next_id}");
                } else {
                    log_info!("agenda item {next_id} is up next; waiting for start");
                }
            }
            None => {
                self.state.clear();
                meeting.status = MeetingStatus::Completed;
                meeting.updated_at = at;
                self.outbox.push(ClockEvent::MeetingPatched {
                    meeting_id: meeting_id.clone(),
                    patch: MeetingPatch {
                        status: Some(MeetingStatus::Completed),
                        updated_at: Some(at),
                        ..Default::default()
                    },
                });
                log_info!("meeting {meeting_id} completed");
            }
        }
    }

    fn append_decision(&mut self, agenda_id: &str, decision: OverrunDecision) {
        let Some(meeting) = self.meeting.as_mut() else {
            return;
        };
        let Some(item) = meeting.item_mut(agenda_id) else {
            return;
        };
        item.overrun_decisions.push(decision.clone());
        self.outbox.push(ClockEvent::DecisionAppended {
            meeting_id: meeting.id.clone(),
            agenda_id: agenda_id.to_string(),
            decision,
        });
    }

    fn set_status(&mut self, agenda_id: &str, status: AgendaStatus) {
        let Some(meeting) = self.meeting.as_mut() else {
            return;
        };
        let Some(item) = meeting.item_mut(agenda_id) else {
            return;
        };
        if item.status == status {
            return;
        }
        item.status = status;
        self.outbox.push(ClockEvent::AgendaPatched {
            meeting_id: meeting.id.clone(),
            agenda_id: agenda_id.to_string(),
            patch: AgendaPatch {
                status: Some(status),
                ..Default::default()
            },
        });
    }

    /// Recomputes the running/paused/overtime label of the current item.
    fn refresh_status(&mut self, agenda_id: &str) {
        if self.state.current_agenda_id.as_deref() != Some(agenda_id) || !self.state.is_running {
            return;
        }
        let Some(item) = self.current_item() else {
            return;
        };
        let status = self.state.derive_status(item.actual_duration, item.planned_duration);
        self.set_status(agenda_id, status);
    }

    fn after_budget_change(&mut self, agenda_id: &str) {
        if self.state.current_agenda_id.as_deref() != Some(agenda_id) {
            return;
        }
        if let Some(item) = self.current_item() {
            let (actual, planned) = (item.actual_duration, item.planned_duration);
            self.boundaries.rearm(actual, planned, self.warning_threshold_sec);
        }
        self.refresh_status(agenda_id);
    }

    fn check_boundaries(&mut self, agenda_id: &str) {
        if !self.state.is_running {
            return;
        }
        let Some(item) = self.current_item() else {
            return;
        };
        let (actual, planned, title) =
            (item.actual_duration, item.planned_duration, item.title.clone());
        let crossed = self
            .boundaries
            .observe(actual, planned, self.warning_threshold_sec);
        if crossed.is_empty() {
            return;
        }
        let at = self.clock.now_utc();
        for (kind, value) in crossed {
            self.push_notification(kind, agenda_id, &title, value, at);
        }
    }

    fn push_notification(
        &mut self,
        kind: NotificationKind,
        agenda_id: &str,
        title: &str,
        value: u64,
        at: chrono::DateTime<chrono::Utc>,
    ) {
        self.outbox.push(ClockEvent::Notify(Notification {
            kind,
            agenda_id: agenda_id.to_string(),
            message: message_for(kind, title, value),
            at,
        }));
    }
}

/// Lowest-ordered pending item, ignoring `exclude`.
fn first_pending<'a>(meeting: &'a Meeting, exclude: Option<&str>) -> Option<&'a AgendaItem> {
    meeting
        .agenda
        .iter()
        .filter(|item| item.status == AgendaStatus::Pending)
        .filter(|item| Some(item.id.as_str()) != exclude)
        .min_by_key(|item| item.order)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::models::DecisionKind;

    fn meeting_with(planned: &[u64]) -> Meeting {
        let mut meeting = Meeting::new("planning");
        for (index, secs) in planned.iter().enumerate() {
            meeting.add_item(format!("item {index}"), *secs);
        }
        meeting
    }

    fn run_clock(planned: &[u64]) -> (RunClock, Arc<ManualClock>) {
        let clock = ManualClock::shared();
        let mut run = RunClock::new(clock.clone());
        run.set_meeting(meeting_with(planned));
        (run, clock)
    }

    /// Ticks every 250 ms for `secs` seconds, the way the controller does.
    fn tick_for(run: &mut RunClock, clock: &ManualClock, secs: u64) {
        for _ in 0..secs * 4 {
            clock.advance(std::time::Duration::from_millis(250));
            run.sample();
        }
    }

    fn item(run: &RunClock, index: usize) -> AgendaItem {
        run.meeting().unwrap().agenda[index].clone()
    }

    fn notifications(run: &mut RunClock) -> Vec<NotificationKind> {
        run.drain_events()
            .into_iter()
            .filter_map(|event| match event {
                ClockEvent::Notify(n) => Some(n.kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn commands_without_meeting_are_refused() {
        let mut run = RunClock::new(ManualClock::shared());
        assert_eq!(run.initialize(), Err(ClockError::NoActiveMeeting));
        assert_eq!(run.start(), Err(ClockError::NoActiveMeeting));
        assert_eq!(run.pause(), Err(ClockError::NoActiveMeeting));
        assert_eq!(run.next_agenda(), Err(ClockError::NoActiveMeeting));
        assert_eq!(run.extend_current(60), Err(ClockError::NoActiveMeeting));
        assert_eq!(run.borrow_from_next(60), Err(ClockError::NoActiveMeeting));
        assert!(!run.sample());
    }

    #[test]
    fn initialize_picks_lowest_pending() {
        let (mut run, _) = run_clock(&[60, 60, 60]);
        run.edit_meeting(|m| {
            m.agenda[0].status = AgendaStatus::Completed;
            Ok(())
        })
        .unwrap();
        run.initialize().unwrap();
        assert_eq!(run.current_agenda_id(), Some(item(&run, 1).id.as_str()));
        assert!(!run.is_running());
    }

    #[test]
    fn reinitializing_a_stopped_item_keeps_sub_second_time() {
        let (mut run, clock) = run_clock(&[600, 300]);
        run.start().unwrap();
        clock.advance(std::time::Duration::from_millis(1_600));
        run.stop().unwrap();
        assert_eq!(item(&run, 0).actual_duration, 1);

        run.initialize().unwrap();
        assert_eq!(run.current_agenda_id(), Some(item(&run, 0).id.as_str()));
        assert_eq!(run.state().baseline_ms, 1_600);

        run.start().unwrap();
        clock.advance(std::time::Duration::from_millis(400));
        assert!(run.sample());
        assert_eq!(item(&run, 0).actual_duration, 2);
    }

    #[test]
    fn start_marks_item_running_and_meeting_in_progress() {
        let (mut run, _) = run_clock(&[600, 300]);
        run.start().unwrap();

        let first = item(&run, 0);
        assert!(run.is_running());
        assert_eq!(run.current_agenda_id(), Some(first.id.as_str()));
        assert_eq!(first.status, AgendaStatus::Running);
        assert!(first.start_at.is_some());
        assert_eq!(run.meeting().unwrap().status, MeetingStatus::InProgress);
        assert_eq!(notifications(&mut run), vec![NotificationKind::Start]);
    }

    #[test]
    fn start_twice_is_idempotent() {
        let (mut run, clock) = run_clock(&[600]);
        run.start().unwrap();
        let started_at = item(&run, 0).start_at;
        tick_for(&mut run, &clock, 3);
        run.start().unwrap();

        assert_eq!(item(&run, 0).start_at, started_at);
        tick_for(&mut run, &clock, 2);
        assert_eq!(item(&run, 0).actual_duration, 5);
    }

    #[test]
    fn writes_are_throttled_to_second_boundaries() {
        let (mut run, clock) = run_clock(&[600]);
        run.start().unwrap();
        run.drain_events();

        let mut writes = 0;
        for _ in 0..40 {
            clock.advance(std::time::Duration::from_millis(250));
            if run.sample() {
                writes += 1;
            }
        }

        assert_eq!(writes, 10);
        assert_eq!(run.last_emitted_sec(), 10);
        let patches = run
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, ClockEvent::AgendaPatched { patch, .. } if patch.actual_duration.is_some()))
            .count();
        assert_eq!(patches, 10);
    }

    #[test]
    fn no_time_lost_or_gained_across_pause_and_resume() {
        let (mut run, clock) = run_clock(&[600]);
        run.start().unwrap();
        clock.advance(std::time::Duration::from_millis(12_700));
        run.sample();

        run.pause().unwrap();
        assert_eq!(item(&run, 0).status, AgendaStatus::Paused);
        assert_eq!(item(&run, 0).actual_duration, 12);

        // Ticks while paused change nothing, however long the pause.
        tick_for(&mut run, &clock, 3_600);
        assert_eq!(item(&run, 0).actual_duration, 12);

        run.resume().unwrap();
        assert_eq!(item(&run, 0).status, AgendaStatus::Running);
        clock.advance(std::time::Duration::from_millis(7_400));
        run.sample();

        // 12.7 s + 7.4 s = 20.1 s
        assert_eq!(item(&run, 0).actual_duration, 20);
    }

    #[test]
    fn pause_and_resume_are_noops_out_of_state() {
        let (mut run, clock) = run_clock(&[600]);
        run.pause().unwrap();
        run.resume().unwrap();
        assert!(!run.is_paused());

        run.start().unwrap();
        clock.advance_secs(1);
        run.pause().unwrap();
        let paused_at = run.state().paused_at_ms;
        clock.advance_secs(5);
        run.pause().unwrap();
        assert_eq!(run.state().paused_at_ms, paused_at);

        run.resume().unwrap();
        run.resume().unwrap();
        assert_eq!(run.state().accumulated_pause_ms, 5_000);
    }

    #[test]
    fn start_while_paused_resumes() {
        let (mut run, clock) = run_clock(&[600]);
        run.start().unwrap();
        clock.advance_secs(4);
        run.pause().unwrap();
        clock.advance_secs(30);
        run.start().unwrap();
        assert!(!run.is_paused());
        clock.advance_secs(1);
        run.sample();
        assert_eq!(item(&run, 0).actual_duration, 5);
    }

    #[test]
    fn stop_keeps_item_and_time() {
        let (mut run, clock) = run_clock(&[600, 300]);
        run.start().unwrap();
        tick_for(&mut run, &clock, 8);
        clock.advance(std::time::Duration::from_millis(600));
        run.stop().unwrap();

        let first = item(&run, 0);
        assert!(!run.is_running());
        assert_eq!(run.current_agenda_id(), Some(first.id.as_str()));
        assert_eq!(first.actual_duration, 8);
        assert_eq!(first.status, AgendaStatus::Running);

        // Ticks after stop are ignored.
        tick_for(&mut run, &clock, 20);
        assert_eq!(item(&run, 0).actual_duration, 8);

        // Starting again continues from 8.6 s.
        run.start().unwrap();
        clock.advance(std::time::Duration::from_millis(500));
        run.sample();
        assert_eq!(item(&run, 0).actual_duration, 9);
    }

    #[test]
    fn actual_duration_is_monotonic_and_frozen_after_next() {
        let (mut run, clock) = run_clock(&[600, 300]);
        run.edit_meeting(|m| {
            m.auto_transition = true;
            Ok(())
        })
        .unwrap();
        run.start().unwrap();

        let mut previous = 0;
        for _ in 0..20 {
            clock.advance(std::time::Duration::from_millis(333));
            run.sample();
            let actual = item(&run, 0).actual_duration;
            assert!(actual >= previous);
            previous = actual;
        }

        run.next_agenda().unwrap();
        let frozen = item(&run, 0);
        assert_eq!(frozen.status, AgendaStatus::Completed);
        assert!(frozen.end_at.is_some());

        tick_for(&mut run, &clock, 30);
        assert_eq!(item(&run, 0).actual_duration, frozen.actual_duration);
        assert_eq!(item(&run, 1).actual_duration, 30);
    }

    #[test]
    fn next_without_auto_transition_waits_for_start() {
        let (mut run, clock) = run_clock(&[600, 300]);
        run.start().unwrap();
        tick_for(&mut run, &clock, 5);
        run.next_agenda().unwrap();

        let second = item(&run, 1);
        assert_eq!(run.current_agenda_id(), Some(second.id.as_str()));
        assert!(!run.is_running());
        assert_eq!(second.status, AgendaStatus::Pending);

        tick_for(&mut run, &clock, 10);
        assert_eq!(item(&run, 1).actual_duration, 0);

        run.start().unwrap();
        tick_for(&mut run, &clock, 2);
        assert_eq!(item(&run, 1).actual_duration, 2);
        assert_eq!(item(&run, 1).status, AgendaStatus::Running);
    }

    #[test]
    fn skipping_every_item_completes_the_meeting() {
        let (mut run, clock) = run_clock(&[600, 300]);
        run.edit_meeting(|m| {
            m.auto_transition = true;
            Ok(())
        })
        .unwrap();

        run.start().unwrap();
        tick_for(&mut run, &clock, 42);
        run.skip_current().unwrap();
        tick_for(&mut run, &clock, 17);
        run.skip_current().unwrap();
        tick_for(&mut run, &clock, 5);

        let (a, b) = (item(&run, 0), item(&run, 1));
        assert!(!run.is_running());
        assert_eq!(run.current_agenda_id(), None);
        assert_eq!(run.meeting().unwrap().status, MeetingStatus::Completed);
        assert_eq!(a.status, AgendaStatus::Completed);
        assert_eq!(b.status, AgendaStatus::Completed);
        assert_eq!(a.actual_duration, 42);
        assert_eq!(b.actual_duration, 17);
        assert_eq!(a.planned_duration, 600);
        assert_eq!(b.planned_duration, 300);
        assert_eq!(a.overrun_decisions.len(), 1);
        assert_eq!(a.overrun_decisions[0].kind, DecisionKind::Next);
        assert_eq!(a.overrun_decisions[0].amount_sec, None);
        assert!(run
            .meeting()
            .unwrap()
            .agenda
            .iter()
            .all(|item| item.status != AgendaStatus::Pending));

        assert_eq!(run.skip_current(), Err(ClockError::NoCurrentAgenda));
    }

    #[test]
    fn extend_accumulates_and_records_each_decision() {
        let (mut run, _) = run_clock(&[600, 300]);
        run.start().unwrap();
        run.extend_current(60).unwrap();
        run.extend_current(60).unwrap();

        let first = item(&run, 0);
        assert_eq!(first.planned_duration, 720);
        assert_eq!(first.overrun_decisions.len(), 2);
        assert!(first
            .overrun_decisions
            .iter()
            .all(|d| d.kind == DecisionKind::Extend && d.amount_sec == Some(60)));
    }

    #[test]
    fn extend_requires_positive_amount_and_current_item() {
        let (mut run, _) = run_clock(&[600]);
        assert_eq!(run.extend_current(0), Err(ClockError::InvalidAmount));
        assert_eq!(run.extend_current(30), Err(ClockError::NoCurrentAgenda));
        assert_eq!(run.extend_agenda("gone", 30), Err(ClockError::AgendaNotFound));
        assert_eq!(item(&run, 0).planned_duration, 600);
        assert!(item(&run, 0).overrun_decisions.is_empty());
    }

    #[test]
    fn extending_an_overtime_item_returns_it_to_running() {
        let (mut run, clock) = run_clock(&[60]);
        run.start().unwrap();
        tick_for(&mut run, &clock, 75);
        assert_eq!(item(&run, 0).status, AgendaStatus::Overtime);

        run.extend_current(120).unwrap();
        assert_eq!(item(&run, 0).status, AgendaStatus::Running);

        tick_for(&mut run, &clock, 105);
        assert_eq!(item(&run, 0).status, AgendaStatus::Overtime);
    }

    #[test]
    fn borrow_takes_from_successor_only() {
        let (mut run, _) = run_clock(&[600, 300, 900]);
        run.start().unwrap();
        run.borrow_from_next(120).unwrap();

        let (a, b, c) = (item(&run, 0), item(&run, 1), item(&run, 2));
        assert_eq!(a.planned_duration, 600);
        assert_eq!(b.planned_duration, 180);
        assert_eq!(c.planned_duration, 900);
        let decision = &a.overrun_decisions[0];
        assert_eq!(decision.kind, DecisionKind::Borrow);
        assert_eq!(decision.amount_sec, Some(120));
        assert_eq!(decision.from_agenda_id.as_deref(), Some(b.id.as_str()));
        assert_eq!(decision.to_agenda_id.as_deref(), Some(a.id.as_str()));
        assert!(b.overrun_decisions.is_empty());
    }

    #[test]
    fn borrow_never_drives_plan_negative() {
        let (mut run, _) = run_clock(&[600, 300]);
        run.start().unwrap();
        run.drain_events();

        assert_eq!(run.borrow_from_next(301), Err(ClockError::NegativeNext));
        assert_eq!(item(&run, 0).planned_duration, 600);
        assert_eq!(item(&run, 1).planned_duration, 300);
        assert!(item(&run, 0).overrun_decisions.is_empty());
        assert!(run.drain_events().is_empty());

        run.borrow_from_next(300).unwrap();
        assert_eq!(item(&run, 1).planned_duration, 0);
        assert_eq!(run.borrow_from_next(1), Err(ClockError::NegativeNext));
    }

    #[test]
    fn borrow_on_last_item_is_refused() {
        let (mut run, _) = run_clock(&[600]);
        assert_eq!(run.borrow_from_next(10), Err(ClockError::NoCurrentAgenda));
        run.start().unwrap();
        assert_eq!(run.borrow_from_next(10), Err(ClockError::NoNextAgenda));
        assert_eq!(run.borrow_from_next(0), Err(ClockError::InvalidAmount));
    }

    #[test]
    fn borrow_between_reports_missing_items() {
        let (mut run, _) = run_clock(&[600, 300]);
        let (a, b) = (item(&run, 0).id, item(&run, 1).id);
        assert_eq!(run.borrow_between("gone", &a, 10), Err(ClockError::FromNotFound));
        assert_eq!(run.borrow_between(&b, "gone", 10), Err(ClockError::AgendaNotFound));
        run.borrow_between(&b, &a, 10).unwrap();
        assert_eq!(item(&run, 1).planned_duration, 290);
    }

    #[test]
    fn decisions_are_append_only_and_chronological() {
        let (mut run, clock) = run_clock(&[600, 300]);
        run.start().unwrap();
        run.extend_current(30).unwrap();
        let first_snapshot = item(&run, 0).overrun_decisions[0].clone();
        clock.advance_secs(10);
        run.borrow_from_next(20).unwrap();
        clock.advance_secs(10);
        run.extend_current(45).unwrap();
        clock.advance_secs(10);
        run.skip_current().unwrap();

        let decisions = item(&run, 0).overrun_decisions;
        assert_eq!(decisions.len(), 4);
        assert_eq!(decisions[0], first_snapshot);
        let kinds: Vec<_> = decisions.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DecisionKind::Extend, DecisionKind::Borrow, DecisionKind::Extend, DecisionKind::Next]
        );
        assert!(decisions.windows(2).all(|pair| pair[0].at <= pair[1].at));
    }

    #[test]
    fn notifications_follow_boundaries() {
        let (mut run, clock) = run_clock(&[420]);
        run.start().unwrap();
        assert_eq!(notifications(&mut run), vec![NotificationKind::Start]);

        tick_for(&mut run, &clock, 119);
        assert!(notifications(&mut run).is_empty());
        tick_for(&mut run, &clock, 1);
        assert_eq!(notifications(&mut run), vec![NotificationKind::Warning]);

        tick_for(&mut run, &clock, 300);
        assert_eq!(notifications(&mut run), vec![NotificationKind::End]);

        tick_for(&mut run, &clock, 125);
        assert_eq!(
            notifications(&mut run),
            vec![NotificationKind::Overtime, NotificationKind::Overtime]
        );
    }

    #[test]
    fn deleting_current_item_stops_the_clock() {
        let (mut run, clock) = run_clock(&[600, 300]);
        run.start().unwrap();
        tick_for(&mut run, &clock, 3);
        let current = run.current_agenda_id().unwrap().to_string();

        run.edit_meeting(|m| m.remove_item(&current)).unwrap();

        assert!(!run.is_running());
        assert_eq!(run.current_agenda_id(), None);
        assert_eq!(run.meeting().unwrap().agenda.len(), 1);
        assert_eq!(run.meeting().unwrap().agenda[0].order, 0);
        assert!(!run.sample());
    }

    #[test]
    fn switching_meeting_resets_timing() {
        let (mut run, clock) = run_clock(&[600]);
        run.start().unwrap();
        tick_for(&mut run, &clock, 4);

        let previous = run.take_meeting().unwrap();
        assert_eq!(previous.agenda[0].actual_duration, 4);
        assert_eq!(run.state(), &RunClockState::default());

        run.set_meeting(meeting_with(&[60]));
        assert!(!run.is_running());
        assert_eq!(run.current_agenda_id(), None);
    }

    #[test]
    fn interrupted_item_is_picked_up_with_its_time() {
        let clock = ManualClock::shared();
        let mut meeting = meeting_with(&[600, 300]);
        meeting.agenda[0].status = AgendaStatus::Paused;
        meeting.agenda[0].actual_duration = 95;
        let mut run = RunClock::new(clock.clone());
        run.set_meeting(meeting);

        run.start().unwrap();
        tick_for(&mut run, &clock, 5);

        assert_eq!(item(&run, 0).actual_duration, 100);
        assert_eq!(item(&run, 0).status, AgendaStatus::Running);
    }
}
