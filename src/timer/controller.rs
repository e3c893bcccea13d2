use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use tokio::{
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::SharedClock,
    db::{AgendaItem, AgendaPatch, Database, Meeting, MeetingPatch, MeetingSummary},
};

use super::{
    notify::Notifier,
    run_clock::{ClockEvent, RunClock, RunClockSnapshot},
    ClockError, ClockResult,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Writes queued for the database worker, applied strictly in order.
enum PersistCommand {
    Event(ClockEvent),
    InsertMeeting(Meeting),
    InsertItem(AgendaItem),
    DeleteItem(String),
    SaveOrder { meeting_id: String, ids: Vec<String> },
    Flush(oneshot::Sender<()>),
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub tick_interval: Duration,
    pub warning_threshold_sec: u64,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            warning_threshold_sec: super::run_clock::DEFAULT_WARNING_THRESHOLD_SEC,
        }
    }
}

/// Owns the run-clock for the active meeting and drives its sampler.
#[derive(Clone)]
pub struct TimerController {
    run_clock: Arc<Mutex<RunClock>>,
    db: Database,
    notifier: Arc<dyn Notifier>,
    persist_tx: mpsc::UnboundedSender<PersistCommand>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    options: ControllerOptions,
}

impl TimerController {
    /// Must be called from within a tokio runtime; spawns the persistence writer.
    pub fn new(
        db: Database,
        clock: SharedClock,
        notifier: Arc<dyn Notifier>,
        options: ControllerOptions,
    ) -> Self {
        let run_clock = RunClock::new(clock).with_warning_threshold(options.warning_threshold_sec);
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        tokio::spawn(persist_loop(db.clone(), persist_rx));

        Self {
            run_clock: Arc::new(Mutex::new(run_clock)),
            db,
            notifier,
            persist_tx,
            ticker: Arc::new(Mutex::new(None)),
            options,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // ----- meetings ----------------------------------------------------------

    /// Creates and stores a meeting with the given `(title, planned seconds)` agenda.
    pub async fn create_meeting(
        &self,
        title: &str,
        auto_transition: bool,
        agenda: &[(String, u64)],
    ) -> Result<Meeting> {
        let mut meeting = Meeting::new(title);
        meeting.auto_transition = auto_transition;
        for (item_title, planned) in agenda {
            meeting.add_item(item_title.clone(), *planned);
        }
        self.persist(PersistCommand::InsertMeeting(meeting.clone()))?;
        self.flush().await?;
        Ok(meeting)
    }

    /// Loads a stored meeting and makes it the active one.
    ///
    /// The store is read only after every queued write, including the
    /// outgoing meeting's final sample, has landed. An unknown id leaves the
    /// active meeting in place.
    pub async fn load_meeting(&self, meeting_id: &str) -> Result<RunClockSnapshot> {
        self.flush().await?;
        if self.db.get_meeting(meeting_id).await?.is_none() {
            return Err(anyhow!("meeting {meeting_id} not found"));
        }

        self.release_meeting().await;
        self.flush().await?;
        let meeting = self
            .db
            .get_meeting(meeting_id)
            .await?
            .ok_or_else(|| anyhow!("meeting {meeting_id} disappeared while loading"))?;
        Ok(self.install_meeting(meeting).await)
    }

    /// Makes `meeting` the active one. The previous meeting's clock is stopped.
    pub async fn activate_meeting(&self, meeting: Meeting) -> RunClockSnapshot {
        self.release_meeting().await;
        self.install_meeting(meeting).await
    }

    async fn release_meeting(&self) {
        self.cancel_ticker().await;
        let mut guard = self.run_clock.lock().await;
        if let Some(previous) = guard.take_meeting() {
            log_info!("leaving meeting {}", previous.id);
        }
        let events = guard.drain_events();
        self.dispatch(events);
    }

    async fn install_meeting(&self, meeting: Meeting) -> RunClockSnapshot {
        let mut guard = self.run_clock.lock().await;
        guard.set_meeting(meeting);
        guard.snapshot()
    }

    pub async fn add_agenda_item(&self, title: &str, planned_duration: u64) -> ClockResult<AgendaItem> {
        let mut guard = self.run_clock.lock().await;
        let item = guard.edit_meeting(|meeting| Ok(meeting.add_item(title, planned_duration)))?;
        self.persist_or_log(PersistCommand::InsertItem(item.clone()));
        Ok(item)
    }

    pub async fn remove_agenda_item(&self, agenda_id: &str) -> ClockResult<AgendaItem> {
        let (removed, running) = {
            let mut guard = self.run_clock.lock().await;
            let removed = guard.edit_meeting(|meeting| meeting.remove_item(agenda_id))?;
            self.persist_or_log(PersistCommand::DeleteItem(removed.id.clone()));
            (removed, guard.is_running())
        };
        self.sync_ticker(running).await;
        Ok(removed)
    }

    pub async fn rename_agenda_item(&self, agenda_id: &str, title: &str) -> ClockResult {
        let mut guard = self.run_clock.lock().await;
        let meeting_id = guard.edit_meeting(|meeting| {
            meeting.rename_item(agenda_id, title)?;
            Ok(meeting.id.clone())
        })?;
        self.persist_or_log(PersistCommand::Event(ClockEvent::AgendaPatched {
            meeting_id,
            agenda_id: agenda_id.to_string(),
            patch: AgendaPatch {
                title: Some(title.to_string()),
                ..Default::default()
            },
        }));
        Ok(())
    }

    /// Switches auto-transition on the active meeting.
    pub async fn set_auto_transition(&self, enabled: bool) -> ClockResult {
        let mut guard = self.run_clock.lock().await;
        let meeting_id = guard.edit_meeting(|meeting| {
            meeting.auto_transition = enabled;
            Ok(meeting.id.clone())
        })?;
        self.persist_or_log(PersistCommand::Event(ClockEvent::MeetingPatched {
            meeting_id,
            patch: MeetingPatch {
                auto_transition: Some(enabled),
                ..Default::default()
            },
        }));
        Ok(())
    }

    /// Takes effect from the next sample on.
    pub async fn set_warning_threshold(&self, seconds: u64) {
        self.run_clock.lock().await.set_warning_threshold(seconds);
    }

    pub async fn move_agenda_item(&self, agenda_id: &str, new_index: usize) -> ClockResult {
        let mut guard = self.run_clock.lock().await;
        let (meeting_id, ids) = guard.edit_meeting(|meeting| {
            meeting.move_item(agenda_id, new_index)?;
            let ids = meeting.agenda.iter().map(|item| item.id.clone()).collect();
            Ok((meeting.id.clone(), ids))
        })?;
        self.persist_or_log(PersistCommand::SaveOrder { meeting_id, ids });
        Ok(())
    }

    pub async fn summary(&self) -> ClockResult<MeetingSummary> {
        let guard = self.run_clock.lock().await;
        guard
            .meeting()
            .map(MeetingSummary::from_meeting)
            .ok_or(ClockError::NoActiveMeeting)
    }

    pub async fn meeting(&self) -> Option<Meeting> {
        self.run_clock.lock().await.meeting().cloned()
    }

    // ----- run-clock commands ------------------------------------------------

    pub async fn snapshot(&self) -> RunClockSnapshot {
        self.run_clock.lock().await.snapshot()
    }

    pub async fn initialize(&self) -> ClockResult<RunClockSnapshot> {
        self.cancel_ticker().await;
        self.command(RunClock::initialize).await
    }

    /// Starts (or resumes) the clock and replaces any existing sampler with a fresh one.
    pub async fn start(&self) -> ClockResult<RunClockSnapshot> {
        let snapshot = self.command(RunClock::start).await?;
        self.spawn_ticker().await;
        Ok(snapshot)
    }

    pub async fn pause(&self) -> ClockResult<RunClockSnapshot> {
        self.command(RunClock::pause).await
    }

    pub async fn resume(&self) -> ClockResult<RunClockSnapshot> {
        self.command(RunClock::resume).await
    }

    pub async fn stop(&self) -> ClockResult<RunClockSnapshot> {
        let snapshot = self.command(RunClock::stop).await?;
        self.cancel_ticker().await;
        Ok(snapshot)
    }

    pub async fn next_agenda(&self) -> ClockResult<RunClockSnapshot> {
        let snapshot = self.command(RunClock::next_agenda).await?;
        self.sync_ticker(snapshot.state.is_running).await;
        Ok(snapshot)
    }

    pub async fn skip_current(&self) -> ClockResult<RunClockSnapshot> {
        let snapshot = self.command(RunClock::skip_current).await?;
        self.sync_ticker(snapshot.state.is_running).await;
        Ok(snapshot)
    }

    pub async fn extend_current(&self, seconds: u64) -> ClockResult<RunClockSnapshot> {
        self.command(|clock| clock.extend_current(seconds)).await
    }

    pub async fn borrow_from_next(&self, seconds: u64) -> ClockResult<RunClockSnapshot> {
        self.command(|clock| clock.borrow_from_next(seconds)).await
    }

    /// Waits until every queued write has reached the database.
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.persist(PersistCommand::Flush(tx))?;
        rx.await
            .map_err(|_| anyhow!("persistence writer stopped before flushing"))
    }

    pub async fn has_ticker(&self) -> bool {
        match self.ticker.lock().await.as_ref() {
            Some(ticker) => !ticker.handle.is_finished(),
            None => false,
        }
    }

    // ----- internals ---------------------------------------------------------

    async fn command<F>(&self, apply: F) -> ClockResult<RunClockSnapshot>
    where
        F: FnOnce(&mut RunClock) -> ClockResult,
    {
        let mut guard = self.run_clock.lock().await;
        let result = apply(&mut *guard);
        // A refused command queues nothing, but flush anyway to keep the outbox empty.
        let events = guard.drain_events();
        self.dispatch(events);
        result.map(|_| guard.snapshot())
    }

    fn dispatch(&self, events: Vec<ClockEvent>) {
        dispatch_events(events, self.notifier.as_ref(), &self.persist_tx);
    }

    fn persist(&self, command: PersistCommand) -> Result<()> {
        self.persist_tx
            .send(command)
            .map_err(|_| anyhow!("persistence writer is not running"))
    }

    fn persist_or_log(&self, command: PersistCommand) {
        if let Err(err) = self.persist(command) {
            log_error!("{err}");
        }
    }

    async fn sync_ticker(&self, running: bool) {
        if running {
            if !self.has_ticker().await {
                self.spawn_ticker().await;
            }
        } else {
            self.cancel_ticker().await;
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.cancel.cancel();
            previous.handle.abort();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tick_loop(
            self.run_clock.clone(),
            self.notifier.clone(),
            self.persist_tx.clone(),
            self.options.tick_interval,
            cancel.clone(),
        ));

        *ticker_guard = Some(Ticker { handle, cancel });
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel.cancel();
            ticker.handle.abort();
        }
    }
}

async fn tick_loop(
    run_clock: Arc<Mutex<RunClock>>,
    notifier: Arc<dyn Notifier>,
    persist_tx: mpsc::UnboundedSender<PersistCommand>,
    tick_interval: Duration,
    cancel: CancellationToken,
) {
    let mut interval = time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let mut guard = run_clock.lock().await;
                // Flags are re-read on every tick; a tick that fires after
                // pause or stop must not advance anything.
                if !guard.is_running() {
                    break;
                }
                guard.sample();
                let events = guard.drain_events();
                dispatch_events(events, notifier.as_ref(), &persist_tx);
            }
            _ = cancel.cancelled() => {
                break;
            }
        }
    }
    log_info!("run-clock sampler stopped");
}

fn dispatch_events(
    events: Vec<ClockEvent>,
    notifier: &dyn Notifier,
    persist_tx: &mpsc::UnboundedSender<PersistCommand>,
) {
    for event in events {
        if let ClockEvent::Notify(notification) = &event {
            if let Err(err) = notifier.notify(notification) {
                log_warn!(
                    "notification '{}' failed: {err:?}",
                    notification.kind.as_str()
                );
            }
            continue;
        }
        if persist_tx.send(PersistCommand::Event(event)).is_err() {
            log_error!("persistence writer is gone; dropping run-clock write");
        }
    }
}

async fn persist_loop(db: Database, mut rx: mpsc::UnboundedReceiver<PersistCommand>) {
    while let Some(command) = rx.recv().await {
        let result = match command {
            PersistCommand::Event(event) => apply_event(&db, event).await,
            PersistCommand::InsertMeeting(meeting) => db.insert_meeting(&meeting).await,
            PersistCommand::InsertItem(item) => db.insert_agenda_item(&item).await,
            PersistCommand::DeleteItem(agenda_id) => db.delete_agenda_item(&agenda_id).await,
            PersistCommand::SaveOrder { meeting_id, ids } => {
                db.save_agenda_order(&meeting_id, &ids).await
            }
            PersistCommand::Flush(done) => {
                let _ = done.send(());
                Ok(())
            }
        };
        if let Err(err) = result {
            log_error!("failed to persist run-clock change: {err:?}");
        }
    }
}

async fn apply_event(db: &Database, event: ClockEvent) -> Result<()> {
    match event {
        ClockEvent::AgendaPatched { agenda_id, patch, .. } => {
            db.apply_agenda_patch(&agenda_id, &patch).await
        }
        ClockEvent::DecisionAppended {
            agenda_id, decision, ..
        } => db.append_decision(&agenda_id, &decision).await,
        ClockEvent::MeetingPatched { meeting_id, patch } => {
            db.apply_meeting_patch(&meeting_id, &patch).await
        }
        ClockEvent::Notify(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::clock::SystemClock;
    use crate::db::{AgendaStatus, DecisionKind, MeetingStatus};
    use crate::timer::notify::{NotificationKind, RecordingNotifier};

    struct Harness {
        controller: TimerController,
        notifier: Arc<RecordingNotifier>,
        auto_transition: bool,
        _dir: TempDir,
    }

    fn controller_with(dir: &TempDir, notifier: Arc<dyn Notifier>) -> TimerController {
        let db = Database::new(dir.path().join("timebox.sqlite3")).unwrap();
        TimerController::new(
            db,
            Arc::new(SystemClock::new()),
            notifier,
            ControllerOptions::default(),
        )
    }

    fn harness(auto_transition: bool) -> Harness {
        let dir = tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let controller = controller_with(&dir, notifier.clone());
        Harness {
            controller,
            notifier,
            auto_transition,
            _dir: dir,
        }
    }

    fn agenda(items: &[(&str, u64)]) -> Vec<(String, u64)> {
        items
            .iter()
            .map(|(title, secs)| (title.to_string(), *secs))
            .collect()
    }

    async fn load(h: &Harness, items: &[(&str, u64)]) -> Meeting {
        let meeting = h
            .controller
            .create_meeting("standup", h.auto_transition, &agenda(items))
            .await
            .unwrap();
        h.controller.load_meeting(&meeting.id).await.unwrap();
        meeting
    }

    #[tokio::test(start_paused = true)]
    async fn sampler_writes_elapsed_seconds_to_the_database() {
        let h = harness(false);
        let meeting = load(&h, &[("yesterday", 600), ("today", 300)]).await;

        h.controller.start().await.unwrap();
        time::sleep(Duration::from_millis(10_100)).await;
        // Paused time auto-advances while the db thread works; freeze the clock first.
        h.controller.pause().await.unwrap();
        h.controller.flush().await.unwrap();

        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.current.as_ref().unwrap().actual_duration, 10);

        let stored = h.controller.database().get_meeting(&meeting.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MeetingStatus::InProgress);
        assert_eq!(stored.agenda[0].actual_duration, 10);
        assert_eq!(stored.agenda[0].status, AgendaStatus::Paused);
        assert!(stored.agenda[0].start_at.is_some());
        assert_eq!(h.notifier.kinds(), vec![NotificationKind::Start]);
    }

    #[tokio::test(start_paused = true)]
    async fn reloading_the_active_meeting_sees_unflushed_decisions() {
        let h = harness(false);
        let meeting = load(&h, &[("a", 600), ("b", 300)]).await;

        h.controller.start().await.unwrap();
        h.controller.extend_current(60).await.unwrap();
        h.controller.borrow_from_next(100).await.unwrap();

        h.controller.load_meeting(&meeting.id).await.unwrap();
        h.controller.initialize().await.unwrap();

        let loaded = h.controller.meeting().await.unwrap();
        assert_eq!(loaded.agenda[0].planned_duration, 660);
        assert_eq!(loaded.agenda[1].planned_duration, 200);
        let kinds: Vec<_> = loaded.agenda[0].overrun_decisions.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DecisionKind::Extend, DecisionKind::Borrow]);

        assert_eq!(
            h.controller.borrow_from_next(250).await.unwrap_err(),
            ClockError::NegativeNext
        );
        h.controller.flush().await.unwrap();
        let stored = h.controller.database().get_meeting(&meeting.id).await.unwrap().unwrap();
        assert_eq!(stored.agenda[1].planned_duration, 200);
        assert_eq!(stored.agenda[0].overrun_decisions.len(), 2);
    }

    #[tokio::test]
    async fn loading_an_unknown_meeting_keeps_the_active_one() {
        let h = harness(false);
        let meeting = load(&h, &[("a", 600)]).await;

        assert!(h.controller.load_meeting("missing").await.is_err());
        assert_eq!(h.controller.meeting().await.unwrap().id, meeting.id);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_notifier_does_not_stop_the_clock() {
        struct Unplugged;
        impl Notifier for Unplugged {
            fn notify(&self, _: &crate::timer::Notification) -> Result<()> {
                Err(anyhow!("speaker unplugged"))
            }
        }

        let dir = tempdir().unwrap();
        let controller = controller_with(&dir, Arc::new(Unplugged));
        let meeting = controller
            .create_meeting("retro", false, &agenda(&[("short", 2)]))
            .await
            .unwrap();
        controller.load_meeting(&meeting.id).await.unwrap();

        controller.start().await.unwrap();
        time::sleep(Duration::from_millis(65_100)).await;
        let snapshot = controller.pause().await.unwrap();

        assert!(snapshot.state.is_running);
        let current = snapshot.current.unwrap();
        assert_eq!(current.actual_duration, 65);
        assert_eq!(current.status, AgendaStatus::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_sampler_and_resume_continues() {
        let h = harness(false);
        load(&h, &[("demo", 600)]).await;

        h.controller.start().await.unwrap();
        time::sleep(Duration::from_millis(3_100)).await;
        h.controller.pause().await.unwrap();
        assert!(h.controller.has_ticker().await);

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(h.controller.snapshot().await.elapsed_sec, 3);

        h.controller.resume().await.unwrap();
        time::sleep(Duration::from_millis(2_100)).await;
        h.controller.pause().await.unwrap();
        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.current.unwrap().actual_duration, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_keeps_a_single_sampler() {
        let h = harness(false);
        load(&h, &[("demo", 600)]).await;

        h.controller.start().await.unwrap();
        h.controller.start().await.unwrap();
        time::sleep(Duration::from_millis(4_100)).await;

        assert!(h.controller.has_ticker().await);
        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.current.unwrap().actual_duration, 4);
        assert_eq!(h.notifier.kinds(), vec![NotificationKind::Start]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_sampler() {
        let h = harness(false);
        load(&h, &[("demo", 600)]).await;

        h.controller.start().await.unwrap();
        time::sleep(Duration::from_millis(2_100)).await;
        h.controller.stop().await.unwrap();
        assert!(!h.controller.has_ticker().await);

        time::sleep(Duration::from_secs(30)).await;
        let snapshot = h.controller.snapshot().await;
        assert!(!snapshot.state.is_running);
        assert_eq!(snapshot.current.unwrap().actual_duration, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn skipping_through_the_agenda_completes_the_meeting() {
        let h = harness(true);
        let meeting = load(&h, &[("a", 600), ("b", 300)]).await;

        h.controller.start().await.unwrap();
        time::sleep(Duration::from_millis(5_100)).await;
        h.controller.skip_current().await.unwrap();
        time::sleep(Duration::from_millis(3_100)).await;
        let snapshot = h.controller.skip_current().await.unwrap();

        assert!(!snapshot.state.is_running);
        assert_eq!(snapshot.state.current_agenda_id, None);
        assert_eq!(snapshot.meeting_status, Some(MeetingStatus::Completed));
        assert!(!h.controller.has_ticker().await);

        h.controller.flush().await.unwrap();
        let stored = h.controller.database().get_meeting(&meeting.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MeetingStatus::Completed);
        assert_eq!(stored.agenda[0].actual_duration, 5);
        assert_eq!(stored.agenda[1].actual_duration, 3);
        assert!(stored
            .agenda
            .iter()
            .all(|item| item.status == AgendaStatus::Completed && item.end_at.is_some()));
        assert_eq!(stored.agenda[0].overrun_decisions[0].kind, DecisionKind::Next);
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_decisions_reach_the_database() {
        let h = harness(false);
        let meeting = load(&h, &[("a", 600), ("b", 300)]).await;

        h.controller.start().await.unwrap();
        h.controller.extend_current(60).await.unwrap();
        h.controller.borrow_from_next(100).await.unwrap();
        assert_eq!(
            h.controller.borrow_from_next(201).await.unwrap_err(),
            ClockError::NegativeNext
        );
        h.controller.flush().await.unwrap();

        let stored = h.controller.database().get_meeting(&meeting.id).await.unwrap().unwrap();
        assert_eq!(stored.agenda[0].planned_duration, 660);
        assert_eq!(stored.agenda[1].planned_duration, 200);
        let kinds: Vec<_> = stored.agenda[0].overrun_decisions.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DecisionKind::Extend, DecisionKind::Borrow]);
    }

    #[tokio::test(start_paused = true)]
    async fn agenda_edits_are_persisted_in_order() {
        let h = harness(false);
        let meeting = load(&h, &[("a", 60), ("b", 60)]).await;

        let added = h.controller.add_agenda_item("c", 120).await.unwrap();
        h.controller.rename_agenda_item(&added.id, "closing").await.unwrap();
        h.controller.move_agenda_item(&added.id, 0).await.unwrap();
        h.controller
            .remove_agenda_item(&meeting.agenda[0].id)
            .await
            .unwrap();
        assert_eq!(
            h.controller.remove_agenda_item("missing").await.unwrap_err(),
            ClockError::AgendaNotFound
        );
        h.controller.flush().await.unwrap();

        let stored = h.controller.database().get_agenda(&meeting.id).await.unwrap();
        let titles: Vec<_> = stored.iter().map(|item| item.title.as_str()).collect();
        let orders: Vec<_> = stored.iter().map(|item| item.order).collect();
        assert_eq!(titles, vec!["closing", "b"]);
        assert_eq!(orders, vec![0, 1]);
    }

    #[tokio::test]
    async fn commands_without_meeting_report_reason() {
        let h = harness(false);
        let err = h.controller.start().await.unwrap_err();
        assert_eq!(err.reason(), "no-active-meeting");
        assert!(!h.controller.has_ticker().await);
        assert_eq!(
            h.controller.summary().await.unwrap_err(),
            ClockError::NoActiveMeeting
        );
    }
}
