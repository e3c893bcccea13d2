pub mod chime;

use anyhow::{anyhow, Result};
use chime::Chime;
use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Mutex,
};
use std::thread;
use std::time::Duration;

use crate::timer::{Notification, NotificationKind, Notifier};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

const STRIKE: Duration = Duration::from_millis(350);

enum BellCommand {
    Ring(NotificationKind),
}

/// Frequencies struck in sequence for each boundary.
fn pattern(kind: NotificationKind) -> &'static [f32] {
    match kind {
        NotificationKind::Start => &[660.0, 880.0],
        NotificationKind::Warning => &[880.0],
        NotificationKind::End => &[880.0, 660.0, 440.0],
        NotificationKind::Overtime => &[440.0],
    }
}

/// Rings a short chime on every boundary notification.
///
/// Audio objects are not `Send`, so they live on a dedicated thread that is
/// spawned on first use and fed through a channel.
pub struct BellNotifier {
    tx: Mutex<Option<Sender<BellCommand>>>,
    volume: f32,
}

impl BellNotifier {
    pub fn new(volume: f32) -> Self {
        Self {
            tx: Mutex::new(None),
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<BellCommand>> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("bell sender lock poisoned"))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<BellCommand>();
        let volume = self.volume;

        thread::Builder::new()
            .name("timebox-bell".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to open audio output: {e}"))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {e}"))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        BellCommand::Ring(kind) => {
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                                log_warn!("{err}");
                                continue;
                            }
                            if let Some(ref s) = sink {
                                s.set_volume(volume);
                                for freq in pattern(kind) {
                                    s.append(Chime::new(*freq, STRIKE));
                                }
                                s.play();
                            }
                        }
                    }
                }
            })
            .map_err(|e| anyhow!("failed to spawn bell thread: {e}"))?;

        *guard = Some(tx.clone());
        Ok(tx)
    }
}

impl Notifier for BellNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(BellCommand::Ring(notification.kind))
            .map_err(|e| anyhow!("bell thread is gone: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_boundary_has_a_distinct_pattern() {
        let kinds = [
            NotificationKind::Start,
            NotificationKind::Warning,
            NotificationKind::End,
            NotificationKind::Overtime,
        ];
        for (i, a) in kinds.iter().enumerate() {
            assert!(!pattern(*a).is_empty());
            for b in &kinds[i + 1..] {
                assert_ne!(pattern(*a), pattern(*b));
            }
        }
    }
}
