//! Line-oriented command surface over [`TimerController`].
//!
//! Every command answers with a one-line description of the clock, or with
//! the kebab-case reason of a refused command.

use crate::db::{AgendaStatus, MeetingStatus};
use crate::settings::SettingsStore;
use crate::timer::{ClockError, RunClockSnapshot, TimerController};

pub const HELP: &str = "\
commands:
  new <title>              create a meeting and make it active
  load <meeting-id>        make a stored meeting active
  list                     list stored meetings
  add <sec> <title>        append an agenda item
  remove <agenda-id>       delete an agenda item
  move <agenda-id> <index> reorder an agenda item
  rename <agenda-id> <title>
  start | pause | resume | stop
  next | skip
  extend <sec>             lengthen the current item
  borrow <sec>             take time from the next item
  status | summary | help
  set auto-transition on|off
  set warning <sec>        warn this long before an item ends
  set bell on|off | set volume <0..1>   (applies after restart)";

fn reason(err: ClockError) -> String {
    err.reason().to_string()
}

fn usage(command: &str) -> String {
    format!("usage: see 'help' for '{command}'")
}

fn parse_seconds(command: &str, value: Option<&str>) -> Result<u64, String> {
    value
        .and_then(|raw| raw.parse::<u64>().ok())
        .ok_or_else(|| usage(command))
}

fn parse_switch(command: &str, value: Option<&str>) -> Result<bool, String> {
    match value {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => Err(usage(command)),
    }
}

async fn apply_setting(
    controller: &TimerController,
    settings: &SettingsStore,
    key: Option<&str>,
    value: Option<&str>,
) -> Result<String, String> {
    let saved = |result: anyhow::Result<()>| result.map_err(|e| e.to_string());
    match key {
        Some("auto-transition") => {
            let enabled = parse_switch("set", value)?;
            saved(settings.set_auto_transition(enabled))?;
            match controller.set_auto_transition(enabled).await {
                Ok(()) | Err(ClockError::NoActiveMeeting) => {}
                Err(err) => return Err(reason(err)),
            }
            Ok(format!("auto-transition {}", if enabled { "on" } else { "off" }))
        }
        Some("warning") => {
            let seconds = parse_seconds("set", value)?;
            saved(settings.set_warning_threshold(seconds))?;
            controller.set_warning_threshold(seconds).await;
            Ok(format!("warning at {} before the end", format_clock(seconds)))
        }
        Some("bell") => {
            let mut bell = settings.get().map_err(|e| e.to_string())?.bell;
            bell.enabled = parse_switch("set", value)?;
            saved(settings.update_bell(bell))?;
            Ok("bell saved; applies after restart".to_string())
        }
        Some("volume") => {
            let volume = value
                .and_then(|raw| raw.parse::<f32>().ok())
                .filter(|v| (0.0..=1.0).contains(v))
                .ok_or_else(|| usage("set"))?;
            let mut bell = settings.get().map_err(|e| e.to_string())?.bell;
            bell.volume = volume;
            saved(settings.update_bell(bell))?;
            Ok("volume saved; applies after restart".to_string())
        }
        _ => Err(usage("set")),
    }
}

fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub fn describe(snapshot: &RunClockSnapshot) -> String {
    let Some(item) = &snapshot.current else {
        return match snapshot.meeting_status {
            Some(MeetingStatus::Completed) => "meeting completed".to_string(),
            Some(_) => "no agenda item selected".to_string(),
            None => "no meeting".to_string(),
        };
    };

    let status = if snapshot.is_paused {
        AgendaStatus::Paused.as_str()
    } else {
        item.status.as_str()
    };
    format!(
        "{} [{}] {} / {}",
        item.title,
        status,
        format_clock(snapshot.elapsed_sec),
        format_clock(item.planned_duration)
    )
}

/// Parses and runs one command line.
pub async fn dispatch(
    controller: &TimerController,
    settings: &SettingsStore,
    line: &str,
) -> Result<String, String> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(String::new());
    };

    let snapshot = match command {
        "start" => controller.start().await,
        "pause" => controller.pause().await,
        "resume" => controller.resume().await,
        "stop" => controller.stop().await,
        "next" => controller.next_agenda().await,
        "skip" => controller.skip_current().await,
        "extend" => {
            let seconds = parse_seconds(command, parts.next())?;
            controller.extend_current(seconds).await
        }
        "borrow" => {
            let seconds = parse_seconds(command, parts.next())?;
            controller.borrow_from_next(seconds).await
        }
        "status" => Ok(controller.snapshot().await),
        "summary" => {
            let summary = controller.summary().await.map_err(reason)?;
            return serde_json::to_string_pretty(&summary).map_err(|e| e.to_string());
        }
        "add" => {
            let seconds = parse_seconds(command, parts.next())?;
            let title = parts.collect::<Vec<_>>().join(" ");
            if title.is_empty() {
                return Err(usage(command));
            }
            let item = controller
                .add_agenda_item(&title, seconds)
                .await
                .map_err(reason)?;
            return Ok(format!("added {} \"{}\"", item.id, item.title));
        }
        "remove" => {
            let id = parts.next().ok_or_else(|| usage(command))?;
            let item = controller.remove_agenda_item(id).await.map_err(reason)?;
            return Ok(format!("removed \"{}\"", item.title));
        }
        "rename" => {
            let id = parts.next().ok_or_else(|| usage(command))?;
            let title = parts.collect::<Vec<_>>().join(" ");
            if title.is_empty() {
                return Err(usage(command));
            }
            controller.rename_agenda_item(id, &title).await.map_err(reason)?;
            return Ok(format!("renamed {id} to \"{title}\""));
        }
        "set" => return apply_setting(controller, settings, parts.next(), parts.next()).await,
        "move" => {
            let id = parts.next().ok_or_else(|| usage(command))?;
            let index = parts
                .next()
                .and_then(|raw| raw.parse::<usize>().ok())
                .ok_or_else(|| usage(command))?;
            controller.move_agenda_item(id, index).await.map_err(reason)?;
            return Ok(format!("moved {id} to {index}"));
        }
        "new" => {
            let title = parts.collect::<Vec<_>>().join(" ");
            if title.is_empty() {
                return Err(usage(command));
            }
            let auto_transition = settings
                .get()
                .map_err(|e| e.to_string())?
                .auto_transition;
            let meeting = controller
                .create_meeting(&title, auto_transition, &[])
                .await
                .map_err(|e| e.to_string())?;
            controller.activate_meeting(meeting.clone()).await;
            return Ok(format!("meeting {} \"{}\"", meeting.id, meeting.title));
        }
        "load" => {
            let id = parts.next().ok_or_else(|| usage(command))?;
            controller
                .load_meeting(id)
                .await
                .map_err(|e| e.to_string())?;
            controller.initialize().await
        }
        "list" => {
            let meetings = controller
                .database()
                .list_meetings()
                .await
                .map_err(|e| e.to_string())?;
            let lines: Vec<String> = meetings
                .iter()
                .map(|m| format!("{} {:?} \"{}\" ({} items)", m.id, m.status, m.title, m.agenda.len()))
                .collect();
            return Ok(lines.join("\n"));
        }
        "help" => return Ok(HELP.to_string()),
        other => return Err(format!("unknown command '{other}'")),
    };

    snapshot.map(|s| describe(&s)).map_err(reason)
}
