use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_meeting_status},
    models::{AgendaStatus, Meeting, MeetingPatch, MeetingStatus},
};

use super::agenda_items::{insert_agenda_item_row, load_agenda};
use super::decisions::insert_decision_row;

const MEETING_COLUMNS: &str = "id, title, status, auto_transition, created_at, updated_at";

fn row_to_meeting(row: &Row) -> Result<Meeting> {
    let status: String = row.get("status")?;
    let auto_transition: i64 = row.get("auto_transition")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Meeting {
        id: row.get("id")?,
        title: row.get("title")?,
        status: parse_meeting_status(&status)?,
        auto_transition: auto_transition != 0,
        agenda: Vec::new(),
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn load_meeting(conn: &Connection, meeting_id: &str) -> Result<Option<Meeting>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1"
    ))?;
    let mut rows = stmt.query(params![meeting_id])?;
    if let Some(row) = rows.next()? {
        let mut meeting = row_to_meeting(row)?;
        meeting.agenda = load_agenda(conn, &meeting.id)?;
        meeting.normalize_order();
        return Ok(Some(meeting));
    }
    Ok(None)
}

impl Database {
    /// Inserts a meeting together with its agenda and any recorded decisions.
    pub async fn insert_meeting(&self, meeting: &Meeting) -> Result<()> {
        let record = meeting.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO meetings (id, title, status, auto_transition, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.title,
                    record.status.as_str(),
                    record.auto_transition as i64,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            for item in &record.agenda {
                insert_agenda_item_row(&tx, item)?;
                for decision in &item.overrun_decisions {
                    insert_decision_row(&tx, &item.id, decision)?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_meeting(&self, meeting_id: &str) -> Result<Option<Meeting>> {
        let meeting_id = meeting_id.to_string();
        self.execute(move |conn| load_meeting(conn, &meeting_id))
            .await
    }

    /// All meetings, newest first, agendas included.
    pub async fn list_meetings(&self) -> Result<Vec<Meeting>> {
        self.execute(|conn| {
            let ids: Vec<String> = {
                let mut stmt =
                    conn.prepare("SELECT id FROM meetings ORDER BY created_at DESC, rowid DESC")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<Result<_, _>>()?
            };

            let mut meetings = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(meeting) = load_meeting(conn, &id)? {
                    meetings.push(meeting);
                }
            }
            Ok(meetings)
        })
        .await
    }

    pub async fn apply_meeting_patch(&self, meeting_id: &str, patch: &MeetingPatch) -> Result<()> {
        let meeting_id = meeting_id.to_string();
        let patch = patch.clone();
        self.execute(move |conn| {
            let updated_at = patch.updated_at.unwrap_or_else(Utc::now);
            let changed = conn.execute(
                "UPDATE meetings
                 SET status = COALESCE(?1, status),
                     title = COALESCE(?2, title),
                     auto_transition = COALESCE(?3, auto_transition),
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    patch.status.map(|status| status.as_str()),
                    patch.title,
                    patch.auto_transition.map(|flag| flag as i64),
                    updated_at.to_rfc3339(),
                    meeting_id,
                ],
            )?;
            if changed == 0 {
                return Err(anyhow!("meeting {meeting_id} not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn delete_meeting(&self, meeting_id: &str) -> Result<()> {
        let meeting_id = meeting_id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM meetings WHERE id = ?1", params![meeting_id])?;
            Ok(())
        })
        .await
    }

    /// Run-clock state is not persisted, so items left running by a previous
    /// process are parked as paused. Returns the ids of meetings that were in progress.
    pub async fn recover_interrupted_meetings(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let ids: Vec<String> = {
                let mut stmt = tx.prepare("SELECT id FROM meetings WHERE status = ?1")?;
                let rows = stmt.query_map(params![MeetingStatus::InProgress.as_str()], |row| {
                    row.get(0)
                })?;
                rows.collect::<Result<_, _>>()?
            };

            tx.execute(
                "UPDATE agenda_items SET status = ?1 WHERE status IN (?2, ?3)",
                params![
                    AgendaStatus::Paused.as_str(),
                    AgendaStatus::Running.as_str(),
                    AgendaStatus::Overtime.as_str(),
                ],
            )?;
            for id in &ids {
                tx.execute(
                    "UPDATE meetings SET updated_at = ?1 WHERE id = ?2",
                    params![now.to_rfc3339(), id],
                )?;
            }
            tx.commit()?;
            Ok(ids)
        })
        .await
    }
}
