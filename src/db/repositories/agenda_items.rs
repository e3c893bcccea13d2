use anyhow::{anyhow, Result};
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_agenda_status, parse_optional_datetime, to_i64, to_u32, to_u64},
    models::{AgendaItem, AgendaPatch},
};

use super::decisions::load_decisions;

const AGENDA_COLUMNS: &str =
    "id, meeting_id, title, order_index, planned_duration, actual_duration, status, start_at, end_at";

fn row_to_agenda_item(row: &Row) -> Result<AgendaItem> {
    let order_index: i64 = row.get("order_index")?;
    let planned: i64 = row.get("planned_duration")?;
    let actual: i64 = row.get("actual_duration")?;
    let status: String = row.get("status")?;
    let start_at: Option<String> = row.get("start_at")?;
    let end_at: Option<String> = row.get("end_at")?;

    Ok(AgendaItem {
        id: row.get("id")?,
        meeting_id: row.get("meeting_id")?,
        title: row.get("title")?,
        order: to_u32(order_index, "order_index")?,
        planned_duration: to_u64(planned, "planned_duration")?,
        actual_duration: to_u64(actual, "actual_duration")?,
        status: parse_agenda_status(&status)?,
        start_at: parse_optional_datetime(start_at, "start_at")?,
        end_at: parse_optional_datetime(end_at, "end_at")?,
        overrun_decisions: Vec::new(),
    })
}

pub(crate) fn insert_agenda_item_row(conn: &Connection, item: &AgendaItem) -> Result<()> {
    conn.execute(
        "INSERT INTO agenda_items (id, meeting_id, title, order_index, planned_duration, actual_duration, status, start_at, end_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            item.id,
            item.meeting_id,
            item.title,
            item.order as i64,
            to_i64(item.planned_duration)?,
            to_i64(item.actual_duration)?,
            item.status.as_str(),
            item.start_at.as_ref().map(|dt| dt.to_rfc3339()),
            item.end_at.as_ref().map(|dt| dt.to_rfc3339()),
        ],
    )?;
    Ok(())
}

/// Agenda of a meeting in traversal order, decisions included.
pub(crate) fn load_agenda(conn: &Connection, meeting_id: &str) -> Result<Vec<AgendaItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {AGENDA_COLUMNS} FROM agenda_items
         WHERE meeting_id = ?1
         ORDER BY order_index ASC, rowid ASC"
    ))?;
    let mut rows = stmt.query(params![meeting_id])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(row_to_agenda_item(row)?);
    }

    for item in &mut items {
        item.overrun_decisions = load_decisions(conn, &item.id)?;
    }
    Ok(items)
}

fn renumber(conn: &Connection, meeting_id: &str) -> Result<()> {
    let ids: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT id FROM agenda_items WHERE meeting_id = ?1 ORDER BY order_index ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![meeting_id], |row| row.get(0))?;
        rows.collect::<Result<_, _>>()?
    };
    for (index, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE agenda_items SET order_index = ?1 WHERE id = ?2",
            params![index as i64, id],
        )?;
    }
    Ok(())
}

impl Database {
    pub async fn insert_agenda_item(&self, item: &AgendaItem) -> Result<()> {
        let record = item.clone();
        self.execute(move |conn| insert_agenda_item_row(conn, &record))
            .await
    }

    pub async fn get_agenda_item(&self, agenda_id: &str) -> Result<Option<AgendaItem>> {
        let agenda_id = agenda_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {AGENDA_COLUMNS} FROM agenda_items WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![agenda_id])?;
            if let Some(row) = rows.next()? {
                let mut item = row_to_agenda_item(row)?;
                item.overrun_decisions = load_decisions(conn, &item.id)?;
                return Ok(Some(item));
            }
            Ok(None)
        })
        .await
    }

    pub async fn get_agenda(&self, meeting_id: &str) -> Result<Vec<AgendaItem>> {
        let meeting_id = meeting_id.to_string();
        self.execute(move |conn| load_agenda(conn, &meeting_id)).await
    }

    /// Writes the fields set in `patch`. An empty patch is a no-op.
    pub async fn apply_agenda_patch(&self, agenda_id: &str, patch: &AgendaPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let agenda_id = agenda_id.to_string();
        let patch = patch.clone();
        self.execute(move |conn| {
            let mut columns: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();

            if let Some(planned) = patch.planned_duration {
                columns.push("planned_duration");
                values.push(Value::Integer(to_i64(planned)?));
            }
            if let Some(actual) = patch.actual_duration {
                columns.push("actual_duration");
                values.push(Value::Integer(to_i64(actual)?));
            }
            if let Some(status) = patch.status {
                columns.push("status");
                values.push(Value::Text(status.as_str().to_string()));
            }
            if let Some(start_at) = patch.start_at {
                columns.push("start_at");
                values.push(Value::Text(start_at.to_rfc3339()));
            }
            if let Some(end_at) = patch.end_at {
                columns.push("end_at");
                values.push(Value::Text(end_at.to_rfc3339()));
            }
            if let Some(order) = patch.order {
                columns.push("order_index");
                values.push(Value::Integer(order as i64));
            }
            if let Some(title) = patch.title {
                columns.push("title");
                values.push(Value::Text(title));
            }

            let assignments = columns
                .iter()
                .enumerate()
                .map(|(index, column)| format!("{column} = ?{}", index + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE agenda_items SET {assignments} WHERE id = ?{}",
                columns.len() + 1
            );
            values.push(Value::Text(agenda_id.clone()));

            let changed = conn.execute(&sql, params_from_iter(values))?;
            if changed == 0 {
                return Err(anyhow!("agenda item {agenda_id} not found"));
            }
            Ok(())
        })
        .await
    }

    /// Deletes an agenda item and closes the gap in `order_index`.
    pub async fn delete_agenda_item(&self, agenda_id: &str) -> Result<()> {
        let agenda_id = agenda_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let meeting_id: Option<String> = tx
                .query_row(
                    "SELECT meeting_id FROM agenda_items WHERE id = ?1",
                    params![agenda_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(meeting_id) = meeting_id else {
                return Err(anyhow!("agenda item {agenda_id} not found"));
            };

            tx.execute("DELETE FROM agenda_items WHERE id = ?1", params![agenda_id])?;
            renumber(&tx, &meeting_id)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Persists the agenda order exactly as given: `ordered_ids[i]` gets `order_index = i`.
    pub async fn save_agenda_order(&self, meeting_id: &str, ordered_ids: &[String]) -> Result<()> {
        let meeting_id = meeting_id.to_string();
        let ordered_ids = ordered_ids.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            for (index, id) in ordered_ids.iter().enumerate() {
                let changed = tx.execute(
                    "UPDATE agenda_items SET order_index = ?1 WHERE id = ?2 AND meeting_id = ?3",
                    params![index as i64, id, meeting_id],
                )?;
                if changed == 0 {
                    return Err(anyhow!("agenda item {id} not found in meeting {meeting_id}"));
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
