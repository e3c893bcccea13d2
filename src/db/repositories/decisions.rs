use anyhow::Result;
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_i64, to_u64},
    models::{DecisionKind, OverrunDecision},
};

fn row_to_decision(row: &Row) -> Result<OverrunDecision> {
    let kind: String = row.get("kind")?;
    let amount: Option<i64> = row.get("amount_sec")?;
    let at: String = row.get("at")?;

    Ok(OverrunDecision {
        kind: kind.parse::<DecisionKind>()?,
        amount_sec: amount.map(|value| to_u64(value, "amount_sec")).transpose()?,
        at: parse_datetime(&at, "at")?,
        from_agenda_id: row.get("from_agenda_id")?,
        to_agenda_id: row.get("to_agenda_id")?,
    })
}

pub(crate) fn insert_decision_row(
    conn: &Connection,
    agenda_id: &str,
    decision: &OverrunDecision,
) -> Result<()> {
    conn.execute(
        "INSERT INTO overrun_decisions (agenda_id, kind, amount_sec, at, from_agenda_id, to_agenda_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            agenda_id,
            decision.kind.as_str(),
            decision.amount_sec.map(to_i64).transpose()?,
            decision.at.to_rfc3339(),
            decision.from_agenda_id,
            decision.to_agenda_id,
        ],
    )?;
    Ok(())
}

/// Decisions for one agenda item, oldest first.
pub(crate) fn load_decisions(conn: &Connection, agenda_id: &str) -> Result<Vec<OverrunDecision>> {
    let mut stmt = conn.prepare(
        "SELECT kind, amount_sec, at, from_agenda_id, to_agenda_id
         FROM overrun_decisions
         WHERE agenda_id = ?1
         ORDER BY seq ASC",
    )?;
    let mut rows = stmt.query(params![agenda_id])?;
    let mut decisions = Vec::new();
    while let Some(row) = rows.next()? {
        decisions.push(row_to_decision(row)?);
    }
    Ok(decisions)
}

impl Database {
    pub async fn append_decision(&self, agenda_id: &str, decision: &OverrunDecision) -> Result<()> {
        let agenda_id = agenda_id.to_string();
        let decision = decision.clone();
        self.execute(move |conn| insert_decision_row(conn, &agenda_id, &decision))
            .await
    }

    pub async fn get_decisions(&self, agenda_id: &str) -> Result<Vec<OverrunDecision>> {
        let agenda_id = agenda_id.to_string();
        self.execute(move |conn| load_decisions(conn, &agenda_id))
            .await
    }
}
