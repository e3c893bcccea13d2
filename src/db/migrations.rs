use anyhow::{ensure, Context, Result};
use rusqlite::Connection;

/// Schema files in version order; entry `i` moves the database to version `i + 1`.
const MIGRATIONS: &[(&str, &str)] = &[
    ("schema_v1.sql", include_str!("schemas/schema_v1.sql")),
    ("schema_v2.sql", include_str!("schemas/schema_v2.sql")),
];

fn schema_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;
    usize::try_from(version).context("user_version is negative")
}

/// Brings the schema up to date. Each step commits together with its
/// `user_version` bump, so an interrupted upgrade resumes where it stopped.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let applied = schema_version(conn)?;
    ensure!(
        applied <= MIGRATIONS.len(),
        "database schema v{applied} is newer than this build (v{})",
        MIGRATIONS.len()
    );

    for (index, (name, sql)) in MIGRATIONS.iter().enumerate().skip(applied) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("failed to apply {name}"))?;
        tx.pragma_update(None, "user_version", (index + 1) as i64)?;
        tx.commit()
            .with_context(|| format!("failed to commit {name}"))?;
    }
    Ok(())
}
