use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, ensure, Context, Result};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Owns the connection thread. Dropping the last handle closes the job
/// channel, which ends the thread's receive loop, then joins it.
struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log_error!("meeting store thread panicked");
            }
        }
    }
}

/// Opens the store and checks the guarantees the repositories rely on:
/// cascading deletes and the append-only decision ledger.
fn open_store(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open meeting store {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        log_warn!("WAL unavailable, keeping default journal: {err}");
    }
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let foreign_keys: i64 = conn.pragma_query_value(None, "foreign_keys", |row| row.get(0))?;
    ensure!(foreign_keys == 1, "SQLite build ignores foreign keys");

    run_migrations(&mut conn).context("failed to migrate meeting store")?;

    let ledger_guard: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE type = 'trigger' AND name = 'overrun_decisions_no_update'",
        [],
        |row| row.get(0),
    )?;
    ensure!(ledger_guard == 1, "decision ledger trigger is missing");

    Ok(conn)
}

/// Handle to the meeting store. A single thread owns the SQLite connection;
/// `execute` ships a closure to it and awaits the answer.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

impl Database {
    /// Opens (creating if needed) the store at `db_path`. Fails when the file
    /// cannot be opened or migrated.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (opened_tx, opened_rx) = mpsc::sync_channel::<Result<()>>(1);
        let path = db_path.clone();

        let thread = thread::Builder::new()
            .name("timebox-db".into())
            .spawn(move || {
                let mut conn = match open_store(&path) {
                    Ok(conn) => {
                        let _ = opened_tx.send(Ok(()));
                        conn
                    }
                    Err(err) => {
                        let _ = opened_tx.send(Err(err));
                        return;
                    }
                };
                for job in jobs_rx {
                    job(&mut conn);
                }
            })
            .context("failed to spawn meeting store thread")?;

        let worker = Worker {
            jobs: Some(jobs_tx),
            thread: Some(thread),
        };
        opened_rx
            .recv()
            .map_err(|_| anyhow!("meeting store thread exited during startup"))??;

        log_info!("meeting store ready at {}", db_path.display());
        Ok(Self {
            worker: Arc::new(worker),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            // The caller may have given up waiting; nothing to do then.
            let _ = reply_tx.send(task(conn));
        });

        self.worker
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("meeting store is closed"))?
            .send(job)
            .map_err(|_| anyhow!("meeting store thread is gone"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("meeting store dropped the request"))?
    }
}
