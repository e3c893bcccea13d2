#[cfg(feature = "bell")]
mod audio;
pub mod clock;
pub mod commands;
pub mod db;
pub mod meeting;
pub mod settings;
pub mod timer;
mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use clock::SystemClock;
use db::Database;
use settings::{SettingsStore, UserSettings};
use timer::{ClockError, LogNotifier, Notifier, TimerController};

const DATA_DIR_ENV: &str = "TIMEBOX_DATA_DIR";

fn resolve_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("timebox"))
        .ok_or_else(|| anyhow!("could not determine a data directory; set {DATA_DIR_ENV}"))
}

fn build_notifier(settings: &UserSettings) -> Arc<dyn Notifier> {
    #[cfg(feature = "bell")]
    {
        if settings.bell.enabled {
            return Arc::new(timer::FanoutNotifier::new(vec![
                Box::new(LogNotifier),
                Box::new(audio::BellNotifier::new(settings.bell.volume)),
            ]));
        }
    }

    #[cfg(not(feature = "bell"))]
    {
        if settings.bell.enabled {
            info!("Built without the `bell` feature; boundary notifications are logged only");
        }
    }

    Arc::new(LogNotifier)
}

async fn serve() -> Result<()> {
    let data_dir = resolve_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let database = Database::new(data_dir.join("timebox.sqlite3"))?;

    // The run-clock is not persisted; park whatever was running when the last process died.
    let recovered = database.recover_interrupted_meetings(Utc::now()).await?;
    for id in &recovered {
        warn!("Recovered interrupted meeting {id}; running items are now paused");
    }

    let settings_store = SettingsStore::new(data_dir.join("settings.json"))?;
    let settings = settings_store.get()?;

    let controller = TimerController::new(
        database,
        Arc::new(SystemClock::new()),
        build_notifier(&settings),
        settings.controller_options(),
    );

    if let Some(id) = recovered.first() {
        controller.load_meeting(id).await?;
        controller.initialize().await?;
        info!("Resumed meeting {id}; type 'start' to continue");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if matches!(trimmed, "quit" | "exit") {
            break;
        }
        match commands::dispatch(&controller, &settings_store, trimmed).await {
            Ok(output) if output.is_empty() => {}
            Ok(output) => println!("{output}"),
            Err(reason) => eprintln!("error: {reason}"),
        }
    }

    match controller.stop().await {
        Ok(_) | Err(ClockError::NoActiveMeeting) => {}
        Err(err) => warn!("Failed to stop the clock on exit: {err}"),
    }
    controller.flush().await
}

pub fn run() -> Result<()> {
    utils::logging::init();
    info!("timebox starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(serve())
}
