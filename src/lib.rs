pub mod audio;
pub mod db;
pub mod error;
pub mod feedback;
pub mod frame;
pub mod hold;
pub mod models;
pub mod pose;
pub mod progress;
pub mod replay;
pub mod session;
pub mod settings;
mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{info, warn};
use tokio::sync::broadcast::error::RecvError;

use audio::{AudioCue, AudioEngineHandle, SilentCue};
use db::Database;
use feedback::FeedbackEvent;
use models::SessionRecord;
use pose::PoseClass;
use progress::ProgressReport;
use replay::{ReplayLoader, ReplayTrace};
use session::{PracticeController, PracticeDeps};
use settings::{PracticeSettings, SettingsStore};

pub use error::PracticeError;

const USAGE: &str = "usage:
  posehold replay <trace.jsonl> [pose]   run a hold against a recorded trace
  posehold history                       print the progress report
  posehold reset                         delete every stored session";

// Polls after the trace runs dry before giving up on completion.
const EXHAUSTED_GRACE_POLLS: u32 = 3;

fn home_dir() -> PathBuf {
    std::env::var_os("POSEHOLD_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".posehold"))
}

fn build_audio(settings: &PracticeSettings) -> Arc<dyn AudioCue> {
    if settings.audio_enabled {
        Arc::new(AudioEngineHandle::new(settings.cue_volume))
    } else {
        Arc::new(SilentCue)
    }
}

/// Runs one hold against a trace. Returns the record if the hold completed
/// before the trace ran out.
pub async fn replay_session(
    trace_path: &Path,
    target: PoseClass,
    settings: PracticeSettings,
    db: Option<Database>,
) -> Result<Option<SessionRecord>> {
    let trace = Arc::new(ReplayTrace::load(trace_path)?);
    info!(
        "replaying {} frames from {} for {target}",
        trace.len(),
        trace_path.display()
    );

    let audio = build_audio(&settings);
    let poll_every = settings.tick_interval();
    let controller = PracticeController::new(
        settings,
        PracticeDeps {
            loader: Arc::new(ReplayLoader::new(Arc::clone(&trace))),
            frames: trace.clone(),
            audio,
            db,
        },
    );

    let mut events = controller.subscribe();
    controller.start(target).await?;

    let mut poll = tokio::time::interval(poll_every);
    let mut exhausted_polls = 0;
    let outcome = loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(FeedbackEvent::Completed { record }) => break Some(record),
                Ok(FeedbackEvent::MatchStarted) => info!("pose matched, holding"),
                Ok(FeedbackEvent::MatchLost) => info!("pose lost"),
                Ok(FeedbackEvent::WarningRaised) => warn!("pose not matched for a while"),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("feedback lagged by {skipped} events"),
                Err(RecvError::Closed) => break None,
            },
            _ = poll.tick() => {
                if trace.is_exhausted() {
                    exhausted_polls += 1;
                    if exhausted_polls > EXHAUSTED_GRACE_POLLS {
                        info!("trace exhausted before the hold completed");
                        break None;
                    }
                }
            }
        }
    };

    // Joins the sampling task, so a completed record is persisted by now.
    controller.dispose().await;
    Ok(outcome)
}

pub async fn progress_report(db: &Database, user_id: &str) -> Result<ProgressReport> {
    let records = db.list_sessions(user_id).await?;
    let last_updated = db.last_updated(user_id).await?;
    Ok(ProgressReport::build(&records, Utc::now(), last_updated))
}

fn run_command(args: &[String]) -> Result<()> {
    let Some(command) = args.first() else {
        println!("{USAGE}");
        return Ok(());
    };

    let home = home_dir();
    std::fs::create_dir_all(&home)
        .with_context(|| format!("failed to create {}", home.display()))?;
    let settings = SettingsStore::new(home.join("settings.json"))?.practice();
    let database = Database::new(home.join("posehold.sqlite3"))?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;

    match command.as_str() {
        "replay" => {
            let trace_path = args
                .get(1)
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("replay needs a trace file\n{USAGE}"))?;
            let target = match args.get(2) {
                Some(name) => name.parse::<PoseClass>()?,
                None => PoseClass::Tree,
            };

            let outcome = runtime.block_on(replay_session(
                &trace_path,
                target,
                settings,
                Some(database),
            ))?;
            match outcome {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("hold not completed"),
            }
        }
        "history" => {
            let report = runtime.block_on(progress_report(&database, &settings.user_id))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "reset" => {
            let removed = runtime.block_on(database.reset_sessions(&settings.user_id))?;
            println!("removed {removed} sessions");
        }
        other => return Err(anyhow!("unknown command '{other}'\n{USAGE}")),
    }
    Ok(())
}

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = run_command(&args) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
