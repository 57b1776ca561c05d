use anyhow::Result;
use rollcall_core::{Gallery, NearestMatcher, PresenceTracker};
use rollcall_ledger::CsvLedger;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod pipeline;
mod replay;

use config::Config;
use pipeline::{LogSink, Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("rollcalld starting");

    let config = Config::from_env();

    // Corrupt or missing gallery is fatal: no partial load.
    let gallery = Gallery::load(&config.gallery_path)?;
    let ledger = CsvLedger::new(&config.ledger_path);

    // Seed presence state from today's persisted rows so a restart never
    // re-attempts a punch-in.
    let mut tracker = PresenceTracker::new();
    let today = chrono::Local::now().date_naive();
    tracker.reconcile(today, &ledger.records_for_date(today)?);

    let Some(replay_path) = config.replay_path.clone() else {
        // Live capture needs a camera frame source and a detection model,
        // both external to the attendance core.
        // TODO: wire a V4L2 FrameSource and an ONNX FaceEngine here.
        tracing::error!(
            "no frame source configured; set ROLLCALL_REPLAY_PATH to run against a replay feed"
        );
        anyhow::bail!("no frame source configured");
    };

    let (source, engine) = replay::open(&replay_path)?;
    let mut pipeline = Pipeline::new(
        source,
        engine,
        LogSink,
        NearestMatcher::new(config.match_threshold),
        gallery,
        tracker,
        ledger,
    );

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let mut worker = tokio::task::spawn_blocking(move || pipeline.run(&stop_flag));

    tokio::select! {
        result = &mut worker => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("stop requested");
            stop.store(true, Ordering::Relaxed);
            worker.await??;
        }
    }

    tracing::info!("rollcalld shutting down");
    Ok(())
}
