//! Replay feed — a development stand-in for the live camera and detection
//! model. One JSON array of detections per line, one line per frame:
//!
//! ```text
//! [{"region":{"x":10,"y":10,"width":64,"height":64,"confidence":0.98},"embedding":{"values":[...]}}]
//! []
//! ```
//!
//! The source and engine halves share the current frame's detections, so
//! the pipeline sees the same two collaborator seams as live capture.

use crate::pipeline::{FaceEngine, Frame, FrameSource};
use rollcall_core::Detection;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::sync::{Arc, Mutex};

type Shared = Arc<Mutex<Vec<Detection>>>;

pub struct ReplaySource {
    lines: Lines<BufReader<std::fs::File>>,
    pending: Shared,
}

pub struct ReplayEngine {
    pending: Shared,
}

/// Open a replay feed, returning the frame-source and face-engine halves.
pub fn open(path: &Path) -> std::io::Result<(ReplaySource, ReplayEngine)> {
    let file = std::fs::File::open(path)?;
    let pending: Shared = Arc::new(Mutex::new(Vec::new()));
    tracing::info!(path = %path.display(), "replaying detection feed");
    Ok((
        ReplaySource {
            lines: BufReader::new(file).lines(),
            pending: pending.clone(),
        },
        ReplayEngine { pending },
    ))
}

impl FrameSource for ReplaySource {
    fn next_frame(
        &mut self,
    ) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>> {
        for line in self.lines.by_ref() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let detections: Vec<Detection> = serde_json::from_str(&line)?;
            *self.pending.lock().unwrap_or_else(|e| e.into_inner()) = detections;
            return Ok(Some(Frame::default()));
        }
        Ok(None)
    }
}

impl FaceEngine for ReplayEngine {
    fn detect(&mut self, _frame: &Frame) -> Vec<Detection> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()))
    }
}
