//! Frame-loop pipeline: capture → detect → resolve → track → render.
//!
//! Single-threaded and fully sequential: one cycle per frame, at most one
//! ledger call per identity per frame, stop flag checked once per iteration.
//! The camera and the detection model are external collaborators behind the
//! [`FrameSource`] and [`FaceEngine`] seams.

use rollcall_core::{
    BoundingBox, Detection, DisplayStatus, Gallery, Matcher, PresenceTracker,
};
use rollcall_ledger::{CsvLedger, LedgerError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("frame source failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// A captured frame. Pixel data is opaque to the pipeline; it is only
/// handed through to the renderer.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Source of frames. `Ok(None)` is end-of-stream; an error is a failed
/// read, which is fatal and ends the loop.
pub trait FrameSource {
    fn next_frame(&mut self)
        -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>>;
}

/// The black-box detection/embedding model: frame in, faces out.
pub trait FaceEngine {
    fn detect(&mut self, frame: &Frame) -> Vec<Detection>;
}

/// A labeled face region for the external renderer. Unknown faces are
/// labeled but never drive presence state.
#[derive(Debug, Clone)]
pub struct FaceLabel {
    pub region: BoundingBox,
    pub text: String,
}

/// Consumer of per-frame labels (on-screen overlay, log, ...).
pub trait StatusSink {
    fn render(&mut self, frame: &Frame, labels: &[FaceLabel]);
}

/// Sink that logs each labeled face. Stands in for an on-screen renderer.
pub struct LogSink;

impl StatusSink for LogSink {
    fn render(&mut self, _frame: &Frame, labels: &[FaceLabel]) {
        for label in labels {
            tracing::info!(
                x = label.region.x,
                y = label.region.y,
                label = %label.text,
                "face"
            );
        }
    }
}

/// The attendance pipeline, owning everything downstream of the camera.
pub struct Pipeline<S, E, R, M> {
    source: S,
    engine: E,
    sink: R,
    matcher: M,
    gallery: Gallery,
    tracker: PresenceTracker,
    ledger: CsvLedger,
}

impl<S, E, R, M> Pipeline<S, E, R, M>
where
    S: FrameSource,
    E: FaceEngine,
    R: StatusSink,
    M: Matcher,
{
    pub fn new(
        source: S,
        engine: E,
        sink: R,
        matcher: M,
        gallery: Gallery,
        tracker: PresenceTracker,
        ledger: CsvLedger,
    ) -> Self {
        Self {
            source,
            engine,
            sink,
            matcher,
            gallery,
            tracker,
            ledger,
        }
    }

    /// Run until end-of-stream, a fatal error, or `stop` is set.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), PipelineError> {
        let mut frames = 0u64;
        while !stop.load(Ordering::Relaxed) {
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => return Err(PipelineError::Source(err)),
            };
            self.process_frame(&frame)?;
            frames += 1;
        }
        tracing::info!(frames, "pipeline stopped");
        Ok(())
    }

    fn process_frame(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        let detections = self.engine.detect(frame);

        // (a) resolve every detection to an identity, or UNKNOWN. A
        // malformed embedding skips that detection only.
        let mut detected: HashSet<String> = HashSet::new();
        let mut resolved: Vec<(BoundingBox, Option<String>)> =
            Vec::with_capacity(detections.len());
        for detection in detections {
            match self.matcher.resolve(&detection.embedding, &self.gallery) {
                Ok(Some(person)) => {
                    detected.insert(person.to_string());
                    resolved.push((detection.region, Some(person.to_string())));
                }
                Ok(None) => resolved.push((detection.region, None)),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping malformed detection");
                }
            }
        }

        // (b) + (c) apply sightings, then the leave pass over the full
        // frame snapshot, recording events as transitions demand.
        let now = chrono::Local::now().naive_local();
        let Self {
            tracker, ledger, ..
        } = self;
        let statuses = tracker.on_frame(&detected, |person| ledger.record_event(person, now))?;

        let labels: Vec<FaceLabel> = resolved
            .into_iter()
            .map(|(region, person)| {
                let text = match person {
                    Some(person) => {
                        let status = statuses
                            .get(&person)
                            .copied()
                            .unwrap_or(DisplayStatus::InFrame);
                        format!("{person} - {status}")
                    }
                    None => "Unknown".to_string(),
                };
                FaceLabel { region, text }
            })
            .collect();

        self.sink.render(frame, &labels);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::gallery::Enrollment;
    use rollcall_core::{Embedding, NearestMatcher};
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicBool;

    // Scripted stand-ins for the camera and model: the source queues each
    // frame's detections into a shared cell, the engine hands them back
    // (a RefCell here instead of the replay feed's Arc<Mutex>).
    struct CellSource {
        frames: std::vec::IntoIter<Vec<Vec<f32>>>,
        cell: std::rc::Rc<std::cell::RefCell<Vec<Detection>>>,
    }

    struct CellEngine {
        cell: std::rc::Rc<std::cell::RefCell<Vec<Detection>>>,
    }

    impl FrameSource for CellSource {
        fn next_frame(
            &mut self,
        ) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>> {
            match self.frames.next() {
                Some(embeddings) => {
                    *self.cell.borrow_mut() = embeddings
                        .into_iter()
                        .map(|values| Detection {
                            region: BoundingBox {
                                x: 0.0,
                                y: 0.0,
                                width: 64.0,
                                height: 64.0,
                                confidence: 0.99,
                            },
                            embedding: Embedding::new(values),
                        })
                        .collect();
                    Ok(Some(Frame::default()))
                }
                None => Ok(None),
            }
        }
    }

    impl FaceEngine for CellEngine {
        fn detect(&mut self, _frame: &Frame) -> Vec<Detection> {
            self.cell.borrow_mut().drain(..).collect()
        }
    }

    /// Sink that records every label it is asked to render.
    #[derive(Default)]
    struct CaptureSink {
        frames: Vec<Vec<String>>,
    }

    impl StatusSink for CaptureSink {
        fn render(&mut self, _frame: &Frame, labels: &[FaceLabel]) {
            self.frames
                .push(labels.iter().map(|l| l.text.clone()).collect());
        }
    }

    fn feed(frames: Vec<Vec<Vec<f32>>>) -> (CellSource, CellEngine) {
        let cell = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        (
            CellSource {
                frames: frames.into_iter(),
                cell: cell.clone(),
            },
            CellEngine { cell },
        )
    }

    fn test_gallery() -> Gallery {
        let mut map = BTreeMap::new();
        map.insert(
            "emp-001".to_string(),
            Enrollment {
                name: "Ada".to_string(),
                encodings: vec![vec![0.0, 0.0]],
            },
        );
        Gallery::from_enrollments(map).unwrap()
    }

    #[test]
    fn test_end_to_end_punch_in_and_out() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("attendance.csv"));

        // Ada in frame, lingers, leaves, returns.
        let (source, engine) = feed(vec![
            vec![vec![0.1, 0.0]],
            vec![vec![0.1, 0.0]],
            vec![],
            vec![vec![0.1, 0.0]],
        ]);
        let mut pipeline = Pipeline::new(
            source,
            engine,
            CaptureSink::default(),
            NearestMatcher::default(),
            test_gallery(),
            PresenceTracker::new(),
            ledger,
        );
        pipeline.run(&AtomicBool::new(false)).unwrap();

        assert_eq!(pipeline.sink.frames.len(), 4);
        assert_eq!(pipeline.sink.frames[0], vec!["Ada - PUNCH IN"]);
        assert_eq!(pipeline.sink.frames[1], vec!["Ada - IN FRAME"]);
        assert!(pipeline.sink.frames[2].is_empty());
        assert_eq!(pipeline.sink.frames[3], vec!["Ada - PUNCH OUT"]);

        // Exactly one row, both times filled.
        let records = pipeline.ledger.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].person, "Ada");
        assert!(!records[0].punch_in.is_empty());
        assert!(records[0].punch_out.is_some());
    }

    #[test]
    fn test_unknown_face_is_drawn_but_not_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("attendance.csv"));

        // Far from Ada's reference: resolves to UNKNOWN.
        let (source, engine) = feed(vec![vec![vec![5.0, 5.0]]]);
        let mut pipeline = Pipeline::new(
            source,
            engine,
            CaptureSink::default(),
            NearestMatcher::default(),
            test_gallery(),
            PresenceTracker::new(),
            ledger,
        );
        pipeline.run(&AtomicBool::new(false)).unwrap();

        assert_eq!(pipeline.sink.frames[0], vec!["Unknown"]);
        assert!(pipeline.ledger.records().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_detection_skipped_others_proceed() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("attendance.csv"));

        // One wrong-dimension embedding alongside a valid sighting of Ada.
        let (source, engine) = feed(vec![vec![vec![0.1], vec![0.1, 0.0]]]);
        let mut pipeline = Pipeline::new(
            source,
            engine,
            CaptureSink::default(),
            NearestMatcher::default(),
            test_gallery(),
            PresenceTracker::new(),
            ledger,
        );
        pipeline.run(&AtomicBool::new(false)).unwrap();

        // The malformed detection produced no label; Ada still punched in.
        assert_eq!(pipeline.sink.frames[0], vec!["Ada - PUNCH IN"]);
        assert_eq!(pipeline.ledger.records().unwrap().len(), 1);
    }

    #[test]
    fn test_stop_flag_ends_loop_before_processing() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("attendance.csv"));

        let (source, engine) = feed(vec![vec![vec![0.1, 0.0]]]);
        let mut pipeline = Pipeline::new(
            source,
            engine,
            CaptureSink::default(),
            NearestMatcher::default(),
            test_gallery(),
            PresenceTracker::new(),
            ledger,
        );
        let stop = AtomicBool::new(true);
        pipeline.run(&stop).unwrap();

        assert!(pipeline.sink.frames.is_empty());
        assert!(pipeline.ledger.records().unwrap().is_empty());
    }

    #[test]
    fn test_source_failure_is_fatal() {
        struct FailingSource;
        impl FrameSource for FailingSource {
            fn next_frame(
                &mut self,
            ) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>> {
                Err("camera disconnected".into())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("attendance.csv"));
        let (_, engine) = feed(vec![]);
        let mut pipeline = Pipeline::new(
            FailingSource,
            engine,
            CaptureSink::default(),
            NearestMatcher::default(),
            test_gallery(),
            PresenceTracker::new(),
            ledger,
        );
        assert!(matches!(
            pipeline.run(&AtomicBool::new(false)),
            Err(PipelineError::Source(_))
        ));
    }
}
