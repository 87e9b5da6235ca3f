use std::time::Instant;

use crate::engine::MetricsEngine;
use crate::error::MetricsError;
use crate::landmarks::{Frame, LandmarkSource};
use crate::record::MetricsRecord;

/// Frame orchestrator: landmark detection followed by one engine step.
///
/// Processing is synchronous; each frame completes before the next call.
pub struct FramePipeline<S> {
    source: S,
    engine: MetricsEngine,
}

impl<S: LandmarkSource> FramePipeline<S> {
    pub fn new(source: S, engine: MetricsEngine) -> Self {
        Self { source, engine }
    }

    /// Process one frame, stamping it with the current monotonic time.
    pub fn process(&mut self, frame: &Frame, fps: f64) -> Result<MetricsRecord, MetricsError> {
        self.process_at(frame, fps, Instant::now())
    }

    pub fn process_at(
        &mut self,
        frame: &Frame,
        fps: f64,
        now: Instant,
    ) -> Result<MetricsRecord, MetricsError> {
        let detection = self.source.detect(frame)?;
        self.engine
            .observe(detection.as_ref(), frame.width, frame.height, fps, now)
    }

    pub fn engine(&self) -> &MetricsEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::features::tests::{compact_scheme, face};
    use crate::landmarks::LandmarkSet;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Replays a fixed script of detection outcomes, one per frame.
    struct Scripted(VecDeque<Result<Option<LandmarkSet>, MetricsError>>);

    impl LandmarkSource for Scripted {
        fn detect(&mut self, _frame: &Frame) -> Result<Option<LandmarkSet>, MetricsError> {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    fn pipeline(script: Vec<Result<Option<LandmarkSet>, MetricsError>>) -> FramePipeline<Scripted> {
        let config = EngineConfig {
            scheme: compact_scheme(),
            ..EngineConfig::default()
        };
        FramePipeline::new(
            Scripted(script.into()),
            MetricsEngine::new(config).unwrap(),
        )
    }

    fn frame() -> Frame {
        Frame::from_rgb8(4, 4, vec![0; 48]).unwrap()
    }

    #[test]
    fn test_ear_sequence_counts_one_blink() {
        let script = [0.30, 0.20, 0.20, 0.30, 0.30]
            .into_iter()
            .map(|ear| Ok(Some(face(ear, 0.5))))
            .collect();
        let mut p = pipeline(script);
        let t0 = Instant::now();
        let rates: Vec<u32> = (0..5)
            .map(|i| {
                p.process_at(&frame(), 10.0, t0 + Duration::from_millis(i * 100))
                    .unwrap()
                    .blink_rate
            })
            .collect();
        assert_eq!(rates, vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_source_error_propagates_without_state_change() {
        let mut p = pipeline(vec![
            Ok(Some(face(0.3, 0.5))),
            Err(MetricsError::Landmarks("model exploded".into())),
            Ok(Some(face(0.3, 0.5))),
        ]);
        p.process(&frame(), 10.0).unwrap();
        let err = p.process(&frame(), 10.0).unwrap_err();
        assert!(err.to_string().contains("model exploded"));
        assert_eq!(p.engine().face_streak(), 1);

        let r = p.process(&frame(), 10.0).unwrap();
        assert_eq!(p.engine().face_streak(), 2);
        assert!((r.gaze_duration - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_no_face_frames_report_absent() {
        let mut p = pipeline(Vec::new());
        for _ in 0..10 {
            let r = p.process(&frame(), 10.0).unwrap();
            assert!(!r.face_detected);
            assert_eq!(r.gaze_duration, 0.0);
            assert_eq!(r.blink_rate, 0);
        }
        assert_eq!(p.engine().frames_observed(), 10);
    }
}
