//! Landmark data model and the landmark source contract.
//!
//! Landmarks arrive in normalized image coordinates (0.0..=1.0 on both axes)
//! from an external detector. The engine never retains a [`LandmarkSet`]
//! beyond the frame it belongs to.

use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// MediaPipe face-mesh indices for the six EAR points of the left eye,
/// ordered p1..p6 (outer corner, upper lid x2, inner corner, lower lid x2).
pub const MEDIAPIPE_LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
/// Right eye counterpart of [`MEDIAPIPE_LEFT_EYE`].
pub const MEDIAPIPE_RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];
/// MediaPipe face-mesh nose tip.
pub const MEDIAPIPE_NOSE_TIP: usize = 1;

/// A single landmark in normalized image coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// All landmarks detected for one face in one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    pub points: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }
}

/// Which landmark indices carry the eye and nose-tip anatomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkScheme {
    pub left_eye: [usize; 6],
    pub right_eye: [usize; 6],
    pub nose_tip: usize,
}

impl Default for LandmarkScheme {
    fn default() -> Self {
        Self {
            left_eye: MEDIAPIPE_LEFT_EYE,
            right_eye: MEDIAPIPE_RIGHT_EYE,
            nose_tip: MEDIAPIPE_NOSE_TIP,
        }
    }
}

impl LandmarkScheme {
    /// Minimum number of points a [`LandmarkSet`] must carry for this scheme.
    pub fn required_points(&self) -> usize {
        self.left_eye
            .iter()
            .chain(self.right_eye.iter())
            .copied()
            .chain(std::iter::once(self.nose_tip))
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Fail unless `landmarks` covers every index the scheme uses.
    pub fn check(&self, landmarks: &LandmarkSet) -> Result<(), MetricsError> {
        let needed = self.required_points();
        if landmarks.len() < needed {
            return Err(MetricsError::IncompleteLandmarks {
                needed,
                got: landmarks.len(),
            });
        }
        Ok(())
    }
}

/// A decoded video frame, packed RGB8, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Wrap packed RGB8 pixels, checking the buffer matches the dimensions.
    pub fn from_rgb8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, MetricsError> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(MetricsError::InvalidFrame(format!(
                "{width}x{height} RGB8 needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }
}

/// Produces facial landmarks for a frame.
///
/// Implementations return `Ok(None)` when no face is visible. When several
/// faces are visible only the first is reported; this is not a multi-subject
/// tracker.
pub trait LandmarkSource {
    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkSet>, MetricsError>;
}

impl<S: LandmarkSource + ?Sized> LandmarkSource for Box<S> {
    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkSet>, MetricsError> {
        (**self).detect(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scheme_requires_mediapipe_mesh() {
        let scheme = LandmarkScheme::default();
        // Highest index used is 387 (right eye upper lid).
        assert_eq!(scheme.required_points(), 388);
    }

    #[test]
    fn test_check_rejects_short_set() {
        let scheme = LandmarkScheme::default();
        let set = LandmarkSet::new(vec![Point::default(); 100]);
        let err = scheme.check(&set).unwrap_err();
        assert!(matches!(
            err,
            MetricsError::IncompleteLandmarks {
                needed: 388,
                got: 100
            }
        ));
    }

    #[test]
    fn test_compact_scheme() {
        let scheme = LandmarkScheme {
            left_eye: [0, 1, 2, 3, 4, 5],
            right_eye: [6, 7, 8, 9, 10, 11],
            nose_tip: 12,
        };
        assert_eq!(scheme.required_points(), 13);
        let set = LandmarkSet::new(vec![Point::default(); 13]);
        assert!(scheme.check(&set).is_ok());
    }

    #[test]
    fn test_frame_size_mismatch() {
        assert!(Frame::from_rgb8(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            Frame::from_rgb8(2, 2, vec![0; 11]),
            Err(MetricsError::InvalidFrame(_))
        ));
        assert!(Frame::from_rgb8(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn test_point_geometry() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert_eq!(a.midpoint(&b), Point::new(1.5, 2.0));
    }
}
