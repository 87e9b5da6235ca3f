//! Per-frame geometric features: eye aspect ratio and gaze offset ratio.
//!
//! Both features are pure functions of one landmark set. Degenerate geometry
//! (coincident eye corners, eyes vertically stacked) yields `0.0` or `None`
//! instead of a division fault.

use serde::{Deserialize, Serialize};

use crate::error::MetricsError;
use crate::landmarks::{LandmarkScheme, LandmarkSet, Point};

/// Coordinate space in which EAR distances are measured.
///
/// `Normalized` is scale-invariant. `Pixel` scales x by the frame width and y
/// by the frame height first, which changes the ratio for non-square frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSpace {
    #[default]
    Normalized,
    Pixel,
}

/// Features extracted from a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameFeatures {
    pub left_ear: f32,
    pub right_ear: f32,
    /// Mean of both eyes, the signal fed to the blink detector.
    pub ear: f32,
    /// `None` when the eye centers share an x coordinate.
    pub gaze_offset: Option<f32>,
}

fn scaled(point: &Point, width: u32, height: u32, space: DistanceSpace) -> Point {
    match space {
        DistanceSpace::Normalized => *point,
        DistanceSpace::Pixel => Point::new(point.x * width as f32, point.y * height as f32),
    }
}

/// `EAR = (|p2-p6| + |p3-p5|) / (2 * |p1-p4|)` for one eye.
///
/// Returns `0.0` when p1 and p4 coincide. Callers must have checked the set
/// against the scheme; missing indices also yield `0.0`.
pub fn eye_aspect_ratio(
    landmarks: &LandmarkSet,
    eye: &[usize; 6],
    width: u32,
    height: u32,
    space: DistanceSpace,
) -> f32 {
    let mut p = [Point::default(); 6];
    for (slot, &idx) in p.iter_mut().zip(eye.iter()) {
        match landmarks.get(idx) {
            Some(point) => *slot = scaled(point, width, height, space),
            None => return 0.0,
        }
    }

    let horizontal = p[0].distance(&p[3]);
    if horizontal == 0.0 {
        return 0.0;
    }
    let vertical = p[1].distance(&p[5]) + p[2].distance(&p[4]);
    vertical / (2.0 * horizontal)
}

/// Horizontal nose-tip position relative to the eye-to-eye span.
///
/// Each eye center is the midpoint of its two corners (p1, p4). Roughly 0.5
/// when facing the camera; drifts toward 0 or 1 as the head turns.
pub fn gaze_offset_ratio(landmarks: &LandmarkSet, scheme: &LandmarkScheme) -> Option<f32> {
    let left = eye_center(landmarks, &scheme.left_eye)?;
    let right = eye_center(landmarks, &scheme.right_eye)?;
    let nose = landmarks.get(scheme.nose_tip)?;

    let span = right.x - left.x;
    if span == 0.0 {
        return None;
    }
    Some((nose.x - left.x) / span)
}

fn eye_center(landmarks: &LandmarkSet, eye: &[usize; 6]) -> Option<Point> {
    let outer = landmarks.get(eye[0])?;
    let inner = landmarks.get(eye[3])?;
    Some(outer.midpoint(inner))
}

/// Compute all per-frame features for one landmark set.
pub fn extract(
    landmarks: &LandmarkSet,
    width: u32,
    height: u32,
    scheme: &LandmarkScheme,
    space: DistanceSpace,
) -> Result<FrameFeatures, MetricsError> {
    scheme.check(landmarks)?;

    let left_ear = eye_aspect_ratio(landmarks, &scheme.left_eye, width, height, space);
    let right_ear = eye_aspect_ratio(landmarks, &scheme.right_eye, width, height, space);

    Ok(FrameFeatures {
        left_ear,
        right_ear,
        ear: (left_ear + right_ear) / 2.0,
        gaze_offset: gaze_offset_ratio(landmarks, scheme),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Compact scheme used across the crate's tests: left eye 0..6,
    /// right eye 6..12, nose tip 12.
    pub(crate) fn compact_scheme() -> LandmarkScheme {
        LandmarkScheme {
            left_eye: [0, 1, 2, 3, 4, 5],
            right_eye: [6, 7, 8, 9, 10, 11],
            nose_tip: 12,
        }
    }

    /// One eye centred at `cx`, 0.1 wide, lids `half_open` above and below.
    fn eye(cx: f32, half_open: f32) -> [Point; 6] {
        [
            Point::new(cx - 0.05, 0.4),
            Point::new(cx - 0.02, 0.4 - half_open),
            Point::new(cx + 0.02, 0.4 - half_open),
            Point::new(cx + 0.05, 0.4),
            Point::new(cx + 0.02, 0.4 + half_open),
            Point::new(cx - 0.02, 0.4 + half_open),
        ]
    }

    /// Build a compact-scheme face whose average EAR is exactly `ear` and
    /// whose gaze offset ratio is `gaze` (0.5 = nose midway between eyes).
    pub(crate) fn face(ear: f32, gaze: f32) -> LandmarkSet {
        // Each eye: horizontal = 0.1, vertical = 2 * (2 * half_open).
        // EAR = 4 * half_open / 0.2 = 20 * half_open.
        let half_open = ear / 20.0;
        let mut points = Vec::with_capacity(13);
        points.extend_from_slice(&eye(0.3, half_open));
        points.extend_from_slice(&eye(0.7, half_open));
        points.push(Point::new(0.3 + gaze * 0.4, 0.6));
        LandmarkSet::new(points)
    }

    #[test]
    fn test_ear_open_eye() {
        let set = face(0.30, 0.5);
        let ear = eye_aspect_ratio(&set, &[0, 1, 2, 3, 4, 5], 640, 480, DistanceSpace::Normalized);
        assert!((ear - 0.30).abs() < 1e-5);
    }

    #[test]
    fn test_ear_zero_horizontal_distance() {
        // p1 == p4: the ratio is undefined and must come back as 0.0.
        let p = Point::new(0.5, 0.5);
        let set = LandmarkSet::new(vec![
            p,
            Point::new(0.5, 0.4),
            Point::new(0.5, 0.4),
            p,
            Point::new(0.5, 0.6),
            Point::new(0.5, 0.6),
        ]);
        let ear = eye_aspect_ratio(&set, &[0, 1, 2, 3, 4, 5], 640, 480, DistanceSpace::Normalized);
        assert_eq!(ear, 0.0);
        let ear = eye_aspect_ratio(&set, &[0, 1, 2, 3, 4, 5], 640, 480, DistanceSpace::Pixel);
        assert_eq!(ear, 0.0);
    }

    #[test]
    fn test_ear_pixel_space_square_frame_matches_normalized() {
        let set = face(0.27, 0.5);
        let n = eye_aspect_ratio(&set, &[0, 1, 2, 3, 4, 5], 500, 500, DistanceSpace::Normalized);
        let p = eye_aspect_ratio(&set, &[0, 1, 2, 3, 4, 5], 500, 500, DistanceSpace::Pixel);
        assert!((n - p).abs() < 1e-5);
    }

    #[test]
    fn test_ear_pixel_space_wide_frame_shrinks_ratio() {
        // Horizontal distances grow with width, vertical with height.
        let set = face(0.30, 0.5);
        let p = eye_aspect_ratio(&set, &[0, 1, 2, 3, 4, 5], 640, 320, DistanceSpace::Pixel);
        assert!(p < 0.30);
    }

    #[test]
    fn test_gaze_offset_centered() {
        let set = face(0.3, 0.5);
        let gaze = gaze_offset_ratio(&set, &compact_scheme()).unwrap();
        assert!((gaze - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_gaze_offset_undefined_when_eyes_share_x() {
        let mut set = face(0.3, 0.5);
        // Collapse both eyes onto the same center x.
        for i in 6..12 {
            set.points[i].x = set.points[i - 6].x;
        }
        assert_eq!(gaze_offset_ratio(&set, &compact_scheme()), None);
    }

    #[test]
    fn test_extract_averages_eyes() {
        let mut set = face(0.30, 0.25);
        // Close the right eye completely.
        for i in [7, 8, 10, 11] {
            set.points[i].y = 0.4;
        }
        let f = extract(&set, 640, 480, &compact_scheme(), DistanceSpace::Normalized).unwrap();
        assert!((f.left_ear - 0.30).abs() < 1e-5);
        assert!(f.right_ear.abs() < 1e-6);
        assert!((f.ear - 0.15).abs() < 1e-5);
        assert!((f.gaze_offset.unwrap() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_extract_rejects_incomplete_set() {
        let set = LandmarkSet::new(vec![Point::default(); 5]);
        let err = extract(&set, 640, 480, &compact_scheme(), DistanceSpace::Normalized).unwrap_err();
        assert!(matches!(err, MetricsError::IncompleteLandmarks { needed: 13, got: 5 }));
    }
}
