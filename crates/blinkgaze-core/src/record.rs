use serde::{Serialize, Serializer};

/// Metrics emitted once per processed frame.
///
/// Serializes to the line protocol shape:
/// `{"gaze_duration": 1.2, "blink_count": 14, "face_detected": true, "studying": true}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsRecord {
    /// Seconds of fixation, rounded to one decimal place on the wire.
    #[serde(serialize_with = "one_decimal")]
    pub gaze_duration: f64,
    /// Blinks per minute.
    #[serde(rename = "blink_count")]
    pub blink_rate: u32,
    pub face_detected: bool,
    pub studying: bool,
}

fn one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let record = MetricsRecord {
            gaze_duration: 1.2345,
            blink_rate: 14,
            face_detected: true,
            studying: true,
        };
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "gaze_duration": 1.2,
                "blink_count": 14,
                "face_detected": true,
                "studying": true
            })
        );
    }

    #[test]
    fn test_rounds_half_up() {
        let record = MetricsRecord {
            gaze_duration: 0.25,
            blink_rate: 0,
            face_detected: false,
            studying: false,
        };
        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(
            line,
            r#"{"gaze_duration":0.3,"blink_count":0,"face_detected":false,"studying":false}"#
        );
    }
}
