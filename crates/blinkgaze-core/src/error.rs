use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("landmark source error: {0}")]
    Landmarks(String),
    #[error("landmark set has {got} points, scheme needs at least {needed}")]
    IncompleteLandmarks { needed: usize, got: usize },
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a positive finite number (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} is out of range (got {value})")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("landmark scheme repeats index {0} within one eye")]
    DuplicateIndex(usize),
}
