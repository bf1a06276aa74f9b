// Chart domain errors
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// Upstream JSON could not be parsed or lacks a series
    #[error("malformed chart payload: {0}")]
    MalformedPayload(String),

    #[error("invalid frequency {0} Hz, must be finite and greater than zero")]
    InvalidFrequency(f64),

    /// Degree is not one of the sampled positions
    #[error("degree {0} is not a sampled position")]
    UnknownDegree(f64),

    #[error("cycle index {0} is invalid, cycles are 1-based")]
    InvalidCycle(u32),
}
