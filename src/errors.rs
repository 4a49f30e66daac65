use crate::hardware::ConnectionMode;
use std::error::Error;
use std::fmt;

/// Error taxonomy for the real-time core.
///
/// Scheduling overruns and quota-exhausted peaks are deliberately absent:
/// a late tone fires immediately and is flagged on its `FireRecord`, and a
/// peak arriving after the quota is met is expected steady-state, not a
/// fault. Everything here is either fatal at trial start or a usage error
/// the caller must see.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// No acquisition device reachable at trial start. Fatal to the run.
    HardwareUnavailable(String),
    /// The device is not in the required connection mode and the one
    /// permitted auto-correction did not stick. Fatal.
    ConnectionModeMismatch {
        expected: ConnectionMode,
        actual: ConnectionMode,
    },
    /// Acquisition start requested while a trial is already acquiring.
    DoubleStart,
    /// No trial is active for the requested operation.
    NotStarted,
    /// Configuration surface violation (including load/parse failures).
    InvalidConfig(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::HardwareUnavailable(detail) => {
                write!(f, "no acquisition hardware available: {}", detail)
            }
            CoreError::ConnectionModeMismatch { expected, actual } => write!(
                f,
                "connection mode mismatch: expected {:?}, device reports {:?}",
                expected, actual
            ),
            CoreError::DoubleStart => {
                write!(f, "acquisition already in progress, refusing second start")
            }
            CoreError::NotStarted => write!(f, "no active trial"),
            CoreError::InvalidConfig(detail) => write!(f, "invalid configuration: {}", detail),
        }
    }
}

impl Error for CoreError {}
