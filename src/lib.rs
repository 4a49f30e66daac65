//! Real-time cardiac-cycle-locked auditory stimulation.
//!
//! The crate watches a streaming ECG signal, detects each R-wave with a
//! zero-look-ahead threshold-and-slope-reversal test, and fires a short tone
//! at a configured delay after the detected beat, for a bounded number of
//! tones per trial. Experiment glue (instructions, responses, persistence)
//! lives outside; it drives [`session::TrialSession`] once per trial and
//! consumes the returned [`report::TrialReport`].

pub mod audio;
pub mod config;
pub mod errors;
pub mod hardware;
pub mod processing;
pub mod report;
pub mod session;
pub mod utils;

pub use config::Config;
pub use errors::CoreError;
pub use report::{FireRecord, TrialReport};
pub use session::{TrialPhase, TrialSession};
