pub mod r_peak;

use crate::hardware::Sample;
use std::time::{Duration, Instant};

// DETECTOR COMPONENT ----------------------------------------------------------

/// One accepted heartbeat.
#[derive(Debug, Clone, Copy)]
pub struct PeakEvent {
    /// Monotonic timestamp of the sample that confirmed the peak.
    pub detected_at: Instant,
    /// Amplitude of the local maximum.
    pub amplitude: f64,
    /// Time since the previous accepted peak, if any.
    pub inter_beat_interval: Option<Duration>,
}

pub trait DetectorInstance: Send {
    /// Invoked once per incoming sample, on the feed's delivery cadence.
    /// Returns an event only when a genuine peak is accepted.
    fn on_sample(&mut self, sample: Sample) -> Option<PeakEvent>;

    /// Discards all rolling state at trial start.
    fn reset(&mut self);

    fn name(&self) -> &str;
}
