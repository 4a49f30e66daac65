use super::{DetectorInstance, PeakEvent};
use crate::processing::buffer::SampleBuffer;
use crate::hardware::Sample;
use std::time::{Duration, Instant};

/// Samples needed for the slope-reversal test.
const SLOPE_WINDOW: usize = 3;

pub struct RPeakDetectorConfig {
    /// Fixed amplitude threshold. No adaptive thresholding: any estimation
    /// window would add latency that skews the R-to-tone interval.
    pub threshold: f64,
    /// Minimum time between accepted peaks. Independent of buffer capacity,
    /// tuned to the physiological inter-beat floor (roughly 400-600 ms).
    pub refractory_interval: Duration,
    pub buffer_capacity: usize,
}

/// Zero-look-ahead R-wave detector.
///
/// A peak is declared when the newest of the last three amplitudes exceeds
/// the threshold and the slope was rising over the first interval and
/// non-rising over the second, i.e. a local maximum above threshold. The
/// test is O(1) per sample with no spectral filtering, trading robustness
/// for minimal latency.
///
/// On acceptance the rolling buffer is cleared, so the slope window must
/// re-accumulate before the next candidate; adjacent samples re-crossing
/// the reversal test inside the refractory interval are suppressed as
/// duplicates of the same beat.
pub struct RPeakDetector {
    config: RPeakDetectorConfig,
    buffer: SampleBuffer,
    last_accepted_at: Option<Instant>,
}

impl RPeakDetector {
    pub fn new(config: RPeakDetectorConfig) -> Self {
        let capacity = config.buffer_capacity.max(SLOPE_WINDOW);
        Self {
            config,
            buffer: SampleBuffer::new(capacity),
            last_accepted_at: None,
        }
    }

    fn in_refractory(&self, at: Instant) -> bool {
        self.last_accepted_at.map_or(false, |last| {
            at.saturating_duration_since(last) < self.config.refractory_interval
        })
    }
}

impl DetectorInstance for RPeakDetector {
    fn on_sample(&mut self, sample: Sample) -> Option<PeakEvent> {
        self.buffer.push(sample);

        let window = self.buffer.latest(SLOPE_WINDOW);
        if window.len() < SLOPE_WINDOW {
            return None;
        }
        let (oldest, middle, newest) = (window[0], window[1], window[2]);

        // The newest (falling) sample must still be above threshold, which
        // keeps detection exactly one sample behind the true maximum.
        if newest.value <= self.config.threshold {
            return None;
        }

        let was_rising = middle.value - oldest.value > 0.0;
        let now_falling = newest.value - middle.value <= 0.0;
        if !(was_rising && now_falling) {
            return None;
        }

        if self.in_refractory(newest.at) {
            return None;
        }

        let inter_beat_interval = self
            .last_accepted_at
            .map(|last| newest.at.saturating_duration_since(last));
        self.last_accepted_at = Some(newest.at);
        self.buffer.clear();

        Some(PeakEvent {
            detected_at: newest.at,
            amplitude: middle.value,
            inter_beat_interval,
        })
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.last_accepted_at = None;
    }

    fn name(&self) -> &str {
        "r_peak"
    }
}
