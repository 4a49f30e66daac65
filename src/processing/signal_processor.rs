use crate::processing::detectors::DetectorInstance;
use crate::processing::scheduler::{FireOutcome, ToneScheduler};
use crate::hardware::Sample;
use crate::session::{PhaseCell, TrialPhase};
use crate::utils::log::log_to_file;
use std::sync::Arc;
use std::time::{Duration, Instant};

// SIGNAL PROCESSOR COMPONENT --------------------------------------------------

const LOG_FILE: &str = "heartsync.log";

pub struct SignalProcessorConfig {
    /// Settling time after acquisition start before peaks are acted on.
    pub warm_up: Duration,
    /// Per-sample and per-event file logging. Off in timing-critical runs.
    pub debug_logging: bool,
}

/// Per-sample pipeline for one trial: detector in front, scheduler behind,
/// phase transitions in between. Runs entirely inside the hardware feed's
/// callback; the session thread only touches the shared phase cell and the
/// scheduler handle.
pub struct SignalProcessor {
    pub index: usize,
    config: SignalProcessorConfig,
    detector: Box<dyn DetectorInstance>,
    scheduler: ToneScheduler,
    phase: Arc<PhaseCell>,
    acquisition_started_at: Option<Instant>,
}

impl SignalProcessor {
    pub fn new(
        config: SignalProcessorConfig,
        detector: Box<dyn DetectorInstance>,
        scheduler: ToneScheduler,
        phase: Arc<PhaseCell>,
    ) -> Self {
        Self {
            index: 0,
            config,
            detector,
            scheduler,
            phase,
            acquisition_started_at: None,
        }
    }

    pub fn process_sample(&mut self, sample: Sample) {
        self.index += 1;

        match self.phase.load() {
            TrialPhase::Idle | TrialPhase::Complete => return,
            TrialPhase::Acquiring => {
                let started_at = *self.acquisition_started_at.get_or_insert(sample.at);
                if sample.at.saturating_duration_since(started_at) < self.config.warm_up {
                    return;
                }
                // Warm-up elapsed: arm on a clean slate.
                self.detector.reset();
                self.phase.store(TrialPhase::Armed);
                if self.config.debug_logging {
                    let _ = log_to_file(LOG_FILE, "warm-up complete, trial armed");
                }
            }
            TrialPhase::Armed => {}
        }

        if let Some(peak) = self.detector.on_sample(sample) {
            let outcome = self.scheduler.on_peak(&peak);
            if self.config.debug_logging {
                let _ = log_to_file(
                    LOG_FILE,
                    &format!(
                        "index: {}, peak amplitude: {:.4}, outcome: {:?}",
                        self.index, peak.amplitude, outcome
                    ),
                );
            }
            match outcome {
                FireOutcome::Fired { .. } | FireOutcome::QuotaExhausted => {
                    if self.scheduler.quota_met() {
                        self.phase.store(TrialPhase::Complete);
                    }
                }
                FireOutcome::TooSoon => {}
                FireOutcome::Cancelled => self.phase.store(TrialPhase::Complete),
            }
        } else if self.config.debug_logging {
            let _ = log_to_file(
                LOG_FILE,
                &format!("index: {}, sample: {:.4}", self.index, sample.value),
            );
        }
    }
}
