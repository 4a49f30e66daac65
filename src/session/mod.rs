use crate::audio::AudioSink;
use crate::config::Config;
use crate::errors::CoreError;
use crate::hardware::{AcquisitionSource, ConnectionMode};
use crate::processing::detectors::r_peak::RPeakDetector;
use crate::processing::scheduler::{SchedulerHandle, ToneScheduler};
use crate::processing::signal_processor::SignalProcessor;
use crate::report::TrialReport;
use crate::utils::log::log_to_file;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// TRIAL SESSION ---------------------------------------------------------------

const LOG_FILE: &str = "heartsync.log";
const COMPLETION_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Trial lifecycle. ACQUIRING becomes ARMED only after the warm-up period;
/// COMPLETE is reached exactly once per trial, on quota or on abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrialPhase {
    Idle = 0,
    Acquiring = 1,
    Armed = 2,
    Complete = 3,
}

/// Lock-free phase cell shared between the sample callback and the session
/// thread. The callback may be blocked in a tone wait, so phase reads must
/// not contend on the processor lock.
pub struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub fn new(phase: TrialPhase) -> Self {
        Self(AtomicU8::new(phase as u8))
    }

    pub fn load(&self) -> TrialPhase {
        match self.0.load(Ordering::SeqCst) {
            1 => TrialPhase::Acquiring,
            2 => TrialPhase::Armed,
            3 => TrialPhase::Complete,
            _ => TrialPhase::Idle,
        }
    }

    pub fn store(&self, phase: TrialPhase) {
        self.0.store(phase as u8, Ordering::SeqCst);
    }
}

struct ActiveTrial {
    phase: Arc<PhaseCell>,
    scheduler: SchedulerHandle,
    tone_quota: usize,
}

/// Orchestrates one trial at a time over the injected hardware and audio
/// capabilities: handshake, acquisition toggling, callback wiring, and the
/// report handed back at trial end.
pub struct TrialSession<H: AcquisitionSource> {
    hardware: H,
    audio: Arc<Mutex<dyn AudioSink>>,
    config: Config,
    connected: bool,
    active: Option<ActiveTrial>,
}

impl<H: AcquisitionSource> TrialSession<H> {
    pub fn new(hardware: H, audio: Arc<Mutex<dyn AudioSink>>, config: Config) -> Self {
        Self {
            hardware,
            audio,
            config,
            connected: false,
            active: None,
        }
    }

    /// Device handshake, once per session: connect, force single-channel
    /// delivery (one correction attempt, then re-verify), check that at
    /// least one channel is enabled. All failures here are fatal and happen
    /// before any trial data exists.
    pub fn connect(&mut self) -> Result<(), CoreError> {
        self.hardware.connect()?;

        if self.hardware.connection_mode() != ConnectionMode::Single {
            self.hardware.set_connection_mode(ConnectionMode::Single)?;
            let corrected = self.hardware.connection_mode();
            if corrected != ConnectionMode::Single {
                return Err(CoreError::ConnectionModeMismatch {
                    expected: ConnectionMode::Single,
                    actual: corrected,
                });
            }
        }

        let channels = self.hardware.enabled_channels();
        if channels.is_empty() {
            return Err(CoreError::HardwareUnavailable(
                "no enabled channels".to_string(),
            ));
        }
        if self.config.session.debug_logging {
            let _ = log_to_file(LOG_FILE, &format!("enabled channels: {:?}", channels));
        }

        self.connected = true;
        Ok(())
    }

    /// Starts acquisition and arms the detection pipeline for one trial.
    /// A second start without an intervening finish is a usage error.
    pub fn start_trial(&mut self) -> Result<(), CoreError> {
        if !self.connected {
            return Err(CoreError::HardwareUnavailable(
                "connect() must succeed before starting a trial".to_string(),
            ));
        }
        if self.active.is_some() || self.hardware.is_acquiring() {
            return Err(CoreError::DoubleStart);
        }
        self.config.validate()?;

        let epoch = Instant::now();
        let phase = Arc::new(PhaseCell::new(TrialPhase::Acquiring));
        let scheduler =
            ToneScheduler::new(self.config.scheduler_config(), Arc::clone(&self.audio), epoch);
        let handle = scheduler.handle();
        let detector = Box::new(RPeakDetector::new(self.config.detector_config()));
        let processor = Arc::new(Mutex::new(SignalProcessor::new(
            self.config.processor_config(),
            detector,
            scheduler,
            Arc::clone(&phase),
        )));

        let callback_processor = Arc::clone(&processor);
        self.hardware
            .register_sample_callback(Box::new(move |sample| {
                callback_processor.lock().unwrap().process_sample(sample);
            }));

        self.hardware.start()?;
        self.hardware.toggle_acquisition()?;

        self.active = Some(ActiveTrial {
            phase,
            scheduler: handle,
            tone_quota: self.config.scheduler.tone_count,
        });
        Ok(())
    }

    pub fn phase(&self) -> TrialPhase {
        self.active
            .as_ref()
            .map(|trial| trial.phase.load())
            .unwrap_or(TrialPhase::Idle)
    }

    pub fn tones_fired(&self) -> usize {
        self.active
            .as_ref()
            .map(|trial| trial.scheduler.tones_fired())
            .unwrap_or(0)
    }

    /// Blocks the calling (UI) thread until the trial completes or the
    /// timeout expires. Returns whether completion was reached.
    pub fn wait_for_completion(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.phase() == TrialPhase::Complete {
                return true;
            }
            thread::sleep(COMPLETION_POLL_INTERVAL);
        }
        self.phase() == TrialPhase::Complete
    }

    /// External stop: interrupts any scheduled-but-unfired tone so nothing
    /// sounds after this call returns.
    pub fn abort_trial(&mut self) {
        if let Some(trial) = &self.active {
            trial.scheduler.cancel();
            trial.phase.store(TrialPhase::Complete);
        }
    }

    /// Tears the trial down (acquisition off exactly once) and returns the
    /// achieved tone count and timing log.
    pub fn finish_trial(&mut self) -> Result<TrialReport, CoreError> {
        let trial = self.active.take().ok_or(CoreError::NotStarted)?;

        // Cancel before touching the hardware: a pending tone must not fire
        // while acquisition is being torn down.
        trial.scheduler.cancel();
        trial.phase.store(TrialPhase::Complete);

        if self.hardware.is_acquiring() {
            self.hardware.toggle_acquisition()?;
        }
        self.hardware.stop()?;
        trial.phase.store(TrialPhase::Idle);

        let counters = trial.scheduler.take_counters();
        let report = TrialReport {
            tone_quota: trial.tone_quota,
            tones_fired: counters.tones_fired,
            peaks_seen: counters.peaks_seen,
            records: counters.records,
        };
        if self.config.session.debug_logging {
            let _ = log_to_file(
                LOG_FILE,
                &format!(
                    "trial finished: {}/{} tones, {} peaks, {} late",
                    report.tones_fired,
                    report.tone_quota,
                    report.peaks_seen,
                    report.late_count()
                ),
            );
        }
        Ok(report)
    }
}
