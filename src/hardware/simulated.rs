use super::{AcquisitionSource, ConnectionMode, Sample, SampleCallback};
use crate::errors::CoreError;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// -----------------------------------------------------------------------------
// SIMULATED ECG FEED
// -----------------------------------------------------------------------------

const BASELINE_DRIFT_FREQ: f64 = 0.5;
const BASELINE_DRIFT_AMPLITUDE: f64 = 0.03;

/// Normalized R-wave profile. The shoulder after the maximum stays above
/// typical detection thresholds so the falling sample still crosses them,
/// matching how a real R-wave decays over a few samples at 250 Hz.
const R_WAVE_PROFILE: [f64; 7] = [0.3, 0.7, 0.95, 1.0, 0.9, 0.5, 0.2];

#[derive(Debug, Clone)]
pub struct SimulatedEcgConfig {
    pub sample_rate_hz: f64,
    /// Interval between simulated heartbeats.
    pub beat_interval: Duration,
    pub r_wave_amplitude: f64,
    pub noise_amplitude: f64,
    /// Mode the simulated server reports before any correction.
    pub initial_mode: ConnectionMode,
}

impl Default for SimulatedEcgConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 250.0,
            beat_interval: Duration::from_millis(800),
            r_wave_amplitude: 1.0,
            noise_amplitude: 0.02,
            initial_mode: ConnectionMode::Single,
        }
    }
}

/// In-process ECG source: baseline sinusoidal drift plus noise, with an
/// R-wave spike injected once per beat interval. Implements the same
/// capability surface as a real acquisition server, so sessions and tests
/// run against it unchanged.
pub struct SimulatedEcg {
    config: SimulatedEcgConfig,
    mode: ConnectionMode,
    connected: bool,
    callback: Arc<Mutex<Option<SampleCallback>>>,
    acquiring: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedEcg {
    pub fn new(config: SimulatedEcgConfig) -> Self {
        let mode = config.initial_mode;
        Self {
            config,
            mode,
            connected: false,
            callback: Arc::new(Mutex::new(None)),
            acquiring: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn spawn_worker(&mut self) {
        let callback = Arc::clone(&self.callback);
        let acquiring = Arc::clone(&self.acquiring);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();

        running.store(true, Ordering::SeqCst);
        self.worker = Some(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            let period = Duration::from_secs_f64(1.0 / config.sample_rate_hz);
            let samples_per_beat =
                (config.sample_rate_hz * config.beat_interval.as_secs_f64()).round() as usize;
            let samples_per_beat = samples_per_beat.max(R_WAVE_PROFILE.len());
            let mut index: usize = 0;
            let mut time = 0.0_f64;

            while running.load(Ordering::SeqCst) {
                if acquiring.load(Ordering::SeqCst) {
                    let noise = rng.gen_range(-config.noise_amplitude..=config.noise_amplitude);
                    let drift =
                        BASELINE_DRIFT_AMPLITUDE * (BASELINE_DRIFT_FREQ * time).sin();
                    let beat_phase = index % samples_per_beat;
                    let spike = if beat_phase < R_WAVE_PROFILE.len() {
                        config.r_wave_amplitude * R_WAVE_PROFILE[beat_phase]
                    } else {
                        0.0
                    };
                    let value = spike + drift + noise;

                    let mut locked_callback = callback.lock().unwrap();
                    if let Some(deliver) = locked_callback.as_mut() {
                        deliver(Sample::new(value, Instant::now()));
                    }

                    index += 1;
                    time += period.as_secs_f64();
                }
                thread::sleep(period);
            }
        }));
    }
}

impl AcquisitionSource for SimulatedEcg {
    fn connect(&mut self) -> Result<(), CoreError> {
        self.connected = true;
        Ok(())
    }

    fn connection_mode(&self) -> ConnectionMode {
        self.mode
    }

    fn set_connection_mode(&mut self, mode: ConnectionMode) -> Result<(), CoreError> {
        self.mode = mode;
        Ok(())
    }

    fn enabled_channels(&self) -> Vec<String> {
        vec!["ecg".to_string()]
    }

    fn start(&mut self) -> Result<(), CoreError> {
        if !self.connected {
            return Err(CoreError::HardwareUnavailable(
                "simulated server not connected".to_string(),
            ));
        }
        if self.worker.is_none() {
            self.spawn_worker();
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CoreError> {
        self.running.store(false, Ordering::SeqCst);
        self.acquiring.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        Ok(())
    }

    fn register_sample_callback(&mut self, callback: SampleCallback) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    fn toggle_acquisition(&mut self) -> Result<(), CoreError> {
        let was_acquiring = self.acquiring.load(Ordering::SeqCst);
        self.acquiring.store(!was_acquiring, Ordering::SeqCst);
        Ok(())
    }

    fn is_acquiring(&self) -> bool {
        self.acquiring.load(Ordering::SeqCst)
    }
}

impl Drop for SimulatedEcg {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
