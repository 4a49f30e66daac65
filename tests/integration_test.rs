use heartsync::audio::{AudioSink, RecordingSink};
use heartsync::hardware::simulated::{SimulatedEcg, SimulatedEcgConfig};
use heartsync::hardware::{AcquisitionSource, ConnectionMode, Sample, SampleCallback};
use heartsync::{Config, CoreError, TrialPhase, TrialSession};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn test_config(tone_count: usize, delay_s: f64, warm_up_s: f64) -> Config {
    let mut config = Config::default();
    config.session.warm_up_s = warm_up_s;
    config.session.debug_logging = false;
    config.detector.threshold = 0.8;
    config.detector.refractory_interval_s = 0.15;
    config.scheduler.delay_s = delay_s;
    config.scheduler.delay_conditions_s.clear();
    config.scheduler.tone_count = tone_count;
    config.scheduler.min_inter_tone_interval_s = 0.05;
    config
}

fn recording_audio() -> (Arc<Mutex<dyn AudioSink>>, RecordingSink) {
    let sink = RecordingSink::new();
    let audio: Arc<Mutex<dyn AudioSink>> = Arc::new(Mutex::new(sink.clone()));
    (audio, sink)
}

/// Feed that replays a fixed sample script synchronously when acquisition
/// is toggled on. Timestamps are spaced at 250 Hz starting from `epoch`.
struct ScriptedFeed {
    script: Vec<f64>,
    epoch: Instant,
    mode: ConnectionMode,
    callback: Option<SampleCallback>,
    acquiring: bool,
}

impl ScriptedFeed {
    fn new(script: Vec<f64>, epoch: Instant) -> Self {
        Self {
            script,
            epoch,
            mode: ConnectionMode::Single,
            callback: None,
            acquiring: false,
        }
    }
}

impl AcquisitionSource for ScriptedFeed {
    fn connect(&mut self) -> Result<(), CoreError> {
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
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CoreError> {
        Ok(())
    }

    fn register_sample_callback(&mut self, callback: SampleCallback) {
        self.callback = Some(callback);
    }

    fn toggle_acquisition(&mut self) -> Result<(), CoreError> {
        self.acquiring = !self.acquiring;
        if self.acquiring {
            if let Some(deliver) = self.callback.as_mut() {
                for (index, &value) in self.script.iter().enumerate() {
                    let at = self.epoch + Duration::from_millis(4 * index as u64);
                    deliver(Sample::new(value, at));
                }
            }
        }
        Ok(())
    }

    fn is_acquiring(&self) -> bool {
        self.acquiring
    }
}

/// `beats` repetitions of a clean R-wave separated by sub-threshold samples.
fn beat_script(beats: usize) -> Vec<f64> {
    let mut script = Vec::new();
    for _ in 0..beats {
        script.extend_from_slice(&[0.1, 0.6, 0.95, 0.9, 0.3, 0.1]);
        // Inter-beat gap: 44 samples of quiet baseline (~200 ms at 250 Hz).
        script.extend(std::iter::repeat(0.05).take(44));
    }
    script
}

#[test]
fn scripted_trial_fires_exact_quota() {
    let (audio, sink) = recording_audio();
    let feed = ScriptedFeed::new(beat_script(5), Instant::now());
    let mut session = TrialSession::new(feed, audio, test_config(3, 0.01, 0.0));

    session.connect().unwrap();
    session.start_trial().unwrap();
    assert!(session.wait_for_completion(Duration::from_secs(2)));
    let report = session.finish_trial().unwrap();

    // 5 well-separated beats against a quota of 3: exactly 3 tones, no 4th.
    assert_eq!(report.tones_fired, 3);
    assert_eq!(sink.tone_count(), 3);
    assert!(report.quota_met());
    assert!(report.peaks_seen >= 3);
    assert_eq!(report.records.len(), 3);
    for window in report.records.windows(2) {
        assert!(window[1].fired_at > window[0].fired_at);
        assert!(window[1].peak_at > window[0].peak_at);
    }
}

#[test]
fn tones_fire_near_the_target_delay() {
    let (audio, _sink) = recording_audio();
    // Timestamps start now and run into the near future, so every deadline
    // is still ahead when its peak is processed.
    let feed = ScriptedFeed::new(beat_script(3), Instant::now());
    let mut session = TrialSession::new(feed, audio, test_config(3, 0.05, 0.0));

    session.connect().unwrap();
    session.start_trial().unwrap();
    session.wait_for_completion(Duration::from_secs(2));
    let report = session.finish_trial().unwrap();

    assert_eq!(report.late_count(), 0);
    for record in &report.records {
        assert!(record.achieved_delay >= record.target_delay);
        let overshoot = record.achieved_delay - record.target_delay;
        assert!(
            overshoot < Duration::from_millis(25),
            "tone overshot its deadline by {:?}",
            overshoot
        );
    }
}

#[test]
fn stale_peaks_fire_immediately_and_are_flagged_late() {
    let (audio, sink) = recording_audio();
    // The whole script is timestamped 10 s in the past: every computed fire
    // time has already gone by.
    let feed = ScriptedFeed::new(beat_script(3), Instant::now() - Duration::from_secs(10));
    let mut config = test_config(2, 0.23, 0.0);
    // Stale peaks predate the previous fire time, so any nonzero tone gap
    // would suppress everything after the first.
    config.scheduler.min_inter_tone_interval_s = 0.0;
    let mut session = TrialSession::new(feed, audio, config);

    session.connect().unwrap();
    session.start_trial().unwrap();
    let report = session.finish_trial().unwrap();

    assert_eq!(report.tones_fired, 2);
    assert_eq!(sink.tone_count(), 2);
    assert_eq!(report.late_count(), 2);
    assert!(report.records.iter().all(|record| record.late));
}

#[test]
fn double_start_is_rejected() {
    let (audio, _sink) = recording_audio();
    let feed = SimulatedEcg::new(SimulatedEcgConfig::default());
    let mut session = TrialSession::new(feed, audio, test_config(2, 0.01, 5.0));

    session.connect().unwrap();
    session.start_trial().unwrap();
    assert_eq!(session.start_trial(), Err(CoreError::DoubleStart));

    session.abort_trial();
    session.finish_trial().unwrap();
}

#[test]
fn abort_during_warm_up_fires_nothing() {
    let (audio, sink) = recording_audio();
    let mut feed_config = SimulatedEcgConfig::default();
    feed_config.beat_interval = Duration::from_millis(250);
    let feed = SimulatedEcg::new(feed_config);
    let mut session = TrialSession::new(feed, audio, test_config(5, 0.23, 10.0));

    session.connect().unwrap();
    session.start_trial().unwrap();
    std::thread::sleep(Duration::from_millis(100));
    session.abort_trial();
    assert_eq!(session.phase(), TrialPhase::Complete);
    let report = session.finish_trial().unwrap();

    assert_eq!(report.tones_fired, 0);
    assert_eq!(sink.tone_count(), 0);
}

#[test]
fn live_simulated_trial_reaches_quota() {
    let (audio, sink) = recording_audio();
    let mut feed_config = SimulatedEcgConfig::default();
    feed_config.beat_interval = Duration::from_millis(300);
    let feed = SimulatedEcg::new(feed_config);
    let mut session = TrialSession::new(feed, audio, test_config(3, 0.01, 0.3));

    session.connect().unwrap();
    session.start_trial().unwrap();
    assert!(
        session.wait_for_completion(Duration::from_secs(10)),
        "trial did not complete against the live simulated feed"
    );
    let report = session.finish_trial().unwrap();

    assert_eq!(report.tones_fired, 3);
    assert_eq!(sink.tone_count(), 3);
    // Back-to-back trials must be possible after a clean finish.
    session.start_trial().unwrap();
    session.abort_trial();
    session.finish_trial().unwrap();
}

#[test]
fn finish_without_start_is_a_usage_error() {
    let (audio, _sink) = recording_audio();
    let feed = SimulatedEcg::new(SimulatedEcgConfig::default());
    let mut session = TrialSession::new(feed, audio, test_config(2, 0.01, 0.0));

    session.connect().unwrap();
    assert_eq!(session.finish_trial().unwrap_err(), CoreError::NotStarted);
}

#[test]
fn per_channel_mode_is_corrected_once() {
    let (audio, _sink) = recording_audio();
    let mut feed_config = SimulatedEcgConfig::default();
    feed_config.initial_mode = ConnectionMode::PerChannel;
    let feed = SimulatedEcg::new(feed_config);
    let mut session = TrialSession::new(feed, audio, test_config(2, 0.01, 0.0));

    assert!(session.connect().is_ok());
}

/// Feed whose connection mode cannot be corrected.
struct StuckModeFeed;

impl AcquisitionSource for StuckModeFeed {
    fn connect(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
    fn connection_mode(&self) -> ConnectionMode {
        ConnectionMode::PerChannel
    }
    fn set_connection_mode(&mut self, _mode: ConnectionMode) -> Result<(), CoreError> {
        Ok(())
    }
    fn enabled_channels(&self) -> Vec<String> {
        vec!["ecg".to_string()]
    }
    fn start(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
    fn stop(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
    fn register_sample_callback(&mut self, _callback: SampleCallback) {}
    fn toggle_acquisition(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
    fn is_acquiring(&self) -> bool {
        false
    }
}

#[test]
fn uncorrectable_mode_is_fatal() {
    let (audio, _sink) = recording_audio();
    let mut session = TrialSession::new(StuckModeFeed, audio, test_config(2, 0.01, 0.0));

    assert_eq!(
        session.connect().unwrap_err(),
        CoreError::ConnectionModeMismatch {
            expected: ConnectionMode::Single,
            actual: ConnectionMode::PerChannel,
        }
    );
}

/// Feed with no reachable device.
struct UnreachableFeed;

impl AcquisitionSource for UnreachableFeed {
    fn connect(&mut self) -> Result<(), CoreError> {
        Err(CoreError::HardwareUnavailable(
            "no acquisition server found".to_string(),
        ))
    }
    fn connection_mode(&self) -> ConnectionMode {
        ConnectionMode::Single
    }
    fn set_connection_mode(&mut self, _mode: ConnectionMode) -> Result<(), CoreError> {
        Ok(())
    }
    fn enabled_channels(&self) -> Vec<String> {
        Vec::new()
    }
    fn start(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
    fn stop(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
    fn register_sample_callback(&mut self, _callback: SampleCallback) {}
    fn toggle_acquisition(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
    fn is_acquiring(&self) -> bool {
        false
    }
}

#[test]
fn missing_hardware_aborts_before_any_trial() {
    let (audio, _sink) = recording_audio();
    let mut session = TrialSession::new(UnreachableFeed, audio, test_config(2, 0.01, 0.0));

    assert!(matches!(
        session.connect().unwrap_err(),
        CoreError::HardwareUnavailable(_)
    ));
    // A trial cannot start without a successful handshake.
    assert!(matches!(
        session.start_trial().unwrap_err(),
        CoreError::HardwareUnavailable(_)
    ));
}
