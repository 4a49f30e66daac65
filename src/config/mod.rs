use crate::errors::CoreError;
use crate::processing::detectors::r_peak::RPeakDetectorConfig;
use crate::processing::scheduler::ToneSchedulerConfig;
use crate::processing::signal_processor::SignalProcessorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub session: SessionConfig,
    pub detector: DetectorConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionConfig {
    /// Settling time between acquisition start and arming.
    pub warm_up_s: f64,
    pub sample_rate_hz: f64,
    pub debug_logging: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    pub threshold: f64,
    pub refractory_interval_s: f64,
    pub buffer_capacity: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// R-to-tone delay for this trial.
    pub delay_s: f64,
    /// Condition set the delay must come from. Empty disables the check.
    pub delay_conditions_s: Vec<f64>,
    pub tone_count: usize,
    pub min_inter_tone_interval_s: f64,
    pub tone_frequency_hz: f64,
    pub tone_duration_s: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig {
                warm_up_s: 2.0,
                sample_rate_hz: 250.0,
                debug_logging: false,
            },
            detector: DetectorConfig {
                threshold: 0.8,
                refractory_interval_s: 0.5,
                buffer_capacity: 16,
            },
            scheduler: SchedulerConfig {
                delay_s: 0.23,
                delay_conditions_s: vec![0.23, 0.53],
                tone_count: 10,
                min_inter_tone_interval_s: 0.2,
                tone_frequency_hz: 440.0,
                tone_duration_s: 0.05,
            },
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.scheduler.tone_count == 0 {
            return Err(CoreError::InvalidConfig(
                "tone_count must be positive".to_string(),
            ));
        }
        if !(self.scheduler.delay_s >= 0.0) {
            return Err(CoreError::InvalidConfig(
                "delay_s must be non-negative".to_string(),
            ));
        }
        if !self.detector.threshold.is_finite() {
            return Err(CoreError::InvalidConfig(
                "threshold must be finite".to_string(),
            ));
        }
        if !(self.detector.refractory_interval_s >= 0.0) {
            return Err(CoreError::InvalidConfig(
                "refractory_interval_s must be non-negative".to_string(),
            ));
        }
        if !(self.session.warm_up_s >= 0.0) {
            return Err(CoreError::InvalidConfig(
                "warm_up_s must be non-negative".to_string(),
            ));
        }
        if !(self.session.sample_rate_hz > 0.0) {
            return Err(CoreError::InvalidConfig(
                "sample_rate_hz must be positive".to_string(),
            ));
        }
        if !self.scheduler.delay_conditions_s.is_empty()
            && !self
                .scheduler
                .delay_conditions_s
                .iter()
                .any(|condition| (condition - self.scheduler.delay_s).abs() < 1e-9)
        {
            return Err(CoreError::InvalidConfig(format!(
                "delay_s {} is not in the condition set {:?}",
                self.scheduler.delay_s, self.scheduler.delay_conditions_s
            )));
        }
        Ok(())
    }

    pub fn detector_config(&self) -> RPeakDetectorConfig {
        RPeakDetectorConfig {
            threshold: self.detector.threshold,
            refractory_interval: Duration::from_secs_f64(self.detector.refractory_interval_s),
            buffer_capacity: self.detector.buffer_capacity,
        }
    }

    pub fn scheduler_config(&self) -> ToneSchedulerConfig {
        ToneSchedulerConfig {
            delay: Duration::from_secs_f64(self.scheduler.delay_s),
            tone_count: self.scheduler.tone_count,
            min_inter_tone_interval: Duration::from_secs_f64(
                self.scheduler.min_inter_tone_interval_s,
            ),
            tone_frequency_hz: self.scheduler.tone_frequency_hz,
            tone_duration: Duration::from_secs_f64(self.scheduler.tone_duration_s),
        }
    }

    pub fn processor_config(&self) -> SignalProcessorConfig {
        SignalProcessorConfig {
            warm_up: Duration::from_secs_f64(self.session.warm_up_s),
            debug_logging: self.session.debug_logging,
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, CoreError> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| CoreError::InvalidConfig(format!("failed to read config file: {}", e)))?;

    serde_yaml::from_str(&config_str)
        .map_err(|e| CoreError::InvalidConfig(format!("failed to parse config file: {}", e)))
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), CoreError> {
    let yaml = serde_yaml::to_string(config)
        .map_err(|e| CoreError::InvalidConfig(format!("failed to serialize config: {}", e)))?;

    fs::write(path, yaml)
        .map_err(|e| CoreError::InvalidConfig(format!("failed to write config file: {}", e)))
}
